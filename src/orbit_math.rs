// Two-body Keplerian propagation.
// See https://downloads.rene-schwarz.com/download/M001-Keplerian_Orbit_Elements_to_Cartesian_State_Vectors.pdf

use glam::DVec3;
use serde::Deserialize;
use std::f64::consts::PI;

use crate::time::SimInstant;
use crate::units::{D_TO_S, KM_TO_M, MU_SUN, M_TO_U};

/// Newton steps used by the propagator. Fixed, not iterated to convergence:
/// the error grows with eccentricity (about 2e-6 rad worst case at e = 0.2).
pub const KEPLER_ITERATIONS: usize = 2;

// all angles in degrees, distances in km, times in days
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct OrbitalElements {
    pub source: Option<String>,
    pub period: f64,
    /// Reference epoch in Julian days.
    pub epoch: f64,
    pub semi_major_axis: f64,
    pub eccentricity: f64,
    pub inclination: f64,
    pub ascending_node: f64,
    pub arg_of_pericenter: f64,
    pub mean_anomaly: f64,
    /// G*M of the central body in m^3 s^-2.
    pub mu: f64,
}

impl Default for OrbitalElements {
    fn default() -> Self {
        Self {
            source: None,
            period: 0.0,
            epoch: 0.0,
            semi_major_axis: 0.0,
            eccentricity: 0.0,
            inclination: 0.0,
            ascending_node: 0.0,
            arg_of_pericenter: 0.0,
            mean_anomaly: 0.0,
            mu: MU_SUN,
        }
    }
}

impl OrbitalElements {
    /// Gravitational parameter for propagation: `4 pi^2 a^3 / T^2` when both
    /// the period and the semi-major axis are positive, the stored value
    /// otherwise.
    #[inline]
    pub fn effective_mu(&self) -> f64 {
        if self.period > 0.0 && self.semi_major_axis > 0.0 {
            calculate_mu(self.semi_major_axis * KM_TO_M, self.period * D_TO_S)
        } else {
            self.mu
        }
    }

    /// Writes the computed mu back, leaving it untouched when the period or
    /// the semi-major axis are not positive.
    pub fn compute_mu(&mut self) {
        self.mu = self.effective_mu();
    }

    /// Position in scene units `dt_days` after the epoch.
    pub fn position_at_offset(&self, dt_days: f64) -> DVec3 {
        let mu = self.effective_mu();
        let a = self.semi_major_axis * KM_TO_M;
        let e = self.eccentricity;
        debug_assert!(e < 1.0, "eccentricity {e} is out of contract");

        let initial_mean_anomaly = self.mean_anomaly.to_radians();
        let mean_motion = calculate_mean_motion(mu, a);
        let mean_anomaly =
            calculate_mean_anomaly(mean_motion, initial_mean_anomaly, dt_days * D_TO_S);
        let eccentric_anomaly =
            calculate_eccentric_anomaly(e, mean_anomaly, KEPLER_ITERATIONS);
        let true_anomaly = calculate_true_anomaly(e, eccentric_anomaly);
        let radius = calculate_radius(a, e, eccentric_anomaly);

        let ox = radius * true_anomaly.cos();
        let oy = radius * true_anomaly.sin();

        let reference = rotate_to_reference(
            ox,
            oy,
            self.arg_of_pericenter.to_radians(),
            self.inclination.to_radians(),
            self.ascending_node.to_radians(),
        ) * M_TO_U;

        // Y-up scene convention.
        DVec3::new(reference.y, reference.z, reference.x)
    }

    pub fn position_at(&self, instant: SimInstant) -> DVec3 {
        self.position_at_offset(instant.julian_date() - self.epoch)
    }
}

#[inline]
pub fn calculate_mu(semi_major_axis_m: f64, period_s: f64) -> f64 {
    4.0 * PI * PI * semi_major_axis_m.powi(3) / (period_s * period_s)
}

#[inline]
pub fn calculate_mean_motion<T: num_traits::Float>(mu: T, semi_major_axis: T) -> T {
    (mu / (semi_major_axis * semi_major_axis * semi_major_axis)).sqrt()
}

#[inline]
pub fn calculate_mean_anomaly(mean_motion: f64, initial_mean_anomaly: f64, time: f64) -> f64 {
    initial_mean_anomaly + mean_motion * time
}

/// Solves Kepler's equation `E - e sin E = M` with `iterations` Newton steps
/// seeded at `E = M`.
#[inline]
pub fn calculate_eccentric_anomaly<T: num_traits::Float>(
    eccentricity: T,
    mean_anomaly: T,
    iterations: usize,
) -> T {
    let e = eccentricity;
    let ma = mean_anomaly;
    let mut ea = ma;
    for _i in 0..iterations {
        ea = ea - (ea - e * ea.sin() - ma) / (T::one() - e * ea.cos());
    }
    ea
}

#[inline]
pub fn calculate_true_anomaly(eccentricity: f64, eccentric_anomaly: f64) -> f64 {
    let e = eccentricity;
    let half = eccentric_anomaly / 2.0;
    2.0 * ((1.0 + e).sqrt() * half.sin()).atan2((1.0 - e).sqrt() * half.cos())
}

#[inline]
pub fn calculate_radius(semi_major_axis: f64, eccentricity: f64, eccentric_anomaly: f64) -> f64 {
    semi_major_axis * (1.0 - eccentricity * eccentric_anomaly.cos())
}

/// 3-1-3 rotation of orbital-plane coordinates by the argument of pericenter,
/// the inclination and the longitude of the ascending node, in radians.
#[inline]
pub fn rotate_to_reference(
    ox: f64,
    oy: f64,
    arg_of_pericenter: f64,
    inclination: f64,
    ascending_node: f64,
) -> DVec3 {
    let (sin_w, cos_w) = arg_of_pericenter.sin_cos();
    let (sin_o, cos_o) = ascending_node.sin_cos();
    let (sin_i, cos_i) = inclination.sin_cos();

    let x = ox * (cos_w * cos_o - sin_w * cos_i * sin_o)
        - oy * (sin_w * cos_o + cos_w * cos_i * sin_o);
    let y = ox * (cos_w * sin_o + sin_w * cos_i * cos_o)
        + oy * (cos_w * cos_i * cos_o - sin_w * sin_o);
    let z = ox * (sin_w * sin_i) + oy * (cos_w * sin_i);

    DVec3::new(x, y, z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::{J2000_JD, KM_TO_U};

    fn earth_like() -> OrbitalElements {
        OrbitalElements {
            period: 365.25,
            epoch: J2000_JD,
            semi_major_axis: 149_597_870.0,
            ..Default::default()
        }
    }

    #[test]
    fn one_au_at_epoch() {
        let position = earth_like().position_at_offset(0.0);
        let expected = 149_597_870.0 * KM_TO_U;

        assert!((position.length() - expected).abs() < 1e-9);
        // Orbital-plane x ends up on the scene z axis.
        assert!(position.x.abs() < 1e-12);
        assert!(position.y.abs() < 1e-12);
        assert!((position.z - expected).abs() < 1e-9);
    }

    #[test]
    fn circular_quarter_points() {
        let orbit = earth_like();
        let period = orbit.period;
        let points: Vec<DVec3> = (0..4)
            .map(|i| orbit.position_at_offset(period * i as f64 / 4.0))
            .collect();
        let radius = points[0].length();

        for (i, point) in points.iter().enumerate() {
            assert!((point.length() - radius).abs() < 1e-9 * radius);
            let next = points[(i + 1) % 4];
            let cos = point.dot(next) / (radius * radius);
            assert!(cos.abs() < 1e-9, "points {i} and {} are not 90 degrees apart", i + 1);
        }
        assert!((points[0] + points[2]).length() < 1e-9 * radius);
    }

    #[test]
    fn two_newton_steps_close_to_converged() {
        for &(e, bound) in &[(0.05, 1e-6), (0.1, 1e-6), (0.15, 1e-6), (0.2, 2e-6)] {
            for i in 0..=2000 {
                let m = -PI + 2.0 * PI * i as f64 / 2000.0;
                let fast = calculate_eccentric_anomaly(e, m, KEPLER_ITERATIONS);
                let converged = calculate_eccentric_anomaly(e, m, 20);
                assert!(
                    (fast - converged).abs() < bound,
                    "e = {e}, M = {m}: {fast} vs {converged}"
                );
            }
        }
    }

    #[test]
    fn two_newton_steps_degrade_with_eccentricity() {
        let worst = |e: f64| {
            (0..=2000)
                .map(|i| {
                    let m = -PI + 2.0 * PI * i as f64 / 2000.0;
                    (calculate_eccentric_anomaly(e, m, KEPLER_ITERATIONS)
                        - calculate_eccentric_anomaly(e, m, 20))
                    .abs()
                })
                .fold(0.0, f64::max)
        };
        assert!(worst(0.5) > worst(0.2));
        assert!(worst(0.5) > 1e-4);
    }

    #[test]
    fn mu_from_period_and_axis() {
        let orbit = earth_like();
        let a = 149_597_870.0 * KM_TO_M;
        let t = 365.25 * D_TO_S;
        let expected = 4.0 * PI * PI * a * a * a / (t * t);
        assert!((orbit.effective_mu() - expected).abs() < 1e-12 * expected);
    }

    #[test]
    fn non_positive_period_keeps_supplied_mu() {
        let mut orbit = OrbitalElements {
            period: 0.0,
            semi_major_axis: 384_400.0,
            mu: 3.986004418e14,
            ..Default::default()
        };
        orbit.compute_mu();
        assert_eq!(orbit.mu, 3.986004418e14);

        let mut orbit = OrbitalElements {
            period: -1.0,
            semi_major_axis: 384_400.0,
            ..Default::default()
        };
        orbit.compute_mu();
        assert_eq!(orbit.mu, MU_SUN);
    }

    #[test]
    fn inclined_orbit_leaves_the_plane() {
        let orbit = OrbitalElements {
            inclination: 90.0,
            ..earth_like()
        };
        let quarter = orbit.position_at_offset(orbit.period / 4.0);
        // A polar orbit at true anomaly 90 degrees is purely along reference z,
        // which is scene y.
        assert!((quarter.y.abs() - quarter.length()).abs() < 1e-9);
    }

    #[test]
    fn position_at_instant_matches_offset() {
        let orbit = earth_like();
        let instant = SimInstant::from_julian_date(J2000_JD + 10.0);
        let a = orbit.position_at(instant);
        let b = orbit.position_at_offset(10.0);
        assert!((a - b).length() < 1e-9);
    }
}

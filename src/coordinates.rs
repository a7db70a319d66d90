use glam::{DVec2, DVec3};

use crate::error::GraphError;
use crate::orbit_math::OrbitalElements;
use crate::time::SimInstant;

/// Time-dependent position source of a node.
pub trait CoordinateProvider {
    /// Equatorial cartesian position at `instant`, relative to the parent
    /// node, in scene units. `Ok(None)` means the instant is outside the
    /// range the provider has data for.
    fn equatorial_cartesian(&self, instant: SimInstant) -> Result<Option<DVec3>, GraphError>;
}

#[derive(Clone, Copy, Debug)]
pub struct StaticCoordinates(pub DVec3);

impl CoordinateProvider for StaticCoordinates {
    fn equatorial_cartesian(&self, _instant: SimInstant) -> Result<Option<DVec3>, GraphError> {
        Ok(Some(self.0))
    }
}

impl CoordinateProvider for OrbitalElements {
    fn equatorial_cartesian(&self, instant: SimInstant) -> Result<Option<DVec3>, GraphError> {
        Ok(Some(self.position_at(instant)))
    }
}

/// Restricts a provider to `[start, end]`.
#[derive(Clone, Debug)]
pub struct ValidityWindow<P> {
    pub inner: P,
    pub start: SimInstant,
    pub end: SimInstant,
}

impl<P: CoordinateProvider> CoordinateProvider for ValidityWindow<P> {
    fn equatorial_cartesian(&self, instant: SimInstant) -> Result<Option<DVec3>, GraphError> {
        if instant < self.start || instant > self.end {
            return Ok(None);
        }
        self.inner.equatorial_cartesian(instant)
    }
}

/// Right ascension and declination in degrees of an equatorial cartesian
/// vector (x towards RA 90, y towards the north pole, z towards RA 0).
pub fn cartesian_to_spherical_deg(position: DVec3) -> DVec2 {
    let r = position.length();
    if r == 0.0 {
        return DVec2::ZERO;
    }
    let mut alpha = position.x.atan2(position.z);
    if alpha < 0.0 {
        alpha += std::f64::consts::TAU;
    }
    let delta = (position.y / r).asin();
    DVec2::new(alpha.to_degrees(), delta.to_degrees())
}

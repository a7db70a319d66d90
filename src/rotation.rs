use serde::Deserialize;

use crate::time::SimInstant;

#[derive(Default, Deserialize)]
#[serde(default)]
struct RotationDescription {
    period: f64,
    axial_tilt: f64,
    inclination: f64,
    ascending_node: f64,
    meridian_angle: f64,
}

/// Rotation of a body around its own axis.
///
/// Angles in degrees, the period in hours. The angular velocity is owned by
/// [`RotationElements::set_period`] and never set on its own.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(from = "RotationDescription")]
pub struct RotationElements {
    period: f64,
    /// Degrees per hour.
    angular_velocity: f64,
    /// Current angle around the rotation axis.
    pub angle: f64,
    /// Angle between the equatorial plane and the orbital plane.
    pub axial_tilt: f64,
    /// Angle between the orbital plane and the ecliptic.
    pub inclination: f64,
    pub ascending_node: f64,
    /// Meridian angle at J2000.
    pub meridian_angle: f64,
}

impl From<RotationDescription> for RotationElements {
    fn from(description: RotationDescription) -> Self {
        let mut rotation = RotationElements {
            axial_tilt: description.axial_tilt,
            inclination: description.inclination,
            ascending_node: description.ascending_node,
            meridian_angle: description.meridian_angle,
            ..Default::default()
        };
        rotation.set_period(description.period);
        rotation
    }
}

impl RotationElements {
    pub fn new(period: f64, meridian_angle: f64) -> Self {
        let mut rotation = Self {
            meridian_angle,
            ..Default::default()
        };
        rotation.set_period(period);
        rotation
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn angular_velocity(&self) -> f64 {
        self.angular_velocity
    }

    pub fn set_period(&mut self, period: f64) {
        self.period = period;
        self.angular_velocity = if period != 0.0 { 360.0 / period } else { 0.0 };
    }

    /// Rotation angle at `instant`, in degrees.
    #[inline]
    pub fn angle_at(&self, instant: SimInstant) -> f64 {
        (self.meridian_angle + self.angular_velocity * instant.hours_since_j2000()) % 360.0
    }

    pub fn update(&mut self, instant: SimInstant) {
        self.angle = self.angle_at(instant);
    }
}

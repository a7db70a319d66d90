//! Apparent angular size of nodes, used downstream for level-of-detail.

/// Small-angle approximation for point-like objects.
#[inline]
pub fn point_solid_angle(radius: f64, distance: f64) -> f64 {
    radius / distance
}

/// Exact angular radius of an object of extent `size * model_size`.
#[inline]
pub fn model_solid_angle(size: f64, model_size: f64, distance: f64) -> f64 {
    (size * model_size / distance).atan()
}

/// Point solid angle corrected for star brightness and field of view.
#[inline]
pub fn point_apparent(solid_angle: f64, star_brightness: f64, fov_factor: f64) -> f64 {
    solid_angle * star_brightness / fov_factor
}

#[inline]
pub fn model_apparent(solid_angle: f64, fov_factor: f64) -> f64 {
    solid_angle / fov_factor
}

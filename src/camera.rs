use crate::UniversalPos;

/// Read-only view of the camera during a scene update.
pub trait Camera {
    /// Camera position in absolute scene coordinates.
    fn position(&self) -> UniversalPos;

    /// The negated position. Scene translations start from here so that
    /// they end up camera-centred.
    fn inverse_position(&self) -> UniversalPos {
        -self.position()
    }

    /// Field-of-view scale factor, 1 at the default field of view.
    fn fov_factor(&self) -> f64;
}

#[derive(Clone, Copy, Debug)]
pub struct FixedCamera {
    pub position: UniversalPos,
    pub fov_factor: f64,
}

impl FixedCamera {
    pub fn new(position: UniversalPos) -> Self {
        Self {
            position,
            fov_factor: 1.0,
        }
    }

    pub fn at_origin() -> Self {
        Self::new(UniversalPos::default())
    }
}

impl Camera for FixedCamera {
    fn position(&self) -> UniversalPos {
        self.position
    }

    fn fov_factor(&self) -> f64 {
        self.fov_factor
    }
}

pub mod aggregate;
pub mod camera;
pub mod coordinates;
pub mod error;
pub mod fade;
pub mod node;
pub mod orbit_math;
pub mod rotation;
pub mod scene;
pub mod solid_angle;
pub mod time;
pub mod units;
pub mod updater;

pub use camera::{Camera, FixedCamera};
pub use error::GraphError;
pub use node::{ChildPolicy, Extent, Node, NodeId, Placement, ProperMotion, SceneGraph, UpdateGate};
pub use time::{GlobalClock, SimInstant, TimeFrame};
pub use updater::{FrameStats, GraphUpdater, ProcessTags, UpdateSettings};

use az::Cast;
use glam::DVec3;

use std::ops::{Add, AddAssign, Neg, Sub};

// 64 integer bits cover the observable universe in scene units, 64 fractional
// bits keep sub-millimetre resolution next to the camera.
pub type UniversalScalar = fixed::types::I64F64;

/// High-precision absolute or camera-relative position in scene units.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct UniversalPos {
    pub x: UniversalScalar,
    pub y: UniversalScalar,
    pub z: UniversalScalar,
}

impl UniversalPos {
    pub fn new_3(x: f64, y: f64, z: f64) -> Self {
        Self::new(
            UniversalScalar::from_num(x),
            UniversalScalar::from_num(y),
            UniversalScalar::from_num(z),
        )
    }

    pub fn new(x: UniversalScalar, y: UniversalScalar, z: UniversalScalar) -> Self {
        Self { x, y, z }
    }

    pub fn from_dvec3(v: DVec3) -> Self {
        Self::new_3(v.x, v.y, v.z)
    }

    /// Offsets by `other`, or `None` if it is not finite or overflows.
    pub fn checked_add(self, other: DVec3) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(UniversalScalar::checked_from_num(other.x)?)?,
            y: self.y.checked_add(UniversalScalar::checked_from_num(other.y)?)?,
            z: self.z.checked_add(UniversalScalar::checked_from_num(other.z)?)?,
        })
    }

    pub fn as_dvec3(self) -> DVec3 {
        DVec3::new(self.x.cast(), self.y.cast(), self.z.cast())
    }

    pub fn length(self) -> f64 {
        self.as_dvec3().length()
    }

    pub fn distance_squared(self, other: Self) -> f64 {
        (self - other).length_squared()
    }

    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    // This is essentially an add, but discouraged unless there's a good reason
    // (like composing a child's translation onto its parent's).
    pub fn offset_by_pos(self, other: Self) -> Self {
        Self {
            x: self.x + other.x,
            y: self.y + other.y,
            z: self.z + other.z,
        }
    }
}

impl Add<DVec3> for UniversalPos {
    type Output = Self;

    fn add(self, other: DVec3) -> Self {
        Self {
            x: self.x + UniversalScalar::from_num(other.x),
            y: self.y + UniversalScalar::from_num(other.y),
            z: self.z + UniversalScalar::from_num(other.z),
        }
    }
}

impl AddAssign<DVec3> for UniversalPos {
    fn add_assign(&mut self, other: DVec3) {
        *self = *self + other;
    }
}

impl Sub<UniversalPos> for UniversalPos {
    type Output = DVec3;

    fn sub(self, other: Self) -> DVec3 {
        DVec3 {
            x: (self.x - other.x).cast(),
            y: (self.y - other.y).cast(),
            z: (self.z - other.z).cast(),
        }
    }
}

impl Neg for UniversalPos {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn far_offsets_keep_near_precision() {
        // Ten gigaparsecs in scene units, then one metre.
        let far = UniversalPos::new_3(3.0857e17, 0.0, 0.0);
        let near = far + DVec3::new(1e-9, 0.0, 0.0);
        let delta = near - far;
        assert!((delta.x - 1e-9).abs() < 1e-15);
    }

    #[test]
    fn checked_add_rejects_non_finite() {
        let origin = UniversalPos::default();
        assert!(origin.checked_add(DVec3::new(f64::NAN, 0.0, 0.0)).is_none());
        assert!(origin.checked_add(DVec3::new(f64::INFINITY, 0.0, 0.0)).is_none());
        assert!(origin.checked_add(DVec3::new(1e30, 0.0, 0.0)).is_none());
        assert_eq!(
            origin.checked_add(DVec3::new(1.0, 2.0, 3.0)),
            Some(UniversalPos::new_3(1.0, 2.0, 3.0))
        );
    }

    #[test]
    fn negation_and_distance() {
        let p = UniversalPos::new_3(3.0, 4.0, 0.0);
        assert_eq!(p.length(), 5.0);
        assert_eq!((-p).offset_by_pos(p), UniversalPos::default());
        assert_eq!(p.distance(UniversalPos::default()), 5.0);
    }
}

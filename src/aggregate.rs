//! Point sets that update their own members instead of being traversed.

use glam::DVec3;

use crate::node::ProperMotion;
use crate::solid_angle::{point_apparent, point_solid_angle};
use crate::time::SimInstant;

#[derive(Clone, Debug, PartialEq)]
pub struct PointMember {
    /// Position relative to the set, in scene units.
    pub position: DVec3,
    pub radius: f64,
    pub proper_motion: Option<ProperMotion>,

    /// Camera-relative position after the last update.
    pub translation: DVec3,
    pub distance_to_camera: f64,
    pub solid_angle: f64,
    pub solid_angle_apparent: f64,
}

impl PointMember {
    pub fn new(position: DVec3, radius: f64) -> Self {
        Self {
            position,
            radius,
            proper_motion: None,
            translation: DVec3::ZERO,
            distance_to_camera: 0.0,
            solid_angle: 0.0,
            solid_angle_apparent: 0.0,
        }
    }

    pub fn with_proper_motion(mut self, proper_motion: ProperMotion) -> Self {
        self.proper_motion = Some(proper_motion);
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PointSet {
    pub members: Vec<PointMember>,
}

impl PointSet {
    pub fn new(members: Vec<PointMember>) -> Self {
        Self { members }
    }

    /// Recomputes every member from the set's camera-relative translation.
    pub fn update_members(
        &mut self,
        set_translation: DVec3,
        instant: SimInstant,
        fov_factor: f64,
        star_brightness: f64,
    ) {
        for member in &mut self.members {
            let mut translation = set_translation + member.position;
            if let Some(pm) = &member.proper_motion {
                translation += pm.offset_at(instant);
            }
            member.translation = translation;
            member.distance_to_camera = translation.length();
            member.solid_angle = point_solid_angle(member.radius, member.distance_to_camera);
            member.solid_angle_apparent =
                point_apparent(member.solid_angle, star_brightness, fov_factor);
        }
    }
}

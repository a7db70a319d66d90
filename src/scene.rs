//! Scene descriptions loaded from TOML.
//!
//! ```toml
//! [camera]
//! position_km = [0.0, 2.0e8, 0.0]
//!
//! [bodies.Sun]
//! radius_km = 696000.0
//!
//! [bodies.Sun.satellites.Earth]
//! radius_km = 6371.0
//! orbit = { period = 365.256, epoch = 2451545.0, semi_major_axis = 149598023.0, eccentricity = 0.0167 }
//! rotation = { period = 23.9345, axial_tilt = 23.44 }
//! ```
//!
//! Distances are in kilometres, angles in degrees, orbital periods in days
//! and rotation periods in hours.

use std::collections::BTreeMap;
use std::path::Path;

use glam::DVec3;
use serde::Deserialize;

use crate::aggregate::{PointMember, PointSet};
use crate::camera::FixedCamera;
use crate::coordinates::{CoordinateProvider, StaticCoordinates, ValidityWindow};
use crate::error::GraphError;
use crate::fade::{FadeConfig, FadeMap};
use crate::node::{ChildPolicy, Extent, Node, NodeId, ProperMotion, SceneGraph, UpdateGate};
use crate::orbit_math::OrbitalElements;
use crate::rotation::RotationElements;
use crate::time::SimInstant;
use crate::units::{J2000_JD, KM_TO_U};
use crate::updater::UpdateSettings;
use crate::UniversalPos;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct SceneDescription {
    pub settings: UpdateSettings,
    pub camera: CameraDescription,
    pub bodies: BTreeMap<String, BodyDescription>,
    pub point_sets: BTreeMap<String, PointSetDescription>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CameraDescription {
    pub position_km: [f64; 3],
    pub fov_factor: f64,
}

impl Default for CameraDescription {
    fn default() -> Self {
        Self {
            position_km: [0.0; 3],
            fov_factor: 1.0,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct BodyDescription {
    #[serde(default)]
    pub radius_km: f64,
    /// Fixed position relative to the parent. Ignored when `orbit` is set.
    pub position_km: Option<[f64; 3]>,
    pub orbit: Option<OrbitalElements>,
    pub rotation: Option<RotationElements>,
    /// Treat the body as a point of this radius for its solid angle.
    pub point_radius_km: Option<f64>,
    /// Fade maps; ranges in kilometres.
    pub fade_in: Option<FadeMap>,
    pub fade_out: Option<FadeMap>,
    /// Satellites replace this body's representation when close.
    #[serde(default)]
    pub overlay: bool,
    /// Category the body's satellites are switched off with.
    pub category: Option<String>,
    /// Only process the body while its parent's solid angle exceeds this.
    pub min_parent_solid_angle: Option<f64>,
    /// Julian dates bounding the coordinate data.
    pub valid_from: Option<f64>,
    pub valid_to: Option<f64>,
    #[serde(default = "visible_by_default")]
    pub visible: bool,
    #[serde(default)]
    pub satellites: BTreeMap<String, BodyDescription>,
}

fn visible_by_default() -> bool {
    true
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct PointSetDescription {
    pub position_km: [f64; 3],
    pub category: Option<String>,
    pub members: Vec<PointMemberDescription>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PointMemberDescription {
    pub position_km: [f64; 3],
    pub radius_km: f64,
    /// Kilometres per Julian year, relative to J2000.
    pub velocity_km_y: Option<[f64; 3]>,
}

fn km(v: [f64; 3]) -> DVec3 {
    DVec3::from_array(v) * KM_TO_U
}

impl SceneDescription {
    pub fn from_toml(source: &str) -> Result<Self, GraphError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, GraphError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml(&source)
    }

    /// Fails when the position is not finite or out of the translation range.
    pub fn camera(&self) -> Result<FixedCamera, GraphError> {
        let position = km(self.camera.position_km);
        Ok(FixedCamera {
            position: UniversalPos::default()
                .checked_add(position)
                .ok_or(GraphError::NonFinitePosition(position.to_array()))?,
            fov_factor: self.camera.fov_factor,
        })
    }

    /// Builds the graph under a fresh root node named `universe`.
    pub fn build(&self) -> Result<SceneGraph, GraphError> {
        let mut graph = SceneGraph::new();
        let root = graph.add(Node::new("universe"));

        for (name, body) in &self.bodies {
            add_body(&mut graph, root, name, body)?;
        }

        for (name, set) in &self.point_sets {
            let members = set
                .members
                .iter()
                .map(|member| {
                    let point = PointMember::new(km(member.position_km), member.radius_km * KM_TO_U);
                    match member.velocity_km_y {
                        Some(velocity) => point.with_proper_motion(ProperMotion {
                            velocity: km(velocity),
                            epoch_jd: J2000_JD,
                        }),
                        None => point,
                    }
                })
                .collect();
            let mut node = Node::new(name.as_str())
                .with_position(km(set.position_km))
                .with_extent(Extent::Point { radius: 0.0 })
                .with_aggregate(PointSet::new(members));
            node.category = set.category.clone();
            graph.add_child(root, node)?;
        }

        log::info!("Built scene graph with {} nodes", graph.len());
        Ok(graph)
    }
}

fn add_body(
    graph: &mut SceneGraph,
    parent: NodeId,
    name: &str,
    body: &BodyDescription,
) -> Result<NodeId, GraphError> {
    let mut node = Node::new(name)
        .with_size(body.radius_km * KM_TO_U)
        .with_visibility(body.visible);

    if let Some(radius) = body.point_radius_km {
        node = node.with_extent(Extent::Point {
            radius: radius * KM_TO_U,
        });
    }
    if body.overlay {
        node = node.with_child_policy(ChildPolicy::Overlay);
    }
    node.category = body.category.clone();
    if let Some(threshold) = body.min_parent_solid_angle {
        node = node.with_gate(UpdateGate::ParentSolidAngle { threshold });
    }
    if let Some(rotation) = &body.rotation {
        node = node.with_rotation(rotation.clone());
    }
    if body.fade_in.is_some() || body.fade_out.is_some() {
        let to_units = |map: FadeMap| FadeMap::new(map.range.map(|d| d * KM_TO_U), map.opacity);
        node = node.with_fade(FadeConfig {
            fade_in: body.fade_in.map(to_units),
            fade_out: body.fade_out.map(to_units),
            ..Default::default()
        });
    }

    let window = match (body.valid_from, body.valid_to) {
        (None, None) => None,
        (from, to) => Some((
            from.map_or(SimInstant(i64::MIN), SimInstant::from_julian_date),
            to.map_or(SimInstant(i64::MAX), SimInstant::from_julian_date),
        )),
    };
    if let Some(orbit) = &body.orbit {
        let mut orbit = orbit.clone();
        orbit.compute_mu();
        node.coordinates = Some(windowed(orbit, window));
    } else if let Some(position) = body.position_km {
        node.coordinates = Some(windowed(StaticCoordinates(km(position)), window));
    }

    let id = graph.add_child(parent, node)?;
    for (name, satellite) in &body.satellites {
        add_body(graph, id, name, satellite)?;
    }
    Ok(id)
}

fn windowed<P: CoordinateProvider + 'static>(
    provider: P,
    window: Option<(SimInstant, SimInstant)>,
) -> Box<dyn CoordinateProvider> {
    match window {
        Some((start, end)) => Box::new(ValidityWindow {
            inner: provider,
            start,
            end,
        }),
        None => Box::new(provider),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYSTEM: &str = r#"
        [settings]
        fade_ms = 1000
        hidden_categories = ["moons"]

        [camera]
        position_km = [0.0, 0.0, -1.0e6]

        [bodies.Sun]
        radius_km = 696000.0

        [bodies.Sun.satellites.Earth]
        radius_km = 6371.0
        overlay = true
        category = "moons"
        orbit = { period = 365.256, epoch = 2451545.0, semi_major_axis = 149598023.0, eccentricity = 0.0167 }
        rotation = { period = 23.9345, axial_tilt = 23.44 }
        fade_out = { range = [1.0e9, 2.0e9], opacity = [1.0, 0.0] }

        [bodies.Sun.satellites.Earth.satellites.Moon]
        radius_km = 1737.4
        min_parent_solid_angle = 1.0e-4
        orbit = { period = 27.3217, epoch = 2451545.0, semi_major_axis = 384399.0 }

        [bodies.Voyager]
        position_km = [1.0e10, 0.0, 0.0]
        valid_from = 2443391.5
        visible = false

        [point_sets.Hyades]
        position_km = [1.0e15, 0.0, 0.0]
        members = [
            { position_km = [0.0, 1.0e12, 0.0], radius_km = 7.0e5 },
            { position_km = [0.0, 0.0, 1.0e12], radius_km = 7.0e5, velocity_km_y = [1.0e9, 0.0, 0.0] },
        ]
    "#;

    #[test]
    fn nested_satellites_become_children() {
        let scene = SceneDescription::from_toml(SYSTEM).unwrap();
        assert_eq!(scene.settings.fade_ms, 1000);
        let graph = scene.build().unwrap();
        assert_eq!(graph.len(), 6);

        let sun = graph.find("Sun").unwrap();
        let earth = graph.find("Earth").unwrap();
        let moon = graph.find("Moon").unwrap();
        assert_eq!(graph[earth].parent, Some(sun));
        assert_eq!(graph[moon].parent, Some(earth));
        assert_eq!(graph[sun].parent, graph.root());
        assert_eq!(graph[earth].child_policy, ChildPolicy::Overlay);
        assert!(graph[moon].gate.is_some());
        assert_eq!(graph[earth].category.as_deref(), Some("moons"));
        assert!(!scene.settings.is_category_on(Some("moons")));
    }

    #[test]
    fn units_are_converted() {
        let scene = SceneDescription::from_toml(SYSTEM).unwrap();
        let graph = scene.build().unwrap();
        let earth = &graph[graph.find("Earth").unwrap()];

        assert!((earth.size - 6371.0 * KM_TO_U).abs() < 1e-18);
        let fade = earth.fade.as_ref().unwrap();
        assert_eq!(fade.fade_out.unwrap().range, [1.0e9 * KM_TO_U, 2.0e9 * KM_TO_U]);
        let rotation = earth.rotation.as_ref().unwrap();
        assert!((rotation.angular_velocity() - 360.0 / 23.9345).abs() < 1e-12);

        let camera = scene.camera().unwrap();
        assert_eq!(camera.position.as_dvec3().z, -1.0e6 * KM_TO_U);
    }

    #[test]
    fn point_sets_are_self_managed() {
        let graph = SceneDescription::from_toml(SYSTEM).unwrap().build().unwrap();
        let hyades = &graph[graph.find("Hyades").unwrap()];
        assert_eq!(hyades.child_policy, ChildPolicy::SelfManaged);
        let set = hyades.aggregate.as_ref().unwrap();
        assert_eq!(set.members.len(), 2);
        assert!(set.members[1].proper_motion.is_some());
    }

    #[test]
    fn hidden_bodies_start_hidden() {
        let graph = SceneDescription::from_toml(SYSTEM).unwrap().build().unwrap();
        let voyager = &graph[graph.find("Voyager").unwrap()];
        assert!(!voyager.visibility.is_visible());
        assert!(voyager.coordinates.is_some());
    }

    #[test]
    fn unusable_camera_position_is_an_error() {
        for position in ["[nan, 0.0, 0.0]", "[inf, 0.0, 0.0]", "[1.0e30, 0.0, 0.0]"] {
            let source = format!("[camera]\nposition_km = {position}");
            let scene = SceneDescription::from_toml(&source).unwrap();
            assert!(
                matches!(scene.camera(), Err(GraphError::NonFinitePosition(_))),
                "{position}"
            );
        }
    }

    #[test]
    fn malformed_description_is_an_error() {
        let err = SceneDescription::from_toml("[bodies.Sun]\nradius_km = \"big\"").unwrap_err();
        assert!(matches!(err, GraphError::Description(_)));
    }
}

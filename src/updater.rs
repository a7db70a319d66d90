//! Per-frame scene graph traversal.
//!
//! The updater walks the tree depth-first in pre-order from the root. Each
//! node is finalised from its parent's already committed state before any of
//! its children is visited. Renderers read node state after a full pass.

use std::collections::BTreeSet;

use glam::{DMat4, DVec2, DVec3};
use serde::Deserialize;

use crate::camera::Camera;
use crate::coordinates::cartesian_to_spherical_deg;
use crate::error::GraphError;
use crate::fade::FadeReference;
use crate::node::{ChildPolicy, Extent, GateInput, Node, NodeId, PlacementInput, SceneGraph};
use crate::solid_angle::{model_apparent, model_solid_angle, point_apparent, point_solid_angle};
use crate::time::{SimInstant, TimeFrame};
use crate::UniversalPos;

/// Settings read during a traversal.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct UpdateSettings {
    /// Duration of visibility crossfades, in milliseconds.
    pub fade_ms: i64,
    /// Multiplier of the apparent solid angle of point-like nodes.
    pub star_brightness: f64,
    /// Categories switched off. Nodes of these categories are updated but
    /// their children are not.
    pub hidden_categories: BTreeSet<String>,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            fade_ms: 2500,
            star_brightness: 1.0,
            hidden_categories: BTreeSet::new(),
        }
    }
}

impl UpdateSettings {
    pub fn is_category_on(&self, category: Option<&str>) -> bool {
        category.map_or(true, |c| !self.hidden_categories.contains(c))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Nodes whose state was recomputed.
    pub processed: usize,
    /// Nodes turned away by their gate, subtrees not counted.
    pub skipped: usize,
    /// Nodes that failed and had their subtree skipped.
    pub faults: usize,
}

/// Do-not-process tags of gated nodes, plus the frame each node was last
/// updated in.
///
/// Written by the traversal. A node whose gate failed is tagged skipped. Any
/// node not updated in the current frame is stale: gated nodes and their
/// subtrees, subtrees below a node reached with zero opacity or switched off,
/// and faulted nodes with their subtrees.
#[derive(Clone, Debug, Default)]
pub struct ProcessTags {
    skipped: Vec<bool>,
    updated: Vec<u64>,
    frame: u64,
}

impl ProcessTags {
    fn begin_frame(&mut self) {
        self.frame += 1;
    }

    fn mark_updated(&mut self, id: NodeId) {
        if id.0 >= self.updated.len() {
            self.updated.resize(id.0 + 1, 0);
        }
        self.updated[id.0] = self.frame;
    }

    pub fn mark(&mut self, id: NodeId, skipped: bool) {
        if id.0 >= self.skipped.len() {
            if !skipped {
                return;
            }
            self.skipped.resize(id.0 + 1, false);
        }
        self.skipped[id.0] = skipped;
    }

    pub fn is_skipped(&self, id: NodeId) -> bool {
        self.skipped.get(id.0).copied().unwrap_or(false)
    }

    /// Whether `id` was not updated by the last traversal.
    pub fn is_stale(&self, id: NodeId) -> bool {
        self.frame == 0 || self.updated.get(id.0) != Some(&self.frame)
    }

    pub fn skipped(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.skipped
            .iter()
            .enumerate()
            .filter(|(_, skipped)| **skipped)
            .map(|(i, _)| NodeId(i))
    }

    pub fn clear(&mut self) {
        self.skipped.clear();
        self.updated.clear();
    }
}

/// Values shared by every node of one traversal.
#[derive(Clone, Copy, Debug)]
struct FrameContext {
    instant: SimInstant,
    hdiff: f64,
    session_ms: i64,
    camera_position: UniversalPos,
    fov_factor: f64,
    fade_ms: i64,
    star_brightness: f64,
}

/// State of one node for the current frame. Committed only once complete so
/// a failing node keeps its previous, coherent state.
struct NodeFrame {
    position: DVec3,
    position_spherical: Option<DVec2>,
    time_overflow: bool,
    rotation_angle: Option<f64>,
    fade_distance: Option<f64>,
    translation: UniversalPos,
    local_transform: DMat4,
    opacity: f32,
    distance_to_camera: f64,
    solid_angle: f64,
    solid_angle_apparent: f64,
}

impl NodeFrame {
    fn commit(self, node: &mut Node) {
        node.position = self.position;
        if let Some(spherical) = self.position_spherical {
            node.position_spherical = spherical;
        }
        node.time_overflow = self.time_overflow;
        if let (Some(angle), Some(rotation)) = (self.rotation_angle, node.rotation.as_mut()) {
            rotation.angle = angle;
        }
        if let (Some(distance), Some(fade)) = (self.fade_distance, node.fade.as_mut()) {
            fade.current_distance = distance;
        }
        node.translation = self.translation;
        node.local_transform = self.local_transform;
        node.opacity = self.opacity;
        node.distance_to_camera = self.distance_to_camera;
        node.solid_angle = self.solid_angle;
        node.solid_angle_apparent = self.solid_angle_apparent;
    }
}

/// Drives the scene graph once per frame.
#[derive(Debug, Default)]
pub struct GraphUpdater {
    pub settings: UpdateSettings,
    tags: ProcessTags,
    last_processed: usize,
}

impl GraphUpdater {
    pub fn new(settings: UpdateSettings) -> Self {
        Self {
            settings,
            tags: ProcessTags::default(),
            last_processed: 0,
        }
    }

    pub fn tags(&self) -> &ProcessTags {
        &self.tags
    }

    /// Updates the whole graph from its root.
    pub fn update<T, C>(&mut self, graph: &mut SceneGraph, time: &T, camera: &C) -> FrameStats
    where
        T: TimeFrame + ?Sized,
        C: Camera + ?Sized,
    {
        let mut stats = FrameStats::default();
        self.tags.begin_frame();
        let Some(root) = graph.root() else {
            return stats;
        };

        let ctx = FrameContext {
            instant: time.instant(),
            hdiff: time.hdiff(),
            session_ms: time.session_ms(),
            camera_position: camera.position(),
            fov_factor: camera.fov_factor(),
            fade_ms: self.settings.fade_ms,
            star_brightness: self.settings.star_brightness,
        };

        let origin = camera.inverse_position();
        if let Err(err) = self.update_node(graph, root, origin, 1.0, &ctx, &mut stats) {
            log::warn!("Scene graph root failed to update: {err}");
            stats.faults += 1;
        }

        if stats.processed != self.last_processed {
            log::debug!("Number of nodes (new): {}", stats.processed);
            self.last_processed = stats.processed;
            if log::log_enabled!(log::Level::Debug) {
                let mut count = 1;
                self.log_tree(graph, root, " ", 0, &mut count);
            }
        }

        stats
    }

    fn update_node(
        &mut self,
        graph: &mut SceneGraph,
        id: NodeId,
        parent_translation: UniversalPos,
        opacity: f32,
        ctx: &FrameContext,
        stats: &mut FrameStats,
    ) -> Result<(), GraphError> {
        let node = graph.node(id)?;

        if let Some(gate) = &node.gate {
            let input = GateInput {
                parent_solid_angle: node
                    .parent
                    .and_then(|parent| graph.node(parent).ok())
                    .map(|parent| parent.solid_angle),
                last_distance: node.distance_to_camera,
                opacity,
            };
            let passes = gate.passes(&input);
            self.tags.mark(id, !passes);
            if !passes {
                stats.skipped += 1;
                return Ok(());
            }
        }
        stats.processed += 1;

        let reference_distance = match node.fade.as_ref().map(|fade| fade.reference) {
            Some(FadeReference::Node(reference)) => Some(graph.node(reference)?.distance_to_camera),
            _ => None,
        };

        let frame = compute_frame(node, parent_translation, opacity, reference_distance, ctx)
            .map_err(|source| GraphError::Node {
                id,
                name: node.name.clone(),
                source: Box::new(source),
            })?;
        let translation = frame.translation;
        let own_opacity = frame.opacity;

        let node = &mut graph[id];
        frame.commit(node);
        self.tags.mark_updated(id);

        if opacity <= 0.0 || !self.settings.is_category_on(node.category.as_deref()) {
            return Ok(());
        }

        let child_opacity = match node.child_policy {
            ChildPolicy::Traverse => own_opacity,
            ChildPolicy::Overlay => 1.0 - own_opacity,
            ChildPolicy::SelfManaged => {
                if let Some(set) = node.aggregate.as_mut() {
                    set.update_members(
                        translation.as_dvec3(),
                        ctx.instant,
                        ctx.fov_factor,
                        ctx.star_brightness,
                    );
                }
                return Ok(());
            }
        };

        for i in 0..graph[id].children.len() {
            let child = graph[id].children[i];
            if let Err(err) =
                self.update_node(graph, child, translation, child_opacity, ctx, stats)
            {
                log::warn!("Skipping subtree this frame: {err}");
                stats.faults += 1;
            }
        }
        Ok(())
    }

    fn log_tree(&self, graph: &SceneGraph, id: NodeId, tab: &str, level: usize, count: &mut usize) {
        if self.tags.is_stale(id) {
            return;
        }
        let Ok(node) = graph.node(id) else {
            return;
        };
        log::debug!(
            "{}|{}:{}{} ({})",
            count,
            level,
            tab,
            node.name,
            node.children.len()
        );
        *count += 1;

        if node.child_policy != ChildPolicy::SelfManaged {
            let tab = format!("{tab}  ");
            for &child in &node.children {
                self.log_tree(graph, child, &tab, level + 1, count);
            }
        }
    }
}

fn compute_frame(
    node: &Node,
    parent_translation: UniversalPos,
    opacity: f32,
    reference_distance: Option<f64>,
    ctx: &FrameContext,
) -> Result<NodeFrame, GraphError> {
    // coordinates
    let mut position = node.position;
    let mut position_spherical = None;
    let mut time_overflow = node.time_overflow;
    if ctx.hdiff != 0.0 {
        if let Some(provider) = &node.coordinates {
            match provider.equatorial_cartesian(ctx.instant)? {
                Some(p) => {
                    position = p;
                    position_spherical = Some(cartesian_to_spherical_deg(p));
                    time_overflow = false;
                }
                None => time_overflow = true,
            }
        }
    }

    let rotation_angle = node.rotation.as_ref().map(|r| r.angle_at(ctx.instant));

    // translation
    let contribution = node.placement.contribution(&PlacementInput {
        position,
        size: node.size,
        parent_translation: parent_translation.as_dvec3(),
        instant: ctx.instant,
    });
    let mut translation = parent_translation
        .checked_add(contribution)
        .ok_or(GraphError::NonFinitePosition(contribution.to_array()))?;

    // opacity
    let mut fade_distance = None;
    let mut own_opacity = match node.fade.as_ref().filter(|fade| fade.is_active()) {
        Some(fade) => {
            fade.validate()?;
            let base = if fade.overrides_parent_opacity() { 1.0 } else { opacity };
            let distance = match fade.reference {
                FadeReference::Own => translation.length() * ctx.fov_factor,
                FadeReference::Node(_) => reference_distance.unwrap_or(0.0),
                FadeReference::Point(point) => {
                    (point - ctx.camera_position.as_dvec3()).length() * ctx.fov_factor
                }
            };
            fade_distance = Some(distance);
            fade.apply(base, distance)
        }
        None => opacity,
    };
    own_opacity *= node.visibility.opacity_factor(ctx.session_ms, ctx.fade_ms);

    // proper motion
    if let Some(pm) = &node.proper_motion {
        let offset = pm.offset_at(ctx.instant);
        translation = translation
            .checked_add(offset)
            .ok_or(GraphError::NonFinitePosition(offset.to_array()))?;
    }

    // derived metrics
    let camera_relative = translation.as_dvec3();
    let distance_to_camera = camera_relative.length();
    let (solid_angle, solid_angle_apparent) = match node.extent {
        Extent::Point { radius } => {
            let sa = point_solid_angle(radius, distance_to_camera);
            (sa, point_apparent(sa, ctx.star_brightness, ctx.fov_factor))
        }
        Extent::Model { model_size } => {
            let sa = model_solid_angle(node.size, model_size, distance_to_camera);
            (sa, model_apparent(sa, ctx.fov_factor))
        }
    };

    let local_transform = local_transform(node, camera_relative, rotation_angle);

    Ok(NodeFrame {
        position,
        position_spherical,
        time_overflow,
        rotation_angle,
        fade_distance,
        translation,
        local_transform,
        opacity: own_opacity,
        distance_to_camera,
        solid_angle,
        solid_angle_apparent,
    })
}

fn local_transform(node: &Node, camera_relative: DVec3, angle: Option<f64>) -> DMat4 {
    let mut transform = DMat4::from_translation(camera_relative);
    if let (Some(rotation), Some(angle)) = (&node.rotation, angle) {
        transform = transform
            * DMat4::from_rotation_y(rotation.ascending_node.to_radians())
            * DMat4::from_rotation_z((rotation.inclination + rotation.axial_tilt).to_radians())
            * DMat4::from_rotation_y(angle.to_radians());
    }
    transform * DMat4::from_scale(DVec3::splat(node.size))
}

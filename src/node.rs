//! Scene graph nodes and the arena that owns them.

use glam::{DMat4, DVec2, DVec3};

use crate::aggregate::PointSet;
use crate::coordinates::CoordinateProvider;
use crate::error::GraphError;
use crate::fade::{FadeConfig, Visibility};
use crate::rotation::RotationElements;
use crate::time::SimInstant;
use crate::units::MS_TO_Y;
use crate::UniversalPos;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

/// How a node measures its angular size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Extent {
    /// Meshes and other sized objects: `atan(size * model_size / distance)`.
    Model { model_size: f64 },
    /// Stars and particles: `radius / distance`.
    Point { radius: f64 },
}

impl Default for Extent {
    fn default() -> Self {
        Extent::Model { model_size: 1.0 }
    }
}

/// What a node hands down to its children.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChildPolicy {
    /// Children are traversed with this node's opacity.
    #[default]
    Traverse,
    /// Children are a replacement representation and get `1 - opacity`.
    Overlay,
    /// The node updates its members itself; the traversal does not descend.
    SelfManaged,
}

/// Inputs available to a placement strategy.
#[derive(Clone, Copy, Debug)]
pub struct PlacementInput {
    /// Local position, as last produced by the coordinate provider.
    pub position: DVec3,
    pub size: f64,
    /// Parent translation, camera-relative.
    pub parent_translation: DVec3,
    pub instant: SimInstant,
}

/// Position contribution a node adds to its parent's translation.
#[derive(Clone, Copy, Debug, Default)]
pub enum Placement {
    /// The node's own local position.
    #[default]
    Local,
    /// The local position plus a fixed offset.
    Offset(DVec3),
    /// A billboard anchor scaled by the node size.
    Billboard { anchor: DVec3 },
    Custom(fn(&PlacementInput) -> DVec3),
}

impl Placement {
    #[inline]
    pub fn contribution(&self, input: &PlacementInput) -> DVec3 {
        match *self {
            Placement::Local => input.position,
            Placement::Offset(offset) => input.position + offset,
            Placement::Billboard { anchor } => anchor * input.size,
            Placement::Custom(f) => f(input),
        }
    }
}

/// Inputs available to a must-update gate.
#[derive(Clone, Copy, Debug)]
pub struct GateInput {
    pub parent_solid_angle: Option<f64>,
    /// The node's distance to the camera as of its last update.
    pub last_distance: f64,
    /// Opacity handed in by the parent.
    pub opacity: f32,
}

/// Decides per frame whether a node and its subtree are processed.
#[derive(Clone, Copy, Debug)]
pub enum UpdateGate {
    /// Process only while the parent's solid angle exceeds `threshold`.
    ParentSolidAngle { threshold: f64 },
    Predicate(fn(&GateInput) -> bool),
}

impl UpdateGate {
    #[inline]
    pub fn passes(&self, input: &GateInput) -> bool {
        match *self {
            UpdateGate::ParentSolidAngle { threshold } => {
                input.parent_solid_angle.map_or(false, |sa| sa > threshold)
            }
            UpdateGate::Predicate(f) => f(input),
        }
    }
}

/// Linear proper motion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProperMotion {
    /// Scene units per Julian year.
    pub velocity: DVec3,
    /// Reference epoch in Julian days.
    pub epoch_jd: f64,
}

impl ProperMotion {
    #[inline]
    pub fn offset_at(&self, instant: SimInstant) -> DVec3 {
        self.velocity * (instant.ms_since_jd(self.epoch_jd) * MS_TO_Y)
    }
}

pub struct Node {
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,

    // static data
    pub size: f64,
    pub extent: Extent,
    pub placement: Placement,
    pub child_policy: ChildPolicy,
    pub gate: Option<UpdateGate>,
    /// Category that can be switched off as a whole, see
    /// [`crate::UpdateSettings::hidden_categories`].
    pub category: Option<String>,
    pub coordinates: Option<Box<dyn CoordinateProvider>>,
    pub rotation: Option<RotationElements>,
    pub fade: Option<FadeConfig>,
    pub proper_motion: Option<ProperMotion>,
    pub visibility: Visibility,
    pub aggregate: Option<PointSet>,

    // per-frame state
    /// Local position relative to the parent.
    pub position: DVec3,
    /// Right ascension and declination of `position`, in degrees.
    pub position_spherical: DVec2,
    /// The coordinate provider had no data for the current instant.
    pub time_overflow: bool,
    /// Camera-relative translation.
    pub translation: UniversalPos,
    pub local_transform: DMat4,
    pub opacity: f32,
    pub distance_to_camera: f64,
    pub solid_angle: f64,
    pub solid_angle_apparent: f64,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            size: 1.0,
            extent: Extent::default(),
            placement: Placement::default(),
            child_policy: ChildPolicy::default(),
            gate: None,
            category: None,
            coordinates: None,
            rotation: None,
            fade: None,
            proper_motion: None,
            visibility: Visibility::default(),
            aggregate: None,
            position: DVec3::ZERO,
            position_spherical: DVec2::ZERO,
            time_overflow: false,
            translation: UniversalPos::default(),
            local_transform: DMat4::IDENTITY,
            opacity: 0.0,
            distance_to_camera: 0.0,
            solid_angle: 0.0,
            solid_angle_apparent: 0.0,
        }
    }

    pub fn with_position(mut self, position: DVec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_extent(mut self, extent: Extent) -> Self {
        self.extent = extent;
        self
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn with_child_policy(mut self, policy: ChildPolicy) -> Self {
        self.child_policy = policy;
        self
    }

    pub fn with_gate(mut self, gate: UpdateGate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_coordinates(mut self, provider: impl CoordinateProvider + 'static) -> Self {
        self.coordinates = Some(Box::new(provider));
        self
    }

    pub fn with_rotation(mut self, rotation: RotationElements) -> Self {
        self.rotation = Some(rotation);
        self
    }

    pub fn with_fade(mut self, fade: FadeConfig) -> Self {
        self.fade = Some(fade);
        self
    }

    pub fn with_proper_motion(mut self, proper_motion: ProperMotion) -> Self {
        self.proper_motion = Some(proper_motion);
        self
    }

    pub fn with_visibility(mut self, visible: bool) -> Self {
        self.visibility = Visibility::new(visible);
        self
    }

    pub fn with_aggregate(mut self, set: PointSet) -> Self {
        self.aggregate = Some(set);
        self.child_policy = ChildPolicy::SelfManaged;
        self
    }

    /// Toggles visibility, starting a crossfade at session time `now_ms`.
    pub fn set_visible(&mut self, visible: bool, now_ms: i64) -> bool {
        self.visibility.set_visible(visible, now_ms)
    }
}

/// Arena of nodes forming one tree.
///
/// Every node has at most one traversal parent. Other groupings may hold
/// [`NodeId`]s to the same nodes.
#[derive(Default)]
pub struct SceneGraph {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a detached node. The first node added becomes the root.
    pub fn add(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        if self.root.is_none() {
            self.root = Some(id);
        }
        id
    }

    pub fn add_child(&mut self, parent: NodeId, node: Node) -> Result<NodeId, GraphError> {
        self.node(parent)?;
        let id = self.add(node);
        self.attach(parent, id)?;
        Ok(id)
    }

    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<(), GraphError> {
        self.node(parent)?;
        if let Some(existing) = self.node(child)?.parent {
            return Err(GraphError::AlreadyAttached {
                child,
                parent: existing,
            });
        }
        if Some(child) == self.root {
            return Err(GraphError::Cycle { child, parent });
        }

        let mut ancestor = Some(parent);
        while let Some(current) = ancestor {
            if current == child {
                return Err(GraphError::Cycle { child, parent });
            }
            ancestor = self.nodes[current.0].parent;
        }

        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, root: NodeId) -> Result<(), GraphError> {
        self.node(root)?;
        self.root = Some(root);
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.nodes.get(id.0).ok_or(GraphError::UnknownNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        self.nodes.get_mut(id.0).ok_or(GraphError::UnknownNode(id))
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.name == name).map(NodeId)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Ids of `id` and all of its descendants, in pre-order.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(node) = self.nodes.get(current.0) else {
                continue;
            };
            out.push(current);
            stack.extend(node.children.iter().rev());
        }
        out
    }
}

impl std::ops::Index<NodeId> for SceneGraph {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

impl std::ops::IndexMut<NodeId> for SceneGraph {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }
}

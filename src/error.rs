use crate::node::NodeId;

/// Errors raised while building or updating a scene graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The id does not refer to a node of this graph.
    #[error("unknown node {0:?}")]
    UnknownNode(NodeId),

    /// A node can only have one traversal parent.
    #[error("node {child:?} is already attached to {parent:?}")]
    AlreadyAttached { child: NodeId, parent: NodeId },

    /// Attaching would make a node its own ancestor.
    #[error("attaching {child:?} to {parent:?} would create a cycle")]
    Cycle { child: NodeId, parent: NodeId },

    /// A coordinate provider failed to produce a position.
    #[error("coordinate provider failed: {0}")]
    Coordinates(String),

    /// Fade ranges or opacity maps that cannot be evaluated.
    #[error("malformed fade configuration: {0}")]
    MalformedFade(String),

    /// A position contribution that cannot be added to a translation.
    #[error("non-finite position {0:?}")]
    NonFinitePosition([f64; 3]),

    /// A fault in one node, tagged with the node.
    #[error("node {name:?} ({id:?}): {source}")]
    Node {
        id: NodeId,
        name: String,
        #[source]
        source: Box<GraphError>,
    },

    /// A scene description that could not be parsed.
    #[error("scene description error: {0}")]
    Description(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

//! The host scene graph, as seen from the physics layer.
//!
//! The World never owns scene nodes. It reads and writes them through this
//! trait, identified by host-chosen [`NodeId`]s.

use serde::{Deserialize, Serialize};

/// Host-chosen identity of a scene node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

/// Access to the host's retained-mode scene graph.
///
/// Positions are scene pixels (y down), rotations radians.
pub trait SceneGraph {
    /// Position of a node, or `None` if the node doesn't exist.
    fn position(&self, node: NodeId) -> Option<(f32, f32)>;

    /// Moves a node.
    fn set_position(&mut self, node: NodeId, x: f32, y: f32);

    /// Rotation of a node.
    fn rotation(&self, node: NodeId) -> f32;

    /// Rotates a node.
    fn set_rotation(&mut self, node: NodeId, rotation: f32);

    /// Direct children of a node.
    fn children(&self, node: NodeId) -> &[NodeId];

    /// Checks if the node is a composite group. Groups never get a body
    /// themselves; their children do.
    fn is_group(&self, node: NodeId) -> bool;

    /// Moves the node's local pivot to its center.
    fn center_pivot(&mut self, node: NodeId);

    /// Size of the node in pixels, used for the default rectangle shape.
    fn size(&self, _node: NodeId) -> Option<(f32, f32)> {
        None
    }
}

/// A scene with no nodes, for worlds that only hold standalone bodies.
#[derive(Clone, Copy, Debug, Default)]
pub struct Detached;

impl SceneGraph for Detached {
    fn position(&self, _node: NodeId) -> Option<(f32, f32)> {
        None
    }

    fn set_position(&mut self, _node: NodeId, _x: f32, _y: f32) {}

    fn rotation(&self, _node: NodeId) -> f32 {
        0.0
    }

    fn set_rotation(&mut self, _node: NodeId, _rotation: f32) {}

    fn children(&self, _node: NodeId) -> &[NodeId] {
        &[]
    }

    fn is_group(&self, _node: NodeId) -> bool {
        false
    }

    fn center_pivot(&mut self, _node: NodeId) {}
}

/// What `World::enable` should create bodies for.
#[derive(Clone, Copy, Debug)]
pub enum EnableTarget<'a> {
    /// One node, or a group whose children get bodies.
    Node(NodeId),
    /// Several nodes. Order of creation is unspecified.
    Nodes(&'a [NodeId]),
}

impl From<NodeId> for EnableTarget<'_> {
    fn from(node: NodeId) -> Self {
        Self::Node(node)
    }
}

impl<'a> From<&'a [NodeId]> for EnableTarget<'a> {
    fn from(nodes: &'a [NodeId]) -> Self {
        Self::Nodes(nodes)
    }
}

impl<'a> From<&'a Vec<NodeId>> for EnableTarget<'a> {
    fn from(nodes: &'a Vec<NodeId>) -> Self {
        Self::Nodes(nodes)
    }
}

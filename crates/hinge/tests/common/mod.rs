//! In-memory scene graph shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;

use hinge::{NodeId, SceneGraph};

#[derive(Clone, Debug, Default)]
pub struct TestNode {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub children: Vec<NodeId>,
    pub group: bool,
    pub size: Option<(f32, f32)>,
    pub centered: bool,
}

#[derive(Debug, Default)]
pub struct TestScene {
    nodes: HashMap<NodeId, TestNode>,
    next: u64,
}

impl TestScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self, x: f32, y: f32) -> NodeId {
        self.insert(TestNode {
            x,
            y,
            ..TestNode::default()
        })
    }

    pub fn spawn_sized(&mut self, x: f32, y: f32, width: f32, height: f32) -> NodeId {
        self.insert(TestNode {
            x,
            y,
            size: Some((width, height)),
            ..TestNode::default()
        })
    }

    pub fn spawn_group(&mut self, children: Vec<NodeId>) -> NodeId {
        self.insert(TestNode {
            children,
            group: true,
            ..TestNode::default()
        })
    }

    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.push(child);
        }
    }

    pub fn node(&self, id: NodeId) -> &TestNode {
        &self.nodes[&id]
    }

    fn insert(&mut self, node: TestNode) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        self.nodes.insert(id, node);
        id
    }
}

impl SceneGraph for TestScene {
    fn position(&self, node: NodeId) -> Option<(f32, f32)> {
        self.nodes.get(&node).map(|n| (n.x, n.y))
    }

    fn set_position(&mut self, node: NodeId, x: f32, y: f32) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.x = x;
            n.y = y;
        }
    }

    fn rotation(&self, node: NodeId) -> f32 {
        self.nodes.get(&node).map_or(0.0, |n| n.rotation)
    }

    fn set_rotation(&mut self, node: NodeId, rotation: f32) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.rotation = rotation;
        }
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes.get(&node).map_or(&[], |n| n.children.as_slice())
    }

    fn is_group(&self, node: NodeId) -> bool {
        self.nodes.get(&node).is_some_and(|n| n.group)
    }

    fn center_pivot(&mut self, node: NodeId) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.centered = true;
        }
    }

    fn size(&self, node: NodeId) -> Option<(f32, f32)> {
        self.nodes.get(&node).and_then(|n| n.size)
    }
}

pub fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

//! # Body Registry
//!
//! Owns every wrapper body, the active set, the pending-removal queue and
//! the two side tables that map kernel bodies and scene nodes back to
//! wrappers.
//!
//! ## Lifecycle
//!
//! ```text
//! create ──> created ──add──> active ──schedule_removal──> pending
//!               ^               │                            │
//!               │               remove_immediate             drain (frame boundary)
//!               └───────────────┴────────────────────────────┘
//! ```
//!
//! `add` on a pending body cancels the pending removal.

use std::collections::HashMap;

use hinge_core::{Arena, BodyDef, Kernel, KernelBodyId, Shape, ShapeKind, Vec2};

use crate::body::{Body, BodyContact, BodyHandle, BodyRef, ImpactContact, PendingRemovals, SceneState};
use crate::coords::{point_to_kernel, point_to_scene, to_kernel};
use crate::scene::{NodeId, SceneGraph};

/// Wrapper bodies and their bookkeeping.
#[derive(Debug, Default)]
pub struct BodyRegistry {
    bodies: Arena<Body>,
    active: Vec<BodyHandle>,
    by_kernel: HashMap<KernelBodyId, BodyHandle>,
    by_node: HashMap<NodeId, BodyHandle>,
    groups: HashMap<NodeId, Vec<NodeId>>,
    pending: PendingRemovals,
}

impl BodyRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a kernel body and its wrapper. The body is not added.
    pub fn create<K: Kernel>(&mut self, kernel: &mut K, position: Vec2, mass: f32, node: Option<NodeId>) -> BodyHandle {
        let kernel_id = kernel.create_body(BodyDef::new(position, 0.0, mass));
        let handle = self.bodies.insert(Body::new(kernel_id, node));
        self.by_kernel.insert(kernel_id, handle);
        if let Some(node) = node {
            self.by_node.insert(node, handle);
        }
        handle
    }

    /// Creates a body for a scene node at the node's position, mass 1,
    /// with a rectangle the size of the node when the scene knows it.
    ///
    /// Returns `None` if the node already has a body or isn't in the scene.
    pub fn create_for_node<K: Kernel, S: SceneGraph>(
        &mut self,
        kernel: &mut K,
        scene: &mut S,
        node: NodeId,
        debug: bool,
    ) -> Option<BodyHandle> {
        if self.by_node.contains_key(&node) {
            return None;
        }
        let Some((x, y)) = scene.position(node) else {
            tracing::warn!("Cannot enable {:?}, node is not in the scene", node);
            return None;
        };

        let rotation = scene.rotation(node);
        let handle = self.create(kernel, point_to_kernel(x, y), 1.0, Some(node));
        if let Some(body) = self.bodies.get_mut(handle) {
            body.debug = debug;
            body.synced = Some(SceneState { x, y, rotation });
            if let Some(kernel_body) = kernel.body_mut(body.kernel_id) {
                kernel_body.angle = rotation;
                if let Some((width, height)) = scene.size(node) {
                    kernel_body.add_shape(Shape::new(ShapeKind::Rectangle {
                        width: to_kernel(width),
                        height: to_kernel(height),
                    }));
                }
            }
        }
        scene.center_pivot(node);
        Some(handle)
    }

    /// Gets a wrapper.
    #[must_use]
    pub fn get(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle)
    }

    /// Gets a wrapper mutably.
    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(handle)
    }

    /// Number of wrappers, in the simulation or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Checks if there are no wrappers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Wrapper of a kernel body.
    #[must_use]
    pub fn wrapper_of(&self, kernel_id: KernelBodyId) -> Option<BodyHandle> {
        self.by_kernel.get(&kernel_id).copied()
    }

    /// Wrapper attached to a scene node.
    #[must_use]
    pub fn node_body(&self, node: NodeId) -> Option<BodyHandle> {
        self.by_node.get(&node).copied()
    }

    /// Remembers the top-level children of a composite group node.
    pub fn record_group(&mut self, group: NodeId, children: &[NodeId]) {
        self.groups.insert(group, children.to_vec());
    }

    /// Top-level children of a group node seen by `enable`.
    #[must_use]
    pub fn group_members(&self, group: NodeId) -> Option<&[NodeId]> {
        self.groups.get(&group).map(Vec::as_slice)
    }

    /// Resolves any body reference to a live wrapper.
    #[must_use]
    pub fn resolve(&self, body: BodyRef) -> Option<BodyHandle> {
        let handle = match body {
            BodyRef::Native(kernel_id) => self.wrapper_of(kernel_id)?,
            BodyRef::Wrapper(handle) => handle,
            BodyRef::Node(node) => self.node_body(node)?,
        };
        self.bodies.contains(handle).then_some(handle)
    }

    /// Resolves any body reference to a live kernel body. Native bodies
    /// resolve without a wrapper.
    #[must_use]
    pub fn resolve_kernel<K: Kernel>(&self, kernel: &K, body: BodyRef) -> Option<KernelBodyId> {
        let kernel_id = match body {
            BodyRef::Native(kernel_id) => kernel_id,
            other => self.bodies.get(self.resolve(other)?)?.kernel_id,
        };
        kernel.body(kernel_id).is_some().then_some(kernel_id)
    }

    /// Checks if the body is in this kernel's simulation.
    #[must_use]
    pub fn is_owned<K: Kernel>(&self, kernel: &K, handle: BodyHandle) -> bool {
        self.bodies
            .get(handle)
            .is_some_and(|b| kernel.contains_body(b.kernel_id))
    }

    /// Adds a body to the simulation and the active set.
    ///
    /// A queued removal of the body is cancelled either way. Returns
    /// `false` if the body is already simulated or the handle is stale.
    pub fn add<K: Kernel>(&mut self, kernel: &mut K, handle: BodyHandle) -> bool {
        let Some(body) = self.bodies.get(handle) else {
            return false;
        };
        self.pending.cancel(handle);
        if kernel.contains_body(body.kernel_id) {
            return false;
        }

        if !kernel.add_body(body.kernel_id) {
            return false;
        }
        if !self.active.contains(&handle) {
            self.active.push(handle);
        }
        true
    }

    /// Takes a body out of the simulation and the active set now.
    ///
    /// Returns `false` if it wasn't simulated.
    pub fn remove_immediate<K: Kernel>(&mut self, kernel: &mut K, handle: BodyHandle) -> bool {
        let Some(body) = self.bodies.get_mut(handle) else {
            return false;
        };
        if !kernel.remove_body(body.kernel_id) {
            return false;
        }
        body.debug = false;
        self.active.retain(|&h| h != handle);
        true
    }

    /// Queues a body for removal at the next frame boundary.
    pub fn schedule_removal(&mut self, handle: BodyHandle) -> bool {
        self.pending.push(handle)
    }

    /// Removes every queued body. Returns the ones that left the simulation.
    pub fn drain_removals<K: Kernel>(&mut self, kernel: &mut K) -> Vec<BodyHandle> {
        let queued = self.pending.take();
        queued
            .into_iter()
            .filter(|&handle| self.remove_immediate(kernel, handle))
            .collect()
    }

    /// The removal queue.
    #[must_use]
    pub fn pending(&self) -> &PendingRemovals {
        &self.pending
    }

    /// Bodies added through the World, insertion order.
    #[must_use]
    pub fn active(&self) -> &[BodyHandle] {
        &self.active
    }

    /// Frees a wrapper and its kernel body.
    pub fn destroy<K: Kernel>(&mut self, kernel: &mut K, handle: BodyHandle) -> bool {
        self.remove_immediate(kernel, handle);
        self.pending.cancel(handle);
        let Some(body) = self.bodies.remove(handle) else {
            return false;
        };
        self.by_kernel.remove(&body.kernel_id);
        if let Some(node) = body.node {
            self.by_node.remove(&node);
        }
        kernel.destroy_body(body.kernel_id);
        true
    }

    /// Forgets the active set and the removal queue. Wrappers and their
    /// node attachments survive.
    pub fn clear(&mut self) {
        for &handle in &self.active {
            if let Some(body) = self.bodies.get_mut(handle) {
                body.debug = false;
            }
        }
        self.active.clear();
        self.pending.clear();
    }

    // =========================================================================
    // Frame hooks
    // =========================================================================

    /// Pushes scene state into the kernel for every active body whose node
    /// moved since the last exchange.
    pub fn push_scene_state<K: Kernel, S: SceneGraph>(&mut self, kernel: &mut K, scene: &S) {
        for &handle in &self.active {
            let Some(body) = self.bodies.get_mut(handle) else {
                continue;
            };
            let Some(node) = body.node else {
                continue;
            };
            let Some((x, y)) = scene.position(node) else {
                continue;
            };
            let state = SceneState {
                x,
                y,
                rotation: scene.rotation(node),
            };
            if body.synced == Some(state) {
                continue;
            }

            if let Some(kernel_body) = kernel.body_mut(body.kernel_id) {
                kernel_body.position = point_to_kernel(x, y);
                if !body.fixed_rotation {
                    kernel_body.angle = state.rotation;
                }
            }
            body.synced = Some(state);
        }
    }

    /// Pulls kernel state back into the scene for every active body.
    pub fn pull_kernel_state<K: Kernel, S: SceneGraph>(&mut self, kernel: &K, scene: &mut S) {
        for &handle in &self.active {
            let Some(body) = self.bodies.get_mut(handle) else {
                continue;
            };
            let (Some(node), Some(kernel_body)) = (body.node, kernel.body(body.kernel_id)) else {
                continue;
            };

            let (x, y) = point_to_scene(kernel_body.position);
            scene.set_position(node, x, y);
            let rotation = if body.fixed_rotation {
                scene.rotation(node)
            } else {
                scene.set_rotation(node, kernel_body.angle);
                kernel_body.angle
            };
            body.synced = Some(SceneState { x, y, rotation });
        }
    }

    // =========================================================================
    // Callback dispatch
    // =========================================================================

    /// Runs a body's begin- or end-contact listeners.
    pub(crate) fn dispatch_contact(&mut self, begin: bool, contact: &BodyContact) {
        let Some(body) = self.bodies.get_mut(contact.this) else {
            return;
        };
        let listeners = if begin {
            &mut body.begin_contact
        } else {
            &mut body.end_contact
        };
        for listener in listeners.iter_mut() {
            listener(contact, &mut self.pending);
        }
    }

    /// Runs at most one body-keyed and one group-keyed impact callback.
    pub(crate) fn dispatch_impact(&mut self, contact: &ImpactContact, other_group: u32) {
        let Some(body) = self.bodies.get_mut(contact.this) else {
            return;
        };
        if let Some(callback) = body.body_callbacks.get_mut(&contact.other) {
            callback(contact, &mut self.pending);
        }
        if let Some(callback) = body.group_callbacks.get_mut(&other_group) {
            callback(contact, &mut self.pending);
        }
    }
}

//! # Wrapper Bodies
//!
//! A [`Body`] unites one kernel body with its scene node and its callback
//! tables. The kernel never learns about wrappers: the mapping from kernel
//! body to wrapper lives in the registry's side table.
//!
//! Per-body operations that need the kernel are methods on `World`, taking
//! a [`BodyHandle`].

use std::collections::HashMap;

use hinge_core::{
    BodyType, ContactEquation, Handle, Kernel, KernelBodyId, Shape, ShapeKind, ShapeRef, Vec2,
};

use crate::collision::CollisionGroup;
use crate::coords::{point_to_kernel, point_to_scene, to_kernel, to_kernel_inverted, to_scene_inverted};
use crate::events::WorldEvent;
use crate::scene::NodeId;
use crate::world::World;

/// Identity of a wrapper body.
pub type BodyHandle = Handle<Body>;

/// Any of the three ways a caller can name a body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BodyRef {
    /// A kernel body, wrapped or not.
    Native(KernelBodyId),
    /// A wrapper body.
    Wrapper(BodyHandle),
    /// A scene node carrying a wrapper body.
    Node(NodeId),
}

impl From<KernelBodyId> for BodyRef {
    fn from(id: KernelBodyId) -> Self {
        Self::Native(id)
    }
}

impl From<BodyHandle> for BodyRef {
    fn from(handle: BodyHandle) -> Self {
        Self::Wrapper(handle)
    }
}

impl From<NodeId> for BodyRef {
    fn from(node: NodeId) -> Self {
        Self::Node(node)
    }
}

/// Arguments of a per-body contact listener.
///
/// Field order is the listener's argument order: the peer first, the
/// listening body last.
#[derive(Clone, Debug, PartialEq)]
pub struct BodyContact {
    /// The other body, if it has a wrapper.
    pub other: Option<BodyHandle>,
    /// The other body's shape.
    pub other_shape: ShapeRef,
    /// The listening body.
    pub this: BodyHandle,
    /// The listening body's shape.
    pub this_shape: ShapeRef,
    /// Contact equations. Empty for end-contact.
    pub equations: Vec<ContactEquation>,
}

/// Arguments of an impact callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImpactContact {
    /// The body owning the callback.
    pub this: BodyHandle,
    /// The body it hit.
    pub other: BodyHandle,
    /// Shape of the owning body.
    pub this_shape: ShapeRef,
    /// Shape of the body it hit.
    pub other_shape: ShapeRef,
}

/// Per-body begin/end contact listener.
pub type ContactCallback = Box<dyn FnMut(&BodyContact, &mut PendingRemovals)>;

/// Per-body impact callback.
pub type ImpactCallback = Box<dyn FnMut(&ImpactContact, &mut PendingRemovals)>;

/// Bodies waiting for removal at the next frame boundary.
///
/// Callbacks get this instead of the World, so the only structural edit
/// they can make is a deferred one.
#[derive(Debug, Default)]
pub struct PendingRemovals {
    queue: Vec<BodyHandle>,
}

impl PendingRemovals {
    /// Creates an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self { queue: Vec::new() }
    }

    /// Queues a body. Returns `false` if it was already queued.
    pub fn push(&mut self, body: BodyHandle) -> bool {
        if self.queue.contains(&body) {
            return false;
        }
        self.queue.push(body);
        true
    }

    /// Takes a body back out of the queue. Returns `true` if it was queued.
    pub fn cancel(&mut self, body: BodyHandle) -> bool {
        let before = self.queue.len();
        self.queue.retain(|&b| b != body);
        self.queue.len() != before
    }

    /// Checks if a body is queued.
    #[must_use]
    pub fn contains(&self, body: BodyHandle) -> bool {
        self.queue.contains(&body)
    }

    /// Number of queued bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Checks if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Empties the queue, returning its contents in queue order.
    pub fn take(&mut self) -> Vec<BodyHandle> {
        std::mem::take(&mut self.queue)
    }

    /// Drops everything queued.
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

/// Scene state as last exchanged with the kernel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct SceneState {
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
}

/// A wrapper body.
pub struct Body {
    pub(crate) kernel_id: KernelBodyId,
    pub(crate) node: Option<NodeId>,
    pub(crate) debug: bool,
    pub(crate) fixed_rotation: bool,
    pub(crate) synced: Option<SceneState>,
    pub(crate) collision_group: Option<CollisionGroup>,
    pub(crate) collides_with: u32,
    pub(crate) collision_mask: Option<u32>,
    pub(crate) begin_contact: Vec<ContactCallback>,
    pub(crate) end_contact: Vec<ContactCallback>,
    pub(crate) body_callbacks: HashMap<BodyHandle, ImpactCallback>,
    pub(crate) group_callbacks: HashMap<u32, ImpactCallback>,
}

impl Body {
    pub(crate) fn new(kernel_id: KernelBodyId, node: Option<NodeId>) -> Self {
        Self {
            kernel_id,
            node,
            debug: false,
            fixed_rotation: false,
            synced: None,
            collision_group: None,
            collides_with: 0,
            collision_mask: None,
            begin_contact: Vec::new(),
            end_contact: Vec::new(),
            body_callbacks: HashMap::new(),
            group_callbacks: HashMap::new(),
        }
    }

    /// The kernel body this wrapper drives.
    #[inline]
    #[must_use]
    pub const fn kernel_id(&self) -> KernelBodyId {
        self.kernel_id
    }

    /// The scene node this body is attached to, if any.
    #[inline]
    #[must_use]
    pub const fn node(&self) -> Option<NodeId> {
        self.node
    }

    /// Debug flag.
    #[inline]
    #[must_use]
    pub const fn debug(&self) -> bool {
        self.debug
    }

    /// Collision group last assigned to every shape.
    #[must_use]
    pub const fn collision_group(&self) -> Option<CollisionGroup> {
        self.collision_group
    }

    /// Groups added with `collides`.
    #[must_use]
    pub const fn collides_with(&self) -> u32 {
        self.collides_with
    }

    /// Mask set on every shape by the last group assignment.
    #[must_use]
    pub const fn collision_mask(&self) -> Option<u32> {
        self.collision_mask
    }

    /// Applies this body's group and mask to a new shape.
    fn filter(&self, mut shape: Shape) -> Shape {
        if let Some(group) = self.collision_group {
            shape.collision_group = group.mask();
        }
        match self.collision_mask {
            Some(mask) => shape.collision_mask = mask,
            None => shape.collision_mask |= self.collides_with,
        }
        shape
    }
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Body")
            .field("kernel_id", &self.kernel_id)
            .field("node", &self.node)
            .field("debug", &self.debug)
            .field("collision_group", &self.collision_group)
            .field("begin_contact", &self.begin_contact.len())
            .field("end_contact", &self.end_contact.len())
            .field("body_callbacks", &self.body_callbacks.len())
            .field("group_callbacks", &self.group_callbacks.len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Per-body operations
// =============================================================================

impl<K: Kernel> World<K> {
    /// Creates a standalone body at a scene position.
    ///
    /// # Arguments
    ///
    /// * `x`, `y` - Scene position in pixels
    /// * `mass` - Zero makes the body static
    /// * `add_to_world` - Add it to the simulation right away
    pub fn create_body(&mut self, x: f32, y: f32, mass: f32, add_to_world: bool) -> BodyHandle {
        let handle = self.registry.create(&mut self.kernel, point_to_kernel(x, y), mass, None);
        if add_to_world {
            self.add_body(handle);
        }
        handle
    }

    /// Frees a body. Removes it from the simulation first.
    ///
    /// Returns `false` if the handle is stale.
    pub fn destroy_body(&mut self, body: BodyHandle) -> bool {
        if self.registry.remove_immediate(&mut self.kernel, body) {
            self.emit(WorldEvent::BodyRemoved(body));
        }
        self.registry.destroy(&mut self.kernel, body)
    }

    /// Gets a wrapper body.
    #[must_use]
    pub fn body(&self, body: BodyHandle) -> Option<&Body> {
        self.registry.get(body)
    }

    /// Sets the debug flag of a body.
    pub fn set_debug(&mut self, body: BodyHandle, debug: bool) {
        if let Some(b) = self.registry.get_mut(body) {
            b.debug = debug;
        }
    }

    // =========================================================================
    // Shapes
    // =========================================================================

    fn add_shape(&mut self, body: BodyHandle, kind: ShapeKind, offset_x: f32, offset_y: f32, rotation: f32) -> Option<ShapeRef> {
        let wrapper = self.registry.get(body)?;
        let shape = wrapper.filter(
            Shape::new(kind)
                .with_offset(point_to_kernel(offset_x, offset_y))
                .with_angle(rotation),
        );
        let kernel_id = wrapper.kernel_id;
        let index = self.kernel.body_mut(kernel_id)?.add_shape(shape);
        Some(ShapeRef::new(kernel_id, index))
    }

    /// Adds a circle of the given pixel radius.
    pub fn add_circle(&mut self, body: BodyHandle, radius: f32, offset_x: f32, offset_y: f32, rotation: f32) -> Option<ShapeRef> {
        let kind = ShapeKind::Circle {
            radius: to_kernel(radius),
        };
        self.add_shape(body, kind, offset_x, offset_y, rotation)
    }

    /// Adds a rectangle of the given pixel size.
    pub fn add_rectangle(
        &mut self,
        body: BodyHandle,
        width: f32,
        height: f32,
        offset_x: f32,
        offset_y: f32,
        rotation: f32,
    ) -> Option<ShapeRef> {
        let kind = ShapeKind::Rectangle {
            width: to_kernel(width),
            height: to_kernel(height),
        };
        self.add_shape(body, kind, offset_x, offset_y, rotation)
    }

    /// Adds an infinite plane.
    pub fn add_plane(&mut self, body: BodyHandle, offset_x: f32, offset_y: f32, rotation: f32) -> Option<ShapeRef> {
        self.add_shape(body, ShapeKind::Plane, offset_x, offset_y, rotation)
    }

    /// Adds a zero-size particle.
    pub fn add_particle(&mut self, body: BodyHandle, offset_x: f32, offset_y: f32, rotation: f32) -> Option<ShapeRef> {
        self.add_shape(body, ShapeKind::Particle, offset_x, offset_y, rotation)
    }

    // =========================================================================
    // Motion
    // =========================================================================

    /// Scene position of a body.
    #[must_use]
    pub fn body_position(&self, body: BodyHandle) -> Option<(f32, f32)> {
        let kernel_id = self.registry.get(body)?.kernel_id;
        self.kernel.body(kernel_id).map(|b| point_to_scene(b.position))
    }

    /// Moves a body to a scene position.
    pub fn set_body_position(&mut self, body: BodyHandle, x: f32, y: f32) {
        if let Some(b) = self.kernel_body_mut(body) {
            b.position = point_to_kernel(x, y);
        }
    }

    /// Scene velocity of a body, pixels per second.
    #[must_use]
    pub fn body_velocity(&self, body: BodyHandle) -> Option<(f32, f32)> {
        let kernel_id = self.registry.get(body)?.kernel_id;
        self.kernel
            .body(kernel_id)
            .map(|b| (to_scene_inverted(b.velocity.x), to_scene_inverted(b.velocity.y)))
    }

    /// Sets the scene velocity of a body, pixels per second.
    pub fn set_body_velocity(&mut self, body: BodyHandle, x: f32, y: f32) {
        if let Some(b) = self.kernel_body_mut(body) {
            b.velocity = Vec2::new(to_kernel_inverted(x), to_kernel_inverted(y));
        }
    }

    /// Rotation of a body in radians.
    #[must_use]
    pub fn body_rotation(&self, body: BodyHandle) -> Option<f32> {
        let kernel_id = self.registry.get(body)?.kernel_id;
        self.kernel.body(kernel_id).map(|b| b.angle)
    }

    /// Rotates a body.
    pub fn set_body_rotation(&mut self, body: BodyHandle, rotation: f32) {
        if let Some(b) = self.kernel_body_mut(body) {
            b.angle = rotation;
        }
    }

    /// Stops the body from writing its rotation back into the scene.
    pub fn set_fixed_rotation(&mut self, body: BodyHandle, fixed: bool) {
        if let Some(b) = self.registry.get_mut(body) {
            b.fixed_rotation = fixed;
        }
        if let Some(b) = self.kernel_body_mut(body) {
            b.angular_velocity = 0.0;
        }
    }

    /// Switches a body between static and dynamic.
    pub fn set_static(&mut self, body: BodyHandle, is_static: bool) {
        if let Some(b) = self.kernel_body_mut(body) {
            if is_static {
                b.body_type = BodyType::Static;
                b.velocity = Vec2::ZERO;
                b.angular_velocity = 0.0;
            } else if b.mass > 0.0 {
                b.body_type = BodyType::Dynamic;
            } else {
                b.mass = 1.0;
                b.body_type = BodyType::Dynamic;
            }
        }
    }

    /// Checks if a body is static.
    #[must_use]
    pub fn is_static(&self, body: BodyHandle) -> bool {
        self.registry
            .get(body)
            .and_then(|b| self.kernel.body(b.kernel_id))
            .is_some_and(|b| b.body_type == BodyType::Static)
    }

    fn kernel_body_mut(&mut self, body: BodyHandle) -> Option<&mut hinge_core::KernelBody> {
        let kernel_id = self.registry.get(body)?.kernel_id;
        self.kernel.body_mut(kernel_id)
    }

    // =========================================================================
    // Collision filtering
    // =========================================================================

    /// Puts every shape of the target into `group`.
    ///
    /// This resets the shapes' collision masks as well as their groups: the
    /// new mask holds only the groups added with [`World::collides`], plus
    /// the bounds group while the walls use their own. A group node applies
    /// the group to each of its top-level children that has a body.
    ///
    /// Returns `false` if no body got the group.
    pub fn set_collision_group(&mut self, target: impl Into<BodyRef>, group: CollisionGroup) -> bool {
        let target = target.into();
        if let BodyRef::Node(node) = target {
            if let Some(members) = self.registry.group_members(node) {
                let handles: Vec<_> = members.iter().filter_map(|&child| self.registry.node_body(child)).collect();
                let mut applied = false;
                for handle in handles {
                    applied |= self.apply_collision_group(handle, group);
                }
                return applied;
            }
        }

        let Some(handle) = self.registry.resolve(target) else {
            tracing::warn!("Cannot set collision group, invalid body given: {:?}", target);
            return false;
        };
        self.apply_collision_group(handle, group)
    }

    fn apply_collision_group(&mut self, handle: BodyHandle, group: CollisionGroup) -> bool {
        let bounds = if self.bounds.config().own_group {
            CollisionGroup::BOUNDS.mask()
        } else {
            0
        };
        let Some(wrapper) = self.registry.get_mut(handle) else {
            return false;
        };
        let mask = wrapper.collides_with | bounds;
        wrapper.collision_group = Some(group);
        wrapper.collision_mask = Some(mask);
        let kernel_id = wrapper.kernel_id;
        if let Some(b) = self.kernel.body_mut(kernel_id) {
            for shape in &mut b.shapes {
                shape.collision_group = group.mask();
                shape.collision_mask = mask;
            }
        }
        true
    }

    /// Adds groups to every shape's collision mask.
    pub fn collides(&mut self, body: BodyHandle, groups: &[CollisionGroup]) {
        let bits = groups.iter().fold(0, |acc, g| acc | g.mask());
        let Some(wrapper) = self.registry.get_mut(body) else {
            return;
        };
        wrapper.collides_with |= bits;
        if let Some(mask) = wrapper.collision_mask.as_mut() {
            *mask |= bits;
        }
        let kernel_id = wrapper.kernel_id;
        if let Some(b) = self.kernel.body_mut(kernel_id) {
            for shape in &mut b.shapes {
                shape.collision_mask |= bits;
            }
        }
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Registers a begin-contact listener on a body.
    pub fn on_begin_contact<F>(&mut self, body: BodyHandle, callback: F)
    where
        F: FnMut(&BodyContact, &mut PendingRemovals) + 'static,
    {
        if let Some(b) = self.registry.get_mut(body) {
            b.begin_contact.push(Box::new(callback));
        }
    }

    /// Registers an end-contact listener on a body.
    pub fn on_end_contact<F>(&mut self, body: BodyHandle, callback: F)
    where
        F: FnMut(&BodyContact, &mut PendingRemovals) + 'static,
    {
        if let Some(b) = self.registry.get_mut(body) {
            b.end_contact.push(Box::new(callback));
        }
    }

    /// Sets the impact callback for hits between `body` and `other`.
    ///
    /// Replaces any previous callback for the same peer. Impacts are only
    /// delivered while impact events are enabled.
    pub fn on_impact_with_body<F>(&mut self, body: BodyHandle, other: BodyHandle, callback: F)
    where
        F: FnMut(&ImpactContact, &mut PendingRemovals) + 'static,
    {
        if let Some(b) = self.registry.get_mut(body) {
            b.body_callbacks.insert(other, Box::new(callback));
        }
    }

    /// Removes the impact callback for `other`.
    pub fn remove_impact_with_body(&mut self, body: BodyHandle, other: BodyHandle) -> bool {
        self.registry
            .get_mut(body)
            .is_some_and(|b| b.body_callbacks.remove(&other).is_some())
    }

    /// Sets the impact callback for hits with any shape in `group`.
    pub fn on_impact_with_group<F>(&mut self, body: BodyHandle, group: CollisionGroup, callback: F)
    where
        F: FnMut(&ImpactContact, &mut PendingRemovals) + 'static,
    {
        if let Some(b) = self.registry.get_mut(body) {
            b.group_callbacks.insert(group.mask(), Box::new(callback));
        }
    }

    /// Removes the impact callback for `group`.
    pub fn remove_impact_with_group(&mut self, body: BodyHandle, group: CollisionGroup) -> bool {
        self.registry
            .get_mut(body)
            .is_some_and(|b| b.group_callbacks.remove(&group.mask()).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_removals_dedup() {
        let mut pending = PendingRemovals::new();
        let a: BodyHandle = Handle::new(0, 0);
        let b: BodyHandle = Handle::new(1, 0);

        assert!(pending.push(a));
        assert!(!pending.push(a));
        assert!(pending.push(b));
        assert_eq!(pending.len(), 2);

        assert!(pending.cancel(a));
        assert!(!pending.cancel(a));
        assert_eq!(pending.take(), vec![b]);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_filter_applies_group_and_mask() {
        let mut body = Body::new(Handle::new(0, 0), None);
        body.collision_group = Some(CollisionGroup::BOUNDS);
        body.collides_with = 8;

        let shape = body.filter(Shape::new(ShapeKind::Particle));
        assert_eq!(shape.collision_group, 2);
        assert_eq!(shape.collision_mask, 1 | 8);
    }

    #[test]
    fn test_filter_uses_reset_mask_after_regroup() {
        let mut body = Body::new(Handle::new(0, 0), None);
        body.collision_group = Some(CollisionGroup::BOUNDS);
        body.collides_with = 8;
        body.collision_mask = Some(8);

        let shape = body.filter(Shape::new(ShapeKind::Particle));
        assert_eq!(shape.collision_mask, 8);
    }
}

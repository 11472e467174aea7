//! # The Physics World
//!
//! One World owns one kernel and drives it once per frame:
//!
//! ```text
//! update(scene):
//! ┌─────────────────────────────────────────────────────────────┐
//! │ 0. paused?  -> return, no kernel work                      │
//! │ 1. PRE      push moved scene nodes into their bodies       │
//! │ 2. REMOVE   drain the pending-removal queue                │
//! │ 3. POST     pull body state back into the scene            │
//! │ 4. STEP     advance the kernel one fixed timestep          │
//! │ 5. ROUTE    fan queued contact/impact events out           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! POST runs before STEP, so the scene shows the state from before this
//! frame's integration. Hosts that need the fresh state read it from the
//! kernel directly.

use std::collections::HashSet;

use hinge_core::{Kernel, KernelSettings, SimKernel, Vec2};

use crate::body::{BodyHandle, BodyRef};
use crate::bounds::{BoundsManager, BoundsUpdate, Wall};
use crate::collision::{CollisionGroup, CollisionGroupAllocator};
use crate::config::{Viewport, WorldConfig};
use crate::coords::{point_to_kernel, point_to_scene};
use crate::error::{PhysicsError, PhysicsResult};
use crate::events::{ContactRouter, EventBus, EventReceiver, WorldEvent};
use crate::joints::MaterialRegistry;
use crate::registry::BodyRegistry;
use crate::scene::{EnableTarget, NodeId, SceneGraph};

/// Default hit-test precision, kernel meters.
pub const DEFAULT_HIT_PRECISION: f32 = 5.0;

/// A physics world bound to one kernel.
pub struct World<K: Kernel = SimKernel> {
    pub(crate) kernel: K,
    pub(crate) registry: BodyRegistry,
    pub(crate) groups: CollisionGroupAllocator,
    pub(crate) bounds: BoundsManager,
    pub(crate) router: ContactRouter,
    pub(crate) materials: MaterialRegistry,
    bus: EventBus,
    frame_rate: f32,
    paused: bool,
    viewport: Option<Viewport>,
}

impl World<SimKernel> {
    /// Creates a World driving a fresh [`SimKernel`].
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::Config`] if the configuration is invalid.
    pub fn new(config: WorldConfig) -> PhysicsResult<Self> {
        Self::with_kernel(SimKernel::new(), config)
    }
}

impl<K: Kernel> World<K> {
    /// Creates a World driving the given kernel.
    ///
    /// Gravity is sign-inverted into the kernel. Contact listeners are
    /// attached, and walls are built when the config carries a viewport.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::Config`] if the configuration is invalid.
    pub fn with_kernel(mut kernel: K, config: WorldConfig) -> PhysicsResult<Self> {
        config.validate()?;

        kernel.set_gravity(Vec2::new(-config.gravity[0], -config.gravity[1]));
        *kernel.settings_mut() = config.kernel.settings();
        let defaults = kernel.default_contact_material_mut();
        defaults.friction = config.kernel.friction;
        defaults.restitution = config.kernel.restitution;

        let mut world = Self {
            kernel,
            registry: BodyRegistry::new(),
            groups: CollisionGroupAllocator::new(),
            bounds: BoundsManager::new(config.bounds),
            router: ContactRouter::new(),
            materials: MaterialRegistry::new(),
            bus: EventBus::new(config.event_capacity),
            frame_rate: config.frame_rate,
            paused: false,
            viewport: config.viewport,
        };

        world.router.attach_contacts(&mut world.kernel);
        if config.impact_events {
            world.set_impact_events(true);
        }
        if world.viewport.is_some() {
            world.set_bounds_to_world(BoundsUpdate::from(config.bounds))?;
        }

        tracing::info!(
            "Physics world created: gravity {:?}, frame rate {}",
            config.gravity,
            config.frame_rate
        );
        Ok(world)
    }

    pub(crate) fn emit(&mut self, event: WorldEvent) {
        self.bus.publish(&event);
    }

    /// Subscribes to World notifications.
    ///
    /// Every receiver gets its own copy of each notification raised after
    /// it was created. Dropping the receiver ends the subscription.
    pub fn events(&mut self) -> EventReceiver {
        self.bus.subscribe()
    }

    /// The kernel.
    #[must_use]
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// The kernel, mutably. Structural edits made here bypass the World's
    /// bookkeeping and notifications.
    pub fn kernel_mut(&mut self) -> &mut K {
        &mut self.kernel
    }

    // =========================================================================
    // Setup
    // =========================================================================

    /// Provides or updates the host renderer size.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    /// Returns the viewport, or fails if the host context isn't set up.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::NotSetup`] before a viewport is provided and
    /// after [`World::destroy`].
    pub fn check_if_setup(&self) -> PhysicsResult<Viewport> {
        self.viewport.ok_or(PhysicsError::NotSetup)
    }

    // =========================================================================
    // Frame
    // =========================================================================

    /// Runs one frame. Does nothing while paused.
    pub fn update<S: SceneGraph>(&mut self, scene: &mut S) {
        if self.paused {
            return;
        }

        self.registry.push_scene_state(&mut self.kernel, scene);

        let removed = self.registry.drain_removals(&mut self.kernel);
        for &body in &removed {
            self.emit(WorldEvent::BodyRemoved(body));
        }

        self.registry.pull_kernel_state(&self.kernel, scene);

        self.kernel.step(self.frame_rate);

        let events = self.kernel.drain_events();
        let routed = events.len();
        self.router.route(&self.kernel, events, &mut self.registry, &mut self.bus);

        tracing::trace!(
            "Frame: {} bodies, {} removed, {} events routed",
            self.registry.active().len(),
            removed.len(),
            routed
        );
    }

    /// Stops stepping. Structural edits are still accepted.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Resumes stepping.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Checks if the World is paused.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Fixed timestep in seconds.
    #[must_use]
    pub const fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    /// Sets the fixed timestep in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::Config`], keeping the old timestep, unless
    /// `frame_rate` is finite and positive.
    pub fn set_frame_rate(&mut self, frame_rate: f32) -> PhysicsResult<()> {
        if !(frame_rate.is_finite() && frame_rate > 0.0) {
            return Err(PhysicsError::Config("frame_rate must be positive".into()));
        }
        self.frame_rate = frame_rate;
        Ok(())
    }

    /// Simulated time in seconds.
    #[must_use]
    pub fn time(&self) -> f32 {
        self.kernel.time()
    }

    // =========================================================================
    // Bodies
    // =========================================================================

    /// Creates bodies for a node, a group's children, or several nodes.
    ///
    /// With `recurse`, children of each newly enabled node are enabled too.
    /// A node that already has a body is skipped, children included. Each
    /// node is visited at most once per call, so cycles in the host's
    /// scene terminate.
    pub fn enable<'a, S: SceneGraph>(&mut self, scene: &mut S, target: impl Into<EnableTarget<'a>>, debug: bool, recurse: bool) {
        let mut visited = HashSet::new();
        match target.into() {
            EnableTarget::Node(node) => self.enable_node(scene, node, debug, recurse, &mut visited),
            EnableTarget::Nodes(nodes) => {
                for &node in nodes {
                    self.enable_node(scene, node, debug, recurse, &mut visited);
                }
            }
        }
    }

    fn enable_node<S: SceneGraph>(&mut self, scene: &mut S, node: NodeId, debug: bool, recurse: bool, visited: &mut HashSet<NodeId>) {
        if !visited.insert(node) {
            return;
        }

        if scene.is_group(node) {
            let children = scene.children(node).to_vec();
            self.registry.record_group(node, &children);
            for child in children {
                self.enable_node(scene, child, debug, recurse, visited);
            }
            return;
        }

        if self.enable_body(scene, node, debug).is_none() {
            return;
        }
        if recurse {
            let children = scene.children(node).to_vec();
            for child in children {
                self.enable_node(scene, child, debug, recurse, visited);
            }
        }
    }

    /// Creates a body for one node and adds it to the World.
    ///
    /// Returns `None`, changing nothing, if the node already has a body.
    pub fn enable_body<S: SceneGraph>(&mut self, scene: &mut S, node: NodeId, debug: bool) -> Option<BodyHandle> {
        let handle = self.registry.create_for_node(&mut self.kernel, scene, node, debug)?;
        self.add_body(handle);
        Some(handle)
    }

    /// Wrapper attached to a scene node.
    #[must_use]
    pub fn node_body(&self, node: NodeId) -> Option<BodyHandle> {
        self.registry.node_body(node)
    }

    /// Adds a body to the simulation.
    ///
    /// A pending removal of the body is cancelled. Returns `false` if it is
    /// already simulated.
    pub fn add_body(&mut self, body: BodyHandle) -> bool {
        if !self.registry.add(&mut self.kernel, body) {
            return false;
        }
        self.emit(WorldEvent::BodyAdded(body));
        true
    }

    /// Queues a body for removal at the next frame boundary.
    pub fn remove_body(&mut self, body: BodyHandle) {
        self.registry.schedule_removal(body);
    }

    /// Removes a body from the simulation now.
    ///
    /// Never call this from inside a step; callbacks only get the deferred
    /// queue for that reason.
    pub fn remove_body_immediate(&mut self, body: BodyHandle) -> bool {
        if !self.registry.remove_immediate(&mut self.kernel, body) {
            return false;
        }
        self.emit(WorldEvent::BodyRemoved(body));
        true
    }

    /// Checks if a body is in this World's simulation.
    #[must_use]
    pub fn contains_body(&self, body: BodyHandle) -> bool {
        self.registry.is_owned(&self.kernel, body)
    }

    /// Checks if a body is queued for removal.
    #[must_use]
    pub fn is_removal_pending(&self, body: BodyHandle) -> bool {
        self.registry.pending().contains(body)
    }

    /// Bodies added through the World, insertion order.
    #[must_use]
    pub fn active_bodies(&self) -> &[BodyHandle] {
        self.registry.active()
    }

    /// Wrapped bodies in the kernel simulation, kernel order.
    #[must_use]
    pub fn get_bodies(&self) -> Vec<BodyHandle> {
        self.kernel
            .bodies()
            .iter()
            .filter_map(|&id| self.registry.wrapper_of(id))
            .collect()
    }

    /// Number of bodies in the kernel simulation, walls included.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.kernel.bodies().len()
    }

    /// Springs in the kernel, insertion order.
    #[must_use]
    pub fn get_springs(&self) -> Vec<hinge_core::SpringId> {
        self.kernel.springs().to_vec()
    }

    /// Constraints in the kernel, insertion order.
    #[must_use]
    pub fn get_constraints(&self) -> Vec<hinge_core::ConstraintId> {
        self.kernel.constraints().to_vec()
    }

    // =========================================================================
    // Collision groups
    // =========================================================================

    /// Allocates a new collision group and lets the walls collide with it.
    ///
    /// With `target`, the new group is assigned as by
    /// [`World::set_collision_group`]; a group node passes it on to its
    /// top-level children.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::CollisionGroupsExhausted`] once all bits
    /// are taken.
    pub fn create_collision_group(&mut self, target: Option<BodyRef>) -> PhysicsResult<CollisionGroup> {
        let group = self.groups.allocate()?;
        self.bounds.add_to_masks(&mut self.kernel, group);
        if let Some(target) = target {
            self.set_collision_group(target, group);
        }
        Ok(group)
    }

    /// Groups allocated since the last clear or reset.
    #[must_use]
    pub fn collision_groups(&self) -> &[CollisionGroup] {
        self.groups.groups()
    }

    // =========================================================================
    // Bounds
    // =========================================================================

    /// Creates, moves or removes walls around a scene rectangle.
    pub fn set_bounds(&mut self, x: f32, y: f32, width: f32, height: f32, update: BoundsUpdate) {
        self.bounds.set_bounds(&mut self.kernel, x, y, width, height, update);
    }

    /// Puts walls around the host viewport.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::NotSetup`] without a viewport.
    pub fn set_bounds_to_world(&mut self, update: BoundsUpdate) -> PhysicsResult<()> {
        let viewport = self.check_if_setup()?;
        self.set_bounds(0.0, 0.0, viewport.width, viewport.height, update);
        Ok(())
    }

    /// Moves all walls into the bounds group, or all into `EVERYTHING`.
    pub fn update_bounds_collision_group(&mut self, use_own_group: bool) {
        self.bounds.update_collision_group(&mut self.kernel, use_own_group);
    }

    /// Kernel body of a wall.
    #[must_use]
    pub const fn wall(&self, wall: Wall) -> Option<hinge_core::KernelBodyId> {
        self.bounds.wall(wall)
    }

    /// Scene position of a wall.
    #[must_use]
    pub fn wall_position(&self, wall: Wall) -> Option<(f32, f32)> {
        let id = self.bounds.wall(wall)?;
        self.kernel.body(id).map(|b| point_to_scene(b.position))
    }

    /// The bounds manager.
    #[must_use]
    pub const fn bounds(&self) -> &BoundsManager {
        &self.bounds
    }

    // =========================================================================
    // Impact events
    // =========================================================================

    /// Attaches or detaches the impact listener. Off by default.
    pub fn set_impact_events(&mut self, enable: bool) {
        self.router.set_impact_events(&mut self.kernel, enable);
    }

    /// Checks if impact events are delivered.
    #[must_use]
    pub const fn impact_events(&self) -> bool {
        self.router.impact_attached()
    }

    // =========================================================================
    // Kernel settings
    // =========================================================================

    /// Gravity in scene units.
    #[must_use]
    pub fn gravity(&self) -> (f32, f32) {
        let g = self.kernel.gravity();
        (-g.x, -g.y)
    }

    /// Sets gravity in scene units.
    pub fn set_gravity(&mut self, x: f32, y: f32) {
        self.kernel.set_gravity(Vec2::new(-x, -y));
    }

    /// Friction of the default contact material.
    #[must_use]
    pub fn friction(&self) -> f32 {
        self.kernel.default_contact_material().friction
    }

    /// Sets friction of the default contact material.
    pub fn set_friction(&mut self, friction: f32) {
        self.kernel.default_contact_material_mut().friction = friction;
    }

    /// Restitution of the default contact material.
    #[must_use]
    pub fn restitution(&self) -> f32 {
        self.kernel.default_contact_material().restitution
    }

    /// Sets restitution of the default contact material.
    pub fn set_restitution(&mut self, restitution: f32) {
        self.kernel.default_contact_material_mut().restitution = restitution;
    }

    /// Kernel switches.
    #[must_use]
    pub fn settings(&self) -> &KernelSettings {
        self.kernel.settings()
    }

    /// Kernel switches, mutably.
    pub fn settings_mut(&mut self) -> &mut KernelSettings {
        self.kernel.settings_mut()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Wrapped bodies whose shapes contain a scene point.
    ///
    /// `candidates` of `None` tests every kernel body. Candidates that
    /// don't resolve are skipped with a warning. `precision` defaults to
    /// [`DEFAULT_HIT_PRECISION`].
    #[must_use]
    pub fn hit_test(&self, x: f32, y: f32, candidates: Option<&[BodyRef]>, precision: Option<f32>, filter_static: bool) -> Vec<BodyHandle> {
        let ids: Vec<_> = match candidates {
            Some(refs) => refs
                .iter()
                .filter_map(|&r| {
                    let id = self.registry.resolve_kernel(&self.kernel, r);
                    if id.is_none() {
                        tracing::warn!("Hit test skipped invalid body {:?}", r);
                    }
                    id
                })
                .collect(),
            None => self.kernel.bodies().to_vec(),
        };
        let ids: Vec<_> = ids
            .into_iter()
            .filter(|&id| {
                !(filter_static
                    && self
                        .kernel
                        .body(id)
                        .is_some_and(|b| b.body_type == hinge_core::BodyType::Static))
            })
            .collect();

        self.kernel
            .hit_test(point_to_kernel(x, y), &ids, precision.unwrap_or(DEFAULT_HIT_PRECISION))
            .into_iter()
            .filter_map(|id| self.registry.wrapper_of(id))
            .collect()
    }

    /// Serializes the kernel state to JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::Serialize`] if serialization fails.
    pub fn to_json(&self) -> PhysicsResult<String> {
        serde_json::to_string(&self.kernel.snapshot()).map_err(|e| PhysicsError::Serialize(e.to_string()))
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Empties the simulation.
    ///
    /// Equations, constraints, bodies, springs and contact materials are
    /// removed newest first. Contact listeners are detached; collision
    /// groups, pending removals and the wall mask whitelist are reset.
    /// Wrappers and remembered wall flags survive.
    pub fn clear(&mut self) {
        self.kernel.reset_time();
        self.kernel.clear_equations();

        for id in self.kernel.constraints().to_vec().into_iter().rev() {
            self.kernel.remove_constraint(id);
        }
        for id in self.kernel.bodies().to_vec().into_iter().rev() {
            self.kernel.remove_body(id);
        }
        for id in self.kernel.springs().to_vec().into_iter().rev() {
            self.kernel.remove_spring(id);
        }
        for id in self.kernel.contact_materials().to_vec().into_iter().rev() {
            self.kernel.remove_contact_material(id);
        }

        self.router.detach_contacts(&mut self.kernel);
        self.groups.reset();
        self.registry.clear();
        self.bounds.forget_walls(&mut self.kernel);

        tracing::info!("Physics world cleared");
    }

    /// Reattaches contact listeners, restarts collision groups and rebuilds
    /// the default walls around the viewport.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::NotSetup`] without a viewport.
    pub fn reset(&mut self) -> PhysicsResult<()> {
        self.router.attach_contacts(&mut self.kernel);
        self.groups.reset();
        self.set_bounds_to_world(BoundsUpdate::all(true, true, true, true, false))?;
        tracing::info!("Physics world reset");
        Ok(())
    }

    /// Clears the World and detaches it from the host context.
    pub fn destroy(&mut self) {
        self.clear();
        self.viewport = None;
        tracing::info!("Physics world destroyed");
    }
}

impl<K: Kernel> std::fmt::Debug for World<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("bodies", &self.kernel.bodies().len())
            .field("active", &self.registry.active().len())
            .field("pending_removals", &self.registry.pending().len())
            .field("paused", &self.paused)
            .field("viewport", &self.viewport)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Detached;

    #[test]
    fn test_gravity_is_sign_inverted() {
        let world = World::new(WorldConfig {
            gravity: [0.0, 10.0],
            ..WorldConfig::default()
        })
        .unwrap();

        assert_eq!(world.kernel().gravity(), Vec2::new(0.0, -10.0));
        assert_eq!(world.gravity(), (0.0, 10.0));
    }

    #[test]
    fn test_no_viewport_means_no_walls() {
        let mut world = World::new(WorldConfig::default()).unwrap();
        assert_eq!(world.body_count(), 0);
        assert!(matches!(world.check_if_setup(), Err(PhysicsError::NotSetup)));
        assert!(matches!(
            world.set_bounds_to_world(BoundsUpdate::remembered()),
            Err(PhysicsError::NotSetup)
        ));
    }

    #[test]
    fn test_paused_world_does_not_step() {
        let mut world = World::new(WorldConfig::default()).unwrap();
        world.pause();
        world.update(&mut Detached);
        world.update(&mut Detached);
        assert_eq!(world.kernel().step_count(), 0);

        world.resume();
        world.update(&mut Detached);
        assert_eq!(world.kernel().step_count(), 1);
        assert!((world.time() - world.frame_rate()).abs() < f32::EPSILON);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let err = World::new(WorldConfig {
            frame_rate: -1.0,
            ..WorldConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, PhysicsError::Config(_)));
    }

    #[test]
    fn test_set_frame_rate_rejects_non_positive() {
        let mut world = World::new(WorldConfig::default()).unwrap();
        let before = world.frame_rate();

        for bad in [0.0, -1.0 / 60.0, f32::NAN, f32::INFINITY] {
            assert!(matches!(world.set_frame_rate(bad), Err(PhysicsError::Config(_))));
            assert!((world.frame_rate() - before).abs() < f32::EPSILON);
        }

        world.set_frame_rate(1.0 / 30.0).unwrap();
        assert!((world.frame_rate() - 1.0 / 30.0).abs() < f32::EPSILON);
    }
}

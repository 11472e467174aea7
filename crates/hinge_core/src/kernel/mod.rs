//! # Kernel Contract
//!
//! The interface between the orchestration layer and a rigid-body kernel.
//!
//! ## Ownership
//!
//! A kernel owns every object it simulates. Callers hold handles only, and
//! every structural edit goes through the trait so the kernel can keep its
//! own collections authoritative.
//!
//! ## Events
//!
//! Contacts found while stepping are queued, not dispatched. The owner
//! drains them with [`Kernel::drain_events`] after [`Kernel::step`] returns,
//! so no listener ever runs while the kernel iterates its bodies.

mod event;
mod sim;
mod types;

pub use event::{ContactEquation, KernelEvent, KernelEventKind};
pub use sim::SimKernel;
pub use types::{
    BodyDef, BodyType, Constraint, ConstraintId, ConstraintKind, ContactMaterial,
    ContactMaterialId, ContactMaterialOptions, KernelBody, KernelBodyId, KernelSettings, Material,
    MaterialId, Shape, ShapeKind, ShapeRef, SleepMode, Spring, SpringId, SpringKind,
    DEFAULT_COLLISION_GROUP, DEFAULT_COLLISION_MASK,
};

use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// Serializable picture of a kernel's simulated state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KernelSnapshot {
    /// Simulated time in seconds.
    pub time: f32,
    /// Gravity (meters per second squared).
    pub gravity: Vec2,
    /// Bodies in the simulation, insertion order.
    pub bodies: Vec<(KernelBodyId, KernelBody)>,
    /// Constraints, insertion order.
    pub constraints: Vec<(ConstraintId, Constraint)>,
    /// Springs, insertion order.
    pub springs: Vec<(SpringId, Spring)>,
    /// Contact materials, insertion order.
    pub contact_materials: Vec<(ContactMaterialId, ContactMaterial)>,
    /// Global switches.
    pub settings: KernelSettings,
}

/// A rigid-body simulation the World can drive.
///
/// Bodies have two states: created (the kernel stores them) and added
/// (they take part in stepping). `add_body`/`remove_body` move a created
/// body in and out of the simulation; `destroy_body` frees it.
pub trait Kernel {
    // =========================================================================
    // Bodies
    // =========================================================================

    /// Creates a body without adding it to the simulation.
    fn create_body(&mut self, def: BodyDef) -> KernelBodyId;

    /// Frees a body, removing it from the simulation first.
    ///
    /// Returns `false` if the id is stale.
    fn destroy_body(&mut self, id: KernelBodyId) -> bool;

    /// Gets a created body.
    fn body(&self, id: KernelBodyId) -> Option<&KernelBody>;

    /// Gets a created body mutably.
    fn body_mut(&mut self, id: KernelBodyId) -> Option<&mut KernelBody>;

    /// Adds a created body to the simulation.
    ///
    /// Returns `false` if the id is stale or the body is already simulated.
    fn add_body(&mut self, id: KernelBodyId) -> bool;

    /// Takes a body out of the simulation without freeing it.
    ///
    /// Returns `false` if the body was not simulated.
    fn remove_body(&mut self, id: KernelBodyId) -> bool;

    /// Checks if the body takes part in the simulation.
    fn contains_body(&self, id: KernelBodyId) -> bool;

    /// Simulated bodies, insertion order.
    fn bodies(&self) -> &[KernelBodyId];

    // =========================================================================
    // Constraints & springs
    // =========================================================================

    /// Adds a constraint to the simulation.
    fn add_constraint(&mut self, constraint: Constraint) -> ConstraintId;

    /// Removes a constraint.
    fn remove_constraint(&mut self, id: ConstraintId) -> Option<Constraint>;

    /// Gets a constraint.
    fn constraint(&self, id: ConstraintId) -> Option<&Constraint>;

    /// Constraints, insertion order.
    fn constraints(&self) -> &[ConstraintId];

    /// Adds a spring to the simulation.
    fn add_spring(&mut self, spring: Spring) -> SpringId;

    /// Removes a spring.
    fn remove_spring(&mut self, id: SpringId) -> Option<Spring>;

    /// Gets a spring.
    fn spring(&self, id: SpringId) -> Option<&Spring>;

    /// Springs, insertion order.
    fn springs(&self) -> &[SpringId];

    // =========================================================================
    // Materials
    // =========================================================================

    /// Mints a new material identity.
    fn create_material(&mut self) -> MaterialId;

    /// Adds a contact material.
    fn add_contact_material(&mut self, material: ContactMaterial) -> ContactMaterialId;

    /// Removes a contact material.
    fn remove_contact_material(&mut self, id: ContactMaterialId) -> Option<ContactMaterial>;

    /// Gets a contact material.
    fn contact_material(&self, id: ContactMaterialId) -> Option<&ContactMaterial>;

    /// Finds the contact material for a pair of materials, in either order.
    fn find_contact_material(&self, a: MaterialId, b: MaterialId) -> Option<ContactMaterialId>;

    /// Contact materials, insertion order.
    fn contact_materials(&self) -> &[ContactMaterialId];

    /// Parameters used when no contact material matches.
    fn default_contact_material(&self) -> &ContactMaterialOptions;

    /// Parameters used when no contact material matches, mutably.
    fn default_contact_material_mut(&mut self) -> &mut ContactMaterialOptions;

    // =========================================================================
    // Global state
    // =========================================================================

    /// Gravity (meters per second squared).
    fn gravity(&self) -> Vec2;

    /// Sets gravity.
    fn set_gravity(&mut self, gravity: Vec2);

    /// Global switches.
    fn settings(&self) -> &KernelSettings;

    /// Global switches, mutably.
    fn settings_mut(&mut self) -> &mut KernelSettings;

    /// Simulated time in seconds.
    fn time(&self) -> f32;

    /// Resets simulated time to zero.
    fn reset_time(&mut self);

    /// Drops every pending solver equation.
    fn clear_equations(&mut self);

    // =========================================================================
    // Events
    // =========================================================================

    /// Registers one listener of the given kind.
    fn subscribe(&mut self, kind: KernelEventKind);

    /// Unregisters one listener of the given kind.
    fn unsubscribe(&mut self, kind: KernelEventKind);

    /// Checks if at least one listener of the kind is registered.
    fn is_subscribed(&self, kind: KernelEventKind) -> bool;

    /// Takes every queued event, oldest first.
    fn drain_events(&mut self) -> Vec<KernelEvent>;

    // =========================================================================
    // Simulation
    // =========================================================================

    /// Advances the simulation by `dt` seconds.
    fn step(&mut self, dt: f32);

    /// Returns the candidates whose shapes contain `point`.
    ///
    /// Zero-size shapes match within `precision` meters.
    fn hit_test(&self, point: Vec2, candidates: &[KernelBodyId], precision: f32) -> Vec<KernelBodyId>;

    /// Captures the simulated state.
    fn snapshot(&self) -> KernelSnapshot;
}

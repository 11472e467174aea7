//! # HINGE Core
//!
//! The kernel-facing half of the physics bridge:
//! - 2D math in kernel units (meters, radians, y up)
//! - Generational arena handing out stale-safe handles
//! - The [`Kernel`] contract every rigid-body backend implements
//! - [`SimKernel`], a minimal in-process backend
//!
//! ## Architecture Rules
//!
//! 1. **Handles, never pointers** - every object is addressed through a [`Handle`]
//! 2. **Kernel collections are authoritative** - add/remove always go through the trait
//! 3. **Events are queued** - nothing runs while the kernel steps
//!
//! ## Example
//!
//! ```rust,ignore
//! use hinge_core::{BodyDef, Kernel, SimKernel, Vec2};
//!
//! let mut kernel = SimKernel::new();
//! let body = kernel.create_body(BodyDef::new(Vec2::ZERO, 0.0, 1.0));
//! kernel.add_body(body);
//! kernel.step(1.0 / 60.0);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod arena;
pub mod kernel;
pub mod math;

pub use arena::{Arena, Handle};
pub use kernel::{
    BodyDef, BodyType, Constraint, ConstraintId, ConstraintKind, ContactEquation, ContactMaterial,
    ContactMaterialId, ContactMaterialOptions, Kernel, KernelBody, KernelBodyId, KernelEvent,
    KernelEventKind, KernelSettings, KernelSnapshot, Material, MaterialId, Shape, ShapeKind,
    ShapeRef, SimKernel, SleepMode, Spring, SpringId, SpringKind, DEFAULT_COLLISION_GROUP,
    DEFAULT_COLLISION_MASK,
};
pub use math::Vec2;

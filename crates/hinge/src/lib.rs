//! # HINGE
//!
//! Binds a rigid-body kernel to a host scene graph.
//!
//! ```text
//!   ┌──────────────┐  push moved nodes   ┌──────────────┐   step    ┌────────┐
//!   │  SceneGraph  │ ──────────────────> │    World     │ ────────> │ Kernel │
//!   │ (pixels, y↓) │ <────────────────── │ (bookkeeping)│ <──────── │(meters)│
//!   └──────────────┘  pull body state    └──────┬───────┘  events   └────────┘
//!                                               │
//!                                  WorldEvent + per-body callbacks
//! ```
//!
//! ## Architecture Rules
//!
//! 1. **Scene units outside, kernel units inside** - conversion lives in [`coords`]
//! 2. **No structural edits mid-step** - callbacks queue removals instead
//! 3. **Walls are ordinary static bodies** - built and moved by [`bounds`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use hinge::{World, WorldConfig, Detached};
//!
//! let mut world = World::new(WorldConfig::with_viewport(800.0, 600.0))?;
//! let ball = world.create_body(400.0, 100.0, 1.0, true);
//! world.add_circle(ball, 16.0, 0.0, 0.0, 0.0);
//! world.update(&mut Detached);
//! ```

#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod body;
pub mod bounds;
pub mod collision;
pub mod config;
pub mod coords;
pub mod error;
pub mod events;
pub mod joints;
pub mod registry;
pub mod scene;
pub mod world;

pub use body::{Body, BodyContact, BodyHandle, BodyRef, ImpactContact, PendingRemovals};
pub use bounds::{BoundsManager, BoundsUpdate, Wall};
pub use collision::{CollisionGroup, CollisionGroupAllocator};
pub use config::{BoundsConfig, KernelConfig, Viewport, WorldConfig};
pub use error::{PhysicsError, PhysicsResult};
pub use events::{EventReceiver, WorldEvent};
pub use joints::{MaterialEntry, MaterialHandle, PrismaticOptions, SpringOptions};
pub use scene::{Detached, EnableTarget, NodeId, SceneGraph};
pub use world::World;

pub use hinge_core;

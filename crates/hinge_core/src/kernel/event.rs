//! Notifications raised by a kernel while stepping.

use serde::{Deserialize, Serialize};

use super::types::{KernelBodyId, ShapeRef};
use crate::math::Vec2;

/// One contact point between two shapes, as produced by the narrowphase.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContactEquation {
    /// First body.
    pub body_a: KernelBodyId,
    /// Second body.
    pub body_b: KernelBodyId,
    /// Contact normal, pointing out of shape A.
    pub normal_a: Vec2,
    /// Contact point relative to body A (meters).
    pub contact_point_a: Vec2,
    /// Contact point relative to body B (meters).
    pub contact_point_b: Vec2,
    /// Restitution used for this contact.
    pub restitution: f32,
}

/// Listener categories a kernel can be subscribed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KernelEventKind {
    /// Two shapes started touching.
    BeginContact,
    /// Two shapes stopped touching.
    EndContact,
    /// Two bodies hit each other.
    Impact,
}

impl KernelEventKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 3] = [Self::BeginContact, Self::EndContact, Self::Impact];
}

/// A kernel notification.
///
/// Shape references carry their owning body, so a handler can always find
/// both sides of the pair even after one body has left the simulation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum KernelEvent {
    /// Two shapes started touching.
    BeginContact {
        /// Shape on the first body.
        shape_a: ShapeRef,
        /// Shape on the second body.
        shape_b: ShapeRef,
        /// Contact equations of the new contact.
        equations: Vec<ContactEquation>,
    },
    /// Two shapes stopped touching.
    EndContact {
        /// Shape on the first body.
        shape_a: ShapeRef,
        /// Shape on the second body.
        shape_b: ShapeRef,
    },
    /// Two bodies hit each other.
    Impact {
        /// Shape on the first body.
        shape_a: ShapeRef,
        /// Shape on the second body.
        shape_b: ShapeRef,
    },
}

impl KernelEvent {
    /// Listener category of this event.
    #[must_use]
    pub const fn kind(&self) -> KernelEventKind {
        match self {
            Self::BeginContact { .. } => KernelEventKind::BeginContact,
            Self::EndContact { .. } => KernelEventKind::EndContact,
            Self::Impact { .. } => KernelEventKind::Impact,
        }
    }

    /// The two shapes involved.
    #[must_use]
    pub const fn shapes(&self) -> (ShapeRef, ShapeRef) {
        match self {
            Self::BeginContact { shape_a, shape_b, .. }
            | Self::EndContact { shape_a, shape_b }
            | Self::Impact { shape_a, shape_b } => (*shape_a, *shape_b),
        }
    }
}

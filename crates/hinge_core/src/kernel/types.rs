//! # Kernel Object Types
//!
//! Plain data for everything a kernel stores: bodies, shapes, constraints,
//! springs and materials. All quantities are meters, radians and seconds.

use serde::{Deserialize, Serialize};

use crate::arena::Handle;
use crate::math::Vec2;

/// Identity of a kernel body.
pub type KernelBodyId = Handle<KernelBody>;
/// Identity of a kernel constraint.
pub type ConstraintId = Handle<Constraint>;
/// Identity of a kernel spring.
pub type SpringId = Handle<Spring>;
/// Identity of a kernel material.
pub type MaterialId = Handle<Material>;
/// Identity of a kernel contact material.
pub type ContactMaterialId = Handle<ContactMaterial>;

/// Default collision group of a freshly created shape.
pub const DEFAULT_COLLISION_GROUP: u32 = 1;
/// Default collision mask of a freshly created shape.
pub const DEFAULT_COLLISION_MASK: u32 = 1;

/// Motion type of a kernel body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyType {
    /// Moved by forces and contacts.
    Dynamic,
    /// Never moves. Mass is zero.
    Static,
    /// Moved only by its own velocity.
    Kinematic,
}

/// Geometry of a single shape, in the owning body's local frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ShapeKind {
    /// Circle of the given radius.
    Circle {
        /// Radius in meters.
        radius: f32,
    },
    /// Axis-aligned (in local space) rectangle.
    Rectangle {
        /// Full width in meters.
        width: f32,
        /// Full height in meters.
        height: f32,
    },
    /// Infinite half-plane; the solid side is local -y.
    Plane,
    /// Zero-size point.
    Particle,
}

/// A collision shape attached to a kernel body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    /// Geometry.
    pub kind: ShapeKind,
    /// Offset from the body origin (meters).
    pub offset: Vec2,
    /// Rotation relative to the body (radians).
    pub angle: f32,
    /// Single-bit group this shape belongs to.
    pub collision_group: u32,
    /// Bits of the groups this shape collides with.
    pub collision_mask: u32,
    /// Surface material, if any.
    pub material: Option<MaterialId>,
    /// Sensors report contacts but produce no response.
    pub sensor: bool,
}

impl Shape {
    /// Creates a shape with default filtering at the body origin.
    #[must_use]
    pub const fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            offset: Vec2::ZERO,
            angle: 0.0,
            collision_group: DEFAULT_COLLISION_GROUP,
            collision_mask: DEFAULT_COLLISION_MASK,
            material: None,
            sensor: false,
        }
    }

    /// Sets the local offset.
    #[must_use]
    pub const fn with_offset(mut self, offset: Vec2) -> Self {
        self.offset = offset;
        self
    }

    /// Sets the local rotation.
    #[must_use]
    pub const fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }
}

/// Reference to one shape: owning body plus index in its shape list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShapeRef {
    /// Owning body.
    pub body: KernelBodyId,
    /// Index into the body's shape list.
    pub index: u32,
}

impl ShapeRef {
    /// Creates a shape reference.
    #[must_use]
    pub const fn new(body: KernelBodyId, index: u32) -> Self {
        Self { body, index }
    }
}

/// Parameters for creating a kernel body.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodyDef {
    /// Initial position (meters).
    pub position: Vec2,
    /// Initial angle (radians).
    pub angle: f32,
    /// Mass; zero makes the body static.
    pub mass: f32,
}

impl BodyDef {
    /// Creates a body definition.
    #[must_use]
    pub const fn new(position: Vec2, angle: f32, mass: f32) -> Self {
        Self { position, angle, mass }
    }
}

/// A rigid body as stored by the kernel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KernelBody {
    /// Position of the body origin (meters).
    pub position: Vec2,
    /// Linear velocity (meters per second).
    pub velocity: Vec2,
    /// Rotation (radians).
    pub angle: f32,
    /// Angular velocity (radians per second).
    pub angular_velocity: f32,
    /// Accumulated force, cleared every step.
    pub force: Vec2,
    /// Mass; zero for static bodies.
    pub mass: f32,
    /// Linear damping in [0, 1].
    pub damping: f32,
    /// Angular damping in [0, 1].
    pub angular_damping: f32,
    /// Motion type.
    pub body_type: BodyType,
    /// Attached shapes.
    pub shapes: Vec<Shape>,
}

impl KernelBody {
    /// Creates a body from its definition. Zero mass yields a static body.
    #[must_use]
    pub fn from_def(def: BodyDef) -> Self {
        let body_type = if def.mass > 0.0 {
            BodyType::Dynamic
        } else {
            BodyType::Static
        };
        Self {
            position: def.position,
            velocity: Vec2::ZERO,
            angle: def.angle,
            angular_velocity: 0.0,
            force: Vec2::ZERO,
            mass: def.mass.max(0.0),
            damping: 0.1,
            angular_damping: 0.1,
            body_type,
            shapes: Vec::new(),
        }
    }

    /// Inverse mass, zero for anything that is not dynamic.
    #[must_use]
    pub fn inv_mass(&self) -> f32 {
        if self.body_type == BodyType::Dynamic && self.mass > 0.0 {
            1.0 / self.mass
        } else {
            0.0
        }
    }

    /// Attaches a shape, returning its index.
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_shape(&mut self, shape: Shape) -> u32 {
        self.shapes.push(shape);
        (self.shapes.len() - 1) as u32
    }
}

/// Kind-specific data of a constraint.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum ConstraintKind {
    /// Keeps body B at a fixed offset and angle relative to body A.
    Lock {
        /// Offset of B in A's frame (meters).
        local_offset_b: Vec2,
        /// Angle of B relative to A (radians).
        local_angle_b: f32,
    },
    /// Keeps two anchor points at a fixed distance.
    Distance {
        /// Target distance (meters).
        distance: f32,
        /// Anchor on A (meters, local).
        local_anchor_a: Vec2,
        /// Anchor on B (meters, local).
        local_anchor_b: Vec2,
    },
    /// Couples the rotation of two bodies.
    Gear {
        /// Relative angle offset (radians).
        angle: f32,
        /// Gear ratio.
        ratio: f32,
    },
    /// Pins two bodies together at a pivot.
    Revolute {
        /// Pivot on A (meters, local).
        pivot_a: Vec2,
        /// Pivot on B (meters, local).
        pivot_b: Vec2,
    },
    /// Lets body B slide along an axis fixed in A.
    Prismatic {
        /// Anchor on A (meters, local).
        local_anchor_a: Vec2,
        /// Anchor on B (meters, local).
        local_anchor_b: Vec2,
        /// Slide axis in A's frame.
        local_axis_a: Vec2,
        /// Keep relative rotation locked.
        lock_rotation: bool,
    },
}

/// A constraint between two kernel bodies.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// First body.
    pub body_a: KernelBodyId,
    /// Second body.
    pub body_b: KernelBodyId,
    /// Maximum force the solver may apply.
    pub max_force: f32,
    /// Kind-specific data.
    pub kind: ConstraintKind,
}

/// Kind-specific data of a spring.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum SpringKind {
    /// Hooke spring between two anchor points.
    Linear {
        /// Rest length (meters).
        rest_length: f32,
        /// Anchor on A (meters, local).
        local_anchor_a: Vec2,
        /// Anchor on B (meters, local).
        local_anchor_b: Vec2,
        /// Anchor on A in world space, overriding the local one.
        world_anchor_a: Option<Vec2>,
        /// Anchor on B in world space, overriding the local one.
        world_anchor_b: Option<Vec2>,
    },
    /// Torsional spring on the relative angle.
    Rotational {
        /// Rest angle (radians); `None` uses the angle at creation.
        rest_angle: Option<f32>,
    },
}

/// A spring between two kernel bodies.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Spring {
    /// First body.
    pub body_a: KernelBodyId,
    /// Second body.
    pub body_b: KernelBodyId,
    /// Stiffness.
    pub stiffness: f32,
    /// Damping.
    pub damping: f32,
    /// Kind-specific data.
    pub kind: SpringKind,
}

/// A surface material. Identity only; parameters live on contact materials.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material;

/// Parameters for a contact material.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactMaterialOptions {
    /// Friction coefficient.
    pub friction: f32,
    /// Restitution (bounciness).
    pub restitution: f32,
    /// Contact stiffness.
    pub stiffness: f32,
    /// Contact relaxation.
    pub relaxation: f32,
    /// Friction stiffness.
    pub friction_stiffness: f32,
    /// Friction relaxation.
    pub friction_relaxation: f32,
    /// Surface velocity (conveyor belts).
    pub surface_velocity: f32,
}

impl Default for ContactMaterialOptions {
    fn default() -> Self {
        Self {
            friction: 0.3,
            restitution: 0.0,
            stiffness: 1e6,
            relaxation: 4.0,
            friction_stiffness: 1e6,
            friction_relaxation: 4.0,
            surface_velocity: 0.0,
        }
    }
}

/// How two materials behave on contact.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContactMaterial {
    /// First material.
    pub material_a: MaterialId,
    /// Second material.
    pub material_b: MaterialId,
    /// Contact parameters.
    pub options: ContactMaterialOptions,
}

impl ContactMaterial {
    /// Creates a contact material for a pair of materials.
    #[must_use]
    pub const fn new(material_a: MaterialId, material_b: MaterialId, options: ContactMaterialOptions) -> Self {
        Self {
            material_a,
            material_b,
            options,
        }
    }

    /// Checks if this contact material applies to the pair, in either order.
    #[must_use]
    pub fn matches(&self, a: MaterialId, b: MaterialId) -> bool {
        (self.material_a == a && self.material_b == b) || (self.material_a == b && self.material_b == a)
    }
}

/// Sleep policy of the kernel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SleepMode {
    /// Bodies never sleep.
    #[default]
    NoSleeping,
    /// Individual bodies may sleep.
    BodySleeping,
    /// Connected islands sleep together.
    IslandSleeping,
}

/// Global kernel switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelSettings {
    /// Apply gravity to dynamic bodies.
    pub apply_gravity: bool,
    /// Apply linear and angular damping.
    pub apply_damping: bool,
    /// Apply spring forces.
    pub apply_spring_forces: bool,
    /// Run the constraint solver.
    pub solve_constraints: bool,
    /// Sleep policy.
    pub sleep_mode: SleepMode,
    /// Emit impact events (only delivered while someone listens).
    pub emit_impact_event: bool,
}

impl Default for KernelSettings {
    fn default() -> Self {
        Self {
            apply_gravity: true,
            apply_damping: true,
            apply_spring_forces: true,
            solve_constraints: true,
            sleep_mode: SleepMode::NoSleeping,
            emit_impact_event: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_mass_body_is_static() {
        let body = KernelBody::from_def(BodyDef::new(Vec2::ZERO, 0.0, 0.0));
        assert_eq!(body.body_type, BodyType::Static);
        assert_eq!(body.inv_mass(), 0.0);

        let body = KernelBody::from_def(BodyDef::new(Vec2::ZERO, 0.0, 2.0));
        assert_eq!(body.body_type, BodyType::Dynamic);
        assert!((body.inv_mass() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_contact_material_matches_either_order() {
        let a: MaterialId = Handle::new(0, 0);
        let b: MaterialId = Handle::new(1, 0);
        let c: MaterialId = Handle::new(2, 0);
        let cm = ContactMaterial::new(a, b, ContactMaterialOptions::default());
        assert!(cm.matches(a, b));
        assert!(cm.matches(b, a));
        assert!(!cm.matches(a, c));
    }
}

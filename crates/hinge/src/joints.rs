//! # Constraints, Springs & Materials
//!
//! Every `create_*` resolves its bodies through one lookup accepting any
//! [`BodyRef`]. An unresolvable body is logged and the call returns `None`.
//! Pixel-space parameters are converted on the way in.

use hinge_core::{
    Constraint, ConstraintId, ConstraintKind, ContactMaterial, ContactMaterialId,
    ContactMaterialOptions, Kernel, KernelBodyId, MaterialId, Spring, SpringId, SpringKind, Vec2,
};

use crate::body::{BodyHandle, BodyRef};
use crate::bounds::Wall;
use crate::coords::{point_to_kernel, to_kernel};
use crate::events::WorldEvent;
use crate::world::World;

/// Parameters of a linear spring, in scene pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpringOptions {
    /// Rest length.
    pub rest_length: f32,
    /// Stiffness.
    pub stiffness: f32,
    /// Damping.
    pub damping: f32,
    /// Anchor on A in world space.
    pub world_anchor_a: Option<(f32, f32)>,
    /// Anchor on B in world space.
    pub world_anchor_b: Option<(f32, f32)>,
    /// Anchor on A in A's frame.
    pub local_anchor_a: Option<(f32, f32)>,
    /// Anchor on B in B's frame.
    pub local_anchor_b: Option<(f32, f32)>,
}

impl Default for SpringOptions {
    fn default() -> Self {
        Self {
            rest_length: 1.0,
            stiffness: 100.0,
            damping: 1.0,
            world_anchor_a: None,
            world_anchor_b: None,
            local_anchor_a: None,
            local_anchor_b: None,
        }
    }
}

/// Parameters of a prismatic constraint, in scene pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PrismaticOptions {
    /// Keep relative rotation locked.
    pub lock_rotation: bool,
    /// Anchor on A in A's frame.
    pub anchor_a: (f32, f32),
    /// Anchor on B in B's frame.
    pub anchor_b: (f32, f32),
    /// Slide axis in A's frame. Unitless, not converted.
    pub axis: (f32, f32),
    /// Maximum solver force.
    pub max_force: f32,
}

impl Default for PrismaticOptions {
    fn default() -> Self {
        Self {
            lock_rotation: true,
            anchor_a: (0.0, 0.0),
            anchor_b: (0.0, 0.0),
            axis: (1.0, 0.0),
            max_force: f32::MAX,
        }
    }
}

/// Identity of a named material.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MaterialHandle(u32);

/// A named material bound to one kernel material.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaterialEntry {
    name: String,
    kernel_id: MaterialId,
}

impl MaterialEntry {
    /// Name given at creation.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kernel material.
    #[must_use]
    pub const fn kernel_id(&self) -> MaterialId {
        self.kernel_id
    }
}

/// Append-only list of named materials.
#[derive(Debug, Default)]
pub struct MaterialRegistry {
    entries: Vec<MaterialEntry>,
}

impl MaterialRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Registers a material.
    #[allow(clippy::cast_possible_truncation)]
    pub fn push(&mut self, name: &str, kernel_id: MaterialId) -> MaterialHandle {
        self.entries.push(MaterialEntry {
            name: name.to_owned(),
            kernel_id,
        });
        MaterialHandle((self.entries.len() - 1) as u32)
    }

    /// Looks up a material.
    #[must_use]
    pub fn get(&self, handle: MaterialHandle) -> Option<&MaterialEntry> {
        self.entries.get(handle.0 as usize)
    }

    /// Every material, creation order.
    #[must_use]
    pub fn entries(&self) -> &[MaterialEntry] {
        &self.entries
    }
}

fn anchor(anchor: Option<(f32, f32)>) -> Vec2 {
    anchor.map_or(Vec2::ZERO, |(x, y)| point_to_kernel(x, y))
}

impl<K: Kernel> World<K> {
    fn resolve_pair(&self, a: BodyRef, b: BodyRef, what: &str) -> Option<(KernelBodyId, KernelBodyId)> {
        let pair = self
            .registry
            .resolve_kernel(&self.kernel, a)
            .zip(self.registry.resolve_kernel(&self.kernel, b));
        if pair.is_none() {
            tracing::warn!("Cannot create {}, invalid body objects given", what);
        }
        pair
    }

    // =========================================================================
    // Springs
    // =========================================================================

    /// Creates and adds a linear spring.
    pub fn create_spring(&mut self, a: impl Into<BodyRef>, b: impl Into<BodyRef>, options: SpringOptions) -> Option<SpringId> {
        let (body_a, body_b) = self.resolve_pair(a.into(), b.into(), "Spring")?;
        let spring = Spring {
            body_a,
            body_b,
            stiffness: options.stiffness,
            damping: options.damping,
            kind: SpringKind::Linear {
                rest_length: to_kernel(options.rest_length),
                local_anchor_a: anchor(options.local_anchor_a),
                local_anchor_b: anchor(options.local_anchor_b),
                world_anchor_a: options.world_anchor_a.map(|(x, y)| point_to_kernel(x, y)),
                world_anchor_b: options.world_anchor_b.map(|(x, y)| point_to_kernel(x, y)),
            },
        };
        Some(self.add_spring(spring))
    }

    /// Creates and adds a rotational spring. `rest_angle` is radians.
    pub fn create_rotational_spring(
        &mut self,
        a: impl Into<BodyRef>,
        b: impl Into<BodyRef>,
        rest_angle: Option<f32>,
        stiffness: f32,
        damping: f32,
    ) -> Option<SpringId> {
        let (body_a, body_b) = self.resolve_pair(a.into(), b.into(), "Rotational Spring")?;
        let spring = Spring {
            body_a,
            body_b,
            stiffness,
            damping,
            kind: SpringKind::Rotational { rest_angle },
        };
        Some(self.add_spring(spring))
    }

    /// Adds a spring to the kernel.
    pub fn add_spring(&mut self, spring: Spring) -> SpringId {
        let id = self.kernel.add_spring(spring);
        self.emit(WorldEvent::SpringAdded(id));
        id
    }

    /// Removes a spring from the kernel.
    pub fn remove_spring(&mut self, id: SpringId) -> Option<Spring> {
        let spring = self.kernel.remove_spring(id)?;
        self.emit(WorldEvent::SpringRemoved(id));
        Some(spring)
    }

    // =========================================================================
    // Constraints
    // =========================================================================

    /// Locks B at a pixel offset and angle relative to A.
    pub fn create_lock_constraint(
        &mut self,
        a: impl Into<BodyRef>,
        b: impl Into<BodyRef>,
        offset: (f32, f32),
        angle: f32,
        max_force: f32,
    ) -> Option<ConstraintId> {
        let (body_a, body_b) = self.resolve_pair(a.into(), b.into(), "Constraint")?;
        Some(self.add_constraint(Constraint {
            body_a,
            body_b,
            max_force,
            kind: ConstraintKind::Lock {
                local_offset_b: point_to_kernel(offset.0, offset.1),
                local_angle_b: angle,
            },
        }))
    }

    /// Keeps two anchors a pixel distance apart.
    pub fn create_distance_constraint(
        &mut self,
        a: impl Into<BodyRef>,
        b: impl Into<BodyRef>,
        distance: f32,
        anchor_a: (f32, f32),
        anchor_b: (f32, f32),
        max_force: f32,
    ) -> Option<ConstraintId> {
        let (body_a, body_b) = self.resolve_pair(a.into(), b.into(), "Constraint")?;
        Some(self.add_constraint(Constraint {
            body_a,
            body_b,
            max_force,
            kind: ConstraintKind::Distance {
                distance: to_kernel(distance),
                local_anchor_a: point_to_kernel(anchor_a.0, anchor_a.1),
                local_anchor_b: point_to_kernel(anchor_b.0, anchor_b.1),
            },
        }))
    }

    /// Couples the rotation of two bodies.
    pub fn create_gear_constraint(&mut self, a: impl Into<BodyRef>, b: impl Into<BodyRef>, angle: f32, ratio: f32) -> Option<ConstraintId> {
        let (body_a, body_b) = self.resolve_pair(a.into(), b.into(), "Constraint")?;
        Some(self.add_constraint(Constraint {
            body_a,
            body_b,
            max_force: f32::MAX,
            kind: ConstraintKind::Gear { angle, ratio },
        }))
    }

    /// Pins two bodies together.
    ///
    /// With `world_pivot` set, both local pivots are derived from that one
    /// scene point and `pivot_a`/`pivot_b` are ignored.
    pub fn create_revolute_constraint(
        &mut self,
        a: impl Into<BodyRef>,
        pivot_a: (f32, f32),
        b: impl Into<BodyRef>,
        pivot_b: (f32, f32),
        max_force: f32,
        world_pivot: Option<(f32, f32)>,
    ) -> Option<ConstraintId> {
        let (body_a, body_b) = self.resolve_pair(a.into(), b.into(), "Constraint")?;
        let (pivot_a, pivot_b) = match world_pivot {
            Some((x, y)) => {
                let pivot = point_to_kernel(x, y);
                let local = |id| {
                    self.kernel
                        .body(id)
                        .map_or(Vec2::ZERO, |body| (pivot - body.position).rotate(-body.angle))
                };
                (local(body_a), local(body_b))
            }
            None => (point_to_kernel(pivot_a.0, pivot_a.1), point_to_kernel(pivot_b.0, pivot_b.1)),
        };
        Some(self.add_constraint(Constraint {
            body_a,
            body_b,
            max_force,
            kind: ConstraintKind::Revolute { pivot_a, pivot_b },
        }))
    }

    /// Lets B slide along an axis fixed in A.
    pub fn create_prismatic_constraint(
        &mut self,
        a: impl Into<BodyRef>,
        b: impl Into<BodyRef>,
        options: PrismaticOptions,
    ) -> Option<ConstraintId> {
        let (body_a, body_b) = self.resolve_pair(a.into(), b.into(), "Constraint")?;
        Some(self.add_constraint(Constraint {
            body_a,
            body_b,
            max_force: options.max_force,
            kind: ConstraintKind::Prismatic {
                local_anchor_a: point_to_kernel(options.anchor_a.0, options.anchor_a.1),
                local_anchor_b: point_to_kernel(options.anchor_b.0, options.anchor_b.1),
                local_axis_a: Vec2::new(options.axis.0, options.axis.1),
                lock_rotation: options.lock_rotation,
            },
        }))
    }

    /// Adds a constraint to the kernel.
    pub fn add_constraint(&mut self, constraint: Constraint) -> ConstraintId {
        let id = self.kernel.add_constraint(constraint);
        self.emit(WorldEvent::ConstraintAdded(id));
        id
    }

    /// Removes a constraint from the kernel.
    pub fn remove_constraint(&mut self, id: ConstraintId) -> Option<Constraint> {
        let constraint = self.kernel.remove_constraint(id)?;
        self.emit(WorldEvent::ConstraintRemoved(id));
        Some(constraint)
    }

    // =========================================================================
    // Materials
    // =========================================================================

    /// Creates a named material, optionally applying it to a body.
    pub fn create_material(&mut self, name: &str, body: Option<BodyHandle>) -> MaterialHandle {
        let kernel_id = self.kernel.create_material();
        let handle = self.materials.push(name, kernel_id);
        if let Some(body) = body {
            self.set_material(handle, &[body]);
        }
        handle
    }

    /// Looks up a named material.
    #[must_use]
    pub fn material(&self, handle: MaterialHandle) -> Option<&MaterialEntry> {
        self.materials.get(handle)
    }

    /// Every named material, creation order.
    #[must_use]
    pub fn materials(&self) -> &[MaterialEntry] {
        self.materials.entries()
    }

    /// Applies a material to every shape of the given bodies.
    pub fn set_material(&mut self, material: MaterialHandle, bodies: &[BodyHandle]) {
        let Some(kernel_material) = self.materials.get(material).map(MaterialEntry::kernel_id) else {
            return;
        };
        for &body in bodies {
            let Some(kernel_id) = self.registry.get(body).map(crate::body::Body::kernel_id) else {
                continue;
            };
            if let Some(kernel_body) = self.kernel.body_mut(kernel_id) {
                for shape in &mut kernel_body.shapes {
                    shape.material = Some(kernel_material);
                }
            }
        }
    }

    /// Applies a material to the given walls.
    pub fn set_wall_material(&mut self, material: MaterialHandle, walls: &[Wall]) {
        if let Some(entry) = self.materials.get(material) {
            self.bounds.set_material(&mut self.kernel, entry.kernel_id, walls);
        }
    }

    /// Creates and adds a contact material. Missing materials are created.
    ///
    /// Returns `None` if a handle doesn't belong to this World.
    pub fn create_contact_material(
        &mut self,
        a: Option<MaterialHandle>,
        b: Option<MaterialHandle>,
        options: ContactMaterialOptions,
    ) -> Option<ContactMaterialId> {
        let a = a.unwrap_or_else(|| self.create_material("", None));
        let b = b.unwrap_or_else(|| self.create_material("", None));
        let kernel_a = self.materials.get(a)?.kernel_id;
        let kernel_b = self.materials.get(b)?.kernel_id;
        Some(self.add_contact_material(ContactMaterial::new(kernel_a, kernel_b, options)))
    }

    /// Adds a contact material to the kernel.
    pub fn add_contact_material(&mut self, material: ContactMaterial) -> ContactMaterialId {
        let id = self.kernel.add_contact_material(material);
        self.emit(WorldEvent::ContactMaterialAdded(id));
        id
    }

    /// Removes a contact material from the kernel.
    pub fn remove_contact_material(&mut self, id: ContactMaterialId) -> Option<ContactMaterial> {
        let material = self.kernel.remove_contact_material(id)?;
        self.emit(WorldEvent::ContactMaterialRemoved(id));
        Some(material)
    }

    /// Finds the contact material between two named materials.
    #[must_use]
    pub fn get_contact_material(&self, a: MaterialHandle, b: MaterialHandle) -> Option<ContactMaterialId> {
        let a = self.materials.get(a)?.kernel_id;
        let b = self.materials.get(b)?.kernel_id;
        self.kernel.find_contact_material(a, b)
    }
}

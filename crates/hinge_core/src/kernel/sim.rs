//! # Reference Kernel
//!
//! `SimKernel` keeps the full kernel contract with the smallest possible
//! dynamics: semi-implicit Euler under gravity, Hooke springs and damping.
//! It has no broadphase, narrowphase or constraint solver. Contacts reach it
//! from outside through [`SimKernel::emit`], which queues them exactly like
//! a narrowphase would during `step`.

use super::event::{ContactEquation, KernelEvent, KernelEventKind};
use super::types::{
    BodyDef, BodyType, Constraint, ConstraintId, ContactMaterial, ContactMaterialId,
    ContactMaterialOptions, KernelBody, KernelBodyId, KernelSettings, Material, MaterialId,
    ShapeKind, Spring, SpringId, SpringKind,
};
use super::{Kernel, KernelSnapshot};
use crate::arena::Arena;
use crate::math::Vec2;

/// Minimal in-process kernel.
pub struct SimKernel {
    bodies: Arena<KernelBody>,
    simulated: Vec<KernelBodyId>,
    constraints: Arena<Constraint>,
    constraint_order: Vec<ConstraintId>,
    springs: Arena<Spring>,
    spring_order: Vec<SpringId>,
    materials: Arena<Material>,
    contact_materials: Arena<ContactMaterial>,
    contact_material_order: Vec<ContactMaterialId>,
    default_contact_material: ContactMaterialOptions,
    gravity: Vec2,
    settings: KernelSettings,
    time: f32,
    equations: Vec<ContactEquation>,
    listeners: [u32; 3],
    events: Vec<KernelEvent>,
    steps: u64,
}

const fn listener_slot(kind: KernelEventKind) -> usize {
    match kind {
        KernelEventKind::BeginContact => 0,
        KernelEventKind::EndContact => 1,
        KernelEventKind::Impact => 2,
    }
}

impl SimKernel {
    /// Creates an empty kernel with zero gravity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bodies: Arena::new(),
            simulated: Vec::new(),
            constraints: Arena::new(),
            constraint_order: Vec::new(),
            springs: Arena::new(),
            spring_order: Vec::new(),
            materials: Arena::new(),
            contact_materials: Arena::new(),
            contact_material_order: Vec::new(),
            default_contact_material: ContactMaterialOptions::default(),
            gravity: Vec2::ZERO,
            settings: KernelSettings::default(),
            time: 0.0,
            equations: Vec::new(),
            listeners: [0; 3],
            events: Vec::new(),
            steps: 0,
        }
    }

    /// Queues an event as if the narrowphase had produced it.
    ///
    /// The event is dropped unless a listener of its kind is registered.
    /// Impact events additionally require `emit_impact_event`.
    /// Begin-contact equations are kept until [`Kernel::clear_equations`].
    ///
    /// # Returns
    ///
    /// `true` if the event was queued.
    pub fn emit(&mut self, event: KernelEvent) -> bool {
        let kind = event.kind();
        if !self.is_subscribed(kind) {
            return false;
        }
        if kind == KernelEventKind::Impact && !self.settings.emit_impact_event {
            return false;
        }
        if let KernelEvent::BeginContact { equations, .. } = &event {
            self.equations.extend_from_slice(equations);
        }
        self.events.push(event);
        true
    }

    /// Number of registered listeners of a kind.
    #[must_use]
    pub const fn listener_count(&self, kind: KernelEventKind) -> u32 {
        self.listeners[listener_slot(kind)]
    }

    /// Solver equations currently held.
    #[must_use]
    pub fn equations(&self) -> &[ContactEquation] {
        &self.equations
    }

    /// Number of completed steps.
    #[must_use]
    pub const fn step_count(&self) -> u64 {
        self.steps
    }

    /// Anchor of a linear spring end in world space.
    fn spring_anchor(body: &KernelBody, local: Vec2, world: Option<Vec2>) -> Vec2 {
        world.unwrap_or_else(|| body.position + local.rotate(body.angle))
    }

    fn apply_spring_forces(&mut self) {
        for &id in &self.spring_order {
            let Some(spring) = self.springs.get(id) else {
                continue;
            };
            let SpringKind::Linear {
                rest_length,
                local_anchor_a,
                local_anchor_b,
                world_anchor_a,
                world_anchor_b,
            } = spring.kind
            else {
                continue;
            };
            let (Some(a), Some(b)) = (self.bodies.get(spring.body_a), self.bodies.get(spring.body_b)) else {
                continue;
            };

            let pa = Self::spring_anchor(a, local_anchor_a, world_anchor_a);
            let pb = Self::spring_anchor(b, local_anchor_b, world_anchor_b);
            let delta = pb - pa;
            let length = delta.length();
            if length <= f32::EPSILON {
                continue;
            }
            let dir = delta * (1.0 / length);
            let relative_velocity = b.velocity - a.velocity;
            let magnitude = spring.stiffness * (length - rest_length) + spring.damping * relative_velocity.dot(dir);
            let force = dir * magnitude;

            if let Some(a) = self.bodies.get_mut(spring.body_a) {
                a.force += force;
            }
            if let Some(b) = self.bodies.get_mut(spring.body_b) {
                b.force += -force;
            }
        }
    }
}

impl Default for SimKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel for SimKernel {
    fn create_body(&mut self, def: BodyDef) -> KernelBodyId {
        self.bodies.insert(KernelBody::from_def(def))
    }

    fn destroy_body(&mut self, id: KernelBodyId) -> bool {
        self.remove_body(id);
        self.bodies.remove(id).is_some()
    }

    fn body(&self, id: KernelBodyId) -> Option<&KernelBody> {
        self.bodies.get(id)
    }

    fn body_mut(&mut self, id: KernelBodyId) -> Option<&mut KernelBody> {
        self.bodies.get_mut(id)
    }

    fn add_body(&mut self, id: KernelBodyId) -> bool {
        if !self.bodies.contains(id) || self.simulated.contains(&id) {
            return false;
        }
        self.simulated.push(id);
        true
    }

    fn remove_body(&mut self, id: KernelBodyId) -> bool {
        let Some(pos) = self.simulated.iter().position(|&b| b == id) else {
            return false;
        };
        self.simulated.remove(pos);
        true
    }

    fn contains_body(&self, id: KernelBodyId) -> bool {
        self.simulated.contains(&id)
    }

    fn bodies(&self) -> &[KernelBodyId] {
        &self.simulated
    }

    fn add_constraint(&mut self, constraint: Constraint) -> ConstraintId {
        let id = self.constraints.insert(constraint);
        self.constraint_order.push(id);
        id
    }

    fn remove_constraint(&mut self, id: ConstraintId) -> Option<Constraint> {
        let removed = self.constraints.remove(id)?;
        self.constraint_order.retain(|&c| c != id);
        Some(removed)
    }

    fn constraint(&self, id: ConstraintId) -> Option<&Constraint> {
        self.constraints.get(id)
    }

    fn constraints(&self) -> &[ConstraintId] {
        &self.constraint_order
    }

    fn add_spring(&mut self, spring: Spring) -> SpringId {
        let id = self.springs.insert(spring);
        self.spring_order.push(id);
        id
    }

    fn remove_spring(&mut self, id: SpringId) -> Option<Spring> {
        let removed = self.springs.remove(id)?;
        self.spring_order.retain(|&s| s != id);
        Some(removed)
    }

    fn spring(&self, id: SpringId) -> Option<&Spring> {
        self.springs.get(id)
    }

    fn springs(&self) -> &[SpringId] {
        &self.spring_order
    }

    fn create_material(&mut self) -> MaterialId {
        self.materials.insert(Material)
    }

    fn add_contact_material(&mut self, material: ContactMaterial) -> ContactMaterialId {
        let id = self.contact_materials.insert(material);
        self.contact_material_order.push(id);
        id
    }

    fn remove_contact_material(&mut self, id: ContactMaterialId) -> Option<ContactMaterial> {
        let removed = self.contact_materials.remove(id)?;
        self.contact_material_order.retain(|&c| c != id);
        Some(removed)
    }

    fn contact_material(&self, id: ContactMaterialId) -> Option<&ContactMaterial> {
        self.contact_materials.get(id)
    }

    fn find_contact_material(&self, a: MaterialId, b: MaterialId) -> Option<ContactMaterialId> {
        self.contact_material_order
            .iter()
            .copied()
            .find(|&id| self.contact_materials.get(id).is_some_and(|cm| cm.matches(a, b)))
    }

    fn contact_materials(&self) -> &[ContactMaterialId] {
        &self.contact_material_order
    }

    fn default_contact_material(&self) -> &ContactMaterialOptions {
        &self.default_contact_material
    }

    fn default_contact_material_mut(&mut self) -> &mut ContactMaterialOptions {
        &mut self.default_contact_material
    }

    fn gravity(&self) -> Vec2 {
        self.gravity
    }

    fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = gravity;
    }

    fn settings(&self) -> &KernelSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut KernelSettings {
        &mut self.settings
    }

    fn time(&self) -> f32 {
        self.time
    }

    fn reset_time(&mut self) {
        self.time = 0.0;
    }

    fn clear_equations(&mut self) {
        self.equations.clear();
    }

    fn subscribe(&mut self, kind: KernelEventKind) {
        self.listeners[listener_slot(kind)] += 1;
    }

    fn unsubscribe(&mut self, kind: KernelEventKind) {
        let slot = &mut self.listeners[listener_slot(kind)];
        *slot = slot.saturating_sub(1);
    }

    fn is_subscribed(&self, kind: KernelEventKind) -> bool {
        self.listener_count(kind) > 0
    }

    fn drain_events(&mut self) -> Vec<KernelEvent> {
        std::mem::take(&mut self.events)
    }

    fn step(&mut self, dt: f32) {
        if self.settings.apply_spring_forces {
            self.apply_spring_forces();
        }

        let gravity = self.gravity;
        let settings = self.settings;
        for &id in &self.simulated {
            let Some(body) = self.bodies.get_mut(id) else {
                continue;
            };

            match body.body_type {
                BodyType::Static => {}
                BodyType::Dynamic => {
                    if settings.apply_gravity {
                        body.force += gravity * body.mass;
                    }
                    let inv_mass = body.inv_mass();
                    body.velocity += body.force * (inv_mass * dt);
                    if settings.apply_damping {
                        body.velocity = body.velocity * (1.0 - body.damping).powf(dt);
                        body.angular_velocity *= (1.0 - body.angular_damping).powf(dt);
                    }
                    body.position += body.velocity * dt;
                    body.angle += body.angular_velocity * dt;
                }
                BodyType::Kinematic => {
                    body.position += body.velocity * dt;
                    body.angle += body.angular_velocity * dt;
                }
            }
            body.force = Vec2::ZERO;
        }

        self.time += dt;
        self.steps += 1;
    }

    fn hit_test(&self, point: Vec2, candidates: &[KernelBodyId], precision: f32) -> Vec<KernelBodyId> {
        candidates
            .iter()
            .copied()
            .filter(|&id| {
                self.bodies.get(id).is_some_and(|body| {
                    let local = (point - body.position).rotate(-body.angle);
                    body.shapes.iter().any(|shape| {
                        let p = (local - shape.offset).rotate(-shape.angle);
                        match shape.kind {
                            ShapeKind::Circle { radius } => p.length_squared() <= radius * radius,
                            ShapeKind::Rectangle { width, height } => {
                                p.x.abs() <= width * 0.5 && p.y.abs() <= height * 0.5
                            }
                            ShapeKind::Plane => p.y <= 0.0,
                            ShapeKind::Particle => p.length_squared() <= precision * precision,
                        }
                    })
                })
            })
            .collect()
    }

    fn snapshot(&self) -> KernelSnapshot {
        KernelSnapshot {
            time: self.time,
            gravity: self.gravity,
            bodies: self
                .simulated
                .iter()
                .filter_map(|&id| self.bodies.get(id).map(|b| (id, b.clone())))
                .collect(),
            constraints: self
                .constraint_order
                .iter()
                .filter_map(|&id| self.constraints.get(id).map(|c| (id, *c)))
                .collect(),
            springs: self
                .spring_order
                .iter()
                .filter_map(|&id| self.springs.get(id).map(|s| (id, *s)))
                .collect(),
            contact_materials: self
                .contact_material_order
                .iter()
                .filter_map(|&id| self.contact_materials.get(id).map(|c| (id, *c)))
                .collect(),
            settings: self.settings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{Shape, ShapeRef};

    fn dynamic_body(kernel: &mut SimKernel, x: f32, y: f32) -> KernelBodyId {
        let id = kernel.create_body(BodyDef::new(Vec2::new(x, y), 0.0, 1.0));
        assert!(kernel.add_body(id));
        id
    }

    #[test]
    fn test_add_body_is_idempotent() {
        let mut kernel = SimKernel::new();
        let id = dynamic_body(&mut kernel, 0.0, 0.0);

        assert!(!kernel.add_body(id));
        assert_eq!(kernel.bodies().len(), 1);

        assert!(kernel.remove_body(id));
        assert!(!kernel.remove_body(id));
        assert!(kernel.body(id).is_some());

        assert!(kernel.destroy_body(id));
        assert!(kernel.body(id).is_none());
        assert!(!kernel.add_body(id));
    }

    #[test]
    fn test_step_integrates_gravity() {
        let mut kernel = SimKernel::new();
        kernel.set_gravity(Vec2::new(0.0, -10.0));
        kernel.settings_mut().apply_damping = false;
        let id = dynamic_body(&mut kernel, 0.0, 0.0);

        kernel.step(0.5);

        let body = kernel.body(id).unwrap();
        assert!((body.velocity.y + 5.0).abs() < 1e-5);
        assert!((body.position.y + 2.5).abs() < 1e-5);
        assert!((kernel.time() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_static_bodies_do_not_move() {
        let mut kernel = SimKernel::new();
        kernel.set_gravity(Vec2::new(0.0, -10.0));
        let id = kernel.create_body(BodyDef::new(Vec2::new(1.0, 1.0), 0.0, 0.0));
        kernel.add_body(id);

        kernel.step(1.0);
        assert_eq!(kernel.body(id).unwrap().position, Vec2::new(1.0, 1.0));
    }

    #[test]
    fn test_emit_requires_listener() {
        let mut kernel = SimKernel::new();
        let a = dynamic_body(&mut kernel, 0.0, 0.0);
        let b = dynamic_body(&mut kernel, 1.0, 0.0);
        let event = KernelEvent::EndContact {
            shape_a: ShapeRef::new(a, 0),
            shape_b: ShapeRef::new(b, 0),
        };

        assert!(!kernel.emit(event.clone()));
        kernel.subscribe(KernelEventKind::EndContact);
        assert!(kernel.emit(event));
        assert_eq!(kernel.drain_events().len(), 1);
        assert!(kernel.drain_events().is_empty());

        kernel.unsubscribe(KernelEventKind::EndContact);
        kernel.unsubscribe(KernelEventKind::EndContact);
        assert_eq!(kernel.listener_count(KernelEventKind::EndContact), 0);
    }

    #[test]
    fn test_hit_test_shapes() {
        let mut kernel = SimKernel::new();
        let circle = dynamic_body(&mut kernel, 0.0, 0.0);
        kernel.body_mut(circle).unwrap().add_shape(Shape::new(ShapeKind::Circle { radius: 1.0 }));
        let particle = dynamic_body(&mut kernel, 5.0, 0.0);
        kernel.body_mut(particle).unwrap().add_shape(Shape::new(ShapeKind::Particle));

        let all = kernel.bodies().to_vec();
        assert_eq!(kernel.hit_test(Vec2::new(0.5, 0.5), &all, 0.1), vec![circle]);
        assert!(kernel.hit_test(Vec2::new(5.2, 0.0), &all, 0.1).is_empty());
        assert_eq!(kernel.hit_test(Vec2::new(5.2, 0.0), &all, 0.5), vec![particle]);
    }

    #[test]
    fn test_collections_keep_insertion_order() {
        let mut kernel = SimKernel::new();
        let a = dynamic_body(&mut kernel, 0.0, 0.0);
        let b = dynamic_body(&mut kernel, 1.0, 0.0);
        let spring = |stiffness| Spring {
            body_a: a,
            body_b: b,
            stiffness,
            damping: 1.0,
            kind: SpringKind::Rotational { rest_angle: None },
        };

        let s1 = kernel.add_spring(spring(1.0));
        let s2 = kernel.add_spring(spring(2.0));
        let s3 = kernel.add_spring(spring(3.0));
        assert_eq!(kernel.springs(), &[s1, s2, s3]);

        kernel.remove_spring(s2);
        assert_eq!(kernel.springs(), &[s1, s3]);
        assert!(kernel.remove_spring(s2).is_none());
    }

    #[test]
    fn test_linear_spring_pulls_bodies_together() {
        let mut kernel = SimKernel::new();
        kernel.settings_mut().apply_damping = false;
        let a = dynamic_body(&mut kernel, 0.0, 0.0);
        let b = dynamic_body(&mut kernel, 4.0, 0.0);
        kernel.add_spring(Spring {
            body_a: a,
            body_b: b,
            stiffness: 10.0,
            damping: 0.0,
            kind: SpringKind::Linear {
                rest_length: 2.0,
                local_anchor_a: Vec2::ZERO,
                local_anchor_b: Vec2::ZERO,
                world_anchor_a: None,
                world_anchor_b: None,
            },
        });

        kernel.step(0.1);

        assert!(kernel.body(a).unwrap().velocity.x > 0.0);
        assert!(kernel.body(b).unwrap().velocity.x < 0.0);
    }
}

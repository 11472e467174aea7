//! # World Bounds
//!
//! Four static walls, each a single half-plane on a mass-0 body. Walls are
//! created on an absent -> present transition only; afterwards they are
//! moved in place.
//!
//! ```text
//!             top (x + w/2, y)
//!          ┌───────────────────┐
//!   left   │                   │  right
//! (x, y+h/2)                   (x+w, y+h/2)
//!          │                   │
//!          └───────────────────┘
//!           bottom (x + w/2, y + h)
//! ```

use std::f32::consts::{FRAC_PI_2, PI};

use hinge_core::{BodyDef, Kernel, KernelBodyId, MaterialId, Shape, ShapeKind, DEFAULT_COLLISION_MASK};

use crate::collision::CollisionGroup;
use crate::config::BoundsConfig;
use crate::coords::point_to_kernel;

/// One side of the bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Wall {
    /// Left wall.
    Left,
    /// Right wall.
    Right,
    /// Top wall.
    Top,
    /// Bottom wall.
    Bottom,
}

impl Wall {
    /// All four walls.
    pub const ALL: [Self; 4] = [Self::Left, Self::Right, Self::Top, Self::Bottom];

    const fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
            Self::Top => 2,
            Self::Bottom => 3,
        }
    }

    /// Angle of the wall's plane; the normal faces into the bounds.
    #[must_use]
    pub const fn angle(self) -> f32 {
        match self {
            Self::Left => FRAC_PI_2,
            Self::Right => -FRAC_PI_2,
            Self::Top => PI,
            Self::Bottom => 0.0,
        }
    }

    /// Scene position of the wall for a bounds rectangle.
    #[must_use]
    pub fn position(self, x: f32, y: f32, width: f32, height: f32) -> (f32, f32) {
        match self {
            Self::Left => (x, y + height * 0.5),
            Self::Right => (x + width, y + height * 0.5),
            Self::Top => (x + width * 0.5, y),
            Self::Bottom => (x + width * 0.5, y + height),
        }
    }

    const fn enabled(self, config: &BoundsConfig) -> bool {
        match self {
            Self::Left => config.left,
            Self::Right => config.right,
            Self::Top => config.top,
            Self::Bottom => config.bottom,
        }
    }
}

/// Wall flags for one `set_bounds` call. `None` reuses the remembered value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BoundsUpdate {
    /// Left wall.
    pub left: Option<bool>,
    /// Right wall.
    pub right: Option<bool>,
    /// Top wall.
    pub top: Option<bool>,
    /// Bottom wall.
    pub bottom: Option<bool>,
    /// Use the shared bounds collision group.
    pub own_group: Option<bool>,
}

impl BoundsUpdate {
    /// Reuses every remembered flag.
    #[must_use]
    pub const fn remembered() -> Self {
        Self {
            left: None,
            right: None,
            top: None,
            bottom: None,
            own_group: None,
        }
    }

    /// Sets every flag.
    #[must_use]
    pub const fn all(left: bool, right: bool, top: bool, bottom: bool, own_group: bool) -> Self {
        Self {
            left: Some(left),
            right: Some(right),
            top: Some(top),
            bottom: Some(bottom),
            own_group: Some(own_group),
        }
    }

    /// Sets one wall's flag.
    #[must_use]
    pub const fn wall(mut self, wall: Wall, enabled: bool) -> Self {
        match wall {
            Wall::Left => self.left = Some(enabled),
            Wall::Right => self.right = Some(enabled),
            Wall::Top => self.top = Some(enabled),
            Wall::Bottom => self.bottom = Some(enabled),
        }
        self
    }

    /// Sets the own-group flag.
    #[must_use]
    pub const fn own_group(mut self, own_group: bool) -> Self {
        self.own_group = Some(own_group);
        self
    }

    fn resolve(self, remembered: BoundsConfig) -> BoundsConfig {
        BoundsConfig {
            left: self.left.unwrap_or(remembered.left),
            right: self.right.unwrap_or(remembered.right),
            top: self.top.unwrap_or(remembered.top),
            bottom: self.bottom.unwrap_or(remembered.bottom),
            own_group: self.own_group.unwrap_or(remembered.own_group),
        }
    }
}

impl From<BoundsConfig> for BoundsUpdate {
    fn from(config: BoundsConfig) -> Self {
        Self::all(config.left, config.right, config.top, config.bottom, config.own_group)
    }
}

/// The four walls and the flags they were last built with.
#[derive(Debug)]
pub struct BoundsManager {
    walls: [Option<KernelBodyId>; 4],
    config: BoundsConfig,
    collides_with: u32,
}

impl BoundsManager {
    /// Creates a manager with no walls.
    #[must_use]
    pub const fn new(config: BoundsConfig) -> Self {
        Self {
            walls: [None; 4],
            config,
            collides_with: 0,
        }
    }

    /// Kernel body of a wall, if it exists.
    #[must_use]
    pub const fn wall(&self, wall: Wall) -> Option<KernelBodyId> {
        self.walls[wall.index()]
    }

    /// Flags remembered from the last call.
    #[must_use]
    pub const fn config(&self) -> BoundsConfig {
        self.config
    }

    /// Groups OR-ed into every wall's mask on top of the default.
    #[must_use]
    pub const fn collides_with(&self) -> u32 {
        self.collides_with
    }

    /// Creates, moves or removes each wall to match the flags.
    pub fn set_bounds<K: Kernel>(&mut self, kernel: &mut K, x: f32, y: f32, width: f32, height: f32, update: BoundsUpdate) {
        let config = update.resolve(self.config);
        for wall in Wall::ALL {
            let (wx, wy) = wall.position(x, y, width, height);
            self.setup_wall(kernel, wall, wall.enabled(&config), wx, wy, config.own_group);
        }
        self.config = config;
    }

    fn setup_wall<K: Kernel>(&mut self, kernel: &mut K, wall: Wall, create: bool, x: f32, y: f32, own_group: bool) {
        let slot = &mut self.walls[wall.index()];

        if !create {
            if let Some(id) = slot.take() {
                kernel.remove_body(id);
                kernel.destroy_body(id);
                tracing::debug!("Removed {:?} wall", wall);
            }
            return;
        }

        let position = point_to_kernel(x, y);
        let id = if let Some(id) = *slot {
            if let Some(body) = kernel.body_mut(id) {
                body.position = position;
            }
            tracing::debug!("Moved {:?} wall to ({}, {})", wall, x, y);
            id
        } else {
            let id = kernel.create_body(BodyDef::new(position, wall.angle(), 0.0));
            if let Some(body) = kernel.body_mut(id) {
                let mut plane = Shape::new(ShapeKind::Plane);
                plane.collision_mask = DEFAULT_COLLISION_MASK | self.collides_with;
                body.add_shape(plane);
            }
            kernel.add_body(id);
            *slot = Some(id);
            tracing::debug!("Created {:?} wall at ({}, {})", wall, x, y);
            id
        };

        if own_group {
            Self::set_wall_group(kernel, id, CollisionGroup::BOUNDS);
        }
    }

    fn set_wall_group<K: Kernel>(kernel: &mut K, id: KernelBodyId, group: CollisionGroup) {
        if let Some(shape) = kernel.body_mut(id).and_then(|b| b.shapes.first_mut()) {
            shape.collision_group = group.mask();
        }
    }

    /// Moves all walls into the bounds group, or all into `EVERYTHING`.
    pub fn update_collision_group<K: Kernel>(&mut self, kernel: &mut K, use_own_group: bool) {
        let group = if use_own_group {
            CollisionGroup::BOUNDS
        } else {
            CollisionGroup::EVERYTHING
        };
        for id in self.walls.iter().flatten() {
            Self::set_wall_group(kernel, *id, group);
        }
        self.config.own_group = use_own_group;
    }

    /// Lets every wall, present and future, collide with `group`.
    pub fn add_to_masks<K: Kernel>(&mut self, kernel: &mut K, group: CollisionGroup) {
        self.collides_with |= group.mask();
        for id in self.walls.iter().flatten() {
            if let Some(shape) = kernel.body_mut(*id).and_then(|b| b.shapes.first_mut()) {
                shape.collision_mask |= group.mask();
            }
        }
    }

    /// Sets the material of the given walls.
    pub fn set_material<K: Kernel>(&self, kernel: &mut K, material: MaterialId, walls: &[Wall]) {
        for wall in walls {
            if let Some(shape) = self
                .wall(*wall)
                .and_then(|id| kernel.body_mut(id))
                .and_then(|b| b.shapes.first_mut())
            {
                shape.material = Some(material);
            }
        }
    }

    /// Frees every wall and forgets the mask whitelist. Remembered flags
    /// survive.
    pub fn forget_walls<K: Kernel>(&mut self, kernel: &mut K) {
        for slot in &mut self.walls {
            if let Some(id) = slot.take() {
                kernel.destroy_body(id);
            }
        }
        self.collides_with = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hinge_core::SimKernel;

    #[test]
    fn test_walls_created_once() {
        let mut kernel = SimKernel::new();
        let mut bounds = BoundsManager::new(BoundsConfig::default());

        bounds.set_bounds(&mut kernel, 0.0, 0.0, 800.0, 600.0, BoundsUpdate::remembered());
        let first = bounds.wall(Wall::Left);
        bounds.set_bounds(&mut kernel, 10.0, 0.0, 800.0, 600.0, BoundsUpdate::remembered());

        assert_eq!(kernel.bodies().len(), 4);
        assert_eq!(bounds.wall(Wall::Left), first);
        let left = kernel.body(first.unwrap()).unwrap();
        assert!((left.position.x + 0.5).abs() < 1e-6);
        assert!((left.angle - FRAC_PI_2).abs() < f32::EPSILON);
    }

    #[test]
    fn test_omitted_flags_are_remembered() {
        let mut kernel = SimKernel::new();
        let mut bounds = BoundsManager::new(BoundsConfig::default());

        bounds.set_bounds(&mut kernel, 0.0, 0.0, 100.0, 100.0, BoundsUpdate::remembered().wall(Wall::Top, false));
        assert!(bounds.wall(Wall::Top).is_none());
        assert_eq!(kernel.bodies().len(), 3);

        bounds.set_bounds(&mut kernel, 0.0, 0.0, 200.0, 200.0, BoundsUpdate::remembered());
        assert!(bounds.wall(Wall::Top).is_none());
        assert!(!bounds.config().top);
    }

    #[test]
    fn test_new_walls_inherit_mask_whitelist() {
        let mut kernel = SimKernel::new();
        let mut bounds = BoundsManager::new(BoundsConfig::default());
        bounds.add_to_masks(&mut kernel, CollisionGroup::EVERYTHING);

        bounds.set_bounds(&mut kernel, 0.0, 0.0, 10.0, 10.0, BoundsUpdate::remembered());
        let id = bounds.wall(Wall::Bottom).unwrap();
        let mask = kernel.body(id).unwrap().shapes[0].collision_mask;
        assert_eq!(mask, 1 | (1 << 31));
    }
}

//! # World Configuration
//!
//! Loaded once, before the World is built. Every field has a default, so an
//! empty TOML document is a valid configuration:
//!
//! ```toml
//! gravity = [0.0, 10.0]
//! frame_rate = 0.016666668
//! impact_events = true
//!
//! [viewport]
//! width = 800.0
//! height = 600.0
//!
//! [bounds]
//! top = false
//!
//! [kernel]
//! friction = 0.5
//! ```

use std::path::Path;

use hinge_core::{KernelSettings, SleepMode};
use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, PhysicsResult};

/// Default fixed timestep: one frame at 60 Hz.
pub const DEFAULT_FRAME_RATE: f32 = 1.0 / 60.0;

/// Default capacity of the World notification channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 4096;

/// Host renderer size in scene pixels.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl Viewport {
    /// Creates a viewport.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Which walls exist, and whether they use the dedicated bounds group.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundsConfig {
    /// Left wall.
    pub left: bool,
    /// Right wall.
    pub right: bool,
    /// Top wall.
    pub top: bool,
    /// Bottom wall.
    pub bottom: bool,
    /// Put the walls in the shared bounds collision group.
    pub own_group: bool,
}

impl Default for BoundsConfig {
    fn default() -> Self {
        Self {
            left: true,
            right: true,
            top: true,
            bottom: true,
            own_group: false,
        }
    }
}

/// Kernel tuning applied at construction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Friction of the default contact material.
    pub friction: f32,
    /// Restitution of the default contact material.
    pub restitution: f32,
    /// Apply gravity to dynamic bodies.
    pub apply_gravity: bool,
    /// Apply body damping.
    pub apply_damping: bool,
    /// Apply spring forces.
    pub apply_spring_forces: bool,
    /// Run the constraint solver.
    pub solve_constraints: bool,
    /// Sleep policy.
    pub sleep_mode: SleepMode,
    /// Let the kernel raise impact events.
    pub emit_impact_event: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        let settings = KernelSettings::default();
        Self {
            friction: 0.3,
            restitution: 0.0,
            apply_gravity: settings.apply_gravity,
            apply_damping: settings.apply_damping,
            apply_spring_forces: settings.apply_spring_forces,
            solve_constraints: settings.solve_constraints,
            sleep_mode: settings.sleep_mode,
            emit_impact_event: settings.emit_impact_event,
        }
    }
}

impl KernelConfig {
    /// The kernel switches carried by this config.
    #[must_use]
    pub const fn settings(&self) -> KernelSettings {
        KernelSettings {
            apply_gravity: self.apply_gravity,
            apply_damping: self.apply_damping,
            apply_spring_forces: self.apply_spring_forces,
            solve_constraints: self.solve_constraints,
            sleep_mode: self.sleep_mode,
            emit_impact_event: self.emit_impact_event,
        }
    }
}

/// Configuration for a physics World.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Gravity in scene units (y down). Sign-inverted into the kernel.
    pub gravity: [f32; 2],
    /// Fixed timestep in seconds.
    pub frame_rate: f32,
    /// Host renderer size. `None` until the host is set up.
    pub viewport: Option<Viewport>,
    /// Initial walls, built at construction when a viewport is known.
    pub bounds: BoundsConfig,
    /// Attach the impact listener at construction.
    pub impact_events: bool,
    /// Notifications buffered per subscriber.
    pub event_capacity: usize,
    /// Kernel tuning.
    pub kernel: KernelConfig,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, 0.0],
            frame_rate: DEFAULT_FRAME_RATE,
            viewport: None,
            bounds: BoundsConfig::default(),
            impact_events: false,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            kernel: KernelConfig::default(),
        }
    }
}

impl WorldConfig {
    /// Default configuration with a viewport, ready for `set_bounds_to_world`.
    #[must_use]
    pub fn with_viewport(width: f32, height: f32) -> Self {
        Self {
            viewport: Some(Viewport::new(width, height)),
            ..Self::default()
        }
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::Config`] on malformed TOML or invalid values.
    pub fn from_toml_str(source: &str) -> PhysicsResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| PhysicsError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::Io`] if the file can't be read, otherwise as
    /// [`WorldConfig::from_toml_str`].
    pub fn from_file(path: impl AsRef<Path>) -> PhysicsResult<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`PhysicsError::Config`] naming the first bad field.
    pub fn validate(&self) -> PhysicsResult<()> {
        if !self.gravity.iter().all(|g| g.is_finite()) {
            return Err(PhysicsError::Config("gravity must be finite".into()));
        }
        if !(self.frame_rate.is_finite() && self.frame_rate > 0.0) {
            return Err(PhysicsError::Config("frame_rate must be positive".into()));
        }
        if let Some(viewport) = self.viewport {
            if !(viewport.width.is_finite() && viewport.height.is_finite()) {
                return Err(PhysicsError::Config("viewport must be finite".into()));
            }
        }
        if self.event_capacity == 0 {
            return Err(PhysicsError::Config("event_capacity must be non-zero".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = WorldConfig::from_toml_str("").unwrap();
        assert_eq!(config, WorldConfig::default());
        assert!((config.frame_rate - DEFAULT_FRAME_RATE).abs() < f32::EPSILON);
        assert!(config.bounds.left && config.bounds.bottom);
        assert!(!config.bounds.own_group);
        assert!(!config.impact_events);
    }

    #[test]
    fn test_parse_nested_sections() {
        let config = WorldConfig::from_toml_str(
            r#"
            gravity = [0.0, 10.0]
            impact_events = true

            [viewport]
            width = 800.0
            height = 600.0

            [bounds]
            top = false

            [kernel]
            friction = 0.5
            sleep_mode = "BodySleeping"
            "#,
        )
        .unwrap();

        assert_eq!(config.gravity, [0.0, 10.0]);
        assert!(config.impact_events);
        assert_eq!(config.viewport, Some(Viewport::new(800.0, 600.0)));
        assert!(!config.bounds.top);
        assert!(config.bounds.left);
        assert!((config.kernel.friction - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.kernel.settings().sleep_mode, SleepMode::BodySleeping);
    }

    #[test]
    fn test_rejects_bad_frame_rate() {
        let err = WorldConfig::from_toml_str("frame_rate = 0.0").unwrap_err();
        assert!(matches!(err, PhysicsError::Config(_)));

        let err = WorldConfig::from_toml_str("gravity = [").unwrap_err();
        assert!(matches!(err, PhysicsError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = WorldConfig::from_file("/nonexistent/hinge/world.toml").unwrap_err();
        assert!(matches!(err, PhysicsError::Io(_)));
    }
}

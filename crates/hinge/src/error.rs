//! # Physics Error Types
//!
//! Failures the World reports as values. Misuse that the World can recover
//! from (unresolvable body references, duplicate registration) is logged or
//! ignored instead and never shows up here.

use thiserror::Error;

/// Errors that can occur in the physics world.
#[derive(Error, Debug)]
pub enum PhysicsError {
    /// Every collision group bit has been handed out.
    #[error("collision groups exhausted: bit {bit} exceeds the 32-bit mask")]
    CollisionGroupsExhausted {
        /// The bit index that was requested.
        bit: u32,
    },

    /// The World was used before setup completed, or after `destroy`.
    #[error("physics world is not set up")]
    NotSetup,

    /// Invalid configuration file or value.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Reading a configuration file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot serialization failed.
    #[error("serialization failed: {0}")]
    Serialize(String),
}

/// Result type for physics operations.
pub type PhysicsResult<T> = Result<T, PhysicsError>;

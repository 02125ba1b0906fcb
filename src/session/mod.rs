//! Connection session: state machine, configuration and builder.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Session`] | Connect, write, disconnect; owns the state machine |
//! | [`SessionBuilder`] | Fluent configuration builder |
//! | [`SessionConfig`] | Service UUID, timeouts and buffer sizes |
//! | [`SessionState`] | Snapshot of the state machine |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for session configuration.
pub mod builder;

/// Session tunables and defaults.
pub mod config;

/// Core session implementation.
pub mod core;

/// Connection state machine.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::SessionBuilder;
pub use config::{SPP_SERVICE_UUID, SessionConfig};
pub use core::Session;
pub use state::SessionState;

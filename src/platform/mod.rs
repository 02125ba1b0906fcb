//! Platform Bluetooth capability interface.
//!
//! The crate never talks to a radio directly. Hosts implement [`Adapter`]
//! and [`RfcommSocket`] on top of their native stack (BlueZ, Android,
//! WinRT, ...) and hand the adapter to a [`SessionBuilder`](crate::SessionBuilder).
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `adapter` | Capability traits implemented by hosts |
//! | `loopback` | In-process adapter with scripted peers |

// ============================================================================
// Submodules
// ============================================================================

/// Capability traits implemented by hosts.
pub mod adapter;

/// In-process adapter with scripted peers.
pub mod loopback;

// ============================================================================
// Re-exports
// ============================================================================

pub use adapter::{Adapter, RfcommSocket};
pub use loopback::{LoopbackAdapter, LoopbackStats, PeerBehavior};

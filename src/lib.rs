//! SPP Link - Point-to-point Bluetooth serial connection manager.
//!
//! This library manages a single RFCOMM (Serial Port Profile) link to a
//! paired device: pick a device, open a stream socket, read inbound bytes
//! in the background and write outbound bytes on demand.
//!
//! # Architecture
//!
//! The session follows a producer/consumer model:
//!
//! - **Session**: Owns the state machine and the current connection
//! - **Receive loop**: One background task per connection, publishes inbound data
//! - **Send gate**: Serializes writes to the current connection
//! - **Event stream**: Ordered lifecycle and data events for the application
//!
//! Key design principles:
//!
//! - At most one connection per session at a time
//! - Blocking socket work never runs on the caller's task
//! - Exactly one `Disconnected` per `Connected`, always last for that connection
//! - The platform radio sits behind the [`Adapter`] trait
//!
//! # Quick Start
//!
//! ```no_run
//! use spp_link::{Device, Event, LoopbackAdapter, PeerBehavior, Result, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let adapter = LoopbackAdapter::new()
//!         .with_device(Device::new("00:11:22:33:44:55", "ESP32-Sensor"), PeerBehavior::echo());
//!
//!     let (session, mut events) = Session::builder().adapter(adapter).build()?;
//!
//!     let device = session.catalog().find_by_name("ESP32-Sensor").expect("paired");
//!     session.connect(&device).await?;
//!     session.write(b"PING\n").await?;
//!
//!     while let Some(event) = events.recv().await {
//!         if let Event::DataReceived { data, .. } = event {
//!             println!("Received {} bytes", data.len());
//!             break;
//!         }
//!     }
//!
//!     session.disconnect()?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`catalog`] | Paired-device lookup |
//! | [`device`] | Remote device descriptor |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`event`] | Lifecycle and data events |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`platform`] | Adapter and socket traits, loopback adapter |
//! | [`session`] | Session, builder and configuration |
//! | [`transport`] | Connection, receive loop and write gate (internal) |

// ============================================================================
// Modules
// ============================================================================

/// Paired-device lookup.
///
/// Use [`DeviceCatalog::list_candidates`] to filter by name.
pub mod catalog;

/// Remote device descriptor.
pub mod device;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Lifecycle and data events.
pub mod event;

/// Type-safe identifiers.
///
/// Newtype wrappers prevent mixing addresses and connection IDs.
pub mod identifiers;

/// Platform abstraction.
///
/// [`Adapter`] and [`RfcommSocket`] hide the Bluetooth stack;
/// [`LoopbackAdapter`] is an in-process implementation.
pub mod platform;

/// Connection session.
///
/// Use [`Session::builder()`] to create a configured session.
pub mod session;

/// Socket transport layer.
///
/// Internal module handling the connection, receive loop and write path.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Catalog types
pub use catalog::DeviceCatalog;
pub use device::Device;

// Error types
pub use error::{Error, Result};

// Event types
pub use event::{DisconnectReason, Event, EventStream};

// Identifier types
pub use identifiers::{ConnectionId, DeviceAddress};

// Platform types
pub use platform::{Adapter, LoopbackAdapter, LoopbackStats, PeerBehavior, RfcommSocket};

// Session types
pub use session::{SPP_SERVICE_UUID, Session, SessionBuilder, SessionConfig, SessionState};

// Transport types
pub use transport::Connection;

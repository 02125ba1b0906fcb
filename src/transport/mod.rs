//! Byte-stream transport over an established RFCOMM socket.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                          ┌──────────────────┐
//! │  Session         │                          │  Peer device     │
//! │                  │      RFCOMM / SPP        │                  │
//! │  ReceiveLoop  ◄──┼──────────────────────────┼── serial out     │
//! │  SendGate     ───┼──────────────────────────┼─► serial in      │
//! └──────────────────┘                          └──────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `SocketHandle::new` - Wrap the socket allocated by the adapter
//! 2. `SocketHandle::connect` - Run the handshake (cancellable by close)
//! 3. `Connection::established` - Promote the handle, allocate an ID
//! 4. `ReceiveLoop::spawn` / `SendGate::activate` - Start I/O
//! 5. `Connection::close` - Stop everything; first reason wins
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Socket ownership and closure |
//! | `receiver` | Background read loop |
//! | `send_gate` | Serialized write path |

// ============================================================================
// Submodules
// ============================================================================

/// Socket ownership and closure.
pub mod connection;

/// Background read loop.
pub(crate) mod receiver;

/// Serialized write path.
pub(crate) mod send_gate;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::Connection;
pub(crate) use connection::SocketHandle;
pub(crate) use receiver::ReceiveLoop;
pub(crate) use send_gate::SendGate;

//! Connection state machine.
//!
//! ```text
//!            connect()                handshake ok
//!   Idle ───────────────► Connecting ──────────────► Connected
//!    ▲                      │   │                       │
//!    │       handshake err, │   │ cancel()              │ read failure,
//!    │       timeout        ▼   ▼                       │ disconnect()
//!    └─────────────────── Closed ◄──────────────────────┘
//!          (connect() allowed from Idle and Closed)
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::device::Device;
use crate::identifiers::ConnectionId;
use crate::transport::{Connection, SocketHandle};

// ============================================================================
// ConnectionState
// ============================================================================

/// Internal state, owned by the session.
pub(crate) enum ConnectionState {
    Idle,
    Connecting {
        device: Device,
        attempt: Arc<SocketHandle>,
    },
    Connected(Connection),
    Closed,
}

impl ConnectionState {
    /// Returns `true` if `connect` may start from this state.
    pub(crate) fn accepts_connect(&self) -> bool {
        matches!(self, Self::Idle | Self::Closed)
    }

    /// Returns `true` if `attempt` is the in-flight handshake.
    pub(crate) fn is_attempt(&self, attempt: &Arc<SocketHandle>) -> bool {
        matches!(self, Self::Connecting { attempt: current, .. } if Arc::ptr_eq(current, attempt))
    }

    /// Returns `true` if `id` is the live connection.
    pub(crate) fn is_connection(&self, id: ConnectionId) -> bool {
        matches!(self, Self::Connected(connection) if connection.id() == id)
    }

    pub(crate) fn snapshot(&self) -> SessionState {
        match self {
            Self::Idle => SessionState::Idle,
            Self::Connecting { device, .. } => SessionState::Connecting {
                device: device.clone(),
            },
            Self::Connected(connection) => SessionState::Connected {
                device: connection.device().clone(),
                connection: connection.id(),
            },
            Self::Closed => SessionState::Closed,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.snapshot(), f)
    }
}

// ============================================================================
// SessionState
// ============================================================================

/// Public snapshot of the session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No connection has been attempted yet.
    Idle,
    /// Handshake in progress.
    Connecting {
        /// Target device.
        device: Device,
    },
    /// Link established.
    Connected {
        /// Peer device.
        device: Device,
        /// Live connection.
        connection: ConnectionId,
    },
    /// The last attempt or connection ended.
    Closed,
}

impl SessionState {
    /// Returns `true` if a link is established.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    /// Returns `true` if `connect` would be accepted.
    #[inline]
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle | Self::Closed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Connecting { device } => write!(f, "connecting to {}", device.address()),
            Self::Connected { device, .. } => write!(f, "connected to {}", device.address()),
            Self::Closed => f.write_str("closed"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_preconditions() {
        assert!(ConnectionState::Idle.accepts_connect());
        assert!(ConnectionState::Closed.accepts_connect());
    }

    #[test]
    fn test_state_display() {
        let device = Device::new("AA:BB", "x");
        assert_eq!(SessionState::Idle.to_string(), "idle");
        assert_eq!(
            SessionState::Connecting { device }.to_string(),
            "connecting to AA:BB"
        );
        assert!(SessionState::Closed.is_idle());
        assert!(!SessionState::Closed.is_connected());
    }
}

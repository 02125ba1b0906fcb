//! Type-safe identifier wrappers.
//!
//! Newtypes keep platform device addresses and per-connection IDs from
//! being mixed up with plain strings or integers.
//!
//! | Type | Backing | Source |
//! |------|---------|--------|
//! | [`DeviceAddress`] | `String` | Platform registry (e.g. `"00:11:22:AA:BB:CC"`) |
//! | [`ConnectionId`] | `NonZeroU64` | Process-wide counter, one per established link |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Next connection ID to hand out.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

// ============================================================================
// DeviceAddress
// ============================================================================

/// Platform address of a peer device.
///
/// Opaque to this crate: compared byte-for-byte, never parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceAddress(String);

impl DeviceAddress {
    /// Wraps a platform address.
    #[inline]
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Returns the address as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceAddress {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DeviceAddress {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ============================================================================
// ConnectionId
// ============================================================================

/// Identifier of one established connection.
///
/// Allocated when a handshake succeeds; every event produced for that
/// connection carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionId(NonZeroU64);

impl ConnectionId {
    /// Allocates the next process-unique connection ID.
    #[must_use]
    pub fn next() -> Self {
        let raw = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        // Counter starts at 1 and would need 2^64 connections to wrap.
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    /// Creates an ID from a raw value. Returns `None` for zero.
    #[inline]
    #[must_use]
    pub fn from_u64(value: u64) -> Option<Self> {
        NonZeroU64::new(value).map(Self)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_ids_are_unique_and_increasing() {
        let a = ConnectionId::next();
        let b = ConnectionId::next();
        assert!(b > a);
        assert_ne!(a, b);
    }

    #[test]
    fn test_connection_id_from_zero() {
        assert!(ConnectionId::from_u64(0).is_none());
        assert_eq!(ConnectionId::from_u64(7).map(|id| id.as_u64()), Some(7));
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::from_u64(42).unwrap();
        assert_eq!(id.to_string(), "conn-42");
    }

    #[test]
    fn test_device_address_display_and_conversions() {
        let addr = DeviceAddress::from("00:11:22:AA:BB:CC");
        assert_eq!(addr.to_string(), "00:11:22:AA:BB:CC");
        assert_eq!(addr.as_str(), "00:11:22:AA:BB:CC");
        assert_eq!(addr, DeviceAddress::new(String::from("00:11:22:AA:BB:CC")));
    }

    #[test]
    fn test_device_address_serializes_as_string() {
        let addr = DeviceAddress::new("AA:BB");
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"AA:BB\"");
    }
}

//! Peer device snapshot.
//!
//! A [`Device`] is an immutable copy of one entry in the platform's
//! known-device registry. The crate never owns or mutates registry state.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::identifiers::DeviceAddress;

// ============================================================================
// Device
// ============================================================================

/// A peer device as reported by the platform registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Device {
    /// Platform address.
    address: DeviceAddress,
    /// Display name. Some platforms report devices without one.
    name: Option<String>,
    /// Whether the device was paired out-of-band.
    bonded: bool,
}

impl Device {
    /// Creates a bonded device with a display name.
    #[must_use]
    pub fn new(address: impl Into<DeviceAddress>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: Some(name.into()),
            bonded: true,
        }
    }

    /// Creates a bonded device that reports no display name.
    #[must_use]
    pub fn unnamed(address: impl Into<DeviceAddress>) -> Self {
        Self {
            address: address.into(),
            name: None,
            bonded: true,
        }
    }

    /// Sets the bonded flag.
    #[must_use]
    pub fn with_bonded(mut self, bonded: bool) -> Self {
        self.bonded = bonded;
        self
    }

    /// Returns the platform address.
    #[inline]
    #[must_use]
    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    /// Returns the display name, if any.
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns `true` if the device is bonded.
    #[inline]
    #[must_use]
    pub const fn is_bonded(&self) -> bool {
        self.bonded
    }

    /// Case-insensitive substring match against the display name.
    ///
    /// `needle` must already be lowercase. Devices without a name never match.
    pub(crate) fn name_contains_lowercase(&self, needle: &str) -> bool {
        self.name
            .as_deref()
            .is_some_and(|name| name.to_lowercase().contains(needle))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} ({})", self.address),
            None => write!(f, "{}", self.address),
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
    fn test_named_device() {
        let device = Device::new("AA:BB", "ESP32-Garden");
        assert_eq!(device.name(), Some("ESP32-Garden"));
        assert_eq!(device.address().as_str(), "AA:BB");
        assert!(device.is_bonded());
        assert_eq!(device.to_string(), "ESP32-Garden (AA:BB)");
    }

    #[test]
    fn test_unnamed_device_never_matches() {
        let device = Device::unnamed("AA:BB");
        assert!(!device.name_contains_lowercase(""));
        assert_eq!(device.to_string(), "AA:BB");
    }

    #[test]
    fn test_name_match_ignores_case() {
        let device = Device::new("AA:BB", "My-Esp32");
        assert!(device.name_contains_lowercase("esp32"));
        assert!(device.name_contains_lowercase(""));
        assert!(!device.name_contains_lowercase("hc-05"));
    }

    #[test]
    fn test_with_bonded() {
        let device = Device::new("AA:BB", "x").with_bonded(false);
        assert!(!device.is_bonded());
    }
}

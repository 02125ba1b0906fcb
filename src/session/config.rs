//! Session configuration.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use spp_link::SessionConfig;
//!
//! let config = SessionConfig::new()
//!     .with_connect_timeout(Duration::from_secs(10))
//!     .with_read_buffer_size(4096);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Serial Port Profile service UUID.
pub const SPP_SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_1101_0000_1000_8000_0080_5F9B_34FB);

/// Default handshake timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default receive buffer capacity per read.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

/// Default number of undelivered events before producers wait.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

// ============================================================================
// SessionConfig
// ============================================================================

/// Tunables for a [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Service record to connect to.
    pub service_uuid: Uuid,

    /// Handshake timeout. `None` leaves it to the platform socket layer.
    pub connect_timeout: Option<Duration>,

    /// Maximum bytes per read, and so per `DataReceived` event.
    pub read_buffer_size: usize,

    /// Event channel capacity.
    pub event_capacity: usize,

    /// Close the connection when a write fails.
    pub close_on_write_error: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl SessionConfig {
    /// Creates a configuration with default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            service_uuid: SPP_SERVICE_UUID,
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            event_capacity: DEFAULT_EVENT_CAPACITY,
            close_on_write_error: false,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl SessionConfig {
    /// Sets the service UUID.
    #[inline]
    #[must_use]
    pub fn with_service_uuid(mut self, uuid: Uuid) -> Self {
        self.service_uuid = uuid;
        self
    }

    /// Sets the handshake timeout.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Removes the handshake timeout.
    #[inline]
    #[must_use]
    pub fn without_connect_timeout(mut self) -> Self {
        self.connect_timeout = None;
        self
    }

    /// Sets the read buffer size.
    #[inline]
    #[must_use]
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size;
        self
    }

    /// Sets the event channel capacity.
    #[inline]
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Closes the connection after a failed write.
    #[inline]
    #[must_use]
    pub fn with_close_on_write_error(mut self, close: bool) -> Self {
        self.close_on_write_error = close;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl SessionConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for zero sizes or a zero timeout.
    pub fn validate(&self) -> Result<()> {
        if self.read_buffer_size == 0 {
            return Err(Error::config("read_buffer_size must be greater than zero"));
        }
        if self.event_capacity == 0 {
            return Err(Error::config("event_capacity must be greater than zero"));
        }
        if self.connect_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::config(
                "connect_timeout must be non-zero; use without_connect_timeout() to disable it",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spp_uuid_value() {
        assert_eq!(
            SPP_SERVICE_UUID.to_string().to_uppercase(),
            "00001101-0000-1000-8000-00805F9B34FB"
        );
    }

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.service_uuid, SPP_SERVICE_UUID);
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.read_buffer_size, 1024);
        assert_eq!(config.event_capacity, 64);
        assert!(!config.close_on_write_error);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let uuid = Uuid::from_u128(0x1234);
        let config = SessionConfig::new()
            .with_service_uuid(uuid)
            .without_connect_timeout()
            .with_read_buffer_size(16)
            .with_event_capacity(2)
            .with_close_on_write_error(true);

        assert_eq!(config.service_uuid, uuid);
        assert_eq!(config.connect_timeout, None);
        assert_eq!(config.read_buffer_size, 16);
        assert_eq!(config.event_capacity, 2);
        assert!(config.close_on_write_error);
    }

    #[test]
    fn test_validate_rejects_zero_sizes() {
        assert!(SessionConfig::new().with_read_buffer_size(0).validate().is_err());
        assert!(SessionConfig::new().with_event_capacity(0).validate().is_err());
        assert!(
            SessionConfig::new()
                .with_connect_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{ "read_buffer_size": 256 }"#).unwrap();
        assert_eq!(config.read_buffer_size, 256);
        assert_eq!(config.service_uuid, SPP_SERVICE_UUID);
        assert_eq!(config.event_capacity, DEFAULT_EVENT_CAPACITY);
    }
}

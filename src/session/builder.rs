//! Builder pattern for session configuration.
//!
//! Provides a fluent API for configuring and creating [`Session`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use spp_link::{LoopbackAdapter, Session};
//!
//! # fn example() -> spp_link::Result<()> {
//! let (session, events) = Session::builder()
//!     .adapter(LoopbackAdapter::new())
//!     .connect_timeout(Duration::from_secs(10))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::error::{Error, Result};
use crate::event::EventStream;
use crate::platform::Adapter;

use super::config::SessionConfig;
use super::core::Session;

// ============================================================================
// SessionBuilder
// ============================================================================

/// Builder for configuring a [`Session`] instance.
///
/// Use [`Session::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct SessionBuilder {
    /// Platform adapter.
    adapter: Option<Arc<dyn Adapter>>,
    /// Session tunables.
    config: SessionConfig,
}

impl fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("adapter", &self.adapter.is_some())
            .field("config", &self.config)
            .finish()
    }
}

// ============================================================================
// SessionBuilder Implementation
// ============================================================================

impl SessionBuilder {
    /// Creates a new builder with default configuration and no adapter.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the platform adapter.
    #[inline]
    #[must_use]
    pub fn adapter(mut self, adapter: impl Adapter + 'static) -> Self {
        self.adapter = Some(Arc::new(adapter));
        self
    }

    /// Sets an adapter that is shared with other owners.
    #[inline]
    #[must_use]
    pub fn shared_adapter(mut self, adapter: Arc<dyn Adapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Replaces the whole configuration.
    #[inline]
    #[must_use]
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the service UUID (defaults to Serial Port Profile).
    #[inline]
    #[must_use]
    pub fn service_uuid(mut self, uuid: Uuid) -> Self {
        self.config = self.config.with_service_uuid(uuid);
        self
    }

    /// Sets the handshake timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config = self.config.with_connect_timeout(timeout);
        self
    }

    /// Leaves the handshake timeout to the platform socket layer.
    #[inline]
    #[must_use]
    pub fn without_connect_timeout(mut self) -> Self {
        self.config = self.config.without_connect_timeout();
        self
    }

    /// Sets the maximum bytes per read.
    #[inline]
    #[must_use]
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config = self.config.with_read_buffer_size(size);
        self
    }

    /// Sets the event channel capacity.
    #[inline]
    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config = self.config.with_event_capacity(capacity);
        self
    }

    /// Closes the connection when a write fails.
    #[inline]
    #[must_use]
    pub fn close_on_write_error(mut self, close: bool) -> Self {
        self.config = self.config.with_close_on_write_error(close);
        self
    }

    /// Builds the session and its event stream.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no adapter is set or the configuration is invalid
    /// - [`Error::TransportUnsupported`] if the adapter reports no Bluetooth support
    pub fn build(self) -> Result<(Session, EventStream)> {
        let adapter = self.validate_adapter()?;
        self.config.validate()?;

        Ok(Session::new(adapter, self.config))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl SessionBuilder {
    /// Validates the adapter configuration.
    fn validate_adapter(&self) -> Result<Arc<dyn Adapter>> {
        let adapter = self.adapter.clone().ok_or_else(|| {
            Error::config(
                "Adapter is required. Use .adapter() to set it.\n\
                 Example: Session::builder().adapter(LoopbackAdapter::new())",
            )
        })?;

        if !adapter.is_supported() {
            return Err(Error::TransportUnsupported);
        }

        Ok(adapter)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::platform::LoopbackAdapter;
    use crate::session::config::SPP_SERVICE_UUID;

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = SessionBuilder::new();
        assert!(builder.adapter.is_none());
        assert_eq!(builder.config, SessionConfig::default());
    }

    #[test]
    fn test_setters_update_config() {
        let builder = SessionBuilder::new()
            .read_buffer_size(32)
            .event_capacity(4)
            .without_connect_timeout()
            .close_on_write_error(true);

        assert_eq!(builder.config.read_buffer_size, 32);
        assert_eq!(builder.config.event_capacity, 4);
        assert_eq!(builder.config.connect_timeout, None);
        assert!(builder.config.close_on_write_error);
        assert_eq!(builder.config.service_uuid, SPP_SERVICE_UUID);
    }

    #[test]
    fn test_build_fails_without_adapter() {
        let err = SessionBuilder::new().build().unwrap_err();
        assert!(err.to_string().contains("Adapter"));
    }

    #[test]
    fn test_build_fails_for_unsupported_adapter() {
        let err = SessionBuilder::new()
            .adapter(LoopbackAdapter::unsupported())
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::TransportUnsupported));
    }

    #[test]
    fn test_build_fails_with_invalid_config() {
        let result = SessionBuilder::new()
            .adapter(LoopbackAdapter::new())
            .read_buffer_size(0)
            .build();
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_build_with_custom_service() {
        let uuid = Uuid::from_u128(0xABCD);
        let (session, _events) = SessionBuilder::new()
            .shared_adapter(Arc::new(LoopbackAdapter::new()))
            .service_uuid(uuid)
            .build()
            .unwrap();
        assert_eq!(session.config().service_uuid, uuid);
    }

    #[test]
    fn test_builder_is_clone() {
        let builder = SessionBuilder::new().event_capacity(8);
        let cloned = builder.clone();
        assert_eq!(builder.config, cloned.config);
    }
}

//! Error types for the serial link.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use spp_link::{Result, Session};
//!
//! async fn ping(session: &Session) -> Result<()> {
//!     session.write(b"PING").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::TransportUnsupported`] |
//! | Connect | [`Error::SocketCreationFailed`], [`Error::ConnectFailed`], [`Error::ConnectTimeout`], [`Error::ConnectCancelled`] |
//! | State | [`Error::InvalidState`], [`Error::NotConnected`], [`Error::ConnectionClosed`] |
//! | Data | [`Error::WriteFailed`] |
//! | External | [`Error::Io`] |

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;

use crate::identifiers::DeviceAddress;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when session configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// No Bluetooth adapter is present.
    ///
    /// Terminal condition: the host should abort.
    #[error("Bluetooth transport is not supported on this host")]
    TransportUnsupported,

    // ========================================================================
    // Connect Errors
    // ========================================================================
    /// Service lookup or socket allocation failed before any connect attempt.
    #[error("Socket creation failed for {device}: {message}")]
    SocketCreationFailed {
        /// Target device.
        device: DeviceAddress,
        /// Platform error description.
        message: String,
    },

    /// Handshake I/O error. Safe to retry.
    #[error("Connect to {device} failed: {message}")]
    ConnectFailed {
        /// Target device.
        device: DeviceAddress,
        /// Platform error description.
        message: String,
    },

    /// Handshake did not complete within the configured timeout.
    #[error("Connect to {device} timed out after {timeout_ms}ms")]
    ConnectTimeout {
        /// Target device.
        device: DeviceAddress,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Handshake was aborted by [`Session::cancel`](crate::Session::cancel).
    #[error("Connect to {device} was cancelled")]
    ConnectCancelled {
        /// Target device.
        device: DeviceAddress,
    },

    // ========================================================================
    // State Errors
    // ========================================================================
    /// Operation is not allowed in the current session state.
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        /// Rejected operation.
        operation: &'static str,
        /// State the session was in.
        state: String,
    },

    /// No active connection.
    #[error("Not connected")]
    NotConnected,

    /// Connection closed while the operation was in flight.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Data Errors
    // ========================================================================
    /// Write to the output stream failed. The connection is suspect.
    #[error("Write failed: {message}")]
    WriteFailed {
        /// Platform error description.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a socket creation error.
    #[inline]
    pub fn socket_creation_failed(device: &DeviceAddress, err: &IoError) -> Self {
        Self::SocketCreationFailed {
            device: device.clone(),
            message: err.to_string(),
        }
    }

    /// Creates a connect error.
    #[inline]
    pub fn connect_failed(device: &DeviceAddress, err: &IoError) -> Self {
        Self::ConnectFailed {
            device: device.clone(),
            message: err.to_string(),
        }
    }

    /// Creates a connect timeout error.
    #[inline]
    pub fn connect_timeout(device: &DeviceAddress, timeout_ms: u64) -> Self {
        Self::ConnectTimeout {
            device: device.clone(),
            timeout_ms,
        }
    }

    /// Creates a connect cancelled error.
    #[inline]
    pub fn connect_cancelled(device: &DeviceAddress) -> Self {
        Self::ConnectCancelled {
            device: device.clone(),
        }
    }

    /// Creates an invalid state error.
    #[inline]
    pub fn invalid_state(operation: &'static str, state: impl ToString) -> Self {
        Self::InvalidState {
            operation,
            state: state.to_string(),
        }
    }

    /// Creates a write error.
    #[inline]
    pub fn write_failed(err: &IoError) -> Self {
        Self::WriteFailed {
            message: err.to_string(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectTimeout { .. })
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::SocketCreationFailed { .. }
                | Self::ConnectFailed { .. }
                | Self::ConnectTimeout { .. }
                | Self::ConnectCancelled { .. }
                | Self::NotConnected
                | Self::ConnectionClosed
                | Self::WriteFailed { .. }
        )
    }

    /// Returns `true` if a fresh `connect` may succeed.
    ///
    /// Socket creation failures are fatal for the attempt and not retryable.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectFailed { .. } | Self::ConnectTimeout { .. } | Self::ConnectCancelled { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind;

    fn device() -> DeviceAddress {
        DeviceAddress::new("00:11:22:33:44:55")
    }

    #[test]
    fn test_error_display() {
        let io = IoError::new(ErrorKind::ConnectionRefused, "refused");
        let err = Error::connect_failed(&device(), &io);
        assert_eq!(err.to_string(), "Connect to 00:11:22:33:44:55 failed: refused");
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("read buffer must be non-empty");
        assert_eq!(
            err.to_string(),
            "Configuration error: read buffer must be non-empty"
        );
    }

    #[test]
    fn test_invalid_state_display() {
        let err = Error::invalid_state("connect", "connected");
        assert_eq!(err.to_string(), "Cannot connect while connected");
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::connect_timeout(&device(), 5000);
        assert!(timeout_err.is_timeout());
        assert!(!Error::NotConnected.is_timeout());
    }

    #[test]
    fn test_is_retryable() {
        let io = IoError::other("boom");
        assert!(Error::connect_failed(&device(), &io).is_retryable());
        assert!(Error::connect_cancelled(&device()).is_retryable());
        assert!(!Error::socket_creation_failed(&device(), &io).is_retryable());
        assert!(!Error::TransportUnsupported.is_retryable());
    }

    #[test]
    fn test_is_connection_error() {
        let io = IoError::other("boom");
        assert!(Error::NotConnected.is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(Error::write_failed(&io).is_connection_error());
        assert!(!Error::config("test").is_connection_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(ErrorKind::NotFound, "no adapter");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}

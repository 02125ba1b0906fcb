//! Capability traits implemented by host platforms.

// ============================================================================
// Imports
// ============================================================================

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::device::Device;

// ============================================================================
// Adapter
// ============================================================================

/// Local Bluetooth adapter.
///
/// Registry queries are cheap and synchronous: the registry is populated by
/// out-of-band pairing before this crate looks at it.
pub trait Adapter: Send + Sync {
    /// Returns `false` if the host has no adapter at all.
    fn is_supported(&self) -> bool {
        true
    }

    /// Returns `true` if the adapter is powered on.
    fn is_enabled(&self) -> bool;

    /// Asks the platform to power the adapter on.
    ///
    /// Fire-and-forget: the outcome arrives through the platform, not here.
    fn request_enable(&self);

    /// Returns the bonded devices in registry order.
    fn bonded_devices(&self) -> Vec<Device>;

    /// Stops any in-progress discovery scan.
    fn cancel_discovery(&self);

    /// Allocates an unconnected stream socket to `service` on `device`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the service record lookup or socket
    /// allocation fails.
    fn create_socket(&self, device: &Device, service: Uuid) -> io::Result<Arc<dyn RfcommSocket>>;
}

// ============================================================================
// RfcommSocket
// ============================================================================

/// Reliable, ordered stream socket to one peer.
///
/// Reads and writes may run concurrently from different tasks.
#[async_trait]
pub trait RfcommSocket: Send + Sync {
    /// Performs the connect handshake.
    async fn connect(&self) -> io::Result<()>;

    /// Reads up to `buf.len()` bytes. `Ok(0)` means the peer closed the stream.
    async fn read(&self, buf: &mut [u8]) -> io::Result<usize>;

    /// Writes some prefix of `buf` and returns its length.
    async fn write(&self, buf: &[u8]) -> io::Result<usize>;

    /// Flushes buffered output.
    async fn flush(&self) -> io::Result<()>;

    /// Closes the socket.
    ///
    /// Must be idempotent and must not block.
    fn close(&self) -> io::Result<()>;
}

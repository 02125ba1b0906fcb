//! Serialized write path to the active connection.
//!
//! At most one write is in flight. A write with no active connection fails
//! immediately without touching the transport.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::RwLock;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::ConnectionId;

use super::connection::Connection;

// ============================================================================
// SendGate
// ============================================================================

/// Write gate in front of the current connection.
#[derive(Default)]
pub(crate) struct SendGate {
    /// Connection writes go to, `None` while not connected.
    current: RwLock<Option<Connection>>,
    /// Held for the duration of one write.
    write_lock: AsyncMutex<()>,
}

impl SendGate {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Makes `connection` the write target.
    pub(crate) fn activate(&self, connection: Connection) {
        debug!(connection = %connection.id(), "Send gate open");
        *self.current.write() = Some(connection);
    }

    /// Clears the target if it is still `id`.
    pub(crate) fn deactivate(&self, id: ConnectionId) {
        let mut current = self.current.write();
        if current.as_ref().is_some_and(|c| c.id() == id) {
            *current = None;
            debug!(connection = %id, "Send gate closed");
        }
    }

    /// Returns the current target, if any.
    pub(crate) fn current(&self) -> Option<Connection> {
        self.current.read().clone()
    }

    /// Writes all of `bytes` to the current connection.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if there is no active connection
    /// - [`Error::ConnectionClosed`] if it closes before or during the write
    /// - [`Error::WriteFailed`] on a transport I/O error
    pub(crate) async fn write(&self, bytes: &[u8]) -> Result<()> {
        let connection = self.current().ok_or(Error::NotConnected)?;
        self.write_to(&connection, bytes).await
    }

    /// Writes all of `bytes` to `connection` under the write lock.
    pub(crate) async fn write_to(&self, connection: &Connection, bytes: &[u8]) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if connection.is_closed() {
            return Err(Error::ConnectionClosed);
        }
        if bytes.is_empty() {
            return Ok(());
        }

        match connection.write_all(bytes).await {
            Ok(()) => {
                trace!(connection = %connection.id(), bytes = bytes.len(), "Data sent");
                Ok(())
            }
            Err(_) if connection.is_closed() => Err(Error::ConnectionClosed),
            Err(e) => {
                warn!(connection = %connection.id(), error = %e, "Write failed");
                Err(Error::write_failed(&e))
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use tokio::io::AsyncReadExt;
    use tokio::sync::mpsc;
    use tokio_test::{assert_err, assert_ok};

    use crate::device::Device;
    use crate::event::DisconnectReason;
    use crate::platform::{Adapter, LoopbackAdapter, PeerBehavior};
    use crate::session::config::SPP_SERVICE_UUID;
    use crate::transport::connection::SocketHandle;

    async fn connect(adapter: &LoopbackAdapter, device: &Device) -> Connection {
        let socket = adapter.create_socket(device, SPP_SERVICE_UUID).unwrap();
        let handle = Arc::new(SocketHandle::new(socket));
        handle.connect().await.unwrap();
        Connection::established(device.clone(), handle)
    }

    #[tokio::test]
    async fn test_write_without_connection() {
        let gate = SendGate::new();
        let err = gate.write(b"PING").await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test]
    async fn test_write_reaches_peer_in_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let device = Device::new("01", "collector");
        let adapter = LoopbackAdapter::new()
            .with_max_write(2)
            .with_device(
                device.clone(),
                PeerBehavior::serve(move |mut stream| {
                    let tx = tx.clone();
                    async move {
                        let mut received = Vec::new();
                        let _ = stream.read_to_end(&mut received).await;
                        let _ = tx.send(received);
                    }
                }),
            );

        let gate = SendGate::new();
        let connection = connect(&adapter, &device).await;
        gate.activate(connection.clone());

        assert_ok!(gate.write(b"hello ").await);
        assert_ok!(gate.write(b"world").await);
        connection.close(DisconnectReason::LocalClose);
        // Drop the last socket reference so the peer sees EOF.
        gate.deactivate(connection.id());
        drop(connection);

        assert_eq!(rx.recv().await.unwrap(), b"hello world");
    }

    #[tokio::test]
    async fn test_write_after_close_is_rejected() {
        let device = Device::new("01", "peer");
        let adapter = LoopbackAdapter::new().with_device(device.clone(), PeerBehavior::sink());
        let gate = SendGate::new();
        let connection = connect(&adapter, &device).await;
        gate.activate(connection.clone());

        connection.close(DisconnectReason::LocalClose);
        let writes_before = adapter.stats().writes;

        let err = gate.write(b"late").await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
        assert_eq!(adapter.stats().writes, writes_before);
    }

    #[tokio::test]
    async fn test_deactivate_ignores_stale_id() {
        let device = Device::new("01", "peer");
        let adapter = LoopbackAdapter::new().with_device(device.clone(), PeerBehavior::sink());
        let gate = SendGate::new();
        let first = connect(&adapter, &device).await;
        let second = connect(&adapter, &device).await;

        gate.activate(second.clone());
        gate.deactivate(first.id());
        assert_eq!(gate.current().map(|c| c.id()), Some(second.id()));

        gate.deactivate(second.id());
        assert_err!(gate.write(b"x").await);
    }
}

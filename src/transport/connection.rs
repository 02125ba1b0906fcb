//! Socket ownership and closure.
//!
//! A [`SocketHandle`] wraps the platform socket from allocation onward and
//! owns the closed flag. Closing is the only cancellation mechanism: every
//! in-flight connect, read or write on the handle races against it and
//! returns promptly once it flips.
//!
//! A [`Connection`] is a handle whose handshake succeeded. It exists from
//! `Connected` until close, and is shared by reference between the session
//! (owner), the receive loop (reader) and the send gate (writer).

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::io::{self, ErrorKind};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::device::Device;
use crate::event::DisconnectReason;
use crate::identifiers::ConnectionId;
use crate::platform::RfcommSocket;

// ============================================================================
// SocketHandle
// ============================================================================

/// Platform socket plus its closed state.
pub(crate) struct SocketHandle {
    socket: Arc<dyn RfcommSocket>,
    closed: watch::Sender<bool>,
    /// First close wins; later closes keep this reason.
    reason: Mutex<Option<DisconnectReason>>,
}

fn closed_error() -> io::Error {
    io::Error::new(ErrorKind::NotConnected, "socket closed")
}

impl SocketHandle {
    pub(crate) fn new(socket: Arc<dyn RfcommSocket>) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            socket,
            closed,
            reason: Mutex::new(None),
        }
    }

    /// Closes the socket. Idempotent, non-blocking, callable from any task.
    ///
    /// Returns the reason that is now on record, which is `reason` only for
    /// the first caller.
    pub(crate) fn close(&self, reason: DisconnectReason) -> DisconnectReason {
        let recorded = {
            let mut slot = self.reason.lock();
            if let Some(existing) = slot.as_ref() {
                return existing.clone();
            }
            *slot = Some(reason.clone());
            reason
        };

        if let Err(e) = self.socket.close() {
            warn!(error = %e, "Could not close socket");
        }
        self.closed.send_replace(true);

        debug!(reason = %recorded, "Socket closed");
        recorded
    }

    #[inline]
    pub(crate) fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Reason recorded by the first close, if any.
    pub(crate) fn close_reason(&self) -> Option<DisconnectReason> {
        self.reason.lock().clone()
    }

    /// Resolves once the handle is closed.
    async fn wait_closed(&self) {
        let mut rx = self.closed.subscribe();
        // The sender lives in `self`, so this cannot fail while borrowed.
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Runs the handshake unless the handle closes first.
    pub(crate) async fn connect(&self) -> io::Result<()> {
        tokio::select! {
            biased;
            () = self.wait_closed() => Err(closed_error()),
            result = self.socket.connect() => result,
        }
    }

    /// Reads once unless the handle closes first.
    pub(crate) async fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        tokio::select! {
            biased;
            () = self.wait_closed() => Err(closed_error()),
            result = self.socket.read(buf) => result,
        }
    }

    /// Writes the whole buffer, retrying partial writes, then flushes.
    pub(crate) async fn write_all(&self, mut buf: &[u8]) -> io::Result<()> {
        let transfer = async {
            while !buf.is_empty() {
                match self.socket.write(buf).await {
                    Ok(0) => {
                        return Err(io::Error::new(
                            ErrorKind::WriteZero,
                            "socket accepted zero bytes",
                        ));
                    }
                    Ok(n) => buf = &buf[n..],
                    Err(e) if e.kind() == ErrorKind::Interrupted => {}
                    Err(e) => return Err(e),
                }
            }
            self.socket.flush().await
        };

        tokio::select! {
            biased;
            () = self.wait_closed() => Err(closed_error()),
            result = transfer => result,
        }
    }
}

// ============================================================================
// Connection
// ============================================================================

/// An established link to one peer.
///
/// Cheap to clone; clones refer to the same socket.
#[derive(Clone)]
pub struct Connection {
    id: ConnectionId,
    device: Device,
    handle: Arc<SocketHandle>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("device", &self.device.address())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Connection {
    /// Promotes a handle whose handshake succeeded.
    pub(crate) fn established(device: Device, handle: Arc<SocketHandle>) -> Self {
        Self {
            id: ConnectionId::next(),
            device,
            handle,
        }
    }

    /// Returns the connection ID.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Returns the peer device.
    #[inline]
    #[must_use]
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Returns `true` once the connection has been closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    pub(crate) fn close(&self, reason: DisconnectReason) -> DisconnectReason {
        self.handle.close(reason)
    }

    pub(crate) fn close_reason(&self) -> Option<DisconnectReason> {
        self.handle.close_reason()
    }

    pub(crate) async fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.handle.read(buf).await
    }

    pub(crate) async fn write_all(&self, buf: &[u8]) -> io::Result<()> {
        self.handle.write_all(buf).await
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Session coordinator.
//!
//! The [`Session`] owns the connection state machine, the current
//! connection and the event sink. Background work (the handshake and the
//! receive loop) runs on spawned Tokio tasks, never on the caller's task.
//!
//! # Example
//!
//! ```ignore
//! use spp_link::{Event, Session};
//!
//! let (session, mut events) = Session::builder().adapter(adapter).build()?;
//!
//! let device = session.list_candidates("esp32").into_iter().next().unwrap();
//! session.connect(&device).await?;
//! session.write(b"PING").await?;
//!
//! while let Some(event) = events.recv().await {
//!     if let Event::DataReceived { data, .. } = event {
//!         println!("{:?}", data);
//!     }
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::io;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::catalog::DeviceCatalog;
use crate::device::Device;
use crate::error::{Error, Result};
use crate::event::{DisconnectReason, Event, EventSink, EventStream};
use crate::identifiers::{ConnectionId, DeviceAddress};
use crate::platform::Adapter;
use crate::transport::{Connection, ReceiveLoop, SendGate, SocketHandle};

use super::builder::SessionBuilder;
use super::config::SessionConfig;
use super::state::{ConnectionState, SessionState};

// ============================================================================
// SessionInner
// ============================================================================

/// Shared state behind every [`Session`] clone.
pub(crate) struct SessionInner {
    adapter: Arc<dyn Adapter>,
    catalog: DeviceCatalog,
    config: SessionConfig,
    /// Never held across an `.await`.
    state: Mutex<ConnectionState>,
    gate: SendGate,
    sink: EventSink,
}

// ============================================================================
// Session
// ============================================================================

/// Point-to-point serial link manager.
///
/// Cheap to clone; clones share one state machine. Dropping the last clone
/// closes the live connection or aborts the pending connect.
///
/// Methods that start background work must be called inside a Tokio runtime.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("service_uuid", &self.inner.config.service_uuid)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Session - Construction
// ============================================================================

impl Session {
    /// Creates a configuration builder for the session.
    #[inline]
    #[must_use]
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Creates a session and its event stream. Config must be validated.
    pub(crate) fn new(adapter: Arc<dyn Adapter>, config: SessionConfig) -> (Self, EventStream) {
        let (sink, events) = EventSink::channel(config.event_capacity);
        let inner = SessionInner {
            catalog: DeviceCatalog::new(Arc::clone(&adapter)),
            adapter,
            config,
            state: Mutex::new(ConnectionState::Idle),
            gate: SendGate::new(),
            sink,
        };

        (
            Self {
                inner: Arc::new(inner),
            },
            events,
        )
    }
}

// ============================================================================
// Session - Queries
// ============================================================================

impl Session {
    /// Returns the device catalog.
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &DeviceCatalog {
        &self.inner.catalog
    }

    /// Returns the session configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Shorthand for [`DeviceCatalog::list_candidates`].
    #[must_use]
    pub fn list_candidates(&self, predicate: &str) -> Vec<Device> {
        self.inner.catalog.list_candidates(predicate)
    }

    /// Returns a snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.state.lock().snapshot()
    }

    /// Returns `true` if a link is established.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(*self.inner.state.lock(), ConnectionState::Connected(_))
    }

    /// Returns the peer of the live connection.
    #[must_use]
    pub fn connected_device(&self) -> Option<Device> {
        self.connection().map(|c| c.device().clone())
    }

    /// Returns a handle to the live connection.
    #[must_use]
    pub fn connection(&self) -> Option<Connection> {
        match &*self.inner.state.lock() {
            ConnectionState::Connected(connection) => Some(connection.clone()),
            _ => None,
        }
    }
}

// ============================================================================
// Session - Connect
// ============================================================================

impl Session {
    /// Connects to `device` and waits for the handshake to finish.
    ///
    /// The handshake runs on its own task, so dropping this future does not
    /// abandon it; use [`cancel`](Self::cancel) to abort.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if already connecting or connected
    /// - [`Error::SocketCreationFailed`] if the adapter cannot allocate a socket
    /// - [`Error::ConnectFailed`] if the handshake fails
    /// - [`Error::ConnectTimeout`] if the handshake exceeds the configured timeout
    /// - [`Error::ConnectCancelled`] if [`cancel`](Self::cancel) was called
    pub async fn connect(&self, device: &Device) -> Result<ConnectionId> {
        let handshake = self.spawn_connect(device)?;
        handshake.await.map_err(|e| Error::Io(io::Error::other(e)))?
    }

    /// Starts a connect attempt and returns the handshake task.
    ///
    /// Preconditions and socket allocation are checked before spawning, so
    /// those errors are returned directly.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if already connecting or connected
    /// - [`Error::SocketCreationFailed`] if the adapter cannot allocate a socket
    pub fn spawn_connect(&self, device: &Device) -> Result<JoinHandle<Result<ConnectionId>>> {
        let attempt = {
            let mut state = self.inner.state.lock();
            if !state.accepts_connect() {
                warn!(device = %device.address(), state = %state.snapshot(), "Connect rejected");
                return Err(Error::invalid_state("connect", &*state));
            }

            let socket = self
                .inner
                .adapter
                .create_socket(device, self.inner.config.service_uuid)
                .map_err(|e| {
                    warn!(device = %device.address(), error = %e, "Socket allocation failed");
                    Error::socket_creation_failed(device.address(), &e)
                })?;

            let attempt = Arc::new(SocketHandle::new(socket));
            *state = ConnectionState::Connecting {
                device: device.clone(),
                attempt: Arc::clone(&attempt),
            };
            attempt
        };

        info!(device = %device.address(), name = device.name(), "Connecting");

        let handshake = Handshake {
            session: Arc::downgrade(&self.inner),
            adapter: Arc::clone(&self.inner.adapter),
            connect_timeout: self.inner.config.connect_timeout,
            device: device.clone(),
            attempt,
        };
        Ok(tokio::spawn(handshake.run()))
    }

    /// Aborts the in-flight handshake.
    ///
    /// The pending [`connect`](Self::connect) returns
    /// [`Error::ConnectCancelled`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] unless the session is connecting.
    pub fn cancel(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        let ConnectionState::Connecting { device, attempt } = &*state else {
            return Err(Error::invalid_state("cancel", &*state));
        };

        info!(device = %device.address(), "Cancelling connect");
        attempt.close(DisconnectReason::LocalClose);
        *state = ConnectionState::Closed;
        Ok(())
    }
}

// ============================================================================
// Session - Disconnect
// ============================================================================

impl Session {
    /// Closes the live connection.
    ///
    /// Returns immediately; the receive loop publishes
    /// `Disconnected(LocalClose)` once it observes the closure. A no-op when
    /// idle or already closed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] while connecting; use
    /// [`cancel`](Self::cancel) instead.
    pub fn disconnect(&self) -> Result<()> {
        let connection = {
            let mut state = self.inner.state.lock();
            match std::mem::replace(&mut *state, ConnectionState::Closed) {
                ConnectionState::Connected(connection) => connection,
                connecting @ ConnectionState::Connecting { .. } => {
                    let err = Error::invalid_state("disconnect", &connecting);
                    *state = connecting;
                    return Err(err);
                }
                idle => {
                    *state = idle;
                    debug!("Disconnect ignored, not connected");
                    return Ok(());
                }
            }
        };

        info!(connection = %connection.id(), "Disconnecting");
        self.inner.gate.deactivate(connection.id());
        connection.close(DisconnectReason::LocalClose);
        Ok(())
    }
}

// ============================================================================
// Session - Write
// ============================================================================

impl Session {
    /// Writes all of `bytes` to the live connection.
    ///
    /// Concurrent calls are serialized. On success the peer receives exactly
    /// `bytes`, in order and undivided by other writes.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if there is no live connection (no transport call is made)
    /// - [`Error::ConnectionClosed`] if the connection closes during the write
    /// - [`Error::WriteFailed`] on transport I/O error; treat the link as suspect
    pub async fn write(&self, bytes: &[u8]) -> Result<()> {
        if !self.inner.config.close_on_write_error {
            return self.inner.gate.write(bytes).await;
        }

        let connection = self.inner.gate.current().ok_or(Error::NotConnected)?;
        match self.inner.gate.write_to(&connection, bytes).await {
            Err(Error::WriteFailed { message }) => {
                self.inner.release_with(
                    &connection,
                    DisconnectReason::WriteFailed {
                        message: message.clone(),
                    },
                );
                Err(Error::WriteFailed { message })
            }
            other => other,
        }
    }
}

// ============================================================================
// Handshake
// ============================================================================

/// Handshake task for one connect attempt.
///
/// Holds the session weakly: dropping the last [`Session`] closes the
/// attempt, which ends the pending connect.
struct Handshake {
    session: Weak<SessionInner>,
    adapter: Arc<dyn Adapter>,
    connect_timeout: Option<Duration>,
    device: Device,
    attempt: Arc<SocketHandle>,
}

impl Handshake {
    async fn run(self) -> Result<ConnectionId> {
        let Self {
            session,
            adapter,
            connect_timeout,
            device,
            attempt,
        } = self;
        let address = device.address().clone();

        // Concurrent scanning makes RFCOMM connects fail on most stacks.
        adapter.cancel_discovery();

        let outcome = match connect_timeout {
            Some(limit) => match timeout(limit, attempt.connect()).await {
                Ok(result) => result.map_err(|e| classify(&address, &attempt, &e)),
                Err(_) => Err(Error::connect_timeout(
                    &address,
                    u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                )),
            },
            None => attempt
                .connect()
                .await
                .map_err(|e| classify(&address, &attempt, &e)),
        };

        if let Err(err) = outcome {
            // Discard the half-open socket. No Connected was sent, so no Disconnected either.
            attempt.close(DisconnectReason::LocalClose);
            if let Some(inner) = session.upgrade() {
                let mut state = inner.state.lock();
                if state.is_attempt(&attempt) {
                    *state = ConnectionState::Closed;
                }
            }
            warn!(device = %address, error = %err, "Connect failed");
            return Err(err);
        }

        let Some(inner) = session.upgrade() else {
            attempt.close(DisconnectReason::LocalClose);
            debug!(device = %address, "Handshake finished after session drop");
            return Err(Error::connect_cancelled(&address));
        };

        let connection = Connection::established(device.clone(), Arc::clone(&attempt));
        let id = connection.id();
        {
            let mut state = inner.state.lock();
            if !state.is_attempt(&attempt) || attempt.is_closed() {
                drop(state);
                attempt.close(DisconnectReason::LocalClose);
                debug!(device = %address, "Handshake finished after cancel");
                return Err(Error::connect_cancelled(&address));
            }
            *state = ConnectionState::Connected(connection.clone());
            inner.gate.activate(connection.clone());
        }
        let sink = inner.sink.clone();
        let buffer_size = inner.config.read_buffer_size;
        drop(inner);

        info!(device = %address, connection = %id, "Connected");
        sink.emit(Event::Connected {
            connection: id,
            device,
        })
        .await;

        // Started only after Connected is queued, so no data can overtake it.
        ReceiveLoop::new(
            connection,
            sink,
            buffer_size,
            Box::new(move |id| {
                if let Some(inner) = session.upgrade() {
                    inner.release(id);
                }
            }),
        )
        .spawn();

        Ok(id)
    }
}

// ============================================================================
// SessionInner - Release
// ============================================================================

impl SessionInner {
    /// Moves Connected → Closed if `id` is still the live connection.
    fn release(&self, id: ConnectionId) {
        {
            let mut state = self.state.lock();
            if state.is_connection(id) {
                *state = ConnectionState::Closed;
            }
        }
        self.gate.deactivate(id);
    }

    /// Releases `connection` and closes it with `reason`.
    fn release_with(&self, connection: &Connection, reason: DisconnectReason) {
        self.release(connection.id());
        connection.close(reason);
    }
}

/// Maps a handshake I/O error, telling cancellation apart from failure.
fn classify(address: &DeviceAddress, attempt: &SocketHandle, err: &io::Error) -> Error {
    if attempt.is_closed() {
        Error::connect_cancelled(address)
    } else {
        Error::connect_failed(address, err)
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        match std::mem::replace(self.state.get_mut(), ConnectionState::Closed) {
            ConnectionState::Connecting { attempt, .. } => {
                attempt.close(DisconnectReason::LocalClose);
            }
            ConnectionState::Connected(connection) => {
                debug!(connection = %connection.id(), "Session dropped, closing connection");
                connection.close(DisconnectReason::LocalClose);
            }
            ConnectionState::Idle | ConnectionState::Closed => {}
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

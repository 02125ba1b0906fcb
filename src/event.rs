//! Connection lifecycle and inbound-data events.
//!
//! Background tasks publish [`Event`]s through an [`EventSink`]; the
//! consumer pulls them from the matching [`EventStream`]. Both ends wrap one
//! bounded `mpsc` channel, which is the single ordering point.
//!
//! # Ordering
//!
//! For any one [`ConnectionId`]:
//!
//! 1. [`Event::Connected`] comes first
//! 2. zero or more [`Event::DataReceived`]
//! 3. exactly one [`Event::Disconnected`], always last
//!
//! Events of two different connections may interleave after a fast
//! disconnect/reconnect; match on the connection ID when that matters.
//!
//! # Backpressure
//!
//! Producers wait for channel capacity instead of dropping events. A consumer
//! that stops reading stalls the receive loop, which in turn stops reading
//! from the socket.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::debug;

use crate::device::Device;
use crate::identifiers::ConnectionId;

// ============================================================================
// DisconnectReason
// ============================================================================

/// Why a connection ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisconnectReason {
    /// Peer closed its end of the stream.
    PeerClosed,
    /// Read from the socket failed.
    ReadFailed {
        /// Platform error description.
        message: String,
    },
    /// Closed locally by `disconnect()` or by dropping the session.
    LocalClose,
    /// Closed after a failed write.
    WriteFailed {
        /// Platform error description.
        message: String,
    },
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PeerClosed => f.write_str("peer closed"),
            Self::ReadFailed { message } => write!(f, "read failed: {message}"),
            Self::LocalClose => f.write_str("closed locally"),
            Self::WriteFailed { message } => write!(f, "write failed: {message}"),
        }
    }
}

// ============================================================================
// Event
// ============================================================================

/// Notification delivered to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Handshake succeeded; the link is usable.
    Connected {
        /// New connection.
        connection: ConnectionId,
        /// Peer device.
        device: Device,
    },
    /// One successful read. Payload is exactly what the socket returned.
    DataReceived {
        /// Source connection.
        connection: ConnectionId,
        /// Bytes read.
        data: Vec<u8>,
    },
    /// Terminal event for a connection.
    Disconnected {
        /// Closed connection.
        connection: ConnectionId,
        /// Why it closed.
        reason: DisconnectReason,
    },
}

impl Event {
    /// Returns the connection this event belongs to.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> ConnectionId {
        match self {
            Self::Connected { connection, .. }
            | Self::DataReceived { connection, .. }
            | Self::Disconnected { connection, .. } => *connection,
        }
    }

    /// Returns the payload of a `DataReceived` event.
    #[inline]
    #[must_use]
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Self::DataReceived { data, .. } => Some(data),
            _ => None,
        }
    }

    /// Returns the byte count of a `DataReceived` event, `0` otherwise.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data().map_or(0, <[u8]>::len)
    }

    /// Returns `true` for events that carry no payload.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if this is the terminal event of its connection.
    #[inline]
    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected { .. })
    }
}

// ============================================================================
// EventSink
// ============================================================================

/// Producer half, cloned into every background task.
#[derive(Debug, Clone)]
pub(crate) struct EventSink {
    tx: mpsc::Sender<Event>,
}

impl EventSink {
    /// Creates a linked sink/stream pair with the given capacity.
    pub(crate) fn channel(capacity: usize) -> (Self, EventStream) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, EventStream { rx })
    }

    /// Publishes an event, waiting for capacity.
    ///
    /// Returns `false` if the consumer has dropped its stream.
    pub(crate) async fn emit(&self, event: Event) -> bool {
        match self.tx.send(event).await {
            Ok(()) => true,
            Err(mpsc::error::SendError(event)) => {
                debug!(connection = %event.connection(), "Event stream dropped, discarding event");
                false
            }
        }
    }
}

// ============================================================================
// EventStream
// ============================================================================

/// Consumer half of the event channel.
///
/// Ends (`None`) once the session and all of its background tasks are gone.
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::Receiver<Event>,
}

impl EventStream {
    /// Waits for the next event.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Returns the next event if one is queued.
    pub fn try_recv(&mut self) -> Option<Event> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Returns the number of queued events.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Returns `true` if no events are queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Stream for EventStream {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Event>> {
        self.rx.poll_recv(cx)
    }
}

// ============================================================================
// Tests
// ============================================================================

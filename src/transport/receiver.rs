//! Background read loop for one connection.
//!
//! Each successful read becomes one `DataReceived` event, however short.
//! No framing or buffering across reads. The first failure (EOF, I/O error
//! or local close) ends the loop with exactly one `Disconnected` event.

// ============================================================================
// Imports
// ============================================================================

use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::event::{DisconnectReason, Event, EventSink};
use crate::identifiers::ConnectionId;

use super::connection::Connection;

// ============================================================================
// Types
// ============================================================================

/// Called once the connection is closed, before `Disconnected` is published.
pub(crate) type ExitHook = Box<dyn FnOnce(ConnectionId) + Send + Sync>;

// ============================================================================
// ReceiveLoop
// ============================================================================

/// Reader task bound to one [`Connection`].
pub(crate) struct ReceiveLoop {
    connection: Connection,
    sink: EventSink,
    buffer_size: usize,
    on_exit: ExitHook,
}

impl ReceiveLoop {
    pub(crate) fn new(
        connection: Connection,
        sink: EventSink,
        buffer_size: usize,
        on_exit: ExitHook,
    ) -> Self {
        Self {
            connection,
            sink,
            buffer_size,
            on_exit,
        }
    }

    /// Spawns the loop on the current runtime.
    pub(crate) fn spawn(self) -> JoinHandle<DisconnectReason> {
        tokio::spawn(self.run())
    }

    async fn run(self) -> DisconnectReason {
        let id = self.connection.id();
        let mut buffer = vec![0u8; self.buffer_size];

        debug!(connection = %id, buffer = self.buffer_size, "Receive loop started");

        let observed = loop {
            match self.connection.read(&mut buffer).await {
                Ok(0) => break DisconnectReason::PeerClosed,
                Ok(n) => {
                    trace!(connection = %id, bytes = n, "Data received");
                    let event = Event::DataReceived {
                        connection: id,
                        data: buffer[..n].to_vec(),
                    };
                    self.sink.emit(event).await;
                }
                Err(e) => {
                    // A local close surfaces here as an I/O error; keep its reason.
                    break self
                        .connection
                        .close_reason()
                        .unwrap_or_else(|| DisconnectReason::ReadFailed {
                            message: e.to_string(),
                        });
                }
            }
        };

        let reason = self.connection.close(observed);
        (self.on_exit)(id);

        info!(connection = %id, %reason, "Connection lost");
        self.sink
            .emit(Event::Disconnected {
                connection: id,
                reason: reason.clone(),
            })
            .await;

        reason
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use tokio::io::AsyncWriteExt;

    use crate::device::Device;
    use crate::event::EventStream;
    use crate::platform::{Adapter, LoopbackAdapter, PeerBehavior};
    use crate::session::config::SPP_SERVICE_UUID;
    use crate::transport::connection::SocketHandle;

    async fn connect(behavior: PeerBehavior) -> Connection {
        let device = Device::new("00:00:00:00:00:01", "peer");
        let adapter = LoopbackAdapter::new().with_device(device.clone(), behavior);
        let socket = adapter.create_socket(&device, SPP_SERVICE_UUID).unwrap();
        let handle = Arc::new(SocketHandle::new(socket));
        handle.connect().await.unwrap();
        Connection::established(device, handle)
    }

    async fn drain(mut stream: EventStream) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(event) = stream.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_peer_close_emits_single_disconnect() {
        let connection = connect(PeerBehavior::serve(|mut stream| async move {
            let _ = stream.write_all(b"hi").await;
        }))
        .await;
        let (sink, stream) = EventSink::channel(8);

        let exited = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&exited);
        let hook: ExitHook = Box::new(move |_| flag.store(true, Ordering::SeqCst));

        let reason = ReceiveLoop::new(connection.clone(), sink, 1024, hook)
            .spawn()
            .await
            .unwrap();

        assert_eq!(reason, DisconnectReason::PeerClosed);
        assert!(exited.load(Ordering::SeqCst));
        assert!(connection.is_closed());

        let events = drain(stream).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data(), Some(&b"hi"[..]));
        assert!(events[1].is_disconnected());
    }

    #[tokio::test]
    async fn test_local_close_reports_local_reason() {
        let connection = connect(PeerBehavior::sink()).await;
        let (sink, stream) = EventSink::channel(8);

        let task = ReceiveLoop::new(connection.clone(), sink, 64, Box::new(|_| {})).spawn();
        tokio::task::yield_now().await;
        connection.close(DisconnectReason::LocalClose);

        assert_eq!(task.await.unwrap(), DisconnectReason::LocalClose);

        let events = drain(stream).await;
        assert_eq!(
            events,
            vec![Event::Disconnected {
                connection: connection.id(),
                reason: DisconnectReason::LocalClose,
            }]
        );
    }

    #[tokio::test]
    async fn test_reads_are_capped_by_buffer_size() {
        let connection = connect(PeerBehavior::serve(|mut stream| async move {
            let _ = stream.write_all(b"abcdef").await;
        }))
        .await;
        let (sink, stream) = EventSink::channel(16);

        ReceiveLoop::new(connection, sink, 4, Box::new(|_| {}))
            .spawn()
            .await
            .unwrap();

        let events = drain(stream).await;
        let payload: Vec<u8> = events
            .iter()
            .filter_map(Event::data)
            .flatten()
            .copied()
            .collect();
        assert_eq!(payload, b"abcdef");
        assert!(events.iter().filter_map(Event::data).all(|d| d.len() <= 4));
        assert!(events.last().unwrap().is_disconnected());
    }
}

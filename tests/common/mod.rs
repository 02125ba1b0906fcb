//! Shared fixtures for integration tests.

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use std::future;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use spp_link::{
    Adapter, Device, Event, EventStream, LoopbackAdapter, PeerBehavior, RfcommSocket, Session,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound for any single event wait.
pub const EVENT_WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// Logging
// ============================================================================

/// Installs a test subscriber once; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("spp_link=debug")),
        )
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Devices
// ============================================================================

pub fn esp32() -> Device {
    Device::new("24:0A:C4:00:00:01", "ESP32-Sensor")
}

pub fn hc05() -> Device {
    Device::new("98:D3:31:00:00:02", "HC-05")
}

/// Peer that answers one `PING` with `PONG\n` and hangs up.
pub fn ping_pong_peer() -> PeerBehavior {
    PeerBehavior::serve(|mut stream| async move {
        let mut request = [0u8; 4];
        if stream.read_exact(&mut request).await.is_ok() && &request == b"PING" {
            let _ = stream.write_all(b"PONG\n").await;
            let _ = stream.flush().await;
        }
    })
}

// ============================================================================
// Sessions
// ============================================================================

/// Builds a session over `adapter` with a short connect timeout.
pub fn session(adapter: &LoopbackAdapter) -> (Session, EventStream) {
    Session::builder()
        .adapter(adapter.clone())
        .connect_timeout(Duration::from_millis(500))
        .build()
        .expect("valid configuration")
}

/// Waits for the next event, failing the test on timeout or stream end.
pub async fn next_event(events: &mut EventStream) -> Event {
    tokio::time::timeout(EVENT_WAIT, events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event stream ended")
}

// ============================================================================
// BrokenWriteAdapter
// ============================================================================

/// Adapter whose sockets connect fine but reject every write.
///
/// Reads never complete, so only a local close ends the connection.
pub struct BrokenWriteAdapter {
    pub device: Device,
}

impl BrokenWriteAdapter {
    pub fn new() -> Self {
        Self { device: hc05() }
    }
}

impl Adapter for BrokenWriteAdapter {
    fn is_enabled(&self) -> bool {
        true
    }

    fn request_enable(&self) {}

    fn bonded_devices(&self) -> Vec<Device> {
        vec![self.device.clone()]
    }

    fn cancel_discovery(&self) {}

    fn create_socket(&self, _device: &Device, _service: Uuid) -> io::Result<Arc<dyn RfcommSocket>> {
        Ok(Arc::new(BrokenWriteSocket))
    }
}

struct BrokenWriteSocket;

#[async_trait]
impl RfcommSocket for BrokenWriteSocket {
    async fn connect(&self) -> io::Result<()> {
        Ok(())
    }

    async fn read(&self, _buf: &mut [u8]) -> io::Result<usize> {
        future::pending().await
    }

    async fn write(&self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "link lost"))
    }

    async fn flush(&self) -> io::Result<()> {
        Ok(())
    }

    fn close(&self) -> io::Result<()> {
        Ok(())
    }
}

// ============================================================================
// ResetAdapter
// ============================================================================

/// Adapter whose peer sends `hi` and then resets the link.
///
/// `reads` counts every read the socket served.
pub struct ResetAdapter {
    pub device: Device,
    pub reads: Arc<AtomicUsize>,
}

impl ResetAdapter {
    pub fn new() -> Self {
        Self {
            device: esp32(),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Adapter for ResetAdapter {
    fn is_enabled(&self) -> bool {
        true
    }

    fn request_enable(&self) {}

    fn bonded_devices(&self) -> Vec<Device> {
        vec![self.device.clone()]
    }

    fn cancel_discovery(&self) {}

    fn create_socket(&self, _device: &Device, _service: Uuid) -> io::Result<Arc<dyn RfcommSocket>> {
        Ok(Arc::new(ResetSocket {
            reads: Arc::clone(&self.reads),
        }))
    }
}

struct ResetSocket {
    reads: Arc<AtomicUsize>,
}

#[async_trait]
impl RfcommSocket for ResetSocket {
    async fn connect(&self) -> io::Result<()> {
        Ok(())
    }

    async fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        if self.reads.fetch_add(1, Ordering::SeqCst) == 0 {
            buf[..2].copy_from_slice(b"hi");
            Ok(2)
        } else {
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer"))
        }
    }

    async fn write(&self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    async fn flush(&self) -> io::Result<()> {
        Ok(())
    }

    fn close(&self) -> io::Result<()> {
        Ok(())
    }
}

//! In-process adapter with scripted peers.
//!
//! [`LoopbackAdapter`] stands in for a real radio. Each registered device is
//! paired with a [`PeerBehavior`]; on connect, the peer gets the far end of a
//! `tokio::io::duplex` pipe and runs as its own task.
//!
//! # Example
//!
//! ```ignore
//! use spp_link::{Device, LoopbackAdapter, PeerBehavior};
//!
//! let adapter = LoopbackAdapter::new()
//!     .with_device(Device::new("00:00:00:00:00:01", "ESP32-Echo"), PeerBehavior::echo())
//!     .with_device(Device::new("00:00:00:00:00:02", "HC-05"), PeerBehavior::Refuse);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::io::{self, ErrorKind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, ReadHalf, WriteHalf, duplex, split};
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::device::Device;
use crate::identifiers::DeviceAddress;

use super::adapter::{Adapter, RfcommSocket};

// ============================================================================
// Constants
// ============================================================================

/// Capacity of each direction of the in-process pipe.
const PIPE_CAPACITY: usize = 64 * 1024;

// ============================================================================
// Types
// ============================================================================

/// Async handler run on the peer end of an accepted connection.
pub type PeerHandler = Arc<dyn Fn(DuplexStream) -> BoxFuture<'static, ()> + Send + Sync>;

// ============================================================================
// PeerBehavior
// ============================================================================

/// How a loopback peer reacts to a connect attempt.
#[derive(Clone)]
pub enum PeerBehavior {
    /// Accept and run the handler on the peer end of the pipe.
    Serve(PeerHandler),
    /// Fail the handshake with `ConnectionRefused`.
    Refuse,
    /// Fail socket allocation before any handshake.
    SocketUnavailable,
    /// Never complete the handshake.
    Hang,
}

impl PeerBehavior {
    /// Accepts connections and runs `handler` on the peer stream.
    pub fn serve<F, Fut>(handler: F) -> Self
    where
        F: Fn(DuplexStream) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::Serve(Arc::new(move |stream| handler(stream).boxed()))
    }

    /// Echoes every byte back until the local side closes.
    #[must_use]
    pub fn echo() -> Self {
        Self::serve(|stream| async move {
            let (mut reader, mut writer) = split(stream);
            let _ = tokio::io::copy(&mut reader, &mut writer).await;
        })
    }

    /// Accepts, swallows input and never replies.
    #[must_use]
    pub fn sink() -> Self {
        Self::serve(|mut stream| async move {
            let mut discard = Vec::new();
            let _ = stream.read_to_end(&mut discard).await;
        })
    }
}

impl fmt::Debug for PeerBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serve(_) => f.write_str("Serve(..)"),
            Self::Refuse => f.write_str("Refuse"),
            Self::SocketUnavailable => f.write_str("SocketUnavailable"),
            Self::Hang => f.write_str("Hang"),
        }
    }
}

// ============================================================================
// LoopbackStats
// ============================================================================

/// Snapshot of the calls the adapter has seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopbackStats {
    /// `cancel_discovery` calls.
    pub discovery_cancels: u64,
    /// Sockets handed out by `create_socket`.
    pub sockets_created: u64,
    /// Handshakes started.
    pub connect_attempts: u64,
    /// Transport-level write calls.
    pub writes: u64,
    /// Bytes accepted by transport-level writes.
    pub bytes_written: u64,
    /// `request_enable` calls.
    pub enable_requests: u64,
    /// Sockets closed, counted once per socket.
    pub sockets_closed: u64,
}

#[derive(Default)]
struct Counters {
    discovery_cancels: AtomicU64,
    sockets_created: AtomicU64,
    connect_attempts: AtomicU64,
    writes: AtomicU64,
    bytes_written: AtomicU64,
    enable_requests: AtomicU64,
    sockets_closed: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    fn snapshot(&self) -> LoopbackStats {
        LoopbackStats {
            discovery_cancels: self.discovery_cancels.load(Ordering::Relaxed),
            sockets_created: self.sockets_created.load(Ordering::Relaxed),
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
            enable_requests: self.enable_requests.load(Ordering::Relaxed),
            sockets_closed: self.sockets_closed.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// LoopbackAdapter
// ============================================================================

struct LoopbackInner {
    supported: bool,
    enabled: AtomicBool,
    /// Registry order matters, so devices live in a Vec.
    devices: RwLock<Vec<Device>>,
    behaviors: RwLock<FxHashMap<DeviceAddress, PeerBehavior>>,
    /// Per-call write cap, 0 = unlimited.
    max_write: AtomicUsize,
    last_service: Mutex<Option<Uuid>>,
    counters: Counters,
}

/// In-process [`Adapter`] for tests, demos and benchmarks.
///
/// Cheap to clone; clones share the registry and counters.
#[derive(Clone)]
pub struct LoopbackAdapter {
    inner: Arc<LoopbackInner>,
}

impl Default for LoopbackAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LoopbackAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopbackAdapter")
            .field("supported", &self.inner.supported)
            .field("enabled", &self.inner.enabled.load(Ordering::Relaxed))
            .field("devices", &self.inner.devices.read().len())
            .finish_non_exhaustive()
    }
}

impl LoopbackAdapter {
    /// Creates an enabled adapter with an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::with_support(true)
    }

    /// Creates an adapter that reports no Bluetooth support.
    #[must_use]
    pub fn unsupported() -> Self {
        Self::with_support(false)
    }

    fn with_support(supported: bool) -> Self {
        Self {
            inner: Arc::new(LoopbackInner {
                supported,
                enabled: AtomicBool::new(supported),
                devices: RwLock::new(Vec::new()),
                behaviors: RwLock::new(FxHashMap::default()),
                max_write: AtomicUsize::new(0),
                last_service: Mutex::new(None),
                counters: Counters::default(),
            }),
        }
    }

    /// Registers a bonded device and its peer behavior.
    #[must_use]
    pub fn with_device(self, device: Device, behavior: PeerBehavior) -> Self {
        self.add_device(device, behavior);
        self
    }

    /// Caps every transport-level write at `max` bytes.
    ///
    /// Forces callers through their partial-write path.
    #[must_use]
    pub fn with_max_write(self, max: usize) -> Self {
        self.inner.max_write.store(max, Ordering::Relaxed);
        self
    }

    /// Registers a device at runtime. Replaces any device with the same address.
    pub fn add_device(&self, device: Device, behavior: PeerBehavior) {
        let address = device.address().clone();
        {
            let mut devices = self.inner.devices.write();
            devices.retain(|d| d.address() != &address);
            devices.push(device);
        }
        self.inner.behaviors.write().insert(address, behavior);
    }

    /// Removes a device from the registry.
    pub fn remove_device(&self, address: &DeviceAddress) {
        self.inner.devices.write().retain(|d| d.address() != address);
        self.inner.behaviors.write().remove(address);
    }

    /// Powers the simulated adapter on or off.
    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Returns a snapshot of the call counters.
    #[must_use]
    pub fn stats(&self) -> LoopbackStats {
        self.inner.counters.snapshot()
    }

    /// Returns the service UUID of the most recent `create_socket` call.
    #[must_use]
    pub fn last_service_uuid(&self) -> Option<Uuid> {
        *self.inner.last_service.lock()
    }
}

impl Adapter for LoopbackAdapter {
    fn is_supported(&self) -> bool {
        self.inner.supported
    }

    fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Relaxed)
    }

    fn request_enable(&self) {
        Counters::bump(&self.inner.counters.enable_requests, 1);
        // The simulated user always accepts the prompt.
        if self.inner.supported {
            self.inner.enabled.store(true, Ordering::Relaxed);
        }
    }

    fn bonded_devices(&self) -> Vec<Device> {
        if !self.is_enabled() {
            return Vec::new();
        }
        self.inner.devices.read().clone()
    }

    fn cancel_discovery(&self) {
        Counters::bump(&self.inner.counters.discovery_cancels, 1);
    }

    fn create_socket(&self, device: &Device, service: Uuid) -> io::Result<Arc<dyn RfcommSocket>> {
        *self.inner.last_service.lock() = Some(service);

        let behavior = self
            .inner
            .behaviors
            .read()
            .get(device.address())
            .cloned()
            .ok_or_else(|| io::Error::new(ErrorKind::NotFound, "device is not bonded"))?;

        if matches!(behavior, PeerBehavior::SocketUnavailable) {
            return Err(io::Error::new(
                ErrorKind::NotFound,
                format!("service {service} not found"),
            ));
        }

        Counters::bump(&self.inner.counters.sockets_created, 1);
        debug!(device = %device.address(), %service, "Loopback socket created");

        Ok(Arc::new(LoopbackSocket {
            behavior,
            reader: AsyncMutex::new(None),
            writer: AsyncMutex::new(None),
            closed: AtomicBool::new(false),
            inner: Arc::clone(&self.inner),
        }))
    }
}

// ============================================================================
// LoopbackSocket
// ============================================================================

struct LoopbackSocket {
    behavior: PeerBehavior,
    reader: AsyncMutex<Option<ReadHalf<DuplexStream>>>,
    writer: AsyncMutex<Option<WriteHalf<DuplexStream>>>,
    closed: AtomicBool,
    inner: Arc<LoopbackInner>,
}

fn not_connected() -> io::Error {
    io::Error::new(ErrorKind::NotConnected, "socket is not connected")
}

impl LoopbackSocket {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl RfcommSocket for LoopbackSocket {
    async fn connect(&self) -> io::Result<()> {
        if self.is_closed() {
            return Err(not_connected());
        }
        Counters::bump(&self.inner.counters.connect_attempts, 1);

        match &self.behavior {
            PeerBehavior::Serve(handler) => {
                let (local, remote) = duplex(PIPE_CAPACITY);
                let (reader, writer) = split(local);
                *self.reader.lock().await = Some(reader);
                *self.writer.lock().await = Some(writer);
                tokio::spawn(handler(remote));
                Ok(())
            }
            PeerBehavior::Refuse => Err(io::Error::new(
                ErrorKind::ConnectionRefused,
                "peer refused connection",
            )),
            PeerBehavior::SocketUnavailable => Err(io::Error::new(
                ErrorKind::NotFound,
                "service record not found",
            )),
            PeerBehavior::Hang => future::pending::<io::Result<()>>().await,
        }
    }

    async fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let mut half = self.hold(&self.reader).await?;
        half.get()?.read(buf).await
    }

    async fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut half = self.hold(&self.writer).await?;
        let writer = half.get()?;

        let cap = self.inner.max_write.load(Ordering::Relaxed);
        let chunk = if cap == 0 { buf } else { &buf[..buf.len().min(cap)] };
        let written = writer.write(chunk).await?;

        Counters::bump(&self.inner.counters.writes, 1);
        Counters::bump(&self.inner.counters.bytes_written, written as u64);
        trace!(bytes = written, "Loopback write");
        Ok(written)
    }

    async fn flush(&self) -> io::Result<()> {
        let mut half = self.hold(&self.writer).await?;
        half.get()?.flush().await
    }

    fn close(&self) -> io::Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        Counters::bump(&self.inner.counters.sockets_closed, 1);
        // A half locked by an in-flight call is dropped with that call's guard.
        if let Ok(mut writer) = self.writer.try_lock() {
            writer.take();
        }
        if let Ok(mut reader) = self.reader.try_lock() {
            reader.take();
        }
        Ok(())
    }
}

impl LoopbackSocket {
    async fn hold<'a, T>(&'a self, slot: &'a AsyncMutex<Option<T>>) -> io::Result<HeldHalf<'a, T>> {
        let mut guard = slot.lock().await;
        if self.is_closed() {
            guard.take();
            return Err(not_connected());
        }
        Ok(HeldHalf {
            guard,
            closed: &self.closed,
        })
    }
}

// ============================================================================
// HeldHalf
// ============================================================================

/// Locked pipe half that is released for good if the socket closed while held.
///
/// Cancelling an in-flight read or write drops this guard, so the pipe end
/// goes away and the peer observes EOF.
struct HeldHalf<'a, T> {
    guard: AsyncMutexGuard<'a, Option<T>>,
    closed: &'a AtomicBool,
}

impl<T> HeldHalf<'_, T> {
    fn get(&mut self) -> io::Result<&mut T> {
        self.guard.as_mut().ok_or_else(not_connected)
    }
}

impl<T> Drop for HeldHalf<'_, T> {
    fn drop(&mut self) {
        if self.closed.load(Ordering::Acquire) {
            self.guard.take();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

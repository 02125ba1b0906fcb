//! Known-device lookup.
//!
//! [`DeviceCatalog`] is a pure view over the adapter's bonded-device
//! registry. It never scans, pairs or performs network I/O.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::device::Device;
use crate::identifiers::DeviceAddress;
use crate::platform::Adapter;

// ============================================================================
// DeviceCatalog
// ============================================================================

/// Query interface over the platform registry.
///
/// # Example
///
/// ```ignore
/// let catalog = session.catalog();
/// if !catalog.is_transport_enabled() {
///     catalog.request_enable();
/// }
/// for device in catalog.list_candidates("esp32") {
///     println!("{device}");
/// }
/// ```
#[derive(Clone)]
pub struct DeviceCatalog {
    adapter: Arc<dyn Adapter>,
}

impl fmt::Debug for DeviceCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceCatalog")
            .field("supported", &self.is_transport_supported())
            .field("enabled", &self.is_transport_enabled())
            .finish()
    }
}

impl DeviceCatalog {
    /// Creates a catalog over `adapter`.
    #[must_use]
    pub fn new(adapter: Arc<dyn Adapter>) -> Self {
        Self { adapter }
    }

    /// Returns `false` if the host has no adapter. Terminal for the host.
    #[inline]
    #[must_use]
    pub fn is_transport_supported(&self) -> bool {
        self.adapter.is_supported()
    }

    /// Returns `true` if the adapter is powered on.
    #[inline]
    #[must_use]
    pub fn is_transport_enabled(&self) -> bool {
        self.adapter.is_supported() && self.adapter.is_enabled()
    }

    /// Asks the platform to power the adapter on. The result arrives
    /// asynchronously through the platform.
    pub fn request_enable(&self) {
        if self.adapter.is_supported() {
            self.adapter.request_enable();
        }
    }

    /// Returns named bonded devices whose name contains `predicate`,
    /// ignoring case, in registry order.
    ///
    /// Empty (not an error) when the registry is empty or the adapter is off.
    #[must_use]
    pub fn list_candidates(&self, predicate: &str) -> Vec<Device> {
        let needle = predicate.to_lowercase();
        let candidates: Vec<Device> = self
            .registry()
            .into_iter()
            .filter(|device| device.name_contains_lowercase(&needle))
            .collect();

        debug!(predicate, count = candidates.len(), "Listed candidate devices");
        candidates
    }

    /// Returns every named bonded device, in registry order.
    #[must_use]
    pub fn list_all(&self) -> Vec<Device> {
        self.list_candidates("")
    }

    /// Finds the first named device whose display name equals `name`.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<Device> {
        self.registry()
            .into_iter()
            .find(|device| device.name() == Some(name))
    }

    /// Finds a bonded device by address, named or not.
    #[must_use]
    pub fn find_by_address(&self, address: &DeviceAddress) -> Option<Device> {
        self.registry()
            .into_iter()
            .find(|device| device.address() == address)
    }

    fn registry(&self) -> Vec<Device> {
        if !self.is_transport_enabled() {
            return Vec::new();
        }
        self.adapter.bonded_devices()
    }
}

// ============================================================================
// Tests
// ============================================================================

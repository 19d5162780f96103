//! Bluetooth stack abstraction
//!
//! The radio, discovery, connection and GATT registration primitives come
//! from the host's Bluetooth stack. These traits are the seam: the client
//! and server only ever talk to them, never to a concrete stack.

use crate::domain::models::DiscoveryEvent;
use crate::infrastructure::bluetooth::protocol::{AppOptions, GattService};
use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;
use std::time::Duration;

/// A remote device handle, resolved to its address and name
#[async_trait]
pub trait Device: Clone + Send + Sync + 'static {
    /// Canonical `XX:XX:XX:XX:XX:XX` address
    fn address(&self) -> String;

    fn name(&self) -> String;

    async fn connect(&self) -> Result<()>;
}

/// Local radio adapter
#[async_trait]
pub trait Adapter: Send + Sync + 'static {
    type Device: Device;

    /// Adapter identifier, e.g. `hci0`
    fn id(&self) -> String;

    async fn is_powered(&self) -> Result<bool>;

    async fn set_powered(&self, powered: bool) -> Result<()>;

    /// Devices already known to the adapter, in adapter order
    async fn devices(&self) -> Result<Vec<Self::Device>>;

    /// Start a live discovery subscription
    async fn discover(&self) -> Result<DiscoverySession>;

    /// Resolve the device behind a discovery event path
    async fn device(&self, path: &str) -> Result<Self::Device>;
}

/// Adapter management interface. Name and mode flags only stick while the
/// radio is powered off.
#[async_trait]
pub trait Management: Send + Sync + 'static {
    async fn set_powered(&self, powered: bool) -> Result<()>;

    async fn set_name(&self, name: &str) -> Result<()>;

    async fn set_le(&self, enabled: bool) -> Result<()>;

    async fn set_advertising(&self, enabled: bool) -> Result<()>;

    async fn set_discoverable(&self, enabled: bool) -> Result<()>;
}

/// A GATT application registered with the stack
#[async_trait]
pub trait GattApp: Send + 'static {
    async fn add_service(&mut self, service: GattService) -> Result<()>;

    /// Register the application and its services
    async fn run(&mut self) -> Result<()>;

    /// Start advertising; `None` advertises until cancelled
    async fn advertise(&mut self, timeout: Option<Duration>) -> Result<AdvertisementHandle>;

    async fn close(&mut self) -> Result<()>;
}

/// Entry point into the host stack
#[async_trait]
pub trait BluetoothStack: Send + Sync + 'static {
    type Adapter: Adapter;
    type Management: Management;
    type App: GattApp;

    async fn default_adapter(&self) -> Result<Arc<Self::Adapter>>;

    async fn management(&self, adapter_id: &str) -> Result<Arc<Self::Management>>;

    async fn new_app(&self, adapter: Arc<Self::Adapter>, options: AppOptions) -> Result<Self::App>;
}

type CancelFn = Box<dyn FnOnce() + Send>;

/// A live discovery subscription.
///
/// The cancel function runs exactly once: on [`DiscoverySession::cancel`]
/// or, failing that, on drop.
pub struct DiscoverySession {
    pub events: BoxStream<'static, DiscoveryEvent>,
    cancel: Option<CancelFn>,
}

impl DiscoverySession {
    pub fn new(
        events: BoxStream<'static, DiscoveryEvent>,
        cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            events,
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for DiscoverySession {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Running advertisement. Cancelling (or dropping) stops it once.
pub struct AdvertisementHandle {
    cancel: Option<CancelFn>,
}

impl AdvertisementHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for AdvertisementHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

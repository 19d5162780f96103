//! In-memory stack used by the unit tests. Every call is recorded.

use crate::domain::models::DiscoveryEvent;
use crate::infrastructure::bluetooth::backend::{
    Adapter, AdvertisementHandle, BluetoothStack, Device, DiscoverySession, GattApp, Management,
};
use crate::infrastructure::bluetooth::protocol::{AppOptions, GattService};
use anyhow::Result;
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type CallLog = Arc<Mutex<Vec<String>>>;

fn record(log: &CallLog, call: impl Into<String>) {
    log.lock().unwrap().push(call.into());
}

#[derive(Debug, Clone)]
pub struct FakeDevice {
    address: String,
    name: String,
    failures_left: Arc<AtomicU32>,
    attempts: Arc<AtomicU32>,
}

impl FakeDevice {
    pub fn new(address: &str, name: &str) -> Self {
        Self {
            address: address.to_string(),
            name: name.to_string(),
            failures_left: Arc::new(AtomicU32::new(0)),
            attempts: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Fail the next `n` connection attempts
    pub fn failing(self, n: u32) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Device for FakeDevice {
    fn address(&self) -> String {
        self.address.clone()
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    async fn connect(&self) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            anyhow::bail!("org.bluez.Error.Failed: le-connection-abort-by-local");
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeAdapter {
    pub powered: AtomicBool,
    pub cached: Vec<FakeDevice>,
    pub fail_listing: bool,
    /// Devices reachable by discovery path
    pub by_path: HashMap<String, FakeDevice>,
    pub events: Mutex<Vec<DiscoveryEvent>>,
    /// Keep the event stream open after the scripted events
    pub hold_open: bool,
    pub discover_calls: AtomicUsize,
    pub cancel_count: Arc<AtomicUsize>,
    pub log: CallLog,
}

impl FakeAdapter {
    pub fn with_cache(devices: Vec<FakeDevice>) -> Self {
        Self {
            cached: devices,
            ..Default::default()
        }
    }

    pub fn with_discovery(devices: Vec<(&str, FakeDevice)>, events: Vec<DiscoveryEvent>) -> Self {
        Self {
            by_path: devices
                .into_iter()
                .map(|(path, dev)| (path.to_string(), dev))
                .collect(),
            events: Mutex::new(events),
            ..Default::default()
        }
    }

    pub fn cancels(&self) -> usize {
        self.cancel_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Adapter for FakeAdapter {
    type Device = FakeDevice;

    fn id(&self) -> String {
        "hci0".to_string()
    }

    async fn is_powered(&self) -> Result<bool> {
        Ok(self.powered.load(Ordering::SeqCst))
    }

    async fn set_powered(&self, powered: bool) -> Result<()> {
        record(&self.log, format!("adapter.set_powered({})", powered));
        self.powered.store(powered, Ordering::SeqCst);
        Ok(())
    }

    async fn devices(&self) -> Result<Vec<FakeDevice>> {
        if self.fail_listing {
            anyhow::bail!("org.freedesktop.DBus.Error.ServiceUnknown");
        }
        Ok(self.cached.clone())
    }

    async fn discover(&self) -> Result<DiscoverySession> {
        self.discover_calls.fetch_add(1, Ordering::SeqCst);
        let events = std::mem::take(&mut *self.events.lock().unwrap());
        let scripted = futures::stream::iter(events);
        let stream = if self.hold_open {
            scripted.chain(futures::stream::pending()).boxed()
        } else {
            scripted.boxed()
        };

        let counter = self.cancel_count.clone();
        Ok(DiscoverySession::new(stream, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }))
    }

    async fn device(&self, path: &str) -> Result<FakeDevice> {
        self.by_path
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no device at {}", path))
    }
}

#[derive(Default)]
pub struct FakeManagement {
    pub log: CallLog,
    pub fail_on: Option<&'static str>,
}

impl FakeManagement {
    fn call(&self, method: &'static str, arg: impl std::fmt::Display) -> Result<()> {
        record(&self.log, format!("{}({})", method, arg));
        if self.fail_on == Some(method) {
            anyhow::bail!("mgmt {} failed", method);
        }
        Ok(())
    }
}

#[async_trait]
impl Management for FakeManagement {
    async fn set_powered(&self, powered: bool) -> Result<()> {
        self.call("set_powered", powered)
    }

    async fn set_name(&self, name: &str) -> Result<()> {
        self.call("set_name", name)
    }

    async fn set_le(&self, enabled: bool) -> Result<()> {
        self.call("set_le", enabled)
    }

    async fn set_advertising(&self, enabled: bool) -> Result<()> {
        self.call("set_advertising", enabled)
    }

    async fn set_discoverable(&self, enabled: bool) -> Result<()> {
        self.call("set_discoverable", enabled)
    }
}

pub struct FakeApp {
    log: CallLog,
    services: Arc<Mutex<Vec<GattService>>>,
    fail_advertise: bool,
}

#[async_trait]
impl GattApp for FakeApp {
    async fn add_service(&mut self, service: GattService) -> Result<()> {
        record(&self.log, format!("app.add_service({})", service.uuid));
        self.services.lock().unwrap().push(service);
        Ok(())
    }

    async fn run(&mut self) -> Result<()> {
        record(&self.log, "app.run");
        Ok(())
    }

    async fn advertise(&mut self, timeout: Option<Duration>) -> Result<AdvertisementHandle> {
        record(&self.log, format!("app.advertise({:?})", timeout));
        if self.fail_advertise {
            anyhow::bail!("org.bluez.Error.Failed: maximum advertisements reached");
        }
        let log = self.log.clone();
        Ok(AdvertisementHandle::new(move || {
            record(&log, "advertisement.cancel");
        }))
    }

    async fn close(&mut self) -> Result<()> {
        record(&self.log, "app.close");
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeStack {
    pub adapter: Arc<FakeAdapter>,
    pub management: Arc<FakeManagement>,
    pub services: Arc<Mutex<Vec<GattService>>>,
    pub app_options: Mutex<Vec<AppOptions>>,
    pub fail_advertise: bool,
    pub log: CallLog,
}

impl FakeStack {
    pub fn new() -> Self {
        let log = CallLog::default();
        Self {
            adapter: Arc::new(FakeAdapter {
                log: log.clone(),
                ..Default::default()
            }),
            management: Arc::new(FakeManagement {
                log: log.clone(),
                ..Default::default()
            }),
            log,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl BluetoothStack for FakeStack {
    type Adapter = FakeAdapter;
    type Management = FakeManagement;
    type App = FakeApp;

    async fn default_adapter(&self) -> Result<Arc<FakeAdapter>> {
        Ok(self.adapter.clone())
    }

    async fn management(&self, adapter_id: &str) -> Result<Arc<FakeManagement>> {
        record(&self.log, format!("management({})", adapter_id));
        Ok(self.management.clone())
    }

    async fn new_app(&self, _adapter: Arc<FakeAdapter>, options: AppOptions) -> Result<FakeApp> {
        // Give concurrent callers a chance to interleave
        tokio::task::yield_now().await;
        record(&self.log, "new_app");
        self.app_options.lock().unwrap().push(options);
        Ok(FakeApp {
            log: self.log.clone(),
            services: self.services.clone(),
            fail_advertise: self.fail_advertise,
        })
    }
}

//! Advertising GATT server
//!
//! Configures the local radio on construction, then serves a single
//! service/characteristic/descriptor tree until closed.
//!
//! Teardown is driven by a background worker that owns the application for
//! as long as it is alive. [`Server::close_app`] asks it to stop;
//! [`Server::wait`] resolves once the worker has cancelled advertising and
//! closed the application. Everything the worker does happens before any
//! `wait` call returns.

use crate::domain::settings::ServerSettings;
use crate::error::{AdapterContext, LinkError, Result};
use crate::infrastructure::bluetooth::backend::{
    Adapter, AdvertisementHandle, BluetoothStack, GattApp, Management,
};
use crate::infrastructure::bluetooth::protocol::{build_service_tree, AppOptions};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Server<S: BluetoothStack> {
    stack: Arc<S>,
    adapter: Arc<S::Adapter>,
    adapter_id: String,
    management: Arc<S::Management>,
    settings: ServerSettings,
    /// Serializes `serve` calls
    serve_lock: tokio::sync::Mutex<()>,
    /// Present while an application is alive
    teardown: Mutex<Option<oneshot::Sender<()>>>,
    /// Flips to `true` once the last application has been torn down
    finished: Mutex<watch::Receiver<bool>>,
}

impl<S: BluetoothStack> Server<S> {
    /// Fetch the default adapter and prepare it for advertising.
    ///
    /// The name and mode flags are written with the radio powered off, then
    /// the radio is powered back on.
    pub async fn new(stack: Arc<S>, settings: ServerSettings) -> Result<Self> {
        let adapter = stack
            .default_adapter()
            .await
            .adapter_context("failed to get default adapter")?;
        let adapter_id = adapter.id();
        let management = stack
            .management(&adapter_id)
            .await
            .adapter_context(format!("failed to open management interface for {}", adapter_id))?;

        info!(
            "Configuring adapter {} as \"{}\"",
            adapter_id, settings.advertised_name
        );
        management
            .set_powered(false)
            .await
            .adapter_context("failed to power off adapter")?;
        management
            .set_name(&settings.advertised_name)
            .await
            .adapter_context("failed to set advertised name")?;
        management
            .set_le(false)
            .await
            .adapter_context("failed to disable LE mode")?;
        management
            .set_advertising(true)
            .await
            .adapter_context("failed to enable advertising")?;
        management
            .set_discoverable(true)
            .await
            .adapter_context("failed to enable discoverable mode")?;
        management
            .set_powered(true)
            .await
            .adapter_context("failed to power on adapter")?;

        let (_, finished) = watch::channel(true);

        Ok(Self {
            stack,
            adapter,
            adapter_id,
            management,
            settings,
            serve_lock: tokio::sync::Mutex::new(()),
            teardown: Mutex::new(None),
            finished: Mutex::new(finished),
        })
    }

    pub fn adapter_id(&self) -> &str {
        &self.adapter_id
    }

    pub fn management(&self) -> &Arc<S::Management> {
        &self.management
    }

    pub fn is_serving(&self) -> bool {
        lock(&self.teardown).is_some()
    }

    /// Build, register and advertise the application.
    pub async fn serve(&self) -> Result<()> {
        // Held until the teardown sender is in place
        let _serving = self.serve_lock.lock().await;
        if self.is_serving() {
            return Err(LinkError::AlreadyServing);
        }

        let options = AppOptions::new(self.adapter_id.clone());
        let mut app = self
            .stack
            .new_app(self.adapter.clone(), options.clone())
            .await
            .adapter_context("failed to create application")?;

        let advertisement = match self.start_app(&mut app, &options).await {
            Ok(advertisement) => advertisement,
            Err(e) => {
                if let Err(close_err) = app.close().await {
                    warn!("Failed to close application after setup error: {}", close_err);
                }
                return Err(e);
            }
        };

        let (teardown_tx, teardown_rx) = oneshot::channel::<()>();
        let (finished_tx, finished_rx) = watch::channel(false);

        tokio::spawn(async move {
            let mut app = app;
            let mut advertisement = advertisement;

            // A dropped server tears the app down as well
            let _ = teardown_rx.await;
            debug!("Tearing down application");

            advertisement.cancel();
            if let Err(e) = app.close().await {
                warn!("Failed to close application: {}", e);
            }
            drop(app);

            info!("Application closed");
            finished_tx.send_replace(true);
        });

        *lock(&self.finished) = finished_rx;
        *lock(&self.teardown) = Some(teardown_tx);
        Ok(())
    }

    async fn start_app(&self, app: &mut S::App, options: &AppOptions) -> Result<AdvertisementHandle> {
        let powered = self
            .adapter
            .is_powered()
            .await
            .adapter_context("failed to read adapter power state")?;
        if !powered {
            debug!("Powering on adapter {}", self.adapter_id);
            self.adapter
                .set_powered(true)
                .await
                .adapter_context("failed to power on adapter")?;
        }

        let service = build_service_tree(options);
        info!("Serving service {}", service.uuid);
        app.add_service(service)
            .await
            .adapter_context("failed to add service")?;

        app.run()
            .await
            .adapter_context("failed to register application")?;

        let timeout = self.settings.advertise_timeout();
        let advertisement = app
            .advertise(timeout)
            .await
            .adapter_context("failed to start advertising")?;
        match timeout {
            Some(t) => info!("Advertising for {:?}", t),
            None => info!("Advertising until closed"),
        }
        Ok(advertisement)
    }

    /// Ask the worker to tear down the application. No-op when nothing is served.
    pub fn close_app(&self) {
        match lock(&self.teardown).take() {
            Some(tx) => {
                info!("Closing application");
                let _ = tx.send(());
            }
            None => debug!("No application to close"),
        }
    }

    /// Resolve once the served application has been torn down. Returns
    /// immediately if nothing was ever served.
    pub async fn wait(&self) {
        let mut finished = lock(&self.finished).clone();
        // A closed channel means the worker is gone, which is just as final
        let _ = finished.wait_for(|done| *done).await;
    }
}

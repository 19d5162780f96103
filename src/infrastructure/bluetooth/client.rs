//! Search-and-connect client
//!
//! Resolves the target in two phases, the adapter cache first and live
//! discovery second, then connects in the background with indefinite retry.
//! A client is meant for a single search cycle: concurrent searches on one
//! instance race for the target slot.

use crate::domain::models::ClientState;
use crate::domain::predicate::DevicePredicate;
use crate::domain::settings::SearchConfig;
use crate::error::{LinkError, Result};
use crate::infrastructure::bluetooth::backend::{Adapter, Device};
use crate::infrastructure::bluetooth::connection::{connect_with_retry, RetryPolicy};
use crate::infrastructure::bluetooth::scanner::Scanner;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared with the background search task
struct Shared<D> {
    target: Mutex<Option<D>>,
    state: watch::Sender<ClientState>,
    completion: Mutex<Option<oneshot::Sender<D>>>,
}

impl<D: Device> Shared<D> {
    fn set_state(&self, state: ClientState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!("Client state: {} -> {}", previous, state);
        }
    }

    async fn connect(&self, device: D, policy: RetryPolicy, cancel: &CancellationToken) -> Result<D> {
        *lock(&self.target) = Some(device.clone());
        self.set_state(ClientState::Connecting);

        if let Err(e) = connect_with_retry(&device, policy, cancel).await {
            self.set_state(ClientState::Idle);
            return Err(e);
        }

        self.set_state(ClientState::Connected);
        if let Some(tx) = lock(&self.completion).take() {
            let _ = tx.send(device.clone());
        }
        Ok(device)
    }
}

/// Handle to the background part of a search.
///
/// Dropping it leaves the search running.
pub struct SearchHandle<D> {
    task: JoinHandle<Result<D>>,
}

impl<D> SearchHandle<D> {
    /// Wait for the background search to finish
    pub async fn outcome(self) -> Result<D> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(LinkError::Cancelled),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Abort the background task outright
    pub fn abort(&self) {
        self.task.abort();
    }
}

/// Finds and connects to one device
pub struct Client<A: Adapter> {
    adapter: Arc<A>,
    shared: Arc<Shared<A::Device>>,
    completion_rx: Mutex<Option<oneshot::Receiver<A::Device>>>,
    cancel: CancellationToken,
}

impl<A: Adapter> Client<A> {
    pub fn new(adapter: Arc<A>) -> Self {
        Self::with_cancellation(adapter, CancellationToken::new())
    }

    /// Every search runs under a child of `cancel`
    pub fn with_cancellation(adapter: Arc<A>, cancel: CancellationToken) -> Self {
        let (completion_tx, completion_rx) = oneshot::channel();
        let (state, _) = watch::channel(ClientState::Idle);

        Self {
            adapter,
            shared: Arc::new(Shared {
                target: Mutex::new(None),
                state,
                completion: Mutex::new(Some(completion_tx)),
            }),
            completion_rx: Mutex::new(Some(completion_rx)),
            cancel,
        }
    }

    pub fn state(&self) -> ClientState {
        *self.shared.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ClientState> {
        self.shared.state.subscribe()
    }

    /// The most recently resolved device
    pub fn target(&self) -> Option<A::Device> {
        lock(&self.shared.target).clone()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Abort running searches, retry loops and pending [`Client::wait_connect`] calls
    pub fn cancel(&self) {
        info!("Cancelling search");
        self.cancel.cancel();
    }

    /// Start searching for the configured device.
    ///
    /// Configuration and adapter errors from the cache phase are returned
    /// directly. Everything after that (discovery and connecting) runs in
    /// the background and this returns as soon as it has been started.
    pub async fn search_and_connect(&self, config: &SearchConfig) -> Result<SearchHandle<A::Device>> {
        let predicate = DevicePredicate::from_config(config)?;
        let policy = RetryPolicy::new(config.retry_cooldown());
        info!("Searching for device: {}", predicate);

        let scanner = Scanner::new(self.adapter.clone(), predicate);
        self.shared.set_state(ClientState::ResolvingCache);

        let cached = match scanner.resolve_cached().await {
            Ok(device) => Some(device),
            Err(LinkError::DeviceNotFound) => {
                info!("No cached device matches {}, starting discovery", scanner.predicate());
                None
            }
            Err(e) => {
                error!("Cache lookup failed: {}", e);
                self.shared.set_state(ClientState::Idle);
                return Err(e);
            }
        };

        let shared = self.shared.clone();
        let cancel = self.cancel.child_token();
        let task = tokio::spawn(async move {
            let device = match cached {
                Some(device) => device,
                None => {
                    shared.set_state(ClientState::ResolvingDiscovery);
                    match scanner.resolve_discovered(&cancel).await {
                        Ok(device) => device,
                        Err(e) => {
                            match &e {
                                LinkError::DeviceNotFound => {
                                    warn!("Discovery ended without finding {}", scanner.predicate())
                                }
                                LinkError::Cancelled => info!("Discovery cancelled"),
                                other => error!("Discovery failed: {}", other),
                            }
                            shared.set_state(ClientState::Idle);
                            return Err(e);
                        }
                    }
                }
            };

            shared.connect(device, policy, &cancel).await
        });

        Ok(SearchHandle { task })
    }

    /// Block until the first successful connection.
    ///
    /// Only one caller receives the device; later calls fail with
    /// [`LinkError::AlreadyAwaited`]. If no device is ever found this waits
    /// until the client is cancelled.
    pub async fn wait_connect(&self) -> Result<A::Device> {
        let rx = lock(&self.completion_rx)
            .take()
            .ok_or(LinkError::AlreadyAwaited)?;

        tokio::select! {
            device = rx => device.map_err(|_| LinkError::Cancelled),
            _ = self.cancel.cancelled() => Err(LinkError::Cancelled),
        }
    }
}

//! Device resolution
//!
//! Resolves the target device either from the adapter's known-device cache
//! or from a live discovery subscription.

use crate::domain::models::DiscoveryEventKind;
use crate::domain::predicate::DevicePredicate;
use crate::error::{AdapterContext, LinkError, Result};
use crate::infrastructure::bluetooth::backend::{Adapter, Device};
use futures::StreamExt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// Resolves a device matching a predicate
pub struct Scanner<A: Adapter> {
    adapter: Arc<A>,
    predicate: DevicePredicate,
}

impl<A: Adapter> Scanner<A> {
    pub fn new(adapter: Arc<A>, predicate: DevicePredicate) -> Self {
        Self { adapter, predicate }
    }

    pub fn predicate(&self) -> &DevicePredicate {
        &self.predicate
    }

    /// First cached device matching the predicate, in adapter order
    pub async fn resolve_cached(&self) -> Result<A::Device> {
        let devices = self
            .adapter
            .devices()
            .await
            .adapter_context("failed to list known devices")?;
        debug!("Checking {} cached devices", devices.len());

        devices
            .into_iter()
            .find(|d| self.predicate.matches(&d.address(), &d.name()))
            .inspect(|d| info!("Found cached device {} ({})", d.address(), d.name()))
            .ok_or(LinkError::DeviceNotFound)
    }

    /// Watch discovery events until a device matches, the stream ends or
    /// `cancel` fires. The subscription is cancelled exactly once on every path.
    pub async fn resolve_discovered(&self, cancel: &CancellationToken) -> Result<A::Device> {
        let mut session = self
            .adapter
            .discover()
            .await
            .adapter_context("failed to start discovery")?;
        info!("Discovery started, waiting for {}", self.predicate);

        // Dropping `session` cancels the subscription on every early return
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Discovery cancelled");
                    return Err(LinkError::Cancelled);
                }
                event = session.events.next() => event,
            };

            let Some(event) = event else {
                break;
            };

            if event.kind == DiscoveryEventKind::Removed {
                trace!("Skipping removed device {}", event.path);
                continue;
            }

            let device = self
                .adapter
                .device(&event.path)
                .await
                .adapter_context(format!("failed to resolve device at {}", event.path))?;
            trace!(
                "Discovered {} ({}) at {}",
                device.address(),
                device.name(),
                event.path
            );

            if self.predicate.matches(&device.address(), &device.name()) {
                session.cancel();
                info!("Discovered device {} ({})", device.address(), device.name());
                return Ok(device);
            }
        }

        debug!("Discovery stream ended without a match");
        Err(LinkError::DeviceNotFound)
    }
}

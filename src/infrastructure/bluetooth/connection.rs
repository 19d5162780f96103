//! Connect-retry loop
//!
//! Peripherals advertise intermittently or get power-cycled, so a failed
//! connection attempt is never surfaced: the loop waits a fixed cooldown and
//! tries again until it succeeds or the search is cancelled.

use crate::error::{LinkError, Result};
use crate::infrastructure::bluetooth::backend::Device;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Lower bound on the cooldown between attempts
pub const MIN_RETRY_COOLDOWN: Duration = Duration::from_millis(50);

/// Retry behavior for a resolved device
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    cooldown: Duration,
}

impl RetryPolicy {
    /// Cooldowns below [`MIN_RETRY_COOLDOWN`] are clamped up to it
    pub fn new(cooldown: Duration) -> Self {
        if cooldown < MIN_RETRY_COOLDOWN {
            warn!(
                "Retry cooldown {:?} is below the minimum, using {:?}",
                cooldown, MIN_RETRY_COOLDOWN
            );
            return Self {
                cooldown: MIN_RETRY_COOLDOWN,
            };
        }
        Self { cooldown }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }
}

/// Connect to `device`, retrying after every failure.
///
/// Returns the number of attempts on success. The only error is
/// [`LinkError::Cancelled`].
pub async fn connect_with_retry<D: Device>(
    device: &D,
    policy: RetryPolicy,
    cancel: &CancellationToken,
) -> Result<u32> {
    let mut attempt = 0u32;

    loop {
        attempt = attempt.saturating_add(1);
        info!("Connecting to {} (attempt {})", device.address(), attempt);

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LinkError::Cancelled),
            outcome = device.connect() => outcome,
        };

        match outcome {
            Ok(()) => {
                info!(
                    "Connected to {} ({}) after {} attempt(s)",
                    device.address(),
                    device.name(),
                    attempt
                );
                return Ok(attempt);
            }
            Err(e) => {
                warn!(
                    "Connection to {} failed: {}. Retrying in {:?}",
                    device.address(),
                    e,
                    policy.cooldown()
                );
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LinkError::Cancelled),
            _ = tokio::time::sleep(policy.cooldown()) => {}
        }
    }
}

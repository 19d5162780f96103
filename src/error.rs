//! Error types for device resolution and advertising.
//!
//! `LinkError::DeviceNotFound` is an internal control signal: a cache miss
//! falls back to discovery and a discovery miss only ends the background task.
//! It never leaves `Client::search_and_connect` synchronously.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LinkError>;

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Configuration error: either an address or a name pattern must be set")]
    Configuration,

    #[error("Malformed hardware address: {0:?}")]
    MalformedAddress(String),

    #[error("Invalid name pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Device not found")]
    DeviceNotFound,

    #[error("Adapter error: {context}")]
    Adapter {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Search cancelled")]
    Cancelled,

    #[error("Connection completion already awaited")]
    AlreadyAwaited,

    #[error("An application is already being served")]
    AlreadyServing,
}

/// Wraps backend failures into [`LinkError::Adapter`], like `anyhow::Context`.
pub trait AdapterContext<T> {
    fn adapter_context<C: Into<String>>(self, context: C) -> Result<T>;
}

impl<T> AdapterContext<T> for anyhow::Result<T> {
    fn adapter_context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|source| LinkError::Adapter {
            context: context.into(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_context_keeps_source() {
        let result: anyhow::Result<()> = Err(anyhow::anyhow!("org.bluez.Error.NotReady"));
        let err = result.adapter_context("failed to power on").unwrap_err();

        assert_eq!(err.to_string(), "Adapter error: failed to power on");
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "org.bluez.Error.NotReady");
    }
}

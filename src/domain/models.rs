use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of change reported by a discovery subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryEventKind {
    Added,
    Changed,
    Removed,
}

/// A single discovery event. `path` resolves to a device handle via the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryEvent {
    pub kind: DiscoveryEventKind,
    pub path: String,
}

impl DiscoveryEvent {
    pub fn added(path: impl Into<String>) -> Self {
        Self {
            kind: DiscoveryEventKind::Added,
            path: path.into(),
        }
    }

    pub fn changed(path: impl Into<String>) -> Self {
        Self {
            kind: DiscoveryEventKind::Changed,
            path: path.into(),
        }
    }

    pub fn removed(path: impl Into<String>) -> Self {
        Self {
            kind: DiscoveryEventKind::Removed,
            path: path.into(),
        }
    }
}

/// Client search/connect state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientState {
    #[default]
    Idle,
    ResolvingCache,
    ResolvingDiscovery,
    Connecting,
    Connected,
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::ResolvingCache => "resolving (cache)",
            Self::ResolvingDiscovery => "resolving (discovery)",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(s)
    }
}

/// Pairing agent IO capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AgentCapability {
    DisplayOnly,
    DisplayYesNo,
    KeyboardOnly,
    #[default]
    NoInputNoOutput,
    KeyboardDisplay,
}

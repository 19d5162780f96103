//! Device resolution and advertising on top of a host Bluetooth stack.
//!
//! [`Client`] finds a peripheral by address or name pattern, first among the
//! adapter's known devices and then through live discovery, and keeps trying
//! to connect until it succeeds. [`Server`] advertises a single GATT service
//! so remote peers can find and connect to this host.

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use domain::models::{ClientState, DiscoveryEvent, DiscoveryEventKind};
pub use domain::predicate::DevicePredicate;
pub use domain::settings::{SearchConfig, ServerSettings, Settings, SettingsService};
pub use error::{LinkError, Result};
pub use infrastructure::bluetooth::backend::{
    Adapter, AdvertisementHandle, BluetoothStack, Device, DiscoverySession, GattApp, Management,
};
pub use infrastructure::bluetooth::{Client, SearchHandle, Server};

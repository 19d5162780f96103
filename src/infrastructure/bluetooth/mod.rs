//! Bluetooth Module
//!
//! Finds and connects to a remote peripheral, and advertises a GATT service
//! so remote peers can find this host.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │            Client            │   │            Server            │
//! │  search_and_connect / wait   │   │   new / serve / close / wait │
//! └──────┬───────────────┬───────┘   └──────────────┬───────────────┘
//!        │               │                          │
//!        ▼               ▼                          ▼
//! ┌────────────┐  ┌────────────┐            ┌──────────────┐
//! │  Scanner   │  │ Connection │            │   Protocol   │
//! │ - cache    │  │ - retry    │            │ - UUID slots │
//! │ - discovery│  │   loop     │            │ - GATT tree  │
//! └─────┬──────┘  └─────┬──────┘            └──────┬───────┘
//!       └───────────────┴──────────┬───────────────┘
//!                                  ▼
//!                      ┌──────────────────────┐
//!                      │   Backend (traits)   │
//!                      │ host Bluetooth stack │
//!                      └──────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`backend`] - Traits the host Bluetooth stack implements
//! - [`protocol`] - UUID slots and the advertised GATT tree
//! - [`scanner`] - Cache and discovery device resolution
//! - [`connection`] - Connect-retry loop
//! - [`client`] - Two-phase search with background connect
//! - [`server`] - Adapter setup, advertising and teardown

pub mod backend;
pub mod client;
pub mod connection;
pub mod protocol;
pub mod scanner;
pub mod server;

#[cfg(test)]
pub(crate) mod fake;

pub use client::{Client, SearchHandle};
pub use server::Server;

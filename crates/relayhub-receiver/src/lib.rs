//! `RelayHub` Agent Receiver Library
//!
//! Server side of relay management for a monitoring site:
//! - `SQLite` storage for relays, tasks and issued certificates
//! - Relay lifecycle (`ACTIVE` -> `PENDING_DELETION` -> `DELETED`) derived
//!   from the site's activated relay list
//! - Task store with idempotent config-task assignment
//! - Activation coordinator distributing new configuration snapshots
//! - Certificate issuance and refresh for relays
//! - Monitoring data forwarding to the core's raw-data socket
//! - axum HTTP surface tying it all together

pub mod activation;
pub mod auth;
pub mod certs;
pub mod error;
pub mod lifecycle;
pub mod monitoring;
pub mod registry;
pub mod server;
pub mod site;
pub mod storage;
pub mod tasks;
pub mod types;

#[cfg(test)]
mod test_helpers;

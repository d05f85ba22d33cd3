//! `RelayHub` Core Library
//!
//! Shared functionality for `RelayHub` components:
//! - Layered configuration for the agent receiver
//! - `SQLite` pool helpers and the `define_database!` macro
//! - Base64 codec for binary data in JSON bodies
//! - Tracing initialisation
//! - Common error types

pub mod config;
pub mod db;
pub mod encoding;
pub mod error;
pub mod tracing_init;

pub use config::{ReceiverConfig, TaskRetention};
pub use error::{Error, Result};

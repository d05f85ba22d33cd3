//! SQLite storage for the agent receiver.
//!
//! Provides persistence for relays, issued certificate metadata and the
//! per-relay task log.

mod db;
mod models;
mod queries_certs;
mod queries_relays;
mod queries_tasks;


pub use db::{DatabaseError, ReceiverDatabase};
pub use models::*;
pub use queries_certs::CertificateParams;
pub use queries_tasks::NewTask;

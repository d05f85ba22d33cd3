//! SQLite database for the agent receiver.

pub use relayhub_core::db::DatabaseError;

relayhub_core::define_database!(ReceiverDatabase, "Receiver database migrations complete");

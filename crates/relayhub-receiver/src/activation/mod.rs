//! Configuration activation: resolve the active snapshot and hand out
//! config tasks to the relays provisioned in it.

mod coordinator;
mod snapshot;


pub use coordinator::{ActivationCoordinator, ActivationReport};
pub use snapshot::{ConfigSnapshot, ConfigSnapshotResolver, SnapshotError};

//! Task store: the per-relay, append-only log of work assigned to relays.

mod locks;
mod store;


pub use locks::{RelayGuard, RelayLocks};
pub use store::TaskStore;

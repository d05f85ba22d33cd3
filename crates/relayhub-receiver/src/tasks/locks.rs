//! Per-relay mutual exclusion for check-then-push sequences.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;

use crate::types::RelayId;

type LockMap = HashMap<RelayId, Arc<tokio::sync::Mutex<()>>>;

/// One async mutex per relay. Unrelated relays never wait on each other.
///
/// An entry lives only while someone holds or awaits its lock.
#[derive(Clone, Default)]
pub struct RelayLocks {
    locks: Arc<Mutex<LockMap>>,
}

/// Held lock of one relay. Dropping it releases the lock.
pub struct RelayGuard {
    relay_id: RelayId,
    locks: Arc<Mutex<LockMap>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl RelayLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock of `relay_id`, held until the guard is dropped.
    pub async fn lock(&self, relay_id: &RelayId) -> RelayGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(relay_id.clone()).or_default())
        };
        RelayGuard {
            relay_id: relay_id.clone(),
            locks: Arc::clone(&self.locks),
            guard: Some(lock.lock_owned().await),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for RelayGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map's own reference left: nobody holds or waits for it.
        let unused = locks
            .get(&self.relay_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if unused {
            locks.remove(&self.relay_id);
        }
    }
}

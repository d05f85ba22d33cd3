//! In-memory site relay directory for tests.
//!
//! Models the site as a relay list plus a log of changes that have not been
//! activated yet. Deleting a relay removes it from the list and records a
//! `DEL` change; `activate_changes` clears the log.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{ChangeOp, RelayChange, SiteError, SiteRelayDirectory};
use crate::auth::UserAuth;
use crate::types::RelayId;

#[derive(Default)]
struct SiteState {
    relays: HashSet<RelayId>,
    pending: Vec<RelayChange>,
    unavailable: bool,
}

pub struct InMemorySiteDirectory {
    token: String,
    state: Mutex<SiteState>,
}

impl InMemorySiteDirectory {
    /// A site that accepts exactly `token` as user credential.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            state: Mutex::new(SiteState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, SiteState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Configure a relay on the site (pending activation).
    pub fn add_relay(&self, id: &RelayId) {
        let mut state = self.state();
        state.relays.insert(id.clone());
        state.pending.push(RelayChange {
            relay_id: id.clone(),
            op: ChangeOp::Add,
        });
    }

    /// Remove a relay from the site without activating the removal.
    pub fn delete_relay(&self, id: &RelayId) {
        let mut state = self.state();
        state.relays.remove(id);
        state.pending.push(RelayChange {
            relay_id: id.clone(),
            op: ChangeOp::Del,
        });
    }

    /// Activate all pending changes.
    pub fn activate_changes(&self) {
        self.state().pending.clear();
    }

    /// Make every call fail as if the site could not be reached.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    fn check(&self, auth: &UserAuth) -> Result<(), SiteError> {
        if self.state().unavailable {
            return Err(SiteError::Unavailable("site is down".into()));
        }
        if auth.token() != self.token {
            return Err(SiteError::Unauthorized);
        }
        Ok(())
    }
}

#[async_trait]
impl SiteRelayDirectory for InMemorySiteDirectory {
    async fn authenticate(&self, auth: &UserAuth) -> Result<(), SiteError> {
        self.check(auth)
    }

    async fn list_relays(&self, auth: &UserAuth) -> Result<HashSet<RelayId>, SiteError> {
        self.check(auth)?;
        Ok(self.state().relays.clone())
    }

    async fn list_relay_changes(&self, auth: &UserAuth) -> Result<Vec<RelayChange>, SiteError> {
        self.check(auth)?;
        Ok(self.state().pending.clone())
    }

    async fn create_relay(
        &self,
        auth: &UserAuth,
        relay_id: &RelayId,
        _alias: &str,
    ) -> Result<(), SiteError> {
        self.check(auth)?;
        let mut state = self.state();
        if state.relays.insert(relay_id.clone()) {
            state.pending.push(RelayChange {
                relay_id: relay_id.clone(),
                op: ChangeOp::Add,
            });
        }
        Ok(())
    }
}

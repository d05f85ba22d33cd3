//! Relay lifecycle manager.
//!
//! Resolves the state of a relay for a caller. `UserAuth` callers get the
//! site's view, which distinguishes `ACTIVE` relays from relays removed on
//! the site but not yet activated (`PENDING_DELETION`), and the result is
//! persisted locally. `Internal` callers only ever see the local registry,
//! so a relay in `PENDING_DELETION` keeps working for them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info};

use crate::auth::{Auth, UserAuth};
use crate::error::RelayError;
use crate::registry::RelayRegistry;
use crate::site::{ChangeOp, SiteRelayDirectory};
use crate::types::{RelayId, RelayState};

/// Snapshot of the site's relay list and its not-yet-activated changes.
struct SiteView {
    relays: HashSet<RelayId>,
    last_change: HashMap<RelayId, ChangeOp>,
}

impl SiteView {
    /// Site-derived state of a relay, given whether it is known locally.
    fn state_of(&self, id: &RelayId, known_locally: bool) -> Option<RelayState> {
        if self.relays.contains(id) {
            Some(RelayState::Active)
        } else if self.last_change.get(id) == Some(&ChangeOp::Del) {
            Some(RelayState::PendingDeletion)
        } else if known_locally {
            // Gone from the site with no pending change: the deletion was activated.
            Some(RelayState::Deleted)
        } else {
            None
        }
    }
}

#[derive(Clone)]
pub struct RelayLifecycle {
    registry: RelayRegistry,
    site: Arc<dyn SiteRelayDirectory>,
}

impl RelayLifecycle {
    pub fn new(registry: RelayRegistry, site: Arc<dyn SiteRelayDirectory>) -> Self {
        Self { registry, site }
    }

    pub const fn registry(&self) -> &RelayRegistry {
        &self.registry
    }

    /// Check a user credential against the site.
    pub async fn authenticate(&self, auth: &UserAuth) -> Result<(), RelayError> {
        self.site.authenticate(auth).await?;
        Ok(())
    }

    /// Configure a relay on the site ahead of registering it locally.
    pub async fn create_on_site(
        &self,
        auth: &UserAuth,
        id: &RelayId,
        alias: &str,
    ) -> Result<(), RelayError> {
        self.site.create_relay(auth, id, alias).await?;
        Ok(())
    }

    async fn site_view(&self, auth: &UserAuth) -> Result<SiteView, RelayError> {
        let relays = self.site.list_relays(auth).await?;
        let last_change = self
            .site
            .list_relay_changes(auth)
            .await?
            .into_iter()
            .map(|change| (change.relay_id, change.op))
            .collect();
        Ok(SiteView {
            relays,
            last_change,
        })
    }

    /// State of `id` as visible to `auth`. A relay that is unknown, or whose
    /// deletion has been activated, is `RelayNotFound`.
    pub async fn get_relay_state(
        &self,
        auth: &Auth,
        id: &RelayId,
    ) -> Result<RelayState, RelayError> {
        match auth {
            Auth::Internal => Ok(self.registry.require_operable(id).await?.state),
            Auth::User(user) => {
                self.authenticate(user).await?;
                let view = self.site_view(user).await?;
                let local = self.registry.find(id).await?;

                let Some(derived) = view.state_of(id, local.is_some()) else {
                    return Err(RelayError::RelayNotFound(id.clone()));
                };
                let state = if local.is_some() {
                    self.registry.advance(id, derived).await?
                } else {
                    derived
                };

                match state {
                    RelayState::Deleted => Err(RelayError::RelayNotFound(id.clone())),
                    operable => Ok(operable),
                }
            }
        }
    }

    /// Apply the site's view to every locally known relay that is not yet
    /// deleted. Returns how many relays changed state.
    pub async fn reconcile(&self, auth: &UserAuth) -> Result<usize, RelayError> {
        self.authenticate(auth).await?;
        let view = self.site_view(auth).await?;

        let mut changed = 0;
        for relay in self.registry.list(None).await? {
            if relay.state == RelayState::Deleted {
                continue;
            }
            let Some(derived) = view.state_of(&relay.id, true) else {
                continue;
            };
            let state = self.registry.advance(&relay.id, derived).await?;
            if state == relay.state {
                debug!(relay_id = %relay.id, state = %state, "Relay state unchanged");
            } else {
                changed += 1;
            }
        }

        info!(changed, "Relay states reconciled with site");
        Ok(changed)
    }
}

//! Assignment of configuration tasks on activation.

use relayhub_core::encoding::base64_encode;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::auth::Auth;
use crate::error::RelayError;
use crate::lifecycle::RelayLifecycle;
use crate::tasks::TaskStore;
use crate::types::{RelayId, RelayState, Serial};

use super::ConfigSnapshotResolver;

/// What one activation did, per relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivationReport {
    pub serial: Serial,
    /// Relays that received a new config task.
    pub created: Vec<RelayId>,
    /// Relays that already had a pending task for this serial.
    pub already_pending: Vec<RelayId>,
    /// Relays not eligible for new work (pending deletion or unknown).
    pub skipped: Vec<RelayId>,
}

impl ActivationReport {
    const fn new(serial: Serial) -> Self {
        Self {
            serial,
            created: Vec::new(),
            already_pending: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct ActivationCoordinator {
    lifecycle: RelayLifecycle,
    tasks: TaskStore,
    snapshots: ConfigSnapshotResolver,
}

impl ActivationCoordinator {
    pub const fn new(
        lifecycle: RelayLifecycle,
        tasks: TaskStore,
        snapshots: ConfigSnapshotResolver,
    ) -> Self {
        Self {
            lifecycle,
            tasks,
            snapshots,
        }
    }

    /// Make sure every `ACTIVE` relay in `relays` has a pending config task
    /// for `serial`, carrying the relay's configuration directory for that
    /// serial as a base64 tar archive.
    ///
    /// Safe to repeat: a relay that already has a pending task for the same
    /// serial gets nothing new. Relays in `PENDING_DELETION` and relays not
    /// known locally are skipped without error. For `UserAuth` callers the
    /// local registry is first brought in line with the site.
    #[instrument(skip(self, auth, relays), fields(serial = %serial, relays = relays.len()))]
    pub async fn activate(
        &self,
        auth: &Auth,
        serial: &Serial,
        relays: &[RelayId],
    ) -> Result<ActivationReport, RelayError> {
        let mut report = ActivationReport::new(serial.clone());

        if let Auth::User(user) = auth {
            self.lifecycle.authenticate(user).await?;
            if relays.is_empty() {
                info!("No relays to activate");
                return Ok(report);
            }
            self.lifecycle.reconcile(user).await?;
        }

        for relay_id in relays {
            match self
                .lifecycle
                .get_relay_state(&Auth::Internal, relay_id)
                .await
            {
                Ok(RelayState::Active) => {}
                Ok(state) => {
                    debug!(relay_id = %relay_id, state = %state, "Skipping relay not eligible for new work");
                    report.skipped.push(relay_id.clone());
                    continue;
                }
                Err(RelayError::RelayNotFound(_)) => {
                    debug!(relay_id = %relay_id, "Skipping relay unknown to this receiver");
                    report.skipped.push(relay_id.clone());
                    continue;
                }
                Err(e) => return Err(e),
            }

            let archive = self.snapshots.relay_archive(serial, relay_id).await?;
            match self
                .tasks
                .push_config_task_if_absent(relay_id, serial, base64_encode(&archive))
                .await?
            {
                Some(_) => report.created.push(relay_id.clone()),
                None => report.already_pending.push(relay_id.clone()),
            }
        }

        info!(
            created = report.created.len(),
            already_pending = report.already_pending.len(),
            skipped = report.skipped.len(),
            "Configuration activated"
        );
        Ok(report)
    }
}

//! Local relay registry.
//!
//! Durable record of every relay this receiver has registered and the state
//! it was last seen in. State only ever moves forward, one step at a time.

use relayhub_crypto::IssuedCertificate;
use tracing::{info, warn};

use crate::error::RelayError;
use crate::storage::{CertificateParams, DatabaseError, ReceiverDatabase, RelayRow};
use crate::types::{RelayId, RelayState};

/// A relay as known locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relay {
    pub id: RelayId,
    pub alias: String,
    pub state: RelayState,
    pub registered_at: i64,
    pub updated_at: i64,
}

impl TryFrom<RelayRow> for Relay {
    type Error = DatabaseError;

    fn try_from(row: RelayRow) -> Result<Self, Self::Error> {
        let state = row.state.parse().map_err(DatabaseError::Query)?;
        Ok(Self {
            id: RelayId::from(row.id),
            alias: row.alias,
            state,
            registered_at: row.registered_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct RelayRegistry {
    db: ReceiverDatabase,
}

impl RelayRegistry {
    pub const fn new(db: ReceiverDatabase) -> Self {
        Self { db }
    }

    /// Record a new `ACTIVE` relay along with its first certificate.
    ///
    /// Ids are never reused: an id known in any state, `DELETED` included,
    /// yields `AlreadyRegistered`.
    pub async fn register(
        &self,
        id: &RelayId,
        alias: &str,
        certificate: &IssuedCertificate,
    ) -> Result<Relay, RelayError> {
        let params = CertificateParams {
            fingerprint: &certificate.fingerprint,
            serial_number: &certificate.serial_number,
        };
        let row = match self.db.create_relay(id.as_str(), alias, &params).await {
            Ok(row) => row,
            Err(DatabaseError::Conflict(_)) => {
                return Err(RelayError::AlreadyRegistered(id.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        info!(relay_id = %id, alias, fingerprint = %certificate.fingerprint, "Relay registered");
        Ok(Relay::try_from(row)?)
    }

    pub async fn find(&self, id: &RelayId) -> Result<Option<Relay>, RelayError> {
        match self.db.find_relay(id.as_str()).await? {
            Some(row) => Ok(Some(Relay::try_from(row)?)),
            None => Ok(None),
        }
    }

    /// The relay if it is still served locally (`ACTIVE` or
    /// `PENDING_DELETION`); `RelayNotFound` otherwise.
    pub async fn require_operable(&self, id: &RelayId) -> Result<Relay, RelayError> {
        match self.find(id).await? {
            Some(relay) if relay.state.is_operable() => Ok(relay),
            _ => Err(RelayError::RelayNotFound(id.clone())),
        }
    }

    pub async fn list(&self, state: Option<RelayState>) -> Result<Vec<Relay>, RelayError> {
        let rows = self.db.list_relays(state.map(RelayState::as_str)).await?;
        let relays = rows
            .into_iter()
            .map(Relay::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(relays)
    }

    /// Move a relay forward to `target`, stepping through every intermediate
    /// state. A target behind the current state is ignored. Returns the state
    /// the relay ends up in.
    pub async fn advance(&self, id: &RelayId, target: RelayState) -> Result<RelayState, RelayError> {
        let mut current = self
            .find(id)
            .await?
            .ok_or_else(|| RelayError::RelayNotFound(id.clone()))?
            .state;

        if target < current {
            warn!(
                relay_id = %id,
                current = %current,
                target = %target,
                "Ignoring backward relay state transition"
            );
            return Ok(current);
        }

        while current < target {
            let Some(next) = current.successor() else {
                break;
            };
            if self
                .db
                .transition_relay_state(id.as_str(), current.as_str(), next.as_str())
                .await?
            {
                info!(relay_id = %id, from = %current, to = %next, "Relay state changed");
                current = next;
            } else {
                // Another writer moved the relay; continue from where it left it.
                current = self
                    .find(id)
                    .await?
                    .ok_or_else(|| RelayError::RelayNotFound(id.clone()))?
                    .state;
            }
        }

        Ok(current)
    }

    /// Record metadata of a certificate issued to a known relay.
    pub async fn record_certificate(
        &self,
        id: &RelayId,
        certificate: &IssuedCertificate,
    ) -> Result<(), RelayError> {
        let params = CertificateParams {
            fingerprint: &certificate.fingerprint,
            serial_number: &certificate.serial_number,
        };
        self.db.record_certificate(id.as_str(), &params).await?;
        info!(relay_id = %id, fingerprint = %certificate.fingerprint, "Certificate issued");
        Ok(())
    }

    /// Fingerprints of every certificate issued to the relay, oldest first.
    pub async fn certificate_fingerprints(&self, id: &RelayId) -> Result<Vec<String>, RelayError> {
        let certs = self.db.list_certificates(id.as_str()).await?;
        Ok(certs.into_iter().map(|c| c.fingerprint).collect())
    }
}

//! Relay registry queries.
//!
//! State changes are compare-and-swap updates on the previous state, so two
//! writers racing on the same relay cannot both apply a transition.

use relayhub_core::db::unix_timestamp;

use super::db::{DatabaseError, ReceiverDatabase};
use super::models::RelayRow;
use super::queries_certs::CertificateParams;

impl ReceiverDatabase {
    /// Insert a relay in `ACTIVE` state together with the metadata of the
    /// certificate issued for it. Both rows commit or neither does.
    ///
    /// A relay id that already exists (in any state) yields
    /// `DatabaseError::Conflict`.
    pub async fn create_relay(
        &self,
        id: &str,
        alias: &str,
        certificate: &CertificateParams<'_>,
    ) -> Result<RelayRow, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            "INSERT INTO relays (id, alias, state, registered_at, updated_at) VALUES (?, ?, 'ACTIVE', ?, ?)",
        )
        .bind(id)
        .bind(alias)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO issued_certificates (fingerprint, relay_id, serial_number, issued_at) VALUES (?, ?, ?, ?)",
        )
        .bind(certificate.fingerprint)
        .bind(id)
        .bind(certificate.serial_number)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        self.get_relay(id).await
    }

    /// Get a relay by ID.
    pub async fn get_relay(&self, id: &str) -> Result<RelayRow, DatabaseError> {
        self.find_relay(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Relay {id}")))
    }

    /// Get a relay by ID, `None` when it was never registered here.
    pub async fn find_relay(&self, id: &str) -> Result<Option<RelayRow>, DatabaseError> {
        let relay = sqlx::query_as::<_, RelayRow>("SELECT * FROM relays WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(relay)
    }

    /// List relays, optionally restricted to one state.
    pub async fn list_relays(
        &self,
        state_filter: Option<&str>,
    ) -> Result<Vec<RelayRow>, DatabaseError> {
        let relays = if let Some(state) = state_filter {
            sqlx::query_as::<_, RelayRow>(
                "SELECT * FROM relays WHERE state = ? ORDER BY registered_at, id",
            )
            .bind(state)
            .fetch_all(self.pool())
            .await?
        } else {
            sqlx::query_as::<_, RelayRow>("SELECT * FROM relays ORDER BY registered_at, id")
                .fetch_all(self.pool())
                .await?
        };

        Ok(relays)
    }

    /// Move a relay from `from` to `to`. Returns `false` when the relay is
    /// not currently in `from`.
    pub async fn transition_relay_state(
        &self,
        id: &str,
        from: &str,
        to: &str,
    ) -> Result<bool, DatabaseError> {
        let now = unix_timestamp();

        let result =
            sqlx::query("UPDATE relays SET state = ?, updated_at = ? WHERE id = ? AND state = ?")
                .bind(to)
                .bind(now)
                .bind(id)
                .bind(from)
                .execute(self.pool())
                .await?;

        Ok(result.rows_affected() > 0)
    }
}

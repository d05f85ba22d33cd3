//! Issued certificate metadata queries.

use relayhub_core::db::unix_timestamp;

use super::db::{DatabaseError, ReceiverDatabase};
use super::models::IssuedCertificateRow;

/// Parameters for recording an issued certificate.
pub struct CertificateParams<'a> {
    pub fingerprint: &'a str,
    pub serial_number: &'a str,
}

impl ReceiverDatabase {
    /// Record a certificate issued to an already registered relay.
    pub async fn record_certificate(
        &self,
        relay_id: &str,
        params: &CertificateParams<'_>,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO issued_certificates (fingerprint, relay_id, serial_number, issued_at) VALUES (?, ?, ?, ?)",
        )
        .bind(params.fingerprint)
        .bind(relay_id)
        .bind(params.serial_number)
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// All certificates issued to a relay, oldest first.
    pub async fn list_certificates(
        &self,
        relay_id: &str,
    ) -> Result<Vec<IssuedCertificateRow>, DatabaseError> {
        let certs = sqlx::query_as::<_, IssuedCertificateRow>(
            "SELECT * FROM issued_certificates WHERE relay_id = ? ORDER BY issued_at, rowid",
        )
        .bind(relay_id)
        .fetch_all(self.pool())
        .await?;

        Ok(certs)
    }
}

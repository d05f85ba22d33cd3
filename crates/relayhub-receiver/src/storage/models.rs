//! Row models for receiver storage.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct RelayRow {
    pub id: String,
    pub alias: String,
    pub state: String,
    pub registered_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct IssuedCertificateRow {
    pub fingerprint: String,
    pub relay_id: String,
    pub serial_number: String,
    pub issued_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskRow {
    pub seq: i64,
    pub id: String,
    pub relay_id: String,
    /// JSON-encoded `TaskSpec`.
    pub spec: String,
    pub status: String,
    pub result_type: Option<String>,
    pub result_payload: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

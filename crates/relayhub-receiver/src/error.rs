//! Domain error taxonomy of the receiver.
//!
//! Every operation surfaces one of these kinds to its caller; the HTTP layer
//! maps them onto status codes. Skips during activation are not errors and
//! never appear here.

use thiserror::Error;

use crate::activation::SnapshotError;
use crate::certs::IssuerError;
use crate::monitoring::SinkError;
use crate::site::SiteError;
use crate::storage::DatabaseError;
use crate::types::{RelayId, TaskId, TaskStatus};

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay {0} is already registered")]
    AlreadyRegistered(RelayId),

    #[error("relay {0} not found")]
    RelayNotFound(RelayId),

    #[error("relays can only be registered on the primary site")]
    RemoteSite,

    #[error("task {task_id} is {status}, results are only accepted for PENDING tasks")]
    InvalidTaskState { task_id: TaskId, status: TaskStatus },

    #[error("task {task_id} not found for relay {relay_id}")]
    TaskNotFound { relay_id: RelayId, task_id: TaskId },

    #[error("invalid CSR: {0}")]
    CsrInvalid(String),

    #[error("certificate issuer unavailable: {0}")]
    IssuerUnavailable(String),

    #[error("site rejected the supplied credentials")]
    Unauthorized,

    #[error("site relay list unavailable: {0}")]
    SiteUnavailable(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("forwarding monitoring data failed: {0}")]
    Forwarding(String),

    /// The rendered configuration of a relay could not be packed.
    #[error("relay configuration unavailable: {0}")]
    ConfigUnavailable(String),

    #[error(transparent)]
    Storage(#[from] DatabaseError),
}

impl From<SiteError> for RelayError {
    fn from(err: SiteError) -> Self {
        match err {
            SiteError::Unauthorized => Self::Unauthorized,
            SiteError::Unavailable(msg) | SiteError::Malformed(msg) => Self::SiteUnavailable(msg),
        }
    }
}

impl From<IssuerError> for RelayError {
    fn from(err: IssuerError) -> Self {
        match err {
            IssuerError::CsrInvalid(msg) => Self::CsrInvalid(msg),
            IssuerError::Unavailable(msg) => Self::IssuerUnavailable(msg),
        }
    }
}

impl From<SinkError> for RelayError {
    fn from(err: SinkError) -> Self {
        Self::Forwarding(err.to_string())
    }
}

impl From<SnapshotError> for RelayError {
    fn from(err: SnapshotError) -> Self {
        Self::ConfigUnavailable(err.to_string())
    }
}

//! HTTP error mapping for receiver handlers.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, warn};

use crate::activation::SnapshotError;
use crate::error::RelayError;

#[derive(Clone, Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Clone, Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        let message = err.to_string();
        match err {
            RelayError::RelayNotFound(_) => {
                Self::new(StatusCode::NOT_FOUND, "relay_not_found", message)
            }
            RelayError::TaskNotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, "task_not_found", message)
            }
            RelayError::AlreadyRegistered(_) => {
                Self::new(StatusCode::CONFLICT, "already_registered", message)
            }
            RelayError::InvalidTaskState { .. } => {
                Self::new(StatusCode::CONFLICT, "invalid_task_state", message)
            }
            RelayError::CsrInvalid(_) => Self::new(StatusCode::BAD_REQUEST, "csr_invalid", message),
            RelayError::InvalidPayload(_) => {
                Self::new(StatusCode::BAD_REQUEST, "invalid_payload", message)
            }
            RelayError::Unauthorized => Self::unauthorized(message),
            RelayError::RemoteSite => Self::new(StatusCode::FORBIDDEN, "remote_site", message),
            RelayError::IssuerUnavailable(_) => {
                warn!(error = %message, "Certificate issuer unavailable");
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "issuer_unavailable", message)
            }
            RelayError::SiteUnavailable(_) => {
                warn!(error = %message, "Site relay list unavailable");
                Self::new(StatusCode::SERVICE_UNAVAILABLE, "site_unavailable", message)
            }
            RelayError::Forwarding(_) => {
                warn!(error = %message, "Monitoring data forwarding failed");
                Self::new(StatusCode::BAD_GATEWAY, "forwarding_failed", message)
            }
            RelayError::ConfigUnavailable(_) => {
                error!(error = %message, "Cannot pack relay configuration");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "snapshot_unavailable",
                    message,
                )
            }
            RelayError::Storage(_) => {
                error!(error = %message, "Storage failure");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
            }
        }
    }
}

impl From<SnapshotError> for ApiError {
    fn from(err: SnapshotError) -> Self {
        error!(error = %err, "Cannot resolve active configuration");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "snapshot_unavailable",
            err.to_string(),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorEnvelope { error: self.body })).into_response()
    }
}

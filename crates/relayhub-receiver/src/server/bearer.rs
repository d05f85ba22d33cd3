//! Bearer credential extraction for user-facing endpoints.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;

use super::api_error::ApiError;
use crate::auth::UserAuth;

/// Read the caller's `Authorization: Bearer` credential.
///
/// Only presence is checked here; the site decides whether it is valid.
pub fn user_auth(headers: &HeaderMap) -> Result<UserAuth, ApiError> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(UserAuth::from_authorization_header)
        .ok_or_else(|| ApiError::unauthorized("Missing authorization header"))
}

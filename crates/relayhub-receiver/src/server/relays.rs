//! Relay registration, certificate refresh and status endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::AppState;
use super::api_error::ApiError;
use super::bearer::user_auth;
use crate::auth::Auth;
use crate::types::{RelayId, RelayState};

#[derive(Debug, Deserialize)]
pub struct RegisterRelayRequest {
    pub relay_id: RelayId,
    pub alias: String,
    pub csr: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterRelayResponse {
    pub relay_id: RelayId,
    pub client_cert: String,
    pub root_cert: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshCertRequest {
    pub csr: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshCertResponse {
    pub client_cert: String,
    pub root_cert: String,
}

#[derive(Debug, Serialize)]
pub struct RelayStatusResponse {
    pub relay_id: RelayId,
    pub state: RelayState,
}

#[instrument(skip(state, headers, body), fields(relay_id = %body.relay_id))]
pub async fn register_relay(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RegisterRelayRequest>,
) -> Result<Json<RegisterRelayResponse>, ApiError> {
    let auth = user_auth(&headers)?;
    let bundle = state
        .registration
        .register_relay(&auth, &body.relay_id, &body.alias, &body.csr)
        .await?;

    Ok(Json(RegisterRelayResponse {
        relay_id: body.relay_id,
        client_cert: bundle.client_cert,
        root_cert: bundle.root_cert,
    }))
}

#[instrument(skip(state, body))]
pub async fn refresh_cert(
    State(state): State<AppState>,
    Path(relay_id): Path<RelayId>,
    Json(body): Json<RefreshCertRequest>,
) -> Result<Json<RefreshCertResponse>, ApiError> {
    let bundle = state.registration.refresh_cert(&relay_id, &body.csr).await?;
    Ok(Json(RefreshCertResponse {
        client_cert: bundle.client_cert,
        root_cert: bundle.root_cert,
    }))
}

#[instrument(skip(state))]
pub async fn get_status(
    State(state): State<AppState>,
    Path(relay_id): Path<RelayId>,
) -> Result<Json<RelayStatusResponse>, ApiError> {
    let relay_state = state
        .lifecycle
        .get_relay_state(&Auth::Internal, &relay_id)
        .await?;
    Ok(Json(RelayStatusResponse {
        relay_id,
        state: relay_state,
    }))
}

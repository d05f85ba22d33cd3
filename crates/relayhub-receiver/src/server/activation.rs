//! Configuration activation endpoint.

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use tracing::instrument;

use super::AppState;
use super::api_error::ApiError;
use super::bearer::user_auth;
use crate::activation::ActivationReport;
use crate::auth::Auth;

/// Hand out config tasks for the currently active snapshot.
#[instrument(skip(state, headers))]
pub async fn activate_config(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ActivationReport>, ApiError> {
    let auth = user_auth(&headers)?;
    state.lifecycle.authenticate(&auth).await?;

    let snapshot = state.snapshots.resolve().await?;
    let report = state
        .coordinator
        .activate(&Auth::User(auth), &snapshot.serial, &snapshot.relays)
        .await?;
    Ok(Json(report))
}

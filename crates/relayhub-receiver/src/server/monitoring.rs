//! Monitoring data ingestion endpoint.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::instrument;

use super::AppState;
use super::api_error::ApiError;
use crate::monitoring::MonitoringData;
use crate::types::RelayId;

#[instrument(skip(state, data), fields(host = %data.host, service = %data.service))]
pub async fn forward_monitoring_data(
    State(state): State<AppState>,
    Path(relay_id): Path<RelayId>,
    Json(data): Json<MonitoringData>,
) -> Result<StatusCode, ApiError> {
    state.forwarder.forward(&relay_id, data).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Task polling, ad-hoc dispatch and result submission endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::AppState;
use super::api_error::ApiError;
use super::bearer::user_auth;
use crate::types::{RelayId, ResultType, Task, TaskId, TaskSpec, TaskStatus};

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<Task>,
}

#[derive(Debug, Deserialize)]
pub struct FetchAdHocRequest {
    pub payload: String,
}

#[derive(Debug, Deserialize)]
pub struct TaskResultRequest {
    pub result_type: ResultType,
    pub result_payload: String,
}

#[instrument(skip(state, query))]
pub async fn get_tasks(
    State(state): State<AppState>,
    Path(relay_id): Path<RelayId>,
    Query(query): Query<TaskListQuery>,
) -> Result<Json<TaskListResponse>, ApiError> {
    let tasks = state.tasks.get_tasks(&relay_id, query.status).await?;
    Ok(Json(TaskListResponse { tasks }))
}

#[instrument(skip(state, headers, body))]
pub async fn push_task(
    State(state): State<AppState>,
    Path(relay_id): Path<RelayId>,
    headers: HeaderMap,
    Json(body): Json<FetchAdHocRequest>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let auth = user_auth(&headers)?;
    state.lifecycle.authenticate(&auth).await?;

    let task = state
        .tasks
        .push_task(
            &relay_id,
            TaskSpec::FetchAdHoc {
                payload: body.payload,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

#[instrument(skip(state, body), fields(result_type = ?body.result_type))]
pub async fn update_task(
    State(state): State<AppState>,
    Path((relay_id, task_id)): Path<(RelayId, TaskId)>,
    Json(body): Json<TaskResultRequest>,
) -> Result<Json<Task>, ApiError> {
    let task = state
        .tasks
        .update_task(&relay_id, &task_id, body.result_type, &body.result_payload)
        .await?;
    Ok(Json(task))
}

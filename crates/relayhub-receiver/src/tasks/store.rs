//! Durable per-relay task log.

use tracing::{debug, info};

use crate::error::RelayError;
use crate::registry::RelayRegistry;
use crate::storage::{DatabaseError, NewTask, ReceiverDatabase, TaskRow};
use crate::types::{RelayId, ResultType, Serial, Task, TaskId, TaskSpec, TaskStatus};

use super::locks::RelayLocks;

impl TryFrom<TaskRow> for Task {
    type Error = DatabaseError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let spec: TaskSpec = serde_json::from_str(&row.spec)
            .map_err(|e| DatabaseError::Query(format!("task {} has a corrupt spec: {e}", row.id)))?;
        let status = row.status.parse().map_err(DatabaseError::Query)?;
        let result_type = row
            .result_type
            .as_deref()
            .map(str::parse::<ResultType>)
            .transpose()
            .map_err(DatabaseError::Query)?;

        Ok(Self {
            id: TaskId::from(row.id),
            relay_id: RelayId::from(row.relay_id),
            spec,
            status,
            result_type,
            result_payload: row.result_payload,
            creation_timestamp: row.created_at,
            update_timestamp: row.updated_at,
        })
    }
}

/// Task store for all relays.
///
/// Every operation requires the relay to be known locally and not deleted.
/// Relays in `PENDING_DELETION` keep full access to their tasks.
#[derive(Clone)]
pub struct TaskStore {
    db: ReceiverDatabase,
    registry: RelayRegistry,
    locks: RelayLocks,
}

impl TaskStore {
    pub fn new(db: ReceiverDatabase, registry: RelayRegistry) -> Self {
        Self {
            db,
            registry,
            locks: RelayLocks::new(),
        }
    }

    async fn insert(&self, relay_id: &RelayId, spec: &TaskSpec) -> Result<Task, RelayError> {
        let spec_json =
            serde_json::to_string(spec).map_err(|e| DatabaseError::Query(e.to_string()))?;
        let id = TaskId::generate();
        let row = self
            .db
            .insert_task(&NewTask {
                id: id.as_str(),
                relay_id: relay_id.as_str(),
                spec_json: &spec_json,
            })
            .await?;

        let task = Task::try_from(row)?;
        info!(relay_id = %relay_id, task_id = %task.id, "Task created");
        Ok(task)
    }

    /// Append a pending task for `relay_id`.
    pub async fn push_task(&self, relay_id: &RelayId, spec: TaskSpec) -> Result<Task, RelayError> {
        self.registry.require_operable(relay_id).await?;
        self.insert(relay_id, &spec).await
    }

    /// A relay's tasks in creation order, optionally only those in `status`.
    pub async fn get_tasks(
        &self,
        relay_id: &RelayId,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Task>, RelayError> {
        self.registry.require_operable(relay_id).await?;
        let rows = self
            .db
            .list_tasks(relay_id.as_str(), status.map(TaskStatus::as_str))
            .await?;
        let tasks = rows
            .into_iter()
            .map(Task::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Store a relay's result on one of its pending tasks.
    ///
    /// Accepted exactly once per task; a task that is already terminal
    /// yields `InvalidTaskState`.
    pub async fn update_task(
        &self,
        relay_id: &RelayId,
        task_id: &TaskId,
        result_type: ResultType,
        result_payload: &str,
    ) -> Result<Task, RelayError> {
        self.registry.require_operable(relay_id).await?;

        let status = result_type.terminal_status();
        let updated = self
            .db
            .complete_task(
                relay_id.as_str(),
                task_id.as_str(),
                status.as_str(),
                result_type.as_str(),
                result_payload,
            )
            .await?;

        let task = match self.db.get_task(relay_id.as_str(), task_id.as_str()).await {
            Ok(row) => Task::try_from(row)?,
            Err(DatabaseError::NotFound(_)) => {
                return Err(RelayError::TaskNotFound {
                    relay_id: relay_id.clone(),
                    task_id: task_id.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if !updated {
            return Err(RelayError::InvalidTaskState {
                task_id: task_id.clone(),
                status: task.status,
            });
        }

        info!(relay_id = %relay_id, task_id = %task_id, status = %status, "Task completed");
        Ok(task)
    }

    /// Create a `RelayConfig` task for `serial` carrying `tar_data` unless
    /// the relay already has a pending one for exactly that serial. Returns
    /// the new task, if any. Only the serial decides, not the archive.
    ///
    /// The check and the insert run under the relay's lock, so concurrent
    /// activations of the same serial create at most one pending task.
    pub async fn push_config_task_if_absent(
        &self,
        relay_id: &RelayId,
        serial: &Serial,
        tar_data: String,
    ) -> Result<Option<Task>, RelayError> {
        let _guard = self.locks.lock(relay_id).await;

        let pending = self.get_tasks(relay_id, Some(TaskStatus::Pending)).await?;
        if pending.iter().any(|t| t.spec.covers_serial(serial)) {
            debug!(relay_id = %relay_id, serial = %serial, "Config task already pending");
            return Ok(None);
        }

        let spec = TaskSpec::RelayConfig {
            serial: serial.clone(),
            tar_data,
        };
        self.insert(relay_id, &spec).await.map(Some)
    }
}

//! Task log queries.
//!
//! Tasks are append-only; the only mutation is the single transition of a
//! pending task to its terminal status.

use relayhub_core::db::unix_timestamp;

use super::db::{DatabaseError, ReceiverDatabase};
use super::models::TaskRow;

/// Parameters for appending a task.
pub struct NewTask<'a> {
    pub id: &'a str,
    pub relay_id: &'a str,
    pub spec_json: &'a str,
}

impl ReceiverDatabase {
    /// Append a pending task.
    pub async fn insert_task(&self, task: &NewTask<'_>) -> Result<TaskRow, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO tasks (id, relay_id, spec, status, created_at, updated_at) VALUES (?, ?, ?, 'PENDING', ?, ?)",
        )
        .bind(task.id)
        .bind(task.relay_id)
        .bind(task.spec_json)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_task(task.relay_id, task.id).await
    }

    /// Get a task owned by `relay_id`.
    pub async fn get_task(&self, relay_id: &str, id: &str) -> Result<TaskRow, DatabaseError> {
        sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE relay_id = ? AND id = ?")
            .bind(relay_id)
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Task {id} of relay {relay_id}")))
    }

    /// List a relay's tasks in creation order, optionally by status.
    pub async fn list_tasks(
        &self,
        relay_id: &str,
        status_filter: Option<&str>,
    ) -> Result<Vec<TaskRow>, DatabaseError> {
        let tasks = if let Some(status) = status_filter {
            sqlx::query_as::<_, TaskRow>(
                "SELECT * FROM tasks WHERE relay_id = ? AND status = ? ORDER BY seq",
            )
            .bind(relay_id)
            .bind(status)
            .fetch_all(self.pool())
            .await?
        } else {
            sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE relay_id = ? ORDER BY seq")
                .bind(relay_id)
                .fetch_all(self.pool())
                .await?
        };

        Ok(tasks)
    }

    /// Store a relay's result on a pending task. Returns `false` if the task
    /// is no longer pending (or does not exist).
    pub async fn complete_task(
        &self,
        relay_id: &str,
        id: &str,
        status: &str,
        result_type: &str,
        result_payload: &str,
    ) -> Result<bool, DatabaseError> {
        let now = unix_timestamp();

        let result = sqlx::query(
            "UPDATE tasks SET status = ?, result_type = ?, result_payload = ?, updated_at = ? WHERE relay_id = ? AND id = ? AND status = 'PENDING'",
        )
        .bind(status)
        .bind(result_type)
        .bind(result_payload)
        .bind(now)
        .bind(relay_id)
        .bind(id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

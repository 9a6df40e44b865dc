//! Scrape task lifecycle.

use crate::error::DatabaseError;
use crate::types::{TaskId, TaskKind, TaskStatus};
use crate::{Error, Result};

use super::{Database, Task};

impl Database {
    /// Open a `running` task for one account
    pub async fn create_task(&self, account_name: &str, kind: TaskKind, pages: u32) -> Result<TaskId> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            INSERT INTO tasks (account_name, type, pages, status, create_time)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(account_name)
        .bind(kind.as_str())
        .bind(pages as i64)
        .bind(TaskStatus::Running.as_str())
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to create task: {}",
                e
            )))
        })?;

        Ok(TaskId(result.last_insert_rowid()))
    }

    /// Overwrite a task's counters
    pub async fn update_task_progress(
        &self,
        id: TaskId,
        total_articles: i64,
        downloaded_count: i64,
        failed_count: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE tasks
            SET total_articles = ?, downloaded_count = ?, failed_count = ?
            WHERE id = ?
            "#,
        )
        .bind(total_articles)
        .bind(downloaded_count)
        .bind(failed_count)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to update task progress: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Finalize a task
    ///
    /// Only a `running` task can be finalized; later calls leave the first
    /// terminal status in place. Returns whether this call finalized it.
    pub async fn complete_task(
        &self,
        id: TaskId,
        status: TaskStatus,
        error_message: Option<&str>,
    ) -> Result<bool> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = ?, end_time = ?, error_message = ?
            WHERE id = ? AND status = 'running'
            "#,
        )
        .bind(status.as_str())
        .bind(now)
        .bind(error_message)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to complete task: {}",
                e
            )))
        })?;

        Ok(result.rows_affected() > 0)
    }

    /// Get a task by id
    pub async fn get_task(&self, id: TaskId) -> Result<Option<Task>> {
        let task = sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to get task: {}",
                    e
                )))
            })?;

        Ok(task)
    }

    /// Most recent tasks first
    pub async fn list_tasks(&self, limit: i64) -> Result<Vec<Task>> {
        let tasks = sqlx::query_as::<_, Task>("SELECT * FROM tasks ORDER BY id DESC LIMIT ?")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to list tasks: {}",
                    e
                )))
            })?;

        Ok(tasks)
    }
}

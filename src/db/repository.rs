use chrono::{SecondsFormat, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Task, TaskDraft, TaskPatch};

#[derive(Debug, FromRow)]
struct TaskRow {
    id: String,
    text: String,
    is_completed: bool,
    priority: String,
    platform: String,
}

impl TryFrom<TaskRow> for Task {
    type Error = AppError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: row.id,
            text: row.text,
            is_completed: row.is_completed,
            priority: row.priority.parse()?,
            platform: row.platform,
        })
    }
}

fn timestamp() -> String {
    // fixed width keeps lexical order equal to time order
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub async fn fetch_tasks(db: &SqlitePool) -> Result<Vec<Task>, AppError> {
    let rows = sqlx::query_as::<_, TaskRow>(
        r#"
        SELECT id, text, is_completed, priority, platform
        FROM tasks
        ORDER BY created_at DESC, rowid DESC
        "#,
    )
    .fetch_all(db)
    .await?;

    rows.into_iter().map(Task::try_from).collect()
}

pub async fn fetch_task(db: &SqlitePool, id: &str) -> Result<Option<Task>, AppError> {
    let row = sqlx::query_as::<_, TaskRow>(
        "SELECT id, text, is_completed, priority, platform FROM tasks WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(db)
    .await?;

    row.map(Task::try_from).transpose()
}

pub async fn insert_task(db: &SqlitePool, draft: TaskDraft) -> Result<Task, AppError> {
    let text = draft.text.trim().to_string();
    if text.is_empty() {
        return Err(AppError::BadRequest("text must not be empty".to_string()));
    }

    let id = Uuid::new_v4().to_string();
    let now = timestamp();

    sqlx::query(
        r#"
        INSERT INTO tasks (id, text, is_completed, priority, platform, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
        "#,
    )
    .bind(&id)
    .bind(&text)
    .bind(draft.is_completed)
    .bind(draft.priority.as_str())
    .bind(&draft.platform)
    .bind(&now)
    .execute(db)
    .await?;

    Ok(Task {
        id,
        text,
        is_completed: draft.is_completed,
        priority: draft.priority,
        platform: draft.platform,
    })
}

/// Applies the fields present in `patch`; `None` when the task does not exist.
pub async fn update_task(
    db: &SqlitePool,
    id: &str,
    patch: TaskPatch,
) -> Result<Option<Task>, AppError> {
    let Some(mut task) = fetch_task(db, id).await? else {
        return Ok(None);
    };

    if let Some(text) = patch.text {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(AppError::BadRequest("text must not be empty".to_string()));
        }
        task.text = text;
    }
    if let Some(is_completed) = patch.is_completed {
        task.is_completed = is_completed;
    }
    if let Some(priority) = patch.priority {
        task.priority = priority;
    }

    let now = timestamp();
    sqlx::query(
        "UPDATE tasks SET text = ?1, is_completed = ?2, priority = ?3, updated_at = ?4 WHERE id = ?5",
    )
    .bind(&task.text)
    .bind(task.is_completed)
    .bind(task.priority.as_str())
    .bind(&now)
    .bind(id)
    .execute(db)
    .await?;

    Ok(Some(task))
}

pub async fn delete_task(db: &SqlitePool, id: &str) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;

    Ok(result.rows_affected() > 0)
}

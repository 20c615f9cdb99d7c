use sqlx::SqlitePool;

use crate::errors::{AppError, AppResult};
use crate::models::page::{Page, PageRequest};
use crate::models::task::{DbTask, Task, TaskData};
use crate::utils::utc_now;

const ENTITY: &str = "Task";

pub async fn paginate(pool: &SqlitePool, request: PageRequest) -> AppResult<Page<Task>> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM tasks WHERE deleted_at IS NULL")
        .fetch_one(pool)
        .await?;

    let rows = sqlx::query_as::<_, DbTask>(
        "SELECT id, title, description, user_id, client_id, project_id, deadline, status, created_at, updated_at, deleted_at FROM tasks WHERE deleted_at IS NULL ORDER BY id ASC LIMIT ? OFFSET ?",
    )
    .bind(request.per_page)
    .bind(request.offset())
    .fetch_all(pool)
    .await?;

    let tasks = rows
        .into_iter()
        .map(Task::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page::new(tasks, request, total))
}

pub async fn find(pool: &SqlitePool, id: i64) -> AppResult<Option<DbTask>> {
    let task = sqlx::query_as::<_, DbTask>(
        "SELECT id, title, description, user_id, client_id, project_id, deadline, status, created_at, updated_at, deleted_at FROM tasks WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(task)
}

pub async fn load(pool: &SqlitePool, id: i64) -> AppResult<Task> {
    find(pool, id)
        .await?
        .ok_or_else(|| AppError::record_not_found(ENTITY, id))?
        .try_into()
}

pub async fn create(pool: &SqlitePool, data: &TaskData) -> AppResult<i64> {
    let now = utc_now();
    let result = sqlx::query(
        "INSERT INTO tasks (title, description, user_id, client_id, project_id, deadline, status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&data.title)
    .bind(&data.description)
    .bind(data.user_id)
    .bind(data.client_id)
    .bind(data.project_id)
    .bind(data.deadline)
    .bind(data.status.as_str())
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(pool: &SqlitePool, id: i64, data: &TaskData) -> AppResult<()> {
    let affected = sqlx::query(
        "UPDATE tasks SET title = ?, description = ?, user_id = ?, client_id = ?, project_id = ?, deadline = ?, status = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(&data.title)
    .bind(&data.description)
    .bind(data.user_id)
    .bind(data.client_id)
    .bind(data.project_id)
    .bind(data.deadline)
    .bind(data.status.as_str())
    .bind(utc_now())
    .bind(id)
    .execute(pool)
    .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::record_not_found(ENTITY, id));
    }
    Ok(())
}

pub async fn soft_delete(pool: &SqlitePool, id: i64) -> AppResult<()> {
    let now = utc_now();
    let affected = sqlx::query("UPDATE tasks SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL")
        .bind(now)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::record_not_found(ENTITY, id));
    }
    Ok(())
}

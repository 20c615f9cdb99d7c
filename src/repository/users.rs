use sqlx::{SqliteConnection, SqlitePool};

use crate::authz::Actor;
use crate::errors::{AppError, AppResult};
use crate::models::page::{Page, PageRequest};
use crate::models::user::{DbUser, NewUser, User, UserUpdate};
use crate::utils::utc_now;
use crate::validation::FieldErrors;

const ENTITY: &str = "User";

/// Roles attached and detached by a [`sync_roles`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleChanges {
    pub attached: Vec<String>,
    pub detached: Vec<String>,
}

pub async fn paginate(pool: &SqlitePool, request: PageRequest) -> AppResult<Page<User>> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE deleted_at IS NULL")
        .fetch_one(pool)
        .await?;

    let rows = sqlx::query_as::<_, DbUser>(
        "SELECT id, name, email, password_hash, created_at, updated_at, deleted_at FROM users WHERE deleted_at IS NULL ORDER BY id ASC LIMIT ? OFFSET ?",
    )
    .bind(request.per_page)
    .bind(request.offset())
    .fetch_all(pool)
    .await?;

    let mut users = Vec::with_capacity(rows.len());
    for row in rows {
        let roles = role_names(pool, row.id).await?;
        users.push(row.into_user(roles));
    }

    Ok(Page::new(users, request, total))
}

pub async fn find(pool: &SqlitePool, id: i64) -> AppResult<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(
        "SELECT id, name, email, password_hash, created_at, updated_at, deleted_at FROM users WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Lookup by id that also resolves soft-deleted users.
pub async fn find_with_trashed(pool: &SqlitePool, id: i64) -> AppResult<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(
        "SELECT id, name, email, password_hash, created_at, updated_at, deleted_at FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<DbUser>> {
    let user = sqlx::query_as::<_, DbUser>(
        "SELECT id, name, email, password_hash, created_at, updated_at, deleted_at FROM users WHERE email = ? AND deleted_at IS NULL",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

pub async fn email_taken(pool: &SqlitePool, email: &str) -> AppResult<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM users WHERE email = ? AND deleted_at IS NULL")
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

pub async fn role_names(pool: &SqlitePool, user_id: i64) -> AppResult<Vec<String>> {
    let roles = sqlx::query_scalar(
        "SELECT r.name FROM user_roles ur INNER JOIN roles r ON r.id = ur.role_id WHERE ur.user_id = ? ORDER BY r.id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    Ok(roles)
}

/// Non-deleted user with roles, or `RecordNotFound`.
pub async fn load(pool: &SqlitePool, id: i64) -> AppResult<User> {
    let row = find(pool, id)
        .await?
        .ok_or_else(|| AppError::record_not_found(ENTITY, id))?;
    let roles = role_names(pool, id).await?;
    Ok(row.into_user(roles))
}

pub async fn load_with_trashed(pool: &SqlitePool, id: i64) -> AppResult<User> {
    let row = find_with_trashed(pool, id)
        .await?
        .ok_or_else(|| AppError::record_not_found(ENTITY, id))?;
    let roles = role_names(pool, id).await?;
    Ok(row.into_user(roles))
}

/// Resolve the acting identity for a token subject. Deleted users resolve to `None`.
pub async fn load_actor(pool: &SqlitePool, id: i64) -> AppResult<Option<Actor>> {
    let Some(row) = find(pool, id).await? else {
        return Ok(None);
    };
    let roles = role_names(pool, id).await?;

    Ok(Some(Actor::new(row.id).with_roles(roles)))
}

pub async fn create(pool: &SqlitePool, new_user: &NewUser) -> AppResult<i64> {
    let now = utc_now();
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "INSERT INTO users (name, email, password_hash, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&new_user.name)
    .bind(&new_user.email)
    .bind(&new_user.password_hash)
    .bind(now)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(email_conflict)?;

    let id = result.last_insert_rowid();
    sync_roles(&mut tx, id, &[new_user.role.as_str()]).await?;
    tx.commit().await?;

    Ok(id)
}

/// Update the name and replace the role set with exactly the submitted role.
pub async fn update_profile(pool: &SqlitePool, id: i64, update: &UserUpdate) -> AppResult<RoleChanges> {
    let mut tx = pool.begin().await?;

    let affected = sqlx::query("UPDATE users SET name = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL")
        .bind(&update.name)
        .bind(utc_now())
        .bind(id)
        .execute(&mut *tx)
        .await?;

    if affected.rows_affected() == 0 {
        return Err(AppError::record_not_found(ENTITY, id));
    }

    let changes = sync_roles(&mut tx, id, &[update.role.as_str()]).await?;
    tx.commit().await?;

    Ok(changes)
}

/// Make the user's role set equal to `roles`: attach missing ones, detach the rest.
pub async fn sync_roles(conn: &mut SqliteConnection, user_id: i64, roles: &[&str]) -> AppResult<RoleChanges> {
    let current: Vec<String> = sqlx::query_scalar(
        "SELECT r.name FROM user_roles ur INNER JOIN roles r ON r.id = ur.role_id WHERE ur.user_id = ?",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut changes = RoleChanges::default();

    for held in &current {
        if roles.contains(&held.as_str()) {
            continue;
        }
        sqlx::query("DELETE FROM user_roles WHERE user_id = ? AND role_id = (SELECT id FROM roles WHERE name = ?)")
            .bind(user_id)
            .bind(held)
            .execute(&mut *conn)
            .await?;
        changes.detached.push(held.clone());
    }

    for &wanted in roles {
        if current.iter().any(|held| held == wanted) || changes.attached.iter().any(|a| a == wanted) {
            continue;
        }

        let role_id: Option<i64> = sqlx::query_scalar("SELECT id FROM roles WHERE name = ?")
            .bind(wanted)
            .fetch_optional(&mut *conn)
            .await?;
        let role_id = role_id.ok_or_else(|| {
            let mut errors = FieldErrors::new();
            errors.add("role", "The selected role is invalid.");
            AppError::Validation(errors)
        })?;

        sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(role_id)
            .execute(&mut *conn)
            .await?;
        changes.attached.push(wanted.to_string());
    }

    Ok(changes)
}

pub async fn soft_delete(pool: &SqlitePool, id: i64) -> AppResult<()> {
    let now = utc_now();
    let affected = sqlx::query("UPDATE users SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL")
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

fn email_conflict(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let mut errors = FieldErrors::new();
            errors.add("email", "The email has already been taken.");
            return AppError::Validation(errors);
        }
    }
    AppError::Database(err)
}

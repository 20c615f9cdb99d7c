use sqlx::SqlitePool;

use crate::errors::{AppError, AppResult};
use crate::models::client::{Client, ClientData};
use crate::models::page::{Page, PageRequest};
use crate::utils::utc_now;

const ENTITY: &str = "Client";

pub async fn paginate(pool: &SqlitePool, request: PageRequest) -> AppResult<Page<Client>> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM clients WHERE deleted_at IS NULL")
        .fetch_one(pool)
        .await?;

    let clients = sqlx::query_as::<_, Client>(
        "SELECT id, contact_name, contact_email, contact_phone, company_name, company_vat, created_at, updated_at, deleted_at FROM clients WHERE deleted_at IS NULL ORDER BY id ASC LIMIT ? OFFSET ?",
    )
    .bind(request.per_page)
    .bind(request.offset())
    .fetch_all(pool)
    .await?;

    Ok(Page::new(clients, request, total))
}

pub async fn find(pool: &SqlitePool, id: i64) -> AppResult<Option<Client>> {
    let client = sqlx::query_as::<_, Client>(
        "SELECT id, contact_name, contact_email, contact_phone, company_name, company_vat, created_at, updated_at, deleted_at FROM clients WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(client)
}

pub async fn load(pool: &SqlitePool, id: i64) -> AppResult<Client> {
    find(pool, id)
        .await?
        .ok_or_else(|| AppError::record_not_found(ENTITY, id))
}

pub async fn exists(pool: &SqlitePool, id: i64) -> AppResult<bool> {
    Ok(find(pool, id).await?.is_some())
}

pub async fn create(pool: &SqlitePool, data: &ClientData) -> AppResult<i64> {
    let now = utc_now();
    let result = sqlx::query(
        "INSERT INTO clients (contact_name, contact_email, contact_phone, company_name, company_vat, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&data.contact_name)
    .bind(&data.contact_email)
    .bind(&data.contact_phone)
    .bind(&data.company_name)
    .bind(&data.company_vat)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(pool: &SqlitePool, id: i64, data: &ClientData) -> AppResult<()> {
    let affected = sqlx::query(
        "UPDATE clients SET contact_name = ?, contact_email = ?, contact_phone = ?, company_name = ?, company_vat = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(&data.contact_name)
    .bind(&data.contact_email)
    .bind(&data.contact_phone)
    .bind(&data.company_name)
    .bind(&data.company_vat)
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
    let affected = sqlx::query("UPDATE clients SET deleted_at = ?, updated_at = ? WHERE id = ? AND deleted_at IS NULL")
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

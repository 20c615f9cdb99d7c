use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use utoipa::ToSchema;
use validator::Validate;

use crate::authz::Permission;
use crate::errors::{AppError, AppResult};
use crate::models::status::WorkStatus;
use crate::repository;
use crate::validation::{
    lenient_integer, normalize, required, validate_date, validate_status, FieldErrors, RecordInput,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Project {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub user_id: i64,
    pub client_id: i64,
    pub deadline: NaiveDate,
    pub status: WorkStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl crate::events::Loggable for Project {
    fn entity_type() -> &'static str { "project" }
    fn subject_id(&self) -> i64 { self.id }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbProject {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub user_id: i64,
    pub client_id: i64,
    pub deadline: NaiveDate,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<DbProject> for Project {
    type Error = AppError;

    fn try_from(value: DbProject) -> Result<Self, Self::Error> {
        Ok(Project {
            id: value.id,
            title: value.title,
            description: value.description,
            user_id: value.user_id,
            client_id: value.client_id,
            deadline: value.deadline,
            status: value.status.parse::<WorkStatus>().map_err(AppError::internal)?,
            created_at: value.created_at,
            updated_at: value.updated_at,
            deleted_at: value.deleted_at,
        })
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ProjectRequest {
    #[schema(example = "Website relaunch")]
    #[validate(
        required(message = "The title field is required."),
        length(max = 255, message = "The title field must not be greater than 255 characters.")
    )]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(required(message = "The user id field is required."))]
    #[serde(default, deserialize_with = "lenient_integer")]
    pub user_id: Option<i64>,
    #[validate(required(message = "The client id field is required."))]
    #[serde(default, deserialize_with = "lenient_integer")]
    pub client_id: Option<i64>,
    #[schema(example = "2025-12-31")]
    #[validate(
        required(message = "The deadline field is required."),
        custom(function = "validate_date", message = "The deadline field must be a valid date.")
    )]
    pub deadline: Option<String>,
    #[schema(example = "open")]
    #[validate(
        required(message = "The status field is required."),
        custom(function = "validate_status", message = "The selected status is invalid.")
    )]
    pub status: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProjectData {
    pub title: String,
    pub description: Option<String>,
    pub user_id: i64,
    pub client_id: i64,
    pub deadline: NaiveDate,
    pub status: WorkStatus,
}

#[async_trait]
impl RecordInput for ProjectRequest {
    const CREATE: Permission = Permission::CreateProjects;
    const EDIT: Permission = Permission::EditProjects;

    type Validated = ProjectData;

    fn normalize(&mut self) {
        normalize(&mut self.title);
        normalize(&mut self.description);
        normalize(&mut self.deadline);
        normalize(&mut self.status);
    }

    async fn check(&self, pool: &SqlitePool, errors: &mut FieldErrors) -> AppResult<()> {
        check_assignment(pool, self.user_id, self.client_id, errors).await
    }

    fn into_validated(self) -> Result<Self::Validated, FieldErrors> {
        let (deadline, status) = parse_schedule(self.deadline, self.status)?;
        Ok(ProjectData {
            title: required(self.title, "title")?,
            description: self.description,
            user_id: required(self.user_id, "user_id")?,
            client_id: required(self.client_id, "client_id")?,
            deadline,
            status,
        })
    }
}

/// Existence rules shared by project and task forms.
pub(crate) async fn check_assignment(
    pool: &SqlitePool,
    user_id: Option<i64>,
    client_id: Option<i64>,
    errors: &mut FieldErrors,
) -> AppResult<()> {
    if let Some(user_id) = user_id {
        if repository::users::find(pool, user_id).await?.is_none() {
            errors.add("user_id", "The selected user id is invalid.");
        }
    }
    if let Some(client_id) = client_id {
        if !repository::clients::exists(pool, client_id).await? {
            errors.add("client_id", "The selected client id is invalid.");
        }
    }
    Ok(())
}

pub(crate) fn parse_schedule(
    deadline: Option<String>,
    status: Option<String>,
) -> Result<(NaiveDate, WorkStatus), FieldErrors> {
    let mut errors = FieldErrors::new();

    let deadline = required(deadline, "deadline")?;
    let deadline = NaiveDate::parse_from_str(&deadline, "%Y-%m-%d").ok();
    if deadline.is_none() {
        errors.add("deadline", "The deadline field must be a valid date.");
    }

    let status = required(status, "status")?.parse::<WorkStatus>().ok();
    if status.is_none() {
        errors.add("status", "The selected status is invalid.");
    }

    match (deadline, status) {
        (Some(deadline), Some(status)) => Ok((deadline, status)),
        _ => Err(errors),
    }
}

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use utoipa::ToSchema;
use validator::Validate;

use crate::authz::Permission;
use crate::errors::{AppError, AppResult};
use crate::models::project::{check_assignment, parse_schedule};
use crate::models::status::WorkStatus;
use crate::repository;
use crate::validation::{
    lenient_integer, normalize, required, validate_date, validate_status, FieldErrors, RecordInput,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub user_id: i64,
    pub client_id: i64,
    pub project_id: i64,
    pub deadline: NaiveDate,
    pub status: WorkStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl crate::events::Loggable for Task {
    fn entity_type() -> &'static str { "task" }
    fn subject_id(&self) -> i64 { self.id }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbTask {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub user_id: i64,
    pub client_id: i64,
    pub project_id: i64,
    pub deadline: NaiveDate,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<DbTask> for Task {
    type Error = AppError;

    fn try_from(value: DbTask) -> Result<Self, Self::Error> {
        Ok(Task {
            id: value.id,
            title: value.title,
            description: value.description,
            user_id: value.user_id,
            client_id: value.client_id,
            project_id: value.project_id,
            deadline: value.deadline,
            status: value.status.parse::<WorkStatus>().map_err(AppError::internal)?,
            created_at: value.created_at,
            updated_at: value.updated_at,
            deleted_at: value.deleted_at,
        })
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct TaskRequest {
    #[schema(example = "Draft wireframes")]
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
    #[validate(required(message = "The project id field is required."))]
    #[serde(default, deserialize_with = "lenient_integer")]
    pub project_id: Option<i64>,
    #[schema(example = "2025-11-15")]
    #[validate(
        required(message = "The deadline field is required."),
        custom(function = "validate_date", message = "The deadline field must be a valid date.")
    )]
    pub deadline: Option<String>,
    #[schema(example = "in_progress")]
    #[validate(
        required(message = "The status field is required."),
        custom(function = "validate_status", message = "The selected status is invalid.")
    )]
    pub status: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TaskData {
    pub title: String,
    pub description: Option<String>,
    pub user_id: i64,
    pub client_id: i64,
    pub project_id: i64,
    pub deadline: NaiveDate,
    pub status: WorkStatus,
}

#[async_trait]
impl RecordInput for TaskRequest {
    const CREATE: Permission = Permission::CreateTasks;
    const EDIT: Permission = Permission::EditTasks;

    type Validated = TaskData;

    fn normalize(&mut self) {
        normalize(&mut self.title);
        normalize(&mut self.description);
        normalize(&mut self.deadline);
        normalize(&mut self.status);
    }

    async fn check(&self, pool: &SqlitePool, errors: &mut FieldErrors) -> AppResult<()> {
        check_assignment(pool, self.user_id, self.client_id, errors).await?;
        if let Some(project_id) = self.project_id {
            if !repository::projects::exists(pool, project_id).await? {
                errors.add("project_id", "The selected project id is invalid.");
            }
        }
        Ok(())
    }

    fn into_validated(self) -> Result<Self::Validated, FieldErrors> {
        let (deadline, status) = parse_schedule(self.deadline, self.status)?;
        Ok(TaskData {
            title: required(self.title, "title")?,
            description: self.description,
            user_id: required(self.user_id, "user_id")?,
            client_id: required(self.client_id, "client_id")?,
            project_id: required(self.project_id, "project_id")?,
            deadline,
            status,
        })
    }
}

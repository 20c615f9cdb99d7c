use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use utoipa::ToSchema;
use validator::Validate;

use crate::authz::{roles, Permission};
use crate::errors::AppResult;
use crate::models::rbac::Role;
use crate::repository;
use crate::validation::{normalize, required, FieldErrors, FormRequest};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub roles: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

impl crate::events::Loggable for User {
    fn entity_type() -> &'static str { "user" }
    fn subject_id(&self) -> i64 { self.id }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl DbUser {
    pub fn into_user(self, roles: Vec<String>) -> User {
        User {
            id: self.id,
            name: self.name,
            email: self.email,
            roles,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        }
    }
}

/// A user ready to be inserted; the password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
}

/// Data the edit form is rendered from.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserEditForm {
    pub user: User,
    pub roles: Vec<Role>,
    /// The form assumes exactly one selected role.
    pub selected_role: Option<String>,
}

// =============================================================================
// UPDATE
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[schema(example = "Ada Lovelace")]
    #[validate(
        required(message = "The name field is required."),
        length(max = 255, message = "The name field must not be greater than 255 characters.")
    )]
    pub name: Option<String>,
    #[schema(example = "admin")]
    #[validate(required(message = "The role field is required."))]
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserUpdate {
    pub name: String,
    pub role: String,
}

#[async_trait]
impl FormRequest for UpdateUserRequest {
    type Validated = UserUpdate;

    fn permission() -> Option<Permission> {
        Some(Permission::EditUsers)
    }

    fn normalize(&mut self) {
        normalize(&mut self.name);
        normalize(&mut self.role);
    }

    async fn check(&self, pool: &SqlitePool, errors: &mut FieldErrors) -> AppResult<()> {
        check_role(pool, self.role.as_deref(), errors).await
    }

    fn into_validated(self) -> Result<Self::Validated, FieldErrors> {
        Ok(UserUpdate {
            name: required(self.name, "name")?,
            role: required(self.role, "role")?,
        })
    }
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct StoreUserRequest {
    #[schema(example = "Grace Hopper")]
    #[validate(
        required(message = "The name field is required."),
        length(max = 255, message = "The name field must not be greater than 255 characters.")
    )]
    pub name: Option<String>,
    #[schema(example = "grace@example.com")]
    #[validate(
        required(message = "The email field is required."),
        email(message = "The email field must be a valid email address.")
    )]
    pub email: Option<String>,
    #[schema(example = "S3cureP@ssw0rd")]
    #[validate(
        required(message = "The password field is required."),
        length(min = 8, message = "The password field must be at least 8 characters.")
    )]
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
    #[schema(example = "user")]
    #[validate(required(message = "The role field is required."))]
    pub role: Option<String>,
}

/// Validated input for a new account; the password is still plain text.
#[derive(Debug, Clone)]
pub struct UserRegistration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[async_trait]
impl FormRequest for StoreUserRequest {
    type Validated = UserRegistration;

    fn permission() -> Option<Permission> {
        Some(Permission::CreateUsers)
    }

    fn normalize(&mut self) {
        normalize(&mut self.name);
        normalize(&mut self.email);
        normalize(&mut self.role);
        if let Some(email) = self.email.as_mut() {
            *email = email.to_lowercase();
        }
    }

    async fn check(&self, pool: &SqlitePool, errors: &mut FieldErrors) -> AppResult<()> {
        check_email_available(pool, self.email.as_deref(), errors).await?;
        if self.password.is_some() && self.password != self.password_confirmation {
            errors.add("password", "The password field confirmation does not match.");
        }
        check_role(pool, self.role.as_deref(), errors).await
    }

    fn into_validated(self) -> Result<Self::Validated, FieldErrors> {
        Ok(UserRegistration {
            name: required(self.name, "name")?,
            email: required(self.email, "email")?,
            password: required(self.password, "password")?,
            role: required(self.role, "role")?,
        })
    }
}

// =============================================================================
// AUTH
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "Ada Lovelace")]
    #[validate(
        required(message = "The name field is required."),
        length(max = 255, message = "The name field must not be greater than 255 characters.")
    )]
    pub name: Option<String>,
    #[schema(example = "ada@example.com")]
    #[validate(
        required(message = "The email field is required."),
        email(message = "The email field must be a valid email address.")
    )]
    pub email: Option<String>,
    #[schema(example = "S3cureP@ssw0rd")]
    #[validate(
        required(message = "The password field is required."),
        length(min = 8, message = "The password field must be at least 8 characters.")
    )]
    pub password: Option<String>,
}

#[async_trait]
impl FormRequest for RegisterRequest {
    type Validated = UserRegistration;

    fn permission() -> Option<Permission> {
        None
    }

    fn normalize(&mut self) {
        normalize(&mut self.name);
        normalize(&mut self.email);
        if let Some(email) = self.email.as_mut() {
            *email = email.to_lowercase();
        }
    }

    async fn check(&self, pool: &SqlitePool, errors: &mut FieldErrors) -> AppResult<()> {
        check_email_available(pool, self.email.as_deref(), errors).await
    }

    fn into_validated(self) -> Result<Self::Validated, FieldErrors> {
        Ok(UserRegistration {
            name: required(self.name, "name")?,
            email: required(self.email, "email")?,
            password: required(self.password, "password")?,
            role: roles::USER.to_string(),
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "S3cureP@ssw0rd")]
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

async fn check_role(pool: &SqlitePool, role: Option<&str>, errors: &mut FieldErrors) -> AppResult<()> {
    if let Some(role) = role {
        if !repository::roles::exists(pool, role).await? {
            errors.add("role", "The selected role is invalid.");
        }
    }
    Ok(())
}

async fn check_email_available(
    pool: &SqlitePool,
    email: Option<&str>,
    errors: &mut FieldErrors,
) -> AppResult<()> {
    if let Some(email) = email {
        if errors.has("email") {
            return Ok(());
        }
        if repository::users::email_taken(pool, email).await? {
            errors.add("email", "The email has already been taken.");
        }
    }
    Ok(())
}

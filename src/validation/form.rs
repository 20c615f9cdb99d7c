use axum::async_trait;
use axum::extract::{FromRequest, Request};
use axum::http::header::CONTENT_TYPE;
use axum::{Form, Json};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use serde_path_to_error::Segment;
use sqlx::SqlitePool;
use validator::{Validate, ValidationErrors};

use super::{invalid_field, FieldErrors};
use crate::app::AppState;
use crate::authz::{Actor, Permission};
use crate::errors::{AppError, AppResult};

/// A typed request body with its own authorization hook and rules.
#[async_trait]
pub trait FormRequest: DeserializeOwned + Validate + Send + Sync + 'static {
    type Validated: Send;

    /// Permission the actor must hold before the body is read. `None` for
    /// public forms such as registration.
    fn permission() -> Option<Permission>;

    fn normalize(&mut self) {}

    /// Rules that need the store (existence, uniqueness).
    async fn check(&self, _pool: &SqlitePool, _errors: &mut FieldErrors) -> AppResult<()> {
        Ok(())
    }

    fn into_validated(self) -> Result<Self::Validated, FieldErrors>;
}

/// Shared rules for a record whose create and edit forms have the same shape.
#[async_trait]
pub trait RecordInput: DeserializeOwned + Validate + Send + Sync + 'static {
    const CREATE: Permission;
    const EDIT: Permission;

    type Validated: Send;

    fn normalize(&mut self) {}

    async fn check(&self, _pool: &SqlitePool, _errors: &mut FieldErrors) -> AppResult<()> {
        Ok(())
    }

    fn into_validated(self) -> Result<Self::Validated, FieldErrors>;
}

/// Body of a create request for `T`.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct Store<T>(pub T);

/// Body of an update request for `T`.
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct Update<T>(pub T);

impl<T: Validate> Validate for Store<T> {
    fn validate(&self) -> Result<(), ValidationErrors> {
        self.0.validate()
    }
}

impl<T: Validate> Validate for Update<T> {
    fn validate(&self) -> Result<(), ValidationErrors> {
        self.0.validate()
    }
}

#[async_trait]
impl<T: RecordInput> FormRequest for Store<T> {
    type Validated = T::Validated;

    fn permission() -> Option<Permission> {
        Some(T::CREATE)
    }

    fn normalize(&mut self) {
        self.0.normalize();
    }

    async fn check(&self, pool: &SqlitePool, errors: &mut FieldErrors) -> AppResult<()> {
        self.0.check(pool, errors).await
    }

    fn into_validated(self) -> Result<Self::Validated, FieldErrors> {
        self.0.into_validated()
    }
}

#[async_trait]
impl<T: RecordInput> FormRequest for Update<T> {
    type Validated = T::Validated;

    fn permission() -> Option<Permission> {
        Some(T::EDIT)
    }

    fn normalize(&mut self) {
        self.0.normalize();
    }

    async fn check(&self, pool: &SqlitePool, errors: &mut FieldErrors) -> AppResult<()> {
        self.0.check(pool, errors).await
    }

    fn into_validated(self) -> Result<Self::Validated, FieldErrors> {
        self.0.into_validated()
    }
}

/// Extractor that authorizes, parses, normalizes and validates a
/// [`FormRequest`]. Nothing downstream runs unless every step passes.
pub struct ValidatedForm<T: FormRequest>(pub T::Validated);

#[async_trait]
impl<T> FromRequest<AppState> for ValidatedForm<T>
where
    T: FormRequest,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(permission) = T::permission() {
            let actor = req
                .extensions()
                .get::<Actor>()
                .ok_or_else(|| AppError::unauthorized("authentication required"))?;
            state.gate.authorize(actor, permission)?;
        }

        let mut input: T = parse_body(req, state).await?;
        input.normalize();

        let mut errors = match input.validate() {
            Ok(()) => FieldErrors::new(),
            Err(err) => FieldErrors::from(err),
        };
        input.check(&state.pool, &mut errors).await?;

        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        Ok(ValidatedForm(input.into_validated()?))
    }
}

/// Accepts JSON bodies and classic urlencoded form posts. Both are read into
/// a JSON object first so a value of the wrong type is reported against its
/// field instead of failing the whole request.
async fn parse_body<T>(req: Request, state: &AppState) -> AppResult<T>
where
    T: DeserializeOwned + Send + 'static,
{
    let is_json = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("application/json"))
        .unwrap_or(false);

    let body = if is_json {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
        value
    } else {
        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
        Value::Object(pairs.into_iter().map(|(key, value)| (key, Value::String(value))).collect())
    };

    serde_path_to_error::deserialize(body).map_err(|err| match err.path().iter().next() {
        Some(Segment::Map { key }) => {
            let mut errors = FieldErrors::new();
            errors.add(key.as_str(), invalid_field(key));
            AppError::Validation(errors)
        }
        _ => AppError::bad_request(err.inner().to_string()),
    })
}

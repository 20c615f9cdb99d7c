use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::validation::FieldErrors;

pub type AppResult<T> = Result<T, AppError>;

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    /// A record addressed by id does not exist (or is soft deleted).
    #[error("The {entity} ID: {id} is not found.")]
    RecordNotFound { entity: &'static str, id: i64 },
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("The given data was invalid.")]
    Validation(FieldErrors),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("token error: {0}")]
    Token(String),
    #[error("database error")]
    Database(#[from] sqlx::Error),
    #[error("internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn record_not_found(entity: &'static str, id: i64) -> Self {
        Self::RecordNotFound { entity, id }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn token(err: impl Into<String>) -> Self {
        Self::Token(err.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether this error is a system fault worth reporting. Expected user
    /// errors (denied, missing records, bad input) are not.
    pub fn is_reportable(&self) -> bool {
        matches!(
            self,
            AppError::Configuration(_) | AppError::Database(_) | AppError::Internal(_)
        )
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

#[derive(Serialize)]
struct RecordNotFoundResponse {
    status: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ValidationResponse {
    message: String,
    errors: FieldErrors,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_reportable() {
            match &self {
                AppError::Database(err) => tracing::error!(error = %err, "database failure"),
                other => tracing::error!(error = %other, "request failed"),
            }
        } else if let AppError::Forbidden(reason) = &self {
            tracing::debug!(%reason, "request denied");
        }

        let message = self.to_string();

        let status = match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RecordNotFound { .. } => {
                let payload = RecordNotFoundResponse {
                    status: "error",
                    message,
                };
                return (StatusCode::NOT_FOUND, Json(payload)).into_response();
            }
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(errors) => {
                let payload = ValidationResponse { message, errors };
                return (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response();
            }
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Token(_) => StatusCode::UNAUTHORIZED,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let error = match status {
            StatusCode::UNAUTHORIZED => "unauthorized",
            StatusCode::FORBIDDEN => "forbidden",
            StatusCode::NOT_FOUND => "not_found",
            StatusCode::BAD_REQUEST => "bad_request",
            _ => "internal",
        };

        let payload = ErrorResponse {
            error: error.to_string(),
            message,
        };

        (status, Json(payload)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_not_found_message_names_entity_and_id() {
        let err = AppError::record_not_found("User", 7);
        assert_eq!(err.to_string(), "The User ID: 7 is not found.");
        assert!(!err.is_reportable());
    }

    #[test]
    fn record_not_found_renders_status_error_body() {
        let resp = AppError::record_not_found("User", 7).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn forbidden_is_not_reportable() {
        assert!(!AppError::forbidden("edit users").is_reportable());
        assert!(AppError::internal("boom").is_reportable());
    }
}

use axum::http::{header::LOCATION, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::AppError;

#[derive(Debug, Serialize, ToSchema)]
pub struct FlashMessage {
    #[schema(example = "User updated successfully.")]
    pub message: String,
}

/// `302 Found` to the next page, with the flash message in the body.
#[derive(Debug)]
pub struct Redirect {
    location: String,
    message: Option<String>,
}

impl Redirect {
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl IntoResponse for Redirect {
    fn into_response(self) -> Response {
        let location = match HeaderValue::try_from(self.location.as_str()) {
            Ok(value) => value,
            Err(err) => return AppError::internal(format!("invalid redirect location: {err}")).into_response(),
        };

        let flash = FlashMessage {
            message: self.message.unwrap_or_default(),
        };

        (StatusCode::FOUND, [(LOCATION, location)], Json(flash)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redirect_sets_found_and_location() {
        let resp = Redirect::to("/users/4/edit")
            .with_message("User updated successfully.")
            .into_response();

        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers().get(LOCATION).unwrap(), "/users/4/edit");
    }
}

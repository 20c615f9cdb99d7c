use std::collections::BTreeSet;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::errors::AppError;

/// The authenticated identity making a request, with its role names resolved.
///
/// Inserted into request extensions by the `authenticate` interceptor and
/// handed explicitly to handlers and form requests through the extractor.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: i64,
    pub roles: BTreeSet<String>,
}

impl Actor {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            roles: BTreeSet::new(),
        }
    }

    pub fn with_roles<I, R>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .ok_or_else(|| AppError::unauthorized("authentication required"))
    }
}

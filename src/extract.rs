use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::de::DeserializeOwned;

use crate::errors::AppError;

/// Path parameters that answer a JSON 404 when they do not parse, so
/// `/users/abc` is treated like any other record that does not exist.
#[derive(Debug, Clone, Copy)]
pub struct Path<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Path(value) = axum::extract::Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                tracing::debug!(%rejection, path = %parts.uri.path(), "unparseable path parameter");
                AppError::not_found(format!("no record matches '{}'", parts.uri.path()))
            })?;
        Ok(Path(value))
    }
}

//! Interceptors run in front of protected handlers.
//!
//! `authenticate` turns a bearer token into an [`Actor`] and `authorize`
//! checks one [`Permission`] for the route it is layered on.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::app::AppState;
use crate::authz::{Actor, Gate, Permission};
use crate::errors::{AppError, AppResult};
use crate::jwt::bearer_token;
use crate::repository;

pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> AppResult<Response> {
    let token = bearer_token(req.headers())?;
    let claims = state.jwt.decode(token)?;

    // A token outlives a soft delete, the account does not.
    let actor = repository::users::load_actor(&state.pool, claims.sub)
        .await?
        .ok_or_else(|| AppError::unauthorized("account no longer exists"))?;

    tracing::debug!(actor_id = actor.user_id, "request authenticated");
    req.extensions_mut().insert(actor);

    Ok(next.run(req).await)
}

/// State for a per-route permission check.
#[derive(Clone)]
pub struct Guard {
    gate: Arc<Gate>,
    permission: Permission,
}

impl Guard {
    pub fn new(gate: Arc<Gate>, permission: Permission) -> Self {
        Self { gate, permission }
    }
}

pub async fn authorize(State(guard): State<Guard>, actor: Actor, req: Request, next: Next) -> AppResult<Response> {
    guard.gate.authorize(&actor, guard.permission)?;
    Ok(next.run(req).await)
}

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::app::AppState;
use crate::authz::Actor;
use crate::errors::{AppError, AppResult};
use crate::events::log_activity;
use crate::models::user::{AuthResponse, LoginRequest, NewUser, RegisterRequest, User};
use crate::repository;
use crate::responses::FlashMessage;
use crate::utils::{hash_password, verify_password};
use crate::validation::ValidatedForm;

#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 422, description = "Validation failed, including a taken email")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedForm(registration): ValidatedForm<RegisterRequest>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let new_user = NewUser {
        name: registration.name,
        email: registration.email,
        password_hash: hash_password(&registration.password)?,
        role: registration.role,
    };

    let id = repository::users::create(&state.pool, &new_user).await?;
    let user = repository::users::load(&state.pool, id).await?;
    let token = state.jwt.encode(user.id)?;

    log_activity(&state.event_bus, "registered", Some(user.id), &user);

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(State(state): State<AppState>, Json(payload): Json<LoginRequest>) -> AppResult<Json<AuthResponse>> {
    let email = payload.email.trim().to_lowercase();

    // Soft-deleted accounts are not found here.
    let db_user = repository::users::find_by_email(&state.pool, &email)
        .await?
        .ok_or_else(|| AppError::unauthorized("invalid credentials"))?;

    if !verify_password(&payload.password, &db_user.password_hash)? {
        return Err(AppError::unauthorized("invalid credentials"));
    }

    let roles = repository::users::role_names(&state.pool, db_user.id).await?;
    let user = db_user.into_user(roles);
    let token = state.jwt.encode(user.id)?;

    Ok(Json(AuthResponse { token, user }))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn me(State(state): State<AppState>, actor: Actor) -> AppResult<Json<User>> {
    let user = repository::users::load(&state.pool, actor.user_id).await?;
    Ok(Json(user))
}

/// Tokens are stateless; the client discards its copy.
#[utoipa::path(
    post,
    path = "/auth/logout",
    tag = "Auth",
    security(("bearerAuth" = [])),
    responses((status = 200, description = "Logout acknowledged", body = FlashMessage))
)]
pub async fn logout(_actor: Actor) -> AppResult<Json<FlashMessage>> {
    Ok(Json(FlashMessage {
        message: "Logged out".to_string(),
    }))
}

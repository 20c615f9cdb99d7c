use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;

use crate::app::AppState;
use crate::authz::Actor;
use crate::errors::AppResult;
use crate::events::{log_activity_with_context, RequestContext};
use crate::extract::Path;
use crate::models::page::{PageQuery, UserPage};
use crate::models::user::{NewUser, StoreUserRequest, UpdateUserRequest, UserEditForm};
use crate::repository;
use crate::responses::Redirect;
use crate::utils::hash_password;
use crate::validation::ValidatedForm;

#[utoipa::path(
    get,
    path = "/users",
    tag = "Users",
    params(PageQuery),
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Active users, five per page", body = UserPage),
        (status = 403, description = "Missing 'access users'")
    )
)]
pub async fn index(State(state): State<AppState>, Query(query): Query<PageQuery>) -> AppResult<Json<UserPage>> {
    let page = repository::users::paginate(&state.pool, query.into()).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/users/{id}/edit",
    tag = "Users",
    params(("id" = i64, Path, description = "User id")),
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Edit form data", body = UserEditForm),
        (status = 403, description = "Missing 'edit users'"),
        (status = 404, description = "No such user")
    )
)]
pub async fn edit(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<UserEditForm>> {
    let user = repository::users::load(&state.pool, id).await?;
    let roles = repository::roles::all(&state.pool).await?;
    let selected_role = user.roles.first().cloned();

    Ok(Json(UserEditForm {
        user,
        roles,
        selected_role,
    }))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = i64, Path, description = "User id")),
    request_body = UpdateUserRequest,
    security(("bearerAuth" = [])),
    responses(
        (status = 302, description = "Updated, redirects to the edit form", body = crate::responses::FlashMessage),
        (status = 403, description = "Missing 'edit users'"),
        (status = 404, description = "No such user"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    headers: HeaderMap,
    Path(id): Path<i64>,
    ValidatedForm(update): ValidatedForm<UpdateUserRequest>,
) -> AppResult<Redirect> {
    let before = repository::users::load(&state.pool, id).await?;
    let changes = repository::users::update_profile(&state.pool, id, &update).await?;
    let after = repository::users::load(&state.pool, id).await?;

    tracing::info!(
        actor_id = actor.user_id,
        user_id = id,
        attached = ?changes.attached,
        detached = ?changes.detached,
        "user updated"
    );
    log_activity_with_context(
        &state.event_bus,
        "updated",
        Some(actor.user_id),
        &after,
        Some(&before),
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Redirect::to(format!("/users/{id}/edit")).with_message("User updated successfully."))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = i64, Path, description = "User id")),
    security(("bearerAuth" = [])),
    responses(
        (status = 302, description = "Soft deleted, redirects to the list", body = crate::responses::FlashMessage),
        (status = 403, description = "Missing 'delete users'"),
        (status = 404, description = "No such user")
    )
)]
pub async fn destroy(
    State(state): State<AppState>,
    actor: Actor,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<Redirect> {
    let user = repository::users::load(&state.pool, id).await?;
    repository::users::soft_delete(&state.pool, id).await?;

    tracing::info!(actor_id = actor.user_id, user_id = id, "user soft deleted");
    log_activity_with_context(
        &state.event_bus,
        "deleted",
        Some(actor.user_id),
        &user,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Redirect::to("/users").with_message("User deleted successfully."))
}

#[utoipa::path(
    post,
    path = "/users",
    tag = "Users",
    request_body = StoreUserRequest,
    security(("bearerAuth" = [])),
    responses(
        (status = 302, description = "Created, redirects to the list", body = crate::responses::FlashMessage),
        (status = 403, description = "Missing 'create users'"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn store(
    State(state): State<AppState>,
    actor: Actor,
    headers: HeaderMap,
    ValidatedForm(registration): ValidatedForm<StoreUserRequest>,
) -> AppResult<Redirect> {
    let new_user = NewUser {
        name: registration.name,
        email: registration.email,
        password_hash: hash_password(&registration.password)?,
        role: registration.role,
    };
    let id = repository::users::create(&state.pool, &new_user).await?;
    let user = repository::users::load(&state.pool, id).await?;

    tracing::info!(actor_id = actor.user_id, user_id = id, "user created");
    log_activity_with_context(
        &state.event_bus,
        "created",
        Some(actor.user_id),
        &user,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Redirect::to("/users").with_message("User created successfully."))
}

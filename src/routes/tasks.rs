use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;

use crate::app::AppState;
use crate::authz::Actor;
use crate::errors::AppResult;
use crate::events::{log_activity_with_context, RequestContext};
use crate::extract::Path;
use crate::models::task::{Task, TaskRequest};
use crate::models::page::{PageQuery, TaskPage};
use crate::repository;
use crate::responses::Redirect;
use crate::validation::{Store, Update, ValidatedForm};

#[utoipa::path(
    get,
    path = "/tasks",
    tag = "Tasks",
    params(PageQuery),
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Active tasks, five per page", body = TaskPage),
        (status = 403, description = "Missing 'access tasks'")
    )
)]
pub async fn index(State(state): State<AppState>, Query(query): Query<PageQuery>) -> AppResult<Json<TaskPage>> {
    Ok(Json(repository::tasks::paginate(&state.pool, query.into()).await?))
}

#[utoipa::path(
    get,
    path = "/tasks/{id}",
    tag = "Tasks",
    params(("id" = i64, Path, description = "Task id")),
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Task detail", body = Task),
        (status = 404, description = "No such task")
    )
)]
pub async fn show(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Task>> {
    Ok(Json(repository::tasks::load(&state.pool, id).await?))
}

#[utoipa::path(
    post,
    path = "/tasks",
    tag = "Tasks",
    request_body = TaskRequest,
    security(("bearerAuth" = [])),
    responses(
        (status = 302, description = "Created, redirects to the list", body = crate::responses::FlashMessage),
        (status = 403, description = "Missing 'create tasks'"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn store(
    State(state): State<AppState>,
    actor: Actor,
    headers: HeaderMap,
    ValidatedForm(data): ValidatedForm<Store<TaskRequest>>,
) -> AppResult<Redirect> {
    let id = repository::tasks::create(&state.pool, &data).await?;
    let task = repository::tasks::load(&state.pool, id).await?;

    log_activity_with_context(
        &state.event_bus,
        "created",
        Some(actor.user_id),
        &task,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Redirect::to("/tasks").with_message("Task created successfully."))
}

#[utoipa::path(
    put,
    path = "/tasks/{id}",
    tag = "Tasks",
    params(("id" = i64, Path, description = "Task id")),
    request_body = TaskRequest,
    security(("bearerAuth" = [])),
    responses(
        (status = 302, description = "Updated, redirects to the list", body = crate::responses::FlashMessage),
        (status = 404, description = "No such task"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    headers: HeaderMap,
    Path(id): Path<i64>,
    ValidatedForm(data): ValidatedForm<Update<TaskRequest>>,
) -> AppResult<Redirect> {
    let before = repository::tasks::load(&state.pool, id).await?;
    repository::tasks::update(&state.pool, id, &data).await?;
    let after = repository::tasks::load(&state.pool, id).await?;

    log_activity_with_context(
        &state.event_bus,
        "updated",
        Some(actor.user_id),
        &after,
        Some(&before),
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Redirect::to("/tasks").with_message("Task updated successfully."))
}

#[utoipa::path(
    delete,
    path = "/tasks/{id}",
    tag = "Tasks",
    params(("id" = i64, Path, description = "Task id")),
    security(("bearerAuth" = [])),
    responses(
        (status = 302, description = "Soft deleted, redirects to the list", body = crate::responses::FlashMessage),
        (status = 403, description = "Missing 'delete tasks'"),
        (status = 404, description = "No such task")
    )
)]
pub async fn destroy(
    State(state): State<AppState>,
    actor: Actor,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<Redirect> {
    let task = repository::tasks::load(&state.pool, id).await?;
    repository::tasks::soft_delete(&state.pool, id).await?;

    log_activity_with_context(
        &state.event_bus,
        "deleted",
        Some(actor.user_id),
        &task,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Redirect::to("/tasks").with_message("Task deleted successfully."))
}

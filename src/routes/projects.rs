use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;

use crate::app::AppState;
use crate::authz::Actor;
use crate::errors::AppResult;
use crate::events::{log_activity_with_context, RequestContext};
use crate::extract::Path;
use crate::models::project::{Project, ProjectRequest};
use crate::models::page::{PageQuery, ProjectPage};
use crate::repository;
use crate::responses::Redirect;
use crate::validation::{Store, Update, ValidatedForm};

#[utoipa::path(
    get,
    path = "/projects",
    tag = "Projects",
    params(PageQuery),
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Active projects, five per page", body = ProjectPage),
        (status = 403, description = "Missing 'access projects'")
    )
)]
pub async fn index(State(state): State<AppState>, Query(query): Query<PageQuery>) -> AppResult<Json<ProjectPage>> {
    Ok(Json(repository::projects::paginate(&state.pool, query.into()).await?))
}

#[utoipa::path(
    get,
    path = "/projects/{id}",
    tag = "Projects",
    params(("id" = i64, Path, description = "Project id")),
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Project detail", body = Project),
        (status = 404, description = "No such project")
    )
)]
pub async fn show(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Project>> {
    Ok(Json(repository::projects::load(&state.pool, id).await?))
}

#[utoipa::path(
    post,
    path = "/projects",
    tag = "Projects",
    request_body = ProjectRequest,
    security(("bearerAuth" = [])),
    responses(
        (status = 302, description = "Created, redirects to the list", body = crate::responses::FlashMessage),
        (status = 403, description = "Missing 'create projects'"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn store(
    State(state): State<AppState>,
    actor: Actor,
    headers: HeaderMap,
    ValidatedForm(data): ValidatedForm<Store<ProjectRequest>>,
) -> AppResult<Redirect> {
    let id = repository::projects::create(&state.pool, &data).await?;
    let project = repository::projects::load(&state.pool, id).await?;

    log_activity_with_context(
        &state.event_bus,
        "created",
        Some(actor.user_id),
        &project,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Redirect::to("/projects").with_message("Project created successfully."))
}

#[utoipa::path(
    put,
    path = "/projects/{id}",
    tag = "Projects",
    params(("id" = i64, Path, description = "Project id")),
    request_body = ProjectRequest,
    security(("bearerAuth" = [])),
    responses(
        (status = 302, description = "Updated, redirects to the list", body = crate::responses::FlashMessage),
        (status = 404, description = "No such project"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    headers: HeaderMap,
    Path(id): Path<i64>,
    ValidatedForm(data): ValidatedForm<Update<ProjectRequest>>,
) -> AppResult<Redirect> {
    let before = repository::projects::load(&state.pool, id).await?;
    repository::projects::update(&state.pool, id, &data).await?;
    let after = repository::projects::load(&state.pool, id).await?;

    log_activity_with_context(
        &state.event_bus,
        "updated",
        Some(actor.user_id),
        &after,
        Some(&before),
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Redirect::to("/projects").with_message("Project updated successfully."))
}

#[utoipa::path(
    delete,
    path = "/projects/{id}",
    tag = "Projects",
    params(("id" = i64, Path, description = "Project id")),
    security(("bearerAuth" = [])),
    responses(
        (status = 302, description = "Soft deleted, redirects to the list", body = crate::responses::FlashMessage),
        (status = 403, description = "Missing 'delete projects'"),
        (status = 404, description = "No such project")
    )
)]
pub async fn destroy(
    State(state): State<AppState>,
    actor: Actor,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<Redirect> {
    let project = repository::projects::load(&state.pool, id).await?;
    repository::projects::soft_delete(&state.pool, id).await?;

    log_activity_with_context(
        &state.event_bus,
        "deleted",
        Some(actor.user_id),
        &project,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Redirect::to("/projects").with_message("Project deleted successfully."))
}

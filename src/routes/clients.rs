use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;

use crate::app::AppState;
use crate::authz::Actor;
use crate::errors::AppResult;
use crate::events::{log_activity_with_context, RequestContext};
use crate::extract::Path;
use crate::models::client::{Client, ClientRequest};
use crate::models::page::{ClientPage, PageQuery};
use crate::repository;
use crate::responses::Redirect;
use crate::validation::{Store, Update, ValidatedForm};

#[utoipa::path(
    get,
    path = "/clients",
    tag = "Clients",
    params(PageQuery),
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Active clients, five per page", body = ClientPage),
        (status = 403, description = "Missing 'access clients'")
    )
)]
pub async fn index(State(state): State<AppState>, Query(query): Query<PageQuery>) -> AppResult<Json<ClientPage>> {
    Ok(Json(repository::clients::paginate(&state.pool, query.into()).await?))
}

#[utoipa::path(
    get,
    path = "/clients/{id}",
    tag = "Clients",
    params(("id" = i64, Path, description = "Client id")),
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Client detail", body = Client),
        (status = 404, description = "No such client")
    )
)]
pub async fn show(State(state): State<AppState>, Path(id): Path<i64>) -> AppResult<Json<Client>> {
    Ok(Json(repository::clients::load(&state.pool, id).await?))
}

#[utoipa::path(
    post,
    path = "/clients",
    tag = "Clients",
    request_body = ClientRequest,
    security(("bearerAuth" = [])),
    responses(
        (status = 302, description = "Created, redirects to the list", body = crate::responses::FlashMessage),
        (status = 403, description = "Missing 'create clients'"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn store(
    State(state): State<AppState>,
    actor: Actor,
    headers: HeaderMap,
    ValidatedForm(data): ValidatedForm<Store<ClientRequest>>,
) -> AppResult<Redirect> {
    let id = repository::clients::create(&state.pool, &data).await?;
    let client = repository::clients::load(&state.pool, id).await?;

    log_activity_with_context(
        &state.event_bus,
        "created",
        Some(actor.user_id),
        &client,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Redirect::to("/clients").with_message("Client created successfully."))
}

#[utoipa::path(
    put,
    path = "/clients/{id}",
    tag = "Clients",
    params(("id" = i64, Path, description = "Client id")),
    request_body = ClientRequest,
    security(("bearerAuth" = [])),
    responses(
        (status = 302, description = "Updated, redirects to the list", body = crate::responses::FlashMessage),
        (status = 404, description = "No such client"),
        (status = 422, description = "Validation failed")
    )
)]
pub async fn update(
    State(state): State<AppState>,
    actor: Actor,
    headers: HeaderMap,
    Path(id): Path<i64>,
    ValidatedForm(data): ValidatedForm<Update<ClientRequest>>,
) -> AppResult<Redirect> {
    let before = repository::clients::load(&state.pool, id).await?;
    repository::clients::update(&state.pool, id, &data).await?;
    let after = repository::clients::load(&state.pool, id).await?;

    log_activity_with_context(
        &state.event_bus,
        "updated",
        Some(actor.user_id),
        &after,
        Some(&before),
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Redirect::to("/clients").with_message("Client updated successfully."))
}

#[utoipa::path(
    delete,
    path = "/clients/{id}",
    tag = "Clients",
    params(("id" = i64, Path, description = "Client id")),
    security(("bearerAuth" = [])),
    responses(
        (status = 302, description = "Soft deleted, redirects to the list", body = crate::responses::FlashMessage),
        (status = 403, description = "Missing 'delete clients'"),
        (status = 404, description = "No such client")
    )
)]
pub async fn destroy(
    State(state): State<AppState>,
    actor: Actor,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> AppResult<Redirect> {
    let client = repository::clients::load(&state.pool, id).await?;
    repository::clients::soft_delete(&state.pool, id).await?;

    log_activity_with_context(
        &state.event_bus,
        "deleted",
        Some(actor.user_id),
        &client,
        None,
        Some(RequestContext::from_headers(&headers)),
    );

    Ok(Redirect::to("/clients").with_message("Client deleted successfully."))
}

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::openapi::server::Server;
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::{models, responses, routes};

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::auth::register,
        routes::auth::login,
        routes::auth::me,
        routes::auth::logout,
        routes::health::health,
        routes::users::index,
        routes::users::store,
        routes::users::edit,
        routes::users::update,
        routes::users::destroy,
        routes::clients::index,
        routes::clients::store,
        routes::clients::show,
        routes::clients::update,
        routes::clients::destroy,
        routes::projects::index,
        routes::projects::store,
        routes::projects::show,
        routes::projects::update,
        routes::projects::destroy,
        routes::tasks::index,
        routes::tasks::store,
        routes::tasks::show,
        routes::tasks::update,
        routes::tasks::destroy
    ),
    components(
        schemas(
            models::user::User,
            models::user::AuthResponse,
            models::user::LoginRequest,
            models::user::RegisterRequest,
            models::user::StoreUserRequest,
            models::user::UpdateUserRequest,
            models::user::UserEditForm,
            models::rbac::Role,
            models::client::Client,
            models::client::ClientRequest,
            models::project::Project,
            models::project::ProjectRequest,
            models::task::Task,
            models::task::TaskRequest,
            models::status::WorkStatus,
            models::page::UserPage,
            models::page::ClientPage,
            models::page::ProjectPage,
            models::page::TaskPage,
            responses::FlashMessage,
            routes::health::HealthResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Users", description = "User administration"),
        (name = "Clients", description = "Client management"),
        (name = "Projects", description = "Project management"),
        (name = "Tasks", description = "Task management"),
        (name = "Health", description = "Liveness")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearerAuth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// The API document with a `servers` entry for the local listener.
pub fn build_openapi(port: u16) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.servers = Some(vec![Server::new(format!("http://localhost:{port}"))]);
    doc
}

pub fn swagger_routes(doc: utoipa::openapi::OpenApi) -> Router {
    let config = utoipa_swagger_ui::Config::new(["/api-docs/openapi.json"])
        .try_it_out_enabled(true)
        .persist_authorization(true);

    let json_doc = doc.clone();

    Router::new()
        .route(
            "/api-docs/openapi.json",
            get(move || {
                let doc = json_doc.clone();
                async move { Json(doc) }
            }),
        )
        .merge(SwaggerUi::new("/docs").config(config))
}

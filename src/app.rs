use std::sync::Arc;

use axum::http::Method;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post, put};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{AuthzMode, Gate, Permission, PermissionStore};
use crate::errors::AppError;
use crate::events::{init_event_bus, start_activity_listener, EventBus};
use crate::jwt::JwtConfig;
use crate::middleware::{self, Guard};
use crate::routes::{auth, clients, health, projects, tasks, users};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub gate: Arc<Gate>,
    pub event_bus: EventBus,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig, gate: Gate, event_bus: EventBus) -> Self {
        Self {
            pool,
            jwt: Arc::new(jwt),
            gate: Arc::new(gate),
            event_bus,
        }
    }
}

/// Builds the router from environment configuration.
pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    build_app(pool, jwt_config, AuthzMode::from_env()).await
}

/// Loads the permission catalog and wires the interceptor pipeline:
/// authenticate, then the route's permission guard, then the handler's
/// validated form.
pub async fn build_app(pool: SqlitePool, jwt: JwtConfig, mode: AuthzMode) -> Result<Router, AppError> {
    let permissions = PermissionStore::load(&pool).await?;
    if mode != AuthzMode::Strict {
        tracing::warn!(?mode, "authorization is not enforced");
    }

    let (event_bus, rx) = init_event_bus();
    tokio::spawn(start_activity_listener(rx, pool.clone()));

    let state = AppState::new(pool, jwt, Gate::new(permissions, mode), event_bus);

    let gate = Arc::clone(&state.gate);
    let guard = |permission: Permission| from_fn_with_state(Guard::new(Arc::clone(&gate), permission), middleware::authorize);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    // Create and update are gated by their form request, not a route guard.
    let user_routes = Router::new()
        .route("/", get(users::index).route_layer(guard(Permission::AccessUsers)))
        .route("/", post(users::store))
        .route("/:id/edit", get(users::edit).route_layer(guard(Permission::EditUsers)))
        .route("/:id", put(users::update).patch(users::update))
        .route("/:id", delete(users::destroy).route_layer(guard(Permission::DeleteUsers)));

    let client_routes = Router::new()
        .route("/", get(clients::index).route_layer(guard(Permission::AccessClients)))
        .route("/", post(clients::store))
        .route("/:id", get(clients::show).route_layer(guard(Permission::AccessClients)))
        .route("/:id", put(clients::update).patch(clients::update))
        .route("/:id", delete(clients::destroy).route_layer(guard(Permission::DeleteClients)));

    let project_routes = Router::new()
        .route("/", get(projects::index).route_layer(guard(Permission::AccessProjects)))
        .route("/", post(projects::store))
        .route("/:id", get(projects::show).route_layer(guard(Permission::AccessProjects)))
        .route("/:id", put(projects::update).patch(projects::update))
        .route("/:id", delete(projects::destroy).route_layer(guard(Permission::DeleteProjects)));

    let task_routes = Router::new()
        .route("/", get(tasks::index).route_layer(guard(Permission::AccessTasks)))
        .route("/", post(tasks::store))
        .route("/:id", get(tasks::show).route_layer(guard(Permission::AccessTasks)))
        .route("/:id", put(tasks::update).patch(tasks::update))
        .route("/:id", delete(tasks::destroy).route_layer(guard(Permission::DeleteTasks)));

    let protected = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", post(auth::logout))
        .nest("/users", user_routes)
        .nest("/clients", client_routes)
        .nest("/projects", project_routes)
        .nest("/tasks", task_routes)
        .route_layer(from_fn_with_state(state.clone(), middleware::authenticate));

    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/api/health", get(health::health));

    let router = Router::new()
        .merge(public)
        .merge(protected)
        .fallback(|| async { AppError::not_found("route not found") })
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}

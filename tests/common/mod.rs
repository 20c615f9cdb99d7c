#![allow(dead_code)]

use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::{tempdir, TempDir};
use tower::util::ServiceExt; // for `oneshot`

use backoffice::authz::AuthzMode;
use backoffice::build_app;
use backoffice::jwt::JwtConfig;
use backoffice::models::user::NewUser;
use backoffice::repository;
use backoffice::utils::hash_password;

pub const PASSWORD: &str = "password123";

/// A fresh tempfile database with every migration applied. Keep the
/// directory alive for as long as the pool is used.
pub async fn migrated_pool() -> Result<(TempDir, SqlitePool)> {
    let dir = tempdir()?;
    let opts = SqliteConnectOptions::new()
        .filename(dir.path().join("test.db"))
        .create_if_missing(true);
    let pool = SqlitePool::connect_with(opts).await?;

    let migrator =
        sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")).await?;
    migrator.run(&pool).await?;

    Ok((dir, pool))
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(axum::http::header::LOCATION)
            .and_then(|value| value.to_str().ok())
    }
}

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    pub jwt: JwtConfig,
    password_hash: String,
    _dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        Self::with_mode(AuthzMode::Strict).await
    }

    pub async fn with_mode(mode: AuthzMode) -> Result<Self> {
        let (dir, pool) = migrated_pool().await?;
        let jwt = JwtConfig::new("test-secret", 1);
        let app = build_app(pool.clone(), jwt.clone(), mode).await?;

        Ok(Self {
            app,
            pool,
            jwt,
            password_hash: hash_password(PASSWORD)?,
            _dir: dir,
        })
    }

    /// Inserts a user holding `role` and returns its id and a bearer token.
    pub async fn user(&self, name: &str, email: &str, role: &str) -> Result<(i64, String)> {
        let new_user = NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: self.password_hash.clone(),
            role: role.to_string(),
        };
        let id = repository::users::create(&self.pool, &new_user).await?;
        Ok((id, self.jwt.encode(id)?))
    }

    pub async fn send(&self, req: Request<Body>) -> Result<TestResponse> {
        let resp = self.app.clone().oneshot(req).await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        Ok(TestResponse { status, headers, body })
    }

    pub async fn get(&self, uri: &str, token: &str) -> Result<TestResponse> {
        let req = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())?;
        self.send(req).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Result<TestResponse> {
        let req = Request::builder()
            .method(Method::DELETE)
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())?;
        self.send(req).await
    }

    pub async fn json(&self, method: Method, uri: &str, token: Option<&str>, body: Value) -> Result<TestResponse> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body.to_string()))?).await
    }

    /// Sends a classic `application/x-www-form-urlencoded` post.
    pub async fn form(&self, method: Method, uri: &str, token: &str, body: &str) -> Result<TestResponse> {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/x-www-form-urlencoded")
            .header("authorization", format!("Bearer {token}"))
            .body(Body::from(body.to_string()))?;
        self.send(req).await
    }
}

mod common;

use anyhow::Result;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::json;

use common::{TestApp, PASSWORD};

#[tokio::test]
async fn register_assigns_user_role_and_returns_token() -> Result<()> {
    let t = TestApp::new().await?;

    let resp = t
        .json(
            Method::POST,
            "/auth/register",
            None,
            json!({"name": "Ada Lovelace", "email": "ada@example.com", "password": "S3cureP@ssw0rd"}),
        )
        .await?;
    assert_eq!(resp.status, StatusCode::CREATED);
    assert_eq!(resp.body["user"]["roles"], json!(["user"]));
    assert!(resp.body["user"].get("password_hash").is_none());

    let token = resp.body["token"].as_str().unwrap().to_string();
    let me = t.get("/auth/me", &token).await?;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["email"], "ada@example.com");

    Ok(())
}

#[tokio::test]
async fn register_validates_input() -> Result<()> {
    let t = TestApp::new().await?;
    t.user("Taken", "taken@example.com", "user").await?;

    let resp = t
        .json(
            Method::POST,
            "/auth/register",
            None,
            json!({"name": "Short", "email": "short@example.com", "password": "short"}),
        )
        .await?;
    assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        resp.body["errors"]["password"][0],
        "The password field must be at least 8 characters."
    );

    let resp = t
        .json(
            Method::POST,
            "/auth/register",
            None,
            json!({"name": "Again", "email": "TAKEN@example.com", "password": "password123"}),
        )
        .await?;
    assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(resp.body["errors"]["email"][0], "The email has already been taken.");

    let resp = t
        .json(Method::POST, "/auth/register", None, json!({"email": "not-an-email"}))
        .await?;
    assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(resp.body["errors"]["name"].is_array());
    assert!(resp.body["errors"]["email"].is_array());
    assert!(resp.body["errors"]["password"].is_array());

    Ok(())
}

#[tokio::test]
async fn login_checks_password_and_deleted_accounts() -> Result<()> {
    let t = TestApp::new().await?;
    let (id, _) = t.user("Valid", "valid@example.com", "user").await?;

    let resp = t
        .json(
            Method::POST,
            "/auth/login",
            None,
            json!({"email": "valid@example.com", "password": "wrongpassword"}),
        )
        .await?;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    let resp = t
        .json(
            Method::POST,
            "/auth/login",
            None,
            json!({"email": "Valid@Example.com", "password": PASSWORD}),
        )
        .await?;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.body["token"].is_string());

    backoffice::repository::users::soft_delete(&t.pool, id).await?;
    let resp = t
        .json(
            Method::POST,
            "/auth/login",
            None,
            json!({"email": "valid@example.com", "password": PASSWORD}),
        )
        .await?;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn me_and_logout_require_a_token() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, token) = t.user("Someone", "someone@example.com", "user").await?;

    let req = Request::builder().method("GET").uri("/auth/me").body(Body::empty())?;
    assert_eq!(t.send(req).await?.status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .method("POST")
        .uri("/auth/logout")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())?;
    let resp = t.send(req).await?;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["message"], "Logged out");

    Ok(())
}

#[tokio::test]
async fn health_reports_database_and_unknown_routes_are_not_found() -> Result<()> {
    let t = TestApp::new().await?;

    let req = Request::builder().method("GET").uri("/api/health").body(Body::empty())?;
    let resp = t.send(req).await?;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["db_ok"], true);

    let req = Request::builder().method("GET").uri("/nowhere").body(Body::empty())?;
    let resp = t.send(req).await?;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.body["error"], "not_found");

    Ok(())
}

mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use backoffice::authz::AuthzMode;
use backoffice::repository;
use common::TestApp;

#[tokio::test]
async fn listing_users_requires_access_users() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, admin) = t.user("Admin", "admin@example.com", "admin").await?;
    let (_, manager) = t.user("Manager", "manager@example.com", "manager").await?;
    let (_, user) = t.user("User", "user@example.com", "user").await?;

    assert_eq!(t.get("/users", &manager).await?.status, StatusCode::FORBIDDEN);
    assert_eq!(t.get("/users", &user).await?.status, StatusCode::FORBIDDEN);

    let resp = t.get("/users", &admin).await?;
    assert_eq!(resp.status, StatusCode::OK);
    let emails: Vec<&str> = resp.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["email"].as_str().unwrap())
        .collect();
    assert_eq!(emails, vec!["admin@example.com", "manager@example.com", "user@example.com"]);
    assert_eq!(resp.body["total"], 3);

    Ok(())
}

#[tokio::test]
async fn listing_is_paginated_five_per_page_by_id() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, admin) = t.user("Admin", "admin@example.com", "admin").await?;
    for i in 1..=6 {
        t.user(&format!("User {i}"), &format!("user{i}@example.com"), "user").await?;
    }

    let first = t.get("/users", &admin).await?;
    assert_eq!(first.body["data"].as_array().unwrap().len(), 5);
    assert_eq!(first.body["per_page"], 5);
    assert_eq!(first.body["last_page"], 2);

    let second = t.get("/users?page=2", &admin).await?;
    let names: Vec<&str> = second.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["User 5", "User 6"]);
    assert_eq!(second.body["current_page"], 2);

    Ok(())
}

#[tokio::test]
async fn missing_or_invalid_token_is_unauthorized() -> Result<()> {
    let t = TestApp::new().await?;

    assert_eq!(t.get("/users", "not-a-token").await?.status, StatusCode::UNAUTHORIZED);

    let other = backoffice::jwt::JwtConfig::new("other-secret", 1).encode(1)?;
    assert_eq!(t.get("/users", &other).await?.status, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn edit_form_lists_roles_and_selected_role() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, admin) = t.user("Admin", "admin@example.com", "admin").await?;
    let (target, _) = t.user("Target", "target@example.com", "manager").await?;

    let resp = t.get(&format!("/users/{target}/edit"), &admin).await?;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["user"]["name"], "Target");
    assert_eq!(resp.body["selected_role"], "manager");
    assert_eq!(resp.body["roles"].as_array().unwrap().len(), 3);

    Ok(())
}

#[tokio::test]
async fn edit_form_for_unknown_user_is_not_found() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, admin) = t.user("Admin", "admin@example.com", "admin").await?;

    let resp = t.get("/users/999/edit", &admin).await?;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(
        resp.body,
        json!({"status": "error", "message": "The User ID: 999 is not found."})
    );

    Ok(())
}

#[tokio::test]
async fn admin_promotes_user_to_admin() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, admin) = t.user("Admin", "admin@example.com", "admin").await?;
    let (target, _) = t.user("Old Name", "target@example.com", "user").await?;

    let resp = t
        .form(Method::PUT, &format!("/users/{target}"), &admin, "name=New+Name&role=admin")
        .await?;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(resp.location(), Some(format!("/users/{target}/edit").as_str()));
    assert_eq!(resp.body["message"], "User updated successfully.");

    let user = repository::users::load(&t.pool, target).await?;
    assert_eq!(user.name, "New Name");
    assert_eq!(user.roles, vec!["admin".to_string()]);

    Ok(())
}

#[tokio::test]
async fn update_replaces_the_whole_role_set() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, admin) = t.user("Admin", "admin@example.com", "admin").await?;
    let (target, _) = t.user("Target", "target@example.com", "admin").await?;

    let resp = t
        .json(
            Method::PATCH,
            &format!("/users/{target}"),
            Some(&admin),
            json!({"name": "Target", "role": "manager"}),
        )
        .await?;
    assert_eq!(resp.status, StatusCode::FOUND);

    let roles = repository::users::role_names(&t.pool, target).await?;
    assert_eq!(roles, vec!["manager".to_string()]);

    Ok(())
}

#[tokio::test]
async fn invalid_update_is_rejected_without_changes() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, admin) = t.user("Admin", "admin@example.com", "admin").await?;
    let (target, _) = t.user("Target", "target@example.com", "user").await?;

    let resp = t
        .form(Method::PUT, &format!("/users/{target}"), &admin, "name=+++&role=superuser")
        .await?;
    assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(resp.body["errors"]["name"][0], "The name field is required.");
    assert_eq!(resp.body["errors"]["role"][0], "The selected role is invalid.");

    let user = repository::users::load(&t.pool, target).await?;
    assert_eq!(user.name, "Target");
    assert_eq!(user.roles, vec!["user".to_string()]);

    Ok(())
}

#[tokio::test]
async fn update_without_edit_users_is_forbidden_before_validation() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, manager) = t.user("Manager", "manager@example.com", "manager").await?;
    let (target, _) = t.user("Target", "target@example.com", "user").await?;

    // An invalid body still yields 403, never 422.
    let resp = t.form(Method::PUT, &format!("/users/{target}"), &manager, "name=").await?;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let user = repository::users::load(&t.pool, target).await?;
    assert_eq!(user.roles, vec!["user".to_string()]);

    Ok(())
}

#[tokio::test]
async fn update_of_unknown_user_is_not_found() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, admin) = t.user("Admin", "admin@example.com", "admin").await?;

    let resp = t.form(Method::PUT, "/users/4242", &admin, "name=Ghost&role=user").await?;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.body["message"], "The User ID: 4242 is not found.");

    Ok(())
}

#[tokio::test]
async fn delete_without_permission_leaves_user_intact() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, manager) = t.user("Manager", "manager@example.com", "manager").await?;
    let (target, _) = t.user("Target", "target@example.com", "user").await?;

    let resp = t.delete(&format!("/users/{target}"), &manager).await?;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let user = repository::users::load_with_trashed(&t.pool, target).await?;
    assert!(!user.is_deleted());

    Ok(())
}

#[tokio::test]
async fn soft_delete_hides_user_but_keeps_record() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, admin) = t.user("Admin", "admin@example.com", "admin").await?;
    let (target, target_token) = t.user("Target", "target@example.com", "user").await?;

    let resp = t.delete(&format!("/users/{target}"), &admin).await?;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(resp.location(), Some("/users"));
    assert_eq!(resp.body["message"], "User deleted successfully.");

    let list = t.get("/users", &admin).await?;
    let ids: Vec<i64> = list.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["id"].as_i64().unwrap())
        .collect();
    assert!(!ids.contains(&target));

    let trashed = repository::users::load_with_trashed(&t.pool, target).await?;
    assert!(trashed.deleted_at.is_some());

    // The deleted account can no longer authenticate.
    assert_eq!(t.get("/auth/me", &target_token).await?.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        t.delete(&format!("/users/{target}"), &admin).await?.status,
        StatusCode::NOT_FOUND
    );

    Ok(())
}

#[tokio::test]
async fn admin_creates_user_with_role() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, admin) = t.user("Admin", "admin@example.com", "admin").await?;

    let body = json!({
        "name": "Grace Hopper",
        "email": "Grace@Example.com",
        "password": "S3cureP@ssw0rd",
        "password_confirmation": "S3cureP@ssw0rd",
        "role": "manager"
    });
    let resp = t.json(Method::POST, "/users", Some(&admin), body).await?;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(resp.location(), Some("/users"));

    let created = repository::users::find_by_email(&t.pool, "grace@example.com")
        .await?
        .expect("user stored with lowercased email");
    let roles = repository::users::role_names(&t.pool, created.id).await?;
    assert_eq!(roles, vec!["manager".to_string()]);

    Ok(())
}

#[tokio::test]
async fn duplicate_email_and_mismatched_confirmation_fail_validation() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, admin) = t.user("Admin", "admin@example.com", "admin").await?;

    let body = json!({
        "name": "Copy",
        "email": "admin@example.com",
        "password": "password123",
        "password_confirmation": "password124",
        "role": "user"
    });
    let resp = t.json(Method::POST, "/users", Some(&admin), body).await?;
    assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(resp.body["message"], "The given data was invalid.");
    assert_eq!(resp.body["errors"]["email"][0], "The email has already been taken.");
    assert_eq!(
        resp.body["errors"]["password"][0],
        "The password field confirmation does not match."
    );

    Ok(())
}

#[tokio::test]
async fn creating_users_requires_create_users() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, manager) = t.user("Manager", "manager@example.com", "manager").await?;

    let body = json!({
        "name": "Sneaky",
        "email": "sneaky@example.com",
        "password": "password123",
        "password_confirmation": "password123",
        "role": "admin"
    });
    let resp = t.json(Method::POST, "/users", Some(&manager), body).await?;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert!(repository::users::find_by_email(&t.pool, "sneaky@example.com").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn advisory_mode_allows_denied_requests() -> Result<()> {
    let t = TestApp::with_mode(AuthzMode::Advisory).await?;
    let (_, user) = t.user("User", "user@example.com", "user").await?;

    assert_eq!(t.get("/users", &user).await?.status, StatusCode::OK);

    Ok(())
}

#[tokio::test]
async fn out_of_range_or_garbled_page_numbers_still_list() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, admin) = t.user("Admin", "admin@example.com", "admin").await?;

    let far = t.get("/users?page=9223372036854775807", &admin).await?;
    assert_eq!(far.status, StatusCode::OK);
    assert_eq!(far.body["data"], json!([]));
    assert_eq!(far.body["total"], 1);

    let garbled = t.get("/users?page=abc", &admin).await?;
    assert_eq!(garbled.status, StatusCode::OK);
    assert_eq!(garbled.body["current_page"], 1);
    assert_eq!(garbled.body["data"][0]["email"], "admin@example.com");

    Ok(())
}

#[tokio::test]
async fn non_numeric_user_id_is_a_json_not_found() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, admin) = t.user("Admin", "admin@example.com", "admin").await?;

    let resp = t.get("/users/abc/edit", &admin).await?;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.body["error"], "not_found");

    let resp = t.form(Method::PUT, "/users/abc", &admin, "name=Ghost&role=user").await?;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.body["error"], "not_found");

    Ok(())
}

#[tokio::test]
async fn wrongly_typed_field_is_a_field_error() -> Result<()> {
    let t = TestApp::new().await?;
    let (_, admin) = t.user("Admin", "admin@example.com", "admin").await?;
    let (target, _) = t.user("Target", "target@example.com", "user").await?;

    let resp = t
        .json(
            Method::PUT,
            &format!("/users/{target}"),
            Some(&admin),
            json!({"name": 5, "role": "admin"}),
        )
        .await?;
    assert_eq!(resp.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(resp.body["errors"]["name"][0], "The name field is invalid.");

    let user = repository::users::load(&t.pool, target).await?;
    assert_eq!(user.roles, vec!["user".to_string()]);

    Ok(())
}

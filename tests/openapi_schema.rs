use anyhow::Result;
use serde_json::Value;

use backoffice::docs::build_openapi;

#[test]
fn openapi_documents_user_administration() -> Result<()> {
    let doc: Value = serde_json::to_value(build_openapi(8000))?;

    let paths = doc["paths"].as_object().expect("paths object");
    for path in ["/users", "/users/{id}", "/users/{id}/edit", "/clients", "/projects/{id}", "/tasks", "/auth/login"] {
        assert!(paths.contains_key(path), "missing path {path}");
    }

    let user_item = &doc["paths"]["/users/{id}"];
    assert!(user_item.get("put").is_some());
    assert!(user_item.get("delete").is_some());

    assert_eq!(doc["components"]["securitySchemes"]["bearerAuth"]["scheme"], "bearer");
    assert!(doc["components"]["schemas"].get("UserPage").is_some());
    assert_eq!(doc["servers"][0]["url"], "http://localhost:8000");

    Ok(())
}

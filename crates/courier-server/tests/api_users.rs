mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::{json_request, setup_app};
use serde_json::json;

#[tokio::test]
async fn test_health() {
    let app = setup_app();
    let (status, json) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_create_and_read_back_user() {
    let app = setup_app();

    let (status, created) = app
        .post_json(
            "/users",
            json!({ "email": "  Alice@Example.COM ", "name": " Alice " }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["email"], "alice@example.com");
    assert_eq!(created["name"], "Alice");
    assert!(created["created_at"].is_string());

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = app.get(&format!("/users/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_created_ids_are_unique() {
    let app = setup_app();
    let a = app.create_user("a@example.com", "A").await;
    let b = app.create_user("b@example.com", "B").await;
    assert_ne!(a, b);
}

#[tokio::test]
async fn test_create_user_validation() {
    let app = setup_app();

    let (status, json) = app
        .post_json("/users", json!({ "email": "not-an-email", "name": "" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = json["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"name"));
    assert_eq!(app.count_rows("users"), 0);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = setup_app();

    let (status, json) = app
        .send(json_request("POST", "/users", "{\"email\": ".to_string()))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());

    let (status, _) = app.post_json("/users", json!({ "name": "No Email" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_body_is_payload_too_large() {
    let app = setup_app();
    let name = "x".repeat(3 * 1024 * 1024);
    let body = json!({ "email": "big@example.com", "name": name });

    let (status, json) = app.post_json("/users", body).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(json["error"].is_string());
    assert_eq!(app.count_rows("users"), 0);
}

#[tokio::test]
async fn test_missing_content_type_is_unsupported_media_type() {
    let app = setup_app();
    let body = json!({ "email": "plain@example.com", "name": "Plain" }).to_string();

    let (status, json) = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/users")
                .body(Body::from(body))
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(json["error"].is_string());
    assert_eq!(app.count_rows("users"), 0);
}

#[tokio::test]
async fn test_duplicate_email_conflict() {
    let app = setup_app();
    app.create_user("dup@example.com", "First").await;

    let (status, json) = app
        .post_json("/users", json!({ "email": "DUP@example.com", "name": "Second" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(json["error"].as_str().unwrap().contains("dup@example.com"));
    assert_eq!(app.count_rows("users"), 1);
}

#[tokio::test]
async fn test_get_missing_and_malformed_user() {
    let app = setup_app();

    let (status, json) = app
        .get("/users/00000000-0000-4000-8000-000000000000")
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].is_string());

    let (status, json) = app.get("/users/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_list_users_with_paging() {
    let app = setup_app();
    let mut ids = Vec::new();
    for i in 0..4 {
        ids.push(app.create_user(&format!("u{i}@example.com"), "U").await);
    }

    let (status, json) = app.get("/users").await;
    assert_eq!(status, StatusCode::OK);
    let listed: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["id"].as_str().unwrap())
        .collect();
    assert_eq!(listed, ids);

    let (status, json) = app.get("/users?limit=2&offset=1").await;
    assert_eq!(status, StatusCode::OK);
    let page: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["id"].as_str().unwrap())
        .collect();
    assert_eq!(page, ids[1..3]);

    let (status, _) = app.get("/users?limit=lots").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_users_by_email() {
    let app = setup_app();
    let id = app.create_user("find.me@example.com", "Findable").await;
    app.create_user("other@example.com", "Other").await;

    let (status, json) = app.get("/users?email=Find.Me@example.com").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["id"], id.as_str());

    let (status, _) = app.get("/users?email=nobody@example.com").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_blank_email_filter_lists_all_users() {
    let app = setup_app();
    let first = app.create_user("first@example.com", "First").await;
    let second = app.create_user("second@example.com", "Second").await;

    for uri in ["/users?email=", "/users?email=%20%20"] {
        let (status, json) = app.get(uri).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        let listed: Vec<&str> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["id"].as_str().unwrap())
            .collect();
        assert_eq!(listed, [first.as_str(), second.as_str()], "{uri}");
    }
}

#[tokio::test]
async fn test_update_user_is_partial_and_idempotent() {
    let app = setup_app();
    let id = app.create_user("alice@example.com", "Alice").await;
    let uri = format!("/users/{id}");

    let (status, first) = app.patch_json(&uri, json!({ "name": "Alice L." })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["name"], "Alice L.");
    assert_eq!(first["email"], "alice@example.com");

    let (status, second) = app.patch_json(&uri, json!({ "name": "Alice L." })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, second);

    let (status, unchanged) = app.patch_json(&uri, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(unchanged, second);
}

#[tokio::test]
async fn test_update_user_errors() {
    let app = setup_app();
    app.create_user("taken@example.com", "Taken").await;
    let id = app.create_user("mine@example.com", "Mine").await;

    let (status, _) = app
        .patch_json(&format!("/users/{id}"), json!({ "email": "taken@example.com" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = app
        .patch_json(&format!("/users/{id}"), json!({ "email": "broken" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["fields"][0]["field"], "email");

    let (status, _) = app
        .patch_json(
            "/users/00000000-0000-4000-8000-000000000000",
            json!({ "name": "Ghost" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, fetched) = app.get(&format!("/users/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["email"], "mine@example.com");
}

#[tokio::test]
async fn test_delete_user_twice() {
    let app = setup_app();
    let id = app.create_user("gone@example.com", "Gone").await;
    let uri = format!("/users/{id}");

    let (status, body) = app.delete(&uri).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, _) = app.delete(&uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get(&uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_route_uses_error_envelope() {
    let app = setup_app();
    let (status, json) = app.get("/nowhere").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("/nowhere"));
}

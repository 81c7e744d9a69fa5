#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use courier_db::{create_pool, run_migrations, DbPool, DbRuntimeSettings};
use courier_server::{app, AppState};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// A router over a fresh on-disk database. The directory lives as long as
/// the harness.
pub struct TestApp {
    pub router: Router,
    pub pool: DbPool,
    _dir: TempDir,
}

pub fn setup_app() -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("courier.db");
    let pool = create_pool(path.to_str().unwrap(), DbRuntimeSettings::default()).unwrap();
    {
        let conn = pool.get().unwrap();
        run_migrations(&conn).unwrap();
    }

    TestApp {
        router: app(AppState { pool: pool.clone() }),
        pool,
        _dir: dir,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("GET")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("DELETE")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(json_request("POST", uri, body.to_string())).await
    }

    pub async fn patch_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(json_request("PATCH", uri, body.to_string())).await
    }

    /// Creates a user and returns its id.
    pub async fn create_user(&self, email: &str, name: &str) -> String {
        let (status, json) = self
            .post_json("/users", serde_json::json!({ "email": email, "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create user failed: {json}");
        json["id"].as_str().unwrap().to_string()
    }

    /// Sends a message and returns its id.
    pub async fn send_message(&self, sender: &str, recipients: &[&str], content: &str) -> String {
        let (status, json) = self
            .post_json(
                "/messages",
                serde_json::json!({
                    "sender_id": sender,
                    "recipient_ids": recipients,
                    "content": content,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "send message failed: {json}");
        json["id"].as_str().unwrap().to_string()
    }

    pub fn count_rows(&self, table: &str) -> i64 {
        let conn = self.pool.get().unwrap();
        conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
            row.get(0)
        })
        .unwrap()
    }
}

pub fn json_request(method: &str, uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

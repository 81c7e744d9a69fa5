//! Courier server library logic.

pub mod api;
pub mod api_messages;
pub mod api_users;
pub mod config;
pub mod session;
pub mod startup;

use api::ApiError;
use axum::{
    extract::DefaultBodyLimit,
    http::Uri,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use courier_db::DbPool;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
}

/// Maximum request body size (2 MiB).
const MAX_REQUEST_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn fallback(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {}", uri.path()))
}

/// Builds the application router with all routes.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/users",
            post(api_users::create_user_handler).get(api_users::list_users_handler),
        )
        .route(
            "/users/{id}",
            get(api_users::get_user_handler)
                .patch(api_users::update_user_handler)
                .delete(api_users::delete_user_handler),
        )
        .route(
            "/users/{id}/messages/sent",
            get(api_messages::list_sent_handler),
        )
        .route(
            "/users/{id}/messages/inbox",
            get(api_messages::list_inbox_handler),
        )
        .route(
            "/users/{id}/messages/unread",
            get(api_messages::list_unread_handler),
        )
        .route("/messages", post(api_messages::send_message_handler))
        .route(
            "/messages/{id}",
            get(api_messages::get_message_handler).delete(api_messages::delete_message_handler),
        )
        .route(
            "/messages/{id}/read",
            patch(api_messages::mark_read_handler),
        )
        .fallback(fallback)
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(Extension(Arc::new(state)))
}

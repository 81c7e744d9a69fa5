//! User API handlers.

use crate::{api::ApiError, session, AppState};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Json, Path, Query,
    },
    http::StatusCode,
};
use courier_types::{ListParams, Page, UserCreate, UserFilter, UserPublic, UserUpdate, Validate};
use std::sync::Arc;
use uuid::Uuid;

/// Handler for `POST /users`.
pub async fn create_user_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<UserCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<UserPublic>), ApiError> {
    let Json(payload) = payload?;
    let new_user = payload.validate()?;

    let user = session::write(&state.pool, move |conn| {
        Ok(courier_users::create_user(conn, &new_user)?)
    })
    .await?;

    tracing::info!(user_id = %user.id, "user created");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Handler for `GET /users`.
///
/// With a non-blank `?email=` the response is the single matching user, or
/// 404. A blank filter lists all users.
pub async fn list_users_handler(
    Extension(state): Extension<Arc<AppState>>,
    filter: Result<Query<UserFilter>, QueryRejection>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<UserPublic>>, ApiError> {
    let Query(filter) = filter?;
    let Query(params) = params?;
    let page = Page::from(params);

    let email = filter.email.filter(|e| !e.trim().is_empty());

    let users = session::read(&state.pool, move |conn| match email {
        Some(email) => {
            let user = courier_users::get_user_by_email(conn, &email)?
                .ok_or_else(|| ApiError::NotFound(format!("no user with email {}", email)))?;
            Ok(vec![user])
        }
        None => Ok(courier_users::list_users(conn, page)?),
    })
    .await?;

    Ok(Json(users.into_iter().map(UserPublic::from).collect()))
}

/// Handler for `GET /users/{id}`.
pub async fn get_user_handler(
    Extension(state): Extension<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<UserPublic>, ApiError> {
    let Path(id) = id?;
    let user =
        session::read(&state.pool, move |conn| Ok(courier_users::get_user(conn, id)?)).await?;
    Ok(Json(user.into()))
}

/// Handler for `PATCH /users/{id}`.
///
/// Absent fields keep their stored values.
pub async fn update_user_handler(
    Extension(state): Extension<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UserUpdate>, JsonRejection>,
) -> Result<Json<UserPublic>, ApiError> {
    let Path(id) = id?;
    let Json(payload) = payload?;
    let changes = payload.validate()?;

    let user = session::write(&state.pool, move |conn| {
        Ok(courier_users::update_user(conn, id, &changes)?)
    })
    .await?;

    tracing::info!(user_id = %user.id, "user updated");
    Ok(Json(user.into()))
}

/// Handler for `DELETE /users/{id}`.
pub async fn delete_user_handler(
    Extension(state): Extension<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    session::write(&state.pool, move |conn| {
        Ok(courier_users::delete_user(conn, id)?)
    })
    .await?;

    tracing::info!(user_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

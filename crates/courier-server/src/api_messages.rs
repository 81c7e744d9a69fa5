//! Message API handlers: sending, reading, mailbox listings and read receipts.

use crate::{api::ApiError, session, AppState};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Json, Path, Query,
    },
    http::StatusCode,
};
use courier_messages::MessageError;
use courier_types::{
    InboxMessage, ListParams, MessageCreate, MessageDetail, Page, ReadReceiptParams,
    RecipientStatus, SentMessage, Validate,
};
use std::sync::Arc;
use uuid::Uuid;

/// Handler for `POST /messages`.
pub async fn send_message_handler(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<MessageCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<SentMessage>), ApiError> {
    let Json(payload) = payload?;
    let new_message = payload.validate()?;

    let sent = session::write(&state.pool, move |conn| {
        Ok(courier_messages::send_message(conn, &new_message)?)
    })
    .await?;

    tracing::info!(
        message_id = %sent.message.id,
        sender_id = %sent.message.sender_id,
        recipients = sent.recipient_ids.len(),
        "message sent"
    );
    Ok((StatusCode::CREATED, Json(sent.into())))
}

/// Handler for `GET /messages/{id}`.
pub async fn get_message_handler(
    Extension(state): Extension<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<MessageDetail>, ApiError> {
    let Path(id) = id?;
    let detail = session::read(&state.pool, move |conn| {
        Ok(courier_messages::get_message_detail(conn, id)?)
    })
    .await?;
    Ok(Json(detail.into()))
}

/// Handler for `DELETE /messages/{id}`.
pub async fn delete_message_handler(
    Extension(state): Extension<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    session::write(&state.pool, move |conn| {
        Ok(courier_messages::delete_message(conn, id)?)
    })
    .await?;

    tracing::info!(message_id = %id, "message deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for `PATCH /messages/{id}/read?recipient_id=`.
pub async fn mark_read_handler(
    Extension(state): Extension<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
    params: Result<Query<ReadReceiptParams>, QueryRejection>,
) -> Result<Json<RecipientStatus>, ApiError> {
    let Path(message_id) = id?;
    let Query(ReadReceiptParams { recipient_id }) = params?;

    let record = session::write(&state.pool, move |conn| {
        Ok(courier_messages::mark_read(conn, message_id, recipient_id)?)
    })
    .await?;

    tracing::info!(%message_id, %recipient_id, "message marked read");
    Ok(Json(record.into()))
}

/// Handler for `GET /users/{id}/messages/sent`.
pub async fn list_sent_handler(
    Extension(state): Extension<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<SentMessage>>, ApiError> {
    let Path(user_id) = id?;
    let Query(params) = params?;
    let page = Page::from(params);

    let sent = session::read(&state.pool, move |conn| {
        courier_messages::list_sent(conn, user_id, page).map_err(listing_error)
    })
    .await?;
    Ok(Json(sent.into_iter().map(SentMessage::from).collect()))
}

/// Handler for `GET /users/{id}/messages/inbox`.
pub async fn list_inbox_handler(
    Extension(state): Extension<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<InboxMessage>>, ApiError> {
    let Path(user_id) = id?;
    let Query(params) = params?;
    let page = Page::from(params);

    let inbox = session::read(&state.pool, move |conn| {
        courier_messages::list_inbox(conn, user_id, page).map_err(listing_error)
    })
    .await?;
    Ok(Json(inbox.into_iter().map(InboxMessage::from).collect()))
}

/// Handler for `GET /users/{id}/messages/unread`.
pub async fn list_unread_handler(
    Extension(state): Extension<Arc<AppState>>,
    id: Result<Path<Uuid>, PathRejection>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Vec<InboxMessage>>, ApiError> {
    let Path(user_id) = id?;
    let Query(params) = params?;
    let page = Page::from(params);

    let unread = session::read(&state.pool, move |conn| {
        courier_messages::list_unread(conn, user_id, page).map_err(listing_error)
    })
    .await?;
    Ok(Json(unread.into_iter().map(InboxMessage::from).collect()))
}

/// On a mailbox route the user is the addressed resource, so an unknown
/// user is a 404 rather than the 422 a send reports.
fn listing_error(e: MessageError) -> ApiError {
    match e {
        MessageError::UnknownUser(_) => ApiError::NotFound(e.to_string()),
        other => other.into(),
    }
}

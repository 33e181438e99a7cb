/// Direct message endpoints
///
/// A conversation is the unordered pair {caller, other user}. Recipients are
/// not looked up: a message to a deleted user is stored like any other.
///
/// # Endpoints
///
/// - `GET /api/messages/unread/counts` - Unread counts keyed by sender ID
/// - `GET /api/messages/:user_id` - Conversation, oldest first
/// - `POST /api/messages/:user_id` - Send a message
/// - `POST /api/messages/:user_id/read` - Mark messages from that user read

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use teamboard_shared::{
    auth::gate::Principal,
    models::message::{Message, NewMessage},
    realtime::events::{Room, MESSAGE_NEW},
    store::UnreadCounts,
};
use tracing::debug;
use validator::Validate;

/// Send message request
#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(max = 10000, message = "Message must be at most 10000 characters"))]
    pub body: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// Unread counts for the caller
///
/// ```json
/// { "<sender id>": 3 }
/// ```
pub async fn unread_counts(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<UnreadCounts>> {
    let counts = state.repo().unread_counts(&principal.id).await?;
    Ok(Json(counts))
}

/// Conversation between the caller and `user_id`
pub async fn conversation(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<Message>>> {
    let messages = state.repo().conversation(&principal.id, &user_id).await?;
    Ok(Json(messages))
}

/// Send a message to `user_id`
///
/// Emits `msg:new` with the stored message to `user:<user_id>`.
///
/// # Errors
///
/// - `400 Bad Request`: Empty body
pub async fn send_message(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(user_id): Path<String>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    req.validate()?;

    let body = req
        .body
        .filter(|b| !b.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Message body required".to_string()))?;

    let message = state
        .repo()
        .create_message(NewMessage {
            from: principal.id.clone(),
            to: user_id,
            body,
        })
        .await?;

    debug!(message_id = %message.id, from = %message.from, to = %message.to, "Message sent");

    state
        .hub
        .publish(&Room::user(&message.to), MESSAGE_NEW, &message)
        .await;

    Ok((StatusCode::CREATED, Json(message)))
}

/// Mark everything `user_id` sent to the caller as read
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<OkResponse>> {
    let marked = state
        .repo()
        .mark_conversation_read(&principal.id, &user_id)
        .await?;

    debug!(reader = %principal.id, other = %user_id, marked, "Conversation marked read");

    Ok(Json(OkResponse { ok: true }))
}

//! Direct message endpoints

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
};

use super::dto::{ConversationResponse, FeedParams, MessageResponse, SendMessageRequest};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::metrics::{HTTP_REQUEST_DURATION_SECONDS, HTTP_REQUESTS_TOTAL};

/// Create messages router
pub fn messages_router() -> Router<AppState> {
    Router::new()
        .route("/messages", post(send_message))
        .route("/messages/conversations", get(list_conversations))
        .route("/messages/unread-count", get(unread_count))
        .route("/messages/with/:user_id", get(conversation))
        .route("/messages/with/:user_id/read", post(mark_read))
}

async fn send_message(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/messages"])
        .start_timer();

    let message = state
        .messages()
        .send(&session.user_id, &request.recipient_id, &request.body)
        .await?;

    timer.observe_duration();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&["POST", "/messages", "200"])
        .inc();

    Ok(Json(message.into()))
}

async fn list_conversations(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Vec<ConversationResponse>>, AppError> {
    let conversations = state.messages().conversations(&session.user_id).await?;
    Ok(Json(conversations.into_iter().map(Into::into).collect()))
}

async fn conversation(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(user_id): Path<String>,
    Query(params): Query<FeedParams>,
) -> Result<Json<Vec<MessageResponse>>, AppError> {
    let limit = super::clamp_limit(params.limit);
    let messages = state
        .messages()
        .conversation(&session.user_id, &user_id, limit)
        .await?;
    Ok(Json(messages.into_iter().map(Into::into).collect()))
}

async fn mark_read(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let marked = state
        .messages()
        .mark_read(&session.user_id, &user_id)
        .await?;
    Ok(Json(serde_json::json!({ "marked": marked })))
}

async fn unread_count(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<serde_json::Value>, AppError> {
    let unread = state.messages().unread_count(&session.user_id).await?;
    Ok(Json(serde_json::json!({ "unread": unread })))
}

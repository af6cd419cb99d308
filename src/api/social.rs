//! Social graph and moderation endpoints

use axum::{
    Router,
    extract::{Path, State},
    response::Json,
    routing::{delete, get, post},
};

use super::dto::{
    CreateReportRequest, FriendRequestBody, FriendshipResponse, RelationshipResponse,
    ReportResponse, UserResponse,
};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;

/// Create social graph router
pub fn social_router() -> Router<AppState> {
    Router::new()
        .route("/social/friend-requests", post(send_friend_request))
        .route("/social/friend-requests", get(pending_requests))
        .route(
            "/social/friend-requests/:requester_id/accept",
            post(accept_friend_request),
        )
        .route(
            "/social/friend-requests/:requester_id/decline",
            post(decline_friend_request),
        )
        .route("/social/friends", get(list_friends))
        .route("/social/friends/:user_id", delete(unfriend))
        .route("/social/follows/:user_id", post(follow))
        .route("/social/follows/:user_id", delete(unfollow))
        .route("/social/followers", get(list_followers))
        .route("/social/following", get(list_following))
        .route("/social/relationship/:user_id", get(relationship))
}

/// Create moderation router (blocks and reports)
pub fn moderation_router() -> Router<AppState> {
    Router::new()
        .route("/moderation/blocks", get(list_blocks))
        .route("/moderation/blocks/:user_id", post(block))
        .route("/moderation/blocks/:user_id", delete(unblock))
        .route("/moderation/reports", post(create_report))
}

async fn send_friend_request(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<FriendRequestBody>,
) -> Result<Json<FriendshipResponse>, AppError> {
    let friendship = state
        .social()
        .send_friend_request(&session.user_id, &request.addressee_id)
        .await?;
    Ok(Json(friendship.into()))
}

async fn pending_requests(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Vec<FriendshipResponse>>, AppError> {
    let requests = state.social().pending_requests(&session.user_id).await?;
    Ok(Json(requests.into_iter().map(Into::into).collect()))
}

async fn accept_friend_request(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(requester_id): Path<String>,
) -> Result<Json<FriendshipResponse>, AppError> {
    let friendship = state
        .social()
        .accept_friend_request(&session.user_id, &requester_id)
        .await?;
    Ok(Json(friendship.into()))
}

async fn decline_friend_request(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(requester_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .social()
        .decline_friend_request(&session.user_id, &requester_id)
        .await?;
    Ok(Json(serde_json::json!({ "declined": true })))
}

async fn list_friends(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let friends = state.social().friends(&session.user_id).await?;
    Ok(Json(friends.into_iter().map(Into::into).collect()))
}

async fn unfriend(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.social().unfriend(&session.user_id, &user_id).await?;
    Ok(Json(serde_json::json!({ "removed": true })))
}

async fn follow(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let created = state.social().follow(&session.user_id, &user_id).await?;
    Ok(Json(serde_json::json!({ "following": true, "created": created })))
}

async fn unfollow(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let removed = state.social().unfollow(&session.user_id, &user_id).await?;
    Ok(Json(serde_json::json!({ "following": false, "removed": removed })))
}

async fn list_followers(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let followers = state.social().followers(&session.user_id).await?;
    Ok(Json(followers.into_iter().map(Into::into).collect()))
}

async fn list_following(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let following = state.social().following(&session.user_id).await?;
    Ok(Json(following.into_iter().map(Into::into).collect()))
}

async fn relationship(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(user_id): Path<String>,
) -> Result<Json<RelationshipResponse>, AppError> {
    let relationship = state
        .social()
        .relationship(&session.user_id, &user_id)
        .await?;
    Ok(Json(relationship.into()))
}

async fn block(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.moderation().block(&session.user_id, &user_id).await?;
    Ok(Json(serde_json::json!({ "blocked": true })))
}

async fn unblock(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let removed = state
        .moderation()
        .unblock(&session.user_id, &user_id)
        .await?;
    Ok(Json(serde_json::json!({ "blocked": false, "removed": removed })))
}

async fn list_blocks(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let blocked = state.moderation().blocked_users(&session.user_id).await?;
    Ok(Json(blocked.into_iter().map(Into::into).collect()))
}

async fn create_report(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<CreateReportRequest>,
) -> Result<Json<ReportResponse>, AppError> {
    let report = state
        .moderation()
        .report(
            &session.user_id,
            &request.subject_user_id,
            request.testimony_id.as_deref(),
            &request.reason,
        )
        .await?;
    Ok(Json(report.into()))
}

//! Profile and church endpoints

use axum::{
    Router,
    extract::{Path, State},
    response::Json,
    routing::{delete, get, patch, post, put},
};

use super::dto::{
    ChurchResponse, JoinChurchRequest, UpdatePrivacyRequest, UpdateProfileRequest, UserResponse,
};
use crate::AppState;
use crate::auth::{CurrentUser, MaybeUser};
use crate::error::AppError;

/// Create profiles router
pub fn profiles_router() -> Router<AppState> {
    Router::new()
        .route("/profiles/me", get(get_own_profile))
        .route("/profiles/me", patch(update_profile))
        .route("/profiles/me/privacy", put(update_privacy))
        .route("/profiles/me/church", post(join_church))
        .route("/profiles/me/church", delete(leave_church))
        .route("/profiles/:id", get(get_profile))
        .route("/profiles/by-username/:username", get(get_profile_by_username))
        .route("/churches", get(list_churches))
}

async fn get_own_profile(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .db
        .get_user(&session.user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(user.into()))
}

async fn get_profile(
    State(state): State<AppState>,
    MaybeUser(session): MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let viewer = session.as_ref().map(|session| session.user_id.as_str());
    let user = state.profiles().get_profile(viewer, &id).await?;
    Ok(Json(user.into()))
}

async fn get_profile_by_username(
    State(state): State<AppState>,
    MaybeUser(session): MaybeUser,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>, AppError> {
    let viewer = session.as_ref().map(|session| session.user_id.as_str());
    let user = state
        .profiles()
        .get_profile_by_username(viewer, &username)
        .await?;
    Ok(Json(user.into()))
}

async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .profiles()
        .update_profile(
            &session.user_id,
            request.display_name,
            request.bio,
            request.avatar_url,
        )
        .await?;
    Ok(Json(user.into()))
}

async fn update_privacy(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<UpdatePrivacyRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .profiles()
        .update_privacy(
            &session.user_id,
            &request.profile_visibility,
            &request.message_privacy,
        )
        .await?;
    Ok(Json(user.into()))
}

async fn join_church(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<JoinChurchRequest>,
) -> Result<Json<ChurchResponse>, AppError> {
    let church = state
        .profiles()
        .join_church(&session.user_id, &request.name)
        .await?;
    Ok(Json(church.into()))
}

async fn leave_church(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
) -> Result<Json<serde_json::Value>, AppError> {
    state.profiles().leave_church(&session.user_id).await?;
    Ok(Json(serde_json::json!({ "left": true })))
}

async fn list_churches(
    State(state): State<AppState>,
) -> Result<Json<Vec<ChurchResponse>>, AppError> {
    let churches = state.profiles().list_churches().await?;
    Ok(Json(churches.into_iter().map(Into::into).collect()))
}

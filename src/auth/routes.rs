//! Registration and login endpoints

use axum::{Router, extract::State, response::Json, routing::post};
use chrono::{Duration, Utc};

use super::session::{Session, create_session_token};
use crate::AppState;
use crate::api::{LoginRequest, RegisterRequest, TokenResponse};
use crate::data::User;
use crate::error::AppError;

/// Create auth router
pub fn auth_router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

fn issue_token(state: &AppState, user: &User) -> Result<TokenResponse, AppError> {
    let now = Utc::now();
    let session = Session {
        user_id: user.id.clone(),
        username: user.username.clone(),
        created_at: now,
        expires_at: now + Duration::seconds(state.config.auth.session_max_age),
    };

    let token = create_session_token(&session, &state.config.auth.session_secret)?;
    Ok(TokenResponse {
        token,
        user: user.clone().into(),
    })
}

async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = state
        .profiles()
        .register(&request.username, &request.password, request.display_name)
        .await?;

    Ok(Json(issue_token(&state, &user)?))
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = state
        .profiles()
        .authenticate(&request.username, &request.password)
        .await?;

    Ok(Json(issue_token(&state, &user)?))
}

async fn logout() -> Json<serde_json::Value> {
    // Tokens are stateless; logout is client-side discard.
    Json(serde_json::json!({ "logged_out": true }))
}

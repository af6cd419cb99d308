//! Testimony endpoints

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json,
    routing::{delete, get, patch, post},
};

use super::dto::{
    CreateTestimonyRequest, FeedParams, GenerateTestimonyRequest, GenerateTestimonyResponse,
    TestimonyResponse, UpdateTestimonyRequest,
};
use crate::AppState;
use crate::auth::CurrentUser;
use crate::error::AppError;
use crate::metrics::{HTTP_REQUEST_DURATION_SECONDS, HTTP_REQUESTS_TOTAL};

/// Create testimonies router
pub fn testimonies_router() -> Router<AppState> {
    Router::new()
        .route("/testimonies", post(create_testimony))
        .route("/testimonies", get(feed))
        .route("/testimonies/generate", post(generate_testimony))
        .route("/testimonies/:id", get(get_testimony))
        .route("/testimonies/:id", patch(update_testimony))
        .route("/testimonies/:id", delete(delete_testimony))
        .route("/testimonies/by-user/:user_id", get(list_for_user))
}

async fn create_testimony(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<CreateTestimonyRequest>,
) -> Result<Json<TestimonyResponse>, AppError> {
    let testimony = state
        .testimonies()
        .create(
            &session.user_id,
            &request.title,
            &request.content,
            &request.visibility,
            false,
        )
        .await?;
    Ok(Json(testimony.into()))
}

async fn get_testimony(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<TestimonyResponse>, AppError> {
    let testimony = state.testimonies().get(&session.user_id, &id).await?;
    Ok(Json(testimony.into()))
}

async fn update_testimony(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateTestimonyRequest>,
) -> Result<Json<TestimonyResponse>, AppError> {
    let testimony = state
        .testimonies()
        .update(
            &session.user_id,
            &id,
            request.title.as_deref(),
            request.content.as_deref(),
            request.visibility.as_deref(),
        )
        .await?;
    Ok(Json(testimony.into()))
}

async fn delete_testimony(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.testimonies().delete(&session.user_id, &id).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

async fn feed(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Query(params): Query<FeedParams>,
) -> Result<Json<Vec<TestimonyResponse>>, AppError> {
    let timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/testimonies"])
        .start_timer();

    let limit = super::clamp_limit(params.limit);
    let testimonies = state
        .testimonies()
        .feed(&session.user_id, limit, params.max_id.as_deref())
        .await?;

    timer.observe_duration();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&["GET", "/testimonies", "200"])
        .inc();

    Ok(Json(testimonies.into_iter().map(Into::into).collect()))
}

async fn list_for_user(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Path(user_id): Path<String>,
    Query(params): Query<FeedParams>,
) -> Result<Json<Vec<TestimonyResponse>>, AppError> {
    let limit = super::clamp_limit(params.limit);
    let testimonies = state
        .testimonies()
        .list_for_user(&session.user_id, &user_id, limit)
        .await?;
    Ok(Json(testimonies.into_iter().map(Into::into).collect()))
}

async fn generate_testimony(
    State(state): State<AppState>,
    CurrentUser(session): CurrentUser,
    Json(request): Json<GenerateTestimonyRequest>,
) -> Result<Json<GenerateTestimonyResponse>, AppError> {
    let draft = state
        .testimonies()
        .generate_draft(&session.user_id, &request.story, request.tone.as_deref())
        .await?;
    Ok(Json(GenerateTestimonyResponse { draft }))
}

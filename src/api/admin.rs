//! Admin dashboard endpoints
//!
//! All routes here sit behind the `require_admin` middleware applied
//! in the top-level router composition.

use axum::{
    Router,
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
};

use super::dto::{
    AdminStatsResponse, CloseReportRequest, PageParams, ReportQueueParams, ReportResponse,
    UserResponse,
};
use crate::AppState;
use crate::data::ReportStatus;
use crate::error::AppError;

/// Create admin router
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/reports", get(list_reports))
        .route("/reports/:id/close", post(close_report))
        .route("/users", get(list_users))
        .route("/stats", get(stats))
}

async fn list_reports(
    State(state): State<AppState>,
    Query(params): Query<ReportQueueParams>,
) -> Result<Json<Vec<ReportResponse>>, AppError> {
    let status = match params.status.as_deref() {
        None => ReportStatus::Open,
        Some(raw) => ReportStatus::parse(raw).ok_or_else(|| {
            AppError::Validation(
                "status must be one of: open, resolved, dismissed".to_string(),
            )
        })?,
    };

    let limit = super::clamp_limit(params.limit);
    let reports = state
        .moderation()
        .list_reports(status, limit, params.offset.unwrap_or(0))
        .await?;
    Ok(Json(reports.into_iter().map(Into::into).collect()))
}

async fn close_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<CloseReportRequest>,
) -> Result<Json<ReportResponse>, AppError> {
    let status = ReportStatus::parse(&request.status).ok_or_else(|| {
        AppError::Validation("status must be one of: resolved, dismissed".to_string())
    })?;

    let report = state.moderation().close_report(&id, status).await?;
    Ok(Json(report.into()))
}

async fn list_users(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    let limit = super::clamp_limit(params.limit);
    let users = state
        .moderation()
        .list_users(limit, params.offset.unwrap_or(0))
        .await?;
    Ok(Json(users.into_iter().map(Into::into).collect()))
}

async fn stats(State(state): State<AppState>) -> Result<Json<AdminStatsResponse>, AppError> {
    let rate_limit_stats = state.rate_limiter.stats().await;

    Ok(Json(AdminStatsResponse {
        users: state.db.count_users().await?,
        testimonies: state.db.count_testimonies().await?,
        messages: state.db.count_messages().await?,
        open_reports: state.db.count_open_reports().await?,
        rate_limit_tracked_keys: rate_limit_stats.total_entries,
    }))
}

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use chrono::{NaiveTime, Utc};
use service_core::error::AppError;

use crate::dtos::SiteParams;
use crate::services::reporting;
use crate::AppState;

pub async fn get_summary(
    State(state): State<AppState>,
    Query(params): Query<SiteParams>,
) -> Result<impl IntoResponse, AppError> {
    let items = state.line_items.list(params.site_name).await?;
    Ok(Json(reporting::summarize(&items)))
}

pub async fn list_sites(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.line_items.sites().await?))
}

/// Per-site totals, sites ascending.
pub async fn list_site_summaries(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let items = state.line_items.list(None).await?;
    Ok(Json(reporting::summarize_by_site(&items)))
}

pub async fn list_site_items(
    State(state): State<AppState>,
    Query(params): Query<SiteParams>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.line_items.list(params.site_name).await?))
}

/// Overdue items as of midnight UTC today.
pub async fn get_alerts(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let items = state.line_items.list(None).await?;
    let today_start = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
    Ok(Json(reporting::alert_cards(&items, today_start)))
}

pub async fn list_used_materials(
    State(state): State<AppState>,
    Query(params): Query<SiteParams>,
) -> Result<impl IntoResponse, AppError> {
    let items = state.line_items.list(params.site_name).await?;
    Ok(Json(reporting::unique_materials(&items)))
}

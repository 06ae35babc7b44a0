use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use super::parse_photo_type;
use crate::dtos::{
    CreateLineItemRequest, MessageResponse, PhotoParams, PhotosResponse, UpdateLineItemResponse,
};
use crate::services::tracker::LineItemPatch;
use crate::utils::ValidatedJson;
use crate::AppState;

pub async fn create_line_item(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateLineItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    let item = state.line_items.create(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_line_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.line_items.get(&id).await?))
}

pub async fn update_line_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(patch): ValidatedJson<LineItemPatch>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.line_items.update(&id, &patch).await?;
    Ok(Json(UpdateLineItemResponse {
        history_added: outcome.history.len(),
        date_changes: outcome.date_changes,
        item: outcome.item,
    }))
}

pub async fn delete_line_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.line_items.delete(&id).await?;
    Ok(Json(MessageResponse::new("Line item deleted successfully")))
}

pub async fn get_line_item_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.line_items.history(&id).await?))
}

pub async fn get_line_item_photos(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<PhotoParams>,
) -> Result<impl IntoResponse, AppError> {
    let photo_type = parse_photo_type(params.photo_type.as_deref())?;
    let photos = state.line_items.photos(&id, photo_type).await?;
    Ok(Json(PhotosResponse {
        line_item_id: id,
        photo_type,
        count: photos.len(),
        photos,
    }))
}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::dtos::{
    CreateMaterialRequest, MaterialListParams, MessageResponse, UpdateMaterialRequest,
};
use crate::utils::ValidatedJson;
use crate::AppState;

pub async fn list_materials(
    State(state): State<AppState>,
    Query(params): Query<MaterialListParams>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.materials.list(&params.into()).await?))
}

pub async fn list_material_categories(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.materials.categories().await?))
}

pub async fn create_material(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<CreateMaterialRequest>,
) -> Result<impl IntoResponse, AppError> {
    let material = state
        .materials
        .create(
            &payload.name,
            payload.unit,
            payload.description,
            payload.category,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(material)))
}

pub async fn get_material(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.materials.get(&id).await?))
}

pub async fn update_material(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateMaterialRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.materials.update(&id, payload.into()).await?))
}

pub async fn delete_material(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.materials.delete(&id).await?;
    Ok(Json(MessageResponse::new("Material deleted successfully")))
}

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use service_core::error::AppError;

use super::form::Form;
use super::parse_photo_type;
use crate::dtos::{
    DeletePhotoRequest, ImportRejectedResponse, ImportResponse, PhotoDeleteResponse,
    PhotoUploadResponse, SampleUploadResponse,
};
use crate::services::import;
use crate::utils::ValidatedJson;
use crate::AppState;

pub async fn upload_photos(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut form = Form::read(multipart).await?;
    let line_item_id = form.require("lineItemId")?;
    let photo_type = parse_photo_type(form.text("photoType").as_deref())?;
    let files = form.take_files("photos");

    let upload = state
        .line_items
        .upload_photos(&line_item_id, photo_type, files, state.photo_limits)
        .await?;

    Ok(Json(PhotoUploadResponse {
        message: "Photos uploaded successfully".to_string(),
        photos: upload.photos,
        material_status_updated: upload.material_status_updated,
        line_item: upload.item,
    }))
}

pub async fn delete_photo(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<DeletePhotoRequest>,
) -> Result<impl IntoResponse, AppError> {
    if payload.line_item_id.trim().is_empty() || payload.photo_url.trim().is_empty() {
        return Err(AppError::bad_request(
            "lineItemId, photoType and photoUrl are required",
        ));
    }
    let photo_type = parse_photo_type(Some(&payload.photo_type))?;

    let remaining = state
        .line_items
        .delete_photo(payload.line_item_id.trim(), photo_type, payload.photo_url.trim())
        .await?;

    Ok(Json(PhotoDeleteResponse {
        message: "Photo deleted successfully".to_string(),
        photo_type,
        remaining_photos: remaining,
    }))
}

/// Bulk import of a site's bill of quantities. Responds 400 with every row
/// error when no row could be imported.
pub async fn upload_excel(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let mut form = Form::read(multipart).await?;
    let file = form
        .take_file("file")
        .ok_or_else(|| AppError::bad_request("No file uploaded"))?;
    if !import::is_spreadsheet(&file.file_name) {
        return Err(AppError::bad_request(
            "Only Excel files (.xlsx, .xls) are allowed",
        ));
    }
    let site_name = form
        .text("siteName")
        .ok_or_else(|| AppError::bad_request("Site name is required"))?;

    let result = state.line_items.import_sheet(&site_name, file.data).await?;
    if result.count == 0 {
        let body = ImportRejectedResponse {
            error: "No valid line items found".to_string(),
            errors: result.errors,
        };
        return Ok((StatusCode::BAD_REQUEST, Json(body)).into_response());
    }

    let body = ImportResponse {
        message: format!("Uploaded {} items successfully", result.count),
        count: result.count,
        errors: Some(result.errors).filter(|e| !e.is_empty()),
    };
    Ok(Json(body).into_response())
}

pub async fn upload_sample(
    State(state): State<AppState>,
    Path((id, material_id)): Path<(String, String)>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut form = Form::read(multipart).await?;
    let file = form
        .take_file("file")
        .ok_or_else(|| AppError::bad_request("No file uploaded"))?;

    let (sample, item) = state.line_items.add_sample(&id, &material_id, file).await?;
    Ok((
        StatusCode::CREATED,
        Json(SampleUploadResponse {
            message: "Sample uploaded successfully".to_string(),
            sample,
            line_item: item,
        }),
    ))
}

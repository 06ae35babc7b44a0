use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use super::form::Form;
use crate::dtos::{ShopDrawingMailRequest, TdsMailResponse};
use crate::services::mail::TdsMailRequest;
use crate::utils::ValidatedJson;
use crate::AppState;

pub async fn send_tds_mail(
    State(state): State<AppState>,
    Path((id, material_id)): Path<(String, String)>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut form = Form::read(multipart).await?;
    let request = TdsMailRequest {
        to: form
            .text("to")
            .ok_or_else(|| AppError::bad_request("Recipient email is required"))?,
        cc: form.text("cc"),
        subject: form.text("subject").unwrap_or_default(),
        content: form.text("content").unwrap_or_default(),
        files: form.take_files("files"),
    };

    let outcome = state.mail.send_tds(&id, &material_id, request).await?;
    Ok(Json(TdsMailResponse {
        message: "TDS email sent successfully".to_string(),
        outcome,
    }))
}

pub async fn send_shop_drawing_mail(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<ShopDrawingMailRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state.mail.send_shop_drawings(payload.into()).await?;
    Ok(Json(outcome))
}

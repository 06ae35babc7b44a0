use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{LineItem, Photo, PhotoType, SampleRecord};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DeletePhotoRequest {
    #[serde(default)]
    pub line_item_id: String,
    #[serde(default)]
    pub photo_type: String,
    #[serde(default)]
    pub photo_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoUploadResponse {
    pub message: String,
    pub photos: Vec<Photo>,
    pub material_status_updated: bool,
    pub line_item: LineItem,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoDeleteResponse {
    pub message: String,
    pub photo_type: PhotoType,
    pub remaining_photos: Vec<Photo>,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub message: String,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ImportRejectedResponse {
    pub error: String,
    pub errors: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleUploadResponse {
    pub message: String,
    pub sample: SampleRecord,
    pub line_item: LineItem,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::de::{flexible_date, optional_label, optional_number};
use crate::models::{LineItem, LineItemMaterial, MaterialStatus, NewLineItem, Photo, PhotoType};
use crate::services::tracker::DateChange;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteParams {
    pub site_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotoParams {
    pub photo_type: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLineItemRequest {
    #[serde(default)]
    pub site_name: String,
    #[serde(default, deserialize_with = "optional_label")]
    pub sno: Option<String>,
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub item_description: String,
    #[serde(default, deserialize_with = "optional_number")]
    #[validate(range(min = 0.0, message = "Quantity cannot be negative"))]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub units: String,
    #[serde(default, deserialize_with = "optional_number")]
    pub rate: Option<f64>,
    #[serde(default)]
    pub material_status: MaterialStatus,
    #[serde(default, deserialize_with = "optional_number")]
    #[validate(range(min = 0.0, message = "Work status cannot be negative"))]
    pub work_status_in_units: Option<f64>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "flexible_date")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub materials: Vec<LineItemMaterial>,
}

impl From<CreateLineItemRequest> for NewLineItem {
    fn from(req: CreateLineItemRequest) -> Self {
        NewLineItem {
            site_name: req.site_name,
            sno: req.sno.unwrap_or_default(),
            project_name: req.project_name.filter(|p| !p.trim().is_empty()),
            category: req.category,
            item_description: req.item_description,
            quantity: req.quantity.unwrap_or(0.0),
            units: req.units,
            rate: req.rate.unwrap_or(0.0),
            material_status: req.material_status,
            work_status_in_units: req.work_status_in_units.unwrap_or(0.0),
            start_date: req.start_date,
            end_date: req.end_date,
            materials: req.materials,
        }
    }
}

/// Updated item plus what the update recorded.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLineItemResponse {
    #[serde(flatten)]
    pub item: LineItem,
    pub history_added: usize,
    pub date_changes: Vec<DateChange>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhotosResponse {
    pub line_item_id: String,
    pub photo_type: PhotoType,
    pub count: usize,
    pub photos: Vec<Photo>,
}

//! Line item document: one billable unit of work on a site.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::dates;
use crate::services::derived::DerivedFields;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum MaterialStatus {
    #[default]
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    #[serde(rename = "Initialized/Delivered", alias = "Intialized/Delivered")]
    Delivered,
    #[serde(rename = "Not Delivered")]
    NotDelivered,
}

impl MaterialStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialStatus::Pending => "Pending",
            MaterialStatus::InProgress => "In Progress",
            MaterialStatus::Completed => "Completed",
            MaterialStatus::Delivered => "Initialized/Delivered",
            MaterialStatus::NotDelivered => "Not Delivered",
        }
    }
}

impl std::fmt::Display for MaterialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MaterialStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(MaterialStatus::Pending),
            "in progress" => Ok(MaterialStatus::InProgress),
            "completed" => Ok(MaterialStatus::Completed),
            "initialized/delivered" | "intialized/delivered" => Ok(MaterialStatus::Delivered),
            "not delivered" => Ok(MaterialStatus::NotDelivered),
            _ => Err(format!("Invalid material status: {}", s)),
        }
    }
}

/// Approval state for shop drawings, technical data sheets and samples.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Submitted,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "Pending",
            ApprovalStatus::Submitted => "Submitted",
            ApprovalStatus::Approved => "Approved",
            ApprovalStatus::Rejected => "Rejected",
        }
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum PhotoType {
    MaterialPhoto,
    WorkCompletionPhoto,
    FinishedPhoto,
}

impl std::str::FromStr for PhotoType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "materialPhoto" => Ok(PhotoType::MaterialPhoto),
            "workCompletionPhoto" => Ok(PhotoType::WorkCompletionPhoto),
            "finishedPhoto" => Ok(PhotoType::FinishedPhoto),
            _ => Err("Invalid photo type".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub url: String,
    #[serde(with = "dates::datetime")]
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PreviousDates {
    #[serde(default, with = "dates::vec_datetime")]
    pub start_dates: Vec<DateTime<Utc>>,
    #[serde(default, with = "dates::vec_datetime")]
    pub end_dates: Vec<DateTime<Utc>>,
}

/// Fields whose changes are written to the audit trail.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TrackedField {
    Quantity,
    WorkStatusInUnits,
    MaterialStatus,
}

impl std::fmt::Display for TrackedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            TrackedField::Quantity => "quantity",
            TrackedField::WorkStatusInUnits => "workStatusInUnits",
            TrackedField::MaterialStatus => "materialStatus",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Status(MaterialStatus),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub field: TrackedField,
    pub old_value: FieldValue,
    pub new_value: FieldValue,
    #[serde(with = "dates::datetime")]
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SampleRecord {
    pub url: String,
    pub original_name: String,
    pub size_bytes: u64,
    #[serde(with = "dates::datetime")]
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentRecord {
    pub name: String,
    pub size_mb: f64,
    pub sent: bool,
    pub skip_reason: Option<String>,
    pub file_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TdsMailRecord {
    pub to: String,
    #[serde(default)]
    pub cc: Vec<String>,
    pub subject: String,
    pub message_id: Option<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentRecord>,
    #[serde(with = "dates::datetime")]
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShopDrawingMail {
    pub to: String,
    #[serde(default)]
    pub cc: Vec<String>,
    pub subject: String,
    pub message_id: Option<String>,
    #[serde(with = "dates::datetime")]
    pub sent_at: DateTime<Utc>,
}

/// A catalog material as used on one line item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItemMaterial {
    pub material_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub tds_status: ApprovalStatus,
    #[serde(default)]
    pub sample_status: ApprovalStatus,
    #[serde(default)]
    pub sample_history: Vec<SampleRecord>,
    #[serde(default)]
    pub tds_mail_history: Vec<TdsMailRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(rename = "_id")]
    pub id: String,
    #[validate(length(min = 1, message = "Site name is required"))]
    pub site_name: String,
    #[validate(length(min = 1, message = "S.No is required"))]
    pub sno: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,
    #[validate(length(min = 1, message = "Item description is required"))]
    pub item_description: String,
    #[validate(range(min = 0.0, message = "Quantity cannot be negative"))]
    pub quantity: f64,
    #[validate(length(min = 1, message = "Units are required"))]
    pub units: String,
    pub rate: f64,
    pub amount: f64,
    #[serde(default)]
    pub material_status: MaterialStatus,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "Work status cannot be negative"))]
    pub work_status_in_units: f64,
    #[serde(default)]
    pub work_completion_percentage: f64,
    #[serde(default)]
    pub work_completion_amount: f64,
    #[serde(default, with = "dates::opt_datetime")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, with = "dates::opt_datetime")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub previous_dates: PreviousDates,
    #[serde(default)]
    pub start_date_counter: i32,
    #[serde(default)]
    pub end_date_counter: i32,
    #[serde(default)]
    pub date_flag: bool,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub materials: Vec<LineItemMaterial>,
    #[serde(default)]
    pub shop_drawing: Option<ApprovalStatus>,
    #[serde(default, rename = "TDS")]
    pub tds: Option<ApprovalStatus>,
    #[serde(default, rename = "Samples")]
    pub samples: Option<ApprovalStatus>,
    #[serde(default)]
    pub shop_drawing_mail: Option<ShopDrawingMail>,
    #[serde(default)]
    pub material_photo: Vec<Photo>,
    #[serde(default)]
    pub work_completion_photo: Vec<Photo>,
    #[serde(default)]
    pub finished_photo: Vec<Photo>,
    #[serde(with = "dates::datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "dates::datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fields for a new line item. Derived values are never
/// accepted here.
#[derive(Debug, Clone, Default)]
pub struct NewLineItem {
    pub site_name: String,
    pub sno: String,
    pub project_name: Option<String>,
    pub category: String,
    pub item_description: String,
    pub quantity: f64,
    pub units: String,
    pub rate: f64,
    pub material_status: MaterialStatus,
    pub work_status_in_units: f64,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub materials: Vec<LineItemMaterial>,
}

impl LineItem {
    pub fn new(input: NewLineItem) -> Self {
        let now = Utc::now();
        let mut item = Self {
            id: Uuid::new_v4().to_string(),
            site_name: input.site_name.trim().to_string(),
            sno: input.sno.trim().to_string(),
            project_name: input.project_name,
            category: input.category.trim().to_string(),
            item_description: input.item_description.trim().to_string(),
            quantity: input.quantity,
            units: input.units.trim().to_string(),
            rate: input.rate,
            amount: 0.0,
            material_status: input.material_status,
            work_status_in_units: input.work_status_in_units,
            work_completion_percentage: 0.0,
            work_completion_amount: 0.0,
            start_date: input.start_date,
            end_date: input.end_date,
            previous_dates: PreviousDates::default(),
            start_date_counter: 0,
            end_date_counter: 0,
            date_flag: false,
            history: Vec::new(),
            materials: input.materials,
            shop_drawing: None,
            tds: None,
            samples: None,
            shop_drawing_mail: None,
            material_photo: Vec::new(),
            work_completion_photo: Vec::new(),
            finished_photo: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        item.recompute_derived();
        item
    }

    /// Overwrites amount and completion fields from quantity, rate and
    /// work status. Runs before every persist.
    pub fn recompute_derived(&mut self) {
        let derived = DerivedFields::compute(self.quantity, self.rate, self.work_status_in_units);
        self.amount = derived.amount;
        self.work_completion_percentage = derived.work_completion_percentage;
        self.work_completion_amount = derived.work_completion_amount;
    }

    pub fn photos(&self, photo_type: PhotoType) -> &[Photo] {
        match photo_type {
            PhotoType::MaterialPhoto => &self.material_photo,
            PhotoType::WorkCompletionPhoto => &self.work_completion_photo,
            PhotoType::FinishedPhoto => &self.finished_photo,
        }
    }

    pub fn photos_mut(&mut self, photo_type: PhotoType) -> &mut Vec<Photo> {
        match photo_type {
            PhotoType::MaterialPhoto => &mut self.material_photo,
            PhotoType::WorkCompletionPhoto => &mut self.work_completion_photo,
            PhotoType::FinishedPhoto => &mut self.finished_photo,
        }
    }

    pub fn material_mut(&mut self, material_id: &str) -> Option<&mut LineItemMaterial> {
        self.materials
            .iter_mut()
            .find(|m| m.material_id == material_id)
    }
}

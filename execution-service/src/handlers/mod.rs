pub mod dashboard;
pub mod health;
pub mod line_items;
pub mod mail;
pub mod materials;
pub mod uploads;

mod form;

pub use dashboard::*;
pub use health::*;
pub use line_items::*;
pub use mail::*;
pub use materials::*;
pub use uploads::*;

use crate::models::PhotoType;
use service_core::error::AppError;

fn parse_photo_type(raw: Option<&str>) -> Result<PhotoType, AppError> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::bad_request("photoType is required"))?
        .parse::<PhotoType>()
        .map_err(AppError::bad_request)
}

pub mod line_items;
pub mod mail;
pub mod materials;
pub mod uploads;

pub use line_items::*;
pub use mail::*;
pub use materials::*;
pub use uploads::*;

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

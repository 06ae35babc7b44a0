use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::dates;

pub const DEFAULT_CATEGORY: &str = "General";

/// Catalog entry. Names are unique ignoring case.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    #[serde(rename = "_id")]
    pub id: String,
    #[validate(length(min = 1, message = "Material name is required"))]
    pub name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(with = "dates::datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "dates::datetime")]
    pub updated_at: DateTime<Utc>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_active() -> bool {
    true
}

impl Material {
    pub fn new(
        name: &str,
        unit: Option<String>,
        description: Option<String>,
        category: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            unit: unit.map(|u| u.trim().to_string()).unwrap_or_default(),
            description: description.map(|d| d.trim().to_string()).unwrap_or_default(),
            category: category
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(default_category),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

use async_trait::async_trait;
use service_core::error::AppError;

use crate::models::{LineItem, Material};

#[derive(Debug, Clone, Default)]
pub struct LineItemFilter {
    pub site_name: Option<String>,
}

impl LineItemFilter {
    pub fn site(site_name: Option<String>) -> Self {
        Self {
            site_name: site_name.filter(|s| !s.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MaterialFilter {
    /// Case-insensitive substring over name and description.
    pub search: Option<String>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
}

/// Line item persistence. Results of `find` are ordered by `createdAt`.
#[async_trait]
pub trait LineItemStore: Send + Sync {
    async fn find(&self, filter: &LineItemFilter) -> Result<Vec<LineItem>, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<LineItem>, AppError>;
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<LineItem>, AppError>;
    async fn insert(&self, item: &LineItem) -> Result<(), AppError>;
    async fn insert_many(&self, items: &[LineItem]) -> Result<usize, AppError>;
    /// Returns false when no document with the item's id exists.
    async fn replace(&self, item: &LineItem) -> Result<bool, AppError>;
    async fn delete(&self, id: &str) -> Result<Option<LineItem>, AppError>;
    /// Distinct site names, ascending.
    async fn distinct_sites(&self) -> Result<Vec<String>, AppError>;
    async fn ping(&self) -> Result<(), AppError>;
}

/// Material catalog persistence. Results of `find` are ordered by name.
#[async_trait]
pub trait MaterialStore: Send + Sync {
    async fn find(&self, filter: &MaterialFilter) -> Result<Vec<Material>, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Material>, AppError>;
    /// Case-insensitive exact name match, optionally ignoring one id.
    async fn find_by_name(
        &self,
        name: &str,
        exclude_id: Option<&str>,
    ) -> Result<Option<Material>, AppError>;
    async fn insert(&self, material: &Material) -> Result<(), AppError>;
    async fn replace(&self, material: &Material) -> Result<bool, AppError>;
    async fn delete(&self, id: &str) -> Result<Option<Material>, AppError>;
    /// Distinct categories, ascending.
    async fn distinct_categories(&self) -> Result<Vec<String>, AppError>;
}

use chrono::Utc;
use service_core::error::AppError;
use std::sync::Arc;
use validator::Validate;

use crate::models::Material;
use crate::services::store::{MaterialFilter, MaterialStore};

const DUPLICATE_NAME: &str = "Material with this name already exists";

#[derive(Debug, Clone, Default)]
pub struct MaterialChanges {
    pub name: Option<String>,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Clone)]
pub struct MaterialService {
    store: Arc<dyn MaterialStore>,
}

impl MaterialService {
    pub fn new(store: Arc<dyn MaterialStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, filter: &MaterialFilter) -> Result<Vec<Material>, AppError> {
        self.store.find(filter).await
    }

    pub async fn categories(&self) -> Result<Vec<String>, AppError> {
        self.store.distinct_categories().await
    }

    pub async fn get(&self, id: &str) -> Result<Material, AppError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Material"))
    }

    pub async fn create(
        &self,
        name: &str,
        unit: Option<String>,
        description: Option<String>,
        category: Option<String>,
    ) -> Result<Material, AppError> {
        let material = Material::new(name, unit, description, category);
        material.validate()?;

        if self.store.find_by_name(&material.name, None).await?.is_some() {
            return Err(AppError::bad_request(DUPLICATE_NAME));
        }

        self.store.insert(&material).await?;
        tracing::info!(material_id = %material.id, name = %material.name, "Material created");
        Ok(material)
    }

    pub async fn update(&self, id: &str, changes: MaterialChanges) -> Result<Material, AppError> {
        let mut material = self.get(id).await?;

        if let Some(name) = changes.name.as_deref().map(str::trim) {
            if !name.is_empty() && name != material.name {
                if self.store.find_by_name(name, Some(id)).await?.is_some() {
                    return Err(AppError::bad_request(DUPLICATE_NAME));
                }
                material.name = name.to_string();
            }
        }
        if let Some(unit) = changes.unit {
            material.unit = unit.trim().to_string();
        }
        if let Some(description) = changes.description {
            material.description = description.trim().to_string();
        }
        if let Some(category) = changes.category {
            material.category = category.trim().to_string();
        }
        if let Some(active) = changes.is_active {
            material.is_active = active;
        }
        material.updated_at = Utc::now();
        material.validate()?;

        if !self.store.replace(&material).await? {
            return Err(AppError::not_found("Material"));
        }
        Ok(material)
    }

    /// Line items that reference the material keep their copies.
    pub async fn delete(&self, id: &str) -> Result<Material, AppError> {
        let removed = self
            .store
            .delete(id)
            .await?
            .ok_or_else(|| AppError::not_found("Material"))?;
        tracing::info!(material_id = %id, name = %removed.name, "Material deleted");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::InMemoryStore;

    fn service() -> MaterialService {
        MaterialService::new(Arc::new(InMemoryStore::new()))
    }

    #[tokio::test]
    async fn duplicate_names_are_rejected_ignoring_case() {
        let materials = service();
        materials
            .create("Cement OPC 53", Some("bag".into()), None, None)
            .await
            .unwrap();
        let err = materials
            .create("cement opc 53 ", None, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), format!("Bad request: {}", DUPLICATE_NAME));
    }

    #[tokio::test]
    async fn blank_name_fails_validation() {
        let err = service().create("   ", None, None, None).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn rename_checks_other_materials_only() {
        let materials = service();
        let sand = materials.create("Sand", None, None, None).await.unwrap();
        materials.create("Gravel", None, None, None).await.unwrap();

        let renamed = materials
            .update(
                &sand.id,
                MaterialChanges {
                    name: Some("SAND".into()),
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "SAND");
        assert!(!renamed.is_active);

        let err = materials
            .update(
                &sand.id,
                MaterialChanges {
                    name: Some("gravel".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn missing_material_is_not_found() {
        let err = service().delete("nope").await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
    }
}

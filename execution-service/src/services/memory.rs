//! Process-local store used by tests and local runs without MongoDB.

use async_trait::async_trait;
use dashmap::DashMap;
use service_core::error::AppError;

use crate::models::{LineItem, Material};
use crate::services::store::{LineItemFilter, LineItemStore, MaterialFilter, MaterialStore};

#[derive(Default)]
pub struct InMemoryStore {
    line_items: DashMap<String, LineItem>,
    materials: DashMap<String, Material>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn name_taken(&self, name: &str, exclude_id: Option<&str>) -> Option<Material> {
        let wanted = name.trim().to_lowercase();
        self.materials
            .iter()
            .find(|entry| {
                entry.name.to_lowercase() == wanted && Some(entry.id.as_str()) != exclude_id
            })
            .map(|entry| entry.value().clone())
    }
}

fn duplicate_name() -> AppError {
    AppError::bad_request("Material with this name already exists")
}

#[async_trait]
impl LineItemStore for InMemoryStore {
    async fn find(&self, filter: &LineItemFilter) -> Result<Vec<LineItem>, AppError> {
        let mut items: Vec<LineItem> = self
            .line_items
            .iter()
            .filter(|entry| match &filter.site_name {
                Some(site) => &entry.site_name == site,
                None => true,
            })
            .map(|entry| entry.value().clone())
            .collect();
        items.sort_by_key(|item| item.created_at);
        Ok(items)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<LineItem>, AppError> {
        Ok(self.line_items.get(id).map(|entry| entry.value().clone()))
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<LineItem>, AppError> {
        let mut items: Vec<LineItem> = ids
            .iter()
            .filter_map(|id| self.line_items.get(id).map(|entry| entry.value().clone()))
            .collect();
        items.sort_by_key(|item| item.created_at);
        items.dedup_by(|a, b| a.id == b.id);
        Ok(items)
    }

    async fn insert(&self, item: &LineItem) -> Result<(), AppError> {
        self.line_items.insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn insert_many(&self, items: &[LineItem]) -> Result<usize, AppError> {
        for item in items {
            self.line_items.insert(item.id.clone(), item.clone());
        }
        Ok(items.len())
    }

    async fn replace(&self, item: &LineItem) -> Result<bool, AppError> {
        match self.line_items.get_mut(&item.id) {
            Some(mut entry) => {
                *entry = item.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<Option<LineItem>, AppError> {
        Ok(self.line_items.remove(id).map(|(_, item)| item))
    }

    async fn distinct_sites(&self) -> Result<Vec<String>, AppError> {
        let mut sites: Vec<String> = self
            .line_items
            .iter()
            .map(|entry| entry.site_name.clone())
            .filter(|site| !site.is_empty())
            .collect();
        sites.sort();
        sites.dedup();
        Ok(sites)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
impl MaterialStore for InMemoryStore {
    async fn find(&self, filter: &MaterialFilter) -> Result<Vec<Material>, AppError> {
        let search = filter
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut materials: Vec<Material> = self
            .materials
            .iter()
            .filter(|m| match &search {
                Some(needle) => {
                    m.name.to_lowercase().contains(needle)
                        || m.description.to_lowercase().contains(needle)
                }
                None => true,
            })
            .filter(|m| filter.category.as_ref().map_or(true, |c| &m.category == c))
            .filter(|m| filter.is_active.map_or(true, |a| m.is_active == a))
            .map(|entry| entry.value().clone())
            .collect();
        materials.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(materials)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Material>, AppError> {
        Ok(self.materials.get(id).map(|entry| entry.value().clone()))
    }

    async fn find_by_name(
        &self,
        name: &str,
        exclude_id: Option<&str>,
    ) -> Result<Option<Material>, AppError> {
        Ok(self.name_taken(name, exclude_id))
    }

    async fn insert(&self, material: &Material) -> Result<(), AppError> {
        if self.name_taken(&material.name, Some(&material.id)).is_some() {
            return Err(duplicate_name());
        }
        self.materials.insert(material.id.clone(), material.clone());
        Ok(())
    }

    async fn replace(&self, material: &Material) -> Result<bool, AppError> {
        if self.name_taken(&material.name, Some(&material.id)).is_some() {
            return Err(duplicate_name());
        }
        match self.materials.get_mut(&material.id) {
            Some(mut entry) => {
                *entry = material.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<Option<Material>, AppError> {
        Ok(self.materials.remove(id).map(|(_, material)| material))
    }

    async fn distinct_categories(&self) -> Result<Vec<String>, AppError> {
        let mut categories: Vec<String> = self
            .materials
            .iter()
            .map(|entry| entry.category.clone())
            .filter(|c| !c.is_empty())
            .collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewLineItem;

    fn line_item(site: &str) -> LineItem {
        LineItem::new(NewLineItem {
            site_name: site.into(),
            sno: "1".into(),
            category: "Civil".into(),
            item_description: "Excavation".into(),
            quantity: 1.0,
            units: "cum".into(),
            rate: 1.0,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn filters_by_site_and_lists_distinct_sites() {
        let store = InMemoryStore::new();
        store
            .insert_many(&[line_item("Villa"), line_item("Annex"), line_item("Villa")])
            .await
            .unwrap();

        let villa = LineItemStore::find(&store, &LineItemFilter::site(Some("Villa".into())))
            .await
            .unwrap();
        assert_eq!(villa.len(), 2);
        assert_eq!(store.distinct_sites().await.unwrap(), vec!["Annex", "Villa"]);
    }

    #[tokio::test]
    async fn replace_reports_missing_documents() {
        let store = InMemoryStore::new();
        let item = line_item("Villa");
        assert!(!LineItemStore::replace(&store, &item).await.unwrap());
        LineItemStore::insert(&store, &item).await.unwrap();
        assert!(LineItemStore::replace(&store, &item).await.unwrap());
        assert!(LineItemStore::delete(&store, &item.id).await.unwrap().is_some());
        assert!(LineItemStore::find_by_id(&store, &item.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn material_names_are_unique_ignoring_case() {
        let store = InMemoryStore::new();
        let cement = Material::new("Cement", None, None, Some("Binder".into()));
        MaterialStore::insert(&store, &cement).await.unwrap();

        let shouting = Material::new("CEMENT", None, None, None);
        let err = MaterialStore::insert(&store, &shouting).await.unwrap_err();
        assert!(err.to_string().contains("already exists"));

        let found = store.find_by_name("cement", None).await.unwrap();
        assert_eq!(found.map(|m| m.id), Some(cement.id.clone()));
        assert!(store
            .find_by_name("cement", Some(&cement.id))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn material_search_matches_name_or_description() {
        let store = InMemoryStore::new();
        let sand = Material::new("River sand", None, Some("Fine aggregate".into()), None);
        let steel = Material::new("TMT bar", None, Some("Fe500".into()), Some("Steel".into()));
        MaterialStore::insert(&store, &sand).await.unwrap();
        MaterialStore::insert(&store, &steel).await.unwrap();

        let filter = MaterialFilter {
            search: Some("AGGREGATE".into()),
            ..Default::default()
        };
        let found = MaterialStore::find(&store, &filter).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "River sand");

        assert_eq!(
            store.distinct_categories().await.unwrap(),
            vec!["General", "Steel"]
        );
    }
}

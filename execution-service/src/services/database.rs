use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    error::{ErrorKind, WriteFailure},
    options::{Collation, CollationStrength, FindOptions, IndexOptions},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

use crate::models::{LineItem, Material};
use crate::services::store::{LineItemFilter, LineItemStore, MaterialFilter, MaterialStore};

const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for execution-service");

        let site_index = IndexModel::builder()
            .keys(doc! { "siteName": 1, "createdAt": 1 })
            .options(
                IndexOptions::builder()
                    .name("site_created_lookup".to_string())
                    .build(),
            )
            .build();
        self.line_items()
            .create_index(site_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create site index on line items: {}", e);
                AppError::from(e)
            })?;

        let end_date_index = IndexModel::builder()
            .keys(doc! { "endDate": 1 })
            .options(
                IndexOptions::builder()
                    .name("end_date_lookup".to_string())
                    .sparse(true)
                    .build(),
            )
            .build();
        self.line_items()
            .create_index(end_date_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create endDate index on line items: {}", e);
                AppError::from(e)
            })?;

        // Case-insensitive uniqueness for catalog names
        let name_index = IndexModel::builder()
            .keys(doc! { "name": 1 })
            .options(
                IndexOptions::builder()
                    .name("material_name_unique".to_string())
                    .unique(true)
                    .collation(name_collation())
                    .build(),
            )
            .build();
        self.materials()
            .create_index(name_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create unique name index on materials: {}", e);
                AppError::from(e)
            })?;

        tracing::info!("Successfully created all MongoDB indexes");
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    pub fn line_items(&self) -> Collection<LineItem> {
        self.db.collection("projectlineitems")
    }

    pub fn materials(&self) -> Collection<Material> {
        self.db.collection("materials")
    }
}

fn name_collation() -> Collation {
    Collation::builder()
        .locale("en".to_string())
        .strength(CollationStrength::Secondary)
        .build()
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY
    )
}

fn material_write_error(err: mongodb::error::Error) -> AppError {
    if is_duplicate_key(&err) {
        AppError::bad_request("Material with this name already exists")
    } else {
        tracing::error!("Failed to write material: {}", err);
        AppError::from(err)
    }
}

fn contains_ci(value: &str) -> Document {
    doc! { "$regex": regex::escape(value), "$options": "i" }
}

fn sorted_strings(values: Vec<Bson>) -> Vec<String> {
    let mut out: Vec<String> = values
        .into_iter()
        .filter_map(|v| match v {
            Bson::String(s) if !s.is_empty() => Some(s),
            _ => None,
        })
        .collect();
    out.sort();
    out.dedup();
    out
}

#[async_trait]
impl LineItemStore for MongoDb {
    async fn find(&self, filter: &LineItemFilter) -> Result<Vec<LineItem>, AppError> {
        let mut query = doc! {};
        if let Some(site) = &filter.site_name {
            query.insert("siteName", site.as_str());
        }

        let cursor = self.line_items().find(query, None).await?;
        let mut items: Vec<LineItem> = cursor.try_collect().await?;
        items.sort_by_key(|item| item.created_at);
        Ok(items)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<LineItem>, AppError> {
        Ok(self.line_items().find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<LineItem>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self
            .line_items()
            .find(doc! { "_id": { "$in": ids.to_vec() } }, None)
            .await?;
        let mut items: Vec<LineItem> = cursor.try_collect().await?;
        items.sort_by_key(|item| item.created_at);
        Ok(items)
    }

    async fn insert(&self, item: &LineItem) -> Result<(), AppError> {
        self.line_items().insert_one(item, None).await.map_err(|e| {
            tracing::error!(line_item_id = %item.id, "Failed to insert line item: {}", e);
            AppError::from(e)
        })?;
        Ok(())
    }

    async fn insert_many(&self, items: &[LineItem]) -> Result<usize, AppError> {
        if items.is_empty() {
            return Ok(0);
        }
        let result = self
            .line_items()
            .insert_many(items, None)
            .await
            .map_err(|e| {
                tracing::error!(count = items.len(), "Failed to insert line items: {}", e);
                AppError::from(e)
            })?;
        Ok(result.inserted_ids.len())
    }

    async fn replace(&self, item: &LineItem) -> Result<bool, AppError> {
        let result = self
            .line_items()
            .replace_one(doc! { "_id": item.id.as_str() }, item, None)
            .await
            .map_err(|e| {
                tracing::error!(line_item_id = %item.id, "Failed to replace line item: {}", e);
                AppError::from(e)
            })?;
        Ok(result.matched_count > 0)
    }

    async fn delete(&self, id: &str) -> Result<Option<LineItem>, AppError> {
        Ok(self
            .line_items()
            .find_one_and_delete(doc! { "_id": id }, None)
            .await?)
    }

    async fn distinct_sites(&self) -> Result<Vec<String>, AppError> {
        let values = self.line_items().distinct("siteName", None, None).await?;
        Ok(sorted_strings(values))
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.health_check().await
    }
}

#[async_trait]
impl MaterialStore for MongoDb {
    async fn find(&self, filter: &MaterialFilter) -> Result<Vec<Material>, AppError> {
        let mut query = doc! {};
        if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
            query.insert(
                "$or",
                vec![
                    doc! { "name": contains_ci(search) },
                    doc! { "description": contains_ci(search) },
                ],
            );
        }
        if let Some(category) = &filter.category {
            query.insert("category", category.as_str());
        }
        if let Some(active) = filter.is_active {
            query.insert("isActive", active);
        }

        let options = FindOptions::builder().sort(doc! { "name": 1 }).build();
        let cursor = self.materials().find(query, options).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Material>, AppError> {
        Ok(self.materials().find_one(doc! { "_id": id }, None).await?)
    }

    async fn find_by_name(
        &self,
        name: &str,
        exclude_id: Option<&str>,
    ) -> Result<Option<Material>, AppError> {
        let mut query = doc! {
            "name": { "$regex": format!("^{}$", regex::escape(name.trim())), "$options": "i" }
        };
        if let Some(id) = exclude_id {
            query.insert("_id", doc! { "$ne": id });
        }
        Ok(self.materials().find_one(query, None).await?)
    }

    async fn insert(&self, material: &Material) -> Result<(), AppError> {
        self.materials()
            .insert_one(material, None)
            .await
            .map_err(material_write_error)?;
        Ok(())
    }

    async fn replace(&self, material: &Material) -> Result<bool, AppError> {
        let result = self
            .materials()
            .replace_one(doc! { "_id": material.id.as_str() }, material, None)
            .await
            .map_err(material_write_error)?;
        Ok(result.matched_count > 0)
    }

    async fn delete(&self, id: &str) -> Result<Option<Material>, AppError> {
        Ok(self
            .materials()
            .find_one_and_delete(doc! { "_id": id }, None)
            .await?)
    }

    async fn distinct_categories(&self) -> Result<Vec<String>, AppError> {
        let values = self.materials().distinct("category", None, None).await?;
        Ok(sorted_strings(values))
    }
}

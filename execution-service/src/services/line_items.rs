use chrono::Utc;
use service_core::error::AppError;
use std::sync::Arc;
use validator::Validate;

use crate::models::{
    ApprovalStatus, HistoryEntry, LineItem, MaterialStatus, NewLineItem, Photo, PhotoType,
    SampleRecord, TdsMailRecord,
};
use crate::services::import::{self, ParsedSheet};
use crate::services::metrics;
use crate::services::storage::{self, Storage, UploadedFile};
use crate::services::store::{LineItemFilter, LineItemStore};
use crate::services::tracker::{apply_update, LineItemPatch, UpdateOutcome};

const PHOTO_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];
const PHOTO_MIME_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/gif"];

/// Limits applied to photo uploads.
#[derive(Debug, Clone, Copy)]
pub struct PhotoLimits {
    pub max_bytes: usize,
    pub max_count: usize,
}

#[derive(Debug)]
pub struct PhotoUpload {
    pub photos: Vec<Photo>,
    pub material_status_updated: bool,
    pub item: LineItem,
}

#[derive(Debug)]
pub struct ImportResult {
    pub count: usize,
    pub errors: Vec<String>,
}

#[derive(Clone)]
pub struct LineItemService {
    store: Arc<dyn LineItemStore>,
    storage: Arc<dyn Storage>,
}

impl LineItemService {
    pub fn new(store: Arc<dyn LineItemStore>, storage: Arc<dyn Storage>) -> Self {
        Self { store, storage }
    }

    pub fn store(&self) -> &Arc<dyn LineItemStore> {
        &self.store
    }

    pub async fn list(&self, site_name: Option<String>) -> Result<Vec<LineItem>, AppError> {
        self.store.find(&LineItemFilter::site(site_name)).await
    }

    pub async fn sites(&self) -> Result<Vec<String>, AppError> {
        self.store.distinct_sites().await
    }

    pub async fn get(&self, id: &str) -> Result<LineItem, AppError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Line item"))
    }

    pub async fn create(&self, input: NewLineItem) -> Result<LineItem, AppError> {
        let item = LineItem::new(input);
        item.validate()?;
        self.store.insert(&item).await?;
        tracing::info!(line_item_id = %item.id, site_name = %item.site_name, "Line item created");
        Ok(item)
    }

    /// Parses an uploaded workbook and inserts every valid row. Nothing is
    /// written when no row is valid; the result then has a zero count.
    pub async fn import_sheet(&self, site_name: &str, bytes: Vec<u8>) -> Result<ImportResult, AppError> {
        let rows = import::read_first_sheet(bytes)?;
        let ParsedSheet { items, errors } = import::parse_rows(&rows, site_name.trim());

        if items.is_empty() {
            metrics::record_import(0, errors.len());
            tracing::warn!(site_name = %site_name, rejected = errors.len(), "Spreadsheet had no valid rows");
            return Ok(ImportResult { count: 0, errors });
        }

        let count = self.store.insert_many(&items).await?;
        metrics::record_import(count, errors.len());
        tracing::info!(site_name = %site_name, count, rejected = errors.len(), "Spreadsheet imported");
        Ok(ImportResult { count, errors })
    }

    pub async fn update(&self, id: &str, patch: &LineItemPatch) -> Result<UpdateOutcome, AppError> {
        let existing = self.get(id).await?;
        let outcome = apply_update(existing, patch, Utc::now());
        outcome.item.validate()?;

        if !self.store.replace(&outcome.item).await? {
            return Err(AppError::not_found("Line item"));
        }

        metrics::record_line_item_update(outcome.history.len());
        if outcome.is_audited() {
            tracing::info!(
                line_item_id = %id,
                history_entries = outcome.history.len(),
                date_changes = outcome.date_changes.len(),
                date_flag = outcome.item.date_flag,
                "Line item updated"
            );
        } else {
            tracing::debug!(line_item_id = %id, "Line item updated without audited changes");
        }
        Ok(outcome)
    }

    pub async fn delete(&self, id: &str) -> Result<LineItem, AppError> {
        let removed = self
            .store
            .delete(id)
            .await?
            .ok_or_else(|| AppError::not_found("Line item"))?;
        tracing::info!(line_item_id = %id, "Line item deleted");
        Ok(removed)
    }

    /// Audit trail, oldest first.
    pub async fn history(&self, id: &str) -> Result<Vec<HistoryEntry>, AppError> {
        let mut history = self.get(id).await?.history;
        history.sort_by_key(|entry| entry.changed_at);
        Ok(history)
    }

    /// Photos of one kind, newest first.
    pub async fn photos(&self, id: &str, photo_type: PhotoType) -> Result<Vec<Photo>, AppError> {
        let item = self.get(id).await?;
        let mut photos = item.photos(photo_type).to_vec();
        photos.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(photos)
    }

    /// Recomputes derived fields, validates and writes the whole document.
    pub async fn persist(&self, mut item: LineItem) -> Result<LineItem, AppError> {
        item.recompute_derived();
        item.updated_at = Utc::now();
        item.validate()?;
        if !self.store.replace(&item).await? {
            return Err(AppError::not_found("Line item"));
        }
        Ok(item)
    }

    pub async fn upload_photos(
        &self,
        id: &str,
        photo_type: PhotoType,
        files: Vec<UploadedFile>,
        limits: PhotoLimits,
    ) -> Result<PhotoUpload, AppError> {
        if files.is_empty() {
            return Err(AppError::bad_request("No files uploaded"));
        }
        if files.len() > limits.max_count {
            return Err(AppError::bad_request(format!(
                "Too many files: at most {} photos per upload",
                limits.max_count
            )));
        }
        for file in &files {
            check_photo(file, limits.max_bytes)?;
        }

        let mut item = self.get(id).await?;
        let first_material_photo =
            photo_type == PhotoType::MaterialPhoto && item.material_photo.is_empty();

        let mut photos = Vec::with_capacity(files.len());
        for file in files {
            let key = storage::new_key(None, &file.file_name);
            self.storage.upload(&key, file.data).await?;
            photos.push(Photo {
                url: storage::public_url(&key),
                uploaded_at: Utc::now(),
            });
        }
        item.photos_mut(photo_type).extend(photos.iter().cloned());

        let mut material_status_updated = false;
        if first_material_photo {
            let outcome = apply_update(
                item,
                &LineItemPatch::material_status(MaterialStatus::Delivered),
                Utc::now(),
            );
            material_status_updated = outcome.is_audited();
            item = outcome.item;
        }

        let item = self.persist(item).await?;
        tracing::info!(
            line_item_id = %id,
            photo_type = ?photo_type,
            count = photos.len(),
            material_status_updated,
            "Photos uploaded"
        );
        Ok(PhotoUpload {
            photos,
            material_status_updated,
            item,
        })
    }

    /// Removes the photo record and its stored file. Returns the remaining
    /// photos of that kind.
    pub async fn delete_photo(
        &self,
        id: &str,
        photo_type: PhotoType,
        url: &str,
    ) -> Result<Vec<Photo>, AppError> {
        let mut item = self.get(id).await?;
        let photos = item.photos_mut(photo_type);
        let index = photos
            .iter()
            .position(|photo| photo.url == url)
            .ok_or_else(|| AppError::not_found("Photo"))?;
        photos.remove(index);

        if let Some(key) = storage::key_from_url(url) {
            if let Err(e) = self.storage.delete(key).await {
                tracing::warn!(line_item_id = %id, url = %url, "Failed to remove photo file: {}", e);
            }
        }

        let item = self.persist(item).await?;
        Ok(item.photos(photo_type).to_vec())
    }

    /// Stores a sample file for one material of the line item.
    pub async fn add_sample(
        &self,
        id: &str,
        material_id: &str,
        file: UploadedFile,
    ) -> Result<(SampleRecord, LineItem), AppError> {
        let mut item = self.get(id).await?;
        if item.material_mut(material_id).is_none() {
            return Err(AppError::not_found("Material"));
        }

        let key = storage::new_key(Some("samples"), &file.file_name);
        let record = SampleRecord {
            url: storage::public_url(&key),
            original_name: file.file_name.clone(),
            size_bytes: file.size(),
            uploaded_at: Utc::now(),
        };
        self.storage.upload(&key, file.data).await?;

        if let Some(material) = item.material_mut(material_id) {
            material.sample_history.push(record.clone());
            if material.sample_status == ApprovalStatus::Pending {
                material.sample_status = ApprovalStatus::Submitted;
            }
        }

        let item = self.persist(item).await?;
        tracing::info!(line_item_id = %id, material_id = %material_id, "Sample uploaded");
        Ok((record, item))
    }

    /// Appends a sent TDS mail to the material's history.
    pub async fn record_tds_mail(
        &self,
        id: &str,
        material_id: &str,
        record: TdsMailRecord,
    ) -> Result<LineItem, AppError> {
        let mut item = self.get(id).await?;
        let material = item
            .material_mut(material_id)
            .ok_or_else(|| AppError::not_found("Material"))?;
        material.tds_mail_history.push(record);
        if material.tds_status == ApprovalStatus::Pending {
            material.tds_status = ApprovalStatus::Submitted;
        }
        self.persist(item).await
    }
}

pub fn check_photo(file: &UploadedFile, max_bytes: usize) -> Result<(), AppError> {
    let ext = storage::extension_of(&file.file_name);
    let ext = ext.trim_start_matches('.');
    let mime = file.content_type.to_lowercase();
    if !PHOTO_EXTENSIONS.contains(&ext) || !PHOTO_MIME_TYPES.contains(&mime.as_str()) {
        return Err(AppError::bad_request(
            "Only image files are allowed (jpeg, jpg, png, gif)",
        ));
    }
    if file.data.len() > max_bytes {
        return Err(AppError::bad_request(format!(
            "File {} exceeds the {} MB photo limit",
            file.file_name,
            max_bytes / (1024 * 1024)
        )));
    }
    Ok(())
}

//! Buffers a multipart request into text fields and files.

use axum::extract::Multipart;
use service_core::error::AppError;
use std::collections::HashMap;

use crate::services::storage::UploadedFile;

#[derive(Debug, Default)]
pub(crate) struct Form {
    fields: HashMap<String, String>,
    files: Vec<(String, UploadedFile)>,
}

impl Form {
    pub(crate) async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Form::default();
        while let Some(field) = multipart.next_field().await.map_err(|e| {
            AppError::bad_request(format!("Failed to read multipart field: {}", e))
        })? {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let data = field.bytes().await.map_err(|e| {
                        AppError::bad_request(format!("Failed to read file bytes: {}", e))
                    })?;
                    form.files.push((
                        name,
                        UploadedFile {
                            file_name,
                            content_type,
                            data: data.to_vec(),
                        },
                    ));
                }
                None => {
                    let value = field.text().await.map_err(|e| {
                        AppError::bad_request(format!("Failed to read field {}: {}", name, e))
                    })?;
                    form.fields.insert(name, value);
                }
            }
        }
        Ok(form)
    }

    /// Trimmed text value; blank counts as missing.
    pub(crate) fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub(crate) fn require(&self, name: &str) -> Result<String, AppError> {
        self.text(name)
            .ok_or_else(|| AppError::bad_request(format!("{} is required", name)))
    }

    /// Files sent under `name`, in request order.
    pub(crate) fn take_files(&mut self, name: &str) -> Vec<UploadedFile> {
        let (matching, rest) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|(field, _)| field == name);
        self.files = rest;
        matching.into_iter().map(|(_, file)| file).collect()
    }

    pub(crate) fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.take_files(name).into_iter().next()
    }
}

use async_trait::async_trait;
use service_core::error::AppError;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// URL prefix under which stored files are served.
pub const PUBLIC_PREFIX: &str = "/uploads/";

#[async_trait]
pub trait Storage: Send + Sync {
    async fn upload(&self, key: &str, data: Vec<u8>) -> Result<(), AppError>;
    /// Missing files are not an error.
    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub async fn new(base_path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).await?;
        }
        Ok(Self { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, AppError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(AppError::bad_request(format!("Invalid storage key: {}", key)));
        }
        Ok(self.base_path.join(relative))
    }
}

#[async_trait]
impl Storage for LocalStorage {
    async fn upload(&self, key: &str, data: Vec<u8>) -> Result<(), AppError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, data).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let path = self.resolve(key)?;
        if path.exists() {
            fs::remove_file(path).await?;
        }
        Ok(())
    }
}

/// A file received in a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// `<folder>/<uuid>.<ext>`, extension taken from the client file name.
pub fn new_key(folder: Option<&str>, original_name: &str) -> String {
    let name = format!("{}{}", Uuid::new_v4(), extension_of(original_name));
    match folder {
        Some(folder) => format!("{}/{}", folder.trim_matches('/'), name),
        None => name,
    }
}

/// Lowercased extension including the dot, or empty.
pub fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default()
}

pub fn public_url(key: &str) -> String {
    format!("{}{}", PUBLIC_PREFIX, key)
}

/// Inverse of [`public_url`]. Returns `None` for URLs that were not produced
/// by this service.
pub fn key_from_url(url: &str) -> Option<&str> {
    url.strip_prefix(PUBLIC_PREFIX).filter(|key| !key.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_and_removes_nested_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();

        storage.upload("tds/sheet.pdf", b"pdf".to_vec()).await.unwrap();
        let written = dir.path().join("tds/sheet.pdf");
        assert_eq!(std::fs::read(&written).unwrap(), b"pdf");

        storage.delete("tds/sheet.pdf").await.unwrap();
        assert!(!written.exists());
        storage.delete("tds/sheet.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn rejects_keys_outside_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        assert!(storage.upload("../escape.txt", vec![1]).await.is_err());
        assert!(storage.delete("/etc/passwd").await.is_err());
    }

    #[test]
    fn keys_and_urls() {
        let key = new_key(Some("samples"), "Tile Sample.JPG");
        assert!(key.starts_with("samples/"));
        assert!(key.ends_with(".jpg"));
        assert_eq!(new_key(None, "noext").len(), 36);

        let url = public_url(&key);
        assert_eq!(key_from_url(&url), Some(key.as_str()));
        assert_eq!(key_from_url("https://elsewhere/x.png"), None);
    }
}

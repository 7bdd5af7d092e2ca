//! Uploaded document storage
//!
//! Files land in a flat upload directory under generated names
//! `{user_id}_{8 hex}_{YYYYMMDDHHMMSS}.{ext}`. The file is written before its
//! report metadata, and the two writes are not atomic: a crash in between
//! leaves an unreferenced file behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File type not allowed. Allowed types: {allowed}")]
    DisallowedExtension { extension: String, allowed: String },

    #[error("File too large. Max size: {max_mb:.1}MB")]
    TooLarge { size: usize, max_mb: f64 },

    #[error("Uploaded file is empty")]
    EmptyFile,

    #[error("file storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid stored path: {0}")]
    InvalidPath(String),
}

/// Reference to a stored upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub path: String,
    pub original_name: String,
    pub size: i64,
    pub extension: String,
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Validate and persist an upload for `user_id`
    async fn save(&self, user_id: Uuid, original_name: &str, content: &[u8]) -> Result<StoredFile, StorageError>;

    /// Remove a stored file; a missing file is not an error
    async fn delete(&self, path: &str) -> Result<bool, StorageError>;
}

/// Local-disk storage rooted at the configured upload directory
pub struct LocalFileStorage {
    root: PathBuf,
    allowed_extensions: Vec<String>,
    max_file_size: usize,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>, allowed_extensions: Vec<String>, max_file_size: usize) -> Self {
        Self {
            root: root.into(),
            allowed_extensions,
            max_file_size,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lower-cased extension after the last dot, empty when there is none
    pub fn extension_of(filename: &str) -> String {
        filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default()
    }

    fn validate(&self, original_name: &str, size: usize) -> Result<String, StorageError> {
        let extension = Self::extension_of(original_name);
        if !self.allowed_extensions.contains(&extension) {
            return Err(StorageError::DisallowedExtension {
                extension,
                allowed: self.allowed_extensions.join(", "),
            });
        }
        if size == 0 {
            return Err(StorageError::EmptyFile);
        }
        if size > self.max_file_size {
            return Err(StorageError::TooLarge {
                size,
                max_mb: self.max_file_size as f64 / (1024.0 * 1024.0),
            });
        }
        Ok(extension)
    }

    fn unique_name(user_id: Uuid, extension: &str) -> String {
        let suffix: u32 = rand::thread_rng().gen();
        format!(
            "{user_id}_{suffix:08x}_{}.{extension}",
            Utc::now().format("%Y%m%d%H%M%S")
        )
    }

    /// Stored paths must stay inside the upload root
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let candidate = Path::new(path);
        let file_name = candidate
            .file_name()
            .ok_or_else(|| StorageError::InvalidPath(path.to_string()))?;
        let resolved = self.root.join(file_name);
        if candidate != resolved.as_path() {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(resolved)
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save(&self, user_id: Uuid, original_name: &str, content: &[u8]) -> Result<StoredFile, StorageError> {
        let extension = self.validate(original_name, content.len())?;

        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(Self::unique_name(user_id, &extension));
        tokio::fs::write(&path, content).await?;

        tracing::info!(
            user_id = %user_id,
            path = %path.display(),
            size = content.len(),
            "Stored uploaded file"
        );

        Ok(StoredFile {
            path: path.to_string_lossy().into_owned(),
            original_name: original_name.to_string(),
            size: i64::try_from(content.len()).unwrap_or(i64::MAX),
            extension,
        })
    }

    async fn delete(&self, path: &str) -> Result<bool, StorageError> {
        let resolved = self.resolve(path)?;
        match tokio::fs::remove_file(&resolved).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

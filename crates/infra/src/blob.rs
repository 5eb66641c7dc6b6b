//! Recipe image storage.
//!
//! References are relative paths of the form `recipes/<uuid>.<ext>`.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

use thiserror::Error;
use uuid::Uuid;

use galley_core::{DomainError, DomainResult};

/// Largest accepted image (2048 KiB).
pub const MAX_IMAGE_BYTES: usize = 2048 * 1024;

const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/png", "png"),
    ("image/jpeg", "jpg"),
    ("image/jpg", "jpg"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
];

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("invalid image reference: {0}")]
    InvalidReference(String),

    #[error("image storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image storage unavailable: {0}")]
    Unavailable(String),
}

/// Check an upload against the size limit and the accepted image types.
///
/// Returns the file extension to store the image under.
pub fn validate_image(bytes: &[u8], content_type: &str) -> DomainResult<&'static str> {
    if bytes.is_empty() {
        return Err(DomainError::validation("image", "is required"));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(DomainError::validation("image", "may not be greater than 2048 kilobytes"));
    }
    let mime = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    ALLOWED_TYPES
        .iter()
        .find(|(t, _)| *t == mime)
        .map(|(_, ext)| *ext)
        .ok_or_else(|| DomainError::validation("image", "must be a file of type: jpeg, png, jpg, gif, webp"))
}

/// Blob storage for recipe images.
#[async_trait::async_trait]
pub trait ImageStore: Send + Sync {
    /// Store an image and return its reference.
    async fn store(&self, bytes: &[u8], extension: &str) -> Result<String, BlobError>;

    /// Delete an image. Deleting a reference that does not exist is not an error.
    async fn delete(&self, reference: &str) -> Result<(), BlobError>;
}

fn new_reference(extension: &str) -> String {
    format!("recipes/{}.{}", Uuid::now_v7(), extension)
}

/// Filesystem image store rooted at a directory.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, reference: &str) -> Result<PathBuf, BlobError> {
        let relative = Path::new(reference);
        let plain = relative.components().all(|c| matches!(c, Component::Normal(_)));
        if reference.is_empty() || !plain {
            return Err(BlobError::InvalidReference(reference.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait::async_trait]
impl ImageStore for LocalImageStore {
    async fn store(&self, bytes: &[u8], extension: &str) -> Result<String, BlobError> {
        let reference = new_reference(extension);
        let path = self.resolve(&reference)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        tracing::debug!(%reference, size = bytes.len(), "stored recipe image");
        Ok(reference)
    }

    async fn delete(&self, reference: &str) -> Result<(), BlobError> {
        let path = self.resolve(reference)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory image store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryImageStore {
    inner: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.inner.read().map(|m| m.contains_key(reference)).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait::async_trait]
impl ImageStore for InMemoryImageStore {
    async fn store(&self, bytes: &[u8], extension: &str) -> Result<String, BlobError> {
        let reference = new_reference(extension);
        let mut map = self
            .inner
            .write()
            .map_err(|_| BlobError::Unavailable("image map lock poisoned".to_string()))?;
        map.insert(reference.clone(), bytes.to_vec());
        Ok(reference)
    }

    async fn delete(&self, reference: &str) -> Result<(), BlobError> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| BlobError::Unavailable("image map lock poisoned".to_string()))?;
        map.remove(reference);
        Ok(())
    }
}

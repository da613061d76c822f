//! Image attachments for movies and users.

use std::sync::Arc;

use cinelog_common::{AppResult, StorageBackend, generate_storage_key};

/// An uploaded image.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/") && !self.bytes.is_empty()
    }
}

/// Stores attachments under a per-owner scope.
#[derive(Clone)]
pub struct Attachments {
    storage: Arc<dyn StorageBackend>,
}

impl Attachments {
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Store an image, returning its key.
    pub async fn store(&self, scope: &str, upload: &ImageUpload) -> AppResult<String> {
        let key = generate_storage_key(scope, &upload.filename);
        let stored = self
            .storage
            .upload(&key, &upload.bytes, &upload.content_type)
            .await?;
        tracing::debug!(key = %stored.key, size = stored.size, "Stored attachment");
        Ok(stored.key)
    }

    /// Delete an image. Failures are logged, the row it belonged to is already gone.
    pub async fn remove(&self, key: &str) {
        if let Err(e) = self.storage.delete(key).await {
            tracing::warn!(error = %e, key = %key, "Failed to delete attachment");
        }
    }

    #[must_use]
    pub fn url(&self, key: &str) -> String {
        self.storage.public_url(key)
    }
}

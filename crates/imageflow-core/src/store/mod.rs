mod memory;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;

use crate::image::Image;

pub use memory::MemoryImageStore;
pub use sqlite::SqliteImageStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Image not found: {namespace}/{name}")]
    NotFound { namespace: String, name: String },
    #[error("Image already exists: {namespace}/{name}")]
    AlreadyExists { namespace: String, name: String },
    #[error("Image {namespace}/{name} was modified concurrently (expected version {expected}, found {actual})")]
    Conflict {
        namespace: String,
        name: String,
        expected: i64,
        actual: i64,
    },
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn not_found(namespace: &str, name: &str) -> Self {
        Self::NotFound {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Keyed document store for image resources.
///
/// `update_status` is a compare-and-update on `resource_version`: it replaces
/// the whole status of the stored image only when the caller saw the latest
/// version, and fails with [`StoreError::Conflict`] otherwise.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn get_image(&self, namespace: &str, name: &str) -> StoreResult<Image>;

    /// Insert a new image; the stored copy starts at version 1.
    async fn create_image(&self, image: &Image) -> StoreResult<Image>;

    async fn update_status(&self, image: &Image) -> StoreResult<Image>;
}

#[async_trait]
impl<T: ImageStore + ?Sized> ImageStore for Arc<T> {
    async fn get_image(&self, namespace: &str, name: &str) -> StoreResult<Image> {
        (**self).get_image(namespace, name).await
    }

    async fn create_image(&self, image: &Image) -> StoreResult<Image> {
        (**self).create_image(image).await
    }

    async fn update_status(&self, image: &Image) -> StoreResult<Image> {
        (**self).update_status(image).await
    }
}

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ImageStore, StoreError, StoreResult};
use crate::image::Image;

/// In-process store. Not durable; used by tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryImageStore {
    images: RwLock<HashMap<(String, String), Image>>,
}

impl MemoryImageStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn get_image(&self, namespace: &str, name: &str) -> StoreResult<Image> {
        self.images
            .read()
            .await
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::not_found(namespace, name))
    }

    async fn create_image(&self, image: &Image) -> StoreResult<Image> {
        let mut images = self.images.write().await;
        let key = (image.namespace.clone(), image.name.clone());
        if images.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                namespace: key.0,
                name: key.1,
            });
        }

        let mut stored = image.clone();
        stored.resource_version = 1;
        images.insert(key, stored.clone());
        Ok(stored)
    }

    async fn update_status(&self, image: &Image) -> StoreResult<Image> {
        let mut images = self.images.write().await;
        let stored = images
            .get_mut(&(image.namespace.clone(), image.name.clone()))
            .ok_or_else(|| StoreError::not_found(&image.namespace, &image.name))?;

        if stored.resource_version != image.resource_version {
            return Err(StoreError::Conflict {
                namespace: image.namespace.clone(),
                name: image.name.clone(),
                expected: image.resource_version,
                actual: stored.resource_version,
            });
        }

        stored.status = image.status.clone();
        stored.resource_version += 1;
        Ok(stored.clone())
    }
}

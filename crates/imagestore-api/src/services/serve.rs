//! Read path: resolve an image id to the bytes of its original or thumbnail.

use std::sync::Arc;

use bytes::Bytes;
use imagestore_core::constants::THUMBNAIL_CONTENT_TYPE;
use imagestore_db::ImageIndex;
use imagestore_storage::{ImageStore, StorageError};
use uuid::Uuid;

use super::catalog::CatalogError;

#[derive(Debug, Clone)]
pub struct ServedImage {
    pub bytes: Bytes,
    pub content_type: String,
}

#[derive(Clone)]
pub struct ServeService {
    store: ImageStore,
    index: Arc<dyn ImageIndex>,
}

impl ServeService {
    pub fn new(store: ImageStore, index: Arc<dyn ImageIndex>) -> Self {
        Self { store, index }
    }

    /// Every path is re-validated against the storage root before it is opened, even
    /// though it comes from the index.
    #[tracing::instrument(skip(self), fields(image_id = %id))]
    pub async fn serve(&self, id: Uuid, want_thumbnail: bool) -> Result<ServedImage, CatalogError> {
        let record = self.index.get(id).await?;

        let (rel, content_type) = if want_thumbnail {
            (record.thumbnail_relpath, THUMBNAIL_CONTENT_TYPE.to_string())
        } else {
            (record.original_relpath, record.content_type)
        };

        let bytes = self.store.read(&rel).await.map_err(|e| match e {
            StorageError::NotFound(_) => {
                tracing::warn!(path = %rel, "Indexed image is missing on disk");
                CatalogError::NotFound(id)
            }
            other => CatalogError::Storage(other),
        })?;

        Ok(ServedImage {
            bytes,
            content_type,
        })
    }
}

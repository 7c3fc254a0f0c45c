//! Catalog service: metadata lookup, listing, deletion and URL building.

use std::sync::Arc;

use imagestore_core::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use imagestore_core::{image_url, AppError, ImageView, OwnerId};
use imagestore_db::{ImageIndex, IndexError};
use imagestore_storage::{ImageStore, StorageError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Image not found")]
    NotFound(Uuid),

    #[error("Image {0} belongs to another user")]
    Forbidden(Uuid),

    #[error("Invalid page token: {0:?}")]
    InvalidPageToken(String),

    #[error("Image count {0} exceeds the supported range")]
    CountOverflow(i64),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Index(IndexError),
}

impl From<IndexError> for CatalogError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::NotFound(id) => CatalogError::NotFound(id),
            other => CatalogError::Index(other),
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(_) => AppError::NotFound(err.to_string()),
            CatalogError::Forbidden(_) => AppError::Forbidden(err.to_string()),
            CatalogError::InvalidPageToken(_) => AppError::InvalidInput(err.to_string()),
            CatalogError::CountOverflow(_) => AppError::Internal(err.to_string()),
            CatalogError::Storage(e) => e.into(),
            CatalogError::Index(e) => e.into(),
        }
    }
}

/// One page of an owner's images, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePage {
    pub images: Vec<ImageView>,
    /// Offset of the next page; absent on the last page.
    pub next_page_token: Option<String>,
    pub total_count: i32,
}

/// Page size actually used for a requested size: non-positive means the default,
/// anything above the cap is clamped.
pub fn effective_page_size(requested: i64) -> i64 {
    if requested <= 0 {
        DEFAULT_PAGE_SIZE
    } else {
        requested.min(MAX_PAGE_SIZE)
    }
}

/// Page tokens are decimal offsets; an empty or absent token is the first page.
pub fn parse_page_token(token: Option<&str>) -> Result<i64, CatalogError> {
    match token.map(str::trim) {
        None | Some("") => Ok(0),
        Some(raw) => raw
            .parse::<i64>()
            .ok()
            .filter(|offset| *offset >= 0)
            .ok_or_else(|| CatalogError::InvalidPageToken(raw.to_string())),
    }
}

#[derive(Clone)]
pub struct CatalogService {
    store: ImageStore,
    index: Arc<dyn ImageIndex>,
    base_url: String,
}

impl CatalogService {
    pub fn new(store: ImageStore, index: Arc<dyn ImageIndex>, base_url: impl Into<String>) -> Self {
        Self {
            store,
            index,
            base_url: base_url.into(),
        }
    }

    #[tracing::instrument(skip(self), fields(image_id = %id))]
    pub async fn get_metadata(&self, id: Uuid) -> Result<ImageView, CatalogError> {
        let record = self.index.get(id).await?;
        Ok(ImageView::from_record(record, &self.base_url))
    }

    #[tracing::instrument(skip(self), fields(owner = %owner))]
    pub async fn list(
        &self,
        owner: &OwnerId,
        page_size: i64,
        page_token: Option<&str>,
    ) -> Result<ImagePage, CatalogError> {
        let page_size = effective_page_size(page_size);
        let offset = parse_page_token(page_token)?;

        let records = self.index.list(owner, page_size, offset).await?;
        let total = self.index.count(owner).await?;
        let total_count = i32::try_from(total).map_err(|_| CatalogError::CountOverflow(total))?;

        let next_page_token = offset
            .checked_add(page_size)
            .filter(|next| *next < total)
            .map(|next| next.to_string());

        Ok(ImagePage {
            images: records
                .into_iter()
                .map(|record| ImageView::from_record(record, &self.base_url))
                .collect(),
            next_page_token,
            total_count,
        })
    }

    /// Delete an image owned by `owner`.
    ///
    /// The index record goes first; file removal afterwards is best-effort and only
    /// logged on failure.
    #[tracing::instrument(skip(self), fields(image_id = %id, owner = %owner))]
    pub async fn delete(&self, id: Uuid, owner: &OwnerId) -> Result<(), CatalogError> {
        let record = self.index.get(id).await?;
        if &record.owner != owner {
            return Err(CatalogError::Forbidden(id));
        }

        self.index.delete(id).await?;

        if let Err(e) = self
            .store
            .remove(&record.original_relpath, &record.thumbnail_relpath)
            .await
        {
            tracing::warn!(
                error = %e,
                original = %record.original_relpath,
                thumbnail = %record.thumbnail_relpath,
                "Failed to remove image files after index delete"
            );
        }

        tracing::info!("Image deleted");
        Ok(())
    }

    pub fn image_url(&self, id: Uuid, thumbnail: bool) -> String {
        image_url(&self.base_url, id, thumbnail)
    }
}

//! Storage setup

use anyhow::{Context, Result};
use imagestore_core::Config;
use imagestore_processing::ThumbnailRenderer;
use imagestore_storage::{ImageStore, StorageRoot};

pub async fn setup_storage(config: &Config) -> Result<ImageStore> {
    let root = StorageRoot::open(config.storage_root())
        .await
        .context("Failed to open storage root")?;

    tracing::info!(
        root = %root.path().display(),
        thumbnail_size = config.thumbnail_size(),
        thumbnail_quality = config.thumbnail_quality(),
        "Local storage initialized"
    );

    let renderer = ThumbnailRenderer::new(config.thumbnail_size(), config.thumbnail_quality());
    Ok(ImageStore::new(root, renderer))
}

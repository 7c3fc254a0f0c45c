//! Service wiring

use std::sync::Arc;

use imagestore_core::Config;
use imagestore_db::ImageIndex;
use imagestore_storage::ImageStore;

use crate::services::{CatalogService, IngestService, ServeService};
use crate::state::AppState;

pub fn initialize_services(
    config: &Config,
    store: ImageStore,
    index: Arc<dyn ImageIndex>,
) -> Arc<AppState> {
    Arc::new(AppState {
        ingest: IngestService::new(
            store.clone(),
            index.clone(),
            config.base_url(),
            config.max_upload_bytes(),
        ),
        catalog: CatalogService::new(store.clone(), index.clone(), config.base_url()),
        images: ServeService::new(store, index),
    })
}

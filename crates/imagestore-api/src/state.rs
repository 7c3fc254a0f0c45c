//! Application state shared by all handlers.

use crate::services::{CatalogService, IngestService, ServeService};

#[derive(Clone)]
pub struct AppState {
    pub ingest: IngestService,
    pub catalog: CatalogService,
    pub images: ServeService,
}

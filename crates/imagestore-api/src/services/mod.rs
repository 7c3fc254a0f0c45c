//! Business logic between the HTTP handlers and the storage/index crates.

pub mod catalog;
pub mod ingest;
pub mod serve;

pub use catalog::{CatalogError, CatalogService, ImagePage};
pub use ingest::{IngestError, IngestMessage, IngestReceipt, IngestService, UploadMetadata};
pub use serve::{ServeService, ServedImage};

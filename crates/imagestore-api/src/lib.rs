//! Imagestore API Library
//!
//! This crate provides the ingestion orchestrator, the catalog and read services, and the
//! HTTP transport (handlers, error rendering, application setup) built on top of them.

pub mod constants;
pub mod error;
mod handlers;
pub mod services;
pub mod setup;
pub mod state;
pub mod telemetry;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use services::{
    CatalogError, CatalogService, ImagePage, IngestError, IngestMessage, IngestReceipt,
    IngestService, ServeService, ServedImage, UploadMetadata,
};
pub use state::AppState;

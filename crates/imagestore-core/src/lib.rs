//! Imagestore Core Library
//!
//! This crate provides the domain model, error types and configuration shared by
//! every imagestore component: the image record, the owner token, the unified
//! `AppError` taxonomy and the environment-driven `Config`.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{BaseConfig, Config, ImageStoreConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{image_url, ImageRecord, ImageView, InvalidOwnerId, OwnerId};

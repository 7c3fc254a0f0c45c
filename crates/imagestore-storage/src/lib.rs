//! Imagestore Storage Library
//!
//! Filesystem persistence for image artifacts below a single managed root.
//!
//! # Layout
//!
//! - **Originals**: `originals/{owner}/{id}.{ext}`
//! - **Thumbnails**: `thumbnails/{owner}/{id}_thumb.webp`
//!
//! Every relative path is checked by `paths::resolve_and_validate` before it is
//! read, written or deleted, so nothing outside the root is ever touched.

pub mod error;
pub mod id;
pub mod local;
pub mod paths;

// Re-export commonly used types
pub use error::{PathError, StorageError, StorageResult};
pub use id::{IdGenerator, UuidV4Generator};
pub use local::{checked_dimensions, ImageStore, StagedImage};
pub use paths::{derive_paths, resolve_and_validate, ArtifactPaths, StorageRoot};

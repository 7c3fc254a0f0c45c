//! Imagestore Index Library
//!
//! Durable metadata index for stored images. The `ImageIndex` trait is the seam the
//! services depend on; `SqliteImageIndex` is the production implementation and
//! `MemoryImageIndex` keeps everything in process.

pub mod error;
pub mod index;
pub mod memory;
pub mod sqlite;

// Re-export commonly used types
pub use error::{IndexError, IndexResult};
pub use index::ImageIndex;
pub use memory::MemoryImageIndex;
pub use sqlite::SqliteImageIndex;

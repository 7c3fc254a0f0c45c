//! Image processing module
//!
//! - Format detection and decoding (processor)
//! - Thumbnail rendering (thumbnail)

pub mod processor;
pub mod thumbnail;

pub use processor::{decode, DecodeError, SupportedFormat};
pub use thumbnail::{EncodeError, EncodedThumbnail, ThumbnailRenderer};

//! Imagestore Processing Library
//!
//! Content-sniffed decoding of the supported raster formats and fixed-box WebP
//! thumbnail rendering. Everything here is CPU-bound and synchronous; callers on an
//! async runtime are expected to run it on the blocking pool.

pub mod image;

pub use crate::image::{
    decode, DecodeError, EncodeError, EncodedThumbnail, SupportedFormat, ThumbnailRenderer,
};

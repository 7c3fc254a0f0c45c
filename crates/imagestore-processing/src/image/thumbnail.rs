//! Thumbnail rendering
//!
//! A thumbnail is the source raster fitted into a square box (longer side equal to the
//! box, aspect ratio kept, Lanczos3 resampling) and encoded as lossy WebP. Rasters that
//! already fit are encoded at their native size.

use bytes::Bytes;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use imagestore_core::constants::{DEFAULT_THUMBNAIL_QUALITY, DEFAULT_THUMBNAIL_SIZE};

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("cannot render thumbnail of an empty {width}x{height} raster")]
    EmptyRaster { width: u32, height: u32 },

    #[error("webp encoding failed: {0}")]
    WebP(String),
}

#[derive(Debug, Clone)]
pub struct EncodedThumbnail {
    pub bytes: Bytes,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct ThumbnailRenderer {
    size: u32,
    quality: u8,
}

impl Default for ThumbnailRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_THUMBNAIL_SIZE, DEFAULT_THUMBNAIL_QUALITY)
    }
}

impl ThumbnailRenderer {
    pub fn new(size: u32, quality: u8) -> Self {
        Self {
            size: size.max(1),
            quality: quality.min(100),
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn render(&self, img: &DynamicImage) -> Result<EncodedThumbnail, EncodeError> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(EncodeError::EmptyRaster { width, height });
        }

        let fitted;
        let source = if width > self.size || height > self.size {
            fitted = img.resize(self.size, self.size, FilterType::Lanczos3);
            &fitted
        } else {
            img
        };

        let (thumb_width, thumb_height) = source.dimensions();
        let rgba = source.to_rgba8();
        let encoded = webp::Encoder::from_rgba(&rgba, thumb_width, thumb_height)
            .encode_simple(false, f32::from(self.quality))
            .map_err(|e| EncodeError::WebP(format!("{:?}", e)))?;

        tracing::debug!(
            source_width = width,
            source_height = height,
            width = thumb_width,
            height = thumb_height,
            size_bytes = encoded.len(),
            "Thumbnail rendered"
        );

        Ok(EncodedThumbnail {
            bytes: Bytes::copy_from_slice(&encoded),
            width: thumb_width,
            height: thumb_height,
        })
    }
}

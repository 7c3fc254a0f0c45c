//! Format detection and decoding

use image::{DynamicImage, ImageFormat};

/// Raster formats the store accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SupportedFormat {
    Jpeg,
    Png,
    Gif,
    WebP,
}

/// Sniffed container format -> supported format. Anything missing is rejected.
const SIGNATURE_TABLE: &[(ImageFormat, SupportedFormat)] = &[
    (ImageFormat::Jpeg, SupportedFormat::Jpeg),
    (ImageFormat::Png, SupportedFormat::Png),
    (ImageFormat::Gif, SupportedFormat::Gif),
    (ImageFormat::WebP, SupportedFormat::WebP),
];

impl SupportedFormat {
    /// Canonical file extension, without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            SupportedFormat::Jpeg => "jpg",
            SupportedFormat::Png => "png",
            SupportedFormat::Gif => "gif",
            SupportedFormat::WebP => "webp",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            SupportedFormat::Jpeg => "image/jpeg",
            SupportedFormat::Png => "image/png",
            SupportedFormat::Gif => "image/gif",
            SupportedFormat::WebP => "image/webp",
        }
    }

    pub fn to_image_format(self) -> ImageFormat {
        match self {
            SupportedFormat::Jpeg => ImageFormat::Jpeg,
            SupportedFormat::Png => ImageFormat::Png,
            SupportedFormat::Gif => ImageFormat::Gif,
            SupportedFormat::WebP => ImageFormat::WebP,
        }
    }

    /// Detect the format from the payload's leading bytes. The filename is never consulted.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        let detected = image::guess_format(data).ok()?;
        SIGNATURE_TABLE
            .iter()
            .find(|(format, _)| *format == detected)
            .map(|(_, supported)| *supported)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unsupported image format")]
    Unsupported,

    #[error("malformed {format:?} image: {message}")]
    Malformed {
        format: SupportedFormat,
        message: String,
    },
}

/// Decode a payload into a raster plus its sniffed format.
pub fn decode(data: &[u8]) -> Result<(DynamicImage, SupportedFormat), DecodeError> {
    let format = SupportedFormat::sniff(data).ok_or(DecodeError::Unsupported)?;
    let img = image::load_from_memory_with_format(data, format.to_image_format()).map_err(
        |e| DecodeError::Malformed {
            format,
            message: e.to_string(),
        },
    )?;
    Ok((img, format))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn encode_rgba(format: ImageFormat, width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([255, 0, 0, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), format).unwrap();
        buffer
    }

    fn create_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([0, 128, 255]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
            .unwrap();
        buffer
    }

    #[test]
    fn test_decode_png() {
        let data = encode_rgba(ImageFormat::Png, 100, 50);
        let (img, format) = decode(&data).unwrap();
        assert_eq!(format, SupportedFormat::Png);
        assert_eq!(img.dimensions(), (100, 50));
    }

    #[test]
    fn test_decode_jpeg() {
        let data = create_jpeg(64, 32);
        let (img, format) = decode(&data).unwrap();
        assert_eq!(format, SupportedFormat::Jpeg);
        assert_eq!(format.extension(), "jpg");
        assert_eq!(img.dimensions(), (64, 32));
    }

    #[test]
    fn test_decode_gif() {
        let data = encode_rgba(ImageFormat::Gif, 8, 8);
        let (_, format) = decode(&data).unwrap();
        assert_eq!(format, SupportedFormat::Gif);
    }

    #[test]
    fn test_decode_webp() {
        let rgba = RgbaImage::from_pixel(16, 16, Rgba([10, 20, 30, 255]));
        let data = webp::Encoder::from_rgba(&rgba, 16, 16).encode(80.0);
        let (img, format) = decode(&data).unwrap();
        assert_eq!(format, SupportedFormat::WebP);
        assert_eq!(img.dimensions(), (16, 16));
    }

    #[test]
    fn test_decode_rejects_unknown_bytes() {
        assert!(matches!(
            decode(b"not an image"),
            Err(DecodeError::Unsupported)
        ));
        assert!(matches!(decode(&[]), Err(DecodeError::Unsupported)));
    }

    #[test]
    fn test_decode_rejects_recognised_but_unsupported_format() {
        let mut bmp = b"BM".to_vec();
        bmp.extend_from_slice(&[0u8; 64]);
        assert!(matches!(decode(&bmp), Err(DecodeError::Unsupported)));
    }

    #[test]
    fn test_decode_truncated_payload_is_malformed() {
        let data = encode_rgba(ImageFormat::Png, 100, 100);
        let truncated = &data[..data.len() / 3];
        match decode(truncated) {
            Err(DecodeError::Malformed { format, .. }) => assert_eq!(format, SupportedFormat::Png),
            other => panic!("expected malformed, got {:?}", other.map(|(_, f)| f)),
        }
    }

    #[test]
    fn test_sniff_uses_content_signature() {
        let data = encode_rgba(ImageFormat::Png, 4, 4);
        assert_eq!(SupportedFormat::sniff(&data), Some(SupportedFormat::Png));
        assert_eq!(SupportedFormat::Png.mime_type(), "image/png");
    }
}

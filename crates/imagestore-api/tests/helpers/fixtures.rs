//! Test fixtures: small encoded images built with the `image` crate.

use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};

fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format)
        .expect("Failed to encode test image");
    out.into_inner()
}

/// Gradient PNG of the given dimensions.
pub fn create_test_png(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Png)
}

pub fn create_test_jpeg(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageFormat::Jpeg)
}

/// Bytes that no supported decoder recognises.
pub fn create_garbage() -> Vec<u8> {
    b"this is definitely not an image".to_vec()
}

//! Data models for the application

mod image;
mod owner;

pub use image::*;
pub use owner::*;

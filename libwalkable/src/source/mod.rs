//! Where the photo for a run comes from
//!
//! A source yields one [`Post`] per run: the photo re-encoded as JPEG and
//! the description built from the walk metadata embedded in its EXIF.

use std::io::Cursor;

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat};

use crate::error::{Result, SourceError};
use crate::types::{ImageMimeType, Post};

pub mod exif;
pub mod meta;
pub mod s3;

pub use meta::ImageMeta;
pub use s3::S3Source;

#[async_trait]
pub trait PostSource: Send + Sync {
    async fn next_post(&self) -> Result<Post>;
}

/// Turn a downloaded photo into a post
pub fn build_post(image: &[u8]) -> Result<Post> {
    let raw = exif::image_description(image)?;
    let meta = ImageMeta::parse(&raw)?;
    let media = reencode_jpeg(image)?;

    Ok(Post::new(media, ImageMimeType::Jpeg, meta.describe()))
}

/// Decode any supported format and write it back as a baseline JPEG.
///
/// Re-encoding drops all metadata segments, EXIF included.
pub fn reencode_jpeg(image: &[u8]) -> std::result::Result<Vec<u8>, SourceError> {
    let decoded = image::load_from_memory(image)
        .map_err(|e| SourceError::Image(format!("failed to decode image: {}", e)))?;

    let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());
    let mut buffer = Cursor::new(Vec::new());
    rgb.write_to(&mut buffer, ImageFormat::Jpeg)
        .map_err(|e| SourceError::Image(format!("failed to encode JPEG: {}", e)))?;

    Ok(buffer.into_inner())
}

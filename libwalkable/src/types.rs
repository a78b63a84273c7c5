//! Core types for Walkable

/// A ready-to-publish photo.
///
/// Produced once per run by a [`PostSource`](crate::source::PostSource) and
/// only read afterwards.
#[derive(Debug, Clone)]
pub struct Post {
    /// Encoded image bytes
    pub media: Vec<u8>,
    pub mime_type: ImageMimeType,
    /// Plain-text description, used as post text and alt text
    pub description: String,
}

impl Post {
    pub fn new(media: Vec<u8>, mime_type: ImageMimeType, description: String) -> Self {
        Self {
            media,
            mime_type,
            description,
        }
    }
}

/// Image encodings a post can carry. Sources always re-encode to JPEG.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMimeType {
    Jpeg,
}

impl ImageMimeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Typical file extension, used when a form upload wants a file name
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
        }
    }
}

impl std::fmt::Display for ImageMimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

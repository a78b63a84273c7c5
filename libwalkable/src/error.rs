//! Error types for Walkable

use thiserror::Error;

pub type Result<T> = std::result::Result<T, WalkableError>;

#[derive(Error, Debug)]
pub enum WalkableError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Image source error: {0}")]
    Source(#[from] SourceError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Failures of a single remote call against a social backend.
///
/// Each variant names the stage that failed; the message carries the
/// operation and the HTTP status so a log line alone is enough to diagnose.
#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Media upload failed: {0}")]
    Upload(String),

    #[error("Posting failed: {0}")]
    Posting(String),

    #[error("Listing records failed: {0}")]
    PurgeList(String),

    #[error("Deleting record failed: {0}")]
    PurgeDelete(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Object storage request failed: {0}")]
    Storage(String),

    #[error("No images found in bucket {0}")]
    Empty(String),

    #[error("Image metadata unreadable: {0}")]
    Metadata(String),

    #[error("Image processing failed: {0}")]
    Image(String),
}

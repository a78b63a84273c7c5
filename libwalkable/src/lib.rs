//! Walkable - posts a random suburban walk photo to Bluesky and X
//!
//! Each run picks one photo from object storage, describes the walk recorded
//! in its metadata, publishes it, and purges Bluesky posts past the
//! retention window.

pub mod config;
pub mod error;
pub mod logging;
pub mod platforms;
pub mod poster;
pub mod source;
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, WalkableError};
pub use poster::Poster;
pub use types::{ImageMimeType, Post};

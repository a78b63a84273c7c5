//! Platform abstraction and implementations
//!
//! Each backend publishes one [`Post`] per run through the [`Platform`]
//! trait. A publish run is best-effort: stage failures that leave later
//! stages possible are recorded in the returned [`PublishReport`] rather
//! than aborting the run.
//!
//! # Examples
//!
//! ```no_run
//! use libwalkable::config::Config;
//! use libwalkable::platforms::{bluesky::BlueskyClient, Platform};
//! use libwalkable::types::{ImageMimeType, Post};
//!
//! # async fn example() -> libwalkable::error::Result<()> {
//! let config = Config::from_env()?;
//! let client = BlueskyClient::new(config.bluesky);
//!
//! let post = Post::new(vec![], ImageMimeType::Jpeg, "Park St\n".to_string());
//! let report = client.publish(&post).await?;
//! println!("{}: posted = {}", report.platform, report.posted);
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;

use crate::error::Result;
use crate::platforms::bluesky::PurgeReport;
use crate::types::Post;

pub mod bluesky;
pub mod x;

#[cfg(test)]
pub mod mock;

/// Platform trait for publishing to a social backend
#[async_trait]
pub trait Platform: Send + Sync {
    /// Lowercase identifier for the platform (e.g., "bluesky", "x")
    fn name(&self) -> &str;

    /// Publish the post and run any per-platform housekeeping.
    ///
    /// # Errors
    ///
    /// Returns an error only when nothing further can be attempted on this
    /// platform (e.g. login failed). Failures of individual stages are
    /// logged and collected in [`PublishReport::errors`].
    async fn publish(&self, post: &Post) -> Result<PublishReport>;
}

/// Outcome of one publish run on one platform
#[derive(Debug, Clone, Default)]
pub struct PublishReport {
    /// Platform name (e.g., "bluesky", "x")
    pub platform: String,
    /// Whether the post itself was created
    pub posted: bool,
    /// Platform-specific post ID, when the platform returned one
    pub post_id: Option<String>,
    /// Retention pass results, for platforms that purge
    pub purge: Option<PurgeReport>,
    /// Messages of stage failures that did not abort the run
    pub errors: Vec<String>,
}

impl PublishReport {
    pub fn new(platform: &str) -> Self {
        Self {
            platform: platform.to_string(),
            ..Default::default()
        }
    }

    /// Report for a run that failed before anything could be attempted
    pub fn failed(platform: &str, error: String) -> Self {
        Self {
            platform: platform.to_string(),
            errors: vec![error],
            ..Default::default()
        }
    }

    /// True when the post was created and no stage failed
    pub fn is_clean(&self) -> bool {
        self.posted && self.errors.is_empty()
    }
}

const BODY_EXCERPT_LIMIT: usize = 200;

/// Lossy, length-capped view of a response body for error messages
pub(crate) fn body_excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.chars().count() <= BODY_EXCERPT_LIMIT {
        return text.to_string();
    }
    let mut excerpt: String = text.chars().take(BODY_EXCERPT_LIMIT).collect();
    excerpt.push_str("...");
    excerpt
}

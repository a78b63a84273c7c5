//! Multi-platform posting orchestration
//!
//! Publishes the run's post to every configured platform, one after the
//! other, and collects a report per platform. A platform that fails outright
//! does not stop the ones after it.

use tracing::{info, warn};

use crate::config::{BlueskyConfig, XConfig};
use crate::platforms::{bluesky::BlueskyClient, x::XClient, Platform, PublishReport};
use crate::types::Post;

/// Publishes one post to a fixed list of platforms, in order
pub struct Poster {
    platforms: Vec<Box<dyn Platform>>,
}

impl Poster {
    /// Create a poster over the given platforms
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use libwalkable::config::Config;
    /// use libwalkable::poster::{create_platforms, Poster};
    ///
    /// # fn example() -> libwalkable::error::Result<()> {
    /// let config = Config::load()?;
    /// let poster = Poster::new(create_platforms(config.bluesky, config.x));
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(platforms: Vec<Box<dyn Platform>>) -> Self {
        Self { platforms }
    }

    pub fn platform_names(&self) -> Vec<&str> {
        self.platforms.iter().map(|p| p.name()).collect()
    }

    /// Publish to every platform sequentially.
    ///
    /// Returns one report per platform in platform order. A platform whose
    /// run aborted gets a report with `posted == false` and the error message.
    pub async fn publish_all(&self, post: &Post) -> Vec<PublishReport> {
        let mut reports = Vec::with_capacity(self.platforms.len());

        for platform in &self.platforms {
            let name = platform.name();
            info!(platform = name, "Publishing");

            match platform.publish(post).await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    warn!(platform = name, error = %e, "Publish run aborted");
                    reports.push(PublishReport::failed(name, e.to_string()));
                }
            }
        }

        reports
    }
}

/// Platform clients for a run: Bluesky always, X when configured
pub fn create_platforms(bluesky: BlueskyConfig, x: Option<XConfig>) -> Vec<Box<dyn Platform>> {
    let mut platforms: Vec<Box<dyn Platform>> = vec![Box::new(BlueskyClient::new(bluesky))];

    match x {
        Some(x) => platforms.push(Box::new(XClient::new(x))),
        None => info!("X credentials not configured, skipping X"),
    }

    platforms
}

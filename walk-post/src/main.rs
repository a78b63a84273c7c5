//! walk-post - publish one walk photo and purge expired posts

use anyhow::Context;
use libwalkable::config::Config;
use libwalkable::logging;
use libwalkable::poster::{create_platforms, Poster};
use libwalkable::source::{PostSource, S3Source};
use tracing::{error, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    logging::init_default();

    if let Err(e) = run().await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    let source = S3Source::connect(config.source).await;
    let post = source
        .next_post()
        .await
        .with_context(|| format!("preparing a post from bucket {}", source.bucket()))?;
    info!(description = %post.description, size = post.media.len(), "Post ready");

    let poster = Poster::new(create_platforms(config.bluesky, config.x));
    for report in poster.publish_all(&post).await {
        if let Some(purge) = &report.purge {
            info!(
                platform = %report.platform,
                examined = purge.examined,
                deleted = purge.deleted,
                failed = purge.failed,
                skipped = purge.skipped_unparseable,
                "Retention pass finished"
            );
        }

        if report.is_clean() {
            info!(
                platform = %report.platform,
                id = report.post_id.as_deref().unwrap_or("-"),
                "Published"
            );
        } else {
            warn!(
                platform = %report.platform,
                posted = report.posted,
                errors = ?report.errors,
                "Published with errors"
            );
        }
    }

    Ok(())
}

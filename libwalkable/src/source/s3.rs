//! S3-compatible object storage source

use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::Client;
use rand::seq::SliceRandom;
use rand::Rng;
use secrecy::ExposeSecret;
use tracing::{debug, info};

use crate::config::SourceConfig;
use crate::error::{Result, SourceError};
use crate::source::{build_post, PostSource};
use crate::types::Post;

/// Picks one random photo from a bucket per run
pub struct S3Source {
    client: Client,
    bucket: String,
}

impl S3Source {
    /// Build an S3 client from explicit credentials, optionally against a
    /// non-AWS endpoint
    pub async fn connect(config: SourceConfig) -> Self {
        let credentials = Credentials::new(
            &config.access_key_id,
            config.secret_access_key.expose_secret(),
            None,
            None,
            "walkable",
        );

        let shared_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self::new(Client::from_conf(builder.build()), config.bucket)
    }

    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Every object key in the bucket, following continuation tokens
    pub async fn list_keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| {
                    SourceError::Storage(format!(
                        "listing {}: {}",
                        self.bucket,
                        DisplayErrorContext(&e)
                    ))
                })?;

            keys.extend(
                output
                    .contents()
                    .iter()
                    .filter_map(|object| object.key())
                    .filter(|key| !key.ends_with('/'))
                    .map(str::to_string),
            );

            match output.next_continuation_token() {
                Some(token) if output.is_truncated().unwrap_or(false) => {
                    debug!(found = keys.len(), "Listing next page of objects");
                    continuation_token = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(keys)
    }

    /// Full object body
    pub async fn download(&self, key: &str) -> Result<Vec<u8>> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                SourceError::Storage(format!("downloading {}: {}", key, DisplayErrorContext(&e)))
            })?;

        let data = object
            .body
            .collect()
            .await
            .map_err(|e| SourceError::Storage(format!("reading {}: {}", key, e)))?;

        Ok(data.into_bytes().to_vec())
    }
}

/// Uniformly random key, or `None` for an empty listing
pub fn pick_key<'a, R: Rng + ?Sized>(keys: &'a [String], rng: &mut R) -> Option<&'a String> {
    keys.choose(rng)
}

#[async_trait]
impl PostSource for S3Source {
    async fn next_post(&self) -> Result<Post> {
        let keys = self.list_keys().await?;
        info!(bucket = %self.bucket, count = keys.len(), "Images found");

        let key = pick_key(&keys, &mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| SourceError::Empty(self.bucket.clone()))?;
        info!(key = %key, "Randomly selected image");

        let image = self.download(&key).await?;
        debug!(key = %key, size = image.len(), "Downloaded image");

        // decode and re-encode off the async runtime
        tokio::task::spawn_blocking(move || build_post(&image))
            .await
            .map_err(|e| SourceError::Image(format!("image task failed: {}", e)))?
    }
}

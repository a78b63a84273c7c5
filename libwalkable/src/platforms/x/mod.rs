//! X (Twitter) platform implementation
//!
//! Single-shot flow with no retention: upload the image through the v1.1
//! media endpoint, then create the post through the v2 API. Both calls are
//! signed with OAuth 1.0a user-context credentials.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::XConfig;
use crate::error::{PlatformError, Result};
use crate::platforms::{body_excerpt, Platform, PublishReport};
use crate::types::{ImageMimeType, Post};

pub mod oauth;

use oauth::OAuthCredentials;

pub const DEFAULT_API_URL: &str = "https://api.twitter.com";
pub const DEFAULT_UPLOAD_URL: &str = "https://upload.twitter.com";

const MEDIA_UPLOAD_PATH: &str = "/1.1/media/upload.json";
const TWEETS_PATH: &str = "/2/tweets";

#[derive(Deserialize)]
struct MediaUploadResponse {
    media_id_string: String,
}

#[derive(Serialize)]
struct CreateTweetRequest<'a> {
    text: &'a str,
    media: TweetMedia<'a>,
}

#[derive(Serialize)]
struct TweetMedia<'a> {
    media_ids: [&'a str; 1],
}

#[derive(Deserialize)]
struct CreateTweetResponse {
    data: CreatedTweet,
}

#[derive(Deserialize)]
struct CreatedTweet {
    id: String,
}

/// Map a failed X call to a PlatformError.
///
/// 401 and 403 mean the credentials were rejected, 429 is a rate limit;
/// anything else is reported against the failing stage.
fn map_x_error(
    operation: &str,
    status: Option<StatusCode>,
    detail: &str,
    stage: fn(String) -> PlatformError,
) -> PlatformError {
    match status {
        Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN) => {
            PlatformError::Authentication(format!(
                "X rejected credentials during {} ({}): {}",
                operation,
                status.map(|s| s.as_u16()).unwrap_or_default(),
                detail
            ))
        }
        Some(StatusCode::TOO_MANY_REQUESTS) => {
            PlatformError::RateLimit(format!("X {} returned 429: {}", operation, detail))
        }
        Some(status) => stage(format!(
            "X {} returned {}: {}",
            operation,
            status.as_u16(),
            detail
        )),
        None => stage(format!("X {} request failed: {}", operation, detail)),
    }
}

pub struct XClient {
    http: Client,
    api_url: String,
    upload_url: String,
    credentials: OAuthCredentials,
}

impl XClient {
    pub fn new(config: XConfig) -> Self {
        Self::with_endpoints(config, DEFAULT_API_URL, DEFAULT_UPLOAD_URL)
    }

    /// Client against non-default hosts (used by tests)
    pub fn with_endpoints(config: XConfig, api_url: &str, upload_url: &str) -> Self {
        Self {
            http: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            upload_url: upload_url.trim_end_matches('/').to_string(),
            credentials: OAuthCredentials::from(config),
        }
    }

    /// Send a signed request and return the fully-read body of a 2xx response
    async fn execute(
        &self,
        operation: &str,
        request: RequestBuilder,
        stage: fn(String) -> PlatformError,
    ) -> std::result::Result<Vec<u8>, PlatformError> {
        let response = request
            .send()
            .await
            .map_err(|e| map_x_error(operation, None, &e.to_string(), stage))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            map_x_error(
                operation,
                Some(status),
                &format!("failed to read response body: {}", e),
                stage,
            )
        })?;

        info!(operation, status = status.as_u16(), "X response");

        if !status.is_success() {
            return Err(map_x_error(operation, Some(status), &body_excerpt(&body), stage));
        }

        Ok(body.to_vec())
    }

    /// Upload image bytes, returning the media id to attach to a post
    pub async fn upload_media(&self, media: &[u8], mime_type: ImageMimeType) -> Result<String> {
        let operation = "media upload";
        let url = format!("{}{}", self.upload_url, MEDIA_UPLOAD_PATH);
        debug!(size = media.len(), "Uploading media to X");

        let part = Part::bytes(media.to_vec())
            .file_name(format!("media.{}", mime_type.extension()))
            .mime_str(mime_type.as_str())
            .map_err(|e| PlatformError::Upload(format!("invalid media type: {}", e)))?;
        let form = Form::new().part("media", part);

        let request = self
            .http
            .post(&url)
            .header(
                reqwest::header::AUTHORIZATION,
                self.credentials.authorization_header("POST", &url, &[]),
            )
            .multipart(form);

        let body = self.execute(operation, request, PlatformError::Upload).await?;
        let response: MediaUploadResponse = serde_json::from_slice(&body).map_err(|e| {
            PlatformError::Upload(format!("malformed X media upload response: {}", e))
        })?;

        Ok(response.media_id_string)
    }

    /// Create a post with one attached image, returning the post id
    pub async fn create_tweet(&self, text: &str, media_id: &str) -> Result<String> {
        let operation = "create post";
        let url = format!("{}{}", self.api_url, TWEETS_PATH);

        let request = self
            .http
            .post(&url)
            .header(
                reqwest::header::AUTHORIZATION,
                self.credentials.authorization_header("POST", &url, &[]),
            )
            .json(&CreateTweetRequest {
                text,
                media: TweetMedia {
                    media_ids: [media_id],
                },
            });

        let body = self
            .execute(operation, request, PlatformError::Posting)
            .await?;
        let response: CreateTweetResponse = serde_json::from_slice(&body).map_err(|e| {
            PlatformError::Posting(format!("malformed X create post response: {}", e))
        })?;

        Ok(response.data.id)
    }
}

#[async_trait]
impl Platform for XClient {
    fn name(&self) -> &str {
        "x"
    }

    async fn publish(&self, post: &Post) -> Result<PublishReport> {
        let mut report = PublishReport::new(self.name());

        let media_id = match self.upload_media(&post.media, post.mime_type).await {
            Ok(media_id) => media_id,
            Err(e) => {
                warn!(error = %e, "X media upload failed, skipping post");
                report.errors.push(e.to_string());
                return Ok(report);
            }
        };

        match self.create_tweet(&post.description, &media_id).await {
            Ok(id) => {
                info!(id = %id, "Posted to X");
                report.posted = true;
                report.post_id = Some(id);
            }
            Err(e) => {
                warn!(error = %e, "X post creation failed");
                report.errors.push(e.to_string());
            }
        }

        Ok(report)
    }
}

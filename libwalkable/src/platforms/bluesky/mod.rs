//! Bluesky platform implementation
//!
//! Talks to an AT Protocol PDS over plain XRPC (JSON over HTTPS). One
//! publish run is:
//!
//! 1. `com.atproto.server.createSession`
//! 2. `com.atproto.repo.uploadBlob`, then `com.atproto.repo.createRecord`
//! 3. `com.atproto.repo.listRecords` (oldest first), then
//!    `com.atproto.repo.deleteRecord` for each post past the retention window
//!
//! Only a failed login stops the run. A failed upload skips record creation,
//! and neither stops the retention pass.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::BlueskyConfig;
use crate::error::{PlatformError, Result};
use crate::platforms::{body_excerpt, Platform, PublishReport};
use crate::types::Post;

mod blob;
mod record;
mod retention;
mod session;

pub use blob::{BlobLink, MediaReference};
pub use record::{
    tag_text, ByteSlice, EmbeddedImage, Facet, FacetFeature, ImagesEmbed, PostRecord, HASHTAGS,
};
pub use retention::{
    is_expired, PurgeReport, RecordPage, RecordValue, RemotePostSummary, RetentionPolicy,
    RETENTION_DAYS,
};
pub use session::Session;

/// Collection NSID that holds the account's posts
pub const POST_COLLECTION: &str = "app.bsky.feed.post";

/// XRPC methods used by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CreateSession,
    UploadBlob,
    CreateRecord,
    ListRecords,
    DeleteRecord,
}

impl Operation {
    pub fn nsid(&self) -> &'static str {
        match self {
            Operation::CreateSession => "com.atproto.server.createSession",
            Operation::UploadBlob => "com.atproto.repo.uploadBlob",
            Operation::CreateRecord => "com.atproto.repo.createRecord",
            Operation::ListRecords => "com.atproto.repo.listRecords",
            Operation::DeleteRecord => "com.atproto.repo.deleteRecord",
        }
    }

    /// Wrap a message in the error variant for this stage
    fn failure(&self, message: String) -> PlatformError {
        match self {
            Operation::CreateSession => PlatformError::Authentication(message),
            Operation::UploadBlob => PlatformError::Upload(message),
            Operation::CreateRecord => PlatformError::Posting(message),
            Operation::ListRecords => PlatformError::PurgeList(message),
            Operation::DeleteRecord => PlatformError::PurgeDelete(message),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.nsid())
    }
}

/// Error body returned by XRPC endpoints on non-2xx responses
#[derive(Debug, Deserialize)]
struct XrpcErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn xrpc_error_detail(body: &[u8]) -> String {
    match serde_json::from_slice::<XrpcErrorBody>(body) {
        Ok(XrpcErrorBody {
            error: Some(error),
            message: Some(message),
        }) => format!("{}: {}", error, message),
        Ok(XrpcErrorBody {
            error: Some(error),
            message: None,
        }) => error,
        _ => body_excerpt(body),
    }
}

/// Map a failed XRPC call to a PlatformError.
///
/// HTTP 429 on any method is reported as a rate limit; everything else maps
/// to the variant of the failing stage. `status` is `None` for transport
/// failures where no response arrived.
fn map_xrpc_error(operation: Operation, status: Option<StatusCode>, detail: &str) -> PlatformError {
    match status {
        Some(StatusCode::TOO_MANY_REQUESTS) => PlatformError::RateLimit(format!(
            "{} returned 429: {}",
            operation, detail
        )),
        Some(status) => operation.failure(format!(
            "{} returned {}: {}",
            operation,
            status.as_u16(),
            detail
        )),
        None => operation.failure(format!("{} request failed: {}", operation, detail)),
    }
}

pub struct BlueskyClient {
    http: Client,
    pds_url: String,
    identifier: String,
    password: SecretString,
    retention: RetentionPolicy,
}

impl BlueskyClient {
    /// Create a new Bluesky client with the default retention policy
    pub fn new(config: BlueskyConfig) -> Self {
        Self {
            http: Client::new(),
            pds_url: config.pds_url.trim_end_matches('/').to_string(),
            identifier: config.identifier,
            password: config.password,
            retention: RetentionPolicy::default(),
        }
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn retention(&self) -> &RetentionPolicy {
        &self.retention
    }

    fn endpoint(&self, operation: Operation) -> String {
        format!("{}/xrpc/{}", self.pds_url, operation.nsid())
    }

    /// Send a request and return the fully-read body of a 2xx response.
    ///
    /// The body is drained before the status is inspected so the connection
    /// is released on success, error-status and undecodable-body paths alike.
    async fn execute(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> std::result::Result<Vec<u8>, PlatformError> {
        let response = request
            .send()
            .await
            .map_err(|e| map_xrpc_error(operation, None, &e.to_string()))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            map_xrpc_error(
                operation,
                Some(status),
                &format!("failed to read response body: {}", e),
            )
        })?;

        info!(operation = %operation, status = status.as_u16(), "XRPC response");

        if !status.is_success() {
            return Err(map_xrpc_error(operation, Some(status), &xrpc_error_detail(&body)));
        }

        Ok(body.to_vec())
    }

    fn decode<T: DeserializeOwned>(
        operation: Operation,
        body: &[u8],
    ) -> std::result::Result<T, PlatformError> {
        serde_json::from_slice(body)
            .map_err(|e| operation.failure(format!("malformed {} response: {}", operation, e)))
    }
}

#[async_trait]
impl Platform for BlueskyClient {
    fn name(&self) -> &str {
        "bluesky"
    }

    async fn publish(&self, post: &Post) -> Result<PublishReport> {
        let session = self.create_session().await?;
        let mut report = PublishReport::new(self.name());

        match self.upload_blob(&session, &post.media, post.mime_type).await {
            Ok(media) => match self.create_record(&session, post, media).await {
                Ok(uri) => {
                    info!(uri = uri.as_deref().unwrap_or("-"), "Posted to Bluesky");
                    report.posted = true;
                    report.post_id = uri;
                }
                // the uploaded blob stays orphaned on the PDS
                Err(e) => {
                    warn!(error = %e, "Bluesky record creation failed");
                    report.errors.push(e.to_string());
                }
            },
            Err(e) => {
                warn!(error = %e, "Bluesky image upload failed, skipping record creation");
                report.errors.push(e.to_string());
            }
        }

        match self.purge(&session).await {
            Ok(purge) => {
                info!(
                    examined = purge.examined,
                    deleted = purge.deleted,
                    failed = purge.failed,
                    "Bluesky retention pass complete"
                );
                report.errors.extend(purge.errors.iter().cloned());
                report.purge = Some(purge);
            }
            Err(e) => {
                warn!(error = %e, "Bluesky retention pass failed");
                report.errors.push(e.to_string());
            }
        }

        debug!(errors = report.errors.len(), "Bluesky run finished");
        Ok(report)
    }
}

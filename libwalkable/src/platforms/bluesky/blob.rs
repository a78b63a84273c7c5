use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{BlueskyClient, Operation, Session};
use crate::error::Result;
use crate::types::ImageMimeType;

/// Handle to an uploaded blob, embedded verbatim in a post record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaReference {
    #[serde(rename = "$type", default = "blob_type")]
    pub kind: String,
    #[serde(rename = "ref")]
    pub link: BlobLink,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    pub size: u64,
}

/// CID link to blob content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobLink {
    #[serde(rename = "$link")]
    pub link: String,
}

fn blob_type() -> String {
    "blob".to_string()
}

#[derive(Deserialize)]
struct UploadBlobResponse {
    blob: MediaReference,
}

impl BlueskyClient {
    /// Upload raw image bytes in a single request.
    ///
    /// Oversized payloads come back as an `Upload` error carrying the PDS
    /// status (typically 413).
    pub async fn upload_blob(
        &self,
        session: &Session,
        media: &[u8],
        mime_type: ImageMimeType,
    ) -> Result<MediaReference> {
        let operation = Operation::UploadBlob;
        debug!(size = media.len(), mime_type = %mime_type, "Uploading blob");

        let request = self
            .http
            .post(self.endpoint(operation))
            .bearer_auth(session.access_jwt())
            .header(CONTENT_TYPE, mime_type.as_str())
            .body(media.to_vec());

        let body = self.execute(operation, request).await?;
        let response: UploadBlobResponse = Self::decode(operation, &body)?;

        Ok(response.blob)
    }
}

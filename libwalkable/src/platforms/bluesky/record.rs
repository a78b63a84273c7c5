use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{BlueskyClient, MediaReference, Operation, Session, POST_COLLECTION};
use crate::error::Result;
use crate::types::Post;

/// Hashtags appended to every post, in order, without the leading `#`
pub const HASHTAGS: [&str; 2] = ["suburbs", "fail"];

const IMAGES_EMBED_TYPE: &str = "app.bsky.embed.images";
const CREATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Half-open UTF-8 byte range into the record text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByteSlice {
    pub byte_start: usize,
    pub byte_end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum FacetFeature {
    #[serde(rename = "app.bsky.richtext.facet#tag")]
    Tag { tag: String },
}

/// Rich-text annotation binding a byte range of the text to a feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facet {
    pub index: ByteSlice,
    pub features: Vec<FacetFeature>,
}

impl Facet {
    fn tag(byte_start: usize, byte_end: usize, tag: &str) -> Self {
        Self {
            index: ByteSlice {
                byte_start,
                byte_end,
            },
            features: vec![FacetFeature::Tag {
                tag: tag.to_string(),
            }],
        }
    }
}

/// Append [`HASHTAGS`] to the description and annotate each one.
///
/// Tags are separated by a single space and the first tag starts right
/// after the description. Each facet covers `#tag` including the hash and
/// is computed from the text as it is built, so slicing the returned text
/// by a facet's range always yields exactly `#` + its tag.
pub fn tag_text(description: &str) -> (String, Vec<Facet>) {
    let mut text = String::from(description);
    let mut facets = Vec::with_capacity(HASHTAGS.len());

    for (i, tag) in HASHTAGS.iter().enumerate() {
        if i > 0 {
            text.push(' ');
        }
        let byte_start = text.len();
        text.push('#');
        text.push_str(tag);
        facets.push(Facet::tag(byte_start, text.len(), tag));
    }

    (text, facets)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedImage {
    pub alt: String,
    pub image: MediaReference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagesEmbed {
    #[serde(rename = "$type")]
    pub kind: String,
    pub images: Vec<EmbeddedImage>,
}

/// `app.bsky.feed.post` record with one image and the hashtag facets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    #[serde(rename = "$type")]
    pub kind: String,
    pub text: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    pub embed: ImagesEmbed,
    pub facets: Vec<Facet>,
}

impl PostRecord {
    /// Build the record for `post`, embedding `media` with the description as alt text
    pub fn compose(post: &Post, media: MediaReference, now: DateTime<Utc>) -> Self {
        let (text, facets) = tag_text(&post.description);

        Self {
            kind: POST_COLLECTION.to_string(),
            text,
            created_at: now.format(CREATED_AT_FORMAT).to_string(),
            embed: ImagesEmbed {
                kind: IMAGES_EMBED_TYPE.to_string(),
                images: vec![EmbeddedImage {
                    alt: post.description.clone(),
                    image: media,
                }],
            },
            facets,
        }
    }
}

#[derive(Serialize)]
struct CreateRecordRequest<'a> {
    repo: &'a str,
    collection: &'a str,
    record: &'a PostRecord,
}

#[derive(Deserialize)]
struct CreateRecordResponse {
    uri: String,
}

impl BlueskyClient {
    /// Compose and submit the post record.
    ///
    /// Returns the record's AT URI when the PDS reports one; success is
    /// decided by status alone.
    pub async fn create_record(
        &self,
        session: &Session,
        post: &Post,
        media: MediaReference,
    ) -> Result<Option<String>> {
        let record = PostRecord::compose(post, media, Utc::now());
        self.submit_record(session, &record).await
    }

    /// Submit an already-composed record
    pub async fn submit_record(
        &self,
        session: &Session,
        record: &PostRecord,
    ) -> Result<Option<String>> {
        let operation = Operation::CreateRecord;
        debug!(text_bytes = record.text.len(), "Creating post record");

        let request = self
            .http
            .post(self.endpoint(operation))
            .bearer_auth(session.access_jwt())
            .json(&CreateRecordRequest {
                repo: session.did(),
                collection: POST_COLLECTION,
                record,
            });

        let body = self.execute(operation, request).await?;
        Ok(serde_json::from_slice::<CreateRecordResponse>(&body)
            .ok()
            .map(|response| response.uri))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::bluesky::BlobLink;
    use crate::types::ImageMimeType;
    use chrono::TimeZone;
    use serde_json::json;

    fn assert_facets_match(text: &str, facets: &[Facet]) {
        assert_eq!(facets.len(), HASHTAGS.len());
        for (facet, tag) in facets.iter().zip(HASHTAGS) {
            let slice = &text.as_bytes()[facet.index.byte_start..facet.index.byte_end];
            assert_eq!(slice, format!("#{}", tag).as_bytes());
            assert_eq!(
                facet.features,
                vec![FacetFeature::Tag {
                    tag: tag.to_string()
                }]
            );
        }
    }

    fn media() -> MediaReference {
        MediaReference {
            kind: "blob".to_string(),
            link: BlobLink {
                link: "bafkreihash".to_string(),
            },
            mime_type: "image/jpeg".to_string(),
            size: 1024,
        }
    }

    #[test]
    fn test_tag_text_park_st() {
        let (text, facets) = tag_text("Park St\n");

        assert_eq!(text, "Park St\n#suburbs #fail");
        assert_eq!(
            facets[0].index,
            ByteSlice {
                byte_start: 8,
                byte_end: 16
            }
        );
        assert_eq!(
            facets[1].index,
            ByteSlice {
                byte_start: 17,
                byte_end: 22
            }
        );
        assert_eq!(&text[8..16], "#suburbs");
        assert_eq!(&text[17..22], "#fail");
        assert_facets_match(&text, &facets);
    }

    #[test]
    fn test_tag_text_empty_description() {
        let (text, facets) = tag_text("");
        assert_eq!(text, "#suburbs #fail");
        assert_eq!(facets[0].index.byte_start, 0);
        assert_facets_match(&text, &facets);
    }

    #[test]
    fn test_tag_text_ranges_are_utf8_bytes() {
        // 'é' is two bytes, '→' three, the emoji four
        let description = "Rue de l'Église → 🚶\n";
        let (text, facets) = tag_text(description);

        assert_eq!(facets[0].index.byte_start, description.len());
        assert_eq!(
            facets[1].index.byte_start,
            description.len() + "#suburbs".len() + 1
        );
        assert_facets_match(&text, &facets);
    }

    #[test]
    fn test_tag_text_realistic_description() {
        let description = "Maple Grove\nIt could be: 820 feet\nBut it's actually: 1.7 miles\nRatio: 10.94x\n";
        let (text, facets) = tag_text(description);
        assert!(text.starts_with(description));
        assert!(text.ends_with("#suburbs #fail"));
        assert_facets_match(&text, &facets);
        assert!(facets.iter().all(|f| f.index.byte_end <= text.len()));
    }

    #[test]
    fn test_facet_wire_format() {
        let (_, facets) = tag_text("Park St\n");
        assert_eq!(
            serde_json::to_value(&facets).unwrap(),
            json!([
                {
                    "index": { "byteStart": 8, "byteEnd": 16 },
                    "features": [{ "$type": "app.bsky.richtext.facet#tag", "tag": "suburbs" }]
                },
                {
                    "index": { "byteStart": 17, "byteEnd": 22 },
                    "features": [{ "$type": "app.bsky.richtext.facet#tag", "tag": "fail" }]
                }
            ])
        );
    }

    #[test]
    fn test_compose_record() {
        let post = Post::new(vec![1, 2, 3], ImageMimeType::Jpeg, "Park St\n".to_string());
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 3).unwrap();

        let record = PostRecord::compose(&post, media(), now);
        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["$type"], "app.bsky.feed.post");
        assert_eq!(value["text"], "Park St\n#suburbs #fail");
        assert_eq!(value["createdAt"], "2024-03-09T07:05:03Z");
        assert_eq!(value["embed"]["$type"], "app.bsky.embed.images");
        assert_eq!(value["embed"]["images"].as_array().unwrap().len(), 1);
        assert_eq!(value["embed"]["images"][0]["alt"], "Park St\n");
        assert_eq!(value["embed"]["images"][0]["image"]["ref"]["$link"], "bafkreihash");
        assert_eq!(value["facets"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_created_at_drops_fractional_seconds() {
        let post = Post::new(vec![], ImageMimeType::Jpeg, String::new());
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap()
            + chrono::Duration::milliseconds(999);

        let record = PostRecord::compose(&post, media(), now);
        assert_eq!(record.created_at, "2024-12-31T23:59:59Z");
    }
}

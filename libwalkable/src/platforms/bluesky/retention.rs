use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{BlueskyClient, Operation, Session, POST_COLLECTION};
use crate::error::Result;

/// Age threshold past which posts are deleted
pub const RETENTION_DAYS: i64 = 90;

/// How much of the post history one run inspects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Posts at least this old are deleted
    pub window: Duration,
    /// `limit` sent with each listRecords call
    pub page_size: u32,
    /// Pages fetched per run; the cursor is only followed when this is above 1
    pub max_pages: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            window: Duration::days(RETENTION_DAYS),
            page_size: 25,
            max_pages: 1,
        }
    }
}

/// `true` when a post created at `created_at` is at least `window` old at `now`
pub fn is_expired(created_at: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    now.signed_duration_since(created_at) >= window
}

/// One page of `com.atproto.repo.listRecords`
///
/// Entries are decoded one by one; an entry that does not decode is counted
/// in `malformed` instead of failing the whole page.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "RawRecordPage")]
pub struct RecordPage {
    pub cursor: Option<String>,
    pub records: Vec<RemotePostSummary>,
    pub malformed: usize,
}

#[derive(Deserialize)]
struct RawRecordPage {
    #[serde(default)]
    cursor: Option<String>,
    #[serde(default)]
    records: Vec<Value>,
}

impl From<RawRecordPage> for RecordPage {
    fn from(raw: RawRecordPage) -> Self {
        let mut page = RecordPage {
            cursor: raw.cursor,
            ..Default::default()
        };

        for entry in raw.records {
            match serde_json::from_value::<RemotePostSummary>(entry) {
                Ok(summary) => page.records.push(summary),
                Err(e) => {
                    debug!(error = %e, "Undecodable listRecords entry");
                    page.malformed += 1;
                }
            }
        }

        page
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemotePostSummary {
    #[serde(default)]
    pub cid: String,
    pub uri: String,
    #[serde(default)]
    pub value: RecordValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecordValue {
    /// Raw timestamp; a non-string value is kept as `None`
    #[serde(rename = "createdAt", default, deserialize_with = "string_or_none")]
    pub created_at: Option<String>,
}

fn string_or_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

impl RemotePostSummary {
    /// Record key: last path segment of the AT URI
    pub fn rkey(&self) -> Option<&str> {
        self.uri.rsplit('/').next().filter(|key| !key.is_empty())
    }

    /// Parsed creation time, `None` when absent or not RFC 3339
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.value.created_at.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

/// Counters for one retention pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurgeReport {
    pub pages: usize,
    pub examined: usize,
    pub deleted: usize,
    pub failed: usize,
    pub skipped_unparseable: usize,
    /// Messages of the deletes that failed
    pub errors: Vec<String>,
}

#[derive(Serialize)]
struct DeleteRecordRequest<'a> {
    repo: &'a str,
    collection: &'a str,
    rkey: &'a str,
}

impl BlueskyClient {
    /// Fetch one page of the account's posts, oldest first.
    ///
    /// Ordering comes from `reverse=true`; pages are never re-sorted here.
    pub async fn list_records(&self, session: &Session, cursor: Option<&str>) -> Result<RecordPage> {
        let operation = Operation::ListRecords;
        let limit = self.retention.page_size.to_string();

        let mut query = vec![
            ("repo", session.did()),
            ("collection", POST_COLLECTION),
            ("limit", limit.as_str()),
            ("reverse", "true"),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor));
        }

        let request = self.http.get(self.endpoint(operation)).query(&query);
        let body = self.execute(operation, request).await?;
        Ok(Self::decode(operation, &body)?)
    }

    pub async fn delete_record(&self, session: &Session, rkey: &str) -> Result<()> {
        let operation = Operation::DeleteRecord;

        let request = self
            .http
            .post(self.endpoint(operation))
            .bearer_auth(session.access_jwt())
            .json(&DeleteRecordRequest {
                repo: session.did(),
                collection: POST_COLLECTION,
                rkey,
            });

        self.execute(operation, request).await?;
        Ok(())
    }

    /// Delete every listed post older than the retention window
    pub async fn purge(&self, session: &Session) -> Result<PurgeReport> {
        self.purge_at(session, Utc::now()).await
    }

    /// Retention pass evaluated against a fixed `now`.
    ///
    /// Fails only when the first page cannot be listed. Entries are handled
    /// in the order the PDS returns them; a failed delete is logged and
    /// counted and the pass moves on to the next entry.
    pub async fn purge_at(&self, session: &Session, now: DateTime<Utc>) -> Result<PurgeReport> {
        let mut report = PurgeReport::default();
        let mut cursor: Option<String> = None;

        while report.pages < self.retention.max_pages as usize {
            let page = match self.list_records(session, cursor.as_deref()).await {
                Ok(page) => page,
                Err(e) if report.pages == 0 => return Err(e),
                Err(e) => {
                    warn!(error = %e, pages = report.pages, "Stopping retention pass early");
                    report.errors.push(e.to_string());
                    break;
                }
            };
            report.pages += 1;

            if page.malformed > 0 {
                warn!(count = page.malformed, "Skipping undecodable records");
                report.examined += page.malformed;
                report.skipped_unparseable += page.malformed;
            }

            for entry in &page.records {
                self.purge_entry(session, entry, now, &mut report).await;
            }

            cursor = page.cursor;
            if cursor.is_none() || (page.records.is_empty() && page.malformed == 0) {
                break;
            }
        }

        Ok(report)
    }

    async fn purge_entry(
        &self,
        session: &Session,
        entry: &RemotePostSummary,
        now: DateTime<Utc>,
        report: &mut PurgeReport,
    ) {
        report.examined += 1;

        let Some(created_at) = entry.created_at() else {
            debug!(uri = %entry.uri, "Skipping record with unparseable createdAt");
            report.skipped_unparseable += 1;
            return;
        };

        if !is_expired(created_at, now, self.retention.window) {
            return;
        }

        let Some(rkey) = entry.rkey() else {
            warn!(uri = %entry.uri, "Cannot derive record key, not purging");
            report.failed += 1;
            report.errors.push(format!("no record key in {}", entry.uri));
            return;
        };

        info!(uri = %entry.uri, "Purging");
        match self.delete_record(session, rkey).await {
            Ok(()) => report.deleted += 1,
            Err(e) => {
                warn!(uri = %entry.uri, error = %e, "Purge delete failed");
                report.failed += 1;
                report.errors.push(e.to_string());
            }
        }
    }
}

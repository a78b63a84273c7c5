//! Mock platform implementation for testing
//!
//! A configurable platform that can succeed, fail a stage, or fail outright,
//! so the posting sequence can be exercised without network access.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::error::{PlatformError, Result};
use crate::platforms::{Platform, PublishReport};
use crate::types::Post;

/// What a mock publish run does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOutcome {
    /// Post is created
    Success,
    /// Run completes but records a stage error and no post
    StageFailure(String),
    /// Run aborts with an authentication error
    Fatal(String),
}

/// Configuration for mock platform behavior
#[derive(Debug, Clone)]
pub struct MockConfig {
    pub name: String,
    pub outcome: MockOutcome,

    /// Number of times publish has been called
    pub publish_call_count: Arc<Mutex<usize>>,

    /// Descriptions that were published (for verification)
    pub published: Arc<Mutex<Vec<String>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            outcome: MockOutcome::Success,
            publish_call_count: Arc::new(Mutex::new(0)),
            published: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

/// Mock platform for testing
pub struct MockPlatform {
    config: MockConfig,
}

impl MockPlatform {
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    /// Create a mock platform that always succeeds
    pub fn success(name: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// Create a mock platform whose post stage fails
    pub fn stage_failure(name: &str, error: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            outcome: MockOutcome::StageFailure(error.to_string()),
            ..Default::default()
        })
    }

    /// Create a mock platform that cannot log in
    pub fn fatal(name: &str, error: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            outcome: MockOutcome::Fatal(error.to_string()),
            ..Default::default()
        })
    }

    /// Shared handle to the call counter, usable after the mock is boxed
    pub fn call_counter(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.config.publish_call_count)
    }

    pub fn publish_call_count(&self) -> usize {
        *self.config.publish_call_count.lock().unwrap()
    }

    pub fn published(&self) -> Vec<String> {
        self.config.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl Platform for MockPlatform {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn publish(&self, post: &Post) -> Result<PublishReport> {
        *self.config.publish_call_count.lock().unwrap() += 1;

        let mut report = PublishReport::new(&self.config.name);
        match &self.config.outcome {
            MockOutcome::Success => {
                self.config
                    .published
                    .lock()
                    .unwrap()
                    .push(post.description.clone());
                report.posted = true;
                report.post_id = Some(format!("{}:mock-{}", self.config.name, uuid::Uuid::new_v4()));
            }
            MockOutcome::StageFailure(error) => {
                report
                    .errors
                    .push(PlatformError::Posting(error.clone()).to_string());
            }
            MockOutcome::Fatal(error) => {
                return Err(PlatformError::Authentication(error.clone()).into());
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageMimeType;

    fn post() -> Post {
        Post::new(vec![0xff, 0xd8], ImageMimeType::Jpeg, "Park St\n".to_string())
    }

    #[tokio::test]
    async fn test_mock_success() {
        let platform = MockPlatform::success("test");

        let report = platform.publish(&post()).await.unwrap();
        assert!(report.is_clean());
        assert!(report.post_id.unwrap().starts_with("test:mock-"));
        assert_eq!(platform.publish_call_count(), 1);
        assert_eq!(platform.published(), vec!["Park St\n".to_string()]);
    }

    #[tokio::test]
    async fn test_mock_stage_failure() {
        let platform = MockPlatform::stage_failure("test", "status 500");

        let report = platform.publish(&post()).await.unwrap();
        assert!(!report.posted);
        assert_eq!(report.errors, vec!["Posting failed: status 500".to_string()]);
        assert!(platform.published().is_empty());
    }

    #[tokio::test]
    async fn test_mock_fatal() {
        let platform = MockPlatform::fatal("test", "Invalid credentials");

        let err = platform.publish(&post()).await.unwrap_err();
        assert!(err.to_string().contains("Invalid credentials"));
        assert_eq!(platform.publish_call_count(), 1);
    }
}

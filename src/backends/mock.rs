//! Mock transport backends for testing
//!
//! Scripted responses with call recording, so pipeline behavior can be tested
//! without network access. Responses are consumed in FIFO order; when the
//! script runs dry the mock keeps replaying its last configured response.

use super::{RemovalBackend, SearchBackend, VendorResponse};
use crate::error::{BgComposeError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;

/// One scripted mock outcome: a vendor response or a network-level failure
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    /// Deliver this vendor response
    Respond(VendorResponse),
    /// Simulate a network failure (no response)
    NetworkFailure(String),
}

impl ScriptedOutcome {
    fn produce(&self, context: &str) -> Result<VendorResponse> {
        match self {
            Self::Respond(response) => Ok(response.clone()),
            Self::NetworkFailure(message) => Err(BgComposeError::upstream_transient(format!(
                "{context}: {message}"
            ))),
        }
    }
}

#[derive(Debug, Default)]
struct Script {
    queued: VecDeque<ScriptedOutcome>,
    fallback: Option<ScriptedOutcome>,
}

impl Script {
    fn push(&mut self, outcome: ScriptedOutcome) {
        self.fallback = Some(outcome.clone());
        self.queued.push_back(outcome);
    }

    fn next(&mut self, context: &str) -> Result<VendorResponse> {
        match self.queued.pop_front() {
            Some(outcome) => outcome.produce(context),
            None => self
                .fallback
                .as_ref()
                .map_or_else(
                    || {
                        Err(BgComposeError::upstream_transient(format!(
                            "{context}: mock has no scripted response"
                        )))
                    },
                    |outcome| outcome.produce(context),
                ),
        }
    }
}

/// Recorded removal submission
#[derive(Debug, Clone)]
pub struct RecordedSubmit {
    /// File name sent with the multipart part
    pub file_name: String,
    /// MIME type sent with the multipart part
    pub mime_type: String,
    /// Path of the staged upload at submit time
    pub staged_path: std::path::PathBuf,
    /// Whether the staged file existed on disk at submit time
    pub staged_existed: bool,
}

/// Mock removal transport with scripted responses
#[derive(Debug, Default)]
pub struct MockRemovalBackend {
    script: Mutex<Script>,
    submits: Mutex<Vec<RecordedSubmit>>,
}

impl MockRemovalBackend {
    /// Create a mock with no scripted responses
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a successful removal returning the given PNG bytes
    #[must_use]
    pub fn with_cutout(self, png_bytes: Vec<u8>) -> Self {
        self.enqueue(ScriptedOutcome::Respond(VendorResponse::ok_png(png_bytes)));
        self
    }

    /// Script a vendor error response
    #[must_use]
    pub fn with_error(self, status: u16, error: &str, message: &str) -> Self {
        self.enqueue(ScriptedOutcome::Respond(VendorResponse::error(
            status, error, message,
        )));
        self
    }

    /// Script a network-level failure
    #[must_use]
    pub fn with_network_failure(self, message: &str) -> Self {
        self.enqueue(ScriptedOutcome::NetworkFailure(message.to_string()));
        self
    }

    /// Append an outcome to the script
    pub fn enqueue(&self, outcome: ScriptedOutcome) {
        self.script.lock().expect("mock script lock").push(outcome);
    }

    /// Submissions recorded so far
    #[must_use]
    pub fn submits(&self) -> Vec<RecordedSubmit> {
        self.submits.lock().expect("mock submit lock").clone()
    }

    /// Number of submissions recorded so far
    #[must_use]
    pub fn submit_count(&self) -> usize {
        self.submits.lock().expect("mock submit lock").len()
    }
}

#[async_trait]
impl RemovalBackend for MockRemovalBackend {
    async fn submit(
        &self,
        staged: &Path,
        file_name: &str,
        mime_type: &str,
    ) -> Result<VendorResponse> {
        self.submits.lock().expect("mock submit lock").push(RecordedSubmit {
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            staged_path: staged.to_path_buf(),
            staged_existed: staged.exists(),
        });
        self.script
            .lock()
            .expect("mock script lock")
            .next("mock removal call")
    }
}

/// Recorded search query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSearch {
    /// Query string as dispatched
    pub query: String,
    /// Requested page
    pub page: u32,
    /// Requested page size
    pub per_page: u32,
}

/// Mock search transport with scripted responses
#[derive(Debug, Default)]
pub struct MockSearchBackend {
    search_script: Mutex<Script>,
    fetch_script: Mutex<Script>,
    searches: Mutex<Vec<RecordedSearch>>,
    fetches: Mutex<Vec<String>>,
}

impl MockSearchBackend {
    /// Create a mock with no scripted responses
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a search response body (JSON)
    #[must_use]
    pub fn with_search_json(self, body: &str) -> Self {
        self.enqueue_search(ScriptedOutcome::Respond(VendorResponse::ok_json(body)));
        self
    }

    /// Script a search error response
    #[must_use]
    pub fn with_search_error(self, status: u16, error: &str, message: &str) -> Self {
        self.enqueue_search(ScriptedOutcome::Respond(VendorResponse::error(
            status, error, message,
        )));
        self
    }

    /// Script an image fetch returning the given bytes
    #[must_use]
    pub fn with_image(self, bytes: Vec<u8>) -> Self {
        self.enqueue_fetch(ScriptedOutcome::Respond(VendorResponse::ok_png(bytes)));
        self
    }

    /// Append a search outcome to the script
    pub fn enqueue_search(&self, outcome: ScriptedOutcome) {
        self.search_script
            .lock()
            .expect("mock script lock")
            .push(outcome);
    }

    /// Append a fetch outcome to the script
    pub fn enqueue_fetch(&self, outcome: ScriptedOutcome) {
        self.fetch_script
            .lock()
            .expect("mock script lock")
            .push(outcome);
    }

    /// Search queries recorded so far
    #[must_use]
    pub fn searches(&self) -> Vec<RecordedSearch> {
        self.searches.lock().expect("mock search lock").clone()
    }

    /// Number of search calls dispatched
    #[must_use]
    pub fn search_count(&self) -> usize {
        self.searches.lock().expect("mock search lock").len()
    }

    /// URLs fetched so far
    #[must_use]
    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().expect("mock fetch lock").clone()
    }
}

#[async_trait]
impl SearchBackend for MockSearchBackend {
    async fn search(&self, query: &str, page: u32, per_page: u32) -> Result<VendorResponse> {
        self.searches.lock().expect("mock search lock").push(RecordedSearch {
            query: query.to_string(),
            page,
            per_page,
        });
        self.search_script
            .lock()
            .expect("mock script lock")
            .next("mock search call")
    }

    async fn fetch(&self, url: &str) -> Result<VendorResponse> {
        self.fetches
            .lock()
            .expect("mock fetch lock")
            .push(url.to_string());
        self.fetch_script
            .lock()
            .expect("mock script lock")
            .next("mock image fetch")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_removal_replays_script_in_order() {
        let backend = MockRemovalBackend::new()
            .with_error(429, "rate_limited", "slow down")
            .with_cutout(vec![1, 2, 3]);

        let first = backend
            .submit(Path::new("/nonexistent"), "a.png", "image/png")
            .await
            .unwrap();
        assert_eq!(first.status, 429);

        let second = backend
            .submit(Path::new("/nonexistent"), "a.png", "image/png")
            .await
            .unwrap();
        assert_eq!(second.status, 200);
        assert_eq!(second.body, vec![1, 2, 3]);

        assert_eq!(backend.submit_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_search_records_queries() {
        let backend = MockSearchBackend::new().with_search_json(r#"{"results":[]}"#);
        backend.search("forest", 1, 20).await.unwrap();

        let recorded = backend.searches();
        assert_eq!(
            recorded,
            vec![RecordedSearch {
                query: "forest".to_string(),
                page: 1,
                per_page: 20,
            }]
        );
    }

    #[tokio::test]
    async fn test_mock_network_failure_is_transient() {
        let backend = MockRemovalBackend::new().with_network_failure("connection refused");
        let err = backend
            .submit(Path::new("/nonexistent"), "a.png", "image/png")
            .await
            .unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_unscripted_mock_errors_out() {
        let backend = MockSearchBackend::new();
        assert!(backend.fetch("https://img.example/x").await.is_err());
    }
}

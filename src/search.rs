//! Background image search client
//!
//! Queries the image-search service, maps result payloads into background
//! candidates, and fetches full-resolution bytes for a selected candidate.
//! Failures are classified through the same mapping table as removal calls.

use crate::{
    backends::{SearchBackend, VendorResponse},
    error::{BgComposeError, Result, VendorErrorBody},
    session::BackgroundCandidate,
};
use serde::Deserialize;

/// One page of search results, already mapped to candidates
#[derive(Debug, Clone)]
pub struct SearchPage {
    /// Candidates on this page, in vendor order
    pub candidates: Vec<BackgroundCandidate>,
    /// Page number this result set belongs to
    pub page: u32,
    /// Total matching results reported by the vendor
    pub total: u64,
    /// Total pages available for this query
    pub total_pages: u32,
}

impl SearchPage {
    /// Whether pages beyond this one exist ("load more")
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Search endpoint response payload
#[derive(Debug, Deserialize)]
struct SearchResponseBody {
    results: Vec<RemoteImage>,
    #[serde(default)]
    total: u64,
    #[serde(default, rename = "totalPages", alias = "total_pages")]
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct RemoteImage {
    id: String,
    urls: RemoteImageUrls,
    #[serde(default, alias = "alt_description")]
    description: Option<String>,
    #[serde(default)]
    user: RemoteUser,
}

#[derive(Debug, Deserialize)]
struct RemoteImageUrls {
    regular: String,
    thumb: String,
}

#[derive(Debug, Default, Deserialize)]
struct RemoteUser {
    #[serde(default)]
    name: String,
}

/// Client for the background image search service
pub struct BackgroundSearchClient {
    backend: Box<dyn SearchBackend>,
    per_page: u32,
}

impl BackgroundSearchClient {
    /// Create a search client over the given transport
    #[must_use]
    pub fn new(backend: Box<dyn SearchBackend>, per_page: u32) -> Self {
        Self { backend, per_page }
    }

    /// Search for background candidates
    ///
    /// An empty or whitespace-only query is a no-op: no request is dispatched
    /// and `Ok(None)` is returned so the caller leaves its candidate set
    /// untouched.
    ///
    /// # Errors
    /// - `UpstreamAuth` / `UpstreamQuota` / `UpstreamTransient` per the
    ///   vendor status mapping
    /// - `UpstreamTransient` for undecodable payloads
    pub async fn search(&self, query: &str, page: u32) -> Result<Option<SearchPage>> {
        let query = query.trim();
        if query.is_empty() {
            log::debug!("Skipping background search: empty query");
            return Ok(None);
        }
        let page = page.max(1);

        let response = self.backend.search(query, page, self.per_page).await?;
        let body = Self::classify_response(response, "search service")?;

        let parsed: SearchResponseBody = serde_json::from_slice(&body).map_err(|e| {
            BgComposeError::upstream_transient(format!(
                "search service returned an unexpected payload: {e}"
            ))
        })?;

        let candidates = parsed
            .results
            .into_iter()
            .map(|image| BackgroundCandidate {
                id: image.id,
                full_url: image.urls.regular,
                thumb_url: image.urls.thumb,
                description: image.description,
                attribution: format!("Photo by {}", image.user.name),
            })
            .collect();

        Ok(Some(SearchPage {
            candidates,
            page,
            total: parsed.total,
            total_pages: parsed.total_pages,
        }))
    }

    /// Fetch the full-resolution bytes of a selected background
    ///
    /// # Errors
    /// - Classified vendor errors for non-2xx responses
    /// - `UpstreamTransient` for empty payloads
    pub async fn fetch_image(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.backend.fetch(url).await?;
        let body = Self::classify_response(response, "background download")?;
        if body.is_empty() {
            return Err(BgComposeError::upstream_transient(
                "background download returned an empty body",
            ));
        }
        Ok(body)
    }

    fn classify_response(response: VendorResponse, context: &str) -> Result<Vec<u8>> {
        if !response.is_success() {
            let detail = VendorErrorBody::parse(&response.body);
            log::warn!("{context} returned status {}: {detail}", response.status);
            return Err(BgComposeError::classify_status(response.status, &detail));
        }
        Ok(response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MockSearchBackend;
    use std::sync::Arc;

    const FOREST_PAGE: &str = r#"{
        "results": [
            {
                "id": "bg-1",
                "urls": {"regular": "https://img.example/bg-1/full", "thumb": "https://img.example/bg-1/thumb"},
                "alt_description": "pine forest at dawn",
                "user": {"name": "Jane Doe"}
            },
            {
                "id": "bg-2",
                "urls": {"regular": "https://img.example/bg-2/full", "thumb": "https://img.example/bg-2/thumb"},
                "user": {"name": "John Roe"}
            }
        ],
        "total": 42,
        "totalPages": 3
    }"#;

    fn client_with(backend: MockSearchBackend) -> (BackgroundSearchClient, Arc<MockSearchBackend>) {
        let mock = Arc::new(backend);
        let client = BackgroundSearchClient::new(Box::new(Arc::clone(&mock)), 20);
        (client, mock)
    }

    #[tokio::test]
    async fn test_search_maps_payload_to_candidates() {
        let (client, _mock) = client_with(MockSearchBackend::new().with_search_json(FOREST_PAGE));

        let page = client.search("forest", 1).await.unwrap().unwrap();
        assert_eq!(page.candidates.len(), 2);
        assert_eq!(page.total, 42);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_more());

        let first = &page.candidates[0];
        assert_eq!(first.id, "bg-1");
        assert_eq!(first.full_url, "https://img.example/bg-1/full");
        assert_eq!(first.thumb_url, "https://img.example/bg-1/thumb");
        assert_eq!(first.description.as_deref(), Some("pine forest at dawn"));
        assert_eq!(first.attribution, "Photo by Jane Doe");

        // Missing description stays None
        assert!(page.candidates[1].description.is_none());
    }

    #[tokio::test]
    async fn test_empty_query_dispatches_nothing() {
        let (client, mock) = client_with(MockSearchBackend::new().with_search_json(FOREST_PAGE));

        assert!(client.search("", 1).await.unwrap().is_none());
        assert!(client.search("   \t", 1).await.unwrap().is_none());
        assert_eq!(mock.search_count(), 0);
    }

    #[tokio::test]
    async fn test_page_zero_is_normalized_to_one() {
        let (client, mock) = client_with(MockSearchBackend::new().with_search_json(FOREST_PAGE));
        client.search("forest", 0).await.unwrap();
        assert_eq!(mock.searches()[0].page, 1);
    }

    #[tokio::test]
    async fn test_search_errors_classified() {
        let (client, _mock) = client_with(MockSearchBackend::new().with_search_error(
            500,
            "upstream_failed",
            "credentials missing upstream",
        ));
        let err = client.search("forest", 1).await.unwrap_err();
        assert!(matches!(err, BgComposeError::UpstreamTransient(_)));

        let (client, _mock) = client_with(MockSearchBackend::new().with_search_error(
            401,
            "unauthorized",
            "bad access key",
        ));
        let err = client.search("forest", 1).await.unwrap_err();
        assert!(matches!(err, BgComposeError::UpstreamAuth(_)));
    }

    #[tokio::test]
    async fn test_undecodable_payload_is_transient() {
        let (client, _mock) =
            client_with(MockSearchBackend::new().with_search_json("<html>gateway</html>"));
        let err = client.search("forest", 1).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_fetch_image_returns_bytes() {
        let (client, mock) = client_with(MockSearchBackend::new().with_image(vec![7, 7, 7]));
        let bytes = client
            .fetch_image("https://img.example/bg-1/full")
            .await
            .unwrap();
        assert_eq!(bytes, vec![7, 7, 7]);
        assert_eq!(mock.fetches(), vec!["https://img.example/bg-1/full"]);
    }

    #[tokio::test]
    async fn test_fetch_empty_body_is_transient() {
        let (client, _mock) = client_with(MockSearchBackend::new().with_image(vec![]));
        let err = client.fetch_image("https://img.example/x").await.unwrap_err();
        assert!(err.is_retryable());
    }
}

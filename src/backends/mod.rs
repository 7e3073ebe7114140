//! Transport backends for the removal and search services
//!
//! The pipeline talks to its two external services through these trait seams
//! so that transport can be swapped (HTTP in production, scripted mocks in
//! tests) without touching client or pipeline logic.

pub mod http;
pub mod mock;

pub use http::HttpBackend;
pub use mock::{MockRemovalBackend, MockSearchBackend, ScriptedOutcome};

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Raw response from a vendor endpoint before classification
///
/// Clients map this into the error taxonomy; backends only move bytes.
#[derive(Debug, Clone)]
pub struct VendorResponse {
    /// HTTP status code
    pub status: u16,
    /// Content-Type header, if the vendor sent one
    pub content_type: Option<String>,
    /// Response body bytes
    pub body: Vec<u8>,
}

impl VendorResponse {
    /// Whether the status is in the 2xx range
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Construct a successful PNG response (test/mock convenience)
    #[must_use]
    pub fn ok_png(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: Some("image/png".to_string()),
            body,
        }
    }

    /// Construct a successful JSON response (test/mock convenience)
    #[must_use]
    pub fn ok_json(body: &str) -> Self {
        Self {
            status: 200,
            content_type: Some("application/json".to_string()),
            body: body.as_bytes().to_vec(),
        }
    }

    /// Construct an error response with a structured JSON body
    #[must_use]
    pub fn error(status: u16, error: &str, message: &str) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: format!(r#"{{"error":"{error}","message":"{message}"}}"#).into_bytes(),
        }
    }
}

/// Transport seam for the background removal service
#[async_trait]
pub trait RemovalBackend: Send + Sync {
    /// Submit the staged upload as a single multipart image field
    ///
    /// `staged` points at the disk-backed copy of the upload; the caller owns
    /// its lifetime and deletes it after this call returns.
    ///
    /// # Errors
    /// - `UpstreamTransient` for network-level failures (no usable response)
    async fn submit(
        &self,
        staged: &Path,
        file_name: &str,
        mime_type: &str,
    ) -> Result<VendorResponse>;
}

/// Transport seam for the background image search service
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Query the search endpoint for one page of results
    ///
    /// # Errors
    /// - `UpstreamTransient` for network-level failures
    async fn search(&self, query: &str, page: u32, per_page: u32) -> Result<VendorResponse>;

    /// Fetch an image by URL (full-resolution background download)
    ///
    /// # Errors
    /// - `UpstreamTransient` for network-level failures
    async fn fetch(&self, url: &str) -> Result<VendorResponse>;
}

// Shared handles satisfy the seams too; tests hold the mock while the client
// owns the boxed transport.
#[async_trait]
impl<T: RemovalBackend + ?Sized> RemovalBackend for std::sync::Arc<T> {
    async fn submit(
        &self,
        staged: &Path,
        file_name: &str,
        mime_type: &str,
    ) -> Result<VendorResponse> {
        (**self).submit(staged, file_name, mime_type).await
    }
}

#[async_trait]
impl<T: SearchBackend + ?Sized> SearchBackend for std::sync::Arc<T> {
    async fn search(&self, query: &str, page: u32, per_page: u32) -> Result<VendorResponse> {
        (**self).search(query, page, per_page).await
    }

    async fn fetch(&self, url: &str) -> Result<VendorResponse> {
        (**self).fetch(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_response_success_range() {
        assert!(VendorResponse::ok_png(vec![]).is_success());
        assert!(VendorResponse::ok_json("{}").is_success());
        assert!(!VendorResponse::error(404, "not_found", "missing").is_success());
        assert!(!VendorResponse::error(500, "internal", "boom").is_success());
    }

    #[test]
    fn test_error_response_carries_structured_body() {
        let response = VendorResponse::error(402, "quota_exhausted", "credits used up");
        let detail = crate::error::VendorErrorBody::parse(&response.body);
        assert!(detail.contains("credits used up"));
        assert!(detail.contains("quota_exhausted"));
    }
}

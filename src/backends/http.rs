//! HTTP transport backed by reqwest
//!
//! One client instance serves both vendor seams; the per-call timeout comes
//! from `PipelineConfig` and is applied on the underlying client so timeouts
//! surface through the same classification path as other network failures.

use super::{RemovalBackend, SearchBackend, VendorResponse};
use crate::config::PipelineConfig;
use crate::error::{BgComposeError, Result};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::Client;
use std::path::Path;

/// Production transport for both the removal and the search service
#[derive(Debug)]
pub struct HttpBackend {
    client: Client,
    removal_endpoint: String,
    removal_api_key: Option<String>,
    search_endpoint: String,
    search_access_key: String,
}

impl HttpBackend {
    /// Create an HTTP backend from the pipeline configuration
    ///
    /// # Errors
    /// - `UpstreamTransient` when the HTTP client cannot be constructed
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                BgComposeError::upstream_transient(format!("failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            removal_endpoint: config.removal_endpoint.clone(),
            removal_api_key: config.removal_api_key.clone(),
            search_endpoint: config.search_endpoint.clone(),
            search_access_key: config.search_access_key.clone(),
        })
    }

    async fn read_response(response: reqwest::Response, context: &str) -> Result<VendorResponse> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);

        // Stream the body; vendor images can be large
        let mut stream = response.bytes_stream();
        let mut body = Vec::new();
        while let Some(chunk) = stream
            .try_next()
            .await
            .map_err(|e| BgComposeError::network_error(context, &e))?
        {
            body.extend_from_slice(&chunk);
        }

        Ok(VendorResponse {
            status,
            content_type,
            body,
        })
    }
}

#[async_trait]
impl RemovalBackend for HttpBackend {
    async fn submit(
        &self,
        staged: &Path,
        file_name: &str,
        mime_type: &str,
    ) -> Result<VendorResponse> {
        let bytes = tokio::fs::read(staged)
            .await
            .map_err(|e| BgComposeError::file_io_error("read staged upload", staged, e))?;

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime_type)
            .map_err(|e| {
                BgComposeError::validation(format!("invalid MIME type '{mime_type}': {e}"))
            })?;
        // Exactly one file per request, field name fixed by the endpoint
        let form = reqwest::multipart::Form::new().part("image", part);

        let mut request = self.client.post(&self.removal_endpoint).multipart(form);
        if let Some(key) = &self.removal_api_key {
            request = request.header("X-Api-Key", key);
        }

        log::debug!(
            "Submitting '{file_name}' to removal endpoint {}",
            self.removal_endpoint
        );
        let response = request
            .send()
            .await
            .map_err(|e| BgComposeError::network_error("background removal call", &e))?;

        Self::read_response(response, "background removal response").await
    }
}

#[async_trait]
impl SearchBackend for HttpBackend {
    async fn search(&self, query: &str, page: u32, per_page: u32) -> Result<VendorResponse> {
        log::debug!("Searching backgrounds: query='{query}' page={page} per_page={per_page}");
        let response = self
            .client
            .get(&self.search_endpoint)
            .query(&[
                ("query", query.to_string()),
                ("page", page.to_string()),
                ("perPage", per_page.to_string()),
            ])
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Client-ID {}", self.search_access_key),
            )
            .send()
            .await
            .map_err(|e| BgComposeError::network_error("background search call", &e))?;

        Self::read_response(response, "background search response").await
    }

    async fn fetch(&self, url: &str) -> Result<VendorResponse> {
        log::debug!("Fetching background image: {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BgComposeError::network_error("background image download", &e))?;

        Self::read_response(response, "background image download").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_construction_from_config() {
        let config = PipelineConfig::builder()
            .search_access_key("test-key")
            .build()
            .unwrap();
        let backend = HttpBackend::new(&config);
        assert!(backend.is_ok());
    }
}

//! Configuration types for the background replacement pipeline

use crate::error::{BgComposeError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default removal endpoint (narrow server boundary in front of the vendor)
pub const DEFAULT_REMOVAL_ENDPOINT: &str = "http://localhost:3001/api/remove-background";

/// Default search endpoint
pub const DEFAULT_SEARCH_ENDPOINT: &str = "http://localhost:3001/api/unsplash/search";

/// Default results per search page
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Default vendor call timeout
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Export image format options
///
/// PNG is the contract format for previews and the cutout; JPEG export is
/// offered for flattened composites only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// PNG with alpha channel transparency
    Png,
    /// JPEG (no transparency)
    Jpeg,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self::Png
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Png => write!(f, "png"),
            Self::Jpeg => write!(f, "jpeg"),
        }
    }
}

/// Configuration for the composition pipeline
///
/// Built once at startup and never re-read per request. Credentials are
/// validated at build time so a missing key fails fast instead of surfacing
/// mid-pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Background removal endpoint URL
    pub removal_endpoint: String,

    /// Optional API key forwarded to the removal endpoint
    pub removal_api_key: Option<String>,

    /// Background image search endpoint URL
    pub search_endpoint: String,

    /// Access key for the search service
    pub search_access_key: String,

    /// Timeout applied to each vendor call
    pub request_timeout: Duration,

    /// Search results per page
    pub per_page: u32,

    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: u64,

    /// Export format for composites
    pub output_format: OutputFormat,

    /// JPEG quality (0-100, only used for JPEG export)
    pub jpeg_quality: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            removal_endpoint: DEFAULT_REMOVAL_ENDPOINT.to_string(),
            removal_api_key: None,
            search_endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            search_access_key: String::new(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            per_page: DEFAULT_PER_PAGE,
            max_upload_bytes: crate::services::MAX_UPLOAD_BYTES,
            output_format: OutputFormat::default(),
            jpeg_quality: 90,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder for fluent API construction
    #[must_use]
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Load and validate configuration from the process environment
    ///
    /// Reads `BGCOMPOSE_REMOVAL_URL`, `BGCOMPOSE_REMOVAL_API_KEY`,
    /// `BGCOMPOSE_SEARCH_URL`, `BGCOMPOSE_SEARCH_ACCESS_KEY` and
    /// `BGCOMPOSE_TIMEOUT_SECS`. Intended to be called exactly once at
    /// process start; the pipeline never re-reads the environment per request.
    ///
    /// # Errors
    /// - `UpstreamAuth` when the search access key is absent
    /// - `InvalidConfig` when a value fails to parse or validate
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::builder();

        if let Ok(url) = std::env::var("BGCOMPOSE_REMOVAL_URL") {
            builder = builder.removal_endpoint(url);
        }
        if let Ok(key) = std::env::var("BGCOMPOSE_REMOVAL_API_KEY") {
            builder = builder.removal_api_key(key);
        }
        if let Ok(url) = std::env::var("BGCOMPOSE_SEARCH_URL") {
            builder = builder.search_endpoint(url);
        }
        match std::env::var("BGCOMPOSE_SEARCH_ACCESS_KEY") {
            Ok(key) => builder = builder.search_access_key(key),
            Err(_) => {
                return Err(BgComposeError::upstream_auth(
                    "BGCOMPOSE_SEARCH_ACCESS_KEY is not set; background search is unavailable",
                ));
            },
        }
        if let Ok(secs) = std::env::var("BGCOMPOSE_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                BgComposeError::invalid_config(format!(
                    "BGCOMPOSE_TIMEOUT_SECS must be an integer, got '{secs}'"
                ))
            })?;
            builder = builder.request_timeout(Duration::from_secs(secs));
        }

        builder.build()
    }

    /// Validate the configuration values
    ///
    /// # Errors
    /// - Empty endpoint URLs or zero page size/timeout
    /// - JPEG quality out of the 0-100 range
    pub fn validate(&self) -> Result<()> {
        if self.removal_endpoint.trim().is_empty() {
            return Err(BgComposeError::invalid_config(
                "removal endpoint URL must not be empty",
            ));
        }
        if self.search_endpoint.trim().is_empty() {
            return Err(BgComposeError::invalid_config(
                "search endpoint URL must not be empty",
            ));
        }
        if self.per_page == 0 {
            return Err(BgComposeError::invalid_config(
                "per_page must be at least 1",
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(BgComposeError::invalid_config(
                "request timeout must be non-zero",
            ));
        }
        if self.jpeg_quality > 100 {
            return Err(BgComposeError::invalid_config(format!(
                "jpeg_quality must be 0-100, got {}",
                self.jpeg_quality
            )));
        }
        if self.max_upload_bytes == 0 {
            return Err(BgComposeError::invalid_config(
                "max_upload_bytes must be non-zero",
            ));
        }
        Ok(())
    }
}

/// Builder for `PipelineConfig` with validation at build time
#[derive(Debug, Clone, Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Set the removal endpoint URL
    #[must_use]
    pub fn removal_endpoint<S: Into<String>>(mut self, url: S) -> Self {
        self.config.removal_endpoint = url.into();
        self
    }

    /// Set the removal endpoint API key
    #[must_use]
    pub fn removal_api_key<S: Into<String>>(mut self, key: S) -> Self {
        self.config.removal_api_key = Some(key.into());
        self
    }

    /// Set the search endpoint URL
    #[must_use]
    pub fn search_endpoint<S: Into<String>>(mut self, url: S) -> Self {
        self.config.search_endpoint = url.into();
        self
    }

    /// Set the search service access key
    #[must_use]
    pub fn search_access_key<S: Into<String>>(mut self, key: S) -> Self {
        self.config.search_access_key = key.into();
        self
    }

    /// Set the per-call timeout
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the search page size
    #[must_use]
    pub fn per_page(mut self, per_page: u32) -> Self {
        self.config.per_page = per_page;
        self
    }

    /// Set the maximum accepted upload size
    #[must_use]
    pub fn max_upload_bytes(mut self, bytes: u64) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    /// Set the export format
    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    /// Set JPEG export quality (0-100)
    #[must_use]
    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality;
        self
    }

    /// Build and validate the configuration
    ///
    /// # Errors
    /// - Any validation failure from [`PipelineConfig::validate`]
    pub fn build(self) -> Result<PipelineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.per_page, 20);
        assert_eq!(config.output_format, OutputFormat::Png);
    }

    #[test]
    fn test_builder_round_trip() {
        let config = PipelineConfig::builder()
            .removal_endpoint("https://svc.example/remove")
            .search_endpoint("https://svc.example/search")
            .search_access_key("k")
            .per_page(10)
            .output_format(OutputFormat::Jpeg)
            .jpeg_quality(80)
            .build()
            .unwrap();

        assert_eq!(config.removal_endpoint, "https://svc.example/remove");
        assert_eq!(config.per_page, 10);
        assert_eq!(config.output_format, OutputFormat::Jpeg);
        assert_eq!(config.jpeg_quality, 80);
    }

    #[test]
    fn test_builder_rejects_invalid_values() {
        assert!(PipelineConfig::builder().per_page(0).build().is_err());
        assert!(PipelineConfig::builder()
            .removal_endpoint("")
            .build()
            .is_err());
        assert!(PipelineConfig::builder()
            .request_timeout(Duration::ZERO)
            .build()
            .is_err());
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::Png.to_string(), "png");
        assert_eq!(OutputFormat::Jpeg.to_string(), "jpeg");
    }
}

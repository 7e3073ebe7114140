//! Error types for the background replacement pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, BgComposeError>;

/// Comprehensive error types for pipeline operations
///
/// Transport-layer failures are classified at the client boundary; the stage
/// machine and callers only ever see one of these variants, never a raw
/// transport error.
#[derive(Error, Debug)]
pub enum BgComposeError {
    /// Invalid input (bad file type/size, empty query, illegal transition)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or invalid vendor credentials
    #[error("Service credentials missing or rejected: {0}")]
    UpstreamAuth(String),

    /// Vendor usage limit exhausted (billing/quota)
    #[error("Service quota exhausted: {0}")]
    UpstreamQuota(String),

    /// Transient upstream failure (rate limit, 5xx, network) — retryable
    #[error("Service temporarily unavailable: {0}")]
    UpstreamTransient(String),

    /// Image decode/draw failure during compositing
    #[error("Compositing error: {0}")]
    Compositing(String),

    /// Invalid configuration or parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input/output errors (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image format or codec errors
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl BgComposeError {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new upstream auth error
    pub fn upstream_auth<S: Into<String>>(msg: S) -> Self {
        Self::UpstreamAuth(msg.into())
    }

    /// Create a new upstream quota error
    pub fn upstream_quota<S: Into<String>>(msg: S) -> Self {
        Self::UpstreamQuota(msg.into())
    }

    /// Create a new transient upstream error
    pub fn upstream_transient<S: Into<String>>(msg: S) -> Self {
        Self::UpstreamTransient(msg.into())
    }

    /// Create a new compositing error
    pub fn compositing<S: Into<String>>(msg: S) -> Self {
        Self::Compositing(msg.into())
    }

    /// Create a new invalid configuration error
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Classify a network-level failure (no usable response) from reqwest
    ///
    /// Timeouts and connection failures are deliberately indistinguishable
    /// from other transient failures: both are retryable by the user.
    pub fn network_error(context: &str, error: &reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            "timed out"
        } else if error.is_connect() {
            "connection failed"
        } else {
            "request failed"
        };
        Self::UpstreamTransient(format!("{context}: {kind} ({error})"))
    }

    /// Map a vendor HTTP status to the error taxonomy
    ///
    /// This is the single error-mapping table for both the removal and the
    /// search service. `detail` carries the vendor message for diagnostics;
    /// it is embedded in our message, never surfaced as-is to the caller.
    pub fn classify_status(status: u16, detail: &str) -> Self {
        match status {
            400 => Self::Validation(format!("service rejected the request: {detail}")),
            401 | 403 => Self::UpstreamAuth(format!("status {status}: {detail}")),
            402 => Self::UpstreamQuota(format!("status {status}: {detail}")),
            429 => Self::UpstreamTransient(format!("rate limited (status 429): {detail}")),
            500..=599 => Self::UpstreamTransient(format!("status {status}: {detail}")),
            other => Self::UpstreamTransient(format!("unexpected status {other}: {detail}")),
        }
    }

    /// Create file I/O error with operation context
    pub fn file_io_error<P: AsRef<std::path::Path>>(
        operation: &str,
        path: P,
        error: std::io::Error,
    ) -> Self {
        let path_display = path.as_ref().display();
        Self::Io(std::io::Error::new(
            error.kind(),
            format!("Failed to {operation} '{path_display}': {error}"),
        ))
    }

    /// Whether the failed operation is eligible for a user-initiated retry
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamTransient(_))
    }
}

/// Structured error body returned by the service boundary on failure
///
/// `{error, message, details?}` per the upload/search endpoint contract.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct VendorErrorBody {
    /// Machine-readable error code
    pub error: String,
    /// Human-readable vendor message
    pub message: String,
    /// Optional extra diagnostics
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

impl VendorErrorBody {
    /// Parse a vendor error body, falling back to the raw text when the body
    /// is not the structured JSON shape
    #[must_use]
    pub fn parse(body: &[u8]) -> String {
        match serde_json::from_slice::<Self>(body) {
            Ok(parsed) => format!("{} ({})", parsed.message, parsed.error),
            Err(_) => String::from_utf8_lossy(body).trim().to_string(),
        }
    }
}

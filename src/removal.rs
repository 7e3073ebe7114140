//! Background removal client
//!
//! Submits the original image to the removal service and maps its
//! response/errors into classified pipeline outcomes. This is the only call
//! path to the removal vendor: one interface, one error-mapping table.

use crate::{
    backends::{RemovalBackend, VendorResponse},
    error::{BgComposeError, Result, VendorErrorBody},
    services::FormatHandler,
    session::OriginalUpload,
};
use std::io::Write;
use tempfile::NamedTempFile;

/// Client for the background removal service
pub struct RemovalClient {
    backend: Box<dyn RemovalBackend>,
    max_upload_bytes: u64,
}

impl RemovalClient {
    /// Create a removal client over the given transport
    #[must_use]
    pub fn new(backend: Box<dyn RemovalBackend>, max_upload_bytes: u64) -> Self {
        Self {
            backend,
            max_upload_bytes,
        }
    }

    /// Validate an upload before dispatch
    ///
    /// The server boundary validates again; rejecting locally avoids burning a
    /// vendor call on an upload that cannot succeed. The request shape itself
    /// enforces "exactly one file per request".
    ///
    /// # Errors
    /// - `Validation` for empty payloads, unaccepted extensions/MIME types,
    ///   or uploads over the size cap
    pub fn validate_upload(&self, upload: &OriginalUpload) -> Result<()> {
        if upload.bytes.is_empty() {
            return Err(BgComposeError::validation("uploaded file is empty"));
        }
        if !FormatHandler::is_accepted_mime(&upload.mime_type) {
            return Err(BgComposeError::validation(format!(
                "'{}' is not an accepted image type",
                upload.mime_type
            )));
        }
        if !FormatHandler::is_accepted_extension(&upload.file_name) {
            return Err(BgComposeError::validation(format!(
                "'{}' does not have an accepted image extension (jpg, jpeg, png, gif, webp)",
                upload.file_name
            )));
        }
        let size = upload.bytes.len() as u64;
        if size > self.max_upload_bytes {
            return Err(BgComposeError::validation(format!(
                "upload is {size} bytes, exceeding the {} byte limit",
                self.max_upload_bytes
            )));
        }
        Ok(())
    }

    /// Remove the background from the uploaded image
    ///
    /// Stages the upload to a disk-backed copy for the multipart call; the
    /// staged copy is deleted after the call completes, on success and
    /// failure paths alike.
    ///
    /// # Errors
    /// - `Validation` for rejected uploads (no call dispatched)
    /// - `UpstreamAuth` / `UpstreamQuota` / `UpstreamTransient` per the
    ///   vendor status mapping
    pub async fn remove_background(&self, upload: &OriginalUpload) -> Result<Vec<u8>> {
        self.validate_upload(upload)?;

        let mut staged = NamedTempFile::new()
            .map_err(|e| BgComposeError::file_io_error("create staged upload", "<temp>", e))?;
        staged.write_all(&upload.bytes).map_err(|e| {
            BgComposeError::file_io_error("write staged upload", staged.path(), e)
        })?;
        log::debug!(
            "Staged upload '{}' at {} ({} bytes)",
            upload.file_name,
            staged.path().display(),
            upload.bytes.len()
        );

        let outcome = self
            .backend
            .submit(staged.path(), &upload.file_name, &upload.mime_type)
            .await;

        // Guaranteed cleanup on both paths; NamedTempFile's drop is the
        // backstop if close itself fails
        if let Err(e) = staged.close() {
            log::warn!("Failed to delete staged upload: {e}");
        }

        Self::classify_response(outcome?)
    }

    /// Turn a vendor response into cutout bytes or a classified error
    fn classify_response(response: VendorResponse) -> Result<Vec<u8>> {
        if !response.is_success() {
            let detail = VendorErrorBody::parse(&response.body);
            log::warn!(
                "Removal service returned status {}: {detail}",
                response.status
            );
            return Err(BgComposeError::classify_status(response.status, &detail));
        }

        // A successful call yields raw PNG bytes; verify by magic bytes since
        // the declared content type cannot be trusted
        if !FormatHandler::is_png(&response.body) {
            return Err(BgComposeError::upstream_transient(format!(
                "removal service returned a non-PNG payload (content type {:?})",
                response.content_type
            )));
        }

        Ok(response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::MockRemovalBackend;
    use crate::config::OutputFormat;
    use crate::services::MAX_UPLOAD_BYTES;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::sync::Arc;

    fn png_bytes() -> Vec<u8> {
        let image = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255])));
        FormatHandler::encode(&image, OutputFormat::Png, 100).unwrap()
    }

    fn upload() -> OriginalUpload {
        OriginalUpload {
            file_name: "photo.jpg".to_string(),
            mime_type: "image/jpeg".to_string(),
            bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
        }
    }

    fn client_with(backend: MockRemovalBackend) -> (RemovalClient, Arc<MockRemovalBackend>) {
        let mock = Arc::new(backend);
        let client = RemovalClient::new(Box::new(Arc::clone(&mock)), MAX_UPLOAD_BYTES);
        (client, mock)
    }

    #[tokio::test]
    async fn test_successful_removal_returns_png_bytes() {
        let cutout = png_bytes();
        let (client, _mock) = client_with(MockRemovalBackend::new().with_cutout(cutout.clone()));

        let result = client.remove_background(&upload()).await.unwrap();
        assert_eq!(result, cutout);
    }

    #[tokio::test]
    async fn test_staged_copy_deleted_on_success_and_failure() {
        let (client, mock) = client_with(
            MockRemovalBackend::new()
                .with_cutout(png_bytes())
                .with_error(500, "internal", "boom"),
        );

        client.remove_background(&upload()).await.unwrap();
        client.remove_background(&upload()).await.unwrap_err();

        // The backend saw a live staged file both times; both are gone now
        let submits = mock.submits();
        assert_eq!(submits.len(), 2);
        for submit in submits {
            assert!(submit.staged_existed);
            assert!(!submit.staged_path.exists());
        }
    }

    #[tokio::test]
    async fn test_vendor_statuses_classified() {
        let cases: [(u16, fn(&BgComposeError) -> bool); 4] = [
            (402, |e| matches!(e, BgComposeError::UpstreamQuota(_))),
            (403, |e| matches!(e, BgComposeError::UpstreamAuth(_))),
            (429, |e| matches!(e, BgComposeError::UpstreamTransient(_))),
            (500, |e| matches!(e, BgComposeError::UpstreamTransient(_))),
        ];
        for (status, matches_class) in cases {
            let (client, _mock) = client_with(MockRemovalBackend::new().with_error(
                status,
                "vendor_error",
                "details",
            ));
            let err = client.remove_background(&upload()).await.unwrap_err();
            assert!(matches_class(&err), "status {status} misclassified: {err}");
        }
    }

    #[tokio::test]
    async fn test_validation_rejects_before_dispatch() {
        let (client, mock) = client_with(MockRemovalBackend::new().with_cutout(png_bytes()));

        let bad_uploads = [
            OriginalUpload {
                file_name: "notes.txt".to_string(),
                mime_type: "text/plain".to_string(),
                bytes: vec![1],
            },
            OriginalUpload {
                file_name: "photo.tiff".to_string(),
                mime_type: "image/tiff".to_string(),
                bytes: vec![1],
            },
            OriginalUpload {
                file_name: "empty.png".to_string(),
                mime_type: "image/png".to_string(),
                bytes: vec![],
            },
        ];
        for bad in bad_uploads {
            let err = client.remove_background(&bad).await.unwrap_err();
            assert!(matches!(err, BgComposeError::Validation(_)));
        }
        assert_eq!(mock.submit_count(), 0);
    }

    #[tokio::test]
    async fn test_oversized_upload_rejected() {
        let client = RemovalClient::new(Box::new(MockRemovalBackend::new()), 8);
        let big = OriginalUpload {
            file_name: "big.png".to_string(),
            mime_type: "image/png".to_string(),
            bytes: vec![0; 9],
        };
        let err = client.remove_background(&big).await.unwrap_err();
        assert!(matches!(err, BgComposeError::Validation(_)));
    }

    #[tokio::test]
    async fn test_non_png_success_body_rejected() {
        let (client, _mock) =
            client_with(MockRemovalBackend::new().with_cutout(b"<html>oops</html>".to_vec()));
        let err = client.remove_background(&upload()).await.unwrap_err();
        assert!(matches!(err, BgComposeError::UpstreamTransient(_)));
    }
}

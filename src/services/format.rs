//! Upload validation and raster format handling service
//!
//! This module separates file-type/size validation and encode logic from the
//! pipeline business logic, making both independently testable.

use crate::{
    config::OutputFormat,
    error::{BgComposeError, Result},
};
use image::DynamicImage;
use std::io::Cursor;

/// File extensions the removal endpoint accepts
pub const ACCEPTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// MIME types accepted for upload
pub const ACCEPTED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// Maximum upload size accepted by the removal endpoint (50 MB)
pub const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Service for upload validation and format conversions
pub struct FormatHandler;

impl FormatHandler {
    /// Check whether a MIME type is an accepted raster image type
    #[must_use]
    pub fn is_accepted_mime(mime_type: &str) -> bool {
        let essence = mime_type
            .split(';')
            .next()
            .unwrap_or(mime_type)
            .trim()
            .to_ascii_lowercase();
        ACCEPTED_MIME_TYPES.contains(&essence.as_str())
    }

    /// Check whether a file name carries an accepted extension
    #[must_use]
    pub fn is_accepted_extension(file_name: &str) -> bool {
        std::path::Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
    }

    /// MIME type for an accepted file extension
    #[must_use]
    pub fn mime_for_file(file_name: &str) -> Option<&'static str> {
        let ext = std::path::Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)?;
        match ext.as_str() {
            "jpg" | "jpeg" => Some("image/jpeg"),
            "png" => Some("image/png"),
            "gif" => Some("image/gif"),
            "webp" => Some("image/webp"),
            _ => None,
        }
    }

    /// Sniff the image format from magic bytes
    ///
    /// Used to double-check vendor responses and uploads whose declared MIME
    /// type cannot be trusted.
    #[must_use]
    pub fn sniff_format(bytes: &[u8]) -> Option<&'static str> {
        if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some("png")
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some("jpeg")
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some("gif")
        } else if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
            Some("webp")
        } else {
            None
        }
    }

    /// Whether the bytes look like a PNG payload
    #[must_use]
    pub fn is_png(bytes: &[u8]) -> bool {
        Self::sniff_format(bytes) == Some("png")
    }

    /// Encode an image to bytes in the given output format
    ///
    /// JPEG drops the alpha channel by flattening over opaque black; quality is
    /// only consulted for JPEG.
    pub fn encode(image: &DynamicImage, format: OutputFormat, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = Cursor::new(&mut buffer);
        match format {
            OutputFormat::Png => {
                image.write_to(&mut cursor, image::ImageFormat::Png)?;
            },
            OutputFormat::Jpeg => {
                let rgb_image = image.to_rgb8();
                let mut encoder =
                    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality);
                encoder.encode_image(&rgb_image)?;
            },
        }
        Ok(buffer)
    }

    /// Decode raw bytes into an image, classifying failures as compositing
    /// errors so the caller stays in its current stage
    pub fn decode(bytes: &[u8], what: &str) -> Result<DynamicImage> {
        image::load_from_memory(bytes)
            .map_err(|e| BgComposeError::compositing(format!("failed to decode {what}: {e}")))
    }

    /// Get the appropriate file extension for a given output format
    #[must_use]
    pub fn get_extension(format: OutputFormat) -> &'static str {
        match format {
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpg",
        }
    }

    /// Check if a format supports transparency (alpha channel)
    #[must_use]
    pub fn supports_transparency(format: OutputFormat) -> bool {
        match format {
            OutputFormat::Png => true,
            OutputFormat::Jpeg => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_accepted_mime_types() {
        assert!(FormatHandler::is_accepted_mime("image/png"));
        assert!(FormatHandler::is_accepted_mime("image/jpeg"));
        assert!(FormatHandler::is_accepted_mime("IMAGE/GIF"));
        assert!(FormatHandler::is_accepted_mime("image/webp; charset=binary"));
        assert!(!FormatHandler::is_accepted_mime("image/tiff"));
        assert!(!FormatHandler::is_accepted_mime("application/pdf"));
        assert!(!FormatHandler::is_accepted_mime("text/plain"));
    }

    #[test]
    fn test_accepted_extensions() {
        assert!(FormatHandler::is_accepted_extension("photo.jpg"));
        assert!(FormatHandler::is_accepted_extension("photo.JPEG"));
        assert!(FormatHandler::is_accepted_extension("a.b.webp"));
        assert!(!FormatHandler::is_accepted_extension("photo.tiff"));
        assert!(!FormatHandler::is_accepted_extension("photo"));
        assert!(!FormatHandler::is_accepted_extension("archive.zip"));
    }

    #[test]
    fn test_mime_for_file() {
        assert_eq!(FormatHandler::mime_for_file("a.jpg"), Some("image/jpeg"));
        assert_eq!(FormatHandler::mime_for_file("a.JPEG"), Some("image/jpeg"));
        assert_eq!(FormatHandler::mime_for_file("a.png"), Some("image/png"));
        assert_eq!(FormatHandler::mime_for_file("a.webp"), Some("image/webp"));
        assert_eq!(FormatHandler::mime_for_file("a.bmp"), None);
        assert_eq!(FormatHandler::mime_for_file("noext"), None);
    }

    #[test]
    fn test_sniff_format() {
        assert_eq!(
            FormatHandler::sniff_format(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00]),
            Some("png")
        );
        assert_eq!(
            FormatHandler::sniff_format(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]),
            Some("jpeg")
        );
        assert_eq!(FormatHandler::sniff_format(b"GIF89a...."), Some("gif"));
        assert_eq!(
            FormatHandler::sniff_format(b"RIFF\x00\x00\x00\x00WEBPVP8 "),
            Some("webp")
        );
        assert_eq!(FormatHandler::sniff_format(b"not an image"), None);
        assert_eq!(FormatHandler::sniff_format(&[]), None);
    }

    #[test]
    fn test_encode_png_round_trip() {
        let rgba = RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255]));
        let image = DynamicImage::ImageRgba8(rgba);
        let bytes = FormatHandler::encode(&image, OutputFormat::Png, 90).unwrap();
        assert!(FormatHandler::is_png(&bytes));

        let decoded = FormatHandler::decode(&bytes, "test image").unwrap();
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 3);
    }

    #[test]
    fn test_encode_jpeg_drops_alpha() {
        let rgba = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 128]));
        let image = DynamicImage::ImageRgba8(rgba);
        let bytes = FormatHandler::encode(&image, OutputFormat::Jpeg, 90).unwrap();
        assert_eq!(FormatHandler::sniff_format(&bytes), Some("jpeg"));
    }

    #[test]
    fn test_decode_failure_is_compositing_error() {
        let err = FormatHandler::decode(b"garbage", "background").unwrap_err();
        assert!(matches!(err, BgComposeError::Compositing(_)));
        assert!(err.to_string().contains("background"));
    }

    #[test]
    fn test_get_extension() {
        assert_eq!(FormatHandler::get_extension(OutputFormat::Png), "png");
        assert_eq!(FormatHandler::get_extension(OutputFormat::Jpeg), "jpg");
    }

    #[test]
    fn test_supports_transparency() {
        assert!(FormatHandler::supports_transparency(OutputFormat::Png));
        assert!(!FormatHandler::supports_transparency(OutputFormat::Jpeg));
    }
}

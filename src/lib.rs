#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::uninlined_format_args)]

//! # IMG.LY Background Compose Library
//!
//! A Rust library for background replacement: strip the background from a
//! photo via a remote removal service, pick a replacement from an image-search
//! service, reposition the cut-out subject, and export a flattened composite.
//!
//! The crate is organized around a client-held [`CompositionPipeline`] that
//! owns one [`Session`] of artifacts and drives the stage machine
//! `Empty -> Uploaded -> Removing -> CutoutReady -> Compositing -> Composed`.
//! Vendor transports are trait seams ([`RemovalBackend`], [`SearchBackend`])
//! with an HTTP implementation and scripted mocks for tests.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bgcompose::{CompositionPipeline, PipelineConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! // Configuration is validated once at startup
//! let config = PipelineConfig::from_env()?;
//! let mut pipeline = CompositionPipeline::new(config)?;
//!
//! // Drive the pipeline
//! let bytes = tokio::fs::read("photo.jpg").await?;
//! pipeline.upload("photo.jpg", "image/jpeg", bytes)?;
//! pipeline.remove_background().await?;
//! pipeline.search_backgrounds("forest", 1).await?;
//! let first = pipeline.session().candidates()[0].id.clone();
//! pipeline.select_background(&first).await?;
//! tokio::fs::write("composite.png", pipeline.export()?).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Local compositing only
//!
//! When cutout and background bytes are already at hand, the compositor can
//! be used without any network transport:
//!
//! ```rust,no_run
//! use bgcompose::{compose_from_bytes, Offset};
//!
//! # fn example(cutout: Vec<u8>, background: Vec<u8>) -> anyhow::Result<()> {
//! let png = compose_from_bytes(&cutout, &background, Offset::new(12, -8))?;
//! std::fs::write("composite.png", png)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Library vs CLI Usage
//!
//! - **Library usage**: all pipeline functionality is available by default
//! - **CLI usage**: enable the `cli` feature for the `bgcompose` binary and
//!   tracing output
//!
//! ### Feature Flags
//!
//! - `cli` (default): command-line interface and tracing subscriber setup
//! - `webp-support` (default): WebP upload support via the image crate

pub mod backends;
pub mod compositor;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod position;
pub mod removal;
pub mod search;
pub mod services;
pub mod session;
pub mod stage;
#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "cli")]
pub mod tracing_config;

// Public API exports
pub use backends::{
    HttpBackend, MockRemovalBackend, MockSearchBackend, RemovalBackend, SearchBackend,
    VendorResponse,
};
pub use compositor::{Compositor, Placement};
pub use config::{OutputFormat, PipelineConfig, PipelineConfigBuilder};
pub use error::{BgComposeError, Result};
pub use pipeline::CompositionPipeline;
pub use position::{DragUpdate, Offset, PointerPosition, PositionController, RenderThrottle};
pub use removal::RemovalClient;
pub use search::{BackgroundSearchClient, SearchPage};
pub use services::{
    ConsoleProgressReporter, FormatHandler, NoOpProgressReporter, ProgressReporter,
};
pub use session::{BackgroundCandidate, OriginalUpload, SelectedBackground, Session};
pub use stage::{Stage, StageMachine};

#[cfg(feature = "cli")]
pub use tracing_config::{init_cli_tracing, TracingConfig, TracingFormat};

/// Composite a cutout over a background provided as encoded bytes
///
/// Decodes both images, renders with cover-fit placement at the given offset
/// and returns PNG bytes. This is the transport-free entry point for callers
/// that already hold both artifacts.
///
/// # Errors
/// - `Compositing` for undecodable inputs or zero-dimension images
pub fn compose_from_bytes(
    cutout_bytes: &[u8],
    background_bytes: &[u8],
    offset: Offset,
) -> Result<Vec<u8>> {
    Compositor::new().render_png_from_bytes(cutout_bytes, background_bytes, offset)
}

/// Composite a cutout over a background provided as decoded images
///
/// # Errors
/// - `Compositing` for zero-dimension images
pub fn compose_from_images(
    cutout: &image::DynamicImage,
    background: &image::DynamicImage,
    offset: Offset,
) -> Result<image::DynamicImage> {
    Compositor::new().render(cutout, background, offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};

    #[test]
    fn test_compose_from_bytes_round_trip() {
        let cutout = DynamicImage::ImageRgba8(RgbaImage::from_pixel(6, 4, Rgba([0, 0, 0, 0])));
        let background =
            DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([50, 60, 70, 255])));
        let cutout_png = FormatHandler::encode(&cutout, OutputFormat::Png, 100).unwrap();
        let background_png = FormatHandler::encode(&background, OutputFormat::Png, 100).unwrap();

        let composite = compose_from_bytes(&cutout_png, &background_png, Offset::default()).unwrap();
        let decoded = image::load_from_memory(&composite).unwrap();
        assert_eq!(decoded.width(), 6);
        assert_eq!(decoded.height(), 4);
    }
}

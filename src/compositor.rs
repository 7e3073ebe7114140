//! Pixel-level compositing of cutout and background
//!
//! The foreground cutout defines the output frame and is never cropped or
//! rescaled; occlusion artifacts at the subject's edges are the most visually
//! jarring failure in background-removal products, so the background adapts to
//! the subject, not the other way around.

use crate::{
    config::OutputFormat,
    error::{BgComposeError, Result},
    position::Offset,
    services::FormatHandler,
};
use image::{imageops, DynamicImage, GenericImageView, Rgba, RgbaImage};

/// Placement geometry for one compositing pass
///
/// Computed once per render: cover-fit scale for the background plus the
/// centered draw origin. Kept separate from the raster pass so the geometry
/// is testable without decoding pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Output canvas width (cutout's natural width)
    pub canvas_width: u32,
    /// Output canvas height (cutout's natural height)
    pub canvas_height: u32,
    /// Uniform background scale factor
    pub scale: f32,
    /// Scaled background width, always >= canvas width
    pub scaled_width: u32,
    /// Scaled background height, always >= canvas height
    pub scaled_height: u32,
    /// Background draw origin x (<= 0; excess is cropped)
    pub background_x: i64,
    /// Background draw origin y (<= 0; excess is cropped)
    pub background_y: i64,
}

impl Placement {
    /// Compute cover-fit placement of a background behind a canvas
    ///
    /// `scale = max(canvas_w / bg_w, canvas_h / bg_h)` guarantees the scaled
    /// background fully covers the canvas with no letterboxing; scaled
    /// dimensions round up so coverage survives rounding. The background is
    /// centered, cropping overflow evenly on both sides.
    ///
    /// # Errors
    /// - `Compositing` when either image has a zero dimension
    pub fn cover(canvas: (u32, u32), background: (u32, u32)) -> Result<Self> {
        let (canvas_width, canvas_height) = canvas;
        let (bg_width, bg_height) = background;
        if canvas_width == 0 || canvas_height == 0 {
            return Err(BgComposeError::compositing("cutout has zero dimensions"));
        }
        if bg_width == 0 || bg_height == 0 {
            return Err(BgComposeError::compositing(
                "background has zero dimensions",
            ));
        }

        let scale_x = canvas_width as f32 / bg_width as f32;
        let scale_y = canvas_height as f32 / bg_height as f32;
        let scale = scale_x.max(scale_y);

        let scaled_width = ((bg_width as f32 * scale).ceil() as u32).max(canvas_width);
        let scaled_height = ((bg_height as f32 * scale).ceil() as u32).max(canvas_height);

        let background_x = (i64::from(canvas_width) - i64::from(scaled_width)) / 2;
        let background_y = (i64::from(canvas_height) - i64::from(scaled_height)) / 2;

        Ok(Self {
            canvas_width,
            canvas_height,
            scale,
            scaled_width,
            scaled_height,
            background_x,
            background_y,
        })
    }
}

/// Rasterizes a cutout over a cover-fitted background
///
/// Stateless; `render` is a pure function of its inputs, so repeated calls
/// with identical inputs produce pixel-identical output.
#[derive(Debug, Clone, Copy, Default)]
pub struct Compositor;

impl Compositor {
    /// Create a compositor
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Render the flattened composite
    ///
    /// Draw order is fixed: scaled, centered background first; cutout alpha
    /// blended on top at `offset`, at native size.
    ///
    /// # Errors
    /// - `Compositing` for zero-dimension inputs
    pub fn render(
        &self,
        cutout: &DynamicImage,
        background: &DynamicImage,
        offset: Offset,
    ) -> Result<DynamicImage> {
        let placement = Placement::cover(cutout.dimensions(), background.dimensions())?;

        let scaled_background = imageops::resize(
            &background.to_rgba8(),
            placement.scaled_width,
            placement.scaled_height,
            imageops::FilterType::Triangle,
        );

        let mut canvas = RgbaImage::from_pixel(
            placement.canvas_width,
            placement.canvas_height,
            Rgba([0, 0, 0, 255]),
        );
        imageops::overlay(
            &mut canvas,
            &scaled_background,
            placement.background_x,
            placement.background_y,
        );
        imageops::overlay(
            &mut canvas,
            &cutout.to_rgba8(),
            i64::from(offset.x),
            i64::from(offset.y),
        );

        Ok(DynamicImage::ImageRgba8(canvas))
    }

    /// Render and encode in one pass
    ///
    /// # Errors
    /// - `Compositing` for zero-dimension inputs
    /// - Encode failures from the image codec
    pub fn render_to_bytes(
        &self,
        cutout: &DynamicImage,
        background: &DynamicImage,
        offset: Offset,
        format: OutputFormat,
        quality: u8,
    ) -> Result<Vec<u8>> {
        let composite = self.render(cutout, background, offset)?;
        FormatHandler::encode(&composite, format, quality)
    }

    /// Decode cutout and background bytes, then render and encode as PNG
    ///
    /// Decode failures are classified as `Compositing` so callers keep their
    /// current stage and artifacts.
    ///
    /// # Errors
    /// - `Compositing` for undecodable inputs or zero dimensions
    pub fn render_png_from_bytes(
        &self,
        cutout_bytes: &[u8],
        background_bytes: &[u8],
        offset: Offset,
    ) -> Result<Vec<u8>> {
        let cutout = FormatHandler::decode(cutout_bytes, "cutout")?;
        let background = FormatHandler::decode(background_bytes, "background")?;
        self.render_to_bytes(&cutout, &background, offset, OutputFormat::Png, 100)
    }
}

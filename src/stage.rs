//! Pipeline stage machine
//!
//! Pure state + transition logic, independent of transport. The machine only
//! ever receives classified outcomes; the clients translate vendor responses
//! before anything reaches it.

use crate::error::{BgComposeError, Result};
use crate::services::FormatHandler;

/// Named point in the processing pipeline, exposed to the UI to gate actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// No upload present
    Empty,
    /// Original image accepted
    Uploaded,
    /// Removal call outstanding
    Removing,
    /// Cutout available, ready for background selection
    CutoutReady,
    /// Render in progress for the selected background
    Compositing,
    /// Composite available for export
    Composed,
    /// Removal failed; original retained, retry allowed
    Failed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Empty => "empty",
            Self::Uploaded => "uploaded",
            Self::Removing => "removing",
            Self::CutoutReady => "cutout-ready",
            Self::Compositing => "compositing",
            Self::Composed => "composed",
            Self::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Tracks pipeline progress and legal transitions
///
/// A composite can never be produced without passing through `Removing`; no
/// transition skips it.
#[derive(Debug, Clone)]
pub struct StageMachine {
    stage: Stage,
}

impl Default for StageMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StageMachine {
    /// Create a machine in the `Empty` stage
    #[must_use]
    pub fn new() -> Self {
        Self {
            stage: Stage::Empty,
        }
    }

    /// Current stage
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// `Empty -> Uploaded` iff the MIME type is an accepted raster image type
    ///
    /// # Errors
    /// - `Validation` for rejected MIME types (state unchanged)
    /// - `Validation` when an upload is already present
    pub fn upload(&mut self, mime_type: &str) -> Result<Stage> {
        if self.stage != Stage::Empty {
            return Err(BgComposeError::validation(format!(
                "upload is only accepted from the empty stage (currently {})",
                self.stage
            )));
        }
        if !FormatHandler::is_accepted_mime(mime_type) {
            return Err(BgComposeError::validation(format!(
                "'{mime_type}' is not an accepted image type"
            )));
        }
        self.stage = Stage::Uploaded;
        Ok(self.stage)
    }

    /// `Uploaded | Failed -> Removing`
    ///
    /// `Failed` re-enters `Removing` so a retry does not require re-upload.
    ///
    /// # Errors
    /// - `Validation` from any other stage
    pub fn start_removal(&mut self) -> Result<Stage> {
        match self.stage {
            Stage::Uploaded | Stage::Failed => {
                self.stage = Stage::Removing;
                Ok(self.stage)
            },
            other => Err(BgComposeError::validation(format!(
                "background removal cannot start from the {other} stage"
            ))),
        }
    }

    /// `Removing -> CutoutReady`
    ///
    /// # Errors
    /// - `Validation` when no removal call is outstanding
    pub fn removal_succeeded(&mut self) -> Result<Stage> {
        if self.stage != Stage::Removing {
            return Err(BgComposeError::validation(format!(
                "no removal in progress (currently {})",
                self.stage
            )));
        }
        self.stage = Stage::CutoutReady;
        Ok(self.stage)
    }

    /// `Removing -> Failed`
    ///
    /// # Errors
    /// - `Validation` when no removal call is outstanding
    pub fn removal_failed(&mut self) -> Result<Stage> {
        if self.stage != Stage::Removing {
            return Err(BgComposeError::validation(format!(
                "no removal in progress (currently {})",
                self.stage
            )));
        }
        self.stage = Stage::Failed;
        Ok(self.stage)
    }

    /// `CutoutReady | Composed -> Compositing`
    ///
    /// Selecting a new background from `Composed` triggers a re-render.
    ///
    /// # Errors
    /// - `Validation` before a cutout exists
    pub fn select_background(&mut self) -> Result<Stage> {
        match self.stage {
            Stage::CutoutReady | Stage::Composed => {
                self.stage = Stage::Compositing;
                Ok(self.stage)
            },
            other => Err(BgComposeError::validation(format!(
                "a background can only be selected once a cutout is ready (currently {other})"
            ))),
        }
    }

    /// `Compositing -> Composed`
    ///
    /// # Errors
    /// - `Validation` when no render is in progress
    pub fn render_done(&mut self) -> Result<Stage> {
        if self.stage != Stage::Compositing {
            return Err(BgComposeError::validation(format!(
                "no render in progress (currently {})",
                self.stage
            )));
        }
        self.stage = Stage::Composed;
        Ok(self.stage)
    }

    /// `Compositing -> CutoutReady | Composed` after a render failure
    ///
    /// A compositing failure keeps previously produced artifacts usable:
    /// the machine falls back to `Composed` when a prior composite exists,
    /// otherwise to `CutoutReady`.
    ///
    /// # Errors
    /// - `Validation` when no render is in progress
    pub fn render_failed(&mut self, had_composite: bool) -> Result<Stage> {
        if self.stage != Stage::Compositing {
            return Err(BgComposeError::validation(format!(
                "no render in progress (currently {})",
                self.stage
            )));
        }
        self.stage = if had_composite {
            Stage::Composed
        } else {
            Stage::CutoutReady
        };
        Ok(self.stage)
    }

    /// Any state `-> Empty`
    pub fn reset(&mut self) -> Stage {
        self.stage = Stage::Empty;
        self.stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine_at_cutout_ready() -> StageMachine {
        let mut machine = StageMachine::new();
        machine.upload("image/jpeg").unwrap();
        machine.start_removal().unwrap();
        machine.removal_succeeded().unwrap();
        machine
    }

    #[test]
    fn test_accepted_upload_transitions() {
        for mime in ["image/jpeg", "image/png", "image/gif", "image/webp"] {
            let mut machine = StageMachine::new();
            assert_eq!(machine.upload(mime).unwrap(), Stage::Uploaded);
        }
    }

    #[test]
    fn test_rejected_upload_stays_empty() {
        for mime in ["image/tiff", "application/pdf", "text/html", ""] {
            let mut machine = StageMachine::new();
            let err = machine.upload(mime).unwrap_err();
            assert!(matches!(err, BgComposeError::Validation(_)));
            assert_eq!(machine.stage(), Stage::Empty);
        }
    }

    #[test]
    fn test_happy_path_sequence() {
        let mut machine = StageMachine::new();
        machine.upload("image/png").unwrap();
        assert_eq!(machine.start_removal().unwrap(), Stage::Removing);
        assert_eq!(machine.removal_succeeded().unwrap(), Stage::CutoutReady);
        assert_eq!(machine.select_background().unwrap(), Stage::Compositing);
        assert_eq!(machine.render_done().unwrap(), Stage::Composed);
    }

    #[test]
    fn test_failed_removal_is_resumable() {
        let mut machine = StageMachine::new();
        machine.upload("image/jpeg").unwrap();
        machine.start_removal().unwrap();
        assert_eq!(machine.removal_failed().unwrap(), Stage::Failed);

        // Retry re-enters Removing without a new upload
        assert_eq!(machine.start_removal().unwrap(), Stage::Removing);
        assert_eq!(machine.removal_succeeded().unwrap(), Stage::CutoutReady);
    }

    #[test]
    fn test_reselect_background_from_composed() {
        let mut machine = machine_at_cutout_ready();
        machine.select_background().unwrap();
        machine.render_done().unwrap();

        assert_eq!(machine.select_background().unwrap(), Stage::Compositing);
        assert_eq!(machine.render_done().unwrap(), Stage::Composed);
    }

    #[test]
    fn test_no_transition_skips_removing() {
        let mut machine = StageMachine::new();
        assert!(machine.select_background().is_err());

        machine.upload("image/png").unwrap();
        assert!(machine.select_background().is_err());
        assert!(machine.removal_succeeded().is_err());
        assert_eq!(machine.stage(), Stage::Uploaded);
    }

    #[test]
    fn test_render_failure_falls_back() {
        let mut machine = machine_at_cutout_ready();
        machine.select_background().unwrap();
        assert_eq!(machine.render_failed(false).unwrap(), Stage::CutoutReady);

        machine.select_background().unwrap();
        machine.render_done().unwrap();
        machine.select_background().unwrap();
        assert_eq!(machine.render_failed(true).unwrap(), Stage::Composed);
    }

    #[test]
    fn test_reset_from_any_stage() {
        let mut machine = machine_at_cutout_ready();
        assert_eq!(machine.reset(), Stage::Empty);

        let mut machine = StageMachine::new();
        machine.upload("image/png").unwrap();
        machine.start_removal().unwrap();
        assert_eq!(machine.reset(), Stage::Empty);
    }
}

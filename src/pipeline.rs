//! Composition pipeline orchestrator
//!
//! Wires the session store, stage machine, vendor clients, compositor and
//! position controller into the upload -> removal -> search -> select ->
//! reposition -> export flow. All operations run on the caller's task; the
//! only suspension points are the vendor calls and image decodes.
//!
//! Cancellation: `reset` bumps the session generation, and every vendor
//! response is applied through a generation check, so a response that arrives
//! after a reset is discarded instead of mutating the fresh session.

use crate::{
    backends::{HttpBackend, RemovalBackend, SearchBackend},
    compositor::Compositor,
    config::PipelineConfig,
    error::{BgComposeError, Result},
    position::{Offset, PointerPosition, PositionController},
    removal::RemovalClient,
    search::BackgroundSearchClient,
    services::{FormatHandler, NoOpProgressReporter, ProgressReporter},
    session::{OriginalUpload, SelectedBackground, Session},
    stage::{Stage, StageMachine},
};
use std::sync::Arc;

/// Client-held processing pipeline for one user interaction
///
/// One pipeline owns one [`Session`]; there is no cross-session sharing and
/// `&mut self` serializes operations within it.
pub struct CompositionPipeline {
    config: PipelineConfig,
    session: Session,
    machine: StageMachine,
    removal: RemovalClient,
    search: BackgroundSearchClient,
    compositor: Compositor,
    controller: PositionController,
    reporter: Box<dyn ProgressReporter>,
    removal_in_flight: bool,
}

impl CompositionPipeline {
    /// Create a pipeline with HTTP transport for both services
    ///
    /// # Errors
    /// - Configuration validation failures
    /// - HTTP client construction failures
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let http = Arc::new(HttpBackend::new(&config)?);
        Ok(Self::with_backends(
            config,
            Box::new(Arc::clone(&http)),
            Box::new(http),
        ))
    }

    /// Create a pipeline with injected transports (tests, embedders)
    #[must_use]
    pub fn with_backends(
        config: PipelineConfig,
        removal_backend: Box<dyn RemovalBackend>,
        search_backend: Box<dyn SearchBackend>,
    ) -> Self {
        let removal = RemovalClient::new(removal_backend, config.max_upload_bytes);
        let search = BackgroundSearchClient::new(search_backend, config.per_page);
        Self {
            config,
            session: Session::new(),
            machine: StageMachine::new(),
            removal,
            search,
            compositor: Compositor::new(),
            controller: PositionController::new(),
            reporter: Box::new(NoOpProgressReporter),
            removal_in_flight: false,
        }
    }

    /// Replace the progress reporter
    #[must_use]
    pub fn with_progress_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Replace the position controller (e.g. an unthrottled one for tests)
    #[must_use]
    pub fn with_position_controller(mut self, controller: PositionController) -> Self {
        self.controller = controller;
        self
    }

    /// Current pipeline stage
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.machine.stage()
    }

    /// Read access to the session's artifacts
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Current cutout offset
    #[must_use]
    pub fn offset(&self) -> Offset {
        self.session.offset()
    }

    /// Whether a removal call is outstanding (UI disables the trigger)
    #[must_use]
    pub fn is_removal_in_flight(&self) -> bool {
        self.removal_in_flight
    }

    /// Accept an uploaded file
    ///
    /// Validation happens before any state is touched, so a rejected upload
    /// leaves the current session exactly as it was. A valid upload over an
    /// existing session replaces it wholesale.
    ///
    /// # Errors
    /// - `Validation` for unaccepted type/extension, empty or oversized files
    pub fn upload(&mut self, file_name: &str, mime_type: &str, bytes: Vec<u8>) -> Result<()> {
        let upload = OriginalUpload {
            file_name: file_name.to_string(),
            mime_type: mime_type.to_string(),
            bytes,
        };
        self.removal.validate_upload(&upload)?;

        if self.machine.stage() != Stage::Empty {
            self.reset();
        }

        let from = self.machine.stage();
        self.machine.upload(mime_type)?;
        self.reporter.stage_changed(from, self.machine.stage());

        self.session.set_original(upload);
        Ok(())
    }

    /// Begin a removal call: guards, transition, generation token
    ///
    /// Split from [`apply_removal_outcome`](Self::apply_removal_outcome) so
    /// event-loop integrations can dispatch the vendor call themselves;
    /// [`remove_background`](Self::remove_background) composes both halves.
    ///
    /// # Errors
    /// - `Validation` when no upload is present, a call is already
    ///   outstanding, or the stage does not allow removal
    pub fn begin_removal(&mut self) -> Result<u64> {
        if self.session.original().is_none() {
            return Err(BgComposeError::validation("no upload to process"));
        }
        if self.removal_in_flight {
            return Err(BgComposeError::validation(
                "a removal call is already in progress",
            ));
        }
        let from = self.machine.stage();
        self.machine.start_removal()?;
        self.reporter.stage_changed(from, self.machine.stage());
        self.removal_in_flight = true;
        Ok(self.session.generation())
    }

    /// Apply a removal outcome captured at `generation`
    ///
    /// A stale outcome (the session was reset or replaced while the call was
    /// in flight) is discarded without touching any state.
    ///
    /// # Errors
    /// - The classified removal error, after the machine moves to `Failed`
    ///   with the original retained
    pub fn apply_removal_outcome(
        &mut self,
        generation: u64,
        outcome: Result<Vec<u8>>,
    ) -> Result<()> {
        self.removal_in_flight = false;

        if !self.session.is_current(generation) {
            log::info!("Discarding removal response for a superseded session");
            return Ok(());
        }

        match outcome {
            Ok(cutout_bytes) => {
                let from = self.machine.stage();
                self.machine.removal_succeeded()?;
                self.reporter.stage_changed(from, self.machine.stage());
                self.session.set_cutout(cutout_bytes);
                Ok(())
            },
            Err(error) => {
                let from = self.machine.stage();
                self.machine.removal_failed()?;
                self.reporter.stage_changed(from, self.machine.stage());
                self.reporter
                    .operation_failed("background removal", &error.to_string());
                Err(error)
            },
        }
    }

    /// Remove the background from the current upload
    ///
    /// On failure the original is retained and the stage moves to `Failed`;
    /// calling again re-enters `Removing` without a new upload.
    ///
    /// # Errors
    /// - `Validation` guards from [`begin_removal`](Self::begin_removal)
    /// - Classified vendor errors
    pub async fn remove_background(&mut self) -> Result<()> {
        let generation = self.begin_removal()?;
        // The guard above ensures the original exists
        let upload = self
            .session
            .original()
            .cloned()
            .ok_or_else(|| BgComposeError::validation("no upload to process"))?;

        let outcome = self.removal.remove_background(&upload).await;
        self.apply_removal_outcome(generation, outcome)
    }

    /// Search for background candidates
    ///
    /// Empty queries are a no-op. Page 1 of a new query replaces the
    /// candidate set; later pages append. Search is independent of the stage
    /// machine, so browsing works while a removal call is outstanding.
    ///
    /// # Errors
    /// - Classified vendor errors
    pub async fn search_backgrounds(&mut self, query: &str, page: u32) -> Result<()> {
        let generation = self.session.generation();
        let Some(result_page) = self.search.search(query, page).await? else {
            return Ok(());
        };

        if !self.session.is_current(generation) {
            log::info!("Discarding search response for a superseded session");
            return Ok(());
        }

        if result_page.page <= 1 {
            self.session.replace_candidates(
                query.trim(),
                result_page.candidates,
                result_page.total,
                result_page.total_pages,
            );
        } else {
            self.session.append_candidates(
                result_page.page,
                result_page.candidates,
                result_page.total,
                result_page.total_pages,
            );
        }
        Ok(())
    }

    /// Load the next page of results for the current query
    ///
    /// # Errors
    /// - `Validation` when there is no current query or no further page
    /// - Classified vendor errors
    pub async fn load_more_backgrounds(&mut self) -> Result<()> {
        if !self.session.has_more() {
            return Err(BgComposeError::validation(
                "no further result pages for the current query",
            ));
        }
        let query = self
            .session
            .query()
            .ok_or_else(|| BgComposeError::validation("no background search has run yet"))?
            .to_string();
        let next_page = self.session.page() + 1;
        self.search_backgrounds(&query, next_page).await
    }

    /// Select a background candidate, fetch it and render the composite
    ///
    /// Resets the offset (it is meaningful relative to one background only)
    /// and moves `CutoutReady`/`Composed -> Compositing -> Composed`.
    ///
    /// # Errors
    /// - `Validation` for unknown candidate ids or a missing cutout
    /// - Classified fetch errors; `Compositing` for decode/draw failures
    pub async fn select_background(&mut self, candidate_id: &str) -> Result<()> {
        let candidate = self
            .session
            .candidate(candidate_id)
            .cloned()
            .ok_or_else(|| {
                BgComposeError::validation(format!("unknown background candidate '{candidate_id}'"))
            })?;

        let from = self.machine.stage();
        self.machine.select_background()?;
        self.reporter.stage_changed(from, self.machine.stage());

        let generation = self.session.generation();
        let outcome = self.search.fetch_image(&candidate.full_url).await;

        if !self.session.is_current(generation) {
            log::info!("Discarding background fetch for a superseded session");
            return Ok(());
        }

        let bytes = match outcome {
            Ok(bytes) => bytes,
            Err(error) => {
                let from = self.machine.stage();
                self.machine
                    .render_failed(self.session.composite().is_some())?;
                self.reporter.stage_changed(from, self.machine.stage());
                self.reporter
                    .operation_failed("background selection", &error.to_string());
                return Err(error);
            },
        };

        self.session.set_selected_background(SelectedBackground {
            id: candidate.id,
            url: candidate.full_url,
            bytes,
        });
        self.controller.reset();

        match self.rasterize() {
            Ok(()) => {
                let from = self.machine.stage();
                self.machine.render_done()?;
                self.reporter.stage_changed(from, self.machine.stage());
                Ok(())
            },
            Err(error) => {
                let from = self.machine.stage();
                self.machine
                    .render_failed(self.session.composite().is_some())?;
                self.reporter.stage_changed(from, self.machine.stage());
                self.reporter
                    .operation_failed("compositing", &error.to_string());
                Err(error)
            },
        }
    }

    /// Re-render the composite at the current offset
    ///
    /// On-demand render for repositioning; the stage is already `Composed`
    /// and stays there. A failure keeps the previous composite and offset.
    ///
    /// # Errors
    /// - `Validation` when cutout or background are missing
    /// - `Compositing` for decode/draw failures
    pub fn render_composite(&mut self) -> Result<()> {
        self.rasterize()
    }

    /// Start a drag gesture at the given pointer position
    ///
    /// # Errors
    /// - `Validation` when no background has been selected yet
    pub fn drag_begin(&mut self, position: PointerPosition) -> Result<()> {
        if self.session.selected_background().is_none() {
            return Err(BgComposeError::validation(
                "repositioning requires a selected background",
            ));
        }
        self.controller.set_offset(self.session.offset());
        self.controller.pointer_down(position);
        Ok(())
    }

    /// Continue a drag gesture; re-renders at frame cadence
    ///
    /// Returns whether a re-render happened for this move.
    ///
    /// # Errors
    /// - `Compositing` for decode/draw failures
    pub fn drag_move(&mut self, position: PointerPosition) -> Result<bool> {
        let Some(update) = self.controller.pointer_move(position) else {
            return Ok(false);
        };
        self.session.set_offset(update.offset);
        if update.render_due {
            self.rasterize()?;
            return Ok(true);
        }
        Ok(false)
    }

    /// End the drag gesture with an unthrottled final render
    ///
    /// # Errors
    /// - `Compositing` for decode/draw failures
    pub fn drag_end(&mut self) -> Result<()> {
        if let Some(final_offset) = self.controller.pointer_up() {
            self.session.set_offset(final_offset);
            self.rasterize()?;
        }
        Ok(())
    }

    /// Set the offset programmatically and re-render
    ///
    /// # Errors
    /// - `Validation` when cutout or background are missing
    /// - `Compositing` for decode/draw failures
    pub fn set_offset(&mut self, offset: Offset) -> Result<()> {
        self.controller.set_offset(offset);
        self.session.set_offset(offset);
        self.rasterize()
    }

    /// Export the rendered composite
    ///
    /// # Errors
    /// - `Validation` when no composite has been rendered
    pub fn export(&self) -> Result<Vec<u8>> {
        self.session
            .composite()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| BgComposeError::validation("no composite has been rendered yet"))
    }

    /// Export the bare cutout (image without background)
    ///
    /// # Errors
    /// - `Validation` when no cutout exists
    pub fn export_cutout(&self) -> Result<Vec<u8>> {
        self.session
            .cutout()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| BgComposeError::validation("no cutout available yet"))
    }

    /// Discard all session state and return to `Empty`
    ///
    /// Any in-flight vendor response becomes stale and will be discarded on
    /// arrival.
    pub fn reset(&mut self) {
        let from = self.machine.stage();
        self.machine.reset();
        if from != Stage::Empty {
            self.reporter.stage_changed(from, self.machine.stage());
        }
        self.session.reset();
        self.controller.reset();
        self.removal_in_flight = false;
    }

    /// Decode the session artifacts and rasterize at the current offset
    fn rasterize(&mut self) -> Result<()> {
        let cutout_bytes = self
            .session
            .cutout()
            .ok_or_else(|| BgComposeError::validation("no cutout to composite"))?;
        let background = self
            .session
            .selected_background()
            .ok_or_else(|| BgComposeError::validation("no background selected"))?;

        let cutout = FormatHandler::decode(cutout_bytes, "cutout")?;
        let background_image = FormatHandler::decode(&background.bytes, "background")?;

        let composite = self.compositor.render_to_bytes(
            &cutout,
            &background_image,
            self.session.offset(),
            self.config.output_format,
            self.config.jpeg_quality,
        )?;
        self.session.set_composite(composite);
        Ok(())
    }
}

//! Session-scoped asset store
//!
//! Holds the current interaction's binary artifacts (original upload, cutout,
//! selected background, composite) and the search candidate set. One session
//! is active per pipeline; artifacts are held in memory and superseded buffers
//! are released by ownership when replaced.

use crate::position::Offset;

/// The raw uploaded image with its declared metadata
///
/// Immutable once set; a re-upload replaces the whole value.
#[derive(Debug, Clone)]
pub struct OriginalUpload {
    /// Declared file name (used for extension validation and multipart upload)
    pub file_name: String,
    /// Declared MIME type
    pub mime_type: String,
    /// Raw image bytes
    pub bytes: Vec<u8>,
}

/// One background search result offered to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackgroundCandidate {
    /// Vendor-assigned result id
    pub id: String,
    /// Full-resolution image URL
    pub full_url: String,
    /// Thumbnail URL for the picker grid
    pub thumb_url: String,
    /// Optional description of the image
    pub description: Option<String>,
    /// Attribution line, e.g. "Photo by Jane Doe"
    pub attribution: String,
}

/// The background the user picked, with its fetched full-res bytes
#[derive(Debug, Clone)]
pub struct SelectedBackground {
    /// Candidate id this selection came from
    pub id: String,
    /// Full-resolution URL the bytes were fetched from
    pub url: String,
    /// Fetched image bytes
    pub bytes: Vec<u8>,
}

/// Session-scoped state for one user interaction
///
/// The `generation` counter keys the stale-response guard: it is bumped on
/// every reset or replacement upload, and any response captured against an
/// older generation is discarded instead of applied.
#[derive(Debug, Default)]
pub struct Session {
    original: Option<OriginalUpload>,
    cutout: Option<Vec<u8>>,
    candidates: Vec<BackgroundCandidate>,
    query: Option<String>,
    page: u32,
    total: u64,
    total_pages: u32,
    selected_background: Option<SelectedBackground>,
    offset: Offset,
    composite: Option<Vec<u8>>,
    generation: u64,
}

impl Session {
    /// Create an empty session
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current generation of this session
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a response captured at `generation` may still be applied
    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Store a new original upload, clearing every derived artifact
    ///
    /// Bumps the generation so in-flight calls for the previous upload are
    /// invalidated.
    pub fn set_original(&mut self, upload: OriginalUpload) {
        self.clear_artifacts();
        self.generation += 1;
        log::debug!(
            "Session generation {} started with upload '{}' ({} bytes)",
            self.generation,
            upload.file_name,
            upload.bytes.len()
        );
        self.original = Some(upload);
    }

    /// The original upload, if present
    #[must_use]
    pub fn original(&self) -> Option<&OriginalUpload> {
        self.original.as_ref()
    }

    /// Store the cutout returned by a successful removal call
    pub fn set_cutout(&mut self, bytes: Vec<u8>) {
        debug_assert!(self.original.is_some(), "cutout requires an original");
        self.cutout = Some(bytes);
    }

    /// The background-removed cutout, if present
    #[must_use]
    pub fn cutout(&self) -> Option<&[u8]> {
        self.cutout.as_deref()
    }

    /// Replace the candidate set with page 1 of a fresh query
    pub fn replace_candidates(
        &mut self,
        query: &str,
        candidates: Vec<BackgroundCandidate>,
        total: u64,
        total_pages: u32,
    ) {
        self.query = Some(query.to_string());
        self.candidates = candidates;
        self.page = 1;
        self.total = total;
        self.total_pages = total_pages;
    }

    /// Append a subsequent page for the current query
    pub fn append_candidates(
        &mut self,
        page: u32,
        candidates: Vec<BackgroundCandidate>,
        total: u64,
        total_pages: u32,
    ) {
        self.candidates.extend(candidates);
        self.page = page;
        self.total = total;
        self.total_pages = total_pages;
    }

    /// Candidates currently offered to the user
    #[must_use]
    pub fn candidates(&self) -> &[BackgroundCandidate] {
        &self.candidates
    }

    /// Find a candidate by id
    #[must_use]
    pub fn candidate(&self, id: &str) -> Option<&BackgroundCandidate> {
        self.candidates.iter().find(|c| c.id == id)
    }

    /// The query the current candidate set belongs to
    #[must_use]
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Last loaded page number
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Total results reported by the search service
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Whether a further page can be loaded ("load more")
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.page < self.total_pages
    }

    /// Store the selected background and reset the offset
    ///
    /// The offset is meaningful relative to one background only; changing the
    /// selection recenters the cutout.
    pub fn set_selected_background(&mut self, selection: SelectedBackground) {
        self.selected_background = Some(selection);
        self.offset = Offset::default();
        self.composite = None;
    }

    /// The selected background, if any
    #[must_use]
    pub fn selected_background(&self) -> Option<&SelectedBackground> {
        self.selected_background.as_ref()
    }

    /// Current cutout translation relative to its natural centered position
    #[must_use]
    pub fn offset(&self) -> Offset {
        self.offset
    }

    /// Update the cutout translation
    pub fn set_offset(&mut self, offset: Offset) {
        self.offset = offset;
    }

    /// Store the rasterized output of the last compositing pass
    pub fn set_composite(&mut self, bytes: Vec<u8>) {
        self.composite = Some(bytes);
    }

    /// The last composite, if rendered
    #[must_use]
    pub fn composite(&self) -> Option<&[u8]> {
        self.composite.as_deref()
    }

    /// Discard all state and bump the generation
    ///
    /// A response arriving for a call issued before the reset will fail the
    /// `is_current` check and must be discarded by the caller.
    pub fn reset(&mut self) {
        self.clear_artifacts();
        self.original = None;
        self.generation += 1;
        log::debug!("Session reset (generation {})", self.generation);
    }

    fn clear_artifacts(&mut self) {
        self.cutout = None;
        self.candidates.clear();
        self.query = None;
        self.page = 0;
        self.total = 0;
        self.total_pages = 0;
        self.selected_background = None;
        self.offset = Offset::default();
        self.composite = None;
    }
}

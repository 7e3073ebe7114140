//! Pipeline progress reporting service
//!
//! This module separates progress reporting concerns from pipeline logic,
//! allowing different frontends to implement their own progress handling.

use crate::stage::Stage;

/// Trait for receiving pipeline stage notifications
///
/// Implementations decide how stage changes are surfaced (console output,
/// UI updates, silent). The pipeline calls this on every committed
/// transition, never on rejected ones.
pub trait ProgressReporter: Send + Sync {
    /// Called after the stage machine commits a transition
    fn stage_changed(&self, from: Stage, to: Stage);

    /// Called when a classified failure is about to be returned to the caller
    fn operation_failed(&self, operation: &str, message: &str) {
        let _ = (operation, message);
    }
}

/// Progress reporter that silently ignores all updates
///
/// Suitable for library usage where the embedding application handles its own
/// progress display.
#[derive(Debug, Default)]
pub struct NoOpProgressReporter;

impl ProgressReporter for NoOpProgressReporter {
    fn stage_changed(&self, _from: Stage, _to: Stage) {}
}

/// Progress reporter that logs stage changes through the `log` facade
#[derive(Debug, Default)]
pub struct ConsoleProgressReporter;

impl ConsoleProgressReporter {
    /// Create a new console progress reporter
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ProgressReporter for ConsoleProgressReporter {
    fn stage_changed(&self, from: Stage, to: Stage) {
        log::info!("Pipeline stage: {from} -> {to}");
    }

    fn operation_failed(&self, operation: &str, message: &str) {
        log::warn!("{operation} failed: {message}");
    }
}

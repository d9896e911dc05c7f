// Pipeline wiring: per-batch accounting and the change-feed dispatcher that
// delivers captured changes to the extraction and scoring stages.

pub mod dispatcher;

use serde::Serialize;

pub use dispatcher::Dispatcher;

/// Per-batch tally returned by each stage's `handle_batch`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub received: usize,
    pub processed: usize,
    /// Malformed records and extractions with no structure.
    pub skipped: usize,
    /// Event kinds the stage does not handle, plus loop-guard no-ops.
    pub ignored: usize,
}

impl BatchReport {
    pub fn new(received: usize) -> Self {
        Self {
            received,
            ..Default::default()
        }
    }
}

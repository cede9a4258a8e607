//! Summary of a completed document run.

use serde::{Deserialize, Serialize};

/// Counters and timings for one [`crate::run::process_document`] call.
///
/// A run that returns `Ok` may still have failed pages; check
/// [`RunReport::failed_pages`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Pages in the document.
    pub total_pages: usize,

    /// Distinct page numbers asked for, including out-of-range ones.
    pub requested_pages: usize,

    /// Pages rasterised and written to disk.
    pub rendered_pages: usize,

    /// Pages whose response stream finished cleanly.
    pub generated_pages: usize,

    /// Requested pages that produced no complete response, for any reason.
    pub failed_pages: usize,

    /// Wall-clock time spent rendering.
    pub render_duration_ms: u64,

    /// Wall-clock time spent waiting on the inference service.
    pub generate_duration_ms: u64,
}

impl RunReport {
    /// True when every requested page produced a response.
    pub fn is_complete(&self) -> bool {
        self.failed_pages == 0 && self.generated_pages == self.requested_pages
    }
}

//! Progress-callback trait for render-phase events.
//!
//! Inject an [`Arc<dyn RenderProgress>`] via
//! [`crate::config::RunConfigBuilder::progress`] to receive events as the
//! scheduler renders each page. The CLI uses it to drive a progress bar.
//!
//! # Example
//!
//! ```rust
//! use uniai_client::{RenderProgress, RunConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct Counting(AtomicUsize);
//!
//! impl RenderProgress for Counting {
//!     fn on_page_rendered(&self, _page_num: usize, _total: usize) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = RunConfig::builder("doc.pdf", "Describe the page")
//!     .progress(Arc::new(Counting(AtomicUsize::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the scheduler as it renders pages.
///
/// In parallel mode `on_page_rendered` and `on_page_failed` arrive in
/// completion order, not page order. All methods default to no-ops.
pub trait RenderProgress: Send + Sync {
    /// Called once before any page is dispatched.
    ///
    /// `total` is the number of page numbers requested, including any that
    /// will turn out to be out of range.
    fn on_render_start(&self, total: usize) {
        let _ = total;
    }

    /// A page was rasterised and written to disk.
    fn on_page_rendered(&self, page_num: usize, total: usize) {
        let _ = (page_num, total);
    }

    /// A page was skipped or failed to render.
    fn on_page_failed(&self, page_num: usize, total: usize, error: &str) {
        let _ = (page_num, total, error);
    }

    /// Called once after every dispatched render has finished.
    fn on_render_complete(&self, requested: usize, rendered: usize) {
        let _ = (requested, rendered);
    }
}

/// Default when no callback is configured.
pub struct NoopProgress;

impl RenderProgress for NoopProgress {}

/// Shared handle stored in [`crate::config::RunConfig`].
pub type ProgressCallback = Arc<dyn RenderProgress>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_progress_does_not_panic() {
        let cb = NoopProgress;
        cb.on_render_start(3);
        cb.on_page_rendered(1, 3);
        cb.on_page_failed(2, 3, "boom");
        cb.on_render_complete(3, 1);
    }

    #[test]
    fn arc_dyn_progress_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn RenderProgress>();
        let cb: ProgressCallback = Arc::new(NoopProgress);
        cb.on_render_start(1);
    }
}

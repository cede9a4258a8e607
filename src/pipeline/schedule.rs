//! Bounded-concurrency page rendering.
//!
//! [`render_pages`] fans [`PageRenderer`] calls out over the blocking thread
//! pool. With a non-zero limit a semaphore admits at most that many renders
//! at once; the permit moves into the blocking task and is released when the
//! task ends, panics included. A limit of zero renders strictly one page at
//! a time in input order.
//!
//! Results land in [`RenderedPages`], a fixed-size slot container indexed by
//! `page_num - 1`. Only the scheduler writes slots, as tasks join.

use crate::pipeline::render::{PageRenderer, RenderedPage};
use crate::progress::ProgressCallback;
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Sparse, page-indexed results of a render batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedPages {
    slots: Vec<Option<RenderedPage>>,
}

impl RenderedPages {
    /// An all-empty container sized to the document.
    pub fn with_total(total_pages: usize) -> Self {
        Self {
            slots: vec![None; total_pages],
        }
    }

    /// Number of slots, i.e. the document's page count.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The rendered page for a 1-indexed page number, if any.
    pub fn get(&self, page_num: usize) -> Option<&RenderedPage> {
        page_num
            .checked_sub(1)
            .and_then(|idx| self.slots.get(idx))
            .and_then(Option::as_ref)
    }

    /// Rendered pages in ascending page order.
    pub fn iter(&self) -> impl Iterator<Item = &RenderedPage> {
        self.slots.iter().flatten()
    }

    pub fn rendered_count(&self) -> usize {
        self.iter().count()
    }

    /// Raw slot view; slot `i` holds page `i + 1`.
    pub fn slots(&self) -> &[Option<RenderedPage>] {
        &self.slots
    }

    fn fill(&mut self, page: RenderedPage) {
        let idx = page.page_num - 1;
        self.slots[idx] = Some(page);
    }
}

/// Render `pages` of a `total_pages` document, at most `limit` at a time.
///
/// Out-of-range and repeated page numbers are skipped with a warning. A page
/// that fails or panics is logged and reported to `progress`; its slot stays
/// empty and its siblings are unaffected. Returns once every dispatched
/// render has finished.
pub async fn render_pages<R: PageRenderer>(
    renderer: Arc<R>,
    pages: &[usize],
    total_pages: usize,
    limit: usize,
    progress: &ProgressCallback,
) -> RenderedPages {
    let requested = pages.len();
    let mut rendered = RenderedPages::with_total(total_pages);
    progress.on_render_start(requested);

    let mut seen = HashSet::new();
    let mut admitted = Vec::with_capacity(requested);
    for &page_num in pages {
        if page_num == 0 || page_num > total_pages {
            warn!(
                "Skipping page {}: out of range (document has {} pages)",
                page_num, total_pages
            );
            progress.on_page_failed(page_num, requested, "page out of range");
            continue;
        }
        if !seen.insert(page_num) {
            warn!("Skipping page {}: already requested", page_num);
            continue;
        }
        admitted.push(page_num);
    }

    if limit == 0 {
        debug!("Rendering {} pages sequentially", admitted.len());
        for page_num in admitted {
            let renderer = Arc::clone(&renderer);
            let progress = Arc::clone(progress);
            let task = tokio::task::spawn_blocking(move || {
                render_one(renderer.as_ref(), page_num, requested, &progress)
            });
            match task.await {
                Ok(Some(page)) => rendered.fill(page),
                Ok(None) => {}
                Err(e) => warn!("Render task for page {} did not complete: {}", page_num, e),
            }
        }
    } else {
        debug!(
            "Rendering {} pages, at most {} at a time",
            admitted.len(),
            limit
        );
        let gate = Arc::new(Semaphore::new(limit));
        let mut tasks = JoinSet::new();
        for page_num in admitted {
            let permit = match Arc::clone(&gate).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    warn!("Render gate closed; not dispatching page {}", page_num);
                    break;
                }
            };
            let renderer = Arc::clone(&renderer);
            let progress = Arc::clone(progress);
            tasks.spawn_blocking(move || {
                let _permit = permit;
                render_one(renderer.as_ref(), page_num, requested, &progress)
            });
        }
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(page)) => rendered.fill(page),
                Ok(None) => {}
                Err(e) => warn!("Render task did not complete: {}", e),
            }
        }
    }

    let count = rendered.rendered_count();
    info!("Rendered {}/{} requested pages", count, requested);
    progress.on_render_complete(requested, count);
    rendered
}

/// Run one render on the current (blocking) thread, absorbing failures.
fn render_one<R: PageRenderer + ?Sized>(
    renderer: &R,
    page_num: usize,
    requested: usize,
    progress: &ProgressCallback,
) -> Option<RenderedPage> {
    let outcome = catch_unwind(AssertUnwindSafe(|| renderer.render_page(page_num)));
    match outcome {
        Ok(Ok(path)) => {
            debug!("Page {} written to {}", page_num, path.display());
            progress.on_page_rendered(page_num, requested);
            Some(RenderedPage { page_num, path })
        }
        Ok(Err(e)) => {
            warn!("Page {} failed to render: {}", page_num, e);
            progress.on_page_failed(page_num, requested, &e.to_string());
            None
        }
        Err(_) => {
            warn!("Page {} render panicked", page_num);
            progress.on_page_failed(page_num, requested, "render panicked");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PageError;
    use crate::progress::{NoopProgress, RenderProgress};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records call order and peak concurrency; fails or panics on request.
    #[derive(Default)]
    struct FakeRenderer {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: Mutex<Vec<usize>>,
        fail: Vec<usize>,
        panic_on: Vec<usize>,
        delay: Duration,
    }

    impl PageRenderer for FakeRenderer {
        fn render_page(&self, page_num: usize) -> Result<PathBuf, PageError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.calls.lock().unwrap().push(page_num);
            std::thread::sleep(self.delay);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.panic_on.contains(&page_num) {
                panic!("simulated render crash on page {page_num}");
            }
            if self.fail.contains(&page_num) {
                return Err(PageError::RenderFailed {
                    page: page_num,
                    detail: "simulated".into(),
                });
            }
            Ok(PathBuf::from(format!("/tmp/page_{page_num}.jpg")))
        }
    }

    #[derive(Default)]
    struct Events {
        rendered: AtomicUsize,
        failed: AtomicUsize,
        complete: Mutex<Option<(usize, usize)>>,
    }

    impl RenderProgress for Events {
        fn on_page_rendered(&self, _page_num: usize, _total: usize) {
            self.rendered.fetch_add(1, Ordering::SeqCst);
        }
        fn on_page_failed(&self, _page_num: usize, _total: usize, _error: &str) {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
        fn on_render_complete(&self, requested: usize, rendered: usize) {
            *self.complete.lock().unwrap() = Some((requested, rendered));
        }
    }

    fn noop() -> ProgressCallback {
        Arc::new(NoopProgress)
    }

    #[tokio::test]
    async fn out_of_range_pages_are_skipped() {
        let renderer = Arc::new(FakeRenderer::default());
        let out = render_pages(Arc::clone(&renderer), &[1, 3, 7], 5, 3, &noop()).await;

        assert_eq!(out.len(), 5);
        assert!(out.slots()[0].is_some());
        assert!(out.slots()[2].is_some());
        assert_eq!(out.rendered_count(), 2);
        assert_eq!(out.get(3).unwrap().path, PathBuf::from("/tmp/page_3.jpg"));
        assert!(out.get(7).is_none());
        assert!(out.get(0).is_none());

        let mut calls = renderer.calls.lock().unwrap().clone();
        calls.sort_unstable();
        assert_eq!(calls, vec![1, 3]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn limit_caps_renders_in_flight() {
        let renderer = Arc::new(FakeRenderer {
            delay: Duration::from_millis(25),
            ..Default::default()
        });
        let pages: Vec<usize> = (1..=10).collect();
        let out = render_pages(Arc::clone(&renderer), &pages, 10, 2, &noop()).await;

        assert_eq!(out.rendered_count(), 10);
        let peak = renderer.peak.load(Ordering::SeqCst);
        assert!(peak <= 2, "peak concurrency was {peak}");
        assert!(peak >= 1);
    }

    #[tokio::test]
    async fn zero_limit_is_sequential_in_input_order() {
        let renderer = Arc::new(FakeRenderer {
            delay: Duration::from_millis(5),
            ..Default::default()
        });
        let out = render_pages(Arc::clone(&renderer), &[3, 1, 2], 3, 0, &noop()).await;

        assert_eq!(out.rendered_count(), 3);
        assert_eq!(*renderer.calls.lock().unwrap(), vec![3, 1, 2]);
        assert_eq!(renderer.peak.load(Ordering::SeqCst), 1);
        // Iteration is always in page order.
        let order: Vec<usize> = out.iter().map(|p| p.page_num).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn failures_and_panics_are_isolated() {
        let renderer = Arc::new(FakeRenderer {
            fail: vec![2],
            panic_on: vec![4],
            ..Default::default()
        });
        let events = Arc::new(Events::default());
        let progress: ProgressCallback = events.clone();
        let out = render_pages(renderer, &[1, 2, 3, 4, 5], 5, 2, &progress).await;

        let filled: Vec<usize> = out.iter().map(|p| p.page_num).collect();
        assert_eq!(filled, vec![1, 3, 5]);
        assert_eq!(events.rendered.load(Ordering::SeqCst), 3);
        assert_eq!(events.failed.load(Ordering::SeqCst), 2);
        assert_eq!(*events.complete.lock().unwrap(), Some((5, 3)));
    }

    #[tokio::test]
    async fn duplicates_render_once() {
        let renderer = Arc::new(FakeRenderer::default());
        let out = render_pages(Arc::clone(&renderer), &[2, 2, 1, 2], 3, 0, &noop()).await;

        assert_eq!(out.rendered_count(), 2);
        assert_eq!(*renderer.calls.lock().unwrap(), vec![2, 1]);
    }

    #[tokio::test]
    async fn empty_request_returns_empty_slots() {
        let renderer = Arc::new(FakeRenderer::default());
        let out = render_pages(renderer, &[], 4, 3, &noop()).await;
        assert_eq!(out.len(), 4);
        assert_eq!(out.rendered_count(), 0);
    }
}

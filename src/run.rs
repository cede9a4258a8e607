//! Document run: validate → open → render → generate → report.

use crate::client::Client;
use crate::config::RunConfig;
use crate::error::UniAiError;
use crate::generate::{generate_pages, RequestTemplate};
use crate::output::RunReport;
use crate::pipeline::input;
use crate::pipeline::render::{PageRenderer, PdfiumRenderer};
use crate::pipeline::schedule::render_pages;
use crate::sink::{FileSink, ResponseSink, WriterSink};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Process one PDF end to end, streaming responses into `sink`.
///
/// Returns `Ok` once every rendered page has been attempted, even if some
/// pages failed; see [`RunReport::failed_pages`].
///
/// # Errors
/// Only for problems that stop the run before any page is attempted:
/// missing or unreadable input, a non-PDF file, an unusable document, a
/// missing pdfium library, or an output directory that cannot be created.
pub async fn process_document(
    client: &Client,
    config: &RunConfig,
    sink: &mut dyn ResponseSink,
) -> Result<RunReport, UniAiError> {
    info!("Processing {}", config.input.display());

    // ── Step 1: Validate input ───────────────────────────────────────────
    input::validate_pdf(&config.input)?;

    // ── Step 2: Output layout ────────────────────────────────────────────
    let document_dir = config.document_dir();
    tokio::fs::create_dir_all(&document_dir)
        .await
        .map_err(|e| UniAiError::OutputWriteFailed {
            path: document_dir.clone(),
            source: e,
        })?;
    debug!("Images go to {}", document_dir.display());

    // ── Step 3: Open the document ────────────────────────────────────────
    let pdf_path = config.input.clone();
    let password = config.password.clone();
    let (width, quality) = (config.render_width, config.jpeg_quality);
    let renderer = tokio::task::spawn_blocking(move || {
        PdfiumRenderer::open(&pdf_path, password.as_deref(), &document_dir, width, quality)
    })
    .await
    .map_err(|e| UniAiError::Internal(format!("open task failed: {e}")))??;
    let total_pages = renderer.page_count();

    run_pages(client, config, Arc::new(renderer), total_pages, sink).await
}

/// Render and generate the configured pages with a caller-supplied renderer.
///
/// The document must already be open; `total_pages` bounds the selection.
pub async fn run_pages<R: PageRenderer>(
    client: &Client,
    config: &RunConfig,
    renderer: Arc<R>,
    total_pages: usize,
    sink: &mut dyn ResponseSink,
) -> Result<RunReport, UniAiError> {
    // ── Step 4: Resolve pages ────────────────────────────────────────────
    let pages = config.pages.resolve(total_pages);
    let requested_pages = pages.iter().collect::<HashSet<_>>().len();
    debug!("Selected {} pages of {}", requested_pages, total_pages);

    // ── Step 5: Render ───────────────────────────────────────────────────
    let render_start = Instant::now();
    let rendered = render_pages(
        renderer,
        &pages,
        total_pages,
        config.render_limit(),
        &config.progress,
    )
    .await;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!(
        "Rendered {} pages in {}ms",
        rendered.rendered_count(),
        render_duration_ms
    );

    // ── Step 6: Generate ─────────────────────────────────────────────────
    let template = RequestTemplate::from_config(config);
    let generate_start = Instant::now();
    let outcome = generate_pages(client, &rendered, &template, sink).await;
    let generate_duration_ms = generate_start.elapsed().as_millis() as u64;

    let report = RunReport {
        total_pages,
        requested_pages,
        rendered_pages: rendered.rendered_count(),
        generated_pages: outcome.succeeded,
        failed_pages: requested_pages.saturating_sub(outcome.succeeded),
        render_duration_ms,
        generate_duration_ms,
    };
    info!(
        "Run complete: {}/{} pages answered, {}ms generating",
        report.generated_pages, report.requested_pages, report.generate_duration_ms
    );
    Ok(report)
}

/// The sink a run writes to by default: per-page files under
/// [`RunConfig::response_dir`] when `write_response` is set, stdout otherwise.
pub fn default_sink(config: &RunConfig) -> Box<dyn ResponseSink> {
    if config.write_response {
        Box::new(FileSink::new(config.response_dir()))
    } else {
        Box::new(WriterSink::stdout())
    }
}

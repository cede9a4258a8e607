//! # uniai-client
//!
//! Render PDF pages to images and ask a UniAI inference service about each
//! one, streaming the answers back as they are produced.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     check the file exists and starts with %PDF
//!  ├─ 2. Pages     parse the page selector ("1-3,5")
//!  ├─ 3. Render    rasterise pages via pdfium (spawn_blocking, ≤ N at once)
//!  ├─ 4. Generate  one streaming /api/generate call per page
//!  └─ 5. Sink      deltas to stdout or <output>/<pdf>/response/page_N.txt
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use uniai_client::{process_document, Client, RunConfig, WriterSink};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(Some("http://127.0.0.1:11434"), "user:secret")?;
//!     let config = RunConfig::builder("report.pdf", "Summarise this page")
//!         .parallel(true)
//!         .build()?;
//!     let mut sink = WriterSink::stdout();
//!     let report = process_document(&client, &config, &mut sink).await?;
//!     eprintln!("{}/{} pages answered", report.generated_pages, report.requested_pages);
//!     Ok(())
//! }
//! ```
//!
//! ## Streaming directly
//!
//! [`Client::generate`] and [`Client::chat`] take a handler that sees every
//! event in order. Returning `Err` from the handler stops the stream.
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `uniai` binary (clap + anyhow + tracing-subscriber + indicatif + dotenvy) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! uniai-client = { version = "0.1", default-features = false }
//! ```
//!
//! ## pdfium
//!
//! Rendering needs the pdfium shared library. It is looked up in
//! `PDFIUM_LIB_PATH`, then the working directory, then the system library
//! path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod error;
pub mod generate;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod run;
pub mod sink;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{
    ChatRequest, ChatResponse, Client, GenerateRequest, GenerateResponse, ImageData, Message,
    Metrics, Options, StatusError, DEFAULT_BASE_URL, DEFAULT_MODEL,
};
pub use config::{PageSelection, RunConfig, RunConfigBuilder};
pub use error::{HandlerError, PageError, PageRangeError, UniAiError};
pub use generate::{generate_pages, GenerationOutcome, RequestTemplate};
pub use output::RunReport;
pub use pipeline::pages::parse_page_range;
pub use pipeline::render::{PageRenderer, PdfiumRenderer, RenderedPage};
pub use pipeline::schedule::{render_pages, RenderedPages};
pub use progress::{NoopProgress, ProgressCallback, RenderProgress};
pub use run::{default_sink, process_document, run_pages};
pub use sink::{FileSink, ResponseSink, WriterSink};

//! Configuration for a document run.
//!
//! All run behaviour is controlled through [`RunConfig`], built via its
//! [`RunConfigBuilder`]. The builder validates on [`RunConfigBuilder::build`]
//! so a `RunConfig` in hand is always usable.

use crate::client::{Options, DEFAULT_MODEL};
use crate::error::UniAiError;
use crate::pipeline::pages::parse_page_range;
use crate::progress::{NoopProgress, ProgressCallback};
use crate::prompts::DEFAULT_SYSTEM_PROMPT;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

/// Default number of pages rendered at once in parallel mode.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Width, in pixels, pages are rasterised to.
pub const DEFAULT_RENDER_WIDTH: u32 = 1400;

/// JPEG quality of the persisted page images.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Configuration for one PDF → responses run.
///
/// # Example
/// ```rust
/// use uniai_client::{PageSelection, RunConfig};
///
/// let config = RunConfig::builder("report.pdf", "Summarise this page")
///     .output_dir("./output")
///     .pages("1-3".parse::<PageSelection>().unwrap())
///     .parallel(true)
///     .build()
///     .unwrap();
/// assert_eq!(config.document_dir(), std::path::Path::new("./output/report"));
/// ```
#[derive(Clone)]
pub struct RunConfig {
    /// PDF to process.
    pub input: PathBuf,

    /// Root output directory. Images land in `<output_dir>/<pdf-stem>/`.
    pub output_dir: PathBuf,

    /// User prompt sent with every page.
    pub prompt: String,

    /// System instruction sent with every page.
    pub system_prompt: String,

    /// Model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Sampling parameters.
    pub options: Options,

    /// Pages to process. Default: all.
    pub pages: PageSelection,

    /// Render pages concurrently. Default: false (strictly sequential).
    pub parallel: bool,

    /// Maximum renders in flight when `parallel` is set. Default: 3.
    ///
    /// Rasterisation is CPU- and memory-heavy; a small cap keeps a
    /// several-hundred-page document from spawning hundreds of renders at once.
    pub concurrency: usize,

    /// Persist each page's response to `<document_dir>/response/page_<N>.txt`
    /// instead of streaming it to the default sink. Default: false.
    pub write_response: bool,

    /// Target raster width in pixels. Default: 1400.
    pub render_width: u32,

    /// JPEG quality, 1–100. Default: 90.
    pub jpeg_quality: u8,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Render-phase progress events.
    pub progress: ProgressCallback,
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("input", &self.input)
            .field("output_dir", &self.output_dir)
            .field("prompt", &self.prompt)
            .field("model", &self.model)
            .field("options", &self.options)
            .field("pages", &self.pages)
            .field("parallel", &self.parallel)
            .field("concurrency", &self.concurrency)
            .field("write_response", &self.write_response)
            .field("render_width", &self.render_width)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl RunConfig {
    /// Create a builder with every optional knob at its default.
    pub fn builder(input: impl Into<PathBuf>, prompt: impl Into<String>) -> RunConfigBuilder {
        RunConfigBuilder {
            config: RunConfig {
                input: input.into(),
                output_dir: PathBuf::from("./output"),
                prompt: prompt.into(),
                system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
                model: DEFAULT_MODEL.to_string(),
                options: Options::default(),
                pages: PageSelection::default(),
                parallel: false,
                concurrency: DEFAULT_CONCURRENCY,
                write_response: false,
                render_width: DEFAULT_RENDER_WIDTH,
                jpeg_quality: DEFAULT_JPEG_QUALITY,
                password: None,
                progress: Arc::new(NoopProgress),
            },
        }
    }

    /// `<output_dir>/<pdf-stem>`, where page images are written.
    pub fn document_dir(&self) -> PathBuf {
        let stem = self
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document".to_string());
        self.output_dir.join(stem)
    }

    /// `<document_dir>/response`, where persisted responses are written.
    pub fn response_dir(&self) -> PathBuf {
        self.document_dir().join("response")
    }

    /// Concurrency limit handed to the scheduler; 0 means sequential.
    pub fn render_limit(&self) -> usize {
        if self.parallel {
            self.concurrency
        } else {
            0
        }
    }
}

/// Builder for [`RunConfig`].
#[derive(Debug)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.output_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn options(mut self, options: Options) -> Self {
        self.config.options = options;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn parallel(mut self, v: bool) -> Self {
        self.config.parallel = v;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn write_response(mut self, v: bool) -> Self {
        self.config.write_response = v;
        self
    }

    pub fn render_width(mut self, px: u32) -> Self {
        self.config.render_width = px;
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress(mut self, cb: ProgressCallback) -> Self {
        self.config.progress = cb;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RunConfig, UniAiError> {
        let c = &self.config;
        if c.prompt.trim().is_empty() {
            return Err(UniAiError::InvalidConfig("prompt must not be empty".into()));
        }
        if c.model.trim().is_empty() {
            return Err(UniAiError::InvalidConfig("model must not be empty".into()));
        }
        if c.concurrency == 0 {
            return Err(UniAiError::InvalidConfig("concurrency must be ≥ 1".into()));
        }
        if c.render_width < 100 {
            return Err(UniAiError::InvalidConfig(format!(
                "render width must be ≥ 100 px, got {}",
                c.render_width
            )));
        }
        if !(1..=100).contains(&c.jpeg_quality) {
            return Err(UniAiError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.jpeg_quality
            )));
        }
        c.options.validate()?;
        Ok(self.config)
    }
}

// ── Page selection ───────────────────────────────────────────────────────

/// Which pages of the PDF to process.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Every page, in order (default).
    #[default]
    All,
    /// Explicit 1-indexed page numbers in the order given. Duplicates and
    /// out-of-range numbers are kept here and skipped by the scheduler.
    List(Vec<usize>),
}

impl PageSelection {
    /// Expand into the page numbers to hand to the scheduler.
    pub fn resolve(&self, total_pages: usize) -> Vec<usize> {
        match self {
            PageSelection::All => (1..=total_pages).collect(),
            PageSelection::List(pages) => pages.clone(),
        }
    }
}

impl FromStr for PageSelection {
    type Err = UniAiError;

    /// `""` and `"all"` select every page; anything else goes through
    /// [`parse_page_range`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(PageSelection::All);
        }
        let pages = parse_page_range(s)?;
        if pages.is_empty() {
            Ok(PageSelection::All)
        } else {
            Ok(PageSelection::List(pages))
        }
    }
}

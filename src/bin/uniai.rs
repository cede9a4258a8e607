//! CLI binary for uniai-client.
//!
//! A thin shim over the library crate: flags map onto `RunConfig` and
//! `Client`, model output goes to stdout (or per-page files), and everything
//! else goes to stderr.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use uniai_client::{
    default_sink, process_document, ChatRequest, ChatResponse, Client, HandlerError, ImageData,
    Message, Options, PageSelection, RenderProgress, RunConfig, RunReport, DEFAULT_MODEL,
};

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── Render progress bar ──────────────────────────────────────────────────────

/// Progress bar for the render phase. Pages may finish out of order in
/// parallel mode, so only counts are tracked.
struct CliRenderProgress {
    bar: ProgressBar,
    failed: AtomicUsize,
}

impl CliRenderProgress {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            failed: AtomicUsize::new(0),
        })
    }
}

impl RenderProgress for CliRenderProgress {
    fn on_render_start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  \
                 ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  "),
        );
        self.bar.set_prefix("Rendering");
        self.bar.set_message("");
    }

    fn on_page_rendered(&self, page_num: usize, total: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}",
            green("✓"),
            page_num,
            total
        ));
        self.bar.inc(1);
    }

    fn on_page_failed(&self, page_num: usize, total: usize, error: &str) {
        self.failed.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg)
        ));
        self.bar.inc(1);
    }

    fn on_render_complete(&self, requested: usize, rendered: usize) {
        self.bar.finish_and_clear();
        let failed = self.failed.load(Ordering::SeqCst);
        eprintln!(
            "{} {}/{} pages rendered{}",
            if failed == 0 { green("✔") } else { red("⚠") },
            bold(&rendered.to_string()),
            requested,
            if failed == 0 {
                String::new()
            } else {
                format!("  ({} failed)", red(&failed.to_string()))
            }
        );
    }
}

// ── Arguments ────────────────────────────────────────────────────────────────

const AFTER_HELP: &str = r#"EXAMPLES:
  # Ask about every page, one page at a time
  uniai pdf -f report.pdf -m "Summarise this page"

  # Pages 1-3 and 5, rendered three at a time, answers saved per page
  uniai pdf -f report.pdf -m "Extract the tables" -r 1-3,5 -p -w

  # OCR-first answers
  uniai pdf -f scan.pdf -m "Transcribe with high precision"

  # Chat with an image attached
  uniai chat -m "What is in this picture?" --image photo.jpg

  # Service checks
  uniai ping
  uniai version

ENVIRONMENT VARIABLES:
  API_BASEURL      Base URL of the inference service (default http://127.0.0.1:11434)
  API_AUTH         Credential sent as HTTP Basic auth (required)
  PDFIUM_LIB_PATH  Path to libpdfium; otherwise ./ and the system path are searched
  RUST_LOG         Overrides the log filter

A .env file in the working directory is read on startup.
"#;

/// Render PDF pages and stream per-page answers from a UniAI service.
#[derive(Parser, Debug)]
#[command(
    name = "uniai",
    version,
    about = "Render PDF pages and stream per-page answers from a UniAI inference service",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Base URL of the inference service.
    #[arg(long, global = true, env = "API_BASEURL")]
    base_url: Option<String>,

    /// Credential for HTTP Basic auth.
    #[arg(long, global = true, env = "API_AUTH", hide_env_values = true)]
    auth: Option<String>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors and model output.
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render PDF pages and ask about each one.
    #[command(visible_alias = "uniai")]
    Pdf(PdfArgs),

    /// Send one chat message, optionally with images.
    Chat(ChatArgs),

    /// Print the service version.
    Version,

    /// Check that the service is reachable.
    Ping,
}

#[derive(clap::Args, Debug)]
struct PdfArgs {
    /// PDF file to process.
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Root output directory; images go to <output>/<pdf-name>/.
    #[arg(short, long, default_value = "./output")]
    output: PathBuf,

    /// Prompt sent with every page.
    #[arg(short = 'm', long)]
    prompt: Option<String>,

    /// Pages to process: 5, 1-3, 1,2,4 or 1-3,5. Default: all.
    #[arg(short = 'r', long, default_value = "all")]
    pages: String,

    /// Render pages concurrently.
    #[arg(short, long)]
    parallel: bool,

    /// Save each answer to <output>/<pdf-name>/response/page_<N>.txt.
    #[arg(short, long)]
    write_response: bool,

    /// Maximum pages rendered at once with --parallel.
    #[arg(long, default_value_t = uniai_client::config::DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Model identifier.
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// Replace the default system instruction.
    #[arg(long)]
    system: Option<String>,

    #[command(flatten)]
    sampling: SamplingArgs,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Disable the render progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Print the run report as JSON on stderr when done.
    #[arg(long)]
    json: bool,
}

#[derive(clap::Args, Debug)]
struct ChatArgs {
    /// Message text.
    #[arg(short = 'm', long)]
    prompt: String,

    /// Image to attach; repeatable.
    #[arg(long = "image")]
    images: Vec<PathBuf>,

    /// Model identifier.
    #[arg(long, default_value = DEFAULT_MODEL)]
    model: String,

    /// System message sent before the prompt.
    #[arg(long)]
    system: Option<String>,

    #[command(flatten)]
    sampling: SamplingArgs,
}

#[derive(clap::Args, Debug)]
struct SamplingArgs {
    /// Sampling temperature (0.0–2.0).
    #[arg(long, default_value_t = 0.25)]
    temperature: f32,

    /// Top-k sampling (≥ 1).
    #[arg(long, default_value_t = 40)]
    top_k: u32,

    /// Top-p sampling (0.0–1.0).
    #[arg(long, default_value_t = 0.95)]
    top_p: f32,
}

impl SamplingArgs {
    fn options(&self) -> Result<Options> {
        let options = Options {
            temperature: self.temperature,
            top_k: self.top_k,
            top_p: self.top_p,
        };
        options.validate().context("Invalid sampling options")?;
        Ok(options)
    }
}

// ── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO-level library logs are muted while the progress bar is drawing.
    let show_progress = match &cli.command {
        Command::Pdf(args) => !cli.quiet && !args.no_progress,
        _ => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if show_progress {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::Pdf(args) => run_pdf(&cli, args, show_progress).await,
        Command::Chat(args) => run_chat(&cli, args).await,
        Command::Version => {
            let version = client(&cli)?
                .version()
                .await
                .context("Failed to query service version")?;
            println!("{version}");
            Ok(())
        }
        Command::Ping => {
            let client = client(&cli)?;
            client
                .heartbeat()
                .await
                .with_context(|| format!("{} is not reachable", client.base_url()))?;
            if !cli.quiet {
                eprintln!("{} {} is up", green("✔"), client.base_url());
            }
            Ok(())
        }
    }
}

fn client(cli: &Cli) -> Result<Client> {
    Client::new(cli.base_url.as_deref(), cli.auth.as_deref().unwrap_or(""))
        .context("Failed to configure the inference client")
}

async fn run_pdf(cli: &Cli, args: &PdfArgs, show_progress: bool) -> Result<()> {
    let (Some(file), Some(prompt)) = (&args.file, &args.prompt) else {
        let mut cmd = Cli::command();
        if let Some(sub) = cmd.find_subcommand_mut("pdf") {
            sub.print_help().context("Failed to print help")?;
        }
        return Ok(());
    };

    let client = client(cli)?;
    let config = build_config(args, file, prompt, show_progress)?;
    let mut sink = default_sink(&config);

    let report = process_document(&client, &config, sink.as_mut())
        .await
        .with_context(|| format!("Failed to process {}", file.display()))?;

    if args.json {
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise run report")?
        );
    } else if !cli.quiet {
        print_summary(&report, &config);
    }
    Ok(())
}

/// Map `pdf` flags onto a `RunConfig`.
fn build_config(
    args: &PdfArgs,
    file: &Path,
    prompt: &str,
    show_progress: bool,
) -> Result<RunConfig> {
    let pages: PageSelection = args
        .pages
        .parse()
        .with_context(|| format!("Invalid --pages '{}'", args.pages))?;

    let mut builder = RunConfig::builder(file, prompt)
        .output_dir(&args.output)
        .model(&args.model)
        .options(args.sampling.options()?)
        .pages(pages)
        .parallel(args.parallel)
        .concurrency(args.concurrency)
        .write_response(args.write_response);

    if let Some(ref system) = args.system {
        builder = builder.system_prompt(system);
    }
    if let Some(ref password) = args.password {
        builder = builder.password(password);
    }
    if show_progress {
        builder = builder.progress(CliRenderProgress::new());
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(report: &RunReport, config: &RunConfig) {
    eprintln!(
        "{}  {}/{} pages answered  render {}ms  generate {}ms",
        if report.failed_pages == 0 {
            green("✔")
        } else {
            red("⚠")
        },
        report.generated_pages,
        report.requested_pages,
        report.render_duration_ms,
        report.generate_duration_ms,
    );
    eprintln!("   images → {}", dim(&config.document_dir().display().to_string()));
    if config.write_response {
        eprintln!(
            "   responses → {}",
            dim(&config.response_dir().display().to_string())
        );
    }
}

async fn run_chat(cli: &Cli, args: &ChatArgs) -> Result<()> {
    let client = client(cli)?;

    let mut images = Vec::with_capacity(args.images.len());
    for path in &args.images {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read image {}", path.display()))?;
        images.push(ImageData::new(bytes));
    }

    let mut messages = Vec::new();
    if let Some(ref system) = args.system {
        messages.push(Message::system(system));
    }
    messages.push(Message::user_with_images(&args.prompt, images));

    let request = ChatRequest {
        model: args.model.clone(),
        messages,
        options: args.sampling.options()?,
        stream: Some(true),
        format: None,
        keep_alive: None,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    client
        .chat(&request, |event: ChatResponse| -> Result<(), HandlerError> {
            out.write_all(event.message.content.as_bytes())?;
            if event.done {
                out.write_all(b"\n")?;
                let summary = event.metrics.summary();
                if !summary.is_empty() && !cli.quiet {
                    eprintln!("{}", dim(&summary));
                }
            }
            out.flush()?;
            Ok(())
        })
        .await
        .context("Chat request failed")?;
    Ok(())
}

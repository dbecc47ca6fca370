//! CLI binary for edgequake-pdf2docx.
//!
//! A thin shim over the library crate that maps CLI flags to `RunConfig`
//! and `JobSpec`s, renders progress, and prints the run summary.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2docx::settings::{self, KeyStore, CONF_FILE, DEFAULT_KEY_FILE, MODEL_LIST_FILE};
use edgequake_pdf2docx::{
    execute, pdf_inventory, CancelToken, EventKind, JobSpec, PageRasterizer, PdfiumRasterizer,
    ProgressEvent, RunConfig, RunOptions, RunProgressCallback, RunReport, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar per job, re-sized whenever a new job
/// starts, with per-page log lines printed above it.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Checking inputs…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn activate_bar(&self, label: &str, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_style(style);
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_prefix(label.to_string());
        self.bar.reset_eta();
    }
}

impl RunProgressCallback for CliProgressCallback {
    fn on_event(&self, event: &ProgressEvent) {
        let label = event.label.as_deref().unwrap_or("");
        match (event.stage, event.kind) {
            (Stage::Rasterizing, EventKind::Started) => {
                self.bar.set_prefix(label.to_string());
                self.bar.set_message(event.message.clone());
            }
            (Stage::Transcribing, EventKind::Started) => {
                let total = event.total.unwrap_or(0) as u64;
                if self.bar.length() != Some(total) || self.bar.position() == total {
                    self.activate_bar(label, total as usize);
                }
                if let Some(page) = event.page {
                    self.bar.set_message(format!("page {page}"));
                }
            }
            (Stage::Transcribing, EventKind::Completed) => {
                self.bar.println(format!(
                    "  {} {:<16} page {:>3}",
                    green("✓"),
                    label,
                    event.page.unwrap_or(0)
                ));
                self.bar.inc(1);
            }
            (Stage::Transcribing, EventKind::PageFailed) => {
                let msg = if event.message.chars().count() > 80 {
                    let cut: String = event.message.chars().take(79).collect();
                    format!("{cut}\u{2026}")
                } else {
                    event.message.clone()
                };
                self.bar.println(format!(
                    "  {} {:<16} page {:>3}  {}",
                    red("✗"),
                    label,
                    event.page.unwrap_or(0),
                    red(&msg)
                ));
                self.bar.inc(1);
            }
            (Stage::FigureExtraction, _) => {
                self.bar.println(format!("    {}", dim(&event.message)));
            }
            (Stage::Assembling, EventKind::Completed) => {
                self.bar
                    .println(format!("{} {}", cyan("◆"), bold(&event.message)));
            }
            (Stage::Validating, EventKind::Note) => {
                self.bar.println(format!("  {}", dim(&event.message)));
            }
            (Stage::Done, _) | (Stage::Failed, _) => self.bar.finish_and_clear(),
            _ => {}
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Transcribe pages 1-12 of report.pdf from ./input into ./output
  pdf2docx --job report.pdf:1-12

  # Several PDFs plus every image in ./input, with figure crops
  pdf2docx --job a.pdf:1-3 --job b.pdf:5 --images --crop

  # Frame pages, pace requests, and add instructions
  pdf2docx --job scan.pdf:1-40 --frame --slowdown --extra "Keep line breaks"

  # List PDFs and page counts, or the configured models
  pdf2docx --list
  pdf2docx --models

  # Store the API key for later runs
  pdf2docx --save-key AIza...

SETTINGS FOLDER (default ./setting):
  conf.txt        key: "value" lines. Keys: pdfium_path, provider,
                  cjk_font, latin_font
  mainprompt.txt  primary transcription instructions
  model.txt       selectable model identifiers, one per line

OUTPUT:
  (unproofed)<name>.docx per PDF, (unproofed)picture.docx for images,
  <name>_<page>_figure_<n>.png crops with --crop.

ENVIRONMENT VARIABLES:
  PDF2DOCX_API_KEY   API key (otherwise read from the key file)
  RUST_LOG           Override log filter
"#;

/// Transcribe PDF pages and images into Word documents using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2docx",
    version,
    about = "Transcribe PDF pages and images into Word documents using Vision LLMs",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF and page range to transcribe, as NAME.pdf:START-END (repeatable).
    #[arg(short, long = "job", value_name = "NAME:RANGE")]
    jobs: Vec<JobSpec>,

    /// Also transcribe the standalone images (.png/.jpg/.jpeg) in the input folder.
    #[arg(long)]
    images: bool,

    /// Draw a solid frame around every PDF page before transcription.
    #[arg(long)]
    frame: bool,

    /// Export figure crops next to the documents.
    #[arg(long)]
    crop: bool,

    /// Wait 4 seconds after every page.
    #[arg(long)]
    slowdown: bool,

    /// Minimum figure area in pixels².
    #[arg(long, default_value_t = 10_000)]
    min_area: u32,

    /// Padding around each figure crop, in pixels.
    #[arg(long, default_value_t = 60)]
    padding: u32,

    /// Additional instructions appended to the main prompt.
    #[arg(long)]
    extra: Option<String>,

    /// Model ID. Defaults to the first entry of model.txt.
    #[arg(long)]
    model: Option<String>,

    /// Provider: gemini, openai, anthropic, mistral, ollama, ….
    #[arg(long)]
    provider: Option<String>,

    /// Input folder.
    #[arg(long, default_value = "input")]
    input: PathBuf,

    /// Output folder.
    #[arg(long, default_value = "output")]
    output: PathBuf,

    /// Settings folder.
    #[arg(long, default_value = "setting")]
    settings: PathBuf,

    /// File holding the API key.
    #[arg(long, default_value = DEFAULT_KEY_FILE)]
    key_file: PathBuf,

    /// API key; overrides the key file.
    #[arg(long, env = "PDF2DOCX_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Write KEY to the key file and exit.
    #[arg(long, value_name = "KEY")]
    save_key: Option<String>,

    /// Rendering DPI (72–600).
    #[arg(long, default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Retries per page on provider failure.
    #[arg(long, default_value_t = 0,
          value_parser = clap::value_parser!(u32).range(0..=10))]
    max_retries: u32,

    /// Per-page provider timeout in seconds.
    #[arg(long, default_value_t = 120)]
    api_timeout: u64,

    /// List PDFs in the input folder with their page counts and exit.
    #[arg(long)]
    list: bool,

    /// List the models from model.txt and exit.
    #[arg(long)]
    models: bool,

    /// Open the output folder when the run succeeds.
    #[arg(long)]
    open: bool,

    /// Print the run report as JSON.
    #[arg(long)]
    json: bool,

    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── One-shot modes ───────────────────────────────────────────────────
    let key_store = KeyStore::open(&cli.key_file).context("Failed to open key file")?;
    if let Some(ref key) = cli.save_key {
        key_store.write_key(key).context("Failed to save API key")?;
        eprintln!("{} API key saved to {}", green("✔"), key_store.path().display());
        return Ok(());
    }

    let models = settings::load_models(&cli.settings.join(MODEL_LIST_FILE));
    if cli.models {
        for m in &models {
            println!("{m}");
        }
        return Ok(());
    }

    let rasterizer = PdfiumRasterizer::new(pdfium_dir(&cli.settings));
    if cli.list {
        let pdfs = pdf_inventory(&cli.input, &rasterizer);
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&pdfs).context("Failed to serialise inventory")?
            );
        } else {
            for pdf in &pdfs {
                println!("{:>5}  {}", pdf.pages, pdf.name);
            }
            let images = edgequake_pdf2docx::pipeline::input::count_display_images(&cli.input);
            println!("{} PDF(s), {} image(s)", pdfs.len(), images);
        }
        return Ok(());
    }

    if cli.jobs.is_empty() && !cli.images {
        anyhow::bail!("Nothing to do: pass --job NAME.pdf:START-END and/or --images");
    }

    // ── Validate page ranges against the documents ───────────────────────
    for spec in &cli.jobs {
        let path = cli.input.join(&spec.filename);
        if !path.is_file() {
            continue;
        }
        let total = tokio::task::block_in_place(|| rasterizer.page_count(&path));
        if let Ok(total) = total {
            spec.validate(Some(total))
                .with_context(|| format!("Invalid page range for {}", spec.filename))?;
        }
    }

    // ── Build config ─────────────────────────────────────────────────────
    let credential = cli
        .api_key
        .clone()
        .unwrap_or_else(|| key_store.read_key());
    let config = build_config(&cli, models.first().cloned(), show_progress)?;

    let cancel = CancelToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    // ── Run ──────────────────────────────────────────────────────────────
    let outcome = execute(&credential, &cli.jobs, &config, &cancel).await;
    let ok = match outcome {
        Ok(report) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_event(&ProgressEvent::new(Stage::Done, EventKind::Completed, ""));
            }
            print_report(&cli, &report)?;
            true
        }
        Err(e) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_event(&ProgressEvent::new(Stage::Failed, EventKind::Completed, ""));
            }
            eprintln!("{} {}", red("✘"), e);
            false
        }
    };

    if ok && cli.open {
        open_folder(&cli.output);
    }
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

/// `pdfium_path` from conf.txt, when the settings folder has one.
fn pdfium_dir(settings_dir: &Path) -> Option<PathBuf> {
    settings::read_config(&settings_dir.join(CONF_FILE))
        .ok()
        .and_then(|c| c.pdfium_path())
}

/// Map CLI args to `RunConfig`.
fn build_config(cli: &Cli, listed_model: Option<String>, show_progress: bool) -> Result<RunConfig> {
    let mut builder = RunConfig::builder()
        .input_dir(&cli.input)
        .output_dir(&cli.output)
        .settings_dir(&cli.settings)
        .dpi(cli.dpi)
        .options(RunOptions {
            transcribe: cli.images,
            black_frame: cli.frame,
            crop: cli.crop,
            slowdown: cli.slowdown,
        })
        .min_area(cli.min_area)
        .padding(cli.padding)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref extra) = cli.extra {
        builder = builder.extra_instructions(extra);
    }
    if let Some(model) = cli.model.clone().or(listed_model) {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if show_progress {
        builder = builder.progress_callback(CliProgressCallback::new() as Arc<dyn RunProgressCallback>);
    }

    builder.build().context("Invalid configuration")
}

fn print_report(cli: &Cli, report: &RunReport) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(report).context("Failed to serialise report")?;
        println!("{json}");
        return Ok(());
    }
    if cli.quiet {
        return Ok(());
    }
    for job in &report.jobs {
        let failed = job.failed_pages();
        eprintln!(
            "{}  {:<16} {}/{} pages  {} figure(s)  →  {}",
            if failed == 0 { green("✔") } else { cyan("⚠") },
            job.label,
            job.pages.len() - failed,
            job.pages.len(),
            job.figures(),
            bold(&job.document.display().to_string()),
        );
    }
    if !report.skipped_files.is_empty() {
        eprintln!(
            "   {}",
            dim(&format!("skipped: {}", report.skipped_files.join(", ")))
        );
    }
    eprintln!(
        "   {} document(s), {} page(s), {} failed  —  {}ms total",
        report.jobs.len(),
        report.total_pages(),
        report.failed_pages(),
        report.total_duration_ms
    );
    Ok(())
}

/// Post-run hook: show the output folder in the platform file browser.
fn open_folder(dir: &Path) {
    let opener = if cfg!(target_os = "windows") {
        "explorer"
    } else if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    if let Err(e) = std::process::Command::new(opener).arg(dir).spawn() {
        tracing::warn!("Could not open {}: {}", dir.display(), e);
    }
}

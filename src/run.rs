//! Job orchestration: validate the inputs, build the jobs, drive each one
//! through rasterisation, transcription and assembly.
//!
//! ## States
//!
//! ```text
//! Idle ─▶ Validating ─▶ (per job) Rasterizing/Transcribing ─▶ Assembling ─▶ Done
//!              │                         │                        │
//!              └──────────────── any fatal error ─────────────────┴──▶ Failed
//! ```
//!
//! Jobs run one after another on a single task. Each job is fully assembled
//! before the next is rasterised, so documents finished before a fatal error
//! stay on disk.
//!
//! ## Entry points
//!
//! * [`execute`] — the full run, returning a [`RunReport`] or the fatal error.
//! * [`run`] — the same, collapsed to the `bool` the caller waits on.
//! * [`spawn`] — `run` on a background task, with cooperative cancellation.
//! * [`run_sync`] — blocking wrapper for non-async callers.

use crate::config::{JobSpec, RunConfig};
use crate::document::{document_path, AssembledDocument, FontConfig};
use crate::error::Pdf2DocxError;
use crate::job::{label_for, Job, LabelRegistry, IMAGES_LABEL};
use crate::output::{JobReport, RunReport};
use crate::pipeline::figures::extract_figures;
use crate::pipeline::input::{load_images, InputInventory};
use crate::pipeline::llm::{resolve_transcriber, transcribe_page, PageTranscriber};
use crate::pipeline::render::{self, apply_frame, PageRasterizer, PdfiumRasterizer};
use crate::pipeline::transcript::{read_lines, transcript_path, TranscriptWriter};
use crate::progress::{emit, EventKind, ProgressEvent, Stage};
use crate::settings::{self, KEY_CJK_FONT, KEY_LATIN_FONT, KEY_PROVIDER};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Cooperative cancellation flag, checked before every page.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Handle to a run on a background task.
pub struct RunHandle {
    cancel: CancelToken,
    task: JoinHandle<bool>,
}

impl RunHandle {
    /// Ask the run to stop at the next page boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the run to finish. A panicked task counts as failure.
    pub async fn wait(self) -> bool {
        match self.task.await {
            Ok(ok) => ok,
            Err(e) => {
                error!("Run task failed: {}", e);
                false
            }
        }
    }
}

/// A PDF selected for this run.
struct PlannedPdf {
    filename: String,
    path: PathBuf,
    first_page: usize,
    last_page: usize,
}

/// Everything fixed once validation has passed.
struct RunContext<'a> {
    config: &'a RunConfig,
    instructions: String,
    fonts: FontConfig,
    transcriber: Arc<dyn PageTranscriber>,
    cancel: &'a CancelToken,
}

/// Run every job and return the report, or the first fatal error.
///
/// Validation order: input directory present and non-empty, settings
/// readable, standalone images present (only when `options.transcribe`;
/// absence is logged), page ranges for the PDFs named in `specs` (PDFs
/// without a spec are skipped), credential non-empty when any PDF job is
/// planned. Nothing is rasterised and the output directory is not touched
/// until all of it passes.
pub async fn execute(
    credential: &str,
    specs: &[JobSpec],
    config: &RunConfig,
    cancel: &CancelToken,
) -> Result<RunReport, Pdf2DocxError> {
    let total_start = Instant::now();
    let cb = &config.progress_callback;
    info!("Starting run: input={}", config.input_dir.display());
    emit(
        cb,
        ProgressEvent::new(Stage::Validating, EventKind::Started, "Validating inputs"),
    );

    // ── Step 1: Input directory ──────────────────────────────────────────
    let inventory = InputInventory::scan(&config.input_dir)?;

    // ── Step 2: Settings ─────────────────────────────────────────────────
    let loaded = settings::load(&config.settings_dir, config.extra_instructions.as_deref())?;

    // ── Step 3: Standalone images ────────────────────────────────────────
    let images = if config.options.transcribe {
        if inventory.images.is_empty() {
            info!("No image files detected in input");
            emit(
                cb,
                ProgressEvent::new(
                    Stage::Validating,
                    EventKind::Note,
                    "No image files detected in input",
                ),
            );
        }
        inventory.images.clone()
    } else {
        Vec::new()
    };

    // ── Step 4: Page ranges ──────────────────────────────────────────────
    let mut report = RunReport::default();
    let mut planned = Vec::new();
    for filename in &inventory.pdfs {
        match JobSpec::find(specs, filename) {
            Some(spec) => {
                spec.validate(None)?;
                planned.push(PlannedPdf {
                    filename: filename.clone(),
                    path: config.input_dir.join(filename),
                    first_page: spec.start_page,
                    last_page: spec.end_page,
                });
            }
            None => {
                debug!("No page range for {}; skipped", filename);
                report.skipped_files.push(filename.clone());
            }
        }
    }
    for spec in specs {
        if !inventory.pdfs.contains(&spec.filename) {
            warn!("{} is not in the input directory", spec.filename);
        }
    }

    // ── Step 5: Credential ───────────────────────────────────────────────
    // Required once a PDF job is planned. Image-only runs go ahead and let
    // each page fail on its own.
    if !planned.is_empty() && credential.trim().is_empty() {
        return Err(Pdf2DocxError::CredentialMissing);
    }

    let transcriber = resolve_transcriber(
        credential.trim(),
        config,
        loaded.config.get(KEY_PROVIDER),
    )?;
    let rasterizer: Arc<dyn PageRasterizer> = match config.rasterizer {
        Some(ref r) => Arc::clone(r),
        None => Arc::new(PdfiumRasterizer::new(loaded.config.pdfium_path())),
    };
    let fonts = FontConfig {
        cjk: config
            .cjk_font
            .clone()
            .or_else(|| loaded.config.get(KEY_CJK_FONT).map(str::to_string))
            .unwrap_or_else(|| FontConfig::default().cjk),
        latin: config
            .latin_font
            .clone()
            .or_else(|| loaded.config.get(KEY_LATIN_FONT).map(str::to_string))
            .unwrap_or_else(|| FontConfig::default().latin),
    };
    emit(
        cb,
        ProgressEvent::new(
            Stage::Validating,
            EventKind::Completed,
            format!(
                "{} PDF job(s), {} image(s), model {}",
                planned.len(),
                images.len(),
                config.model_name()
            ),
        ),
    );

    std::fs::create_dir_all(&config.output_dir).map_err(|e| Pdf2DocxError::OutputWriteFailed {
        path: config.output_dir.clone(),
        source: e,
    })?;

    let ctx = RunContext {
        config,
        instructions: loaded.instructions,
        fonts,
        transcriber,
        cancel,
    };
    let mut labels = LabelRegistry::default();

    // ── Step 6: Standalone images job ────────────────────────────────────
    if !images.is_empty() {
        let input_dir = config.input_dir.clone();
        let loaded_images = tokio::task::spawn_blocking(move || load_images(&input_dir, &images))
            .await
            .map_err(|e| Pdf2DocxError::Internal(format!("Image load task panicked: {e}")))??;
        let job = Job::from_images(labels.claim(IMAGES_LABEL), loaded_images);
        report.jobs.push(process_job(job, &ctx).await?);
    }

    // ── Step 7: PDF jobs ─────────────────────────────────────────────────
    for pdf in planned {
        if cancel.is_cancelled() {
            return Err(Pdf2DocxError::Cancelled);
        }
        let label = labels.claim(&label_for(&pdf.filename));
        emit(
            cb,
            ProgressEvent::new(
                Stage::Rasterizing,
                EventKind::Started,
                format!("Converting {} pages to images", pdf.filename),
            )
            .with_label(&label),
        );

        let mut pages = render::rasterize(
            Arc::clone(&rasterizer),
            &pdf.path,
            pdf.first_page,
            pdf.last_page,
            config.dpi,
        )
        .await?;
        if config.options.black_frame {
            for page in &mut pages {
                apply_frame(&mut page.image, config.frame_thickness);
            }
        }

        emit(
            cb,
            ProgressEvent::new(
                Stage::Rasterizing,
                EventKind::Completed,
                format!("{} page(s) of {} rendered", pages.len(), pdf.filename),
            )
            .with_label(&label),
        );
        report.jobs.push(process_job(Job::new(label, pages), &ctx).await?);
    }

    report.total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        "Run complete: {} job(s), {} page(s), {} failed, {}ms",
        report.jobs.len(),
        report.total_pages(),
        report.failed_pages(),
        report.total_duration_ms
    );
    Ok(report)
}

/// Transcribe every page of `job` into its transcript, then assemble and
/// save the document and delete the transcript.
async fn process_job(job: Job, ctx: &RunContext<'_>) -> Result<JobReport, Pdf2DocxError> {
    let config = ctx.config;
    let cb = &config.progress_callback;
    let label = job.label.clone();
    let total = job.len();
    info!("Starting text extraction from {} ({} pages)", label, total);

    let transcript = transcript_path(&config.output_dir, &label);
    let mut writer = TranscriptWriter::create(&transcript)?;
    let mut results = Vec::with_capacity(total);

    for page in job.pages {
        if ctx.cancel.is_cancelled() {
            info!("Run cancelled before {} page {}", label, page.page_num);
            return Err(Pdf2DocxError::Cancelled);
        }
        emit(
            cb,
            ProgressEvent::new(Stage::Transcribing, EventKind::Started, "Extracting text")
                .with_label(&label)
                .with_page(page.page_num, total),
        );

        let mut result = transcribe_page(
            ctx.transcriber.as_ref(),
            page.page_num,
            &page.image,
            &ctx.instructions,
        )
        .await;
        writer.append(&result.text)?;

        if result.is_ok() && config.options.crop {
            let out_dir = config.output_dir.clone();
            let base = format!("{}_{}", label, page.page_num);
            let (min_area, padding) = (config.min_area, config.padding);
            let image = page.image;
            let extracted = tokio::task::spawn_blocking(move || {
                extract_figures(&image, &out_dir, &base, min_area, padding)
            })
            .await;
            match extracted {
                Ok(Ok(regions)) => {
                    result.figures = regions.len();
                    if !regions.is_empty() {
                        emit(
                            cb,
                            ProgressEvent::new(
                                Stage::FigureExtraction,
                                EventKind::Completed,
                                format!("{} figure(s) written", regions.len()),
                            )
                            .with_label(&label)
                            .with_page(result.page_num, total),
                        );
                    }
                }
                Ok(Err(e)) => warn!("{} page {}: figure extraction failed: {}", label, result.page_num, e),
                Err(e) => warn!("{} page {}: figure task panicked: {}", label, result.page_num, e),
            }
        }

        let event = match result.error() {
            None => ProgressEvent::new(Stage::Transcribing, EventKind::Completed, "Page done"),
            Some(e) => ProgressEvent::new(Stage::Transcribing, EventKind::PageFailed, e.to_string()),
        };
        emit(cb, event.with_label(&label).with_page(result.page_num, total));
        results.push(result);

        if config.options.slowdown {
            debug!("Pacing: waiting {:?}", config.pacing_delay);
            tokio::time::sleep(config.pacing_delay).await;
        }
    }
    drop(writer);

    // ── Assembly ─────────────────────────────────────────────────────────
    emit(
        cb,
        ProgressEvent::new(Stage::Assembling, EventKind::Started, "Building document")
            .with_label(&label),
    );
    let lines = read_lines(&transcript)?;
    let document = AssembledDocument::assemble(&lines, &ctx.fonts);
    let doc_path = document_path(&config.output_dir, &label);
    document.save(&doc_path)?;
    remove_transcript(&transcript);

    emit(
        cb,
        ProgressEvent::new(
            Stage::Assembling,
            EventKind::Completed,
            format!("Word file saved: {}", doc_path.display()),
        )
        .with_label(&label),
    );

    Ok(JobReport {
        label,
        document: doc_path,
        paragraphs: document.paragraphs.len(),
        non_empty_paragraphs: document.non_empty_paragraphs(),
        pages: results,
    })
}

fn remove_transcript(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!("Could not delete transcript {}: {}", path.display(), e);
    }
}

/// Run to completion and report success as a `bool`.
///
/// Page failures do not make the run fail; any fatal error (including
/// cancellation) does.
pub async fn run(
    credential: &str,
    specs: &[JobSpec],
    config: &RunConfig,
    cancel: &CancelToken,
) -> bool {
    match execute(credential, specs, config, cancel).await {
        Ok(report) => {
            emit(
                &config.progress_callback,
                ProgressEvent::new(
                    Stage::Done,
                    EventKind::Completed,
                    format!("{} document(s) written", report.jobs.len()),
                ),
            );
            true
        }
        Err(e) => {
            error!("{}", e);
            emit(
                &config.progress_callback,
                ProgressEvent::new(Stage::Failed, EventKind::Completed, e.to_string()),
            );
            false
        }
    }
}

/// Start [`run`] on a background task.
///
/// Must be called from within a Tokio runtime.
pub fn spawn(credential: String, specs: Vec<JobSpec>, config: RunConfig) -> RunHandle {
    let cancel = CancelToken::new();
    let token = cancel.clone();
    let task = tokio::spawn(async move { run(&credential, &specs, &config, &token).await });
    RunHandle { cancel, task }
}

/// Synchronous wrapper around [`run`].
///
/// Creates a temporary tokio runtime internally.
pub fn run_sync(credential: &str, specs: &[JobSpec], config: &RunConfig) -> bool {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt.block_on(run(credential, specs, config, &CancelToken::new())),
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            false
        }
    }
}

//! # edgequake-pdf2docx
//!
//! Transcribe scanned or digital PDF pages, and standalone images, into Word
//! documents using Vision Language Models (VLMs).
//!
//! ## Why this crate?
//!
//! Classic OCR struggles with mixed Chinese/English scans: vertical CJK
//! glyphs, small Latin annotations, and uneven print quality. This crate
//! rasterises each page, lets a VLM read it, and writes the text into a
//! `.docx` where every character gets the right font for its script: CJK
//! ideographs in a CJK face, everything else in a Latin face with letters
//! set in italics so a proof-reader can spot them at a glance.
//!
//! ## Pipeline Overview
//!
//! ```text
//! input/
//!  │
//!  ├─ 1. Validate  input dir, settings, page ranges, credential
//!  ├─ 2. Render    rasterise page ranges via pdfium (spawn_blocking)
//!  ├─ 3. Figures   optional contour-based figure crops
//!  ├─ 4. VLM       one call per page, errors isolated per page
//!  ├─ 5. Transcript append-only, one blank line between pages
//!  └─ 6. Assemble  (unproofed){label}.docx, transcript removed
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_pdf2docx::{run, CancelToken, JobSpec, RunConfig, RunOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RunConfig::builder()
//!         .options(RunOptions { transcribe: true, crop: true, ..Default::default() })
//!         .model("gemini-2.5-flash")
//!         .build()?;
//!     let specs = vec![JobSpec::new("report.pdf", 1, 12)];
//!     let ok = run("my-api-key", &specs, &config, &CancelToken::new()).await;
//!     println!("success: {ok}");
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2docx` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-pdf2docx = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod job;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod run;
pub mod settings;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{JobSpec, RunConfig, RunConfigBuilder, RunOptions};
pub use document::{AssembledDocument, FontConfig};
pub use error::{PageError, Pdf2DocxError};
pub use output::{JobReport, PageStatus, RunReport, TranscriptionResult};
pub use pipeline::figures::{extract_figures, FigureRegion};
pub use pipeline::input::{pdf_inventory, PdfInfo};
pub use pipeline::llm::PageTranscriber;
pub use pipeline::render::{PageRasterizer, PdfiumRasterizer};
pub use progress::{EventKind, NoopProgressCallback, ProgressEvent, RunProgressCallback, Stage};
pub use run::{execute, run, run_sync, spawn, CancelToken, RunHandle};
pub use settings::KeyStore;

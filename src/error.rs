//! Error types for the edgequake-pdf2docx library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Pdf2DocxError`] — **Fatal**: the run cannot continue (missing input
//!   directory, unreadable settings, a PDF that will not rasterise, no
//!   credential). Returned as `Err(Pdf2DocxError)` from
//!   [`crate::run::execute`]; [`crate::run::run`] maps it to `false`.
//!
//! * [`PageError`] — **Non-fatal**: a single page could not be transcribed.
//!   It is recorded in [`crate::output::TranscriptionResult::status`] and the
//!   transcript receives a diagnostic placeholder instead of the page text.
//!   The job carries on with the next page.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-pdf2docx library.
///
/// Page-level failures use [`PageError`] and never surface here.
#[derive(Debug, Error)]
pub enum Pdf2DocxError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The input directory does not exist.
    #[error("Input directory not found: '{path}'")]
    InputDirNotFound { path: PathBuf },

    /// The input directory exists but holds no files.
    #[error("No files found in input directory '{path}'")]
    InputDirEmpty { path: PathBuf },

    /// A standalone image could not be opened or decoded.
    #[error("Failed to load image '{path}': {detail}")]
    ImageLoadFailed { path: PathBuf, detail: String },

    // ── Settings errors ───────────────────────────────────────────────────
    /// A required settings file is missing.
    #[error("Settings file not found: '{path}'\nCheck the setting folder again.")]
    SettingsNotFound { path: PathBuf },

    /// A settings file exists but could not be read.
    #[error("Failed to read settings file '{path}': {source}")]
    SettingsUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF could not be opened by the rendering backend.
    #[error("PDF '{path}' could not be opened: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// Requested start page lies beyond the end of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set `pdfium_path` in conf.txt to the directory containing libpdfium,\n\
or install pdfium in a system library location.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Provider errors ───────────────────────────────────────────────────
    /// No API credential was supplied.
    #[error("No API credential available. Skipping AI text extraction.")]
    CredentialMissing,

    /// The configured provider could not be created.
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Transcript / output errors ────────────────────────────────────────
    /// The intermediate transcript vanished before assembly.
    #[error("Transcript file not found: '{path}'")]
    TranscriptMissing { path: PathBuf },

    /// Appending to the intermediate transcript failed.
    #[error("Failed to write transcript '{path}': {source}")]
    TranscriptWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create the output directory or a file in it.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The Word document could not be packed.
    #[error("Failed to build document '{path}': {detail}")]
    DocumentWriteFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder or job-spec validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Control flow ──────────────────────────────────────────────────────
    /// The run was cancelled between two pages.
    #[error("Run cancelled")]
    Cancelled,

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single page.
///
/// Stored in [`crate::output::PageStatus::Error`]. The job continues.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// The page image could not be PNG-encoded.
    #[error("page {page}: image encoding failed: {detail}")]
    EncodeFailed { page: usize, detail: String },

    /// The provider call failed after all attempts.
    #[error("page {page}: LLM call failed after {attempts} attempt(s): {detail}")]
    LlmFailed {
        page: usize,
        attempts: u32,
        detail: String,
    },

    /// The provider call did not answer in time.
    #[error("page {page}: LLM call timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },
}

//! Result types produced by a run.

use crate::error::PageError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome of transcribing one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PageStatus {
    Ok,
    Error(PageError),
}

/// Text produced for one page.
///
/// On [`PageStatus::Error`], `text` holds the diagnostic placeholder that was
/// written to the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// Source page number (1-indexed).
    pub page_num: usize,
    pub text: String,
    pub status: PageStatus,
    /// Wall-clock time spent on the provider call.
    pub duration_ms: u64,
    /// Figure crops written for this page.
    pub figures: usize,
}

impl TranscriptionResult {
    pub fn is_ok(&self) -> bool {
        matches!(self.status, PageStatus::Ok)
    }

    pub fn error(&self) -> Option<&PageError> {
        match &self.status {
            PageStatus::Ok => None,
            PageStatus::Error(e) => Some(e),
        }
    }
}

/// Summary of one finished job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub label: String,
    /// The saved `(unproofed){label}.docx`.
    pub document: PathBuf,
    pub pages: Vec<TranscriptionResult>,
    /// Paragraphs in the document, blank ones included.
    pub paragraphs: usize,
    /// Paragraphs that contain at least one character.
    pub non_empty_paragraphs: usize,
}

impl JobReport {
    pub fn failed_pages(&self) -> usize {
        self.pages.iter().filter(|p| !p.is_ok()).count()
    }

    pub fn figures(&self) -> usize {
        self.pages.iter().map(|p| p.figures).sum()
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub jobs: Vec<JobReport>,
    /// Input files ignored because no job spec named them.
    pub skipped_files: Vec<String>,
    pub total_duration_ms: u64,
}

impl RunReport {
    pub fn total_pages(&self) -> usize {
        self.jobs.iter().map(|j| j.pages.len()).sum()
    }

    pub fn failed_pages(&self) -> usize {
        self.jobs.iter().map(JobReport::failed_pages).sum()
    }
}

//! Progress events emitted while a run is in flight.
//!
//! Inject an [`Arc<dyn RunProgressCallback>`] via
//! [`crate::config::RunConfigBuilder::progress_callback`] to receive one
//! [`ProgressEvent`] per notable step: validation, each PDF rasterised, each
//! page started/finished, each figure written, each document saved.
//!
//! The library never prints; a terminal, a log panel, or a channel to another
//! task are all just implementations of this trait.
//!
//! # Example
//!
//! ```rust
//! use edgequake_pdf2docx::{ProgressEvent, RunProgressCallback, Stage, RunConfig};
//! use std::sync::{Arc, Mutex};
//!
//! #[derive(Default)]
//! struct Collect(Mutex<Vec<ProgressEvent>>);
//!
//! impl RunProgressCallback for Collect {
//!     fn on_event(&self, event: &ProgressEvent) {
//!         self.0.lock().unwrap().push(event.clone());
//!     }
//! }
//!
//! let sink = Arc::new(Collect::default());
//! let config = RunConfig::builder()
//!     .progress_callback(sink.clone() as Arc<dyn RunProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Where in the pipeline an event originates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Validating,
    Rasterizing,
    Transcribing,
    FigureExtraction,
    Assembling,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Validating => "validating",
            Stage::Rasterizing => "rasterizing",
            Stage::Transcribing => "transcribing",
            Stage::FigureExtraction => "figures",
            Stage::Assembling => "assembling",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// What happened inside a [`Stage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// A stage began (for a job, or a page inside a job).
    Started,
    /// A stage finished successfully.
    Completed,
    /// A page failed; the job continues.
    PageFailed,
    /// Informational note, e.g. a skipped file.
    Note,
}

/// One progress notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub kind: EventKind,
    /// Job label, when the event belongs to a job.
    pub label: Option<String>,
    /// Source page number, when the event belongs to a page.
    pub page: Option<usize>,
    /// Total pages in the job, when known.
    pub total: Option<usize>,
    pub message: String,
}

impl ProgressEvent {
    pub fn new(stage: Stage, kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            label: None,
            page: None,
            total: None,
            message: message.into(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_page(mut self, page: usize, total: usize) -> Self {
        self.page = Some(page);
        self.total = Some(total);
        self
    }
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.stage)?;
        if let Some(ref label) = self.label {
            write!(f, " {label}")?;
        }
        if let Some(page) = self.page {
            write!(f, " page {page}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Receives [`ProgressEvent`]s from the pipeline.
///
/// The run executes on a background task, so implementations must be
/// `Send + Sync`. The default implementation ignores every event.
pub trait RunProgressCallback: Send + Sync {
    fn on_event(&self, event: &ProgressEvent) {
        let _ = event;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl RunProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::RunConfig`].
pub type ProgressCallback = Arc<dyn RunProgressCallback>;

/// Emit through an optional callback.
pub(crate) fn emit(cb: &Option<ProgressCallback>, event: ProgressEvent) {
    if let Some(cb) = cb {
        cb.on_event(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Collect(Mutex<Vec<ProgressEvent>>);

    impl RunProgressCallback for Collect {
        fn on_event(&self, event: &ProgressEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_event(&ProgressEvent::new(Stage::Done, EventKind::Completed, "ok"));
    }

    #[test]
    fn emit_reaches_callback() {
        let sink = Arc::new(Collect::default());
        let cb: Option<ProgressCallback> = Some(sink.clone() as ProgressCallback);
        emit(
            &cb,
            ProgressEvent::new(Stage::Transcribing, EventKind::Started, "go")
                .with_label("scan")
                .with_page(2, 5),
        );
        emit(&None, ProgressEvent::new(Stage::Done, EventKind::Completed, "ignored"));

        let events = sink.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].label.as_deref(), Some("scan"));
        assert_eq!(events[0].page, Some(2));
        assert_eq!(events[0].total, Some(5));
    }

    #[test]
    fn display_includes_stage_label_and_page() {
        let e = ProgressEvent::new(Stage::Transcribing, EventKind::Completed, "done")
            .with_label("scan")
            .with_page(3, 4);
        assert_eq!(e.to_string(), "[transcribing] scan page 3: done");
    }
}

//! Pipeline stages for page-to-document transcription.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. a different rendering backend) without
//! touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ figures ──▶ encode ──▶ llm ──▶ postprocess ──▶ transcript
//! (dir)    (pdfium)   (contours)  (base64)   (VLM)    (cleanup)       (append)
//! ```
//!
//! 1. [`input`]   — inventory the input directory, load standalone images
//! 2. [`render`]  — rasterise a page range; runs in `spawn_blocking` because
//!    pdfium is not async-safe; optional page frame
//! 3. [`figures`] — export large foreground regions as padded PNG crops
//! 4. [`encode`]  — PNG-encode and base64-wrap each page for the request body
//! 5. [`llm`]     — one provider call per page with error isolation; the only
//!    stage with network I/O
//! 6. [`postprocess`] — deterministic cleanup of model quirks
//! 7. [`transcript`]  — append each page to the per-job transcript file

pub mod encode;
pub mod figures;
pub mod input;
pub mod llm;
pub mod postprocess;
pub mod render;
pub mod transcript;

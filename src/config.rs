//! Configuration types for a transcription run.
//!
//! All run behaviour is controlled through [`RunConfig`], built via its
//! [`RunConfigBuilder`]. Keeping every knob in one struct makes it easy to
//! hand a run to a background task, log it, and diff two runs.
//!
//! What to convert is described separately by a list of [`JobSpec`] records,
//! one per PDF and page range.

use crate::error::Pdf2DocxError;
use crate::pipeline::llm::PageTranscriber;
use crate::pipeline::render::PageRasterizer;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default rendering resolution.
pub const DEFAULT_DPI: u32 = 200;
/// Default width of the optional page frame, in pixels.
pub const DEFAULT_FRAME_THICKNESS: u32 = 10;
/// Default minimum bounding-box area for an exported figure, in pixels².
pub const DEFAULT_MIN_AREA: u32 = 10_000;
/// Default padding around an exported figure, in pixels.
pub const DEFAULT_PADDING: u32 = 60;
/// Default delay after each page when pacing is on.
pub const DEFAULT_PACING_DELAY: Duration = Duration::from_secs(4);
/// Upper bound for [`RunConfig::max_retries`].
pub const MAX_RETRIES_LIMIT: u32 = 10;
/// Provider used when neither the config nor `conf.txt` names one.
pub const DEFAULT_PROVIDER: &str = "gemini";
/// Model used when none is selected.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// Font for CJK Unified Ideographs.
pub const DEFAULT_CJK_FONT: &str = "DFKai-SB";
/// Font for everything else.
pub const DEFAULT_LATIN_FONT: &str = "Times New Roman";

/// Independent processing toggles. No combination is invalid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Transcribe standalone images in the input directory as one extra job.
    pub transcribe: bool,
    /// Draw a solid frame flush to the edges of every rendered PDF page.
    pub black_frame: bool,
    /// Export figure crops next to the documents.
    pub crop: bool,
    /// Wait [`RunConfig::pacing_delay`] after every page.
    pub slowdown: bool,
}

/// One PDF and the inclusive, 1-indexed page range to transcribe from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    /// File name inside the input directory, e.g. `report.pdf`.
    pub filename: String,
    pub start_page: usize,
    pub end_page: usize,
}

impl JobSpec {
    pub fn new(filename: impl Into<String>, start_page: usize, end_page: usize) -> Self {
        Self {
            filename: filename.into(),
            start_page,
            end_page,
        }
    }

    /// Check `1 ≤ start ≤ end`, and `end ≤ total_pages` when the page count
    /// is known.
    pub fn validate(&self, total_pages: Option<usize>) -> Result<(), Pdf2DocxError> {
        if self.start_page < 1 || self.start_page > self.end_page {
            return Err(Pdf2DocxError::InvalidConfig(format!(
                "{}: invalid page range {}-{}",
                self.filename, self.start_page, self.end_page
            )));
        }
        if let Some(total) = total_pages {
            if self.end_page > total {
                return Err(Pdf2DocxError::PageOutOfRange {
                    page: self.end_page,
                    total,
                });
            }
        }
        Ok(())
    }

    /// Number of pages the range covers.
    pub fn page_count(&self) -> usize {
        self.end_page.saturating_sub(self.start_page) + 1
    }

    /// Find the spec for `filename` in a list of specs. The first match wins.
    pub fn find<'a>(specs: &'a [JobSpec], filename: &str) -> Option<&'a JobSpec> {
        specs.iter().find(|s| s.filename == filename)
    }
}

impl std::str::FromStr for JobSpec {
    type Err = Pdf2DocxError;

    /// Parse `name.pdf:START-END` or `name.pdf:PAGE`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            Pdf2DocxError::InvalidConfig(format!(
                "job '{s}' must look like name.pdf:START-END"
            ))
        };
        let (name, range) = s.rsplit_once(':').ok_or_else(invalid)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(invalid());
        }
        let (start, end) = match range.split_once('-') {
            Some((a, b)) => (a.trim(), b.trim()),
            None => (range.trim(), range.trim()),
        };
        let start: usize = start.parse().map_err(|_| invalid())?;
        let end: usize = end.parse().map_err(|_| invalid())?;
        let spec = JobSpec::new(name, start, end);
        spec.validate(None)?;
        Ok(spec)
    }
}

/// Configuration for one run.
///
/// Built via [`RunConfig::builder()`] or [`RunConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_pdf2docx::{RunConfig, RunOptions};
///
/// let config = RunConfig::builder()
///     .options(RunOptions { crop: true, ..Default::default() })
///     .min_area(5_000)
///     .model("gemini-2.5-flash")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct RunConfig {
    /// Directory holding the PDFs and images. Default: `input`.
    pub input_dir: PathBuf,
    /// Directory receiving documents and figures. Default: `output`.
    pub output_dir: PathBuf,
    /// Directory holding `conf.txt` and `mainprompt.txt`. Default: `setting`.
    pub settings_dir: PathBuf,

    /// Rendering DPI. Default: 200.
    pub dpi: u32,
    /// Width of the optional page frame. Default: 10.
    pub frame_thickness: u32,

    pub options: RunOptions,
    /// Minimum figure bounding-box area. Default: 10 000.
    pub min_area: u32,
    /// Padding added around each figure crop. Default: 60.
    pub padding: u32,

    /// Operator instructions appended to the primary prompt.
    pub extra_instructions: Option<String>,

    /// Model identifier. If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,
    /// Provider name (e.g. "gemini", "openai"). If None, `conf.txt` key
    /// `provider` is used, then [`DEFAULT_PROVIDER`].
    pub provider_name: Option<String>,
    /// Pre-constructed transcriber. Takes precedence over `provider_name`.
    pub transcriber: Option<Arc<dyn PageTranscriber>>,
    /// Pre-constructed rasterizer. If None, pdfium is bound using
    /// `conf.txt` key `pdfium_path`.
    pub rasterizer: Option<Arc<dyn PageRasterizer>>,

    /// Sampling temperature. Default: 0.1.
    pub temperature: f32,
    /// Maximum tokens generated per page. Default: 4096.
    pub max_tokens: usize,
    /// Extra attempts after a failed provider call. Default: 0, at most
    /// [`MAX_RETRIES_LIMIT`].
    pub max_retries: u32,
    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,
    /// Per-call timeout in seconds. Default: 120.
    pub api_timeout_secs: u64,
    /// Delay after each page when `options.slowdown` is set. Default: 4s.
    pub pacing_delay: Duration,

    /// Font for CJK characters. If None, `conf.txt` key `cjk_font`, then
    /// [`DEFAULT_CJK_FONT`].
    pub cjk_font: Option<String>,
    /// Font for all other characters. If None, `conf.txt` key `latin_font`,
    /// then [`DEFAULT_LATIN_FONT`].
    pub latin_font: Option<String>,

    /// Optional progress sink.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            output_dir: PathBuf::from("output"),
            settings_dir: PathBuf::from("setting"),
            dpi: DEFAULT_DPI,
            frame_thickness: DEFAULT_FRAME_THICKNESS,
            options: RunOptions::default(),
            min_area: DEFAULT_MIN_AREA,
            padding: DEFAULT_PADDING,
            extra_instructions: None,
            model: None,
            provider_name: None,
            transcriber: None,
            rasterizer: None,
            temperature: 0.1,
            max_tokens: 4096,
            max_retries: 0,
            retry_backoff_ms: 500,
            api_timeout_secs: 120,
            pacing_delay: DEFAULT_PACING_DELAY,
            cjk_font: None,
            latin_font: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("settings_dir", &self.settings_dir)
            .field("dpi", &self.dpi)
            .field("options", &self.options)
            .field("min_area", &self.min_area)
            .field("padding", &self.padding)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("transcriber", &self.transcriber.as_ref().map(|_| "<dyn PageTranscriber>"))
            .field("rasterizer", &self.rasterizer.as_ref().map(|_| "<dyn PageRasterizer>"))
            .field("max_retries", &self.max_retries)
            .field("pacing_delay", &self.pacing_delay)
            .field("progress_callback", &self.progress_callback.is_some())
            .finish()
    }
}

impl RunConfig {
    /// Create a new builder for `RunConfig`.
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder {
            config: Self::default(),
        }
    }

    /// Model identifier to request.
    pub fn model_name(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`RunConfig`].
#[derive(Debug)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn settings_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.settings_dir = dir.into();
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 600);
        self
    }

    pub fn frame_thickness(mut self, px: u32) -> Self {
        self.config.frame_thickness = px;
        self
    }

    pub fn options(mut self, options: RunOptions) -> Self {
        self.config.options = options;
        self
    }

    pub fn min_area(mut self, area: u32) -> Self {
        self.config.min_area = area;
        self
    }

    pub fn padding(mut self, px: u32) -> Self {
        self.config.padding = px;
        self
    }

    pub fn extra_instructions(mut self, text: impl Into<String>) -> Self {
        self.config.extra_instructions = Some(text.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn transcriber(mut self, transcriber: Arc<dyn PageTranscriber>) -> Self {
        self.config.transcriber = Some(transcriber);
        self
    }

    pub fn rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.config.rasterizer = Some(rasterizer);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n.min(MAX_RETRIES_LIMIT);
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn pacing_delay(mut self, delay: Duration) -> Self {
        self.config.pacing_delay = delay;
        self
    }

    pub fn cjk_font(mut self, font: impl Into<String>) -> Self {
        self.config.cjk_font = Some(font.into());
        self
    }

    pub fn latin_font(mut self, font: impl Into<String>) -> Self {
        self.config.latin_font = Some(font.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RunConfig, Pdf2DocxError> {
        let c = &self.config;
        if c.input_dir == c.output_dir {
            return Err(Pdf2DocxError::InvalidConfig(
                "input and output directories must differ".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(Pdf2DocxError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if let Some(ref m) = c.model {
            if m.trim().is_empty() {
                return Err(Pdf2DocxError::InvalidConfig("model name is empty".into()));
            }
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = RunConfig::default();
        assert_eq!(c.dpi, 200);
        assert_eq!(c.frame_thickness, 10);
        assert_eq!(c.min_area, 10_000);
        assert_eq!(c.padding, 60);
        assert_eq!(c.pacing_delay, Duration::from_secs(4));
        assert_eq!(c.model_name(), DEFAULT_MODEL);
        assert_eq!(c.options, RunOptions::default());
    }

    #[test]
    fn builder_rejects_same_input_and_output() {
        let err = RunConfig::builder()
            .input_dir("docs")
            .output_dir("docs")
            .build()
            .unwrap_err();
        assert!(matches!(err, Pdf2DocxError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_blank_model() {
        assert!(RunConfig::builder().model("  ").build().is_err());
    }

    #[test]
    fn builder_caps_retries() {
        let c = RunConfig::builder().max_retries(500).build().unwrap();
        assert_eq!(c.max_retries, MAX_RETRIES_LIMIT);
        let c = RunConfig::builder().max_retries(3).build().unwrap();
        assert_eq!(c.max_retries, 3);
    }

    #[test]
    fn job_spec_validation() {
        assert!(JobSpec::new("a.pdf", 1, 3).validate(Some(3)).is_ok());
        assert!(JobSpec::new("a.pdf", 0, 3).validate(None).is_err());
        assert!(JobSpec::new("a.pdf", 4, 3).validate(None).is_err());
        assert!(matches!(
            JobSpec::new("a.pdf", 1, 5).validate(Some(3)),
            Err(Pdf2DocxError::PageOutOfRange { page: 5, total: 3 })
        ));
        assert_eq!(JobSpec::new("a.pdf", 2, 4).page_count(), 3);
    }

    #[test]
    fn job_spec_parse() {
        let s: JobSpec = "scan 01.pdf:2-7".parse().unwrap();
        assert_eq!(s, JobSpec::new("scan 01.pdf", 2, 7));

        let s: JobSpec = "one.pdf:4".parse().unwrap();
        assert_eq!(s, JobSpec::new("one.pdf", 4, 4));

        assert!("nopages.pdf".parse::<JobSpec>().is_err());
        assert!("bad.pdf:5-2".parse::<JobSpec>().is_err());
        assert!(":1-2".parse::<JobSpec>().is_err());
    }

    #[test]
    fn find_returns_first_match() {
        let specs = vec![
            JobSpec::new("a.pdf", 1, 2),
            JobSpec::new("b.pdf", 3, 4),
            JobSpec::new("a.pdf", 5, 6),
        ];
        assert_eq!(JobSpec::find(&specs, "a.pdf"), Some(&specs[0]));
        assert_eq!(JobSpec::find(&specs, "c.pdf"), None);
    }
}

//! Document assembly: transcript lines → Word document.
//!
//! Every transcript line becomes one paragraph; blank lines become empty
//! paragraphs so the page spacing of the transcript survives. Within a line
//! each character is styled by script:
//!
//! | Character                         | Font        | Italic |
//! |-----------------------------------|-------------|--------|
//! | CJK Unified Ideograph U+4E00–9FFF | CJK font    | no     |
//! | alphabetic, anything else         | Latin font  | yes    |
//! | non-alphabetic, anything else     | Latin font  | no     |
//!
//! Adjacent characters with the same style share one run. Everything is
//! 12 pt.

use crate::config::{DEFAULT_CJK_FONT, DEFAULT_LATIN_FONT};
use crate::error::Pdf2DocxError;
use docx_rs::{Docx, Paragraph, Run, RunFonts};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

/// 12 pt, in the half-point unit Word uses.
pub const FONT_SIZE_HALF_POINTS: usize = 24;

/// Prefix marking a document that still needs human review.
pub const UNPROOFED_PREFIX: &str = "(unproofed)";

/// Where the document for `label` is written.
pub fn document_path(output_dir: &Path, label: &str) -> PathBuf {
    output_dir.join(format!("{UNPROOFED_PREFIX}{label}.docx"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    Cjk,
    Latin,
}

pub fn classify(c: char) -> Script {
    if ('\u{4e00}'..='\u{9fff}').contains(&c) {
        Script::Cjk
    } else {
        Script::Latin
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontConfig {
    pub cjk: String,
    pub latin: String,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            cjk: DEFAULT_CJK_FONT.to_string(),
            latin: DEFAULT_LATIN_FONT.to_string(),
        }
    }
}

/// A span of text sharing one font and style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledRun {
    pub text: String,
    pub script: Script,
    pub font: String,
    pub italic: bool,
    pub size_half_points: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocParagraph {
    pub runs: Vec<StyledRun>,
}

impl DocParagraph {
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

/// In-memory document, ready to be written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledDocument {
    pub paragraphs: Vec<DocParagraph>,
}

fn style_line(line: &str, fonts: &FontConfig) -> DocParagraph {
    let mut runs: Vec<StyledRun> = Vec::new();
    for c in line.chars() {
        let script = classify(c);
        let italic = script == Script::Latin && c.is_alphabetic();
        match runs.last_mut() {
            Some(run) if run.script == script && run.italic == italic => run.text.push(c),
            _ => runs.push(StyledRun {
                text: c.to_string(),
                script,
                font: match script {
                    Script::Cjk => fonts.cjk.clone(),
                    Script::Latin => fonts.latin.clone(),
                },
                italic,
                size_half_points: FONT_SIZE_HALF_POINTS,
            }),
        }
    }
    DocParagraph { runs }
}

impl AssembledDocument {
    /// Build the document from transcript lines.
    pub fn assemble<S: AsRef<str>>(lines: &[S], fonts: &FontConfig) -> Self {
        let paragraphs = lines
            .iter()
            .map(|line| style_line(line.as_ref(), fonts))
            .collect();
        Self { paragraphs }
    }

    pub fn non_empty_paragraphs(&self) -> usize {
        self.paragraphs.iter().filter(|p| !p.is_empty()).count()
    }

    pub fn to_docx(&self) -> Docx {
        self.paragraphs
            .iter()
            .fold(Docx::new(), |docx, para| {
                let p = para.runs.iter().fold(Paragraph::new(), |p, run| {
                    // Word picks the east-Asian slot for CJK code points, so
                    // every slot carries the run's font.
                    let fonts = RunFonts::new()
                        .ascii(&run.font)
                        .hi_ansi(&run.font)
                        .east_asia(&run.font);
                    let mut r = Run::new()
                        .add_text(&run.text)
                        .fonts(fonts)
                        .size(run.size_half_points);
                    if run.italic {
                        r = r.italic();
                    }
                    p.add_run(r)
                });
                docx.add_paragraph(p)
            })
    }

    /// Write the document to `path`, replacing any existing file.
    ///
    /// The bytes go to a temporary file in the same directory first and are
    /// renamed into place, so a crash never leaves a truncated `.docx`.
    pub fn save(&self, path: &Path) -> Result<(), Pdf2DocxError> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Pdf2DocxError::OutputWriteFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;

        self.to_docx()
            .build()
            .pack(tmp.as_file_mut())
            .map_err(|e| Pdf2DocxError::DocumentWriteFailed {
                path: path.to_path_buf(),
                detail: format!("{e}"),
            })?;

        tmp.persist(path)
            .map_err(|e| Pdf2DocxError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e.error,
            })?;
        info!(
            "Document saved: {} ({} paragraphs)",
            path.display(),
            self.paragraphs.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fonts() -> FontConfig {
        FontConfig::default()
    }

    #[test]
    fn latin_line_is_italic_latin() {
        let doc = AssembledDocument::assemble(&["Hello"], &fonts());
        let runs = &doc.paragraphs[0].runs;
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "Hello");
        assert_eq!(runs[0].font, DEFAULT_LATIN_FONT);
        assert!(runs[0].italic);
        assert_eq!(runs[0].size_half_points, 24);
    }

    #[test]
    fn cjk_line_is_never_italic() {
        let doc = AssembledDocument::assemble(&["中文測試"], &fonts());
        for run in &doc.paragraphs[0].runs {
            assert_eq!(run.script, Script::Cjk);
            assert_eq!(run.font, DEFAULT_CJK_FONT);
            assert!(!run.italic);
        }
        assert_eq!(doc.paragraphs[0].text(), "中文測試");
    }

    #[test]
    fn mixed_line_follows_each_character() {
        let doc = AssembledDocument::assemble(&["AB中文cd"], &fonts());
        let runs = &doc.paragraphs[0].runs;
        let summary: Vec<(&str, Script, bool)> = runs
            .iter()
            .map(|r| (r.text.as_str(), r.script, r.italic))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("AB", Script::Latin, true),
                ("中文", Script::Cjk, false),
                ("cd", Script::Latin, true),
            ]
        );
    }

    #[test]
    fn digits_spaces_and_punctuation_are_upright_latin() {
        let doc = AssembledDocument::assemble(&["a 1。"], &fonts());
        let runs = &doc.paragraphs[0].runs;
        assert_eq!(runs[0].text, "a");
        assert!(runs[0].italic);
        assert_eq!(runs[1].text, " 1。");
        assert_eq!(runs[1].script, Script::Latin);
        assert!(!runs[1].italic);
    }

    #[test]
    fn blank_lines_become_empty_paragraphs() {
        let doc = AssembledDocument::assemble(&["one", "", "two", ""], &fonts());
        assert_eq!(doc.paragraphs.len(), 4);
        assert_eq!(doc.non_empty_paragraphs(), 2);
        assert!(doc.paragraphs[1].is_empty());
    }

    #[test]
    fn classify_boundaries() {
        assert_eq!(classify('\u{4e00}'), Script::Cjk);
        assert_eq!(classify('\u{9fff}'), Script::Cjk);
        assert_eq!(classify('\u{3400}'), Script::Latin);
        assert_eq!(classify('あ'), Script::Latin);
    }

    #[test]
    fn custom_fonts_are_used() {
        let fonts = FontConfig {
            cjk: "Noto Serif CJK TC".into(),
            latin: "Garamond".into(),
        };
        let doc = AssembledDocument::assemble(&["x字"], &fonts);
        assert_eq!(doc.paragraphs[0].runs[0].font, "Garamond");
        assert_eq!(doc.paragraphs[0].runs[1].font, "Noto Serif CJK TC");
    }

    #[test]
    fn save_writes_zip_package() {
        let dir = TempDir::new().unwrap();
        let path = document_path(dir.path(), "sample");
        assert!(path.ends_with("(unproofed)sample.docx"));

        let doc = AssembledDocument::assemble(&["hello", "", "世界"], &fonts());
        doc.save(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], b"PK");
        // Only the document remains; the temp file was renamed.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}

//! Append-only per-job transcript.
//!
//! Each page's text is written as soon as it arrives, followed by one blank
//! line, and flushed. A run that dies mid-job leaves every finished page on
//! disk.

use crate::error::Pdf2DocxError;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Transcript file for `label` inside `output_dir`.
pub fn transcript_path(output_dir: &Path, label: &str) -> PathBuf {
    output_dir.join(format!("{label}_transcript.txt"))
}

pub struct TranscriptWriter {
    path: PathBuf,
    out: BufWriter<File>,
    entries: usize,
}

impl TranscriptWriter {
    /// Create (or truncate) the transcript at `path`.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, Pdf2DocxError> {
        let path = path.into();
        let file = File::create(&path).map_err(|e| Pdf2DocxError::TranscriptWriteFailed {
            path: path.clone(),
            source: e,
        })?;
        Ok(Self {
            path,
            out: BufWriter::new(file),
            entries: 0,
        })
    }

    /// Append one page's text and a blank separator line, then flush.
    pub fn append(&mut self, text: &str) -> Result<(), Pdf2DocxError> {
        write!(self.out, "{text}\n\n")
            .and_then(|_| self.out.flush())
            .map_err(|e| Pdf2DocxError::TranscriptWriteFailed {
                path: self.path.clone(),
                source: e,
            })?;
        self.entries += 1;
        debug!("Transcript {}: entry {}", self.path.display(), self.entries);
        Ok(())
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Read a finished transcript as lines, without line terminators.
pub fn read_lines(path: &Path) -> Result<Vec<String>, Pdf2DocxError> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Pdf2DocxError::TranscriptMissing {
                path: path.to_path_buf(),
            }
        } else {
            Pdf2DocxError::TranscriptWriteFailed {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    Ok(content.lines().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn entries_are_separated_by_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = transcript_path(dir.path(), "doc");
        let mut w = TranscriptWriter::create(&path).unwrap();
        w.append("first page").unwrap();
        w.append("second\npage").unwrap();
        assert_eq!(w.entries(), 2);

        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(raw, "first page\n\nsecond\npage\n\n");
        assert_eq!(
            read_lines(&path).unwrap(),
            vec!["first page", "", "second", "page", ""]
        );
    }

    #[test]
    fn create_truncates_previous_content() {
        let dir = TempDir::new().unwrap();
        let path = transcript_path(dir.path(), "doc");
        fs::write(&path, "stale").unwrap();
        let mut w = TranscriptWriter::create(&path).unwrap();
        w.append("fresh").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "fresh\n\n");
    }

    #[test]
    fn missing_transcript_is_reported() {
        let dir = TempDir::new().unwrap();
        let err = read_lines(&dir.path().join("nope.txt")).unwrap_err();
        assert!(matches!(err, Pdf2DocxError::TranscriptMissing { .. }));
    }
}

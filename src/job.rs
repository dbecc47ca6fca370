//! Jobs: the unit of work the orchestrator hands to the transcription engine.
//!
//! A job is either one PDF's selected page range or every standalone image in
//! the input directory. Its label names the output files, so labels are made
//! unique per run.

use image::RgbImage;
use std::collections::HashSet;
use std::path::Path;

/// Label of the synthetic job covering all standalone images.
pub const IMAGES_LABEL: &str = "picture";

/// One raster page and the page number it came from.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Source page number (1-indexed).
    pub page_num: usize,
    pub image: RgbImage,
}

impl RenderedPage {
    pub fn new(page_num: usize, image: RgbImage) -> Self {
        Self { page_num, image }
    }
}

/// Ordered pages plus the label used for output file names.
///
/// Page numbers travel with their images, so the two can never drift apart.
#[derive(Debug, Clone)]
pub struct Job {
    pub label: String,
    pub pages: Vec<RenderedPage>,
}

impl Job {
    pub fn new(label: impl Into<String>, pages: Vec<RenderedPage>) -> Self {
        Self {
            label: label.into(),
            pages,
        }
    }

    /// Build the standalone-image job; images are numbered 1..=n in the order
    /// given.
    pub fn from_images(label: impl Into<String>, images: Vec<RgbImage>) -> Self {
        let pages = images
            .into_iter()
            .enumerate()
            .map(|(i, image)| RenderedPage::new(i + 1, image))
            .collect();
        Self::new(label, pages)
    }

    pub fn page_numbers(&self) -> Vec<usize> {
        self.pages.iter().map(|p| p.page_num).collect()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Derive a job label from a PDF file name: the file stem.
pub fn label_for(filename: &str) -> String {
    Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| filename.to_string())
}

/// Hands out labels that have not been used yet in this run.
///
/// A repeated label gets `_2`, `_3`, … appended.
#[derive(Debug, Default)]
pub struct LabelRegistry {
    used: HashSet<String>,
}

impl LabelRegistry {
    pub fn claim(&mut self, base: &str) -> String {
        if self.used.insert(base.to_string()) {
            return base.to_string();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{base}_{n}");
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

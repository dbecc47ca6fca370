//! Input directory inventory: which PDFs and images are available.
//!
//! The input directory is flat; sub-directories are ignored. Extension
//! matching is case-insensitive. File names are reported sorted so runs are
//! reproducible regardless of directory iteration order.

use crate::error::Pdf2DocxError;
use crate::pipeline::render::PageRasterizer;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Extensions transcribed as standalone images.
pub const TRANSCRIBED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];
/// Extensions counted as images for display purposes.
pub const DISPLAY_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif"];

/// Files found in the input directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputInventory {
    /// Every regular file, sorted.
    pub files: Vec<String>,
    /// `.pdf` files, sorted.
    pub pdfs: Vec<String>,
    /// Images that are transcribed, sorted.
    pub images: Vec<String>,
    /// Count of all image files, including formats that are not transcribed.
    pub display_image_count: usize,
}

/// A PDF in the input directory and its page count (0 when unreadable).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfInfo {
    pub name: String,
    pub pages: usize,
}

fn has_extension(name: &str, extensions: &[&str]) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

fn list_files(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            files.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    files.sort();
    Ok(files)
}

impl InputInventory {
    /// Scan `input_dir`. A missing directory or one without files is an error.
    pub fn scan(input_dir: &Path) -> Result<Self, Pdf2DocxError> {
        if !input_dir.is_dir() {
            return Err(Pdf2DocxError::InputDirNotFound {
                path: input_dir.to_path_buf(),
            });
        }
        let files = list_files(input_dir).map_err(|e| {
            warn!("Cannot list {}: {}", input_dir.display(), e);
            Pdf2DocxError::InputDirNotFound {
                path: input_dir.to_path_buf(),
            }
        })?;
        if files.is_empty() {
            return Err(Pdf2DocxError::InputDirEmpty {
                path: input_dir.to_path_buf(),
            });
        }

        let pdfs: Vec<String> = files
            .iter()
            .filter(|f| has_extension(f, &["pdf"]))
            .cloned()
            .collect();
        let images: Vec<String> = files
            .iter()
            .filter(|f| has_extension(f, TRANSCRIBED_IMAGE_EXTENSIONS))
            .cloned()
            .collect();
        let display_image_count = files
            .iter()
            .filter(|f| has_extension(f, DISPLAY_IMAGE_EXTENSIONS))
            .count();

        debug!(
            "Input {}: {} file(s), {} PDF(s), {} image(s)",
            input_dir.display(),
            files.len(),
            pdfs.len(),
            images.len()
        );
        Ok(Self {
            files,
            pdfs,
            images,
            display_image_count,
        })
    }
}

/// Count image files in `input_dir` for display; 0 when it cannot be read.
pub fn count_display_images(input_dir: &Path) -> usize {
    list_files(input_dir)
        .map(|files| {
            files
                .iter()
                .filter(|f| has_extension(f, DISPLAY_IMAGE_EXTENSIONS))
                .count()
        })
        .unwrap_or(0)
}

/// Open `names` from `input_dir` as RGB images, in the given order.
pub fn load_images(input_dir: &Path, names: &[String]) -> Result<Vec<RgbImage>, Pdf2DocxError> {
    names
        .iter()
        .map(|name| {
            let path = input_dir.join(name);
            let img = image::open(&path).map_err(|e| Pdf2DocxError::ImageLoadFailed {
                path: path.clone(),
                detail: e.to_string(),
            })?;
            debug!("Loaded image {} ({}x{})", name, img.width(), img.height());
            Ok(img.to_rgb8())
        })
        .collect()
}

/// List the PDFs in `input_dir` with their page counts.
///
/// A missing directory yields an empty list; a PDF the backend cannot open
/// reports 0 pages.
pub fn pdf_inventory(input_dir: &Path, rasterizer: &dyn PageRasterizer) -> Vec<PdfInfo> {
    let files = match list_files(input_dir) {
        Ok(files) => files,
        Err(_) => return Vec::new(),
    };
    let pdfs: Vec<PdfInfo> = files
        .into_iter()
        .filter(|f| has_extension(f, &["pdf"]))
        .map(|name| {
            let pages = rasterizer
                .page_count(&input_dir.join(&name))
                .unwrap_or_else(|e| {
                    warn!("{}: {}", name, e);
                    0
                });
            PdfInfo { name, pages }
        })
        .collect();
    info!("{} PDF(s) in {}", pdfs.len(), input_dir.display());
    pdfs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::RenderedPage;
    use image::Rgb;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn missing_dir_is_reported() {
        let dir = TempDir::new().unwrap();
        let err = InputInventory::scan(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, Pdf2DocxError::InputDirNotFound { .. }));
    }

    #[test]
    fn empty_dir_is_reported() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        let err = InputInventory::scan(dir.path()).unwrap_err();
        assert!(matches!(err, Pdf2DocxError::InputDirEmpty { .. }));
    }

    #[test]
    fn files_are_classified_and_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["b.PDF", "a.pdf", "z.jpg", "m.PNG", "x.bmp", "y.gif", "notes.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        let inv = InputInventory::scan(dir.path()).unwrap();
        assert_eq!(inv.pdfs, vec!["a.pdf", "b.PDF"]);
        assert_eq!(inv.images, vec!["m.PNG", "z.jpg"]);
        assert_eq!(inv.display_image_count, 4);
        assert_eq!(inv.files.len(), 7);
        assert_eq!(count_display_images(dir.path()), 4);
    }

    #[test]
    fn images_load_in_given_order() {
        let dir = TempDir::new().unwrap();
        RgbImage::from_pixel(3, 2, Rgb([1, 1, 1]))
            .save(dir.path().join("a.png"))
            .unwrap();
        RgbImage::from_pixel(5, 4, Rgb([2, 2, 2]))
            .save(dir.path().join("b.png"))
            .unwrap();
        let imgs = load_images(dir.path(), &["b.png".into(), "a.png".into()]).unwrap();
        assert_eq!(imgs[0].dimensions(), (5, 4));
        assert_eq!(imgs[1].dimensions(), (3, 2));
    }

    #[test]
    fn undecodable_image_is_fatal() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bad.png"), b"not a png").unwrap();
        let err = load_images(dir.path(), &["bad.png".into()]).unwrap_err();
        assert!(matches!(err, Pdf2DocxError::ImageLoadFailed { .. }));
    }

    struct ByName;

    impl PageRasterizer for ByName {
        fn page_count(&self, pdf_path: &Path) -> Result<usize, Pdf2DocxError> {
            if pdf_path.ends_with("broken.pdf") {
                Err(Pdf2DocxError::CorruptPdf {
                    path: pdf_path.to_path_buf(),
                    detail: "bad xref".into(),
                })
            } else {
                Ok(12)
            }
        }

        fn render_range(
            &self,
            _pdf_path: &Path,
            _first_page: usize,
            _last_page: usize,
            _dpi: u32,
        ) -> Result<Vec<RenderedPage>, Pdf2DocxError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn inventory_reports_zero_pages_for_unreadable_pdf() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.pdf"), b"x").unwrap();
        fs::write(dir.path().join("good.pdf"), b"x").unwrap();
        fs::write(dir.path().join("pic.png"), b"x").unwrap();
        let inv = pdf_inventory(dir.path(), &ByName);
        assert_eq!(
            inv,
            vec![
                PdfInfo { name: "broken.pdf".into(), pages: 0 },
                PdfInfo { name: "good.pdf".into(), pages: 12 },
            ]
        );
        assert!(pdf_inventory(&dir.path().join("missing"), &ByName).is_empty());
    }
}

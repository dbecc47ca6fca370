//! PDF rasterisation: render a page range to `RgbImage`s via pdfium.
//!
//! ## Why a trait?
//!
//! [`PageRasterizer`] is the seam between the orchestrator and the rendering
//! backend. [`PdfiumRasterizer`] is the production implementation; tests and
//! embedders can plug in their own without a pdfium library on the machine.
//!
//! ## Why spawn_blocking?
//!
//! pdfium is a C++ library with thread-local state and CPU-heavy rendering.
//! [`rasterize`] moves the call onto Tokio's blocking pool so the runtime's
//! worker threads keep serving the provider calls and progress events.

use crate::error::Pdf2DocxError;
use crate::job::RenderedPage;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Renders PDF pages to images.
///
/// Implementations are blocking; call them through [`rasterize`] from async
/// code.
pub trait PageRasterizer: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self, pdf_path: &Path) -> Result<usize, Pdf2DocxError>;

    /// Render pages `first_page..=last_page` (1-indexed) at `dpi`, in
    /// ascending page order. `first_page ≤ last_page` is the caller's
    /// responsibility. Any failure aborts the whole range.
    fn render_range(
        &self,
        pdf_path: &Path,
        first_page: usize,
        last_page: usize,
        dpi: u32,
    ) -> Result<Vec<RenderedPage>, Pdf2DocxError>;
}

/// pdfium-backed rasteriser.
///
/// Binds the library from `library_dir` when given, otherwise from the
/// current directory and then the system library path.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    library_dir: Option<PathBuf>,
}

impl PdfiumRasterizer {
    pub fn new(library_dir: Option<PathBuf>) -> Self {
        Self { library_dir }
    }

    fn bind(&self) -> Result<Pdfium, Pdf2DocxError> {
        let bindings = match self.library_dir {
            Some(ref dir) => {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
            }
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| Pdf2DocxError::PdfiumBindingFailed(format!("{e:?}")))?;

        Ok(Pdfium::new(bindings))
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn page_count(&self, pdf_path: &Path) -> Result<usize, Pdf2DocxError> {
        let pdfium = self.bind()?;
        let document = open_document(&pdfium, pdf_path)?;
        Ok(document.pages().len() as usize)
    }

    fn render_range(
        &self,
        pdf_path: &Path,
        first_page: usize,
        last_page: usize,
        dpi: u32,
    ) -> Result<Vec<RenderedPage>, Pdf2DocxError> {
        let pdfium = self.bind()?;
        let document = open_document(&pdfium, pdf_path)?;
        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("PDF loaded: {} ({} pages)", pdf_path.display(), total_pages);

        if first_page < 1 || first_page > total_pages {
            return Err(Pdf2DocxError::PageOutOfRange {
                page: first_page,
                total: total_pages,
            });
        }
        let last_page = if last_page > total_pages {
            warn!(
                "Page range ends at {} but document has {} pages; stopping at {}",
                last_page, total_pages, total_pages
            );
            total_pages
        } else {
            last_page
        };

        // pdfium lays pages out at 72 points per inch.
        let render_config = PdfRenderConfig::new().scale_page_by_factor(dpi as f32 / 72.0);

        let mut results = Vec::with_capacity(last_page + 1 - first_page);
        for page_num in first_page..=last_page {
            let page = pages.get((page_num - 1) as u16).map_err(|e| {
                Pdf2DocxError::RasterisationFailed {
                    page: page_num,
                    detail: format!("{e:?}"),
                }
            })?;

            let bitmap = page.render_with_config(&render_config).map_err(|e| {
                Pdf2DocxError::RasterisationFailed {
                    page: page_num,
                    detail: format!("{e:?}"),
                }
            })?;

            let image = bitmap.as_image().to_rgb8();
            debug!(
                "Rendered page {} → {}x{} px",
                page_num,
                image.width(),
                image.height()
            );
            results.push(RenderedPage::new(page_num, image));
        }

        Ok(results)
    }
}

fn open_document<'a>(pdfium: &'a Pdfium, pdf_path: &Path) -> Result<PdfDocument<'a>, Pdf2DocxError> {
    pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| Pdf2DocxError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: format!("{e:?}"),
        })
}

/// Render a page range on the blocking pool.
pub async fn rasterize(
    rasterizer: Arc<dyn PageRasterizer>,
    pdf_path: &Path,
    first_page: usize,
    last_page: usize,
    dpi: u32,
) -> Result<Vec<RenderedPage>, Pdf2DocxError> {
    let path = pdf_path.to_path_buf();
    tokio::task::spawn_blocking(move || rasterizer.render_range(&path, first_page, last_page, dpi))
        .await
        .map_err(|e| Pdf2DocxError::Internal(format!("Render task panicked: {e}")))?
}

/// Count pages on the blocking pool.
pub async fn page_count(
    rasterizer: Arc<dyn PageRasterizer>,
    pdf_path: &Path,
) -> Result<usize, Pdf2DocxError> {
    let path = pdf_path.to_path_buf();
    tokio::task::spawn_blocking(move || rasterizer.page_count(&path))
        .await
        .map_err(|e| Pdf2DocxError::Internal(format!("Page-count task panicked: {e}")))?
}

/// Paint a solid black border of `thickness` pixels flush to the image edges.
///
/// Pages narrower than twice the thickness end up fully black.
pub fn apply_frame(img: &mut RgbImage, thickness: u32) {
    let (w, h) = img.dimensions();
    if thickness == 0 || w == 0 || h == 0 {
        return;
    }
    let t_w = thickness.min(w);
    let t_h = thickness.min(h);
    let black = Rgb([0, 0, 0]);

    // top, bottom, left, right
    draw_filled_rect_mut(img, Rect::at(0, 0).of_size(w, t_h), black);
    draw_filled_rect_mut(img, Rect::at(0, (h - t_h) as i32).of_size(w, t_h), black);
    draw_filled_rect_mut(img, Rect::at(0, 0).of_size(t_w, h), black);
    draw_filled_rect_mut(img, Rect::at((w - t_w) as i32, 0).of_size(t_w, h), black);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_covers_edges_only() {
        let mut img = RgbImage::from_pixel(50, 40, Rgb([255, 255, 255]));
        apply_frame(&mut img, 10);

        for (x, y, px) in img.enumerate_pixels() {
            let on_border = x < 10 || y < 10 || x >= 40 || y >= 30;
            let expected = if on_border { [0, 0, 0] } else { [255, 255, 255] };
            assert_eq!(px.0, expected, "pixel ({x}, {y})");
        }
    }

    #[test]
    fn frame_on_tiny_image_blackens_everything() {
        let mut img = RgbImage::from_pixel(6, 5, Rgb([255, 255, 255]));
        apply_frame(&mut img, 10);
        assert!(img.pixels().all(|p| p.0 == [0, 0, 0]));
    }

    #[test]
    fn zero_thickness_is_noop() {
        let mut img = RgbImage::from_pixel(8, 8, Rgb([200, 200, 200]));
        apply_frame(&mut img, 0);
        assert!(img.pixels().all(|p| p.0 == [200, 200, 200]));
    }

    struct CountingRasterizer;

    impl PageRasterizer for CountingRasterizer {
        fn page_count(&self, _pdf_path: &Path) -> Result<usize, Pdf2DocxError> {
            Ok(9)
        }

        fn render_range(
            &self,
            _pdf_path: &Path,
            first_page: usize,
            last_page: usize,
            _dpi: u32,
        ) -> Result<Vec<RenderedPage>, Pdf2DocxError> {
            Ok((first_page..=last_page)
                .map(|n| RenderedPage::new(n, RgbImage::new(1, 1)))
                .collect())
        }
    }

    #[tokio::test]
    async fn rasterize_runs_on_blocking_pool() {
        let r: Arc<dyn PageRasterizer> = Arc::new(CountingRasterizer);
        let pages = rasterize(Arc::clone(&r), Path::new("x.pdf"), 2, 4, 200)
            .await
            .unwrap();
        assert_eq!(pages.iter().map(|p| p.page_num).collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(page_count(r, Path::new("x.pdf")).await.unwrap(), 9);
    }
}

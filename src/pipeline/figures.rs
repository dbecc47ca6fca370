//! Figure extraction: export large non-white regions of a page as PNG crops.
//!
//! The page is thresholded (anything darker than near-white is foreground),
//! outermost contours are traced, and each contour's bounding box that is big
//! enough becomes one padded crop on disk.

use crate::error::Pdf2DocxError;
use image::{imageops, GrayImage, Luma, RgbImage};
use imageproc::contours::{find_contours, Contour};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Gray level at or above which a pixel counts as background.
const BACKGROUND_LEVEL: u8 = 240;

/// Bounding box of one exported figure, before padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FigureRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FigureRegion {
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Grow by `padding` on every side, clipped to a `w`×`h` image.
    fn padded(&self, padding: u32, w: u32, h: u32) -> FigureRegion {
        let x0 = self.x.saturating_sub(padding);
        let y0 = self.y.saturating_sub(padding);
        let x1 = (self.x + self.width).saturating_add(padding).min(w);
        let y1 = (self.y + self.height).saturating_add(padding).min(h);
        FigureRegion {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        }
    }
}

/// File name of the `index`-th figure of `base_name`.
pub fn figure_path(out_dir: &Path, base_name: &str, index: usize) -> PathBuf {
    out_dir.join(format!("{base_name}_figure_{index}.png"))
}

/// Locate candidate figures without writing anything.
///
/// Returns `(contour_index, region)` pairs; the index is the 1-based position
/// of the contour among all outermost contours, so discarded small regions
/// leave gaps in the numbering.
///
/// Contours are numbered in raster-scan order of their first border pixel
/// (top to bottom, then left to right), the order Suzuki-Abe tracing in
/// `imageproc` finds them. OpenCV returns external contours roughly in
/// reverse, so figure numbers differ from an OpenCV-based tool on pages with
/// several figures.
pub fn find_regions(img: &RgbImage, min_area: u32) -> Vec<(usize, FigureRegion)> {
    let mask = foreground_mask(img);
    let contours = find_contours::<u32>(&mask);

    contours
        .iter()
        .filter(|c| c.parent.is_none())
        .enumerate()
        .filter_map(|(i, c)| {
            let region = bounding_box(c)?;
            if region.area() < min_area as u64 {
                return None;
            }
            Some((i + 1, region))
        })
        .collect()
}

/// Export every sufficiently large figure on `img` to
/// `{out_dir}/{base_name}_figure_{n}.png`.
///
/// Existing files with the same names are overwritten, so running twice on
/// the same page yields the same files.
pub fn extract_figures(
    img: &RgbImage,
    out_dir: &Path,
    base_name: &str,
    min_area: u32,
    padding: u32,
) -> Result<Vec<FigureRegion>, Pdf2DocxError> {
    std::fs::create_dir_all(out_dir).map_err(|e| Pdf2DocxError::OutputWriteFailed {
        path: out_dir.to_path_buf(),
        source: e,
    })?;

    let regions = find_regions(img, min_area);
    let (w, h) = img.dimensions();

    for (index, region) in &regions {
        let crop = region.padded(padding, w, h);
        let view = imageops::crop_imm(img, crop.x, crop.y, crop.width, crop.height).to_image();
        let path = figure_path(out_dir, base_name, *index);
        view.save(&path).map_err(|e| Pdf2DocxError::OutputWriteFailed {
            path: path.clone(),
            source: std::io::Error::other(e.to_string()),
        })?;
        info!("Figure written: {}", path.display());
    }
    debug!("{}: {} figure(s) exported", base_name, regions.len());

    Ok(regions.into_iter().map(|(_, r)| r).collect())
}

fn foreground_mask(img: &RgbImage) -> GrayImage {
    let gray = imageops::grayscale(img);
    let (w, h) = gray.dimensions();
    GrayImage::from_fn(w, h, |x, y| {
        if gray.get_pixel(x, y).0[0] < BACKGROUND_LEVEL {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Inclusive pixel extent of a contour, as an `x, y, width, height` box.
fn bounding_box(contour: &Contour<u32>) -> Option<FigureRegion> {
    let first = contour.points.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &contour.points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(FigureRegion {
        x: min_x,
        y: min_y,
        width: max_x - min_x + 1,
        height: max_y - min_y + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use tempfile::TempDir;

    fn page_with_blocks(blocks: &[(u32, u32, u32, u32)]) -> RgbImage {
        let mut img = RgbImage::from_pixel(400, 300, Rgb([255, 255, 255]));
        for &(x, y, w, h) in blocks {
            for yy in y..y + h {
                for xx in x..x + w {
                    img.put_pixel(xx, yy, Rgb([30, 30, 30]));
                }
            }
        }
        img
    }

    #[test]
    fn blank_page_has_no_figures() {
        let img = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        assert!(find_regions(&img, 1).is_empty());
    }

    #[test]
    fn small_regions_are_dropped_and_numbering_keeps_gaps() {
        // A 5x5 speck first in scan order, then a 120x100 block.
        let img = page_with_blocks(&[(10, 10, 5, 5), (100, 50, 120, 100)]);
        let regions = find_regions(&img, 10_000);
        assert_eq!(regions.len(), 1);
        let (index, region) = regions[0];
        assert_eq!(index, 2);
        assert_eq!(
            region,
            FigureRegion {
                x: 100,
                y: 50,
                width: 120,
                height: 100
            }
        );
    }

    #[test]
    fn figures_are_numbered_top_to_bottom() {
        let img = page_with_blocks(&[(20, 200, 110, 100), (150, 20, 110, 100)]);
        let regions = find_regions(&img, 10_000);
        assert_eq!(regions.len(), 2);
        assert_eq!((regions[0].0, regions[0].1.y), (1, 20));
        assert_eq!((regions[1].0, regions[1].1.y), (2, 200));
    }

    #[test]
    fn crops_are_padded_and_clipped() {
        let dir = TempDir::new().unwrap();
        // Block touches the left edge; padding must clip at x = 0.
        let img = page_with_blocks(&[(0, 100, 110, 100)]);
        let regions = extract_figures(&img, dir.path(), "doc_3", 10_000, 60).unwrap();
        assert_eq!(regions.len(), 1);

        let saved = image::open(figure_path(dir.path(), "doc_3", 1)).unwrap();
        assert_eq!(saved.width(), 110 + 60);
        assert_eq!(saved.height(), 100 + 120);
    }

    #[test]
    fn extraction_is_repeatable() {
        let dir = TempDir::new().unwrap();
        let img = page_with_blocks(&[(50, 50, 150, 120)]);
        extract_figures(&img, dir.path(), "p_1", 10_000, 10).unwrap();
        let path = figure_path(dir.path(), "p_1", 1);
        let first = std::fs::read(&path).unwrap();
        extract_figures(&img, dir.path(), "p_1", 10_000, 10).unwrap();
        assert_eq!(first, std::fs::read(&path).unwrap());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn no_files_when_nothing_qualifies() {
        let dir = TempDir::new().unwrap();
        let img = page_with_blocks(&[(10, 10, 20, 20)]);
        let regions = extract_figures(&img, dir.path(), "x_1", 10_000, 60).unwrap();
        assert!(regions.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}

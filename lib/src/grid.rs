use crate::geometry::{bounding_box, outer_contours, polygon_area, to_f32};
use crate::preprocess::{binarize, inverted};
use image::GrayImage;
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::morphology::erode;
use log::{debug, info};

/// The supported boards: 4 x 4, 5 x 5 and 6 x 6.
pub const GRID_SIZES: [usize; 3] = [4, 5, 6];

/// Infer the number of rows and columns of a normalized board.
///
/// The board is binarized with Otsu's threshold and the cell-sized, roughly square regions are counted, once with
/// dark cells as foreground and once with light cells. The larger count is mapped to the nearest of 16, 25 or 36.
/// # Example
/// ```
/// # use boggle_ocr::estimate_grid_size;
/// let blank = image::GrayImage::new(400, 400);
/// assert_eq!(estimate_grid_size(&blank), 4);
/// ```
pub fn estimate_grid_size(board: &GrayImage) -> usize {
    let binary = binarize(board, otsu_level(board));
    let dark = count_cells(&inverted(&binary));
    let light = count_cells(&binary);
    debug!("Cell regions: {} dark, {} light", dark, light);
    let count = dark.max(light);
    let n = nearest_grid_size(count);
    info!("Grid inference: {} cell contours -> {}x{}", count, n, n);
    n
}

/// The grid size whose cell count is closest to `count`; ties go to the smaller grid.
pub fn nearest_grid_size(count: usize) -> usize {
    GRID_SIZES
        .iter()
        .copied()
        .min_by_key(|n| (n * n).abs_diff(count))
        .unwrap_or(GRID_SIZES[0])
}

/// Count foreground regions between 1/8 and 1/3 of the board side in size, with an aspect ratio between 0.5 and 2.
fn count_cells(mask: &GrayImage) -> usize {
    let (w, h) = (mask.width() as f32, mask.height() as f32);
    let (min_area, max_area) = ((w / 8.0) * (h / 8.0), (w / 3.0) * (h / 3.0));
    // two 3 x 3 erosions separate cells that touch at the corners
    let eroded = erode(mask, Norm::LInf, 2);
    outer_contours(&eroded)
        .iter()
        .filter(|points| {
            let area = polygon_area(&to_f32(points));
            if area < min_area || area > max_area {
                return false;
            }
            match bounding_box(points) {
                Some((x0, y0, x1, y1)) => {
                    let aspect = (x1 - x0 + 1) as f32 / (y1 - y0 + 1) as f32;
                    (0.5..=2.0).contains(&aspect)
                }
                None => false,
            }
        })
        .count()
}

use crate::board::{Grid, Token};
use crate::config::RecognitionParams;
use crate::preprocess::preprocess_cell;
use crate::Error;
use image::imageops::{replace, resize, FilterType};
use image::{GrayImage, Luma};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// Arrange the cell images of a `size` x `size` board in a grid, each scaled to `cell_size` with a 1 pixel gray frame.
pub fn montage(cells: &[GrayImage], size: usize, cell_size: u32) -> GrayImage {
    if cells.is_empty() || size == 0 {
        return GrayImage::new(0, 0);
    }
    let rows = ((cells.len() + size - 1) / size) as u32;
    let tile = cell_size + 2;
    let mut montage = GrayImage::from_pixel(tile * size as u32, tile * rows, Luma([128u8]));
    for (i, cell) in cells.iter().enumerate() {
        let (row, col) = ((i / size) as u32, (i % size) as u32);
        let scaled = resize(cell, cell_size, cell_size, FilterType::Triangle);
        replace(
            &mut montage,
            &scaled,
            (col * tile + 1) as i64,
            (row * tile + 1) as i64,
        );
    }
    montage
}

/// Save the preprocessed cells as `<LETTER>.png` templates in `dir`.
///
/// Cells that were not recognized are skipped and existing templates are never overwritten, so the first board a
/// letter appears on defines its template. Returns the paths of the files written.
/// # Errors
/// If `dir` can not be created or a template can not be written.
pub fn save_templates<P: AsRef<Path>>(
    dir: P,
    cells: &[GrayImage],
    letters: &Grid<Token>,
    params: &RecognitionParams,
) -> Result<Vec<PathBuf>, Error> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).map_err(|source| Error::TemplateRead {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut saved = Vec::new();
    for (((row, col), &token), cell) in letters.cells().zip(cells) {
        if !token.is_known() {
            continue;
        }
        let path = dir.join(format!("{}.png", token.as_str()));
        if path.exists() {
            continue;
        }
        preprocess_cell(cell, params)
            .save(&path)
            .map_err(|source| Error::ImageError {
                path: path.display().to_string(),
                source,
            })?;
        info!("Saved template {} from cell ({}, {})", path.display(), row, col);
        saved.push(path);
    }
    Ok(saved)
}

use crate::board::MAX_BOARD_SIZE;
use crate::error::Error;
use image::{math::Rect, GenericImageView, GrayImage};

/// The cell rectangles of a normalized board.
///
/// Cell boundaries are computed in floating point, then every cell is shrunk on all sides by the same fraction of
/// the cell size, so grid lines and tile borders stay out of the cell images.
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    /// Number of rows and columns
    pub size: usize,
    /// Cell rectangles in row-major order
    pub cells: Vec<Rect>,
}

impl Layout {
    /// Return the layout of a `width` x `height` board with `size` rows and columns.
    ///
    /// # Errors
    /// * `inset` is not in `[0, 0.5)`
    /// * `size` is 0, larger than the largest board, or larger than the image
    /// # Example
    /// ```
    /// # use boggle_ocr::{Layout, Error};
    /// let layout = Layout::new(400, 400, 4, 0.15)?;
    /// let cell = layout.cell(1, 2);
    /// assert_eq!((cell.x, cell.y, cell.width, cell.height), (215, 115, 70, 70));
    /// # Ok::<(), Error>(())
    /// ```
    pub fn new(width: u32, height: u32, size: usize, inset: f32) -> Result<Layout, Error> {
        if !(0.0..0.5).contains(&inset) {
            return Err(Error::InvalidInset(inset));
        }
        if size == 0 || size > MAX_BOARD_SIZE || width < size as u32 || height < size as u32 {
            return Err(Error::InvalidGridSize(size));
        }
        let rows = spans(height, size, inset);
        let cols = spans(width, size, inset);
        let cells = rows
            .iter()
            .flat_map(|&(y, h)| {
                cols.iter().map(move |&(x, w)| Rect {
                    x,
                    y,
                    width: w,
                    height: h,
                })
            })
            .collect();
        Ok(Layout { size, cells })
    }

    pub fn cell(&self, row: usize, col: usize) -> Rect {
        self.cells[row * self.size + col]
    }

    /// Cut the cell images out of `board`, in row-major order.
    pub fn crop(&self, board: &GrayImage) -> Vec<GrayImage> {
        self.cells
            .iter()
            .map(|cell| board.view(cell.x, cell.y, cell.width, cell.height).to_image())
            .collect()
    }
}

/// Start and length of each of `n` cells along an axis of `length` pixels.
fn spans(length: u32, n: usize, inset: f32) -> Vec<(u32, u32)> {
    let cell = length as f32 / n as f32;
    let margin = (cell * inset) as u32;
    (0..n)
        .map(|i| {
            let start = ((i as f32 * cell) as u32 + margin).min(length - 1);
            let end = ((i + 1) as f32 * cell) as u32 - margin;
            (start, end.saturating_sub(start).max(1).min(length - start))
        })
        .collect()
}

//! The seam to an external text recognition engine.
//!
//! The library does not bundle an OCR engine. Callers that have one wrap it in a [TextReader]; without one the
//! letters are recognized by template matching only.
use crate::Error;
use image::GrayImage;
use log::{info, warn};

/// One piece of text found by a [TextReader].
#[derive(Debug, Clone, PartialEq)]
pub struct TextDetection {
    /// Corners of the text box: top-left, top-right, bottom-right, bottom-left
    pub bbox: [(f32, f32); 4],
    pub text: String,
    /// In `[0, 1]`
    pub confidence: f32,
}

impl TextDetection {
    /// Midpoint of the top-left and bottom-right corners.
    pub fn center(&self) -> (f32, f32) {
        let ((x0, y0), (x2, y2)) = (self.bbox[0], self.bbox[2]);
        ((x0 + x2) / 2.0, (y0 + y2) / 2.0)
    }
}

/// A pretrained text detection and recognition engine.
///
/// Implementations must be usable from several solves at once.
pub trait TextReader: Send + Sync {
    /// Find all text in `image`, reading only characters from `allowlist`.
    fn detect_and_read(&self, image: &GrayImage, allowlist: &str) -> Result<Vec<TextDetection>, Error>;
}

/// Run `reader` over a whole board. A failing reader is logged and treated as having found nothing.
pub fn read_board(reader: &dyn TextReader, board: &GrayImage, allowlist: &str) -> Vec<TextDetection> {
    match reader.detect_and_read(board, allowlist) {
        Ok(detections) => {
            info!("Text reader returned {} detections", detections.len());
            detections
        }
        Err(e) => {
            warn!("Text reader failed, continuing without it: {}", e);
            Vec::new()
        }
    }
}

/// Characters that text readers return for letters in the game font.
fn confusable(c: char) -> char {
    match c {
        '0' => 'O',
        '1' | '|' | '!' => 'I',
        '5' => 'S',
        '(' | '{' => 'C',
        c => c,
    }
}

/// Reduce raw reader output to a single board token: one letter, `QU`, or an empty string.
///
/// The text is uppercased, look-alike digits and symbols are replaced by letters and everything else but `A`..`Z`
/// is dropped. The first remaining letter is the result, a `Q` becomes `QU`.
/// # Example
/// ```
/// # use boggle_ocr::clean_text;
/// assert_eq!(clean_text(" 0x"), "O");
/// assert_eq!(clean_text("q"), "QU");
/// assert_eq!(clean_text("--"), "");
/// ```
pub fn clean_text(text: &str) -> String {
    let first = text
        .trim()
        .to_uppercase()
        .chars()
        .map(confusable)
        .find(|c| c.is_ascii_uppercase());
    match first {
        Some('Q') => String::from("QU"),
        Some(c) => c.to_string(),
        None => String::new(),
    }
}

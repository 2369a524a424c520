use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Board not square: row {row} has {cols} cells, expected {rows}")]
    BoardNotSquare { rows: usize, row: usize, cols: usize },
    #[error("Board size {0} exceeds the maximum of 8x8")]
    BoardTooLarge(usize),
    #[error("Grid size {0} is not supported")]
    InvalidGridSize(usize),
    /// The board quadrilateral has (almost) no area, no projective transform exists
    #[error("Degenerate board quadrilateral (area {0})")]
    DegenerateQuad(f32),
    #[error("Cell inset {0} must be in [0, 0.5)")]
    InvalidInset(f32),
    /// Error reading the word list
    #[error("Dictionary {path} could not be read")]
    DictionaryRead { path: PathBuf, source: io::Error },
    /// Error reading or writing a template
    #[error("Template {path} could not be accessed")]
    TemplateRead { path: PathBuf, source: io::Error },
    /// Error decoding image
    #[error("Image {path} could not be decoded")]
    ImageError {
        path: String,
        source: image::error::ImageError,
    },
    #[error("Image could not be decoded")]
    Decode(#[from] image::error::ImageError),
    /// The external text reader reported a failure
    #[error("Text reader failed: {0}")]
    TextReader(String),
    #[error("Invalid value {value:?} for {key}")]
    Config { key: String, value: String },
}

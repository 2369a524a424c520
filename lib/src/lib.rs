//! A library that reads a Boggle-style letter grid from a photo or screenshot and finds the words on it
//!
//! The board is located in the image, warped to a square, split into 4 x 4, 5 x 5 or 6 x 6 cells and every cell is
//! read with template matching, optionally combined with an external text reader. The resulting grid is searched
//! for dictionary words.
//!
//! # Basic usage
//! ```no_run
//! # use boggle_ocr::{Config, Context, Error};
//! let config = Config::from_env()?;
//! let context = Context::from_config(config)?;
//! let result = context.solve_file("tests/board.png")?;
//! println!("{} ({})", result.board, result.method);
//! for word in result.words.iter() {
//!     println!("{}", word.word);
//! }
//! # Ok::<(), Error>(())
//! ```
//! The board is shown one row per line, with `?` for cells that could not be read:
//!
//! ```text
//! C  A  T  S
//! R  E  P  O
//! B  QU N  E
//! D  I  ?  S
//! ```
//!
//! Solving an already known grid needs no image at all:
//! ```
//! # use boggle_ocr::{Board, Trie, WordSearch, Error};
//! let board = Board::from_rows(&[["C", "A"], ["T", "S"]])?;
//! let trie = Trie::from_words(["CAT", "CATS", "ACTS", "DOG"], 3);
//! let words: Vec<_> = WordSearch::new(&trie).solve(&board, 0).into_iter().map(|w| w.word).collect();
//! assert_eq!(words, ["ACTS", "CATS", "CAT"]);
//! # Ok::<(), Error>(())
//! ```

mod board;
mod config;
mod error;
mod geometry;
mod glyphs;
mod grid;
mod layout;
mod localizer;
mod normalizer;
mod ocr;
mod pipeline;
mod preprocess;
mod recognizer;
mod solver;
mod templates;
mod trie;
mod utils;

pub use board::{Board, Grid, Token, MAX_BOARD_SIZE};
pub use config::{Config, RecognitionParams, ENV_PREFIX};
pub use error::Error;
pub use geometry::Quad;
pub use glyphs::{draw_token_mut, render_token};
pub use grid::{estimate_grid_size, GRID_SIZES};
pub use layout::Layout;
pub use localizer::{center_crop, locate_board, Localization, Method};
pub use normalizer::normalize_board;
pub use ocr::{clean_text, read_board, TextDetection, TextReader};
pub use pipeline::{Context, SolveResult, StageTimings};
pub use preprocess::preprocess_cell;
pub use recognizer::{Provenance, Recognition, Recognizer};
pub use solver::{FoundWord, WordSearch};
pub use templates::{Template, TemplateSet};
pub use trie::Trie;
pub use utils::{montage, save_templates};

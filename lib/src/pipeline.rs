use crate::board::Board;
use crate::config::Config;
use crate::geometry::Quad;
use crate::grid::estimate_grid_size;
use crate::layout::Layout;
use crate::localizer::{locate_board, Localization, Method};
use crate::normalizer::normalize_board;
use crate::ocr::TextReader;
use crate::recognizer::{Recognition, Recognizer};
use crate::solver::{FoundWord, WordSearch};
use crate::templates::TemplateSet;
use crate::trie::Trie;
use crate::Error;
use image::imageops::grayscale;
use image::{GrayImage, RgbImage};
use log::{info, warn};
use std::path::Path;
use std::time::{Duration, Instant};

/// Elapsed time per pipeline stage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StageTimings {
    pub decode: Duration,
    pub localize: Duration,
    pub normalize: Duration,
    pub grid: Duration,
    pub segment: Duration,
    pub recognize: Duration,
    pub search: Duration,
    pub total: Duration,
}

impl StageTimings {
    pub fn stages(&self) -> [(&'static str, Duration); 8] {
        [
            ("decode", self.decode),
            ("localize", self.localize),
            ("normalize", self.normalize),
            ("grid", self.grid),
            ("segment", self.segment),
            ("recognize", self.recognize),
            ("search", self.search),
            ("total", self.total),
        ]
    }

    fn log(&self) {
        for (stage, elapsed) in self.stages() {
            info!("stage={} elapsed={:.1}ms", stage, elapsed.as_secs_f64() * 1000.0);
        }
    }
}

/// Holds the result of a solve: where the board was found, what it reads and the words on it.
#[derive(Debug, Clone)]
pub struct SolveResult {
    /// How the board was located; [Method::CenterCrop] means it was guessed
    pub method: Method,
    pub quad: Quad,
    /// Number of rows and columns
    pub grid_size: usize,
    /// Letters, confidences and per-cell provenance
    pub recognition: Recognition,
    pub board: Board,
    /// The cell images, row-major
    pub cells: Vec<GrayImage>,
    /// Longest first, truncated to the configured maximum
    pub words: Vec<FoundWord>,
    /// Number of words before truncation
    pub total_words: usize,
    pub timings: StageTimings,
}

/// Everything a solve needs that is built once: the word list, the recognizer, an optional text reader and the
/// configuration.
///
/// A context is immutable and can be shared between threads; every solve is independent.
pub struct Context {
    trie: Trie,
    recognizer: Recognizer,
    reader: Option<Box<dyn TextReader>>,
    config: Config,
}

impl Context {
    pub fn new(trie: Trie, recognizer: Recognizer, config: Config) -> Context {
        Context {
            trie,
            recognizer,
            reader: None,
            config,
        }
    }

    /// Load the dictionary and templates named by `config`.
    ///
    /// Missing templates are not an error: the recognizer then uses synthetic ones.
    /// # Errors
    /// * The configuration is invalid
    /// * The dictionary can not be read
    /// * The template directory can not be listed
    pub fn from_config(config: Config) -> Result<Context, Error> {
        config.validate()?;
        let trie = Trie::load(config.dictionary(), config.min_word_length)?;
        let templates = TemplateSet::load(&config.templates_dir, config.recognition.template_size)?;
        let recognizer = Recognizer::new(templates, config.recognition.clone());
        Ok(Context::new(trie, recognizer, config))
    }

    /// Use `reader` for the full board text recognition pass.
    pub fn with_reader(mut self, reader: Box<dyn TextReader>) -> Context {
        self.reader = Some(reader);
        self
    }

    pub fn trie(&self) -> &Trie {
        &self.trie
    }

    pub fn recognizer(&self) -> &Recognizer {
        &self.recognizer
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn solve_file<P: AsRef<Path>>(&self, path: P) -> Result<SolveResult, Error> {
        let path = path.as_ref();
        let start = Instant::now();
        let image = image::open(path)
            .map_err(|source| Error::ImageError {
                path: path.display().to_string(),
                source,
            })?
            .into_rgb8();
        self.run(&image, start)
    }

    /// Solve an encoded (PNG, JPEG, ...) image.
    pub fn solve_bytes(&self, bytes: &[u8]) -> Result<SolveResult, Error> {
        let start = Instant::now();
        let image = image::load_from_memory(bytes)?.into_rgb8();
        self.run(&image, start)
    }

    /// Locate, read and solve the board in `image`.
    ///
    /// # Errors
    /// Only for unusable geometry: a degenerate board outline or a grid that can not be segmented. A board that is
    /// not found, or letters that can not be read, show up in the result instead.
    pub fn solve_image(&self, image: &RgbImage) -> Result<SolveResult, Error> {
        self.run(image, Instant::now())
    }

    fn run(&self, image: &RgbImage, start: Instant) -> Result<SolveResult, Error> {
        let mut timings = StageTimings {
            decode: start.elapsed(),
            ..StageTimings::default()
        };

        let t = Instant::now();
        let Localization { method, quad } = locate_board(&grayscale(image));
        timings.localize = t.elapsed();

        let t = Instant::now();
        let normalized = normalize_board(image, &quad, self.config.warp_size)?;
        timings.normalize = t.elapsed();

        let t = Instant::now();
        let grid_size = estimate_grid_size(&normalized);
        timings.grid = t.elapsed();

        let t = Instant::now();
        let layout = Layout::new(
            normalized.width(),
            normalized.height(),
            grid_size,
            self.config.cell_inset,
        )?;
        let cells = layout.crop(&normalized);
        timings.segment = t.elapsed();

        let t = Instant::now();
        let recognition =
            self.recognizer
                .recognize(&normalized, &cells, grid_size, self.reader.as_deref());
        timings.recognize = t.elapsed();
        let unresolved = recognition.unresolved();
        if unresolved > 0 {
            warn!("{} of {} cells could not be read", unresolved, grid_size * grid_size);
        }

        let t = Instant::now();
        let board = recognition.board()?;
        let mut words = WordSearch::new(&self.trie).solve(&board, 0);
        let total_words = words.len();
        if self.config.max_results > 0 {
            words.truncate(self.config.max_results);
        }
        timings.search = t.elapsed();
        timings.total = start.elapsed();

        info!(
            "Solved {}x{} board ({}): {} words",
            grid_size, grid_size, method, total_words
        );
        timings.log();
        Ok(SolveResult {
            method,
            quad,
            grid_size,
            recognition,
            board,
            cells,
            words,
            total_words,
            timings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RecognitionParams;
    use image::Rgb;

    fn context(max_results: usize) -> Context {
        let trie = Trie::from_words(["CAT", "DOG"], 3);
        let recognizer = Recognizer::new(None, RecognitionParams::default());
        let config = Config {
            max_results,
            ..Config::default()
        };
        Context::new(trie, recognizer, config)
    }

    #[test]
    fn test_timings() {
        let timings = StageTimings {
            search: Duration::from_millis(3),
            ..StageTimings::default()
        };
        let stages = timings.stages();
        assert_eq!(stages.len(), 8);
        assert_eq!(stages[6], ("search", Duration::from_millis(3)));
        assert_eq!(stages[7].0, "total");
    }

    #[test]
    fn test_blank_image() {
        let image = RgbImage::from_pixel(320, 240, Rgb([128, 128, 128]));
        let result = context(50).solve_image(&image).unwrap();
        assert_eq!(result.method, Method::CenterCrop);
        assert!(result.grid_size >= 4 && result.grid_size <= 6);
        assert_eq!(result.cells.len(), result.grid_size * result.grid_size);
        assert!(result.words.is_empty());
        assert!(result.timings.total >= result.timings.search);
    }

    #[test]
    fn test_bad_bytes() {
        assert!(matches!(
            context(0).solve_bytes(b"not an image"),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = context(0).solve_file("/nonexistent/board.png").unwrap_err();
        assert!(matches!(err, Error::ImageError { .. }));
    }

    #[test]
    fn test_context_is_shareable() {
        fn shareable<T: Send + Sync>() {}
        shareable::<Context>();
    }
}

use crate::board::{Board, Grid, Token};
use crate::config::RecognitionParams;
use crate::ocr::{clean_text, read_board, TextReader};
use crate::preprocess::{inverted, preprocess_cell};
use crate::templates::{is_r_or_p, resolve_rp, TemplateSet};
use crate::Error;
use image::GrayImage;
use log::{debug, info};
use std::fmt;

const Q: Token = Token::Letter(b'Q' - b'A');

/// Which recognition pass decided a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// Read by the text reader
    Ocr,
    /// Template match, the text reader had nothing for the cell
    Template,
    /// The text reader was overruled by a confident calibrated template
    Override,
    /// Nothing usable, the cell is `?`
    Unresolved,
}

impl Default for Provenance {
    fn default() -> Self {
        Provenance::Unresolved
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let tag = match self {
            Provenance::Ocr => "ocr",
            Provenance::Template => "template",
            Provenance::Override => "override",
            Provenance::Unresolved => "unresolved",
        };
        write!(f, "{}", tag)
    }
}

/// Holds the result of [Recognizer::recognize]: the letters, their confidences and how each was decided.
#[derive(Debug, Clone)]
pub struct Recognition {
    pub letters: Grid<Token>,
    /// In `[0, 1]`, 0 for unresolved cells
    pub confidences: Grid<f32>,
    pub provenance: Grid<Provenance>,
}

impl Recognition {
    /// Number of `?` cells
    pub fn unresolved(&self) -> usize {
        self.letters.cells().filter(|(_, t)| !t.is_known()).count()
    }

    /// The board to search.
    pub fn board(&self) -> Result<Board, Error> {
        Board::new(&self.letters)
    }
}

/// Letter recognizer
///
/// Combines an optional external [TextReader] with template matching. Templates are calibrated images of the game
/// font when available, otherwise glyphs rendered with the built in stroke font.
pub struct Recognizer {
    templates: TemplateSet,
    params: RecognitionParams,
}

impl Recognizer {
    /// Create a recognizer. Without calibrated `templates` the synthetic set is used.
    pub fn new(templates: Option<TemplateSet>, params: RecognitionParams) -> Recognizer {
        let templates = match templates {
            Some(templates) => templates,
            None => {
                info!("No calibrated templates, using synthetic glyphs");
                TemplateSet::synthetic(params.template_size)
            }
        };
        Recognizer { templates, params }
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    pub fn params(&self) -> &RecognitionParams {
        &self.params
    }

    /// Recognize the letters of a `size` x `size` board.
    ///
    /// `board` is the normalized board and `cells` its cell images in row-major order. The recognition runs in
    /// passes:
    /// 1. the text reader, if any, reads the whole (inverted) board; each detection goes to the cell under its
    ///    center, the most confident detection per cell wins
    /// 2. cells without a detection are template matched
    /// 3. with calibrated templates, every detection is checked against its template match and overruled if the
    ///    template is much more certain
    /// 4. every R and P is checked for the leg of the R
    /// 5. a lone Q becomes QU
    ///
    /// This never fails: cells that can not be read are `?` with confidence 0.
    pub fn recognize(
        &self,
        board: &GrayImage,
        cells: &[GrayImage],
        size: usize,
        reader: Option<&dyn TextReader>,
    ) -> Recognition {
        let params = &self.params;
        if size == 0 {
            return Recognition {
                letters: Grid::default(),
                confidences: Grid::default(),
                provenance: Grid::default(),
            };
        }
        let count = size * size;
        let mut letters = vec![Token::Unknown; count];
        let mut confidences = vec![0.0f32; count];
        let mut provenance = vec![Provenance::Unresolved; count];

        // 1. full board text recognition
        let detected = match reader {
            Some(reader) => self.read_cells(reader, board, size),
            None => vec![None; count],
        };
        for (i, detection) in detected.iter().enumerate() {
            if let Some((token, conf)) = *detection {
                letters[i] = token;
                confidences[i] = conf;
                provenance[i] = Provenance::Ocr;
            }
        }
        if reader.is_some() {
            let found = detected.iter().filter(|d| d.is_some()).count();
            info!("Full-board OCR: {}/{} cells detected", found, count);
        }

        let blank = GrayImage::new(0, 0);
        let processed: Vec<GrayImage> = (0..count)
            .map(|i| preprocess_cell(cells.get(i).unwrap_or(&blank), params))
            .collect();

        // 2. template matching for the rest
        for i in 0..count {
            if letters[i].is_known() {
                continue;
            }
            let (token, conf) = self.match_cell(&processed[i]);
            debug!(
                "Template fallback ({},{}): {} (conf={:.3})",
                i / size,
                i % size,
                token,
                conf
            );
            letters[i] = token;
            confidences[i] = conf;
            provenance[i] = if token.is_known() {
                Provenance::Template
            } else {
                Provenance::Unresolved
            };
        }

        // 3. cross-check the text reader with calibrated templates
        if self.templates.is_calibrated() {
            for (i, detection) in detected.iter().enumerate() {
                let (ocr_token, ocr_conf) = match *detection {
                    Some(d) => d,
                    None => continue,
                };
                let (tpl_token, tpl_conf) = self.match_cell(&processed[i]);
                if tpl_token != ocr_token && ocr_conf < params.ocr_trust {
                    let confident = tpl_conf > params.template_override;
                    let better = tpl_conf > ocr_conf && ocr_conf < params.ocr_uncertain;
                    if tpl_token.is_known() && (confident || better) {
                        info!(
                            "Cross-check ({},{}): OCR={}({:.3}) -> template={}({:.3})",
                            i / size,
                            i % size,
                            ocr_token,
                            ocr_conf,
                            tpl_token,
                            tpl_conf
                        );
                        letters[i] = tpl_token;
                        confidences[i] = tpl_conf;
                        provenance[i] = Provenance::Override;
                    }
                } else {
                    confidences[i] = confidences[i].max(tpl_conf);
                }
            }
        }

        // 4. the shape check has the last word on R and P
        for i in 0..count {
            if is_r_or_p(letters[i]) {
                let correct = resolve_rp(&processed[i], params.rp_ratio);
                if correct != letters[i] {
                    info!(
                        "R/P check ({},{}): {} -> {}",
                        i / size,
                        i % size,
                        letters[i],
                        correct
                    );
                    letters[i] = correct;
                }
            }
        }

        // 5. the Q tile always reads QU
        for letter in letters.iter_mut() {
            if *letter == Q {
                *letter = Token::Qu;
            }
        }

        Recognition {
            letters: to_grid(&letters, size),
            confidences: to_grid(&confidences, size),
            provenance: to_grid(&provenance, size),
        }
    }

    /// The most confident detection per cell, by linear cell index.
    fn read_cells(
        &self,
        reader: &dyn TextReader,
        board: &GrayImage,
        size: usize,
    ) -> Vec<Option<(Token, f32)>> {
        let mut cells: Vec<Option<(Token, f32)>> = vec![None; size * size];
        // the game has light letters on dark tiles, readers prefer dark on light
        let detections = read_board(reader, &inverted(board), &self.params.allowlist);
        let cell_h = board.height() as f32 / size as f32;
        let cell_w = board.width() as f32 / size as f32;
        for detection in detections.iter() {
            let token = Token::parse(&clean_text(&detection.text));
            if !token.is_known() {
                continue;
            }
            let (cx, cy) = detection.center();
            let row = ((cy / cell_h) as usize).min(size - 1);
            let col = ((cx / cell_w) as usize).min(size - 1);
            let cell = &mut cells[row * size + col];
            let better = cell.map_or(true, |(_, conf)| detection.confidence > conf);
            if better {
                *cell = Some((token, detection.confidence));
            }
        }
        cells
    }

    /// Verified template match; a match without any shared ink leaves the cell unresolved.
    ///
    /// A Q template counts as QU, so it agrees with the text reader on the compound tile.
    fn match_cell(&self, processed: &GrayImage) -> (Token, f32) {
        match self.templates.best_match(processed, &self.params) {
            (Q, score) if score > 0.0 => (Token::Qu, score),
            (token, score) if score > 0.0 => (token, score),
            _ => (Token::Unknown, 0.0),
        }
    }
}

fn to_grid<T: Clone>(values: &[T], size: usize) -> Grid<T> {
    Grid(values.chunks(size.max(1)).map(|row| row.to_vec()).collect())
}

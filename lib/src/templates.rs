use crate::board::Token;
use crate::config::RecognitionParams;
use crate::glyphs::render_token;
use crate::preprocess::{dark_on_light, inverted, normalize_glyph, otsu_binarize};
use crate::Error;
use image::imageops::{resize, FilterType};
use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};
use imageproc::template_matching::{find_extremes, match_template, MatchTemplateMethod};
use log::{debug, info, warn};
use std::fs;
use std::path::Path;

const R: Token = Token::Letter(b'R' - b'A');
const P: Token = Token::Letter(b'P' - b'A');

/// Number of enclosed holes in the printed glyph of `token`.
pub fn expected_holes(token: Token) -> u32 {
    match token {
        Token::Qu => 1,
        Token::Letter(i) => match b'A' + i {
            b'B' => 2,
            b'A' | b'D' | b'O' | b'P' | b'Q' | b'R' => 1,
            _ => 0,
        },
        Token::Unknown => 0,
    }
}

/// Count the background regions enclosed by ink in a dark-on-light binary glyph.
pub fn count_holes(binary: &GrayImage) -> u32 {
    let ink = inverted(binary);
    find_contours::<i32>(&ink)
        .iter()
        .filter(|contour| matches!(contour.border_type, BorderType::Hole))
        .count() as u32
}

/// Fraction of the dark pixels that lie in the lower-right quadrant.
pub fn lower_right_ink_ratio(binary: &GrayImage) -> f32 {
    let (w, h) = binary.dimensions();
    let (mut total, mut lower_right) = (0u32, 0u32);
    for (x, y, p) in binary.enumerate_pixels() {
        if p[0] < 128 {
            total += 1;
            if x >= w / 2 && y >= h / 2 {
                lower_right += 1;
            }
        }
    }
    lower_right as f32 / total.max(1) as f32
}

/// Tell R from P: only the R has a leg reaching into the lower-right quadrant.
pub fn resolve_rp(binary: &GrayImage, ratio: f32) -> Token {
    if lower_right_ink_ratio(binary) > ratio {
        R
    } else {
        P
    }
}

pub fn is_r_or_p(token: Token) -> bool {
    token == R || token == P
}

/// A reference glyph, normalized like a preprocessed cell.
#[derive(Debug, Clone)]
pub struct Template {
    pub token: Token,
    /// Dark glyph on a light background
    pub image: GrayImage,
    // inverted copy, ink is 255
    ink: GrayImage,
}

/// The reference glyphs used for template matching.
///
/// A set is either calibrated (loaded from images of the real game font) or synthetic (rendered with the built in
/// stroke font). Only a calibrated set is trusted to second-guess the text reader.
#[derive(Debug, Clone)]
pub struct TemplateSet {
    templates: Vec<Template>,
    calibrated: bool,
    size: u32,
}

impl TemplateSet {
    /// Load calibrated templates from `<LETTER>.png` files in `dir` (`QU.png` for the compound tile).
    ///
    /// Returns `None` if the directory does not exist or has no usable templates. Files that can not be decoded
    /// are skipped with a warning.
    /// # Errors
    /// If the directory exists but can not be listed.
    pub fn load<P: AsRef<Path>>(dir: P, size: u32) -> Result<Option<TemplateSet>, Error> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            warn!("Template directory {} not found", dir.display());
            return Ok(None);
        }
        let read_error = |source| Error::TemplateRead {
            path: dir.to_path_buf(),
            source,
        };
        let mut images = Vec::new();
        for entry in fs::read_dir(dir).map_err(read_error)? {
            let path = entry.map_err(read_error)?.path();
            let is_png = path
                .extension()
                .map_or(false, |ext| ext.eq_ignore_ascii_case("png"));
            if !is_png {
                continue;
            }
            let token = match path.file_stem().and_then(|stem| stem.to_str()) {
                Some(stem) => template_token(stem),
                None => Token::Unknown,
            };
            if !token.is_known() {
                debug!("Skipping {}", path.display());
                continue;
            }
            match image::open(&path) {
                Ok(img) => images.push((token, img.into_luma8())),
                Err(e) => warn!("Template {} could not be read: {}", path.display(), e),
            }
        }
        if images.is_empty() {
            warn!("No templates in {}", dir.display());
            return Ok(None);
        }
        images.sort_by_key(|(token, _)| token.as_str());
        info!("Loaded {} templates from {}", images.len(), dir.display());
        Ok(Some(TemplateSet::from_images(images, size, true)))
    }

    /// Templates for `A`..`Z` and `QU` rendered with the stroke font.
    pub fn synthetic(size: u32) -> TemplateSet {
        let tokens = (b'A'..=b'Z')
            .map(|c| Token::from_letter(c as char))
            .chain(std::iter::once(Token::Qu));
        let images = tokens.map(|token| (token, render_token(token, size))).collect();
        TemplateSet::from_images(images, size, false)
    }

    /// Build a set from raw glyph images; each is resized to `size` square, binarized and scaled to its ink box.
    pub fn from_images(images: Vec<(Token, GrayImage)>, size: u32, calibrated: bool) -> TemplateSet {
        let templates = images
            .into_iter()
            .map(|(token, img)| {
                let img = if img.dimensions() != (size, size) {
                    resize(&img, size, size, FilterType::Triangle)
                } else {
                    img
                };
                let image = normalize_glyph(&dark_on_light(otsu_binarize(&img)), size);
                let ink = inverted(&image);
                Template { token, image, ink }
            })
            .collect();
        TemplateSet {
            templates,
            calibrated,
            size,
        }
    }

    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// Normalized cross-correlation of a preprocessed cell with every template, best first.
    ///
    /// Both images are compared as ink masks, so the score is 1.0 for identical glyphs and 0.0 if they share no ink.
    pub fn scores(&self, processed: &GrayImage) -> Vec<(Token, f32)> {
        let cell = if processed.dimensions() != (self.size, self.size) {
            resize(processed, self.size, self.size, FilterType::Triangle)
        } else {
            processed.clone()
        };
        let cell_ink = inverted(&cell);
        let mut scores: Vec<(Token, f32)> = self
            .templates
            .iter()
            .map(|t| {
                let result =
                    match_template(&cell_ink, &t.ink, MatchTemplateMethod::CrossCorrelationNormalized);
                let score = find_extremes(&result).max_value;
                // an empty mask gives 0 / 0
                (t.token, if score.is_finite() { score } else { 0.0 })
            })
            .collect();
        scores.sort_by(|a, b| b.1.total_cmp(&a.1));
        scores
    }

    /// Best template for a preprocessed cell, verified against the glyph structure.
    ///
    /// The first candidate whose hole count is within tolerance of the measured count wins; if there is none the top
    /// score is returned as is. A winning R or P is checked for the leg of the R and swapped, with the score of the
    /// swapped letter, if the check disagrees. Returns `(Token::Unknown, 0.0)` for an empty set.
    pub fn best_match(&self, processed: &GrayImage, params: &RecognitionParams) -> (Token, f32) {
        let scores = self.scores(processed);
        let top = match scores.first() {
            Some(&top) => top,
            None => return (Token::Unknown, 0.0),
        };
        let holes = count_holes(processed);
        let compatible = scores
            .iter()
            .find(|(token, _)| holes.abs_diff(expected_holes(*token)) <= params.hole_tolerance);
        match compatible {
            Some(&(token, score)) if is_r_or_p(token) => {
                let correct = resolve_rp(processed, params.rp_ratio);
                if correct == token {
                    return (token, score);
                }
                debug!("Template {} has the shape of {}", token, correct);
                let score = scores
                    .iter()
                    .find(|(t, _)| *t == correct)
                    .map_or(score, |&(_, s)| s);
                (correct, score)
            }
            Some(&found) => found,
            None => top,
        }
    }
}

/// The token named by a template file stem: a single letter or `QU`.
fn template_token(stem: &str) -> Token {
    let stem = stem.to_uppercase();
    match stem.as_str() {
        "QU" => Token::Qu,
        s if s.len() == 1 => s.chars().next().map_or(Token::Unknown, Token::from_letter),
        _ => Token::Unknown,
    }
}

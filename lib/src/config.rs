use crate::Error;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Prefix of the environment variables read by [Config::from_env].
pub const ENV_PREFIX: &str = "BOGGLE_";

/// Tuning constants of the letter recognizer.
///
/// The confidence cutoffs were tuned on real screenshots and have no derivation;
/// they are kept here so callers can override them.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionParams {
    /// Side of the square a cell is resized to before template matching
    pub template_size: u32,
    /// CLAHE clip limit, relative to a uniform histogram
    pub clahe_clip_limit: f32,
    /// Number of CLAHE tiles along each axis
    pub clahe_tiles: u32,
    /// OCR letters at or above this confidence are never overridden by templates
    pub ocr_trust: f32,
    /// A disagreeing template result above this confidence overrides OCR
    pub template_override: f32,
    /// Below this confidence OCR loses to any higher template score
    pub ocr_uncertain: f32,
    /// Allowed difference between measured and expected hole count
    pub hole_tolerance: u32,
    /// Lower-right dark pixel ratio above which a P/R glyph is an R
    pub rp_ratio: f32,
    /// Characters the external text reader may return
    pub allowlist: String,
}

impl Default for RecognitionParams {
    fn default() -> Self {
        RecognitionParams {
            template_size: 64,
            clahe_clip_limit: 2.0,
            clahe_tiles: 4,
            ocr_trust: 0.9,
            template_override: 0.85,
            ocr_uncertain: 0.7,
            hole_tolerance: 1,
            rp_ratio: 0.08,
            allowlist: String::from("ABCDEFGHIJKLMNOPQRSTUVWXYZ"),
        }
    }
}

/// Startup configuration of a solve [Context](crate::Context).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// The full word list
    pub dictionary_path: PathBuf,
    /// A smaller word list with common words only
    pub common_dictionary_path: PathBuf,
    /// Load `common_dictionary_path` instead of `dictionary_path`
    pub common_words_only: bool,
    /// Directory with calibrated `<LETTER>.png` templates
    pub templates_dir: PathBuf,
    /// Shorter dictionary words are dropped
    pub min_word_length: usize,
    /// Number of words returned per solve, 0 means all
    pub max_results: usize,
    /// Fraction of a cell trimmed on each side
    pub cell_inset: f32,
    /// Side of the normalized board in pixels
    pub warp_size: u32,
    pub recognition: RecognitionParams,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dictionary_path: PathBuf::from("dictionary.txt"),
            common_dictionary_path: PathBuf::from("dictionary_common.txt"),
            common_words_only: false,
            templates_dir: PathBuf::from("templates/letters"),
            min_word_length: 3,
            max_results: 50,
            cell_inset: 0.15,
            warp_size: 400,
            recognition: RecognitionParams::default(),
        }
    }
}

impl Config {
    /// Default configuration, overridden by `BOGGLE_*` environment variables.
    ///
    /// # Errors
    /// If a variable is set to a value that can not be parsed, or the result does not [validate](Config::validate).
    pub fn from_env() -> Result<Config, Error> {
        Config::default().with_overrides(|key| env::var(format!("{}{}", ENV_PREFIX, key)).ok())
    }

    /// Apply overrides from `lookup`, which maps a key without prefix (e.g. `MIN_WORD_LENGTH`) to a value.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Config, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("DICTIONARY_PATH") {
            self.dictionary_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("COMMON_DICTIONARY_PATH") {
            self.common_dictionary_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("COMMON_WORDS_ONLY") {
            self.common_words_only = parse_bool(&v);
        }
        if let Some(v) = lookup("TEMPLATES_DIR") {
            self.templates_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("MIN_WORD_LENGTH") {
            self.min_word_length = parse("MIN_WORD_LENGTH", &v)?;
        }
        if let Some(v) = lookup("MAX_RESULTS") {
            // zero or negative means unlimited
            let max: i64 = parse("MAX_RESULTS", &v)?;
            self.max_results = max.max(0) as usize;
        }
        if let Some(v) = lookup("CELL_INSET") {
            self.cell_inset = parse("CELL_INSET", &v)?;
        }
        if let Some(v) = lookup("WARP_SIZE") {
            self.warp_size = parse("WARP_SIZE", &v)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// The word list selected by `common_words_only`.
    pub fn dictionary(&self) -> &PathBuf {
        if self.common_words_only {
            &self.common_dictionary_path
        } else {
            &self.dictionary_path
        }
    }

    /// Check the values that would otherwise fail deep inside the pipeline.
    pub fn validate(&self) -> Result<(), Error> {
        if !(0.0..0.5).contains(&self.cell_inset) {
            return Err(Error::InvalidInset(self.cell_inset));
        }
        if self.warp_size == 0 {
            return Err(Error::Config {
                key: format!("{}WARP_SIZE", ENV_PREFIX),
                value: self.warp_size.to_string(),
            });
        }
        Ok(())
    }
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, Error> {
    value.trim().parse().map_err(|_| Error::Config {
        key: format!("{}{}", ENV_PREFIX, key),
        value: value.to_string(),
    })
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<&'static str, &'static str> = pairs.iter().copied().collect();
        move |key: &str| map.get(key).map(|v| v.to_string())
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.min_word_length, 3);
        assert_eq!(config.max_results, 50);
        assert_eq!(config.warp_size, 400);
        assert_eq!(config.recognition.rp_ratio, 0.08);
        assert_eq!(config.dictionary(), &PathBuf::from("dictionary.txt"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = Config::default()
            .with_overrides(vars(&[
                ("MIN_WORD_LENGTH", "4"),
                ("COMMON_WORDS_ONLY", "Yes"),
                ("MAX_RESULTS", "-1"),
                ("CELL_INSET", "0.2"),
            ]))
            .unwrap();
        assert_eq!(config.min_word_length, 4);
        assert!(config.common_words_only);
        assert_eq!(config.max_results, 0);
        assert_eq!(config.cell_inset, 0.2);
        assert_eq!(config.dictionary(), &PathBuf::from("dictionary_common.txt"));
    }

    #[test]
    fn test_bad_value() {
        let err = Config::default()
            .with_overrides(vars(&[("WARP_SIZE", "big")]))
            .unwrap_err();
        assert!(matches!(err, Error::Config { ref key, .. } if key == "BOGGLE_WARP_SIZE"));
    }

    #[test]
    fn test_bad_inset() {
        let err = Config::default()
            .with_overrides(vars(&[("CELL_INSET", "0.5")]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInset(_)));
    }
}

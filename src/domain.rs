//! Domain scoring profiles.
//!
//! Each subject category gets its own thresholds and penalty weights. Strict
//! mode is a pure transform applied on top of a profile.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

const MATH_KEYS: &[&str] = &["math", "maths", "رياض", "رياضيات", "algebra", "geometry"];
const SCIENCE_KEYS: &[&str] = &["science", "sci", "علوم", "biology", "chem", "physics"];

/// Subject category used to pick a scoring profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Math,
    Science,
    #[default]
    Textual,
}

impl Domain {
    /// All domains, in table order.
    pub const ALL: [Domain; 3] = [Domain::Math, Domain::Science, Domain::Textual];

    /// Infers a domain from keywords in a file path.
    ///
    /// Math keywords win over science keywords; anything else is textual.
    /// The match is a plain substring test, so an explicit domain should be
    /// preferred whenever the caller knows it.
    pub fn detect_from_path(path: &Path) -> Domain {
        let p = path.to_string_lossy().to_lowercase();
        if MATH_KEYS.iter().any(|k| p.contains(k)) {
            Domain::Math
        } else if SCIENCE_KEYS.iter().any(|k| p.contains(k)) {
            Domain::Science
        } else {
            Domain::Textual
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Math => write!(f, "math"),
            Domain::Science => write!(f, "science"),
            Domain::Textual => write!(f, "textual"),
        }
    }
}

impl FromStr for Domain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "math" | "maths" => Ok(Domain::Math),
            "science" => Ok(Domain::Science),
            "textual" | "text" => Ok(Domain::Textual),
            _ => Err(Error::UnknownName {
                kind: "domain",
                name: s.to_string(),
            }),
        }
    }
}

/// Scoring mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    #[default]
    Normal,
    Strict,
}

/// Thresholds and weights for one domain in one mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DomainConfig {
    pub domain: Domain,
    pub mode: ScoringMode,

    /// `LOW_ARABIC` when the arabic ratio is below this.
    pub low_arabic_lt: f64,
    /// `DIGIT_HEAVY_NO_MATH` digit ratio ceiling...
    pub digit_heavy_gt: f64,
    /// ...combined with an arabic ratio below this.
    pub digit_heavy_ar_lt: f64,
    /// Digit ratio tolerated before the digit penalty starts.
    pub digit_baseline: f64,
    /// `LATIN_NOISE` when the latin ratio exceeds this.
    pub latin_noise_gt: f64,
    /// `PUNCT_HEAVY` when the punctuation ratio exceeds this.
    pub punct_heavy_gt: f64,
    /// `TOO_SHORT` (and the short penalty) below this many chars.
    pub min_chars: usize,

    pub w_arabic: f64,
    pub w_digit_with_math: f64,
    pub w_digit_no_math: f64,
    pub w_latin: f64,
    pub w_punct: f64,
    pub short_penalty: f64,
}

impl DomainConfig {
    /// Normal-mode profile for a domain.
    pub fn for_domain(domain: Domain) -> Self {
        match domain {
            Domain::Math => Self {
                domain,
                mode: ScoringMode::Normal,
                low_arabic_lt: 0.20,
                digit_heavy_gt: 0.65,
                digit_heavy_ar_lt: 0.30,
                digit_baseline: 0.35,
                latin_noise_gt: 0.05,
                punct_heavy_gt: 0.20,
                min_chars: 200,
                w_arabic: 40.0,
                w_digit_with_math: 30.0,
                w_digit_no_math: 60.0,
                w_latin: 60.0,
                w_punct: 20.0,
                short_penalty: 10.0,
            },
            Domain::Science => Self {
                domain,
                mode: ScoringMode::Normal,
                low_arabic_lt: 0.20,
                digit_heavy_gt: 0.55,
                digit_heavy_ar_lt: 0.25,
                digit_baseline: 0.30,
                latin_noise_gt: 0.10,
                punct_heavy_gt: 0.25,
                min_chars: 180,
                w_arabic: 35.0,
                w_digit_with_math: 25.0,
                w_digit_no_math: 45.0,
                w_latin: 45.0,
                w_punct: 20.0,
                short_penalty: 8.0,
            },
            Domain::Textual => Self {
                domain,
                mode: ScoringMode::Normal,
                low_arabic_lt: 0.25,
                digit_heavy_gt: 0.50,
                digit_heavy_ar_lt: 0.35,
                digit_baseline: 0.25,
                latin_noise_gt: 0.03,
                punct_heavy_gt: 0.25,
                min_chars: 200,
                w_arabic: 45.0,
                w_digit_with_math: 25.0,
                w_digit_no_math: 55.0,
                w_latin: 50.0,
                w_punct: 15.0,
                short_penalty: 8.0,
            },
        }
    }

    /// Profile for a domain, tightened when `strict` is set.
    pub fn resolve(domain: Domain, strict: bool) -> Self {
        let config = Self::for_domain(domain);
        if strict {
            config.strict()
        } else {
            config
        }
    }

    /// Tightens thresholds and raises penalties. Applying it twice is a no-op.
    pub fn strict(self) -> Self {
        if self.mode == ScoringMode::Strict {
            return self;
        }
        Self {
            mode: ScoringMode::Strict,
            low_arabic_lt: (self.low_arabic_lt + 0.05).min(0.30),
            digit_baseline: (self.digit_baseline - 0.05).max(0.20),
            digit_heavy_gt: (self.digit_heavy_gt - 0.10).max(0.45),
            latin_noise_gt: (self.latin_noise_gt - 0.01).max(0.02),
            w_latin: self.w_latin + 5.0,
            w_digit_no_math: self.w_digit_no_math + 5.0,
            short_penalty: self.short_penalty + 2.0,
            ..self
        }
    }

    pub fn is_strict(&self) -> bool {
        self.mode == ScoringMode::Strict
    }
}

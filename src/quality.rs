//! Chunk quality scoring.
//!
//! A chunk receives a 0-100 heuristic score and a set of independent flags,
//! both driven by the [`DomainConfig`] of its subject. A cheaper gate,
//! [`should_drop_chunk`], rejects obvious junk before scoring.

use crate::domain::DomainConfig;
use crate::options::DropGate;
use crate::script::ScriptProfile;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Chunks scoring below this are considered noisy.
pub const ACCEPT_THRESHOLD: f64 = 70.0;

/// Quality flag raised on a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Flag {
    LowArabic,
    DigitHeavyNoMath,
    LatinNoise,
    PunctHeavy,
    TooShort,
}

impl Flag {
    pub const ALL: [Flag; 5] = [
        Flag::LowArabic,
        Flag::DigitHeavyNoMath,
        Flag::LatinNoise,
        Flag::PunctHeavy,
        Flag::TooShort,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Flag::LowArabic => "LOW_ARABIC",
            Flag::DigitHeavyNoMath => "DIGIT_HEAVY_NO_MATH",
            Flag::LatinNoise => "LATIN_NOISE",
            Flag::PunctHeavy => "PUNCT_HEAVY",
            Flag::TooShort => "TOO_SHORT",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered set of flags, serialized as an array of names.
pub type FlagSet = BTreeSet<Flag>;

/// Score and flags of one piece of text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assessment {
    pub profile: ScriptProfile,
    pub score: f64,
    pub flags: FlagSet,
}

impl Assessment {
    /// True when any flag is set or the score is below [`ACCEPT_THRESHOLD`].
    pub fn is_noisy(&self) -> bool {
        is_noisy(self.score, &self.flags)
    }
}

/// Noisy means flagged or scoring below the acceptance threshold.
pub fn is_noisy(score: f64, flags: &FlagSet) -> bool {
    !flags.is_empty() || score < ACCEPT_THRESHOLD
}

/// Domain-aware scorer. Borrows its configuration.
#[derive(Debug, Clone, Copy)]
pub struct QualityScorer<'a> {
    config: &'a DomainConfig,
}

impl<'a> QualityScorer<'a> {
    pub fn new(config: &'a DomainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DomainConfig {
        self.config
    }

    /// Profiles, scores and flags `text`.
    pub fn assess(&self, text: &str) -> Assessment {
        let profile = ScriptProfile::of(text);
        self.assess_profile(profile)
    }

    /// Scores a precomputed profile.
    pub fn assess_profile(&self, profile: ScriptProfile) -> Assessment {
        Assessment {
            score: self.score_profile(&profile),
            flags: self.flags_profile(&profile),
            profile,
        }
    }

    pub fn score(&self, text: &str) -> f64 {
        self.score_profile(&ScriptProfile::of(text))
    }

    pub fn flags(&self, text: &str) -> FlagSet {
        self.flags_profile(&ScriptProfile::of(text))
    }

    /// Penalty-based score, clamped to `[0, 100]` and rounded to 2 decimals.
    pub fn score_profile(&self, p: &ScriptProfile) -> f64 {
        let c = self.config;
        let digit_weight = if p.has_math {
            c.w_digit_with_math
        } else {
            c.w_digit_no_math
        };

        let mut score = 100.0;
        score -= (1.0 - p.arabic_ratio) * c.w_arabic;
        score -= (p.digit_ratio - c.digit_baseline).max(0.0) * digit_weight;
        score -= p.latin_ratio * c.w_latin;
        score -= p.punct_ratio * c.w_punct;
        if p.chars < c.min_chars {
            score -= c.short_penalty;
        }

        round2(score.clamp(0.0, 100.0))
    }

    pub fn flags_profile(&self, p: &ScriptProfile) -> FlagSet {
        let c = self.config;
        let mut flags = FlagSet::new();

        if p.arabic_ratio < c.low_arabic_lt {
            flags.insert(Flag::LowArabic);
        }
        if p.digit_ratio > c.digit_heavy_gt && !p.has_math && p.arabic_ratio < c.digit_heavy_ar_lt {
            flags.insert(Flag::DigitHeavyNoMath);
        }
        if p.latin_ratio > c.latin_noise_gt {
            flags.insert(Flag::LatinNoise);
        }
        if p.punct_ratio > c.punct_heavy_gt {
            flags.insert(Flag::PunctHeavy);
        }
        if p.chars < c.min_chars {
            flags.insert(Flag::TooShort);
        }

        flags
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Pre-scoring gate: true when the chunk should not be emitted at all.
pub fn should_drop_chunk(text: &str, gate: &DropGate) -> bool {
    should_drop_profile(&ScriptProfile::of(text), gate)
}

/// [`should_drop_chunk`] over a precomputed profile.
pub fn should_drop_profile(p: &ScriptProfile, gate: &DropGate) -> bool {
    p.arabic_ratio < gate.arabic_lt
        || (p.digit_ratio > gate.digit_gt && !p.has_math)
        || p.words < gate.min_words
}

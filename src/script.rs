//! Script-ratio classification.
//!
//! Pure, single-pass character statistics shared by the line filter, the
//! chunk gate and the quality scorer. All ratios are computed over the
//! non-whitespace characters of the input and are `0.0` for input without any.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Arabic Unicode blocks (base, supplement, extended-A, presentation forms A/B).
const ARABIC_RANGES: &[(u32, u32)] = &[
    (0x0600, 0x06FF),
    (0x0750, 0x077F),
    (0x08A0, 0x08FF),
    (0xFB50, 0xFDFF),
    (0xFE70, 0xFEFF),
];

static RE_MATH_CONTEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[+\-×÷*/=%(){}\[\]^<>√∑∫π≤≥≠±]|[.,]\d|\b(?:sin|cos|tan|log|ln|sqrt|lim)\b")
        .unwrap()
});

/// Check if character falls in one of the Arabic blocks
pub fn is_arabic(c: char) -> bool {
    let code = c as u32;
    ARABIC_RANGES
        .iter()
        .any(|&(lo, hi)| (lo..=hi).contains(&code))
}

/// Character composition of a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScriptProfile {
    /// Length in chars (including whitespace)
    pub chars: usize,
    /// Whitespace-separated word count
    pub words: usize,
    /// Non-whitespace character count (ratio denominator)
    pub visible: usize,
    pub arabic_ratio: f64,
    pub digit_ratio: f64,
    pub latin_ratio: f64,
    pub punct_ratio: f64,
    pub has_math: bool,
}

impl ScriptProfile {
    /// Computes every ratio in one pass over `text`.
    pub fn of(text: &str) -> Self {
        let mut chars = 0usize;
        let mut visible = 0usize;
        let mut arabic = 0usize;
        let mut digits = 0usize;
        let mut latin = 0usize;
        let mut punct = 0usize;

        for c in text.chars() {
            chars += 1;
            if c.is_whitespace() {
                continue;
            }
            visible += 1;
            let arabic_char = is_arabic(c);
            if arabic_char {
                arabic += 1;
            }
            if c.is_numeric() {
                digits += 1;
            }
            if c.is_ascii_alphabetic() {
                latin += 1;
            }
            if !c.is_alphanumeric() && !arabic_char {
                punct += 1;
            }
        }

        Self {
            chars,
            words: text.split_whitespace().count(),
            visible,
            arabic_ratio: ratio(arabic, visible),
            digit_ratio: ratio(digits, visible),
            latin_ratio: ratio(latin, visible),
            punct_ratio: ratio(punct, visible),
            has_math: has_math_context(text),
        }
    }
}

fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

fn count_ratio(s: &str, pred: impl Fn(char) -> bool) -> f64 {
    let mut total = 0usize;
    let mut hits = 0usize;
    for c in s.chars().filter(|c| !c.is_whitespace()) {
        total += 1;
        if pred(c) {
            hits += 1;
        }
    }
    ratio(hits, total)
}

/// Fraction of non-whitespace characters in the Arabic blocks.
pub fn arabic_ratio(s: &str) -> f64 {
    count_ratio(s, is_arabic)
}

/// Fraction of non-whitespace characters that are digits (any script).
pub fn digit_ratio(s: &str) -> f64 {
    count_ratio(s, char::is_numeric)
}

/// Fraction of non-whitespace characters that are ASCII letters.
pub fn latin_ratio(s: &str) -> f64 {
    count_ratio(s, |c| c.is_ascii_alphabetic())
}

/// Fraction of non-whitespace characters that are neither alphanumeric nor Arabic.
pub fn punctuation_ratio(s: &str) -> f64 {
    count_ratio(s, |c| !c.is_alphanumeric() && !is_arabic(c))
}

/// True when the text contains an operator, a decimal separator followed by a
/// digit, or a math-function token.
pub fn has_math_context(s: &str) -> bool {
    RE_MATH_CONTEXT.is_match(s)
}

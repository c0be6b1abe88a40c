//! # Text Normalization
//!
//! First stage of the pipeline. Turns raw OCR page text into a canonical form
//! every later heuristic can rely on.
//!
//! 1. **Control stripping** - zero-width and bidi controls, C0/C1 controls
//! 2. **NFKC** - compatibility normalization (presentation forms, fullwidth)
//! 3. **Diacritics** - optional removal of Arabic tashkeel
//! 4. **Whitespace** - horizontal runs collapsed, padded newlines collapsed
//! 5. **Digits** - Arabic-Indic digits transliterated to ASCII
//!
//! [`normalize`] is idempotent: applying it to its own output is a no-op.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static RE_HORIZONTAL_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{00A0}]+").unwrap());

static RE_PADDED_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]*\n[ \t]*").unwrap());

/// Normalizes raw page text.
///
/// # Example
///
/// ```
/// use ocrchunk::normalize::normalize;
///
/// let text = normalize("٣+٤  =\u{200F} ٧", true);
/// assert_eq!(text, "3+4 = 7");
/// ```
pub fn normalize(input: &str, strip_diacritics: bool) -> String {
    let stripped = strip_controls(input);
    let mut result: String = stripped.nfkc().collect();

    if strip_diacritics && result.chars().any(is_arabic_diacritic) {
        let without: String = result.chars().filter(|c| !is_arabic_diacritic(*c)).collect();
        // Removing marks can leave composable neighbours behind
        result = without.nfkc().collect();
    }

    let result = RE_HORIZONTAL_SPACE.replace_all(&result, " ");
    let result = RE_PADDED_NEWLINE.replace_all(&result, "\n");

    result.trim().chars().map(transliterate_digit).collect()
}

/// Removes zero-width/bidi controls and control characters.
///
/// Carriage returns are folded into newlines; tabs and newlines survive.
pub fn strip_controls(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() != Some(&'\n') {
                result.push('\n');
            }
            continue;
        }
        if is_format_control(c) {
            continue;
        }
        if c.is_control() && c != '\n' && c != '\t' {
            continue;
        }
        result.push(c);
    }

    result
}

/// Check if character is an invisible formatting control (zero-width, bidi, BOM)
pub fn is_format_control(c: char) -> bool {
    matches!(
        c,
        '\u{200B}'..='\u{200F}'     // ZWSP, ZWNJ, ZWJ, LRM, RLM
        | '\u{202A}'..='\u{202E}'   // Bidi embeddings and overrides
        | '\u{2060}'                // Word joiner
        | '\u{2066}'..='\u{2069}'   // Bidi isolates
        | '\u{FEFF}'                // BOM
    )
}

/// Check if character is an Arabic diacritic mark (tashkeel)
pub fn is_arabic_diacritic(c: char) -> bool {
    matches!(c, '\u{0617}'..='\u{061A}' | '\u{064B}'..='\u{0652}')
}

/// Maps Arabic-Indic and Extended Arabic-Indic digits to ASCII.
fn transliterate_digit(c: char) -> char {
    match c {
        '\u{0660}'..='\u{0669}' => char::from(b'0' + (c as u32 - 0x0660) as u8),
        '\u{06F0}'..='\u{06F9}' => char::from(b'0' + (c as u32 - 0x06F0) as u8),
        _ => c,
    }
}

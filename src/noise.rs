//! # Line Noise Filtering
//!
//! Per-line heuristics that remove OCR artifacts from normalized page text:
//! short fragments, scattered single letters, digit-dominated lines outside
//! math context, long bare digit runs and repeated punctuation.

use crate::options::LineFilterOptions;
use crate::script::{arabic_ratio, digit_ratio, has_math_context};
use regex::Regex;
use std::sync::LazyLock;

// Three or more lone Latin letters separated by whitespace, nothing else
static RE_SCATTERED_LETTERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z](?:\s+[A-Za-z]){2,}$").unwrap());

static RE_MULTIPLE_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").unwrap());

/// Punctuation whose 3+ repeats collapse to a single occurrence.
const REPEATABLE_PUNCT: &[char] = &['-', 'ـ', '.', '،', '؛', ':', '!', '؟'];

/// Cleans a single line. Returns `None` when the line is noise.
pub fn clean_line(line: &str, options: &LineFilterOptions) -> Option<String> {
    let trimmed = line.trim();

    if trimmed.chars().count() < options.min_line_chars {
        return None;
    }

    if RE_SCATTERED_LETTERS.is_match(trimmed) {
        return None;
    }

    let mut cleaned = if has_math_context(trimmed) {
        trimmed.to_string()
    } else {
        if digit_ratio(trimmed) > options.digit_drop_ratio
            && arabic_ratio(trimmed) < options.arabic_floor
        {
            return None;
        }
        strip_digit_runs(trimmed, options.max_bare_digit_run)
    };

    cleaned = collapse_punct_runs(&cleaned);

    let result = cleaned.trim();
    if result.chars().count() <= 1 {
        return None;
    }
    Some(result.to_string())
}

/// Filters every line of a normalized page. Returns an empty string when no
/// line survives.
pub fn filter_page(text: &str, options: &LineFilterOptions) -> String {
    text.split('\n')
        .filter_map(|line| clean_line(line, options))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Removes digit runs of at least `min_run` digits.
fn strip_digit_runs(line: &str, min_run: usize) -> String {
    let mut result = String::with_capacity(line.len());
    let mut run = String::new();

    for c in line.chars() {
        if c.is_numeric() {
            run.push(c);
            continue;
        }
        flush_run(&mut result, &mut run, min_run);
        result.push(c);
    }
    flush_run(&mut result, &mut run, min_run);

    if result.len() == line.len() {
        return result;
    }
    RE_MULTIPLE_SPACES.replace_all(&result, " ").into_owned()
}

fn flush_run(result: &mut String, run: &mut String, min_run: usize) {
    if run.chars().count() < min_run {
        result.push_str(run);
    }
    run.clear();
}

/// Collapses runs of three or more identical repeatable punctuation chars.
pub fn collapse_punct_runs(line: &str) -> String {
    let chars: Vec<char> = line.chars().collect();
    let mut result = String::with_capacity(line.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let mut j = i + 1;
        while j < chars.len() && chars[j] == c {
            j += 1;
        }
        let run = j - i;
        if run >= 3 && REPEATABLE_PUNCT.contains(&c) {
            result.push(c);
        } else {
            result.extend(&chars[i..j]);
        }
        i = j;
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts() -> LineFilterOptions {
        LineFilterOptions::default()
    }

    #[test]
    fn test_short_lines_dropped() {
        assert_eq!(clean_line("  abc ", &opts()), None);
        assert_eq!(clean_line("صفحة", &opts()), None);
        assert!(clean_line("صفحة أولى", &opts()).is_some());
    }

    #[test]
    fn test_scattered_letters_dropped() {
        assert_eq!(clean_line("a b c d e", &opts()), None);
        assert_eq!(clean_line("x  Y\tz", &opts()), None);
        // Real words are not scattered letters
        assert!(clean_line("a bc d efg", &opts()).is_some());
    }

    #[test]
    fn test_digit_heavy_line_dropped_without_math() {
        assert_eq!(clean_line("123456 7890 12", &opts()), None);
    }

    #[test]
    fn test_digit_heavy_line_kept_with_math() {
        let line = "12+34=46 99";
        assert_eq!(clean_line(line, &opts()).as_deref(), Some(line));
    }

    #[test]
    fn test_long_digit_runs_stripped() {
        let line = "رقم الإيداع 2019123456 لسنة الطبع";
        assert_eq!(clean_line(line, &opts()).as_deref(), Some("رقم الإيداع لسنة الطبع"));
        // Short numbers survive
        let short = "الدرس 12 من الوحدة";
        assert_eq!(clean_line(short, &opts()).as_deref(), Some(short));
    }

    #[test]
    fn test_digit_runs_kept_in_math_lines() {
        let line = "123456 × 2 = 246912";
        assert_eq!(clean_line(line, &opts()).as_deref(), Some(line));
    }

    #[test]
    fn test_punct_runs_collapsed() {
        assert_eq!(collapse_punct_runs("انتهى......"), "انتهى.");
        assert_eq!(collapse_punct_runs("كلمة ـــــ كلمة"), "كلمة ـ كلمة");
        assert_eq!(collapse_punct_runs("نعم!!"), "نعم!!");
        assert_eq!(collapse_punct_runs("aaa"), "aaa");
    }

    #[test]
    fn test_line_reduced_to_single_char_dropped() {
        // Survives the length check, then collapses to a lone dash
        assert_eq!(clean_line("-----", &opts()), None);
    }

    #[test]
    fn test_relaxed_arabic_floor() {
        // 7 digits, 3 arabic letters: digit ratio 0.7, arabic ratio 0.3
        let line = "1234 567 عدد";
        assert_eq!(clean_line(line, &opts()).as_deref(), Some(line));
        let strict_floor = LineFilterOptions {
            arabic_floor: 0.35,
            ..opts()
        };
        assert_eq!(clean_line(line, &strict_floor), None);
    }

    #[test]
    fn test_filter_page_rejoins_survivors() {
        let page = "هذا سطر مفيد.\na b c\n---\nسطر آخر مفيد";
        assert_eq!(filter_page(page, &opts()), "هذا سطر مفيد.\nسطر آخر مفيد");
    }

    #[test]
    fn test_filter_page_all_noise() {
        assert_eq!(filter_page("a b c\n12\n9876543210", &opts()), "");
    }
}

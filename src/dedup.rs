//! Exact and near-duplicate detection.
//!
//! Fingerprints are SHA-256 digests of normalized chunk text. The near
//! fingerprint additionally ignores digit runs, so chunks that differ only by
//! page numbers or counters collide.

use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

static RE_DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// NFKC, lowercase, whitespace collapsed to single spaces, trimmed.
pub fn normalize_for_hash(text: &str) -> String {
    let folded: String = text.nfkc().collect::<String>().to_lowercase();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn sha256_hex(data: &str) -> String {
    hex::encode(Sha256::digest(data.as_bytes()))
}

/// Fingerprint of the normalized text.
pub fn exact_fingerprint(text: &str) -> String {
    sha256_hex(&normalize_for_hash(text))
}

/// Fingerprint of the normalized text with every digit run removed.
pub fn near_fingerprint(text: &str) -> String {
    let normalized = normalize_for_hash(text);
    sha256_hex(&RE_DIGIT_RUN.replace_all(&normalized, ""))
}

/// Duplicate counts for one file.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DuplicateStats {
    pub total: usize,
    pub exact_duplicates: usize,
    pub near_duplicates: usize,
    pub exact_duplicate_rate: f64,
    pub near_duplicate_rate: f64,
}

/// Counts fingerprint occurrences as chunks stream past.
#[derive(Debug, Default)]
pub struct DuplicateDetector {
    exact: HashMap<String, usize>,
    near: HashMap<String, usize>,
    total: usize,
}

impl DuplicateDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a chunk. Returns `(exact_seen_before, near_seen_before)`.
    pub fn observe(&mut self, text: &str) -> (bool, bool) {
        self.total += 1;
        let exact = bump(&mut self.exact, exact_fingerprint(text));
        let near = bump(&mut self.near, near_fingerprint(text));
        (exact, near)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn stats(&self) -> DuplicateStats {
        let exact_duplicates = excess(&self.exact);
        let near_duplicates = excess(&self.near);
        let denom = self.total.max(1) as f64;
        DuplicateStats {
            total: self.total,
            exact_duplicates,
            near_duplicates,
            exact_duplicate_rate: exact_duplicates as f64 / denom,
            near_duplicate_rate: near_duplicates as f64 / denom,
        }
    }
}

fn bump(table: &mut HashMap<String, usize>, key: String) -> bool {
    let count = table.entry(key).or_insert(0);
    *count += 1;
    *count > 1
}

fn excess(table: &HashMap<String, usize>) -> usize {
    table.values().map(|c| c - 1).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_for_hash() {
        assert_eq!(normalize_for_hash("  Hello \n\t WORLD  "), "hello world");
        assert_eq!(normalize_for_hash("ﻻ"), "لا");
    }

    #[test]
    fn test_page_number_variants() {
        let a = "الدرس الأول صفحة 12";
        let b = "الدرس الأول صفحة 13";
        assert_ne!(exact_fingerprint(a), exact_fingerprint(b));
        assert_eq!(near_fingerprint(a), near_fingerprint(b));
    }

    #[test]
    fn test_whitespace_and_case_insensitive() {
        assert_eq!(exact_fingerprint("Some  Text"), exact_fingerprint("some text"));
        assert_eq!(exact_fingerprint("x").len(), 64);
    }

    #[test]
    fn test_detector_rates() {
        let mut detector = DuplicateDetector::new();
        assert_eq!(detector.observe("نص واحد 1"), (false, false));
        assert_eq!(detector.observe("نص واحد 1"), (true, true));
        assert_eq!(detector.observe("نص واحد 2"), (false, true));
        assert_eq!(detector.observe("نص آخر"), (false, false));

        let stats = detector.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.exact_duplicates, 1);
        assert_eq!(stats.near_duplicates, 2);
        assert!((stats.exact_duplicate_rate - 0.25).abs() < 1e-9);
        assert!((stats.near_duplicate_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_empty_detector() {
        let stats = DuplicateDetector::new().stats();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.exact_duplicate_rate, 0.0);
    }
}

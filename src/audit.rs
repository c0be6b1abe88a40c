//! Pre-cleaning health check for raw extraction files.
//!
//! Cheap per-file statistics that say whether a page stream needs the full
//! cleaning pass, and why.

use crate::batch::discover_inputs;
use crate::error::{IoResultExt, Result};
use crate::model::PageRecord;
use crate::pipeline::raw_lines;
use crate::report::FileFailure;
use crate::script::{arabic_ratio, digit_ratio};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Verdict thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AuditThresholds {
    /// Minimum average arabic ratio (non-English files).
    pub avg_arabic_min: f64,
    /// A record counts as low-arabic below this ratio.
    pub low_arabic_lt: f64,
    /// Maximum share of low-arabic records (non-English files).
    pub low_arabic_share_max: f64,
    /// A record counts as digit-heavy above this ratio.
    pub high_digit_gt: f64,
    /// Maximum share of digit-heavy records.
    pub high_digit_share_max: f64,
    pub avg_len_min_arabic: f64,
    pub avg_len_min_english: f64,
}

impl Default for AuditThresholds {
    fn default() -> Self {
        Self {
            avg_arabic_min: 0.25,
            low_arabic_lt: 0.30,
            low_arabic_share_max: 0.10,
            high_digit_gt: 0.60,
            high_digit_share_max: 0.05,
            avg_len_min_arabic: 120.0,
            avg_len_min_english: 80.0,
        }
    }
}

/// Why a file needs cleaning.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AuditReason {
    NoRecords,
    EmptyTexts { count: usize },
    LowAverageArabic { avg: f64, min: f64 },
    ManyLowArabic { share: f64, max: f64 },
    ShortAverageLength { avg: f64, min: f64 },
    ManyDigitHeavy { share: f64, max: f64 },
}

impl fmt::Display for AuditReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditReason::NoRecords => write!(f, "file has no records"),
            AuditReason::EmptyTexts { count } => write!(f, "{count} empty text(s)"),
            AuditReason::LowAverageArabic { avg, min } => {
                write!(f, "low average arabic ratio ({avg:.2} < {min})")
            }
            AuditReason::ManyLowArabic { share, max } => write!(
                f,
                "many low-arabic records ({:.1}% > {:.0}%)",
                share * 100.0,
                max * 100.0
            ),
            AuditReason::ShortAverageLength { avg, min } => {
                write!(f, "short average length ({avg:.0} < {min})")
            }
            AuditReason::ManyDigitHeavy { share, max } => write!(
                f,
                "many digit-heavy records ({:.1}% > {:.0}%)",
                share * 100.0,
                max * 100.0
            ),
        }
    }
}

/// Health statistics for one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditReport {
    pub file: PathBuf,
    pub subject: Option<String>,
    pub english: bool,
    pub total: usize,
    pub empty_texts: usize,
    pub avg_len: f64,
    pub avg_arabic: f64,
    pub avg_digit: f64,
    pub high_digit_share: f64,
    pub low_arabic_share: f64,
    pub needs_cleaning: bool,
    pub reasons: Vec<AuditReason>,
}

/// Audit outcome for a directory tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuditResults {
    pub reports: Vec<AuditReport>,
    pub failures: Vec<FileFailure>,
}

impl AuditResults {
    /// Files that need the cleaning pass.
    pub fn needs_cleaning(&self) -> usize {
        self.reports.iter().filter(|r| r.needs_cleaning).count()
    }
}

/// Subject folder of `<subject>/<grade>/<term>/<file>` layouts.
fn subject_from_path(path: &Path) -> Option<String> {
    let parts: Vec<_> = path.components().collect();
    parts
        .len()
        .checked_sub(4)
        .map(|i| parts[i].as_os_str().to_string_lossy().to_lowercase())
}

fn is_english_path(path: &Path, subject: Option<&str>) -> bool {
    subject == Some("english") || path.to_string_lossy().to_lowercase().contains("english")
}

/// Streams raw page records and accumulates audit statistics.
#[derive(Debug, Clone, Default)]
pub struct Auditor {
    thresholds: AuditThresholds,
}

impl Auditor {
    pub fn new(thresholds: AuditThresholds) -> Self {
        Self { thresholds }
    }

    /// Audits the page stream read from `reader`, labelled as `path`.
    pub fn audit_reader<R: BufRead>(&self, path: &Path, reader: R) -> Result<AuditReport> {
        let t = &self.thresholds;
        let subject = subject_from_path(path);
        let english = is_english_path(path, subject.as_deref());

        let mut total = 0usize;
        let mut empty_texts = 0usize;
        let mut sum_len = 0usize;
        let mut sum_ar = 0.0;
        let mut sum_dr = 0.0;
        let mut scored = 0usize;
        let mut high_digit = 0usize;
        let mut low_arabic = 0usize;

        for line in raw_lines(reader) {
            let Some(line) = line? else {
                debug!(file = %path.display(), "skipping record that is not valid UTF-8");
                continue;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Ok(record) = PageRecord::from_json(line) else {
                debug!(file = %path.display(), "skipping malformed record");
                continue;
            };

            total += 1;
            let text = record.text.trim();
            if text.is_empty() {
                empty_texts += 1;
                continue;
            }

            let ar = arabic_ratio(text);
            let dr = digit_ratio(text);
            sum_len += text.chars().count();
            sum_ar += ar;
            sum_dr += dr;
            scored += 1;
            if dr > t.high_digit_gt {
                high_digit += 1;
            }
            if !english && ar < t.low_arabic_lt {
                low_arabic += 1;
            }
        }

        let mut report = AuditReport {
            file: path.to_path_buf(),
            subject,
            english,
            total,
            empty_texts,
            avg_len: 0.0,
            avg_arabic: 0.0,
            avg_digit: 0.0,
            high_digit_share: 0.0,
            low_arabic_share: 0.0,
            needs_cleaning: true,
            reasons: Vec::new(),
        };

        if total == 0 {
            report.reasons.push(AuditReason::NoRecords);
            return Ok(report);
        }

        let per = |n: f64, d: usize| if d == 0 { 0.0 } else { n / d as f64 };
        report.avg_len = per(sum_len as f64, total);
        report.avg_arabic = per(sum_ar, scored);
        report.avg_digit = per(sum_dr, scored);
        report.high_digit_share = per(high_digit as f64, total);
        report.low_arabic_share = per(low_arabic as f64, total);
        report.reasons = self.reasons(&report);
        report.needs_cleaning = !report.reasons.is_empty();
        Ok(report)
    }

    /// Audits one file.
    pub fn audit_file(&self, path: &Path) -> Result<AuditReport> {
        let reader = BufReader::new(File::open(path).with_path(path)?);
        self.audit_reader(path, reader)
    }

    /// Audits every `*.jsonl` file under `root`. A file that cannot be read
    /// is recorded as a failure; only input discovery errors are returned.
    pub fn audit_path(&self, root: &Path) -> Result<AuditResults> {
        Ok(self.audit_files(&discover_inputs(root)?))
    }

    /// Audits each file in turn, recording unreadable ones as failures.
    pub fn audit_files(&self, files: &[PathBuf]) -> AuditResults {
        let mut results = AuditResults::default();
        for file in files {
            match self.audit_file(file) {
                Ok(report) => results.reports.push(report),
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "audit failed");
                    results.failures.push(FileFailure {
                        file: file.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
        results
    }

    fn reasons(&self, r: &AuditReport) -> Vec<AuditReason> {
        let t = &self.thresholds;
        let mut reasons = Vec::new();

        if r.empty_texts > 0 {
            reasons.push(AuditReason::EmptyTexts { count: r.empty_texts });
        }

        let min_len = if r.english {
            t.avg_len_min_english
        } else {
            if r.avg_arabic < t.avg_arabic_min {
                reasons.push(AuditReason::LowAverageArabic {
                    avg: r.avg_arabic,
                    min: t.avg_arabic_min,
                });
            }
            if r.low_arabic_share > t.low_arabic_share_max {
                reasons.push(AuditReason::ManyLowArabic {
                    share: r.low_arabic_share,
                    max: t.low_arabic_share_max,
                });
            }
            t.avg_len_min_arabic
        };

        if r.avg_len < min_len {
            reasons.push(AuditReason::ShortAverageLength {
                avg: r.avg_len,
                min: min_len,
            });
        }
        if r.high_digit_share > t.high_digit_share_max {
            reasons.push(AuditReason::ManyDigitHeavy {
                share: r.high_digit_share,
                max: t.high_digit_share_max,
            });
        }

        reasons
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn line(text: &str) -> String {
        serde_json::json!({ "text": text, "metadata": {} }).to_string()
    }

    fn long_arabic() -> String {
        vec!["القراءة مفتاح المعرفة"; 10].join(" ")
    }

    #[test]
    fn test_subject_from_path() {
        let path = Path::new("Basic/english/g4/t1/book.jsonl");
        assert_eq!(subject_from_path(path).as_deref(), Some("english"));
        assert_eq!(subject_from_path(Path::new("a/b.jsonl")), None);
    }

    #[test]
    fn test_clean_arabic_file() {
        let input = [line(&long_arabic()), line(&long_arabic())].join("\n");
        let report = Auditor::default()
            .audit_reader(Path::new("Basic/arabic/g1/t1/a.jsonl"), Cursor::new(input))
            .unwrap();
        assert_eq!(report.total, 2);
        assert!(!report.english);
        assert!(!report.needs_cleaning, "{:?}", report.reasons);
        assert_eq!(report.avg_arabic, 1.0);
    }

    #[test]
    fn test_noisy_file_reasons() {
        let input = [
            line(&long_arabic()),
            line(""),
            line("1234567890 page 12"),
            "not json".to_string(),
        ]
        .join("\n");
        let report = Auditor::default()
            .audit_reader(Path::new("Basic/science/g1/t1/s.jsonl"), Cursor::new(input))
            .unwrap();

        assert_eq!(report.total, 3);
        assert_eq!(report.empty_texts, 1);
        assert!(report.needs_cleaning);
        assert!(report.reasons.contains(&AuditReason::EmptyTexts { count: 1 }));
        assert!(report
            .reasons
            .iter()
            .any(|r| matches!(r, AuditReason::ManyLowArabic { .. })));
        assert!(report
            .reasons
            .iter()
            .any(|r| matches!(r, AuditReason::ManyDigitHeavy { .. })));
    }

    #[test]
    fn test_english_ignores_arabic_ratio() {
        let text = "Reading is the key to knowledge and every student should read daily at home.";
        let input = [line(text), line(text)].join("\n");
        let report = Auditor::default()
            .audit_reader(Path::new("Basic/English/g2/t1/e.jsonl"), Cursor::new(input))
            .unwrap();
        assert!(report.english);
        assert_eq!(report.low_arabic_share, 0.0);
        assert!(!report
            .reasons
            .iter()
            .any(|r| matches!(r, AuditReason::LowAverageArabic { .. } | AuditReason::ManyLowArabic { .. })));
    }

    #[test]
    fn test_invalid_utf8_record_is_skipped() {
        let mut input = line(&long_arabic()).into_bytes();
        input.extend_from_slice(b"\n{\"text\":\"\xFF\"}\n");
        input.extend_from_slice(line(&long_arabic()).as_bytes());
        let report = Auditor::default()
            .audit_reader(Path::new("Basic/arabic/g1/t1/a.jsonl"), Cursor::new(input))
            .unwrap();
        assert_eq!(report.total, 2);
        assert!(!report.needs_cleaning, "{:?}", report.reasons);
    }

    #[test]
    fn test_unreadable_file_does_not_stop_audit() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a.jsonl");
        let missing = dir.path().join("b.jsonl");
        std::fs::write(&good, line(&long_arabic())).unwrap();

        let results = Auditor::default().audit_files(&[missing.clone(), good.clone()]);
        assert_eq!(results.reports.len(), 1);
        assert_eq!(results.reports[0].file, good);
        assert_eq!(results.needs_cleaning(), 0);
        assert_eq!(results.failures.len(), 1);
        assert_eq!(results.failures[0].file, missing);

        let results = Auditor::default().audit_path(dir.path()).unwrap();
        assert_eq!(results.reports.len(), 1);
        assert!(results.failures.is_empty());
    }

    #[test]
    fn test_no_records() {
        let report = Auditor::default()
            .audit_reader(Path::new("x.jsonl"), Cursor::new("\n\n"))
            .unwrap();
        assert!(report.needs_cleaning);
        assert_eq!(report.reasons, vec![AuditReason::NoRecords]);
        assert_eq!(AuditReason::NoRecords.to_string(), "file has no records");
    }
}

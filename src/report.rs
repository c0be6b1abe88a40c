//! Quality reporting.
//!
//! [`ReportAggregator`] consumes scored chunks one at a time and produces a
//! [`QualityReport`]: descriptive statistics, flag counts, a quality
//! histogram, duplicate rates, the worst-N chunks and an optional self-test
//! that checks the scorer still reacts to synthetic corruption.
//!
//! The `write_*` functions persist reports as pretty JSON and TSV.

use crate::dedup::{DuplicateDetector, DuplicateStats};
use crate::domain::Domain;
use crate::error::{IoResultExt, Result};
use crate::model::{Chunk, ChunkInput};
use crate::options::CleaningProfile;
use crate::quality::{is_noisy, FlagSet, QualityScorer, ACCEPT_THRESHOLD};
use crate::script::{is_arabic, ScriptProfile};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Seed for self-test sampling.
pub const SELF_TEST_SEED: u64 = 123;

/// Filler appended to every corrupted self-test sample.
const SELF_TEST_FILLER: &str = " lorem ipsum 12345 lorem ipsum 12345";

/// Histogram bucket edges. The last bucket includes 100.
const HISTOGRAM_EDGES: [u32; 7] = [0, 50, 60, 70, 80, 90, 100];

pub const SUMMARY_FILE: &str = "summary.json";
pub const METRICS_FILE: &str = "chunks_metrics.tsv";
pub const WORST_FILE: &str = "worst_samples.tsv";
pub const CORPUS_JSON_FILE: &str = "ALL_results.json";
pub const CORPUS_TSV_FILE: &str = "ALL_results.tsv";

fn round_to(x: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (x * factor).round() / factor
}

/// Descriptive statistics, rounded to 4 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Stats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    /// Population standard deviation.
    pub stdev: f64,
}

impl Stats {
    /// All zeros for empty input.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        Self {
            count: values.len(),
            mean: round_to(mean, 4),
            median: round_to(median, 4),
            min: round_to(sorted[0], 4),
            max: round_to(sorted[sorted.len() - 1], 4),
            stdev: round_to(variance.sqrt(), 4),
        }
    }
}

/// Fixed-bucket quality histogram, keyed `"0-50"` .. `"90-100"`.
pub fn quality_histogram(scores: &[f64]) -> BTreeMap<String, usize> {
    let mut buckets: BTreeMap<String, usize> = HISTOGRAM_EDGES
        .windows(2)
        .map(|w| (format!("{}-{}", w[0], w[1]), 0))
        .collect();

    let last = HISTOGRAM_EDGES.len() - 2;
    for &score in scores {
        let idx = HISTOGRAM_EDGES
            .windows(2)
            .position(|w| score >= w[0] as f64 && score < w[1] as f64)
            .unwrap_or(last);
        let key = format!("{}-{}", HISTOGRAM_EDGES[idx], HISTOGRAM_EDGES[idx + 1]);
        if let Some(count) = buckets.get_mut(&key) {
            *count += 1;
        }
    }
    buckets
}

/// Per-chunk metrics row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkMetrics {
    pub page: Option<u32>,
    pub chunk_id: Option<u32>,
    pub chars: usize,
    pub words: usize,
    pub arabic_ratio: f64,
    pub digit_ratio: f64,
    pub latin_ratio: f64,
    pub punct_ratio: f64,
    pub has_math: bool,
    pub quality: f64,
    pub flags: FlagSet,
    pub text: String,
}

impl ChunkMetrics {
    fn new(
        text: &str,
        page: Option<u32>,
        chunk_id: Option<u32>,
        profile: &ScriptProfile,
        quality: f64,
        flags: FlagSet,
    ) -> Self {
        Self {
            page,
            chunk_id,
            chars: profile.chars,
            words: profile.words,
            arabic_ratio: round_to(profile.arabic_ratio, 4),
            digit_ratio: round_to(profile.digit_ratio, 4),
            latin_ratio: round_to(profile.latin_ratio, 4),
            punct_ratio: round_to(profile.punct_ratio, 4),
            has_math: profile.has_math,
            quality,
            flags,
            text: text.to_string(),
        }
    }

    pub fn is_noisy(&self) -> bool {
        is_noisy(self.quality, &self.flags)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Aggregates {
    pub quality: Stats,
    pub chars: Stats,
    pub arabic_ratio: Stats,
    pub digit_ratio: Stats,
    pub latin_ratio: Stats,
    pub punct_ratio: Stats,
}

/// Result of the corruption self-test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SelfTestResult {
    pub tested_samples: usize,
    pub clean_quality_mean: f64,
    pub noisy_quality_mean: f64,
    pub below70_rate: f64,
}

/// Serializable part of a quality report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualitySummary {
    pub total_chunks: usize,
    pub noisy_chunks: usize,
    pub noise_rate: f64,
    pub data_cleanliness_percent: f64,
    pub flag_counts: BTreeMap<String, usize>,
    pub duplicates: DuplicateStats,
    pub aggregates: Aggregates,
    pub quality_histogram: BTreeMap<String, usize>,
    pub self_test: Option<SelfTestResult>,
}

/// Finished report for one chunk stream.
#[derive(Debug, Clone)]
pub struct QualityReport {
    pub summary: QualitySummary,
    /// Every chunk, in input order.
    pub rows: Vec<ChunkMetrics>,
    /// Lowest-quality chunks, ascending; ties keep input order.
    pub worst: Vec<ChunkMetrics>,
}

/// What to compute when finishing a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSettings {
    pub worst_n: usize,
    /// Self-test sample size, or `None` to skip the self-test.
    pub self_test: Option<usize>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            worst_n: 20,
            self_test: None,
        }
    }
}

/// Streaming aggregator over scored chunks.
#[derive(Debug)]
pub struct ReportAggregator<'a> {
    scorer: QualityScorer<'a>,
    rows: Vec<ChunkMetrics>,
    duplicates: DuplicateDetector,
}

impl<'a> ReportAggregator<'a> {
    pub fn new(scorer: QualityScorer<'a>) -> Self {
        Self {
            scorer,
            rows: Vec::new(),
            duplicates: DuplicateDetector::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Records an already scored chunk.
    pub fn record(&mut self, chunk: &Chunk, profile: &ScriptProfile) {
        self.duplicates.observe(&chunk.text);
        self.rows.push(ChunkMetrics::new(
            &flatten(&chunk.text),
            chunk.page,
            Some(chunk.chunk_id),
            profile,
            chunk.quality,
            chunk.flags.clone(),
        ));
    }

    /// Scores and records a chunk read back from disk. Empty text is skipped.
    pub fn record_input(&mut self, input: &ChunkInput) -> bool {
        let text = input.text.trim();
        if text.is_empty() {
            return false;
        }
        let assessment = self.scorer.assess(text);
        self.duplicates.observe(text);
        self.rows.push(ChunkMetrics::new(
            &flatten(text),
            input.page,
            input.chunk_id,
            &assessment.profile,
            assessment.score,
            assessment.flags,
        ));
        true
    }

    pub fn finish(self, settings: ReportSettings) -> QualityReport {
        let rows = self.rows;
        let total = rows.len();

        let column = |f: fn(&ChunkMetrics) -> f64| rows.iter().map(f).collect::<Vec<_>>();
        let qualities = column(|r| r.quality);

        let noisy_chunks = rows.iter().filter(|r| r.is_noisy()).count();
        let noise_rate = round_to(noisy_chunks as f64 / total.max(1) as f64, 4);

        let mut flag_counts = BTreeMap::new();
        for flag in rows.iter().flat_map(|r| r.flags.iter()) {
            *flag_counts.entry(flag.to_string()).or_insert(0) += 1;
        }

        let aggregates = Aggregates {
            quality: Stats::from_values(&qualities),
            chars: Stats::from_values(&column(|r| r.chars as f64)),
            arabic_ratio: Stats::from_values(&column(|r| r.arabic_ratio)),
            digit_ratio: Stats::from_values(&column(|r| r.digit_ratio)),
            latin_ratio: Stats::from_values(&column(|r| r.latin_ratio)),
            punct_ratio: Stats::from_values(&column(|r| r.punct_ratio)),
        };

        let self_test = settings
            .self_test
            .filter(|_| total > 0)
            .map(|n| run_self_test(&self.scorer, &rows, n));

        let worst = worst_n(&rows, settings.worst_n);

        let mut duplicates = self.duplicates.stats();
        duplicates.exact_duplicate_rate = round_to(duplicates.exact_duplicate_rate, 4);
        duplicates.near_duplicate_rate = round_to(duplicates.near_duplicate_rate, 4);

        QualityReport {
            summary: QualitySummary {
                total_chunks: total,
                noisy_chunks,
                noise_rate,
                data_cleanliness_percent: round_to((1.0 - noise_rate) * 100.0, 2),
                flag_counts,
                duplicates,
                aggregates,
                quality_histogram: quality_histogram(&qualities),
                self_test,
            },
            rows,
            worst,
        }
    }
}

fn flatten(text: &str) -> String {
    text.replace(['\n', '\r', '\t'], " ").trim().to_string()
}

/// Lowest-quality rows, stable by input order.
pub fn worst_n(rows: &[ChunkMetrics], n: usize) -> Vec<ChunkMetrics> {
    let mut ranked: Vec<&ChunkMetrics> = rows.iter().collect();
    ranked.sort_by(|a, b| a.quality.total_cmp(&b.quality));
    ranked.into_iter().take(n).cloned().collect()
}

/// Strips Arabic characters and appends Latin/digit filler.
pub fn corrupt(text: &str) -> String {
    let mut corrupted: String = text.chars().filter(|c| !is_arabic(*c)).collect();
    corrupted.push_str(SELF_TEST_FILLER);
    corrupted
}

fn run_self_test(scorer: &QualityScorer<'_>, rows: &[ChunkMetrics], sample_n: usize) -> SelfTestResult {
    let mut rng = StdRng::seed_from_u64(SELF_TEST_SEED);
    let amount = sample_n.min(rows.len());
    let sample: Vec<&ChunkMetrics> = rows.choose_multiple(&mut rng, amount).collect();

    let clean: Vec<f64> = sample.iter().map(|r| r.quality).collect();
    let noisy: Vec<f64> = sample.iter().map(|r| scorer.score(&corrupt(&r.text))).collect();
    let below = noisy.iter().filter(|q| **q < ACCEPT_THRESHOLD).count();

    let mean = |v: &[f64]| {
        if v.is_empty() {
            0.0
        } else {
            round_to(v.iter().sum::<f64>() / v.len() as f64, 2)
        }
    };

    SelfTestResult {
        tested_samples: sample.len(),
        clean_quality_mean: mean(&clean),
        noisy_quality_mean: mean(&noisy),
        below70_rate: round_to(below as f64 / noisy.len().max(1) as f64, 4),
    }
}

/// Page admission counters for a cleaning run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PageCounts {
    pub records: usize,
    pub malformed: usize,
    pub empty: usize,
    pub too_short: usize,
    pub low_arabic: usize,
    pub degenerate: usize,
    pub kept: usize,
    pub chunks_produced: usize,
    pub chunks_gated: usize,
    pub chunks_emitted: usize,
}

/// Everything known about one processed file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub input_file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
    pub domain: Domain,
    pub strict_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<CleaningProfile>,
    /// Present for cleaning runs, absent when evaluating chunked files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<PageCounts>,
    /// Malformed lines seen while evaluating.
    pub skipped_lines: usize,
    #[serde(flatten)]
    pub quality: QualitySummary,
    #[serde(skip)]
    pub rows: Vec<ChunkMetrics>,
    #[serde(skip)]
    pub worst: Vec<ChunkMetrics>,
}

impl FileReport {
    pub fn new(input_file: impl Into<PathBuf>, domain: Domain, strict_mode: bool, report: QualityReport) -> Self {
        Self {
            input_file: input_file.into(),
            output_file: None,
            domain,
            strict_mode,
            profile: None,
            pages: None,
            skipped_lines: 0,
            quality: report.summary,
            rows: report.rows,
            worst: report.worst,
        }
    }

    /// Writes `summary.json`, `chunks_metrics.tsv` and `worst_samples.tsv`.
    pub fn write_to_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).with_path(dir)?;
        write_json(&dir.join(SUMMARY_FILE), self)?;
        write_metrics_tsv(&dir.join(METRICS_FILE), &self.rows)?;
        write_worst_tsv(&dir.join(WORST_FILE), &self.worst)?;
        Ok(())
    }
}

/// One line of the corpus table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub domain: Domain,
    pub total_chunks: usize,
    pub noisy_chunks: usize,
    pub noise_rate: f64,
    pub data_cleanliness_percent: f64,
    pub quality_mean: f64,
    pub exact_duplicates: usize,
    pub near_duplicates: usize,
    #[serde(skip)]
    pub flag_counts: BTreeMap<String, usize>,
    pub report_dir: PathBuf,
}

impl FileResult {
    pub fn from_report(report: &FileReport, report_dir: impl Into<PathBuf>) -> Self {
        let q = &report.quality;
        Self {
            file: report.input_file.clone(),
            domain: report.domain,
            total_chunks: q.total_chunks,
            noisy_chunks: q.noisy_chunks,
            noise_rate: q.noise_rate,
            data_cleanliness_percent: q.data_cleanliness_percent,
            quality_mean: q.aggregates.quality.mean,
            exact_duplicates: q.duplicates.exact_duplicates,
            near_duplicates: q.duplicates.near_duplicates,
            flag_counts: q.flag_counts.clone(),
            report_dir: report_dir.into(),
        }
    }
}

/// A file that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub file: PathBuf,
    pub error: String,
}

/// Totals across every processed file.
///
/// Duplicates are detected within each file and summed; chunks repeated
/// across files are not matched against each other.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CorpusSummary {
    pub files: usize,
    pub failed_files: usize,
    pub total_chunks: usize,
    pub noisy_chunks: usize,
    pub noise_rate: f64,
    pub data_cleanliness_percent: f64,
    /// Mean chunk quality, weighted by each file's chunk count.
    pub quality_mean: f64,
    pub flag_counts: BTreeMap<String, usize>,
    pub exact_duplicates: usize,
    pub near_duplicates: usize,
    pub exact_duplicate_rate: f64,
    pub near_duplicate_rate: f64,
}

impl CorpusSummary {
    pub fn from_results(results: &[FileResult], failed_files: usize) -> Self {
        let total_chunks: usize = results.iter().map(|r| r.total_chunks).sum();
        let noisy_chunks: usize = results.iter().map(|r| r.noisy_chunks).sum();
        let exact_duplicates: usize = results.iter().map(|r| r.exact_duplicates).sum();
        let near_duplicates: usize = results.iter().map(|r| r.near_duplicates).sum();

        let mut flag_counts = BTreeMap::new();
        for (flag, count) in results.iter().flat_map(|r| r.flag_counts.iter()) {
            *flag_counts.entry(flag.clone()).or_insert(0) += count;
        }

        let denom = total_chunks.max(1) as f64;
        let weighted_quality: f64 = results
            .iter()
            .map(|r| r.quality_mean * r.total_chunks as f64)
            .sum();
        let noise_rate = round_to(noisy_chunks as f64 / denom, 4);

        Self {
            files: results.len(),
            failed_files,
            total_chunks,
            noisy_chunks,
            noise_rate,
            data_cleanliness_percent: round_to((1.0 - noise_rate) * 100.0, 2),
            quality_mean: round_to(weighted_quality / denom, 4),
            flag_counts,
            exact_duplicates,
            near_duplicates,
            exact_duplicate_rate: round_to(exact_duplicates as f64 / denom, 4),
            near_duplicate_rate: round_to(near_duplicates as f64 / denom, 4),
        }
    }
}

/// Corpus-wide results across all files of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CorpusReport {
    pub summary: CorpusSummary,
    pub results: Vec<FileResult>,
    pub failures: Vec<FileFailure>,
}

impl CorpusReport {
    pub fn new(results: Vec<FileResult>, failures: Vec<FileFailure>) -> Self {
        Self {
            summary: CorpusSummary::from_results(&results, failures.len()),
            results,
            failures,
        }
    }

    pub fn total_chunks(&self) -> usize {
        self.summary.total_chunks
    }

    /// Writes `ALL_results.json` and `ALL_results.tsv` into `dir`. The TSV
    /// ends with a `TOTAL` row.
    pub fn write_to_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir).with_path(dir)?;
        write_json(&dir.join(CORPUS_JSON_FILE), self)?;

        let path = dir.join(CORPUS_TSV_FILE);
        let mut w = create(&path)?;
        writeln!(
            w,
            "file\tdomain\ttotal_chunks\tnoise_rate\tdata_cleanliness_percent\tquality_mean\treport_dir\terror"
        )
        .with_path(&path)?;
        for r in &self.results {
            writeln!(
                w,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t",
                tsv_field(&r.file.display().to_string()),
                r.domain,
                r.total_chunks,
                r.noise_rate,
                r.data_cleanliness_percent,
                r.quality_mean,
                tsv_field(&r.report_dir.display().to_string()),
            )
            .with_path(&path)?;
        }
        for f in &self.failures {
            writeln!(
                w,
                "{}\t\t\t\t\t\t\t{}",
                tsv_field(&f.file.display().to_string()),
                tsv_field(&f.error)
            )
            .with_path(&path)?;
        }
        let t = &self.summary;
        writeln!(
            w,
            "TOTAL\t\t{}\t{}\t{}\t{}\t\t",
            t.total_chunks, t.noise_rate, t.data_cleanliness_percent, t.quality_mean
        )
        .with_path(&path)?;
        w.flush().with_path(&path)
    }
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(path).with_path(path)?))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut w = create(path)?;
    serde_json::to_writer_pretty(&mut w, value)?;
    writeln!(w).with_path(path)?;
    w.flush().with_path(path)
}

fn tsv_field(s: &str) -> String {
    s.replace(['\t', '\n', '\r'], " ")
}

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

fn joined_flags(flags: &FlagSet) -> String {
    flags.iter().map(|f| f.as_str()).collect::<Vec<_>>().join("|")
}

/// Per-chunk metrics table.
pub fn write_metrics_tsv(path: &Path, rows: &[ChunkMetrics]) -> Result<()> {
    let mut w = create(path)?;
    writeln!(
        w,
        "page\tchunk_id\tchars\twords\tarabic_ratio\tdigit_ratio\tlatin_ratio\tpunct_ratio\thas_math\tquality\tflags\ttext"
    )
    .with_path(path)?;
    for r in rows {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            opt(r.page),
            opt(r.chunk_id),
            r.chars,
            r.words,
            r.arabic_ratio,
            r.digit_ratio,
            r.latin_ratio,
            r.punct_ratio,
            u8::from(r.has_math),
            r.quality,
            joined_flags(&r.flags),
            tsv_field(&r.text),
        )
        .with_path(path)?;
    }
    w.flush().with_path(path)
}

/// Worst-sample table, quality first.
pub fn write_worst_tsv(path: &Path, rows: &[ChunkMetrics]) -> Result<()> {
    let mut w = create(path)?;
    writeln!(
        w,
        "quality\tflags\tpage\tchunk_id\tchars\tarabic_ratio\tdigit_ratio\tlatin_ratio\tpunct_ratio\thas_math\ttext"
    )
    .with_path(path)?;
    for r in rows {
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            r.quality,
            joined_flags(&r.flags),
            opt(r.page),
            opt(r.chunk_id),
            r.chars,
            r.arabic_ratio,
            r.digit_ratio,
            r.latin_ratio,
            r.punct_ratio,
            u8::from(r.has_math),
            tsv_field(&r.text),
        )
        .with_path(path)?;
    }
    w.flush().with_path(path)
}

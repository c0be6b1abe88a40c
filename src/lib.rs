//! # ocrchunk
//!
//! Turns noisy OCR'd page text into quality-tagged, size-bounded chunks for
//! retrieval indexing.
//!
//! ## Pipeline
//!
//! - **Normalize**: NFKC, Arabic-Indic digit transliteration, control and
//!   bidi stripping, whitespace collapsing
//! - **Filter**: per-line OCR noise removal
//! - **Chunk**: sentence-aware packing into a `[min, max]` char window
//! - **Score**: domain-aware 0-100 quality score and flags
//! - **Report**: statistics, duplicates, worst samples, scorer self-test
//!
//! ## Quick Start
//!
//! ```no_run
//! use ocrchunk::{clean_file, PipelineOptions};
//!
//! fn main() -> ocrchunk::Result<()> {
//!     let options = PipelineOptions::default();
//!     let report = clean_file("pages.jsonl", "pages_clean_chunked.jsonl", &options)?;
//!     println!("noise rate: {}", report.quality.noise_rate);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `async`: Tokio wrappers in [`async_api`]

pub mod audit;
pub mod batch;
pub mod chunker;
pub mod dedup;
pub mod domain;
pub mod error;
pub mod model;
pub mod noise;
pub mod normalize;
pub mod options;
pub mod pipeline;
pub mod quality;
pub mod report;
pub mod script;

#[cfg(feature = "async")]
pub mod async_api;

// Re-exports
pub use audit::{AuditReason, AuditReport, AuditResults, AuditThresholds, Auditor};
pub use batch::{discover_inputs, BatchRunner};
pub use chunker::Chunker;
pub use dedup::{exact_fingerprint, near_fingerprint, DuplicateDetector};
pub use domain::{Domain, DomainConfig, ScoringMode};
pub use error::{Error, Result};
pub use model::{Chunk, ChunkInput, PageRecord};
pub use normalize::normalize;
pub use options::{ChunkOptions, CleaningProfile, DropGate, LineFilterOptions, PipelineOptions};
pub use pipeline::{PageOutcome, Pipeline};
pub use quality::{Flag, FlagSet, QualityScorer, ACCEPT_THRESHOLD};
pub use report::{CorpusReport, CorpusSummary, FileReport};

use std::path::{Path, PathBuf};

/// Chunks and scores a single page under an explicit domain.
///
/// Returns no chunks when the page is dropped at admission or every line is
/// noise.
///
/// # Example
///
/// ```
/// use ocrchunk::{chunk_page, Domain, PageRecord, PipelineOptions};
///
/// let text = "الطلاب يتعلمون القراءة والكتابة في المدرسة كل يوم. ".repeat(20);
/// let chunks = chunk_page(&PageRecord::new(text), &PipelineOptions::default(), Domain::Textual);
/// assert!(!chunks.is_empty());
/// assert_eq!(chunks[0].chunk_id, 1);
/// ```
pub fn chunk_page(page: &PageRecord, options: &PipelineOptions, domain: Domain) -> Vec<Chunk> {
    let config = options.domain_config(domain);
    match Pipeline::new(options, &config).process_page(page) {
        PageOutcome::Chunks { chunks, .. } => chunks.into_iter().map(|s| s.chunk).collect(),
        _ => Vec::new(),
    }
}

/// Cleans one page file into a chunk file.
pub fn clean_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &PipelineOptions,
) -> Result<FileReport> {
    options.validate()?;
    let input = input.as_ref();
    pipeline::with_pipeline(options, input, |p| p.clean_file(input, output.as_ref()))
}

/// Re-scores an already chunked file.
pub fn evaluate_file(input: impl AsRef<Path>, options: &PipelineOptions) -> Result<FileReport> {
    let input = input.as_ref();
    pipeline::with_pipeline(options, input, |p| p.evaluate_file(input))
}

/// Cleans every page file under `input`, writing chunks and reports to `out_dir`.
pub fn clean_path(
    input: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    options: &PipelineOptions,
) -> Result<CorpusReport> {
    BatchRunner::new(options, out_dir.as_ref())?.clean(input.as_ref())
}

/// Evaluates every chunk file under `input`, writing reports to `out_dir`.
pub fn evaluate_path(
    input: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    options: &PipelineOptions,
) -> Result<CorpusReport> {
    BatchRunner::new(options, out_dir.as_ref())?.evaluate(input.as_ref())
}

/// Audits raw page files under `input`. Unreadable files are listed in
/// [`AuditResults::failures`].
pub fn audit_path(input: impl AsRef<Path>) -> Result<AuditResults> {
    Auditor::default().audit_path(input.as_ref())
}

/// Builder for cleaning and evaluation runs.
///
/// # Example
///
/// ```no_run
/// use ocrchunk::{Domain, OcrChunk};
///
/// let corpus = OcrChunk::new()
///     .with_domain(Domain::Math)
///     .strict()
///     .with_self_test(30)
///     .clean("Extracted", "Cleaned")?;
/// println!("{} files", corpus.results.len());
/// # Ok::<(), ocrchunk::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct OcrChunk {
    options: PipelineOptions,
}

impl OcrChunk {
    /// Creates a builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from explicit options.
    pub fn with_options(options: PipelineOptions) -> Self {
        Self { options }
    }

    /// Selects a cleaning profile.
    pub fn with_profile(mut self, profile: CleaningProfile) -> Self {
        self.options = self.options.with_profile(profile);
        self
    }

    /// Fixes the scoring domain.
    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.options = self.options.with_domain(domain);
        self
    }

    /// Enables strict scoring.
    pub fn strict(mut self) -> Self {
        self.options = self.options.strict();
        self
    }

    /// Enables the scorer self-test.
    pub fn with_self_test(mut self, sample_n: usize) -> Self {
        self.options = self.options.with_self_test(sample_n);
        self
    }

    /// Sets the chunk window.
    pub fn with_chunk_window(mut self, min: usize, max: usize) -> Self {
        self.options = self.options.with_chunk_window(min, max);
        self
    }

    /// Disables parallel processing.
    pub fn sequential(mut self) -> Self {
        self.options = self.options.sequential();
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Cleans a file or directory into `out_dir`.
    pub fn clean(&self, input: impl AsRef<Path>, out_dir: impl Into<PathBuf>) -> Result<CorpusReport> {
        BatchRunner::new(&self.options, out_dir)?.clean(input.as_ref())
    }

    /// Evaluates a chunked file or directory into `out_dir`.
    pub fn evaluate(&self, input: impl AsRef<Path>, out_dir: impl Into<PathBuf>) -> Result<CorpusReport> {
        BatchRunner::new(&self.options, out_dir)?.evaluate(input.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_options() {
        let builder = OcrChunk::new()
            .with_profile(CleaningProfile::Relaxed)
            .with_domain(Domain::Science)
            .strict()
            .with_self_test(12)
            .with_chunk_window(200, 500)
            .sequential();
        let o = builder.options();
        assert_eq!(o.profile, CleaningProfile::Relaxed);
        assert_eq!(o.domain, Some(Domain::Science));
        assert!(o.strict && o.self_test && !o.parallel);
        assert_eq!(o.sample_n, 12);
        assert_eq!((o.chunk.min, o.chunk.max), (200, 500));
    }

    #[test]
    fn test_chunk_page_dropped() {
        let chunks = chunk_page(
            &PageRecord::new("short"),
            &PipelineOptions::default(),
            Domain::Textual,
        );
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_clean_file_rejects_invalid_window() {
        let options = PipelineOptions::new().with_chunk_window(0, 10);
        let err = clean_file("missing.jsonl", "out.jsonl", &options).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_evaluate_missing_file() {
        let err = evaluate_file("definitely/missing.jsonl", &PipelineOptions::default()).unwrap_err();
        assert!(matches!(err, Error::FileIo { .. }));
    }
}

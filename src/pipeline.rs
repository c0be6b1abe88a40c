//! # Page Pipeline
//!
//! Drives page records through every stage:
//!
//! 1. **Normalize** - Unicode canonicalization, digit transliteration
//! 2. **Admit** - drop empty, short and non-Arabic pages
//! 3. **Filter lines** - remove OCR noise lines
//! 4. **Chunk** - sentence-aware packing into bounded chunks
//! 5. **Gate** - drop obvious junk chunks before scoring
//! 6. **Score** - domain-aware quality score and flags
//!
//! Emitted chunks are written as JSONL and fed to a [`ReportAggregator`].

use crate::chunker::Chunker;
use crate::domain::{Domain, DomainConfig};
use crate::error::{IoResultExt, Result};
use crate::model::{Chunk, ChunkInput, PageRecord};
use crate::noise::filter_page;
use crate::normalize::normalize;
use crate::options::PipelineOptions;
use crate::quality::{should_drop_profile, QualityScorer};
use crate::report::{FileReport, PageCounts, QualityReport, ReportAggregator};
use crate::script::{arabic_ratio, ScriptProfile};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// A chunk with the profile it was scored from.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub profile: ScriptProfile,
}

/// What became of one page.
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// No text after normalization.
    Empty,
    /// Normalized text shorter than the admission length.
    TooShort,
    /// Normalized text below the admission arabic floor.
    LowArabic,
    /// Every line was noise, or nothing viable was left to chunk.
    Degenerate,
    /// Page admitted. `chunks` holds the survivors of the drop gate with
    /// `chunk_id` 1..N.
    Chunks {
        chunks: Vec<ScoredChunk>,
        produced: usize,
        gated: usize,
    },
}

impl PageOutcome {
    fn reason(&self) -> &'static str {
        match self {
            PageOutcome::Empty => "empty",
            PageOutcome::TooShort => "too short",
            PageOutcome::LowArabic => "low arabic",
            PageOutcome::Degenerate => "degenerate",
            PageOutcome::Chunks { .. } => "kept",
        }
    }
}

/// Newline-delimited records read as raw bytes.
///
/// Yields `None` for a line that is not valid UTF-8, so one bad record never
/// ends the stream. Only read failures are errors.
pub(crate) struct RawLines<R> {
    reader: R,
    buf: Vec<u8>,
}

pub(crate) fn raw_lines<R: BufRead>(reader: R) -> RawLines<R> {
    RawLines {
        reader,
        buf: Vec::new(),
    }
}

impl<R: BufRead> Iterator for RawLines<R> {
    type Item = io::Result<Option<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => Some(Ok(String::from_utf8(std::mem::take(&mut self.buf)).ok())),
            Err(e) => Some(Err(e)),
        }
    }
}

/// One configured run over a single domain.
#[derive(Debug, Clone)]
pub struct Pipeline<'a> {
    options: &'a PipelineOptions,
    config: &'a DomainConfig,
    chunker: Chunker,
}

impl<'a> Pipeline<'a> {
    pub fn new(options: &'a PipelineOptions, config: &'a DomainConfig) -> Self {
        Self {
            options,
            config,
            chunker: Chunker::new(options.chunk),
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        self.options
    }

    pub fn config(&self) -> &DomainConfig {
        self.config
    }

    pub fn scorer(&self) -> QualityScorer<'a> {
        QualityScorer::new(self.config)
    }

    /// Runs one page through normalization, filtering, chunking, gating and
    /// scoring.
    pub fn process_page(&self, page: &PageRecord) -> PageOutcome {
        let opts = self.options;

        if page.text.trim().is_empty() {
            return PageOutcome::Empty;
        }
        let normalized = normalize(&page.text, opts.strip_diacritics);
        if normalized.is_empty() {
            return PageOutcome::Empty;
        }
        if normalized.chars().count() < opts.min_page_len {
            return PageOutcome::TooShort;
        }
        if arabic_ratio(&normalized) < opts.page_arabic_floor {
            return PageOutcome::LowArabic;
        }

        let filtered = filter_page(&normalized, &opts.line_filter);
        if filtered.is_empty() {
            return PageOutcome::Degenerate;
        }

        let pieces = self.chunker.chunk(&filtered);
        if pieces.is_empty() {
            return PageOutcome::Degenerate;
        }

        let produced = pieces.len();
        let scorer = self.scorer();
        let mut chunks = Vec::with_capacity(produced);

        for text in pieces {
            let profile = ScriptProfile::of(&text);
            if should_drop_profile(&profile, &opts.drop_gate) {
                continue;
            }
            let assessment = scorer.assess_profile(profile);
            chunks.push(ScoredChunk {
                chunk: Chunk {
                    page: page.page,
                    chunk_id: chunks.len() as u32 + 1,
                    subject: page.subject.clone(),
                    grade: page.grade.clone(),
                    source: page.source.clone(),
                    has_math: profile.has_math,
                    quality: assessment.score,
                    flags: assessment.flags,
                    text,
                },
                profile,
            });
        }

        PageOutcome::Chunks {
            gated: produced - chunks.len(),
            produced,
            chunks,
        }
    }

    /// Cleans a JSONL page stream into a JSONL chunk stream.
    ///
    /// Blank lines are ignored and malformed lines are counted; neither is an
    /// error.
    pub fn clean<R: BufRead, W: Write>(&self, reader: R, mut writer: W) -> Result<(QualityReport, PageCounts)> {
        let mut counts = PageCounts::default();
        let mut aggregator = ReportAggregator::new(self.scorer());

        for (idx, line) in raw_lines(reader).enumerate() {
            let Some(line) = line? else {
                debug!(line = idx + 1, "skipping record that is not valid UTF-8");
                counts.records += 1;
                counts.malformed += 1;
                continue;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            counts.records += 1;

            let page = match PageRecord::from_json(line) {
                Ok(page) => page,
                Err(e) => {
                    debug!(line = idx + 1, error = %e, "skipping malformed record");
                    counts.malformed += 1;
                    continue;
                }
            };

            let outcome = self.process_page(&page);
            match outcome {
                PageOutcome::Chunks {
                    chunks,
                    produced,
                    gated,
                } => {
                    counts.kept += 1;
                    counts.chunks_produced += produced;
                    counts.chunks_gated += gated;
                    counts.chunks_emitted += chunks.len();
                    for scored in &chunks {
                        writeln!(writer, "{}", scored.chunk.to_json_line()?)?;
                        aggregator.record(&scored.chunk, &scored.profile);
                    }
                }
                other => {
                    debug!(line = idx + 1, page = ?page.page, reason = other.reason(), "dropping page");
                    match other {
                        PageOutcome::Empty => counts.empty += 1,
                        PageOutcome::TooShort => counts.too_short += 1,
                        PageOutcome::LowArabic => counts.low_arabic += 1,
                        _ => counts.degenerate += 1,
                    }
                }
            }
        }

        writer.flush()?;
        Ok((aggregator.finish(self.options.report_settings()), counts))
    }

    /// Re-scores an already chunked JSONL stream. Returns the report and the
    /// number of malformed lines.
    pub fn evaluate<R: BufRead>(&self, reader: R) -> Result<(QualityReport, usize)> {
        let mut skipped = 0;
        let mut aggregator = ReportAggregator::new(self.scorer());

        for (idx, line) in raw_lines(reader).enumerate() {
            let Some(line) = line? else {
                debug!(line = idx + 1, "skipping chunk record that is not valid UTF-8");
                skipped += 1;
                continue;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match ChunkInput::from_json(line) {
                Ok(input) => {
                    aggregator.record_input(&input);
                }
                Err(e) => {
                    debug!(line = idx + 1, error = %e, "skipping malformed chunk record");
                    skipped += 1;
                }
            }
        }

        Ok((aggregator.finish(self.options.report_settings()), skipped))
    }

    /// Cleans `input` into `output`, creating parent directories as needed.
    pub fn clean_file(&self, input: &Path, output: &Path) -> Result<FileReport> {
        let reader = BufReader::new(File::open(input).with_path(input)?);
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).with_path(parent)?;
        }
        let writer = BufWriter::new(File::create(output).with_path(output)?);

        let (report, counts) = match self.clean(reader, writer) {
            Ok(done) => done,
            Err(e) => {
                // Never leave a truncated chunk file behind
                let _ = fs::remove_file(output);
                return Err(e);
            }
        };

        let mut file_report = FileReport::new(input, self.config.domain, self.config.is_strict(), report);
        file_report.output_file = Some(output.to_path_buf());
        file_report.profile = Some(self.options.profile);
        file_report.pages = Some(counts);

        info!(
            input = %input.display(),
            domain = %self.config.domain,
            pages = counts.kept,
            chunks = counts.chunks_emitted,
            "cleaned file"
        );
        Ok(file_report)
    }

    /// Evaluates a chunked file.
    pub fn evaluate_file(&self, input: &Path) -> Result<FileReport> {
        let reader = BufReader::new(File::open(input).with_path(input)?);
        let (report, skipped) = self.evaluate(reader)?;

        let mut file_report = FileReport::new(input, self.config.domain, self.config.is_strict(), report);
        file_report.skipped_lines = skipped;

        info!(
            input = %input.display(),
            domain = %self.config.domain,
            chunks = file_report.quality.total_chunks,
            noise_rate = file_report.quality.noise_rate,
            "evaluated file"
        );
        Ok(file_report)
    }
}

/// Resolves the domain for `path` and runs `f` with a pipeline for it.
pub(crate) fn with_pipeline<T>(
    options: &PipelineOptions,
    path: &Path,
    f: impl FnOnce(&Pipeline<'_>) -> Result<T>,
) -> Result<T> {
    let domain: Domain = options.domain_for(path);
    let config = options.domain_config(domain);
    f(&Pipeline::new(options, &config))
}

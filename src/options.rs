//! Pipeline options for cleaning and chunking.

use crate::domain::{Domain, DomainConfig};
use crate::error::{Error, Result};
use crate::report::ReportSettings;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Named threshold sets for line filtering and the chunk drop gate.
///
/// Two cleaning variants exist in the corpus tooling; both are kept as
/// explicit profiles instead of being collapsed into one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CleaningProfile {
    /// Chunk-drop arabic floor 0.40, line arabic floor 0.25, tolerance 150.
    #[default]
    Standard,
    /// Chunk-drop arabic floor 0.30, line arabic floor 0.20, tolerance 200.
    Relaxed,
}

impl CleaningProfile {
    /// Line-filter thresholds for this profile.
    pub fn line_filter(self) -> LineFilterOptions {
        match self {
            CleaningProfile::Standard => LineFilterOptions::default(),
            CleaningProfile::Relaxed => LineFilterOptions {
                arabic_floor: 0.20,
                ..LineFilterOptions::default()
            },
        }
    }

    /// Chunk drop gate thresholds for this profile.
    pub fn drop_gate(self) -> DropGate {
        match self {
            CleaningProfile::Standard => DropGate::default(),
            CleaningProfile::Relaxed => DropGate {
                arabic_lt: 0.30,
                ..DropGate::default()
            },
        }
    }

    /// Overflow tolerance for force-merging undersized buffers.
    pub fn overflow_tolerance(self) -> usize {
        match self {
            CleaningProfile::Standard => 150,
            CleaningProfile::Relaxed => 200,
        }
    }
}

impl fmt::Display for CleaningProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CleaningProfile::Standard => write!(f, "standard"),
            CleaningProfile::Relaxed => write!(f, "relaxed"),
        }
    }
}

impl FromStr for CleaningProfile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(CleaningProfile::Standard),
            "relaxed" => Ok(CleaningProfile::Relaxed),
            _ => Err(Error::UnknownName {
                kind: "cleaning profile",
                name: s.to_string(),
            }),
        }
    }
}

/// Thresholds for per-line noise removal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineFilterOptions {
    /// Lines with fewer trimmed chars are dropped.
    pub min_line_chars: usize,
    /// Non-math lines above this digit ratio are candidates for dropping.
    pub digit_drop_ratio: f64,
    /// ...and are dropped when their arabic ratio is below this floor.
    pub arabic_floor: f64,
    /// Bare digit runs at least this long are removed from non-math lines.
    pub max_bare_digit_run: usize,
}

impl Default for LineFilterOptions {
    fn default() -> Self {
        Self {
            min_line_chars: 5,
            digit_drop_ratio: 0.60,
            arabic_floor: 0.25,
            max_bare_digit_run: 5,
        }
    }
}

/// Thresholds for the cheap pre-scoring chunk gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DropGate {
    /// Drop chunks whose arabic ratio is below this.
    pub arabic_lt: f64,
    /// Drop chunks above this digit ratio when no math context is present.
    pub digit_gt: f64,
    /// Drop chunks with fewer words.
    pub min_words: usize,
}

impl Default for DropGate {
    fn default() -> Self {
        Self {
            arabic_lt: 0.40,
            digit_gt: 0.40,
            min_words: 5,
        }
    }
}

/// Chunk window bounds, in chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkOptions {
    pub min: usize,
    pub max: usize,
    pub overflow_tolerance: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            min: 400,
            max: 700,
            overflow_tolerance: CleaningProfile::Standard.overflow_tolerance(),
        }
    }
}

impl ChunkOptions {
    /// Chunks shorter than this are discarded after packing.
    pub fn viable_len(&self) -> usize {
        80.min(self.min / 2)
    }
}

/// Options for a cleaning/evaluation run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOptions {
    /// Which cleaning variant the thresholds below came from.
    pub profile: CleaningProfile,
    pub line_filter: LineFilterOptions,
    pub drop_gate: DropGate,
    pub chunk: ChunkOptions,

    /// Normalized pages shorter than this are dropped.
    pub min_page_len: usize,
    /// Normalized pages below this arabic ratio are dropped.
    pub page_arabic_floor: f64,
    /// Remove Arabic tashkeel during normalization.
    pub strip_diacritics: bool,

    /// Explicit domain; inferred from the input path when `None`.
    pub domain: Option<Domain>,
    /// Apply the strict transform to every domain profile.
    pub strict: bool,

    /// Run the corruption self-test on each file.
    pub self_test: bool,
    /// Sample size for the self-test.
    pub sample_n: usize,
    /// How many lowest-quality chunks to report.
    pub worst_n: usize,

    /// Process independent files in parallel.
    pub parallel: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_profile(CleaningProfile::Standard)
    }
}

impl PipelineOptions {
    /// Creates new options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options whose thresholds come from a cleaning profile.
    pub fn from_profile(profile: CleaningProfile) -> Self {
        Self {
            profile,
            line_filter: profile.line_filter(),
            drop_gate: profile.drop_gate(),
            chunk: ChunkOptions {
                overflow_tolerance: profile.overflow_tolerance(),
                ..ChunkOptions::default()
            },
            min_page_len: 100,
            page_arabic_floor: 0.20,
            strip_diacritics: true,
            domain: None,
            strict: false,
            self_test: false,
            sample_n: 30,
            worst_n: 20,
            parallel: true,
        }
    }

    /// Switches cleaning profile, resetting the thresholds it owns.
    pub fn with_profile(mut self, profile: CleaningProfile) -> Self {
        self.profile = profile;
        self.line_filter = profile.line_filter();
        self.drop_gate = profile.drop_gate();
        self.chunk.overflow_tolerance = profile.overflow_tolerance();
        self
    }

    /// Sets the chunk window bounds.
    pub fn with_chunk_window(mut self, min: usize, max: usize) -> Self {
        self.chunk.min = min;
        self.chunk.max = max;
        self
    }

    /// Sets the overflow tolerance.
    pub fn with_overflow_tolerance(mut self, tolerance: usize) -> Self {
        self.chunk.overflow_tolerance = tolerance;
        self
    }

    /// Sets the page admission length.
    pub fn with_min_page_len(mut self, len: usize) -> Self {
        self.min_page_len = len;
        self
    }

    /// Sets the page admission arabic floor.
    pub fn with_page_arabic_floor(mut self, floor: f64) -> Self {
        self.page_arabic_floor = floor;
        self
    }

    /// Keeps Arabic diacritics during normalization.
    pub fn keep_diacritics(mut self) -> Self {
        self.strip_diacritics = false;
        self
    }

    /// Fixes the domain instead of inferring it from paths.
    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = Some(domain);
        self
    }

    /// Enables strict scoring.
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Enables the self-test with the given sample size.
    pub fn with_self_test(mut self, sample_n: usize) -> Self {
        self.self_test = true;
        self.sample_n = sample_n;
        self
    }

    /// Sets the worst-sample count.
    pub fn with_worst_n(mut self, n: usize) -> Self {
        self.worst_n = n;
        self
    }

    /// Disables parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Rejects window settings that cannot produce chunks.
    pub fn validate(&self) -> Result<()> {
        if self.chunk.min == 0 {
            return Err(Error::InvalidConfig("chunk min must be positive".into()));
        }
        if self.chunk.min > self.chunk.max {
            return Err(Error::InvalidConfig(format!(
                "chunk min ({}) exceeds chunk max ({})",
                self.chunk.min, self.chunk.max
            )));
        }
        Ok(())
    }

    /// Domain used for a given input path.
    pub fn domain_for(&self, path: &Path) -> Domain {
        self.domain.unwrap_or_else(|| Domain::detect_from_path(path))
    }

    /// Scoring configuration for a domain under these options.
    pub fn domain_config(&self, domain: Domain) -> DomainConfig {
        DomainConfig::resolve(domain, self.strict)
    }

    /// Report settings derived from the worst-N and self-test options.
    pub fn report_settings(&self) -> ReportSettings {
        ReportSettings {
            worst_n: self.worst_n,
            self_test: self.self_test.then_some(self.sample_n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_standard_profile() {
        let options = PipelineOptions::default();
        assert_eq!(options.profile, CleaningProfile::Standard);
        assert_eq!(options.chunk.min, 400);
        assert_eq!(options.chunk.max, 700);
        assert_eq!(options.chunk.overflow_tolerance, 150);
        assert_eq!(options.drop_gate.arabic_lt, 0.40);
        assert_eq!(options.line_filter.arabic_floor, 0.25);
        assert_eq!(options.min_page_len, 100);
        assert!(options.strip_diacritics);
    }

    #[test]
    fn test_relaxed_profile_thresholds() {
        let options = PipelineOptions::new().with_profile(CleaningProfile::Relaxed);
        assert_eq!(options.drop_gate.arabic_lt, 0.30);
        assert_eq!(options.line_filter.arabic_floor, 0.20);
        assert_eq!(options.chunk.overflow_tolerance, 200);
        // Window bounds are not owned by the profile
        assert_eq!(options.chunk.min, 400);
    }

    #[test]
    fn test_builder_chain() {
        let options = PipelineOptions::new()
            .with_chunk_window(100, 300)
            .with_domain(Domain::Math)
            .strict()
            .with_self_test(10)
            .with_worst_n(5)
            .keep_diacritics()
            .sequential();

        assert_eq!(options.chunk.min, 100);
        assert_eq!(options.chunk.max, 300);
        assert_eq!(options.domain, Some(Domain::Math));
        assert!(options.strict);
        assert!(options.self_test);
        assert_eq!(options.sample_n, 10);
        assert_eq!(options.worst_n, 5);
        assert!(!options.strip_diacritics);
        assert!(!options.parallel);
        assert_eq!(options.chunk.viable_len(), 50);
        assert_eq!(options.report_settings().self_test, Some(10));
        assert_eq!(options.report_settings().worst_n, 5);
    }

    #[test]
    fn test_validate() {
        assert!(PipelineOptions::new().validate().is_ok());
        assert!(PipelineOptions::new()
            .with_chunk_window(0, 10)
            .validate()
            .is_err());
        assert!(matches!(
            PipelineOptions::new().with_chunk_window(800, 700).validate(),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_explicit_domain_wins_over_path() {
        let options = PipelineOptions::new().with_domain(Domain::Science);
        assert_eq!(options.domain_for(Path::new("books/math/g2.jsonl")), Domain::Science);
        let inferred = PipelineOptions::new();
        assert_eq!(inferred.domain_for(Path::new("books/math/g2.jsonl")), Domain::Math);
    }

    #[test]
    fn test_profile_from_str() {
        assert_eq!("Relaxed".parse::<CleaningProfile>().unwrap(), CleaningProfile::Relaxed);
        assert!("loose".parse::<CleaningProfile>().is_err());
    }
}

//! Batch processing over a directory tree.
//!
//! Input files are discovered recursively, processed independently (in
//! parallel unless disabled) and summarized in a [`CorpusReport`]. A failing
//! file is recorded and logged; it never aborts the rest of the batch.

use crate::domain::{Domain, DomainConfig};
use crate::error::{Error, Result};
use crate::options::PipelineOptions;
use crate::pipeline::Pipeline;
use crate::report::{CorpusReport, FileFailure, FileReport, FileResult};
use rayon::prelude::*;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

/// Extension of page and chunk streams.
pub const INPUT_EXTENSION: &str = "jsonl";
/// Suffix appended to the stem of a cleaned file.
pub const CLEANED_SUFFIX: &str = "_clean_chunked";
/// Directory under the output root holding per-file cleaning reports.
pub const REPORTS_DIR: &str = "reports";

/// Lists `*.jsonl` files under `root` in sorted order. A file path is
/// returned as is.
pub fn discover_inputs(root: &Path) -> Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    if !root.is_dir() {
        return Err(Error::file(root, io::Error::from(io::ErrorKind::NotFound)));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == INPUT_EXTENSION))
        .map(|e| e.into_path())
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(Error::NoInputs(root.to_path_buf()));
    }
    Ok(files)
}

/// Domain configurations resolved once per run.
#[derive(Debug, Clone)]
pub struct DomainTable {
    configs: [DomainConfig; 3],
}

impl DomainTable {
    pub fn new(strict: bool) -> Self {
        Self {
            configs: Domain::ALL.map(|d| DomainConfig::resolve(d, strict)),
        }
    }

    pub fn get(&self, domain: Domain) -> &DomainConfig {
        match domain {
            Domain::Math => &self.configs[0],
            Domain::Science => &self.configs[1],
            Domain::Textual => &self.configs[2],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &DomainConfig> {
        self.configs.iter()
    }
}

/// Runs the pipeline over many files, mirroring the input layout under an
/// output directory.
#[derive(Debug, Clone)]
pub struct BatchRunner<'a> {
    options: &'a PipelineOptions,
    domains: DomainTable,
    out_dir: PathBuf,
}

impl<'a> BatchRunner<'a> {
    pub fn new(options: &'a PipelineOptions, out_dir: impl Into<PathBuf>) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            domains: DomainTable::new(options.strict),
            out_dir: out_dir.into(),
        })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Cleans every page file under `input`.
    ///
    /// Chunks go to `<out>/<rel>/<stem>_clean_chunked.jsonl`, per-file reports
    /// to `<out>/reports/<rel>/<stem>/` and the corpus report to `<out>/`.
    pub fn clean(&self, input: &Path) -> Result<CorpusReport> {
        let files = discover_inputs(input)?;
        info!(files = files.len(), root = %input.display(), "cleaning");

        self.run(&files, |file| {
            let (rel_dir, stem) = relative_parts(input, file);
            let output = self
                .out_dir
                .join(&rel_dir)
                .join(format!("{stem}{CLEANED_SUFFIX}.{INPUT_EXTENSION}"));
            let report_dir = self.out_dir.join(REPORTS_DIR).join(&rel_dir).join(&stem);

            let report = self.pipeline_for(file).clean_file(file, &output)?;
            report.write_to_dir(&report_dir)?;
            Ok((report, report_dir))
        })
    }

    /// Evaluates every chunk file under `input`, writing reports to
    /// `<out>/<rel>/<stem>/` and the corpus report to `<out>/`.
    pub fn evaluate(&self, input: &Path) -> Result<CorpusReport> {
        let files = discover_inputs(input)?;
        info!(files = files.len(), root = %input.display(), "evaluating");

        self.run(&files, |file| {
            let (rel_dir, stem) = relative_parts(input, file);
            let report_dir = self.out_dir.join(&rel_dir).join(&stem);

            let report = self.pipeline_for(file).evaluate_file(file)?;
            report.write_to_dir(&report_dir)?;
            Ok((report, report_dir))
        })
    }

    fn pipeline_for(&self, file: &Path) -> Pipeline<'_> {
        let domain = self.options.domain_for(file);
        Pipeline::new(self.options, self.domains.get(domain))
    }

    fn run<F>(&self, files: &[PathBuf], process: F) -> Result<CorpusReport>
    where
        F: Fn(&Path) -> Result<(FileReport, PathBuf)> + Sync,
    {
        let handle = |file: &PathBuf| -> std::result::Result<FileResult, FileFailure> {
            match process(file) {
                Ok((report, report_dir)) => Ok(FileResult::from_report(&report, report_dir)),
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "file failed");
                    Err(FileFailure {
                        file: file.clone(),
                        error: e.to_string(),
                    })
                }
            }
        };

        let outcomes: Vec<_> = if self.options.parallel {
            files.par_iter().map(handle).collect()
        } else {
            files.iter().map(handle).collect()
        };

        let mut results = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(result) => results.push(result),
                Err(failure) => failures.push(failure),
            }
        }
        let corpus = CorpusReport::new(results, failures);

        corpus.write_to_dir(&self.out_dir)?;
        info!(
            files = corpus.results.len(),
            failures = corpus.failures.len(),
            chunks = corpus.total_chunks(),
            noise_rate = corpus.summary.noise_rate,
            "batch finished"
        );
        Ok(corpus)
    }
}

/// Parent directory of `file` relative to `root`, and the file stem.
fn relative_parts(root: &Path, file: &Path) -> (PathBuf, String) {
    let rel_dir = file
        .strip_prefix(root)
        .ok()
        .and_then(|rel| rel.parent())
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string());
    (rel_dir, stem)
}

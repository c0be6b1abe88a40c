//! Error types for the ocrchunk library.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ocrchunk operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the ocrchunk library.
///
/// Heuristic thresholds never produce errors; only I/O, serialization and
/// structurally impossible option combinations do.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error without file context.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// I/O error while reading or writing a specific file.
    #[error("I/O error on {path}: {source}")]
    FileIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON serialization error while writing records or reports.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Options that cannot produce a valid chunking run.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unknown domain or cleaning profile name.
    #[error("Unknown {kind}: {name}")]
    UnknownName { kind: &'static str, name: String },

    /// No input files were found under a directory.
    #[error("No input files found under {0}")]
    NoInputs(PathBuf),
}

impl Error {
    /// Wraps an I/O error with the path it happened on.
    pub fn file(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::FileIo {
            path: path.into(),
            source,
        }
    }
}

/// Attaches a path to `io::Result` failures.
pub(crate) trait IoResultExt<T> {
    fn with_path(self, path: &std::path::Path) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path(self, path: &std::path::Path) -> Result<T> {
        self.map_err(|e| Error::file(path, e))
    }
}

//! Async API for non-blocking cleaning and evaluation.
//!
//! Enable the `async` feature to use these APIs:
//!
//! ```toml
//! [dependencies]
//! ocrchunk = { version = "0.1", features = ["async"] }
//! ```
//!
//! The pipeline is CPU-bound, so every call runs the synchronous
//! implementation on Tokio's blocking pool.

use crate::error::{Error, Result};
use crate::model::{Chunk, PageRecord};
use crate::options::PipelineOptions;
use crate::report::{CorpusReport, FileReport};
use crate::Domain;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e.to_string())))?
}

/// Asynchronously cleans one page file into a chunk file.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> ocrchunk::Result<()> {
/// use ocrchunk::PipelineOptions;
///
/// let report = ocrchunk::async_api::clean_file(
///     "pages.jsonl",
///     "pages_clean_chunked.jsonl",
///     &PipelineOptions::default(),
/// )
/// .await?;
/// println!("{} chunks", report.quality.total_chunks);
/// # Ok(())
/// # }
/// ```
pub async fn clean_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &PipelineOptions,
) -> Result<FileReport> {
    let input = input.as_ref().to_path_buf();
    let output = output.as_ref().to_path_buf();
    let options = options.clone();
    blocking(move || crate::clean_file(&input, &output, &options)).await
}

/// Asynchronously evaluates a chunked file.
pub async fn evaluate_file(input: impl AsRef<Path>, options: &PipelineOptions) -> Result<FileReport> {
    let input = input.as_ref().to_path_buf();
    let options = options.clone();
    blocking(move || crate::evaluate_file(&input, &options)).await
}

/// Asynchronously cleans a file or directory tree.
pub async fn clean_path(
    input: impl AsRef<Path>,
    out_dir: impl Into<PathBuf>,
    options: &PipelineOptions,
) -> Result<CorpusReport> {
    let input = input.as_ref().to_path_buf();
    let out_dir = out_dir.into();
    let options = options.clone();
    blocking(move || crate::clean_path(&input, &out_dir, &options)).await
}

/// Chunks every page read from an async JSONL stream.
///
/// Malformed lines are skipped. Chunks are returned in input order.
pub async fn chunk_stream<R: AsyncBufRead + Unpin>(
    reader: R,
    options: &PipelineOptions,
    domain: Domain,
) -> Result<Vec<Chunk>> {
    let mut pages = Vec::new();
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if let Ok(page) = PageRecord::from_json(line.trim()) {
            pages.push(page);
        }
    }

    let options = options.clone();
    blocking(move || {
        Ok(pages
            .iter()
            .flat_map(|page| crate::chunk_page(page, &options, domain))
            .collect())
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_chunk_stream() {
        let text = "الطلاب يتعلمون القراءة والكتابة في المدرسة كل يوم. ".repeat(20);
        let line = serde_json::json!({ "text": text, "metadata": { "page": 2 } }).to_string();
        let input = format!("{line}\nnot json\n");

        let chunks = chunk_stream(input.as_bytes(), &PipelineOptions::default(), Domain::Textual)
            .await
            .unwrap();
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|c| c.page == Some(2)));
    }
}

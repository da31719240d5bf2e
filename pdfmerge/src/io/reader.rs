//! Loading input files from disk.
//!
//! File reads go through tokio and parsing runs on the blocking pool, so
//! many inputs can be loaded concurrently without stalling the runtime.
//! Results always come back in input order.
//!
//! # Examples
//!
//! ```no_run
//! use pdfmerge::io::PdfReader;
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let reader = PdfReader::new();
//! let paths = vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")];
//! let (results, stats) = reader.load_all(&paths, 4).await;
//! println!("{} loaded, {} failed", stats.success_count, stats.failure_count);
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use log::debug;
use tokio::task;

use crate::document::Document;
use crate::error::{MergeError, ReadError, Result};
use crate::utils::format_file_size;

/// Batches at or below this size are loaded one file at a time.
const SEQUENTIAL_THRESHOLD: usize = 3;

/// A parsed input document with load metadata.
#[derive(Debug)]
pub struct LoadedPdf {
    /// The parsed document.
    pub document: Document,

    /// Path to the source file.
    pub path: PathBuf,

    /// Number of pages in the document.
    pub page_count: usize,

    /// Time taken to read and parse the file.
    pub load_time: Duration,

    /// File size in bytes.
    pub file_size: u64,
}

/// Result of a load operation (success or failure).
pub type LoadResult = Result<LoadedPdf>;

/// Statistics for a batch load operation.
#[derive(Debug, Clone)]
pub struct LoadStatistics {
    /// Number of PDFs successfully loaded.
    pub success_count: usize,

    /// Number of PDFs that failed to load.
    pub failure_count: usize,

    /// Total time taken for all loads.
    pub total_time: Duration,

    /// Average time per successful load.
    pub average_time: Duration,

    /// Total size of successfully loaded files.
    pub total_size: u64,

    /// Total number of pages loaded.
    pub total_pages: usize,
}

impl LoadStatistics {
    fn from_results(results: &[LoadResult], total_time: Duration) -> Self {
        let mut success_count = 0;
        let mut failure_count = 0;
        let mut total_size = 0;
        let mut total_pages = 0;
        let mut total_load_time = Duration::ZERO;

        for result in results {
            match result {
                Ok(loaded) => {
                    success_count += 1;
                    total_size += loaded.file_size;
                    total_pages += loaded.page_count;
                    total_load_time += loaded.load_time;
                }
                Err(_) => failure_count += 1,
            }
        }

        let average_time = if success_count > 0 {
            total_load_time / success_count as u32
        } else {
            Duration::ZERO
        };

        Self {
            success_count,
            failure_count,
            total_time,
            average_time,
            total_size,
            total_pages,
        }
    }

    /// Format total size as human-readable string.
    pub fn format_total_size(&self) -> String {
        format_file_size(self.total_size)
    }
}

/// Loads input documents from disk.
#[derive(Debug, Clone, Default)]
pub struct PdfReader;

impl PdfReader {
    /// Create a new reader.
    pub fn new() -> Self {
        Self
    }

    /// Load a single PDF document.
    ///
    /// Errors are tagged as input #1; batch loads tag them with the real position.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::Read`] if the file cannot be read, is encrypted,
    /// or is not a well-formed PDF.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use pdfmerge::io::PdfReader;
    /// # use std::path::Path;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let reader = PdfReader::new();
    /// let loaded = reader.load(Path::new("document.pdf")).await?;
    /// println!("Loaded {} pages in {:?}", loaded.page_count, loaded.load_time);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn load(&self, path: &Path) -> Result<LoadedPdf> {
        load_at(0, path.to_path_buf()).await
    }

    /// Load multiple PDF documents one at a time, in order.
    pub async fn load_sequential(&self, paths: &[PathBuf]) -> Vec<LoadResult> {
        let mut results = Vec::with_capacity(paths.len());
        for (index, path) in paths.iter().enumerate() {
            results.push(load_at(index, path.clone()).await);
        }
        results
    }

    /// Load multiple PDF documents with up to `workers` in flight.
    ///
    /// The returned vector is in the same order as `paths`.
    pub async fn load_parallel(&self, paths: &[PathBuf], workers: usize) -> Vec<LoadResult> {
        let workers = workers.max(1);
        let tasks = paths
            .iter()
            .cloned()
            .enumerate()
            .map(|(index, path)| load_at(index, path));

        stream::iter(tasks).buffered(workers).collect().await
    }

    /// Load all PDFs, going parallel only when the batch is large enough to benefit.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use pdfmerge::io::PdfReader;
    /// # use std::path::PathBuf;
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let reader = PdfReader::new();
    /// let paths = vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")];
    ///
    /// let (results, stats) = reader.load_all(&paths, 4).await;
    /// println!("Loaded {} of {} files in {:?}",
    ///          stats.success_count,
    ///          paths.len(),
    ///          stats.total_time);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn load_all(
        &self,
        paths: &[PathBuf],
        max_workers: usize,
    ) -> (Vec<LoadResult>, LoadStatistics) {
        let start = Instant::now();

        let results = if paths.len() <= SEQUENTIAL_THRESHOLD {
            self.load_sequential(paths).await
        } else {
            self.load_parallel(paths, max_workers).await
        };

        let stats = LoadStatistics::from_results(&results, start.elapsed());
        (results, stats)
    }

    /// Load PDFs, calling `on_progress(index, result)` for each in input order.
    pub async fn load_with_progress<F>(
        &self,
        paths: &[PathBuf],
        workers: usize,
        mut on_progress: F,
    ) -> Vec<LoadResult>
    where
        F: FnMut(usize, &LoadResult),
    {
        let results = self.load_parallel(paths, workers).await;
        for (index, result) in results.iter().enumerate() {
            on_progress(index, result);
        }
        results
    }
}

async fn load_at(index: usize, path: PathBuf) -> LoadResult {
    let label = path.display().to_string();
    let start = Instant::now();

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| MergeError::read(index, label.clone(), ReadError::Io(e)))?;
    let file_size = bytes.len() as u64;

    let parse_label = label.clone();
    let document = task::spawn_blocking(move || Document::open_labeled(bytes, parse_label))
        .await
        .map_err(|e| MergeError::other(format!("Load task failed: {e}")))?
        .map_err(|e| MergeError::read(index, label, e))?;

    let load_time = start.elapsed();
    debug!(
        "Loaded {} ({} pages, {}) in {:?}",
        path.display(),
        document.page_count(),
        format_file_size(file_size),
        load_time
    );

    Ok(LoadedPdf {
        page_count: document.page_count(),
        document,
        path,
        load_time,
        file_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::PdfBuilder;
    use tempfile::TempDir;

    fn create_test_pdf(dir: &TempDir, name: &str, pages: usize) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, PdfBuilder::with_pages(pages).build()).unwrap();
        path
    }

    #[tokio::test]
    async fn test_load_single_pdf() {
        let temp_dir = TempDir::new().unwrap();
        let pdf_path = create_test_pdf(&temp_dir, "test.pdf", 2);

        let loaded = PdfReader::new().load(&pdf_path).await.unwrap();
        assert_eq!(loaded.page_count, 2);
        assert_eq!(loaded.path, pdf_path);
        assert_eq!(loaded.file_size, std::fs::metadata(&pdf_path).unwrap().len());
        assert_eq!(loaded.document.label(), pdf_path.display().to_string());
    }

    #[tokio::test]
    async fn test_load_nonexistent_pdf() {
        let err = PdfReader::new()
            .load(Path::new("/nonexistent.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            MergeError::Read {
                source: ReadError::Io(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_load_sequential() {
        let temp_dir = TempDir::new().unwrap();
        let pdf1 = create_test_pdf(&temp_dir, "test1.pdf", 1);
        let pdf2 = create_test_pdf(&temp_dir, "test2.pdf", 3);

        let results = PdfReader::new().load_sequential(&[pdf1, pdf2]).await;
        let pages: Vec<usize> = results.iter().map(|r| r.as_ref().unwrap().page_count).collect();
        assert_eq!(pages, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_load_parallel_preserves_order() {
        let temp_dir = TempDir::new().unwrap();
        let paths: Vec<PathBuf> = (1..=5)
            .map(|pages| create_test_pdf(&temp_dir, &format!("test{pages}.pdf"), pages))
            .collect();

        let results = PdfReader::new().load_parallel(&paths, 2).await;
        let pages: Vec<usize> = results.iter().map(|r| r.as_ref().unwrap().page_count).collect();
        assert_eq!(pages, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_load_all_with_failure() {
        let temp_dir = TempDir::new().unwrap();
        let good = create_test_pdf(&temp_dir, "good.pdf", 1);
        let bad = temp_dir.path().join("bad.pdf");
        std::fs::write(&bad, b"not a pdf").unwrap();
        let paths = vec![good.clone(), bad, good.clone(), good];

        let (results, stats) = PdfReader::new().load_all(&paths, 4).await;
        assert_eq!(stats.success_count, 3);
        assert_eq!(stats.failure_count, 1);
        assert_eq!(stats.total_pages, 3);
        match &results[1] {
            Err(MergeError::Read { index, .. }) => assert_eq!(*index, 1),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_with_progress() {
        let temp_dir = TempDir::new().unwrap();
        let pdf1 = create_test_pdf(&temp_dir, "test1.pdf", 1);
        let pdf2 = create_test_pdf(&temp_dir, "test2.pdf", 1);

        let mut seen = Vec::new();
        let results = PdfReader::new()
            .load_with_progress(&[pdf1, pdf2], 2, |index, result| {
                seen.push((index, result.is_ok()));
            })
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(seen, vec![(0, true), (1, true)]);
    }

    #[test]
    fn test_load_statistics_empty() {
        let stats = LoadStatistics::from_results(&[], Duration::from_secs(1));
        assert_eq!(stats.success_count, 0);
        assert_eq!(stats.average_time, Duration::ZERO);
        assert_eq!(stats.format_total_size(), "0 bytes");
    }
}

//! File-level merge orchestration.
//!
//! Loads every input concurrently, then hands the parsed documents to the
//! synchronous core on a blocking task so the runtime stays responsive.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use log::info;
use tokio::task;

use super::{MergeInput, PageSelection, merge_parsed, validate_inputs};
use crate::config::Config;
use crate::error::{MergeError, Result};
use crate::io::{LoadedPdf, PdfReader};
use crate::utils::format_file_size;

/// Statistics about a merge operation.
#[derive(Debug, Clone)]
pub struct MergeStatistics {
    /// Number of PDFs whose pages ended up in the output.
    pub files_merged: usize,

    /// Inputs skipped because they have no pages.
    pub files_skipped: usize,

    /// Total number of pages in merged document.
    pub total_pages: usize,

    /// Objects copied into the output.
    pub objects_copied: usize,

    /// Total time taken for merge.
    pub merge_time: Duration,

    /// Time taken to load all PDFs.
    pub load_time: Duration,

    /// Total size of input files.
    pub input_size: u64,

    /// Size of the merged document.
    pub output_size: u64,
}

impl MergeStatistics {
    /// Format input size as human-readable string.
    pub fn format_input_size(&self) -> String {
        format_file_size(self.input_size)
    }

    /// Format output size as human-readable string.
    pub fn format_output_size(&self) -> String {
        format_file_size(self.output_size)
    }
}

/// Result of a merge operation.
#[derive(Debug)]
pub struct MergeResult {
    /// The merged PDF, serialized.
    pub bytes: Vec<u8>,

    /// Statistics about the merge.
    pub statistics: MergeStatistics,

    /// Paths of files whose pages were merged.
    pub merged_files: Vec<PathBuf>,
}

/// Merges PDF files described by a [`Config`].
#[derive(Debug, Clone, Default)]
pub struct Merger {
    reader: PdfReader,
}

impl Merger {
    /// Create a new merger with default settings.
    pub fn new() -> Self {
        Self {
            reader: PdfReader::new(),
        }
    }

    /// Merge the configured inputs.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An input is missing or not a file
    /// - An input cannot be parsed
    /// - The output would have no pages and empty output is not allowed
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use pdfmerge::merge::Merger;
    /// # use pdfmerge::config::Config;
    /// # async fn example(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    /// let merger = Merger::new();
    /// let result = merger.merge(&config).await?;
    /// println!("Merged {} files into {} pages",
    ///          result.statistics.files_merged,
    ///          result.statistics.total_pages);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn merge(&self, config: &Config) -> Result<MergeResult> {
        self.merge_with_progress(config, |_, _| {}).await
    }

    /// Merge, calling `on_progress(input_index, total_inputs)` before each input is appended.
    pub async fn merge_with_progress<F>(&self, config: &Config, on_progress: F) -> Result<MergeResult>
    where
        F: FnMut(usize, usize) + Send + 'static,
    {
        let merge_start = Instant::now();

        let inputs: Vec<MergeInput> = config.inputs.iter().cloned().map(MergeInput::Path).collect();
        validate_inputs(&inputs, None)?;

        let load_start = Instant::now();
        let (load_results, load_stats) = self
            .reader
            .load_all(&config.inputs, config.effective_jobs())
            .await;
        let load_time = load_start.elapsed();
        info!(
            "Loaded {} files ({}) in {:?}",
            load_stats.success_count,
            load_stats.format_total_size(),
            load_time
        );

        let loaded: Vec<LoadedPdf> = load_results.into_iter().collect::<Result<_>>()?;
        let input_size = loaded.iter().map(|pdf| pdf.file_size).sum();
        let paths: Vec<PathBuf> = loaded.iter().map(|pdf| pdf.path.clone()).collect();

        let selections: Option<Vec<PageSelection>> = config.page_range.as_ref().map(|range| {
            loaded
                .iter()
                .map(|pdf| PageSelection::Pages(range.to_selection(pdf.page_count)))
                .collect()
        });
        let options = config.merge_options();
        let documents = loaded.into_iter().map(|pdf| pdf.document).collect::<Vec<_>>();

        let mut on_progress = on_progress;
        let output = task::spawn_blocking(move || {
            merge_parsed(
                &documents,
                selections.as_deref(),
                &options,
                Some(&mut on_progress),
            )
        })
        .await
        .map_err(|e| MergeError::other(format!("Merge task failed: {e}")))??;

        let merged_files = paths
            .into_iter()
            .enumerate()
            .filter(|(index, _)| !output.skipped.contains(index))
            .map(|(_, path)| path)
            .collect::<Vec<_>>();

        let statistics = MergeStatistics {
            files_merged: merged_files.len(),
            files_skipped: output.skipped.len(),
            total_pages: output.pages,
            objects_copied: output.objects,
            merge_time: merge_start.elapsed(),
            load_time,
            input_size,
            output_size: output.bytes.len() as u64,
        };

        Ok(MergeResult {
            bytes: output.bytes,
            statistics,
            merged_files,
        })
    }
}

/// Merge the configured inputs with a default [`Merger`].
pub async fn merge_pdfs(config: &Config) -> Result<MergeResult> {
    Merger::new().merge(config).await
}

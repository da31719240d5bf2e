//! Pre-flight checks of inputs and output.
//!
//! Everything the merge would reject is found here without writing any
//! output: missing files, unreadable or encrypted PDFs, an output path
//! that may not be replaced, and a page selection that yields no pages.
//! The results double as the dry-run report.
//!
//! # Examples
//!
//! ```no_run
//! use pdfmerge::validation::Validator;
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let validator = Validator::new();
//! let result = validator.validate_file(&PathBuf::from("test.pdf")).await?;
//! println!("PDF has {} pages", result.page_count);
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};
use tokio::task;

use crate::config::{Config, EmptyOutputPolicy, OverwriteMode};
use crate::document::{Document, read_header};
use crate::error::{MergeError, ReadError, Result, ValidationError};
use crate::io::PdfWriter;
use crate::merge::MergeInput;
use crate::utils::format_file_size;

/// Result of validating a single PDF file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    /// Path to the validated file.
    pub path: PathBuf,

    /// Number of pages in the PDF.
    pub page_count: usize,

    /// PDF version (major, minor) from the file header.
    pub version: Option<(u8, u8)>,

    /// Size of the file in bytes.
    pub file_size: u64,

    /// Whether the PDF is encrypted.
    pub is_encrypted: bool,

    /// Number of objects in the cross-reference table.
    pub object_count: usize,

    /// Width and height of the first page in points, if available.
    pub page_dimensions: Option<(f64, f64)>,
}

impl ValidationResult {
    fn from_document(path: PathBuf, file_size: u64, document: &Document) -> Self {
        let page_dimensions = document
            .page(0)
            .and_then(|page| page.ok())
            .and_then(|page| page.dimensions().ok().flatten());

        Self {
            path,
            page_count: document.page_count(),
            version: parse_version(document.version()),
            file_size,
            is_encrypted: false,
            object_count: document.object_count(),
            page_dimensions,
        }
    }

    fn encrypted(path: PathBuf, bytes: &[u8]) -> Self {
        Self {
            path,
            page_count: 0,
            version: read_header(bytes).ok().and_then(|v| parse_version(&v)),
            file_size: bytes.len() as u64,
            is_encrypted: true,
            object_count: 0,
            page_dimensions: None,
        }
    }
}

/// Summary of validation results for multiple files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    /// Individual validation results for each file, in input order.
    pub results: Vec<ValidationResult>,

    /// Total number of pages across all files.
    pub total_pages: usize,

    /// Pages the merge would write after applying the page range.
    pub selected_pages: usize,

    /// Total file size in bytes.
    pub total_size: u64,

    /// Number of files that passed validation.
    pub files_validated: usize,

    /// Number of files with no pages, which the merge skips.
    pub files_empty: usize,
}

impl ValidationSummary {
    /// Create a summary from validation results.
    pub fn from_results(results: Vec<ValidationResult>) -> Self {
        let total_pages = results.iter().map(|r| r.page_count).sum();
        let total_size = results.iter().map(|r| r.file_size).sum();
        let files_empty = results.iter().filter(|r| r.page_count == 0).count();

        Self {
            files_validated: results.len(),
            results,
            total_pages,
            selected_pages: total_pages,
            total_size,
            files_empty,
        }
    }

    /// Format the total file size as a human-readable string.
    pub fn format_total_size(&self) -> String {
        format_file_size(self.total_size)
    }

    /// Serialize as pretty-printed JSON for the dry-run report.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| MergeError::other(format!("Failed to serialize report: {e}")))
    }
}

/// Validator for input files and configuration.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    writer: PdfWriter,
}

impl Validator {
    /// Create a new validator with default settings.
    pub fn new() -> Self {
        Self {
            writer: PdfWriter::new(),
        }
    }

    /// Validate a single PDF file.
    ///
    /// An encrypted file is reported through [`ValidationResult::is_encrypted`]
    /// rather than as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist, is not a regular file,
    /// or cannot be parsed.
    pub async fn validate_file(&self, path: &Path) -> Result<ValidationResult> {
        inspect(0, path).await
    }

    /// Validate multiple PDF files, stopping at the first failure.
    ///
    /// Encrypted files fail here, because the merge cannot process them.
    pub async fn validate_files(&self, paths: &[PathBuf]) -> Result<ValidationSummary> {
        if paths.is_empty() {
            return Err(ValidationError::NoInputs.into());
        }
        // Every path must exist before the first one is parsed.
        paths
            .iter()
            .try_for_each(|path| MergeInput::from(path.as_path()).check())?;

        let mut results = Vec::with_capacity(paths.len());
        for (index, path) in paths.iter().enumerate() {
            let result = inspect(index, path).await?;
            if result.is_encrypted {
                return Err(MergeError::read(
                    index,
                    path.display().to_string(),
                    ReadError::EncryptedDocument,
                ));
            }
            if result.page_count == 0 {
                warn!("{} has no pages and will be skipped", path.display());
            }
            results.push(result);
        }

        Ok(ValidationSummary::from_results(results))
    }

    /// Validate the output path against the overwrite mode.
    ///
    /// [`OverwriteMode::Prompt`] passes; asking is left to the caller.
    pub async fn validate_output(&self, config: &Config) -> Result<()> {
        if config.overwrite_mode == OverwriteMode::NoClobber && self.writer.exists(&config.output).await {
            return Err(MergeError::output_exists(config.output.clone()));
        }
        self.writer.can_write(&config.output).await
    }

    /// Validate inputs, output and page selection of a complete configuration.
    pub async fn validate_config(&self, config: &Config) -> Result<ValidationSummary> {
        let mut summary = self.validate_files(&config.inputs).await?;
        self.validate_output(config).await?;

        if let Some(range) = &config.page_range {
            summary.selected_pages = summary
                .results
                .iter()
                .map(|r| range.to_selection(r.page_count).len())
                .sum();
        }

        if summary.selected_pages == 0 && config.empty_output == EmptyOutputPolicy::Reject {
            return Err(MergeError::EmptyOutput);
        }

        Ok(summary)
    }
}

async fn inspect(index: usize, path: &Path) -> Result<ValidationResult> {
    MergeInput::from(path).check()?;

    let label = path.display().to_string();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| MergeError::read(index, label.clone(), ReadError::Io(e)))?;

    let path_buf = path.to_path_buf();
    task::spawn_blocking(move || {
        let file_size = bytes.len() as u64;
        match Document::open_labeled(bytes.clone(), label.clone()) {
            Ok(document) => Ok(ValidationResult::from_document(path_buf, file_size, &document)),
            Err(ReadError::EncryptedDocument) => Ok(ValidationResult::encrypted(path_buf, &bytes)),
            Err(err) => Err(MergeError::read(index, label, err)),
        }
    })
    .await
    .map_err(|e| MergeError::other(format!("Validation task failed: {e}")))?
}

fn parse_version(version: &str) -> Option<(u8, u8)> {
    let (major, minor) = version.split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}

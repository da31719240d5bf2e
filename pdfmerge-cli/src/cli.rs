//! CLI argument parsing for pdfmerge.
//!
//! This module defines the command-line interface structure using `clap`.
//! It handles argument parsing, validation, and help text generation.

use clap::Parser;
use std::path::PathBuf;

use pdfmerge::config::{Config, EmptyOutputPolicy, Metadata, OverwriteMode, PageRange};
use pdfmerge::error::{MergeError, Result, ValidationError};
use pdfmerge::utils::{collect_paths_for_patterns, read_input_list};

/// Merge PDF files page by page into a single document.
///
/// pdfmerge reads each input with its own PDF object model, copies every
/// selected page together with the fonts, images and other resources it
/// uses, and writes a fresh document atomically.
#[derive(Parser, Debug)]
#[command(name = "pdfmerge")]
#[command(version)]
#[command(about = "Merge PDF files page by page into a single document", long_about = None)]
#[command(author)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Input PDF files to merge (in order)
    ///
    /// Specify multiple files or use glob patterns.
    /// Files are merged in the order provided.
    ///
    /// Examples:
    ///   pdfmerge file1.pdf file2.pdf -o output.pdf
    ///   pdfmerge 'chapter*.pdf' -o book.pdf
    #[arg(value_name = "FILE", required_unless_present = "input_list")]
    pub inputs: Vec<String>,

    /// Output PDF file path
    ///
    /// The merged PDF is written to a temporary file next to this path
    /// and renamed into place once complete.
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Dry run - validate inputs and preview merge without creating output
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Print the dry-run report as JSON on stdout
    #[arg(long, requires = "dry_run")]
    pub json: bool,

    /// Verbose output - show detailed information about each PDF
    ///
    /// Lists version, page count and object count of every input and
    /// enables debug logging unless RUST_LOG says otherwise.
    #[arg(short, long)]
    pub verbose: bool,

    /// Force overwrite of existing output file without confirmation
    #[arg(short, long)]
    pub force: bool,

    /// Never overwrite existing output file
    #[arg(long, conflicts_with = "force")]
    pub no_clobber: bool,

    /// Suppress all non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write a document with no pages instead of failing when nothing is selected
    #[arg(long)]
    pub allow_empty: bool,

    /// Set title metadata for output PDF
    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Set author metadata for output PDF
    #[arg(long, value_name = "TEXT")]
    pub author: Option<String>,

    /// Set subject metadata for output PDF
    #[arg(long, value_name = "TEXT")]
    pub subject: Option<String>,

    /// Set keywords metadata for output PDF (comma-separated)
    #[arg(long, value_name = "TEXT")]
    pub keywords: Option<String>,

    /// Read input file list from a file (one path per line)
    ///
    /// Lines starting with '#' are ignored. Paths from the list are
    /// appended after the inputs given on the command line.
    #[arg(long, value_name = "FILE")]
    pub input_list: Option<PathBuf>,

    /// Number of parallel jobs for loading PDFs
    ///
    /// Default is the number of CPU cores. Use 1 for sequential loading.
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Pages to take from each input (e.g., "1-5,10")
    ///
    /// Page numbers are 1-indexed and taken in the order written.
    /// Pages beyond the end of a document are ignored for that document.
    #[arg(long, value_name = "RANGE")]
    pub pages: Option<String>,
}

impl Cli {
    /// Convert CLI arguments into a validated Config over `inputs`.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::InvalidConfig`] if the page range is malformed
    /// or the resulting configuration is inconsistent.
    pub fn to_config(&self, inputs: Vec<PathBuf>) -> Result<Config> {
        let overwrite_mode = if self.force {
            OverwriteMode::Force
        } else if self.no_clobber {
            OverwriteMode::NoClobber
        } else {
            OverwriteMode::Prompt
        };

        let page_range = self
            .pages
            .as_deref()
            .map(PageRange::parse)
            .transpose()
            .map_err(|e| MergeError::invalid_config(e.to_string()))?;

        let empty_output = if self.allow_empty {
            EmptyOutputPolicy::Allow
        } else {
            EmptyOutputPolicy::Reject
        };

        let config = Config {
            inputs,
            output: self.output.clone(),
            dry_run: self.dry_run,
            verbose: self.verbose,
            overwrite_mode,
            quiet: self.quiet,
            empty_output,
            metadata: Metadata::new(
                self.title.clone(),
                self.author.clone(),
                self.subject.clone(),
                self.keywords.clone(),
            ),
            jobs: self.jobs,
            page_range,
            json: self.json,
        };

        config.validate().map_err(|e| {
            MergeError::invalid_config(format!("Configuration validation failed: {e}"))
        })?;

        Ok(config)
    }

    /// Validate CLI arguments before touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns an error if no inputs are given at all, the job count is
    /// zero, or the page range does not parse.
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() && self.input_list.is_none() {
            return Err(ValidationError::NoInputs.into());
        }

        if let Some(jobs) = self.jobs
            && jobs == 0
        {
            return Err(MergeError::invalid_config(
                "Number of jobs must be at least 1",
            ));
        }

        if let Some(ref pages) = self.pages {
            PageRange::parse(pages).map_err(|e| MergeError::invalid_config(e.to_string()))?;
        }

        Ok(())
    }

    /// Expand glob patterns and append paths from `--input-list`.
    ///
    /// # Errors
    ///
    /// Returns an error if a pattern is invalid, the list cannot be read,
    /// or nothing is left to merge.
    pub async fn get_all_inputs(&self) -> Result<Vec<PathBuf>> {
        let mut all_inputs = collect_paths_for_patterns(&self.inputs)?;

        if let Some(ref input_list_path) = self.input_list {
            all_inputs.extend(read_input_list(input_list_path).await?);
        }

        if all_inputs.is_empty() {
            return Err(ValidationError::NoInputs.into());
        }

        Ok(all_inputs)
    }
}

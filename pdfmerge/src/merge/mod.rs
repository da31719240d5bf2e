//! The merge entry point.
//!
//! [`merge_documents`] is the synchronous core: it validates every input up
//! front, then parses the inputs one at a time and appends their pages to a
//! single [`OutputAccumulator`]. [`Merger`] wraps it for files on disk,
//! loading inputs concurrently on the tokio runtime.

pub mod merger;

use std::path::{Path, PathBuf};

use log::{debug, warn};

pub use merger::{MergeResult, MergeStatistics, Merger, merge_pdfs};

use crate::config::MergeOptions;
use crate::document::Document;
use crate::error::{MergeError, ReadError, Result, ValidationError};
use crate::writer::OutputAccumulator;

/// One input of a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeInput {
    /// A file to read.
    Path(PathBuf),
    /// Bytes already in memory, with a label for messages.
    Bytes {
        /// Name used in messages.
        label: String,
        /// The PDF file contents.
        data: Vec<u8>,
    },
}

impl MergeInput {
    /// In-memory input.
    pub fn bytes(label: impl Into<String>, data: Vec<u8>) -> Self {
        Self::Bytes {
            label: label.into(),
            data,
        }
    }

    /// Name used in messages.
    pub fn label(&self) -> String {
        match self {
            Self::Path(path) => path.display().to_string(),
            Self::Bytes { label, .. } => label.clone(),
        }
    }

    pub(crate) fn check(&self) -> std::result::Result<(), ValidationError> {
        let Self::Path(path) = self else {
            return Ok(());
        };
        match std::fs::metadata(path) {
            Ok(metadata) if metadata.is_file() => Ok(()),
            Ok(_) => Err(ValidationError::NotAFile { path: path.clone() }),
            Err(_) => Err(ValidationError::InputNotFound { path: path.clone() }),
        }
    }

    fn open(&self) -> std::result::Result<Document, ReadError> {
        match self {
            Self::Path(path) => Document::load(path),
            Self::Bytes { label, data } => Document::open_labeled(data.clone(), label.clone()),
        }
    }
}

impl From<PathBuf> for MergeInput {
    fn from(path: PathBuf) -> Self {
        Self::Path(path)
    }
}

impl From<&Path> for MergeInput {
    fn from(path: &Path) -> Self {
        Self::Path(path.to_path_buf())
    }
}

/// Which pages of one input to take.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PageSelection {
    /// Every page in document order.
    #[default]
    All,
    /// The given 0-based page indices, in this order.
    Pages(Vec<usize>),
}

impl PageSelection {
    /// Concrete indices for a document with `page_count` pages.
    pub fn indices(&self, page_count: usize) -> Vec<usize> {
        match self {
            Self::All => (0..page_count).collect(),
            Self::Pages(indices) => indices.clone(),
        }
    }
}

/// What a merge produced.
#[derive(Debug, Clone)]
pub struct MergeOutput {
    /// The serialized output document.
    pub bytes: Vec<u8>,
    /// Pages in the output.
    pub pages: usize,
    /// Objects copied into the output, not counting the page tree and catalog.
    pub objects: usize,
    /// Indices of inputs skipped because they have no pages.
    pub skipped: Vec<usize>,
}

/// Merge `inputs` page by page into one PDF.
///
/// `selections`, when given, must hold one entry per input. `progress` is
/// called with `(input_index, total_inputs)` before each input is read.
///
/// Nothing is parsed until every input has passed validation, and nothing is
/// returned unless every input was read and appended successfully.
///
/// # Examples
///
/// ```no_run
/// use pdfmerge::merge::{MergeInput, merge_documents};
/// use pdfmerge::config::MergeOptions;
/// use std::path::PathBuf;
///
/// # fn example() -> pdfmerge::Result<()> {
/// let inputs = vec![
///     MergeInput::from(PathBuf::from("a.pdf")),
///     MergeInput::from(PathBuf::from("b.pdf")),
/// ];
/// let mut report = |index: usize, total: usize| println!("{}/{}", index + 1, total);
/// let bytes = merge_documents(&inputs, None, &MergeOptions::default(), Some(&mut report))?;
/// std::fs::write("merged.pdf", bytes)?;
/// # Ok(())
/// # }
/// ```
pub fn merge_documents(
    inputs: &[MergeInput],
    selections: Option<&[PageSelection]>,
    options: &MergeOptions,
    progress: Option<&mut dyn FnMut(usize, usize)>,
) -> Result<Vec<u8>> {
    merge_documents_with_report(inputs, selections, options, progress).map(|output| output.bytes)
}

/// [`merge_documents`], also reporting page and object counts.
pub fn merge_documents_with_report(
    inputs: &[MergeInput],
    selections: Option<&[PageSelection]>,
    options: &MergeOptions,
    mut progress: Option<&mut dyn FnMut(usize, usize)>,
) -> Result<MergeOutput> {
    validate_inputs(inputs, selections)?;

    let total = inputs.len();
    let mut accumulator = OutputAccumulator::new(options.clone());
    let mut skipped = Vec::new();

    for (index, input) in inputs.iter().enumerate() {
        if let Some(report) = progress.as_mut() {
            report(index, total);
        }
        let document = input
            .open()
            .map_err(|err| MergeError::read(index, input.label(), err))?;
        let selection = selections.and_then(|all| all.get(index));
        if !append_document(&mut accumulator, index, &document, selection)? {
            skipped.push(index);
        }
    }

    finish(accumulator, skipped)
}

/// Merge documents that are already parsed, in order.
pub fn merge_parsed(
    documents: &[Document],
    selections: Option<&[PageSelection]>,
    options: &MergeOptions,
    mut progress: Option<&mut dyn FnMut(usize, usize)>,
) -> Result<MergeOutput> {
    if documents.is_empty() {
        return Err(ValidationError::NoInputs.into());
    }
    check_selection_count(documents.len(), selections)?;

    let total = documents.len();
    let mut accumulator = OutputAccumulator::new(options.clone());
    let mut skipped = Vec::new();

    for (index, document) in documents.iter().enumerate() {
        if let Some(report) = progress.as_mut() {
            report(index, total);
        }
        let selection = selections.and_then(|all| all.get(index));
        if !append_document(&mut accumulator, index, document, selection)? {
            skipped.push(index);
        }
    }

    finish(accumulator, skipped)
}

/// Check everything that can be checked without parsing.
pub fn validate_inputs(
    inputs: &[MergeInput],
    selections: Option<&[PageSelection]>,
) -> std::result::Result<(), ValidationError> {
    if inputs.is_empty() {
        return Err(ValidationError::NoInputs);
    }
    check_selection_count(inputs.len(), selections)?;
    inputs.iter().try_for_each(MergeInput::check)
}

fn check_selection_count(
    inputs: usize,
    selections: Option<&[PageSelection]>,
) -> std::result::Result<(), ValidationError> {
    match selections {
        Some(selections) if selections.len() != inputs => Err(ValidationError::SelectionMismatch {
            inputs,
            selections: selections.len(),
        }),
        _ => Ok(()),
    }
}

/// Returns `false` when the document was skipped for having no pages.
fn append_document(
    accumulator: &mut OutputAccumulator,
    index: usize,
    document: &Document,
    selection: Option<&PageSelection>,
) -> Result<bool> {
    let page_count = document.page_count();
    if page_count == 0 {
        warn!("Skipping {}: document has no pages", document.label());
        return Ok(false);
    }

    let indices = selection
        .map(|selection| selection.indices(page_count))
        .unwrap_or_else(|| (0..page_count).collect());
    accumulator.append_input(index, document, &indices)?;
    debug!(
        "input #{} {}: {} of {} pages",
        index + 1,
        document.label(),
        indices.len(),
        page_count
    );
    Ok(true)
}

fn finish(mut accumulator: OutputAccumulator, skipped: Vec<usize>) -> Result<MergeOutput> {
    let pages = accumulator.page_count();
    let objects = accumulator.object_count();
    let bytes = accumulator.finalize()?;
    Ok(MergeOutput {
        bytes,
        pages,
        objects,
        skipped,
    })
}

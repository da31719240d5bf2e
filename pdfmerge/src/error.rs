//! Error types for pdfmerge.
//!
//! Errors are split by the layer that produces them so callers can tell
//! bad arguments apart from bad input files and from output failures.
//!
//! # Error Categories
//!
//! - **Validation Errors**: empty input list, missing paths, bad page selections
//! - **Read Errors**: malformed syntax, broken cross-reference data, corrupt page trees
//! - **Decode Errors**: stream filters that cannot be undone
//! - **Merge Errors**: the crate-level error wrapping all of the above plus
//!   writer state and output failures

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::object::ObjectId;

/// Result type alias for pdfmerge operations.
pub type Result<T> = std::result::Result<T, MergeError>;

/// Result type alias for the document reader.
pub type ReadResult<T> = std::result::Result<T, ReadError>;

/// Problems with the arguments of a merge, detected before any output exists.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The input list was empty.
    #[error("No input files specified for merging")]
    NoInputs,

    /// An input path does not exist.
    #[error("File not found: {}", .path.display())]
    InputNotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// An input path exists but is not a regular file.
    #[error("Not a file: {}", .path.display())]
    NotAFile {
        /// The offending path.
        path: PathBuf,
    },

    /// A page selection names a page the document does not have.
    #[error(
        "Page index {index} is out of range for input #{} ({page_count} page(s))",
        .input + 1
    )]
    PageIndexOutOfRange {
        /// Zero-based position of the input.
        input: usize,
        /// Zero-based page index that was requested.
        index: usize,
        /// Number of pages the input actually has.
        page_count: usize,
    },

    /// The number of page selections differs from the number of inputs.
    #[error("{selections} page selection(s) given for {inputs} input(s)")]
    SelectionMismatch {
        /// Number of inputs.
        inputs: usize,
        /// Number of selections.
        selections: usize,
    },
}

/// Failures while undoing a stream filter.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The filter is not one this crate can decode.
    #[error("unsupported stream filter /{0}")]
    UnsupportedFilter(String),

    /// Deflate data could not be inflated.
    #[error("corrupt FlateDecode data: {0}")]
    Flate(String),

    /// ASCIIHexDecode met a byte that is neither hex nor whitespace.
    #[error("invalid ASCIIHexDecode data at byte {0}")]
    AsciiHex(usize),

    /// ASCII85Decode data is malformed.
    #[error("invalid ASCII85Decode data: {0}")]
    Ascii85(String),

    /// Predictor parameters are unsupported or inconsistent with the data.
    #[error("unsupported predictor: {0}")]
    Predictor(String),
}

/// Failures while reading a single document.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The byte stream violates PDF syntax.
    #[error("malformed syntax at byte {offset}: {message}")]
    MalformedSyntax {
        /// Byte offset where the problem was noticed.
        offset: usize,
        /// What was wrong.
        message: String,
    },

    /// No usable cross-reference section or trailer was found.
    #[error("cross-reference error: {0}")]
    CrossRef(String),

    /// Cross-reference data exists but points at impossible locations.
    #[error("corrupt cross-reference data: {0}")]
    CorruptXref(String),

    /// The page tree is cyclic or structurally invalid.
    #[error("corrupt page tree: {0}")]
    CorruptPageTree(String),

    /// The document carries an /Encrypt entry.
    #[error(
        "document is encrypted and cannot be processed\n  \
         Hint: Decrypt the PDF first using 'qpdf --decrypt' or similar tools"
    )]
    EncryptedDocument,

    /// A reference names an object that is not in the document.
    #[error("reference {0} does not resolve to an object")]
    DanglingReference(ObjectId),

    /// A stream needed during reading could not be decoded.
    #[error("stream decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// The input bytes could not be read from disk.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ReadError {
    /// Create a MalformedSyntax error.
    pub fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::MalformedSyntax {
            offset,
            message: message.into(),
        }
    }

    /// Create a CorruptPageTree error.
    pub fn page_tree(message: impl Into<String>) -> Self {
        Self::CorruptPageTree(message.into())
    }
}

/// Main error type for merge operations.
#[derive(Debug, Error)]
pub enum MergeError {
    /// The arguments were rejected before any input was parsed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An input document could not be read.
    #[error("Failed to read PDF: {input}\n  Reason: {source}")]
    Read {
        /// Zero-based position of the offending input.
        index: usize,
        /// Human-readable label of the input (path or buffer name).
        input: String,
        /// What went wrong.
        #[source]
        source: ReadError,
    },

    /// The output could not be written.
    #[error("Failed to write output file: {}\n  Reason: {source}", .path.display())]
    Write {
        /// Destination path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The output accumulator was used after being finalized.
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),

    /// Finalize was called with no pages and the policy rejects empty output.
    #[error("No pages to write: every input was empty or skipped")]
    EmptyOutput,

    /// Output file already exists and overwrite is not allowed.
    #[error(
        "Output file already exists: {}\n  \
         Use --force to overwrite or choose a different output path",
        .path.display()
    )]
    OutputExists {
        /// Path to the existing output file.
        path: PathBuf,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what's wrong with the configuration.
        message: String,
    },

    /// User cancelled the operation.
    #[error("Operation cancelled by user")]
    Cancelled,

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic error with a custom message.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl From<anyhow::Error> for MergeError {
    fn from(err: anyhow::Error) -> Self {
        Self::invalid_config(format!("{err:#}"))
    }
}

impl MergeError {
    /// Create a Read error for the input at `index`.
    pub fn read(index: usize, input: impl Into<String>, source: ReadError) -> Self {
        Self::Read {
            index,
            input: input.into(),
            source,
        }
    }

    /// Create a Write error.
    pub fn write(path: PathBuf, source: io::Error) -> Self {
        Self::Write { path, source }
    }

    /// Create an OutputExists error.
    pub fn output_exists(path: PathBuf) -> Self {
        Self::OutputExists { path }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an Other error with a custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Check if this error should stop all processing immediately.
    ///
    /// Every merge error aborts the merge; fatal ones additionally mean
    /// the process cannot continue with a different input set.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Validation(ValidationError::NoInputs)
                | Self::Write { .. }
                | Self::InvalidState(_)
                | Self::Cancelled
        )
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(ValidationError::InputNotFound { .. }) => 2,
            Self::Validation(ValidationError::NotAFile { .. }) => 2,
            Self::Validation(_) => 1,
            Self::Read { .. } => 3,
            Self::OutputExists { .. } => 4,
            Self::Write { .. } => 5,
            Self::InvalidState(_) => 6,
            Self::EmptyOutput => 6,
            Self::InvalidConfig { .. } => 1,
            Self::Cancelled => 130, // Standard exit code for SIGINT
            Self::Io(_) => 5,
            Self::Other { .. } => 1,
        }
    }
}

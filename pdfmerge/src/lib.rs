//! pdfmerge - Merge PDF documents page by page.
//!
//! The crate carries its own PDF object model: a lexer and object parser, a
//! document reader that understands classic and stream cross-reference
//! sections, a page-tree walker, and a writer that copies each selected page
//! together with everything it references. On top of that sits an async
//! file layer for loading many inputs concurrently and writing the output
//! atomically.
//!
//! # Examples
//!
//! ## In-memory merge
//!
//! ```no_run
//! use pdfmerge::{MergeInput, MergeOptions, merge_documents};
//!
//! # fn example(a: Vec<u8>, b: Vec<u8>) -> pdfmerge::Result<()> {
//! let inputs = vec![MergeInput::bytes("a.pdf", a), MergeInput::bytes("b.pdf", b)];
//! let merged = merge_documents(&inputs, None, &MergeOptions::default(), None)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Files on disk
//!
//! ```no_run
//! use pdfmerge::config::Config;
//! use pdfmerge::io::PdfWriter;
//! use pdfmerge::merge::Merger;
//! use std::path::PathBuf;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::new(
//!     vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")],
//!     PathBuf::from("merged.pdf"),
//! );
//!
//! let result = Merger::new().merge(&config).await?;
//! PdfWriter::new().save(result.bytes, &config.output).await?;
//! println!("Created {} page document", result.statistics.total_pages);
//! # Ok(())
//! # }
//! ```
//!
//! ## Reading a document
//!
//! ```no_run
//! use pdfmerge::Document;
//!
//! # fn example(bytes: Vec<u8>) -> Result<(), Box<dyn std::error::Error>> {
//! let document = Document::open(bytes)?;
//! for page in document.pages() {
//!     let page = page?;
//!     println!("page {} has {} content bytes", page.index() + 1, page.content()?.len());
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod document;
pub mod error;
pub mod filters;
pub mod io;
pub mod merge;
pub mod object;
pub mod output;
pub mod parser;
pub mod utils;
pub mod validation;
pub mod writer;

#[cfg(test)]
mod test_support;

pub use config::{Config, MergeOptions};
pub use document::{Document, Page};
pub use error::{MergeError, ReadError, Result, ValidationError};
pub use merge::{MergeInput, PageSelection, merge_documents};
pub use object::{Dictionary, ObjectId, PdfObject};
pub use writer::OutputAccumulator;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

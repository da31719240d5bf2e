//! File I/O for inputs and output.

pub mod reader;
pub mod writer;

pub use reader::{LoadResult, LoadStatistics, LoadedPdf, PdfReader};
pub use writer::{PdfWriter, WriteOptions, WriteStatistics};

use std::path::Path;

use crate::error::Result;

/// Load one PDF with a default reader.
pub async fn load_pdf(path: &Path) -> Result<LoadedPdf> {
    PdfReader::new().load(path).await
}

/// Atomically write serialized PDF bytes with a default writer.
pub async fn save_pdf(bytes: Vec<u8>, path: &Path) -> Result<()> {
    PdfWriter::new().save(bytes, path).await
}

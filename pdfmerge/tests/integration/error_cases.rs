//! Integration tests for error handling and edge cases.

use std::path::PathBuf;

use pdfmerge::config::{Config, EmptyOutputPolicy};
use pdfmerge::error::{MergeError, ReadError, ValidationError};
use pdfmerge::io::PdfWriter;
use pdfmerge::merge::merge_pdfs;
use pdfmerge::{Document, MergeInput, MergeOptions, OutputAccumulator, merge_documents};
use tempfile::TempDir;

use crate::common::{lopdf_pdf, raw_pdf, self_cycle_pdf, write_fixture};

/// Merge then write, the way the CLI does; the output exists only on success.
async fn merge_to_file(config: &Config) -> Result<(), MergeError> {
    let result = merge_pdfs(config).await?;
    PdfWriter::new().save(result.bytes, &config.output).await
}

#[test]
fn test_error_empty_input_list() {
    let err = merge_documents(&[], None, &MergeOptions::default(), None).unwrap_err();
    assert!(matches!(err, MergeError::Validation(ValidationError::NoInputs)));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_error_nonexistent_input_leaves_no_output() {
    let temp_dir = TempDir::new().unwrap();
    let good = write_fixture(temp_dir.path(), "good.pdf", &lopdf_pdf(1, "A"));
    let missing = PathBuf::from("/nonexistent/file.pdf");
    let output = temp_dir.path().join("out.pdf");
    let config = Config::new(vec![good, missing.clone()], output.clone());

    let err = merge_to_file(&config).await.unwrap_err();
    match &err {
        MergeError::Validation(ValidationError::InputNotFound { path }) => {
            assert_eq!(path, &missing);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("/nonexistent/file.pdf"));
    assert_eq!(err.exit_code(), 2);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_error_directory_input() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::new(
        vec![temp_dir.path().to_path_buf()],
        temp_dir.path().join("out.pdf"),
    );

    let err = merge_pdfs(&config).await.unwrap_err();
    assert!(matches!(
        err,
        MergeError::Validation(ValidationError::NotAFile { .. })
    ));
}

#[test]
fn test_error_kids_self_cycle() {
    let inputs = vec![MergeInput::bytes("cycle.pdf", self_cycle_pdf())];

    let err = merge_documents(&inputs, None, &MergeOptions::default(), None).unwrap_err();
    match err {
        MergeError::Read {
            index,
            input,
            source: ReadError::CorruptPageTree(_),
        } => {
            assert_eq!(index, 0);
            assert_eq!(input, "cycle.pdf");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_error_cycle_through_intermediate_node() {
    let bytes = raw_pdf(
        &[
            (1, "<< /Type /Catalog /Pages 2 0 R >>"),
            (2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>"),
            (3, "<< /Type /Pages /Parent 2 0 R /Kids [2 0 R] /Count 1 >>"),
        ],
        "",
    );
    assert!(matches!(
        Document::open(bytes),
        Err(ReadError::CorruptPageTree(_))
    ));
}

#[test]
fn test_error_encrypted_input() {
    let bytes = raw_pdf(
        &[
            (1, "<< /Type /Catalog /Pages 2 0 R >>"),
            (2, "<< /Type /Pages /Kids [] /Count 0 >>"),
            (3, "<< /Filter /Standard /V 1 /R 2 >>"),
        ],
        "/Encrypt 3 0 R",
    );
    let inputs = vec![MergeInput::bytes("locked.pdf", bytes)];

    let err = merge_documents(&inputs, None, &MergeOptions::default(), None).unwrap_err();
    assert!(matches!(
        err,
        MergeError::Read {
            source: ReadError::EncryptedDocument,
            ..
        }
    ));
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn test_error_startxref_beyond_end() {
    let mut bytes = raw_pdf(
        &[
            (1, "<< /Type /Catalog /Pages 2 0 R >>"),
            (2, "<< /Type /Pages /Kids [] /Count 0 >>"),
        ],
        "",
    );
    let at = bytes.len() - b"%%EOF\n".len();
    bytes.truncate(at);
    bytes.extend_from_slice(b"startxref\n999999\n%%EOF\n");

    assert!(matches!(
        Document::open(bytes),
        Err(ReadError::CorruptXref(_))
    ));
}

#[test]
fn test_error_not_a_pdf() {
    let inputs = vec![
        MergeInput::bytes("a.pdf", lopdf_pdf(1, "A")),
        MergeInput::bytes("notes.txt", b"just some text".to_vec()),
    ];

    let err = merge_documents(&inputs, None, &MergeOptions::default(), None).unwrap_err();
    assert!(matches!(err, MergeError::Read { index: 1, .. }));
}

#[test]
fn test_error_page_index_out_of_range() {
    let document = Document::open(lopdf_pdf(2, "A")).unwrap();
    let mut accumulator = OutputAccumulator::default();

    let err = accumulator.append(&document, &[0, 2]).unwrap_err();
    assert!(matches!(
        err,
        MergeError::Validation(ValidationError::PageIndexOutOfRange {
            index: 2,
            page_count: 2,
            ..
        })
    ));
    assert_eq!(accumulator.page_count(), 0);
}

#[test]
fn test_error_accumulator_reuse() {
    let document = Document::open(lopdf_pdf(1, "A")).unwrap();
    let mut accumulator = OutputAccumulator::default();
    accumulator.append(&document, &[0]).unwrap();
    accumulator.finalize().unwrap();

    assert!(matches!(
        accumulator.append(&document, &[0]),
        Err(MergeError::InvalidState(_))
    ));
    assert!(matches!(
        accumulator.finalize(),
        Err(MergeError::InvalidState(_))
    ));
}

#[tokio::test]
async fn test_error_only_empty_inputs() {
    let temp_dir = TempDir::new().unwrap();
    let empty = write_fixture(temp_dir.path(), "empty.pdf", &lopdf_pdf(0, "E"));
    let output = temp_dir.path().join("out.pdf");
    let mut config = Config::new(vec![empty], output.clone());

    let err = merge_to_file(&config).await.unwrap_err();
    assert!(matches!(err, MergeError::EmptyOutput));
    assert!(!output.exists());

    config.empty_output = EmptyOutputPolicy::Allow;
    merge_to_file(&config).await.unwrap();
    assert_eq!(Document::load(&output).unwrap().page_count(), 0);
}

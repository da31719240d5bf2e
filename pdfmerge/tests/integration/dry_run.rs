//! Integration tests for dry-run validation.

use pdfmerge::config::{Config, EmptyOutputPolicy, OverwriteMode, PageRange};
use pdfmerge::error::{MergeError, ReadError};
use pdfmerge::validation::Validator;
use tempfile::TempDir;

use crate::common::{lopdf_pdf, raw_pdf, write_fixture};

#[tokio::test]
async fn test_dry_run_reports_without_writing() {
    let temp_dir = TempDir::new().unwrap();
    let a = write_fixture(temp_dir.path(), "a.pdf", &lopdf_pdf(3, "A"));
    let b = write_fixture(temp_dir.path(), "b.pdf", &lopdf_pdf(2, "B"));
    let output = temp_dir.path().join("out.pdf");
    let mut config = Config::new(vec![a.clone(), b], output.clone());
    config.dry_run = true;

    let summary = Validator::new().validate_config(&config).await.unwrap();

    assert_eq!(summary.files_validated, 2);
    assert_eq!(summary.total_pages, 5);
    assert_eq!(summary.selected_pages, 5);
    assert_eq!(summary.results[0].path, a);
    assert_eq!(summary.results[0].version, Some((1, 5)));
    assert_eq!(summary.results[0].page_dimensions, Some((612.0, 792.0)));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_dry_run_page_range_counts_selected_pages() {
    let temp_dir = TempDir::new().unwrap();
    let a = write_fixture(temp_dir.path(), "a.pdf", &lopdf_pdf(3, "A"));
    let b = write_fixture(temp_dir.path(), "b.pdf", &lopdf_pdf(1, "B"));
    let mut config = Config::new(vec![a, b], temp_dir.path().join("out.pdf"));
    config.page_range = Some(PageRange::parse("2-3").unwrap());

    let summary = Validator::new().validate_config(&config).await.unwrap();
    assert_eq!(summary.total_pages, 4);
    assert_eq!(summary.selected_pages, 2);
}

#[tokio::test]
async fn test_dry_run_json_report() {
    let temp_dir = TempDir::new().unwrap();
    let a = write_fixture(temp_dir.path(), "a.pdf", &lopdf_pdf(2, "A"));
    let config = Config::new(vec![a], temp_dir.path().join("out.pdf"));

    let summary = Validator::new().validate_config(&config).await.unwrap();
    let json = summary.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    assert_eq!(value["totalPages"], 2);
    assert_eq!(value["filesValidated"], 1);
    assert_eq!(value["results"][0]["pageCount"], 2);
    assert_eq!(value["results"][0]["isEncrypted"], false);
}

#[tokio::test]
async fn test_dry_run_no_clobber_existing_output() {
    let temp_dir = TempDir::new().unwrap();
    let a = write_fixture(temp_dir.path(), "a.pdf", &lopdf_pdf(1, "A"));
    let output = write_fixture(temp_dir.path(), "out.pdf", b"existing");
    let mut config = Config::new(vec![a], output.clone());

    config.overwrite_mode = OverwriteMode::NoClobber;
    let err = Validator::new().validate_config(&config).await.unwrap_err();
    assert!(matches!(err, MergeError::OutputExists { .. }));
    assert_eq!(err.exit_code(), 4);

    config.overwrite_mode = OverwriteMode::Force;
    Validator::new().validate_config(&config).await.unwrap();
    assert_eq!(std::fs::read(&output).unwrap(), b"existing");
}

#[tokio::test]
async fn test_dry_run_empty_selection() {
    let temp_dir = TempDir::new().unwrap();
    let a = write_fixture(temp_dir.path(), "a.pdf", &lopdf_pdf(2, "A"));
    let mut config = Config::new(vec![a], temp_dir.path().join("out.pdf"));
    config.page_range = Some(PageRange::parse("5-9").unwrap());

    let err = Validator::new().validate_config(&config).await.unwrap_err();
    assert!(matches!(err, MergeError::EmptyOutput));

    config.empty_output = EmptyOutputPolicy::Allow;
    let summary = Validator::new().validate_config(&config).await.unwrap();
    assert_eq!(summary.selected_pages, 0);
}

#[tokio::test]
async fn test_dry_run_flags_encrypted_input() {
    let temp_dir = TempDir::new().unwrap();
    let bytes = raw_pdf(
        &[
            (1, "<< /Type /Catalog /Pages 2 0 R >>"),
            (2, "<< /Type /Pages /Kids [] /Count 0 >>"),
        ],
        "/Encrypt << /Filter /Standard >>",
    );
    let locked = write_fixture(temp_dir.path(), "locked.pdf", &bytes);

    let validator = Validator::new();
    let result = validator.validate_file(&locked).await.unwrap();
    assert!(result.is_encrypted);
    assert_eq!(result.version, Some((1, 4)));

    let config = Config::new(vec![locked], temp_dir.path().join("out.pdf"));
    let err = validator.validate_config(&config).await.unwrap_err();
    assert!(matches!(
        err,
        MergeError::Read {
            source: ReadError::EncryptedDocument,
            ..
        }
    ));
}

//! Integration tests for merging well-formed inputs.

use pdfmerge::config::{Config, Metadata};
use pdfmerge::io::{PdfWriter, load_pdf, save_pdf};
use pdfmerge::merge::{Merger, merge_documents_with_report, merge_pdfs};
use pdfmerge::{Document, MergeInput, MergeOptions, ObjectId, PageSelection, merge_documents};
use tempfile::TempDir;

use crate::common::{
    lopdf_page_count, lopdf_page_texts, lopdf_pdf, lopdf_pdf_compressed, page_text,
    write_fixture,
};

fn page_contents(bytes: Vec<u8>) -> Vec<Vec<u8>> {
    let document = Document::open(bytes).unwrap();
    document
        .pages()
        .map(|page| page.unwrap().content().unwrap())
        .collect()
}

fn count_fonts(document: &Document) -> usize {
    document
        .xref()
        .live_numbers()
        // Everything the merger writes is generation 0.
        .filter_map(|number| document.get_dictionary(ObjectId::new(number, 0)).ok())
        .filter(|dict| dict.has_type(b"Font"))
        .count()
}

#[test]
fn test_page_counts_add_up() {
    let inputs = vec![
        MergeInput::bytes("a.pdf", lopdf_pdf(2, "A")),
        MergeInput::bytes("b.pdf", lopdf_pdf(3, "B")),
        MergeInput::bytes("c.pdf", lopdf_pdf(1, "C")),
    ];

    let bytes = merge_documents(&inputs, None, &MergeOptions::default(), None).unwrap();
    assert_eq!(Document::open(bytes.clone()).unwrap().page_count(), 6);
    assert_eq!(lopdf_page_count(&bytes), 6);
}

#[test]
fn test_output_is_readable_by_lopdf_in_order() {
    let inputs = vec![
        MergeInput::bytes("a.pdf", lopdf_pdf(2, "A")),
        MergeInput::bytes("b.pdf", lopdf_pdf(1, "B")),
    ];

    let bytes = merge_documents(&inputs, None, &MergeOptions::default(), None).unwrap();
    let texts = lopdf_page_texts(&bytes);
    assert_eq!(
        texts,
        vec![page_text("A", 1), page_text("A", 2), page_text("B", 1)]
    );
}

#[test]
fn test_single_input_round_trip_preserves_content() {
    let original = lopdf_pdf_compressed(4, "Doc");
    let inputs = vec![MergeInput::bytes("doc.pdf", original.clone())];

    let merged = merge_documents(&inputs, None, &MergeOptions::default(), None).unwrap();
    assert_eq!(page_contents(merged), page_contents(original));
}

#[test]
fn test_compressed_content_survives() {
    let inputs = vec![
        MergeInput::bytes("plain.pdf", lopdf_pdf(1, "Plain")),
        MergeInput::bytes("packed.pdf", lopdf_pdf_compressed(2, "Packed")),
    ];

    let merged = merge_documents(&inputs, None, &MergeOptions::default(), None).unwrap();
    let contents = page_contents(merged);
    assert_eq!(contents[1], page_text("Packed", 1).into_bytes());
    assert_eq!(contents[2], page_text("Packed", 2).into_bytes());
}

#[test]
fn test_shared_font_is_copied_once_per_input() {
    let inputs = vec![
        MergeInput::bytes("a.pdf", lopdf_pdf(5, "A")),
        MergeInput::bytes("b.pdf", lopdf_pdf(3, "B")),
    ];

    let merged = merge_documents(&inputs, None, &MergeOptions::default(), None).unwrap();
    let document = Document::open(merged).unwrap();
    assert_eq!(document.page_count(), 8);
    assert_eq!(count_fonts(&document), 2);
}

#[test]
fn test_extraction_is_idempotent() {
    let document = Document::open(lopdf_pdf(3, "X")).unwrap();

    let first: Vec<_> = document.pages().map(|p| p.unwrap().id()).collect();
    let second: Vec<_> = document.pages().map(|p| p.unwrap().id()).collect();
    assert_eq!(first, second);

    let contents: Vec<_> = document.pages().map(|p| p.unwrap().content().unwrap()).collect();
    let again: Vec<_> = document.pages().map(|p| p.unwrap().content().unwrap()).collect();
    assert_eq!(contents, again);
}

#[test]
fn test_selections_reorder_and_repeat() {
    let inputs = vec![
        MergeInput::bytes("a.pdf", lopdf_pdf(3, "A")),
        MergeInput::bytes("b.pdf", lopdf_pdf(2, "B")),
    ];
    let selections = [PageSelection::Pages(vec![2, 0, 0]), PageSelection::All];

    let output =
        merge_documents_with_report(&inputs, Some(&selections), &MergeOptions::default(), None)
            .unwrap();
    assert_eq!(output.pages, 5);
    assert_eq!(
        lopdf_page_texts(&output.bytes),
        vec![
            page_text("A", 3),
            page_text("A", 1),
            page_text("A", 1),
            page_text("B", 1),
            page_text("B", 2),
        ]
    );
}

#[test]
fn test_metadata_written_to_info() {
    let options = MergeOptions {
        metadata: Metadata::new(Some("Combined".to_string()), Some("Ada".to_string()), None, None),
        ..MergeOptions::default()
    };
    let inputs = vec![MergeInput::bytes("a.pdf", lopdf_pdf(1, "A"))];

    let merged = merge_documents(&inputs, None, &options, None).unwrap();
    let document = Document::open(merged).unwrap();
    let info = document.info().unwrap();
    assert_eq!(
        info.get(b"Title").unwrap(),
        &pdfmerge::PdfObject::string_literal("Combined")
    );
    assert!(info.contains_key(b"Producer"));
}

#[tokio::test]
async fn test_merge_files_and_save() {
    let temp_dir = TempDir::new().unwrap();
    let a = write_fixture(temp_dir.path(), "a.pdf", &lopdf_pdf(2, "A"));
    let b = write_fixture(temp_dir.path(), "b.pdf", &lopdf_pdf_compressed(2, "B"));
    let config = Config::new(vec![a, b], temp_dir.path().join("merged.pdf"));

    let result = merge_pdfs(&config).await.unwrap();
    assert_eq!(result.statistics.files_merged, 2);
    assert_eq!(result.statistics.total_pages, 4);

    let stats = PdfWriter::new()
        .save_with_stats(result.bytes, &config.output)
        .await
        .unwrap();
    assert!(stats.file_size > 0);

    let loaded = load_pdf(&config.output).await.unwrap();
    assert_eq!(loaded.page_count, 4);
    assert_eq!(lopdf_page_count(&std::fs::read(&config.output).unwrap()), 4);
}

#[tokio::test]
async fn test_merging_merged_output_again() {
    let temp_dir = TempDir::new().unwrap();
    let a = write_fixture(temp_dir.path(), "a.pdf", &lopdf_pdf(1, "A"));
    let b = write_fixture(temp_dir.path(), "b.pdf", &lopdf_pdf(1, "B"));

    let first = Merger::new()
        .merge(&Config::new(vec![a.clone(), b], temp_dir.path().join("ab.pdf")))
        .await
        .unwrap();
    let ab = temp_dir.path().join("ab.pdf");
    save_pdf(first.bytes, &ab).await.unwrap();

    let second = Merger::new()
        .merge(&Config::new(vec![ab, a], temp_dir.path().join("aba.pdf")))
        .await
        .unwrap();
    assert_eq!(
        lopdf_page_texts(&second.bytes),
        vec![page_text("A", 1), page_text("B", 1), page_text("A", 1)]
    );
}

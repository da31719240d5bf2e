//! Fixtures for the integration tests.
//!
//! Realistic inputs are authored with `lopdf`, an independent PDF library, so
//! the reader is exercised against files it did not write. Malformed inputs
//! are assembled byte by byte with [`raw_pdf`].

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::ZlibEncoder;
use lopdf::{Document as LoDocument, Object, Stream, dictionary};

/// Content stream text of page `index` (1-based) of a fixture.
pub fn page_text(prefix: &str, index: u32) -> String {
    format!("BT /F1 12 Tf 100 700 Td ({prefix} {index}) Tj ET")
}

/// A PDF with `pages` pages that all share one font through one resource dictionary.
pub fn lopdf_pdf(pages: u32, prefix: &str) -> Vec<u8> {
    build_lopdf(pages, prefix, false)
}

/// Like [`lopdf_pdf`], with FlateDecode content streams.
pub fn lopdf_pdf_compressed(pages: u32, prefix: &str) -> Vec<u8> {
    build_lopdf(pages, prefix, true)
}

fn build_lopdf(pages: u32, prefix: &str, compressed: bool) -> Vec<u8> {
    let mut doc = LoDocument::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut page_ids: Vec<Object> = Vec::new();
    for i in 1..=pages {
        let text = page_text(prefix, i).into_bytes();
        let stream = if compressed {
            Stream::new(dictionary! { "Filter" => "FlateDecode" }, zlib(&text))
        } else {
            Stream::new(dictionary! {}, text)
        };
        let content_id = doc.add_object(stream);
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        page_ids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids,
            "Count" => pages as i64,
        }
        .into(),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Assemble a classic-xref PDF from `(number, body)` pairs with object 1 as the catalog.
pub fn raw_pdf(objects: &[(u32, &str)], trailer_extra: &str) -> Vec<u8> {
    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::new();
    for (number, body) in objects {
        offsets.push((*number, out.len()));
        out.extend_from_slice(format!("{number} 0 obj\n{body}\nendobj\n").as_bytes());
    }

    let size = objects.iter().map(|(n, _)| *n).max().unwrap_or(0) + 1;
    let xref_offset = out.len();
    out.extend_from_slice(format!("xref\n0 {size}\n").as_bytes());
    for number in 0..size {
        match offsets.iter().find(|(n, _)| *n == number) {
            Some((_, offset)) => out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes()),
            None => out.extend_from_slice(b"0000000000 65535 f \n"),
        }
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {size} /Root 1 0 R {trailer_extra} >>\nstartxref\n{xref_offset}\n%%EOF\n"
        )
        .as_bytes(),
    );
    out
}

/// A page tree whose root lists itself as a kid.
pub fn self_cycle_pdf() -> Vec<u8> {
    raw_pdf(
        &[
            (1, "<< /Type /Catalog /Pages 2 0 R >>"),
            (2, "<< /Type /Pages /Kids [2 0 R] /Count 1 >>"),
        ],
        "",
    )
}

/// Write `bytes` to `dir/name` and return the path.
pub fn write_fixture(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Page count according to lopdf.
pub fn lopdf_page_count(bytes: &[u8]) -> usize {
    LoDocument::load_mem(bytes).unwrap().get_pages().len()
}

/// Text of every page according to lopdf, in page order.
pub fn lopdf_page_texts(bytes: &[u8]) -> Vec<String> {
    let doc = LoDocument::load_mem(bytes).unwrap();
    doc.get_pages()
        .values()
        .map(|id| String::from_utf8_lossy(&doc.get_page_content(*id).unwrap()).into_owned())
        .collect()
}

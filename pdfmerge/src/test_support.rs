//! Hand-assembled PDF files for unit tests.
//!
//! Object layout produced by [`PdfBuilder::with_pages`]:
//!
//! - `1` catalog, `2` page tree root (carries the media box), `3` shared
//!   Helvetica font, `4` info dictionary
//! - `5 + 2i` page `i`, `6 + 2i` its content stream
//! - extra objects (indirect lengths, intermediate nodes, object streams)
//!   are numbered after that

use std::collections::BTreeMap;
use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;

pub struct PdfBuilder {
    pages: usize,
    kids: Option<String>,
    trailer_extra: String,
    startxref: bool,
    bogus_offsets: Vec<(u32, usize)>,
    update: Option<(u32, String)>,
    replacements: Vec<(u32, String)>,
    indirect_lengths: bool,
    nested: bool,
    flate: bool,
    object_stream: bool,
}

impl PdfBuilder {
    pub fn with_pages(pages: usize) -> Self {
        Self {
            pages,
            kids: None,
            trailer_extra: String::new(),
            startxref: true,
            bogus_offsets: Vec::new(),
            update: None,
            replacements: Vec::new(),
            indirect_lengths: false,
            nested: false,
            flate: false,
            object_stream: false,
        }
    }

    /// Text drawn on page `index`.
    pub fn content_for(index: usize) -> Vec<u8> {
        format!("BT /F1 24 Tf 72 720 Td (Page {}) Tj ET", index + 1).into_bytes()
    }

    pub fn page_number(index: usize) -> u32 {
        5 + 2 * index as u32
    }

    pub fn kids(mut self, kids: &str) -> Self {
        self.kids = Some(kids.to_string());
        self
    }

    pub fn trailer_extra(mut self, extra: &str) -> Self {
        self.trailer_extra = extra.to_string();
        self
    }

    pub fn without_startxref(mut self) -> Self {
        self.startxref = false;
        self
    }

    pub fn bogus_offset(mut self, number: u32, offset: usize) -> Self {
        self.bogus_offsets.push((number, offset));
        self
    }

    pub fn incremental_update(mut self, number: u32, body: &str) -> Self {
        self.update = Some((number, body.to_string()));
        self
    }

    pub fn replace_object(mut self, number: u32, body: &str) -> Self {
        self.replacements.push((number, body.to_string()));
        self
    }

    pub fn indirect_lengths(mut self) -> Self {
        self.indirect_lengths = true;
        self
    }

    /// Hang the pages off an intermediate node that carries `/Resources` and `/Rotate 90`.
    pub fn nested_tree(mut self) -> Self {
        self.nested = true;
        self
    }

    pub fn flate_contents(mut self) -> Self {
        self.flate = true;
        self
    }

    /// Store the font in an object stream and index everything with an xref stream.
    pub fn object_stream(mut self) -> Self {
        self.object_stream = true;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut objects: BTreeMap<u32, Vec<u8>> = BTreeMap::new();
        let mut next = 5 + 2 * self.pages as u32;
        let mut alloc = || {
            let number = next;
            next += 1;
            number
        };

        let page_refs: Vec<String> = (0..self.pages)
            .map(|i| format!("{} 0 R", Self::page_number(i)))
            .collect();
        let intermediate = self.nested.then(&mut alloc);
        let root_kids = match (&self.kids, intermediate) {
            (Some(kids), _) => kids.clone(),
            (None, Some(node)) => format!("[{node} 0 R]"),
            (None, None) => format!("[{}]", page_refs.join(" ")),
        };

        objects.insert(1, b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());
        objects.insert(
            2,
            format!(
                "<< /Type /Pages /Kids {root_kids} /Count {} /MediaBox [0 0 612 792] >>",
                self.pages
            )
            .into_bytes(),
        );
        objects.insert(
            3,
            b"<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_vec(),
        );
        objects.insert(4, b"<< /Producer (PdfBuilder) /Title (Fixture) >>".to_vec());

        if let Some(node) = intermediate {
            objects.insert(
                node,
                format!(
                    "<< /Type /Pages /Parent 2 0 R /Kids [{}] /Count {} /Rotate 90 \
                     /Resources << /Font << /F1 3 0 R >> >> >>",
                    page_refs.join(" "),
                    self.pages
                )
                .into_bytes(),
            );
        }

        for i in 0..self.pages {
            let page = Self::page_number(i);
            let content = page + 1;
            let page_dict = match intermediate {
                Some(node) => format!("<< /Type /Page /Parent {node} 0 R /Contents {content} 0 R >>"),
                None => format!(
                    "<< /Type /Page /Parent 2 0 R /Resources << /Font << /F1 3 0 R >> >> \
                     /Contents {content} 0 R >>"
                ),
            };
            objects.insert(page, page_dict.into_bytes());

            let (data, filter) = if self.flate {
                (zlib(&Self::content_for(i)), " /Filter /FlateDecode")
            } else {
                (Self::content_for(i), "")
            };
            let length = if self.indirect_lengths {
                let holder = alloc();
                objects.insert(holder, data.len().to_string().into_bytes());
                format!("{holder} 0 R")
            } else {
                data.len().to_string()
            };
            objects.insert(content, stream_body(&format!("/Length {length}{filter}"), &data));
        }

        for (number, body) in &self.replacements {
            objects.insert(*number, body.clone().into_bytes());
        }

        if self.object_stream {
            let container = alloc();
            let xref_number = alloc();
            return self.build_with_xref_stream(objects, container, xref_number);
        }

        let mut out = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
        let mut offsets = write_objects(&mut out, &objects);
        for (number, offset) in &self.bogus_offsets {
            offsets.insert(*number, *offset);
        }
        let size = objects.keys().next_back().map_or(1, |max| max + 1);

        let xref_offset = out.len();
        out.extend_from_slice(format!("xref\n0 {size}\n0000000000 65535 f \n").as_bytes());
        for number in 1..size {
            match offsets.get(&number) {
                Some(offset) => out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes()),
                None => out.extend_from_slice(b"0000000000 65535 f \n"),
            }
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {size} /Root 1 0 R /Info 4 0 R {} >>\n",
                self.trailer_extra
            )
            .as_bytes(),
        );
        if self.startxref {
            out.extend_from_slice(format!("startxref\n{xref_offset}\n").as_bytes());
        }
        out.extend_from_slice(b"%%EOF\n");

        if let Some((number, body)) = &self.update {
            let offset = out.len();
            out.extend_from_slice(format!("{number} 0 obj\n{body}\nendobj\n").as_bytes());
            let update_xref = out.len();
            out.extend_from_slice(
                format!(
                    "xref\n0 1\n0000000000 65535 f \n{number} 1\n{offset:010} 00000 n \n\
                     trailer\n<< /Size {size} /Root 1 0 R /Info 4 0 R /Prev {xref_offset} >>\n\
                     startxref\n{update_xref}\n%%EOF\n"
                )
                .as_bytes(),
            );
        }

        out
    }

    fn build_with_xref_stream(
        &self,
        mut objects: BTreeMap<u32, Vec<u8>>,
        container: u32,
        xref_number: u32,
    ) -> Vec<u8> {
        let font = objects.remove(&3).unwrap_or_default();
        let header = b"3 0 ".to_vec();
        let mut payload = header.clone();
        payload.extend_from_slice(&font);
        objects.insert(
            container,
            stream_body(
                &format!(
                    "/Type /ObjStm /N 1 /First {} /Length {}",
                    header.len(),
                    payload.len()
                ),
                &payload,
            ),
        );

        let mut out = b"%PDF-1.5\n%\xE2\xE3\xCF\xD3\n".to_vec();
        let offsets = write_objects(&mut out, &objects);
        let xref_offset = out.len();
        let size = xref_number + 1;

        let mut rows = Vec::new();
        for number in 0..size {
            let (kind, second, third): (u8, u32, u16) = if number == 3 {
                (2, container, 0)
            } else if number == xref_number {
                (1, xref_offset as u32, 0)
            } else if let Some(offset) = offsets.get(&number) {
                (1, *offset as u32, 0)
            } else {
                (0, 0, 0)
            };
            rows.push(kind);
            rows.extend_from_slice(&second.to_be_bytes());
            rows.extend_from_slice(&third.to_be_bytes());
        }

        out.extend_from_slice(format!("{xref_number} 0 obj\n").as_bytes());
        out.extend_from_slice(&stream_body(
            &format!(
                "/Type /XRef /Size {size} /W [1 4 2] /Root 1 0 R /Info 4 0 R /Length {}",
                rows.len()
            ),
            &rows,
        ));
        out.extend_from_slice(b"\nendobj\n");
        out.extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF\n").as_bytes());
        out
    }
}

fn write_objects(out: &mut Vec<u8>, objects: &BTreeMap<u32, Vec<u8>>) -> BTreeMap<u32, usize> {
    let mut offsets = BTreeMap::new();
    for (number, body) in objects {
        offsets.insert(*number, out.len());
        out.extend_from_slice(format!("{number} 0 obj\n").as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }
    offsets
}

fn stream_body(dict_entries: &str, data: &[u8]) -> Vec<u8> {
    let mut body = format!("<< {dict_entries} >>\nstream\n").into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(b"\nendstream");
    body
}

pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

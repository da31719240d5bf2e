//! Byte-level serialization of objects and whole files.

use crate::object::{Dictionary, PdfObject, StringFormat};

/// Binary comment written after the header so transfer tools treat the file as binary.
const BINARY_MARKER: &[u8] = b"%\xE2\xE3\xCF\xD3\n";

/// Append the textual form of `object` to `out`.
pub fn write_object(out: &mut Vec<u8>, object: &PdfObject) {
    match object {
        PdfObject::Null => out.extend_from_slice(b"null"),
        PdfObject::Boolean(true) => out.extend_from_slice(b"true"),
        PdfObject::Boolean(false) => out.extend_from_slice(b"false"),
        PdfObject::Integer(value) => out.extend_from_slice(value.to_string().as_bytes()),
        PdfObject::Real(value) => out.extend_from_slice(format_real(*value).as_bytes()),
        PdfObject::String(bytes, StringFormat::Literal) => write_literal_string(out, bytes),
        PdfObject::String(bytes, StringFormat::Hexadecimal) => write_hex_string(out, bytes),
        PdfObject::Name(name) => write_name(out, name),
        PdfObject::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_object(out, item);
            }
            out.push(b']');
        }
        PdfObject::Dictionary(dict) => write_dictionary(out, dict),
        PdfObject::Stream(stream) => {
            let mut dict = stream.dict.clone();
            dict.set("Length", stream.raw_content().len());
            write_dictionary(out, &dict);
            out.extend_from_slice(b"\nstream\n");
            out.extend_from_slice(stream.raw_content());
            out.extend_from_slice(b"\nendstream");
        }
        PdfObject::Reference(id) => {
            out.extend_from_slice(format!("{} {} R", id.number, id.generation).as_bytes());
        }
    }
}

fn write_dictionary(out: &mut Vec<u8>, dict: &Dictionary) {
    out.extend_from_slice(b"<<");
    for (key, value) in dict.iter() {
        write_name(out, key);
        out.push(b' ');
        write_object(out, value);
    }
    out.extend_from_slice(b">>");
}

fn write_name(out: &mut Vec<u8>, name: &[u8]) {
    out.push(b'/');
    for &byte in name {
        let regular = (0x21..=0x7E).contains(&byte)
            && !matches!(
                byte,
                b'#' | b'/' | b'%' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}'
            );
        if regular {
            out.push(byte);
        } else {
            out.extend_from_slice(format!("#{byte:02X}").as_bytes());
        }
    }
}

fn write_literal_string(out: &mut Vec<u8>, bytes: &[u8]) {
    out.push(b'(');
    for &byte in bytes {
        match byte {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(byte);
            }
            b'\r' => out.extend_from_slice(b"\\r"),
            _ => out.push(byte),
        }
    }
    out.push(b')');
}

fn write_hex_string(out: &mut Vec<u8>, bytes: &[u8]) {
    out.push(b'<');
    for byte in bytes {
        out.extend_from_slice(format!("{byte:02X}").as_bytes());
    }
    out.push(b'>');
}

/// Fixed-point form without exponent or trailing zeros; PDF has no exponent syntax.
pub fn format_real(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let text = format!("{value:.6}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "" | "-0" | "-" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Write a complete file: header, numbered objects, xref table, trailer.
///
/// `objects` must be sorted by object number; gaps become free entries.
pub fn write_file<'a>(
    version: &str,
    objects: impl IntoIterator<Item = (u32, &'a PdfObject)>,
    trailer: &Dictionary,
) -> Vec<u8> {
    let mut out = format!("%PDF-{version}\n").into_bytes();
    out.extend_from_slice(BINARY_MARKER);

    let mut offsets: Vec<Option<usize>> = vec![None];
    for (number, object) in objects {
        let slot = number as usize;
        if offsets.len() <= slot {
            offsets.resize(slot + 1, None);
        }
        offsets[slot] = Some(out.len());
        out.extend_from_slice(format!("{number} 0 obj\n").as_bytes());
        write_object(&mut out, object);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_offset = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", offsets.len()).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f\r\n");
    for offset in offsets.iter().skip(1) {
        match offset {
            Some(offset) => out.extend_from_slice(format!("{offset:010} 00000 n\r\n").as_bytes()),
            None => out.extend_from_slice(b"0000000000 65535 f\r\n"),
        }
    }

    let mut trailer = trailer.clone();
    trailer.set("Size", offsets.len());
    out.extend_from_slice(b"trailer\n");
    write_dictionary(&mut out, &trailer);
    out.extend_from_slice(format!("\nstartxref\n{xref_offset}\n%%EOF\n").as_bytes());
    out
}

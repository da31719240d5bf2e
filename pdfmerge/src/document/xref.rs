//! Cross-reference tables and streams.

use std::collections::{BTreeMap, HashSet};

use log::{debug, warn};

use crate::error::{ReadError, ReadResult};
use crate::object::{Dictionary, PdfObject};
use crate::parser::lexer::{Lexer, Token};
use crate::parser::objects::{parse_indirect_object, parse_object, rfind};

/// Where an object lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    /// Free slot.
    Free,
    /// Uncompressed object at a byte offset.
    InUse {
        /// Byte offset of `N G obj`.
        offset: usize,
        /// Generation number.
        generation: u16,
    },
    /// Object stored inside an object stream.
    Compressed {
        /// Object number of the containing `/ObjStm`.
        container: u32,
        /// Position within the object stream.
        index: u32,
    },
}

/// Merged view of every cross-reference section of a document.
#[derive(Debug, Clone, Default)]
pub struct XrefTable {
    entries: BTreeMap<u32, XrefEntry>,
}

impl XrefTable {
    /// Entry for an object number.
    pub fn get(&self, number: u32) -> Option<XrefEntry> {
        self.entries.get(&number).copied()
    }

    /// Record an entry unless a newer section already did.
    pub fn insert_if_absent(&mut self, number: u32, entry: XrefEntry) {
        self.entries.entry(number).or_insert(entry);
    }

    /// Fold an older section underneath this one.
    pub fn merge_older(&mut self, older: XrefTable) {
        for (number, entry) in older.entries {
            self.insert_if_absent(number, entry);
        }
    }

    /// Object numbers that refer to live objects.
    pub fn live_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries
            .iter()
            .filter(|(_, entry)| !matches!(entry, XrefEntry::Free))
            .map(|(number, _)| *number)
    }

    /// All entries in object-number order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, XrefEntry)> + '_ {
        self.entries.iter().map(|(number, entry)| (*number, *entry))
    }

    /// Highest object number mentioned.
    pub fn max_number(&self) -> Option<u32> {
        self.entries.keys().next_back().copied()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries were read.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One cross-reference section and the trailer that came with it.
#[derive(Debug)]
pub struct XrefSection {
    /// Entries of this section.
    pub table: XrefTable,
    /// Trailer dictionary (the stream dictionary for xref streams).
    pub trailer: Dictionary,
}

/// Read the full cross-reference chain and return the merged table plus the newest trailer.
pub fn read_xref_chain(buf: &[u8]) -> ReadResult<(XrefTable, Dictionary)> {
    let primary = match find_startxref(buf) {
        Some(start) if start >= buf.len() => {
            return Err(ReadError::CorruptXref(format!(
                "startxref offset {start} is beyond the end of the file ({} bytes)",
                buf.len()
            )));
        }
        Some(start) => follow_chain(buf, start),
        None => Err(ReadError::CrossRef("no startxref keyword found".to_string())),
    };

    match primary {
        Ok(result) => Ok(result),
        Err(err @ (ReadError::CorruptXref(_) | ReadError::EncryptedDocument)) => Err(err),
        Err(err) => {
            let Some(start) = find_xref_before_last_trailer(buf) else {
                return Err(err);
            };
            warn!("startxref is unusable ({err}); recovering from the last trailer");
            follow_chain(buf, start).map_err(|_| err)
        }
    }
}

fn follow_chain(buf: &[u8], start: usize) -> ReadResult<(XrefTable, Dictionary)> {
    let mut table = XrefTable::default();
    let mut newest_trailer: Option<Dictionary> = None;
    let mut visited = HashSet::new();
    let mut next = Some(start);

    while let Some(offset) = next {
        if offset >= buf.len() {
            return Err(ReadError::CorruptXref(format!(
                "cross-reference offset {offset} is beyond the end of the file ({} bytes)",
                buf.len()
            )));
        }
        if !visited.insert(offset) {
            warn!("/Prev chain loops back to byte {offset}; stopping");
            break;
        }

        let mut section = parse_section(buf, offset)?;
        debug!(
            "read cross-reference section at byte {offset} with {} entries",
            section.table.len()
        );

        if let Some(stream_offset) = offset_entry(&section.trailer, b"XRefStm")? {
            if stream_offset >= buf.len() {
                return Err(ReadError::CorruptXref(format!(
                    "/XRefStm offset {stream_offset} is beyond the end of the file"
                )));
            }
            let hybrid = parse_section(buf, stream_offset)?;
            section.table.merge_older(hybrid.table);
        }

        table.merge_older(section.table);
        next = offset_entry(&section.trailer, b"Prev")?;
        if newest_trailer.is_none() {
            newest_trailer = Some(section.trailer);
        }
    }

    let trailer = newest_trailer
        .ok_or_else(|| ReadError::CrossRef("no cross-reference section found".to_string()))?;
    Ok((table, trailer))
}

fn offset_entry(trailer: &Dictionary, key: &[u8]) -> ReadResult<Option<usize>> {
    match trailer.get(key) {
        None => Ok(None),
        Some(PdfObject::Integer(value)) => usize::try_from(*value).map(Some).map_err(|_| {
            ReadError::CorruptXref(format!(
                "/{} offset {value} is negative",
                String::from_utf8_lossy(key)
            ))
        }),
        Some(other) => Err(ReadError::CorruptXref(format!(
            "/{} is a {}, expected an integer",
            String::from_utf8_lossy(key),
            other.kind()
        ))),
    }
}

/// Offset named after the last `startxref` keyword.
pub fn find_startxref(buf: &[u8]) -> Option<usize> {
    let keyword = rfind(buf, b"startxref", buf.len())?;
    let mut lexer = Lexer::at(buf, keyword + b"startxref".len());
    match lexer.next_token() {
        Ok(Some(Token::Integer(offset))) => usize::try_from(offset).ok(),
        _ => None,
    }
}

/// Offset of the `xref` keyword preceding the last `trailer` keyword.
fn find_xref_before_last_trailer(buf: &[u8]) -> Option<usize> {
    let trailer = rfind(buf, b"trailer", buf.len())?;
    let mut end = trailer;
    while let Some(candidate) = rfind(buf, b"xref", end) {
        // Skip the tail of "startxref".
        let preceded_by_letter = candidate > 0 && buf[candidate - 1].is_ascii_alphabetic();
        if !preceded_by_letter {
            return Some(candidate);
        }
        end = candidate;
    }
    None
}

/// Parse the section at `offset`: a classic table or an xref stream.
pub fn parse_section(buf: &[u8], offset: usize) -> ReadResult<XrefSection> {
    let mut lexer = Lexer::at(buf, offset);
    match lexer.peek_token()? {
        Some(token) if token.is_keyword(b"xref") => {
            lexer.next_token()?;
            parse_table(&mut lexer)
        }
        Some(Token::Integer(_)) => parse_stream(buf, offset),
        _ => Err(ReadError::CrossRef(format!(
            "no cross-reference section at byte {offset}"
        ))),
    }
}

fn parse_table(lexer: &mut Lexer<'_>) -> ReadResult<XrefSection> {
    let mut table = XrefTable::default();

    loop {
        let section_offset = lexer.position();
        match lexer.next_token()? {
            Some(token) if token.is_keyword(b"trailer") => break,
            Some(Token::Integer(first)) => {
                let count = match lexer.next_token()? {
                    Some(Token::Integer(count)) => count,
                    _ => {
                        return Err(ReadError::CrossRef(format!(
                            "malformed subsection header at byte {section_offset}"
                        )));
                    }
                };
                let (Ok(first), Ok(count)) = (u32::try_from(first), u32::try_from(count)) else {
                    return Err(ReadError::CrossRef(format!(
                        "negative subsection bounds at byte {section_offset}"
                    )));
                };
                for i in 0..count {
                    let entry = parse_table_entry(lexer)?;
                    table.insert_if_absent(first.saturating_add(i), entry);
                }
            }
            _ => {
                return Err(ReadError::CrossRef(format!(
                    "expected subsection or trailer at byte {section_offset}"
                )));
            }
        }
    }

    let trailer_offset = lexer.position();
    let trailer = match parse_object(lexer)? {
        PdfObject::Dictionary(dict) => dict,
        other => {
            return Err(ReadError::CrossRef(format!(
                "trailer at byte {trailer_offset} is a {}, expected a dictionary",
                other.kind()
            )));
        }
    };
    Ok(XrefSection { table, trailer })
}

fn parse_table_entry(lexer: &mut Lexer<'_>) -> ReadResult<XrefEntry> {
    let at = lexer.position();
    let bad = || ReadError::CrossRef(format!("malformed cross-reference entry at byte {at}"));

    let Some(Token::Integer(offset)) = lexer.next_token()? else {
        return Err(bad());
    };
    let Some(Token::Integer(generation)) = lexer.next_token()? else {
        return Err(bad());
    };
    let kind = lexer.next_token()?.ok_or_else(bad)?;

    if kind.is_keyword(b"f") {
        return Ok(XrefEntry::Free);
    }
    if !kind.is_keyword(b"n") {
        return Err(bad());
    }
    let offset = usize::try_from(offset).map_err(|_| bad())?;
    let generation = u16::try_from(generation).map_err(|_| bad())?;
    // Some writers mark unused slots as "0000000000 00000 n".
    if offset == 0 {
        return Ok(XrefEntry::Free);
    }
    Ok(XrefEntry::InUse { offset, generation })
}

fn parse_stream(buf: &[u8], offset: usize) -> ReadResult<XrefSection> {
    let (_, object) = parse_indirect_object(buf, offset, &mut |_| None)?;
    let PdfObject::Stream(stream) = object else {
        return Err(ReadError::CrossRef(format!(
            "object at byte {offset} is not a cross-reference stream"
        )));
    };
    if !stream.dict.has_type(b"XRef") {
        return Err(ReadError::CrossRef(format!(
            "stream at byte {offset} is not /Type /XRef"
        )));
    }
    // Encryption never applies to xref streams, but an encrypted file must still be refused.
    if stream.dict.contains_key(b"Encrypt") {
        return Err(ReadError::EncryptedDocument);
    }

    let widths: Vec<usize> = stream
        .dict
        .get(b"W")
        .and_then(PdfObject::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(PdfObject::as_i64)
                .filter_map(|w| usize::try_from(w).ok())
                .collect()
        })
        .unwrap_or_default();
    if widths.len() != 3 || widths.iter().any(|w| *w > 8) {
        return Err(ReadError::CorruptXref(format!(
            "cross-reference stream at byte {offset} has invalid /W {widths:?}"
        )));
    }
    let row_len: usize = widths.iter().sum();
    if row_len == 0 {
        return Err(ReadError::CorruptXref(format!(
            "cross-reference stream at byte {offset} has zero-width rows"
        )));
    }

    let size = stream
        .dict
        .get(b"Size")
        .and_then(PdfObject::as_i64)
        .unwrap_or(0);
    let ranges: Vec<(i64, i64)> = match stream.dict.get(b"Index").and_then(PdfObject::as_array) {
        Some(items) => items
            .chunks(2)
            .filter_map(|pair| Some((pair.first()?.as_i64()?, pair.get(1)?.as_i64()?)))
            .collect(),
        None => vec![(0, size)],
    };

    let data = stream.decoded_content()?;
    let mut rows = data.chunks_exact(row_len);
    let mut table = XrefTable::default();

    for (first, count) in ranges {
        let (Ok(first), Ok(count)) = (u32::try_from(first), u32::try_from(count)) else {
            return Err(ReadError::CorruptXref(format!(
                "cross-reference stream at byte {offset} has a negative /Index"
            )));
        };
        for i in 0..count {
            let Some(row) = rows.next() else {
                warn!("cross-reference stream at byte {offset} is shorter than its /Index");
                break;
            };
            let (kind_field, rest) = row.split_at(widths[0]);
            let (second, third) = rest.split_at(widths[1]);
            let kind = if widths[0] == 0 { 1 } else { be_value(kind_field) };
            let second = be_value(second);
            let third = be_value(third);

            let entry = match kind {
                0 => XrefEntry::Free,
                1 => XrefEntry::InUse {
                    offset: usize::try_from(second).unwrap_or(usize::MAX),
                    generation: u16::try_from(third).unwrap_or(u16::MAX),
                },
                2 => XrefEntry::Compressed {
                    container: u32::try_from(second).unwrap_or(u32::MAX),
                    index: u32::try_from(third).unwrap_or(u32::MAX),
                },
                // Unknown types are treated as null references.
                _ => XrefEntry::Free,
            };
            table.insert_if_absent(first.saturating_add(i), entry);
        }
    }

    Ok(XrefSection {
        table,
        trailer: stream.dict.clone(),
    })
}

fn be_value(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(0u64, |acc, &byte| (acc << 8) | u64::from(byte))
}

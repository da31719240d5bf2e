//! Object parsing on top of the lexer.

use log::warn;

use crate::error::{ReadError, ReadResult};
use crate::object::{Dictionary, ObjectId, PdfObject, Stream};
use crate::parser::lexer::{Lexer, Token, is_whitespace};

/// Nesting limit for arrays and dictionaries.
const MAX_DEPTH: usize = 256;

/// Parse one direct object starting at the lexer's cursor.
pub fn parse_object(lexer: &mut Lexer<'_>) -> ReadResult<PdfObject> {
    parse_nested(lexer, 0)
}

fn parse_nested(lexer: &mut Lexer<'_>, depth: usize) -> ReadResult<PdfObject> {
    if depth > MAX_DEPTH {
        return Err(ReadError::syntax(lexer.position(), "objects nested too deeply"));
    }

    let offset = lexer.position();
    let Some(token) = lexer.next_token()? else {
        return Err(ReadError::syntax(offset, "unexpected end of input"));
    };

    match token {
        Token::Integer(number) => Ok(parse_reference_tail(lexer, number)
            .unwrap_or(PdfObject::Integer(number))),
        Token::Real(value) => Ok(PdfObject::Real(value)),
        Token::Name(name) => Ok(PdfObject::Name(name)),
        Token::String(bytes, format) => Ok(PdfObject::String(bytes, format)),
        Token::ArrayStart => {
            let mut items = Vec::new();
            loop {
                match lexer.peek_token()? {
                    Some(Token::ArrayEnd) => {
                        lexer.next_token()?;
                        break;
                    }
                    Some(_) => items.push(parse_nested(lexer, depth + 1)?),
                    None => return Err(ReadError::syntax(offset, "unterminated array")),
                }
            }
            Ok(PdfObject::Array(items))
        }
        Token::DictStart => parse_dictionary_body(lexer, offset, depth).map(PdfObject::Dictionary),
        Token::Keyword(b"true") => Ok(PdfObject::Boolean(true)),
        Token::Keyword(b"false") => Ok(PdfObject::Boolean(false)),
        Token::Keyword(b"null") => Ok(PdfObject::Null),
        Token::Keyword(word) => Err(ReadError::syntax(
            offset,
            format!("unexpected keyword '{}'", String::from_utf8_lossy(word)),
        )),
        Token::ArrayEnd | Token::DictEnd => {
            Err(ReadError::syntax(offset, "unexpected closing delimiter"))
        }
        Token::Comment(_) => Err(ReadError::syntax(offset, "unexpected comment")),
    }
}

/// After an integer, try to read `G R`. Restores the cursor when it is not a reference.
fn parse_reference_tail(lexer: &mut Lexer<'_>, number: i64) -> Option<PdfObject> {
    let saved = lexer.position();
    let result = (|| {
        let number = u32::try_from(number).ok()?;
        let Ok(Some(Token::Integer(generation))) = lexer.next_token() else {
            return None;
        };
        let generation = u16::try_from(generation).ok()?;
        match lexer.next_token() {
            Ok(Some(token)) if token.is_keyword(b"R") => {
                Some(PdfObject::Reference(ObjectId::new(number, generation)))
            }
            _ => None,
        }
    })();
    if result.is_none() {
        lexer.set_position(saved);
    }
    result
}

fn parse_dictionary_body(
    lexer: &mut Lexer<'_>,
    offset: usize,
    depth: usize,
) -> ReadResult<Dictionary> {
    let mut dict = Dictionary::new();
    loop {
        let key_offset = lexer.position();
        match lexer.next_token()? {
            Some(Token::DictEnd) => return Ok(dict),
            Some(Token::Name(key)) => {
                // A key directly followed by '>>' has no value; read it as null.
                if matches!(lexer.peek_token()?, Some(Token::DictEnd)) {
                    dict.set(key, PdfObject::Null);
                    continue;
                }
                let value = parse_nested(lexer, depth + 1)?;
                dict.set(key, value);
            }
            Some(other) => {
                return Err(ReadError::syntax(
                    key_offset,
                    format!("dictionary key must be a name, found {other:?}"),
                ));
            }
            None => return Err(ReadError::syntax(offset, "unterminated dictionary")),
        }
    }
}

/// Parse `N G obj <object> [stream ... endstream] endobj` at `offset`.
///
/// `resolve_length` is asked for the value of an indirect `/Length`; returning
/// `None` makes the parser fall back to scanning for `endstream`.
pub fn parse_indirect_object(
    buf: &[u8],
    offset: usize,
    resolve_length: &mut dyn FnMut(ObjectId) -> Option<i64>,
) -> ReadResult<(ObjectId, PdfObject)> {
    let mut lexer = Lexer::at(buf, offset);

    let number = match lexer.next_token()? {
        Some(Token::Integer(n)) => u32::try_from(n)
            .map_err(|_| ReadError::syntax(offset, "object number out of range"))?,
        _ => return Err(ReadError::syntax(offset, "expected object number")),
    };
    let generation = match lexer.next_token()? {
        Some(Token::Integer(g)) => u16::try_from(g)
            .map_err(|_| ReadError::syntax(offset, "generation number out of range"))?,
        _ => return Err(ReadError::syntax(offset, "expected generation number")),
    };
    match lexer.next_token()? {
        Some(token) if token.is_keyword(b"obj") => {}
        _ => return Err(ReadError::syntax(lexer.position(), "expected 'obj' keyword")),
    }
    let id = ObjectId::new(number, generation);

    let object = parse_object(&mut lexer)?;

    let object = match (object, lexer.peek_token()?) {
        (PdfObject::Dictionary(dict), Some(token)) if token.is_keyword(b"stream") => {
            lexer.next_token()?;
            let stream = read_stream_body(&mut lexer, dict, resolve_length)?;
            PdfObject::Stream(stream)
        }
        (object, _) => object,
    };

    Ok((id, object))
}

fn read_stream_body(
    lexer: &mut Lexer<'_>,
    dict: Dictionary,
    resolve_length: &mut dyn FnMut(ObjectId) -> Option<i64>,
) -> ReadResult<Stream> {
    let buf = lexer.buffer();
    let mut start = lexer.position();
    // The keyword is followed by CRLF or LF; tolerate a lone CR too.
    if buf.get(start) == Some(&b'\r') {
        start += 1;
    }
    if buf.get(start) == Some(&b'\n') {
        start += 1;
    }

    let declared = match dict.get(b"Length") {
        Some(PdfObject::Integer(length)) => Some(*length),
        Some(PdfObject::Reference(id)) => resolve_length(*id),
        _ => None,
    };

    if let Some(length) = declared.and_then(|l| usize::try_from(l).ok())
        && let Some(end) = start.checked_add(length)
        && end <= buf.len()
        && ends_with_endstream(buf, end)
    {
        let raw = buf[start..end].to_vec();
        lexer.set_position(end);
        skip_endstream(lexer);
        return Ok(Stream::new(dict, raw));
    }

    let Some(keyword_at) = find(buf, b"endstream", start) else {
        return Err(ReadError::syntax(start, "unterminated stream"));
    };
    if declared.is_some() {
        warn!(
            "stream /Length at byte {start} does not match its data; scanning for endstream"
        );
    }
    let mut end = keyword_at;
    if end > start && buf[end - 1] == b'\n' {
        end -= 1;
    }
    if end > start && buf[end - 1] == b'\r' {
        end -= 1;
    }
    let raw = buf[start..end].to_vec();
    lexer.set_position(keyword_at);
    skip_endstream(lexer);
    Ok(Stream::new(dict, raw))
}

fn ends_with_endstream(buf: &[u8], end: usize) -> bool {
    let mut pos = end;
    while buf.get(pos).copied().is_some_and(is_whitespace) {
        pos += 1;
    }
    buf[pos.min(buf.len())..].starts_with(b"endstream")
}

fn skip_endstream(lexer: &mut Lexer<'_>) {
    if let Ok(Some(token)) = lexer.peek_token()
        && token.is_keyword(b"endstream")
    {
        let _ = lexer.next_token();
    }
}

/// First occurrence of `needle` at or after `from`.
pub fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= haystack.len() || needle.is_empty() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

/// Last occurrence of `needle` that starts before `before`.
pub fn rfind(haystack: &[u8], needle: &[u8], before: usize) -> Option<usize> {
    let end = before.min(haystack.len());
    if needle.is_empty() || end < needle.len() {
        return None;
    }
    haystack[..end]
        .windows(needle.len())
        .rposition(|window| window == needle)
}

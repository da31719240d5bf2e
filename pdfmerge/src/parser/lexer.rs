//! Tokenizer for PDF syntax.
//!
//! The lexer works directly on the document buffer with a byte cursor so the
//! reader can jump to xref offsets and re-tokenize from anywhere.

use crate::error::{ReadError, ReadResult};
use crate::object::StringFormat;

/// A syntactic token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// Integer number.
    Integer(i64),
    /// Real number.
    Real(f64),
    /// Name with `#xx` escapes decoded, without the slash.
    Name(Vec<u8>),
    /// Literal or hex string, already unescaped.
    String(Vec<u8>, StringFormat),
    /// `[`
    ArrayStart,
    /// `]`
    ArrayEnd,
    /// `<<`
    DictStart,
    /// `>>`
    DictEnd,
    /// Any bare word: `obj`, `R`, `true`, `stream`, `xref`, operators, `{`, `}`.
    Keyword(&'a [u8]),
    /// `%` comment body up to the end of line.
    Comment(&'a [u8]),
}

impl Token<'_> {
    /// Whether this is the given keyword.
    pub fn is_keyword(&self, word: &[u8]) -> bool {
        matches!(self, Token::Keyword(k) if *k == word)
    }
}

/// PDF whitespace characters (ISO 32000-1 Table 1).
pub fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b'\0' | b'\t' | b'\n' | b'\x0C' | b'\r' | b' ')
}

/// PDF delimiter characters (ISO 32000-1 Table 2).
pub fn is_delimiter(byte: u8) -> bool {
    matches!(
        byte,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_regular(byte: u8) -> bool {
    !is_whitespace(byte) && !is_delimiter(byte)
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Cursor-based tokenizer over a byte slice.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Start tokenizing at the beginning of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Start tokenizing at `pos`.
    pub fn at(buf: &'a [u8], pos: usize) -> Self {
        Self {
            buf,
            pos: pos.min(buf.len()),
        }
    }

    /// Current byte offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Move the cursor.
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.buf.len());
    }

    /// The underlying buffer.
    pub fn buffer(&self) -> &'a [u8] {
        self.buf
    }

    /// Whether the cursor is at the end of input.
    pub fn is_eof(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.buf.get(self.pos + offset).copied()
    }

    /// Skip whitespace only.
    pub fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(is_whitespace) {
            self.pos += 1;
        }
    }

    /// Skip whitespace and comments.
    pub fn skip_whitespace_and_comments(&mut self) {
        loop {
            self.skip_whitespace();
            if self.peek() == Some(b'%') {
                self.read_comment();
            } else {
                break;
            }
        }
    }

    /// Next token with comments skipped; `None` at end of input.
    pub fn next_token(&mut self) -> ReadResult<Option<Token<'a>>> {
        loop {
            match self.next_raw_token()? {
                Some(Token::Comment(_)) => continue,
                other => return Ok(other),
            }
        }
    }

    /// Next token without moving the cursor.
    pub fn peek_token(&mut self) -> ReadResult<Option<Token<'a>>> {
        let saved = self.pos;
        let token = self.next_token();
        self.pos = saved;
        token
    }

    /// Next token including comments; `None` at end of input.
    pub fn next_raw_token(&mut self) -> ReadResult<Option<Token<'a>>> {
        self.skip_whitespace();
        let Some(byte) = self.peek() else {
            return Ok(None);
        };

        let token = match byte {
            b'%' => Token::Comment(self.read_comment()),
            b'/' => self.read_name(),
            b'(' => self.read_literal_string()?,
            b'<' if self.peek_at(1) == Some(b'<') => {
                self.pos += 2;
                Token::DictStart
            }
            b'<' => self.read_hex_string()?,
            b'>' if self.peek_at(1) == Some(b'>') => {
                self.pos += 2;
                Token::DictEnd
            }
            b'>' => return Err(ReadError::syntax(self.pos, "unexpected '>'")),
            b'[' => {
                self.pos += 1;
                Token::ArrayStart
            }
            b']' => {
                self.pos += 1;
                Token::ArrayEnd
            }
            b'{' | b'}' => {
                let start = self.pos;
                self.pos += 1;
                Token::Keyword(&self.buf[start..self.pos])
            }
            b')' => return Err(ReadError::syntax(self.pos, "unbalanced ')'")),
            b'+' | b'-' | b'.' | b'0'..=b'9' => self.read_number()?,
            _ => {
                let start = self.pos;
                while self.peek().is_some_and(is_regular) {
                    self.pos += 1;
                }
                Token::Keyword(&self.buf[start..self.pos])
            }
        };
        Ok(Some(token))
    }

    fn read_comment(&mut self) -> &'a [u8] {
        // skip '%'
        self.pos += 1;
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if byte == b'\r' || byte == b'\n' {
                break;
            }
            self.pos += 1;
        }
        &self.buf[start..self.pos]
    }

    fn read_name(&mut self) -> Token<'a> {
        // skip '/'
        self.pos += 1;
        let mut name = Vec::new();
        while let Some(byte) = self.peek() {
            if !is_regular(byte) {
                break;
            }
            if byte == b'#'
                && let (Some(hi), Some(lo)) = (
                    self.peek_at(1).and_then(hex_value),
                    self.peek_at(2).and_then(hex_value),
                )
            {
                name.push(hi << 4 | lo);
                self.pos += 3;
                continue;
            }
            name.push(byte);
            self.pos += 1;
        }
        Token::Name(name)
    }

    fn read_number(&mut self) -> ReadResult<Token<'a>> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        let mut seen_dot = false;
        let mut seen_digit = false;
        while let Some(byte) = self.peek() {
            match byte {
                b'0'..=b'9' => seen_digit = true,
                b'.' if !seen_dot => seen_dot = true,
                // Sloppy writers emit things like "0.0-1"; stop at the second sign.
                _ => break,
            }
            self.pos += 1;
        }
        let text = &self.buf[start..self.pos];

        if !seen_digit {
            // A lone sign or dot is read as zero, like most viewers do.
            return Ok(if seen_dot {
                Token::Real(0.0)
            } else {
                Token::Integer(0)
            });
        }

        // ASCII only by construction.
        let text = std::str::from_utf8(text)
            .map_err(|_| ReadError::syntax(start, "invalid number"))?;
        if !seen_dot && let Ok(value) = text.parse::<i64>() {
            return Ok(Token::Integer(value));
        }
        let normalized = text.strip_prefix('+').unwrap_or(text);
        normalized
            .parse::<f64>()
            .map(Token::Real)
            .map_err(|_| ReadError::syntax(start, format!("invalid number '{text}'")))
    }

    fn read_literal_string(&mut self) -> ReadResult<Token<'a>> {
        let start = self.pos;
        // skip '('
        self.pos += 1;
        let mut depth = 1usize;
        let mut out = Vec::new();

        loop {
            let Some(byte) = self.peek() else {
                return Err(ReadError::syntax(start, "unterminated literal string"));
            };
            self.pos += 1;
            match byte {
                b'(' => {
                    depth += 1;
                    out.push(byte);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    out.push(byte);
                }
                b'\\' => self.read_escape(&mut out),
                b'\r' => {
                    // An unescaped end-of-line is read as a single LF.
                    if self.peek() == Some(b'\n') {
                        self.pos += 1;
                    }
                    out.push(b'\n');
                }
                _ => out.push(byte),
            }
        }

        Ok(Token::String(out, StringFormat::Literal))
    }

    fn read_escape(&mut self, out: &mut Vec<u8>) {
        let Some(byte) = self.peek() else {
            return;
        };
        self.pos += 1;
        match byte {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'(' | b')' | b'\\' => out.push(byte),
            b'\r' => {
                // line continuation
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
            }
            b'\n' => {}
            b'0'..=b'7' => {
                let mut value = u32::from(byte - b'0');
                for _ in 0..2 {
                    match self.peek() {
                        Some(digit @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(digit - b'0');
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                // High-order overflow is ignored.
                out.push((value & 0xFF) as u8);
            }
            // Unknown escapes drop the backslash.
            _ => out.push(byte),
        }
    }

    fn read_hex_string(&mut self) -> ReadResult<Token<'a>> {
        let start = self.pos;
        // skip '<'
        self.pos += 1;
        let mut out = Vec::new();
        let mut pending: Option<u8> = None;

        loop {
            let Some(byte) = self.peek() else {
                return Err(ReadError::syntax(start, "unterminated hex string"));
            };
            self.pos += 1;
            if byte == b'>' {
                break;
            }
            if is_whitespace(byte) {
                continue;
            }
            let Some(nibble) = hex_value(byte) else {
                return Err(ReadError::syntax(
                    self.pos - 1,
                    format!("invalid byte 0x{byte:02X} in hex string"),
                ));
            };
            match pending.take() {
                Some(hi) => out.push(hi << 4 | nibble),
                None => pending = Some(nibble),
            }
        }
        // An odd final digit behaves as if followed by 0.
        if let Some(hi) = pending {
            out.push(hi << 4);
        }

        Ok(Token::String(out, StringFormat::Hexadecimal))
    }
}

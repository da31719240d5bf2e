//! Stream filter decoding.
//!
//! Only the filters needed to read document structure are decoded here:
//! FlateDecode (with PNG and TIFF predictors), ASCIIHexDecode and
//! ASCII85Decode. Image codecs are copied through untouched by the writer
//! and report [`DecodeError::UnsupportedFilter`] when decoding is requested.

use std::io::Read;

use flate2::read::{DeflateDecoder, ZlibDecoder};

use crate::error::DecodeError;
use crate::object::{Dictionary, PdfObject};

/// Apply every filter named by the stream dictionary, in order.
pub fn decode(dict: &Dictionary, raw: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let filters: Vec<&[u8]> = match dict.get(b"Filter") {
        None | Some(PdfObject::Null) => return Ok(raw.to_vec()),
        Some(PdfObject::Name(name)) => vec![name.as_slice()],
        Some(PdfObject::Array(items)) => items.iter().filter_map(PdfObject::as_name).collect(),
        Some(other) => {
            return Err(DecodeError::UnsupportedFilter(format!(
                "<{} in /Filter>",
                other.kind()
            )));
        }
    };

    let params = dict.get(b"DecodeParms").or_else(|| dict.get(b"DP"));
    let mut data = raw.to_vec();
    for (index, filter) in filters.iter().enumerate() {
        let parms = match params {
            Some(PdfObject::Dictionary(parms)) if index == 0 => Some(parms),
            Some(PdfObject::Array(items)) => items.get(index).and_then(PdfObject::as_dict),
            _ => None,
        };
        data = apply(filter, &data, parms)?;
    }
    Ok(data)
}

fn apply(filter: &[u8], data: &[u8], parms: Option<&Dictionary>) -> Result<Vec<u8>, DecodeError> {
    match filter {
        b"FlateDecode" | b"Fl" => {
            let inflated = inflate(data)?;
            predict(inflated, parms)
        }
        b"ASCIIHexDecode" | b"AHx" => ascii_hex_decode(data),
        b"ASCII85Decode" | b"A85" => ascii85_decode(data),
        other => Err(DecodeError::UnsupportedFilter(
            String::from_utf8_lossy(other).into_owned(),
        )),
    }
}

/// Inflate zlib data, falling back to a raw deflate stream for writers that omit the header.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::new();
    match ZlibDecoder::new(data).read_to_end(&mut out) {
        Ok(_) => return Ok(out),
        // Truncated streams are common; keep what was inflated.
        Err(_) if !out.is_empty() => return Ok(out),
        Err(_) => {}
    }

    let mut out = Vec::new();
    match DeflateDecoder::new(data).read_to_end(&mut out) {
        Ok(_) => Ok(out),
        Err(_) if !out.is_empty() => Ok(out),
        Err(err) => Err(DecodeError::Flate(err.to_string())),
    }
}

fn int_param(parms: &Dictionary, key: &[u8], default: i64) -> i64 {
    parms.get(key).and_then(PdfObject::as_i64).unwrap_or(default)
}

fn predict(data: Vec<u8>, parms: Option<&Dictionary>) -> Result<Vec<u8>, DecodeError> {
    let Some(parms) = parms else {
        return Ok(data);
    };
    let predictor = int_param(parms, b"Predictor", 1);
    if predictor <= 1 {
        return Ok(data);
    }

    let colors = int_param(parms, b"Colors", 1);
    let bits = int_param(parms, b"BitsPerComponent", 8);
    let columns = int_param(parms, b"Columns", 1);
    if !(1..=32).contains(&colors)
        || ![1, 2, 4, 8, 16].contains(&bits)
        || !(1..=1 << 20).contains(&columns)
    {
        return Err(DecodeError::Predictor(format!(
            "Colors {colors}, BitsPerComponent {bits}, Columns {columns}"
        )));
    }
    // Bounded by the range checks above.
    let (colors, bits, columns) = (colors as usize, bits as usize, columns as usize);

    match predictor {
        2 => tiff_predict(data, colors, bits, columns),
        10..=15 => png_predict(&data, colors, bits, columns),
        other => Err(DecodeError::Predictor(format!("/Predictor {other}"))),
    }
}

fn tiff_predict(
    mut data: Vec<u8>,
    colors: usize,
    bits: usize,
    columns: usize,
) -> Result<Vec<u8>, DecodeError> {
    if bits != 8 {
        return Err(DecodeError::Predictor(format!(
            "TIFF predictor with {bits} bits per component"
        )));
    }
    let row_len = colors * columns;
    for row in data.chunks_mut(row_len) {
        for i in colors..row.len() {
            row[i] = row[i].wrapping_add(row[i - colors]);
        }
    }
    Ok(data)
}

fn png_predict(
    data: &[u8],
    colors: usize,
    bits: usize,
    columns: usize,
) -> Result<Vec<u8>, DecodeError> {
    let bpp = (colors * bits).div_ceil(8).max(1);
    let row_len = (colors * bits * columns).div_ceil(8);
    let mut out = Vec::with_capacity(data.len());
    let mut previous = vec![0u8; row_len];

    for chunk in data.chunks(row_len + 1) {
        let (&kind, encoded) = chunk
            .split_first()
            .ok_or_else(|| DecodeError::Predictor("empty PNG row".to_string()))?;
        let mut row = encoded.to_vec();
        // A short last row is decoded as far as it goes.
        row.resize(row_len, 0);

        for i in 0..row_len {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = previous[i];
            let up_left = if i >= bpp { previous[i - bpp] } else { 0 };
            row[i] = match kind {
                0 => row[i],
                1 => row[i].wrapping_add(left),
                2 => row[i].wrapping_add(up),
                3 => row[i].wrapping_add(((u16::from(left) + u16::from(up)) / 2) as u8),
                4 => row[i].wrapping_add(paeth(left, up, up_left)),
                other => {
                    return Err(DecodeError::Predictor(format!(
                        "unknown PNG row filter {other}"
                    )));
                }
            };
        }

        out.extend_from_slice(&row[..encoded.len().min(row_len)]);
        previous = row;
    }
    Ok(out)
}

fn paeth(left: u8, up: u8, up_left: u8) -> u8 {
    let p = i16::from(left) + i16::from(up) - i16::from(up_left);
    let pa = (p - i16::from(left)).abs();
    let pb = (p - i16::from(up)).abs();
    let pc = (p - i16::from(up_left)).abs();
    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        up
    } else {
        up_left
    }
}

fn ascii_hex_decode(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::with_capacity(data.len() / 2);
    let mut pending: Option<u8> = None;
    for (pos, &byte) in data.iter().enumerate() {
        let nibble = match byte {
            b'>' => break,
            b'0'..=b'9' => byte - b'0',
            b'a'..=b'f' => byte - b'a' + 10,
            b'A'..=b'F' => byte - b'A' + 10,
            b'\0' | b'\t' | b'\n' | b'\x0C' | b'\r' | b' ' => continue,
            _ => return Err(DecodeError::AsciiHex(pos)),
        };
        match pending.take() {
            Some(hi) => out.push(hi << 4 | nibble),
            None => pending = Some(nibble),
        }
    }
    if let Some(hi) = pending {
        out.push(hi << 4);
    }
    Ok(out)
}

fn ascii85_decode(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::with_capacity(data.len() * 4 / 5);
    let mut group = [0u8; 5];
    let mut filled = 0;

    let mut bytes = data.iter().copied().peekable();
    while let Some(byte) = bytes.next() {
        match byte {
            b'~' => {
                if bytes.peek() != Some(&b'>') {
                    return Err(DecodeError::Ascii85("'~' not followed by '>'".to_string()));
                }
                break;
            }
            b'z' if filled == 0 => out.extend_from_slice(&[0; 4]),
            b'z' => {
                return Err(DecodeError::Ascii85("'z' inside a group".to_string()));
            }
            b'!'..=b'u' => {
                group[filled] = byte - b'!';
                filled += 1;
                if filled == 5 {
                    out.extend_from_slice(&ascii85_group(&group)?);
                    filled = 0;
                }
            }
            b'\0' | b'\t' | b'\n' | b'\x0C' | b'\r' | b' ' => {}
            other => {
                return Err(DecodeError::Ascii85(format!(
                    "invalid character 0x{other:02X}"
                )));
            }
        }
    }

    match filled {
        0 => {}
        1 => return Err(DecodeError::Ascii85("dangling single character".to_string())),
        n => {
            for slot in group.iter_mut().skip(n) {
                *slot = b'u' - b'!';
            }
            let decoded = ascii85_group(&group)?;
            out.extend_from_slice(&decoded[..n - 1]);
        }
    }
    Ok(out)
}

fn ascii85_group(group: &[u8; 5]) -> Result<[u8; 4], DecodeError> {
    let value = group
        .iter()
        .fold(0u64, |acc, &digit| acc * 85 + u64::from(digit));
    let value = u32::try_from(value)
        .map_err(|_| DecodeError::Ascii85("group value exceeds 32 bits".to_string()))?;
    Ok(value.to_be_bytes())
}

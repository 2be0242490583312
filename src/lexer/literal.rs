//! String and character literals.
//!
//! Escapes:
//! - `\n`, `\t`, `\r`, `\0`, `\\`, `\"`, `\'`
//! - `\xHH`: one ASCII byte
//! - `\uXXXX`, `\UXXXXXXXX`: a Unicode scalar value, stored as UTF-8
//!
//! Everything between the quotes, newlines included, is part of the literal.

use std::cell::RefCell;

use super::{Cursor, LexError};
use crate::memory::{Arena, ArenaSlice};

/// Scan a string literal, starting at its opening quote, and store its
/// decoded bytes in `arena`.
pub(super) fn scan_string(
    cursor: &mut Cursor<'_>,
    arena: &RefCell<Arena>,
) -> Result<ArenaSlice, LexError> {
    cursor.bump();
    let raw = scan_quoted(cursor, b'"').ok_or(LexError::UnterminatedString)?;
    let bytes = decode_escapes(raw)?;
    Ok(arena.borrow_mut().allocate_bytes(&bytes))
}

/// Scan a character literal, starting at its opening quote, and decode its codepoint.
pub(super) fn scan_character(cursor: &mut Cursor<'_>) -> Result<u32, LexError> {
    cursor.bump();
    let raw = scan_quoted(cursor, b'\'').ok_or(LexError::UnterminatedCharacter)?;
    let bytes = decode_escapes(raw)?;
    decode_single_codepoint(&bytes)
}

/// Consume up to and including the closing `quote`; return what was between.
///
/// A backslash always takes the next byte with it.
/// Returns None, with the cursor at the end of the stream, if the quote never comes.
fn scan_quoted<'src>(cursor: &mut Cursor<'src>, quote: u8) -> Option<&'src [u8]> {
    let start = cursor.offset();
    loop {
        match cursor.peek(0) {
            0 => return None,
            b'\\' => {
                cursor.bump();
                if cursor.peek(0) == 0 {
                    return None;
                }
                cursor.bump();
            }
            c if c == quote => {
                let raw = cursor.since(start);
                cursor.bump();
                return Some(raw);
            }
            _ => cursor.bump(),
        }
    }
}

/// Resolve escapes, and check that the result is UTF-8.
fn decode_escapes(raw: &[u8]) -> Result<Vec<u8>, LexError> {
    let mut out = Vec::with_capacity(raw.len());
    let mut rest = raw;
    while let Some((&c, tail)) = rest.split_first() {
        rest = tail;
        if c != b'\\' {
            out.push(c);
            continue;
        }

        let (&escape, tail) = rest.split_first().ok_or(LexError::InvalidEscape)?;
        rest = tail;
        match escape {
            b'n' => out.push(b'\n'),
            b't' => out.push(b'\t'),
            b'r' => out.push(b'\r'),
            b'0' => out.push(0),
            b'\\' | b'"' | b'\'' => out.push(escape),
            b'x' => {
                let value = hex_digits(&mut rest, 2)?;
                if value >= 0x80 {
                    return Err(LexError::InvalidEscape);
                }
                out.push(value as u8);
            }
            b'u' => push_codepoint(&mut out, hex_digits(&mut rest, 4)?)?,
            b'U' => push_codepoint(&mut out, hex_digits(&mut rest, 8)?)?,
            _ => return Err(LexError::InvalidEscape),
        }
    }

    // Escapes only ever produce whole UTF-8 sequences, so any failure here
    // comes from the raw bytes.
    std::str::from_utf8(&out).map_err(|_| LexError::InvalidUtf8)?;
    Ok(out)
}

/// Take exactly `count` hex digits off the front of `rest`.
fn hex_digits(rest: &mut &[u8], count: usize) -> Result<u32, LexError> {
    if rest.len() < count {
        return Err(LexError::InvalidEscape);
    }
    let (digits, tail) = rest.split_at(count);
    let mut value = 0u32;
    for &d in digits {
        let digit = (d as char).to_digit(16).ok_or(LexError::InvalidEscape)?;
        value = value << 4 | digit;
    }
    *rest = tail;
    Ok(value)
}

fn push_codepoint(out: &mut Vec<u8>, value: u32) -> Result<(), LexError> {
    let c = char::from_u32(value).ok_or(LexError::InvalidCodepoint)?;
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
    Ok(())
}

/// Decode the one codepoint that `bytes` must hold, by its UTF-8 leading byte.
fn decode_single_codepoint(bytes: &[u8]) -> Result<u32, LexError> {
    let (&lead, rest) = bytes.split_first().ok_or(LexError::EmptyCharacter)?;
    let (len, bits) = match lead {
        0x00..=0x7f => (1, lead as u32),
        0xc0..=0xdf => (2, (lead & 0x1f) as u32),
        0xe0..=0xef => (3, (lead & 0x0f) as u32),
        0xf0..=0xf7 => (4, (lead & 0x07) as u32),
        _ => return Err(LexError::InvalidUtf8),
    };
    let continuation = rest.get(..len - 1).ok_or(LexError::InvalidUtf8)?;
    let codepoint = continuation
        .iter()
        .fold(bits, |acc, &b| acc << 6 | (b & 0x3f) as u32);
    if bytes.len() > len {
        return Err(LexError::TooManyCodepoints);
    }
    Ok(codepoint)
}

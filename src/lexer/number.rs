//! Numeric literals.
//!
//! Forms:
//! - `123`, `1_000`: decimal integer
//! - `0xFF`: hexadecimal integer
//! - `0b101`: binary integer
//! - `3.5`, `2.5e-3`, `1e9`: decimal float
//! - `0h3F800000`: hex float, the exact IEEE-754 bit pattern of an f32 (8 digits) or f64 (16 digits)
//!
//! `_` separates digits anywhere in the literal, except at its very end.

use super::{Cursor, LexError};

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum NumberValue {
    Integer(u64),
    Float(f64),
}

/// A numeric literal, with the narrowest width (8, 16, 32 or 64 bits) that holds it losslessly.
///
/// Equality follows `f64`: a NaN hex float compares unequal to itself even
/// when the bits match. Compare `to_bits` of the payload to check those.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Number {
    pub value: NumberValue,
    pub min_fit_bits: u8,
}

impl Number {
    pub fn integer(value: u64) -> Self {
        let min_fit_bits = if value <= u8::MAX as u64 {
            8
        } else if value <= u16::MAX as u64 {
            16
        } else if value <= u32::MAX as u64 {
            32
        } else {
            64
        };
        Number {
            value: NumberValue::Integer(value),
            min_fit_bits,
        }
    }

    /// A float that fits in 32 bits if narrowing it to f32 loses nothing.
    pub fn float(value: f64) -> Self {
        let min_fit_bits = if (value as f32) as f64 == value {
            32
        } else {
            64
        };
        Number {
            value: NumberValue::Float(value),
            min_fit_bits,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self.value, NumberValue::Float(_))
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self.value {
            NumberValue::Integer(v) => Some(v),
            NumberValue::Float(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.value {
            NumberValue::Float(v) => Some(v),
            NumberValue::Integer(_) => None,
        }
    }
}

impl std::fmt::Display for Number {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.value {
            NumberValue::Integer(v) => write!(f, "{} (u{})", v, self.min_fit_bits),
            NumberValue::Float(v) => write!(f, "{:?} (f{})", v, self.min_fit_bits),
        }
    }
}

/// Scan a numeric literal. The cursor is at its first digit.
///
/// The whole literal is consumed even when it turns out to be malformed,
/// so the error token covers it.
pub(super) fn scan_number(cursor: &mut Cursor<'_>) -> Result<Number, LexError> {
    let mut base = 10u32;
    let mut hex_float = false;
    if cursor.peek(0) == b'0' {
        match cursor.peek(1) {
            b'x' => base = 16,
            b'h' => {
                base = 16;
                hex_float = true;
            }
            b'b' => base = 2,
            _ => (),
        }
        if base != 10 {
            cursor.bump_n(2);
        }
    }

    let mut error: Option<LexError> = None;
    let mut integer = 0u64;
    let mut overflow = false;
    let mut value = 0f64;
    let mut is_float = false;
    // Positional weight of the next fractional digit, as a divisor.
    let mut divisor = 1f64;
    let mut digit_count = 0u32;
    let mut trailing_separator = false;

    loop {
        let c = cursor.peek(0);
        if c == b'_' {
            trailing_separator = true;
            cursor.bump();
            continue;
        }
        if c == b'.' && base == 10 && !is_float && cursor.peek(1).is_ascii_digit() {
            is_float = true;
            trailing_separator = false;
            cursor.bump();
            continue;
        }
        let digit = match c {
            b'0'..=b'9' => (c - b'0') as u32,
            b'a'..=b'f' if base == 16 => (c - b'a' + 10) as u32,
            b'A'..=b'F' if base == 16 => (c - b'A' + 10) as u32,
            _ => break,
        };
        cursor.bump();
        trailing_separator = false;
        digit_count += 1;

        if digit >= base {
            error.get_or_insert(LexError::InvalidDigit);
            continue;
        }
        if is_float {
            divisor *= base as f64;
            value += digit as f64 / divisor;
        } else {
            value = value * base as f64 + digit as f64;
            match integer
                .checked_mul(base as u64)
                .and_then(|v| v.checked_add(digit as u64))
            {
                Some(v) => integer = v,
                None => overflow = true,
            }
        }
    }

    if base == 10 && matches!(cursor.peek(0), b'e' | b'E') {
        is_float = true;
        cursor.bump();
        match scan_exponent(cursor, &mut trailing_separator) {
            Ok(exponent) => value = scale(value, exponent),
            Err(e) => {
                error.get_or_insert(e);
            }
        }
    }

    if let Some(e) = error {
        return Err(e);
    }
    if digit_count == 0 {
        return Err(if hex_float {
            LexError::HexFloatDigitCount
        } else {
            LexError::MissingDigits
        });
    }
    if trailing_separator {
        return Err(LexError::TrailingSeparator);
    }

    if hex_float {
        return match digit_count {
            8 => Ok(Number {
                value: NumberValue::Float(f32::from_bits(integer as u32) as f64),
                min_fit_bits: 32,
            }),
            16 => Ok(Number {
                value: NumberValue::Float(f64::from_bits(integer)),
                min_fit_bits: 64,
            }),
            _ => Err(LexError::HexFloatDigitCount),
        };
    }
    if is_float {
        return Ok(Number::float(value));
    }
    if overflow {
        return Err(LexError::IntegerOverflow);
    }
    Ok(Number::integer(integer))
}

/// Scan an exponent after its `e`/`E` marker: an optional sign, then digits.
fn scan_exponent(cursor: &mut Cursor<'_>, trailing_separator: &mut bool) -> Result<i64, LexError> {
    let negative = cursor.peek(0) == b'-';
    if matches!(cursor.peek(0), b'-' | b'+') {
        cursor.bump();
    }

    let mut magnitude = 0u32;
    let mut digits = 0;
    let mut overflow = false;
    loop {
        match cursor.peek(0) {
            b'_' => *trailing_separator = true,
            c @ b'0'..=b'9' => {
                *trailing_separator = false;
                digits += 1;
                match magnitude
                    .checked_mul(10)
                    .and_then(|m| m.checked_add((c - b'0') as u32))
                {
                    Some(m) => magnitude = m,
                    None => overflow = true,
                }
            }
            _ => break,
        }
        cursor.bump();
    }

    if digits == 0 {
        return Err(LexError::MissingExponentDigits);
    }
    if overflow {
        return Err(LexError::ExponentOverflow);
    }
    let magnitude = magnitude as i64;
    Ok(if negative { -magnitude } else { magnitude })
}

/// Scale by a power of ten, one factor at a time.
fn scale(mut value: f64, exponent: i64) -> f64 {
    for _ in 0..exponent.unsigned_abs() {
        // Once the value saturates, more factors change nothing.
        if value == 0.0 || value.is_infinite() {
            break;
        }
        if exponent > 0 {
            value *= 10.0;
        } else {
            value /= 10.0;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use core::cell::RefCell;

    use super::*;
    use crate::lexer::{Lexer, TokenKind};
    use crate::memory::Arena;

    /// Lex `src` as a single literal.
    fn number(src: &str) -> Result<Number, LexError> {
        let arena = RefCell::new(Arena::new());
        let mut lexer = Lexer::new(src.as_bytes(), 0, &arena);
        let token = lexer.get_token();
        assert_eq!(
            token.interval.size as usize,
            src.len(),
            "literal {:?} was not consumed whole: {:?}",
            src,
            token
        );
        match token.kind {
            TokenKind::Number(n) => Ok(n),
            TokenKind::Error(e) => Err(e),
            other => panic!("unexpected token for {:?}: {:?}", src, other),
        }
    }

    fn int(value: u64, bits: u8) -> Result<Number, LexError> {
        Ok(Number {
            value: NumberValue::Integer(value),
            min_fit_bits: bits,
        })
    }

    fn float(value: f64, bits: u8) -> Result<Number, LexError> {
        Ok(Number {
            value: NumberValue::Float(value),
            min_fit_bits: bits,
        })
    }

    #[test]
    fn integers() {
        let cases = [
            ("123", int(123, 8)),
            ("0", int(0, 8)),
            ("0xFF", int(255, 8)),
            ("0xff", int(255, 8)),
            ("0b101", int(5, 8)),
            ("1_000", int(1000, 16)),
            ("300", int(300, 16)),
            ("70000", int(70000, 32)),
            ("5000000000", int(5_000_000_000, 64)),
            ("0x_dead_BEEF", int(0xdead_beef, 32)),
            ("18446744073709551615", int(u64::MAX, 64)),
        ];
        for (i, (src, want)) in cases.into_iter().enumerate() {
            assert_eq!(number(src), want, "unexpected number in case {} ({})", i, src);
        }
    }

    #[test]
    fn floats() {
        let cases = [
            ("3.5", float(3.5, 32)),
            ("0.25", float(0.25, 32)),
            ("1e3", float(1000.0, 32)),
            ("2.5e-1", float(0.25, 32)),
            ("1_5.0_0E+0_1", float(150.0, 32)),
            ("0h3F800000", float(1.0, 32)),
            ("0h3FF0000000000000", float(1.0, 64)),
            ("0h4049_0FDB", float(std::f32::consts::PI as f64, 32)),
        ];
        for (i, (src, want)) in cases.into_iter().enumerate() {
            assert_eq!(number(src), want, "unexpected number in case {} ({})", i, src);
        }
    }

    #[test]
    fn precision_width() {
        let tenth = number("0.1").unwrap();
        assert!(tenth.is_float());
        assert_eq!(tenth.min_fit_bits, 64);

        assert_eq!(number("1e400").unwrap().as_f64(), Some(f64::INFINITY));
        assert_eq!(number("0e5000000000").unwrap_err(), LexError::ExponentOverflow);
        assert_eq!(number("0e99999").unwrap().as_f64(), Some(0.0));
    }

    #[test]
    fn nan_bits_are_stable() {
        let arena = RefCell::new(Arena::new());
        let mut lexer = Lexer::new(b"0h7FC00000", 0, &arena);
        let bits = |kind: TokenKind| match kind {
            TokenKind::Number(n) => n.as_f64().map(f64::to_bits),
            other => panic!("unexpected token: {:?}", other),
        };

        let first = lexer.get_token();
        let second = lexer.get_token();
        assert_ne!(first, second);
        assert_eq!(first.interval, second.interval);
        assert_eq!(bits(first.kind), bits(second.kind));
        assert_eq!(bits(first.kind), Some((f32::NAN as f64).to_bits()));
    }

    #[test]
    fn accessors() {
        let n = number("0x1_0000").unwrap();
        assert!(!n.is_float());
        assert_eq!(n.as_u64(), Some(0x1_0000));
        assert_eq!(n.as_f64(), None);
        assert_eq!(number("2.5").unwrap().as_u64(), None);
    }

    #[test]
    fn malformed() {
        let cases = [
            ("1_", LexError::TrailingSeparator),
            ("0x1__", LexError::TrailingSeparator),
            ("1.5e3_", LexError::TrailingSeparator),
            ("0b2", LexError::InvalidDigit),
            ("0b1012", LexError::InvalidDigit),
            ("0x", LexError::MissingDigits),
            ("0b_", LexError::MissingDigits),
            ("0h", LexError::HexFloatDigitCount),
            ("0h3F80000", LexError::HexFloatDigitCount),
            ("0h3F8000000", LexError::HexFloatDigitCount),
            ("1e", LexError::MissingExponentDigits),
            ("1e+", LexError::MissingExponentDigits),
            ("2E_", LexError::MissingExponentDigits),
            ("18446744073709551616", LexError::IntegerOverflow),
            ("0x1_0000_0000_0000_0000", LexError::IntegerOverflow),
        ];
        for (i, (src, want)) in cases.into_iter().enumerate() {
            assert_eq!(number(src), Err(want), "unexpected result in case {} ({})", i, src);
        }
    }

    #[test]
    fn literal_boundaries() {
        let arena = RefCell::new(Arena::new());
        let mut lexer = Lexer::new(b"1.foo 2..3 0b11x", 0, &arena);
        let kinds: Vec<TokenKind> = lexer.tokens().map(|t| t.kind).collect();

        assert_eq!(
            kinds,
            vec![
                TokenKind::Number(Number::integer(1)),
                TokenKind::Dot,
                TokenKind::Identifier(b"foo"),
                TokenKind::Number(Number::integer(2)),
                TokenKind::Dot,
                TokenKind::Dot,
                TokenKind::Number(Number::integer(3)),
                TokenKind::Number(Number::integer(3)),
                TokenKind::Identifier(b"x"),
            ]
        );
    }
}

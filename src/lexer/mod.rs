//! Tokenizer: turns one source file's bytes into a stream of tokens.
//!
//! The lexer keeps one token of lookahead. `get_token` scans the next token
//! without moving the live position and caches it; `skip_past_token`
//! commits to it. A zero byte, or the end of the buffer, ends the stream.
//! The token after that one can be looked at with `peek_next_token`; it is
//! scanned once and handed back again by the `get_token` that reaches it.
//!
//! `_` starts an identifier when a letter, digit or another `_` follows it,
//! so `__` and `_x` are identifiers; only a lone `_` is `Underscore`.
//!
//! Lexical problems are not failures of the lexer: they come out as
//! `TokenKind::Error` tokens covering the offending text, and scanning
//! carries on after them.

use std::cell::{Cell, RefCell};

use crate::memory::Arena;
use crate::text::{TextInterval, TextPosition};

mod literal;
mod number;
mod token;

pub use number::{Number, NumberValue};
pub use token::{Keyword, Token, TokenKind};

/// Why a piece of source text could not be tokenized.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LexError {
    UnterminatedComment,
    UnterminatedString,
    UnterminatedCharacter,
    InvalidUtf8,
    InvalidEscape,
    InvalidCodepoint,
    EmptyCharacter,
    TooManyCodepoints,
    InvalidDigit,
    TrailingSeparator,
    HexFloatDigitCount,
    MissingExponentDigits,
    ExponentOverflow,
    IntegerOverflow,
    MissingDigits,
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            LexError::UnterminatedComment => "unterminated block comment",
            LexError::UnterminatedString => "unterminated string literal",
            LexError::UnterminatedCharacter => "unterminated character literal",
            LexError::InvalidUtf8 => "literal is not valid UTF-8",
            LexError::InvalidEscape => "invalid escape sequence",
            LexError::InvalidCodepoint => "escape is not a Unicode scalar value",
            LexError::EmptyCharacter => "empty character literal",
            LexError::TooManyCodepoints => "character literal holds more than one codepoint",
            LexError::InvalidDigit => "digit is not valid in this base",
            LexError::TrailingSeparator => "numeric literal ends with a digit separator",
            LexError::HexFloatDigitCount => "hex float literal needs exactly 8 or 16 digits",
            LexError::MissingExponentDigits => "exponent has no digits",
            LexError::ExponentOverflow => "exponent is too large",
            LexError::IntegerOverflow => "integer literal does not fit in 64 bits",
            LexError::MissingDigits => "numeric literal has no digits",
        };
        write!(f, "{}", message)
    }
}

impl std::error::Error for LexError {}

/// A position in the source plus the bytes it walks over.
#[derive(Debug, Clone)]
struct Cursor<'src> {
    input: &'src [u8],
    position: TextPosition,
}

impl<'src> Cursor<'src> {
    fn offset(&self) -> usize {
        self.position.offset() as usize
    }

    /// The byte `n` places ahead, or 0 past the end of the input.
    fn peek(&self, n: usize) -> u8 {
        self.input.get(self.offset() + n).copied().unwrap_or(0)
    }

    fn bump(&mut self) {
        let offset = self.offset();
        match self.input.get(offset) {
            None => (),
            Some(b'\n') => {
                self.position.line += 1;
                self.position.offset_to_line = offset as u32 + 1;
                self.position.column = 0;
            }
            Some(_) => self.position.column += 1,
        }
    }

    fn bump_n(&mut self, n: usize) {
        for _ in 0..n {
            self.bump();
        }
    }

    /// The bytes from `start` up to the cursor.
    fn since(&self, start: usize) -> &'src [u8] {
        &self.input[start..self.offset()]
    }

    /// Move to just past `token`, counting any newlines inside it.
    fn skip_past(&mut self, token: &Token<'_>) {
        self.position = token.interval.position;
        self.bump_n(token.interval.size as usize);
    }

    fn rest(&self) -> &'src [u8] {
        &self.input[self.offset().min(self.input.len())..]
    }

    /// Skip whitespace and comments.
    ///
    /// On an unterminated block comment, returns the position of its outermost `/*`.
    fn skip_junk(&mut self) -> Result<(), TextPosition> {
        let mut line_comment = false;
        let mut depth = 0u32;
        let mut comment_start = self.position;
        loop {
            match (self.peek(0), self.peek(1)) {
                (0, _) if depth > 0 => return Err(comment_start),
                (0, _) => return Ok(()),
                (b'\n', _) => {
                    line_comment = false;
                    self.bump();
                }
                (b' ' | b'\t' | 0x0b | b'\r', _) => self.bump(),
                (b'/', b'/') if depth == 0 && !line_comment => {
                    line_comment = true;
                    self.bump_n(2);
                }
                (b'/', b'*') if !line_comment => {
                    if depth == 0 {
                        comment_start = self.position;
                    }
                    depth += 1;
                    self.bump_n(2);
                }
                (b'*', b'/') if depth > 0 && !line_comment => {
                    depth -= 1;
                    self.bump_n(2);
                }
                _ if line_comment || depth > 0 => self.bump(),
                _ => return Ok(()),
            }
        }
    }
}

/// Punctuation, longest forms first so that e.g. `>>=` wins over `>>` and `>`.
const PUNCTUATION: &[(&[u8], TokenKind<'static>)] = &[
    (b"...", TokenKind::Ellipsis),
    (b">>=", TokenKind::ShiftRightEquals),
    (b"<<=", TokenKind::ShiftLeftEquals),
    (b"+=", TokenKind::PlusEquals),
    (b"++", TokenKind::Increment),
    (b"-=", TokenKind::MinusEquals),
    (b"--", TokenKind::Decrement),
    (b"*=", TokenKind::StarEquals),
    (b"/=", TokenKind::SlashEquals),
    (b"%=", TokenKind::PercentEquals),
    (b"^=", TokenKind::CaretEquals),
    (b"~=", TokenKind::TildeEquals),
    (b"==", TokenKind::EqualEqual),
    (b"!=", TokenKind::BangEqual),
    (b">=", TokenKind::GreaterEqual),
    (b"<=", TokenKind::LessEqual),
    (b">>", TokenKind::ShiftRight),
    (b"<<", TokenKind::ShiftLeft),
    (b"&=", TokenKind::AmpersandEquals),
    (b"&&", TokenKind::LogicalAnd),
    (b"|=", TokenKind::PipeEquals),
    (b"||", TokenKind::LogicalOr),
    (b"@", TokenKind::At),
    (b"$", TokenKind::Dollar),
    (b"#", TokenKind::Hash),
    (b"!", TokenKind::Bang),
    (b"+", TokenKind::Plus),
    (b"-", TokenKind::Minus),
    (b"*", TokenKind::Star),
    (b"/", TokenKind::Slash),
    (b"%", TokenKind::Percent),
    (b"^", TokenKind::Caret),
    (b"=", TokenKind::Equals),
    (b">", TokenKind::Greater),
    (b"<", TokenKind::Less),
    (b"~", TokenKind::Tilde),
    (b"&", TokenKind::Ampersand),
    (b"|", TokenKind::Pipe),
    (b".", TokenKind::Dot),
    (b",", TokenKind::Comma),
    (b":", TokenKind::Colon),
    (b";", TokenKind::Semicolon),
    (b"?", TokenKind::Question),
    (b"(", TokenKind::OpenParen),
    (b")", TokenKind::CloseParen),
    (b"{", TokenKind::OpenBrace),
    (b"}", TokenKind::CloseBrace),
    (b"[", TokenKind::OpenBracket),
    (b"]", TokenKind::CloseBracket),
];

fn is_identifier_byte(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

/// Scan the token at the cursor, leaving the cursor just past it.
fn scan<'src>(cursor: &mut Cursor<'src>, arena: &RefCell<Arena>) -> Token<'src> {
    if let Err(comment_start) = cursor.skip_junk() {
        return error_token(
            LexError::UnterminatedComment,
            TextInterval::from_end_points(comment_start, cursor.position),
        );
    }

    let start = cursor.position;
    let kind = match cursor.peek(0) {
        0 => TokenKind::EndOfStream,
        b'_' if !is_identifier_byte(cursor.peek(1)) => {
            cursor.bump();
            TokenKind::Underscore
        }
        c if c.is_ascii_alphabetic() || c == b'_' => {
            let begin = cursor.offset();
            while is_identifier_byte(cursor.peek(0)) {
                cursor.bump();
            }
            let name = cursor.since(begin);
            match Keyword::lookup(name) {
                Some(keyword) => TokenKind::Keyword(keyword),
                None => TokenKind::Identifier(name),
            }
        }
        c if c.is_ascii_digit() => match number::scan_number(cursor) {
            Ok(n) => TokenKind::Number(n),
            Err(e) => TokenKind::Error(e),
        },
        b'"' => match literal::scan_string(cursor, arena) {
            Ok(s) => TokenKind::String(s),
            Err(e) => TokenKind::Error(e),
        },
        b'\'' => match literal::scan_character(cursor) {
            Ok(c) => TokenKind::Character(c),
            Err(e) => TokenKind::Error(e),
        },
        c => {
            let rest = cursor.rest();
            match PUNCTUATION.iter().find(|(text, _)| rest.starts_with(text)) {
                Some((text, kind)) => {
                    cursor.bump_n(text.len());
                    *kind
                }
                None => {
                    cursor.bump();
                    TokenKind::Unknown(c)
                }
            }
        }
    };

    let interval = TextInterval::from_end_points(start, cursor.position);
    match kind {
        TokenKind::Error(e) => error_token(e, interval),
        kind => Token { kind, interval },
    }
}

fn error_token<'src>(error: LexError, interval: TextInterval) -> Token<'src> {
    tracing::debug!("lexical error at {}: {}", interval, error);
    Token {
        kind: TokenKind::Error(error),
        interval,
    }
}

/// A tokenizer over one source file.
///
/// String payloads are decoded into the shared arena, so they outlive the lexer.
/// Each token is scanned once, whether it is first seen through
/// `get_token` or through `peek_next_token`, so peeking never copies a
/// payload into the arena twice.
#[derive(Debug, Clone)]
pub struct Lexer<'src, 'a> {
    cursor: Cursor<'src>,
    cache: Option<Token<'src>>,
    /// The last token produced by `peek_next_token`, keyed by the position it was scanned from.
    peeked: Cell<Option<(TextPosition, Token<'src>)>>,
    arena: &'a RefCell<Arena>,
}

impl<'src, 'a> Lexer<'src, 'a> {
    pub fn new(source: &'src [u8], file_id: u32, arena: &'a RefCell<Arena>) -> Self {
        assert!(
            source.len() <= u32::MAX as usize,
            "source of {} bytes is too large to address",
            source.len()
        );
        Lexer {
            cursor: Cursor {
                input: source,
                position: TextPosition::start_of(file_id),
            },
            cache: None,
            peeked: Cell::new(None),
            arena,
        }
    }

    /// The live position: just past the last token skipped.
    pub fn position(&self) -> TextPosition {
        self.cursor.position
    }

    /// The arena that holds decoded string literals.
    pub fn arena(&self) -> &'a RefCell<Arena> {
        self.arena
    }

    /// The next token, without consuming it.
    ///
    /// Repeated calls return the same token until `skip_past_token`.
    pub fn get_token(&mut self) -> Token<'src> {
        if let Some(token) = self.cache {
            return token;
        }
        let token = match self.peeked.take() {
            Some((from, token)) if from == self.cursor.position => token,
            _ => scan(&mut self.cursor.clone(), self.arena),
        };
        self.cache = Some(token);
        token
    }

    /// Move the live position just past `token`.
    pub fn skip_past_token(&mut self, token: Token<'src>) {
        assert!(
            !token.is_end_of_stream(),
            "cannot skip past the end of the stream"
        );
        self.cursor.skip_past(&token);
        self.cache = None;
    }

    /// The token after `token`, leaving this lexer untouched.
    pub fn peek_next_token(&self, token: Token<'src>) -> Token<'src> {
        if token.is_end_of_stream() {
            return token;
        }
        let mut cursor = self.cursor.clone();
        cursor.skip_past(&token);
        let from = cursor.position;
        if let Some((peeked_from, next)) = self.peeked.get() {
            if peeked_from == from {
                return next;
            }
        }
        let next = scan(&mut cursor, self.arena);
        self.peeked.set(Some((from, next)));
        next
    }

    /// Consume the remaining tokens, stopping before the end of the stream.
    pub fn tokens(&mut self) -> Tokens<'_, 'src, 'a> {
        Tokens { lexer: self }
    }
}

pub struct Tokens<'l, 'src, 'a> {
    lexer: &'l mut Lexer<'src, 'a>,
}

impl<'src> Iterator for Tokens<'_, 'src, '_> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.lexer.get_token();
        if token.is_end_of_stream() {
            return None;
        }
        self.lexer.skip_past_token(token);
        Some(token)
    }
}

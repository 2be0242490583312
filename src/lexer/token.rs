//! Token types produced by the lexer.

use super::number::Number;
use super::LexError;
use crate::memory::ArenaSlice;
use crate::text::TextInterval;

/// A classified piece of source text.
///
/// Whitespace and comments never produce tokens.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Token<'src> {
    pub kind: TokenKind<'src>,
    pub interval: TextInterval,
}

impl Token<'_> {
    pub fn is_end_of_stream(&self) -> bool {
        self.kind == TokenKind::EndOfStream
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, TokenKind::Error(_))
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TokenKind<'src> {
    /// A byte that starts no token. The parser decides whether that is an error.
    Unknown(u8),
    Error(LexError),
    EndOfStream,

    At,
    Dollar,
    Hash,
    Bang,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Equals,
    Greater,
    Less,
    Tilde,
    Ampersand,
    Pipe,
    Dot,
    Comma,
    Colon,
    Semicolon,
    Question,
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,

    PlusEquals,
    Increment,
    MinusEquals,
    Decrement,
    StarEquals,
    SlashEquals,
    PercentEquals,
    CaretEquals,
    TildeEquals,
    EqualEqual,
    BangEqual,
    GreaterEqual,
    LessEqual,
    ShiftRight,
    ShiftLeft,
    ShiftRightEquals,
    ShiftLeftEquals,
    AmpersandEquals,
    LogicalAnd,
    PipeEquals,
    LogicalOr,
    Ellipsis,

    /// A lone `_`.
    Underscore,

    /// A character literal, decoded to its codepoint.
    Character(u32),
    /// A string literal, with escapes resolved. The bytes live in the lexer's arena.
    String(ArenaSlice),
    /// The exact bytes of the identifier in the source.
    Identifier(&'src [u8]),
    Number(Number),
    Keyword(Keyword),
}

impl TokenKind<'_> {
    /// Source text of punctuation tokens.
    pub fn symbol(&self) -> Option<&'static str> {
        use TokenKind::*;
        Some(match self {
            At => "@",
            Dollar => "$",
            Hash => "#",
            Bang => "!",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            Caret => "^",
            Equals => "=",
            Greater => ">",
            Less => "<",
            Tilde => "~",
            Ampersand => "&",
            Pipe => "|",
            Dot => ".",
            Comma => ",",
            Colon => ":",
            Semicolon => ";",
            Question => "?",
            OpenParen => "(",
            CloseParen => ")",
            OpenBrace => "{",
            CloseBrace => "}",
            OpenBracket => "[",
            CloseBracket => "]",
            PlusEquals => "+=",
            Increment => "++",
            MinusEquals => "-=",
            Decrement => "--",
            StarEquals => "*=",
            SlashEquals => "/=",
            PercentEquals => "%=",
            CaretEquals => "^=",
            TildeEquals => "~=",
            EqualEqual => "==",
            BangEqual => "!=",
            GreaterEqual => ">=",
            LessEqual => "<=",
            ShiftRight => ">>",
            ShiftLeft => "<<",
            ShiftRightEquals => ">>=",
            ShiftLeftEquals => "<<=",
            AmpersandEquals => "&=",
            LogicalAnd => "&&",
            PipeEquals => "|=",
            LogicalOr => "||",
            Ellipsis => "...",
            Underscore => "_",
            _ => return None,
        })
    }
}

impl std::fmt::Display for TokenKind<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Unknown(b) => write!(f, "unknown byte {:#04x}", b),
            TokenKind::Error(e) => write!(f, "error: {}", e),
            TokenKind::EndOfStream => write!(f, "end of stream"),
            TokenKind::Character(c) => match char::from_u32(*c) {
                Some(c) => write!(f, "character {:?}", c),
                None => write!(f, "character U+{:04X}", c),
            },
            TokenKind::String(s) => write!(f, "string ({} bytes)", s.len()),
            TokenKind::Identifier(name) => {
                write!(f, "identifier {}", String::from_utf8_lossy(name))
            }
            TokenKind::Number(n) => write!(f, "number {}", n),
            TokenKind::Keyword(k) => write!(f, "keyword {}", k.as_str()),
            punctuation => write!(f, "`{}`", punctuation.symbol().unwrap_or("?")),
        }
    }
}

/// Reserved words, in table order.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Keyword {
    Package,
    Load,
    Import,
    As,
    If,
    Else,
    For,
    Break,
    Continue,
    Proc,
    Struct,
    Union,
    Enum,
    Using,
    Defer,
    Return,
    True,
    False,
}

impl Keyword {
    pub const ALL: [Keyword; 18] = [
        Keyword::Package,
        Keyword::Load,
        Keyword::Import,
        Keyword::As,
        Keyword::If,
        Keyword::Else,
        Keyword::For,
        Keyword::Break,
        Keyword::Continue,
        Keyword::Proc,
        Keyword::Struct,
        Keyword::Union,
        Keyword::Enum,
        Keyword::Using,
        Keyword::Defer,
        Keyword::Return,
        Keyword::True,
        Keyword::False,
    ];

    /// Position in the keyword table.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Package => "package",
            Keyword::Load => "load",
            Keyword::Import => "import",
            Keyword::As => "as",
            Keyword::If => "if",
            Keyword::Else => "else",
            Keyword::For => "for",
            Keyword::Break => "break",
            Keyword::Continue => "continue",
            Keyword::Proc => "proc",
            Keyword::Struct => "struct",
            Keyword::Union => "union",
            Keyword::Enum => "enum",
            Keyword::Using => "using",
            Keyword::Defer => "defer",
            Keyword::Return => "return",
            Keyword::True => "true",
            Keyword::False => "false",
        }
    }

    /// Case-sensitive lookup of an identifier.
    pub fn lookup(name: &[u8]) -> Option<Keyword> {
        Self::ALL
            .iter()
            .copied()
            .find(|keyword| keyword.as_str().as_bytes() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_table_order() {
        for (i, keyword) in Keyword::ALL.iter().enumerate() {
            assert_eq!(keyword.index(), i);
            assert_eq!(Keyword::lookup(keyword.as_str().as_bytes()), Some(*keyword));
        }
        assert_eq!(Keyword::Package.index(), 0);
        assert_eq!(Keyword::False.index(), 17);
    }

    #[test]
    fn keyword_lookup_is_exact() {
        assert_eq!(Keyword::lookup(b"Proc"), None);
        assert_eq!(Keyword::lookup(b"procs"), None);
        assert_eq!(Keyword::lookup(b"pro"), None);
        assert_eq!(Keyword::lookup(b""), None);
    }

    #[test]
    fn display() {
        assert_eq!(TokenKind::ShiftLeftEquals.to_string(), "`<<=`");
        assert_eq!(TokenKind::Identifier(b"x1").to_string(), "identifier x1");
        assert_eq!(TokenKind::Character(65).to_string(), "character 'A'");
        assert_eq!(TokenKind::Keyword(Keyword::Defer).to_string(), "keyword defer");
    }
}

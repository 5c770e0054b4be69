//! Token definitions for Sable expressions.

use crate::span::Point;
use std::fmt;

/// A token produced by the expression lexer.
///
/// Positions are relative to the expression text (line 1, column 1 is the
/// first character); the parser rebases them onto the location of the
/// surrounding command.
#[derive(Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Position of the first character of the token.
    pub begin: Point,
    /// Position of the last character of the token.
    pub end: Point,
}

impl Token {
    pub fn new(kind: TokenKind, begin: Point, end: Point) -> Self {
        Self { kind, begin, end }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} @ {:?}-{:?}", self.kind, self.begin, self.end)
    }
}

/// The kind of token.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    // Literals. Integer literals keep their digit text so the parser can
    // apply the 2^53-1 range rule with a precise location.
    /// Decimal integer literal digits (e.g. `42`)
    DecInt(String),
    /// Hex integer literal digits, without the `0x` prefix (e.g. `ff`)
    HexInt(String),
    /// Float literal (e.g. `3.14`, `1e-5`)
    Float(f64),
    /// Single-quoted string literal, unescaped
    Str(String),

    /// An identifier (e.g. `foo`, `Bar`, `_x9`)
    Ident(String),
    /// A variable reference (e.g. `$foo`)
    DollarIdent(String),
    /// The injected-data token `$ij`
    Ij,

    // Keywords
    Null,
    True,
    False,
    And,
    Or,
    Not,

    // Operators and punctuation
    Question,
    Colon,
    /// `?:`
    QuestionColon,
    EqEq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Dot,
    /// `?.`
    QuestionDot,
    LBracket,
    RBracket,
    /// `?[`
    QuestionBracket,
    Comma,
    LParen,
    RParen,

    // Legacy operators, recognized only so the parser can point at them
    // with a targeted message.
    /// `&&`
    AmpAmp,
    /// `||`
    PipePipe,
    /// `!`
    Bang,
    /// `"` starting a double-quoted string
    DoubleQuote,

    // Lexical errors that still need a parse-time diagnostic
    /// A string literal missing its closing quote
    UnterminatedStr,
    /// An unknown backslash escape inside a string literal
    InvalidEscape(char),
    /// A malformed `\uXXXX` escape
    InvalidUnicodeEscape,

    /// A character that starts no token
    Unexpected(char),

    Eof,
}

impl TokenKind {
    /// A short description of the token for error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::DecInt(text) => format!("'{text}'"),
            TokenKind::HexInt(text) => format!("'0x{text}'"),
            TokenKind::Float(value) => format!("'{value}'"),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::Ident(name) => format!("'{name}'"),
            TokenKind::DollarIdent(name) => format!("'${name}'"),
            TokenKind::Ij => "'$ij'".to_string(),
            TokenKind::Null => "'null'".to_string(),
            TokenKind::True => "'true'".to_string(),
            TokenKind::False => "'false'".to_string(),
            TokenKind::And => "'and'".to_string(),
            TokenKind::Or => "'or'".to_string(),
            TokenKind::Not => "'not'".to_string(),
            TokenKind::Question => "'?'".to_string(),
            TokenKind::Colon => "':'".to_string(),
            TokenKind::QuestionColon => "'?:'".to_string(),
            TokenKind::EqEq => "'=='".to_string(),
            TokenKind::NotEq => "'!='".to_string(),
            TokenKind::Lt => "'<'".to_string(),
            TokenKind::Gt => "'>'".to_string(),
            TokenKind::LtEq => "'<='".to_string(),
            TokenKind::GtEq => "'>='".to_string(),
            TokenKind::Plus => "'+'".to_string(),
            TokenKind::Minus => "'-'".to_string(),
            TokenKind::Star => "'*'".to_string(),
            TokenKind::Slash => "'/'".to_string(),
            TokenKind::Percent => "'%'".to_string(),
            TokenKind::Dot => "'.'".to_string(),
            TokenKind::QuestionDot => "'?.'".to_string(),
            TokenKind::LBracket => "'['".to_string(),
            TokenKind::RBracket => "']'".to_string(),
            TokenKind::QuestionBracket => "'?['".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::AmpAmp => "'&&'".to_string(),
            TokenKind::PipePipe => "'||'".to_string(),
            TokenKind::Bang => "'!'".to_string(),
            TokenKind::DoubleQuote => "'\"'".to_string(),
            TokenKind::UnterminatedStr => "unterminated string literal".to_string(),
            TokenKind::InvalidEscape(c) => format!("invalid escape '\\{c}'"),
            TokenKind::InvalidUnicodeEscape => "invalid unicode escape".to_string(),
            TokenKind::Unexpected(c) => format!("'{c}'"),
            TokenKind::Eof => "end of expression".to_string(),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

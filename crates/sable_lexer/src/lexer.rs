//! The expression lexer.
//!
//! Tokenizes the text of a single embedded expression (the outer parser has
//! already stripped the surrounding command braces). Longest match wins and
//! ASCII whitespace is skipped between tokens.

use crate::span::Point;
use crate::token::{Token, TokenKind};
use std::str::Chars;

/// The lexer for Sable expression text.
pub struct Lexer<'a> {
    /// Iterator over the remaining characters.
    chars: Chars<'a>,
    /// The character at the current position (None if at end).
    current: Option<char>,
    /// Line of the current character, 1-based relative to the expression.
    line: u32,
    /// Column of the current character, 1-based relative to the expression.
    column: u32,
    /// Position of the most recently consumed character.
    last_point: Point,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given expression text.
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.chars();
        let current = chars.next();
        Self {
            chars,
            current,
            line: 1,
            column: 1,
            last_point: Point::new(1, 1),
        }
    }

    /// Tokenizes the entire expression, ending with an `Eof` token.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    /// Returns the next token from the source.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let begin = self.point();

        let kind = match self.current {
            None => TokenKind::Eof,

            Some(c) if c.is_ascii_alphabetic() || c == '_' => self.lex_ident_or_keyword(),

            Some(c) if c.is_ascii_digit() => self.lex_number(),

            Some('\'') => self.lex_string(),

            Some('$') => self.lex_dollar(),

            Some(c) => self.lex_punctuation(c),
        };

        Token::new(kind, begin, self.last_point)
    }

    /// The position of the current (unconsumed) character.
    fn point(&self) -> Point {
        Point::new(self.line, self.column)
    }

    /// Advances to the next character and returns the consumed one.
    fn advance(&mut self) -> Option<char> {
        let current = self.current;
        if let Some(c) = current {
            self.last_point = self.point();
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.current = self.chars.next();
        }
        current
    }

    /// Returns the current character without advancing.
    fn peek(&self) -> Option<char> {
        self.current
    }

    /// Returns the next character without advancing.
    fn peek_next(&self) -> Option<char> {
        self.chars.clone().next()
    }

    /// Returns the character `n` positions past the current one.
    fn peek_nth(&self, n: usize) -> Option<char> {
        if n == 0 {
            self.current
        } else {
            self.chars.clone().nth(n - 1)
        }
    }

    /// Advances if the current character matches the expected one.
    fn match_char(&mut self, expected: char) -> bool {
        if self.current == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Only ASCII whitespace separates tokens.
    fn skip_whitespace(&mut self) {
        while matches!(self.current, Some(' ' | '\t' | '\n' | '\r')) {
            self.advance();
        }
    }

    fn lex_ident_text(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.current {
            if c.is_ascii_alphanumeric() || c == '_' {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }
        text
    }

    fn lex_ident_or_keyword(&mut self) -> TokenKind {
        let text = self.lex_ident_text();
        match text.as_str() {
            "null" => TokenKind::Null,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            _ => TokenKind::Ident(text),
        }
    }

    /// `$ij` outranks `$ident`, which is handled by comparing the whole
    /// identifier after the dollar sign.
    fn lex_dollar(&mut self) -> TokenKind {
        self.advance(); // $
        match self.current {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let name = self.lex_ident_text();
                if name == "ij" {
                    TokenKind::Ij
                } else {
                    TokenKind::DollarIdent(name)
                }
            }
            _ => TokenKind::Unexpected('$'),
        }
    }

    fn lex_number(&mut self) -> TokenKind {
        // hex literal: lowercase 'x' followed by at least one hex digit
        if self.current == Some('0')
            && self.peek_next() == Some('x')
            && self.peek_nth(2).is_some_and(|c| c.is_ascii_hexdigit())
        {
            self.advance(); // 0
            self.advance(); // x
            let mut digits = String::new();
            while let Some(c) = self.current {
                if c.is_ascii_hexdigit() {
                    digits.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
            return TokenKind::HexInt(digits);
        }

        let mut text = String::new();
        while let Some(c) = self.current {
            if c.is_ascii_digit() {
                text.push(c);
                self.advance();
            } else {
                break;
            }
        }

        let mut is_float = false;

        // fraction: a '.' only joins the number if a digit follows it,
        // keeping `$a.0` field accesses and `1.` errors out of float land
        if self.current == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            text.push('.');
            self.advance();
            while let Some(c) = self.current {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        // exponent: lowercase 'e', optional sign, at least one digit
        if self.current == Some('e') {
            let signed = matches!(self.peek_next(), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_nth(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                text.push('e');
                self.advance();
                if signed {
                    text.push(self.advance().unwrap());
                }
                while let Some(c) = self.current {
                    if c.is_ascii_digit() {
                        text.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }

        if is_float {
            // the text was validated char by char above
            TokenKind::Float(text.parse::<f64>().unwrap_or(f64::NAN))
        } else {
            TokenKind::DecInt(text)
        }
    }

    fn lex_string(&mut self) -> TokenKind {
        self.advance(); // opening quote
        let mut value = String::new();
        loop {
            match self.current {
                None | Some('\n') | Some('\r') => return TokenKind::UnterminatedStr,
                Some('\'') => {
                    self.advance();
                    return TokenKind::Str(value);
                }
                Some('\\') => {
                    self.advance();
                    match self.current {
                        Some('\\') => value.push('\\'),
                        Some('\'') => value.push('\''),
                        Some('"') => value.push('"'),
                        Some('n') => value.push('\n'),
                        Some('r') => value.push('\r'),
                        Some('t') => value.push('\t'),
                        Some('b') => value.push('\u{0008}'),
                        Some('f') => value.push('\u{000C}'),
                        Some('u') => {
                            self.advance(); // u
                            match self.lex_unicode_escape() {
                                Some(c) => value.push(c),
                                None => return TokenKind::InvalidUnicodeEscape,
                            }
                            continue;
                        }
                        Some(c) => return TokenKind::InvalidEscape(c),
                        None => return TokenKind::UnterminatedStr,
                    }
                    self.advance();
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }
    }

    /// Consumes exactly four hex digits after `\u`.
    fn lex_unicode_escape(&mut self) -> Option<char> {
        let mut code: u32 = 0;
        for _ in 0..4 {
            let digit = self.current?.to_digit(16)?;
            code = code * 16 + digit;
            self.advance();
        }
        char::from_u32(code)
    }

    fn lex_punctuation(&mut self, c: char) -> TokenKind {
        self.advance();
        match c {
            '?' => {
                if self.match_char(':') {
                    TokenKind::QuestionColon
                } else if self.match_char('.') {
                    TokenKind::QuestionDot
                } else if self.match_char('[') {
                    TokenKind::QuestionBracket
                } else {
                    TokenKind::Question
                }
            }
            ':' => TokenKind::Colon,
            '=' => {
                if self.match_char('=') {
                    TokenKind::EqEq
                } else {
                    TokenKind::Unexpected('=')
                }
            }
            '!' => {
                if self.match_char('=') {
                    TokenKind::NotEq
                } else {
                    // legacy negation operator, rejected with a hint
                    TokenKind::Bang
                }
            }
            '<' => {
                if self.match_char('=') {
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.match_char('=') {
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            '&' => {
                if self.match_char('&') {
                    TokenKind::AmpAmp
                } else {
                    TokenKind::Unexpected('&')
                }
            }
            '|' => {
                if self.match_char('|') {
                    TokenKind::PipePipe
                } else {
                    TokenKind::Unexpected('|')
                }
            }
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '.' => TokenKind::Dot,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '"' => TokenKind::DoubleQuote,
            other => TokenKind::Unexpected(other),
        }
    }
}

//! The parser cursor and public entry points.
//!
//! Internally the parser threads `Result` with `?`; the entry points catch
//! the first failure, render it into the [`ErrorReporter`], and return a
//! sentinel so errors never escape as `Err` (the outer parser keeps going).

use crate::error::ParseErrorKind;
use sable_ast::{Expr, ExprKind};
use sable_lexer::{ErrorReporter, Lexer, SourceLocation, Token, TokenKind};

/// A parse failure carrying the diagnostic and where to point at.
#[derive(Clone, Debug)]
pub(crate) struct ParseFailure {
    pub location: SourceLocation,
    pub kind: ParseErrorKind,
}

pub(crate) type ParseResult<T> = Result<T, ParseFailure>;

/// Maximum nesting depth before the parser gives up instead of risking the
/// stack.
pub(crate) const MAX_NESTING_DEPTH: u32 = 1024;

/// Parses an expression; on failure one diagnostic is reported and an
/// error-sentinel node is returned.
pub fn parse_expression(
    source: &str,
    base: &SourceLocation,
    reporter: &mut ErrorReporter,
) -> Expr {
    let mut parser = Parser::new(source, base);
    match parser.parse_single_expression() {
        Ok(expr) => {
            parser.report_pending(reporter);
            expr
        }
        Err(failure) => {
            parser.report_pending(reporter);
            reporter.report(failure.location, failure.kind);
            Expr::error(base.clone())
        }
    }
}

/// Parses a comma-separated expression list; on failure one diagnostic is
/// reported and the empty list is returned.
pub fn parse_expression_list(
    source: &str,
    base: &SourceLocation,
    reporter: &mut ErrorReporter,
) -> Vec<Expr> {
    let mut parser = Parser::new(source, base);
    match parser.parse_expression_list_inner() {
        Ok(exprs) => {
            parser.report_pending(reporter);
            exprs
        }
        Err(failure) => {
            parser.report_pending(reporter);
            reporter.report(failure.location, failure.kind);
            Vec::new()
        }
    }
}

/// Parses a single `$variable` reference.
///
/// Unlike [`parse_expression`] this rejects the `$ij` form outright; the
/// result is a `Var` node or the error sentinel.
pub fn parse_variable(
    source: &str,
    base: &SourceLocation,
    reporter: &mut ErrorReporter,
) -> Expr {
    let mut parser = Parser::new(source, base);
    match parser.parse_variable_inner() {
        Ok(expr) => {
            parser.report_pending(reporter);
            expr
        }
        Err(failure) => {
            parser.report_pending(reporter);
            reporter.report(failure.location, failure.kind);
            Expr::error(base.clone())
        }
    }
}

/// The expression parser.
pub(crate) struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    base: &'a SourceLocation,
    pub(crate) depth: u32,
    /// Semantic-local errors (integer range, duplicate proto field) that do
    /// not abort the parse; flushed to the reporter at the end.
    pending: Vec<ParseFailure>,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(source: &str, base: &'a SourceLocation) -> Self {
        Self {
            tokens: Lexer::new(source).tokenize(),
            pos: 0,
            base,
            depth: 0,
            pending: Vec::new(),
        }
    }

    fn report_pending(&mut self, reporter: &mut ErrorReporter) {
        for failure in self.pending.drain(..) {
            reporter.report(failure.location, failure.kind);
        }
    }

    pub(crate) fn parse_single_expression(&mut self) -> ParseResult<Expr> {
        let expr = self.parse_expr()?;
        self.expect_eof()?;
        Ok(expr)
    }

    fn parse_expression_list_inner(&mut self) -> ParseResult<Vec<Expr>> {
        let mut exprs = vec![self.parse_expr()?];
        while self.match_token(&TokenKind::Comma) {
            exprs.push(self.parse_expr()?);
        }
        self.expect_eof()?;
        Ok(exprs)
    }

    fn parse_variable_inner(&mut self) -> ParseResult<Expr> {
        let token = self.advance();
        let location = self.token_location(&token);
        let expr = match token.kind {
            TokenKind::DollarIdent(name) => {
                Expr::new(ExprKind::Var { name, injected: false }, location)
            }
            TokenKind::Ij => {
                return Err(ParseFailure {
                    location,
                    kind: ParseErrorKind::InvalidVarNameIj,
                });
            }
            other => {
                return Err(ParseFailure {
                    location,
                    kind: ParseErrorKind::UnexpectedToken {
                        expected: "a variable like '$foo'".to_string(),
                        found: other.describe(),
                    },
                });
            }
        };
        self.expect_eof()?;
        Ok(expr)
    }

    // ========== Cursor helpers ==========

    pub(crate) fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    pub(crate) fn peek_nth_kind(&self, n: usize) -> &TokenKind {
        let index = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    pub(crate) fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(kind)
    }

    pub(crate) fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind, expected: &str) -> ParseResult<Token> {
        if self.check(&kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_eof(&mut self) -> ParseResult<()> {
        if self.check(&TokenKind::Eof) {
            Ok(())
        } else {
            Err(self.unexpected("end of expression"))
        }
    }

    /// The absolute location of a token, rebased onto the expression's
    /// location in its file.
    pub(crate) fn token_location(&self, token: &Token) -> SourceLocation {
        self.base.resolve_span(token.begin, token.end)
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.token_location(self.peek())
    }

    /// A failure pointing at the current token.
    pub(crate) fn unexpected(&self, expected: &str) -> ParseFailure {
        ParseFailure {
            location: self.current_location(),
            kind: ParseErrorKind::UnexpectedToken {
                expected: expected.to_string(),
                found: self.peek_kind().describe(),
            },
        }
    }

    pub(crate) fn failure(&self, location: SourceLocation, kind: ParseErrorKind) -> ParseFailure {
        ParseFailure { location, kind }
    }

    /// Records a diagnostic that does not abort the parse.
    pub(crate) fn report_later(&mut self, location: SourceLocation, kind: ParseErrorKind) {
        self.pending.push(ParseFailure { location, kind });
    }
}

//! Expression parsing with a precedence cascade.
//!
//! One function per level of the operator table, loosest binding first.
//! Each level loops for left-associative chains; the conditional level and
//! unary operators recurse for right associativity.

use crate::error::ParseErrorKind;
use crate::parser::{ParseResult, Parser, MAX_NESTING_DEPTH};
use indexmap::IndexMap;
use sable_ast::{Expr, ExprKind, Ident, OpKind};
use sable_lexer::{SourceLocation, TokenKind};

/// Largest integer magnitude exactly representable in a 53-bit mantissa.
const MAX_SAFE_INTEGER: u64 = (1 << 53) - 1;

impl Parser<'_> {
    /// Parses one expression, guarding against runaway nesting.
    pub(crate) fn parse_expr(&mut self) -> ParseResult<Expr> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.failure(self.current_location(), ParseErrorKind::ExpressionTooDeep));
        }
        self.depth += 1;
        let result = self.parse_ternary();
        self.depth -= 1;
        result
    }

    /// Level 1: `?:` and `? :`, right associative.
    fn parse_ternary(&mut self) -> ParseResult<Expr> {
        let condition = self.parse_or()?;

        if self.match_token(&TokenKind::QuestionColon) {
            let fallback = self.parse_expr()?;
            let location = condition.location.extend(&fallback.location);
            return Ok(Expr::new(
                ExprKind::Op {
                    op: OpKind::NullCoalescing,
                    operands: vec![condition, fallback],
                },
                location,
            ));
        }

        if self.match_token(&TokenKind::Question) {
            let then_branch = self.parse_expr()?;
            self.expect(TokenKind::Colon, "':' in conditional")?;
            let else_branch = self.parse_expr()?;
            let location = condition.location.extend(&else_branch.location);
            return Ok(Expr::new(
                ExprKind::Op {
                    op: OpKind::Conditional,
                    operands: vec![condition, then_branch, else_branch],
                },
                location,
            ));
        }

        Ok(condition)
    }

    /// Level 2: `or`.
    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and()?;
        loop {
            if self.check(&TokenKind::PipePipe) {
                return Err(self.failure(
                    self.current_location(),
                    ParseErrorKind::LegacyOperator { found: "||", replacement: "or" },
                ));
            }
            if !self.match_token(&TokenKind::Or) {
                break;
            }
            let right = self.parse_and()?;
            left = binary(OpKind::Or, left, right);
        }
        Ok(left)
    }

    /// Level 3: `and`.
    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_equality()?;
        loop {
            if self.check(&TokenKind::AmpAmp) {
                return Err(self.failure(
                    self.current_location(),
                    ParseErrorKind::LegacyOperator { found: "&&", replacement: "and" },
                ));
            }
            if !self.match_token(&TokenKind::And) {
                break;
            }
            let right = self.parse_equality()?;
            left = binary(OpKind::And, left, right);
        }
        Ok(left)
    }

    /// Level 4: `==` and `!=`.
    fn parse_equality(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => OpKind::Equal,
                TokenKind::NotEq => OpKind::NotEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    /// Level 5: `<`, `>`, `<=`, `>=`.
    fn parse_relational(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Lt => OpKind::Less,
                TokenKind::Gt => OpKind::Greater,
                TokenKind::LtEq => OpKind::LessOrEqual,
                TokenKind::GtEq => OpKind::GreaterOrEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    /// Level 6: binary `+` and `-`.
    fn parse_additive(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => OpKind::Plus,
                TokenKind::Minus => OpKind::Minus,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    /// Level 7: `*`, `/`, `%`.
    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => OpKind::Times,
                TokenKind::Slash => OpKind::DividedBy,
                TokenKind::Percent => OpKind::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    /// Level 8: unary `-` and `not`, right associative.
    ///
    /// Tokenization never folds `-N` into a negative literal, so `$a-1`
    /// stays a subtraction; negation always goes through here.
    fn parse_unary(&mut self) -> ParseResult<Expr> {
        if self.check(&TokenKind::Bang) {
            return Err(self.failure(
                self.current_location(),
                ParseErrorKind::LegacyOperator { found: "!", replacement: "not" },
            ));
        }

        let op = match self.peek_kind() {
            TokenKind::Minus => Some(OpKind::Negative),
            TokenKind::Not => Some(OpKind::Not),
            _ => None,
        };
        if let Some(op) = op {
            if self.depth >= MAX_NESTING_DEPTH {
                return Err(
                    self.failure(self.current_location(), ParseErrorKind::ExpressionTooDeep)
                );
            }
            self.depth += 1;
            let token = self.advance();
            let operand = self.parse_unary();
            self.depth -= 1;
            let operand = operand?;
            let location = self.token_location(&token).extend(&operand.location);
            return Ok(Expr::new(
                ExprKind::Op { op, operands: vec![operand] },
                location,
            ));
        }

        self.parse_postfix()
    }

    /// Level 9: `.`, `?.`, `[ ]`, `?[ ]`, left associative.
    ///
    /// Chains come out left-deep: the leftmost subtree is the base the rest
    /// of the chain depends on.
    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::Dot | TokenKind::QuestionDot => {
                    let null_safe = self.check(&TokenKind::QuestionDot);
                    self.advance();
                    let field = self.expect_ident("a field name")?;
                    let location = expr.location.extend(&field.location);
                    expr = Expr::new(
                        ExprKind::FieldAccess {
                            base: Box::new(expr),
                            field: field.name,
                            null_safe,
                        },
                        location,
                    );
                }
                TokenKind::LBracket | TokenKind::QuestionBracket => {
                    let null_safe = self.check(&TokenKind::QuestionBracket);
                    self.advance();
                    let key = self.parse_expr()?;
                    let close = self.expect(TokenKind::RBracket, "']'")?;
                    let location = expr.location.extend(&self.token_location(&close));
                    expr = Expr::new(
                        ExprKind::ItemAccess {
                            base: Box::new(expr),
                            key: Box::new(key),
                            null_safe,
                        },
                        location,
                    );
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        match self.peek_kind().clone() {
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                Ok(expr)
            }

            TokenKind::Null => Ok(self.literal(ExprKind::Null)),
            TokenKind::True => Ok(self.literal(ExprKind::Bool(true))),
            TokenKind::False => Ok(self.literal(ExprKind::Bool(false))),
            TokenKind::Float(value) => Ok(self.literal(ExprKind::Float(value))),
            TokenKind::Str(value) => Ok(self.literal(ExprKind::Str(value))),

            TokenKind::DecInt(text) => {
                let token = self.advance();
                let location = self.token_location(&token);
                let value = self.int_in_range(text.parse::<u64>().ok(), &location);
                Ok(Expr::new(ExprKind::Int(value), location))
            }
            TokenKind::HexInt(text) => {
                let token = self.advance();
                let location = self.token_location(&token);
                let value =
                    self.int_in_range(u64::from_str_radix(&text, 16).ok(), &location);
                Ok(Expr::new(ExprKind::Int(value), location))
            }

            TokenKind::DollarIdent(name) => {
                let token = self.advance();
                Ok(Expr::new(
                    ExprKind::Var { name, injected: false },
                    self.token_location(&token),
                ))
            }

            TokenKind::Ij => self.parse_ij_reference(),

            TokenKind::Ident(_) => self.parse_ident_prefixed(),

            TokenKind::LBracket => {
                let token = self.advance();
                self.parse_collection(self.token_location(&token))
            }

            TokenKind::DoubleQuote => {
                Err(self.failure(self.current_location(), ParseErrorKind::DoubleQuotedString))
            }
            TokenKind::UnterminatedStr => {
                Err(self.failure(self.current_location(), ParseErrorKind::UnterminatedString))
            }
            TokenKind::InvalidEscape(escape) => {
                Err(self.failure(self.current_location(), ParseErrorKind::InvalidEscape { escape }))
            }
            TokenKind::InvalidUnicodeEscape => {
                Err(self.failure(self.current_location(), ParseErrorKind::InvalidUnicodeEscape))
            }

            _ => Err(self.unexpected("an expression")),
        }
    }

    /// `$ij.name` is the sole injected-variable form; a bare `$ij` is
    /// reported but parsing continues with an error node.
    fn parse_ij_reference(&mut self) -> ParseResult<Expr> {
        let ij = self.advance();
        let ij_location = self.token_location(&ij);
        if self.check(&TokenKind::Dot) && matches!(self.peek_nth_kind(1), TokenKind::Ident(_)) {
            self.advance(); // .
            let field = self.expect_ident("a field name")?;
            let location = ij_location.extend(&field.location);
            return Ok(Expr::new(
                ExprKind::Var { name: field.name, injected: true },
                location,
            ));
        }
        self.report_later(ij_location.clone(), ParseErrorKind::UnexpectedIjDataReference);
        Ok(Expr::error(ij_location))
    }

    /// An identifier prefix: a dotted global, a function call, or a proto
    /// init, depending on what follows.
    fn parse_ident_prefixed(&mut self) -> ParseResult<Expr> {
        let first = self.expect_ident("an identifier")?;
        let mut name = first.name;
        let mut location = first.location;

        // consume the dotted tail into the name; field accesses only apply
        // to variables and parenthesized expressions
        while self.check(&TokenKind::Dot) && matches!(self.peek_nth_kind(1), TokenKind::Ident(_)) {
            self.advance(); // .
            let part = self.expect_ident("an identifier")?;
            name.push('.');
            name.push_str(&part.name);
            location = location.extend(&part.location);
        }

        if !self.check(&TokenKind::LParen) {
            return Ok(Expr::new(ExprKind::Global(name), location));
        }
        self.advance(); // (

        let ident = Ident::new(name, location.clone());

        if self.check(&TokenKind::RParen) {
            // `name()` defaults to a function call; whether it is really a
            // proto init is decided by a later pass
            let close = self.advance();
            let location = location.extend(&self.token_location(&close));
            return Ok(Expr::new(
                ExprKind::FunctionCall { name: ident, args: Vec::new() },
                location,
            ));
        }

        if matches!(self.peek_kind(), TokenKind::Ident(_))
            && matches!(self.peek_nth_kind(1), TokenKind::Colon)
        {
            self.parse_proto_init(ident)
        } else {
            self.parse_function_call(ident)
        }
    }

    fn parse_function_call(&mut self, name: Ident) -> ParseResult<Expr> {
        let mut args = vec![self.parse_expr()?];
        while self.match_token(&TokenKind::Comma) {
            args.push(self.parse_expr()?);
        }
        let close = self.expect(TokenKind::RParen, "')'")?;
        let location = name.location.extend(&self.token_location(&close));

        if name.name.contains('.') {
            // positional arguments make this unambiguously a function call,
            // and function names must be simple identifiers
            self.report_later(
                name.location.clone(),
                ParseErrorKind::InvalidFunctionName { name: name.name.clone() },
            );
            return Ok(Expr::error(location));
        }

        Ok(Expr::new(ExprKind::FunctionCall { name, args }, location))
    }

    fn parse_proto_init(&mut self, name: Ident) -> ParseResult<Expr> {
        let mut fields: IndexMap<String, Expr> = IndexMap::new();
        loop {
            let field = match self.peek_kind() {
                TokenKind::Ident(_) => self.expect_ident("a param name")?,
                _ => {
                    return Err(
                        self.failure(self.current_location(), ParseErrorKind::InvalidParamName)
                    );
                }
            };
            self.expect(TokenKind::Colon, "':'")?;
            let value = self.parse_expr()?;
            if fields.contains_key(&field.name) {
                self.report_later(
                    field.location.clone(),
                    ParseErrorKind::DuplicateParamName { name: field.name.clone() },
                );
            } else {
                fields.insert(field.name, value);
            }
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        let close = self.expect(TokenKind::RParen, "')'")?;
        let location = name.location.extend(&self.token_location(&close));
        Ok(Expr::new(ExprKind::ProtoInit { name, fields }, location))
    }

    /// Parses a collection literal after the opening `[`.
    fn parse_collection(&mut self, open_location: SourceLocation) -> ParseResult<Expr> {
        // `[:]` is the empty map, `[]` the empty list
        if self.match_token(&TokenKind::Colon) {
            let close = self.expect(TokenKind::RBracket, "']'")?;
            let location = open_location.extend(&self.token_location(&close));
            return Ok(Expr::new(ExprKind::Map(Vec::new()), location));
        }
        if self.check(&TokenKind::RBracket) {
            let close = self.advance();
            let location = open_location.extend(&self.token_location(&close));
            return Ok(Expr::new(ExprKind::List(Vec::new()), location));
        }

        let first = self.parse_expr()?;

        if self.match_token(&TokenKind::Colon) {
            self.check_map_key(&first)?;
            let value = self.parse_expr()?;
            let mut entries = vec![(first, value)];
            while self.match_token(&TokenKind::Comma) {
                // a trailing comma ends the collection (two-token lookahead)
                if self.check(&TokenKind::RBracket) {
                    break;
                }
                let key = self.parse_expr()?;
                self.check_map_key(&key)?;
                self.expect(TokenKind::Colon, "':'")?;
                let value = self.parse_expr()?;
                entries.push((key, value));
            }
            let close = self.expect(TokenKind::RBracket, "']'")?;
            let location = open_location.extend(&self.token_location(&close));
            return Ok(Expr::new(ExprKind::Map(entries), location));
        }

        let mut items = vec![first];
        while self.match_token(&TokenKind::Comma) {
            if self.check(&TokenKind::RBracket) {
                break;
            }
            items.push(self.parse_expr()?);
        }
        let close = self.expect(TokenKind::RBracket, "']'")?;
        let location = open_location.extend(&self.token_location(&close));
        Ok(Expr::new(ExprKind::List(items), location))
    }

    /// Map keys may be any expression that evaluates to a string, but a
    /// literal bare identifier is almost always a typo for a quoted string.
    fn check_map_key(&self, key: &Expr) -> ParseResult<()> {
        if let ExprKind::Global(name) = &key.kind {
            if !name.contains('.') {
                return Err(self.failure(
                    key.location.clone(),
                    ParseErrorKind::SingleIdentifierKeyInMapLiteral { key: name.clone() },
                ));
            }
        }
        Ok(())
    }

    // ========== Small helpers ==========

    fn literal(&mut self, kind: ExprKind) -> Expr {
        let token = self.advance();
        Expr::new(kind, self.token_location(&token))
    }

    fn expect_ident(&mut self, expected: &str) -> ParseResult<Ident> {
        match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                let token = self.advance();
                Ok(Ident::new(name, self.token_location(&token)))
            }
            _ => Err(self.unexpected(expected)),
        }
    }

    /// Range-checks an integer literal, substituting 0 when it cannot be
    /// represented exactly.
    fn int_in_range(&mut self, value: Option<u64>, location: &SourceLocation) -> i64 {
        match value {
            Some(v) if v <= MAX_SAFE_INTEGER => v as i64,
            _ => {
                self.report_later(location.clone(), ParseErrorKind::IntegerOutOfRange);
                0
            }
        }
    }
}

fn binary(op: OpKind, left: Expr, right: Expr) -> Expr {
    let location = left.location.extend(&right.location);
    Expr::new(ExprKind::Op { op, operands: vec![left, right] }, location)
}

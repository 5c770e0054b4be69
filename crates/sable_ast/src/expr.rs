//! Expression AST nodes.

use indexmap::IndexMap;
use sable_lexer::SourceLocation;
use std::fmt;

/// A (possibly dotted) identifier with its source location.
///
/// Function names are simple identifiers; global and proto names may be
/// dotted paths like `a.b.C`.
#[derive(Clone, Debug)]
pub struct Ident {
    pub name: String,
    pub location: SourceLocation,
}

impl Ident {
    pub fn new(name: impl Into<String>, location: SourceLocation) -> Self {
        Self { name: name.into(), location }
    }
}

// Structural equality ignores locations so tests can compare reparsed trees.
impl PartialEq for Ident {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

/// An expression with its source location.
#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub location: SourceLocation,
}

impl Expr {
    pub fn new(kind: ExprKind, location: SourceLocation) -> Self {
        Self { kind, location }
    }

    /// An error sentinel used to keep parsing after a reported error.
    pub fn error(location: SourceLocation) -> Self {
        Self { kind: ExprKind::Error, location }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, ExprKind::Error)
    }

    /// The binding strength of this expression when rendered back to source.
    ///
    /// Operators report their level from the precedence table; access chains
    /// bind at level 9 and everything else is primary.
    pub fn precedence(&self) -> u8 {
        match &self.kind {
            ExprKind::Op { op, .. } => op.precedence(),
            ExprKind::FieldAccess { .. } | ExprKind::ItemAccess { .. } => 9,
            _ => PRIMARY_PRECEDENCE,
        }
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

const PRIMARY_PRECEDENCE: u8 = 10;

/// The kind of expression.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    /// `null`
    Null,
    /// `true` or `false`
    Bool(bool),
    /// An integer literal; the value fits in a 53-bit mantissa
    Int(i64),
    /// A float literal
    Float(f64),
    /// A single-quoted string literal
    Str(String),

    /// A variable reference (`$foo`), possibly injected (`$ij.foo`)
    Var { name: String, injected: bool },

    /// A dotted global reference (`a.b.C`)
    Global(String),

    /// Field access (`$a.b`, `$a?.b`)
    FieldAccess {
        base: Box<Expr>,
        field: String,
        null_safe: bool,
    },

    /// Keyed access (`$a[0]`, `$a?['k']`)
    ItemAccess {
        base: Box<Expr>,
        key: Box<Expr>,
        null_safe: bool,
    },

    /// A unary, binary, or ternary operator application
    Op { op: OpKind, operands: Vec<Expr> },

    /// A function call over positional arguments
    FunctionCall { name: Ident, args: Vec<Expr> },

    /// A proto construction over named fields, in source order
    ProtoInit {
        name: Ident,
        fields: IndexMap<String, Expr>,
    },

    /// `[a, b, c]`
    List(Vec<Expr>),

    /// `['k': $v, ...]`; keys evaluate to strings at runtime
    Map(Vec<(Expr, Expr)>),

    /// Sentinel for a subtree that failed to parse
    Error,
}

/// Operator kinds, with their precedence-table levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpKind {
    // unary, level 8
    Negative,
    Not,
    // multiplicative, level 7
    Times,
    DividedBy,
    Mod,
    // additive, level 6
    Plus,
    Minus,
    // relational, level 5
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
    // equality, level 4
    Equal,
    NotEqual,
    // logical, levels 3 and 2
    And,
    Or,
    // level 1, right associative
    NullCoalescing,
    Conditional,
}

impl OpKind {
    /// The level from the precedence table, 1 (loosest) to 8 (tightest).
    pub fn precedence(&self) -> u8 {
        match self {
            OpKind::NullCoalescing | OpKind::Conditional => 1,
            OpKind::Or => 2,
            OpKind::And => 3,
            OpKind::Equal | OpKind::NotEqual => 4,
            OpKind::Less | OpKind::Greater | OpKind::LessOrEqual | OpKind::GreaterOrEqual => 5,
            OpKind::Plus | OpKind::Minus => 6,
            OpKind::Times | OpKind::DividedBy | OpKind::Mod => 7,
            OpKind::Negative | OpKind::Not => 8,
        }
    }

    pub fn is_right_associative(&self) -> bool {
        matches!(self, OpKind::NullCoalescing | OpKind::Conditional)
    }

    /// How many operands the operator takes.
    pub fn operand_count(&self) -> usize {
        match self {
            OpKind::Negative | OpKind::Not => 1,
            OpKind::Conditional => 3,
            _ => 2,
        }
    }

    /// The operator's source text.
    pub fn token_text(&self) -> &'static str {
        match self {
            OpKind::Negative => "-",
            OpKind::Not => "not",
            OpKind::Times => "*",
            OpKind::DividedBy => "/",
            OpKind::Mod => "%",
            OpKind::Plus => "+",
            OpKind::Minus => "-",
            OpKind::Less => "<",
            OpKind::Greater => ">",
            OpKind::LessOrEqual => "<=",
            OpKind::GreaterOrEqual => ">=",
            OpKind::Equal => "==",
            OpKind::NotEqual => "!=",
            OpKind::And => "and",
            OpKind::Or => "or",
            OpKind::NullCoalescing => "?:",
            OpKind::Conditional => "? :",
        }
    }
}

impl Expr {
    /// Renders a canonical source form of this expression.
    ///
    /// Reparsing the result yields a structurally equal tree. Operands are
    /// parenthesized by comparing precedence levels, with extra parentheses
    /// on the non-associating side of same-level operands.
    pub fn to_source_string(&self) -> String {
        let mut out = String::new();
        self.write_source(&mut out);
        out
    }

    fn write_source(&self, out: &mut String) {
        match &self.kind {
            ExprKind::Null => out.push_str("null"),
            ExprKind::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            ExprKind::Int(i) => out.push_str(&i.to_string()),
            ExprKind::Float(f) => write_float(*f, out),
            ExprKind::Str(s) => write_quoted(s, out),
            ExprKind::Var { name, injected } => {
                if *injected {
                    out.push_str("$ij.");
                    out.push_str(name);
                } else {
                    out.push('$');
                    out.push_str(name);
                }
            }
            ExprKind::Global(name) => out.push_str(name),
            ExprKind::FieldAccess { base, field, null_safe } => {
                write_operand(base, 9, out);
                out.push_str(if *null_safe { "?." } else { "." });
                out.push_str(field);
            }
            ExprKind::ItemAccess { base, key, null_safe } => {
                write_operand(base, 9, out);
                out.push_str(if *null_safe { "?[" } else { "[" });
                key.write_source(out);
                out.push(']');
            }
            ExprKind::Op { op, operands } => write_op(*op, operands, out),
            ExprKind::FunctionCall { name, args } => {
                out.push_str(&name.name);
                out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    arg.write_source(out);
                }
                out.push(')');
            }
            ExprKind::ProtoInit { name, fields } => {
                out.push_str(&name.name);
                out.push('(');
                for (i, (field, value)) in fields.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(field);
                    out.push_str(": ");
                    value.write_source(out);
                }
                out.push(')');
            }
            ExprKind::List(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_source(out);
                }
                out.push(']');
            }
            ExprKind::Map(entries) => {
                // the empty map renders [:] to stay distinct from []
                if entries.is_empty() {
                    out.push_str("[:]");
                    return;
                }
                out.push('[');
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    key.write_source(out);
                    out.push_str(": ");
                    value.write_source(out);
                }
                out.push(']');
            }
            ExprKind::Error => out.push_str("(error)"),
        }
    }

}

fn write_op(op: OpKind, operands: &[Expr], out: &mut String) {
    let level = op.precedence();
    match op {
        OpKind::Negative => {
            out.push('-');
            write_operand(&operands[0], level, out);
        }
        OpKind::Not => {
            out.push_str("not ");
            write_operand(&operands[0], level, out);
        }
        OpKind::Conditional => {
            write_assoc_operand(&operands[0], op, true, out);
            out.push_str(" ? ");
            write_assoc_operand(&operands[1], op, false, out);
            out.push_str(" : ");
            write_assoc_operand(&operands[2], op, false, out);
        }
        _ => {
            write_assoc_operand(&operands[0], op, true, out);
            out.push(' ');
            out.push_str(op.token_text());
            out.push(' ');
            write_assoc_operand(&operands[1], op, false, out);
        }
    }
}

/// Writes an operand, parenthesized if it binds looser than `level`.
fn write_operand(operand: &Expr, level: u8, out: &mut String) {
    if operand.precedence() < level {
        out.push('(');
        operand.write_source(out);
        out.push(')');
    } else {
        operand.write_source(out);
    }
}

/// Writes an operand of a binary/ternary operator, additionally
/// parenthesizing equal-level operands on the non-associating side.
fn write_assoc_operand(operand: &Expr, op: OpKind, is_first: bool, out: &mut String) {
    let level = op.precedence();
    let needs_parens = if op.is_right_associative() == is_first {
        // the side that does not associate with this operator
        operand.precedence() <= level
    } else {
        operand.precedence() < level
    };
    if needs_parens {
        out.push('(');
        operand.write_source(out);
        out.push(')');
    } else {
        operand.write_source(out);
    }
}

/// Floats always render with a fraction or an exponent so they reparse as
/// floats rather than integers.
fn write_float(value: f64, out: &mut String) {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        out.push_str(&format!("{value:.1}"));
    } else {
        out.push_str(&value.to_string());
    }
}

fn write_quoted(s: &str, out: &mut String) {
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{0008}' => out.push_str("\\b"),
            '\u{000C}' => out.push_str("\\f"),
            other => out.push(other),
        }
    }
    out.push('\'');
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_source_string())
    }
}

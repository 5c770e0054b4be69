//! The Sable expression parser.
//!
//! Parses the text of embedded expressions (`$var.field`, `foo($x)`,
//! arithmetic, globals, collection literals) into [`Expr`](sable_ast::Expr)
//! trees with precise source locations. Inputs arrive already
//! bracket-trimmed from the outer parser.
//!
//! Errors never propagate out of the entry points: every diagnostic goes
//! through the [`ErrorReporter`](sable_lexer::ErrorReporter) and the parser
//! returns an error-sentinel node (or an empty list) instead.

mod error;
mod expr;
mod parser;

pub use error::ParseErrorKind;
pub use parser::{parse_expression, parse_expression_list, parse_variable};

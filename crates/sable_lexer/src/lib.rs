//! Source locations, diagnostics, and the expression lexer for Sable.
//!
//! This is the leaf crate of the compiler: everything that needs a
//! [`SourceLocation`] or reports through an [`ErrorReporter`] depends on it.

mod lexer;
mod report;
mod span;
mod token;

pub use lexer::Lexer;
pub use report::{Checkpoint, Diagnostic, ErrorKind, ErrorReporter};
pub use span::{Point, SourceLocation};
pub use token::{Token, TokenKind};

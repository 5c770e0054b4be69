//! Per-file pass orchestration for the Sable template compiler.
//!
//! The outer file parser produces one arena per file; this crate runs the
//! rewrite passes over it:
//!
//! ```text
//! Source (.sable) → outer parser → template AST → HtmlRewriter → codegen
//! ```
//!
//! Each file gets its own arena and error-reporter view, so files can be
//! processed by independent tasks without shared mutable state.
//!
//! # Example
//!
//! ```ignore
//! use sable_driver::{PassRunner, RewriteOptions};
//!
//! let runner = PassRunner::new(&RewriteOptions::default().with_strict_html());
//! runner.run(&mut arena, file, &mut reporter);
//! ```

mod passes;

pub use passes::{FilePass, HtmlRewritePass, PassRunner, RewriteOptions};

// Re-export commonly used types from dependencies
pub use sable_ast::{Arena, NodeId};
pub use sable_lexer::ErrorReporter;
pub use sable_parser::{parse_expression, parse_expression_list, parse_variable};

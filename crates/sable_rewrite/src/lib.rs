//! The contextual HTML rewriter for the Sable template compiler.
//!
//! Templates arrive from the outer parser as flat raw text interleaved with
//! command nodes. This pass scans the raw text of `html` and `attributes`
//! content as a finite-state machine and rewrites it into structured
//! open-tag, close-tag, attribute, and attribute-value nodes, while
//! checking that every HTML construct begun in a control-flow branch is
//! closed in the same branch.
//!
//! The pass follows the HTML syntax standard for tag and attribute lexing
//! but does not implement the contextual element model; matching open and
//! close tags is a separate pass's job.

mod context;
mod edits;
mod error;
mod pass;
mod state;

pub use edits::AstEdits;
pub use error::RewriteErrorKind;
pub use pass::HtmlRewriter;
pub use state::State;

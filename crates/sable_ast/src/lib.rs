//! Abstract syntax tree definitions for the Sable template compiler.
//!
//! Two families of nodes live here: expression trees ([`Expr`]), which are
//! plain owned values attached to the commands that contain them, and
//! template nodes ([`NodeKind`]), which live in a per-file [`Arena`] so that
//! passes can restructure the tree through recorded edits.

mod expr;
mod node;
mod raw_text;

pub use expr::{Expr, ExprKind, Ident, OpKind};
pub use node::{Arena, ContentKind, NodeId, NodeKind, Quotes, RcDataTag, TagName};
pub use raw_text::{RawText, RawTextBuilder, SourceOffsets};

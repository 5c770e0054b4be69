//! The template AST.
//!
//! Template nodes live in a per-file [`Arena`] and refer to each other by
//! [`NodeId`]. The arena is also the id generator: allocation order is the
//! monotonic node-id order the rest of the compiler relies on. Parent links
//! are stored on the nodes and kept consistent by the child-mutation
//! primitives here; passes that restructure the tree go through a deferred
//! edit buffer rather than mutating mid-traversal.

use crate::expr::Expr;
use crate::raw_text::RawText;
use sable_lexer::SourceLocation;
use std::sync::Arc;

/// A unique identifier for a template AST node within one file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// The content kind of a template or content block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Attributes,
    Text,
    Css,
    Js,
    Uri,
    TrustedResourceUri,
}

/// Quoting style of an HTML attribute value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Quotes {
    None,
    Single,
    Double,
}

/// Tags whose content is raw character data until the matching close tag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RcDataTag {
    Script,
    Style,
    Title,
    Textarea,
}

impl RcDataTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            RcDataTag::Script => "script",
            RcDataTag::Style => "style",
            RcDataTag::Title => "title",
            RcDataTag::Textarea => "textarea",
        }
    }

    /// Looks a tag name up ASCII-case-insensitively.
    pub fn from_name(name: &str) -> Option<RcDataTag> {
        if name.eq_ignore_ascii_case("script") {
            Some(RcDataTag::Script)
        } else if name.eq_ignore_ascii_case("style") {
            Some(RcDataTag::Style)
        } else if name.eq_ignore_ascii_case("title") {
            Some(RcDataTag::Title)
        } else if name.eq_ignore_ascii_case("textarea") {
            Some(RcDataTag::Textarea)
        } else {
            None
        }
    }
}

/// The name of an HTML tag: either a literal raw-text node or a print node
/// for dynamic names like `<{$tag}>`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TagName {
    node: NodeId,
}

impl TagName {
    pub fn new(node: NodeId) -> Self {
        Self { node }
    }

    /// The underlying name node; the first child of the finished tag node.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The literal name text, if the name is static.
    pub fn static_name<'a>(&self, arena: &'a Arena) -> Option<&'a str> {
        match arena.kind(self.node) {
            NodeKind::RawText(raw) => Some(raw.text()),
            _ => None,
        }
    }

    pub fn is_static(&self, arena: &Arena) -> bool {
        self.static_name(arena).is_some()
    }

    /// The rcdata tag this name refers to, if any (`script`, `style`,
    /// `title`, `textarea`; dynamic names never match).
    pub fn rcdata_tag(&self, arena: &Arena) -> Option<RcDataTag> {
        self.static_name(arena).and_then(RcDataTag::from_name)
    }

    pub fn location(&self, arena: &Arena) -> SourceLocation {
        arena.location(self.node).clone()
    }
}

/// The kind of a template AST node, including the structured HTML nodes
/// produced by the rewrite pass.
#[derive(Clone, Debug)]
pub enum NodeKind {
    /// A source file; children are templates.
    File { children: Vec<NodeId> },
    /// A template definition.
    Template {
        name: String,
        content_kind: ContentKind,
        children: Vec<NodeId>,
    },
    /// Literal template text.
    RawText(RawText),
    /// `{$expr}` or `{print $expr}`
    Print { expr: Expr },
    /// `{css ...}`
    Css { component_name: String },
    /// `{xid ...}`
    Xid { name: String },
    /// `{debugger}`
    Debugger,
    /// `{log}...{/log}`
    Log { children: Vec<NodeId> },
    /// A group of `{msg}` fallbacks.
    MsgFallbackGroup { children: Vec<NodeId> },

    // control flow
    /// `{if ...}`; children are `IfCond`s and at most one trailing `IfElse`.
    If { children: Vec<NodeId> },
    IfCond { expr: Expr, children: Vec<NodeId> },
    IfElse { children: Vec<NodeId> },
    /// `{switch ...}`; children are `SwitchCase`s and at most one
    /// `SwitchDefault`.
    Switch { expr: Expr, children: Vec<NodeId> },
    SwitchCase { exprs: Vec<Expr>, children: Vec<NodeId> },
    SwitchDefault { children: Vec<NodeId> },
    /// `{foreach ...}`; children are one `ForeachNonempty` and at most one
    /// `ForeachIfempty`.
    Foreach {
        var: String,
        expr: Expr,
        children: Vec<NodeId>,
    },
    ForeachNonempty { children: Vec<NodeId> },
    ForeachIfempty { children: Vec<NodeId> },
    /// `{for $i in range(...)}`; the node is its own (single) block.
    For {
        var: String,
        range: Vec<Expr>,
        children: Vec<NodeId>,
    },
    /// `{let $x: $expr /}`
    LetValue { var: String, expr: Expr },
    /// `{let $x kind="..."}...{/let}`
    LetContent {
        var: String,
        content_kind: Option<ContentKind>,
        children: Vec<NodeId>,
    },
    /// `{call ...}`; children are call params.
    Call {
        callee: String,
        /// Set by the HTML rewriter when the call site is in pcdata.
        is_pcdata: bool,
        children: Vec<NodeId>,
    },
    CallParamValue { name: String, expr: Expr },
    CallParamContent {
        name: String,
        content_kind: Option<ContentKind>,
        children: Vec<NodeId>,
    },

    // structured HTML, produced by the rewrite pass
    HtmlOpenTag {
        tag_name: TagName,
        self_closing: bool,
        /// The tag-name node followed by attributes and inline dynamic nodes.
        children: Vec<NodeId>,
    },
    HtmlCloseTag {
        tag_name: TagName,
        children: Vec<NodeId>,
    },
    /// One attribute: exactly one name child, optionally one value child.
    HtmlAttribute {
        equals_location: Option<SourceLocation>,
        children: Vec<NodeId>,
    },
    HtmlAttributeValue {
        quotes: Quotes,
        children: Vec<NodeId>,
    },
}

impl NodeKind {
    /// The node's children, for kinds that have any.
    pub fn children(&self) -> Option<&Vec<NodeId>> {
        match self {
            NodeKind::File { children }
            | NodeKind::Template { children, .. }
            | NodeKind::Log { children }
            | NodeKind::MsgFallbackGroup { children }
            | NodeKind::If { children }
            | NodeKind::IfCond { children, .. }
            | NodeKind::IfElse { children }
            | NodeKind::Switch { children, .. }
            | NodeKind::SwitchCase { children, .. }
            | NodeKind::SwitchDefault { children }
            | NodeKind::Foreach { children, .. }
            | NodeKind::ForeachNonempty { children }
            | NodeKind::ForeachIfempty { children }
            | NodeKind::For { children, .. }
            | NodeKind::LetContent { children, .. }
            | NodeKind::Call { children, .. }
            | NodeKind::CallParamContent { children, .. }
            | NodeKind::HtmlOpenTag { children, .. }
            | NodeKind::HtmlCloseTag { children, .. }
            | NodeKind::HtmlAttribute { children, .. }
            | NodeKind::HtmlAttributeValue { children, .. } => Some(children),
            NodeKind::RawText(_)
            | NodeKind::Print { .. }
            | NodeKind::Css { .. }
            | NodeKind::Xid { .. }
            | NodeKind::Debugger
            | NodeKind::LetValue { .. }
            | NodeKind::CallParamValue { .. } => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match self {
            NodeKind::File { children }
            | NodeKind::Template { children, .. }
            | NodeKind::Log { children }
            | NodeKind::MsgFallbackGroup { children }
            | NodeKind::If { children }
            | NodeKind::IfCond { children, .. }
            | NodeKind::IfElse { children }
            | NodeKind::Switch { children, .. }
            | NodeKind::SwitchCase { children, .. }
            | NodeKind::SwitchDefault { children }
            | NodeKind::Foreach { children, .. }
            | NodeKind::ForeachNonempty { children }
            | NodeKind::ForeachIfempty { children }
            | NodeKind::For { children, .. }
            | NodeKind::LetContent { children, .. }
            | NodeKind::Call { children, .. }
            | NodeKind::CallParamContent { children, .. }
            | NodeKind::HtmlOpenTag { children, .. }
            | NodeKind::HtmlCloseTag { children, .. }
            | NodeKind::HtmlAttribute { children, .. }
            | NodeKind::HtmlAttributeValue { children, .. } => Some(children),
            NodeKind::RawText(_)
            | NodeKind::Print { .. }
            | NodeKind::Css { .. }
            | NodeKind::Xid { .. }
            | NodeKind::Debugger
            | NodeKind::LetValue { .. }
            | NodeKind::CallParamValue { .. } => None,
        }
    }

    /// A short name for error and debug messages.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::File { .. } => "file",
            NodeKind::Template { .. } => "template",
            NodeKind::RawText(_) => "raw text",
            NodeKind::Print { .. } => "print",
            NodeKind::Css { .. } => "css",
            NodeKind::Xid { .. } => "xid",
            NodeKind::Debugger => "debugger",
            NodeKind::Log { .. } => "log",
            NodeKind::MsgFallbackGroup { .. } => "msg",
            NodeKind::If { .. } => "if",
            NodeKind::IfCond { .. } => "if block",
            NodeKind::IfElse { .. } => "else block",
            NodeKind::Switch { .. } => "switch",
            NodeKind::SwitchCase { .. } => "case block",
            NodeKind::SwitchDefault { .. } => "default block",
            NodeKind::Foreach { .. } => "foreach loop",
            NodeKind::ForeachNonempty { .. } => "loop body",
            NodeKind::ForeachIfempty { .. } => "ifempty block",
            NodeKind::For { .. } => "for loop",
            NodeKind::LetValue { .. } => "let",
            NodeKind::LetContent { .. } => "let",
            NodeKind::Call { .. } => "call",
            NodeKind::CallParamValue { .. } => "param",
            NodeKind::CallParamContent { .. } => "param",
            NodeKind::HtmlOpenTag { .. } => "html open tag",
            NodeKind::HtmlCloseTag { .. } => "html close tag",
            NodeKind::HtmlAttribute { .. } => "html attribute",
            NodeKind::HtmlAttributeValue { .. } => "html attribute value",
        }
    }
}

#[derive(Clone, Debug)]
struct NodeData {
    parent: Option<NodeId>,
    location: SourceLocation,
    kind: NodeKind,
}

/// Owns every template AST node of one file.
///
/// Allocation order doubles as the monotonic node-id order; cloning the
/// arena deep-clones the whole tree, which is how the rewriter's dry-run
/// mode works.
#[derive(Clone, Debug)]
pub struct Arena {
    file: Arc<str>,
    nodes: Vec<NodeData>,
}

impl Arena {
    pub fn new(file: Arc<str>) -> Self {
        Self { file, nodes: Vec::new() }
    }

    /// The file this arena's nodes belong to.
    pub fn file(&self) -> &Arc<str> {
        &self.file
    }

    /// Allocates a node and returns its id.
    pub fn alloc(&mut self, kind: NodeKind, location: SourceLocation) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData { parent: None, location, kind });
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0 as usize].kind
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.0 as usize].kind
    }

    pub fn location(&self, id: NodeId) -> &SourceLocation {
        &self.nodes[id.0 as usize].location
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0 as usize].parent
    }

    /// The node as raw text; panics on any other kind.
    pub fn raw_text(&self, id: NodeId) -> &RawText {
        match self.kind(id) {
            NodeKind::RawText(raw) => raw,
            other => panic!("expected raw text, found {}", other.name()),
        }
    }

    /// A snapshot of the node's children (empty for leaf kinds), safe to
    /// iterate while the arena is mutated.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.kind(id).children().cloned().unwrap_or_default()
    }

    /// The index of `child` in `parent`'s child list.
    pub fn child_index(&self, parent: NodeId, child: NodeId) -> Option<usize> {
        self.kind(parent)
            .children()
            .and_then(|c| c.iter().position(|&id| id == child))
    }

    /// Unlinks and returns the child at `index`.
    pub fn remove_child(&mut self, parent: NodeId, index: usize) -> NodeId {
        let child = self
            .kind_mut(parent)
            .children_mut()
            .expect("node kind has no children")
            .remove(index);
        self.nodes[child.0 as usize].parent = None;
        child
    }

    /// Inserts `children` into `parent` starting at `index`.
    pub fn insert_children(&mut self, parent: NodeId, index: usize, children: &[NodeId]) {
        for (offset, &child) in children.iter().enumerate() {
            self.link(parent, child);
            self.kind_mut(parent)
                .children_mut()
                .expect("node kind has no children")
                .insert(index + offset, child);
        }
    }

    /// Appends `children` to `parent`.
    pub fn add_children(&mut self, parent: NodeId, children: &[NodeId]) {
        for &child in children {
            self.link(parent, child);
            self.kind_mut(parent)
                .children_mut()
                .expect("node kind has no children")
                .push(child);
        }
    }

    fn link(&mut self, parent: NodeId, child: NodeId) {
        let data = &mut self.nodes[child.0 as usize];
        debug_assert!(
            data.parent.is_none(),
            "node {child:?} is already linked under {:?}",
            data.parent
        );
        data.parent = Some(parent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sable_lexer::Point;

    fn arena() -> Arena {
        Arena::new(Arc::from("test.sable"))
    }

    fn loc(arena: &Arena) -> SourceLocation {
        SourceLocation::unknown(Arc::clone(arena.file()))
    }

    #[test]
    fn test_alloc_ids_are_monotonic() {
        let mut arena = arena();
        let l = loc(&arena);
        let a = arena.alloc(NodeKind::Debugger, l.clone());
        let b = arena.alloc(NodeKind::Debugger, l);
        assert!(a < b);
    }

    #[test]
    fn test_child_linking() {
        let mut arena = arena();
        let l = loc(&arena);
        let tmpl = arena.alloc(
            NodeKind::Template {
                name: "t".to_string(),
                content_kind: ContentKind::Html,
                children: vec![],
            },
            l.clone(),
        );
        let a = arena.alloc(NodeKind::Debugger, l.clone());
        let b = arena.alloc(NodeKind::Debugger, l);

        arena.add_children(tmpl, &[a, b]);
        assert_eq!(arena.children(tmpl), vec![a, b]);
        assert_eq!(arena.parent(a), Some(tmpl));
        assert_eq!(arena.child_index(tmpl, b), Some(1));

        let removed = arena.remove_child(tmpl, 0);
        assert_eq!(removed, a);
        assert_eq!(arena.parent(a), None);
        assert_eq!(arena.children(tmpl), vec![b]);

        arena.insert_children(tmpl, 0, &[a]);
        assert_eq!(arena.children(tmpl), vec![a, b]);
        assert_eq!(arena.parent(a), Some(tmpl));
    }

    #[test]
    fn test_clone_is_deep() {
        let mut arena = arena();
        let l = loc(&arena);
        let tmpl = arena.alloc(
            NodeKind::Template {
                name: "t".to_string(),
                content_kind: ContentKind::Html,
                children: vec![],
            },
            l.clone(),
        );
        let copy = arena.clone();

        let child = arena.alloc(NodeKind::Debugger, l);
        arena.add_children(tmpl, &[child]);

        assert_eq!(arena.children(tmpl).len(), 1);
        assert!(copy.children(tmpl).is_empty());
    }

    #[test]
    fn test_tag_name() {
        let mut arena = arena();
        let raw = RawText::contiguous(Arc::clone(arena.file()), Point::new(1, 2), "SCRIPT");
        let l = raw.location().clone();
        let name_node = arena.alloc(NodeKind::RawText(raw), l);
        let tag = TagName::new(name_node);
        assert_eq!(tag.static_name(&arena), Some("SCRIPT"));
        assert_eq!(tag.rcdata_tag(&arena), Some(RcDataTag::Script));
    }
}

//! Per-block parsing context.
//!
//! Tracks the scanner state plus the tag and attribute being built. A fresh
//! context is created for every block (template body, control-flow branch,
//! `{let}` content, ...) so that partially-built constructs can never leak
//! across block boundaries; whatever is still pending at the end of a block
//! is either promoted into the parent by the reparenting step or reported.
//!
//! Attribute completion is the subtle part. An attribute is finished when a
//! new attribute starts, when the tag ends, when a block that started in a
//! tag state ends, or when a quoted value sees its closing quote. Unquoted
//! values are delayed until a delimiter so that control flow can contribute
//! value parts, e.g. `href=/foo/{$slug}`.

use crate::edits::AstEdits;
use crate::error::RewriteErrorKind;
use crate::state::State;
use sable_ast::{Arena, NodeId, NodeKind, Quotes, TagName};
use sable_lexer::{ErrorReporter, Point, SourceLocation};
use std::sync::Arc;

/// Unwinds the current control-flow block after a fatal error. Caught at
/// the block-visit boundary; never escapes the pass.
pub(crate) struct AbortBlock;

pub(crate) type BlockResult<T> = Result<T, AbortBlock>;

pub(crate) struct ParsingContext {
    file: Arc<str>,
    block_name: String,
    starting_state: State,

    state: State,
    state_transition_point: Point,

    // the tag being built
    is_close_tag: bool,
    tag_start_point: Option<Point>,
    tag_start_node: Option<NodeId>,
    tag_name: Option<TagName>,
    /// Attributes and inline dynamic nodes of the current tag.
    direct_tag_children: Vec<NodeId>,

    // the attribute being built
    attribute_name: Option<NodeId>,
    equals_sign_point: Option<Point>,
    attribute_value: Option<NodeId>,
    /// Where the open quote of a quoted value started.
    quoted_value_start: Option<Point>,
    /// Accumulated parts of the value being built.
    attribute_value_children: Vec<NodeId>,
}

impl ParsingContext {
    pub(crate) fn new(
        file: Arc<str>,
        block_name: impl Into<String>,
        starting_state: State,
        start_point: Point,
    ) -> Self {
        Self {
            file,
            block_name: block_name.into(),
            starting_state,
            state: starting_state,
            state_transition_point: start_point,
            is_close_tag: false,
            tag_start_point: None,
            tag_start_node: None,
            tag_name: None,
            direct_tag_children: Vec::new(),
            attribute_name: None,
            equals_sign_point: None,
            attribute_value: None,
            quoted_value_start: None,
            attribute_value_children: Vec::new(),
        }
    }

    pub(crate) fn state(&self) -> State {
        self.state
    }

    pub(crate) fn state_transition_point(&self) -> Point {
        self.state_transition_point
    }

    /// Changes state, returning the previous one.
    pub(crate) fn set_state(&mut self, state: State, point: Point) -> State {
        tracing::trace!(
            block = %self.block_name,
            from = %self.state,
            to = %state,
            line = point.line,
            column = point.column,
            "state transition"
        );
        let old = self.state;
        self.state = state;
        self.state_transition_point = point;
        old
    }

    /// Called at the end of a block to finish any pending attribute.
    pub(crate) fn finish_block(
        &mut self,
        arena: &mut Arena,
        edits: &mut AstEdits,
        reporter: &mut ErrorReporter,
    ) -> BlockResult<()> {
        if self.starting_state.is_tag_state() {
            let point = self.state_transition_point;
            self.maybe_finish_pending_attribute(point, arena, edits, reporter)?;
        }
        Ok(())
    }

    // ========== Pending-state queries ==========

    pub(crate) fn has_unquoted_attribute_value_parts(&self) -> bool {
        self.quoted_value_start.is_none() && !self.attribute_value_children.is_empty()
    }

    pub(crate) fn has_quoted_attribute_value_parts(&self) -> bool {
        self.quoted_value_start.is_some()
    }

    pub(crate) fn has_tag_start(&self) -> bool {
        self.tag_start_node.is_some() && self.tag_start_point.is_some()
    }

    // ========== Tag building ==========

    /// Records the start of an html tag; `point` is the `<` character.
    ///
    /// Starting a tag is only legal for blocks that started in pcdata.
    pub(crate) fn start_tag(
        &mut self,
        tag_start_node: NodeId,
        is_close_tag: bool,
        point: Point,
        reporter: &mut ErrorReporter,
    ) -> BlockResult<()> {
        debug_assert!(self.tag_start_point.is_none());
        debug_assert!(self.tag_start_node.is_none());
        debug_assert!(self.direct_tag_children.is_empty());
        if self.starting_state != State::Pcdata {
            reporter.report(
                point.as_location(&self.file),
                RewriteErrorKind::BlockTransitionDisallowed {
                    block: self.block_name.clone(),
                    state: self.starting_state.to_string(),
                    construct: "tag",
                },
            );
            return Err(AbortBlock);
        }
        self.tag_start_point = Some(point);
        self.tag_start_node = Some(tag_start_node);
        self.is_close_tag = is_close_tag;
        Ok(())
    }

    /// The location of the current tag's `<`, for error reporting.
    pub(crate) fn tag_start_location(&self) -> SourceLocation {
        self.tag_start_point
            .expect("no tag in progress")
            .as_location(&self.file)
    }

    /// Sets the name of the tag being built.
    pub(crate) fn set_tag_name(&mut self, tag_name: TagName, arena: &Arena, edits: &mut AstEdits) {
        let end = tag_name.location(arena).end;
        edits.remove(arena, tag_name.node());
        self.tag_name = Some(tag_name);
        self.set_state(State::AfterTagNameOrAttribute, end);
    }

    /// Adds a node as a direct child of the tag being built.
    pub(crate) fn add_tag_child(
        &mut self,
        node: NodeId,
        arena: &mut Arena,
        edits: &mut AstEdits,
        reporter: &mut ErrorReporter,
    ) -> BlockResult<()> {
        let location = arena.location(node).clone();
        self.maybe_finish_pending_attribute(location.begin, arena, edits, reporter)?;
        self.direct_tag_children.push(node);
        edits.remove(arena, node);
        self.set_state(State::AfterTagNameOrAttribute, location.end);
        Ok(())
    }

    /// Creates the open- or close-tag node once `>` or `/>` is seen and
    /// returns the state to continue in (pcdata, or rcdata for special
    /// tags).
    pub(crate) fn create_tag(
        &mut self,
        tag_end_node: NodeId,
        self_closing: bool,
        end_point: Point,
        arena: &mut Arena,
        edits: &mut AstEdits,
        reporter: &mut ErrorReporter,
    ) -> BlockResult<State> {
        self.maybe_finish_pending_attribute(end_point, arena, edits, reporter)?;

        let tag_name = self.tag_name.take().expect("tag has no name");
        let location = SourceLocation::new(
            Arc::clone(&self.file),
            self.tag_start_point.expect("no tag in progress"),
            end_point,
        );

        let replacement = if self.is_close_tag {
            if let Some(&first) = self.direct_tag_children.first() {
                reporter.report(
                    arena.location(first).clone(),
                    RewriteErrorKind::UnexpectedCloseTagContent,
                );
            }
            if self_closing {
                reporter.report(
                    end_point.as_location(&self.file).offset_start_col(-1),
                    RewriteErrorKind::SelfClosingCloseTag,
                );
            }
            arena.alloc(NodeKind::HtmlCloseTag { tag_name, children: vec![] }, location)
        } else {
            arena.alloc(
                NodeKind::HtmlOpenTag { tag_name, self_closing, children: vec![] },
                location,
            )
        };

        // the tag name decides whether we enter an rcdata state
        let mut next_state = State::Pcdata;
        if !self_closing && !self.is_close_tag {
            if let Some(rcdata) = tag_name.rcdata_tag(arena) {
                next_state = State::rcdata(rcdata);
            }
        }

        edits.remove(arena, tag_end_node);
        edits.add_child(replacement, tag_name.node());
        edits.add_children(replacement, &self.direct_tag_children);
        let tag_start_node = self.tag_start_node.take().expect("no tag in progress");
        edits.replace(arena, tag_start_node, &[replacement]);

        self.direct_tag_children.clear();
        self.tag_start_point = None;
        self.check_empty("tag completion left state behind");
        Ok(next_state)
    }

    // ========== Attribute building ==========

    /// Starts an attribute from its name node.
    pub(crate) fn start_attribute(
        &mut self,
        attribute_name: NodeId,
        arena: &mut Arena,
        edits: &mut AstEdits,
        reporter: &mut ErrorReporter,
    ) -> BlockResult<()> {
        let location = arena.location(attribute_name).clone();
        self.maybe_finish_pending_attribute(location.begin, arena, edits, reporter)?;
        debug_assert!(self.attribute_name.is_none());
        if self.starting_state == State::BeforeAttributeValue {
            reporter.report(
                location,
                RewriteErrorKind::BlockTransitionDisallowed {
                    block: self.block_name.clone(),
                    state: self.starting_state.to_string(),
                    construct: "attribute",
                },
            );
            return Err(AbortBlock);
        }
        edits.remove(arena, attribute_name);
        self.attribute_name = Some(attribute_name);
        self.set_state(State::AfterAttributeName, location.end);
        Ok(())
    }

    pub(crate) fn set_equals_sign_location(
        &mut self,
        equals_point: Point,
        transition_point: Point,
        reporter: &mut ErrorReporter,
    ) -> BlockResult<()> {
        if self.attribute_name.is_none() {
            // the attribute name must have been in another block
            reporter.report(
                transition_point.as_location(&self.file),
                RewriteErrorKind::FoundEqWithAttributeInAnotherBlock,
            );
            return Err(AbortBlock);
        }
        debug_assert!(self.equals_sign_point.is_none());
        self.equals_sign_point = Some(equals_point);
        self.set_state(State::BeforeAttributeValue, transition_point);
        Ok(())
    }

    /// Installs a completed value for the attribute being built.
    pub(crate) fn set_attribute_value(
        &mut self,
        node: NodeId,
        arena: &Arena,
        edits: &mut AstEdits,
    ) {
        debug_assert!(self.attribute_value.is_none(), "attribute value already set");
        let end = arena.location(node).end;
        edits.remove(arena, node);
        self.attribute_value = Some(node);
        self.set_state(State::AfterTagNameOrAttribute, end);
    }

    /// Records the start of a quoted attribute value.
    pub(crate) fn start_quoted_attribute_value(
        &mut self,
        node: NodeId,
        point: Point,
        next_state: State,
        arena: &Arena,
        edits: &mut AstEdits,
    ) {
        debug_assert!(!self.has_quoted_attribute_value_parts());
        debug_assert!(!self.has_unquoted_attribute_value_parts());
        edits.remove(arena, node);
        self.quoted_value_start = Some(point);
        self.set_state(next_state, point);
    }

    /// Adds a part to the value being built and unlinks it from the tree.
    pub(crate) fn add_attribute_value_part(
        &mut self,
        node: NodeId,
        arena: &Arena,
        edits: &mut AstEdits,
    ) {
        self.attribute_value_children.push(node);
        edits.remove(arena, node);
    }

    /// Completes an unquoted attribute value at a delimiter.
    pub(crate) fn create_unquoted_attribute_value(
        &mut self,
        end_point: Point,
        arena: &mut Arena,
        edits: &mut AstEdits,
        reporter: &mut ErrorReporter,
    ) -> BlockResult<()> {
        if !self.has_unquoted_attribute_value_parts() {
            if self.attribute_name.is_some() {
                reporter.report(
                    end_point.as_location(&self.file),
                    RewriteErrorKind::ExpectedAttributeValue,
                );
            } else {
                reporter.report(
                    end_point.as_location(&self.file),
                    RewriteErrorKind::FoundEndOfAttributeStartedInAnotherBlock,
                );
                return Err(AbortBlock);
            }
            self.reset_attribute();
            self.set_state(State::AfterTagNameOrAttribute, end_point);
            return Ok(());
        }
        let location = self.location_of(&self.attribute_value_children, arena);
        let value = arena.alloc(
            NodeKind::HtmlAttributeValue { quotes: Quotes::None, children: vec![] },
            location,
        );
        let children = std::mem::take(&mut self.attribute_value_children);
        edits.add_children(value, &children);
        self.set_attribute_value(value, arena, edits);
        Ok(())
    }

    /// Completes a quoted attribute value at its closing quote.
    pub(crate) fn create_quoted_attribute_value(
        &mut self,
        end_node: NodeId,
        double_quoted: bool,
        end_point: Point,
        arena: &mut Arena,
        edits: &mut AstEdits,
    ) {
        let location = SourceLocation::new(
            Arc::clone(&self.file),
            self.quoted_value_start.take().expect("no quoted value in progress"),
            end_point,
        );
        let value = arena.alloc(
            NodeKind::HtmlAttributeValue {
                quotes: if double_quoted { Quotes::Double } else { Quotes::Single },
                children: vec![],
            },
            location,
        );
        edits.remove(arena, end_node);
        let children = std::mem::take(&mut self.attribute_value_children);
        edits.add_children(value, &children);
        self.set_attribute_value(value, arena, edits);
    }

    /// Finishes the attribute being built, if any.
    ///
    /// Quoted values must already be closed; pending quoted parts here mean
    /// the attribute crossed a block boundary.
    pub(crate) fn maybe_finish_pending_attribute(
        &mut self,
        current_point: Point,
        arena: &mut Arena,
        edits: &mut AstEdits,
        reporter: &mut ErrorReporter,
    ) -> BlockResult<()> {
        if self.has_unquoted_attribute_value_parts() {
            self.create_unquoted_attribute_value(current_point, arena, edits, reporter)?;
        } else if self.has_quoted_attribute_value_parts() {
            reporter.report(
                current_point.as_location(&self.file),
                RewriteErrorKind::FoundEndOfAttributeStartedInAnotherBlock,
            );
            return Err(AbortBlock);
        }
        if let Some(name) = self.attribute_name.take() {
            let mut location = arena.location(name).clone();
            let attribute = if let Some(value) = self.attribute_value.take() {
                let equals = self
                    .equals_sign_point
                    .take()
                    .expect("attribute has a value but no '='");
                location = location.extend(arena.location(value));
                let attribute = arena.alloc(
                    NodeKind::HtmlAttribute {
                        equals_location: Some(equals.as_location(&self.file)),
                        children: vec![],
                    },
                    location,
                );
                edits.add_child(attribute, name);
                edits.add_child(attribute, value);
                attribute
            } else {
                let attribute = arena.alloc(
                    NodeKind::HtmlAttribute { equals_location: None, children: vec![] },
                    location,
                );
                edits.add_child(attribute, name);
                attribute
            };
            self.equals_sign_point = None;
            // push directly rather than through add_tag_child, which would
            // recurse into this method and change the state
            self.direct_tag_children.push(attribute);
        }
        Ok(())
    }

    // ========== Reparenting at block boundaries ==========

    /// Hands accumulated attribute-value parts to the enclosing block node.
    pub(crate) fn reparent_attribute_value_children(
        &mut self,
        parent: NodeId,
        edits: &mut AstEdits,
    ) {
        let children = std::mem::take(&mut self.attribute_value_children);
        edits.add_children(parent, &children);
    }

    /// Hands the finished attribute/value and direct tag children to the
    /// enclosing block node.
    pub(crate) fn reparent_direct_tag_children(&mut self, parent: NodeId, edits: &mut AstEdits) {
        if let Some(value) = self.attribute_value.take() {
            edits.add_child(parent, value);
        }
        let children = std::mem::take(&mut self.direct_tag_children);
        edits.add_children(parent, &children);
    }

    // ========== Reset and validation ==========

    /// Clears all parsing state, for error recovery.
    pub(crate) fn reset(&mut self) {
        self.tag_start_point = None;
        self.tag_start_node = None;
        self.tag_name = None;
        self.direct_tag_children.clear();
        self.reset_attribute();
    }

    /// Clears only the attribute being built.
    pub(crate) fn reset_attribute(&mut self) {
        self.attribute_name = None;
        self.equals_sign_point = None;
        self.attribute_value = None;
        self.quoted_value_start = None;
        self.attribute_value_children.clear();
    }

    /// Panics unless every in-progress field has been consumed; violations
    /// are bugs in the pass, not user errors.
    pub(crate) fn check_empty(&self, message: &str) {
        let mut problems = Vec::new();
        if !self.direct_tag_children.is_empty() {
            problems.push(format!("direct_tag_children: {:?}", self.direct_tag_children));
        }
        if self.attribute_name.is_some() {
            problems.push(format!("attribute_name: {:?}", self.attribute_name));
        }
        if self.equals_sign_point.is_some() {
            problems.push(format!("equals_sign_point: {:?}", self.equals_sign_point));
        }
        if self.attribute_value.is_some() {
            problems.push(format!("attribute_value: {:?}", self.attribute_value));
        }
        if !self.attribute_value_children.is_empty() {
            problems.push(format!(
                "attribute_value_children: {:?}",
                self.attribute_value_children
            ));
        }
        if self.tag_start_point.is_some() {
            problems.push(format!("tag_start_point: {:?}", self.tag_start_point));
        }
        if self.tag_start_node.is_some() {
            problems.push(format!("tag_start_node: {:?}", self.tag_start_node));
        }
        if self.tag_name.is_some() {
            problems.push("tag_name is set".to_string());
        }
        if self.quoted_value_start.is_some() {
            problems.push(format!("quoted_value_start: {:?}", self.quoted_value_start));
        }
        if !problems.is_empty() {
            panic!("{message} in '{}': {}", self.block_name, problems.join(", "));
        }
    }

    fn location_of(&self, nodes: &[NodeId], arena: &Arena) -> SourceLocation {
        let mut location = arena.location(nodes[0]).clone();
        if let Some(&last) = nodes.last() {
            if nodes.len() > 1 {
                location = location.extend(arena.location(last));
            }
        }
        location
    }
}

//! The contextual HTML rewrite pass.
//!
//! Walks each template, scanning raw-text nodes character by character with
//! the state machine in [`State`], and records edits that replace the flat
//! text with structured open-tag, close-tag, attribute, and attribute-value
//! nodes. Scoped blocks and control-flow branches each parse in a fresh
//! [`ParsingContext`]; their ending states are reconciled so that HTML
//! parsing context stays unambiguous after the join.
//!
//! The scanner tracks two cursors into the current raw text: `index` moves
//! as characters are examined, `offset` trails behind and marks the start
//! of text that has not been turned into a node yet. `advance` moves the
//! index; `consume` catches the offset up, dropping the text in between
//! (or, via `consume_as_raw_text`, turning it into a node first). Handlers
//! must advance the index or change state on every step; the main loop
//! panics otherwise.

use crate::context::{AbortBlock, BlockResult, ParsingContext};
use crate::edits::AstEdits;
use crate::error::RewriteErrorKind;
use crate::state::State;
use sable_ast::{Arena, NodeId, NodeKind, RawText, RcDataTag, TagName};
use sable_lexer::{ErrorReporter, Point, SourceLocation};
use std::sync::Arc;

/// Rewrites templates and blocks of kind `html` or `attributes` to contain
/// structured HTML nodes.
pub struct HtmlRewriter {
    enabled: bool,
}

impl HtmlRewriter {
    /// The pass mutates the tree only when the `stricthtml` experimental
    /// feature is on; otherwise it runs against a clone for its diagnostics
    /// and discards the edits.
    pub fn new(experimental_features: &[String]) -> Self {
        Self {
            enabled: experimental_features.iter().any(|f| f == "stricthtml"),
        }
    }

    /// Runs the pass over every template in the file.
    pub fn run(&self, arena: &mut Arena, file: NodeId, reporter: &mut ErrorReporter) {
        if self.enabled {
            Visitor::new(arena, reporter).exec(file);
        } else {
            let mut copy = arena.clone();
            Visitor::new(&mut copy, reporter).exec(file);
        }
    }
}

struct Visitor<'a> {
    arena: &'a mut Arena,
    reporter: &'a mut ErrorReporter,
    edits: AstEdits,
    context: Option<ParsingContext>,

    // cursor into the raw-text node being scanned
    current_node: NodeId,
    raw: Option<RawText>,
    /// Start of not-yet-consumed text.
    offset: usize,
    /// Current scan position.
    index: usize,
}

impl<'a> Visitor<'a> {
    fn new(arena: &'a mut Arena, reporter: &'a mut ErrorReporter) -> Self {
        Self {
            arena,
            reporter,
            edits: AstEdits::new(),
            context: None,
            current_node: NodeId(0),
            raw: None,
            offset: 0,
            index: 0,
        }
    }

    fn exec(&mut self, file: NodeId) {
        for child in self.arena.children(file) {
            if matches!(self.arena.kind(child), NodeKind::Template { .. }) {
                self.visit_template(child);
            }
        }
    }

    fn visit_template(&mut self, node: NodeId) {
        self.edits.clear();
        self.context = None;

        let content_kind = match self.arena.kind(node) {
            NodeKind::Template { content_kind, .. } => Some(*content_kind),
            other => panic!("expected a template, found {}", other.name()),
        };
        tracing::debug!(template = ?node, "rewriting html");

        let checkpoint = self.reporter.checkpoint();
        self.visit_scoped_block(content_kind, node, "template");

        // only rewrite the template if it produced no new errors
        if !self.reporter.errors_since(checkpoint) {
            self.edits.apply(self.arena);
        }
    }

    // ========== Node dispatch ==========

    fn visit(&mut self, node: NodeId) -> BlockResult<()> {
        match self.arena.kind(node) {
            NodeKind::RawText(_) => self.visit_raw_text(node),

            NodeKind::If { children } => {
                let children = children.clone();
                self.visit_if(node, children)
            }
            NodeKind::Switch { children, .. } => {
                let children = children.clone();
                self.visit_switch(node, children)
            }
            NodeKind::Foreach { children, .. } => {
                let children = children.clone();
                self.visit_foreach(node, children)
            }
            NodeKind::For { .. } => self.visit_control_flow(
                node,
                &[node],
                "for loop",
                |_, _, _| "loop body".to_string(),
                false,
                false,
            ),

            NodeKind::LetValue { .. } | NodeKind::Debugger => self.process_non_printable(node),
            NodeKind::LetContent { content_kind, .. } => {
                let kind = *content_kind;
                self.visit_scoped_block(kind, node, "let");
                self.process_non_printable(node)
            }
            NodeKind::Log { .. } => self.visit_log(node),

            NodeKind::Call { .. } => self.visit_call(node),
            NodeKind::CallParamContent { content_kind, .. } => {
                let kind = *content_kind;
                self.visit_scoped_block(kind, node, "param");
                Ok(())
            }
            NodeKind::CallParamValue { .. } => Ok(()),

            // msg contents are handled by an earlier pass; the group itself
            // is a placeholder-producing printable
            NodeKind::MsgFallbackGroup { .. }
            | NodeKind::Print { .. }
            | NodeKind::Css { .. }
            | NodeKind::Xid { .. } => self.process_printable(node),

            // structured nodes from a previous run of this pass
            NodeKind::HtmlOpenTag { .. } => {
                self.visit_structured_open_tag(node);
                Ok(())
            }
            NodeKind::HtmlCloseTag { .. } => {
                let end = self.arena.location(node).end;
                let ctx = self.context.as_mut().expect("no parsing context");
                ctx.set_state(State::Pcdata, end);
                Ok(())
            }
            NodeKind::HtmlAttribute { .. } | NodeKind::HtmlAttributeValue { .. } => {
                self.visit_structured_attribute(node)
            }

            other => panic!("unexpected {} node during html rewriting", other.name()),
        }
    }

    fn visit_children(&mut self, node: NodeId) -> BlockResult<()> {
        for child in self.arena.children(node) {
            self.visit(child)?;
        }
        Ok(())
    }

    // ========== Control flow ==========

    fn visit_if(&mut self, node: NodeId, children: Vec<NodeId>) -> BlockResult<()> {
        let has_else = children
            .iter()
            .any(|&c| matches!(self.arena.kind(c), NodeKind::IfElse { .. }));
        self.visit_control_flow(
            node,
            &children,
            "if",
            |arena, child, index| match arena.kind(child) {
                NodeKind::IfCond { .. } if index == 0 => "if block".to_string(),
                NodeKind::IfCond { .. } => "elseif block".to_string(),
                _ => "else block".to_string(),
            },
            // exactly one branch runs when there is an else
            has_else,
            has_else,
        )
    }

    fn visit_switch(&mut self, node: NodeId, children: Vec<NodeId>) -> BlockResult<()> {
        let has_default = children
            .iter()
            .any(|&c| matches!(self.arena.kind(c), NodeKind::SwitchDefault { .. }));
        self.visit_control_flow(
            node,
            &children,
            "switch",
            |arena, child, _| match arena.kind(child) {
                NodeKind::SwitchCase { .. } => "case block".to_string(),
                _ => "default block".to_string(),
            },
            has_default,
            has_default,
        )
    }

    fn visit_foreach(&mut self, node: NodeId, children: Vec<NodeId>) -> BlockResult<()> {
        let has_ifempty = children
            .iter()
            .any(|&c| matches!(self.arena.kind(c), NodeKind::ForeachIfempty { .. }));
        self.visit_control_flow(
            node,
            &children,
            "foreach loop",
            |arena, child, _| match arena.kind(child) {
                NodeKind::ForeachIfempty { .. } => "ifempty block".to_string(),
                _ => "loop body".to_string(),
            },
            // the body may run many times; with an ifempty block at least
            // one branch runs
            false,
            has_ifempty,
        )
    }

    fn visit_log(&mut self, node: NodeId) -> BlockResult<()> {
        // no new context needed, there are no transitions out of `None`
        let location = self.arena.location(node).clone();
        let ctx = self.context.as_mut().expect("no parsing context");
        let old = ctx.set_state(State::None, location.begin);
        self.visit_children(node)?;
        let ctx = self.context.as_mut().expect("no parsing context");
        ctx.set_state(old, location.end);
        self.process_non_printable(node)
    }

    fn visit_call(&mut self, node: NodeId) -> BlockResult<()> {
        self.visit_children(node)?;
        self.process_printable(node)?;
        let state = self.context.as_ref().expect("no parsing context").state();
        if state == State::Pcdata {
            if let NodeKind::Call { is_pcdata, .. } = self.arena.kind_mut(node) {
                *is_pcdata = true;
            }
        }
        Ok(())
    }

    /// Visits a control-flow structure and computes the state to continue
    /// in after it.
    ///
    /// `exactly_one` says whether exactly one branch is guaranteed to run
    /// exactly once; `at_least_one` whether some branch is guaranteed to
    /// run.
    fn visit_control_flow(
        &mut self,
        parent: NodeId,
        children: &[NodeId],
        overall_name: &str,
        block_namer: impl Fn(&Arena, NodeId, usize) -> String,
        exactly_one: bool,
        at_least_one: bool,
    ) -> BlockResult<()> {
        // switches may legitimately have no cases at all
        if children.is_empty() {
            return Ok(());
        }
        let starting_state = self.context.as_ref().expect("no parsing context").state();
        let ending_state = self.visit_branches(children, &block_namer);
        let parent_location = self.arena.location(parent).clone();
        let end_point = parent_location.end;

        match starting_state {
            State::AfterTagNameOrAttribute
            | State::BeforeAttributeName
            | State::AfterAttributeName => {
                let ctx = self.context.as_mut().expect("no parsing context");
                ctx.add_tag_child(parent, self.arena, &mut self.edits, self.reporter)?;
                // the reconciliation may have computed a better state than
                // the add_tag_child default
                let ctx = self.context.as_mut().expect("no parsing context");
                ctx.set_state(ending_state, end_point);
            }
            State::HtmlTagName => {
                self.reporter.report(
                    parent_location,
                    RewriteErrorKind::InvalidLocationForControlFlow {
                        construct: overall_name.to_string(),
                        reason: "html tag names can only be constants or print nodes",
                    },
                );
                return Err(AbortBlock);
            }
            State::BeforeAttributeValue => {
                if !exactly_one {
                    self.reporter.report(
                        parent_location,
                        RewriteErrorKind::ConditionalBlockNotGuaranteedToProduceOneAttributeValue {
                            block: overall_name.to_string(),
                        },
                    );
                    // continue as if everything were fine
                }
                let ctx = self.context.as_mut().expect("no parsing context");
                if at_least_one && ending_state == State::UnquotedAttrValue {
                    // x={if $p}y{else}z{/if}w joins the surrounding value
                    ctx.add_attribute_value_part(parent, self.arena, &mut self.edits);
                    ctx.set_state(State::UnquotedAttrValue, end_point);
                } else {
                    ctx.set_attribute_value(parent, self.arena, &mut self.edits);
                    if at_least_one && ending_state == State::BeforeAttributeName {
                        ctx.set_state(State::BeforeAttributeName, end_point);
                    }
                }
            }
            State::UnquotedAttrValue
            | State::DoubleQuotedAttrValue
            | State::SingleQuotedAttrValue => {
                let ctx = self.context.as_mut().expect("no parsing context");
                ctx.add_attribute_value_part(parent, self.arena, &mut self.edits);
            }
            State::HtmlComment
            | State::None
            | State::Pcdata
            | State::RcdataScript
            | State::RcdataStyle
            | State::RcdataTextarea
            | State::RcdataTitle
            | State::XmlDeclaration
            | State::Cdata
            | State::DoubleQuotedXmlAttrValue
            | State::SingleQuotedXmlAttrValue => {}
        }
        Ok(())
    }

    /// Visits each branch in a fresh context and reconciles their ending
    /// states; any error makes the structure a no-op state-wise.
    fn visit_branches(
        &mut self,
        children: &[NodeId],
        block_namer: &impl Fn(&Arena, NodeId, usize) -> String,
    ) -> State {
        let checkpoint = self.reporter.checkpoint();
        let start_state = self.context.as_ref().expect("no parsing context").state();
        let mut ending_state = start_state;
        for (index, &block) in children.iter().enumerate() {
            let block_name = block_namer(self.arena, block, index);
            let begin = self.arena.location(block).begin;
            let new_context = ParsingContext::new(
                Arc::clone(self.arena.file()),
                block_name.clone(),
                start_state,
                begin,
            );
            let old_context = self.context.replace(new_context);
            ending_state = self.visit_block(start_state, block, &block_name, checkpoint);
            self.context = old_context;
        }

        if self.reporter.errors_since(checkpoint) {
            return start_state;
        }
        ending_state
    }

    /// Visits a block whose content is in an entirely separate scope.
    fn visit_scoped_block(
        &mut self,
        content_kind: Option<sable_ast::ContentKind>,
        parent: NodeId,
        name: &str,
    ) {
        let start_state = State::from_content_kind(content_kind);
        let checkpoint = self.reporter.checkpoint();
        let begin = self.arena.location(parent).begin;
        let new_context =
            ParsingContext::new(Arc::clone(self.arena.file()), name, start_state, begin);
        let old_context = self.context.replace(new_context);
        self.visit_block(start_state, parent, name, checkpoint);
        self.context = old_context;
    }

    /// Visits a block's children and returns its reconciled final state.
    fn visit_block(
        &mut self,
        start_state: State,
        node: NodeId,
        block_name: &str,
        checkpoint: sable_lexer::Checkpoint,
    ) -> State {
        let node_location = self.arena.location(node).clone();

        if self.visit_children(node).is_err() {
            // an error was reported and the block given up on; recover to a
            // reasonable state based on where it started
            let ctx = self.context.as_mut().expect("no parsing context");
            match start_state {
                State::AfterAttributeName
                | State::AfterTagNameOrAttribute
                | State::BeforeAttributeName
                | State::BeforeAttributeValue
                | State::SingleQuotedAttrValue
                | State::DoubleQuotedAttrValue
                | State::UnquotedAttrValue
                | State::HtmlTagName => {
                    ctx.reset_attribute();
                    ctx.set_state(State::BeforeAttributeName, node_location.end);
                }
                State::Cdata
                | State::DoubleQuotedXmlAttrValue
                | State::HtmlComment
                | State::None
                | State::Pcdata
                | State::RcdataScript
                | State::RcdataStyle
                | State::RcdataTextarea
                | State::RcdataTitle
                | State::SingleQuotedXmlAttrValue
                | State::XmlDeclaration => {
                    ctx.reset();
                    ctx.set_state(start_state, node_location.end);
                }
            }
        }

        let ctx = self.context.as_mut().expect("no parsing context");
        if ctx
            .finish_block(self.arena, &mut self.edits, self.reporter)
            .is_err()
        {
            ctx.reset_attribute();
        }
        let mut final_state = ctx.state();
        let transition_point = ctx.state_transition_point();

        if final_state.is_invalid_end_of_block() {
            self.reporter.report(
                node_location.clone(),
                RewriteErrorKind::BlockEndsInInvalidState {
                    block: block_name.to_string(),
                    state: final_state.to_string(),
                },
            );
            final_state = start_state;
        }

        if !self.reporter.errors_since(checkpoint) {
            match start_state.reconcile(final_state) {
                None => {
                    let hint = reconciliation_failure_hint(start_state, final_state);
                    self.reporter.report(
                        transition_point.as_location(self.arena.file()),
                        RewriteErrorKind::BlockChangesContext {
                            block: block_name.to_string(),
                            from: start_state.to_string(),
                            to: final_state.to_string(),
                            hint: hint.map(|h| format!(" {h}")).unwrap_or_default(),
                        },
                    );
                }
                Some(reconciled) => {
                    final_state = reconciled;
                    self.reparent_nodes(node, final_state);
                }
            }
        } else {
            // restore the start state to avoid an error explosion
            final_state = start_state;
        }

        let ctx = self.context.as_mut().expect("no parsing context");
        ctx.set_state(final_state, node_location.end);
        final_state
    }

    /// Promotes the block context's partial values into the parent block
    /// node.
    fn reparent_nodes(&mut self, parent: NodeId, final_state: State) {
        let end = self.arena.location(parent).end;
        let ctx = self.context.as_mut().expect("no parsing context");
        match final_state {
            State::AfterTagNameOrAttribute => {
                if ctx
                    .maybe_finish_pending_attribute(end, self.arena, &mut self.edits, self.reporter)
                    .is_err()
                {
                    ctx.reset();
                    return;
                }
                ctx.reparent_direct_tag_children(parent, &mut self.edits);
            }
            State::BeforeAttributeName | State::AfterAttributeName => {
                ctx.reparent_direct_tag_children(parent, &mut self.edits);
            }
            State::UnquotedAttrValue
            | State::DoubleQuotedAttrValue
            | State::SingleQuotedAttrValue => {
                ctx.reparent_attribute_value_children(parent, &mut self.edits);
            }
            _ => {}
        }
        ctx.check_empty("context not fully reparented");
    }

    // ========== Printable and non-printable nodes ==========

    /// Nodes that render nothing (`{let}`, `{debugger}`, `{log}`).
    fn process_non_printable(&mut self, node: NodeId) -> BlockResult<()> {
        let location = self.arena.location(node).clone();
        let state = self.context.as_ref().expect("no parsing context").state();
        match state {
            State::AfterTagNameOrAttribute
            | State::BeforeAttributeName
            | State::AfterAttributeName => {
                let ctx = self.context.as_mut().expect("no parsing context");
                ctx.add_tag_child(node, self.arena, &mut self.edits, self.reporter)?;
            }
            State::BeforeAttributeValue => {
                self.reporter.report(
                    location,
                    RewriteErrorKind::InvalidLocationForNonprintable {
                        reason: "move it before the start of the tag or after the tag name",
                    },
                );
            }
            State::HtmlTagName => {
                self.reporter.report(
                    location,
                    RewriteErrorKind::InvalidLocationForNonprintable {
                        reason: "it creates ambiguity with an unquoted attribute value",
                    },
                );
            }
            State::UnquotedAttrValue
            | State::DoubleQuotedAttrValue
            | State::SingleQuotedAttrValue => {
                let ctx = self.context.as_mut().expect("no parsing context");
                ctx.add_attribute_value_part(node, self.arena, &mut self.edits);
            }
            _ => {}
        }
        Ok(())
    }

    /// Nodes that render a value (`{print}`, `{css}`, `{xid}`, `{call}`).
    fn process_printable(&mut self, node: NodeId) -> BlockResult<()> {
        let location = self.arena.location(node).clone();
        let state = self.context.as_ref().expect("no parsing context").state();
        match state {
            State::AfterTagNameOrAttribute => {
                self.reporter
                    .report(location, RewriteErrorKind::ExpectedWsOrCloseAfterTagOrAttribute);
            }
            State::AfterAttributeName => {
                self.reporter
                    .report(location, RewriteErrorKind::ExpectedWsEqOrCloseAfterAttributeName);
            }
            State::BeforeAttributeName => {
                let ctx = self.context.as_mut().expect("no parsing context");
                ctx.start_attribute(node, self.arena, &mut self.edits, self.reporter)?;
            }
            State::HtmlTagName => {
                if matches!(self.arena.kind(node), NodeKind::Print { .. }) {
                    let ctx = self.context.as_mut().expect("no parsing context");
                    ctx.set_tag_name(TagName::new(node), self.arena, &mut self.edits);
                } else {
                    self.reporter.report(location, RewriteErrorKind::InvalidTagName);
                }
            }
            State::BeforeAttributeValue
            | State::DoubleQuotedAttrValue
            | State::SingleQuotedAttrValue
            | State::UnquotedAttrValue => {
                let ctx = self.context.as_mut().expect("no parsing context");
                if state == State::BeforeAttributeValue {
                    // no quote seen, so this becomes an unquoted value part
                    ctx.set_state(State::UnquotedAttrValue, location.begin);
                }
                ctx.add_attribute_value_part(node, self.arena, &mut self.edits);
            }
            _ => {}
        }
        Ok(())
    }

    // ========== Already-structured nodes (idempotent re-runs) ==========

    fn visit_structured_open_tag(&mut self, node: NodeId) {
        let (next_state, end) = match self.arena.kind(node) {
            NodeKind::HtmlOpenTag { tag_name, self_closing, .. } => {
                let next = if !*self_closing {
                    tag_name
                        .rcdata_tag(self.arena)
                        .map(State::rcdata)
                        .unwrap_or(State::Pcdata)
                } else {
                    State::Pcdata
                };
                (next, self.arena.location(node).end)
            }
            _ => unreachable!(),
        };
        let ctx = self.context.as_mut().expect("no parsing context");
        ctx.set_state(next_state, end);
    }

    fn visit_structured_attribute(&mut self, node: NodeId) -> BlockResult<()> {
        let state = self.context.as_ref().expect("no parsing context").state();
        if state.is_tag_state() {
            let ctx = self.context.as_mut().expect("no parsing context");
            ctx.add_tag_child(node, self.arena, &mut self.edits, self.reporter)?;
        }
        Ok(())
    }

    // ========== Raw text scanning ==========

    /// Scans one raw-text node, dispatching on the current state until all
    /// input is consumed.
    fn visit_raw_text(&mut self, node: NodeId) -> BlockResult<()> {
        self.current_node = node;
        self.raw = Some(self.arena.raw_text(node).clone());
        self.offset = 0;
        self.index = 0;

        let mut prev_start = usize::MAX;
        while self.index < self.text_len() {
            let start_index = self.index;
            // handle whitespace that was stripped before this character,
            // but only once per position: transitions that consume nothing
            // must not re-trigger it
            if start_index != prev_start && self.raw_ref().missing_whitespace_at(start_index) {
                let point = self.current_point();
                self.handle_joined_whitespace(point)?;
            }
            prev_start = start_index;

            let start_state = self.state();
            match start_state {
                State::None => {
                    // no rewriting, jump to the end
                    self.index = self.text_len();
                    self.offset = self.index;
                }
                State::Pcdata => self.handle_pcdata()?,
                State::DoubleQuotedAttrValue => self.handle_quoted_attribute_value(true)?,
                State::SingleQuotedAttrValue => self.handle_quoted_attribute_value(false)?,
                State::BeforeAttributeValue => self.handle_before_attribute_value(),
                State::AfterTagNameOrAttribute => self.handle_after_tag_name_or_attribute()?,
                State::BeforeAttributeName => self.handle_before_attribute_name()?,
                State::UnquotedAttrValue => self.handle_unquoted_attribute_value()?,
                State::AfterAttributeName => self.handle_after_attribute_name()?,
                State::HtmlTagName => self.handle_html_tag_name()?,
                State::RcdataScript => self.handle_rcdata(RcDataTag::Script),
                State::RcdataStyle => self.handle_rcdata(RcDataTag::Style),
                State::RcdataTitle => self.handle_rcdata(RcDataTag::Title),
                State::RcdataTextarea => self.handle_rcdata(RcDataTag::Textarea),
                State::Cdata => self.handle_cdata(),
                State::HtmlComment => self.handle_html_comment(),
                State::XmlDeclaration => self.handle_xml_declaration(),
                State::DoubleQuotedXmlAttrValue => self.handle_xml_attribute_quoted(true),
                State::SingleQuotedXmlAttrValue => self.handle_xml_attribute_quoted(false),
            }

            // every step must advance or change state, otherwise the loop
            // would spin forever
            if self.state() == start_state && start_index == self.index {
                panic!(
                    "failed to make progress in state '{start_state}' at {}",
                    self.current_location()
                );
            }
            assert!(
                self.offset <= self.index,
                "offset {} is greater than index {}",
                self.offset,
                self.index
            );
        }

        // states that only advance leave a suffix to re-emit; offset 0
        // means the whole node is untouched and stays in the tree
        if self.offset < self.index && self.offset != 0 {
            if let Some(suffix) = self.consume_as_raw_text() {
                self.edits.replace(self.arena, node, &[suffix]);
            }
        }

        // whitespace stripped after the last character
        if self.raw_ref().missing_whitespace_at(self.text_len()) {
            let end = self.raw_ref().location().end;
            self.handle_joined_whitespace(end)?;
        }

        self.raw = None;
        Ok(())
    }

    /// Handles a point where the outer parser stripped whitespace: the
    /// whitespace-sensitive states transition as if a space had been seen.
    fn handle_joined_whitespace(&mut self, point: Point) -> BlockResult<()> {
        match self.state() {
            State::UnquotedAttrValue => {
                let ctx = self.context.as_mut().expect("no parsing context");
                ctx.create_unquoted_attribute_value(
                    point,
                    self.arena,
                    &mut self.edits,
                    self.reporter,
                )?;
                let ctx = self.context.as_mut().expect("no parsing context");
                ctx.set_state(State::BeforeAttributeName, point);
            }
            State::AfterTagNameOrAttribute => {
                let ctx = self.context.as_mut().expect("no parsing context");
                ctx.set_state(State::BeforeAttributeName, point);
            }
            State::AfterAttributeName => {
                // at the end of the text, or before anything that cannot
                // continue the attribute, the attribute is over
                let next = self.current_char();
                if next.map_or(true, |c| !c.is_whitespace() && c != '=') {
                    let ctx = self.context.as_mut().expect("no parsing context");
                    ctx.set_state(State::BeforeAttributeName, point);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Scans rcdata for `</tagname`; everything up to it is plain text.
    fn handle_rcdata(&mut self, tag: RcDataTag) {
        let found_lt = self.advance_while(|c| c != '<');
        if found_lt {
            let close = format!("</{}", tag.as_str());
            if self.match_prefix_ignore_case(&close, false) {
                // don't advance: pcdata will parse the close tag itself
                let point = self.current_point();
                let ctx = self.context.as_mut().expect("no parsing context");
                ctx.set_state(State::Pcdata, point);
            } else {
                self.advance();
            }
        }
    }

    /// Scans for `]]>`.
    fn handle_cdata(&mut self) {
        let found = self.advance_while(|c| c != ']');
        if found {
            if self.match_prefix("]]>", true) {
                let point = self.current_point_or_end();
                let ctx = self.context.as_mut().expect("no parsing context");
                ctx.set_state(State::Pcdata, point);
            } else {
                self.advance();
            }
        }
    }

    /// Scans for `-->`.
    fn handle_html_comment(&mut self) {
        let found = self.advance_while(|c| c != '-');
        if found {
            if self.match_prefix("-->", true) {
                let point = self.current_point_or_end();
                let ctx = self.context.as_mut().expect("no parsing context");
                ctx.set_state(State::Pcdata, point);
            } else {
                self.advance();
            }
        }
    }

    /// Scans `<!doctype ...>`-style content for the end or a quoted value.
    fn handle_xml_declaration(&mut self) {
        let found = self.advance_while(|c| !matches!(c, '>' | '"' | '\''));
        if found {
            let c = self.current_char().expect("delimiter just found");
            let point = self.current_point();
            self.advance();
            let next = match c {
                '"' => State::DoubleQuotedXmlAttrValue,
                '\'' => State::SingleQuotedXmlAttrValue,
                _ => State::Pcdata,
            };
            let ctx = self.context.as_mut().expect("no parsing context");
            ctx.set_state(next, point);
        }
    }

    /// Scans an xml quoted value for its closing quote.
    fn handle_xml_attribute_quoted(&mut self, double_quoted: bool) {
        let quote = if double_quoted { '"' } else { '\'' };
        let found = self.advance_while(|c| c != quote);
        if found {
            self.advance();
            let point = self.current_point_or_end();
            let ctx = self.context.as_mut().expect("no parsing context");
            ctx.set_state(State::XmlDeclaration, point);
        }
    }

    /// Scans pcdata up to a `<`, then decides what the angle bracket
    /// starts: a comment, cdata, an xml declaration, or a tag.
    fn handle_pcdata(&mut self) -> BlockResult<()> {
        let found_lt = self.advance_while(|c| c != '<');
        if let Some(text) = self.consume_as_raw_text() {
            self.edits.replace(self.arena, self.current_node, &[text]);
        }
        if found_lt {
            let lt_point = self.current_point();
            if self.match_prefix("<!--", true) {
                let ctx = self.context.as_mut().expect("no parsing context");
                ctx.set_state(State::HtmlComment, lt_point);
            } else if self.match_prefix_ignore_case("<![cdata", true) {
                let ctx = self.context.as_mut().expect("no parsing context");
                ctx.set_state(State::Cdata, lt_point);
            } else if self.match_prefix("<!", true) || self.match_prefix("<?", true) {
                let ctx = self.context.as_mut().expect("no parsing context");
                ctx.set_state(State::XmlDeclaration, lt_point);
            } else {
                let is_close_tag = self.match_prefix("</", false);
                let point = self.current_point();
                let current_node = self.current_node;
                let ctx = self.context.as_mut().expect("no parsing context");
                ctx.start_tag(current_node, is_close_tag, point, self.reporter)?;
                self.advance(); // past the '<'
                if is_close_tag {
                    self.advance(); // past the '/'
                }
                self.consume();
                let ctx = self.context.as_mut().expect("no parsing context");
                ctx.set_state(State::HtmlTagName, lt_point);
            }
        }
        Ok(())
    }

    /// Reads the tag name right after `<` or `</`.
    fn handle_html_tag_name(&mut self) -> BlockResult<()> {
        // whitespace right after '<' means it wasn't a tag at all
        if self.consume_whitespace() {
            let location = self
                .context
                .as_ref()
                .expect("no parsing context")
                .tag_start_location();
            self.reporter.report(location, RewriteErrorKind::UnexpectedWsAfterLt);
            let point = self.current_point_or_end();
            let ctx = self.context.as_mut().expect("no parsing context");
            ctx.reset();
            ctx.set_state(State::Pcdata, point);
            return Ok(());
        }
        match self.consume_html_identifier() {
            Some(name) => {
                let ctx = self.context.as_mut().expect("no parsing context");
                ctx.set_tag_name(TagName::new(name), self.arena, &mut self.edits);
            }
            None => {
                // an error was reported; synthesize a name and keep going
                let point = self.current_point_or_end();
                let raw = RawText::contiguous(
                    Arc::clone(self.arena.file()),
                    point,
                    "$parse-error$",
                );
                let location = raw.location().clone();
                let name = self.arena.alloc(NodeKind::RawText(raw), location);
                let ctx = self.context.as_mut().expect("no parsing context");
                ctx.set_tag_name(TagName::new(name), self.arena, &mut self.edits);
            }
        }
        Ok(())
    }

    /// Right after a tag name or attribute: whitespace or the tag close.
    fn handle_after_tag_name_or_attribute(&mut self) -> BlockResult<()> {
        if self.consume_whitespace() {
            let point = self.current_point_or_end();
            let ctx = self.context.as_mut().expect("no parsing context");
            ctx.set_state(State::BeforeAttributeName, point);
            return Ok(());
        }
        if !self.try_create_tag_end()? {
            self.reporter.report(
                self.current_location(),
                RewriteErrorKind::ExpectedWsOrCloseAfterTagOrAttribute,
            );
            // don't consume; switch states and try to keep going
            let point = self.current_point();
            let ctx = self.context.as_mut().expect("no parsing context");
            ctx.set_state(State::BeforeAttributeName, point);
            self.advance();
        }
        Ok(())
    }

    /// In the middle of a tag, after whitespace: the tag close or an
    /// attribute name.
    fn handle_before_attribute_name(&mut self) -> BlockResult<()> {
        if self.try_create_tag_end()? {
            return Ok(());
        }
        if self.consume_whitespace() {
            // extra whitespace is fine here; kind="attributes" blocks start
            // in this state and raw text can be split oddly
            return Ok(());
        }
        match self.consume_html_identifier() {
            Some(name) => {
                let ctx = self.context.as_mut().expect("no parsing context");
                ctx.start_attribute(name, self.arena, &mut self.edits, self.reporter)?;
            }
            None => {
                // the error is already reported
                let ctx = self.context.as_mut().expect("no parsing context");
                ctx.reset_attribute();
            }
        }
        Ok(())
    }

    /// After an attribute name: an `=` introduces a value, anything else
    /// ends the attribute.
    fn handle_after_attribute_name(&mut self) -> BlockResult<()> {
        let ws = self.consume_whitespace();
        if self.current_char() == Some('=') {
            let equals_point = self.current_point();
            self.advance();
            self.consume();
            self.consume_whitespace();
            let transition = self.current_point_or_end();
            let ctx = self.context.as_mut().expect("no parsing context");
            ctx.set_equals_sign_location(equals_point, transition, self.reporter)?;
        } else {
            // any other character (or the end of the text) finishes the
            // attribute; creation happens when the next one starts
            let point = self.current_point_or_end();
            let next = if ws { State::BeforeAttributeName } else { State::AfterTagNameOrAttribute };
            let ctx = self.context.as_mut().expect("no parsing context");
            ctx.set_state(next, point);
        }
        Ok(())
    }

    /// Before an attribute value: a quote starts a quoted value, anything
    /// else an unquoted one.
    fn handle_before_attribute_value(&mut self) {
        // arbitrary whitespace may precede the value
        if self.consume_whitespace() {
            return;
        }
        let c = self.current_char().expect("loop guarantees input");
        if c == '\'' || c == '"' {
            let point = self.current_point();
            let next = if c == '"' {
                State::DoubleQuotedAttrValue
            } else {
                State::SingleQuotedAttrValue
            };
            let current_node = self.current_node;
            let ctx = self.context.as_mut().expect("no parsing context");
            ctx.start_quoted_attribute_value(current_node, point, next, self.arena, &mut self.edits);
            self.advance();
            self.consume();
        } else {
            let point = self.current_point();
            let ctx = self.context.as_mut().expect("no parsing context");
            ctx.set_state(State::UnquotedAttrValue, point);
        }
    }

    /// Consumes an unquoted attribute value up to whitespace or the tag
    /// close.
    fn handle_unquoted_attribute_value(&mut self) -> BlockResult<()> {
        let found_delimiter = self.advance_while(is_unquoted_value_char);
        if let Some(part) = self.consume_as_raw_text() {
            let ctx = self.context.as_mut().expect("no parsing context");
            ctx.add_attribute_value_part(part, self.arena, &mut self.edits);
        }
        if found_delimiter {
            let point = self.current_point();
            let ctx = self.context.as_mut().expect("no parsing context");
            ctx.create_unquoted_attribute_value(point, self.arena, &mut self.edits, self.reporter)?;
            let c = self.current_char().expect("delimiter just found");
            if !(c.is_whitespace() || c == '>') {
                self.reporter
                    .report(self.current_location(), RewriteErrorKind::IllegalHtmlAttributeCharacter);
                self.advance();
                self.consume();
            }
        }
        // otherwise keep going, to support values like a={$p}b
        Ok(())
    }

    /// Consumes a quoted attribute value up to the matching quote.
    fn handle_quoted_attribute_value(&mut self, double_quoted: bool) -> BlockResult<()> {
        let quote = if double_quoted { '"' } else { '\'' };
        let found_quote = self.advance_while(|c| c != quote);
        if let Some(part) = self.consume_as_raw_text() {
            let ctx = self.context.as_mut().expect("no parsing context");
            ctx.add_attribute_value_part(part, self.arena, &mut self.edits);
        }
        if found_quote {
            let has_open = self
                .context
                .as_ref()
                .expect("no parsing context")
                .has_quoted_attribute_value_parts();
            if has_open {
                let point = self.current_point();
                let current_node = self.current_node;
                let ctx = self.context.as_mut().expect("no parsing context");
                ctx.create_quoted_attribute_value(
                    current_node,
                    double_quoted,
                    point,
                    self.arena,
                    &mut self.edits,
                );
            } else {
                // the opening quote was in another block
                self.reporter.report(
                    self.current_location(),
                    RewriteErrorKind::FoundEndOfAttributeStartedInAnotherBlock,
                );
                return Err(AbortBlock);
            }
            self.advance();
            self.consume();
        }
        Ok(())
    }

    /// Finishes the current tag on `>` or `/>`; true if it did.
    fn try_create_tag_end(&mut self) -> BlockResult<bool> {
        if self.current_char() == Some('>') {
            self.finish_tag(false)?;
            self.advance();
            self.consume();
            return Ok(true);
        }
        if self.match_prefix("/>", false) {
            // position the index on the '>' so the tag's end location is
            // accurate
            self.advance();
            self.finish_tag(true)?;
            self.advance();
            self.consume();
            return Ok(true);
        }
        Ok(false)
    }

    fn finish_tag(&mut self, self_closing: bool) -> BlockResult<()> {
        let has_start = self
            .context
            .as_ref()
            .expect("no parsing context")
            .has_tag_start();
        if !has_start {
            self.reporter.report(
                self.current_location(),
                RewriteErrorKind::FoundEndTagStartedInAnotherBlock,
            );
            return Err(AbortBlock);
        }
        let point = self.current_point();
        let current_node = self.current_node;
        let ctx = self.context.as_mut().expect("no parsing context");
        let next = ctx.create_tag(
            current_node,
            self_closing,
            point,
            self.arena,
            &mut self.edits,
            self.reporter,
        )?;
        ctx.set_state(next, point);
        Ok(())
    }

    // ========== Cursor primitives ==========

    fn raw_ref(&self) -> &RawText {
        self.raw.as_ref().expect("not scanning a raw text node")
    }

    fn text_len(&self) -> usize {
        self.raw_ref().len()
    }

    fn state(&self) -> State {
        self.context.as_ref().expect("no parsing context").state()
    }

    /// The current character, or None at the end of the text.
    fn current_char(&self) -> Option<char> {
        self.raw_ref().text()[self.index..].chars().next()
    }

    /// The source point of the current character.
    fn current_point(&self) -> Point {
        self.raw_ref().point_at(self.index)
    }

    /// The current point, or the end of the node when all input is
    /// consumed.
    fn current_point_or_end(&self) -> Point {
        if self.index < self.text_len() {
            self.current_point()
        } else {
            self.raw_ref().location().end
        }
    }

    /// The location of the current character, for error reporting.
    fn current_location(&self) -> SourceLocation {
        if self.index < self.text_len() {
            self.raw_ref().location_at(self.index)
        } else {
            self.raw_ref().location().end_location()
        }
    }

    /// Advances past the current character.
    fn advance(&mut self) {
        let c = self.current_char().expect("advanced past the end");
        self.index += c.len_utf8();
    }

    /// Advances while the predicate matches; true if input remains.
    fn advance_while(&mut self, predicate: impl Fn(char) -> bool) -> bool {
        while let Some(c) = self.current_char() {
            if !predicate(c) {
                return true;
            }
            self.index += c.len_utf8();
        }
        false
    }

    /// Consumes the text between offset and index (dropping it).
    fn consume(&mut self) {
        self.offset = self.index;
    }

    /// True if the text at the index starts with `prefix`.
    fn match_prefix(&mut self, prefix: &str, advance: bool) -> bool {
        if self.raw_ref().text()[self.index..].starts_with(prefix) {
            if advance {
                self.index += prefix.len();
            }
            true
        } else {
            false
        }
    }

    /// Like [`match_prefix`] but ASCII-case-insensitive.
    ///
    /// [`match_prefix`]: Visitor::match_prefix
    fn match_prefix_ignore_case(&mut self, prefix: &str, advance: bool) -> bool {
        let rest = &self.raw_ref().text()[self.index..];
        if rest.len() < prefix.len() || !rest.is_char_boundary(prefix.len()) {
            return false;
        }
        if !rest[..prefix.len()].eq_ignore_ascii_case(prefix) {
            return false;
        }
        if advance {
            self.index += prefix.len();
        }
        true
    }

    /// Consumes `[offset, index)` as a raw-text node; None if empty. The
    /// original node is reused when the range covers all of it.
    fn consume_as_raw_text(&mut self) -> Option<NodeId> {
        if self.index == self.offset {
            return None;
        }
        self.edits.remove(self.arena, self.current_node);
        let node = if self.offset == 0 && self.index == self.text_len() {
            self.current_node
        } else {
            let sub = self.raw_ref().substring(self.offset, self.index);
            let location = sub.location().clone();
            self.arena.alloc(NodeKind::RawText(sub), location)
        };
        self.consume();
        Some(node)
    }

    /// Consumes any whitespace at the cursor; true if there was some.
    fn consume_whitespace(&mut self) -> bool {
        let start = self.index;
        self.advance_while(|c| c.is_whitespace());
        self.consume();
        self.edits.remove(self.arena, self.current_node);
        start != self.index
    }

    /// Consumes an html identifier and returns it as a raw-text node, or
    /// None (with an error reported) if the cursor sits on a delimiter.
    fn consume_html_identifier(&mut self) -> Option<NodeId> {
        let found_delimiter = self.advance_while(is_tag_identifier_char);
        let node = self.consume_as_raw_text();
        if node.is_some() {
            if found_delimiter {
                let c = self.current_char().expect("delimiter just found");
                if is_invalid_identifier_char(c) {
                    self.reporter.report(
                        self.current_location(),
                        RewriteErrorKind::InvalidIdentifier { character: c },
                    );
                    self.advance();
                    self.consume();
                }
            }
        } else {
            self.reporter.report(
                self.current_location(),
                RewriteErrorKind::GenericUnexpectedChar { expected: "an html identifier" },
            );
            self.advance();
            self.consume();
        }
        node
    }
}

/// Characters that may appear in a tag or attribute name, per the html
/// attribute parsing rules: everything except whitespace, `> = /`, the
/// invalid trio, and control characters.
fn is_tag_identifier_char(c: char) -> bool {
    !(c.is_whitespace()
        || matches!(c, '>' | '=' | '/')
        || is_invalid_identifier_char(c)
        || c.is_control())
}

/// Characters that are outright errors inside an identifier rather than
/// delimiters.
fn is_invalid_identifier_char(c: char) -> bool {
    matches!(c, '\0' | '\'' | '"')
}

/// Characters allowed in an unquoted attribute value.
fn is_unquoted_value_char(c: char) -> bool {
    !(c.is_whitespace() || matches!(c, '<' | '>' | '=' | '\'' | '"' | '`'))
}

/// Suggests a likely fix when two states cannot be reconciled.
fn reconciliation_failure_hint(start_state: State, final_state: State) -> Option<String> {
    match final_state {
        State::BeforeAttributeValue => {
            Some("Expected an attribute value before the end of the block".to_string())
        }
        State::Cdata => Some(forgot_to_close("CDATA section")),
        State::SingleQuotedAttrValue
        | State::DoubleQuotedAttrValue
        | State::SingleQuotedXmlAttrValue
        | State::DoubleQuotedXmlAttrValue => Some(forgot_to_close("attribute value")),
        State::HtmlComment => Some(forgot_to_close("html comment")),
        State::RcdataScript => Some(forgot_to_close("<script> block")),
        State::RcdataStyle => Some(forgot_to_close("<style> block")),
        State::RcdataTextarea => Some(forgot_to_close("<textarea> block")),
        State::RcdataTitle => Some(forgot_to_close("<title> block")),
        State::HtmlTagName
        | State::AfterAttributeName
        | State::AfterTagNameOrAttribute
        | State::BeforeAttributeName
        | State::XmlDeclaration
        | State::UnquotedAttrValue => {
            if start_state == State::Pcdata {
                Some("Did you forget to close the tag?".to_string())
            } else {
                None
            }
        }
        State::None | State::Pcdata => None,
    }
}

fn forgot_to_close(thing: &str) -> String {
    format!("Did you forget to close the {thing}?")
}

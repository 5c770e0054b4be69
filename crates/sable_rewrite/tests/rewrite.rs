//! End-to-end tests for the HTML rewrite pass over hand-assembled trees.
//!
//! The outer template-file parser is not part of this crate, so trees are
//! built directly through the arena the way that parser would build them.

use sable_ast::{
    Arena, ContentKind, Expr, ExprKind, NodeId, NodeKind, Quotes, RawText, RawTextBuilder,
};
use sable_lexer::{ErrorReporter, Point, SourceLocation};
use sable_rewrite::HtmlRewriter;
use std::sync::Arc;

const FILE: &str = "test.sable";

fn arena() -> Arena {
    Arena::new(Arc::from(FILE))
}

fn unknown(arena: &Arena) -> SourceLocation {
    SourceLocation::unknown(Arc::clone(arena.file()))
}

fn file_with_template(arena: &mut Arena, kind: ContentKind, children: &[NodeId]) -> NodeId {
    let location = unknown(arena);
    let template = arena.alloc(
        NodeKind::Template {
            name: "t".to_string(),
            content_kind: kind,
            children: vec![],
        },
        location.clone(),
    );
    arena.add_children(template, children);
    let file = arena.alloc(NodeKind::File { children: vec![] }, location);
    arena.add_children(file, &[template]);
    file
}

fn raw(arena: &mut Arena, begin: Point, text: &str) -> NodeId {
    let raw = RawText::contiguous(Arc::clone(arena.file()), begin, text);
    let location = raw.location().clone();
    arena.alloc(NodeKind::RawText(raw), location)
}

fn print_node(arena: &mut Arena, begin: Point, len: u32) -> NodeId {
    let location = SourceLocation::new(
        Arc::clone(arena.file()),
        begin,
        Point::new(begin.line, begin.column + len - 1),
    );
    let expr = Expr::new(
        ExprKind::Var { name: "x".to_string(), injected: false },
        location.clone(),
    );
    arena.alloc(NodeKind::Print { expr }, location)
}

fn dummy_expr(arena: &Arena) -> Expr {
    Expr::new(
        ExprKind::Var { name: "c".to_string(), injected: false },
        unknown(arena),
    )
}

fn if_node(arena: &mut Arena, branches: Vec<(Option<()>, Vec<NodeId>)>) -> NodeId {
    let location = unknown(arena);
    let mut children = Vec::new();
    for (cond, body) in branches {
        let expr = dummy_expr(arena);
        let branch = match cond {
            Some(()) => arena.alloc(
                NodeKind::IfCond { expr, children: vec![] },
                location.clone(),
            ),
            None => arena.alloc(NodeKind::IfElse { children: vec![] }, location.clone()),
        };
        arena.add_children(branch, &body);
        children.push(branch);
    }
    let node = arena.alloc(NodeKind::If { children: vec![] }, location);
    arena.add_children(node, &children);
    node
}

fn run_strict(arena: &mut Arena, file: NodeId) -> ErrorReporter {
    let mut reporter = ErrorReporter::new();
    let rewriter = HtmlRewriter::new(&["stricthtml".to_string()]);
    rewriter.run(arena, file, &mut reporter);
    reporter
}

fn error_codes(reporter: &ErrorReporter) -> Vec<&'static str> {
    reporter.diagnostics().iter().map(|d| d.code).collect()
}

/// Renders the tree shape for structural comparison.
fn shape(arena: &Arena, node: NodeId) -> String {
    let mut out = String::new();
    write_shape(arena, node, &mut out);
    out
}

fn write_shape(arena: &Arena, node: NodeId, out: &mut String) {
    match arena.kind(node) {
        NodeKind::RawText(raw) => {
            out.push_str(&format!("text({:?})", raw.text()));
            return;
        }
        NodeKind::HtmlOpenTag { self_closing, .. } => {
            out.push_str(if *self_closing { "open-tag/" } else { "open-tag" });
        }
        NodeKind::HtmlCloseTag { .. } => out.push_str("close-tag"),
        NodeKind::HtmlAttribute { equals_location, .. } => {
            out.push_str(if equals_location.is_some() { "attr=" } else { "attr" });
        }
        NodeKind::HtmlAttributeValue { quotes, .. } => {
            out.push_str(match quotes {
                Quotes::None => "value",
                Quotes::Single => "value'",
                Quotes::Double => "value\"",
            });
        }
        other => out.push_str(other.name()),
    }
    let children = arena.children(node);
    if !children.is_empty() {
        out.push('[');
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            write_shape(arena, *child, out);
        }
        out.push(']');
    }
}

fn template_of(arena: &Arena, file: NodeId) -> NodeId {
    arena.children(file)[0]
}

// ========== Basic Rewriting ==========

#[test]
fn test_minimal_tag_with_attribute() {
    let mut arena = arena();
    let body = raw(&mut arena, Point::new(1, 1), "<a href=\"x\">hi</a>");
    let file = file_with_template(&mut arena, ContentKind::Html, &[body]);

    let reporter = run_strict(&mut arena, file);
    assert!(!reporter.has_errors(), "{:?}", reporter.diagnostics());

    let template = template_of(&arena, file);
    assert_eq!(
        shape(&arena, template),
        "template[open-tag[text(\"a\"), attr=[text(\"href\"), value\"[text(\"x\")]]], \
         text(\"hi\"), close-tag[text(\"a\")]]"
    );
}

#[test]
fn test_self_closing_tag() {
    let mut arena = arena();
    let body = raw(&mut arena, Point::new(1, 1), "<br/>");
    let file = file_with_template(&mut arena, ContentKind::Html, &[body]);

    let reporter = run_strict(&mut arena, file);
    assert!(!reporter.has_errors());
    let template = template_of(&arena, file);
    assert_eq!(shape(&arena, template), "template[open-tag/[text(\"br\")]]");
}

#[test]
fn test_value_less_and_unquoted_attributes() {
    let mut arena = arena();
    let body = raw(&mut arena, Point::new(1, 1), "<input disabled value=3>");
    let file = file_with_template(&mut arena, ContentKind::Html, &[body]);

    let reporter = run_strict(&mut arena, file);
    assert!(!reporter.has_errors(), "{:?}", reporter.diagnostics());
    let template = template_of(&arena, file);
    assert_eq!(
        shape(&arena, template),
        "template[open-tag[text(\"input\"), attr[text(\"disabled\")], \
         attr=[text(\"value\"), value[text(\"3\")]]]]"
    );
}

#[test]
fn test_comments_and_doctype_stay_raw_text() {
    let mut arena = arena();
    let body = raw(
        &mut arena,
        Point::new(1, 1),
        "<!doctype html><!-- note --><b>x</b>",
    );
    let file = file_with_template(&mut arena, ContentKind::Html, &[body]);

    let reporter = run_strict(&mut arena, file);
    assert!(!reporter.has_errors(), "{:?}", reporter.diagnostics());
    let template = template_of(&arena, file);
    assert_eq!(
        shape(&arena, template),
        "template[text(\"<!doctype html>\"), text(\"<!-- note -->\"), open-tag[text(\"b\")], \
         text(\"x\"), close-tag[text(\"b\")]]"
    );
}

#[test]
fn test_rcdata_content_is_not_parsed() {
    let mut arena = arena();
    let body = raw(
        &mut arena,
        Point::new(1, 1),
        "<script>if (a < b) foo();</script>x",
    );
    let file = file_with_template(&mut arena, ContentKind::Html, &[body]);

    let reporter = run_strict(&mut arena, file);
    assert!(!reporter.has_errors(), "{:?}", reporter.diagnostics());
    let template = template_of(&arena, file);
    assert_eq!(
        shape(&arena, template),
        "template[open-tag[text(\"script\")], text(\"if (a < b) foo();\"), \
         close-tag[text(\"script\")], text(\"x\")]"
    );
}

#[test]
fn test_attributes_kind_template() {
    let mut arena = arena();
    let body = raw(&mut arena, Point::new(1, 1), "class=a id=\"b\"");
    let file = file_with_template(&mut arena, ContentKind::Attributes, &[body]);

    let reporter = run_strict(&mut arena, file);
    assert!(!reporter.has_errors(), "{:?}", reporter.diagnostics());
    let template = template_of(&arena, file);
    assert_eq!(
        shape(&arena, template),
        "template[attr=[text(\"class\"), value[text(\"a\")]], \
         attr=[text(\"id\"), value\"[text(\"b\")]]]"
    );
}

#[test]
fn test_text_kind_is_untouched() {
    let mut arena = arena();
    let body = raw(&mut arena, Point::new(1, 1), "<a href=x>not html</a>");
    let file = file_with_template(&mut arena, ContentKind::Text, &[body]);
    let before = shape(&arena, template_of(&arena, file));

    let reporter = run_strict(&mut arena, file);
    assert!(!reporter.has_errors());
    assert_eq!(shape(&arena, template_of(&arena, file)), before);
}

// ========== Dynamic Nodes In Tags ==========

#[test]
fn test_print_as_attribute() {
    let mut arena = arena();
    let open = raw(&mut arena, Point::new(1, 1), "<a ");
    let print = print_node(&mut arena, Point::new(1, 4), 4);
    let close = raw(&mut arena, Point::new(1, 8), ">");
    let file = file_with_template(&mut arena, ContentKind::Html, &[open, print, close]);

    let reporter = run_strict(&mut arena, file);
    assert!(!reporter.has_errors(), "{:?}", reporter.diagnostics());
    let template = template_of(&arena, file);
    assert_eq!(
        shape(&arena, template),
        "template[open-tag[text(\"a\"), attr[print]]]"
    );
}

#[test]
fn test_print_as_tag_name() {
    let mut arena = arena();
    let open = raw(&mut arena, Point::new(1, 1), "<");
    let print = print_node(&mut arena, Point::new(1, 2), 4);
    let close = raw(&mut arena, Point::new(1, 6), ">");
    let file = file_with_template(&mut arena, ContentKind::Html, &[open, print, close]);

    let reporter = run_strict(&mut arena, file);
    assert!(!reporter.has_errors(), "{:?}", reporter.diagnostics());
    let template = template_of(&arena, file);
    assert_eq!(shape(&arena, template), "template[open-tag[print]]");
}

#[test]
fn test_print_as_attribute_value_part() {
    let mut arena = arena();
    let open = raw(&mut arena, Point::new(1, 1), "<a href=/x/");
    let print = print_node(&mut arena, Point::new(1, 12), 4);
    let close = raw(&mut arena, Point::new(1, 16), ">");
    let file = file_with_template(&mut arena, ContentKind::Html, &[open, print, close]);

    let reporter = run_strict(&mut arena, file);
    assert!(!reporter.has_errors(), "{:?}", reporter.diagnostics());
    let template = template_of(&arena, file);
    assert_eq!(
        shape(&arena, template),
        "template[open-tag[text(\"a\"), attr=[text(\"href\"), value[text(\"/x/\"), print]]]]"
    );
}

// ========== Control Flow ==========

#[test]
fn test_conditional_quoted_attribute_value() {
    // <a href={if $c}"x"{else}"y"{/if}> reconciles and both branches feed
    // the single attribute value
    let mut arena = arena();
    let open = raw(&mut arena, Point::new(1, 1), "<a href=");
    let x = raw(&mut arena, Point::new(1, 16), "\"x\"");
    let y = raw(&mut arena, Point::new(1, 26), "\"y\"");
    let cond = if_node(&mut arena, vec![(Some(()), vec![x]), (None, vec![y])]);
    let close = raw(&mut arena, Point::new(1, 35), ">");
    let file = file_with_template(&mut arena, ContentKind::Html, &[open, cond, close]);

    let reporter = run_strict(&mut arena, file);
    assert!(!reporter.has_errors(), "{:?}", reporter.diagnostics());
    let template = template_of(&arena, file);
    assert_eq!(
        shape(&arena, template),
        "template[open-tag[text(\"a\"), attr=[text(\"href\"), \
         if[if block[value\"[text(\"x\")]], else block[value\"[text(\"y\")]]]]]]"
    );
}

#[test]
fn test_conditional_whole_tags_in_branches() {
    // tags opened and closed within the same branch are fine
    let mut arena = arena();
    let b = raw(&mut arena, Point::new(1, 10), "<b>x</b>");
    let i = raw(&mut arena, Point::new(1, 30), "<i>y</i>");
    let cond = if_node(&mut arena, vec![(Some(()), vec![b]), (None, vec![i])]);
    let file = file_with_template(&mut arena, ContentKind::Html, &[cond]);

    let reporter = run_strict(&mut arena, file);
    assert!(!reporter.has_errors(), "{:?}", reporter.diagnostics());
    let template = template_of(&arena, file);
    assert_eq!(
        shape(&arena, template),
        "template[if[if block[open-tag[text(\"b\")], text(\"x\"), close-tag[text(\"b\")]], \
         else block[open-tag[text(\"i\")], text(\"y\"), close-tag[text(\"i\")]]]]"
    );
}

#[test]
fn test_conditional_attributes_reconcile_to_tag_state() {
    // <div {if $c}a=1{else}b=2{/if}> puts the finished attributes into the
    // branches and continues the tag after the if
    let mut arena = arena();
    let open = raw(&mut arena, Point::new(1, 1), "<div ");
    let a = raw(&mut arena, Point::new(1, 14), "a=1");
    let b = raw(&mut arena, Point::new(1, 24), "b=2");
    let cond = if_node(&mut arena, vec![(Some(()), vec![a]), (None, vec![b])]);
    let close = raw(&mut arena, Point::new(1, 33), ">");
    let file = file_with_template(&mut arena, ContentKind::Html, &[open, cond, close]);

    let reporter = run_strict(&mut arena, file);
    assert!(!reporter.has_errors(), "{:?}", reporter.diagnostics());
    let template = template_of(&arena, file);
    assert_eq!(
        shape(&arena, template),
        "template[open-tag[text(\"div\"), \
         if[if block[attr=[text(\"a\"), value[text(\"1\")]]], \
         else block[attr=[text(\"b\"), value[text(\"2\")]]]]]]"
    );
}

#[test]
fn test_block_changes_context_when_tag_spans_blocks() {
    // a tag begun inside a branch but not closed there cannot reconcile
    // with the surrounding pcdata
    let mut arena = arena();
    let partial = raw(&mut arena, Point::new(1, 10), "<a");
    let cond = if_node(&mut arena, vec![(Some(()), vec![partial])]);
    let rest = raw(&mut arena, Point::new(1, 20), ">");
    let file = file_with_template(&mut arena, ContentKind::Html, &[cond, rest]);

    let reporter = run_strict(&mut arena, file);
    assert_eq!(error_codes(&reporter), vec!["BLOCK_CHANGES_CONTEXT"]);
    let diagnostic = &reporter.diagnostics()[0];
    assert!(
        diagnostic.message.contains("Did you forget to close the tag?"),
        "{}",
        diagnostic.message
    );
}

#[test]
fn test_end_tag_started_in_another_block() {
    // the '>' inside the branch tries to finish a tag that was started
    // outside it
    let mut arena = arena();
    let open = raw(&mut arena, Point::new(1, 1), "<a ");
    let branch = raw(&mut arena, Point::new(1, 20), "b=1>");
    let cond = if_node(&mut arena, vec![(Some(()), vec![branch])]);
    let file = file_with_template(&mut arena, ContentKind::Html, &[open, cond]);

    let reporter = run_strict(&mut arena, file);
    assert_eq!(error_codes(&reporter), vec!["FOUND_END_TAG_STARTED_IN_ANOTHER_BLOCK"]);
    // the error points at the '>'
    assert_eq!(reporter.diagnostics()[0].location.begin, Point::new(1, 23));
}

#[test]
fn test_end_of_quoted_attribute_started_in_another_block() {
    let mut arena = arena();
    let open = raw(&mut arena, Point::new(1, 1), "<a href=\"x");
    let quote = raw(&mut arena, Point::new(2, 1), "y\">");
    let cond = if_node(&mut arena, vec![(Some(()), vec![quote])]);
    let file = file_with_template(&mut arena, ContentKind::Html, &[open, cond]);

    let reporter = run_strict(&mut arena, file);
    assert!(
        error_codes(&reporter).contains(&"FOUND_END_OF_ATTRIBUTE_STARTED_IN_ANOTHER_BLOCK"),
        "{:?}",
        reporter.diagnostics()
    );
}

#[test]
fn test_block_ends_in_invalid_state() {
    // an attributes block may not end right after '='
    let mut arena = arena();
    let body = raw(&mut arena, Point::new(1, 1), "x=");
    let file = file_with_template(&mut arena, ContentKind::Attributes, &[body]);

    let reporter = run_strict(&mut arena, file);
    assert_eq!(error_codes(&reporter), vec!["BLOCK_ENDS_IN_INVALID_STATE"]);
}

#[test]
fn test_block_transition_disallowed() {
    // a branch that starts inside an xml declaration may not produce a tag
    let mut arena = arena();
    let decl = raw(&mut arena, Point::new(1, 1), "<!doctype ");
    let branch = raw(&mut arena, Point::new(1, 20), "html><a");
    let cond = if_node(&mut arena, vec![(Some(()), vec![branch])]);
    let file = file_with_template(&mut arena, ContentKind::Html, &[decl, cond]);

    let reporter = run_strict(&mut arena, file);
    assert!(
        error_codes(&reporter).contains(&"BLOCK_TRANSITION_DISALLOWED"),
        "{:?}",
        reporter.diagnostics()
    );
}

#[test]
fn test_conditional_unquoted_value_not_guaranteed_once() {
    // a foreach in attribute-value position is not guaranteed to produce
    // exactly one value
    let mut arena = arena();
    let open = raw(&mut arena, Point::new(1, 1), "<a x=");
    let location = unknown(&arena);
    let body = raw(&mut arena, Point::new(1, 15), "y");
    let nonempty = arena.alloc(NodeKind::ForeachNonempty { children: vec![] }, location.clone());
    arena.add_children(nonempty, &[body]);
    let expr = dummy_expr(&arena);
    let foreach = arena.alloc(
        NodeKind::Foreach { var: "v".to_string(), expr, children: vec![] },
        location,
    );
    arena.add_children(foreach, &[nonempty]);
    let close = raw(&mut arena, Point::new(1, 30), ">");
    let file = file_with_template(&mut arena, ContentKind::Html, &[open, foreach, close]);

    let reporter = run_strict(&mut arena, file);
    assert_eq!(
        error_codes(&reporter),
        vec!["CONDITIONAL_BLOCK_ISNT_GUARANTEED_TO_PRODUCE_ONE_ATTRIBUTE_VALUE"]
    );
}

#[test]
fn test_nonprintable_rejected_in_attribute_value_position() {
    let mut arena = arena();
    let open = raw(&mut arena, Point::new(1, 1), "<a href=");
    let location = unknown(&arena);
    let expr = dummy_expr(&arena);
    let let_node = arena.alloc(NodeKind::LetValue { var: "x".to_string(), expr }, location);
    let close = raw(&mut arena, Point::new(1, 20), ">");
    let file = file_with_template(&mut arena, ContentKind::Html, &[open, let_node, close]);

    let reporter = run_strict(&mut arena, file);
    assert!(
        error_codes(&reporter).contains(&"INVALID_LOCATION_FOR_NONPRINTABLE"),
        "{:?}",
        reporter.diagnostics()
    );
}

// ========== Scanner Errors ==========

#[test]
fn test_whitespace_after_lt() {
    let mut arena = arena();
    let body = raw(&mut arena, Point::new(1, 1), "a < b");
    let file = file_with_template(&mut arena, ContentKind::Html, &[body]);

    let reporter = run_strict(&mut arena, file);
    assert_eq!(error_codes(&reporter), vec!["UNEXPECTED_WS_AFTER_LT"]);
}

#[test]
fn test_invalid_identifier_character() {
    let mut arena = arena();
    let body = raw(&mut arena, Point::new(1, 1), "<a b'c>");
    let file = file_with_template(&mut arena, ContentKind::Html, &[body]);

    let reporter = run_strict(&mut arena, file);
    assert!(
        error_codes(&reporter).contains(&"INVALID_IDENTIFIER"),
        "{:?}",
        reporter.diagnostics()
    );
}

#[test]
fn test_illegal_unquoted_attribute_character() {
    let mut arena = arena();
    let body = raw(&mut arena, Point::new(1, 1), "<a x=y`z>");
    let file = file_with_template(&mut arena, ContentKind::Html, &[body]);

    let reporter = run_strict(&mut arena, file);
    assert!(
        error_codes(&reporter).contains(&"ILLEGAL_HTML_ATTRIBUTE_CHARACTER"),
        "{:?}",
        reporter.diagnostics()
    );
}

#[test]
fn test_self_closing_close_tag() {
    let mut arena = arena();
    let body = raw(&mut arena, Point::new(1, 1), "<a></a/>");
    let file = file_with_template(&mut arena, ContentKind::Html, &[body]);

    let reporter = run_strict(&mut arena, file);
    assert!(
        error_codes(&reporter).contains(&"SELF_CLOSING_CLOSE_TAG"),
        "{:?}",
        reporter.diagnostics()
    );
}

#[test]
fn test_close_tag_with_attributes() {
    let mut arena = arena();
    let body = raw(&mut arena, Point::new(1, 1), "</a b=c>");
    let file = file_with_template(&mut arena, ContentKind::Html, &[body]);

    let reporter = run_strict(&mut arena, file);
    assert!(
        error_codes(&reporter).contains(&"UNEXPECTED_CLOSE_TAG_CONTENT"),
        "{:?}",
        reporter.diagnostics()
    );
}

// ========== Whitespace Joining ==========

#[test]
fn test_joined_whitespace_ends_unquoted_value() {
    // "<div a=b" with the trailing newline whitespace stripped; the join
    // finishes the unquoted value so the next node starts a fresh attribute
    let mut arena = arena();
    let mut builder = RawTextBuilder::new(Arc::from(FILE), Point::new(1, 1));
    builder.push_text("<div a=b");
    builder.mark_joined(Point::new(2, 1));
    let joined = builder.build();
    let location = joined.location().clone();
    let first = arena.alloc(NodeKind::RawText(joined), location);
    let rest = raw(&mut arena, Point::new(2, 1), "c=d>");
    let file = file_with_template(&mut arena, ContentKind::Html, &[first, rest]);

    let reporter = run_strict(&mut arena, file);
    assert!(!reporter.has_errors(), "{:?}", reporter.diagnostics());
    let template = template_of(&arena, file);
    assert_eq!(
        shape(&arena, template),
        "template[open-tag[text(\"div\"), attr=[text(\"a\"), value[text(\"b\")]], \
         attr=[text(\"c\"), value[text(\"d\")]]]]"
    );
}

// ========== Determinism, Idempotence, Dry Runs ==========

#[test]
fn test_determinism() {
    let build = || {
        let mut arena = arena();
        let body = raw(&mut arena, Point::new(1, 1), "<a href=\"x\">hi</a><br/>");
        let file = file_with_template(&mut arena, ContentKind::Html, &[body]);
        (arena, file)
    };
    let (mut first, file_a) = build();
    let (mut second, file_b) = build();
    run_strict(&mut first, file_a);
    run_strict(&mut second, file_b);
    assert_eq!(
        shape(&first, template_of(&first, file_a)),
        shape(&second, template_of(&second, file_b))
    );
}

#[test]
fn test_idempotence() {
    let mut arena = arena();
    let body = raw(
        &mut arena,
        Point::new(1, 1),
        "<a href=\"x\">hi</a><script>y()</script>",
    );
    let file = file_with_template(&mut arena, ContentKind::Html, &[body]);

    let reporter = run_strict(&mut arena, file);
    assert!(!reporter.has_errors(), "{:?}", reporter.diagnostics());
    let after_first = shape(&arena, template_of(&arena, file));
    let nodes_after_first = arena.len();

    let reporter = run_strict(&mut arena, file);
    assert!(!reporter.has_errors(), "{:?}", reporter.diagnostics());
    assert_eq!(shape(&arena, template_of(&arena, file)), after_first);
    assert_eq!(arena.len(), nodes_after_first, "second run allocated nodes");
}

#[test]
fn test_idempotence_attributes_kind() {
    let mut arena = arena();
    let body = raw(&mut arena, Point::new(1, 1), "class=a id=\"b\"");
    let file = file_with_template(&mut arena, ContentKind::Attributes, &[body]);

    run_strict(&mut arena, file);
    let after_first = shape(&arena, template_of(&arena, file));
    let reporter = run_strict(&mut arena, file);
    assert!(!reporter.has_errors(), "{:?}", reporter.diagnostics());
    assert_eq!(shape(&arena, template_of(&arena, file)), after_first);
}

#[test]
fn test_dry_run_reports_but_does_not_mutate() {
    let mut arena = arena();
    let good = raw(&mut arena, Point::new(1, 1), "<a>x</a>");
    let file = file_with_template(&mut arena, ContentKind::Html, &[good]);
    let before = shape(&arena, template_of(&arena, file));

    let mut reporter = ErrorReporter::new();
    HtmlRewriter::new(&[]).run(&mut arena, file, &mut reporter);
    assert!(!reporter.has_errors());
    assert_eq!(shape(&arena, template_of(&arena, file)), before, "dry run must not edit");

    // diagnostics still flow in dry-run mode
    let mut arena = self::arena();
    let bad = raw(&mut arena, Point::new(1, 1), "a < b");
    let file = file_with_template(&mut arena, ContentKind::Html, &[bad]);
    let mut reporter = ErrorReporter::new();
    HtmlRewriter::new(&[]).run(&mut arena, file, &mut reporter);
    assert_eq!(error_codes(&reporter), vec!["UNEXPECTED_WS_AFTER_LT"]);
}

#[test]
fn test_errors_discard_edits() {
    // the template with an error keeps its original structure
    let mut arena = arena();
    let body = raw(&mut arena, Point::new(1, 1), "<a x=y`z>ok");
    let file = file_with_template(&mut arena, ContentKind::Html, &[body]);
    let before = shape(&arena, template_of(&arena, file));

    let reporter = run_strict(&mut arena, file);
    assert!(reporter.has_errors());
    assert_eq!(shape(&arena, template_of(&arena, file)), before);
}

//! End-to-end scenarios exercising the expression parser and the HTML
//! rewrite pipeline together.

use sable_ast::{Arena, ContentKind, ExprKind, NodeId, NodeKind, OpKind, Quotes, RawText};
use sable_driver::{parse_expression, ErrorReporter, PassRunner, RewriteOptions};
use sable_lexer::{Point, SourceLocation};
use std::sync::Arc;

const FILE: &str = "scenarios.sable";

fn base_location() -> SourceLocation {
    SourceLocation::new(Arc::from(FILE), Point::new(1, 1), Point::new(1, 80))
}

fn html_template(body_text: &str) -> (Arena, NodeId) {
    let mut arena = Arena::new(Arc::from(FILE));
    let raw = RawText::contiguous(Arc::clone(arena.file()), Point::new(1, 1), body_text);
    let raw_location = raw.location().clone();
    let body = arena.alloc(NodeKind::RawText(raw), raw_location);
    let location = SourceLocation::unknown(Arc::clone(arena.file()));
    let template = arena.alloc(
        NodeKind::Template {
            name: "t".to_string(),
            content_kind: ContentKind::Html,
            children: vec![],
        },
        location.clone(),
    );
    arena.add_children(template, &[body]);
    let file = arena.alloc(NodeKind::File { children: vec![] }, location);
    arena.add_children(file, &[template]);
    (arena, file)
}

fn rewrite(arena: &mut Arena, file: NodeId) -> ErrorReporter {
    let mut reporter = ErrorReporter::new();
    let runner = PassRunner::new(&RewriteOptions::default().with_strict_html());
    runner.run(arena, file, &mut reporter);
    reporter
}

#[test]
fn scenario_expression_with_access_chain_and_call() {
    let mut reporter = ErrorReporter::new();
    let expr = parse_expression("$aaa[0].bbb + round(3.14)", &base_location(), &mut reporter);
    assert!(!reporter.has_errors());

    // Plus(FieldAccess(ItemAccess(VarRef(aaa), 0), bbb), FunctionCall(round, [3.14]))
    let ExprKind::Op { op: OpKind::Plus, operands } = &expr.kind else {
        panic!("expected plus at the root, found {:?}", expr.kind);
    };
    let ExprKind::FieldAccess { base, field, .. } = &operands[0].kind else {
        panic!("expected field access, found {:?}", operands[0].kind);
    };
    assert_eq!(field, "bbb");
    assert!(matches!(&base.kind, ExprKind::ItemAccess { .. }));
    let ExprKind::FunctionCall { name, args } = &operands[1].kind else {
        panic!("expected function call, found {:?}", operands[1].kind);
    };
    assert_eq!(name.name, "round");
    assert_eq!(args[0].kind, ExprKind::Float(3.14));
}

#[test]
fn scenario_proto_init() {
    let mut reporter = ErrorReporter::new();
    let expr = parse_expression("my.Pb(a: 1, b: $x)", &base_location(), &mut reporter);
    assert!(!reporter.has_errors());
    let ExprKind::ProtoInit { name, fields } = &expr.kind else {
        panic!("expected proto init, found {:?}", expr.kind);
    };
    assert_eq!(name.name, "my.Pb");
    assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["a", "b"]);

    let mut reporter = ErrorReporter::new();
    parse_expression("my.Pb(a: 1, a: 2)", &base_location(), &mut reporter);
    assert_eq!(reporter.diagnostics()[0].code, "DUPLICATE_PARAM_NAME");
}

#[test]
fn scenario_map_vs_list() {
    let mut reporter = ErrorReporter::new();
    assert_eq!(
        parse_expression("[:]", &base_location(), &mut reporter).kind,
        ExprKind::Map(vec![])
    );
    assert_eq!(
        parse_expression("[]", &base_location(), &mut reporter).kind,
        ExprKind::List(vec![])
    );
    let expr = parse_expression("['k': 1,]", &base_location(), &mut reporter);
    assert!(!reporter.has_errors());
    let ExprKind::Map(entries) = &expr.kind else {
        panic!("expected map, found {:?}", expr.kind);
    };
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0.kind, ExprKind::Str("k".to_string()));
    assert_eq!(entries[0].1.kind, ExprKind::Int(1));
}

#[test]
fn scenario_minimal_html() {
    let (mut arena, file) = html_template("<a href=\"x\">hi</a>");
    let reporter = rewrite(&mut arena, file);
    assert!(!reporter.has_errors(), "{:?}", reporter.diagnostics());

    let template = arena.children(file)[0];
    let children = arena.children(template);
    assert_eq!(children.len(), 3);

    // open tag with one attribute whose double-quoted value is "x"
    let NodeKind::HtmlOpenTag { tag_name, self_closing, children: tag_children } =
        arena.kind(children[0])
    else {
        panic!("expected an open tag");
    };
    assert!(!self_closing);
    assert_eq!(tag_name.static_name(&arena), Some("a"));
    let attribute = tag_children[1];
    let NodeKind::HtmlAttribute { equals_location, children: attr_children } =
        arena.kind(attribute)
    else {
        panic!("expected an attribute");
    };
    assert!(equals_location.is_some());
    assert_eq!(arena.raw_text(attr_children[0]).text(), "href");
    let NodeKind::HtmlAttributeValue { quotes, children: value_children } =
        arena.kind(attr_children[1])
    else {
        panic!("expected an attribute value");
    };
    assert_eq!(*quotes, Quotes::Double);
    assert_eq!(arena.raw_text(value_children[0]).text(), "x");

    assert_eq!(arena.raw_text(children[1]).text(), "hi");
    assert!(matches!(arena.kind(children[2]), NodeKind::HtmlCloseTag { .. }));
}

#[test]
fn scenario_conditional_attribute_value() {
    // <a href={if $c}"x"{else}"y"{/if}> parses without error and both
    // branches contribute the attribute value
    let mut arena = Arena::new(Arc::from(FILE));
    let file_name = Arc::clone(arena.file());
    let unknown = SourceLocation::unknown(Arc::clone(&file_name));

    let open_raw = RawText::contiguous(Arc::clone(&file_name), Point::new(1, 1), "<a href=");
    let open_location = open_raw.location().clone();
    let open = arena.alloc(NodeKind::RawText(open_raw), open_location);

    let x_raw = RawText::contiguous(Arc::clone(&file_name), Point::new(1, 16), "\"x\"");
    let x_location = x_raw.location().clone();
    let x = arena.alloc(NodeKind::RawText(x_raw), x_location);
    let y_raw = RawText::contiguous(Arc::clone(&file_name), Point::new(1, 26), "\"y\"");
    let y_location = y_raw.location().clone();
    let y = arena.alloc(NodeKind::RawText(y_raw), y_location);

    let cond_expr = sable_ast::Expr::new(
        ExprKind::Var { name: "c".to_string(), injected: false },
        unknown.clone(),
    );
    let if_cond = arena.alloc(NodeKind::IfCond { expr: cond_expr, children: vec![] }, unknown.clone());
    arena.add_children(if_cond, &[x]);
    let if_else = arena.alloc(NodeKind::IfElse { children: vec![] }, unknown.clone());
    arena.add_children(if_else, &[y]);
    let if_node = arena.alloc(NodeKind::If { children: vec![] }, unknown.clone());
    arena.add_children(if_node, &[if_cond, if_else]);

    let close_raw = RawText::contiguous(Arc::clone(&file_name), Point::new(1, 35), ">");
    let close_location = close_raw.location().clone();
    let close = arena.alloc(NodeKind::RawText(close_raw), close_location);

    let template = arena.alloc(
        NodeKind::Template {
            name: "t".to_string(),
            content_kind: ContentKind::Html,
            children: vec![],
        },
        unknown.clone(),
    );
    arena.add_children(template, &[open, if_node, close]);
    let file = arena.alloc(NodeKind::File { children: vec![] }, unknown);
    arena.add_children(file, &[template]);

    let reporter = rewrite(&mut arena, file);
    assert!(!reporter.has_errors(), "{:?}", reporter.diagnostics());

    // the if is the attribute's value; each branch holds a quoted value
    let template_children = arena.children(template);
    let tag_children = arena.children(template_children[0]);
    let attribute = tag_children[1];
    let attr_children = arena.children(attribute);
    assert_eq!(attr_children.len(), 2);
    assert_eq!(attr_children[1], if_node);
    for branch in arena.children(if_node) {
        let parts = arena.children(branch);
        assert_eq!(parts.len(), 1, "each branch carries its value");
        assert!(matches!(
            arena.kind(parts[0]),
            NodeKind::HtmlAttributeValue { quotes: Quotes::Double, .. }
        ));
    }
}

#[test]
fn scenario_tag_crossing_block_reports_context_change() {
    // a tag begun in a branch and finished outside it is an error
    let mut arena = Arena::new(Arc::from(FILE));
    let file_name = Arc::clone(arena.file());
    let unknown = SourceLocation::unknown(Arc::clone(&file_name));

    let partial_raw = RawText::contiguous(Arc::clone(&file_name), Point::new(1, 9), "<a");
    let partial_location = partial_raw.location().clone();
    let partial = arena.alloc(NodeKind::RawText(partial_raw), partial_location);
    let cond_expr = sable_ast::Expr::new(
        ExprKind::Var { name: "c".to_string(), injected: false },
        unknown.clone(),
    );
    let if_cond = arena.alloc(NodeKind::IfCond { expr: cond_expr, children: vec![] }, unknown.clone());
    arena.add_children(if_cond, &[partial]);
    let if_node = arena.alloc(NodeKind::If { children: vec![] }, unknown.clone());
    arena.add_children(if_node, &[if_cond]);

    let gt_raw = RawText::contiguous(Arc::clone(&file_name), Point::new(1, 17), ">");
    let gt_location = gt_raw.location().clone();
    let gt = arena.alloc(NodeKind::RawText(gt_raw), gt_location);

    let template = arena.alloc(
        NodeKind::Template {
            name: "t".to_string(),
            content_kind: ContentKind::Html,
            children: vec![],
        },
        unknown.clone(),
    );
    arena.add_children(template, &[if_node, gt]);
    let file = arena.alloc(NodeKind::File { children: vec![] }, unknown);
    arena.add_children(file, &[template]);

    let reporter = rewrite(&mut arena, file);
    let codes: Vec<_> = reporter.diagnostics().iter().map(|d| d.code).collect();
    assert_eq!(codes, vec!["BLOCK_CHANGES_CONTEXT"]);
}

#[test]
fn scenario_round_trip() {
    let mut reporter = ErrorReporter::new();
    let source = "$aaa[0].bbb + round(3.14)";
    let first = parse_expression(source, &base_location(), &mut reporter);
    let second = parse_expression(&first.to_source_string(), &base_location(), &mut reporter);
    assert!(!reporter.has_errors());
    assert_eq!(first, second);
}

use indoc::indoc;

use super::{MapMetadata, collect_map_usage};
use crate::ast::Ast;
use crate::parser::parse;

fn usage(source: &str) -> (Ast, MapMetadata) {
    let (ast, diagnostics) = parse(source).unwrap();
    assert!(diagnostics.is_empty());
    let meta = collect_map_usage(&ast);
    (ast, meta)
}

fn texts(ast_source: &str, ast: &Ast, ids: &std::collections::HashSet<crate::ast::NodeId>) -> Vec<String> {
    let mut out: Vec<_> = ids
        .iter()
        .map(|id| ast_source[std::ops::Range::<usize>::from(ast.range(*id))].to_string())
        .collect();
    out.sort();
    out
}

#[test]
fn consistent_usage_is_clean() {
    let (ast, meta) = usage("BEGIN { @a = 1; @b[1] = 2; $x = @a + @b[2]; print(@b); }");
    assert!(!meta.has_errors());
    let a = ast.interner().lookup("@a").unwrap();
    let b = ast.interner().lookup("@b").unwrap();
    assert_eq!(meta.is_scalar(a), Some(true));
    assert_eq!(meta.is_scalar(b), Some(false));
}

#[test]
fn keyed_access_on_scalar_map() {
    let source = "BEGIN { @a = 1; @a[1] = 2; }";
    let (ast, meta) = usage(source);
    assert_eq!(texts(source, &ast, &meta.bad_scalar_access), vec!["@a[1]"]);
    assert!(meta.bad_indexed_access.is_empty());
}

#[test]
fn bare_use_of_keyed_map() {
    let source = "BEGIN { @a[1] = 1; $x = @a; }";
    let (ast, meta) = usage(source);
    assert_eq!(texts(source, &ast, &meta.bad_indexed_access), vec!["@a"]);
}

#[test]
fn iterating_scalar_map() {
    let source = indoc! {r#"
    BEGIN { @a = 1; for ($kv : @a) { } }
    "#};
    let (ast, meta) = usage(source);
    assert_eq!(texts(source, &ast, &meta.bad_iterator), vec!["@a"]);
}

#[test]
fn neutral_positions_do_not_decide() {
    let (ast, meta) = usage("BEGIN { clear(@a); $s = sizeof(@a); @a[1] = 1; }");
    assert!(!meta.has_errors());
    let a = ast.interner().lookup("@a").unwrap();
    assert_eq!(meta.is_scalar(a), Some(false));

    let (ast, meta) = usage("BEGIN { print(@c); }");
    let c = ast.interner().lookup("@c").unwrap();
    assert_eq!(meta.is_scalar(c), None);
}

//! Test helpers for resolution tests.

use tracelet_core::Colors;

use crate::ast::{Ast, NodeKind, dump};
use crate::diagnostics::Diagnostics;
use crate::env::Env;
use crate::parser::parse;
use crate::resolve::{ResolveOutput, resolve_types};

/// Parse and resolve with a caller-provided environment.
pub fn resolve_with(source: &str, env: &mut Env) -> (Ast, ResolveOutput, Diagnostics) {
    let (mut ast, parse_diagnostics) = parse(source).unwrap();
    assert!(
        !parse_diagnostics.has_errors(),
        "{}",
        parse_diagnostics.render(source)
    );
    crate::register_structs(&ast, env);
    let (output, diagnostics) = resolve_types(&mut ast, env).unwrap();
    (ast, output, diagnostics)
}

pub fn resolve(source: &str) -> (Ast, ResolveOutput, Diagnostics) {
    resolve_with(source, &mut Env::default())
}

/// One `severity: message` line per diagnostic.
pub fn messages(diagnostics: &Diagnostics) -> String {
    diagnostics
        .iter()
        .map(|d| format!("{}: {}", d.severity(), d.message()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Diagnostics of resolving `source`, asserting it resolves without panicking.
pub fn resolve_messages(source: &str) -> String {
    let (_, _, diagnostics) = resolve(source);
    messages(&diagnostics)
}

/// Typed AST dump of a script that must resolve cleanly.
pub fn typed_dump(source: &str) -> String {
    let (ast, _, diagnostics) = resolve(source);
    assert!(!diagnostics.has_errors(), "{}", messages(&diagnostics));
    dump(&ast, true, Colors::OFF)
}

/// Resolved type of the last typed `name` variable node, rendered.
///
/// Nodes left behind by rewrites are never typed, so they are skipped.
pub fn variable_type(ast: &Ast, name: &str) -> String {
    ast.ids()
        .filter(|id| matches!(ast.kind(*id), NodeKind::Variable(sym) if ast.name(*sym) == name))
        .filter(|id| !ast.ty(*id).is_none())
        .last()
        .map(|id| ast.ty(id).to_string())
        .unwrap_or_default()
}

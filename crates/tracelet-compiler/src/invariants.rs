//! Invariant checks excluded from coverage reports.

#![cfg_attr(coverage_nightly, coverage(off))]

use crate::ast::NodeId;

/// Variables are declared in the innermost scope on first sight, so a
/// lookup after the variable node was visited cannot fail.
#[inline]
pub(crate) fn ensure_variable_scope(scope: Option<NodeId>, name: &str) -> NodeId {
    match scope {
        Some(scope) => scope,
        None => panic!("resolve: no scope found for variable {name} (variable node not visited yet)"),
    }
}

/// Every traversal starts at a probe or subprogram, which opens a scope.
#[inline]
pub(crate) fn ensure_open_scope(scope: Option<&NodeId>) -> NodeId {
    match scope {
        Some(scope) => *scope,
        None => panic!("resolve: scope stack is empty (statement outside probe or subprogram)"),
    }
}

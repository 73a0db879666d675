//! Type resolution by propagation over a type graph.
//!
//! Each round folds literals, builds a fresh [`TypeGraph`] from the AST,
//! propagates seeded types to a fixpoint and then lets the transformer
//! rewrite nodes whose shape depends on resolved types. Rounds repeat while
//! rewrites happen or compile-time expressions remain, carrying forward the
//! types observed by introspection so later rounds cannot contradict them.

mod applicator;
mod builder;
mod builtins;
mod compat;
mod graph;
mod ops;
mod scheduler;
mod tables;
mod transformer;
mod transforms;

#[cfg(test)]
mod resolve_tests;

use indexmap::IndexMap;
use tracelet_core::Symbol;
use tracing::{debug, debug_span};

use crate::ast::{Ast, MapTypes, NodeId};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::env::Env;
use crate::fold::fold;
use crate::map_usage::collect_map_usage;
use crate::{Error, PassResult};

pub use compat::is_valid_assignment;
pub use graph::{GraphNode, LockedNodes, ResolvedTypes, ScopedVar, TypeGraph};
pub use transforms::EdgeKind;

/// What a successful resolution leaves besides the typed AST.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveOutput {
    pub rounds: u32,
    pub map_types: IndexMap<Symbol, MapTypes>,
}

/// Resolve every expression type of `ast` in place.
///
/// Diagnostics of the last round are returned; types are only written to
/// the AST when that round has no errors.
pub fn resolve_types(ast: &mut Ast, env: &Env) -> PassResult<ResolveOutput> {
    let mut locked = LockedNodes::new();
    let mut previous_comptimes: Option<Vec<NodeId>> = None;
    let mut rounds = 0;

    loop {
        if rounds >= env.config.max_rounds {
            return Err(Error::RoundLimitExceeded { rounds });
        }
        rounds += 1;
        let _span = debug_span!("round", round = rounds).entered();

        fold(ast);
        let meta = collect_map_usage(ast);
        let mut graph = TypeGraph::new(ast, env, &meta, &locked);
        graph.build();
        let seeded = graph.queue.len();
        let steps = graph.propagate();
        graph.check_declared_assignments();
        debug!(
            nodes = ast.len(),
            edges = graph.edge_count(),
            seeded,
            steps,
            resolved = graph.resolved().len(),
            "graph resolved"
        );

        let output = ResolveOutput {
            rounds,
            map_types: IndexMap::new(),
        };
        if graph.diagnostics().has_errors() {
            let (_, diagnostics) = graph.into_parts();
            return Ok((output, diagnostics));
        }

        let comptimes = graph.unresolved_comptimes().to_vec();
        let variable_nodes = graph.build.variable_nodes.clone();
        let observed = graph.locked_nodes();
        let (resolved, mut diagnostics) = graph.into_parts();
        locked.extend(observed);

        let (changed, transform_diagnostics) = transformer::transform(ast, env, &resolved);
        diagnostics.extend(transform_diagnostics);
        if diagnostics.has_errors() {
            return Ok((output, diagnostics));
        }

        if !changed && comptimes.is_empty() {
            report_unresolved(ast, &resolved, &variable_nodes, &mut diagnostics);
            if diagnostics.has_errors() {
                return Ok((output, diagnostics));
            }
            applicator::apply_types(ast, &resolved);
            debug!(rounds, maps = ast.map_types().len(), "types applied");
            let output = ResolveOutput {
                rounds,
                map_types: ast.map_types().clone(),
            };
            return Ok((output, diagnostics));
        }

        if !changed && previous_comptimes.as_ref() == Some(&comptimes) {
            for comptime in comptimes {
                diagnostics
                    .report(DiagnosticKind::UnresolvedComptime, ast.range(comptime))
                    .emit();
            }
            return Ok((output, diagnostics));
        }
        debug!(changed, comptimes = comptimes.len(), "another round needed");
        previous_comptimes = Some(comptimes);
    }
}

fn report_unresolved(
    ast: &Ast,
    resolved: &ResolvedTypes,
    variable_nodes: &[NodeId],
    diagnostics: &mut Diagnostics,
) {
    for id in variable_nodes {
        let ty = resolved.get(&GraphNode::Node(*id));
        if ty.is_none_or(|ty| ty.is_none()) {
            diagnostics
                .report(DiagnosticKind::UnresolvedVariable, ast.range(*id))
                .emit();
        }
    }
}

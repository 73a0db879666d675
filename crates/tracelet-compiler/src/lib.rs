//! Tracelet compiler front end: parser and type resolver.
//!
//! - `parser` - lexer and recursive-descent parser producing the [`ast::Ast`]
//! - `fold` - literal folding, run at the start of every resolution round
//! - `map_usage` - scalar vs keyed map classification
//! - `resolve` - type-graph resolution (builder, scheduler, transformer)
//! - `env` - struct registry, type provider, enums and macros
//! - `diagnostics` - error reporting

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod ast;
pub mod config;
pub mod diagnostics;
pub mod env;
pub mod fold;
pub mod map_usage;
pub mod parser;
pub mod resolve;

mod invariants;

#[cfg(test)]
pub mod test_utils;

use ast::visitor::{Visitor, walk_node};
use ast::{Ast, NodeId, NodeKind};
use indexmap::IndexMap;
use tracelet_core::SizedType;

/// Result type for passes that produce both output and diagnostics.
///
/// Each pass returns its typed output alongside any diagnostics it collected.
/// Fatal errors (like recursion fuel exhaustion) use the outer `Result`.
pub type PassResult<T> = std::result::Result<(T, Diagnostics), Error>;

pub use config::Config;
pub use diagnostics::{DiagnosticKind, Diagnostics, DiagnosticsPrinter, Severity};
pub use env::Env;
pub use resolve::{ResolveOutput, resolve_types};

/// Errors that stop compilation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("parsing failed with {} errors", .0.error_count())]
    ParseFailed(Diagnostics),

    #[error("type resolution failed with {} errors", .0.error_count())]
    ResolveFailed(Diagnostics),

    /// Recursion fuel exhausted (input nested too deeply).
    #[error("recursion limit exceeded")]
    RecursionLimitExceeded,

    /// Resolution kept rewriting the tree without converging.
    #[error("type resolution did not converge after {rounds} rounds")]
    RoundLimitExceeded { rounds: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;

/// A parsed and fully typed script.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub ast: Ast,
    pub resolve: ResolveOutput,
}

impl Analysis {
    /// Resolved type of each scratch variable, in order of first mention.
    ///
    /// Variables with the same name in different probes share an entry; the
    /// last typed occurrence wins.
    pub fn variable_types(&self) -> IndexMap<String, SizedType> {
        let mut collector = VariableTypes::default();
        collector.visit_root(&self.ast);
        collector.types
    }
}

#[derive(Default)]
struct VariableTypes {
    types: IndexMap<String, SizedType>,
}

impl Visitor for VariableTypes {
    fn visit_node(&mut self, ast: &Ast, id: NodeId) {
        if let NodeKind::Variable(name) = ast.kind(id)
            && !ast::is_synthetic_var(ast.name(*name))
        {
            let ty = ast.ty(id);
            let entry = self.types.entry(ast.name(*name).to_string()).or_default();
            if !ty.is_none() {
                *entry = ty.clone();
            }
        }
        walk_node(self, ast, id);
    }
}

/// Parse `source`, register its struct definitions in `env` and resolve
/// all types. Warnings are returned alongside the analysis.
pub fn analyze(source: &str, env: &mut Env) -> PassResult<Analysis> {
    let (mut ast, parse_diagnostics) = parser::parse(source)?;
    if parse_diagnostics.has_errors() {
        return Err(Error::ParseFailed(parse_diagnostics));
    }
    register_structs(&ast, env);

    let (resolve, diagnostics) = resolve_types(&mut ast, env)?;
    if diagnostics.has_errors() {
        return Err(Error::ResolveFailed(diagnostics));
    }
    let mut warnings = parse_diagnostics;
    warnings.extend(diagnostics);
    Ok((Analysis { ast, resolve }, warnings))
}

fn register_structs(ast: &Ast, env: &mut Env) {
    let NodeKind::Program { items } = ast.kind(ast.root()) else {
        return;
    };
    for item in items {
        if let NodeKind::StructDef { name, fields } = ast.kind(*item) {
            env.structs.define(name, fields.clone());
        }
    }
}

//! Scalar vs keyed map classification.
//!
//! The first decisive use of a map fixes whether it is scalar (`@m = 1`) or
//! keyed (`@m[k] = 1`). Conflicting later uses are recorded by node id so the
//! resolver can report them at the offending site.

use std::collections::{HashMap, HashSet};

use crate::ast::visitor::{Visitor, walk_node};
use crate::ast::{Ast, Iterable, NodeId, NodeKind};
use tracelet_core::Symbol;

/// Calls whose bare map arguments say nothing about the map's keys.
const MAP_NEUTRAL_CALLS: &[&str] = &["print", "clear", "zero", "len", "delete", "has_key"];

#[derive(Debug, Clone, Default)]
pub struct MapMetadata {
    scalar: HashMap<Symbol, bool>,
    /// `MapAccess` nodes on a map first used without a key.
    pub bad_scalar_access: HashSet<NodeId>,
    /// Bare `Map` nodes of a map first used with a key.
    pub bad_indexed_access: HashSet<NodeId>,
    /// `Map` iterables of `for` loops over scalar maps.
    pub bad_iterator: HashSet<NodeId>,
}

impl MapMetadata {
    /// `None` when the map is only ever used in neutral positions.
    pub fn is_scalar(&self, map: Symbol) -> Option<bool> {
        self.scalar.get(&map).copied()
    }

    pub fn has_errors(&self) -> bool {
        !(self.bad_scalar_access.is_empty()
            && self.bad_indexed_access.is_empty()
            && self.bad_iterator.is_empty())
    }
}

#[cfg(test)]
#[path = "map_usage_tests.rs"]
mod tests;

pub fn collect_map_usage(ast: &Ast) -> MapMetadata {
    let mut pass = MapUsagePass {
        meta: MapMetadata::default(),
        iterators: Vec::new(),
        introspection: 0,
    };
    pass.visit_root(ast);

    let MapUsagePass {
        mut meta,
        iterators,
        ..
    } = pass;
    for (node, map) in iterators {
        if meta.is_scalar(map) == Some(true) {
            meta.bad_iterator.insert(node);
        }
    }
    meta
}

struct MapUsagePass {
    meta: MapMetadata,
    iterators: Vec<(NodeId, Symbol)>,
    introspection: u32,
}

impl MapUsagePass {
    fn use_keyed(&mut self, map: Symbol, access: NodeId) {
        if *self.meta.scalar.entry(map).or_insert(false) {
            self.meta.bad_scalar_access.insert(access);
        }
    }

    fn use_scalar(&mut self, map: Symbol, node: NodeId) {
        if self.introspection > 0 {
            return;
        }
        if !*self.meta.scalar.entry(map).or_insert(true) {
            self.meta.bad_indexed_access.insert(node);
        }
    }
}

impl Visitor for MapUsagePass {
    fn visit_node(&mut self, ast: &Ast, id: NodeId) {
        match ast.kind(id) {
            NodeKind::MapAccess { map, key } => {
                if let NodeKind::Map(name) = ast.kind(*map) {
                    self.use_keyed(*name, id);
                }
                self.visit_node(ast, *key);
            }
            NodeKind::Map(name) => self.use_scalar(*name, id),
            NodeKind::MapAddr { .. } => {}
            NodeKind::For {
                var,
                iterable: Iterable::Map(map),
                body,
            } => {
                if let NodeKind::Map(name) = ast.kind(*map) {
                    self.iterators.push((*map, *name));
                }
                self.visit_node(ast, *var);
                self.visit_node(ast, *body);
            }
            NodeKind::Call { func, args } if MAP_NEUTRAL_CALLS.contains(&ast.name(*func)) => {
                for arg in args {
                    if !matches!(ast.kind(*arg), NodeKind::Map(_)) {
                        self.visit_node(ast, *arg);
                    }
                }
            }
            NodeKind::Typeof(_)
            | NodeKind::Sizeof { .. }
            | NodeKind::Offsetof { .. }
            | NodeKind::Typeinfo { .. } => {
                self.introspection += 1;
                walk_node(self, ast, id);
                self.introspection -= 1;
            }
            _ => walk_node(self, ast, id),
        }
    }
}

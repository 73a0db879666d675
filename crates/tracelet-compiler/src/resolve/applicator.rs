//! Writes resolved types back into the AST once resolution has converged.

use indexmap::IndexMap;
use tracelet_core::Symbol;

use super::graph::{GraphNode, ResolvedTypes};
use crate::ast::visitor::{Visitor, walk_node};
use crate::ast::{Ast, MapTypes, NodeId, NodeKind};

pub fn apply_types(ast: &mut Ast, resolved: &ResolvedTypes) {
    let mut reachable = Reachable::default();
    reachable.visit_root(ast);

    for id in reachable.nodes {
        let node = match ast.kind(id) {
            NodeKind::Typeof(_) => GraphNode::Typeof(id),
            _ => GraphNode::Node(id),
        };
        if let Some(ty) = resolved.get(&node) {
            ast.set_ty(id, ty.clone());
        }
    }

    let map_types: IndexMap<Symbol, MapTypes> = reachable
        .maps
        .into_iter()
        .map(|map| {
            let get = |node| resolved.get(&node).cloned().unwrap_or_default();
            let types = MapTypes {
                key: get(GraphNode::MapKey(map)),
                value: get(GraphNode::MapValue(map)),
            };
            (map, types)
        })
        .collect();
    ast.set_map_types(map_types);
}

/// Nodes reachable from the root, and maps in order of first mention.
#[derive(Default)]
struct Reachable {
    nodes: Vec<NodeId>,
    maps: Vec<Symbol>,
}

impl Visitor for Reachable {
    fn visit_node(&mut self, ast: &Ast, id: NodeId) {
        self.nodes.push(id);
        if let NodeKind::Map(name) = ast.kind(id) {
            if !self.maps.contains(name) {
                self.maps.push(*name);
            }
        }
        walk_node(self, ast, id);
    }
}

//! Type graph state for one resolution round.
//!
//! Producers map to the consumers that must be recomputed when the
//! producer's type changes. Everything here is rebuilt from scratch each
//! round; only [`LockedNodes`] is carried over by the driver.

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::IndexSet;
use tracelet_core::{SizedType, Symbol};

use crate::ast::{Ast, NodeId};
use crate::diagnostics::Diagnostics;
use crate::env::Env;
use crate::map_usage::MapMetadata;

use super::transforms::EdgeKind;

/// A variable name bound in a scope. Scopes are the ids of probe,
/// subprogram, block and `for` nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopedVar {
    pub scope: NodeId,
    pub name: Symbol,
}

/// Anything that can hold a resolved type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphNode {
    Node(NodeId),
    /// The type named by a `typeof`/type literal node.
    Typeof(NodeId),
    Variable(ScopedVar),
    MapKey(Symbol),
    MapValue(Symbol),
}

pub type ResolvedTypes = HashMap<GraphNode, SizedType>;

/// Types observed by introspection in an earlier round.
pub type LockedNodes = HashMap<GraphNode, SizedType>;

#[derive(Debug, Clone)]
pub struct Consumer {
    pub target: GraphNode,
    pub kind: EdgeKind,
    pub last_propagated: Option<SizedType>,
}

/// Nodes seen inside `sizeof`, `typeof`, `offsetof` or `typeinfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Introspected {
    Variable(ScopedVar),
    Map(Symbol),
}

/// The innermost probe or subprogram being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopLevel {
    Probe(NodeId),
    Subprog(NodeId),
}

/// State shared by every edge transform. Split from the edge table so the
/// scheduler can hold a consumer mutably while a transform runs.
pub struct TransformCx<'a> {
    pub ast: &'a Ast,
    pub env: &'a Env,
    pub meta: &'a MapMetadata,
    pub locked: &'a LockedNodes,
    pub resolved: ResolvedTypes,
    pub pointer_sources: HashMap<GraphNode, GraphNode>,
    /// Promoted argument type of each `sum`/`min`/`max`/`avg`/`stats` map.
    pub agg_map_args: HashMap<Symbol, SizedType>,
    pub diagnostics: Diagnostics,
}

impl TransformCx<'_> {
    pub fn get(&self, node: GraphNode) -> SizedType {
        self.resolved.get(&node).cloned().unwrap_or_default()
    }

    pub fn node_type(&self, id: NodeId) -> SizedType {
        self.get(GraphNode::Node(id))
    }
}

/// Assignment to a variable with a declared size, checked once the graph
/// is resolved instead of being propagated.
#[derive(Debug, Clone, Copy)]
pub struct DeclaredAssignment {
    pub at: NodeId,
    pub var: ScopedVar,
    pub value: NodeId,
}

/// Traversal state of the builder.
#[derive(Debug, Default)]
pub struct BuildState {
    pub scopes: Vec<NodeId>,
    pub variables: HashMap<NodeId, IndexSet<Symbol>>,
    pub decl_variables: HashSet<ScopedVar>,
    pub top_level: Option<TopLevel>,
    /// Name of the call whose arguments are being visited.
    pub call_context: Option<Symbol>,
    pub introspection: u32,
    pub introspected: IndexSet<Introspected>,
    pub comptimes: Vec<NodeId>,
    pub declared_assignments: Vec<DeclaredAssignment>,
    pub variable_nodes: Vec<NodeId>,
    pub subprogs: HashMap<Symbol, SizedType>,
}

pub struct TypeGraph<'a> {
    pub(super) edges: HashMap<GraphNode, Vec<Consumer>>,
    pub(super) queue: VecDeque<(GraphNode, SizedType)>,
    pub(super) cx: TransformCx<'a>,
    pub(super) build: BuildState,
}

impl<'a> TypeGraph<'a> {
    pub fn new(ast: &'a Ast, env: &'a Env, meta: &'a MapMetadata, locked: &'a LockedNodes) -> Self {
        Self {
            edges: HashMap::new(),
            queue: VecDeque::new(),
            cx: TransformCx {
                ast,
                env,
                meta,
                locked,
                resolved: ResolvedTypes::new(),
                pointer_sources: HashMap::new(),
                agg_map_args: HashMap::new(),
                diagnostics: Diagnostics::new(),
            },
            build: BuildState::default(),
        }
    }

    /// Seed a type known without propagation. `none` is ignored.
    pub(super) fn add_resolved(&mut self, node: GraphNode, ty: SizedType) {
        if ty.is_none() {
            return;
        }
        self.cx.resolved.insert(node, ty.clone());
        self.queue.push_back((node, ty));
    }

    pub(super) fn add_edge(&mut self, source: GraphNode, target: GraphNode, kind: EdgeKind) {
        self.edges.entry(source).or_default().push(Consumer {
            target,
            kind,
            last_propagated: None,
        });
    }

    pub(super) fn add_consumer(&mut self, source: GraphNode, target: GraphNode) {
        self.add_edge(source, target, EdgeKind::Identity);
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    pub fn resolved(&self) -> &ResolvedTypes {
        &self.cx.resolved
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.cx.diagnostics
    }

    /// Compile-time expressions still present in the tree, in source order.
    pub fn unresolved_comptimes(&self) -> &[NodeId] {
        &self.build.comptimes
    }

    /// Types of everything introspected this round, to be held fixed in
    /// the next one.
    pub fn locked_nodes(&self) -> LockedNodes {
        let mut locked = LockedNodes::new();
        let mut lock = |node: GraphNode| {
            let ty = self.cx.get(node);
            if !ty.is_none() {
                locked.insert(node, ty);
            }
        };
        for introspected in &self.build.introspected {
            match *introspected {
                Introspected::Variable(var) => lock(GraphNode::Variable(var)),
                Introspected::Map(map) => {
                    lock(GraphNode::MapKey(map));
                    lock(GraphNode::MapValue(map));
                }
            }
        }
        locked
    }

    pub(super) fn into_parts(self) -> (ResolvedTypes, Diagnostics) {
        (self.cx.resolved, self.cx.diagnostics)
    }
}

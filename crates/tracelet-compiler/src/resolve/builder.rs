//! Graph construction: one traversal seeding known types and registering
//! edges.

use tracelet_core::{AddrSpace, AggregateKind, SizedType, StructRef, Symbol, TypeShape};

use super::compat::is_valid_assignment;
use super::graph::{DeclaredAssignment, GraphNode, Introspected, ScopedVar, TopLevel, TypeGraph};
use super::tables::takes_operand;
use super::transforms::EdgeKind;
use crate::ast::visitor::{Visitor, walk_node};
use crate::ast::{Ast, Iterable, JumpKind, NodeId, NodeKind, TypeofArg, UnOp};
use crate::diagnostics::DiagnosticKind;
use crate::invariants::{ensure_open_scope, ensure_variable_scope};

impl<'a> TypeGraph<'a> {
    pub(super) fn build(&mut self) {
        let ast = self.cx.ast;
        let root = ast.root();
        if let NodeKind::Program { items } = ast.kind(root) {
            // Calls may precede the subprogram they name.
            for item in items {
                if let NodeKind::Subprog { name, ret, .. } = ast.kind(*item) {
                    let ret = self.cx.env.resolve_struct_refs(ret);
                    self.build.subprogs.insert(*name, ret);
                }
            }
        }
        self.visit(root);
    }

    pub(super) fn visit(&mut self, id: NodeId) {
        let ast = self.cx.ast;
        match ast.kind(id) {
            NodeKind::Program { items } => items.iter().for_each(|item| self.visit(*item)),
            NodeKind::StructDef { .. } | NodeKind::SubprogArg { .. } => {}
            NodeKind::Probe { pred, body, .. } => {
                self.build.top_level = Some(TopLevel::Probe(id));
                self.build.scopes.push(id);
                if let Some(pred) = pred {
                    self.visit(*pred);
                }
                self.visit(*body);
                self.build.scopes.pop();
                self.build.top_level = None;
            }
            NodeKind::Subprog { args, body, .. } => self.visit_subprog(id, args, *body),
            NodeKind::Block { stmts, expr } => {
                self.build.scopes.push(id);
                stmts.iter().for_each(|stmt| self.visit(*stmt));
                if let Some(expr) = expr {
                    self.visit(*expr);
                    self.add_consumer(GraphNode::Node(*expr), GraphNode::Node(id));
                }
                self.build.scopes.pop();
            }
            NodeKind::ExprStmt { expr } => self.visit(*expr),
            NodeKind::AssignVar { var, expr } => {
                self.visit(*expr);
                self.visit(*var);
                self.assign_variable(id, *var, *expr);
            }
            NodeKind::AssignMap { map, expr } => self.visit_assign_map(id, *map, *expr),
            NodeKind::VarDecl { var, ty, init } => self.visit_var_decl(id, *var, *ty, *init),
            NodeKind::For {
                var,
                iterable,
                body,
            } => self.visit_for(id, *var, *iterable, *body),
            NodeKind::While { cond, body } => {
                self.visit(*cond);
                self.visit(*body);
            }
            NodeKind::Jump { kind, value } => {
                if let (JumpKind::Return, Some(value)) = (kind, value) {
                    self.visit(*value);
                }
            }
            NodeKind::If { cond, then, els } => {
                if let NodeKind::Comptime { expr } = ast.kind(*cond) {
                    // Branches are built once the condition has folded.
                    self.visit(*expr);
                    self.build.comptimes.push(*cond);
                    return;
                }
                self.visit(*cond);
                self.visit(*then);
                self.add_edge(
                    GraphNode::Node(*then),
                    GraphNode::Node(id),
                    EdgeKind::Branch {
                        node: id,
                        from_then: true,
                    },
                );
                if let Some(els) = els {
                    self.visit(*els);
                    self.add_edge(
                        GraphNode::Node(*els),
                        GraphNode::Node(id),
                        EdgeKind::Branch {
                            node: id,
                            from_then: false,
                        },
                    );
                }
            }
            NodeKind::Integer { value, negative } => {
                self.add_resolved(GraphNode::Node(id), SizedType::literal_int(*value, *negative));
            }
            NodeKind::Bool(_) => self.add_resolved(GraphNode::Node(id), SizedType::bool()),
            NodeKind::Str(value) => {
                self.add_resolved(GraphNode::Node(id), SizedType::string(value.len() + 1));
            }
            NodeKind::Builtin(name) => self.visit_builtin(id, *name),
            NodeKind::Identifier(name) => self.visit_identifier(id, *name),
            NodeKind::Variable(name) => self.visit_variable(id, *name),
            NodeKind::VariableAddr { var } => {
                self.visit(*var);
                self.add_edge(GraphNode::Node(*var), GraphNode::Node(id), EdgeKind::AddressOf);
            }
            NodeKind::Map(name) => self.visit_map(id, *name),
            NodeKind::MapAddr { map } => {
                self.visit(*map);
                if let NodeKind::Map(name) = ast.kind(*map) {
                    self.add_edge(GraphNode::MapValue(*name), GraphNode::Node(id), EdgeKind::AddressOf);
                }
            }
            NodeKind::MapAccess { map, key } => self.visit_map_access(id, *map, *key),
            NodeKind::Binop { op, left, right } => {
                self.visit(*left);
                self.visit(*right);
                for from_left in [true, false] {
                    let source = if from_left { *left } else { *right };
                    let kind = EdgeKind::Binop {
                        node: id,
                        op: *op,
                        left: *left,
                        right: *right,
                        from_left,
                    };
                    self.add_edge(GraphNode::Node(source), GraphNode::Node(id), kind);
                }
            }
            NodeKind::Unop { op, expr, .. } => self.visit_unop(id, *op, *expr),
            NodeKind::FieldAccess { expr, field } => {
                self.visit(*expr);
                let kind = EdgeKind::FieldAccess {
                    node: id,
                    field: *field,
                };
                self.add_edge(GraphNode::Node(*expr), GraphNode::Node(id), kind);
            }
            NodeKind::ArrayAccess { expr, index } => {
                self.visit(*expr);
                self.visit(*index);
                self.add_edge(
                    GraphNode::Node(*expr),
                    GraphNode::Node(id),
                    EdgeKind::ArrayAccess { node: id },
                );
            }
            NodeKind::TupleAccess { expr, index } => {
                self.visit(*expr);
                self.add_edge(
                    GraphNode::Node(*expr),
                    GraphNode::Node(id),
                    EdgeKind::TupleAccess { index: *index },
                );
            }
            NodeKind::Call { func, args } => self.visit_call(id, *func, args),
            NodeKind::Cast { ty, expr } => self.visit_cast(id, *ty, *expr),
            NodeKind::Typeof(arg) => self.visit_typeof(id, arg),
            NodeKind::Sizeof { arg } => self.visit_introspection(id, *arg, EdgeKind::Sizeof),
            NodeKind::Offsetof { arg, .. } => {
                self.visit_introspection(id, *arg, EdgeKind::Offsetof { node: id });
            }
            NodeKind::Typeinfo { arg } => self.visit_introspection(id, *arg, EdgeKind::Typeinfo),
            NodeKind::Tuple(elems) => {
                if elems.is_empty() {
                    self.add_resolved(GraphNode::Node(id), SizedType::tuple(Vec::new()));
                }
                for elem in elems {
                    self.visit(*elem);
                    self.add_edge(
                        GraphNode::Node(*elem),
                        GraphNode::Node(id),
                        EdgeKind::Tuple { node: id },
                    );
                }
            }
            NodeKind::Record(fields) => {
                for field in fields {
                    self.visit(field.value);
                    self.add_edge(
                        GraphNode::Node(field.value),
                        GraphNode::Node(id),
                        EdgeKind::Record { node: id },
                    );
                }
            }
            NodeKind::Comptime { expr } => {
                self.visit(*expr);
                self.build.comptimes.push(id);
            }
        }
    }

    pub(super) fn error(&mut self, kind: DiagnosticKind, at: NodeId, message: impl Into<String>) {
        self.cx.report(kind, at, message);
    }

    fn current_scope(&self) -> NodeId {
        ensure_open_scope(self.build.scopes.last())
    }

    /// Scope declaring `name`, searched from the outermost scope inward.
    pub(super) fn find_variable_scope(&self, name: Symbol) -> Option<NodeId> {
        self.build.scopes.iter().copied().find(|scope| {
            self.build
                .variables
                .get(scope)
                .is_some_and(|vars| vars.contains(&name))
        })
    }

    fn scoped_var(&self, name: Symbol) -> ScopedVar {
        let scope = ensure_variable_scope(self.find_variable_scope(name), self.cx.ast.name(name));
        ScopedVar { scope, name }
    }

    /// The lvalue a pointer-valued expression was taken from.
    fn pointer_source(&self, expr: NodeId) -> GraphNode {
        let ast = self.cx.ast;
        match ast.kind(expr) {
            NodeKind::VariableAddr { var } => match ast.kind(*var) {
                NodeKind::Variable(name) => GraphNode::Variable(self.scoped_var(*name)),
                _ => GraphNode::Node(expr),
            },
            NodeKind::MapAddr { map } => match ast.kind(*map) {
                NodeKind::Map(name) => GraphNode::MapValue(*name),
                _ => GraphNode::Node(expr),
            },
            _ => GraphNode::Node(expr),
        }
    }

    /// Address space of values read in the current probe; subprograms
    /// read kernel memory.
    pub(super) fn probe_addr_space(&self) -> AddrSpace {
        match self.build.top_level {
            Some(TopLevel::Probe(probe)) => match self.cx.ast.kind(probe) {
                NodeKind::Probe { attach, .. } => {
                    attach.first().map_or(AddrSpace::None, |ap| ap.kind.addr_space())
                }
                _ => AddrSpace::None,
            },
            _ => AddrSpace::Kernel,
        }
    }

    fn visit_subprog(&mut self, id: NodeId, args: &[NodeId], body: NodeId) {
        let ast = self.cx.ast;
        self.build.scopes.push(id);
        self.build.top_level = Some(TopLevel::Subprog(id));

        for arg in args {
            let NodeKind::SubprogArg { var, ty } = ast.kind(*arg) else {
                continue;
            };
            let NodeKind::Variable(name) = ast.kind(*var) else {
                continue;
            };
            let scoped = ScopedVar {
                scope: id,
                name: *name,
            };
            self.declare_typed(scoped, *ty);
            self.visit(*var);
        }

        self.visit(body);
        self.build.scopes.pop();
        self.build.top_level = None;
    }

    /// Fix the type of `var` from the type node `ty`. Sized types make the
    /// variable declared: later assignments are checked, not propagated.
    fn declare_typed(&mut self, var: ScopedVar, ty: NodeId) {
        let ast = self.cx.ast;
        match ast.kind(ty) {
            NodeKind::Typeof(TypeofArg::Type(literal)) => {
                let Some(resolved) = self.resolve_struct_type(literal, ty) else {
                    return;
                };
                self.add_resolved(GraphNode::Typeof(ty), resolved.clone());
                if resolved.size() != 0 {
                    self.build.decl_variables.insert(var);
                }
                self.add_resolved(GraphNode::Variable(var), resolved);
            }
            _ => {
                self.build.decl_variables.insert(var);
                self.visit(ty);
                self.add_consumer(GraphNode::Typeof(ty), GraphNode::Variable(var));
            }
        }
    }

    fn assign_variable(&mut self, at: NodeId, var: NodeId, expr: NodeId) {
        let NodeKind::Variable(name) = self.cx.ast.kind(var) else {
            return;
        };
        let scoped = self.scoped_var(*name);
        if self.build.decl_variables.contains(&scoped) {
            self.build.declared_assignments.push(DeclaredAssignment {
                at,
                var: scoped,
                value: expr,
            });
            return;
        }
        let kind = EdgeKind::AssignVar {
            at,
            var: scoped,
            source: self.pointer_source(expr),
        };
        self.add_edge(GraphNode::Node(expr), GraphNode::Variable(scoped), kind);
    }

    fn visit_var_decl(&mut self, id: NodeId, var: NodeId, ty: Option<NodeId>, init: Option<NodeId>) {
        let ast = self.cx.ast;
        let NodeKind::Variable(name) = ast.kind(var) else {
            return;
        };
        if self.find_variable_scope(*name).is_some() {
            let message = format!(
                "Variable {} was already declared. Variable shadowing is not allowed.",
                ast.name(*name)
            );
            self.error(DiagnosticKind::InvalidAssignment, var, message);
        }

        if let Some(init) = init {
            self.visit(init);
        }
        if let Some(ty) = ty {
            let scoped = ScopedVar {
                scope: self.current_scope(),
                name: *name,
            };
            self.declare_typed(scoped, ty);
        }
        self.visit(var);
        if let Some(init) = init {
            self.assign_variable(id, var, init);
        }
    }

    fn visit_variable(&mut self, id: NodeId, name: Symbol) {
        let scope = match self.find_variable_scope(name) {
            Some(scope) => scope,
            None => self.current_scope(),
        };
        self.build.variables.entry(scope).or_default().insert(name);

        let scoped = ScopedVar { scope, name };
        self.add_consumer(GraphNode::Variable(scoped), GraphNode::Node(id));
        self.build.variable_nodes.push(id);
        if self.build.introspection > 0 {
            self.build.introspected.insert(Introspected::Variable(scoped));
        }
    }

    fn visit_map(&mut self, id: NodeId, name: Symbol) {
        if self.cx.meta.bad_indexed_access.contains(&id) {
            let message = format!(
                "{} used as a map without an explicit key (scalar map), previously used with an explicit key (non-scalar map)",
                self.cx.ast.name(name)
            );
            self.error(DiagnosticKind::MapUsage, id, message);
            return;
        }

        self.add_consumer(GraphNode::MapValue(name), GraphNode::Node(id));
        if self.cx.meta.is_scalar(name) == Some(true) {
            self.add_resolved(GraphNode::MapKey(name), SizedType::int(64));
        }
        if self.build.introspection > 0 {
            self.build.introspected.insert(Introspected::Map(name));
        }
    }

    fn visit_map_access(&mut self, id: NodeId, map: NodeId, key: NodeId) {
        let ast = self.cx.ast;
        self.visit(map);
        self.visit(key);
        let NodeKind::Map(name) = ast.kind(map) else {
            return;
        };

        if self.cx.meta.bad_scalar_access.contains(&id) {
            let message = format!(
                "{} used as a map with an explicit key (non-scalar map), previously used without an explicit key (scalar map)",
                ast.name(*name)
            );
            self.error(DiagnosticKind::MapUsage, id, message);
            return;
        }

        let kind = EdgeKind::MapKey {
            at: id,
            map: *name,
            source: self.pointer_source(key),
        };
        self.add_edge(GraphNode::Node(key), GraphNode::MapKey(*name), kind);
        self.add_consumer(GraphNode::MapValue(*name), GraphNode::Node(id));
    }

    fn visit_assign_map(&mut self, id: NodeId, target: NodeId, expr: NodeId) {
        let ast = self.cx.ast;
        self.visit(target);
        let Some(map) = map_name(ast, target) else {
            self.visit(expr);
            return;
        };

        if let NodeKind::Call { func, args } = ast.kind(expr) {
            if let Some(kind) = AggregateKind::from_function(ast.name(*func)) {
                self.visit_aggregate(expr, *func, map, kind, args);
                return;
            }
        }

        self.visit(expr);
        let kind = EdgeKind::AssignMapValue {
            at: id,
            map,
            source: self.pointer_source(expr),
            from_map: map_name(ast, expr),
        };
        self.add_edge(GraphNode::Node(expr), GraphNode::MapValue(map), kind);
    }

    /// `@m[k] = count()` and friends: the only writers of aggregate values.
    fn visit_aggregate(
        &mut self,
        call: NodeId,
        func: Symbol,
        map: Symbol,
        kind: AggregateKind,
        args: &[NodeId],
    ) {
        let saved = self.build.call_context.replace(func);
        args.iter().for_each(|arg| self.visit(*arg));
        self.build.call_context = saved;

        if takes_operand(kind) {
            let Some(operand) = args.first() else {
                let message = format!("{}() requires an argument", kind.function_name());
                self.error(DiagnosticKind::InvalidCall, call, message);
                return;
            };
            self.add_edge(
                GraphNode::Node(*operand),
                GraphNode::MapValue(map),
                EdgeKind::AggregateOperand { call, map, kind },
            );
        } else {
            self.add_edge(
                GraphNode::Node(call),
                GraphNode::MapValue(map),
                EdgeKind::Aggregate { call, map, kind },
            );
        }
        self.add_resolved(GraphNode::Node(call), SizedType::void());
    }

    fn visit_unop(&mut self, id: NodeId, op: UnOp, expr: NodeId) {
        let ast = self.cx.ast;
        self.visit(expr);
        if !op.is_inc_dec() {
            self.add_edge(GraphNode::Node(expr), GraphNode::Node(id), EdgeKind::Unop { node: id, op });
            return;
        }

        // `x++` stores an int64 into its operand, like an assignment.
        match ast.kind(expr) {
            NodeKind::Variable(name) => {
                let var = self.scoped_var(*name);
                self.add_resolved(GraphNode::Node(id), SizedType::int(64));
                if !self.build.decl_variables.contains(&var) {
                    let kind = EdgeKind::IncDecVar { at: id, var };
                    self.add_edge(GraphNode::Node(id), GraphNode::Variable(var), kind);
                }
            }
            NodeKind::Map(_) | NodeKind::MapAccess { .. } => {
                let Some(map) = map_name(ast, expr) else {
                    return;
                };
                self.add_resolved(GraphNode::Node(id), SizedType::int(64));
                let kind = EdgeKind::IncDecMap { at: id, map };
                self.add_edge(GraphNode::Node(id), GraphNode::MapValue(map), kind);
            }
            _ => {
                let message = format!("The {op} operator must be applied to a map or variable");
                self.error(DiagnosticKind::InvalidOperator, id, message);
            }
        }
    }

    fn visit_for(&mut self, id: NodeId, var: NodeId, iterable: Iterable, body: NodeId) {
        let ast = self.cx.ast;
        let NodeKind::Variable(decl_name) = ast.kind(var) else {
            return;
        };

        if let Iterable::Map(map) = iterable {
            if self.cx.meta.bad_iterator.contains(&map) {
                let name = map_name(ast, map).map_or("", |m| ast.name(m));
                let message =
                    format!("{name} has no explicit keys (scalar map), and cannot be used for iteration");
                self.error(DiagnosticKind::MapUsage, map, message);
            }
        }

        let mut uses = VariableUses::default();
        uses.visit_node(ast, body);
        let mut captured: Vec<NodeId> = Vec::new();
        let mut seen: Vec<Symbol> = vec![*decl_name];
        for (node, name) in uses.nodes {
            if seen.contains(&name) || self.find_variable_scope(name).is_none() {
                continue;
            }
            seen.push(name);
            captured.push(node);
        }

        match iterable {
            Iterable::Map(map) => self.visit(map),
            Iterable::Range { start, end } => {
                self.visit(start);
                self.visit(end);
            }
        }

        // The loop variable lives in the loop's own scope.
        self.build.scopes.push(id);
        self.visit(var);
        let scoped = ScopedVar {
            scope: id,
            name: *decl_name,
        };
        match iterable {
            Iterable::Map(map_node) => {
                if let Some(map) = map_name(ast, map_node) {
                    for source in [GraphNode::MapKey(map), GraphNode::MapValue(map)] {
                        let kind = EdgeKind::ForMap {
                            map_node,
                            map,
                            var: scoped,
                        };
                        self.add_edge(source, GraphNode::Variable(scoped), kind);
                    }
                }
            }
            Iterable::Range { start, end } => {
                for source in [start, end] {
                    self.add_edge(
                        GraphNode::Node(source),
                        GraphNode::Variable(scoped),
                        EdgeKind::ForRange { start, end },
                    );
                }
            }
        }
        self.visit(body);
        self.build.scopes.pop();

        for node in &captured {
            let kind = EdgeKind::ForContext {
                vars: captured.clone(),
            };
            self.add_edge(GraphNode::Node(*node), GraphNode::Node(id), kind);
        }
        self.add_resolved(GraphNode::Node(id), SizedType::record(Vec::new()));
    }

    fn visit_cast(&mut self, id: NodeId, ty: NodeId, expr: NodeId) {
        let ast = self.cx.ast;
        let addr_space = self.probe_addr_space();
        self.visit(expr);
        self.add_edge(
            GraphNode::Node(expr),
            GraphNode::Node(id),
            EdgeKind::CastFromExpr { cast: id, addr_space },
        );

        match ast.kind(ty) {
            NodeKind::Typeof(TypeofArg::Type(literal)) => {
                let Some(resolved) = self.resolve_struct_type(literal, ty) else {
                    return;
                };
                self.add_resolved(GraphNode::Typeof(ty), resolved.clone());
                self.add_resolved(GraphNode::Node(id), resolved);
            }
            _ => {
                self.visit(ty);
                self.add_edge(
                    GraphNode::Typeof(ty),
                    GraphNode::Node(id),
                    EdgeKind::CastFromType { expr, addr_space },
                );
            }
        }
    }

    fn visit_typeof(&mut self, id: NodeId, arg: &TypeofArg) {
        let ast = self.cx.ast;
        match arg {
            TypeofArg::Type(literal) => {
                if let Some(resolved) = self.resolve_struct_type(literal, id) {
                    self.add_resolved(GraphNode::Typeof(id), resolved);
                }
            }
            TypeofArg::Expr(expr) => {
                self.build.introspection += 1;
                self.visit(*expr);
                self.build.introspection -= 1;
                match ast.kind(*expr) {
                    NodeKind::Identifier(name) => {
                        let ty = self.named_type(ast.name(*name)).unwrap_or_default();
                        self.add_resolved(GraphNode::Typeof(id), ty);
                    }
                    // A bare map names its key type.
                    NodeKind::Map(name) => {
                        self.add_consumer(GraphNode::MapKey(*name), GraphNode::Typeof(id));
                    }
                    _ => self.add_consumer(GraphNode::Node(*expr), GraphNode::Typeof(id)),
                }
            }
        }
    }

    /// `sizeof`, `offsetof` and `typeinfo` over a `Typeof` operand.
    fn visit_introspection(&mut self, id: NodeId, arg: NodeId, kind: EdgeKind) {
        self.build.introspection += 1;
        self.visit(arg);
        self.build.introspection -= 1;
        self.add_edge(GraphNode::Typeof(arg), GraphNode::Node(id), kind);
    }

    /// Provider type or struct layout registered under `name`.
    pub(super) fn named_type(&self, name: &str) -> Option<SizedType> {
        let env = self.cx.env;
        env.provider
            .lookup_type(name)
            .or_else(|| env.lookup_struct(name).map(|layout| SizedType::cstruct(StructRef::resolved(layout))))
    }

    /// Attach the layout to a struct named by a type literal, or substitute
    /// the provider's type of that name. Pointer levels are preserved.
    pub(super) fn resolve_struct_type(&mut self, ty: &SizedType, at: NodeId) -> Option<SizedType> {
        let mut inner = ty;
        let mut depth = 0;
        while let Some(pointee) = inner.pointee() {
            inner = pointee;
            depth += 1;
        }
        let TypeShape::Struct(sref) = &inner.shape else {
            return Some(self.cx.env.resolve_struct_refs(ty));
        };
        if sref.layout.is_some() {
            return Some(ty.clone());
        }

        let mut resolved = match self.cx.env.lookup_struct(&sref.name) {
            Some(layout) => SizedType {
                shape: TypeShape::Struct(StructRef::resolved(layout)),
                ..inner.clone()
            },
            None => {
                let bare = sref.name.trim_start_matches("struct ").trim_start_matches("union ");
                match self.cx.env.provider.lookup_type(bare) {
                    Some(found) => found,
                    None => {
                        let message = format!("Cannot resolve unknown type \"{}\"", sref.name);
                        self.error(DiagnosticKind::UnknownStruct, at, message);
                        return None;
                    }
                }
            }
        };
        for _ in 0..depth {
            resolved = SizedType::pointer(resolved);
        }
        Some(resolved)
    }

    /// Assignments to declared variables must fit the declared type.
    pub(super) fn check_declared_assignments(&mut self) {
        let assignments = std::mem::take(&mut self.build.declared_assignments);
        for DeclaredAssignment { at, var, value } in assignments {
            let declared = self.cx.get(GraphNode::Variable(var));
            let ty = self.cx.node_type(value);
            if declared.is_none() || ty.is_none() {
                continue;
            }
            if !is_valid_assignment(&ty, &declared, false) {
                let message = format!("Value '{ty}' cannot be assigned to a scratch variable.");
                self.error(DiagnosticKind::InvalidAssignment, at, message);
            } else if !ty.fits_into(&declared) {
                let message = format!(
                    "Type mismatch for {}: trying to assign value of type '{ty}' when variable already has a type '{declared}'",
                    self.cx.ast.name(var.name)
                );
                self.error(DiagnosticKind::TypeMismatch, at, message);
            }
        }
    }
}

/// Name of the map a `Map` or `MapAccess` node refers to.
pub(super) fn map_name(ast: &Ast, id: NodeId) -> Option<Symbol> {
    match ast.kind(id) {
        NodeKind::Map(name) => Some(*name),
        NodeKind::MapAccess { map, .. } => match ast.kind(*map) {
            NodeKind::Map(name) => Some(*name),
            _ => None,
        },
        _ => None,
    }
}

/// Variable nodes of a subtree in source order.
#[derive(Default)]
struct VariableUses {
    nodes: Vec<(NodeId, Symbol)>,
}

impl Visitor for VariableUses {
    fn visit_node(&mut self, ast: &Ast, id: NodeId) {
        if let NodeKind::Variable(name) = ast.kind(id) {
            self.nodes.push((id, *name));
        }
        walk_node(self, ast, id);
    }
}

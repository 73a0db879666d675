//! Edge transforms.
//!
//! Every edge of the type graph carries an [`EdgeKind`]: plain data naming
//! the nodes it reads, applied to the producer's freshly resolved type.
//! Transforms may read any resolved type and report diagnostics but never
//! touch the edge table.

use tracelet_core::{AddrSpace, AggregateKind, Field, SizedType, Symbol, TypeShape};

use super::compat::is_valid_assignment;
use super::graph::{GraphNode, ScopedVar, TransformCx};
use super::ops::typeinfo_type;
use super::tables::aggregate_hint;
use crate::ast::{BinOp, NodeId, NodeKind, UnOp};
use crate::diagnostics::DiagnosticKind;

#[derive(Debug, Clone)]
pub enum EdgeKind {
    Identity,
    AssignVar {
        at: NodeId,
        var: ScopedVar,
        source: GraphNode,
    },
    AssignMapValue {
        at: NodeId,
        map: Symbol,
        source: GraphNode,
        /// Map read on the right-hand side, for the cast hint.
        from_map: Option<Symbol>,
    },
    MapKey {
        at: NodeId,
        map: Symbol,
        source: GraphNode,
    },
    /// `count`, `hist`, `lhist`, `tseries`: fired by the call itself.
    Aggregate {
        call: NodeId,
        map: Symbol,
        kind: AggregateKind,
    },
    /// `sum`, `min`, `max`, `avg`, `stats`: fired by the operand.
    AggregateOperand {
        call: NodeId,
        map: Symbol,
        kind: AggregateKind,
    },
    IncDecVar {
        at: NodeId,
        var: ScopedVar,
    },
    IncDecMap {
        at: NodeId,
        map: Symbol,
    },
    Binop {
        node: NodeId,
        op: BinOp,
        left: NodeId,
        right: NodeId,
        from_left: bool,
    },
    Unop {
        node: NodeId,
        op: UnOp,
    },
    Branch {
        node: NodeId,
        from_then: bool,
    },
    AddressOf,
    FieldAccess {
        node: NodeId,
        field: Symbol,
    },
    ArrayAccess {
        node: NodeId,
    },
    TupleAccess {
        index: usize,
    },
    Tuple {
        node: NodeId,
    },
    Record {
        node: NodeId,
    },
    /// Operand of a cast resolved; refine the cast's current type.
    CastFromExpr {
        cast: NodeId,
        addr_space: AddrSpace,
    },
    /// `(typeof(e))x`: the target type resolved.
    CastFromType {
        expr: NodeId,
        addr_space: AddrSpace,
    },
    ForMap {
        map_node: NodeId,
        map: Symbol,
        var: ScopedVar,
    },
    ForRange {
        start: NodeId,
        end: NodeId,
    },
    /// Outer variables referenced by a loop body, first use of each.
    ForContext {
        vars: Vec<NodeId>,
    },
    Sizeof,
    Offsetof {
        node: NodeId,
    },
    Typeinfo,
    Buffer {
        max: usize,
    },
    PointerSpace(AddrSpace),
    Bswap {
        call: NodeId,
    },
}

impl EdgeKind {
    /// Candidate type of the consumer given the producer's type `ty`.
    pub fn apply(&self, cx: &mut TransformCx<'_>, ty: &SizedType) -> SizedType {
        match self {
            Self::Identity => ty.clone(),
            Self::AssignVar { at, var, source } => {
                let current = cx.get(GraphNode::Variable(*var));
                if !is_valid_assignment(ty, &current, false) {
                    let message = format!("Value '{ty}' cannot be assigned to a scratch variable.");
                    cx.report(DiagnosticKind::InvalidAssignment, *at, message);
                    return SizedType::none();
                }
                cx.variable_type(*var, ty, *at, Some(*source))
            }
            Self::AssignMapValue {
                at,
                map,
                source,
                from_map,
            } => {
                let current = cx.get(GraphNode::MapValue(*map));
                if !is_valid_assignment(ty, &current, true) {
                    invalid_map_value(cx, *at, *map, *from_map, ty);
                    return SizedType::none();
                }
                cx.map_value(*map, ty, *at, Some(*source))
            }
            Self::MapKey { at, map, source } => {
                let current = cx.get(GraphNode::MapKey(*map));
                if !is_valid_assignment(ty, &current, false) {
                    let message = format!("Value '{ty}' cannot be used as a map key.");
                    cx.report(DiagnosticKind::InvalidAssignment, *at, message);
                    return SizedType::none();
                }
                cx.map_key(*map, ty, *at, Some(*source))
            }
            Self::Aggregate { call, map, kind } => {
                cx.aggregate_value(*map, &SizedType::aggregate(*kind, false), *call)
            }
            Self::AggregateOperand { call, map, kind } => aggregate_operand(cx, *call, *map, *kind, ty),
            Self::IncDecVar { at, var } => {
                let current = cx.get(GraphNode::Variable(*var));
                if current.is_pointer() {
                    return current;
                }
                cx.variable_type(*var, ty, *at, None)
            }
            Self::IncDecMap { at, map } => {
                let current = cx.get(GraphNode::MapValue(*map));
                if current.is_pointer() {
                    return current;
                }
                cx.map_value(*map, ty, *at, None)
            }
            Self::Binop {
                node,
                op,
                left,
                right,
                from_left,
            } => {
                if *from_left {
                    let rht = cx.node_type(*right);
                    cx.binop_type(*node, *op, ty, &rht)
                } else {
                    let lht = cx.node_type(*left);
                    cx.binop_type(*node, *op, &lht, ty)
                }
            }
            Self::Unop { node, op } => cx.unop_type(*node, *op, ty),
            Self::Branch { node, from_then } => {
                let current = cx.node_type(*node);
                if let Some(promoted) = current.promote(ty) {
                    return promoted;
                }
                let (first, second) = if *from_then { (ty, &current) } else { (&current, ty) };
                let message = format!(
                    "Branches must return the same type or compatible types: have '{first}' and '{second}'"
                );
                cx.report(DiagnosticKind::BranchMismatch, *node, message);
                SizedType::none()
            }
            Self::AddressOf => SizedType::pointer(ty.clone()).with_addr_space(ty.addr_space),
            Self::FieldAccess { node, field } => {
                let ast = cx.ast;
                cx.field_type(*node, ast.name(*field), ty)
            }
            Self::ArrayAccess { node } => cx.element_type(*node, ty),
            Self::TupleAccess { index } => ty
                .elements()
                .and_then(|elems| elems.get(*index))
                .cloned()
                .unwrap_or_default(),
            Self::Tuple { node } => tuple_type(cx, *node),
            Self::Record { node } => record_type(cx, *node),
            Self::CastFromExpr { cast, addr_space } => {
                let cast_ty = cx.node_type(*cast);
                if cast_ty.is_none() {
                    return SizedType::none();
                }
                cx.cast_type(&cast_ty, ty, *addr_space)
            }
            Self::CastFromType { expr, addr_space } => {
                let expr_ty = cx.node_type(*expr);
                if expr_ty.is_none() {
                    return ty.clone();
                }
                cx.cast_type(ty, &expr_ty, *addr_space)
            }
            Self::ForMap { map_node, map, var } => {
                let key = cx.get(GraphNode::MapKey(*map));
                let value = cx.get(GraphNode::MapValue(*map));
                if key.is_none() || value.is_none() {
                    return SizedType::none();
                }
                if !value.is_map_iterable() {
                    let message = format!("Loop expression does not support type: {value}");
                    cx.report(DiagnosticKind::LoopIterable, *map_node, message);
                }
                let tuple = SizedType::tuple(vec![key, value]);
                // `for ($kv : @m) { @m[$kv.0] = 1; }` feeds back into the map.
                if tuple == cx.get(GraphNode::Variable(*var)) {
                    return SizedType::none();
                }
                tuple
            }
            Self::ForRange { start, end } => cx.range_type(*start, *end),
            Self::ForContext { vars } => {
                if ty.is_none() {
                    return SizedType::none();
                }
                let fields = vars
                    .iter()
                    .map(|var| {
                        let name = match cx.ast.kind(*var) {
                            NodeKind::Variable(sym) => cx.ast.name(*sym),
                            _ => "",
                        };
                        Field::new(name, SizedType::pointer(cx.node_type(*var)))
                    })
                    .collect();
                SizedType::record(fields)
            }
            // Placeholder until the transformer substitutes the literal.
            Self::Sizeof => SizedType::uint(8),
            Self::Offsetof { node } => {
                let ty = cx.env.resolve_struct_refs(ty);
                if cx.offsetof_valid(*node, &ty) {
                    SizedType::uint(8)
                } else {
                    SizedType::none()
                }
            }
            Self::Typeinfo => typeinfo_type(ty),
            Self::Buffer { max } => {
                let size = match &ty.shape {
                    TypeShape::Array { elem, len } => len * elem.size(),
                    _ => *max,
                };
                SizedType::buffer(size.min(*max)).with_addr_space(AddrSpace::Kernel)
            }
            Self::PointerSpace(space) => ty.clone().with_addr_space(*space),
            Self::Bswap { call } => match ty.bits() {
                Some(bits) if ty.is_integer() => SizedType::uint(bits),
                _ => {
                    let message = format!("bswap() only supports integer arguments ({ty} provided)");
                    cx.report(DiagnosticKind::InvalidCall, *call, message);
                    SizedType::none()
                }
            },
        }
    }
}

fn invalid_map_value(
    cx: &mut TransformCx<'_>,
    at: NodeId,
    map: Symbol,
    from_map: Option<Symbol>,
    ty: &SizedType,
) {
    let range = cx.ast.range(at);
    let Some(kind) = ty.aggregate_kind() else {
        let message = format!("Value '{ty}' cannot be assigned to a map.");
        cx.diagnostics
            .report(DiagnosticKind::InvalidAssignment, range)
            .message(message)
            .emit();
        return;
    };

    let name = cx.ast.name(map);
    let message = format!(
        "Map value '{ty}' cannot be assigned from one map to another. The function that returns \
         this type must be called directly e.g. `{name} = {};`.",
        aggregate_hint(kind)
    );
    let mut report = cx
        .diagnostics
        .report(DiagnosticKind::AggregateAssignment, range)
        .message(message);
    if let (Some(from), true) = (from_map, ty.is_castable_aggregate()) {
        report = report.hint(format!(
            "Add a cast to integer if you want the value of the aggregate, e.g. `{name} = (int64){};`.",
            cx.ast.name(from)
        ));
    }
    report.emit();
}

fn aggregate_operand(
    cx: &mut TransformCx<'_>,
    call: NodeId,
    map: Symbol,
    kind: AggregateKind,
    ty: &SizedType,
) -> SizedType {
    let func = kind.function_name();
    if !ty.is_integer() {
        let message = format!("{func}() only supports integer arguments ({ty} provided)");
        cx.report(DiagnosticKind::InvalidCall, call, message);
        return SizedType::none();
    }

    // Every call on one map must agree on its operand type.
    match cx.agg_map_args.get(&map).cloned() {
        None => {
            cx.agg_map_args.insert(map, ty.clone());
        }
        Some(previous) => match previous.promote(ty) {
            Some(promoted) => {
                cx.agg_map_args.insert(map, promoted);
            }
            None => {
                let message = format!(
                    "Type mismatch for {func}: trying to call function with type '{ty}' when it already has a type '{previous}'"
                );
                cx.report(DiagnosticKind::TypeMismatch, call, message);
                return SizedType::none();
            }
        },
    }

    cx.aggregate_value(map, &SizedType::aggregate(kind, ty.is_signed()), call)
}

fn tuple_type(cx: &TransformCx<'_>, node: NodeId) -> SizedType {
    let NodeKind::Tuple(elems) = cx.ast.kind(node) else {
        return SizedType::none();
    };
    let types: Option<Vec<SizedType>> = elems
        .iter()
        .map(|elem| Some(cx.node_type(*elem)).filter(|t| !t.is_none()))
        .collect();
    types.map_or_else(SizedType::none, SizedType::tuple)
}

fn record_type(cx: &TransformCx<'_>, node: NodeId) -> SizedType {
    let NodeKind::Record(fields) = cx.ast.kind(node) else {
        return SizedType::none();
    };
    let mut out = Vec::with_capacity(fields.len());
    for field in fields {
        let ty = cx.node_type(field.value);
        if ty.is_none() {
            return SizedType::none();
        }
        out.push(Field::new(cx.ast.name(field.name), ty));
    }
    SizedType::record(out)
}

impl TransformCx<'_> {
    /// Whether the field path of the `offsetof` at `node` exists in `ty`.
    pub(super) fn offsetof_valid(&mut self, node: NodeId, ty: &SizedType) -> bool {
        let ast = self.ast;
        let NodeKind::Offsetof { fields, .. } = ast.kind(node) else {
            return false;
        };
        let mut current = ty.clone();
        for field in fields {
            let field = ast.name(*field);
            let message = match &current.shape {
                TypeShape::Struct(sref) => match self.env.lookup_struct(&sref.name) {
                    Some(layout) => match layout.field(field) {
                        Some(found) => {
                            current = self.env.resolve_struct_refs(&found.ty);
                            continue;
                        }
                        None => format!("'{}' has no field named '{field}'", sref.name),
                    },
                    None => format!("'{}' does not exist.", sref.name),
                },
                _ => format!("'{current}' is not a c_struct type."),
            };
            self.report(DiagnosticKind::UnknownField, node, message);
            return false;
        }
        true
    }
}

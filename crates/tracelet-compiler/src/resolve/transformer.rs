//! Rewrites that need resolved types: introspection becomes literals,
//! aggregate equality becomes explicit comparisons, and field access gets
//! explicit dereferences. Any rewrite forces another round.

use rowan::TextRange;
use tracelet_core::{SizedType, Symbol, TypeShape};

use super::graph::{GraphNode, ResolvedTypes};
use crate::ast::{Ast, BinOp, NodeId, NodeKind, RecordField, SYNTHETIC_VAR_PREFIX, TypeofArg, UnOp};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::env::Env;

/// Returns whether any node was rewritten, and the diagnostics raised.
pub fn transform(ast: &mut Ast, env: &Env, resolved: &ResolvedTypes) -> (bool, Diagnostics) {
    let mut transformer = AstTransformer {
        env,
        resolved,
        diagnostics: Diagnostics::new(),
        changed: false,
    };
    let root = ast.root();
    transformer.visit(ast, root);
    (transformer.changed, transformer.diagnostics)
}

struct AstTransformer<'a> {
    env: &'a Env,
    resolved: &'a ResolvedTypes,
    diagnostics: Diagnostics,
    changed: bool,
}

impl AstTransformer<'_> {
    fn get(&self, node: GraphNode) -> SizedType {
        self.resolved.get(&node).cloned().unwrap_or_default()
    }

    fn visit(&mut self, ast: &mut Ast, id: NodeId) {
        for child in ast.kind(id).children() {
            self.visit(ast, child);
        }

        let rewritten = match ast.kind(id).clone() {
            NodeKind::Binop { op, left, right } if matches!(op, BinOp::Eq | BinOp::Ne) => {
                match (ast.kind(left), ast.kind(right)) {
                    (NodeKind::Typeof(_), NodeKind::Typeof(_)) => self.compare_types(op, left, right),
                    _ => self.compare_aggregates(ast, id, op, left, right),
                }
            }
            NodeKind::FieldAccess { expr, field } => self.deref_field_access(ast, expr, field),
            NodeKind::Sizeof { arg } => {
                let ty = self.get(GraphNode::Typeof(arg));
                (!ty.is_none()).then(|| integer(ty.size() as u64))
            }
            NodeKind::Offsetof { arg, fields } => {
                let ty = self.get(GraphNode::Typeof(arg));
                self.offset_of(&ty, fields.iter().map(|f| ast.name(*f)))
                    .map(integer)
            }
            NodeKind::Typeinfo { arg } => {
                let ty = self.get(GraphNode::Typeof(arg));
                (!ty.is_none()).then(|| typeinfo_record(ast, id, &ty))
            }
            _ => None,
        };

        if let Some(kind) = rewritten {
            ast.replace(id, kind);
            self.env.macros.expand(ast, id);
            self.changed = true;
        }
    }

    /// `p.f` through any number of pointers becomes `(*p).f`.
    fn deref_field_access(&mut self, ast: &mut Ast, expr: NodeId, field: Symbol) -> Option<NodeKind> {
        let mut ty = self.get(GraphNode::Node(expr));
        if !ty.is_pointer() {
            return None;
        }
        let range = ast.range(expr);
        let mut inner = expr;
        while let Some(pointee) = ty.pointee() {
            ty = pointee.clone();
            inner = ast.alloc(
                NodeKind::Unop {
                    op: UnOp::Deref,
                    expr: inner,
                    post: false,
                },
                range,
            );
        }
        Some(NodeKind::FieldAccess { expr: inner, field })
    }

    fn offset_of<'n>(&self, ty: &SizedType, fields: impl Iterator<Item = &'n str>) -> Option<u64> {
        let mut current = ty.clone();
        let mut offset = 0;
        for name in fields {
            let TypeShape::Struct(sref) = &current.shape else {
                return None;
            };
            let layout = match &sref.layout {
                Some(layout) => layout.clone(),
                None => self.env.lookup_struct(&sref.name)?,
            };
            let field = layout.field(name)?;
            offset += field.offset;
            current = self.env.resolve_struct_refs(&field.ty);
        }
        (!current.is_none()).then_some(offset as u64)
    }

    /// `typeof(a) == typeof(b)` once both sides are known.
    fn compare_types(&self, op: BinOp, left: NodeId, right: NodeId) -> Option<NodeKind> {
        let lht = self.get(GraphNode::Typeof(left));
        let rht = self.get(GraphNode::Typeof(right));
        if lht.is_none() || rht.is_none() {
            return None;
        }
        Some(NodeKind::Bool((lht == rht) == (op == BinOp::Eq)))
    }

    /// `==`/`!=` on tuples and records.
    fn compare_aggregates(
        &mut self,
        ast: &mut Ast,
        id: NodeId,
        op: BinOp,
        left: NodeId,
        right: NodeId,
    ) -> Option<NodeKind> {
        let lht = self.get(GraphNode::Node(left));
        let rht = self.get(GraphNode::Node(right));
        if !comparable(&lht, &rht) {
            return None;
        }
        // Literal operands are folded.
        if is_constant(ast, left) && is_constant(ast, right) {
            return None;
        }
        if lht.size() == 0 {
            return Some(NodeKind::Bool(op == BinOp::Eq));
        }

        let Some(promoted) = lht.promote(&rht) else {
            let message = format!("Type mismatch for '{op}': comparing {lht} with {rht}");
            self.diagnostics
                .report(DiagnosticKind::TypeMismatch, ast.range(id))
                .message(message)
                .emit();
            return None;
        };

        let range = ast.range(id);
        let call = if lht == rht && promoted == lht {
            Some("memcmp")
        } else if same_fields_reordered(&lht, &rht) {
            Some("memcmp_record")
        } else {
            None
        };

        let Some(func) = call else {
            let mut bindings = Vec::new();
            let left = bind_operand(ast, id, "l", left, &mut bindings);
            let right = bind_operand(ast, id, "r", right, &mut bindings);
            let mut chain = field_chain(ast, &lht, left, right, range);
            if op == BinOp::Ne {
                chain = ast.alloc(
                    NodeKind::Unop {
                        op: UnOp::LNot,
                        expr: chain,
                        post: false,
                    },
                    range,
                );
            }
            if bindings.is_empty() {
                return Some(ast.kind(chain).clone());
            }
            return Some(NodeKind::Block {
                stmts: bindings,
                expr: Some(chain),
            });
        };

        let size = ast.alloc(integer(promoted.size() as u64), range);
        let func = ast.intern(func);
        let call = ast.alloc(
            NodeKind::Call {
                func,
                args: vec![left, right, size],
            },
            range,
        );
        let bool_ty = ast.alloc(NodeKind::Typeof(TypeofArg::Type(SizedType::bool())), range);
        let cast = NodeKind::Cast {
            ty: bool_ty,
            expr: call,
        };
        // memcmp is zero when the operands are equal.
        Some(match op {
            BinOp::Ne => cast,
            _ => NodeKind::Unop {
                op: UnOp::LNot,
                expr: ast.alloc(cast, range),
                post: false,
            },
        })
    }
}

fn integer(value: u64) -> NodeKind {
    NodeKind::Integer {
        value,
        negative: false,
    }
}

fn comparable(lht: &SizedType, rht: &SizedType) -> bool {
    match (&lht.shape, &rht.shape) {
        (TypeShape::Tuple(l), TypeShape::Tuple(r)) => l.len() == r.len(),
        (TypeShape::Record(l), TypeShape::Record(r)) => {
            l.len() == r.len() && l.iter().all(|f| r.iter().any(|g| g.name == f.name))
        }
        _ => false,
    }
}

fn is_constant(ast: &Ast, id: NodeId) -> bool {
    match ast.kind(id) {
        NodeKind::Tuple(elems) => elems.iter().all(|elem| is_constant(ast, *elem)),
        kind => kind.is_literal(),
    }
}

/// Records with the same field types, listed in a different order.
fn same_fields_reordered(lht: &SizedType, rht: &SizedType) -> bool {
    let (Some(l), Some(r)) = (lht.fields(), rht.fields()) else {
        return false;
    };
    l.iter().all(|field| {
        r.iter()
            .find(|f| f.name == field.name)
            .is_some_and(|f| f.ty == field.ty)
    })
}

/// Operand of a field-wise comparison, read once per field. Anything but a
/// variable or a constant is first assigned to a variable local to the
/// rewritten block, so it is evaluated exactly once.
fn bind_operand(ast: &mut Ast, at: NodeId, side: &str, expr: NodeId, stmts: &mut Vec<NodeId>) -> NodeId {
    if matches!(ast.kind(expr), NodeKind::Variable(_)) || is_constant(ast, expr) {
        return expr;
    }
    let range = ast.range(expr);
    let name = ast.intern(&format!("{SYNTHETIC_VAR_PREFIX}cmp_{side}{}", at.index()));
    let var = ast.alloc(NodeKind::Variable(name), range);
    stmts.push(ast.alloc(NodeKind::AssignVar { var, expr }, range));
    ast.alloc(NodeKind::Variable(name), range)
}

/// `l.0 == r.0 && (l.1 == r.1 && ...)`, short-circuiting left to right.
/// Operands must be free of side effects; see [`bind_operand`].
fn field_chain(
    ast: &mut Ast,
    lht: &SizedType,
    left: NodeId,
    right: NodeId,
    range: TextRange,
) -> NodeId {
    let accessors: Vec<Option<Symbol>> = match lht.fields() {
        Some(fields) => fields.iter().map(|f| Some(ast.intern(&f.name))).collect(),
        None => vec![None; lht.elements().map_or(0, <[SizedType]>::len)],
    };

    let mut comparisons = Vec::with_capacity(accessors.len());
    for (index, accessor) in accessors.into_iter().enumerate() {
        // The first comparison reuses the operands, later ones read copies.
        let (l, r) = if index == 0 {
            (left, right)
        } else {
            (ast.clone_subtree(left), ast.clone_subtree(right))
        };
        let access = |ast: &mut Ast, expr: NodeId| {
            let kind = match accessor {
                Some(field) => NodeKind::FieldAccess { expr, field },
                None => NodeKind::TupleAccess { expr, index },
            };
            ast.alloc(kind, range)
        };
        let l = access(ast, l);
        let r = access(ast, r);
        comparisons.push(ast.alloc(
            NodeKind::Binop {
                op: BinOp::Eq,
                left: l,
                right: r,
            },
            range,
        ));
    }

    let mut rest = comparisons.pop().unwrap_or_else(|| ast.alloc(NodeKind::Bool(true), range));
    while let Some(first) = comparisons.pop() {
        rest = ast.alloc(
            NodeKind::Binop {
                op: BinOp::LAnd,
                left: first,
                right: rest,
            },
            range,
        );
    }
    rest
}

/// `typeinfo(T)` as a record literal.
fn typeinfo_record(ast: &mut Ast, id: NodeId, ty: &SizedType) -> NodeKind {
    let range = ast.range(id);
    let zero = ast.alloc(integer(0), range);
    let uint64 = ast.alloc(NodeKind::Typeof(TypeofArg::Type(SizedType::uint(64))), range);
    let values = [
        ("btf_id", NodeKind::Cast { ty: uint64, expr: zero }),
        ("base_type", NodeKind::Str(ty.base_name().to_string())),
        ("full_type", NodeKind::Str(ty.to_string())),
    ];
    let fields = values
        .into_iter()
        .map(|(name, kind)| RecordField {
            name: ast.intern(name),
            value: ast.alloc(kind, range),
        })
        .collect();
    NodeKind::Record(fields)
}

//! Literal folding.
//!
//! Bottom-up rewrite of literal-only expressions, in place so node identity
//! survives. Folding is what turns a `comptime` condition into a literal once
//! the transformer has materialized the type information it depends on
//! (e.g. `comptime (typeinfo($a).base_type == "int")`).

use crate::ast::{Ast, BinOp, NodeId, NodeKind, UnOp};

#[cfg(test)]
#[path = "fold_tests.rs"]
mod tests;

/// Returns whether anything changed.
pub fn fold(ast: &mut Ast) -> bool {
    let root = ast.root();
    let mut folder = Folder { changed: false };
    folder.node(ast, root);
    folder.changed
}

struct Folder {
    changed: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Int(i128),
    Bool(bool),
    Str(String),
}

impl Literal {
    fn of(kind: &NodeKind) -> Option<Self> {
        match kind {
            NodeKind::Integer { value, negative } => {
                let v = i128::from(*value);
                Some(Self::Int(if *negative { -v } else { v }))
            }
            NodeKind::Bool(b) => Some(Self::Bool(*b)),
            NodeKind::Str(s) => Some(Self::Str(s.clone())),
            _ => None,
        }
    }

    /// `None` when the value does not fit a 64-bit literal.
    fn into_kind(self) -> Option<NodeKind> {
        Some(match self {
            Self::Int(v) if v < 0 => {
                let magnitude = v.unsigned_abs();
                if magnitude > 1u128 << 63 {
                    return None;
                }
                NodeKind::Integer {
                    value: u64::try_from(magnitude).ok()?,
                    negative: true,
                }
            }
            Self::Int(v) => NodeKind::Integer {
                value: u64::try_from(v).ok()?,
                negative: false,
            },
            Self::Bool(b) => NodeKind::Bool(b),
            Self::Str(s) => NodeKind::Str(s),
        })
    }

    fn truthy(&self) -> Option<bool> {
        match self {
            Self::Int(v) => Some(*v != 0),
            Self::Bool(b) => Some(*b),
            Self::Str(_) => None,
        }
    }
}

/// A literal or a tuple of literals, compared structurally.
#[derive(Debug, Clone, PartialEq)]
enum Constant {
    Scalar(Literal),
    Tuple(Vec<Constant>),
}

impl Constant {
    fn of(ast: &Ast, id: NodeId) -> Option<Self> {
        match ast.kind(id) {
            NodeKind::Tuple(elems) => elems
                .iter()
                .map(|elem| Self::of(ast, *elem))
                .collect::<Option<Vec<_>>>()
                .map(Self::Tuple),
            kind => Literal::of(kind).map(Self::Scalar),
        }
    }
}

/// `(1, "a") == (1, "a")`; tuples of different arity are left alone.
fn fold_tuple_eq(op: BinOp, left: Constant, right: Constant) -> Option<Literal> {
    let (Constant::Tuple(l), Constant::Tuple(r)) = (left, right) else {
        return None;
    };
    if l.len() != r.len() {
        return None;
    }
    match op {
        BinOp::Eq => Some(Literal::Bool(l == r)),
        BinOp::Ne => Some(Literal::Bool(l != r)),
        _ => None,
    }
}

fn fold_binop(op: BinOp, left: Literal, right: Literal) -> Option<Literal> {
    use Literal::*;

    if op.is_logical() {
        let (l, r) = (left.truthy()?, right.truthy()?);
        return Some(Bool(match op {
            BinOp::LAnd => l && r,
            _ => l || r,
        }));
    }

    match (left, right) {
        (Int(l), Int(r)) => Some(match op {
            BinOp::Eq => Bool(l == r),
            BinOp::Ne => Bool(l != r),
            BinOp::Lt => Bool(l < r),
            BinOp::Le => Bool(l <= r),
            BinOp::Gt => Bool(l > r),
            BinOp::Ge => Bool(l >= r),
            BinOp::Plus => Int(l + r),
            BinOp::Minus => Int(l - r),
            BinOp::Mul => Int(l.checked_mul(r)?),
            BinOp::Div => Int(l.checked_div(r)?),
            BinOp::Mod => Int(l.checked_rem(r)?),
            BinOp::BAnd => Int(l & r),
            BinOp::BOr => Int(l | r),
            BinOp::BXor => Int(l ^ r),
            BinOp::Shl if (0..64).contains(&r) => Int(l.checked_shl(r as u32)?),
            BinOp::Shr if (0..64).contains(&r) => Int(l >> r),
            _ => return None,
        }),
        (Bool(l), Bool(r)) => match op {
            BinOp::Eq => Some(Bool(l == r)),
            BinOp::Ne => Some(Bool(l != r)),
            _ => None,
        },
        (Str(l), Str(r)) => match op {
            BinOp::Eq => Some(Bool(l == r)),
            BinOp::Ne => Some(Bool(l != r)),
            _ => None,
        },
        _ => None,
    }
}

fn fold_unop(op: UnOp, value: Literal) -> Option<Literal> {
    match (op, value) {
        (UnOp::Minus, Literal::Int(v)) => Some(Literal::Int(-v)),
        (UnOp::LNot, lit) => Some(Literal::Bool(!lit.truthy()?)),
        (UnOp::BNot, Literal::Int(v)) if v >= 0 => {
            Some(Literal::Int(i128::from(!u64::try_from(v).ok()?)))
        }
        _ => None,
    }
}

impl Folder {
    fn node(&mut self, ast: &mut Ast, id: NodeId) {
        // A comptime `if` condition keeps its wrapper so the `if` can tell
        // it apart from an ordinary literal condition.
        let comptime_cond = match ast.kind(id) {
            NodeKind::If { cond, .. } => match ast.kind(*cond) {
                NodeKind::Comptime { expr } => Some((*cond, *expr)),
                _ => None,
            },
            _ => None,
        };
        for child in ast.kind(id).children() {
            match comptime_cond {
                Some((cond, expr)) if cond == child => self.node(ast, expr),
                _ => self.node(ast, child),
            }
        }
        if let Some(kind) = self.fold_kind(ast, id) {
            ast.replace(id, kind);
            self.changed = true;
        }
    }

    fn fold_kind(&self, ast: &Ast, id: NodeId) -> Option<NodeKind> {
        match ast.kind(id) {
            NodeKind::Binop { op, left, right }
                if matches!(ast.kind(*left), NodeKind::Tuple(_)) =>
            {
                let l = Constant::of(ast, *left)?;
                let r = Constant::of(ast, *right)?;
                fold_tuple_eq(*op, l, r)?.into_kind()
            }
            NodeKind::Binop { op, left, right } => {
                let l = Literal::of(ast.kind(*left))?;
                let r = Literal::of(ast.kind(*right))?;
                fold_binop(*op, l, r)?.into_kind()
            }
            NodeKind::Unop { op, expr, .. } => {
                fold_unop(*op, Literal::of(ast.kind(*expr))?)?.into_kind()
            }
            NodeKind::FieldAccess { expr, field } => match ast.kind(*expr) {
                NodeKind::Record(fields) => {
                    let value = fields.iter().find(|f| f.name == *field)?.value;
                    Some(ast.kind(value).clone())
                }
                _ => None,
            },
            NodeKind::TupleAccess { expr, index } => match ast.kind(*expr) {
                NodeKind::Tuple(elems) => Some(ast.kind(*elems.get(*index)?).clone()),
                _ => None,
            },
            NodeKind::Comptime { expr } if ast.kind(*expr).is_literal() => {
                Some(ast.kind(*expr).clone())
            }
            NodeKind::If { cond, then, els } => {
                let NodeKind::Comptime { expr } = ast.kind(*cond) else {
                    return None;
                };
                let taken = Literal::of(ast.kind(*expr))?.truthy()?;
                match (taken, els) {
                    (true, _) => Some(ast.kind(*then).clone()),
                    (false, Some(els)) => Some(ast.kind(*els).clone()),
                    (false, None) => Some(NodeKind::Block {
                        stmts: Vec::new(),
                        expr: None,
                    }),
                }
            }
            _ => None,
        }
    }
}

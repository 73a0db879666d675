//! Arena-allocated script AST.
//!
//! Nodes are addressed by [`NodeId`], which stays valid for the lifetime of
//! the [`Ast`]: rewrites replace a node's kind in place, so identities used
//! as resolver graph keys survive folding and desugaring. The `ty` field of
//! each node is the AST's only type-bearing slot and is written once, after
//! resolution succeeds.

mod dump;
pub mod visitor;

#[cfg(test)]
mod ast_tests;

use std::fmt;

use indexmap::IndexMap;
use rowan::TextRange;
use tracelet_core::{AddrSpace, Interner, SizedType, Symbol};

pub use dump::dump;
pub use visitor::Visitor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Prefix of variables introduced by rewrites. The lexer never produces it,
/// so they cannot clash with script variables.
pub const SYNTHETIC_VAR_PREFIX: &str = "$.";

pub fn is_synthetic_var(name: &str) -> bool {
    name.starts_with(SYNTHETIC_VAR_PREFIX)
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub range: TextRange,
    pub ty: SizedType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LAnd,
    LOr,
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    BAnd,
    BOr,
    BXor,
    Shl,
    Shr,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Lt | Self::Le | Self::Gt | Self::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, Self::LAnd | Self::LOr)
    }

    pub fn is_shift(self) -> bool {
        matches!(self, Self::Shl | Self::Shr)
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Plus | Self::Minus | Self::Mul | Self::Div | Self::Mod
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::LAnd => "&&",
            Self::LOr => "||",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::BAnd => "&",
            Self::BOr => "|",
            Self::BXor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    Minus,
    LNot,
    BNot,
    Deref,
    Increment,
    Decrement,
}

impl UnOp {
    pub fn is_inc_dec(self) -> bool {
        matches!(self, Self::Increment | Self::Decrement)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minus => "-",
            Self::LNot => "!",
            Self::BNot => "~",
            Self::Deref => "*",
            Self::Increment => "++",
            Self::Decrement => "--",
        }
    }
}

impl fmt::Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    Begin,
    End,
    Kprobe,
    Kretprobe,
    Uprobe,
    Uretprobe,
    Usdt,
    Tracepoint,
    RawTracepoint,
    Fentry,
    Fexit,
    Iter,
    Profile,
    Interval,
    Software,
    Hardware,
    Watchpoint,
}

impl ProbeKind {
    pub fn from_provider(name: &str) -> Option<Self> {
        Some(match name {
            "begin" | "BEGIN" => Self::Begin,
            "end" | "END" => Self::End,
            "kprobe" | "k" => Self::Kprobe,
            "kretprobe" | "kr" => Self::Kretprobe,
            "uprobe" | "u" => Self::Uprobe,
            "uretprobe" | "ur" => Self::Uretprobe,
            "usdt" | "U" => Self::Usdt,
            "tracepoint" | "t" => Self::Tracepoint,
            "rawtracepoint" | "rt" => Self::RawTracepoint,
            "fentry" | "f" | "kfunc" => Self::Fentry,
            "fexit" | "fr" | "kretfunc" => Self::Fexit,
            "iter" | "it" => Self::Iter,
            "profile" | "p" => Self::Profile,
            "interval" | "i" => Self::Interval,
            "software" | "s" => Self::Software,
            "hardware" | "h" => Self::Hardware,
            "watchpoint" | "w" => Self::Watchpoint,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Begin => "begin",
            Self::End => "end",
            Self::Kprobe => "kprobe",
            Self::Kretprobe => "kretprobe",
            Self::Uprobe => "uprobe",
            Self::Uretprobe => "uretprobe",
            Self::Usdt => "usdt",
            Self::Tracepoint => "tracepoint",
            Self::RawTracepoint => "rawtracepoint",
            Self::Fentry => "fentry",
            Self::Fexit => "fexit",
            Self::Iter => "iter",
            Self::Profile => "profile",
            Self::Interval => "interval",
            Self::Software => "software",
            Self::Hardware => "hardware",
            Self::Watchpoint => "watchpoint",
        }
    }

    /// Address space that pointers read in this probe refer to.
    pub fn addr_space(self) -> AddrSpace {
        match self {
            Self::Kprobe
            | Self::Kretprobe
            | Self::Tracepoint
            | Self::RawTracepoint
            | Self::Fentry
            | Self::Fexit
            | Self::Iter => AddrSpace::Kernel,
            Self::Uprobe | Self::Uretprobe | Self::Usdt => AddrSpace::User,
            _ => AddrSpace::None,
        }
    }

    /// Probes whose context is a `struct pt_regs`.
    pub fn has_regs_ctx(self) -> bool {
        matches!(
            self,
            Self::Kprobe | Self::Kretprobe | Self::Uprobe | Self::Uretprobe | Self::Usdt
        )
    }

    pub fn is_perf_event(self) -> bool {
        matches!(
            self,
            Self::Profile | Self::Interval | Self::Software | Self::Hardware
        )
    }

    pub fn is_special(self) -> bool {
        matches!(self, Self::Begin | Self::End)
    }
}

/// One attach point of a probe, e.g. `uprobe:/bin/bash:readline`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachPoint {
    pub kind: ProbeKind,
    /// Binary, tracepoint category or event unit, depending on `kind`.
    pub target: String,
    pub func: String,
    pub raw: String,
}

impl AttachPoint {
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let mut parts = raw.splitn(2, ':');
        let kind = ProbeKind::from_provider(parts.next()?)?;
        let rest = parts.next().unwrap_or("");
        let (target, func) = match kind {
            ProbeKind::Begin | ProbeKind::End => {
                if !rest.is_empty() {
                    return None;
                }
                (String::new(), String::new())
            }
            ProbeKind::Uprobe
            | ProbeKind::Uretprobe
            | ProbeKind::Usdt
            | ProbeKind::Tracepoint
            | ProbeKind::Profile
            | ProbeKind::Interval
            | ProbeKind::Software
            | ProbeKind::Hardware
            | ProbeKind::Watchpoint => {
                let (target, func) = rest.rsplit_once(':')?;
                (target.to_string(), func.to_string())
            }
            _ => {
                // Optional `module:` prefix.
                let func = rest.rsplit(':').next().unwrap_or(rest);
                let target = rest.strip_suffix(func).unwrap_or("").trim_end_matches(':');
                (target.to_string(), func.to_string())
            }
        };
        if !kind.is_special() && func.is_empty() {
            return None;
        }
        Some(Self {
            kind,
            target,
            func,
            raw: raw.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    Return,
    Break,
    Continue,
}

#[derive(Debug, Clone)]
pub enum TypeofArg {
    Type(SizedType),
    Expr(NodeId),
}

#[derive(Debug, Clone, Copy)]
pub enum Iterable {
    Map(NodeId),
    Range { start: NodeId, end: NodeId },
}

#[derive(Debug, Clone, Copy)]
pub struct RecordField {
    pub name: Symbol,
    pub value: NodeId,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Program {
        items: Vec<NodeId>,
    },
    StructDef {
        name: String,
        fields: Vec<(String, SizedType)>,
    },
    Probe {
        attach: Vec<AttachPoint>,
        pred: Option<NodeId>,
        body: NodeId,
    },
    Subprog {
        name: Symbol,
        args: Vec<NodeId>,
        ret: SizedType,
        body: NodeId,
    },
    /// `$name: T`, `ty` is a `Typeof` node.
    SubprogArg {
        var: NodeId,
        ty: NodeId,
    },
    /// A `{ ... }` scope; with a trailing expression it is a block expression.
    Block {
        stmts: Vec<NodeId>,
        expr: Option<NodeId>,
    },
    ExprStmt {
        expr: NodeId,
    },
    AssignVar {
        var: NodeId,
        expr: NodeId,
    },
    /// `map` is a bare `Map` (scalar map) or a `MapAccess`.
    AssignMap {
        map: NodeId,
        expr: NodeId,
    },
    VarDecl {
        var: NodeId,
        ty: Option<NodeId>,
        init: Option<NodeId>,
    },
    For {
        var: NodeId,
        iterable: Iterable,
        body: NodeId,
    },
    While {
        cond: NodeId,
        body: NodeId,
    },
    Jump {
        kind: JumpKind,
        value: Option<NodeId>,
    },
    /// Statement `if` (block branches) or ternary expression.
    If {
        cond: NodeId,
        then: NodeId,
        els: Option<NodeId>,
    },
    Integer {
        value: u64,
        negative: bool,
    },
    Bool(bool),
    Str(String),
    Builtin(Symbol),
    Identifier(Symbol),
    Variable(Symbol),
    VariableAddr {
        var: NodeId,
    },
    Map(Symbol),
    MapAddr {
        map: NodeId,
    },
    MapAccess {
        map: NodeId,
        key: NodeId,
    },
    Binop {
        op: BinOp,
        left: NodeId,
        right: NodeId,
    },
    Unop {
        op: UnOp,
        expr: NodeId,
        post: bool,
    },
    FieldAccess {
        expr: NodeId,
        field: Symbol,
    },
    ArrayAccess {
        expr: NodeId,
        index: NodeId,
    },
    TupleAccess {
        expr: NodeId,
        index: usize,
    },
    Call {
        func: Symbol,
        args: Vec<NodeId>,
    },
    /// `ty` is a `Typeof` node.
    Cast {
        ty: NodeId,
        expr: NodeId,
    },
    Typeof(TypeofArg),
    Sizeof {
        arg: NodeId,
    },
    Offsetof {
        arg: NodeId,
        fields: Vec<Symbol>,
    },
    Typeinfo {
        arg: NodeId,
    },
    Tuple(Vec<NodeId>),
    Record(Vec<RecordField>),
    Comptime {
        expr: NodeId,
    },
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Program { .. } => "Program",
            Self::StructDef { .. } => "StructDef",
            Self::Probe { .. } => "Probe",
            Self::Subprog { .. } => "Subprog",
            Self::SubprogArg { .. } => "SubprogArg",
            Self::Block { .. } => "Block",
            Self::ExprStmt { .. } => "ExprStmt",
            Self::AssignVar { .. } => "AssignVar",
            Self::AssignMap { .. } => "AssignMap",
            Self::VarDecl { .. } => "VarDecl",
            Self::For { .. } => "For",
            Self::While { .. } => "While",
            Self::Jump { .. } => "Jump",
            Self::If { .. } => "If",
            Self::Integer { .. } => "Integer",
            Self::Bool(_) => "Bool",
            Self::Str(_) => "String",
            Self::Builtin(_) => "Builtin",
            Self::Identifier(_) => "Identifier",
            Self::Variable(_) => "Variable",
            Self::VariableAddr { .. } => "VariableAddr",
            Self::Map(_) => "Map",
            Self::MapAddr { .. } => "MapAddr",
            Self::MapAccess { .. } => "MapAccess",
            Self::Binop { .. } => "Binop",
            Self::Unop { .. } => "Unop",
            Self::FieldAccess { .. } => "FieldAccess",
            Self::ArrayAccess { .. } => "ArrayAccess",
            Self::TupleAccess { .. } => "TupleAccess",
            Self::Call { .. } => "Call",
            Self::Cast { .. } => "Cast",
            Self::Typeof(_) => "Typeof",
            Self::Sizeof { .. } => "Sizeof",
            Self::Offsetof { .. } => "Offsetof",
            Self::Typeinfo { .. } => "Typeinfo",
            Self::Tuple(_) => "Tuple",
            Self::Record(_) => "Record",
            Self::Comptime { .. } => "Comptime",
        }
    }

    /// Literal values that folding and desugaring treat as constants.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Self::Integer { .. } | Self::Bool(_) | Self::Str(_)
        )
    }

    /// Child node ids in source order.
    pub fn children(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut push = |id: &NodeId| out.push(*id);
        self.for_each_child(&mut push);
        out
    }

    fn for_each_child(&self, f: &mut impl FnMut(&NodeId)) {
        match self {
            Self::Program { items } => items.iter().for_each(f),
            Self::Probe { pred, body, .. } => {
                pred.iter().for_each(&mut *f);
                f(body);
            }
            Self::Subprog { args, body, .. } => {
                args.iter().for_each(&mut *f);
                f(body);
            }
            Self::SubprogArg { var, ty } => {
                f(var);
                f(ty);
            }
            Self::Block { stmts, expr } => {
                stmts.iter().for_each(&mut *f);
                expr.iter().for_each(f);
            }
            Self::ExprStmt { expr } | Self::Comptime { expr } => f(expr),
            Self::AssignVar { var, expr } => {
                f(var);
                f(expr);
            }
            Self::AssignMap { map, expr } => {
                f(map);
                f(expr);
            }
            Self::VarDecl { var, ty, init } => {
                f(var);
                ty.iter().for_each(&mut *f);
                init.iter().for_each(f);
            }
            Self::For {
                var,
                iterable,
                body,
            } => {
                f(var);
                match iterable {
                    Iterable::Map(map) => f(map),
                    Iterable::Range { start, end } => {
                        f(start);
                        f(end);
                    }
                }
                f(body);
            }
            Self::While { cond, body } => {
                f(cond);
                f(body);
            }
            Self::Jump { value, .. } => value.iter().for_each(f),
            Self::If { cond, then, els } => {
                f(cond);
                f(then);
                els.iter().for_each(f);
            }
            Self::VariableAddr { var } => f(var),
            Self::MapAddr { map } => f(map),
            Self::MapAccess { map, key } => {
                f(map);
                f(key);
            }
            Self::Binop { left, right, .. } => {
                f(left);
                f(right);
            }
            Self::Unop { expr, .. }
            | Self::FieldAccess { expr, .. }
            | Self::TupleAccess { expr, .. } => f(expr),
            Self::ArrayAccess { expr, index } => {
                f(expr);
                f(index);
            }
            Self::Call { args, .. } => args.iter().for_each(f),
            Self::Cast { ty, expr } => {
                f(ty);
                f(expr);
            }
            Self::Typeof(TypeofArg::Expr(expr)) => f(expr),
            Self::Sizeof { arg } | Self::Offsetof { arg, .. } | Self::Typeinfo { arg } => f(arg),
            Self::Tuple(elems) => elems.iter().for_each(f),
            Self::Record(fields) => fields.iter().for_each(|field| f(&field.value)),
            Self::StructDef { .. }
            | Self::Integer { .. }
            | Self::Bool(_)
            | Self::Str(_)
            | Self::Builtin(_)
            | Self::Identifier(_)
            | Self::Variable(_)
            | Self::Map(_)
            | Self::Typeof(TypeofArg::Type(_)) => {}
        }
    }

    fn children_mut(&mut self) -> Vec<&mut NodeId> {
        match self {
            Self::Program { items } | Self::Tuple(items) | Self::Call { args: items, .. } => {
                items.iter_mut().collect()
            }
            Self::Probe { pred, body, .. } => pred.iter_mut().chain([body]).collect(),
            Self::Subprog { args, body, .. } => args.iter_mut().chain([body]).collect(),
            Self::SubprogArg { var, ty } => vec![var, ty],
            Self::Block { stmts, expr } => stmts.iter_mut().chain(expr.iter_mut()).collect(),
            Self::ExprStmt { expr } | Self::Comptime { expr } => vec![expr],
            Self::AssignVar { var, expr } => vec![var, expr],
            Self::AssignMap { map, expr } => vec![map, expr],
            Self::VarDecl { var, ty, init } => {
                [var].into_iter().chain(ty.iter_mut()).chain(init.iter_mut()).collect()
            }
            Self::For {
                var,
                iterable,
                body,
            } => match iterable {
                Iterable::Map(map) => vec![var, map, body],
                Iterable::Range { start, end } => vec![var, start, end, body],
            },
            Self::While { cond, body } => vec![cond, body],
            Self::Jump { value, .. } => value.iter_mut().collect(),
            Self::If { cond, then, els } => [cond, then].into_iter().chain(els.iter_mut()).collect(),
            Self::VariableAddr { var } => vec![var],
            Self::MapAddr { map } => vec![map],
            Self::MapAccess { map, key } => vec![map, key],
            Self::Binop { left, right, .. } => vec![left, right],
            Self::Unop { expr, .. }
            | Self::FieldAccess { expr, .. }
            | Self::TupleAccess { expr, .. } => vec![expr],
            Self::ArrayAccess { expr, index } => vec![expr, index],
            Self::Cast { ty, expr } => vec![ty, expr],
            Self::Typeof(TypeofArg::Expr(expr)) => vec![expr],
            Self::Sizeof { arg } | Self::Offsetof { arg, .. } | Self::Typeinfo { arg } => vec![arg],
            Self::Record(fields) => fields.iter_mut().map(|f| &mut f.value).collect(),
            Self::StructDef { .. }
            | Self::Integer { .. }
            | Self::Bool(_)
            | Self::Str(_)
            | Self::Builtin(_)
            | Self::Identifier(_)
            | Self::Variable(_)
            | Self::Map(_)
            | Self::Typeof(TypeofArg::Type(_)) => Vec::new(),
        }
    }
}

/// Final key/value types of one map.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct MapTypes {
    pub key: SizedType,
    pub value: SizedType,
}

#[derive(Debug, Clone)]
pub struct Ast {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    interner: Interner,
    map_types: IndexMap<Symbol, MapTypes>,
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}

impl Ast {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            interner: Interner::new(),
            map_types: IndexMap::new(),
        }
    }

    pub fn alloc(&mut self, kind: NodeKind, range: TextRange) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            range,
            ty: SizedType::none(),
        });
        id
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    /// # Panics
    /// Panics if no root was set; the parser always sets one.
    pub fn root(&self) -> NodeId {
        match self.root {
            Some(root) => root,
            None => panic!("AST root accessed before it was set"),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All node ids in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + use<> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn range(&self, id: NodeId) -> TextRange {
        self.nodes[id.index()].range
    }

    pub fn ty(&self, id: NodeId) -> &SizedType {
        &self.nodes[id.index()].ty
    }

    pub(crate) fn set_ty(&mut self, id: NodeId, ty: SizedType) {
        self.nodes[id.index()].ty = ty;
    }

    /// Replace a node's kind, keeping its identity and source range.
    pub fn replace(&mut self, id: NodeId, kind: NodeKind) {
        self.nodes[id.index()].kind = kind;
    }

    /// Deep copy of a subtree; every node of the copy gets a fresh id.
    pub fn clone_subtree(&mut self, id: NodeId) -> NodeId {
        let node = self.node(id).clone();
        let mut kind = node.kind;
        for slot in kind.children_mut() {
            *slot = self.clone_subtree(*slot);
        }
        let copy = self.alloc(kind, node.range);
        self.nodes[copy.index()].ty = node.ty;
        copy
    }

    pub fn interner(&self) -> &Interner {
        &self.interner
    }

    pub fn intern(&mut self, name: &str) -> Symbol {
        self.interner.intern(name)
    }

    pub fn name(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    pub fn map_types(&self) -> &IndexMap<Symbol, MapTypes> {
        &self.map_types
    }

    pub(crate) fn set_map_types(&mut self, map_types: IndexMap<Symbol, MapTypes>) {
        self.map_types = map_types;
    }
}

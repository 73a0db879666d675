//! Indented tree rendering of the AST, optionally with resolved types.

use std::fmt::Write;

use tracelet_core::Colors;

use super::{Ast, JumpKind, NodeId, NodeKind, TypeofArg};

pub fn dump(ast: &Ast, typed: bool, colors: Colors) -> String {
    let mut out = String::new();
    let mut printer = DumpPrinter {
        ast,
        typed,
        colors,
        out: &mut out,
    };
    printer.node(ast.root(), 0);
    out
}

struct DumpPrinter<'a> {
    ast: &'a Ast,
    typed: bool,
    colors: Colors,
    out: &'a mut String,
}

impl DumpPrinter<'_> {
    fn node(&mut self, id: NodeId, depth: usize) {
        let kind = self.ast.kind(id);
        let c = self.colors;
        let detail = self.detail(kind);
        let _ = write!(
            self.out,
            "{:indent$}{}{}{}",
            "",
            c.dim,
            kind.name(),
            c.reset,
            indent = depth * 2
        );
        if !detail.is_empty() {
            let _ = write!(self.out, " {}{}{}", c.blue, detail, c.reset);
        }
        let ty = self.ast.ty(id);
        if self.typed && !ty.is_none() {
            let _ = write!(self.out, " :: {}{}{}", c.green, ty, c.reset);
        }
        self.out.push('\n');

        for child in kind.children() {
            self.node(child, depth + 1);
        }
    }

    fn detail(&self, kind: &NodeKind) -> String {
        let ast = self.ast;
        match kind {
            NodeKind::Probe { attach, .. } => attach
                .iter()
                .map(|a| a.raw.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            NodeKind::StructDef { name, .. } => name.clone(),
            NodeKind::Subprog { name, ret, .. } => format!("{}: {}", ast.name(*name), ret),
            NodeKind::Integer { value, negative } => {
                format!("{}{}", if *negative { "-" } else { "" }, value)
            }
            NodeKind::Bool(b) => b.to_string(),
            NodeKind::Str(s) => format!("{s:?}"),
            NodeKind::Builtin(sym)
            | NodeKind::Identifier(sym)
            | NodeKind::Variable(sym)
            | NodeKind::Map(sym)
            | NodeKind::Call { func: sym, .. } => ast.name(*sym).to_string(),
            NodeKind::Binop { op, .. } => op.to_string(),
            NodeKind::Unop { op, post, .. } => {
                if *post {
                    format!("{op} (post)")
                } else {
                    op.to_string()
                }
            }
            NodeKind::FieldAccess { field, .. } => format!(".{}", ast.name(*field)),
            NodeKind::TupleAccess { index, .. } => format!(".{index}"),
            NodeKind::Typeof(TypeofArg::Type(ty)) => ty.to_string(),
            NodeKind::Offsetof { fields, .. } => fields
                .iter()
                .map(|f| ast.name(*f))
                .collect::<Vec<_>>()
                .join("."),
            NodeKind::Record(fields) => fields
                .iter()
                .map(|f| ast.name(f.name))
                .collect::<Vec<_>>()
                .join(", "),
            NodeKind::Jump { kind, .. } => match kind {
                JumpKind::Return => "return",
                JumpKind::Break => "break",
                JumpKind::Continue => "continue",
            }
            .to_string(),
            _ => String::new(),
        }
    }
}

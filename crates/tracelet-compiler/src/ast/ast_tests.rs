use rowan::TextRange;
use tracelet_core::{Colors, SizedType};

use super::visitor::{Visitor, walk_node};
use super::{AttachPoint, Ast, BinOp, NodeId, NodeKind, ProbeKind, dump};
use crate::parser::parse;

fn range() -> TextRange {
    TextRange::empty(0.into())
}

fn sum_ast() -> (Ast, NodeId) {
    let mut ast = Ast::new();
    let left = ast.alloc(NodeKind::Integer { value: 1, negative: false }, range());
    let right = ast.alloc(NodeKind::Integer { value: 2, negative: false }, range());
    let sum = ast.alloc(
        NodeKind::Binop {
            op: BinOp::Plus,
            left,
            right,
        },
        range(),
    );
    ast.set_root(sum);
    (ast, sum)
}

#[test]
fn replace_keeps_identity() {
    let (mut ast, sum) = sum_ast();
    ast.replace(sum, NodeKind::Integer { value: 3, negative: false });
    assert_eq!(ast.root(), sum);
    insta::assert_snapshot!(dump(&ast, false, Colors::OFF), @"Integer 3");
}

#[test]
fn clone_subtree_allocates_fresh_ids() {
    let (mut ast, sum) = sum_ast();
    let copy = ast.clone_subtree(sum);
    assert_ne!(copy, sum);
    assert_eq!(ast.len(), 6);

    let NodeKind::Binop { left, right, .. } = ast.kind(copy) else {
        panic!("expected binop");
    };
    let NodeKind::Binop {
        left: orig_left,
        right: orig_right,
        ..
    } = ast.kind(sum)
    else {
        panic!("expected binop");
    };
    assert_ne!(left, orig_left);
    assert_ne!(right, orig_right);
}

#[test]
fn typed_dump_shows_types() {
    let (mut ast, sum) = sum_ast();
    ast.set_ty(sum, SizedType::uint(8));
    insta::assert_snapshot!(dump(&ast, true, Colors::OFF), @r"
    Binop + :: uint8
      Integer 1
      Integer 2
    ");
}

struct VariableCounter {
    seen: Vec<String>,
}

impl Visitor for VariableCounter {
    fn visit_node(&mut self, ast: &Ast, id: NodeId) {
        if let NodeKind::Variable(sym) = ast.kind(id) {
            self.seen.push(ast.name(*sym).to_string());
        }
        walk_node(self, ast, id);
    }
}

#[test]
fn visitor_walks_in_source_order() {
    let (ast, _) = parse("BEGIN { $a = 1; if $b { $c = $a; } }").unwrap();
    let mut counter = VariableCounter { seen: Vec::new() };
    counter.visit_root(&ast);
    assert_eq!(counter.seen, vec!["$a", "$b", "$c", "$a"]);
}

#[test]
fn attach_point_forms() {
    let up = AttachPoint::parse("uprobe:/usr/bin/bash:readline").unwrap();
    assert_eq!(up.kind, ProbeKind::Uprobe);
    assert_eq!(up.target, "/usr/bin/bash");
    assert_eq!(up.func, "readline");

    let kp = AttachPoint::parse("k:vmlinux:do_sys_open").unwrap();
    assert_eq!(kp.kind, ProbeKind::Kprobe);
    assert_eq!(kp.target, "vmlinux");
    assert_eq!(kp.func, "do_sys_open");

    let tp = AttachPoint::parse("tracepoint:syscalls:sys_enter_openat").unwrap();
    assert_eq!(tp.target, "syscalls");

    assert!(AttachPoint::parse("BEGIN").is_some());
    assert!(AttachPoint::parse("BEGIN:x").is_none());
    assert!(AttachPoint::parse("kprobe:").is_none());
    assert!(AttachPoint::parse("nope:f").is_none());
}

#[test]
fn probe_kind_address_spaces() {
    use tracelet_core::AddrSpace;
    assert_eq!(ProbeKind::Kprobe.addr_space(), AddrSpace::Kernel);
    assert_eq!(ProbeKind::Usdt.addr_space(), AddrSpace::User);
    assert_eq!(ProbeKind::Begin.addr_space(), AddrSpace::None);
    assert!(ProbeKind::Uretprobe.has_regs_ctx());
    assert!(ProbeKind::Profile.is_perf_event());
}

use indoc::indoc;
use tracelet_core::Colors;

use super::{Parser, lex, parse, parse_with_parser};
use crate::ast::{NodeKind, dump};

fn dump_source(source: &str) -> String {
    let (ast, diagnostics) = parse(source).unwrap();
    assert!(
        diagnostics.is_empty(),
        "unexpected diagnostics: {:?}",
        diagnostics.iter().map(|d| d.to_string()).collect::<Vec<_>>()
    );
    dump(&ast, false, Colors::OFF)
}

fn errors(source: &str) -> Vec<String> {
    let (_, diagnostics) = parse(source).unwrap();
    diagnostics.iter().map(|d| d.to_string()).collect()
}

#[test]
fn empty_program() {
    insta::assert_snapshot!(dump_source(""), @"Program");
}

#[test]
fn assignment_in_begin() {
    insta::assert_snapshot!(dump_source("BEGIN { $x = 1; }"), @r"
    Program
      Probe BEGIN
        Block
          AssignVar
            Variable $x
            Integer 1
    ");
}

#[test]
fn predicate_and_compound_map_assignment() {
    let input = indoc! {r#"
    kprobe:f /($a / 2) == 1/ { @m[pid, comm] += 1; }
    "#};

    insta::assert_snapshot!(dump_source(input), @r"
    Program
      Probe kprobe:f
        Binop ==
          Binop /
            Variable $a
            Integer 2
          Integer 1
        Block
          AssignMap
            MapAccess
              Map @m
              Tuple
                Builtin pid
                Builtin comm
            Binop +
              MapAccess
                Map @m
                Tuple
                  Builtin pid
                  Builtin comm
              Integer 1
    ");
}

#[test]
fn records_casts_and_sizeof() {
    let input = indoc! {r#"
    BEGIN {
        $r = (a = 1, b = "x");
        $p = (struct Foo *)0;
        print(sizeof(uint32));
    }
    "#};

    insta::assert_snapshot!(dump_source(input), @r#"
    Program
      Probe BEGIN
        Block
          AssignVar
            Variable $r
            Record a, b
              Integer 1
              String "x"
          AssignVar
            Variable $p
            Cast
              Typeof struct Foo *
              Integer 0
          ExprStmt
            Call print
              Sizeof
                Typeof uint32
    "#);
}

#[test]
fn control_flow_and_subprograms() {
    let input = indoc! {r#"
    fn add($a: int64, $b: int64): int64 { return $a + $b; }
    BEGIN {
        for ($kv : @m) { print($kv.0); }
        for ($i : 0..10) { continue; }
        if $x > -1 { $y = 1 } else if $x { $y = 2 } else { $y = $x ? 3 : 4 }
    }
    "#};

    insta::assert_snapshot!(dump_source(input), @r"
    Program
      Subprog add: int64
        SubprogArg
          Variable $a
          Typeof int64
        SubprogArg
          Variable $b
          Typeof int64
        Block
          Jump return
            Binop +
              Variable $a
              Variable $b
      Probe BEGIN
        Block
          For
            Variable $kv
            Map @m
            Block
              ExprStmt
                Call print
                  TupleAccess .0
                    Variable $kv
          For
            Variable $i
            Integer 0
            Integer 10
            Block
              Jump continue
          If
            Binop >
              Variable $x
              Integer -1
            Block
              AssignVar
                Variable $y
                Integer 1
            Block
              If
                Variable $x
                Block
                  AssignVar
                    Variable $y
                    Integer 2
                Block
                  AssignVar
                    Variable $y
                    If
                      Variable $x
                      Integer 3
                      Integer 4
    ");
}

#[test]
fn precedence_climbing() {
    insta::assert_snapshot!(dump_source("BEGIN { $x = 1 + 2 * 3 << 1 && !$y; }"), @r"
    Program
      Probe BEGIN
        Block
          AssignVar
            Variable $x
            Binop &&
              Binop <<
                Binop +
                  Integer 1
                  Binop *
                    Integer 2
                    Integer 3
                Integer 1
              Unop !
                Variable $y
    ");
}

#[test]
fn declarations_typeof_and_comptime() {
    let input = indoc! {r#"
    BEGIN {
        let $a: uint16 = 1;
        let $b: typeof($a);
        let $c;
        if comptime (typeof($a) == typeof($b)) { $c = 1 }
    }
    "#};

    insta::assert_snapshot!(dump_source(input), @r"
    Program
      Probe BEGIN
        Block
          VarDecl
            Variable $a
            Typeof uint16
            Integer 1
          VarDecl
            Variable $b
            Typeof
              Variable $a
          VarDecl
            Variable $c
          If
            Comptime
              Binop ==
                Typeof
                  Variable $a
                Typeof
                  Variable $b
            Block
              AssignVar
                Variable $c
                Integer 1
    ");
}

#[test]
fn struct_definition_and_field_access() {
    let input = indoc! {r#"
    struct Foo { int a; char *b; unsigned long c[4]; }
    kprobe:f { $x = ((struct Foo *)arg0)->b; $y = &$x; $z++; }
    "#};

    insta::assert_snapshot!(dump_source(input), @r"
    Program
      StructDef struct Foo
      Probe kprobe:f
        Block
          AssignVar
            Variable $x
            FieldAccess .b
              Cast
                Typeof struct Foo *
                Builtin arg0
          AssignVar
            Variable $y
            VariableAddr
              Variable $x
          ExprStmt
            Unop ++ (post)
              Variable $z
    ");

    let (ast, _) = parse(input).unwrap();
    let NodeKind::Program { items } = ast.kind(ast.root()) else {
        panic!("expected program");
    };
    let NodeKind::StructDef { fields, .. } = ast.kind(items[0]) else {
        panic!("expected struct definition");
    };
    let rendered: Vec<_> = fields.iter().map(|(n, t)| format!("{n}: {t}")).collect();
    assert_eq!(rendered, vec!["a: int32", "b: int8 *", "c: uint64[4]"]);
}

#[test]
fn block_expression_value() {
    insta::assert_snapshot!(dump_source("BEGIN { $x = { let $t = 2; $t + 1 }; }"), @r"
    Program
      Probe BEGIN
        Block
          AssignVar
            Variable $x
            Block
              VarDecl
                Variable $t
                Integer 2
              Binop +
                Variable $t
                Integer 1
    ");
}

#[test]
fn multiple_attach_points() {
    let (ast, _) = parse("uprobe:/bin/sh:readline, kretprobe:vfs_read { }").unwrap();
    let NodeKind::Program { items } = ast.kind(ast.root()) else {
        panic!("expected program");
    };
    let NodeKind::Probe { attach, .. } = ast.kind(items[0]) else {
        panic!("expected probe");
    };
    assert_eq!(attach.len(), 2);
    assert_eq!(attach[0].target, "/bin/sh");
    assert_eq!(attach[0].func, "readline");
    assert_eq!(attach[1].func, "vfs_read");
}

#[test]
fn invalid_assignment_target() {
    insta::assert_debug_snapshot!(errors("BEGIN { 1 = 2; }"), @r#"
    [
        "error at 10..11: only variables and maps can be assigned to",
    ]
    "#);
}

#[test]
fn invalid_attach_point() {
    insta::assert_debug_snapshot!(errors("bogus:x { }"), @r#"
    [
        "error at 0..8: invalid attach point 'bogus:x'",
    ]
    "#);
}

#[test]
fn missing_semicolon_recovers() {
    let errs = errors("BEGIN { $x = 1 $y = 2; $z = 3; }");
    assert_eq!(errs, vec!["error at 15..17: unexpected token: expected ';'"]);
}

#[test]
fn deeply_nested_parens_hit_recursion_limit() {
    let depth = 64;
    let mut input = String::from("BEGIN { $x = ");
    for _ in 0..depth {
        input.push('(');
    }
    input.push('1');
    for _ in 0..depth {
        input.push(')');
    }
    input.push_str("; }");

    let parser = Parser::new(&input, lex(&input)).with_recursion_fuel(depth);
    let result = parse_with_parser(parser);
    assert!(
        matches!(result, Err(crate::Error::RecursionLimitExceeded)),
        "expected RecursionLimitExceeded error, got {:?}",
        result.map(|(_, d)| d.len())
    );
}

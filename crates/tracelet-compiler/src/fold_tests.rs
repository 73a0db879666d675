use indoc::indoc;
use tracelet_core::Colors;

use super::fold;
use crate::ast::dump;
use crate::parser::parse;

fn folded(source: &str) -> (bool, String) {
    let (mut ast, diagnostics) = parse(source).unwrap();
    assert!(diagnostics.is_empty());
    let changed = fold(&mut ast);
    (changed, dump(&ast, false, Colors::OFF))
}

#[test]
fn arithmetic_and_comparisons() {
    let (changed, out) = folded("BEGIN { $a = 1 + 2 * 3; $b = 4 - 10; $c = 2 > 1 && !false; }");
    assert!(changed);
    insta::assert_snapshot!(out, @r"
    Program
      Probe BEGIN
        Block
          AssignVar
            Variable $a
            Integer 7
          AssignVar
            Variable $b
            Integer -6
          AssignVar
            Variable $c
            Bool true
    ");
}

#[test]
fn division_by_zero_is_left_alone() {
    let (changed, out) = folded("BEGIN { $a = 1 / 0; }");
    assert!(!changed);
    insta::assert_snapshot!(out, @r"
    Program
      Probe BEGIN
        Block
          AssignVar
            Variable $a
            Binop /
              Integer 1
              Integer 0
    ");
}

#[test]
fn literal_access_and_string_equality() {
    let (_, out) = folded(r#"BEGIN { $a = (x = "int", y = 2).x == "int"; $b = (1, 5).1; }"#);
    insta::assert_snapshot!(out, @r"
    Program
      Probe BEGIN
        Block
          AssignVar
            Variable $a
            Bool true
          AssignVar
            Variable $b
            Integer 5
    ");
}

#[test]
fn comptime_if_selects_branch() {
    let input = indoc! {r#"
    BEGIN {
        if comptime (1 == 2) { $a = 1 } else { $a = "x" }
        if comptime false { $b = 1 }
        if 1 == 1 { $c = 1 }
    }
    "#};

    let (_, out) = folded(input);
    insta::assert_snapshot!(out, @r#"
    Program
      Probe BEGIN
        Block
          Block
            AssignVar
              Variable $a
              String "x"
          Block
          If
            Bool true
            Block
              AssignVar
                Variable $c
                Integer 1
    "#);
}

#[test]
fn unfoldable_comptime_is_kept() {
    let (changed, out) = folded("BEGIN { if comptime $x { } }");
    assert!(!changed);
    insta::assert_snapshot!(out, @r"
    Program
      Probe BEGIN
        Block
          If
            Comptime
              Variable $x
            Block
    ");
}

#[test]
fn literal_tuple_equality() {
    let (changed, out) = folded("BEGIN { $a = (1, (2, \"x\")) == (1, (2, \"x\")); $b = () != (); $c = (1, 2) == (1, 2, 3); }");
    assert!(changed);
    insta::assert_snapshot!(out, @r"
    Program
      Probe BEGIN
        Block
          AssignVar
            Variable $a
            Bool true
          AssignVar
            Variable $b
            Bool false
          AssignVar
            Variable $c
            Binop ==
              Tuple
                Integer 1
                Integer 2
              Tuple
                Integer 1
                Integer 2
                Integer 3
    ");
}

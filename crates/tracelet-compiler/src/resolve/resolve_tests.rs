use indoc::indoc;
use tracelet_core::{Colors, SizedType};

use super::{GraphNode, LockedNodes, TypeGraph, resolve_types};
use crate::Error;
use crate::ast::dump;
use crate::config::Config;
use crate::env::{Env, NamedType, StaticTypeProvider};
use crate::map_usage::MapMetadata;
use crate::parser::parse;
use crate::test_utils::{messages, resolve, resolve_messages, resolve_with, variable_type};

fn types_of(source: &str, names: &[&str]) -> Vec<String> {
    let (ast, _, diagnostics) = resolve(source);
    assert!(!diagnostics.has_errors(), "{}", messages(&diagnostics));
    names.iter().map(|name| variable_type(&ast, name)).collect()
}

#[test]
fn literals_and_arithmetic() {
    let types = types_of(
        r#"BEGIN { $a = 1; $b = -1; $c = "hi"; $d = $a + 300; $e = true; }"#,
        &["$a", "$b", "$c", "$d", "$e"],
    );
    assert_eq!(types, ["uint8", "int8", "string[3]", "uint64", "bool"]);
}

#[test]
fn variable_widens_across_assignments() {
    let types = types_of("BEGIN { $a = 1; $a = (uint64)2; }", &["$a"]);
    assert_eq!(types, ["uint64"]);
}

#[test]
fn widening_reaches_earlier_uses() {
    let (ast, _, diagnostics) = resolve("BEGIN { $a = 1; $b = $a; $a = 100000; }");
    assert!(diagnostics.is_empty(), "{}", messages(&diagnostics));
    assert_eq!(variable_type(&ast, "$b"), "uint32");
}

#[test]
fn declared_type_is_kept() {
    let types = types_of(
        "BEGIN { let $a: uint16 = 1; let $b: typeof($a); $b = 2; }",
        &["$a", "$b"],
    );
    assert_eq!(types, ["uint16", "uint16"]);
}

#[test]
fn declared_type_rejects_wider_value() {
    let out = resolve_messages("BEGIN { let $a: uint8; $a = 100000; }");
    assert!(out.contains("Type mismatch for $a"), "{out}");
    assert!(out.contains("already has a type 'uint8'"), "{out}");
}

#[test]
fn shadowing_is_rejected() {
    let out = resolve_messages("BEGIN { $a = 1; if (true) { let $a = 2; } }");
    assert!(out.starts_with("error:"), "{out}");
}

#[test]
fn aggregate_values_follow_their_reducer() {
    let valid = [
        "BEGIN { @a = count(); @a = count(); }",
        "BEGIN { @a = sum(1); @a = sum(100000); }",
        "BEGIN { @a = 1; @b = count(); @a = @b; }",
    ];
    for source in valid {
        let out = resolve_messages(source);
        assert!(out.is_empty(), "{source}: {out}");
    }

    let copies = [
        "BEGIN { @a = 1; @b = hist(); @a = @b; }",
        "BEGIN { @a = hist(1); @b = @a; }",
        "BEGIN { @b = count(); @a = @b; }",
    ];
    for source in copies {
        let out = resolve_messages(source);
        assert!(
            out.contains("cannot be assigned from one map to another"),
            "{source}: {out}"
        );
    }

    let mismatches = [
        "BEGIN { @a = 1; @a = count(); }",
        "BEGIN { @a = count(); @a = 1; }",
        "BEGIN { @a = count(); @a = sum(5); }",
    ];
    for source in mismatches {
        let out = resolve_messages(source);
        assert!(out.contains("Type mismatch for @a"), "{source}: {out}");
    }
}

#[test]
fn reducer_outside_map_assignment() {
    let out = resolve_messages("BEGIN { $x = count(); }");
    insta::assert_snapshot!(out, @"error: `count()` must be assigned directly to a map");
}

#[test]
fn map_types_in_first_mention_order() {
    let (ast, output, diagnostics) =
        resolve(r#"BEGIN { @b["x", 1] = 5; @a = count(); @b["yy", 300] = 1; }"#);
    assert!(diagnostics.is_empty(), "{}", messages(&diagnostics));

    let rendered: Vec<String> = output
        .map_types
        .iter()
        .map(|(name, types)| format!("{} {} {}", ast.name(*name), types.key, types.value))
        .collect();
    assert_eq!(
        rendered,
        [
            "@b (string[3],uint16) uint8",
            "@a int64 count_t",
        ]
    );
}

#[test]
fn conflicting_map_keys() {
    let out = resolve_messages(r#"BEGIN { @m[1] = 1; @m["a"] = 2; }"#);
    assert!(out.starts_with("error:"), "{out}");
}

#[test]
fn observed_type_is_locked() {
    let out = resolve_messages(indoc! {"
        BEGIN {
          $a = 1;
          if comptime (sizeof($a) == 1) {
            $a = 100000;
          }
        }
    "});
    assert!(out.contains("has been locked"), "{out}");
    assert!(out.contains("locked type 'uint8'"), "{out}");
}

#[test]
fn locked_type_accepts_fitting_values() {
    let (ast, output, diagnostics) = resolve(indoc! {"
        BEGIN {
          $a = 1;
          if comptime (sizeof($a) == 1) {
            $a = 2;
          }
        }
    "});
    assert!(diagnostics.is_empty(), "{}", messages(&diagnostics));
    assert!(output.rounds >= 2);
    assert_eq!(variable_type(&ast, "$a"), "uint8");
}

#[test]
fn typeinfo_locks_its_operand() {
    let out = resolve_messages(indoc! {"
        BEGIN {
          $a = 1;
          $t = typeinfo($a);
          if comptime (sizeof(uint8) == 1) {
            $a = 100000;
          }
        }
    "});
    assert!(out.contains("has been locked"), "{out}");
    assert!(out.contains("locked type 'uint8'"), "{out}");
}

#[test]
fn typeinfo_becomes_a_record() {
    let (ast, _, diagnostics) = resolve("BEGIN { $a = 1; $t = typeinfo($a); }");
    assert!(!diagnostics.has_errors(), "{}", messages(&diagnostics));
    assert_eq!(
        variable_type(&ast, "$t"),
        "record { .btf_id = uint64, .base_type = string[4], .full_type = string[6] }"
    );

    let out = dump(&ast, false, Colors::OFF);
    assert!(!out.contains("Typeinfo"), "{out}");
    assert!(out.contains("Record btf_id, base_type, full_type"), "{out}");
    assert!(out.contains(r#"String "int""#), "{out}");
    assert!(out.contains(r#"String "uint8""#), "{out}");
    assert!(out.contains("Cast"), "{out}");
}

#[test]
fn context_mark_alone_repropagates() {
    let (ast, _) = parse("BEGIN { $a = 1; }").unwrap();
    let env = Env::default();
    let meta = MapMetadata::default();
    let locked = LockedNodes::new();
    let mut graph = TypeGraph::new(&ast, &env, &meta, &locked);

    let ids: Vec<_> = ast.ids().collect();
    let source = GraphNode::Node(ids[0]);
    let target = GraphNode::Node(ids[1]);
    graph.add_consumer(source, target);

    graph.add_resolved(source, SizedType::uint(64));
    assert_eq!(graph.propagate(), 1);

    // Same type again: the memo stops it.
    graph.add_resolved(source, SizedType::uint(64));
    assert_eq!(graph.propagate(), 0);

    // Equal as a type, but now read from the probe context.
    graph.add_resolved(source, SizedType::uint(64).with_ctx_access(true));
    assert_eq!(graph.propagate(), 1);
    assert!(graph.resolved()[&target].ctx_access);
}

#[test]
fn pointers_from_one_lvalue_reconcile() {
    let (ast, _, diagnostics) = resolve(indoc! {"
        BEGIN {
          $x = 1;
          $p = &$x;
          $x = 100000;
          $q = $p;
          $r = *$q;
        }
    "});
    assert!(!diagnostics.has_errors(), "{}", messages(&diagnostics));
    assert_eq!(variable_type(&ast, "$r"), "uint32");
}

#[test]
fn pointers_from_different_lvalues_conflict() {
    let out = resolve_messages("BEGIN { $a = 1; $b = 100000; $p = &$a; $p = &$b; }");
    assert!(out.contains("Type mismatch for $p"), "{out}");
}

#[test]
fn unresolvable_comptime() {
    let out = resolve_messages("BEGIN { if comptime ($x == 1) { print(1); } }");
    insta::assert_snapshot!(out, @"error: Unable to resolve comptime expression");
}

#[test]
fn comptime_picks_branch() {
    let types = types_of(
        indoc! {r#"
            BEGIN {
              $a = 1;
              if comptime (typeof($a) == typeof(uint8)) {
                $b = "small";
              } else {
                $b = 1;
              }
            }
        "#},
        &["$b"],
    );
    assert_eq!(types, ["string[6]"]);
}

#[test]
fn unresolved_variable() {
    let out = resolve_messages("BEGIN { let $a; print($a); }");
    assert!(
        out.contains("error: Could not resolve the type of this variable"),
        "{out}"
    );
}

#[test]
fn tuple_comparison_is_desugared() {
    let (ast, _, diagnostics) =
        resolve(r#"BEGIN { $t = (1, "a"); $u = (2, "bc"); $c = $t == $u; }"#);
    assert!(!diagnostics.has_errors(), "{}", messages(&diagnostics));
    assert_eq!(variable_type(&ast, "$c"), "bool");

    let out = dump(&ast, false, Colors::OFF);
    assert!(out.contains("Binop &&"), "{out}");
    assert_eq!(out.matches("TupleAccess").count(), 4, "{out}");
}

#[test]
fn compared_operands_are_evaluated_once() {
    let source = indoc! {"
        BEGIN {
          $a = 0;
          @m[1] = (1, 2, 300);
          $u = (1, 2, 3);
          $c = @m[$a++] == $u;
          $d = @m[$a++] != $u;
        }
    "};
    let (ast, _, diagnostics) = resolve(source);
    assert!(!diagnostics.has_errors(), "{}", messages(&diagnostics));
    assert_eq!(variable_type(&ast, "$c"), "bool");
    assert_eq!(variable_type(&ast, "$d"), "bool");

    let out = dump(&ast, false, Colors::OFF);
    assert_eq!(out.matches("(post)").count(), 2, "{out}");
    assert_eq!(out.matches("MapAccess").count(), 3, "{out}");
    assert_eq!(out.matches("TupleAccess").count(), 12, "{out}");

    // Operand bindings stay out of the variable table.
    let (analysis, _) = crate::analyze(source, &mut Env::default()).unwrap();
    let names: Vec<String> = analysis.variable_types().into_keys().collect();
    assert_eq!(names, ["$a", "$u", "$c", "$d"]);
}

#[test]
fn identical_tuples_compare_bytes() {
    let (ast, _, diagnostics) = resolve("BEGIN { $t = (1, 2); $u = (3, 4); $c = $t != $u; }");
    assert!(!diagnostics.has_errors(), "{}", messages(&diagnostics));
    assert_eq!(variable_type(&ast, "$c"), "bool");
    assert!(dump(&ast, false, Colors::OFF).contains("Call memcmp"));
}

#[test]
fn struct_layout_and_introspection() {
    let (ast, _, diagnostics) = resolve(indoc! {"
        struct Foo { int a; char *b; unsigned long c[4]; }
        BEGIN { $s = sizeof(struct Foo); $o = offsetof(struct Foo, c); }
    "});
    assert!(diagnostics.is_empty(), "{}", messages(&diagnostics));
    let out = dump(&ast, false, Colors::OFF);
    assert!(out.contains("Integer 48"), "{out}");
    assert!(out.contains("Integer 16"), "{out}");
}

#[test]
fn probe_builtins_need_a_probe() {
    let out = resolve_messages("fn f(): int64 { return arg0; } BEGIN { f(); }");
    assert!(out.contains("Builtin arg0 not supported outside probe"), "{out}");
}

#[test]
fn unknown_function() {
    let out = resolve_messages("BEGIN { nope(1); }");
    insta::assert_snapshot!(out, @"error: Unknown function: 'nope'");
}

#[test]
fn subprogram_return_type() {
    let types = types_of(
        "fn add($a: int64, $b: int64): int64 { return $a + $b; } BEGIN { $r = add(1, 2); }",
        &["$r"],
    );
    assert_eq!(types, ["int64"]);
}

#[test]
fn fentry_args_come_from_the_provider() {
    let provider = StaticTypeProvider::default().with_probe_args(
        "fentry:vfs_read",
        vec![NamedType {
            name: "count".to_string(),
            ty: SizedType::uint(64),
        }],
    );
    let mut env = Env::default().with_provider(provider);
    let (ast, _, diagnostics) = resolve_with("fentry:vfs_read { $c = args.count; }", &mut env);
    assert!(diagnostics.is_empty(), "{}", messages(&diagnostics));
    assert_eq!(variable_type(&ast, "$c"), "uint64");
}

#[test]
fn missing_probe_args() {
    let out = resolve_messages("fentry:vfs_read { $c = args.count; }");
    assert!(out.contains("Cannot read function parameters"), "{out}");
}

#[test]
fn map_iteration() {
    let types = types_of(
        r#"BEGIN { @m["a"] = 1; for ($kv : @m) { $k = $kv.0; $v = $kv.1; } }"#,
        &["$k", "$v"],
    );
    assert_eq!(types, ["string[2]", "uint8"]);
}

#[test]
fn round_limit() {
    let source = "BEGIN { $a = 1; if comptime (sizeof($a) == 1) { $a = 2; } }";
    let (mut ast, _) = parse(source).unwrap();
    let env = Env::new(Config::default().with_max_rounds(1));
    let result = resolve_types(&mut ast, &env);
    assert!(matches!(result, Err(Error::RoundLimitExceeded { rounds: 1 })));
}

#[test]
fn resolution_is_deterministic() {
    let source = indoc! {r#"
        BEGIN {
          @x[1, "a"] = 1;
          @y = count();
          $p = &$q;
          $q = 5;
          $t = (1, "ab") == (2, "c");
        }
    "#};
    let render = || {
        let (ast, output, diagnostics) = resolve(source);
        (
            dump(&ast, true, Colors::OFF),
            format!("{:?}", output.map_types),
            messages(&diagnostics),
        )
    };
    assert_eq!(render(), render());
}

#[test]
fn analyze_reports_failures_as_errors() {
    let result = crate::analyze("BEGIN { $a = 1; $a = \"s\"; }", &mut Env::default());
    let Err(Error::ResolveFailed(diagnostics)) = result else {
        panic!("expected a resolve failure");
    };
    assert!(messages(&diagnostics).contains("Type mismatch for $a"));

    let result = crate::analyze("BEGIN { $a = ; }", &mut Env::default());
    assert!(matches!(result, Err(Error::ParseFailed(_))));
}

#[test]
fn analysis_lists_variable_types() {
    let (analysis, warnings) = crate::analyze(
        "BEGIN { $b = 1; $a = \"x\"; } END { $b = 70000; }",
        &mut Env::default(),
    )
    .unwrap();
    assert!(warnings.is_empty());

    let types: Vec<String> = analysis
        .variable_types()
        .iter()
        .map(|(name, ty)| format!("{name} {ty}"))
        .collect();
    assert_eq!(types, ["$b uint32", "$a string[2]"]);
}

use indoc::indoc;
use tracelet_core::{SizedType, StructLayout, StructRef};

use super::{Env, FunctionProto, NamedType, StaticTypeProvider, TypeProvider};
use crate::ast::AttachPoint;

#[test]
fn local_structs_shadow_provider() {
    let provider = StaticTypeProvider::default().with_struct(StructLayout::from_fields(
        "struct Foo",
        vec![("a".into(), SizedType::uint(64))],
    ));
    let mut env = Env::default().with_provider(provider);
    assert_eq!(env.lookup_struct("struct Foo").map(|l| l.size), Some(8));

    env.structs
        .define("struct Foo", vec![("b".into(), SizedType::uint(8))]);
    let layout = env.lookup_struct("struct Foo").unwrap();
    assert_eq!(layout.size, 1);
    assert!(layout.field("b").is_some());
}

#[test]
fn resolve_struct_refs_through_pointers() {
    let mut env = Env::default();
    env.structs
        .define("struct Foo", vec![("a".into(), SizedType::int(32))]);

    let ptr = SizedType::pointer(SizedType::cstruct(StructRef::unresolved("struct Foo")));
    let resolved = env.resolve_struct_refs(&ptr);
    let layout = resolved
        .pointee()
        .and_then(|t| t.struct_ref())
        .and_then(|s| s.layout.clone());
    assert_eq!(layout.map(|l| l.size), Some(4));

    let unknown = SizedType::cstruct(StructRef::unresolved("struct Nope"));
    assert!(env.resolve_struct_refs(&unknown).struct_ref().unwrap().layout.is_none());
}

#[test]
fn static_provider_from_json() {
    let json = indoc! {r#"
    {
      "structs": [
        { "name": "struct task", "size": 8,
          "fields": [{ "name": "pid", "type": "int32", "offset": 0 }] }
      ],
      "types": { "pid_t": "int32" },
      "functions": { "getpid": { "ret": "int32" } },
      "probe_args": { "fentry:vfs_read": [{ "name": "count", "type": "uint64" }] },
      "enums": { "color": { "RED": 0, "GREEN": 1 } }
    }
    "#};

    let provider = StaticTypeProvider::from_json(json).unwrap();
    assert_eq!(provider.lookup_struct("struct task").map(|l| l.size), Some(8));
    assert_eq!(provider.lookup_type("pid_t"), Some(SizedType::int(32)));
    assert_eq!(
        provider.function("getpid"),
        Some(FunctionProto {
            args: vec![],
            ret: SizedType::int(32)
        })
    );

    let attach = AttachPoint::parse("fentry:vfs_read").unwrap();
    let args = provider.probe_args(&attach).unwrap();
    insta::assert_snapshot!(args, @"record { .count = uint64 }");

    let enums = provider.enum_defs();
    assert_eq!(enums.get("GREEN"), Some((1, "color")));
    assert_eq!(enums.get("BLUE"), None);
}

#[test]
fn probe_args_prefer_full_key() {
    let provider = StaticTypeProvider::default()
        .with_probe_args(
            "tracepoint:sched:sched_switch",
            vec![NamedType {
                name: "prev_pid".into(),
                ty: SizedType::int(32),
            }],
        )
        .with_probe_args("tracepoint:sched_switch", vec![]);
    let attach = AttachPoint::parse("tracepoint:sched:sched_switch").unwrap();
    insta::assert_snapshot!(provider.probe_args(&attach).unwrap(), @"record { .prev_pid = int32 }");
}

#[test]
fn malformed_type_in_json_is_rejected() {
    let err = StaticTypeProvider::from_json(r#"{ "types": { "x": "flarp" } }"#).unwrap_err();
    assert!(err.to_string().contains("unknown type name `flarp`"));
}

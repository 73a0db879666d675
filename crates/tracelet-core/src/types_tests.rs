use std::sync::Arc;

use crate::{AggregateKind, Field, SizedType, StructLayout, StructRef};

fn ty(s: &str) -> SizedType {
    s.parse().unwrap()
}

#[test]
fn literal_ints_take_smallest_width() {
    assert_eq!(SizedType::literal_int(1, false), SizedType::uint(8));
    assert_eq!(SizedType::literal_int(255, false), SizedType::uint(8));
    assert_eq!(SizedType::literal_int(256, false), SizedType::uint(16));
    assert_eq!(SizedType::literal_int(1 << 40, false), SizedType::uint(64));
    assert_eq!(SizedType::literal_int(1, true), SizedType::int(8));
    assert_eq!(SizedType::literal_int(128, true), SizedType::int(8));
    assert_eq!(SizedType::literal_int(129, true), SizedType::int(16));
}

#[test]
fn promote_none_is_identity() {
    let t = SizedType::uint(32);
    assert_eq!(SizedType::none().promote(&t), Some(t.clone()));
    assert_eq!(t.promote(&SizedType::none()), Some(t));
}

#[test]
fn promote_integers() {
    assert_eq!(ty("uint8").promote(&ty("uint64")), Some(ty("uint64")));
    assert_eq!(ty("int16").promote(&ty("int8")), Some(ty("int16")));
    assert_eq!(ty("uint32").promote(&ty("int32")), Some(ty("int64")));
    assert_eq!(ty("uint8").promote(&ty("int16")), Some(ty("int16")));
    assert_eq!(ty("uint8").promote(&ty("int8")), Some(ty("int16")));
    assert_eq!(ty("uint64").promote(&ty("int8")), None);
}

#[test]
fn promote_strings_take_larger_size() {
    assert_eq!(ty("string[4]").promote(&ty("string[12]")), Some(ty("string[12]")));
}

#[test]
fn promote_tuples_element_wise() {
    let l = SizedType::tuple(vec![ty("int16"), ty("string[4]")]);
    let r = SizedType::tuple(vec![ty("int8"), ty("string[2]")]);
    assert_eq!(
        l.promote(&r),
        Some(SizedType::tuple(vec![ty("int16"), ty("string[4]")]))
    );

    let short = SizedType::tuple(vec![ty("int16")]);
    assert_eq!(l.promote(&short), None);
}

#[test]
fn promote_records_keeps_left_field_order() {
    let l = SizedType::record(vec![
        Field::new("d", ty("uint8")),
        Field::new("a", ty("int64")),
    ]);
    let r = SizedType::record(vec![
        Field::new("a", ty("uint8")),
        Field::new("d", ty("int16")),
    ]);

    let promoted = l.promote(&r).unwrap();
    insta::assert_snapshot!(promoted, @"record { .d = int16, .a = int64 }");
}

#[test]
fn promote_castable_aggregate_with_integer() {
    let count = SizedType::aggregate(AggregateKind::Count, false);
    assert_eq!(ty("uint8").promote(&count), Some(ty("uint64")));

    let hist = SizedType::aggregate(AggregateKind::Hist, false);
    assert_eq!(ty("uint8").promote(&hist), None);
}

#[test]
fn promote_same_aggregate_kind_keeps_sign() {
    let usum = SizedType::aggregate(AggregateKind::Sum, false);
    let sum = SizedType::aggregate(AggregateKind::Sum, true);
    let min = SizedType::aggregate(AggregateKind::Min, true);

    assert_eq!(usum.promote(&sum), Some(sum.clone()));
    assert_eq!(sum.promote(&min), None);
}

#[test]
fn promote_keeps_left_marks() {
    let l = ty("uint8").with_ctx_access(true);
    let promoted = l.promote(&ty("uint32")).unwrap();
    assert!(promoted.ctx_access);
}

#[test]
fn pointers_only_promote_when_equal() {
    assert_eq!(ty("uint8 *").promote(&ty("uint8 *")), Some(ty("uint8 *")));
    assert_eq!(ty("uint8 *").promote(&ty("uint32 *")), None);
}

#[test]
fn fits_into() {
    assert!(ty("uint16").fits_into(&ty("uint32")));
    assert!(ty("uint16").fits_into(&ty("int32")));
    assert!(!ty("uint32").fits_into(&ty("int32")));
    assert!(!ty("int8").fits_into(&ty("uint32")));
    assert!(!ty("uint64").fits_into(&ty("uint32")));
    assert!(ty("string[2]").fits_into(&ty("string[14]")));
    assert!(!ty("string[14]").fits_into(&ty("string[2]")));
}

#[test]
fn equality_ignores_marks() {
    let plain = ty("uint64");
    let marked = ty("uint64").with_ctx_access(true).with_internal(true);
    assert_eq!(plain, marked);
}

#[test]
fn typestr() {
    let tuple = SizedType::tuple(vec![ty("uint8"), ty("string[4]")]);
    let record = SizedType::record(vec![
        Field::new("a", ty("uint8")),
        Field::new("b", ty("int64")),
    ]);

    insta::assert_snapshot!(tuple, @"(uint8,string[4])");
    insta::assert_snapshot!(record, @"record { .a = uint8, .b = int64 }");
    insta::assert_snapshot!(ty("uint8 *"), @"uint8 *");
    insta::assert_snapshot!(ty("uint8 **"), @"uint8 **");
    insta::assert_snapshot!(ty("struct task_struct *"), @"struct task_struct *");
    insta::assert_snapshot!(SizedType::aggregate(AggregateKind::Sum, false), @"usum_t");
    insta::assert_snapshot!(SizedType::aggregate(AggregateKind::Count, false), @"count_t");
}

#[test]
fn base_names() {
    assert_eq!(ty("uint8").base_name(), "int");
    assert_eq!(ty("string[3]").base_name(), "string");
    assert_eq!(ty("struct foo").base_name(), "c_struct");
    assert_eq!(ty("int8 *").base_name(), "pointer");
}

#[test]
fn parse_c_spellings() {
    assert_eq!(ty("unsigned int"), SizedType::uint(32));
    assert_eq!(ty("unsigned long long"), SizedType::uint(64));
    assert_eq!(ty("char"), SizedType::int(8));
    assert_eq!(ty("int8[4]"), SizedType::array(SizedType::int(8), 4));
    assert!("frobnicate".parse::<SizedType>().is_err());
}

#[test]
fn struct_layout_uses_natural_alignment() {
    let layout = StructLayout::from_fields(
        "struct Foo",
        vec![
            ("x".to_string(), ty("int")),
            ("l".to_string(), ty("long")),
            ("c".to_string(), ty("char")),
        ],
    );

    let offsets: Vec<_> = layout.fields.iter().map(|f| f.offset).collect();
    assert_eq!(offsets, [0, 8, 16]);
    assert_eq!(layout.size, 24);

    let sref = StructRef::resolved(Arc::new(layout));
    assert_eq!(SizedType::cstruct(sref).size(), 24);
}

#[test]
fn tuple_size_and_offsets() {
    let t = SizedType::tuple(vec![ty("uint8"), ty("uint64")]);
    assert_eq!(t.element_offsets(), [0, 8]);
    assert_eq!(t.size(), 16);
}

#[test]
fn serde_uses_type_strings() {
    let json = serde_json::to_string(&ty("struct foo *")).unwrap();
    assert_eq!(json, r#""struct foo *""#);

    let back: SizedType = serde_json::from_str(r#""uint16""#).unwrap();
    assert_eq!(back, SizedType::uint(16));
}

use tracelet_compiler::{Env, analyze};

use super::types::TypeTable;

fn table(source: &str) -> TypeTable {
    let (analysis, _) = analyze(source, &mut Env::default()).unwrap();
    TypeTable::new(&analysis)
}

#[test]
fn plain_table() {
    let table = table(r#"BEGIN { @start[1, "a"] = 5; @n = count(); $x = 1; $x = 300; }"#);
    insta::assert_snapshot!(table.render(), @r"
    @start  [(uint8,string[2])] -> uint8
    @n      [int64] -> count_t
    $x      uint16
    ");
}

#[test]
fn json_table() {
    let table = table("BEGIN { @m[2] = 1; $s = \"hi\"; }");
    let json = serde_json::to_string(&table).unwrap();
    insta::assert_snapshot!(
        json,
        @r#"{"maps":[{"name":"@m","key":"uint8","value":"uint8"}],"variables":[{"name":"$s","type":"string[3]"}]}"#
    );
}

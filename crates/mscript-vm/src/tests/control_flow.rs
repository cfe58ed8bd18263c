use super::helpers::{execute, ints};
use mscript_types::Value;

#[test]
fn test_if_else_chain() {
    let source = "x = 5\nif (x < 0) \"neg\"\nelse if (x == 0) \"zero\"\nelse \"pos\"";
    assert_eq!(execute(source).unwrap(), Value::from("pos"));
}

#[test]
fn test_if_without_else_is_null() {
    assert_eq!(execute("if (1 > 2) 3").unwrap(), Value::Null);
}

#[test]
fn test_for_with_state() {
    let result = execute("for (s = 0, i: [1,2,3,4]) { s = s + i; s }").unwrap();
    assert_eq!(result, Value::int(10));
}

#[test]
fn test_for_over_range() {
    let result = execute("for (p = 1, i: 1..5) { p = p * i; p }").unwrap();
    assert_eq!(result, Value::int(120));
}

#[test]
fn test_for_over_empty_container() {
    assert_eq!(execute("for (i: []) { i }").unwrap(), Value::Null);
}

#[test]
fn test_while_carries_bindings() {
    let result = execute("n = 0\nwhile (n < 3) { n = n + 1; n }").unwrap();
    assert_eq!(result, Value::int(3));
}

#[test]
fn test_switch() {
    let source = "
pick = (x) => switch x {
case 1: \"one\"
case 2, 3: \"few\"
default: \"many\"
}
[pick(1), pick(3), pick(7)]";
    let result = execute(source).unwrap();
    let expected: Value = vec![Value::from("one"), Value::from("few"), Value::from("many")].into();
    assert_eq!(result, expected);
}

#[test]
fn test_object_and_with() {
    assert_eq!(execute("o = object { a = 1; b = 2 }\no.b").unwrap(), Value::int(2));
    assert_eq!(
        execute("o = object { a = 1; b = 2 }\nwith o { a + b }").unwrap(),
        Value::int(3)
    );
    let extended = execute("base = object { a = 1 }\nobject base { b = a + 1 }").unwrap();
    assert_eq!(extended.member("a"), Value::int(1));
    assert_eq!(extended.member("b"), Value::int(2));
}

#[test]
fn test_exec_scope_allows_rebinding() {
    assert_eq!(execute("x = 1\nexec { x = 2; x }").unwrap(), Value::int(2));
}

#[test]
fn test_pack_assignment() {
    assert_eq!(execute("(a, b) = [1, 2]\na + b").unwrap(), Value::int(3));
    assert_eq!(execute("(a, -, c...) = [1, 2, 3, 4]\nc").unwrap(), ints(&[3, 4]));
}

#[test]
fn test_define_if_missing() {
    assert_eq!(execute("x = 1\nx ?= 5\nx").unwrap(), Value::int(1));
    assert_eq!(execute("y ?= 5\ny").unwrap(), Value::int(5));
}

#[test]
fn test_logic_and_coalesce() {
    assert_eq!(execute("null ?? 4").unwrap(), Value::int(4));
    assert_eq!(execute("0 or 2").unwrap(), Value::int(2));
    assert_eq!(execute("1 and 0").unwrap(), Value::int(0));
    assert_eq!(execute("not true").unwrap(), Value::Bool(false));
    assert_eq!(execute("2 > 1 ? \"a\" : \"b\"").unwrap(), Value::from("a"));
}

#[test]
fn test_constexpr() {
    assert_eq!(execute("constexpr Math.floor(7.9)").unwrap(), Value::int(7));
}

#[test]
fn test_index_map() {
    let source = "rows = [[1, 2], [3, 4]]\nrows[[1]]";
    assert_eq!(execute(source).unwrap(), ints(&[2, 4]));
}

#[test]
fn test_this_inside_with() {
    let source = "o = object { v = 7 }\nwith o { this.v }";
    assert_eq!(execute(source).unwrap(), Value::int(7));
    let this = execute("o = object { v = 7 }\nwith o { this }").unwrap();
    assert_eq!(this.member("v"), Value::int(7));
    let source = "f = (o) => with o { x = this.v; x * 2 }\nf(object { v = 3 })";
    assert_eq!(execute(source).unwrap(), Value::int(6));
}

#[test]
fn test_this_inside_object_body() {
    let built = execute("object { a = 2; b = this.a * 2 }").unwrap();
    assert_eq!(built.member("b"), Value::int(4));
}

//! Runtime library called from scripts

use super::helpers::{execute, ints};
use mscript_types::Value;

#[test]
fn test_free_higher_order_functions() {
    assert_eq!(execute("map([1, 2, 3], x => x * 10)").unwrap(), ints(&[10, 20, 30]));
    assert_eq!(
        execute("filter([1, 2, 3, 4], x => x % 2 == 0)").unwrap(),
        ints(&[2, 4])
    );
    assert_eq!(
        execute("reduce([1, 2, 3, 4], (s, x) => s + x, 0)").unwrap(),
        Value::int(10)
    );
}

#[test]
fn test_array_methods_with_callbacks() {
    assert_eq!(
        execute("[3, 4, 5].map((x, i) => x * i)").unwrap(),
        ints(&[0, 4, 10])
    );
    assert_eq!(execute("[1, 5, 9].find(x => x > 3)").unwrap(), Value::int(5));
    assert_eq!(execute("[1, 5, 9].findIndex(x => x > 6)").unwrap(), Value::int(2));
    assert_eq!(
        execute("[1, 2, 3].reduce((s, x) => s * x)").unwrap(),
        Value::int(6)
    );
}

#[test]
fn test_sort() {
    assert_eq!(execute("[3, 1, 2].sort()").unwrap(), ints(&[1, 2, 3]));
    assert_eq!(
        execute("[3, 1, 2].sort((a, b) => b - a)").unwrap(),
        ints(&[3, 2, 1])
    );
}

#[test]
fn test_generated_arrays() {
    assert_eq!(
        execute("sq = vtarray((i) => i * i, 3)\nsq[2]").unwrap(),
        Value::int(9)
    );
    assert_eq!(
        execute("vtarray((i) => i + 1, 3).map(x => x * 2)").unwrap(),
        ints(&[4, 6, 8])
    );
}

#[test]
fn test_typeof() {
    assert_eq!(execute("typeof(1)").unwrap(), Value::from("number"));
    assert_eq!(execute("typeof(\"s\")").unwrap(), Value::from("string"));
    assert_eq!(execute("typeof([1])").unwrap(), Value::from("array"));
}

#[test]
fn test_math() {
    assert_eq!(execute("Math.max(3, 9, 4)").unwrap(), Value::int(9));
    assert_eq!(execute("Math.abs(-4)").unwrap(), Value::int(4));
    assert_eq!(execute("Math.sqrt(16)").unwrap(), Value::float(4.0));
    let r = execute("Math.root(x => x * x - 4, 0, 5)").unwrap();
    assert!((r.get_number() - 2.0).abs() < 1e-6, "{:?}", r);
}

#[test]
fn test_string_methods() {
    assert_eq!(execute("\"Hello\".upper()").unwrap(), Value::from("HELLO"));
    assert_eq!(execute("\"  x \".trim()").unwrap(), Value::from("x"));
    assert_eq!(
        execute("\"a,b,c\".split(\",\")").unwrap(),
        vec![Value::from("a"), Value::from("b"), Value::from("c")].into()
    );
    assert_eq!(execute("\"hello\".substr(1, 3)").unwrap(), Value::from("ell"));
}

#[test]
fn test_join_and_objects() {
    assert_eq!(execute("[1, 2, 3].join(\"-\")").unwrap(), Value::from("1-2-3"));
    assert_eq!(
        execute("Object.keys(object { a = 1; b = 2 })").unwrap(),
        vec![Value::from("a"), Value::from("b")].into()
    );
}

#[test]
fn test_table_call_takes_receiver_from_arguments() {
    let o = "o = object { a = 1; b = 2 }\n";
    assert_eq!(
        execute(&format!("{}Object.values(o)", o)).unwrap(),
        vec![Value::int(1), Value::int(2)].into()
    );
    assert_eq!(execute(&format!("{}Object.size(o)", o)).unwrap(), Value::int(2));
    assert_eq!(
        execute(&format!("{}o.keys()", o)).unwrap(),
        vec![Value::from("a"), Value::from("b")].into()
    );
    assert_eq!(execute("Array.size([1, 2, 3])").unwrap(), Value::int(3));
    assert_eq!(execute("String.upper(\"ab\")").unwrap(), Value::from("AB"));
    let source = "f = (o) => Object.keys(o)\nf(object { z = 1 })";
    assert_eq!(execute(source).unwrap(), vec![Value::from("z")].into());
}

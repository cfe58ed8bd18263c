use super::helpers::{execute, ints};
use mscript_types::Value;

#[test]
fn test_single_parameter_shorthand() {
    assert_eq!(execute("sq = x => x * x\nsq(9)").unwrap(), Value::int(81));
}

#[test]
fn test_block_body() {
    let source = "f = (a, b) => {\n  s = a + b\n  s * 2\n}\nf(1, 2)";
    assert_eq!(execute(source).unwrap(), Value::int(6));
}

#[test]
fn test_recursion() {
    let source = "fact = (n) => if (n <= 1) 1 else n * fact(n - 1)\nfact(10)";
    assert_eq!(execute(source).unwrap(), Value::int(3628800));
}

#[test]
fn test_rest_parameter() {
    let source = "f = (first, rest...) => rest\nf(1, 2, 3)";
    assert_eq!(execute(source).unwrap(), ints(&[2, 3]));
}

#[test]
fn test_missing_arguments_are_undefined() {
    assert_eq!(execute("f = (a, b) => b ?? 0\nf(1)").unwrap(), Value::int(0));
}

#[test]
fn test_argument_expansion() {
    let source = "f = (a, b, c) => a + b * c\nargs = [2, 3]\nf(1, ...args)";
    assert_eq!(execute(source).unwrap(), Value::int(7));
}

#[test]
fn test_method_sees_receiver_members() {
    let source = "o = object { k = 10; get = () => k }\no.get()";
    assert_eq!(execute(source).unwrap(), Value::int(10));
}

#[test]
fn test_functions_are_values() {
    let source = "apply = (f, x) => f(x)\napply(x => x + 1, 41)";
    assert_eq!(execute(source).unwrap(), Value::int(42));
}

#[test]
fn test_function_apply() {
    assert_eq!(
        execute("add = (a, b) => a + b\nadd.apply([4, 5])").unwrap(),
        Value::int(9)
    );
}

#[test]
fn test_cast_method_call() {
    // Borrow another type's method for a value
    assert_eq!(execute("\"abc\"->Array.size()").unwrap(), Value::int(3));
}

#[test]
fn test_this_in_method_block_body() {
    let source = "o = object { v = 1; get = () => { t = this; t.v } }\no.get()";
    assert_eq!(execute(source).unwrap(), Value::int(1));
    let source = "o = object { v = 5; get = () => this.v }\no.get()";
    assert_eq!(execute(source).unwrap(), Value::int(5));
}

#[test]
fn test_this_follows_runtime_receiver() {
    let source = "f = (o) => o.get()\nf(object { v = 4; get = () => { t = this; t.v + 1 } })";
    assert_eq!(execute(source).unwrap(), Value::int(5));
}

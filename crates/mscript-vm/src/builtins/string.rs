//! `String` table
//!
//! Positions and lengths count characters, not bytes.

use super::registry::ModuleBuilder;
use super::{arg, int_arg};
use crate::error::VmError;
use crate::function::define_simple_method;
use mscript_types::Value;

fn receiver_str(receiver: &Value) -> Result<&str, VmError> {
    receiver.as_str().ok_or_else(|| {
        VmError::Runtime(format!(
            "String method called on {}",
            receiver.type_class()
        ))
    })
}

pub fn create_module() -> Value {
    let mut m = ModuleBuilder::new("String");

    m.register(
        "size",
        define_simple_method(|s, _| Ok(Value::from(receiver_str(s)?.chars().count()))),
    )
    .register(
        "reverse",
        define_simple_method(|s, _| Ok(Value::from(receiver_str(s)?.chars().rev().collect::<String>()))),
    )
    .register("indexOf", define_simple_method(index_of))
    .register("substr", define_simple_method(substr))
    .register("split", define_simple_method(split))
    .register(
        "upper",
        define_simple_method(|s, _| Ok(Value::from(receiver_str(s)?.to_uppercase()))),
    )
    .register(
        "lower",
        define_simple_method(|s, _| Ok(Value::from(receiver_str(s)?.to_lowercase()))),
    )
    .register(
        "trim",
        define_simple_method(|s, _| Ok(Value::from(receiver_str(s)?.trim()))),
    );

    m.build()
}

/// Character position of the first occurrence of the argument, or -1
fn index_of(s: &Value, args: &[Value]) -> Result<Value, VmError> {
    let text = receiver_str(s)?;
    let needle = arg(args, 0);
    let needle = match needle.as_str() {
        Some(n) => n.to_string(),
        None => needle.stringify(),
    };
    Ok(match text.find(&needle) {
        Some(byte) => Value::from(text[..byte].chars().count()),
        None => Value::int(-1),
    })
}

/// `substr(start, [length])`
fn substr(s: &Value, args: &[Value]) -> Result<Value, VmError> {
    let text = receiver_str(s)?;
    let start = int_arg(args, 0, 0).max(0) as usize;
    let len = int_arg(args, 1, i64::MAX).max(0) as usize;
    Ok(Value::from(
        text.chars().skip(start).take(len).collect::<String>(),
    ))
}

/// Pieces between separators; an empty separator splits into characters
fn split(s: &Value, args: &[Value]) -> Result<Value, VmError> {
    let text = receiver_str(s)?;
    let sep = args.first().and_then(Value::as_str).unwrap_or("");
    let parts: Value = if sep.is_empty() {
        text.chars().map(|c| Value::from(c.to_string())).collect()
    } else {
        text.split(sep).map(Value::from).collect()
    };
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::VirtualMachine;

    fn method(name: &str, receiver: &str, args: Vec<Value>) -> Value {
        let table = create_module();
        let mut vm = VirtualMachine::new();
        vm.call_function(&table.member(name), &Value::from(receiver), args)
            .unwrap();
        vm.exec().unwrap()
    }

    #[test]
    fn test_basic_methods() {
        assert_eq!(method("size", "héllo", vec![]), Value::int(5));
        assert_eq!(method("reverse", "abc", vec![]), Value::from("cba"));
        assert_eq!(method("upper", "abc", vec![]), Value::from("ABC"));
        assert_eq!(method("lower", "AbC", vec![]), Value::from("abc"));
        assert_eq!(method("trim", "  x ", vec![]), Value::from("x"));
    }

    #[test]
    fn test_index_of_counts_characters() {
        assert_eq!(method("indexOf", "äbc", vec![Value::from("c")]), Value::int(2));
        assert_eq!(method("indexOf", "abc", vec![Value::from("z")]), Value::int(-1));
    }

    #[test]
    fn test_substr_and_split() {
        assert_eq!(
            method("substr", "abcdef", vec![Value::int(2), Value::int(3)]),
            Value::from("cde")
        );
        assert_eq!(method("substr", "abcdef", vec![Value::int(4)]), Value::from("ef"));
        let parts = method("split", "a,b,,c", vec![Value::from(",")]);
        assert_eq!(parts.size(), 4);
        assert_eq!(parts.get_index(3), Value::from("c"));
        assert_eq!(method("split", "ab", vec![]).size(), 2);
    }
}

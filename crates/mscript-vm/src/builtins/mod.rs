//! Runtime library
//!
//! `create_runtime` builds the global object scripts start with: the
//! `Math` table, the type-class tables consulted when a member is missing
//! (`Array`, `String`, `Number`, `Object`, `Function`) and a handful of
//! free functions.

pub mod array;
pub mod hof;
pub mod math;
pub mod mathex;
pub mod registry;
pub mod string;
pub mod types;

use mscript_types::{Number, Object, Value};
use std::rc::Rc;

/// Numeric value of argument `i`; a missing argument reads as NaN
pub(crate) fn number_arg(args: &[Value], i: usize) -> f64 {
    args.get(i).map(Value::get_number).unwrap_or(f64::NAN)
}

/// Integer argument with a default for missing or non-numeric values
pub(crate) fn int_arg(args: &[Value], i: usize, default: i64) -> i64 {
    match args.get(i).and_then(Value::as_number) {
        Some(n) => n.as_i64(),
        None => default,
    }
}

pub(crate) fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or_default()
}

/// Integral finite results become integers
pub(crate) fn int_or_float(x: f64) -> Value {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 9.0e15 {
        Value::Number(Number::Int(x as i64))
    } else {
        Value::float(x)
    }
}

/// Global object with the whole runtime library
pub fn create_runtime() -> Value {
    let tables = [
        ("Math", math::create_module()),
        ("Array", array::create_module()),
        ("String", string::create_module()),
        ("Number", types::create_number_module()),
        ("Object", types::create_object_module()),
        ("Function", types::create_function_module()),
    ];
    let mut members: Vec<(Rc<str>, Value)> = tables
        .into_iter()
        .map(|(name, table)| (Rc::from(name), table))
        .collect();
    members.extend(types::free_functions());
    Value::Object(Object::from_pairs(members))
}

/// `base` with the members of `extra` added (or replaced)
pub fn extend_globals(base: &Value, extra: &Value) -> Value {
    match (base.as_object(), extra.as_object()) {
        (Some(b), Some(e)) => Value::Object(b.merge(e)),
        (None, Some(_)) => extra.clone(),
        _ => base.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_tables() {
        let rt = create_runtime();
        for name in ["Math", "Array", "String", "Number", "Object", "Function"] {
            assert!(rt.member(name).as_object().is_some(), "{} missing", name);
        }
        for name in ["typeof", "keyof", "vtarray", "map", "reduce", "filter"] {
            assert!(crate::function::is_function(&rt.member(name)), "{} missing", name);
        }
    }

    #[test]
    fn test_int_or_float() {
        assert_eq!(int_or_float(3.0), Value::int(3));
        assert_eq!(int_or_float(2.5), Value::float(2.5));
        assert!(int_or_float(f64::INFINITY).as_number().is_some_and(|n| !n.is_int()));
    }

    #[test]
    fn test_extend_globals() {
        let extra = Value::Object(Object::from_pairs([("answer".into(), Value::int(42))]));
        let globals = extend_globals(&create_runtime(), &extra);
        assert_eq!(globals.member("answer"), Value::int(42));
        assert!(globals.has_member("Math"));
    }
}

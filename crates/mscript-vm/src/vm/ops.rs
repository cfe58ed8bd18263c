//! Value operation helpers
//!
//! Unsupported operand combinations yield `null`; the only failure is a
//! string repeat past `MAX_REPEAT_BYTES`. A container paired with a scalar
//! broadcasts the operator over the container's items, keeping the operand
//! order.

use crate::error::VmError;
use mscript_types::{Array, Number, Value};
use std::cmp::Ordering;

/// Applies `f` to every item of a container
fn broadcast(container: &Value, f: &dyn Fn(&Value) -> Value) -> Value {
    match container.strip_key() {
        Value::Array(a) => a.iter().map(|item| f(&item)).collect(),
        Value::Object(o) => Value::Object(o.iter().map(|(k, v)| (k.clone(), f(v))).collect()),
        other => f(other),
    }
}

fn try_broadcast(
    container: &Value,
    f: &dyn Fn(&Value) -> Result<Value, VmError>,
) -> Result<Value, VmError> {
    Ok(match container.strip_key() {
        Value::Array(a) => a.iter().map(|item| f(&item)).collect::<Result<Value, _>>()?,
        Value::Object(o) => Value::Object(
            o.iter()
                .map(|(k, v)| f(v).map(|item| (k.clone(), item)))
                .collect::<Result<_, VmError>>()?,
        ),
        other => f(other)?,
    })
}

fn is_array_like(v: &Value) -> bool {
    matches!(v, Value::Array(_) | Value::Object(_))
}

fn is_scalar(v: &Value) -> bool {
    matches!(
        v,
        Value::Bool(_) | Value::Number(_) | Value::String(_)
    )
}

fn num_add(a: Number, b: Number) -> Value {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => match x.checked_add(y) {
            Some(r) => Value::int(r),
            None => Value::float(x as f64 + y as f64),
        },
        _ => Value::float(a.as_f64() + b.as_f64()),
    }
}

fn num_sub(a: Number, b: Number) -> Value {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => match x.checked_sub(y) {
            Some(r) => Value::int(r),
            None => Value::float(x as f64 - y as f64),
        },
        _ => Value::float(a.as_f64() - b.as_f64()),
    }
}

fn num_mult(a: Number, b: Number) -> Value {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => match x.checked_mul(y) {
            Some(r) => Value::int(r),
            None => Value::float(x as f64 * y as f64),
        },
        _ => Value::float(a.as_f64() * b.as_f64()),
    }
}

/// Integer result only when the division is exact
fn num_div(a: Number, b: Number) -> Value {
    if let (Number::Int(x), Number::Int(y)) = (a, b) {
        if y != 0 && x.checked_rem(y) == Some(0) {
            if let Some(q) = x.checked_div(y) {
                return Value::int(q);
            }
        }
    }
    Value::float(a.as_f64() / b.as_f64())
}

fn num_mod(a: Number, b: Number) -> Value {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => match x.checked_rem(y) {
            Some(r) => Value::int(r),
            None if y == 0 => Value::float(f64::NAN),
            None => Value::int(0),
        },
        _ => Value::float(a.as_f64() % b.as_f64()),
    }
}

fn num_pow(a: Number, b: Number) -> Value {
    if let (Number::Int(x), Number::Int(y)) = (a, b) {
        if let Ok(exp) = u32::try_from(y) {
            if let Some(r) = x.checked_pow(exp) {
                return Value::int(r);
            }
        }
    }
    Value::float(a.as_f64().powf(b.as_f64()))
}

/// Numeric view of numbers and booleans
fn numeric(v: &Value) -> Option<Number> {
    match v {
        Value::Number(n) => Some(*n),
        Value::Bool(b) => Some(Number::Int(i64::from(*b))),
        _ => None,
    }
}

/// Implementation of value operations for the VM
pub(crate) struct ValueOperations;

impl ValueOperations {
    pub(crate) fn add(left: &Value, right: &Value) -> Value {
        let (a, b) = (left.strip_key(), right.strip_key());
        if !b.has_value() {
            return b.clone();
        }
        match a {
            Value::Undefined | Value::Null => a.clone(),
            Value::Bool(x) => Value::Bool(*x || b.truthy()),
            Value::String(s) => Value::from(format!("{}{}", s, b)),
            Value::Number(x) => match b {
                Value::String(s) => Value::from(format!("{}{}", a, s)),
                _ if is_array_like(b) => broadcast(b, &|item| Self::add(a, item)),
                _ => numeric(b).map(|y| num_add(*x, y)).unwrap_or(Value::Null),
            },
            Value::Array(x) => match b {
                Value::Array(y) => Value::Array(x.concat(y)),
                _ if is_scalar(b) => broadcast(a, &|item| Self::add(item, b)),
                _ => Value::Null,
            },
            Value::Object(x) => match b {
                Value::Object(y) => Value::Object(x.merge(y)),
                _ if is_scalar(b) => broadcast(a, &|item| Self::add(item, b)),
                _ => Value::Null,
            },
            _ => Value::Null,
        }
    }

    pub(crate) fn sub(left: &Value, right: &Value) -> Value {
        let (a, b) = (left.strip_key(), right.strip_key());
        if !b.has_value() {
            return b.clone();
        }
        match a {
            Value::Undefined | Value::Null => a.clone(),
            Value::Bool(x) => Value::Bool(*x && !b.truthy()),
            Value::Number(x) => match b {
                _ if is_array_like(b) => broadcast(b, &|item| Self::sub(a, item)),
                _ => numeric(b).map(|y| num_sub(*x, y)).unwrap_or(Value::Null),
            },
            Value::String(s) => match b {
                Value::String(t) => Value::from(s.replacen(&**t, "", 1)),
                _ => Value::Null,
            },
            Value::Array(x) => match b {
                Value::Array(y) => x
                    .iter()
                    .filter(|item| !y.iter().any(|r| r == *item))
                    .collect(),
                _ if is_scalar(b) => broadcast(a, &|item| Self::sub(item, b)),
                _ => Value::Null,
            },
            Value::Object(x) => match b {
                Value::Object(y) => Value::Object(x.without(y.keys().map(|k| &**k))),
                Value::Array(keys) => {
                    let names: Vec<Value> = keys.to_vec();
                    Value::Object(x.without(names.iter().filter_map(|k| k.as_str())))
                }
                _ if is_scalar(b) => broadcast(a, &|item| Self::sub(item, b)),
                _ => Value::Null,
            },
            _ => Value::Null,
        }
    }

    pub(crate) fn mult(left: &Value, right: &Value) -> Result<Value, VmError> {
        let (a, b) = (left.strip_key(), right.strip_key());
        if !b.has_value() {
            return Ok(b.clone());
        }
        Ok(match a {
            Value::Undefined | Value::Null => a.clone(),
            Value::Bool(x) => Value::Bool(*x && b.truthy()),
            Value::Number(x) => match b {
                Value::String(s) => repeat(s, x.as_i64())?,
                _ if is_array_like(b) => try_broadcast(b, &|item| Self::mult(a, item))?,
                _ => numeric(b).map(|y| num_mult(*x, y)).unwrap_or(Value::Null),
            },
            Value::String(s) => match b {
                Value::Number(n) => repeat(s, n.as_i64())?,
                _ => Value::Null,
            },
            Value::Array(_) | Value::Object(_) if is_scalar(b) => {
                try_broadcast(a, &|item| Self::mult(item, b))?
            }
            _ => Value::Null,
        })
    }

    pub(crate) fn div(left: &Value, right: &Value) -> Value {
        let (a, b) = (left.strip_key(), right.strip_key());
        if !b.has_value() {
            return b.clone();
        }
        match a {
            Value::Undefined | Value::Null => a.clone(),
            Value::Bool(x) => Value::Bool(*x && !b.truthy()),
            Value::Number(x) => match b {
                _ if is_array_like(b) => broadcast(b, &|item| Self::div(a, item)),
                _ => numeric(b).map(|y| num_div(*x, y)).unwrap_or(Value::Null),
            },
            Value::Array(_) | Value::Object(_) if is_scalar(b) => {
                broadcast(a, &|item| Self::div(item, b))
            }
            _ => Value::Null,
        }
    }

    pub(crate) fn modulo(left: &Value, right: &Value) -> Value {
        Self::numeric_binary(left, right, num_mod, Self::modulo)
    }

    pub(crate) fn power(left: &Value, right: &Value) -> Value {
        Self::numeric_binary(left, right, num_pow, Self::power)
    }

    /// Shared shape of purely numeric operators with broadcasting
    fn numeric_binary(
        left: &Value,
        right: &Value,
        op: fn(Number, Number) -> Value,
        recurse: fn(&Value, &Value) -> Value,
    ) -> Value {
        let (a, b) = (left.strip_key(), right.strip_key());
        if !b.has_value() {
            return b.clone();
        }
        match (a, b) {
            (Value::Undefined | Value::Null, _) => a.clone(),
            (_, _) if is_array_like(b) && !is_array_like(a) => {
                broadcast(b, &|item| recurse(a, item))
            }
            (_, _) if is_array_like(a) && !is_array_like(b) => {
                broadcast(a, &|item| recurse(item, b))
            }
            _ => match (numeric(a), numeric(b)) {
                (Some(x), Some(y)) => op(x, y),
                _ => Value::Null,
            },
        }
    }

    /// Negates numbers, reverses strings and arrays
    pub(crate) fn unary_minus(value: &Value) -> Value {
        match value.strip_key() {
            Value::Number(Number::Int(i)) => match i.checked_neg() {
                Some(n) => Value::int(n),
                None => Value::float(-(*i as f64)),
            },
            Value::Number(Number::Float(f)) => Value::float(-f),
            Value::Bool(b) => Value::Bool(!b),
            Value::String(s) => Value::from(s.chars().rev().collect::<String>()),
            Value::Array(a) => Value::Array(a.reversed()),
            other => other.clone(),
        }
    }

    pub(crate) fn not(value: &Value) -> Value {
        Value::Bool(!value.truthy())
    }

    /// `a and b`: `a` when it is falsy, otherwise `b`
    pub(crate) fn bool_and(left: &Value, right: &Value) -> Value {
        if left.truthy() {
            right.clone()
        } else {
            left.clone()
        }
    }

    pub(crate) fn bool_or(left: &Value, right: &Value) -> Value {
        if left.truthy() {
            left.clone()
        } else {
            right.clone()
        }
    }

    /// `a..b` as a lazy range
    pub(crate) fn mkrange(left: &Value, right: &Value) -> Value {
        match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => Value::Array(Array::range(a.as_i64(), b.as_i64())),
            _ => Value::Undefined,
        }
    }

    /// True when `index` is outside `container`
    pub(crate) fn out_of_bounds(container: &Value, index: &Value) -> bool {
        match index.as_number() {
            Some(n) => {
                let i = n.as_i64();
                i < 0 || i as u64 >= container.size() as u64
            }
            None => true,
        }
    }

    pub(crate) fn compare(op: ComparisonOp, left: &Value, right: &Value) -> Value {
        let ord = left.compare(right);
        Value::Bool(match op {
            ComparisonOp::Eq => ord == Ordering::Equal,
            ComparisonOp::NotEq => ord != Ordering::Equal,
            ComparisonOp::Less => ord == Ordering::Less,
            ComparisonOp::Greater => ord == Ordering::Greater,
            ComparisonOp::LessEq => ord != Ordering::Greater,
            ComparisonOp::GreaterEq => ord != Ordering::Less,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ComparisonOp {
    Eq,
    NotEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
}

/// Largest string `"s" * n` may build
pub(crate) const MAX_REPEAT_BYTES: usize = 1 << 26;

fn repeat(s: &str, count: i64) -> Result<Value, VmError> {
    let n = usize::try_from(count).unwrap_or(0);
    match s.len().checked_mul(n) {
        Some(bytes) if bytes <= MAX_REPEAT_BYTES => Ok(Value::from(s.repeat(n))),
        _ => Err(VmError::Runtime(format!(
            "String repeat of {} bytes times {} exceeds {} bytes",
            s.len(),
            count,
            MAX_REPEAT_BYTES
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mscript_types::Object;

    fn arr(items: &[i64]) -> Value {
        items.iter().map(|i| Value::int(*i)).collect()
    }

    #[test]
    fn test_int_float_arithmetic() {
        assert!(matches!(
            ValueOperations::add(&Value::int(2), &Value::int(3)),
            Value::Number(Number::Int(5))
        ));
        assert!(matches!(
            ValueOperations::div(&Value::int(6), &Value::int(3)),
            Value::Number(Number::Int(2))
        ));
        assert_eq!(
            ValueOperations::div(&Value::int(7), &Value::int(2)),
            Value::float(3.5)
        );
        assert_eq!(
            ValueOperations::power(&Value::int(2), &Value::int(10)),
            Value::int(1024)
        );
        assert_eq!(
            ValueOperations::modulo(&Value::float(5.5), &Value::int(2)),
            Value::float(1.5)
        );
    }

    #[test]
    fn test_string_forms() {
        assert_eq!(
            ValueOperations::add(&Value::from("a"), &Value::int(1)),
            Value::from("a1")
        );
        assert_eq!(
            ValueOperations::add(&Value::int(1), &Value::from("a")),
            Value::from("1a")
        );
        assert_eq!(
            ValueOperations::mult(&Value::from("ab"), &Value::int(3)).unwrap(),
            Value::from("ababab")
        );
        assert_eq!(
            ValueOperations::unary_minus(&Value::from("abc")),
            Value::from("cba")
        );
    }

    #[test]
    fn test_broadcast_keeps_operand_order() {
        assert_eq!(
            ValueOperations::div(&Value::int(12), &arr(&[2, 3])),
            arr(&[6, 4])
        );
        assert_eq!(
            ValueOperations::div(&arr(&[2, 4]), &Value::int(2)),
            arr(&[1, 2])
        );
        assert_eq!(
            ValueOperations::sub(&Value::int(10), &arr(&[1, 2])),
            arr(&[9, 8])
        );
        assert_eq!(
            ValueOperations::power(&arr(&[2, 3]), &Value::int(2)),
            arr(&[4, 9])
        );
    }

    #[test]
    fn test_container_merge_and_remove() {
        assert_eq!(
            ValueOperations::add(&arr(&[1]), &arr(&[2, 3])),
            arr(&[1, 2, 3])
        );
        assert_eq!(
            ValueOperations::sub(&arr(&[1, 2, 3, 2]), &arr(&[2])),
            arr(&[1, 3])
        );
        let o = Value::Object(Object::from_pairs([
            ("a".into(), Value::int(1)),
            ("b".into(), Value::int(2)),
        ]));
        let less = ValueOperations::sub(&o, &Value::from(vec![Value::from("a")]));
        assert_eq!(less.size(), 1);
        assert!(less.has_member("b"));
    }

    #[test]
    fn test_undefined_right_operand_propagates() {
        assert!(!ValueOperations::add(&Value::int(1), &Value::Undefined).is_defined());
        assert_eq!(
            ValueOperations::mult(&Value::int(1), &Value::Null).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_bounds() {
        let a = arr(&[1, 2]);
        assert!(!ValueOperations::out_of_bounds(&a, &Value::int(1)));
        assert!(ValueOperations::out_of_bounds(&a, &Value::int(2)));
        assert!(ValueOperations::out_of_bounds(&a, &Value::int(-1)));
    }

    #[test]
    fn test_string_repeat_is_bounded() {
        let ab = Value::from("ab");
        assert!(matches!(
            ValueOperations::mult(&ab, &Value::int(i64::MAX)),
            Err(VmError::Runtime(_))
        ));
        assert!(ValueOperations::mult(&Value::int(9_999_999_999_999), &ab).is_err());
        assert!(ValueOperations::mult(&arr(&[1, 2]), &Value::from("x")).is_ok());
        assert_eq!(
            ValueOperations::mult(&ab, &Value::int(-2)).unwrap(),
            Value::from("")
        );
    }
}

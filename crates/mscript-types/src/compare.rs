//! Equality and ordering
//!
//! `compare` is the single three-way primitive used by every comparison
//! opcode and by switch-label matching. `strict_eq`/`strict_hash` are the
//! identity used for constant-pool deduplication: there `1` and `1.0` are
//! different constants.

use crate::native::Native;
use crate::value::{Number, Value};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Undefined | Value::Keyed(_) => 0,
        Value::Null => 1,
        Value::Bool(_) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
        Value::Native(_) => 7,
    }
}

fn compare_numbers(a: Number, b: Number) -> Ordering {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x.cmp(&y),
        _ => a.as_f64().total_cmp(&b.as_f64()),
    }
}

fn compare_natives(a: &Native, b: &Native) -> Ordering {
    if a.ptr_eq(b) {
        Ordering::Equal
    } else {
        a.address().cmp(&b.address())
    }
}

impl Value {
    /// Total order: type rank first, then by content
    pub fn compare(&self, other: &Value) -> Ordering {
        let (a, b) = (self.strip_key(), other.strip_key());
        match (a, b) {
            (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
            (Value::Number(x), Value::Number(y)) => compare_numbers(*x, *y),
            (Value::String(x), Value::String(y)) => x.cmp(y),
            (Value::Array(x), Value::Array(y)) => {
                if x.ptr_eq(y) && x.len() == y.len() {
                    return Ordering::Equal;
                }
                for (i, j) in x.iter().zip(y.iter()) {
                    let c = i.compare(&j);
                    if c != Ordering::Equal {
                        return c;
                    }
                }
                x.len().cmp(&y.len())
            }
            (Value::Object(x), Value::Object(y)) => {
                if x.ptr_eq(y) {
                    return Ordering::Equal;
                }
                for ((ka, va), (kb, vb)) in x.iter().zip(y.iter()) {
                    let c = ka.cmp(kb).then_with(|| va.compare(vb));
                    if c != Ordering::Equal {
                        return c;
                    }
                }
                x.len().cmp(&y.len())
            }
            (Value::Native(x), Value::Native(y)) => compare_natives(x, y),
            _ => type_rank(a).cmp(&type_rank(b)),
        }
    }

    /// Identity used by the constant pool
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(Number::Int(a)), Value::Number(Number::Int(b))) => a == b,
            (Value::Number(Number::Float(a)), Value::Number(Number::Float(b))) => {
                a.to_bits() == b.to_bits()
            }
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.flags() == b.flags()
                    && a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|(x, y)| x.strict_eq(&y))
            }
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .zip(b.iter())
                        .all(|((ka, va), (kb, vb))| ka == kb && va.strict_eq(vb))
            }
            (Value::Native(a), Value::Native(b)) => a.ptr_eq(b) && a.content().strict_eq(b.content()),
            (Value::Keyed(a), Value::Keyed(b)) => a.key == b.key && a.value.strict_eq(&b.value),
            _ => false,
        }
    }

    pub fn strict_hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Bool(b) => b.hash(state),
            Value::Number(Number::Int(i)) => {
                0u8.hash(state);
                i.hash(state);
            }
            Value::Number(Number::Float(f)) => {
                1u8.hash(state);
                f.to_bits().hash(state);
            }
            Value::String(s) => s.hash(state),
            Value::Array(a) => {
                a.len().hash(state);
                for item in a.iter() {
                    item.strict_hash(state);
                }
            }
            Value::Object(o) => {
                o.len().hash(state);
                for (k, v) in o.iter() {
                    k.hash(state);
                    v.strict_hash(state);
                }
            }
            Value::Native(n) => n.address().hash(state),
            Value::Keyed(k) => {
                k.key.hash(state);
                k.value.strict_hash(state);
            }
            Value::Undefined | Value::Null => {}
        }
    }
}

/// Language equality: `1 == 1.0`, keys are ignored
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        self.compare(other) == Ordering::Equal
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Value) -> Option<Ordering> {
        Some(self.compare(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(v: &Value) -> u64 {
        let mut h = DefaultHasher::new();
        v.strict_hash(&mut h);
        h.finish()
    }

    #[test]
    fn test_int_float_equal_but_not_strict() {
        assert_eq!(Value::int(1), Value::float(1.0));
        assert!(!Value::int(1).strict_eq(&Value::float(1.0)));
        assert_ne!(hash_of(&Value::int(1)), hash_of(&Value::float(1.0)));
    }

    #[test]
    fn test_type_order() {
        assert!(Value::Null < Value::Bool(false));
        assert!(Value::int(100) < Value::from("a"));
        assert!(Value::from("b") > Value::from("a"));
    }

    #[test]
    fn test_array_lexicographic() {
        let a = Value::from(vec![Value::int(1), Value::int(2)]);
        let b = Value::from(vec![Value::int(1), Value::int(3)]);
        let c = Value::from(vec![Value::int(1)]);
        assert!(a < b);
        assert!(c < a);
        assert_eq!(a, Value::from(vec![Value::float(1.0), Value::int(2)]));
    }

    #[test]
    fn test_range_equals_flat() {
        let r = Value::Array(crate::Array::range(1, 3));
        let flat = Value::from(vec![Value::int(1), Value::int(2), Value::int(3)]);
        assert_eq!(r, flat);
    }
}

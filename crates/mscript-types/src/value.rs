use crate::array::Array;
use crate::native::{Native, NativeKind};
use crate::object::Object;
use std::rc::Rc;

/// Numeric value; integer provenance selects integer arithmetic
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    /// Integer view; floats are truncated toward zero
    pub fn as_i64(self) -> i64 {
        match self {
            Number::Int(i) => i,
            Number::Float(f) => f as i64,
        }
    }

    pub fn is_int(self) -> bool {
        matches!(self, Number::Int(_))
    }
}

/// An entry key attached to a value taken out of an object
#[derive(Debug, Clone)]
pub struct KeyedValue {
    pub key: Rc<str>,
    pub value: Value,
}

/// Runtime value
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(Number),
    String(Rc<str>),
    Array(Array),
    Object(Object),
    Native(Native),
    /// Value produced while iterating or indexing an object. All operations
    /// look through the key; `keyof` reads it.
    Keyed(Rc<KeyedValue>),
}

impl Value {
    pub fn int(i: i64) -> Self {
        Value::Number(Number::Int(i))
    }

    pub fn float(f: f64) -> Self {
        Value::Number(Number::Float(f))
    }

    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn empty_array() -> Self {
        Value::Array(Array::new())
    }

    pub fn empty_object() -> Self {
        Value::Object(Object::new())
    }

    /// Strips an attached entry key
    pub fn strip_key(&self) -> &Value {
        match self {
            Value::Keyed(k) => &k.value,
            other => other,
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Value::Keyed(k) => Some(&k.key),
            _ => None,
        }
    }

    pub fn with_key(self, key: Rc<str>) -> Value {
        let value = match self {
            Value::Keyed(k) => k.value.clone(),
            other => other,
        };
        Value::Keyed(Rc::new(KeyedValue { key, value }))
    }

    /// Name of the type-class table consulted when a member lookup misses
    pub fn type_class(&self) -> &'static str {
        match self.strip_key() {
            Value::Undefined => "Undefined",
            Value::Null => "Null",
            Value::Bool(_) => "Boolean",
            Value::Number(_) => "Number",
            Value::String(_) => "String",
            Value::Array(_) => "Array",
            Value::Object(_) => "Object",
            Value::Native(n) => match n.kind() {
                NativeKind::Function => "Function",
                NativeKind::Block => "Block",
                NativeKind::ProcArray => "Array",
            },
            Value::Keyed(_) => "Undefined",
        }
    }

    pub fn is_defined(&self) -> bool {
        !matches!(self.strip_key(), Value::Undefined)
    }

    /// Neither undefined nor null
    pub fn has_value(&self) -> bool {
        !matches!(self.strip_key(), Value::Undefined | Value::Null)
    }

    pub fn truthy(&self) -> bool {
        match self.strip_key() {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64() != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Array(a) => !a.is_empty(),
            Value::Object(o) => !o.is_empty(),
            Value::Native(_) => true,
            Value::Keyed(_) => false,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self.strip_key() {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        self.as_number().is_some()
    }

    /// Numeric view with the usual coercions; non-numbers yield 0
    pub fn get_number(&self) -> f64 {
        match self.strip_key() {
            Value::Number(n) => n.as_f64(),
            Value::Bool(true) => 1.0,
            Value::String(s) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    pub fn get_int(&self) -> i64 {
        match self.strip_key() {
            Value::Number(n) => n.as_i64(),
            Value::Bool(true) => 1,
            Value::String(s) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self.strip_key() {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self.strip_key() {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self.strip_key() {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_native(&self) -> Option<&Native> {
        match self.strip_key() {
            Value::Native(n) => Some(n),
            _ => None,
        }
    }

    pub fn is_native(&self, kind: NativeKind) -> bool {
        self.as_native().map(|n| n.kind() == kind).unwrap_or(false)
    }

    /// Arrays (including proc-arrays) and objects
    pub fn is_container(&self) -> bool {
        match self.strip_key() {
            Value::Array(_) | Value::Object(_) => true,
            Value::Native(n) => n.kind() == NativeKind::ProcArray,
            _ => false,
        }
    }

    pub fn is_param_pack(&self) -> bool {
        matches!(self, Value::Array(a) if a.is_param_pack())
    }

    /// Element count of a container, character count of a string
    pub fn size(&self) -> usize {
        match self.strip_key() {
            Value::Array(a) => a.len(),
            Value::Object(o) => o.len(),
            Value::String(s) => s.chars().count(),
            Value::Native(n) => n.content().size(),
            _ => 0,
        }
    }

    /// Positional access. Objects yield their nth entry as a keyed value,
    /// strings yield a one-character string.
    pub fn get_index(&self, index: usize) -> Value {
        match self.strip_key() {
            Value::Array(a) => a.get(index).unwrap_or_default(),
            Value::Object(o) => o
                .entry_at(index)
                .map(|(k, v)| v.clone().with_key(k.clone()))
                .unwrap_or_default(),
            Value::String(s) => s
                .chars()
                .nth(index)
                .map(|c| Value::string(c.to_string()))
                .unwrap_or_default(),
            Value::Native(n) => n.content().get_index(index),
            _ => Value::Undefined,
        }
    }

    /// Named member of an object (or of a native's content)
    pub fn member(&self, name: &str) -> Value {
        match self.strip_key() {
            Value::Object(o) => o.get(name).cloned().unwrap_or_default(),
            Value::Native(n) => n.content().member(name),
            _ => Value::Undefined,
        }
    }

    pub fn has_member(&self, name: &str) -> bool {
        match self.strip_key() {
            Value::Object(o) => o.get(name).is_some(),
            Value::Native(n) => n.content().has_member(name),
            _ => false,
        }
    }

    /// Index by a value: numbers select positions, strings select members
    pub fn lookup(&self, key: &Value) -> Value {
        match key.strip_key() {
            Value::Number(n) => {
                let i = n.as_i64();
                if i < 0 {
                    Value::Undefined
                } else {
                    self.get_index(i as usize)
                }
            }
            Value::String(s) => self.member(s),
            _ => Value::Undefined,
        }
    }

    /// Elements of a container in order; scalars yield nothing
    pub fn elements(&self) -> Vec<Value> {
        match self.strip_key() {
            Value::Array(a) => a.to_vec(),
            Value::Object(o) => o
                .iter()
                .map(|(k, v)| v.clone().with_key(k.clone()))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Drops the parameter-pack flag, turning a pack into an ordinary value:
    /// a one-item pack becomes its item, anything else a plain array
    pub fn unpack(self) -> Value {
        match self {
            Value::Array(a) if a.is_param_pack() || a.is_marker() => {
                if a.len() == 1 {
                    a.get(0).unwrap_or_default().unpack()
                } else {
                    Value::Array(a.with_flags(0))
                }
            }
            other => other,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::int(i as i64)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::int(i)
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::float(f)
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Array(Array::from_vec(v))
    }
}

impl From<Array> for Value {
    fn from(a: Array) -> Self {
        Value::Array(a)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<Native> for Value {
    fn from(n: Native) -> Self {
        Value::Native(n)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Value::Array(Array::from_vec(iter.into_iter().collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Undefined.truthy());
        assert!(!Value::Null.truthy());
        assert!(!Value::int(0).truthy());
        assert!(Value::float(0.5).truthy());
        assert!(!Value::from("").truthy());
        assert!(Value::from(vec![Value::Null]).truthy());
        assert!(!Value::empty_object().truthy());
    }

    #[test]
    fn test_keyed_values_look_through() {
        let v = Value::int(5).with_key(Rc::from("a"));
        assert_eq!(v.key(), Some("a"));
        assert_eq!(v.get_int(), 5);
        assert_eq!(v.type_class(), "Number");
        let rekeyed = v.with_key(Rc::from("b"));
        assert_eq!(rekeyed.key(), Some("b"));
        assert_eq!(rekeyed.strip_key().get_int(), 5);
    }

    #[test]
    fn test_object_positional_access_is_keyed() {
        let obj = Value::Object(Object::from_pairs(vec![
            ("x".into(), Value::int(1)),
            ("y".into(), Value::int(2)),
        ]));
        let second = obj.get_index(1);
        assert_eq!(second.key(), Some("y"));
        assert_eq!(second.get_int(), 2);
        assert!(!obj.get_index(2).is_defined());
    }

    #[test]
    fn test_unpack_param_pack() {
        let single = Value::Array(Array::from_vec(vec![Value::int(3)]).with_flags(crate::PARAM_PACK));
        assert_eq!(single.unpack().get_int(), 3);
        let pair = Value::Array(
            Array::from_vec(vec![Value::int(1), Value::int(2)]).with_flags(crate::PARAM_PACK),
        );
        let unpacked = pair.unpack();
        assert!(!unpacked.is_param_pack());
        assert_eq!(unpacked.size(), 2);
    }

    #[test]
    fn test_string_indexing() {
        let s = Value::from("héllo");
        assert_eq!(s.size(), 5);
        assert_eq!(s.get_index(1).as_str(), Some("é"));
        assert!(!s.get_index(9).is_defined());
    }

    #[test]
    fn test_number_provenance_compares() {
        assert_eq!(Value::int(3).as_number(), Some(Number::Int(3)));
        assert_eq!(Value::float(3.0).as_number(), Some(Number::Float(3.0)));
        assert_ne!(Number::Int(3), Number::Float(3.0));
    }

    #[test]
    fn test_native_content_nests() {
        let inner = Value::Native(Native::new(NativeKind::Block, 1u8, Value::from("in")));
        let outer = Native::new(NativeKind::Function, 2u8, Value::from(vec![inner.clone()]));
        assert_eq!(outer.content().size(), 1);
        let swapped = outer.with_content(inner);
        assert!(swapped.ptr_eq(&outer));
        assert_eq!(swapped.content().as_native().map(|n| n.kind()), Some(NativeKind::Block));
    }
}

//! Text forms of values and JSON interop

use crate::native::NativeKind;
use crate::object::Object;
use crate::value::{Number, Value};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt::{self, Write};
use std::rc::Rc;

fn write_number(out: &mut String, n: Number) {
    match n {
        Number::Int(i) => {
            let _ = write!(out, "{}", i);
        }
        Number::Float(f) if f.is_finite() => {
            let _ = write!(out, "{}", f);
        }
        Number::Float(f) if f.is_nan() => out.push_str("NaN"),
        Number::Float(f) if f > 0.0 => out.push_str("Infinity"),
        Number::Float(_) => out.push_str("-Infinity"),
    }
}

fn write_string(out: &mut String, s: &str) {
    match serde_json::to_string(s) {
        Ok(quoted) => out.push_str(&quoted),
        Err(_) => {
            out.push('"');
            out.push_str(s);
            out.push('"');
        }
    }
}

fn write_value(out: &mut String, v: &Value) {
    match v.strip_key() {
        Value::Undefined => out.push_str("undefined"),
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(out, *n),
        Value::String(s) => write_string(out, s),
        Value::Array(a) => {
            out.push('[');
            for (i, item) in a.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, &item);
            }
            out.push(']');
        }
        Value::Object(o) => {
            out.push('{');
            for (i, (k, item)) in o.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, k);
                out.push(':');
                write_value(out, item);
            }
            out.push('}');
        }
        Value::Native(n) => match n.kind() {
            NativeKind::Block => out.push_str("<block>"),
            NativeKind::Function => out.push_str("<function>"),
            NativeKind::ProcArray => {
                let _ = write!(out, "<vtarray:{}>", n.content().size());
            }
        },
        Value::Keyed(_) => out.push_str("undefined"),
    }
}

impl Value {
    /// JSON-like text; strings are quoted
    pub fn stringify(&self) -> String {
        let mut out = String::new();
        write_value(&mut out, self);
        out
    }

    /// `stringify` cut to `max` characters with a trailing `...`
    pub fn stringify_short(&self, max: usize) -> String {
        let s = self.stringify();
        if s.chars().count() > max {
            let mut cut: String = s.chars().take(max).collect();
            cut.push_str("...");
            cut
        } else {
            s
        }
    }
}

/// Strings print raw, everything else prints as `stringify`
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.strip_key() {
            Value::String(s) => f.write_str(s),
            other => f.write_str(&other.stringify()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.strip_key() {
            Value::Undefined | Value::Null | Value::Keyed(_) => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(Number::Int(i)) => serializer.serialize_i64(*i),
            Value::Number(Number::Float(f)) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(a) => {
                let mut seq = serializer.serialize_seq(Some(a.len()))?;
                for item in a.iter() {
                    seq.serialize_element(&item)?;
                }
                seq.end()
            }
            Value::Object(o) => {
                let mut map = serializer.serialize_map(Some(o.len()))?;
                for (k, v) in o.iter() {
                    map.serialize_entry(&**k, v)?;
                }
                map.end()
            }
            Value::Native(_) => serializer.serialize_str(&self.stringify()),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::int(i),
                None => Value::float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::from(s),
            serde_json::Value::Array(items) => items.into_iter().map(Value::from).collect(),
            serde_json::Value::Object(map) => Value::Object(Object::from_pairs(
                map.into_iter().map(|(k, v)| (Rc::from(k), Value::from(v))),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stringify_nested() {
        let v = Value::Object(Object::from_pairs(vec![
            ("a".into(), Value::from(vec![Value::int(1), Value::float(2.5)])),
            ("b".into(), Value::from("x\"y")),
        ]));
        assert_eq!(v.stringify(), r#"{"a":[1,2.5],"b":"x\"y"}"#);
    }

    #[test]
    fn test_display_raw_strings() {
        assert_eq!(Value::from("hi").to_string(), "hi");
        assert_eq!(Value::Undefined.to_string(), "undefined");
    }

    #[test]
    fn test_stringify_short() {
        let v = Value::from("abcdefgh");
        assert_eq!(v.stringify_short(4), "\"abc...");
    }

    #[test]
    fn test_json_round_trip() {
        let json: serde_json::Value = serde_json::json!({"x": [1, 2.5, "s"], "y": null});
        let v = Value::from(json.clone());
        assert_eq!(serde_json::to_value(&v).unwrap(), json);
    }
}

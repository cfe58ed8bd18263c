//! `Array` table
//!
//! Methods called on arrays (`a.push_back(x)`) resolve here through the
//! type-class fallback. Arrays are immutable: every "modifying" method
//! returns a new array.

use super::hof::{self, IterKind};
use super::registry::ModuleBuilder;
use super::{arg, int_arg};
use crate::error::VmError;
use crate::function::{define_async_method, define_simple_method};
use mscript_types::{Array, Value};

fn receiver_array(receiver: &Value) -> Result<&Array, VmError> {
    receiver.as_array().ok_or_else(|| {
        VmError::Runtime(format!(
            "Array method called on {}",
            receiver.type_class()
        ))
    })
}

/// Position in `0..=len` from a possibly negative index
fn clamp_index(index: i64, len: usize) -> usize {
    if index < 0 {
        len.saturating_sub(index.unsigned_abs() as usize)
    } else {
        (index as usize).min(len)
    }
}

pub fn create_module() -> Value {
    let mut m = ModuleBuilder::new("Array");

    m.register("size", define_simple_method(|a, _| Ok(Value::from(a.size()))))
        .register(
            "push_back",
            define_simple_method(|a, args| {
                Ok(receiver_array(a)?.push_back(arg(args, 0)).into())
            }),
        )
        .register(
            "push_front",
            define_simple_method(|a, args| {
                Ok(receiver_array(a)?.push_front(arg(args, 0)).into())
            }),
        )
        .register(
            "pop_back",
            define_simple_method(|a, _| Ok(receiver_array(a)?.pop_back().into())),
        )
        .register(
            "pop_front",
            define_simple_method(|a, _| Ok(receiver_array(a)?.pop_front().into())),
        )
        .register(
            "back",
            define_simple_method(|a, _| {
                let arr = receiver_array(a)?;
                Ok(arr.len().checked_sub(1).and_then(|i| arr.get(i)).unwrap_or_default())
            }),
        )
        .register(
            "front",
            define_simple_method(|a, _| Ok(receiver_array(a)?.get(0).unwrap_or_default())),
        )
        .register(
            "reverse",
            define_simple_method(|a, _| Ok(receiver_array(a)?.reversed().into())),
        )
        .register("indexOf", define_simple_method(index_of))
        .register("slice", define_simple_method(slice))
        .register("join", define_simple_method(join));

    m.register("find", iter_method(IterKind::Find))
        .register("findIndex", iter_method(IterKind::FindIndex))
        .register("filter", iter_method(IterKind::Filter))
        .register("map", iter_method(IterKind::Map))
        .register("reduce", iter_method(IterKind::Reduce))
        .register("sort", define_async_method(hof::sort));

    m.build()
}

fn iter_method(kind: IterKind) -> Value {
    define_async_method(move |vm, receiver, params| hof::call_method(vm, kind, receiver, params))
}

/// First position of an item equal to the argument, or -1
fn index_of(a: &Value, args: &[Value]) -> Result<Value, VmError> {
    let needle = arg(args, 0);
    let pos = receiver_array(a)?.iter().position(|item| item == needle);
    Ok(pos.map(Value::from).unwrap_or(Value::int(-1)))
}

/// `slice(start, [end])`; negative positions count from the end
fn slice(a: &Value, args: &[Value]) -> Result<Value, VmError> {
    let arr = receiver_array(a)?;
    let len = arr.len();
    let start = clamp_index(int_arg(args, 0, 0), len);
    let end = clamp_index(int_arg(args, 1, len as i64), len);
    Ok(arr.slice(start, end).into())
}

/// Items joined with a separator (`,` by default); strings are used as
/// they are, everything else is stringified
fn join(a: &Value, args: &[Value]) -> Result<Value, VmError> {
    let sep = args
        .first()
        .and_then(Value::as_str)
        .unwrap_or(",")
        .to_string();
    let parts: Vec<String> = receiver_array(a)?
        .iter()
        .map(|item| match item.as_str() {
            Some(s) => s.to_string(),
            None => item.stringify(),
        })
        .collect();
    Ok(Value::from(parts.join(&sep)))
}

//! Type inspection, the `Number`/`Object`/`Function` tables and the free
//! functions of the runtime

use super::hof::{self, IterKind};
use super::registry::ModuleBuilder;
use super::{arg, int_or_float};
use crate::error::VmError;
use crate::function::{define_async_fn, define_async_method, define_simple_fn, define_simple_method, is_function};
use mscript_types::{ProcArray, Value};
use std::rc::Rc;

/// `typeof(x)`: lower-case name of the type class
fn vm_typeof(args: &[Value]) -> Result<Value, VmError> {
    Ok(Value::from(arg(args, 0).type_class().to_lowercase()))
}

/// `keyof(x)`: the key an object item was read under
fn vm_keyof(args: &[Value]) -> Result<Value, VmError> {
    Ok(args
        .first()
        .and_then(Value::key)
        .map(Value::from)
        .unwrap_or_default())
}

/// `vtarray(fn, n)`: array of `n` items where item `i` is `fn(i + 1)`,
/// computed on every access
fn vm_vtarray(args: &[Value]) -> Result<Value, VmError> {
    let generator = arg(args, 0);
    if !is_function(&generator) {
        return Err(VmError::ArgumentIsNotFunction(generator));
    }
    let size = arg(args, 1).get_int().max(0) as usize;
    Ok(ProcArray::pack(generator, size))
}

pub(super) fn free_functions() -> Vec<(Rc<str>, Value)> {
    let free = |kind: IterKind| define_async_fn(move |vm, params| hof::call_free(vm, kind, params));
    vec![
        ("typeof".into(), define_simple_fn(vm_typeof)),
        ("keyof".into(), define_simple_fn(vm_keyof)),
        ("vtarray".into(), define_simple_fn(vm_vtarray)),
        ("map".into(), free(IterKind::Map)),
        ("reduce".into(), free(IterKind::Reduce)),
        ("filter".into(), free(IterKind::Filter)),
    ]
}

pub fn create_number_module() -> Value {
    let mut m = ModuleBuilder::new("Number");
    m.register(
        "toString",
        define_simple_method(|n, _| Ok(Value::from(n.stringify()))),
    )
    .register(
        "floor",
        define_simple_method(|n, _| Ok(int_or_float(n.get_number().floor()))),
    );
    m.build()
}

pub fn create_object_module() -> Value {
    let mut m = ModuleBuilder::new("Object");
    m.register(
        "keys",
        define_simple_method(|o, _| {
            Ok(o.as_object()
                .map(|obj| obj.keys().map(|k| Value::from(k.clone())).collect())
                .unwrap_or_else(Value::empty_array))
        }),
    )
    .register(
        "values",
        define_simple_method(|o, _| {
            Ok(o.as_object()
                .map(|obj| obj.iter().map(|(_, v)| v.clone()).collect())
                .unwrap_or_else(Value::empty_array))
        }),
    )
    .register("size", define_simple_method(|o, _| Ok(Value::from(o.size()))));
    m.build()
}

pub fn create_function_module() -> Value {
    let mut m = ModuleBuilder::new("Function");
    // f.apply([a, b]) calls f(a, b)
    m.register(
        "apply",
        define_async_method(|vm, fun, params| {
            let args = arg(&params, 0);
            let args = if args.is_container() { args.elements() } else { vec![args] };
            vm.call_function(&fun, &Value::Undefined, args)
        }),
    );
    m.build()
}

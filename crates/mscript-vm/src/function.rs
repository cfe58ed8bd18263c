//! Callable values
//!
//! Every function, user-defined or native, is an `AbstractFunction` wrapped
//! in a native value of kind `Function`. The native's content is the
//! function's closure object; it backs the scope a call runs in.
//!
//! Calls find their parameters as one value (or a parameter pack) on top
//! of the calc stack. A function either leaves its result in place of the
//! parameters right away or pushes a task that will.

use crate::block::{get_block, CodeLocation};
use crate::error::VmError;
use crate::vm::{AbstractTask, BlockExecution, VirtualMachine};
use mscript_types::{Native, NativeKind, Value};
use std::any::Any;
use std::rc::Rc;

pub trait AbstractFunction: Any {
    /// Starts a call. `object` is the receiver of a method call (undefined
    /// otherwise), `closure` the function's closure object.
    fn call(&self, vm: &mut VirtualMachine, object: &Value, closure: &Value) -> Result<(), VmError>;

    fn as_any(&self) -> &dyn Any;
}

pub type FunctionRef = Rc<dyn AbstractFunction>;

/// Wraps a function into a runtime value with an empty closure
pub fn pack_function(f: impl AbstractFunction) -> Value {
    let f: FunctionRef = Rc::new(f);
    Value::Native(Native::new(NativeKind::Function, f, Value::Undefined))
}

pub fn get_function(value: &Value) -> Option<FunctionRef> {
    let native = value.strip_key().as_native()?;
    if native.kind() != NativeKind::Function {
        return None;
    }
    native.downcast_ref::<FunctionRef>().cloned()
}

pub fn is_function(value: &Value) -> bool {
    value.strip_key().is_native(NativeKind::Function)
}

/// User function compiled from `(params) => body`
#[derive(Debug)]
pub struct UserFn {
    pub code: Value,
    pub identifiers: Rc<[Rc<str>]>,
    /// The last parameter collects the remaining arguments as an array
    pub expand_last: bool,
}

impl UserFn {
    /// `(a,b...)=>` style signature for listings
    pub fn signature(&self) -> String {
        let mut out = String::from("(");
        for (i, name) in self.identifiers.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(name);
            if self.expand_last && i + 1 == self.identifiers.len() {
                out.push_str("...");
            }
        }
        out.push_str(")=>");
        out
    }
}

impl AbstractFunction for UserFn {
    fn call(&self, vm: &mut VirtualMachine, object: &Value, closure: &Value) -> Result<(), VmError> {
        let block = get_block(&self.code).ok_or_else(|| VmError::ArgumentIsNotBlock(self.code.clone()))?;
        vm.push_task(Box::new(FunctionTask {
            exec: BlockExecution::from_block(block),
            identifiers: self.identifiers.clone(),
            expand_last: self.expand_last,
            object: object.clone(),
            closure: closure.clone(),
            scopes: 0,
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Runs a user function body in its own scopes
///
/// A method call gets a scope backed by the receiver below the parameter
/// scope, so members of the receiver resolve as plain names.
struct FunctionTask {
    exec: BlockExecution,
    identifiers: Rc<[Rc<str>]>,
    expand_last: bool,
    object: Value,
    closure: Value,
    scopes: usize,
}

impl FunctionTask {
    fn pop_scopes(&mut self, vm: &mut VirtualMachine) {
        for _ in 0..self.scopes {
            vm.pop_scope();
        }
        self.scopes = 0;
    }

    fn bind_params(&mut self, vm: &mut VirtualMachine, params: Vec<Value>) -> Result<(), VmError> {
        if self.object.is_defined() {
            vm.push_this_scope(self.object.clone())?;
            self.scopes += 1;
        }
        vm.push_scope(self.closure.clone())?;
        self.scopes += 1;

        let count = self.identifiers.len();
        let mut params = params.into_iter();
        for (i, name) in self.identifiers.iter().enumerate() {
            let value = if self.expand_last && i + 1 == count {
                params.by_ref().collect()
            } else {
                params.next().unwrap_or_default()
            };
            if !vm.set_var(name.clone(), value) {
                return Err(VmError::VariableAlreadyAssigned(name.to_string()));
            }
        }
        Ok(())
    }
}

impl AbstractTask for FunctionTask {
    fn init(&mut self, vm: &mut VirtualMachine) -> Result<bool, VmError> {
        let params = vm.pop_params();
        if let Err(e) = self.bind_params(vm, params) {
            self.pop_scopes(vm);
            return Err(e);
        }
        Ok(true)
    }

    fn run(&mut self, vm: &mut VirtualMachine) -> Result<bool, VmError> {
        if self.exec.run(vm)? {
            return Ok(true);
        }
        self.pop_scopes(vm);
        Ok(false)
    }

    fn code_location(&self) -> Option<CodeLocation> {
        self.exec.code_location()
    }

    fn name(&self) -> &'static str {
        "function"
    }

    fn current_instruction(&self) -> Option<String> {
        self.exec.current_instruction()
    }
}

/// Host function with full access to the VM
pub struct NativeFunction<F>(pub F);

impl<F> AbstractFunction for NativeFunction<F>
where
    F: Fn(&mut VirtualMachine, &Value, &Value) -> Result<(), VmError> + 'static,
{
    fn call(&self, vm: &mut VirtualMachine, object: &Value, closure: &Value) -> Result<(), VmError> {
        (self.0)(vm, object, closure)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Raw function: reads its own parameters and pushes its own result
pub fn define_function<F>(f: F) -> Value
where
    F: Fn(&mut VirtualMachine, &Value, &Value) -> Result<(), VmError> + 'static,
{
    pack_function(NativeFunction(f))
}

/// Function of its parameters only
pub fn define_simple_fn<F>(f: F) -> Value
where
    F: Fn(&[Value]) -> Result<Value, VmError> + 'static,
{
    define_function(move |vm, _object, _closure| {
        let params = vm.pop_params();
        let result = f(&params)?;
        vm.push_value(result)
    })
}

/// Method receiving the call's receiver; called as a plain function the
/// first parameter becomes the receiver.
pub fn define_simple_method<F>(f: F) -> Value
where
    F: Fn(&Value, &[Value]) -> Result<Value, VmError> + 'static,
{
    define_function(move |vm, object, _closure| {
        let mut params = vm.pop_params();
        let result = if object.is_defined() {
            f(object, &params)?
        } else if params.is_empty() {
            f(&Value::Undefined, &params)?
        } else {
            let receiver = params.remove(0);
            f(&receiver, &params)?
        };
        vm.push_value(result)
    })
}

/// Function that needs the VM, typically to push a task that produces the
/// result later
pub fn define_async_fn<F>(f: F) -> Value
where
    F: Fn(&mut VirtualMachine, Vec<Value>) -> Result<(), VmError> + 'static,
{
    define_function(move |vm, _object, _closure| {
        let params = vm.pop_params();
        f(vm, params)
    })
}

/// Async counterpart of `define_simple_method`
pub fn define_async_method<F>(f: F) -> Value
where
    F: Fn(&mut VirtualMachine, Value, Vec<Value>) -> Result<(), VmError> + 'static,
{
    define_function(move |vm, object, _closure| {
        let mut params = vm.pop_params();
        let receiver = if object.is_defined() || params.is_empty() {
            object.clone()
        } else {
            params.remove(0)
        };
        f(vm, receiver, params)
    })
}

//! Indexing, call and block instructions

use super::BlockExecution;
use crate::error::VmError;
use crate::opcode::OpCode;
use crate::vm::VirtualMachine;
use mscript_types::{Array, NativeKind, ProcArray, Value};

impl BlockExecution {
    pub(super) fn execute_calls(
        &mut self,
        vm: &mut VirtualMachine,
        op: OpCode,
    ) -> Result<(), VmError> {
        match op {
            OpCode::Deref => {
                let index = vm.pop_value();
                let source = vm.pop_value();
                deref(vm, &source, &index)
            }
            OpCode::Deref1 | OpCode::Deref2 => {
                let index = self.read_const(op)?;
                let source = vm.pop_value();
                deref(vm, &source, &index)
            }

            OpCode::Call => {
                let fun = vm.pop_value();
                vm.call_function_raw(&fun, &Value::Undefined)
            }
            OpCode::Call1 | OpCode::Call2 => {
                let count = self.read_count(op)?;
                let fun = vm.pop_value();
                vm.define_param_pack(count)?;
                vm.call_function_raw(&fun, &Value::Undefined)
            }

            OpCode::Mcall => {
                let fun = vm.pop_value();
                let object = vm.pop_value();
                vm.call_function_raw(&fun, &object)
            }
            OpCode::Mcall1 | OpCode::Mcall2 => {
                let name = self.read_name(op)?;
                let object = vm.pop_value();
                let method = find_member(vm, &object, &name);
                if !method.is_defined() {
                    return Err(VmError::ArgumentIsNotFunction(Value::String(name)));
                }
                // `Object.keys(o)`: the table is not the receiver
                let object = if is_class_table(vm, &object) {
                    Value::Undefined
                } else {
                    object
                };
                vm.call_function_raw(&method, &object)
            }

            OpCode::ExecBlock => {
                let block = vm.pop_value();
                let task = BlockExecution::new(&block)?;
                vm.push_task(Box::new(task))
            }

            _ => Err(VmError::InvalidInstruction(op as u8)),
        }
    }
}

/// Member of `object`, falling back to its type-class table in the
/// globals (`String`, `Array`, `Number`, ...)
pub(crate) fn find_member(vm: &VirtualMachine, object: &Value, name: &str) -> Value {
    if object.has_member(name) {
        return object.member(name);
    }
    vm.get_var(object.type_class())
        .map(|class| class.member(name))
        .unwrap_or_default()
}

/// Type-class tables whose methods take their receiver from the values
const CLASS_TABLES: [&str; 5] = ["Array", "String", "Number", "Object", "Function"];

/// Whether `object` is one of the type-class tables in the globals
pub(crate) fn is_class_table(vm: &VirtualMachine, object: &Value) -> bool {
    let Value::Object(candidate) = object.strip_key() else {
        return false;
    };
    CLASS_TABLES.iter().any(|class| {
        matches!(vm.get_var(class), Some(Value::Object(table)) if table.ptr_eq(candidate))
    })
}

/// `source[index]`. Pushes the result, or starts a generator call for
/// proc-arrays.
pub(crate) fn deref(vm: &mut VirtualMachine, source: &Value, index: &Value) -> Result<(), VmError> {
    match index.strip_key() {
        Value::Number(n) => {
            let i = n.as_i64();
            if let Some(native) = source.strip_key().as_native() {
                if native.kind() == NativeKind::ProcArray {
                    let item = usize::try_from(i)
                        .ok()
                        .map(|i| native.content().get_index(i))
                        .unwrap_or_default();
                    return match native.downcast_ref::<ProcArray>() {
                        Some(pa) if item.is_defined() => {
                            let generator = pa.generator.clone();
                            vm.call_function(&generator, &Value::Undefined, vec![item])
                        }
                        _ => vm.push_value(Value::Undefined),
                    };
                }
            }
            match source.strip_key() {
                Value::Array(_) | Value::Object(_) | Value::String(_) | Value::Native(_) => {
                    let v = usize::try_from(i)
                        .map(|i| source.get_index(i))
                        .unwrap_or_default();
                    vm.push_value(v)
                }
                _ => Err(VmError::InvalidDereference(index.clone())),
            }
        }
        Value::Array(path) => match source.strip_key() {
            Value::Array(items) => vm.push_value(Value::Array(Array::index_map(
                items.clone(),
                path.to_vec(),
            ))),
            Value::Object(o) => {
                let keys = path.to_vec();
                let mapped = o
                    .iter()
                    .map(|(k, v)| (k.clone(), keys.iter().fold(v.clone(), |acc, key| acc.lookup(key))))
                    .collect();
                vm.push_value(Value::Object(mapped))
            }
            _ => Err(VmError::InvalidDereference(index.clone())),
        },
        Value::String(name) => {
            let v = find_member(vm, source, name);
            vm.push_value(v)
        }
        _ => Err(VmError::InvalidDereference(index.clone())),
    }
}

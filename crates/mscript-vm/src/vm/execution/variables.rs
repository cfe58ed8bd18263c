//! Variable and scope instructions

use super::BlockExecution;
use crate::error::VmError;
use crate::opcode::OpCode;
use crate::vm::VirtualMachine;
use mscript_types::Value;
use std::rc::Rc;

impl BlockExecution {
    pub(super) fn execute_variables(
        &mut self,
        vm: &mut VirtualMachine,
        op: OpCode,
    ) -> Result<(), VmError> {
        match op {
            OpCode::GetVar1 | OpCode::GetVar2 => {
                let name = self.read_name(op)?;
                let v = vm
                    .get_var(&name)
                    .ok_or_else(|| VmError::VariableNotFound(name.to_string()))?;
                vm.push_value(v)
            }

            OpCode::SetVar1 | OpCode::SetVar2 => {
                let name = self.read_name(op)?;
                let v = vm.top_value();
                assign(vm, name, v)
            }

            OpCode::PopVar1 | OpCode::PopVar2 => {
                let name = self.read_name(op)?;
                let v = vm.pop_value();
                assign(vm, name, v)
            }

            OpCode::IsDef => {
                let name = vm.pop_value();
                let name = name
                    .as_str()
                    .ok_or_else(|| VmError::InvalidDereference(name.clone()))?
                    .to_string();
                is_defined(vm, &name)
            }
            OpCode::IsDef1 | OpCode::IsDef2 => {
                let name = self.read_name(op)?;
                is_defined(vm, &name)
            }

            OpCode::PushScope => vm.push_scope(Value::Undefined),
            OpCode::PopScope => {
                vm.pop_scope();
                Ok(())
            }
            OpCode::PushScopeObject => {
                let base = vm.pop_value();
                vm.push_scope(base)
            }
            OpCode::PushScopeThis => {
                let base = vm.pop_value();
                vm.push_this_scope(base)
            }
            OpCode::ScopeToObject => {
                let v = vm.scope_to_object();
                vm.push_value(v)
            }

            _ => Err(VmError::InvalidInstruction(op as u8)),
        }
    }
}

fn assign(vm: &mut VirtualMachine, name: Rc<str>, value: Value) -> Result<(), VmError> {
    if vm.set_var(name.clone(), value) {
        Ok(())
    } else {
        Err(VmError::VariableAlreadyAssigned(name.to_string()))
    }
}

/// Definedness depends on the runtime environment, so the compiler must
/// not fold it away.
fn is_defined(vm: &mut VirtualMachine, name: &str) -> Result<(), VmError> {
    if vm.is_compile_time() {
        return Err(VmError::Runtime("is_def cannot run at compile time".into()));
    }
    let defined = vm.is_defined(name);
    vm.push_value(Value::Bool(defined))
}

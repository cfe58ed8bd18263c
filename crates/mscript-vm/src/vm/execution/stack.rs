//! Literal, list and stack-shuffling instructions

use super::BlockExecution;
use crate::error::VmError;
use crate::opcode::OpCode;
use crate::vm::{make_pack, VirtualMachine};
use mscript_types::{Array, Value, PARAM_PACK};

impl BlockExecution {
    pub(super) fn execute_stack(
        &mut self,
        vm: &mut VirtualMachine,
        op: OpCode,
    ) -> Result<(), VmError> {
        match op {
            OpCode::PushInt1 | OpCode::PushInt2 | OpCode::PushInt4 | OpCode::PushInt8 => {
                let v = self.read_int(op)?;
                vm.push_value(Value::int(v))
            }
            OpCode::PushDouble => {
                let v = self.read_double()?;
                vm.push_value(Value::float(v))
            }
            OpCode::PushConst1 | OpCode::PushConst2 => {
                let v = self.read_const(op)?;
                vm.push_value(v)
            }
            OpCode::PushTrue => vm.push_value(Value::Bool(true)),
            OpCode::PushFalse => vm.push_value(Value::Bool(false)),
            OpCode::PushNull => vm.push_value(Value::Null),
            OpCode::PushUndefined => vm.push_value(Value::Undefined),
            OpCode::PushZeroInt => vm.push_value(Value::int(0)),

            OpCode::BeginList => vm.begin_list(),
            OpCode::CloseList => vm.finish_list(),

            OpCode::ExpandArray => {
                let v = vm.pop_raw();
                match v.strip_key() {
                    Value::Array(_) | Value::Object(_) => vm.push_value(make_pack(v.elements())),
                    _ => vm.push_value(v),
                }
            }

            OpCode::CollapseList1 => {
                let skip = self.read_count(op)?;
                let v = vm.pop_raw();
                let items = match v.strip_key() {
                    Value::Array(_) => v.elements(),
                    _ => vec![v],
                };
                vm.push_value(items.into_iter().skip(skip).collect())
            }

            OpCode::Dup => vm.dup_value(0),
            OpCode::Del => {
                vm.del_value();
                Ok(())
            }
            OpCode::Dup1 => {
                let depth = self.read_count(op)?;
                vm.dup_value(depth)
            }
            OpCode::Swap => vm.swap_values(1),
            OpCode::Swap1 => {
                let depth = self.read_count(op)?;
                vm.swap_values(depth)
            }

            OpCode::VlistPop => {
                let v = vm.pop_raw();
                match &v {
                    Value::Array(a) if a.is_param_pack() && !a.is_empty() => {
                        let last = a.get(a.len() - 1).unwrap_or_default();
                        vm.push_value(Value::Array(a.pop_back().with_flags(PARAM_PACK)))?;
                        vm.push_value(last)
                    }
                    _ => vm.push_value(v),
                }
            }

            OpCode::Combine => {
                let b = vm.pop_raw();
                let a = vm.pop_raw();
                let mut items = pack_items(a);
                items.extend(pack_items(b));
                vm.push_value(make_pack(items))
            }

            OpCode::PushArray1 | OpCode::PushArray2 | OpCode::PushArray4 => {
                let count = self.read_count(op)?;
                vm.define_param_pack(count)?;
                let items = vm.pop_params();
                vm.push_value(Value::Array(Array::from_vec(
                    items.into_iter().map(Value::unpack).collect(),
                )))
            }

            OpCode::Raise => {
                let v = vm.pop_value();
                Err(VmError::Custom(v))
            }

            _ => Err(VmError::InvalidInstruction(op as u8)),
        }
    }
}

fn pack_items(v: Value) -> Vec<Value> {
    match &v {
        Value::Array(a) if a.is_param_pack() => a.to_vec(),
        _ => vec![v],
    }
}

//! Arithmetic and comparison instruction execution

use super::BlockExecution;
use crate::error::VmError;
use crate::opcode::OpCode;
use crate::vm::ops::{ComparisonOp, ValueOperations};
use crate::vm::VirtualMachine;
use mscript_types::Value;

impl BlockExecution {
    pub(super) fn execute_arithmetic(
        &mut self,
        vm: &mut VirtualMachine,
        op: OpCode,
    ) -> Result<(), VmError> {
        match op {
            OpCode::OpAdd => binary(vm, ValueOperations::add),
            OpCode::OpSub => binary(vm, ValueOperations::sub),
            OpCode::OpMult => binary_checked(vm, ValueOperations::mult),
            OpCode::OpDiv => binary(vm, ValueOperations::div),
            OpCode::OpMod => binary(vm, ValueOperations::modulo),
            OpCode::OpPower => binary(vm, ValueOperations::power),
            OpCode::OpBoolAnd => binary(vm, ValueOperations::bool_and),
            OpCode::OpBoolOr => binary(vm, ValueOperations::bool_or),
            OpCode::OpMkrange => binary(vm, ValueOperations::mkrange),

            OpCode::OpCmpEq => compare(vm, ComparisonOp::Eq),
            OpCode::OpCmpNotEq => compare(vm, ComparisonOp::NotEq),
            OpCode::OpCmpLess => compare(vm, ComparisonOp::Less),
            OpCode::OpCmpGreater => compare(vm, ComparisonOp::Greater),
            OpCode::OpCmpLessEq => compare(vm, ComparisonOp::LessEq),
            OpCode::OpCmpGreaterEq => compare(vm, ComparisonOp::GreaterEq),

            OpCode::OpBoolNot => {
                let v = vm.pop_value();
                vm.push_value(ValueOperations::not(&v))
            }
            OpCode::OpUnaryMinus => {
                let v = vm.pop_value();
                vm.push_value(ValueOperations::unary_minus(&v))
            }

            // Switch dispatch: on a match the selector is consumed
            OpCode::OpCmpEq1 | OpCode::OpCmpEq2 => {
                let label = self.read_const(op)?;
                if vm.top_value() == label {
                    vm.replace_top(Value::Bool(true));
                    Ok(())
                } else {
                    vm.push_value(Value::Bool(false))
                }
            }

            OpCode::OpCheckbound => {
                let index = vm.pop_value();
                let container = vm.pop_value();
                vm.push_value(Value::Bool(ValueOperations::out_of_bounds(
                    &container, &index,
                )))
            }

            OpCode::OpAddConst1
            | OpCode::OpAddConst2
            | OpCode::OpAddConst4
            | OpCode::OpAddConst8 => {
                let n = Value::int(self.read_int(op)?);
                let v = vm.pop_value();
                vm.push_value(ValueOperations::add(&v, &n))
            }
            OpCode::OpNegaddConst1
            | OpCode::OpNegaddConst2
            | OpCode::OpNegaddConst4
            | OpCode::OpNegaddConst8 => {
                let n = Value::int(self.read_int(op)?);
                let v = vm.pop_value();
                vm.push_value(ValueOperations::sub(&n, &v))
            }
            OpCode::OpMultConst1
            | OpCode::OpMultConst2
            | OpCode::OpMultConst4
            | OpCode::OpMultConst8 => {
                let n = Value::int(self.read_int(op)?);
                let v = vm.pop_value();
                let product = ValueOperations::mult(&v, &n)?;
                vm.push_value(product)
            }

            _ => Err(VmError::InvalidInstruction(op as u8)),
        }
    }
}

fn binary(vm: &mut VirtualMachine, f: fn(&Value, &Value) -> Value) -> Result<(), VmError> {
    let right = vm.pop_value();
    let left = vm.pop_value();
    vm.push_value(f(&left, &right))
}

fn binary_checked(
    vm: &mut VirtualMachine,
    f: fn(&Value, &Value) -> Result<Value, VmError>,
) -> Result<(), VmError> {
    let right = vm.pop_value();
    let left = vm.pop_value();
    let result = f(&left, &right)?;
    vm.push_value(result)
}

fn compare(vm: &mut VirtualMachine, op: ComparisonOp) -> Result<(), VmError> {
    let right = vm.pop_value();
    let left = vm.pop_value();
    vm.push_value(ValueOperations::compare(op, &left, &right))
}

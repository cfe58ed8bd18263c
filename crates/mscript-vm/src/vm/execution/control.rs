//! Control flow instruction execution

use super::BlockExecution;
use crate::error::VmError;
use crate::opcode::OpCode;
use crate::vm::VirtualMachine;

impl BlockExecution {
    pub(super) fn execute_control(
        &mut self,
        vm: &mut VirtualMachine,
        op: OpCode,
    ) -> Result<(), VmError> {
        match op {
            OpCode::Jump1 | OpCode::Jump2 => {
                let offset = self.read_int(op)?;
                self.jump(offset)
            }
            OpCode::JumpTrue1 | OpCode::JumpTrue2 => {
                let offset = self.read_int(op)?;
                if vm.pop_value().truthy() {
                    self.jump(offset)?;
                }
                Ok(())
            }
            OpCode::JumpFalse1 | OpCode::JumpFalse2 => {
                let offset = self.read_int(op)?;
                if !vm.pop_value().truthy() {
                    self.jump(offset)?;
                }
                Ok(())
            }
            OpCode::ExitBlock => {
                self.ip = self.block.code.len();
                Ok(())
            }
            _ => Err(VmError::InvalidInstruction(op as u8)),
        }
    }
}

//! Instruction execution handlers
//!
//! `BlockExecution` is the task that interprets one block: every `run`
//! executes a single instruction.

use crate::block::{get_block, load_double, load_int, Block, CodeLocation};
use crate::disasm::decode;
use crate::error::VmError;
use crate::opcode::OpCode;
use crate::vm::{AbstractTask, VirtualMachine};
use mscript_types::Value;
use std::rc::Rc;
use tracing::trace;

mod arithmetic;
mod calls;
mod control;
mod stack;
mod variables;

pub(crate) use calls::deref;

pub struct BlockExecution {
    block: Rc<Block>,
    ip: usize,
}

impl BlockExecution {
    pub fn new(block: &Value) -> Result<Self, VmError> {
        let block = get_block(block).ok_or_else(|| VmError::ArgumentIsNotBlock(block.clone()))?;
        Ok(Self::from_block(block))
    }

    pub fn from_block(block: Rc<Block>) -> Self {
        BlockExecution { block, ip: 0 }
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn block(&self) -> &Rc<Block> {
        &self.block
    }

    fn read_int(&mut self, op: OpCode) -> Result<i64, VmError> {
        let width = op.operand().width();
        let v = load_int(&self.block.code, self.ip, width)
            .ok_or(VmError::InvalidInstruction(op as u8))?;
        self.ip += width;
        Ok(v)
    }

    fn read_count(&mut self, op: OpCode) -> Result<usize, VmError> {
        let v = self.read_int(op)?;
        usize::try_from(v).map_err(|_| VmError::InvalidInstruction(op as u8))
    }

    fn read_double(&mut self) -> Result<f64, VmError> {
        let v = load_double(&self.block.code, self.ip)
            .ok_or(VmError::InvalidInstruction(OpCode::PushDouble as u8))?;
        self.ip += 8;
        Ok(v)
    }

    fn read_const(&mut self, op: OpCode) -> Result<Value, VmError> {
        let index = self.read_count(op)?;
        self.block
            .consts
            .get(index)
            .cloned()
            .ok_or(VmError::InvalidInstruction(op as u8))
    }

    fn read_name(&mut self, op: OpCode) -> Result<Rc<str>, VmError> {
        match self.read_const(op)? {
            Value::String(s) => Ok(s),
            other => Err(VmError::Runtime(format!(
                "{} expects a name, found {}",
                op.mnemonic(),
                other.stringify_short(40)
            ))),
        }
    }

    fn jump(&mut self, offset: i64) -> Result<(), VmError> {
        let target = self.ip as i64 + offset;
        if target < 0 || target as usize > self.block.code.len() {
            return Err(VmError::Runtime(format!("jump target {} outside block", target)));
        }
        self.ip = target as usize;
        Ok(())
    }

    fn execute(&mut self, vm: &mut VirtualMachine, op: OpCode) -> Result<(), VmError> {
        match op {
            OpCode::Noop => Ok(()),

            OpCode::PushInt1
            | OpCode::PushInt2
            | OpCode::PushInt4
            | OpCode::PushInt8
            | OpCode::PushDouble
            | OpCode::PushConst1
            | OpCode::PushConst2
            | OpCode::BeginList
            | OpCode::CloseList
            | OpCode::ExpandArray
            | OpCode::CollapseList1
            | OpCode::Dup
            | OpCode::Del
            | OpCode::Dup1
            | OpCode::VlistPop
            | OpCode::Combine
            | OpCode::Swap
            | OpCode::Swap1
            | OpCode::PushTrue
            | OpCode::PushFalse
            | OpCode::PushNull
            | OpCode::PushUndefined
            | OpCode::PushZeroInt
            | OpCode::PushArray1
            | OpCode::PushArray2
            | OpCode::PushArray4
            | OpCode::Raise => self.execute_stack(vm, op),

            OpCode::GetVar1
            | OpCode::GetVar2
            | OpCode::SetVar1
            | OpCode::SetVar2
            | OpCode::PopVar1
            | OpCode::PopVar2
            | OpCode::IsDef
            | OpCode::IsDef1
            | OpCode::IsDef2
            | OpCode::PushScope
            | OpCode::PopScope
            | OpCode::PushScopeObject
            | OpCode::PushScopeThis
            | OpCode::ScopeToObject => self.execute_variables(vm, op),

            OpCode::Deref
            | OpCode::Deref1
            | OpCode::Deref2
            | OpCode::Call
            | OpCode::Call1
            | OpCode::Call2
            | OpCode::Mcall
            | OpCode::Mcall1
            | OpCode::Mcall2
            | OpCode::ExecBlock => self.execute_calls(vm, op),

            OpCode::Jump1
            | OpCode::Jump2
            | OpCode::JumpTrue1
            | OpCode::JumpTrue2
            | OpCode::JumpFalse1
            | OpCode::JumpFalse2
            | OpCode::ExitBlock => self.execute_control(vm, op),

            _ => self.execute_arithmetic(vm, op),
        }
    }
}

impl AbstractTask for BlockExecution {
    fn run(&mut self, vm: &mut VirtualMachine) -> Result<bool, VmError> {
        let Some(&byte) = self.block.code.get(self.ip) else {
            return Ok(false);
        };
        let op = OpCode::from_u8(byte).ok_or(VmError::InvalidInstruction(byte))?;
        trace!(ip = self.ip, op = op.mnemonic(), depth = vm.calc_len(), "step");
        self.ip += 1;
        self.execute(vm, op)?;
        // Finishing is reported on the next step so that a child task
        // pushed by the last instruction runs before this one retires.
        Ok(true)
    }

    fn code_location(&self) -> Option<CodeLocation> {
        Some(self.block.code_location_at(self.ip.saturating_sub(1)))
    }

    fn name(&self) -> &'static str {
        "block"
    }

    fn current_instruction(&self) -> Option<String> {
        if self.ip >= self.block.code.len() {
            return Some("<end>".to_string());
        }
        Some(match decode(&self.block, self.ip) {
            Ok((text, _)) => format!("{:>5}  {}", self.ip, text),
            Err(e) => format!("{:>5}  <{}>", self.ip, e),
        })
    }
}

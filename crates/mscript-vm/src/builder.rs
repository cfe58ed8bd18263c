//! Bytecode builder
//!
//! `BlockBld` appends instructions, deduplicates constants, records line
//! numbers and patches forward jumps. Integer operands use the smallest
//! size variant of the opcode that can hold them.

use crate::block::{store_int, Block, CodeLocation};
use crate::error::BuildError;
use crate::opcode::OpCode;
use mscript_types::Value;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Constant-pool key: strict identity, so `1` and `1.0` stay distinct
struct ConstKey(Value);

impl PartialEq for ConstKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.strict_eq(&other.0)
    }
}

impl Eq for ConstKey {}

impl Hash for ConstKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.strict_hash(state)
    }
}

/// Forward jump waiting for its target
#[derive(Debug)]
#[must_use]
pub struct JumpPatch {
    operand: usize,
    width: usize,
}

/// Smallest size class whose signed operand holds `value`
fn size_class(value: i64) -> u8 {
    if i8::try_from(value).is_ok() {
        0
    } else if i16::try_from(value).is_ok() {
        1
    } else if i32::try_from(value).is_ok() {
        2
    } else {
        3
    }
}

#[derive(Default)]
pub struct BlockBld {
    code: Vec<u8>,
    consts: Vec<Value>,
    const_index: HashMap<ConstKey, usize>,
    lines: Vec<(usize, usize)>,
    last_line: Option<usize>,
    /// Opcode position and end of the most recent `set_var`
    last_store: Option<(usize, usize)>,
}

impl BlockBld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> usize {
        self.code.len()
    }

    pub fn push_cmd(&mut self, op: OpCode) {
        self.code.push(op as u8);
    }

    /// Emits `base` (or a wider variant) with an integer operand
    pub fn push_int(&mut self, base: OpCode, value: i64) -> Result<(), BuildError> {
        let class = size_class(value);
        let op = base.sized(class).ok_or_else(|| {
            BuildError::new(format!(
                "Operand {} does not fit instruction {}",
                value,
                base.mnemonic()
            ))
        })?;
        self.push_cmd(op);
        self.code.extend(store_int(value, 1 << class));
        Ok(())
    }

    pub fn push_double(&mut self, value: f64) {
        self.push_cmd(OpCode::PushDouble);
        self.code.extend(value.to_be_bytes());
    }

    /// Index of `value` in the pool, adding it when new
    pub fn add_const(&mut self, value: Value) -> usize {
        if let Some(&index) = self.const_index.get(&ConstKey(value.clone())) {
            return index;
        }
        let index = self.consts.len();
        self.consts.push(value.clone());
        self.const_index.insert(ConstKey(value), index);
        index
    }

    /// Emits a constant-indexed instruction such as `get_var` or `push_const`
    pub fn push_const(&mut self, base: OpCode, value: Value) -> Result<(), BuildError> {
        let index = self.add_const(value);
        self.push_int(base, index as i64)
    }

    /// Emits `set_var name` and remembers it for `downgrade_trailing_store`
    pub fn push_store(&mut self, name: Value) -> Result<(), BuildError> {
        let pos = self.position();
        self.push_const(OpCode::SetVar1, name)?;
        self.last_store = Some((pos, self.position()));
        Ok(())
    }

    /// Turns a `set_var` that ends the code into `pop_var`, saving the `del`
    /// that would follow it
    pub fn downgrade_trailing_store(&mut self) -> bool {
        match self.last_store.take() {
            Some((pos, end)) if end == self.code.len() => {
                let pop = match OpCode::from_u8(self.code[pos]) {
                    Some(OpCode::SetVar1) => OpCode::PopVar1,
                    Some(OpCode::SetVar2) => OpCode::PopVar2,
                    _ => return false,
                };
                self.code[pos] = pop as u8;
                true
            }
            _ => false,
        }
    }

    /// Emits a jump with a placeholder operand of `width` bytes
    pub fn prepare_jump(&mut self, base: OpCode, width: usize) -> Result<JumpPatch, BuildError> {
        let class = match width {
            1 => 0,
            2 => 1,
            _ => return Err(BuildError::new(format!("Invalid jump width {}", width))),
        };
        let op = base
            .sized(class)
            .filter(|op| op.is_jump())
            .ok_or_else(|| BuildError::new(format!("{} is not a jump", base.mnemonic())))?;
        self.push_cmd(op);
        let operand = self.position();
        self.code.extend(std::iter::repeat(0).take(width));
        Ok(JumpPatch { operand, width })
    }

    pub fn finish_jump_here(&mut self, patch: JumpPatch) -> Result<(), BuildError> {
        let target = self.position();
        // Code after a jump target may be reached without the store running.
        self.last_store = None;
        self.finish_jump_to(patch, target)
    }

    pub fn finish_jump_to(&mut self, patch: JumpPatch, target: usize) -> Result<(), BuildError> {
        let offset = target as i64 - (patch.operand + patch.width) as i64;
        let fits = match patch.width {
            1 => i8::try_from(offset).is_ok(),
            _ => i16::try_from(offset).is_ok(),
        };
        if !fits {
            return Err(BuildError::new(format!(
                "Jump offset {} exceeds {} byte operand",
                offset, patch.width
            )));
        }
        let bytes = store_int(offset, patch.width);
        self.code[patch.operand..patch.operand + patch.width].copy_from_slice(&bytes);
        Ok(())
    }

    /// Backward jump to an already emitted position, as short as possible
    pub fn push_jump_to(&mut self, base: OpCode, target: usize) -> Result<(), BuildError> {
        for width in [1usize, 2] {
            let end = self.position() + 1 + width;
            let offset = target as i64 - end as i64;
            let fits = match width {
                1 => i8::try_from(offset).is_ok(),
                _ => i16::try_from(offset).is_ok(),
            };
            if fits {
                let patch = self.prepare_jump(base, width)?;
                return self.finish_jump_to(patch, target);
            }
        }
        Err(BuildError::new("Backward jump is too far"))
    }

    /// Records that code from here on comes from `line`
    pub fn mark_line(&mut self, line: usize) {
        if self.last_line == Some(line) {
            return;
        }
        let pos = self.position();
        if let Some(last) = self.lines.last_mut() {
            if last.0 == pos {
                last.1 = line;
                self.last_line = Some(line);
                return;
            }
        }
        self.lines.push((pos, line));
        self.last_line = Some(line);
    }

    pub fn finish(self, location: CodeLocation) -> Block {
        let mut lines = self.lines;
        lines.reverse();
        Block {
            consts: self.consts,
            code: self.code,
            lines,
            location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::load_int;

    #[test]
    fn test_smallest_int_variant() {
        let mut b = BlockBld::new();
        b.push_int(OpCode::PushInt1, 5).unwrap();
        b.push_int(OpCode::PushInt1, 300).unwrap();
        b.push_int(OpCode::PushInt1, -70000).unwrap();
        b.push_int(OpCode::PushInt1, 1 << 40).unwrap();
        let block = b.finish(CodeLocation::default());
        assert_eq!(block.code[0], OpCode::PushInt1 as u8);
        assert_eq!(block.code[2], OpCode::PushInt2 as u8);
        assert_eq!(load_int(&block.code, 3, 2), Some(300));
        assert_eq!(block.code[5], OpCode::PushInt4 as u8);
        assert_eq!(block.code[10], OpCode::PushInt8 as u8);
        assert_eq!(load_int(&block.code, 11, 8), Some(1 << 40));
    }

    #[test]
    fn test_operand_too_wide() {
        let mut b = BlockBld::new();
        assert!(b.push_int(OpCode::CollapseList1, 1000).is_err());
    }

    #[test]
    fn test_const_dedup_is_strict() {
        let mut b = BlockBld::new();
        let a = b.add_const(Value::from("x"));
        let c = b.add_const(Value::int(1));
        let d = b.add_const(Value::float(1.0));
        assert_eq!(b.add_const(Value::from("x")), a);
        assert_ne!(c, d);
    }

    #[test]
    fn test_forward_jump_patch() {
        let mut b = BlockBld::new();
        let j = b.prepare_jump(OpCode::JumpFalse1, 2).unwrap();
        b.push_cmd(OpCode::PushNull);
        b.push_cmd(OpCode::Del);
        b.finish_jump_here(j).unwrap();
        let block = b.finish(CodeLocation::default());
        assert_eq!(block.code[0], OpCode::JumpFalse2 as u8);
        assert_eq!(load_int(&block.code, 1, 2), Some(2));
    }

    #[test]
    fn test_backward_jump_width() {
        let mut b = BlockBld::new();
        b.push_jump_to(OpCode::Jump1, 0).unwrap();
        assert_eq!(b.code[0], OpCode::Jump1 as u8);
        assert_eq!(load_int(&b.code, 1, 1), Some(-2));

        let mut b = BlockBld::new();
        for _ in 0..200 {
            b.push_cmd(OpCode::Noop);
        }
        b.push_jump_to(OpCode::Jump1, 0).unwrap();
        assert_eq!(b.code[200], OpCode::Jump2 as u8);
        assert_eq!(load_int(&b.code, 201, 2), Some(-203));
    }

    #[test]
    fn test_trailing_store_downgrade() {
        let mut b = BlockBld::new();
        b.push_cmd(OpCode::PushTrue);
        b.push_store(Value::from("x")).unwrap();
        assert!(b.downgrade_trailing_store());
        assert_eq!(b.code[1], OpCode::PopVar1 as u8);

        b.push_store(Value::from("y")).unwrap();
        b.push_cmd(OpCode::Noop);
        assert!(!b.downgrade_trailing_store());
    }

    #[test]
    fn test_line_marks_reverse_order() {
        let mut b = BlockBld::new();
        b.mark_line(1);
        b.push_cmd(OpCode::PushNull);
        b.mark_line(2);
        b.mark_line(3);
        b.push_cmd(OpCode::Del);
        let block = b.finish(CodeLocation::default());
        assert_eq!(block.lines, vec![(1, 3), (0, 1)]);
    }
}

//! Disassembler
//!
//! Decoding is driven entirely by the opcode template table, so the
//! listing stays in sync with the instruction set.

use crate::block::{get_block, load_double, load_int, Block, CodeLocation};
use crate::error::VmError;
use crate::function::{get_function, UserFn};
use crate::opcode::{OpCode, Operand};
use std::fmt::Write;

/// Callback events produced while walking a block
#[derive(Debug, Clone, PartialEq)]
pub enum DisasmEvent<'a> {
    Location(&'a CodeLocation),
    Code { ip: usize, text: String },
    BeginBlock(usize),
    EndBlock(usize),
    BeginFn { index: usize, params: String },
    EndFn(usize),
}

/// Decodes the instruction at `ip`, returning its text and the next `ip`
pub fn decode(block: &Block, ip: usize) -> Result<(String, usize), VmError> {
    let byte = *block.code.get(ip).ok_or(VmError::InvalidInstruction(0))?;
    let op = OpCode::from_u8(byte).ok_or(VmError::InvalidInstruction(byte))?;
    let pos = ip + 1;
    let operand = op.operand();
    let width = operand.width();
    let bad = || VmError::InvalidInstruction(byte);
    let text = match operand {
        Operand::None => op.mnemonic().to_string(),
        Operand::Int(w) => {
            let v = load_int(&block.code, pos, w).ok_or_else(bad)?;
            format!("{} {}", op.mnemonic(), v)
        }
        Operand::Double => {
            let v = load_double(&block.code, pos).ok_or_else(bad)?;
            format!("{} {}", op.mnemonic(), v)
        }
        Operand::Const(w) => {
            let index = load_int(&block.code, pos, w).ok_or_else(bad)?;
            let shown = usize::try_from(index)
                .ok()
                .and_then(|i| block.consts.get(i))
                .map(|c| c.stringify_short(50))
                .unwrap_or_else(|| format!("#{}", index));
            format!("{} {}", op.mnemonic(), shown)
        }
        Operand::Jump(w) => {
            let offset = load_int(&block.code, pos, w).ok_or_else(bad)?;
            let target = (pos + w) as i64 + offset;
            format!("{} {}", op.mnemonic(), target)
        }
    };
    Ok((text, pos + width))
}

/// Walks `block` and every block or user function in its constant pool
pub fn disassemble(block: &Block, visit: &mut dyn FnMut(DisasmEvent<'_>)) {
    visit(DisasmEvent::Location(&block.location));
    let mut ip = 0;
    while ip < block.code.len() {
        match decode(block, ip) {
            Ok((text, next)) => {
                visit(DisasmEvent::Code { ip, text });
                ip = next;
            }
            Err(e) => {
                visit(DisasmEvent::Code {
                    ip,
                    text: format!("<{}>", e),
                });
                break;
            }
        }
    }

    for (index, value) in block.consts.iter().enumerate() {
        if let Some(inner) = get_block(value) {
            visit(DisasmEvent::BeginBlock(index));
            disassemble(&inner, visit);
            visit(DisasmEvent::EndBlock(index));
        } else if let Some(fun) = get_function(value) {
            let Some(user) = fun.as_any().downcast_ref::<UserFn>() else {
                continue;
            };
            if let Some(code) = get_block(&user.code) {
                visit(DisasmEvent::BeginFn {
                    index,
                    params: user.signature(),
                });
                disassemble(&code, visit);
                visit(DisasmEvent::EndFn(index));
            }
        }
    }
}

/// Text listing of `block` and its nested code, one line per event
pub fn format_listing(block: &Block) -> String {
    let mut out = String::new();
    disassemble(block, &mut |event| {
        let _ = match event {
            DisasmEvent::Location(loc) => writeln!(out, "Code location: {}", loc),
            DisasmEvent::Code { ip, text } => writeln!(out, "{}\t{}", ip, text),
            DisasmEvent::BeginBlock(i) => writeln!(out, "Block: {}", i),
            DisasmEvent::EndBlock(i) => writeln!(out, "End of block: {}", i),
            DisasmEvent::BeginFn { index, params } => {
                writeln!(out, "Function: {}  {}", index, params)
            }
            DisasmEvent::EndFn(i) => writeln!(out, "End function: {}", i),
        };
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::BlockBld;
    use mscript_types::Value;

    #[test]
    fn test_decode_operands() {
        let mut b = BlockBld::new();
        b.push_int(OpCode::PushInt1, -3).unwrap();
        b.push_const(OpCode::GetVar1, Value::from("abc")).unwrap();
        b.push_double(1.5);
        let j = b.prepare_jump(OpCode::Jump1, 2).unwrap();
        b.finish_jump_here(j).unwrap();
        let block = b.finish(CodeLocation::default());

        let (t, ip) = decode(&block, 0).unwrap();
        assert_eq!((t.as_str(), ip), ("push_int -3", 2));
        let (t, ip) = decode(&block, ip).unwrap();
        assert_eq!((t.as_str(), ip), ("get_var \"abc\"", 4));
        let (t, ip) = decode(&block, ip).unwrap();
        assert_eq!((t.as_str(), ip), ("push_double 1.5", 13));
        let (t, ip) = decode(&block, ip).unwrap();
        assert_eq!((t.as_str(), ip), ("jump 16", 16));
    }

    #[test]
    fn test_listing_recurses_into_blocks() {
        let mut inner = BlockBld::new();
        inner.push_cmd(OpCode::PushTrue);
        let inner = crate::block::pack_block(inner.finish(CodeLocation::new("t.ms", 3)));

        let mut b = BlockBld::new();
        b.push_const(OpCode::PushConst1, inner).unwrap();
        b.push_cmd(OpCode::ExecBlock);
        let text = format_listing(&b.finish(CodeLocation::new("t.ms", 1)));

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Code location: t.ms:1",
                "0\tpush_const <block>",
                "2\texec_block",
                "Block: 0",
                "Code location: t.ms:3",
                "0\tpush_true",
                "End of block: 0",
            ]
        );
    }

    #[test]
    fn test_truncated_operand() {
        let block = Block {
            consts: vec![],
            code: vec![OpCode::PushInt2 as u8, 0],
            lines: vec![],
            location: CodeLocation::default(),
        };
        assert!(matches!(
            decode(&block, 0),
            Err(VmError::InvalidInstruction(2))
        ));
    }
}

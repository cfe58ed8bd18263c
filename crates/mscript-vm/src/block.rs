//! Compiled code blocks

use mscript_types::{Native, NativeKind, Value};
use std::fmt;
use std::rc::Rc;

/// File name and line of a piece of source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLocation {
    pub file: Rc<str>,
    pub line: usize,
}

impl CodeLocation {
    pub fn new(file: impl Into<Rc<str>>, line: usize) -> Self {
        CodeLocation {
            file: file.into(),
            line,
        }
    }

    pub fn with_line(&self, line: usize) -> Self {
        CodeLocation {
            file: self.file.clone(),
            line,
        }
    }
}

impl Default for CodeLocation {
    fn default() -> Self {
        CodeLocation::new("<input>", 1)
    }
}

impl fmt::Display for CodeLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Immutable unit of bytecode with its constant pool
#[derive(Debug, Clone)]
pub struct Block {
    pub consts: Vec<Value>,
    pub code: Vec<u8>,
    /// `(code offset, source line)` pairs, highest offset first
    pub lines: Vec<(usize, usize)>,
    pub location: CodeLocation,
}

impl Block {
    /// Source line of the instruction at `ip`
    pub fn line_at(&self, ip: usize) -> usize {
        self.lines
            .iter()
            .find(|(offset, _)| *offset <= ip)
            .map(|(_, line)| *line)
            .unwrap_or(self.location.line)
    }

    pub fn code_location_at(&self, ip: usize) -> CodeLocation {
        self.location.with_line(self.line_at(ip))
    }
}

/// Reads a big-endian operand of `width` bytes, sign-extended from its
/// first byte
pub fn load_int(code: &[u8], pos: usize, width: usize) -> Option<i64> {
    let bytes = code.get(pos..pos.checked_add(width)?)?;
    let first = *bytes.first()?;
    let mut value: i64 = if first & 0x80 != 0 { -1 } else { 0 };
    for b in bytes {
        value = (value << 8) | i64::from(*b);
    }
    Some(value)
}

pub fn load_double(code: &[u8], pos: usize) -> Option<f64> {
    let bytes: [u8; 8] = code.get(pos..pos.checked_add(8)?)?.try_into().ok()?;
    Some(f64::from_be_bytes(bytes))
}

/// Big-endian encoding of the low `width` bytes of `value`
pub fn store_int(value: i64, width: usize) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    bytes[8 - width.min(8)..].to_vec()
}

/// Wraps a block into a runtime value
pub fn pack_block(block: Block) -> Value {
    Value::Native(Native::new(NativeKind::Block, Rc::new(block), Value::Undefined))
}

pub fn get_block(value: &Value) -> Option<Rc<Block>> {
    let native = value.strip_key().as_native()?;
    if native.kind() != NativeKind::Block {
        return None;
    }
    native.downcast_ref::<Rc<Block>>().cloned()
}

pub fn is_block(value: &Value) -> bool {
    value.strip_key().is_native(NativeKind::Block)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_int_sign_extends() {
        assert_eq!(load_int(&[0xff], 0, 1), Some(-1));
        assert_eq!(load_int(&[0x7f], 0, 1), Some(127));
        assert_eq!(load_int(&[0x00, 0x80], 0, 2), Some(128));
        assert_eq!(load_int(&[0xff, 0x7f], 0, 2), Some(-129));
        assert_eq!(load_int(&[0x01], 0, 2), None);
    }

    #[test]
    fn test_store_then_load() {
        for v in [0i64, -1, 300, -70000, i64::MAX, i64::MIN] {
            let width = if v.abs_diff(0) < 0x7fff_ffff { 4 } else { 8 };
            assert_eq!(load_int(&store_int(v, width), 0, width), Some(v));
        }
    }

    #[test]
    fn test_line_lookup() {
        let block = Block {
            consts: Vec::new(),
            code: vec![0; 20],
            lines: vec![(10, 7), (4, 5), (0, 3)],
            location: CodeLocation::new("t.ms", 1),
        };
        assert_eq!(block.line_at(0), 3);
        assert_eq!(block.line_at(9), 5);
        assert_eq!(block.line_at(15), 7);
        assert_eq!(block.code_location_at(15).to_string(), "t.ms:7");
    }

    #[test]
    fn test_pack_block() {
        let v = pack_block(Block {
            consts: vec![Value::int(1)],
            code: vec![],
            lines: vec![],
            location: CodeLocation::default(),
        });
        assert!(is_block(&v));
        assert_eq!(get_block(&v).unwrap().consts.len(), 1);
        assert!(get_block(&Value::int(1)).is_none());
    }
}

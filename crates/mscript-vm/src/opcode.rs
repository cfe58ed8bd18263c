//! Instruction set
//!
//! Code is a byte stream: one opcode byte followed by an optional operand.
//! Opcodes that take an integer operand come in consecutive size variants
//! (1, 2, 4 and 8 byte operands); the builder picks the smallest one that
//! fits, so `base as u8 + class` selects the variant for size class
//! `class`.
//!
//! Every opcode has a mnemonic template. Placeholders describe the operand:
//!
//! - `$N`: signed integer of N bytes
//! - `$F`: IEEE-754 double (8 bytes)
//! - `@N`: constant-pool index of N bytes
//! - `^N`: relative jump offset of N bytes

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    Noop = 0,

    // ===== Constants =====
    PushInt1 = 1,
    PushInt2 = 2,
    PushInt4 = 3,
    PushInt8 = 4,
    PushDouble = 5,
    PushConst1 = 6,
    PushConst2 = 7,

    // ===== Lists & stack shuffling =====
    BeginList = 8,
    CloseList = 9,
    ExpandArray = 10,
    CollapseList1 = 11,
    Dup = 12,
    Del = 13,
    Dup1 = 14,
    VlistPop = 15,
    Combine = 16,
    Swap = 17,
    Swap1 = 18,

    // ===== Lookup & calls =====
    GetVar1 = 19,
    GetVar2 = 20,
    Deref = 21,
    Deref1 = 22,
    Deref2 = 23,
    Call = 24,
    Call1 = 25,
    Call2 = 26,
    Mcall = 27,
    Mcall1 = 28,
    Mcall2 = 29,
    ExecBlock = 30,

    // ===== Scopes =====
    PushScope = 31,
    PopScope = 32,
    PushScopeObject = 33,
    ScopeToObject = 34,
    Raise = 35,

    // ===== Literals =====
    PushTrue = 36,
    PushFalse = 37,
    PushNull = 38,
    PushUndefined = 39,
    PushZeroInt = 40,
    PushArray1 = 41,
    PushArray2 = 42,
    PushArray4 = 43,

    // ===== Variables =====
    SetVar1 = 44,
    SetVar2 = 45,
    PopVar1 = 46,
    PopVar2 = 47,
    IsDef = 48,
    IsDef1 = 49,
    IsDef2 = 50,

    // ===== Operators =====
    OpAdd = 51,
    OpSub = 52,
    OpMult = 53,
    OpDiv = 54,
    OpCmpEq = 55,
    OpCmpLess = 56,
    OpCmpGreater = 57,
    OpCmpLessEq = 58,
    OpCmpGreaterEq = 59,
    OpCmpNotEq = 60,
    OpBoolAnd = 61,
    OpBoolOr = 62,
    OpBoolNot = 63,
    OpPower = 64,
    OpUnaryMinus = 65,
    OpMod = 66,
    OpMkrange = 67,
    OpCmpEq1 = 68,
    OpCmpEq2 = 69,
    OpCheckbound = 70,
    OpAddConst1 = 71,
    OpAddConst2 = 72,
    OpAddConst4 = 73,
    OpAddConst8 = 74,
    OpNegaddConst1 = 75,
    OpNegaddConst2 = 76,
    OpNegaddConst4 = 77,
    OpNegaddConst8 = 78,
    OpMultConst1 = 79,
    OpMultConst2 = 80,
    OpMultConst4 = 81,
    OpMultConst8 = 82,

    // ===== Control flow =====
    Jump1 = 83,
    Jump2 = 84,
    JumpTrue1 = 85,
    JumpTrue2 = 86,
    JumpFalse1 = 87,
    JumpFalse2 = 88,
    ExitBlock = 89,

    // ===== Scopes, continued =====
    PushScopeThis = 90,
}

/// Mnemonic template for every opcode, indexed by opcode byte
const TEMPLATES: &[(OpCode, &str)] = &[
    (OpCode::Noop, "noop"),
    (OpCode::PushInt1, "push_int $1"),
    (OpCode::PushInt2, "push_int $2"),
    (OpCode::PushInt4, "push_int $4"),
    (OpCode::PushInt8, "push_int $8"),
    (OpCode::PushDouble, "push_double $F"),
    (OpCode::PushConst1, "push_const @1"),
    (OpCode::PushConst2, "push_const @2"),
    (OpCode::BeginList, "begin_list"),
    (OpCode::CloseList, "close_list"),
    (OpCode::ExpandArray, "expand_array"),
    (OpCode::CollapseList1, "collapse_list $1"),
    (OpCode::Dup, "dup"),
    (OpCode::Del, "del"),
    (OpCode::Dup1, "dup $1"),
    (OpCode::VlistPop, "vlist_pop"),
    (OpCode::Combine, "combine"),
    (OpCode::Swap, "swap"),
    (OpCode::Swap1, "swap $1"),
    (OpCode::GetVar1, "get_var @1"),
    (OpCode::GetVar2, "get_var @2"),
    (OpCode::Deref, "deref"),
    (OpCode::Deref1, "deref @1"),
    (OpCode::Deref2, "deref @2"),
    (OpCode::Call, "call"),
    (OpCode::Call1, "call $1"),
    (OpCode::Call2, "call $2"),
    (OpCode::Mcall, "mcall"),
    (OpCode::Mcall1, "mcall @1"),
    (OpCode::Mcall2, "mcall @2"),
    (OpCode::ExecBlock, "exec_block"),
    (OpCode::PushScope, "push_scope"),
    (OpCode::PopScope, "pop_scope"),
    (OpCode::PushScopeObject, "push_scope_object"),
    (OpCode::ScopeToObject, "scope_to_object"),
    (OpCode::Raise, "raise"),
    (OpCode::PushTrue, "push_true"),
    (OpCode::PushFalse, "push_false"),
    (OpCode::PushNull, "push_null"),
    (OpCode::PushUndefined, "push_undefined"),
    (OpCode::PushZeroInt, "push_zero_int"),
    (OpCode::PushArray1, "push_array $1"),
    (OpCode::PushArray2, "push_array $2"),
    (OpCode::PushArray4, "push_array $4"),
    (OpCode::SetVar1, "set_var @1"),
    (OpCode::SetVar2, "set_var @2"),
    (OpCode::PopVar1, "pop_var @1"),
    (OpCode::PopVar2, "pop_var @2"),
    (OpCode::IsDef, "is_def"),
    (OpCode::IsDef1, "is_def @1"),
    (OpCode::IsDef2, "is_def @2"),
    (OpCode::OpAdd, "op_add"),
    (OpCode::OpSub, "op_sub"),
    (OpCode::OpMult, "op_mult"),
    (OpCode::OpDiv, "op_div"),
    (OpCode::OpCmpEq, "op_cmp_eq"),
    (OpCode::OpCmpLess, "op_cmp_less"),
    (OpCode::OpCmpGreater, "op_cmp_greater"),
    (OpCode::OpCmpLessEq, "op_cmp_less_eq"),
    (OpCode::OpCmpGreaterEq, "op_cmp_greater_eq"),
    (OpCode::OpCmpNotEq, "op_cmp_not_eq"),
    (OpCode::OpBoolAnd, "op_bool_and"),
    (OpCode::OpBoolOr, "op_bool_or"),
    (OpCode::OpBoolNot, "op_bool_not"),
    (OpCode::OpPower, "op_power"),
    (OpCode::OpUnaryMinus, "op_unary_minus"),
    (OpCode::OpMod, "op_mod"),
    (OpCode::OpMkrange, "op_mkrange"),
    (OpCode::OpCmpEq1, "op_cmp_eq @1"),
    (OpCode::OpCmpEq2, "op_cmp_eq @2"),
    (OpCode::OpCheckbound, "op_checkbound"),
    (OpCode::OpAddConst1, "op_add_const $1"),
    (OpCode::OpAddConst2, "op_add_const $2"),
    (OpCode::OpAddConst4, "op_add_const $4"),
    (OpCode::OpAddConst8, "op_add_const $8"),
    (OpCode::OpNegaddConst1, "op_negadd_const $1"),
    (OpCode::OpNegaddConst2, "op_negadd_const $2"),
    (OpCode::OpNegaddConst4, "op_negadd_const $4"),
    (OpCode::OpNegaddConst8, "op_negadd_const $8"),
    (OpCode::OpMultConst1, "op_mult_const $1"),
    (OpCode::OpMultConst2, "op_mult_const $2"),
    (OpCode::OpMultConst4, "op_mult_const $4"),
    (OpCode::OpMultConst8, "op_mult_const $8"),
    (OpCode::Jump1, "jump ^1"),
    (OpCode::Jump2, "jump ^2"),
    (OpCode::JumpTrue1, "jump_true ^1"),
    (OpCode::JumpTrue2, "jump_true ^2"),
    (OpCode::JumpFalse1, "jump_false ^1"),
    (OpCode::JumpFalse2, "jump_false ^2"),
    (OpCode::ExitBlock, "exit_block"),
    (OpCode::PushScopeThis, "push_scope_this"),
];

/// Decoded operand placeholder of a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    None,
    Int(usize),
    Double,
    Const(usize),
    Jump(usize),
}

impl Operand {
    /// Encoded size in bytes
    pub fn width(self) -> usize {
        match self {
            Operand::None => 0,
            Operand::Double => 8,
            Operand::Int(w) | Operand::Const(w) | Operand::Jump(w) => w,
        }
    }
}

impl OpCode {
    pub fn from_u8(byte: u8) -> Option<OpCode> {
        TEMPLATES.get(byte as usize).map(|(op, _)| *op)
    }

    pub fn template(self) -> &'static str {
        TEMPLATES
            .get(self as usize)
            .map(|(_, t)| *t)
            .unwrap_or("?")
    }

    /// Mnemonic without the operand placeholder
    pub fn mnemonic(self) -> &'static str {
        let t = self.template();
        t.split(' ').next().unwrap_or(t)
    }

    pub fn operand(self) -> Operand {
        let t = self.template();
        let Some(spec) = t.split(' ').nth(1) else {
            return Operand::None;
        };
        let mut chars = spec.chars();
        let kind = chars.next();
        let size = chars.as_str();
        if size == "F" {
            return Operand::Double;
        }
        let width = size.parse::<usize>().unwrap_or(0);
        match kind {
            Some('$') => Operand::Int(width),
            Some('@') => Operand::Const(width),
            Some('^') => Operand::Jump(width),
            _ => Operand::None,
        }
    }

    /// Number of size variants starting at this opcode
    pub fn variants(self) -> u8 {
        match self {
            OpCode::PushInt1
            | OpCode::OpAddConst1
            | OpCode::OpNegaddConst1
            | OpCode::OpMultConst1 => 4,
            OpCode::PushArray1 => 3,
            OpCode::PushConst1
            | OpCode::GetVar1
            | OpCode::Deref1
            | OpCode::Call1
            | OpCode::Mcall1
            | OpCode::SetVar1
            | OpCode::PopVar1
            | OpCode::IsDef1
            | OpCode::OpCmpEq1
            | OpCode::Jump1
            | OpCode::JumpTrue1
            | OpCode::JumpFalse1 => 2,
            _ => 1,
        }
    }

    /// Variant of this base opcode for the given size class
    pub fn sized(self, class: u8) -> Option<OpCode> {
        if class >= self.variants() {
            return None;
        }
        OpCode::from_u8(self as u8 + class)
    }

    pub fn is_jump(self) -> bool {
        matches!(self.operand(), Operand::Jump(_))
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_matches_discriminants() {
        for (i, (op, _)) in TEMPLATES.iter().enumerate() {
            assert_eq!(*op as usize, i, "{:?} is out of place", op);
        }
        assert_eq!(OpCode::from_u8(TEMPLATES.len() as u8), None);
    }

    #[test]
    fn test_operands() {
        assert_eq!(OpCode::PushInt4.operand(), Operand::Int(4));
        assert_eq!(OpCode::PushDouble.operand(), Operand::Double);
        assert_eq!(OpCode::GetVar2.operand(), Operand::Const(2));
        assert_eq!(OpCode::JumpFalse1.operand(), Operand::Jump(1));
        assert_eq!(OpCode::Del.operand(), Operand::None);
    }

    #[test]
    fn test_size_variants_share_mnemonic() {
        for (op, _) in TEMPLATES.iter().filter(|(op, _)| op.variants() > 1) {
            for class in 0..op.variants() {
                let v = op.sized(class).unwrap();
                assert_eq!(v.mnemonic(), op.mnemonic());
                assert_eq!(v.operand().width(), 1 << class);
            }
        }
    }
}

//! Shape of the generated code

use super::helpers::compiled_block;
use crate::block::{get_block, load_int, Block};
use crate::disasm::{decode, format_listing};
use crate::opcode::{OpCode, Operand};
use std::collections::HashSet;

/// Every jump in `block` (and in nested blocks) lands on the start of an
/// instruction or at the end of the code
fn assert_jumps_on_boundaries(block: &Block) {
    let mut starts = HashSet::new();
    let mut jumps = Vec::new();
    let mut ip = 0;
    while ip < block.code.len() {
        starts.insert(ip);
        let op = OpCode::from_u8(block.code[ip]).unwrap();
        if let Operand::Jump(w) = op.operand() {
            let offset = load_int(&block.code, ip + 1, w).unwrap();
            jumps.push((ip, (ip + 1 + w) as i64 + offset));
        }
        let (_, next) = decode(block, ip).unwrap();
        ip = next;
    }
    assert_eq!(ip, block.code.len());
    starts.insert(block.code.len());

    for (from, target) in jumps {
        assert!(
            target >= 0 && starts.contains(&(target as usize)),
            "jump at {} lands on {}",
            from,
            target
        );
    }
    for value in &block.consts {
        if let Some(inner) = get_block(value) {
            assert_jumps_on_boundaries(&inner);
        }
    }
}

#[test]
fn test_jump_targets() {
    // `a` is unknown at compile time, so nothing folds away.
    let sources = [
        "if (a) 1 else 2",
        "if (a > 1) { b = 1; b } else if (a < 0) { -1 } else { 0 }",
        "while (a) { 1 }",
        "for (s = 0, i: a) { s = s + i; s }",
        "switch a {\ncase 1: \"one\"\ncase 2, 3: \"few\"\ndefault: \"many\"\n}",
        "a ? [1,2] : a ?? 3",
        "a and b or c",
    ];
    for source in sources {
        let block = compiled_block(source);
        assert_jumps_on_boundaries(&block);
    }
}

#[test]
fn test_unknown_names_are_kept() {
    let block = compiled_block("x = 2\ny = a + x");
    let listing = format_listing(&block);
    assert!(listing.contains("get_var \"a\""), "{}", listing);
    assert!(listing.contains("\"x\""), "{}", listing);
}

#[test]
fn test_dead_bindings_are_dropped() {
    // `x` is only read by folded code, so it is not emitted.
    let block = compiled_block("x = 2\ny = x * 4\nz = a + y\nz");
    let listing = format_listing(&block);
    assert!(!listing.contains("\"x\""), "{}", listing);
    assert!(listing.contains("\"y\""), "{}", listing);
}

#[test]
fn test_listing_includes_functions() {
    let block = compiled_block("f = (a, b...) => a + b\nf(x)");
    let listing = format_listing(&block);
    assert!(listing.contains("Function: "), "{}", listing);
    assert!(listing.contains("(a,b...)=>"), "{}", listing);
    assert!(listing.contains("End function: "), "{}", listing);
}

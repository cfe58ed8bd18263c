//! mscript Virtual Machine
//!
//! This crate compiles mscript source into bytecode blocks and runs them on
//! a cooperative, stack-based virtual machine.
//!
//! # Architecture
//!
//! - The compiler is recursive descent over the token list produced by
//!   `mscript-parser`. Every statement it reads is first tried on a private
//!   compile-time VM; statements that finish are replaced by their value.
//! - Syntax trees (`node`) emit their own code into a `BlockBld`, which
//!   picks operand widths and patches jumps.
//! - The VM never recurses natively: calls, loops and callbacks are tasks
//!   on an explicit task stack, so depth and run time stay bounded.
//!
//! # Modules
//!
//! - `opcode`: instruction set and mnemonic templates
//! - `block`: compiled blocks and code locations
//! - `builder`: bytecode builder
//! - `node`: syntax tree and code generation
//! - `compiler`: parser-driven compiler with constant folding
//! - `vm`: the machine, its tasks and scopes
//! - `function`: callable values
//! - `builtins`: runtime library
//! - `disasm`: disassembler
//! - `error`: error types

#![allow(clippy::result_large_err)]

pub mod block;
pub mod builder;
pub mod builtins;
pub mod compiler;
pub mod config;
pub mod disasm;
pub mod error;
pub mod function;
pub mod node;
pub mod opcode;
pub mod vm;

// Re-export main types
pub use block::{Block, CodeLocation};
pub use builtins::{create_runtime, extend_globals};
pub use compiler::{compile_source, Compiler};
pub use config::VmConfig;
pub use disasm::format_listing;
pub use error::{BuildError, CompileError, Error, LimitKind, VmError};
pub use opcode::OpCode;
pub use vm::{AbstractTask, BlockExecution, VirtualMachine};

#[cfg(test)]
mod tests;

//! Error types for the VM and compiler

use crate::block::CodeLocation;
use mscript_parser::ParseError;
use mscript_types::{Object, Value};
use std::fmt;
use std::rc::Rc;

/// Which resource limit was hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    CalcStack,
    TaskStack,
    ScopeStack,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitKind::CalcStack => write!(f, "calc.stack"),
            LimitKind::TaskStack => write!(f, "recursion count - max task count"),
            LimitKind::ScopeStack => write!(f, "recursion count - max scope count"),
        }
    }
}

/// VM runtime errors
///
/// Every runtime failure travels through `VirtualMachine::raise` as one of
/// these. Script-level `raise(v)` becomes `Custom(v)`.
#[derive(Debug, Clone)]
pub enum VmError {
    /// Name lookup failed in every scope
    VariableNotFound(String),

    /// Name already bound in the top scope
    VariableAlreadyAssigned(String),

    /// Index value that cannot select anything
    InvalidDereference(Value),

    /// Call target is not callable
    ArgumentIsNotFunction(Value),

    /// Value used as a block is not one
    ArgumentIsNotBlock(Value),

    /// Unknown opcode byte or truncated operand
    InvalidInstruction(u8),

    /// A stack grew past its configured maximum
    ExecutionLimitReached(LimitKind),

    /// Wall clock deadline passed
    MaxExecutionTimeReached,

    /// User exception carrying an arbitrary value
    Custom(Value),

    /// Runtime error with message
    Runtime(String),
}

impl VmError {
    /// Script-visible form of the exception. Custom exceptions expose their
    /// raw value; VM errors become `{"VMException": message}`.
    pub fn as_value(&self) -> Value {
        match self {
            VmError::Custom(v) => v.clone(),
            other => Value::Object(Object::from_pairs([(
                Rc::from("VMException"),
                Value::from(other.to_string()),
            )])),
        }
    }
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::VariableNotFound(name) => write!(f, "Variable not found: {}", name),
            VmError::VariableAlreadyAssigned(name) => {
                write!(f, "Variable already assigned: {}", name)
            }
            VmError::InvalidDereference(index) => {
                write!(f, "Invalid index: '{}'", index.stringify())
            }
            VmError::ArgumentIsNotFunction(v) => {
                write!(f, "Argument is not a function: '{}'", v.stringify_short(60))
            }
            VmError::ArgumentIsNotBlock(v) => {
                write!(f, "Argument is not a block: '{}'", v.stringify_short(60))
            }
            VmError::InvalidInstruction(op) => write!(f, "Invalid instruction: {}", op),
            VmError::ExecutionLimitReached(kind) => {
                write!(f, "Execution limit reached: {}", kind)
            }
            VmError::MaxExecutionTimeReached => write!(f, "Max execution time reached"),
            VmError::Custom(v) => write!(f, "Code exception: {}", v.stringify()),
            VmError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
        }
    }
}

impl std::error::Error for VmError {}

/// Error raised by the bytecode builder
#[derive(Debug, Clone, PartialEq)]
pub struct BuildError {
    pub text: String,
}

impl BuildError {
    pub fn new(text: impl Into<String>) -> Self {
        BuildError { text: text.into() }
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl std::error::Error for BuildError {}

/// Compiler error with the offending source line
#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub text: String,
    pub location: CodeLocation,
}

impl CompileError {
    pub fn new(text: impl Into<String>, location: CodeLocation) -> Self {
        CompileError {
            text: text.into(),
            location,
        }
    }

    pub fn from_build(err: BuildError, location: CodeLocation) -> Self {
        CompileError {
            text: err.text,
            location,
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: error: {}", self.location, self.text)
    }
}

impl std::error::Error for CompileError {}

/// Anything that can fail between source text and a result
#[derive(Debug, Clone)]
pub enum Error {
    Parse(ParseError),
    Compile(CompileError),
    Vm(VmError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse(e) => write!(f, "Parse error: {}", e),
            Error::Compile(e) => write!(f, "{}", e),
            Error::Vm(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(e) => Some(e),
            Error::Compile(e) => Some(e),
            Error::Vm(e) => Some(e),
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::Parse(e)
    }
}

impl From<CompileError> for Error {
    fn from(e: CompileError) -> Self {
        Error::Compile(e)
    }
}

impl From<VmError> for Error {
    fn from(e: VmError) -> Self {
        Error::Vm(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            VmError::VariableNotFound("x".into()).to_string(),
            "Variable not found: x"
        );
        assert_eq!(
            VmError::InvalidDereference(Value::Null).to_string(),
            "Invalid index: 'null'"
        );
        assert_eq!(
            VmError::Custom(Value::int(3)).to_string(),
            "Code exception: 3"
        );
    }

    #[test]
    fn test_exception_value() {
        assert_eq!(VmError::Custom(Value::from("x")).as_value(), Value::from("x"));
        let v = VmError::MaxExecutionTimeReached.as_value();
        assert_eq!(
            v.member("VMException"),
            Value::from("Max execution time reached")
        );
    }

    #[test]
    fn test_compile_error_display() {
        let e = CompileError::new("Unexpected symbol: )", CodeLocation::new("a.ms", 4));
        assert_eq!(e.to_string(), "a.ms:4: error: Unexpected symbol: )");
    }
}

use super::helpers::{execute, execute_with};
use crate::config::VmConfig;
use crate::error::{Error, LimitKind, VmError};
use mscript_types::Value;

fn compile_error(source: &str) -> (String, usize) {
    match execute(source) {
        Err(Error::Compile(e)) => (e.text, e.location.line),
        other => panic!("expected compile error for {:?}, got {:?}", source, other),
    }
}

fn runtime_error(result: Result<Value, Error>) -> VmError {
    match result {
        Err(Error::Vm(e)) => e,
        other => panic!("expected runtime error, got {:?}", other),
    }
}

#[test]
fn test_compile_errors() {
    assert_eq!(compile_error("a ? 1").0, "Expected ':'");
    assert_eq!(
        compile_error("for (s = 0) { s }").0,
        "Operator `for` must have an iterator"
    );
    assert_eq!(
        compile_error("(a, 1) => a").0,
        "Invalid function parameter list"
    );
    assert!(compile_error("1 + )").0.starts_with("Unexpected symbol"));

    let (text, _) = compile_error("switch a {\ncase 1: 2\ncase 1: 3\n}");
    assert!(text.starts_with("Duplicate case label"), "{}", text);
}

#[test]
fn test_compile_error_location() {
    let (_, line) = compile_error("a = 1\nb = 2\nc = (1 +");
    assert_eq!(line, 3);
}

#[test]
fn test_single_assignment() {
    let err = runtime_error(execute("x = 1; x = 2; x"));
    assert!(matches!(err, VmError::VariableAlreadyAssigned(ref n) if n == "x"));
}

#[test]
fn test_variable_not_found() {
    let err = runtime_error(execute("y + 1"));
    assert!(matches!(err, VmError::VariableNotFound(ref n) if n == "y"));
}

#[test]
fn test_call_non_function() {
    let err = runtime_error(execute("f = 3\nf(1)"));
    assert!(matches!(err, VmError::ArgumentIsNotFunction(_)));
}

#[test]
fn test_task_stack_limit() {
    let config = VmConfig {
        max_task_stack: 50,
        ..VmConfig::default()
    };
    let err = runtime_error(execute_with("f = (n) => f(n + 1)\nf(0)", config));
    assert!(matches!(
        err,
        VmError::ExecutionLimitReached(LimitKind::TaskStack)
    ));
}

#[test]
fn test_time_limit() {
    let config = VmConfig {
        max_execution_time_ms: Some(50),
        compile_time_budget_ms: 10,
        ..VmConfig::default()
    };
    let err = runtime_error(execute_with("while (true) { 1 }", config));
    assert!(matches!(err, VmError::MaxExecutionTimeReached));
}

#[test]
fn test_custom_exception_value() {
    let err = runtime_error(execute("raise [1, 2]"));
    let expected: Value = vec![Value::int(1), Value::int(2)].into();
    assert_eq!(err.as_value(), expected);

    let err = runtime_error(execute("q"));
    assert_eq!(
        err.as_value().member("VMException"),
        Value::from("Variable not found: q")
    );
}

#[test]
fn test_oversized_string_repeat() {
    // Folding reaches the same check; the statement is kept and fails when run
    let err = runtime_error(execute("\"ab\" * 9223372036854775807"));
    assert!(matches!(err, VmError::Runtime(_)), "{:?}", err);
    let err = runtime_error(execute("s = \"ab\"\nn = 9999999999999\ns * n"));
    assert!(err.to_string().contains("exceeds"), "{}", err);
}

use super::helpers::{compile, compiled_block, execute, ints};
use crate::block::CodeLocation;
use crate::builtins::create_runtime;
use crate::config::VmConfig;
use crate::error::VmError;
use crate::opcode::OpCode;
use crate::vm::VirtualMachine;
use mscript_types::{Number, Value};

#[test]
fn test_folded_bindings() {
    let result = execute("x = 2; y = x + 3; y").unwrap();
    assert_eq!(result, Value::int(5));

    // Everything is known at compile time, only the value remains.
    let block = compiled_block("x = 2; y = x + 3; y");
    assert_eq!(block.consts, vec![Value::int(5)]);
}

#[test]
fn test_two_parameter_function() {
    let result = execute("f = (a,b) => a+b; f(3,4)").unwrap();
    assert_eq!(result, Value::int(7));
}

#[test]
fn test_for_loop_result() {
    let result = execute("for (i: [10,20,30]) { i }").unwrap();
    assert_eq!(result, Value::int(30));
}

#[test]
fn test_type_class_method() {
    let result = execute("[1,2,3].reverse()").unwrap();
    assert_eq!(result, ints(&[3, 2, 1]));
}

#[test]
fn test_modulo() {
    assert_eq!(execute("10 % 3").unwrap().as_number(), Some(Number::Int(1)));
    assert_eq!(
        execute("10.0 % 3").unwrap().as_number(),
        Some(Number::Float(1.0))
    );
}

#[test]
fn test_raise_reaches_top_level() {
    let config = VmConfig::default();
    let block = compile("x = 1\nraise \"boom\"\nx", &config).unwrap();
    let mut vm = VirtualMachine::with_config(config);
    vm.set_global_scope(create_runtime());

    let err = vm.exec_block(&block).unwrap_err();
    assert!(err.to_string().contains("boom"));
    let stored = vm.get_exception().unwrap();
    assert!(matches!(stored, VmError::Custom(v) if v.as_str() == Some("boom")));
    assert_eq!(
        vm.get_exception_code_location().first(),
        Some(&CodeLocation::new("<test>", 2))
    );
    // The machine is reset and usable again.
    assert_eq!(vm.calc_len(), 0);
    assert!(vm.scopes().is_empty());
}

#[test]
fn test_constant_expression_is_one_push() {
    let block = compiled_block("1+2*3");
    assert_eq!(block.consts, vec![Value::int(7)]);
    assert_eq!(block.code, vec![OpCode::PushConst1 as u8, 0]);
}

#[test]
fn test_broadcast() {
    assert_eq!(execute("5 + [1,2,3]").unwrap(), ints(&[6, 7, 8]));
    assert_eq!(execute("[1,2,3] + 5").unwrap(), ints(&[6, 7, 8]));
    assert_eq!(execute("[1,2] + [3,4]").unwrap(), ints(&[1, 2, 3, 4]));
    assert_eq!(execute("[2,4] * 2").unwrap(), ints(&[4, 8]));
}

#[test]
fn test_string_operators() {
    assert_eq!(execute("\"ab\" + \"cd\"").unwrap(), Value::from("abcd"));
    assert_eq!(execute("\"abcab\" - \"ab\"").unwrap(), Value::from("cab"));
    assert_eq!(execute("-\"abc\"").unwrap(), Value::from("cba"));
    assert_eq!(execute("-[1,2]").unwrap(), ints(&[2, 1]));
}

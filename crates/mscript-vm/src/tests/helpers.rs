//! Helper functions and common imports for integration tests.

use crate::block::{get_block, Block, CodeLocation};
use crate::builtins::create_runtime;
use crate::compiler::compile_source;
use crate::config::VmConfig;
use crate::error::Error;
use crate::vm::VirtualMachine;
use mscript_types::Value;
use std::rc::Rc;

/// Compiles `source` against the runtime library
pub fn compile(source: &str, config: &VmConfig) -> Result<Value, Error> {
    compile_source(
        source,
        CodeLocation::new("<test>", 1),
        create_runtime(),
        config.clone(),
    )
}

/// Compiles and runs `source` with the given limits
pub fn execute_with(source: &str, config: VmConfig) -> Result<Value, Error> {
    let block = compile(source, &config)?;
    let limit = config.max_execution_time();
    let mut vm = VirtualMachine::with_config(config);
    vm.set_global_scope(create_runtime());
    vm.set_max_execution_time(limit);
    Ok(vm.exec_block(&block)?)
}

/// Helper to compile and execute source code
pub fn execute(source: &str) -> Result<Value, Error> {
    execute_with(source, VmConfig::default())
}

/// Compiled block of `source`
pub fn compiled_block(source: &str) -> Rc<Block> {
    let value = compile(source, &VmConfig::default()).unwrap();
    get_block(&value).unwrap()
}

pub fn ints(values: &[i64]) -> Value {
    values.iter().map(|i| Value::int(*i)).collect()
}

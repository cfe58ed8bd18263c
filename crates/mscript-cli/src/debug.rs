//! `debug` command: runs a script one VM step at a time and dumps the
//! machine state before each step

use crate::runtime::{exception_error, script_error, Settings};
use mscript_types::Value;
use mscript_vm::{BlockExecution, VirtualMachine};
use nu_ansi_term::Color;
use std::fmt::Write;

const VALUE_WIDTH: usize = 60;
/// What a finished block reports as its current instruction
const END_MARK: &str = "<end>";

pub fn run(name: &str, source: &str, settings: &Settings) -> anyhow::Result<()> {
    let block = settings.compile(name, source)?;
    let mut vm = settings.machine();
    vm.push_scope(Value::Undefined).map_err(script_error)?;
    let task = BlockExecution::new(&block).map_err(script_error)?;
    if let Err(err) = vm.push_task(Box::new(task)) {
        vm.raise(err);
    }

    step_through(&mut vm, |dump| print!("{}", dump));

    if let Some(err) = vm.get_exception() {
        return Err(exception_error(&vm, err));
    }
    println!("Result: {}", vm.pop_value().stringify());
    Ok(())
}

/// Runs `vm` to completion, emitting a dump before each step. A block
/// that already ran its last instruction retires silently.
fn step_through(vm: &mut VirtualMachine, mut emit: impl FnMut(String)) {
    let mut step = 0usize;
    while vm.has_tasks() {
        if !is_retiring(vm) {
            emit(dump_state(vm, step));
            step += 1;
        }
        vm.run();
    }
}

fn is_retiring(vm: &VirtualMachine) -> bool {
    vm.tasks()
        .last()
        .and_then(|task| task.current_instruction())
        .is_some_and(|text| text == END_MARK)
}

/// Task stack (top first), calc stack and scope stack
fn dump_state(vm: &VirtualMachine, step: usize) -> String {
    let mut out = String::new();
    let heading = |text: &str| Color::Cyan.bold().paint(text.to_string()).to_string();

    let _ = writeln!(out, "{}", Color::Yellow.bold().paint(format!("=== Step {} ===", step)));
    let _ = writeln!(out, "{}", heading("Tasks:"));
    for (depth, task) in vm.tasks().iter().rev().enumerate() {
        let location = task
            .code_location()
            .map(|l| l.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(out, "  #{} {} at {}", depth, task.name(), location);
        if depth == 0 {
            if let Some(instruction) = task.current_instruction() {
                let _ = writeln!(out, "      {}", instruction);
            }
        }
    }

    let _ = writeln!(out, "{}", heading("Calc stack:"));
    for (i, value) in vm.calc_stack().iter().enumerate().rev() {
        let _ = writeln!(out, "  [{}] {}", i, value.stringify_short(VALUE_WIDTH));
    }

    let _ = writeln!(out, "{}", heading("Scopes:"));
    for (i, scope) in vm.scopes().iter().enumerate().rev() {
        let locals: Vec<String> = scope
            .locals()
            .map(|(k, v)| format!("{}={}", k, v.stringify_short(VALUE_WIDTH)))
            .collect();
        let _ = writeln!(out, "  [{}] {{{}}}", i, locals.join(", "));
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_lists_stacks() {
        let settings = Settings::load(None, None, None).unwrap();
        let block = settings.compile("<test>", "x = a + 1").unwrap();
        let mut vm = settings.machine();
        vm.push_scope(Value::Undefined).unwrap();
        vm.push_task(Box::new(BlockExecution::new(&block).unwrap()))
            .unwrap();
        let dump = dump_state(&vm, 0);
        assert!(dump.contains("Step 0"));
        assert!(dump.contains("block at <test>"));
        assert!(dump.contains("Scopes:"));
    }

    #[test]
    fn test_finished_blocks_are_not_dumped() {
        let settings = Settings::load(None, None, None).unwrap();
        // Folds to a single push
        let block = settings.compile("<test>", "1 + 2").unwrap();
        let mut vm = settings.machine();
        vm.push_scope(Value::Undefined).unwrap();
        vm.push_task(Box::new(BlockExecution::new(&block).unwrap()))
            .unwrap();
        let mut dumps = Vec::new();
        step_through(&mut vm, |d| dumps.push(d));
        assert_eq!(dumps.len(), 1);
        assert!(!dumps[0].contains(END_MARK));
        assert_eq!(vm.pop_value(), Value::int(3));
    }
}

//! Cooperative task protocol

use crate::block::CodeLocation;
use crate::error::VmError;
use crate::vm::VirtualMachine;

/// Unit of work on the task stack
///
/// The VM repeatedly takes the top task and calls `run`. A task that needs
/// another computation first (a function call, a callback) pushes a child
/// task and returns `Ok(true)`; the child runs to completion and leaves its
/// result on the calc stack before the parent resumes.
pub trait AbstractTask {
    /// Called once when the task is pushed. Returning `Ok(false)` means the
    /// task finished during initialisation and is not kept.
    fn init(&mut self, _vm: &mut VirtualMachine) -> Result<bool, VmError> {
        Ok(true)
    }

    /// One step. `Ok(true)` keeps the task, `Ok(false)` retires it.
    fn run(&mut self, vm: &mut VirtualMachine) -> Result<bool, VmError>;

    /// Offered every exception raised above or inside this task. Returning
    /// true claims it and stops unwinding.
    fn exception(&mut self, _vm: &mut VirtualMachine, _error: &VmError) -> bool {
        false
    }

    fn code_location(&self) -> Option<CodeLocation> {
        None
    }

    /// Short name for debugger output
    fn name(&self) -> &'static str;

    /// Text of the instruction the task will execute next, if it runs code
    fn current_instruction(&self) -> Option<String> {
        None
    }
}

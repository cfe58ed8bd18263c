//! Virtual Machine implementation
//!
//! The machine owns three stacks:
//!
//! - the task stack: cooperative units of work, the top one runs next
//! - the calc stack: operands and results
//! - the scope stack: variable bindings, searched top-down
//!
//! Exceptions unwind the task stack; any task may claim one.

use crate::block::CodeLocation;
use crate::config::VmConfig;
use crate::error::{LimitKind, VmError};
use crate::function::get_function;
use mscript_types::{Array, Value, LIST_MARKER, PARAM_PACK};
use std::rc::Rc;
use std::time::{Duration, Instant};
use tracing::debug;

// Module structure
pub mod execution;
pub(crate) mod ops;
mod scope;
mod task;

pub use execution::BlockExecution;
pub use scope::Scope;
pub use task::AbstractTask;

/// Calc and scope stack depths saved by `save_state`
#[derive(Debug, Clone)]
pub struct VmState {
    values: usize,
    scopes: usize,
    pack: Option<Value>,
}

/// Wraps `items` as a parameter pack
pub fn make_pack(items: Vec<Value>) -> Value {
    Value::Array(Array::from_vec(items).with_flags(PARAM_PACK))
}

/// Virtual Machine
pub struct VirtualMachine {
    tasks: Vec<Box<dyn AbstractTask>>,
    calc: Vec<Value>,
    scopes: Vec<Scope>,
    /// Popped scopes kept for reuse
    free_scopes: Vec<Scope>,
    global: Value,
    config: VmConfig,
    deadline: Option<Instant>,
    compile_time: bool,
    exception: Option<VmError>,
    exception_locations: Vec<CodeLocation>,
}

impl Default for VirtualMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualMachine {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self {
            tasks: Vec::with_capacity(64),
            calc: Vec::with_capacity(256),
            scopes: Vec::with_capacity(64),
            free_scopes: Vec::new(),
            global: Value::empty_object(),
            config,
            deadline: None,
            compile_time: false,
            exception: None,
            exception_locations: Vec::new(),
        }
    }

    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Object whose members back the bottom scope
    pub fn set_global_scope(&mut self, global: Value) {
        self.global = global;
    }

    pub fn global(&self) -> &Value {
        &self.global
    }

    pub fn set_compile_time(&mut self, on: bool) {
        self.compile_time = on;
    }

    /// True while the VM evaluates code on behalf of the compiler
    pub fn is_compile_time(&self) -> bool {
        self.compile_time
    }

    /// Arms the wall clock limit, measured from now
    pub fn set_max_execution_time(&mut self, limit: Option<Duration>) {
        self.deadline = limit.map(|d| Instant::now() + d);
    }

    // ===== Tasks =====

    pub fn push_task(&mut self, mut task: Box<dyn AbstractTask>) -> Result<(), VmError> {
        if self.tasks.len() >= self.config.max_task_stack {
            return Err(VmError::ExecutionLimitReached(LimitKind::TaskStack));
        }
        if task.init(self)? {
            self.tasks.push(task);
        }
        Ok(())
    }

    pub fn tasks(&self) -> &[Box<dyn AbstractTask>] {
        &self.tasks
    }

    pub fn has_tasks(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Runs one step of the top task. Returns false once the task stack is
    /// empty.
    pub fn run(&mut self) -> bool {
        let depth = self.tasks.len();
        if depth == 0 {
            return false;
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                // Fires once; a handler that claims it keeps running.
                self.deadline = None;
                debug!("execution time limit reached");
                self.raise(VmError::MaxExecutionTimeReached);
                return !self.tasks.is_empty();
            }
        }
        let Some(mut task) = self.tasks.pop() else {
            return false;
        };
        let result = task.run(self);
        // Children pushed during the step stay above the parent.
        let pos = (depth - 1).min(self.tasks.len());
        match result {
            Ok(true) => self.tasks.insert(pos, task),
            Ok(false) => {}
            Err(e) => {
                self.tasks.insert(pos, task);
                self.raise(e);
            }
        }
        !self.tasks.is_empty()
    }

    /// Unwinds the task stack until a task claims `error`. When none does,
    /// the VM is reset and the error kept for `exception`.
    pub fn raise(&mut self, error: VmError) {
        let mut locations = Vec::new();
        while let Some(mut task) = self.tasks.pop() {
            let depth = self.tasks.len();
            if task.exception(self, &error) {
                let pos = depth.min(self.tasks.len());
                self.tasks.insert(pos, task);
                return;
            }
            if let Some(loc) = task.code_location() {
                locations.push(loc);
            }
        }
        debug!(error = %error, "unhandled exception");
        self.reset();
        self.exception_locations = locations;
        self.exception = Some(error);
    }

    /// Empties every stack and forgets the last exception
    pub fn reset(&mut self) {
        self.tasks.clear();
        self.calc.clear();
        while self.pop_scope() {}
        self.exception = None;
        self.exception_locations.clear();
    }

    pub fn get_exception(&self) -> Option<&VmError> {
        self.exception.as_ref()
    }

    /// Code locations of the tasks that were unwound, innermost first
    pub fn get_exception_code_location(&self) -> &[CodeLocation] {
        &self.exception_locations
    }

    /// Runs all tasks and returns the value left on top of the calc stack
    pub fn exec(&mut self) -> Result<Value, VmError> {
        while self.run() {}
        if let Some(e) = &self.exception {
            return Err(e.clone());
        }
        Ok(self.pop_value())
    }

    /// Runs `task` inside a fresh scope
    pub fn exec_task(&mut self, task: Box<dyn AbstractTask>) -> Result<Value, VmError> {
        self.exception = None;
        self.exception_locations.clear();
        let scopes = self.scopes.len();
        if let Err(e) = self.push_scope(Value::Undefined) {
            self.raise(e);
            return self.exec();
        }
        if let Err(e) = self.push_task(task) {
            self.raise(e);
        }
        let result = self.exec();
        if result.is_ok() {
            while self.scopes.len() > scopes && self.pop_scope() {}
        }
        result
    }

    /// Executes a compiled block value
    pub fn exec_block(&mut self, block: &Value) -> Result<Value, VmError> {
        let task = BlockExecution::new(block)?;
        self.exec_task(Box::new(task))
    }

    // ===== Calc stack =====

    pub fn push_value(&mut self, value: Value) -> Result<(), VmError> {
        if self.calc.len() >= self.config.max_calc_stack {
            return Err(VmError::ExecutionLimitReached(LimitKind::CalcStack));
        }
        self.calc.push(value);
        Ok(())
    }

    /// Pops the top value, turning a parameter pack into an ordinary value
    pub fn pop_value(&mut self) -> Value {
        self.calc.pop().map(Value::unpack).unwrap_or_default()
    }

    /// Pops the top value as is
    pub fn pop_raw(&mut self) -> Value {
        self.calc.pop().unwrap_or_default()
    }

    pub fn top_value(&self) -> Value {
        self.calc.last().cloned().map(Value::unpack).unwrap_or_default()
    }

    pub fn top_raw(&self) -> Option<&Value> {
        self.calc.last()
    }

    pub fn del_value(&mut self) {
        self.calc.pop();
    }

    pub fn calc_len(&self) -> usize {
        self.calc.len()
    }

    pub fn calc_stack(&self) -> &[Value] {
        &self.calc
    }

    /// Value `depth` places below the top (0 is the top)
    pub fn value_at(&self, depth: usize) -> Option<&Value> {
        let len = self.calc.len();
        depth.checked_add(1).filter(|d| *d <= len).map(|d| &self.calc[len - d])
    }

    pub fn dup_value(&mut self, depth: usize) -> Result<(), VmError> {
        let v = self
            .value_at(depth)
            .cloned()
            .ok_or_else(|| VmError::Runtime(format!("calc stack has no item at depth {}", depth)))?;
        self.push_value(v.unpack())
    }

    /// Swaps the top with the value `depth` places below it
    pub fn swap_values(&mut self, depth: usize) -> Result<(), VmError> {
        let len = self.calc.len();
        if depth == 0 {
            return Ok(());
        }
        if depth >= len {
            return Err(VmError::Runtime(format!(
                "calc stack has no item at depth {}",
                depth
            )));
        }
        self.calc.swap(len - 1, len - 1 - depth);
        Ok(())
    }

    /// Replaces the top value
    pub fn replace_top(&mut self, value: Value) {
        match self.calc.last_mut() {
            Some(top) => *top = value,
            None => self.calc.push(value),
        }
    }

    /// Packs the top `count` values into one parameter pack. A single value
    /// is left alone.
    pub fn define_param_pack(&mut self, count: usize) -> Result<(), VmError> {
        let count = count.min(self.calc.len());
        if count == 1 {
            return Ok(());
        }
        let items = self.calc.split_off(self.calc.len() - count);
        self.push_value(make_pack(items.into_iter().map(Value::unpack).collect()))
    }

    /// Parameters held by the top value: the items of a pack, otherwise the
    /// value itself
    pub fn top_params(&self) -> Vec<Value> {
        match self.calc.last() {
            Some(Value::Array(a)) if a.is_param_pack() => a.to_vec(),
            Some(v) => vec![v.clone()],
            None => Vec::new(),
        }
    }

    /// Pops the top value as a parameter list
    pub fn pop_params(&mut self) -> Vec<Value> {
        let params = self.top_params();
        self.calc.pop();
        params
    }

    pub fn begin_list(&mut self) -> Result<(), VmError> {
        self.push_value(Value::Array(Array::new().with_flags(LIST_MARKER)))
    }

    /// Collects everything above the list marker into one pack, splicing
    /// the items of nested packs
    pub fn finish_list(&mut self) -> Result<(), VmError> {
        let marker = self
            .calc
            .iter()
            .rposition(|v| matches!(v, Value::Array(a) if a.is_marker()))
            .ok_or_else(|| VmError::Runtime("close_list without begin_list".into()))?;
        let items = self.calc.split_off(marker + 1);
        self.calc.pop();
        let mut flat = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Value::Array(a) if a.is_param_pack() => flat.extend(a.iter()),
                other => flat.push(other),
            }
        }
        self.push_value(make_pack(flat))
    }

    // ===== Scopes =====

    /// Pushes a scope backed by `base`. The first scope is always backed by
    /// the global object.
    pub fn push_scope(&mut self, base: Value) -> Result<(), VmError> {
        if self.scopes.is_empty() {
            let global = self.global.clone();
            self.push_scope_unchecked(global);
            if !base.is_defined() {
                return Ok(());
            }
        }
        if self.scopes.len() >= self.config.max_scope_stack {
            return Err(VmError::ExecutionLimitReached(LimitKind::ScopeStack));
        }
        self.push_scope_unchecked(base);
        Ok(())
    }

    /// Pushes a scope backed by `base` that `this` resolves to
    pub fn push_this_scope(&mut self, base: Value) -> Result<(), VmError> {
        let depth = self.scopes.len();
        self.push_scope(base)?;
        if self.scopes.len() > depth {
            if let Some(scope) = self.scopes.last_mut() {
                scope.mark_this();
            }
        }
        Ok(())
    }

    fn push_scope_unchecked(&mut self, base: Value) {
        let scope = match self.free_scopes.pop() {
            Some(mut s) => {
                s.reset(base);
                s
            }
            None => Scope::new(base),
        };
        self.scopes.push(scope);
    }

    /// Returns false when there was no scope to pop
    pub fn pop_scope(&mut self) -> bool {
        match self.scopes.pop() {
            Some(mut s) => {
                s.reset(Value::Undefined);
                self.free_scopes.push(s);
                true
            }
            None => false,
        }
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn top_scope(&self) -> Option<&Scope> {
        self.scopes.last()
    }

    /// Top scope converted to an object
    pub fn scope_to_object(&self) -> Value {
        self.scopes
            .last()
            .map(Scope::convert_to_object)
            .unwrap_or_default()
    }

    /// Looks `name` up through every scope, top first. An unbound `this`
    /// resolves to the nearest receiver scope as an object. While compiling,
    /// a `this` with no receiver scope below it is unknown.
    pub fn get_var(&self, name: &str) -> Option<Value> {
        for scope in self.scopes.iter().rev() {
            if let Some(v) = scope.get(name) {
                return Some(v);
            }
        }
        if self.scopes.is_empty() && self.global.has_member(name) {
            return Some(self.global.member(name));
        }
        if name == "this" {
            if self.compile_time && !self.scopes.iter().any(Scope::binds_this) {
                return None;
            }
            return Some(self.get_this());
        }
        None
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.get_var(name).is_some_and(|v| v.is_defined())
    }

    /// Object view of the nearest receiver scope: a method call's receiver,
    /// a `with` object or an object under construction. Outside of those it
    /// is the global scope.
    pub fn get_this(&self) -> Value {
        self.scopes
            .iter()
            .rev()
            .find(|s| s.binds_this())
            .or_else(|| self.scopes.first())
            .map(Scope::convert_to_object)
            .unwrap_or_else(|| self.global.clone())
    }

    /// Binds `name` in the top scope; false when already bound there
    pub fn set_var(&mut self, name: Rc<str>, value: Value) -> bool {
        match self.scopes.last_mut() {
            Some(scope) => scope.set(name, value),
            None => false,
        }
    }

    // ===== State =====

    /// Records stack depths. With `with_pack` the top value is popped and
    /// kept so `restore_state` can push it back.
    pub fn save_state(&mut self, with_pack: bool) -> VmState {
        let pack = if with_pack { Some(self.pop_raw()) } else { None };
        VmState {
            values: self.calc.len(),
            scopes: self.scopes.len(),
            pack,
        }
    }

    /// Truncates the calc and scope stacks back to a saved state
    pub fn restore_state(&mut self, state: VmState) {
        self.calc.truncate(state.values);
        while self.scopes.len() > state.scopes && self.pop_scope() {}
        if let Some(pack) = state.pack {
            self.calc.push(pack);
        }
    }

    // ===== Calls =====

    /// Calls `fun` with the parameter pack already on the calc stack
    pub fn call_function_raw(&mut self, fun: &Value, object: &Value) -> Result<(), VmError> {
        let f = get_function(fun).ok_or_else(|| VmError::ArgumentIsNotFunction(fun.clone()))?;
        let closure = fun
            .strip_key()
            .as_native()
            .map(|n| n.content().clone())
            .unwrap_or_default();
        f.call(self, object, &closure)
    }

    /// Pushes `args` as a pack and calls `fun`
    pub fn call_function(
        &mut self,
        fun: &Value,
        object: &Value,
        args: Vec<Value>,
    ) -> Result<(), VmError> {
        if args.len() == 1 {
            self.push_value(args.into_iter().next().unwrap_or_default())?;
        } else {
            self.push_value(make_pack(args))?;
        }
        self.call_function_raw(fun, object)
    }
}

//! Compile-time evaluation of statements
//!
//! Each block gets its own `ConstantFolder`: a private VM whose bottom
//! scope is the global object and whose second scope collects the block's
//! compile-time bindings. A statement is run in a scratch scope on top of
//! those under the `CompileTimeContent` harness. If it finishes, its value
//! replaces the statement and its bindings move into the block scope; if
//! it raises, the harness swallows the error and the statement is kept.

use super::{Compiler, Mark};
use crate::block::{pack_block, CodeLocation};
use crate::config::VmConfig;
use crate::error::{CompileError, VmError};
use crate::node::{build_code, Node, VarSet};
use crate::vm::{AbstractTask, BlockExecution, VirtualMachine, VmState};
use mscript_parser::{Element, Symbol};
use mscript_types::Value;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tracing::debug;

/// What happens to bindings the folder evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingMode {
    /// Only names still read by kept statements are emitted
    Drop,
    /// Every binding is emitted; the block's scope is observable
    Keep,
}

/// Where a statement list stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum BlockEnd {
    Eof,
    Brace,
    /// A switch case body: `case`, `default` or the closing brace
    Case,
}

impl BlockEnd {
    fn reached(self, element: &Element) -> bool {
        match self {
            BlockEnd::Eof => element.symbol == Symbol::Eof,
            BlockEnd::Brace => matches!(element.symbol, Symbol::RightBrace | Symbol::Eof),
            BlockEnd::Case => {
                matches!(element.symbol, Symbol::RightBrace | Symbol::Eof)
                    || (element.symbol == Symbol::Identifier
                        && matches!(element.data.as_str(), Some("case" | "default")))
            }
        }
    }
}

/// Harness task below a compile-time statement. It claims any exception,
/// rolls the stacks back and records the error.
struct CompileTimeContent {
    state: Option<VmState>,
    failure: Rc<RefCell<Option<VmError>>>,
}

impl AbstractTask for CompileTimeContent {
    fn init(&mut self, vm: &mut VirtualMachine) -> Result<bool, VmError> {
        self.state = Some(vm.save_state(false));
        Ok(true)
    }

    fn run(&mut self, _vm: &mut VirtualMachine) -> Result<bool, VmError> {
        Ok(false)
    }

    fn exception(&mut self, vm: &mut VirtualMachine, error: &VmError) -> bool {
        if let Some(state) = self.state.take() {
            vm.restore_state(state);
        }
        *self.failure.borrow_mut() = Some(error.clone());
        true
    }

    fn name(&self) -> &'static str {
        "compile-time"
    }
}

pub(super) struct ConstantFolder {
    vm: VirtualMachine,
    budget: Duration,
}

impl ConstantFolder {
    pub(super) fn new(global: &Value, config: &VmConfig) -> Result<Self, VmError> {
        let mut vm = VirtualMachine::with_config(config.clone());
        vm.set_compile_time(true);
        vm.set_global_scope(global.clone());
        // Global scope, then the block scope.
        vm.push_scope(Value::Undefined)?;
        vm.push_scope(Value::Undefined)?;
        Ok(Self {
            vm,
            budget: config.compile_time_budget(),
        })
    }

    /// Tries to evaluate `node`. Returns its value when it ran to
    /// completion and none of its bindings clash with earlier ones.
    pub(super) fn fold(
        &mut self,
        node: &Node,
        location: &CodeLocation,
    ) -> Result<Option<Value>, CompileError> {
        let block = build_code(node, location.clone())
            .map_err(|e| CompileError::from_build(e, location.clone()))?;
        let block = pack_block(block);

        let vm = &mut self.vm;
        vm.set_max_execution_time(Some(self.budget));
        if vm.push_scope(Value::Undefined).is_err() {
            return Ok(None);
        }
        let failure = Rc::new(RefCell::new(None));
        let harness = CompileTimeContent {
            state: None,
            failure: failure.clone(),
        };
        if let Err(e) = vm.push_task(Box::new(harness)) {
            vm.pop_scope();
            debug!(location = %location, error = %e, "statement kept");
            return Ok(None);
        }
        match BlockExecution::new(&block) {
            Ok(task) => {
                if let Err(e) = vm.push_task(Box::new(task)) {
                    vm.raise(e);
                }
            }
            Err(e) => vm.raise(e),
        }
        while vm.run() {}
        vm.set_max_execution_time(None);

        if let Some(e) = failure.borrow_mut().take() {
            vm.pop_scope();
            debug!(location = %location, error = %e, "statement kept");
            return Ok(None);
        }

        let value = vm.pop_value();
        let locals: Vec<(Rc<str>, Value)> = vm
            .top_scope()
            .map(|s| s.locals().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        vm.pop_scope();

        let clash = vm
            .top_scope()
            .map(|s| locals.iter().any(|(k, _)| s.get_local(k).is_some()))
            .unwrap_or(true);
        if clash {
            debug!(location = %location, "statement kept: rebinds a name");
            return Ok(None);
        }
        for (name, v) in locals {
            vm.set_var(name, v);
        }
        debug!(location = %location, value = %value.stringify_short(50), "statement folded");
        Ok(Some(value))
    }

    /// Bindings collected so far, in name order
    pub(super) fn bindings(&self) -> Vec<(Rc<str>, Value)> {
        self.vm
            .top_scope()
            .map(|s| s.locals_object())
            .map(|o| o.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }
}

impl Compiler {
    /// Compiles statements up to `end` (not consumed) and folds them
    pub(super) fn compile_block_content(
        &mut self,
        mode: BindingMode,
        end: BlockEnd,
    ) -> Result<Node, CompileError> {
        let mut folder = ConstantFolder::new(&self.global, &self.config)
            .map_err(|e| self.error(e.to_string()))?;
        let mut kept = Vec::new();
        let mut vars = VarSet::new();
        let mut last = None;

        loop {
            while matches!(self.symbol(), Symbol::Separator | Symbol::Semicolon) {
                self.commit();
            }
            if end.reached(self.peek()) {
                break;
            }
            let line = self.line;
            let node = self.compile_statement()?;
            if !matches!(self.symbol(), Symbol::Separator | Symbol::Semicolon)
                && !end.reached(self.peek())
            {
                return Err(self.error("Expected end of statement"));
            }

            match folder.fold(&node, &self.location.with_line(line))? {
                Some(value) => last = Some(value),
                None => {
                    node.list_vars(&mut vars);
                    kept.push(Node::InputLineMap {
                        line,
                        node: Box::new(node),
                    });
                    last = None;
                }
            }
        }

        let mut out: Vec<Node> = folder
            .bindings()
            .into_iter()
            .filter(|(name, _)| mode == BindingMode::Keep || vars.contains(name))
            .map(|(name, value)| Node::assign(name, Node::Value(value)))
            .collect();
        out.extend(kept);
        if let Some(value) = last {
            out.push(Node::Value(value));
        }
        Ok(Node::Block(out))
    }

    /// Evaluates a constant expression in a fresh compile-time VM
    pub(super) fn evaluate_constant(&self, node: &Node, line: usize) -> Option<Value> {
        let block = self.build_block(node, line).ok()?;
        let mut vm = VirtualMachine::with_config(self.config.clone());
        vm.set_compile_time(true);
        vm.set_global_scope(self.global.clone());
        vm.set_max_execution_time(Some(self.config.compile_time_budget()));
        vm.exec_block(&block).ok()
    }

    /// Runs `f` and rewinds the cursor when it returns `None`
    pub(super) fn attempt<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<Option<T>, CompileError>,
    ) -> Result<Option<T>, CompileError> {
        let mark: Mark = self.mark();
        let result = f(self)?;
        if result.is_none() {
            self.restore(mark);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::OpCode;

    #[test]
    fn test_fold_records_bindings() {
        let mut folder = ConstantFolder::new(&Value::empty_object(), &VmConfig::default()).unwrap();
        let loc = CodeLocation::default();
        let node = Node::assign("x".into(), Node::Number(Value::int(4)));
        assert_eq!(folder.fold(&node, &loc).unwrap(), Some(Value::int(4)));
        let read = Node::binary(
            OpCode::OpMult,
            Node::Identifier("x".into()),
            Node::Number(Value::int(2)),
        );
        assert_eq!(folder.fold(&read, &loc).unwrap(), Some(Value::int(8)));
        assert_eq!(folder.bindings(), vec![("x".into(), Value::int(4))]);
    }

    #[test]
    fn test_failed_statement_leaves_no_trace() {
        let mut folder = ConstantFolder::new(&Value::empty_object(), &VmConfig::default()).unwrap();
        let loc = CodeLocation::default();
        let node = Node::assign("y".into(), Node::Identifier("missing".into()));
        assert_eq!(folder.fold(&node, &loc).unwrap(), None);
        assert!(folder.bindings().is_empty());
        assert_eq!(folder.vm.calc_len(), 0);
        assert_eq!(folder.vm.scopes().len(), 2);
    }

    #[test]
    fn test_rebinding_is_not_folded() {
        let mut folder = ConstantFolder::new(&Value::empty_object(), &VmConfig::default()).unwrap();
        let loc = CodeLocation::default();
        let first = Node::assign("z".into(), Node::Number(Value::int(1)));
        let second = Node::assign("z".into(), Node::Number(Value::int(2)));
        assert!(folder.fold(&first, &loc).unwrap().is_some());
        assert_eq!(folder.fold(&second, &loc).unwrap(), None);
        assert_eq!(folder.bindings(), vec![("z".into(), Value::int(1))]);
    }
}

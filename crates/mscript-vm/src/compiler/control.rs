//! Control flow and scoping constructs

use super::folding::{BindingMode, BlockEnd};
use super::Compiler;
use crate::error::CompileError;
use crate::node::Node;
use crate::opcode::OpCode;
use mscript_parser::Symbol;
use mscript_types::Value;

impl Compiler {
    /// Body of a branch or loop. Block literals are used as they are;
    /// any other expression is wrapped into a block of its own.
    fn compile_body(&mut self) -> Result<Node, CompileError> {
        self.skip_separators();
        let line = self.line;
        let node = self.compile_expression()?;
        self.as_block_value(node, line)
    }

    fn as_block_value(&self, node: Node, line: usize) -> Result<Node, CompileError> {
        match node {
            Node::BlockValue { .. } => Ok(node),
            other => {
                let block = self.build_block(&other, line)?;
                Ok(Node::BlockValue {
                    block,
                    tree: Box::new(other),
                })
            }
        }
    }

    fn compile_condition(&mut self) -> Result<Node, CompileError> {
        self.sync(Symbol::LeftParen)?;
        self.skip_separators();
        let cond = self.compile_expression()?;
        self.skip_separators();
        self.sync(Symbol::RightParen)?;
        Ok(cond)
    }

    /// `if (c) A [else B]`; `else` may follow on a later line
    pub(super) fn compile_if(&mut self) -> Result<Node, CompileError> {
        self.commit();
        let cond = self.compile_condition()?;
        let then = Node::exec(self.compile_body()?);

        let mark = self.mark();
        self.skip_separators();
        let otherwise = if self.accept(Symbol::KwElse) {
            self.skip_separators();
            if self.symbol() == Symbol::KwIf {
                self.compile_if()?
            } else {
                Node::exec(self.compile_body()?)
            }
        } else {
            self.restore(mark);
            Node::Direct(OpCode::PushNull)
        };
        Ok(Node::if_else(cond, then, otherwise))
    }

    /// `for (init = x, ..., it: container) body`
    pub(super) fn compile_for(&mut self) -> Result<Node, CompileError> {
        self.commit();
        self.sync(Symbol::LeftParen)?;
        let mut init = Vec::new();
        let mut iterator = None;
        loop {
            self.skip_separators();
            let name = self.identifier()?;
            match self.symbol() {
                Symbol::Equal => {
                    self.commit();
                    self.skip_separators();
                    init.push((name, self.compile_expression()?));
                }
                Symbol::Colon => {
                    self.commit();
                    if iterator.is_some() {
                        return Err(self.error("Operator `for` can have only one iterator"));
                    }
                    self.skip_separators();
                    iterator = Some((name, self.compile_expression()?));
                }
                _ => self.sync(Symbol::Colon)?,
            }
            self.skip_separators();
            match self.symbol() {
                Symbol::Comma | Symbol::Semicolon => {
                    self.commit();
                }
                _ => {
                    self.sync(Symbol::RightParen)?;
                    break;
                }
            }
        }
        let Some((iterator, container)) = iterator else {
            return Err(self.error("Operator `for` must have an iterator"));
        };
        let body = self.compile_body()?;
        Ok(Node::ForLoop {
            iterator,
            container: Box::new(container),
            init,
            body: Box::new(body),
        })
    }

    pub(super) fn compile_while(&mut self) -> Result<Node, CompileError> {
        self.commit();
        let condition = self.compile_condition()?;
        let body = self.compile_body()?;
        Ok(Node::WhileLoop {
            condition: Box::new(condition),
            body: Box::new(body),
        })
    }

    /// `switch sel { case A, B: ... default: ... }`
    pub(super) fn compile_switch(&mut self) -> Result<Node, CompileError> {
        self.commit();
        let selector = self.compile_expression()?;
        self.skip_separators();
        self.sync(Symbol::LeftBrace)?;

        let mut labels: Vec<(Value, usize)> = Vec::new();
        let mut cases = Vec::new();
        let mut default = None;
        loop {
            while matches!(self.symbol(), Symbol::Separator | Symbol::Semicolon) {
                self.commit();
            }
            if self.accept(Symbol::RightBrace) {
                break;
            }
            if self.at_word("case") {
                self.commit();
                let index = cases.len();
                loop {
                    self.skip_separators();
                    let line = self.line;
                    let expr = self.compile_expression()?;
                    let label = self
                        .evaluate_constant(&expr, line)
                        .ok_or_else(|| self.error("Case label must be a constant expression"))?;
                    if labels.iter().any(|(l, _)| l.strict_eq(&label)) {
                        return Err(self.error(format!(
                            "Duplicate case label: {}",
                            label.stringify()
                        )));
                    }
                    labels.push((label, index));
                    if !self.accept(Symbol::Comma) {
                        break;
                    }
                }
                self.sync(Symbol::Colon)?;
                cases.push(self.compile_block_content(BindingMode::Keep, BlockEnd::Case)?);
            } else if self.at_word("default") {
                self.commit();
                self.sync(Symbol::Colon)?;
                if default.is_some() {
                    return Err(self.error("Duplicate default in switch"));
                }
                default = Some(Box::new(
                    self.compile_block_content(BindingMode::Keep, BlockEnd::Case)?,
                ));
            } else {
                return Err(self.error(format!(
                    "Expected symbol: `case`, found: `{}`",
                    super::describe(self.peek())
                )));
            }
        }
        Ok(Node::SwitchCase {
            selector: Box::new(selector),
            labels,
            cases,
            default,
        })
    }

    /// Operand of `exec`, `with` and `object`: a block literal or a name
    fn compile_block_operand(&mut self) -> Result<Node, CompileError> {
        self.skip_separators();
        match self.symbol() {
            Symbol::LeftBrace => self.compile_block_literal(),
            Symbol::Identifier => {
                let name = self.identifier()?;
                self.compile_suffixes(Node::Identifier(name))
            }
            _ => Err(self.error(format!(
                "Expected block, found: `{}`",
                super::describe(self.peek())
            ))),
        }
    }

    /// `exec block`: runs the block in a new scope
    pub(super) fn compile_exec(&mut self) -> Result<Node, CompileError> {
        self.commit();
        let block = self.compile_block_operand()?;
        Ok(Node::KwExec(Box::new(block)))
    }

    /// `with obj block`: runs the block in a scope backed by `obj`
    pub(super) fn compile_with(&mut self) -> Result<Node, CompileError> {
        self.commit();
        let object = self.compile_block_operand()?;
        let block = self.compile_block_operand()?;
        Ok(Node::KwWith {
            object: Box::new(object),
            block: Box::new(block),
        })
    }

    /// `object block` or `object base block`; evaluates to the scope's
    /// bindings merged over the base
    pub(super) fn compile_object(&mut self) -> Result<Node, CompileError> {
        self.commit();
        let first = self.compile_block_operand()?;
        if matches!(self.symbol(), Symbol::LeftBrace | Symbol::Identifier) {
            let block = self.compile_block_operand()?;
            return Ok(Node::KwExecObject {
                base: Box::new(first),
                block: Box::new(block),
            });
        }
        Ok(Node::KwExecNewObject(Box::new(first)))
    }

    /// `constexpr expr`: the value is computed by the compiler
    pub(super) fn compile_constexpr(&mut self) -> Result<Node, CompileError> {
        self.commit();
        let line = self.line;
        let expr = self.compile_expression()?;
        let value = self
            .evaluate_constant(&expr, line)
            .ok_or_else(|| self.error("Expression is not a constant"))?;
        Ok(Node::Value(value))
    }
}

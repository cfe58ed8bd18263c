//! Binary operators and suffixes
//!
//! Lowest precedence first: ternary, `or`/`??`, `and`, comparisons,
//! `@custom` operators, ranges, additive, multiplicative, then `^`.

use super::Compiler;
use crate::error::CompileError;
use crate::node::{ListItem, Node};
use crate::opcode::OpCode;
use mscript_parser::Symbol;

impl Compiler {
    pub(super) fn compile_expression(&mut self) -> Result<Node, CompileError> {
        let cond = self.compile_or()?;
        if !self.accept(Symbol::Question) {
            return Ok(cond);
        }
        self.skip_separators();
        let then = self.compile_expression()?;
        self.skip_separators();
        if !self.accept(Symbol::Colon) {
            return Err(self.error("Expected ':'"));
        }
        self.skip_separators();
        let otherwise = self.compile_expression()?;
        Ok(Node::if_else(cond, then, otherwise))
    }

    fn compile_or(&mut self) -> Result<Node, CompileError> {
        let mut left = self.compile_and()?;
        loop {
            match self.symbol() {
                Symbol::KwOr => {
                    self.commit();
                    self.skip_separators();
                    let right = self.compile_and()?;
                    left = Node::BooleanAndOr {
                        left: Box::new(left),
                        right: Box::new(right),
                        and: false,
                    };
                }
                Symbol::DoubleQuestion => {
                    self.commit();
                    self.skip_separators();
                    let right = self.compile_and()?;
                    left = Node::NullCoalesce {
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                }
                _ => return Ok(left),
            }
        }
    }

    fn compile_and(&mut self) -> Result<Node, CompileError> {
        let mut left = self.compile_compare()?;
        while self.accept(Symbol::KwAnd) {
            self.skip_separators();
            let right = self.compile_compare()?;
            left = Node::BooleanAndOr {
                left: Box::new(left),
                right: Box::new(right),
                and: true,
            };
        }
        Ok(left)
    }

    fn compile_compare(&mut self) -> Result<Node, CompileError> {
        let mut left = self.compile_custom()?;
        loop {
            let op = match self.symbol() {
                Symbol::Equal | Symbol::DoubleEqual => OpCode::OpCmpEq,
                Symbol::NotEqual | Symbol::NotEqual2 => OpCode::OpCmpNotEq,
                Symbol::Less => OpCode::OpCmpLess,
                Symbol::Greater => OpCode::OpCmpGreater,
                Symbol::LessEqual => OpCode::OpCmpLessEq,
                Symbol::GreaterEqual => OpCode::OpCmpGreaterEq,
                _ => return Ok(left),
            };
            self.commit();
            self.skip_separators();
            let right = self.compile_custom()?;
            left = Node::binary(op, left, right);
        }
    }

    /// `a @name b` calls `name(a, b)`
    fn compile_custom(&mut self) -> Result<Node, CompileError> {
        let mut left = self.compile_range()?;
        while self.accept(Symbol::At) {
            let name = self.identifier()?;
            self.skip_separators();
            let right = self.compile_range()?;
            left = Node::CustomOperator {
                name,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn compile_range(&mut self) -> Result<Node, CompileError> {
        let mut left = self.compile_additive()?;
        while self.accept(Symbol::TwoDots) {
            self.skip_separators();
            let right = self.compile_additive()?;
            left = Node::binary(OpCode::OpMkrange, left, right);
        }
        Ok(left)
    }

    fn compile_additive(&mut self) -> Result<Node, CompileError> {
        let mut left = self.compile_multiplicative()?;
        loop {
            let op = match self.symbol() {
                Symbol::Plus => OpCode::OpAdd,
                Symbol::Minus => OpCode::OpSub,
                _ => return Ok(left),
            };
            self.commit();
            self.skip_separators();
            let right = self.compile_multiplicative()?;
            left = Node::binary(op, left, right);
        }
    }

    fn compile_multiplicative(&mut self) -> Result<Node, CompileError> {
        let mut left = self.compile_power()?;
        loop {
            let op = match self.symbol() {
                Symbol::Star => OpCode::OpMult,
                Symbol::Slash => OpCode::OpDiv,
                Symbol::Percent => OpCode::OpMod,
                _ => return Ok(left),
            };
            self.commit();
            self.skip_separators();
            let right = self.compile_power()?;
            left = Node::binary(op, left, right);
        }
    }

    /// Right associative: `2^3^2` is `2^(3^2)`
    fn compile_power(&mut self) -> Result<Node, CompileError> {
        let left = self.compile_primary()?;
        if !self.accept(Symbol::Power) {
            return Ok(left);
        }
        self.skip_separators();
        let right = self.compile_power()?;
        Ok(Node::binary(OpCode::OpPower, left, right))
    }

    /// Call, index, member, method and cast suffixes after `node`
    pub(super) fn compile_suffixes(&mut self, mut node: Node) -> Result<Node, CompileError> {
        loop {
            node = match self.symbol() {
                Symbol::LeftParen => {
                    let args = self.compile_list(Symbol::RightParen)?;
                    Node::FunctionCall {
                        func: Box::new(node),
                        args,
                    }
                }
                Symbol::LeftBracket => {
                    self.commit();
                    self.skip_separators();
                    let index = self.compile_expression()?;
                    self.skip_separators();
                    self.sync(Symbol::RightBracket)?;
                    Node::Deref {
                        left: Box::new(node),
                        index: Box::new(index),
                    }
                }
                Symbol::Dot => {
                    self.commit();
                    let name = self.identifier()?;
                    if self.symbol() == Symbol::LeftParen {
                        let args = self.compile_list(Symbol::RightParen)?;
                        Node::MethodCall {
                            object: Box::new(node),
                            name,
                            args,
                        }
                    } else {
                        Node::DerefDot {
                            left: Box::new(node),
                            name,
                        }
                    }
                }
                Symbol::Cast => {
                    self.commit();
                    let class = self.identifier()?;
                    let mut path = Vec::new();
                    while self.accept(Symbol::Dot) {
                        path.push(self.identifier()?);
                    }
                    if path.is_empty() {
                        return Err(self.error("Expected method name after class"));
                    }
                    let args = self.compile_list(Symbol::RightParen)?;
                    Node::CastMethodCall {
                        object: Box::new(node),
                        class: Box::new(Node::Identifier(class)),
                        path,
                        args,
                    }
                }
                _ => return Ok(node),
            };
        }
    }

    /// Comma separated list between the current opening symbol and
    /// `close`. Items may be expanded with `...x` or `x...`.
    pub(super) fn compile_list(&mut self, close: Symbol) -> Result<Vec<ListItem>, CompileError> {
        self.commit();
        let mut items = Vec::new();
        self.skip_separators();
        if self.accept(close) {
            return Ok(items);
        }
        loop {
            self.skip_separators();
            let prefix = self.accept(Symbol::ThreeDots);
            let node = self.compile_expression()?;
            let suffix = self.accept(Symbol::ThreeDots);
            items.push(ListItem::new(node, prefix || suffix));
            self.skip_separators();
            if self.accept(Symbol::Comma) {
                continue;
            }
            self.sync(close)?;
            return Ok(items);
        }
    }
}

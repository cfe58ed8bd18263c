//! Primary expressions: literals, lists, blocks and functions

use super::folding::{BindingMode, BlockEnd};
use super::Compiler;
use crate::error::CompileError;
use crate::function::{pack_function, UserFn};
use crate::node::{ListItem, Node};
use crate::opcode::OpCode;
use mscript_parser::Symbol;
use mscript_types::{Number, Value};
use std::rc::Rc;

impl Compiler {
    pub(super) fn compile_primary(&mut self) -> Result<Node, CompileError> {
        let node = match self.symbol() {
            Symbol::Identifier => return self.compile_identifier(),
            Symbol::Number => Node::Number(self.commit().data),
            Symbol::String => Node::Value(self.commit().data),
            Symbol::KwTrue => self.direct(OpCode::PushTrue),
            Symbol::KwFalse => self.direct(OpCode::PushFalse),
            Symbol::KwNull => self.direct(OpCode::PushNull),
            Symbol::KwUndefined => self.direct(OpCode::PushUndefined),
            Symbol::KwThis => {
                self.commit();
                Node::Identifier("this".into())
            }
            Symbol::LeftParen => self.compile_parenthesis()?,
            Symbol::LeftBrace => self.compile_block_literal()?,
            Symbol::LeftBracket => {
                let items = self.compile_list(Symbol::RightBracket)?;
                Node::PushArray(items)
            }
            Symbol::Exclamation | Symbol::KwNot => {
                self.commit();
                let item = self.compile_primary()?;
                return Ok(Node::unary(OpCode::OpBoolNot, item));
            }
            Symbol::Minus => {
                self.commit();
                if self.symbol() == Symbol::Number {
                    let literal = negate(&self.commit().data);
                    return self.compile_suffixes(Node::Number(literal));
                }
                let item = self.compile_primary()?;
                return Ok(Node::unary(OpCode::OpUnaryMinus, item));
            }
            Symbol::Plus => {
                self.commit();
                return self.compile_primary();
            }
            Symbol::KwIf => return self.compile_if(),
            Symbol::KwFor => return self.compile_for(),
            Symbol::KwWhile => return self.compile_while(),
            Symbol::KwSwitch => return self.compile_switch(),
            Symbol::KwExec => return self.compile_exec(),
            Symbol::KwWith => return self.compile_with(),
            Symbol::KwObject => return self.compile_object(),
            Symbol::KwConstexpr => return self.compile_constexpr(),
            s @ (Symbol::KwReturn | Symbol::KwBreak) => {
                return Err(self.error(format!("Unsupported keyword: {}", s)));
            }
            _ => {
                return Err(self.error(format!(
                    "Unexpected symbol: {}",
                    super::describe(self.peek())
                )))
            }
        };
        self.compile_suffixes(node)
    }

    fn direct(&mut self, op: OpCode) -> Node {
        self.commit();
        Node::Direct(op)
    }

    fn compile_identifier(&mut self) -> Result<Node, CompileError> {
        let line = self.line;
        let name = self.identifier()?;
        if self.accept(Symbol::Arrow) {
            return self.compile_function(vec![name], false, line);
        }
        if &*name == "raise" && starts_operand(self.symbol()) {
            let value = self.compile_expression()?;
            return Ok(Node::unary(OpCode::Raise, value));
        }
        self.compile_suffixes(Node::Identifier(name))
    }

    /// Parenthesised expression, value list, or function parameters
    fn compile_parenthesis(&mut self) -> Result<Node, CompileError> {
        let line = self.line;
        let items = self.compile_list(Symbol::RightParen)?;
        if self.accept(Symbol::Arrow) {
            let count = items.len();
            let mut params = Vec::with_capacity(count);
            let mut expand_last = false;
            for (i, item) in items.into_iter().enumerate() {
                match item.node {
                    Node::Identifier(name) if !item.expand || i + 1 == count => {
                        expand_last = item.expand;
                        params.push(name);
                    }
                    _ => return Err(self.error("Invalid function parameter list")),
                }
            }
            return self.compile_function(params, expand_last, line);
        }
        match <[ListItem; 1]>::try_from(items) {
            Ok([single]) if !single.expand => Ok(single.node),
            Ok([single]) => Ok(Node::ValueList(vec![single])),
            Err(items) => Ok(Node::ValueList(items)),
        }
    }

    /// Function body after `=>`: a block literal or one expression
    fn compile_function(
        &mut self,
        params: Vec<Rc<str>>,
        expand_last: bool,
        line: usize,
    ) -> Result<Node, CompileError> {
        self.skip_separators();
        let tree = if self.accept(Symbol::LeftBrace) {
            let tree = self.compile_block_content(BindingMode::Drop, BlockEnd::Brace)?;
            self.skip_separators();
            self.sync(Symbol::RightBrace)?;
            tree
        } else {
            self.compile_expression()?
        };
        let code = self.build_block(&tree, line)?;
        let function = pack_function(UserFn {
            code,
            identifiers: params.into(),
            expand_last,
        });
        Ok(Node::Value(function))
    }

    /// `{ statements }` as a block value; bindings are kept since the
    /// block may run as part of an object or loop scope
    pub(super) fn compile_block_literal(&mut self) -> Result<Node, CompileError> {
        let line = self.line;
        self.commit();
        let tree = self.compile_block_content(BindingMode::Keep, BlockEnd::Brace)?;
        self.sync(Symbol::RightBrace)?;
        let block = self.build_block(&tree, line)?;
        Ok(Node::BlockValue {
            block,
            tree: Box::new(tree),
        })
    }
}

/// Tokens that can start the operand of `raise`
fn starts_operand(symbol: Symbol) -> bool {
    matches!(
        symbol,
        Symbol::Identifier
            | Symbol::Number
            | Symbol::String
            | Symbol::LeftParen
            | Symbol::LeftBracket
            | Symbol::LeftBrace
            | Symbol::KwTrue
            | Symbol::KwFalse
            | Symbol::KwNull
            | Symbol::KwUndefined
            | Symbol::KwThis
    )
}

fn negate(value: &Value) -> Value {
    match value.as_number() {
        Some(Number::Int(i)) => i
            .checked_neg()
            .map(Value::int)
            .unwrap_or_else(|| Value::float(-(i as f64))),
        Some(Number::Float(f)) => Value::float(-f),
        None => value.clone(),
    }
}

//! Statements and assignment targets

use super::Compiler;
use crate::error::CompileError;
use crate::node::Node;
use mscript_parser::Symbol;
use std::rc::Rc;

impl Compiler {
    pub(super) fn compile_statement(&mut self) -> Result<Node, CompileError> {
        match (self.symbol(), self.symbol_at(1)) {
            (Symbol::Identifier, Symbol::Equal) => {
                let name = self.identifier()?;
                self.commit();
                self.skip_separators();
                let expr = self.compile_expression()?;
                Ok(Node::assign(name, expr))
            }
            (Symbol::Identifier, Symbol::QuestionEqual) => {
                let name = self.identifier()?;
                self.commit();
                self.skip_separators();
                let expr = self.compile_expression()?;
                Ok(Node::if_else(
                    Node::IsDefined(name.clone()),
                    Node::Identifier(name.clone()),
                    Node::assign(name, expr),
                ))
            }
            (Symbol::LeftParen, _) => match self.attempt(Self::pack_target)? {
                Some(target) => {
                    self.skip_separators();
                    let expr = self.compile_expression()?;
                    Ok(Node::Assignment {
                        target: Box::new(target),
                        expr: Box::new(expr),
                    })
                }
                None => self.compile_expression(),
            },
            _ => self.compile_expression(),
        }
    }

    /// `(a, -, rest...) =`; `None` when the parenthesis starts an
    /// expression instead
    fn pack_target(&mut self) -> Result<Option<Node>, CompileError> {
        self.commit();
        let mut names: Vec<Option<Rc<str>>> = Vec::new();
        let mut rest = None;
        loop {
            self.skip_separators();
            match self.symbol() {
                Symbol::Minus => {
                    self.commit();
                    names.push(None);
                }
                Symbol::ThreeDots => {
                    self.commit();
                    if self.symbol() != Symbol::Identifier {
                        return Ok(None);
                    }
                    rest = Some(self.identifier()?);
                }
                Symbol::Identifier => {
                    let name = self.identifier()?;
                    if self.accept(Symbol::ThreeDots) {
                        rest = Some(name);
                    } else {
                        names.push(Some(name));
                    }
                }
                _ => return Ok(None),
            }
            self.skip_separators();
            match self.symbol() {
                Symbol::Comma if rest.is_none() => {
                    self.commit();
                }
                Symbol::RightParen => {
                    self.commit();
                    break;
                }
                _ => return Ok(None),
            }
        }
        if !self.accept(Symbol::Equal) {
            return Ok(None);
        }
        Ok(Some(Node::PackAssign { names, rest }))
    }
}

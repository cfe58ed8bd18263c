//! Source compiler (elements to bytecode)
//!
//! A recursive-descent parser over the lexer's flat element list. Every
//! statement is turned into a `Node`, and each block of statements goes
//! through the constant folder before its code is generated: whatever can
//! be evaluated at compile time is replaced by its value.

use crate::block::{pack_block, CodeLocation};
use crate::config::VmConfig;
use crate::error::{CompileError, Error};
use crate::node::{build_code, Node};
use mscript_parser::{parse_script, Element, Symbol};
use mscript_types::Value;
use std::rc::Rc;

// Module structure
mod control;
mod expressions;
mod folding;
mod statements;
mod values;

pub use folding::BindingMode;
use folding::BlockEnd;

/// Cursor position saved for backtracking
#[derive(Debug, Clone, Copy)]
struct Mark {
    pos: usize,
    line: usize,
}

/// Compiler for one source unit
pub struct Compiler {
    elements: Vec<Element>,
    pos: usize,
    eof: Element,
    location: CodeLocation,
    /// Current line, counted from `location.line`
    line: usize,
    /// Globals visible to compile-time evaluation
    global: Value,
    config: VmConfig,
    keep_bindings: bool,
}

impl Compiler {
    pub fn new(elements: Vec<Element>, location: CodeLocation) -> Self {
        let line = location.line;
        Self {
            elements,
            pos: 0,
            eof: Element::bare(Symbol::Eof),
            location,
            line,
            global: Value::empty_object(),
            config: VmConfig::default(),
            keep_bindings: false,
        }
    }

    /// Globals the constant folder may read; usually the runtime library
    pub fn with_global(mut self, global: Value) -> Self {
        self.global = global;
        self
    }

    pub fn with_config(mut self, config: VmConfig) -> Self {
        self.config = config;
        self
    }

    /// Keeps every top-level binding in the generated code, so the caller
    /// can collect them after running it (console mode)
    pub fn keep_bindings(mut self, keep: bool) -> Self {
        self.keep_bindings = keep;
        self
    }

    /// Compiles the whole element list into a block value
    pub fn compile(&mut self) -> Result<Value, CompileError> {
        let mode = if self.keep_bindings {
            BindingMode::Keep
        } else {
            BindingMode::Drop
        };
        let tree = self.compile_block_content(mode, BlockEnd::Eof)?;
        self.sync(Symbol::Eof)?;
        let block = build_code(&tree, self.location.clone())
            .map_err(|e| CompileError::from_build(e, self.location.clone()))?;
        Ok(pack_block(block))
    }

    // ===== Cursor =====

    fn peek(&self) -> &Element {
        self.elements.get(self.pos).unwrap_or(&self.eof)
    }

    fn symbol(&self) -> Symbol {
        self.peek().symbol
    }

    fn symbol_at(&self, offset: usize) -> Symbol {
        self.elements
            .get(self.pos + offset)
            .map(|e| e.symbol)
            .unwrap_or(Symbol::Eof)
    }

    /// Consumes the current element
    fn commit(&mut self) -> Element {
        let element = self.peek().clone();
        if element.symbol != Symbol::Eof {
            self.pos += 1;
        }
        if element.symbol == Symbol::Separator {
            self.line += 1;
        }
        element
    }

    fn accept(&mut self, symbol: Symbol) -> bool {
        if self.symbol() == symbol {
            self.commit();
            true
        } else {
            false
        }
    }

    fn sync(&mut self, symbol: Symbol) -> Result<(), CompileError> {
        if self.accept(symbol) {
            Ok(())
        } else {
            Err(self.error(format!(
                "Expected symbol: `{}`, found: `{}`",
                symbol,
                describe(self.peek())
            )))
        }
    }

    fn skip_separators(&mut self) {
        while self.symbol() == Symbol::Separator {
            self.commit();
        }
    }

    fn mark(&self) -> Mark {
        Mark {
            pos: self.pos,
            line: self.line,
        }
    }

    fn restore(&mut self, mark: Mark) {
        self.pos = mark.pos;
        self.line = mark.line;
    }

    fn identifier(&mut self) -> Result<Rc<str>, CompileError> {
        if self.symbol() != Symbol::Identifier {
            return Err(self.error(format!(
                "Expected identifier, found: `{}`",
                describe(self.peek())
            )));
        }
        let element = self.commit();
        Ok(identifier_name(&element))
    }

    /// True when the current element is the identifier `word`
    fn at_word(&self, word: &str) -> bool {
        let e = self.peek();
        e.symbol == Symbol::Identifier && e.data.as_str() == Some(word)
    }

    // ===== Errors and locations =====

    fn current_location(&self) -> CodeLocation {
        self.location.with_line(self.line)
    }

    fn error(&self, text: impl Into<String>) -> CompileError {
        CompileError::new(text, self.current_location())
    }

    /// Generates a standalone block for `tree` at the given line
    fn build_block(&self, tree: &Node, line: usize) -> Result<Value, CompileError> {
        let location = self.location.with_line(line);
        let block =
            build_code(tree, location.clone()).map_err(|e| CompileError::from_build(e, location))?;
        Ok(pack_block(block))
    }
}

fn identifier_name(element: &Element) -> Rc<str> {
    match &element.data {
        Value::String(s) => s.clone(),
        other => Rc::from(other.stringify()),
    }
}

/// Source-like text of an element for error messages
fn describe(element: &Element) -> String {
    match element.symbol {
        Symbol::Identifier => element.data.as_str().unwrap_or_default().to_string(),
        Symbol::Number | Symbol::String => element.data.stringify(),
        other => other.to_string(),
    }
}

/// Parses and compiles `source` in one go
pub fn compile_source(
    source: &str,
    location: CodeLocation,
    global: Value,
    config: VmConfig,
) -> Result<Value, Error> {
    let elements = parse_script(source)?;
    let mut compiler = Compiler::new(elements, location)
        .with_global(global)
        .with_config(config);
    Ok(compiler.compile()?)
}

//! Syntax tree produced by the compiler
//!
//! Nodes only live between parsing a statement and emitting its code.
//! Each node knows how to generate its bytecode (`codegen`) and which
//! variable names it reads (`vars`), which decides which compile-time
//! bindings a block still needs at runtime.

use crate::opcode::OpCode;
use mscript_types::Value;
use std::rc::Rc;

mod codegen;
mod vars;

pub use codegen::build_code;
pub use vars::VarSet;

/// Element of an argument or array list
#[derive(Debug, Clone)]
pub struct ListItem {
    pub node: Node,
    /// `...x`: splice the items of `x` into the list
    pub expand: bool,
}

impl ListItem {
    pub fn new(node: Node, expand: bool) -> Self {
        ListItem { node, expand }
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    /// Numeric literal, emitted with the shortest push instruction
    Number(Value),
    /// Any other constant
    Value(Value),
    /// Block literal; `tree` is inlined where the block is executed in place
    BlockValue { block: Value, tree: Box<Node> },
    Identifier(Rc<str>),
    /// Operand-less literal instruction (`push_true`, `push_null`, ...)
    Direct(OpCode),
    Binary {
        op: OpCode,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// Addition, subtraction or multiplication that may use a constant
    /// operand instruction
    BinaryConst {
        op: OpCode,
        left: Box<Node>,
        right: Box<Node>,
    },
    Unary { op: OpCode, item: Box<Node> },
    Deref { left: Box<Node>, index: Box<Node> },
    DerefDot { left: Box<Node>, name: Rc<str> },
    Assignment { target: Box<Node>, expr: Box<Node> },
    SimpleAssign(Rc<str>),
    /// `(a, -, c...) = expr`; `None` skips a position
    PackAssign {
        names: Vec<Option<Rc<str>>>,
        rest: Option<Rc<str>>,
    },
    IsDefined(Rc<str>),
    ValueList(Vec<ListItem>),
    FunctionCall { func: Box<Node>, args: Vec<ListItem> },
    MethodCall {
        object: Box<Node>,
        name: Rc<str>,
        args: Vec<ListItem>,
    },
    /// `x->Class.method(args)`
    CastMethodCall {
        object: Box<Node>,
        class: Box<Node>,
        path: Vec<Rc<str>>,
        args: Vec<ListItem>,
    },
    /// Runs a block in the current scope
    Exec(Box<Node>),
    /// `exec block`: runs a block in a new scope
    KwExec(Box<Node>),
    /// `with obj block`
    KwWith { object: Box<Node>, block: Box<Node> },
    /// `object base block`
    KwExecObject { base: Box<Node>, block: Box<Node> },
    /// `object block`
    KwExecNewObject(Box<Node>),
    IfElse {
        cond: Box<Node>,
        then: Box<Node>,
        otherwise: Box<Node>,
    },
    BooleanAndOr {
        left: Box<Node>,
        right: Box<Node>,
        and: bool,
    },
    NullCoalesce { left: Box<Node>, right: Box<Node> },
    PushArray(Vec<ListItem>),
    Block(Vec<Node>),
    ForLoop {
        iterator: Rc<str>,
        container: Box<Node>,
        init: Vec<(Rc<str>, Node)>,
        body: Box<Node>,
    },
    WhileLoop { condition: Box<Node>, body: Box<Node> },
    SwitchCase {
        selector: Box<Node>,
        /// Label value and index of its case body
        labels: Vec<(Value, usize)>,
        cases: Vec<Node>,
        default: Option<Box<Node>>,
    },
    InputLineMap { line: usize, node: Box<Node> },
    /// `a @name b`
    CustomOperator {
        name: Rc<str>,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    pub fn binary(op: OpCode, left: Node, right: Node) -> Node {
        match op {
            OpCode::OpAdd | OpCode::OpSub | OpCode::OpMult => Node::BinaryConst {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            _ => Node::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        }
    }

    pub fn unary(op: OpCode, item: Node) -> Node {
        Node::Unary {
            op,
            item: Box::new(item),
        }
    }

    pub fn assign(name: Rc<str>, expr: Node) -> Node {
        Node::Assignment {
            target: Box::new(Node::SimpleAssign(name)),
            expr: Box::new(expr),
        }
    }

    pub fn exec(block: Node) -> Node {
        Node::Exec(Box::new(block))
    }

    pub fn if_else(cond: Node, then: Node, otherwise: Node) -> Node {
        Node::IfElse {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    /// Integer literal value, if this node is one
    pub fn int_literal(&self) -> Option<i64> {
        match self {
            Node::Number(Value::Number(mscript_types::Number::Int(i))) => Some(*i),
            _ => None,
        }
    }

    /// Constant this node stands for, if any
    pub fn constant(&self) -> Option<&Value> {
        match self {
            Node::Number(v) | Node::Value(v) => Some(v),
            _ => None,
        }
    }
}

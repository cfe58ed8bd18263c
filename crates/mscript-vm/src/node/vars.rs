//! Variable usage analysis

use super::{ListItem, Node};
use std::collections::HashSet;
use std::rc::Rc;

/// Names a piece of code may read at runtime
///
/// `all` is set when the code can run arbitrary other code (a call, a
/// block execution, an index into a proc-array) that might read any name.
#[derive(Debug, Default, Clone)]
pub struct VarSet {
    names: HashSet<Rc<str>>,
    all: bool,
}

impl VarSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &Rc<str>) {
        self.names.insert(name.clone());
    }

    pub fn require_all(&mut self) {
        self.all = true;
    }

    pub fn contains(&self, name: &str) -> bool {
        self.all || self.names.contains(name)
    }

    pub fn requires_all(&self) -> bool {
        self.all
    }
}

fn list_items(items: &[ListItem], vars: &mut VarSet) {
    for item in items {
        item.node.list_vars(vars);
    }
}

impl Node {
    pub fn list_vars(&self, vars: &mut VarSet) {
        match self {
            Node::Number(_) | Node::Value(_) | Node::Direct(_) => {}
            Node::BlockValue { tree, .. } => tree.list_vars(vars),
            Node::Identifier(n) | Node::IsDefined(n) | Node::SimpleAssign(n) => vars.insert(n),
            Node::PackAssign { names, rest } => {
                for n in names.iter().flatten().chain(rest.iter()) {
                    vars.insert(n);
                }
            }
            Node::Binary { left, right, .. }
            | Node::BinaryConst { left, right, .. }
            | Node::BooleanAndOr { left, right, .. }
            | Node::NullCoalesce { left, right } => {
                left.list_vars(vars);
                right.list_vars(vars);
            }
            Node::Unary { item, .. } => item.list_vars(vars),
            Node::Deref { left, index } => {
                vars.require_all();
                left.list_vars(vars);
                index.list_vars(vars);
            }
            Node::DerefDot { left, .. } => left.list_vars(vars),
            Node::Assignment { target, expr } => {
                target.list_vars(vars);
                expr.list_vars(vars);
            }
            Node::ValueList(items) | Node::PushArray(items) => list_items(items, vars),
            Node::FunctionCall { func, args } => {
                vars.require_all();
                func.list_vars(vars);
                list_items(args, vars);
            }
            Node::MethodCall { object, args, .. } => {
                vars.require_all();
                object.list_vars(vars);
                list_items(args, vars);
            }
            Node::CastMethodCall {
                object,
                class,
                args,
                ..
            } => {
                vars.require_all();
                object.list_vars(vars);
                class.list_vars(vars);
                list_items(args, vars);
            }
            Node::CustomOperator { name, left, right } => {
                vars.require_all();
                vars.insert(name);
                left.list_vars(vars);
                right.list_vars(vars);
            }
            Node::Exec(block) | Node::KwExec(block) | Node::KwExecNewObject(block) => {
                exec_vars(block, vars)
            }
            Node::KwWith { object, block } => {
                object.list_vars(vars);
                exec_vars(block, vars);
            }
            Node::KwExecObject { base, block } => {
                base.list_vars(vars);
                exec_vars(block, vars);
            }
            Node::IfElse {
                cond,
                then,
                otherwise,
            } => {
                cond.list_vars(vars);
                then.list_vars(vars);
                otherwise.list_vars(vars);
            }
            Node::Block(statements) => {
                for s in statements {
                    s.list_vars(vars);
                }
            }
            Node::ForLoop {
                container,
                init,
                body,
                ..
            } => {
                container.list_vars(vars);
                for (_, expr) in init {
                    expr.list_vars(vars);
                }
                // Indexing a proc-array calls its generator.
                vars.require_all();
                exec_vars(body, vars);
            }
            Node::WhileLoop { condition, body } => {
                condition.list_vars(vars);
                exec_vars(body, vars);
            }
            Node::SwitchCase {
                selector,
                cases,
                default,
                ..
            } => {
                selector.list_vars(vars);
                for c in cases {
                    c.list_vars(vars);
                }
                if let Some(d) = default {
                    d.list_vars(vars);
                }
            }
            Node::InputLineMap { node, .. } => node.list_vars(vars),
        }
    }
}

/// A block literal contributes its own reads; any other block value is
/// unknown code
fn exec_vars(block: &Node, vars: &mut VarSet) {
    match block {
        Node::BlockValue { tree, .. } => tree.list_vars(vars),
        other => {
            vars.require_all();
            other.list_vars(vars);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcode::OpCode;

    fn ident(n: &str) -> Node {
        Node::Identifier(n.into())
    }

    #[test]
    fn test_identifiers_are_listed() {
        let node = Node::binary(OpCode::OpAdd, ident("a"), ident("b"));
        let mut vars = VarSet::new();
        node.list_vars(&mut vars);
        assert!(vars.contains("a"));
        assert!(vars.contains("b"));
        assert!(!vars.contains("c"));
    }

    #[test]
    fn test_calls_require_everything() {
        let node = Node::FunctionCall {
            func: Box::new(ident("f")),
            args: vec![],
        };
        let mut vars = VarSet::new();
        node.list_vars(&mut vars);
        assert!(vars.requires_all());
        assert!(vars.contains("anything"));
    }
}

//! Bytecode generation

use super::{ListItem, Node};
use crate::block::{Block, CodeLocation};
use crate::builder::BlockBld;
use crate::error::BuildError;
use crate::opcode::OpCode;
use mscript_types::{Number, Value};

/// Generates a complete block for `node`
pub fn build_code(node: &Node, location: CodeLocation) -> Result<Block, BuildError> {
    let mut blk = BlockBld::new();
    node.generate(&mut blk)?;
    Ok(blk.finish(location))
}

fn name(n: &str) -> Value {
    Value::from(n)
}

impl Node {
    pub fn generate(&self, blk: &mut BlockBld) -> Result<(), BuildError> {
        match self {
            Node::Number(v) => match v.as_number() {
                Some(Number::Int(0)) => {
                    blk.push_cmd(OpCode::PushZeroInt);
                    Ok(())
                }
                Some(Number::Int(i)) => blk.push_int(OpCode::PushInt1, i),
                Some(Number::Float(f)) => {
                    blk.push_double(f);
                    Ok(())
                }
                None => blk.push_const(OpCode::PushConst1, v.clone()),
            },
            Node::Value(v) => blk.push_const(OpCode::PushConst1, v.clone()),
            Node::BlockValue { block, .. } => blk.push_const(OpCode::PushConst1, block.clone()),
            Node::Identifier(n) => blk.push_const(OpCode::GetVar1, name(n)),
            Node::Direct(op) => {
                blk.push_cmd(*op);
                Ok(())
            }

            Node::Binary { op, left, right } => {
                left.generate(blk)?;
                right.generate(blk)?;
                blk.push_cmd(*op);
                Ok(())
            }
            Node::BinaryConst { op, left, right } => gen_binary_const(blk, *op, left, right),
            Node::Unary { op, item } => {
                item.generate(blk)?;
                blk.push_cmd(*op);
                Ok(())
            }

            Node::Deref { left, index } => {
                left.generate(blk)?;
                match index.constant() {
                    Some(c @ (Value::String(_) | Value::Number(Number::Int(_)))) => {
                        blk.push_const(OpCode::Deref1, c.clone())
                    }
                    _ => {
                        index.generate(blk)?;
                        blk.push_cmd(OpCode::Deref);
                        Ok(())
                    }
                }
            }
            Node::DerefDot { left, name: member } => {
                left.generate(blk)?;
                blk.push_const(OpCode::Deref1, name(member))
            }

            Node::Assignment { target, expr } => {
                expr.generate(blk)?;
                target.generate(blk)
            }
            Node::SimpleAssign(n) => blk.push_store(name(n)),
            Node::PackAssign { names, rest } => {
                for (i, n) in names.iter().enumerate() {
                    if let Some(n) = n {
                        blk.push_cmd(OpCode::Dup);
                        blk.push_const(OpCode::Deref1, Value::from(i))?;
                        blk.push_const(OpCode::PopVar1, name(n))?;
                    }
                }
                if let Some(n) = rest {
                    blk.push_cmd(OpCode::Dup);
                    blk.push_int(OpCode::CollapseList1, names.len() as i64)?;
                    blk.push_const(OpCode::PopVar1, name(n))?;
                }
                Ok(())
            }
            Node::IsDefined(n) => blk.push_const(OpCode::IsDef1, name(n)),

            Node::ValueList(items) => gen_list(blk, items),
            Node::FunctionCall { func, args } => {
                if args.iter().any(|a| a.expand) {
                    gen_pack(blk, args)?;
                    func.generate(blk)?;
                    blk.push_cmd(OpCode::Call);
                    Ok(())
                } else {
                    for a in args {
                        a.node.generate(blk)?;
                    }
                    func.generate(blk)?;
                    blk.push_int(OpCode::Call1, args.len() as i64)
                }
            }
            Node::MethodCall {
                object,
                name: method,
                args,
            } => {
                gen_pack(blk, args)?;
                object.generate(blk)?;
                blk.push_const(OpCode::Mcall1, name(method))
            }
            Node::CastMethodCall {
                object,
                class,
                path,
                args,
            } => {
                gen_pack(blk, args)?;
                object.generate(blk)?;
                class.generate(blk)?;
                for p in path {
                    blk.push_const(OpCode::Deref1, name(p))?;
                }
                blk.push_cmd(OpCode::Mcall);
                Ok(())
            }
            Node::CustomOperator {
                name: op,
                left,
                right,
            } => {
                left.generate(blk)?;
                right.generate(blk)?;
                blk.push_const(OpCode::GetVar1, name(op))?;
                blk.push_int(OpCode::Call1, 2)
            }

            Node::Exec(block) => gen_exec(blk, block),
            Node::KwExec(block) => {
                blk.push_cmd(OpCode::PushScope);
                gen_exec(blk, block)?;
                blk.push_cmd(OpCode::PopScope);
                Ok(())
            }
            Node::KwWith { object, block } => {
                object.generate(blk)?;
                blk.push_cmd(OpCode::PushScopeThis);
                gen_exec(blk, block)?;
                blk.push_cmd(OpCode::PopScope);
                Ok(())
            }
            Node::KwExecObject { base, block } => {
                base.generate(blk)?;
                blk.push_cmd(OpCode::PushScopeThis);
                gen_exec(blk, block)?;
                blk.push_cmd(OpCode::Del);
                blk.push_cmd(OpCode::ScopeToObject);
                blk.push_cmd(OpCode::PopScope);
                Ok(())
            }
            Node::KwExecNewObject(block) => {
                blk.push_const(OpCode::PushConst1, Value::empty_object())?;
                blk.push_cmd(OpCode::PushScopeThis);
                gen_exec(blk, block)?;
                blk.push_cmd(OpCode::Del);
                blk.push_cmd(OpCode::ScopeToObject);
                blk.push_cmd(OpCode::PopScope);
                Ok(())
            }

            Node::IfElse {
                cond,
                then,
                otherwise,
            } => {
                cond.generate(blk)?;
                let to_else = blk.prepare_jump(OpCode::JumpFalse1, 2)?;
                then.generate(blk)?;
                let to_end = blk.prepare_jump(OpCode::Jump1, 2)?;
                blk.finish_jump_here(to_else)?;
                otherwise.generate(blk)?;
                blk.finish_jump_here(to_end)
            }
            Node::BooleanAndOr { left, right, and } => {
                left.generate(blk)?;
                blk.push_cmd(OpCode::Dup);
                let base = if *and {
                    OpCode::JumpFalse1
                } else {
                    OpCode::JumpTrue1
                };
                let to_end = blk.prepare_jump(base, 2)?;
                blk.push_cmd(OpCode::Del);
                right.generate(blk)?;
                blk.finish_jump_here(to_end)
            }
            Node::NullCoalesce { left, right } => {
                left.generate(blk)?;
                blk.push_cmd(OpCode::Dup);
                blk.push_cmd(OpCode::PushNull);
                blk.push_cmd(OpCode::OpCmpEq);
                let to_replace = blk.prepare_jump(OpCode::JumpTrue1, 2)?;
                blk.push_cmd(OpCode::Dup);
                blk.push_cmd(OpCode::PushUndefined);
                blk.push_cmd(OpCode::OpCmpEq);
                let to_end = blk.prepare_jump(OpCode::JumpFalse1, 2)?;
                blk.finish_jump_here(to_replace)?;
                blk.push_cmd(OpCode::Del);
                right.generate(blk)?;
                blk.finish_jump_here(to_end)
            }

            Node::PushArray(items) => {
                if items.iter().any(|i| i.expand) {
                    gen_pack(blk, items)?;
                    blk.push_int(OpCode::PushArray1, 1)
                } else {
                    for i in items {
                        i.node.generate(blk)?;
                    }
                    blk.push_int(OpCode::PushArray1, items.len() as i64)
                }
            }

            Node::Block(statements) => {
                if statements.is_empty() {
                    blk.push_cmd(OpCode::PushUndefined);
                    return Ok(());
                }
                let last = statements.len() - 1;
                for (i, s) in statements.iter().enumerate() {
                    s.generate(blk)?;
                    if i < last && !blk.downgrade_trailing_store() {
                        blk.push_cmd(OpCode::Del);
                    }
                }
                Ok(())
            }

            Node::ForLoop {
                iterator,
                container,
                init,
                body,
            } => gen_for(blk, iterator, container, init, body),
            Node::WhileLoop { condition, body } => gen_while(blk, condition, body),
            Node::SwitchCase {
                selector,
                labels,
                cases,
                default,
            } => gen_switch(blk, selector, labels, cases, default.as_deref()),

            Node::InputLineMap { line, node } => {
                blk.mark_line(*line);
                node.generate(blk)
            }
        }
    }
}

/// Executes a block in place: a literal's tree is inlined, anything else
/// is evaluated and run with `exec_block`
fn gen_exec(blk: &mut BlockBld, block: &Node) -> Result<(), BuildError> {
    match block {
        Node::BlockValue { tree, .. } => tree.generate(blk),
        other => {
            other.generate(blk)?;
            blk.push_cmd(OpCode::ExecBlock);
            Ok(())
        }
    }
}

/// A list of one plain item is the item itself; anything else is a pack
fn gen_list(blk: &mut BlockBld, items: &[ListItem]) -> Result<(), BuildError> {
    if let [single] = items {
        if !single.expand {
            return single.node.generate(blk);
        }
    }
    gen_pack(blk, items)
}

fn gen_pack(blk: &mut BlockBld, items: &[ListItem]) -> Result<(), BuildError> {
    blk.push_cmd(OpCode::BeginList);
    for item in items {
        item.node.generate(blk)?;
        if item.expand {
            blk.push_cmd(OpCode::ExpandArray);
        }
    }
    blk.push_cmd(OpCode::CloseList);
    Ok(())
}

fn gen_binary_const(
    blk: &mut BlockBld,
    op: OpCode,
    left: &Node,
    right: &Node,
) -> Result<(), BuildError> {
    let plain = |blk: &mut BlockBld| -> Result<(), BuildError> {
        left.generate(blk)?;
        right.generate(blk)?;
        blk.push_cmd(op);
        Ok(())
    };
    match op {
        OpCode::OpAdd => {
            if let Some(n) = right.int_literal() {
                left.generate(blk)?;
                blk.push_int(OpCode::OpAddConst1, n)
            } else if let Some(n) = left.int_literal() {
                right.generate(blk)?;
                blk.push_int(OpCode::OpAddConst1, n)
            } else {
                plain(blk)
            }
        }
        OpCode::OpSub => {
            if let Some(n) = right.int_literal().and_then(i64::checked_neg) {
                left.generate(blk)?;
                blk.push_int(OpCode::OpAddConst1, n)
            } else if let Some(n) = left.int_literal() {
                right.generate(blk)?;
                blk.push_int(OpCode::OpNegaddConst1, n)
            } else {
                plain(blk)
            }
        }
        OpCode::OpMult => {
            if let Some(n) = right.int_literal() {
                left.generate(blk)?;
                blk.push_int(OpCode::OpMultConst1, n)
            } else if let Some(n) = left.int_literal() {
                right.generate(blk)?;
                blk.push_int(OpCode::OpMultConst1, n)
            } else {
                plain(blk)
            }
        }
        _ => plain(blk),
    }
}

/// Stack layout while looping: `[container, state, result, index]`.
/// Each iteration runs in a scope backed by the state object, and the
/// scope's bindings become the next state.
fn gen_for(
    blk: &mut BlockBld,
    iterator: &str,
    container: &Node,
    init: &[(std::rc::Rc<str>, Node)],
    body: &Node,
) -> Result<(), BuildError> {
    container.generate(blk)?;
    blk.push_cmd(OpCode::PushScope);
    for (n, expr) in init {
        expr.generate(blk)?;
        blk.push_const(OpCode::PopVar1, name(n))?;
    }
    blk.push_cmd(OpCode::ScopeToObject);
    blk.push_cmd(OpCode::PopScope);
    blk.push_cmd(OpCode::PushNull);
    blk.push_cmd(OpCode::PushZeroInt);

    let top = blk.position();
    blk.push_int(OpCode::Dup1, 3)?;
    blk.push_int(OpCode::Dup1, 1)?;
    blk.push_cmd(OpCode::OpCheckbound);
    let to_end = blk.prepare_jump(OpCode::JumpTrue1, 2)?;

    blk.push_int(OpCode::Swap1, 2)?;
    blk.push_cmd(OpCode::PushScopeObject);
    blk.push_cmd(OpCode::Del);
    blk.push_int(OpCode::Dup1, 1)?;
    blk.push_int(OpCode::Dup1, 1)?;
    blk.push_cmd(OpCode::Deref);
    blk.push_const(OpCode::PopVar1, name(iterator))?;
    blk.push_int(OpCode::OpAddConst1, 1)?;
    gen_exec(blk, body)?;
    blk.push_cmd(OpCode::ScopeToObject);
    blk.push_cmd(OpCode::PopScope);
    blk.push_int(OpCode::Swap1, 2)?;
    blk.push_jump_to(OpCode::Jump1, top)?;

    blk.finish_jump_here(to_end)?;
    blk.push_cmd(OpCode::Del);
    blk.push_int(OpCode::Swap1, 2)?;
    blk.push_cmd(OpCode::Del);
    blk.push_cmd(OpCode::Del);
    Ok(())
}

/// Stack layout while looping: `[state, result]`
fn gen_while(blk: &mut BlockBld, condition: &Node, body: &Node) -> Result<(), BuildError> {
    blk.push_const(OpCode::PushConst1, Value::empty_object())?;
    blk.push_cmd(OpCode::PushNull);

    let top = blk.position();
    blk.push_cmd(OpCode::Swap);
    blk.push_cmd(OpCode::PushScopeObject);
    condition.generate(blk)?;
    let to_exit = blk.prepare_jump(OpCode::JumpFalse1, 2)?;
    blk.push_cmd(OpCode::Del);
    gen_exec(blk, body)?;
    blk.push_cmd(OpCode::ScopeToObject);
    blk.push_cmd(OpCode::PopScope);
    blk.push_cmd(OpCode::Swap);
    blk.push_jump_to(OpCode::Jump1, top)?;

    blk.finish_jump_here(to_exit)?;
    blk.push_cmd(OpCode::PopScope);
    Ok(())
}

fn gen_switch(
    blk: &mut BlockBld,
    selector: &Node,
    labels: &[(Value, usize)],
    cases: &[Node],
    default: Option<&Node>,
) -> Result<(), BuildError> {
    selector.generate(blk)?;
    let mut dispatch = Vec::with_capacity(labels.len());
    for (label, case) in labels {
        blk.push_const(OpCode::OpCmpEq1, label.clone())?;
        dispatch.push((blk.prepare_jump(OpCode::JumpTrue1, 2)?, *case));
    }
    blk.push_cmd(OpCode::Del);
    match default {
        Some(node) => node.generate(blk)?,
        None => blk.push_cmd(OpCode::PushNull),
    }
    let mut to_end = vec![blk.prepare_jump(OpCode::Jump1, 2)?];

    for (index, case) in cases.iter().enumerate() {
        let mut rest = Vec::with_capacity(dispatch.len());
        for (patch, target) in dispatch {
            if target == index {
                blk.finish_jump_here(patch)?;
            } else {
                rest.push((patch, target));
            }
        }
        dispatch = rest;
        case.generate(blk)?;
        to_end.push(blk.prepare_jump(OpCode::Jump1, 2)?);
    }
    for patch in to_end {
        blk.finish_jump_here(patch)?;
    }
    Ok(())
}

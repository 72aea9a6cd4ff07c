// tau-vm - Bytecode compiler and virtual machine for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Code generation: one method per node kind.

use std::sync::Arc;

use tau_core::Value;
use tau_parser::{InfixOp, Node, Pos};

use crate::opcode::OpCode;
use crate::symbol_table::SymbolScope;
use crate::template::{self, Segment};

use super::fold::{eval_const, infix_opcode, prefix_opcode};
use super::{BREAK_PLACEHOLDER, CONTINUE_PLACEHOLDER, Compiler, Result};

const MAX_ARGS: usize = u8::MAX as usize;
const MAX_ITEMS: usize = u16::MAX as usize;

impl Compiler<'_> {
    /// Compile a sequence of statements. Every statement but `return` leaves
    /// a value, which is popped.
    pub(crate) fn compile_statements(&mut self, block: &[Node]) -> Result<()> {
        for stmt in block {
            self.compile_node(stmt, 0)?;
            if !matches!(stmt, Node::Return { .. }) {
                self.emit(OpCode::Pop, &[]);
            }
        }
        Ok(())
    }

    /// Compile an expression. `outer` is used for nodes that carry no
    /// position of their own.
    fn compile_node(&mut self, node: &Node, outer: Pos) -> Result<()> {
        let pos = node.pos().unwrap_or(outer);

        if matches!(node, Node::Prefix { .. } | Node::Infix { .. }) && node.is_const_expression() {
            let value = eval_const(node).map_err(|e| self.error(pos, e.to_string()))?;
            return self.emit_constant(value, pos);
        }

        match node {
            Node::Int(n) => self.emit_constant(Value::Int(*n), pos),
            Node::Float(n) => self.emit_constant(Value::Float(*n), pos),
            Node::RawStr(s) => self.emit_constant(Value::string(s), pos),
            Node::Bool(true) => {
                self.emit(OpCode::True, &[]);
                Ok(())
            }
            Node::Bool(false) => {
                self.emit(OpCode::False, &[]);
                Ok(())
            }
            Node::Null => {
                self.emit(OpCode::Null, &[]);
                Ok(())
            }
            Node::Str { value, pos } => self.compile_string(value, *pos),
            Node::Ident { name, pos } => match self.resolve(name) {
                Some(symbol) => self.load_symbol(&symbol, *pos),
                None => Err(self.error(*pos, format!("undefined variable {}", name))),
            },
            Node::List(items) => {
                if items.len() > MAX_ITEMS {
                    return Err(self.error(pos, "list literal is too long"));
                }
                for item in items {
                    self.compile_node(item, pos)?;
                }
                self.emit(OpCode::List, &[items.len()]);
                Ok(())
            }
            Node::Map { pairs, pos } => {
                if pairs.len() > MAX_ITEMS {
                    return Err(self.error(*pos, "map literal is too long"));
                }
                for (key, value) in pairs {
                    self.compile_node(key, *pos)?;
                    self.compile_node(value, *pos)?;
                }
                self.emit_at(*pos, OpCode::Map, &[pairs.len()]);
                Ok(())
            }
            Node::Prefix { op, operand, pos } => {
                self.compile_node(operand, *pos)?;
                self.emit_at(*pos, prefix_opcode(*op), &[]);
                Ok(())
            }
            Node::Infix {
                op,
                left,
                right,
                pos,
            } => self.compile_infix(*op, left, right, *pos),
            Node::Assign { target, value, pos } => self.compile_assign(target, value, *pos),
            Node::CompoundAssign {
                op,
                target,
                value,
                pos,
            } => {
                let combined = Node::Infix {
                    op: *op,
                    left: target.clone(),
                    right: value.clone(),
                    pos: *pos,
                };
                self.compile_assign(target, &combined, *pos)
            }
            Node::Step { delta, target, pos } => {
                let combined = Node::Infix {
                    op: InfixOp::Add,
                    left: target.clone(),
                    right: Box::new(Node::Int(*delta)),
                    pos: *pos,
                };
                self.compile_assign(target, &combined, *pos)
            }
            Node::Block(block) => self.compile_branch(block),
            Node::If {
                cond,
                body,
                alt,
                pos,
            } => self.compile_if(cond, body, alt.as_deref(), *pos),
            Node::For {
                init,
                cond,
                post,
                body,
                pos,
            } => self.compile_for(init.as_deref(), cond, post.as_deref(), body, *pos),
            Node::Function {
                name,
                params,
                body,
                pos,
            } => self.compile_function(name.as_deref(), params, body, *pos),
            Node::Call { func, args, pos } => self.compile_call(OpCode::Call, func, args, *pos),
            Node::ConcurrentCall { func, args, pos } => {
                self.compile_call(OpCode::ConcurrentCall, func, args, *pos)
            }
            Node::Index { left, index, pos } => {
                self.compile_node(left, *pos)?;
                self.compile_node(index, *pos)?;
                self.emit_at(*pos, OpCode::Index, &[]);
                Ok(())
            }
            Node::Dot { left, name, pos } => {
                self.compile_node(left, *pos)?;
                self.emit_constant(Value::string(name), *pos)?;
                self.emit_at(*pos, OpCode::Dot, &[]);
                Ok(())
            }
            Node::Return { value, pos } => {
                self.compile_node(value, *pos)?;
                self.emit_at(*pos, OpCode::ReturnValue, &[]);
                Ok(())
            }
            Node::Break { .. } => {
                self.emit(OpCode::Jump, &[BREAK_PLACEHOLDER]);
                Ok(())
            }
            Node::Continue { .. } => {
                self.emit(OpCode::Jump, &[CONTINUE_PLACEHOLDER]);
                Ok(())
            }
            Node::Import { path, pos } => {
                self.compile_node(path, *pos)?;
                self.emit_at(*pos, OpCode::LoadModule, &[]);
                Ok(())
            }
        }
    }

    fn emit_constant(&mut self, value: Value, pos: Pos) -> Result<()> {
        let idx = self.add_constant(value, pos)?;
        self.emit(OpCode::Constant, &[idx]);
        Ok(())
    }

    /// A string with braces is a template. Templates without code segments
    /// are rendered now; the rest are interpolated at run time.
    fn compile_string(&mut self, value: &str, pos: Pos) -> Result<()> {
        if !value.contains(['{', '}']) {
            return self.emit_constant(Value::string(value), pos);
        }
        let segments = template::parse(value).map_err(|e| self.error(pos, e.to_string()))?;
        match template::count_code(&segments) {
            0 => {
                let text: String = segments
                    .iter()
                    .filter_map(|s| match s {
                        Segment::Text(t) => Some(t.as_str()),
                        Segment::Code(_) => None,
                    })
                    .collect();
                self.emit_constant(Value::string(&text), pos)
            }
            n if n > MAX_ITEMS => Err(self.error(pos, "too many interpolations")),
            n => {
                let idx = self.add_constant(Value::string(value), pos)?;
                self.emit_at(pos, OpCode::Interpolate, &[idx, n]);
                Ok(())
            }
        }
    }

    fn compile_infix(&mut self, op: InfixOp, left: &Node, right: &Node, pos: Pos) -> Result<()> {
        let (opcode, swapped) = infix_opcode(op);
        if swapped {
            self.compile_node(right, pos)?;
            self.compile_node(left, pos)?;
        } else {
            self.compile_node(left, pos)?;
            self.compile_node(right, pos)?;
        }
        self.emit_at(pos, opcode, &[]);
        Ok(())
    }

    fn compile_assign(&mut self, target: &Node, value: &Node, pos: Pos) -> Result<()> {
        match target {
            Node::Ident { name, .. } => {
                self.compile_node(value, pos)?;
                let symbol = match self.resolve(name) {
                    Some(s) if matches!(s.scope, SymbolScope::Global | SymbolScope::Local) => s,
                    _ => self.define(name, pos)?,
                };
                let op = if symbol.scope == SymbolScope::Global {
                    OpCode::SetGlobal
                } else {
                    OpCode::SetLocal
                };
                self.emit_at(pos, op, &[symbol.index]);
                Ok(())
            }
            Node::Dot { .. } | Node::Index { .. } => {
                self.compile_node(target, pos)?;
                self.compile_node(value, pos)?;
                self.emit_at(pos, OpCode::Define, &[]);
                Ok(())
            }
            _ => Err(self.error(pos, "cannot assign to literal")),
        }
    }

    /// Compile an `if` body or `else` block as an expression: its value is
    /// the value of its last statement, or null when empty.
    fn compile_branch(&mut self, block: &[Node]) -> Result<()> {
        if block.is_empty() {
            self.emit(OpCode::Null, &[]);
            return Ok(());
        }
        self.compile_statements(block)?;
        self.remove_last_pop();
        Ok(())
    }

    fn compile_if(&mut self, cond: &Node, body: &[Node], alt: Option<&Node>, pos: Pos) -> Result<()> {
        self.compile_node(cond, pos)?;
        let jump_not_truthy = self.emit_at(pos, OpCode::JumpNotTruthy, &[0]);

        self.compile_branch(body)?;
        let jump = self.emit(OpCode::Jump, &[0]);
        let after_body = self.position();
        self.change_operand(jump_not_truthy, after_body, pos)?;

        match alt {
            Some(Node::Block(block)) => self.compile_branch(block)?,
            Some(other) => self.compile_node(other, pos)?,
            None => {
                self.emit(OpCode::Null, &[]);
            }
        }
        let after_alt = self.position();
        self.change_operand(jump, after_alt, pos)
    }

    fn compile_for(
        &mut self,
        init: Option<&Node>,
        cond: &Node,
        post: Option<&Node>,
        body: &[Node],
        pos: Pos,
    ) -> Result<()> {
        if let Some(init) = init {
            self.compile_node(init, pos)?;
            self.emit(OpCode::Pop, &[]);
        }

        let start = self.position();
        self.compile_node(cond, pos)?;
        let jump_not_truthy = self.emit_at(pos, OpCode::JumpNotTruthy, &[0]);

        let start_body = self.position();
        self.compile_statements(body)?;
        let end_body = self.position();

        if let Some(post) = post {
            self.compile_node(post, pos)?;
            self.emit(OpCode::Pop, &[]);
        }
        self.emit(OpCode::Jump, &[start]);

        let end = self.emit(OpCode::Null, &[]);
        self.change_operand(jump_not_truthy, end, pos)?;

        self.patch_loop_jumps(start_body, end_body, CONTINUE_PLACEHOLDER, end_body, pos)?;
        self.patch_loop_jumps(start_body, end_body, BREAK_PLACEHOLDER, end, pos)
    }

    fn compile_function(
        &mut self,
        name: Option<&str>,
        params: &[String],
        body: &[Node],
        pos: Pos,
    ) -> Result<()> {
        let (func, free) = self.compile_function_body(name, params, body, pos)?;
        if free.len() > MAX_ARGS {
            return Err(self.error(pos, "too many captured variables"));
        }
        let idx = self.add_constant(Value::Function(Arc::new(func)), pos)?;
        for symbol in &free {
            self.load_symbol(symbol, pos)?;
        }
        self.emit_at(pos, OpCode::Closure, &[idx, free.len()]);
        Ok(())
    }

    fn compile_call(&mut self, op: OpCode, func: &Node, args: &[Node], pos: Pos) -> Result<()> {
        if args.len() > MAX_ARGS {
            return Err(self.error(pos, "too many arguments"));
        }
        self.compile_node(func, pos)?;
        for arg in args {
            self.compile_node(arg, pos)?;
        }
        self.emit_at(pos, op, &[args.len()]);
        Ok(())
    }
}


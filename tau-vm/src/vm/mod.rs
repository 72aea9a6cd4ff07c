// tau-vm - Bytecode compiler and virtual machine for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Stack-based virtual machine for executing tau bytecode.
//!
//! The loop is re-entrant: imported modules, interpolated snippets and host
//! calls push frames onto the same stacks and run the loop until the frame
//! depth falls back to where it started.

pub mod error;
pub mod frame;
pub mod handlers;
pub mod stack;

use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::Arc;

use tau_core::bookmark;
use tau_core::{Closure, CompiledFunction, Value};
use tracing::trace;

use crate::bytecode::Bytecode;
use crate::opcode::{self, OpCode};
use crate::state::State;

pub use error::{Result, RuntimeError};
pub use frame::{Frame, FrameKind};
pub use stack::{STACK_SIZE, ValueStack};

/// Frame stack capacity.
pub const MAX_FRAMES: usize = 1024;

/// Global slot capacity.
pub const MAX_GLOBALS: usize = 65536;

/// A decoded instruction. Unused operands are zero.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Instruction {
    pub op: OpCode,
    pub a: usize,
    pub b: usize,
}

/// The tau virtual machine.
pub struct VM<'s> {
    /// Constants, globals and modules, shared with the compiler.
    state: &'s mut State,

    /// Value stack.
    stack: ValueStack,

    /// Call frame stack.
    frames: Vec<Frame>,

    /// Value most recently discarded by `Pop`.
    last_popped: Value,
}

impl<'s> VM<'s> {
    /// Create a VM over `state`.
    pub fn new(state: &'s mut State) -> Self {
        Self {
            state,
            stack: ValueStack::new(),
            frames: Vec::new(),
            last_popped: Value::Null,
        }
    }

    pub fn state(&self) -> &State {
        self.state
    }

    pub fn last_popped(&self) -> &Value {
        &self.last_popped
    }

    /// Run a compiled unit to completion. Returns the value of the last
    /// expression statement.
    pub fn run(&mut self, bytecode: &Bytecode, file: Option<&str>) -> Result<Value> {
        self.guarded(|vm| vm.run_unit(bytecode, file))
    }

    /// Call a closure or builtin with `args`.
    pub fn call(&mut self, callee: &Value, args: &[Value]) -> Result<Value> {
        self.guarded(|vm| match callee.resolve() {
            Value::Closure(closure) => vm.invoke_closure(closure, args.to_vec()),
            Value::Builtin(builtin) => Ok((builtin.func)(args)),
            other => Err(RuntimeError::NotCallable(other.type_name())),
        })
    }

    /// Run `f`, turning a panic into an internal error. The stacks are
    /// cleared after any failure.
    fn guarded<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(&mut *self)));
        let result = outcome.unwrap_or_else(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panic in the VM".to_string());
            Err(RuntimeError::Internal(message))
        });
        if result.is_err() {
            self.stack.truncate(0);
            self.frames.clear();
        }
        result
    }

    /// Push a frame for a top-level unit and run it.
    pub(crate) fn run_unit(&mut self, bytecode: &Bytecode, file: Option<&str>) -> Result<Value> {
        self.state.ensure_globals(bytecode.num_globals.min(MAX_GLOBALS));
        let func = CompiledFunction::new(
            bytecode.instructions.clone(),
            0,
            0,
            bytecode.bookmarks.clone(),
        );
        let closure = Rc::new(Closure::new(Arc::new(func), Vec::new(), file.map(Rc::from)));
        self.push_frame(Frame::new(closure, self.stack.len(), FrameKind::Unit))?;

        let depth = self.frames.len() - 1;
        self.last_popped = Value::Null;
        self.run_loop(depth)?;
        Ok(self.last_popped.clone())
    }

    /// Call `closure` and run until it returns.
    pub(crate) fn invoke_closure(&mut self, closure: Rc<Closure>, args: Vec<Value>) -> Result<Value> {
        let depth = self.frames.len();
        let argc = args.len();
        self.stack.push(Value::Closure(closure.clone()))?;
        for arg in args {
            self.stack.push(arg)?;
        }
        self.call_closure(closure, argc)?;
        self.run_loop(depth)?;
        Ok(self.stack.pop()?.resolve())
    }

    /// Execute instructions until the frame stack is `stop` frames deep.
    pub(crate) fn run_loop(&mut self, stop: usize) -> Result<()> {
        while self.frames.len() > stop {
            let ins = self.fetch()?;
            if let Err(error) = self.execute(ins) {
                return Err(self.locate(error));
            }
        }
        Ok(())
    }

    fn execute(&mut self, ins: Instruction) -> Result<()> {
        match ins.op {
            // Constants & Stack - handled inline
            OpCode::Constant => {
                let value = self.constant(ins.a)?;
                self.stack.push(value)
            }
            OpCode::True => self.stack.push(Value::Bool(true)),
            OpCode::False => self.stack.push(Value::Bool(false)),
            OpCode::Null => self.stack.push(Value::Null),
            OpCode::Pop => {
                self.last_popped = self.stack.pop()?.resolve();
                Ok(())
            }

            // Operators
            OpCode::Add
            | OpCode::Sub
            | OpCode::Mul
            | OpCode::Div
            | OpCode::Mod
            | OpCode::BwAnd
            | OpCode::BwOr
            | OpCode::BwXor
            | OpCode::BwLShift
            | OpCode::BwRShift
            | OpCode::And
            | OpCode::Or
            | OpCode::Equal
            | OpCode::NotEqual
            | OpCode::GreaterThan
            | OpCode::GreaterThanEqual
            | OpCode::In => self.execute_binary(ins.op),
            OpCode::Minus | OpCode::Bang | OpCode::BwNot => self.execute_unary(ins.op),

            // Collections and handles
            OpCode::List | OpCode::Map | OpCode::Index | OpCode::Dot | OpCode::Define => {
                self.execute_collections(ins)
            }

            // Variables
            OpCode::GetGlobal
            | OpCode::SetGlobal
            | OpCode::GetLocal
            | OpCode::SetLocal
            | OpCode::GetBuiltin
            | OpCode::GetFree
            | OpCode::CurrentClosure => self.execute_variables(ins),

            // Control flow
            OpCode::Jump
            | OpCode::JumpNotTruthy
            | OpCode::Call
            | OpCode::Return
            | OpCode::ReturnValue
            | OpCode::Closure
            | OpCode::Halt => self.execute_control(ins),

            OpCode::ConcurrentCall => self.execute_concurrent_call(ins.a),
            OpCode::LoadModule => self.execute_load_module(),
            OpCode::Interpolate => self.execute_interpolate(ins.a, ins.b),
        }
    }

    /// Decode the instruction at the current frame's `ip` and step past it.
    fn fetch(&mut self) -> Result<Instruction> {
        let frame = self
            .frames
            .last_mut()
            .ok_or_else(|| RuntimeError::Internal("no active frame".into()))?;
        let ins = &frame.closure.func.instructions;
        let byte = *ins
            .get(frame.ip)
            .ok_or_else(|| RuntimeError::Internal("instruction pointer out of bounds".into()))?;
        let op = OpCode::from_byte(byte)
            .ok_or_else(|| RuntimeError::Internal(format!("unknown opcode {}", byte)))?;

        let mut operands = [0usize; 2];
        let mut at = frame.ip + 1;
        for (slot, &width) in operands.iter_mut().zip(op.operand_widths()) {
            if at + width > ins.len() {
                return Err(RuntimeError::Internal("truncated instruction".into()));
            }
            *slot = match width {
                1 => opcode::read_u8(ins, at),
                _ => opcode::read_u16(ins, at),
            };
            at += width;
        }
        frame.ip = at;

        Ok(Instruction {
            op,
            a: operands[0],
            b: operands[1],
        })
    }

    /// Anchor `error` to the source line of the instruction that raised it.
    fn locate(&self, error: RuntimeError) -> RuntimeError {
        if matches!(error, RuntimeError::Located { .. }) {
            return error;
        }
        let Some(frame) = self.frames.last() else {
            return error;
        };
        match bookmark::lookup(&frame.closure.func.bookmarks, frame.ip) {
            Some(bm) => RuntimeError::Located {
                rendered: bm.render(frame.file(), &error.to_string()),
                cause: Box::new(error),
            },
            None => error,
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    pub(crate) fn frame(&self) -> Result<&Frame> {
        self.frames
            .last()
            .ok_or_else(|| RuntimeError::Internal("no active frame".into()))
    }

    pub(crate) fn frame_mut(&mut self) -> Result<&mut Frame> {
        self.frames
            .last_mut()
            .ok_or_else(|| RuntimeError::Internal("no active frame".into()))
    }

    pub(crate) fn push_frame(&mut self, frame: Frame) -> Result<()> {
        if self.frames.len() >= MAX_FRAMES {
            return Err(RuntimeError::FrameOverflow);
        }
        trace!(depth = self.frames.len(), kind = ?frame.kind, "push frame");
        self.frames.push(frame);
        Ok(())
    }

    pub(crate) fn constant(&self, idx: usize) -> Result<Value> {
        self.state
            .constants
            .get(idx)
            .cloned()
            .ok_or_else(|| RuntimeError::Internal(format!("constant {} out of range", idx)))
    }
}

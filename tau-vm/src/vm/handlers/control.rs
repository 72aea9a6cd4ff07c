// tau-vm - Bytecode compiler and virtual machine for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Control flow opcode handlers: jumps, calls, returns, closures and Halt.

use std::rc::Rc;

use tau_core::{Closure, Value};
use tracing::trace;

use crate::opcode::OpCode;
use crate::vm::frame::{Frame, FrameKind};
use crate::vm::{Instruction, Result, RuntimeError, VM};

impl VM<'_> {
    /// Execute a control flow opcode.
    pub(crate) fn execute_control(&mut self, ins: Instruction) -> Result<()> {
        match ins.op {
            OpCode::Jump => {
                self.frame_mut()?.ip = ins.a;
                Ok(())
            }
            OpCode::JumpNotTruthy => {
                let cond = self.stack.pop()?;
                if !cond.is_truthy() {
                    self.frame_mut()?.ip = ins.a;
                }
                Ok(())
            }
            OpCode::Call => self.execute_call(ins.a),
            OpCode::Return => self.return_from_frame(Value::Null),
            OpCode::ReturnValue => {
                let value = self.stack.pop()?.resolve();
                self.return_from_frame(value)
            }
            OpCode::Closure => self.execute_closure(ins.a, ins.b),
            OpCode::Halt => {
                let frame = self
                    .frames
                    .pop()
                    .ok_or_else(|| RuntimeError::Internal("halt with no frame".into()))?;
                self.stack.truncate(frame.base);
                Ok(())
            }
            _ => Err(RuntimeError::Internal(format!(
                "execute_control: unexpected opcode {:?}",
                ins.op
            ))),
        }
    }

    /// Call the value sitting below the top `argc` stack slots.
    fn execute_call(&mut self, argc: usize) -> Result<()> {
        let callee = self.stack.peek(argc)?.resolve();
        match callee {
            Value::Closure(closure) => self.call_closure(closure, argc),
            Value::Builtin(builtin) => {
                trace!(builtin = builtin.name, argc, "calling builtin");
                let args = self.stack.pop_resolved(argc)?;
                self.stack.pop()?;
                self.stack.push((builtin.func)(&args))
            }
            other => Err(RuntimeError::NotCallable(other.type_name())),
        }
    }

    /// Enter `closure` with its arguments already on the stack. The frame's
    /// locals start at the first argument and are padded with nulls.
    pub(crate) fn call_closure(&mut self, closure: Rc<Closure>, argc: usize) -> Result<()> {
        let expected = closure.func.num_params;
        if argc != expected {
            return Err(RuntimeError::ArityError {
                expected,
                got: argc,
            });
        }
        let base = self
            .stack
            .len()
            .checked_sub(argc)
            .ok_or(RuntimeError::StackUnderflow)?;
        self.stack.resolve_from(base);
        self.stack.fill_to(base + closure.func.num_locals)?;
        self.push_frame(Frame::new(closure, base, FrameKind::Call))
    }

    /// Pop the current frame. A call leaves `value` in place of the callee;
    /// a unit records it as its result.
    fn return_from_frame(&mut self, value: Value) -> Result<()> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| RuntimeError::Internal("return with no frame".into()))?;
        match frame.kind {
            FrameKind::Call => {
                self.stack.truncate(frame.base.saturating_sub(1));
                self.stack.push(value)
            }
            FrameKind::Unit => {
                self.stack.truncate(frame.base);
                self.last_popped = value;
                Ok(())
            }
        }
    }

    /// Bind the function in constants[idx] to the top `num_free` values.
    fn execute_closure(&mut self, idx: usize, num_free: usize) -> Result<()> {
        let func = match self.constant(idx)? {
            Value::Function(func) => func,
            other => {
                return Err(RuntimeError::Internal(format!(
                    "constant {} is a {}, not a function",
                    idx,
                    other.type_name()
                )));
            }
        };
        let free = self.stack.pop_resolved(num_free)?;
        let file = self.frame()?.closure.file.clone();
        let closure = Closure::new(func, free, file);
        self.stack.push(Value::Closure(Rc::new(closure)))
    }
}

// tau-vm - Bytecode compiler and virtual machine for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Variable opcode handlers: globals, locals, builtins, free variables and
//! the running closure.

use tau_core::{BUILTINS, Value};

use crate::opcode::OpCode;
use crate::vm::{Instruction, MAX_GLOBALS, Result, RuntimeError, VM};

impl VM<'_> {
    /// Execute a variable opcode.
    pub(crate) fn execute_variables(&mut self, ins: Instruction) -> Result<()> {
        match ins.op {
            OpCode::GetGlobal => {
                let value = self
                    .state
                    .globals
                    .get(ins.a)
                    .cloned()
                    .unwrap_or(Value::Null);
                self.stack.push(value)
            }
            OpCode::SetGlobal => {
                if ins.a >= MAX_GLOBALS {
                    return Err(RuntimeError::GlobalOutOfRange);
                }
                let value = self.store_top()?;
                self.state.ensure_globals(ins.a + 1);
                self.state.globals[ins.a] = value;
                Ok(())
            }
            OpCode::GetLocal => {
                let base = self.frame()?.base;
                let value = self.stack.get(base + ins.a)?;
                self.stack.push(value)
            }
            OpCode::SetLocal => {
                let value = self.store_top()?;
                let base = self.frame()?.base;
                self.stack.set(base + ins.a, value)
            }
            OpCode::GetBuiltin => {
                let builtin = BUILTINS.get(ins.a).ok_or_else(|| {
                    RuntimeError::Internal(format!("builtin {} out of range", ins.a))
                })?;
                self.stack.push(Value::Builtin(builtin))
            }
            OpCode::GetFree => {
                let value = self
                    .frame()?
                    .closure
                    .free
                    .get(ins.a)
                    .cloned()
                    .ok_or_else(|| {
                        RuntimeError::Internal(format!("free variable {} out of range", ins.a))
                    })?;
                self.stack.push(value)
            }
            OpCode::CurrentClosure => {
                let closure = self.frame()?.closure.clone();
                self.stack.push(Value::Closure(closure))
            }
            _ => Err(RuntimeError::Internal(format!(
                "execute_variables: unexpected opcode {:?}",
                ins.op
            ))),
        }
    }

    /// Resolve the top of the stack in place and return it. An assignment
    /// leaves its value on the stack as the expression's result.
    fn store_top(&mut self) -> Result<Value> {
        let value = self.stack.peek(0)?.resolve();
        self.stack.replace_top(value.clone())?;
        Ok(value)
    }
}

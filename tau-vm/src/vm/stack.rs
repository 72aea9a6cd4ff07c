// tau-vm - Bytecode compiler and virtual machine for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Operand stack for the VM.

use tau_core::Value;

use super::{Result, RuntimeError};

/// Operand stack capacity.
pub const STACK_SIZE: usize = 2048;

/// The VM's operand stack, bounded at [`STACK_SIZE`] slots.
#[derive(Debug, Default)]
pub struct ValueStack {
    values: Vec<Value>,
}

impl ValueStack {
    /// Create a new empty stack.
    pub fn new() -> Self {
        Self {
            values: Vec::with_capacity(256),
        }
    }

    /// Push a value onto the stack.
    #[inline]
    pub fn push(&mut self, value: Value) -> Result<()> {
        if self.values.len() >= STACK_SIZE {
            return Err(RuntimeError::StackOverflow);
        }
        self.values.push(value);
        Ok(())
    }

    /// Pop a value from the stack.
    #[inline]
    pub fn pop(&mut self) -> Result<Value> {
        self.values.pop().ok_or(RuntimeError::StackUnderflow)
    }

    /// Peek at a value on the stack without removing it.
    /// `distance` is the offset from the top (0 = top).
    #[inline]
    pub fn peek(&self, distance: usize) -> Result<&Value> {
        if distance >= self.values.len() {
            return Err(RuntimeError::StackUnderflow);
        }
        Ok(&self.values[self.values.len() - 1 - distance])
    }

    /// Get a value at an absolute index.
    #[inline]
    pub fn get(&self, index: usize) -> Result<Value> {
        self.values
            .get(index)
            .cloned()
            .ok_or(RuntimeError::StackUnderflow)
    }

    /// Set a value at an absolute index.
    #[inline]
    pub fn set(&mut self, index: usize, value: Value) -> Result<()> {
        let slot = self
            .values
            .get_mut(index)
            .ok_or(RuntimeError::StackUnderflow)?;
        *slot = value;
        Ok(())
    }

    /// Replace the top value.
    #[inline]
    pub fn replace_top(&mut self, value: Value) -> Result<()> {
        let slot = self.values.last_mut().ok_or(RuntimeError::StackUnderflow)?;
        *slot = value;
        Ok(())
    }

    /// Get the current stack size.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the stack is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Truncate the stack to the given size.
    #[inline]
    pub fn truncate(&mut self, size: usize) {
        self.values.truncate(size);
    }

    /// Grow the stack with nulls up to `size` slots.
    pub fn fill_to(&mut self, size: usize) -> Result<()> {
        if size > STACK_SIZE {
            return Err(RuntimeError::StackOverflow);
        }
        if self.values.len() < size {
            self.values.resize(size, Value::Null);
        }
        Ok(())
    }

    /// Pop n values, resolving handles, and return them in push order.
    pub fn pop_resolved(&mut self, n: usize) -> Result<Vec<Value>> {
        if n > self.values.len() {
            return Err(RuntimeError::StackUnderflow);
        }
        let start = self.values.len() - n;
        Ok(self.values.drain(start..).map(|v| v.resolve()).collect())
    }

    /// Resolve handles in place for every slot from `start` to the top.
    pub fn resolve_from(&mut self, start: usize) {
        for value in self.values.iter_mut().skip(start) {
            if matches!(value, Value::GetSetter(_)) {
                *value = value.resolve();
            }
        }
    }
}

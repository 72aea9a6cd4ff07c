// tau-vm - Bytecode compiler and virtual machine for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Operator opcode handlers: arithmetic, bitwise, logical, comparison and
//! membership. The operator rules live in [`crate::ops`].

use crate::opcode::OpCode;
use crate::ops;
use crate::vm::{Result, VM};

impl VM<'_> {
    /// Pop right, pop left, push `left op right`.
    pub(crate) fn execute_binary(&mut self, op: OpCode) -> Result<()> {
        let right = self.stack.pop()?.resolve();
        let left = self.stack.pop()?.resolve();
        let result = ops::binary(op, &left, &right)?;
        self.stack.push(result)
    }

    pub(crate) fn execute_unary(&mut self, op: OpCode) -> Result<()> {
        let operand = self.stack.pop()?.resolve();
        let result = ops::unary(op, &operand)?;
        self.stack.push(result)
    }
}

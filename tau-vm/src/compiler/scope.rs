// tau-vm - Bytecode compiler and virtual machine for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Per-function compilation state.

use tau_core::Bookmark;

use crate::opcode::OpCode;

/// An instruction already written to a scope, remembered for peephole
/// fix-ups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmittedInstruction {
    pub op: OpCode,
    pub position: usize,
}

/// One function nesting level: its instruction buffer, the last two
/// instructions emitted into it and its bookmarks.
#[derive(Debug, Clone, Default)]
pub struct CompilationScope {
    pub instructions: Vec<u8>,
    pub last: Option<EmittedInstruction>,
    pub previous: Option<EmittedInstruction>,
    pub bookmarks: Vec<Bookmark>,
}

impl CompilationScope {
    pub fn new() -> Self {
        CompilationScope::default()
    }

    pub fn last_is(&self, op: OpCode) -> bool {
        self.last.is_some_and(|last| last.op == op)
    }

    /// Append an encoded instruction and return its position.
    pub fn push(&mut self, op: OpCode, encoded: &[u8]) -> usize {
        let position = self.instructions.len();
        self.instructions.extend_from_slice(encoded);
        self.previous = self.last;
        self.last = Some(EmittedInstruction { op, position });
        position
    }

    /// Drop the last instruction if it is a `Pop`.
    pub fn remove_last_pop(&mut self) -> bool {
        match self.last {
            Some(EmittedInstruction {
                op: OpCode::Pop,
                position,
            }) => {
                self.instructions.truncate(position);
                self.last = self.previous.take();
                true
            }
            _ => false,
        }
    }

    /// Turn a trailing `Pop` into `ReturnValue`.
    pub fn replace_last_pop_with_return(&mut self) -> bool {
        match &mut self.last {
            Some(last) if last.op == OpCode::Pop => {
                self.instructions[last.position] = OpCode::ReturnValue as u8;
                last.op = OpCode::ReturnValue;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_two_instructions_are_tracked() {
        let mut scope = CompilationScope::new();
        scope.push(OpCode::True, &[OpCode::True as u8]);
        scope.push(OpCode::Pop, &[OpCode::Pop as u8]);
        assert!(scope.last_is(OpCode::Pop));
        assert_eq!(scope.previous.unwrap().op, OpCode::True);

        assert!(scope.remove_last_pop());
        assert_eq!(scope.instructions, vec![OpCode::True as u8]);
        assert!(scope.last_is(OpCode::True));
        assert!(!scope.remove_last_pop());
    }

    #[test]
    fn test_replace_last_pop_with_return() {
        let mut scope = CompilationScope::new();
        scope.push(OpCode::Null, &[OpCode::Null as u8]);
        assert!(!scope.replace_last_pop_with_return());
        scope.push(OpCode::Pop, &[OpCode::Pop as u8]);
        assert!(scope.replace_last_pop_with_return());
        assert_eq!(
            scope.instructions,
            vec![OpCode::Null as u8, OpCode::ReturnValue as u8]
        );
        assert!(scope.last_is(OpCode::ReturnValue));
    }
}

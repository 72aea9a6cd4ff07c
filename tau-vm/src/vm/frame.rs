// tau-vm - Bytecode compiler and virtual machine for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Call frames for the VM.

use std::rc::Rc;

use tau_core::Closure;

/// What a frame was pushed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// A closure call. Its slot and arguments sit just below `base`.
    Call,
    /// A top-level unit: a program, a REPL line or an imported module.
    Unit,
}

/// A frame on the VM's call stack.
#[derive(Debug, Clone)]
pub struct Frame {
    /// The closure being executed.
    pub closure: Rc<Closure>,

    /// Offset of the next instruction.
    pub ip: usize,

    /// Stack index of the first local. For calls the callee sits at
    /// `base - 1`.
    pub base: usize,

    pub kind: FrameKind,
}

impl Frame {
    pub fn new(closure: Rc<Closure>, base: usize, kind: FrameKind) -> Self {
        Self {
            closure,
            ip: 0,
            base,
            kind,
        }
    }

    #[inline]
    pub fn instructions(&self) -> &[u8] {
        &self.closure.func.instructions
    }

    /// Source file of the running code.
    pub fn file(&self) -> Option<&str> {
        self.closure.file.as_deref()
    }
}

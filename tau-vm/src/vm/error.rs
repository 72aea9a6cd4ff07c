// tau-vm - Bytecode compiler and virtual machine for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime errors for the VM.

use thiserror::Error;

/// Runtime error during VM execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("stack overflow")]
    StackOverflow,

    #[error("stack underflow")]
    StackUnderflow,

    #[error("frame overflow")]
    FrameOverflow,

    #[error("global index out of range")]
    GlobalOutOfRange,

    #[error("unsupported operator '{op}' for types {left} and {right}")]
    UnsupportedOperator {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("unsupported operator '{op}' for type {operand}")]
    UnsupportedPrefix {
        op: &'static str,
        operand: &'static str,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("negative shift amount")]
    NegativeShift,

    #[error("invalid index operator for types {left} and {index}")]
    InvalidIndex {
        left: &'static str,
        index: &'static str,
    },

    #[error("index out of range")]
    IndexOutOfRange,

    #[error("{type_name} object has no attribute {name}")]
    NoAttribute {
        type_name: &'static str,
        name: String,
    },

    #[error("cannot assign to type \"{0}\"")]
    InvalidAssignment(&'static str),

    #[error("invalid map key type {0}")]
    InvalidMapKey(&'static str),

    #[error("wrong number of arguments: expected {expected}, got {got}")]
    ArityError { expected: usize, got: usize },

    #[error("calling non-function {0}")]
    NotCallable(&'static str),

    #[error("import: {0}")]
    Import(String),

    #[error("bad interpolation syntax")]
    BadInterpolation,

    /// A compile error raised while running, from an import or an
    /// interpolated snippet.
    #[error("{0}")]
    Compile(String),

    /// An error anchored to the source line that raised it.
    #[error("{rendered}")]
    Located {
        rendered: String,
        #[source]
        cause: Box<RuntimeError>,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl RuntimeError {
    /// The error with any source location stripped.
    pub fn root(&self) -> &RuntimeError {
        match self {
            RuntimeError::Located { cause, .. } => cause.root(),
            other => other,
        }
    }
}

/// Result type for VM operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

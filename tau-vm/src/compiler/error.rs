// tau-vm - Bytecode compiler and virtual machine for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Compile errors.

use thiserror::Error;

/// Error during compilation, rendered against the source line when the
/// compiler knows the source text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{rendered}")]
pub struct CompileError {
    /// The bare message
    pub message: String,
    /// The message anchored to its source line
    pub rendered: String,
}

impl CompileError {
    /// An error with no source location.
    pub fn bare(message: impl Into<String>) -> Self {
        let message = message.into();
        CompileError {
            rendered: message.clone(),
            message,
        }
    }
}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;

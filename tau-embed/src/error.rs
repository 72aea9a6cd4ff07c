// tau-embed - Engine errors
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Errors surfaced by the [`Engine`](crate::Engine).

use std::io;
use std::path::PathBuf;

use tau_parser::ParseErrors;
use tau_vm::{CompileError, DecodeError, EncodeError, RuntimeError};
use thiserror::Error;

/// Any failure while loading, compiling or running tau code.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    Parse(#[from] ParseErrors),

    #[error("{0}")]
    Compile(#[from] CompileError),

    #[error("{0}")]
    Runtime(#[from] RuntimeError),

    #[error("cannot decode bytecode: {0}")]
    Decode(#[from] DecodeError),

    #[error("cannot encode bytecode: {0}")]
    Encode(#[from] EncodeError),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("undefined name {0}")]
    Undefined(String),

    #[error("expected {expected}, got {got}")]
    Conversion {
        expected: &'static str,
        got: &'static str,
    },

    #[error("{0}")]
    Range(String),
}

impl EngineError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn conversion(expected: &'static str, got: &'static str) -> Self {
        EngineError::Conversion { expected, got }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

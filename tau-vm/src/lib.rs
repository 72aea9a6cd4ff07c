// tau-vm - Bytecode compiler and virtual machine for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode compiler and stack-based virtual machine for tau.
//!
//! Source is parsed by `tau-parser`, compiled against a shared [`State`] into
//! [`Bytecode`], and executed by the [`VM`]. Bytecode can be persisted to and
//! loaded from `.tauc` files.

pub mod bytecode;
pub mod compiler;
pub mod opcode;
pub mod ops;
pub mod state;
pub mod symbol_table;
pub mod template;
pub mod vm;

pub use bytecode::{Bytecode, DecodeError, EncodeError};
pub use compiler::{CompileError, Compiler};
pub use opcode::OpCode;
pub use state::{DEFAULT_LIB_PATH, State, split_lib_paths};
pub use symbol_table::{Symbol, SymbolScope, SymbolTable};
pub use vm::{RuntimeError, VM};

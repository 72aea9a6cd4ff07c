// tau-embed - Embedding API for tau
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # tau-embed
//!
//! A high-level embedding API for the tau programming language.
//!
//! This crate wraps parsing, compilation and the VM behind one [`Engine`],
//! handles `.tauc` bytecode files, and converts between Rust and tau values.
//!
//! ## Quick Start
//!
//! ```rust
//! use tau_embed::Engine;
//!
//! let mut engine = Engine::new();
//! let result = engine.eval("[1, 2, 3]").unwrap();
//! println!("{}", result); // [1, 2, 3]
//! ```
//!
//! ## Passing Values In and Out
//!
//! ```rust
//! use tau_embed::Engine;
//!
//! let mut engine = Engine::new();
//! engine.set("names", vec!["ada", "grace"]);
//! engine.eval("count = len(names)").unwrap();
//! assert_eq!(engine.get_as::<i64>("count"), Some(2));
//! ```

mod convert;
mod engine;
mod error;

pub use convert::{FromValue, IntoValue, from_value, to_value};
pub use engine::{COMPILED_EXTENSION, Engine, EngineConfig};
pub use error::{EngineError, Result};

// Re-export core types for convenience
pub use tau_core::Value;
pub use tau_vm::RuntimeError;

// tau-core - Function templates and closures for tau
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Compiled function templates and the closures built from them.

use std::rc::Rc;
use std::sync::Arc;

use crate::bookmark::Bookmark;
use crate::value::Value;

/// A compiled, capture-free function body.
///
/// Lives in the constant pool. The `Closure` opcode binds it to its captured
/// values to make something callable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompiledFunction {
    pub instructions: Vec<u8>,
    pub num_locals: usize,
    pub num_params: usize,
    pub bookmarks: Vec<Bookmark>,
}

impl CompiledFunction {
    pub fn new(
        instructions: Vec<u8>,
        num_locals: usize,
        num_params: usize,
        bookmarks: Vec<Bookmark>,
    ) -> Self {
        CompiledFunction {
            instructions,
            num_locals,
            num_params,
            bookmarks,
        }
    }
}

/// A function template bound to its captured free variables.
#[derive(Debug, Clone)]
pub struct Closure {
    pub func: Arc<CompiledFunction>,
    /// Captured values, in the order they were first referenced as free
    pub free: Vec<Value>,
    /// Source file the function was compiled from, for diagnostics
    pub file: Option<Rc<str>>,
}

impl Closure {
    pub fn new(func: Arc<CompiledFunction>, free: Vec<Value>, file: Option<Rc<str>>) -> Self {
        Closure { func, free, file }
    }
}

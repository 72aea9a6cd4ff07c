// tau-vm - Bytecode compiler and virtual machine for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode compiler: transforms the tau AST into bytecode.
//!
//! The compiler walks the tree once. Each function literal gets its own
//! [`CompilationScope`] and an enclosed [`SymbolTable`]; the constant pool is
//! borrowed from the caller so nested and imported compilations share it.

pub mod codegen;
pub mod error;
pub mod fold;
pub mod scope;

use std::sync::Arc;

use tau_core::{Bookmark, CompiledFunction, Value};
use tau_parser::{Node, Pos, source};
use tracing::debug;

use crate::bytecode::Bytecode;
use crate::opcode::{self, OpCode};
use crate::symbol_table::{Symbol, SymbolScope, SymbolTable};

pub use error::{CompileError, Result};
pub use scope::{CompilationScope, EmittedInstruction};

/// Operand of a `break` jump until its loop is patched.
pub(crate) const BREAK_PLACEHOLDER: usize = 0xFFFF;
/// Operand of a `continue` jump until its loop is patched.
pub(crate) const CONTINUE_PLACEHOLDER: usize = 0xFFFE;
/// Largest real jump target; the two values above it are placeholders.
const MAX_JUMP_TARGET: usize = 0xFFFD;

const MAX_CONSTANTS: usize = u16::MAX as usize + 1;
const MAX_GLOBALS: usize = u16::MAX as usize + 1;
const MAX_LOCALS: usize = u8::MAX as usize + 1;

/// The bytecode compiler.
pub struct Compiler<'a> {
    constants: &'a mut Vec<Value>,
    symbols: SymbolTable,
    /// Scope being compiled into
    scope: CompilationScope,
    /// Scopes of the enclosing function literals
    enclosing: Vec<CompilationScope>,
    file: Option<String>,
    source: Option<&'a str>,
}

impl<'a> Compiler<'a> {
    /// Create a compiler adding constants to `constants` and resolving names
    /// in `symbols`.
    pub fn new(constants: &'a mut Vec<Value>, symbols: SymbolTable) -> Self {
        Compiler {
            constants,
            symbols,
            scope: CompilationScope::new(),
            enclosing: Vec::new(),
            file: None,
            source: None,
        }
    }

    /// Attach the source text, enabling bookmarks and rendered errors.
    pub fn with_source(mut self, file: Option<&str>, source: &'a str) -> Self {
        self.file = file.map(str::to_string);
        self.source = Some(source);
        self
    }

    /// Compile a top-level unit. The unit ends with `Halt`.
    pub fn compile(&mut self, program: &[Node]) -> Result<()> {
        debug!(
            file = self.file.as_deref().unwrap_or(source::STDIN_NAME),
            statements = program.len(),
            "compiling unit"
        );
        self.compile_statements(program)?;
        self.emit(OpCode::Halt, &[]);
        Ok(())
    }

    /// Compile a program as the body of a zero-argument function, so running
    /// it returns the value of its last statement.
    pub fn compile_snippet(&mut self, program: &[Node]) -> Result<Arc<CompiledFunction>> {
        let (func, _) = self.compile_function_body(None, &[], program, 0)?;
        Ok(Arc::new(func))
    }

    /// The bytecode compiled so far at the top level.
    pub fn bytecode(&self) -> Bytecode {
        Bytecode {
            instructions: self.scope.instructions.clone(),
            constants: self.constants.clone(),
            bookmarks: self.scope.bookmarks.clone(),
            num_globals: self.symbols.num_definitions,
        }
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn into_symbols(self) -> SymbolTable {
        self.symbols
    }

    // =========================================================================
    // Emission
    // =========================================================================

    /// Encode and append an instruction, returning its position.
    pub(crate) fn emit(&mut self, op: OpCode, operands: &[usize]) -> usize {
        let encoded = opcode::make(op, operands);
        self.scope.push(op, &encoded)
    }

    /// Emit `op` and bookmark it at `pos`.
    pub(crate) fn emit_at(&mut self, pos: Pos, op: OpCode, operands: &[usize]) -> usize {
        let position = self.emit(op, operands);
        self.bookmark(pos);
        position
    }

    pub(crate) fn position(&self) -> usize {
        self.scope.instructions.len()
    }

    pub(crate) fn last_is(&self, op: OpCode) -> bool {
        self.scope.last_is(op)
    }

    pub(crate) fn remove_last_pop(&mut self) -> bool {
        self.scope.remove_last_pop()
    }

    /// Record the current instruction offset against source position `pos`.
    pub(crate) fn bookmark(&mut self, pos: Pos) {
        if let Some(src) = self.source {
            let offset = self.scope.instructions.len();
            self.scope.bookmarks.push(Bookmark::new(src, pos, offset));
        }
    }

    pub(crate) fn add_constant(&mut self, value: Value, pos: Pos) -> Result<usize> {
        if self.constants.len() >= MAX_CONSTANTS {
            return Err(self.error(pos, "too many constants"));
        }
        self.constants.push(value);
        Ok(self.constants.len() - 1)
    }

    /// Rewrite the operand of the jump at `position`.
    pub(crate) fn change_operand(&mut self, position: usize, operand: usize, pos: Pos) -> Result<()> {
        if operand > MAX_JUMP_TARGET {
            return Err(self.error(pos, "function body is too large"));
        }
        let op = OpCode::from_byte(self.scope.instructions[position])
            .ok_or_else(|| self.error(pos, "patching an unknown instruction"))?;
        let encoded = opcode::make(op, &[operand]);
        self.scope.instructions[position..position + encoded.len()].copy_from_slice(&encoded);
        Ok(())
    }

    /// Point every `Jump placeholder` in `start..end` at `target`. Loops
    /// patch their own bodies before any enclosing loop does, so a jump
    /// always lands on its innermost loop.
    pub(crate) fn patch_loop_jumps(
        &mut self,
        start: usize,
        end: usize,
        placeholder: usize,
        target: usize,
        pos: Pos,
    ) -> Result<()> {
        let mut ip = start;
        while ip < end {
            let op = OpCode::from_byte(self.scope.instructions[ip])
                .ok_or_else(|| self.error(pos, "patching an unknown instruction"))?;
            if op == OpCode::Jump && opcode::read_u16(&self.scope.instructions, ip + 1) == placeholder
            {
                self.change_operand(ip, target, pos)?;
            }
            ip += op.width();
        }
        Ok(())
    }

    // =========================================================================
    // Scopes and symbols
    // =========================================================================

    fn enter_scope(&mut self) {
        let outer = std::mem::take(&mut self.scope);
        self.enclosing.push(outer);
        self.symbols = SymbolTable::new_enclosed(std::mem::take(&mut self.symbols));
    }

    /// Leave a function scope, returning its instructions, bookmarks, local
    /// count and captured symbols.
    fn leave_scope(&mut self) -> Result<(CompilationScope, usize, Vec<Symbol>)> {
        let outer = self
            .enclosing
            .pop()
            .ok_or_else(|| CompileError::bare("left the top-level scope"))?;
        let inner = std::mem::replace(&mut self.scope, outer);
        let table = std::mem::take(&mut self.symbols);
        let num_locals = table.num_definitions;
        let free = table.free_symbols.clone();
        self.symbols = table
            .into_outer()
            .ok_or_else(|| CompileError::bare("left the top-level symbol table"))?;
        Ok((inner, num_locals, free))
    }

    /// Define `name` in the current table, checking slot limits.
    pub(crate) fn define(&mut self, name: &str, pos: Pos) -> Result<Symbol> {
        let symbol = self.symbols.define(name);
        match symbol.scope {
            SymbolScope::Global if symbol.index >= MAX_GLOBALS => {
                Err(self.error(pos, "too many global variables"))
            }
            SymbolScope::Local if symbol.index >= MAX_LOCALS => {
                Err(self.error(pos, "too many local variables"))
            }
            _ => Ok(symbol),
        }
    }

    pub(crate) fn resolve(&mut self, name: &str) -> Option<Symbol> {
        self.symbols.resolve(name)
    }

    pub(crate) fn load_symbol(&mut self, symbol: &Symbol, pos: Pos) -> Result<()> {
        match symbol.scope {
            SymbolScope::Global => self.emit(OpCode::GetGlobal, &[symbol.index]),
            SymbolScope::Local => self.emit(OpCode::GetLocal, &[symbol.index]),
            SymbolScope::Builtin => self.emit(OpCode::GetBuiltin, &[symbol.index]),
            SymbolScope::Free if symbol.index >= MAX_LOCALS => {
                return Err(self.error(pos, "too many captured variables"));
            }
            SymbolScope::Free => self.emit(OpCode::GetFree, &[symbol.index]),
            SymbolScope::FunctionSelf => self.emit(OpCode::CurrentClosure, &[]),
        };
        Ok(())
    }

    /// Compile a function body in a fresh scope. Returns the template and the
    /// symbols it captures, in capture order.
    pub(crate) fn compile_function_body(
        &mut self,
        name: Option<&str>,
        params: &[String],
        body: &[Node],
        pos: Pos,
    ) -> Result<(CompiledFunction, Vec<Symbol>)> {
        self.enter_scope();
        let compiled = self.compile_function_inner(name, params, body, pos);
        let (scope, num_locals, free) = self.leave_scope()?;
        compiled?;

        let func = CompiledFunction::new(scope.instructions, num_locals, params.len(), scope.bookmarks);
        Ok((func, free))
    }

    fn compile_function_inner(
        &mut self,
        name: Option<&str>,
        params: &[String],
        body: &[Node],
        pos: Pos,
    ) -> Result<()> {
        if let Some(name) = name {
            self.symbols.define_function_self(name);
        }
        for param in params {
            self.define(param, pos)?;
        }
        self.compile_statements(body)?;

        self.scope.replace_last_pop_with_return();
        if !self.last_is(OpCode::ReturnValue) {
            self.emit(OpCode::Return, &[]);
        }
        Ok(())
    }

    // =========================================================================
    // Errors
    // =========================================================================

    pub(crate) fn error(&self, pos: Pos, message: impl Into<String>) -> CompileError {
        let message = message.into();
        let rendered = match self.source {
            Some(src) => source::render(self.file.as_deref(), src, pos, &message),
            None => message.clone(),
        };
        CompileError { message, rendered }
    }
}

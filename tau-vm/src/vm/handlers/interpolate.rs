// tau-vm - Bytecode compiler and virtual machine for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The Interpolate handler.
//!
//! Each `{code}` segment of a template is compiled the first time it runs,
//! as a zero-argument function against the unit's top-level symbol table,
//! and cached. Running it pushes a frame on this VM, so snippets see the
//! unit's globals and builtins but not the locals of an enclosing function.

use std::rc::Rc;
use std::sync::Arc;

use tau_core::{Closure, CompiledFunction, Value};
use tracing::trace;

use crate::compiler::Compiler;
use crate::state::unit_key;
use crate::symbol_table::SymbolTable;
use crate::template::{self, Segment};
use crate::vm::{Result, RuntimeError, VM};

impl VM<'_> {
    /// Render the template in constants[idx], which has `count` code
    /// segments, and push the result.
    pub(crate) fn execute_interpolate(&mut self, idx: usize, count: usize) -> Result<()> {
        let template = match self.constant(idx)? {
            Value::Str(s) => s,
            other => {
                return Err(RuntimeError::Internal(format!(
                    "template constant is a {}",
                    other.type_name()
                )));
            }
        };
        let segments = template::parse(&template).map_err(|_| RuntimeError::BadInterpolation)?;
        if template::count_code(&segments) != count {
            return Err(RuntimeError::BadInterpolation);
        }

        let file = self.frame()?.closure.file.clone();
        let mut out = String::with_capacity(template.len());
        let mut segment_no = 0;
        for segment in &segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Code(code) => {
                    let func = self.snippet(file.as_deref(), idx, segment_no, code)?;
                    segment_no += 1;
                    let closure = Rc::new(Closure::new(func, Vec::new(), file.clone()));
                    let value = self.invoke_closure(closure, Vec::new())?;
                    out.push_str(&value.to_string());
                }
            }
        }
        self.stack.push(Value::string(&out))
    }

    /// The compiled form of one code segment, compiling it on first use.
    fn snippet(
        &mut self,
        file: Option<&str>,
        idx: usize,
        segment_no: usize,
        code: &str,
    ) -> Result<Arc<CompiledFunction>> {
        let unit = unit_key(file);
        let key = (unit, idx, segment_no);
        if let Some(func) = self.state.snippets.get(&key) {
            return Ok(func.clone());
        }

        trace!(unit = %key.0, code, "compiling interpolation");
        let program =
            tau_parser::parse(file, code).map_err(|e| RuntimeError::Compile(e.to_string()))?;
        let symbols = self
            .state
            .units
            .get(&key.0)
            .cloned()
            .unwrap_or_else(SymbolTable::with_builtins);
        let func = Compiler::new(&mut self.state.constants, symbols)
            .with_source(file, code)
            .compile_snippet(&program)
            .map_err(|e| RuntimeError::Compile(e.rendered))?;
        self.state.snippets.insert(key, func.clone());
        Ok(func)
    }
}

// tau-vm - Bytecode compiler and virtual machine for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The ConcurrentCall handler.
//!
//! `tau f(args)` evaluates to null at once. The callee runs on its own
//! thread, in a fresh VM over a deep copy of the constants, globals, callee
//! and arguments. Only pipes stay shared. Nothing flows back: a failure in
//! the child is logged and otherwise dropped.

use std::collections::HashMap;
use std::path::PathBuf;
use std::thread;

use tau_core::{Snapshot, SnapshotError, Value};
use tracing::{debug, warn};

use crate::state::State;
use crate::symbol_table::SymbolTable;
use crate::vm::{Result, RuntimeError, VM};

/// Everything a child VM needs, in sendable form.
struct Task {
    constants: Vec<Snapshot>,
    globals: Vec<Snapshot>,
    num_defs: usize,
    units: HashMap<String, SymbolTable>,
    lib_paths: Vec<PathBuf>,
    callee: Snapshot,
    args: Vec<Snapshot>,
}

impl Task {
    fn capture(state: &State, callee: &Value, args: &[Value]) -> std::result::Result<Task, SnapshotError> {
        Ok(Task {
            constants: Snapshot::capture_all(&state.constants)?,
            globals: Snapshot::capture_all(&state.globals)?,
            num_defs: state.num_defs,
            units: state.units.clone(),
            lib_paths: state.lib_paths.clone(),
            callee: Snapshot::capture(callee)?,
            args: Snapshot::capture_all(args)?,
        })
    }

    fn run(self) {
        let mut state = State::with_lib_paths(self.lib_paths);
        state.constants = self.constants.iter().map(Snapshot::restore).collect();
        state.globals = self.globals.iter().map(Snapshot::restore).collect();
        state.num_defs = self.num_defs;
        state.units = self.units;

        let callee = self.callee.restore();
        let args: Vec<Value> = self.args.iter().map(Snapshot::restore).collect();
        let mut vm = VM::new(&mut state);
        match vm.call(&callee, &args) {
            Ok(_) => debug!("concurrent call finished"),
            Err(e) => warn!(error = %e, "concurrent call failed"),
        }
    }
}

impl VM<'_> {
    /// Start the callee below the top `argc` slots on a new thread and
    /// leave null in its place.
    pub(crate) fn execute_concurrent_call(&mut self, argc: usize) -> Result<()> {
        let callee = self.stack.peek(argc)?.resolve();
        if !matches!(callee, Value::Closure(_) | Value::Builtin(_)) {
            return Err(RuntimeError::NotCallable(callee.type_name()));
        }
        let args = self.stack.pop_resolved(argc)?;
        self.stack.pop()?;
        self.stack.push(Value::Null)?;

        let task = match Task::capture(self.state, &callee, &args) {
            Ok(task) => task,
            Err(e) => {
                warn!(error = %e, "concurrent call not started");
                return Ok(());
            }
        };
        let spawned = thread::Builder::new()
            .name("tau-concurrent".into())
            .spawn(move || task.run());
        if let Err(e) = spawned {
            warn!(error = %e, "failed to spawn concurrent call");
        }
        Ok(())
    }
}

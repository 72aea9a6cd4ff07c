// tau-vm - Shared test helpers
// Copyright (c) 2025 Tom Waddington. MIT licensed.

#![allow(dead_code)]

use tau_core::Value;
use tau_vm::{State, VM};

/// Parse, compile and run `src` as a fresh stdin unit. Errors of every
/// stage come back as their rendered text.
pub fn compile_and_run(src: &str) -> Result<Value, String> {
    let mut state = State::with_lib_paths(Vec::new());
    run_in(&mut state, None, src)
}

/// Run `src` as unit `file` against an existing state.
pub fn run_in(state: &mut State, file: Option<&str>, src: &str) -> Result<Value, String> {
    let program = tau_parser::parse(file, src).map_err(|e| e.to_string())?;
    let bytecode = state
        .compile_unit(file, src, &program)
        .map_err(|e| e.rendered)?;
    let mut vm = VM::new(state);
    vm.run(&bytecode, file).map_err(|e| e.to_string())
}

pub fn run_ok(src: &str) -> Value {
    match compile_and_run(src) {
        Ok(value) => value,
        Err(e) => panic!("{} failed: {}", src, e),
    }
}

pub fn expect_error(src: &str, expected_pattern: &str) {
    match compile_and_run(src) {
        Err(e) => assert!(
            e.to_lowercase().contains(&expected_pattern.to_lowercase()),
            "Error '{}' should contain '{}' for source: {}",
            e,
            expected_pattern,
            src
        ),
        Ok(val) => panic!(
            "Expected error containing '{}', but got success: {} for source: {}",
            expected_pattern, val, src
        ),
    }
}

// tau-embed - Engine implementation
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The Engine struct - main entry point for embedding tau.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tau_core::Value;
use tau_vm::{Bytecode, DEFAULT_LIB_PATH, State, VM, split_lib_paths};
use tracing::debug;

use crate::convert::{FromValue, IntoValue};
use crate::error::{EngineError, Result};

/// Extension of persisted bytecode files.
pub const COMPILED_EXTENSION: &str = "tauc";

/// Engine settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Library roots searched by `import`, after the importing file's
    /// directory and the current directory
    pub lib_paths: Vec<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            lib_paths: vec![PathBuf::from(DEFAULT_LIB_PATH)],
        }
    }
}

impl EngineConfig {
    /// The default configuration with `TAU_PATH` entries searched first.
    pub fn from_env() -> Self {
        match env::var("TAU_PATH") {
            Ok(value) => EngineConfig::default().with_path_list(&value),
            Err(_) => EngineConfig::default(),
        }
    }

    /// Search the roots of a `TAU_PATH`-style list, in order, before the
    /// roots already configured.
    pub fn with_path_list(mut self, value: &str) -> Self {
        let mut paths = split_lib_paths(value);
        paths.append(&mut self.lib_paths);
        self.lib_paths = paths;
        self
    }

    /// Search `path` before the roots already configured.
    pub fn with_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lib_paths.insert(0, path.into());
        self
    }
}

/// The tau scripting engine.
///
/// An `Engine` owns one [`State`]: everything evaluated through it shares
/// constants, globals and the module cache, the way lines of a REPL do.
///
/// # Thread Safety
///
/// **`Engine` is NOT thread-safe.** Values share storage through `Rc`. Use
/// one engine per thread; tau code itself can spawn work with `tau f()`.
///
/// # Example
///
/// ```rust
/// use tau_embed::Engine;
///
/// let mut engine = Engine::new();
/// let result = engine.eval("x = 20; x * 2 + 2").unwrap();
/// assert_eq!(result.to_string(), "42");
/// ```
#[derive(Debug, Default)]
pub struct Engine {
    state: State,
}

impl Engine {
    /// Create an engine searching the default library root.
    pub fn new() -> Self {
        Engine::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Engine {
            state: State::with_lib_paths(config.lib_paths),
        }
    }

    /// Evaluate a string of tau code.
    ///
    /// Each call continues the same unit, so globals defined by one call are
    /// visible to the next. Returns the value of the last expression.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The code contains syntax errors
    /// - Compilation fails (undefined variable, assignment to a literal, etc.)
    /// - Execution fails (type error, division by zero, etc.)
    pub fn eval(&mut self, code: &str) -> Result<Value> {
        self.eval_unit(None, code)
    }

    /// Evaluate a tau source file as its own unit.
    pub fn eval_file(&mut self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        let code = fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        let file = path.to_string_lossy();
        self.eval_unit(Some(&*file), &code)
    }

    /// Run a file: `.tauc` files are loaded as bytecode, anything else is
    /// compiled from source.
    pub fn run_file(&mut self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        if path.extension().is_some_and(|ext| ext == COMPILED_EXTENSION) {
            self.run_compiled(path)
        } else {
            self.eval_file(path)
        }
    }

    /// Load and run a `.tauc` file.
    pub fn run_compiled(&mut self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|e| EngineError::io(path, e))?;
        let bytecode = self.state.install(Bytecode::decode(&data)?)?;
        debug!(file = %path.display(), constants = bytecode.constants.len(), "loaded bytecode");
        let file = path.to_string_lossy();
        Ok(VM::new(&mut self.state).run(&bytecode, Some(&*file))?)
    }

    /// Compile a source file to `<path>.tauc` and return the written path.
    ///
    /// The file is compiled on its own, so the output does not depend on
    /// anything this engine has evaluated.
    pub fn compile_file(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        let data = self.compile_standalone(path)?.encode()?;

        let out = path.with_extension(COMPILED_EXTENSION);
        fs::write(&out, &data).map_err(|e| EngineError::io(&out, e))?;
        debug!(file = %out.display(), bytes = data.len(), "wrote bytecode");
        Ok(out)
    }

    /// Disassemble a source or `.tauc` file without running it.
    pub fn disassemble_file(&self, path: impl AsRef<Path>) -> Result<String> {
        let path = path.as_ref();
        let bytecode = if path.extension().is_some_and(|ext| ext == COMPILED_EXTENSION) {
            let data = fs::read(path).map_err(|e| EngineError::io(path, e))?;
            Bytecode::decode(&data)?
        } else {
            self.compile_standalone(path)?
        };
        Ok(bytecode.disassemble())
    }

    /// Compile a source file against a fresh state.
    fn compile_standalone(&self, path: &Path) -> Result<Bytecode> {
        let code = fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        let file = path.to_string_lossy();
        let program = tau_parser::parse(Some(&*file), &code)?;
        let mut state = State::with_lib_paths(self.state.lib_paths.clone());
        Ok(state.compile_unit(Some(&*file), &code, &program)?)
    }

    fn eval_unit(&mut self, file: Option<&str>, code: &str) -> Result<Value> {
        let program = tau_parser::parse(file, code)?;
        let bytecode = self.state.compile_unit(file, code, &program)?;
        Ok(VM::new(&mut self.state).run(&bytecode, file)?)
    }

    /// Get a global defined by [`eval`](Self::eval) or [`set`](Self::set).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        self.state.global(None, name)
    }

    /// Get a typed global. Returns `None` if the name is not defined or
    /// cannot be converted.
    #[must_use]
    pub fn get_as<T: FromValue>(&self, name: &str) -> Option<T> {
        self.get(name).and_then(|v| T::from_value(&v).ok())
    }

    /// Get a typed global, distinguishing a missing name (`Ok(None)`) from a
    /// failed conversion (`Err`).
    ///
    /// # Example
    ///
    /// ```rust
    /// use tau_embed::Engine;
    ///
    /// let mut engine = Engine::new();
    /// engine.eval("x = \"hello\"").unwrap();
    ///
    /// let missing: Option<i64> = engine.try_get_as("y").unwrap();
    /// assert!(missing.is_none());
    ///
    /// let wrong_type = engine.try_get_as::<i64>("x");
    /// assert!(wrong_type.is_err());
    /// ```
    pub fn try_get_as<T: FromValue>(&self, name: &str) -> Result<Option<T>> {
        match self.get(name) {
            Some(v) => T::from_value(&v).map(Some),
            None => Ok(None),
        }
    }

    /// Bind a global visible to later [`eval`](Self::eval) calls.
    pub fn set(&mut self, name: &str, value: impl IntoValue) {
        self.state.define_global(None, name, value.into_value());
    }

    /// Call a global function by name.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tau_embed::{Engine, Value};
    ///
    /// let mut engine = Engine::new();
    /// engine.eval("add = fn(a, b) { a + b }").unwrap();
    /// let result = engine.call("add", &[Value::Int(1), Value::Int(2)]).unwrap();
    /// assert_eq!(result, Value::Int(3));
    /// ```
    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Value> {
        let func = self
            .get(name)
            .ok_or_else(|| EngineError::Undefined(name.to_string()))?;
        self.call_value(&func, args)
    }

    /// Call a closure or builtin value.
    pub fn call_value(&mut self, func: &Value, args: &[Value]) -> Result<Value> {
        Ok(VM::new(&mut self.state).call(func, args)?)
    }

    /// The underlying compiler and VM state.
    #[must_use]
    pub fn state(&self) -> &State {
        &self.state
    }
}

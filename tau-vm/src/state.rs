// tau-vm - Bytecode compiler and virtual machine for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! State shared by every unit compiled and run together.
//!
//! The constant pool and global slots are one flat array each. A unit (a
//! file, a REPL line, an imported module) compiles against them and the VM
//! runs it against them, so slot numbers stay valid across units.

use std::collections::{HashMap, HashSet};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tau_core::{CompiledFunction, Value};
use tau_parser::{Node, STDIN_NAME};
use tracing::debug;

use crate::bytecode::{Bytecode, DecodeError};
use crate::compiler::{CompileError, Compiler};
use crate::symbol_table::SymbolTable;

/// Library root searched after the importing file's directory and the
/// current directory.
pub const DEFAULT_LIB_PATH: &str = "/lib/tau";

/// Key of a compiled interpolation snippet: unit, template constant and
/// code segment.
pub(crate) type SnippetKey = (String, usize, usize);

/// Constants, globals, symbol tables and the module cache.
#[derive(Debug)]
pub struct State {
    pub constants: Vec<Value>,
    pub globals: Vec<Value>,
    /// Global slots handed out so far
    pub num_defs: usize,
    /// Top-level symbol table of each unit, by file name or `<stdin>`
    pub units: HashMap<String, SymbolTable>,
    /// Loaded modules, by resolved path
    pub modules: HashMap<PathBuf, Value>,
    /// Library roots searched by `import`
    pub lib_paths: Vec<PathBuf>,
    pub(crate) snippets: HashMap<SnippetKey, Arc<CompiledFunction>>,
    /// Modules whose top level is running, for cycle detection
    pub(crate) loading: HashSet<PathBuf>,
}

impl Default for State {
    fn default() -> Self {
        State::new()
    }
}

impl State {
    /// Empty state searching the default library root.
    pub fn new() -> Self {
        State::with_lib_paths(vec![PathBuf::from(DEFAULT_LIB_PATH)])
    }

    pub fn with_lib_paths(lib_paths: Vec<PathBuf>) -> Self {
        State {
            constants: Vec::new(),
            globals: Vec::new(),
            num_defs: 0,
            units: HashMap::new(),
            modules: HashMap::new(),
            lib_paths,
            snippets: HashMap::new(),
            loading: HashSet::new(),
        }
    }

    /// Compile `program` as unit `file`. A unit compiled before continues
    /// with its symbol table, so earlier globals stay visible (the REPL
    /// relies on this). Nothing is committed if compilation fails.
    pub fn compile_unit(
        &mut self,
        file: Option<&str>,
        source: &str,
        program: &[Node],
    ) -> Result<Bytecode, CompileError> {
        let key = unit_key(file);
        let mut symbols = self
            .units
            .get(&key)
            .cloned()
            .unwrap_or_else(SymbolTable::with_builtins);
        symbols.reserve(self.num_defs);

        let mut compiler = Compiler::new(&mut self.constants, symbols).with_source(file, source);
        compiler.compile(program)?;
        let bytecode = compiler.bytecode();
        let symbols = compiler.into_symbols();

        self.num_defs = self.num_defs.max(bytecode.num_globals);
        self.units.insert(key, symbols);
        Ok(bytecode)
    }

    /// Append a decoded unit's constants to the pool and move its globals
    /// past the slots already in use.
    pub fn install(&mut self, mut bytecode: Bytecode) -> Result<Bytecode, DecodeError> {
        bytecode.relocate(self.constants.len(), self.num_defs)?;
        self.constants.append(&mut bytecode.constants);
        self.num_defs = bytecode.num_globals;
        Ok(bytecode)
    }

    /// Find the file an `import(path)` refers to.
    ///
    /// A path with an extension is tried as given; otherwise `.tau` and then
    /// `.tauc` are appended. Each candidate is tried in the importing file's
    /// directory, the current directory and then every library root.
    pub fn resolve_module(&self, path: &str, importer_dir: Option<&Path>) -> Option<PathBuf> {
        let path = Path::new(path);
        let candidates: Vec<PathBuf> = if path.extension().is_some() {
            vec![path.to_path_buf()]
        } else {
            vec![path.with_extension("tau"), path.with_extension("tauc")]
        };

        let cwd = env::current_dir().ok();
        let dirs = importer_dir
            .map(Path::to_path_buf)
            .into_iter()
            .chain(cwd)
            .chain(self.lib_paths.iter().cloned());

        for dir in dirs {
            for candidate in &candidates {
                let full = dir.join(candidate);
                if full.is_file() {
                    debug!(module = %full.display(), "resolved import");
                    return Some(full);
                }
            }
        }
        None
    }

    /// Value of global `name` in unit `file`, if the unit defines it.
    pub fn global(&self, file: Option<&str>, name: &str) -> Option<Value> {
        let table = self.units.get(&unit_key(file))?;
        let symbol = table.globals().find(|s| s.name == name)?;
        Some(self.globals.get(symbol.index).cloned().unwrap_or(Value::Null))
    }

    /// Bind global `name` in unit `file` to `value`, defining it if needed.
    /// Returns its slot.
    pub fn define_global(&mut self, file: Option<&str>, name: &str, value: Value) -> usize {
        let num_defs = self.num_defs;
        let table = self
            .units
            .entry(unit_key(file))
            .or_insert_with(SymbolTable::with_builtins);
        table.reserve(num_defs);
        let index = table.define(name).index;

        self.num_defs = self.num_defs.max(index + 1);
        self.ensure_globals(index + 1);
        self.globals[index] = value;
        index
    }

    /// Grow the global array to hold `n` slots.
    pub(crate) fn ensure_globals(&mut self, n: usize) {
        if self.globals.len() < n {
            self.globals.resize(n, Value::Null);
        }
    }
}

/// Name a unit is filed under in [`State::units`].
pub fn unit_key(file: Option<&str>) -> String {
    file.unwrap_or(STDIN_NAME).to_string()
}

/// Library roots from a `TAU_PATH`-style list.
pub fn split_lib_paths(value: &str) -> Vec<PathBuf> {
    env::split_paths(value)
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tau_parser::parse_str;

    use super::*;

    #[test]
    fn test_units_share_global_slots() {
        let mut state = State::new();
        let a = state
            .compile_unit(Some("a.tau"), "x = 1; y = 2", &parse_str("x = 1; y = 2").unwrap())
            .unwrap();
        assert_eq!(a.num_globals, 2);
        let b = state
            .compile_unit(Some("b.tau"), "z = 3", &parse_str("z = 3").unwrap())
            .unwrap();
        assert_eq!(b.num_globals, 3);
        assert_eq!(state.num_defs, 3);
    }

    #[test]
    fn test_unit_continues_its_symbol_table() {
        let mut state = State::new();
        state
            .compile_unit(None, "x = 1", &parse_str("x = 1").unwrap())
            .unwrap();
        assert!(
            state
                .compile_unit(None, "x + 1", &parse_str("x + 1").unwrap())
                .is_ok()
        );
        assert!(
            state
                .compile_unit(Some("other.tau"), "x", &parse_str("x").unwrap())
                .is_err()
        );
    }

    #[test]
    fn test_failed_compile_commits_nothing() {
        let mut state = State::new();
        let src = "a = 1; b = nope";
        assert!(state.compile_unit(None, src, &parse_str(src).unwrap()).is_err());
        assert_eq!(state.num_defs, 0);
        assert!(state.units.is_empty());
    }

    #[test]
    fn test_define_global_is_visible_to_later_units() {
        let mut state = State::new();
        let slot = state.define_global(None, "answer", Value::Int(41));
        assert_eq!(state.define_global(None, "answer", Value::Int(42)), slot);
        assert_eq!(state.global(None, "answer"), Some(Value::Int(42)));
        assert_eq!(state.global(Some("other.tau"), "answer"), None);
        assert!(
            state
                .compile_unit(None, "answer + 1", &parse_str("answer + 1").unwrap())
                .is_ok()
        );
    }

    #[test]
    fn test_resolve_module_search_order() {
        let importer = tempfile::tempdir().unwrap();
        let lib = tempfile::tempdir().unwrap();
        fs::write(importer.path().join("m.tau"), "").unwrap();
        fs::write(lib.path().join("m.tau"), "").unwrap();
        fs::write(lib.path().join("only.tauc"), "").unwrap();

        let state = State::with_lib_paths(vec![lib.path().to_path_buf()]);
        assert_eq!(
            state.resolve_module("m", Some(importer.path())),
            Some(importer.path().join("m.tau"))
        );
        assert_eq!(
            state.resolve_module("only", Some(importer.path())),
            Some(lib.path().join("only.tauc"))
        );
        assert_eq!(state.resolve_module("missing", Some(importer.path())), None);
    }

    #[test]
    fn test_split_lib_paths() {
        let joined = env::join_paths(["/a", "/b"]).unwrap();
        assert_eq!(
            split_lib_paths(joined.to_str().unwrap()),
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
        assert!(split_lib_paths("").is_empty());
    }
}

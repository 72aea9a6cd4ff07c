// tau-vm - Bytecode compiler and virtual machine for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The LoadModule handler: resolve, compile or decode, run, export.
//!
//! A module runs as a nested unit on this VM's stacks and shares its
//! constants and global slots. Its globals are then bound into a
//! [`Module`]; capitalized names are exported, and exported objects are
//! turned into modules themselves. Loaded modules are cached by canonical
//! path.

use std::fs;
use std::path::Path;
use std::rc::Rc;

use tau_core::{Module, Object, Value, is_exported};
use tracing::{debug, trace};

use crate::bytecode::Bytecode;
use crate::state::unit_key;
use crate::vm::{Result, RuntimeError, VM};

impl VM<'_> {
    pub(crate) fn execute_load_module(&mut self) -> Result<()> {
        let path = match self.stack.pop()?.resolve() {
            Value::Str(path) => path,
            other => {
                return Err(RuntimeError::Import(format!(
                    "module path must be a string, not {}",
                    other.type_name()
                )));
            }
        };
        let module = self.load_module(&path)?;
        self.stack.push(module)
    }

    fn load_module(&mut self, path: &str) -> Result<Value> {
        let importer_dir = self
            .frame()?
            .file()
            .and_then(|f| Path::new(f).parent())
            .map(Path::to_path_buf);
        let found = self
            .state
            .resolve_module(path, importer_dir.as_deref())
            .ok_or_else(|| RuntimeError::Import(format!("no module named {:?}", path)))?;
        let key = fs::canonicalize(&found).unwrap_or_else(|_| found.clone());

        if let Some(module) = self.state.modules.get(&key) {
            trace!(module = %key.display(), "module cache hit");
            return Ok(module.clone());
        }
        if !self.state.loading.insert(key.clone()) {
            return Err(RuntimeError::Import(format!(
                "import cycle through {}",
                found.display()
            )));
        }

        let result = self.run_module(&found);
        self.state.loading.remove(&key);
        let module = result?;
        self.state.modules.insert(key, module.clone());
        Ok(module)
    }

    fn run_module(&mut self, found: &Path) -> Result<Value> {
        let file = found.to_string_lossy().into_owned();
        debug!(module = %file, "loading module");
        let import_error = |e: &dyn std::fmt::Display| RuntimeError::Import(format!("{}: {}", file, e));

        let bytecode = if found.extension().is_some_and(|ext| ext == "tauc") {
            let data = fs::read(found).map_err(|e| import_error(&e))?;
            let decoded = Bytecode::decode(&data).map_err(|e| import_error(&e))?;
            self.state.install(decoded).map_err(|e| import_error(&e))?
        } else {
            let source = fs::read_to_string(found).map_err(|e| import_error(&e))?;
            let program = tau_parser::parse(Some(&*file), &source)
                .map_err(|e| RuntimeError::Compile(e.to_string()))?;
            self.state
                .compile_unit(Some(&*file), &source, &program)
                .map_err(|e| RuntimeError::Compile(e.rendered))?
        };

        self.run_unit(&bytecode, Some(&*file))?;
        Ok(self.export_module(&file))
    }

    /// Bind every top-level global of unit `file` into a module.
    fn export_module(&self, file: &str) -> Value {
        let module = Module::new();
        if let Some(table) = self.state.units.get(&unit_key(Some(file))) {
            for symbol in table.globals() {
                let value = self
                    .state
                    .globals
                    .get(symbol.index)
                    .cloned()
                    .unwrap_or(Value::Null);
                let value = match value {
                    Value::Object(obj) if is_exported(&symbol.name) => object_to_module(&obj),
                    other => other,
                };
                module.bind(&symbol.name, value);
            }
        }
        Value::Module(Rc::new(module))
    }
}

fn object_to_module(obj: &Object) -> Value {
    let module = Module::new();
    for (name, value) in obj.attrs() {
        module.bind(&name, value);
    }
    Value::Module(Rc::new(module))
}

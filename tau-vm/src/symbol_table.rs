// tau-vm - Bytecode compiler and virtual machine for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Compile-time name resolution.
//!
//! Each top-level unit gets a global table; every function literal gets a
//! table enclosed by the table of the code around it. Resolving a name that
//! lives in an enclosing function registers it as a free variable in every
//! table between the definition and the use.

use std::collections::HashMap;

use tau_core::BUILTINS;

/// Where a symbol's value is stored at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolScope {
    Global,
    Local,
    Builtin,
    Free,
    /// A function's own name inside its body.
    FunctionSelf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub scope: SymbolScope,
    pub index: usize,
}

impl Symbol {
    fn new(name: &str, scope: SymbolScope, index: usize) -> Self {
        Symbol {
            name: name.to_string(),
            scope,
            index,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    outer: Option<Box<SymbolTable>>,
    store: HashMap<String, Symbol>,
    /// Symbols captured from enclosing tables, in capture order
    pub free_symbols: Vec<Symbol>,
    /// Number of global or local slots defined here
    pub num_definitions: usize,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// A global table with every builtin registered.
    pub fn with_builtins() -> Self {
        let mut table = SymbolTable::new();
        for (index, builtin) in BUILTINS.iter().enumerate() {
            table.define_builtin(index, builtin.name);
        }
        table
    }

    pub fn new_enclosed(outer: SymbolTable) -> Self {
        SymbolTable {
            outer: Some(Box::new(outer)),
            ..SymbolTable::default()
        }
    }

    /// Detach and return the enclosing table.
    pub fn into_outer(self) -> Option<SymbolTable> {
        self.outer.map(|outer| *outer)
    }

    pub fn is_global(&self) -> bool {
        self.outer.is_none()
    }

    /// Make the next definition use slot `n` or later. Units sharing one
    /// global array use this to keep their slots apart.
    pub fn reserve(&mut self, n: usize) {
        self.num_definitions = self.num_definitions.max(n);
    }

    /// Define `name` in this table. Redefining a global or local returns the
    /// existing slot; a free, builtin or self-reference binding is shadowed.
    pub fn define(&mut self, name: &str) -> Symbol {
        if let Some(existing) = self.store.get(name)
            && matches!(existing.scope, SymbolScope::Global | SymbolScope::Local)
        {
            return existing.clone();
        }

        let scope = if self.outer.is_some() {
            SymbolScope::Local
        } else {
            SymbolScope::Global
        };
        let symbol = Symbol::new(name, scope, self.num_definitions);
        self.store.insert(name.to_string(), symbol.clone());
        self.num_definitions += 1;
        symbol
    }

    pub fn define_builtin(&mut self, index: usize, name: &str) -> Symbol {
        let symbol = Symbol::new(name, SymbolScope::Builtin, index);
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    pub fn define_function_self(&mut self, name: &str) -> Symbol {
        let symbol = Symbol::new(name, SymbolScope::FunctionSelf, 0);
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    fn define_free(&mut self, original: Symbol) -> Symbol {
        let symbol = Symbol::new(&original.name, SymbolScope::Free, self.free_symbols.len());
        self.free_symbols.push(original);
        self.store.insert(symbol.name.clone(), symbol.clone());
        symbol
    }

    /// Look `name` up here and then outward. Globals and builtins come back
    /// unchanged; anything else found outside this table is captured.
    pub fn resolve(&mut self, name: &str) -> Option<Symbol> {
        if let Some(symbol) = self.store.get(name) {
            return Some(symbol.clone());
        }
        let found = self.outer.as_mut()?.resolve(name)?;
        match found.scope {
            SymbolScope::Global | SymbolScope::Builtin => Some(found),
            _ => Some(self.define_free(found)),
        }
    }

    /// Names bound as globals in this table, with their slots.
    pub fn globals(&self) -> impl Iterator<Item = &Symbol> {
        self.store
            .values()
            .filter(|s| s.scope == SymbolScope::Global)
    }
}

// tau-core - Objects and modules for tau
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Attribute stores: plain objects created by `new()`, and the modules
//! produced by `import`.

use std::cell::RefCell;
use std::fmt;

use im::OrdMap;

use crate::value::{Value, fmt_container, fmt_nested};

/// Names starting with an uppercase letter are exported from a module.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

fn fmt_store(f: &mut fmt::Formatter<'_>, store: &OrdMap<String, Value>) -> fmt::Result {
    f.write_str("{")?;
    for (i, (k, v)) in store.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}: ", k)?;
        fmt_nested(f, v)?;
    }
    f.write_str("}")
}

/// A mutable attribute store.
#[derive(Debug, Default)]
pub struct Object {
    attrs: RefCell<OrdMap<String, Value>>,
}

impl Object {
    pub fn new() -> Self {
        Object::default()
    }

    pub fn from_attrs(attrs: OrdMap<String, Value>) -> Self {
        Object {
            attrs: RefCell::new(attrs),
        }
    }

    /// Missing attributes read as null.
    pub fn get(&self, name: &str) -> Value {
        self.attrs.borrow().get(name).cloned().unwrap_or(Value::Null)
    }

    pub fn set(&self, name: &str, value: Value) -> Value {
        self.attrs.borrow_mut().insert(name.to_string(), value.clone());
        value
    }

    pub fn attrs(&self) -> OrdMap<String, Value> {
        self.attrs.borrow().clone()
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_container(f, self as *const Self, "{...}", |f| fmt_store(f, &self.attrs.borrow()))
    }
}

/// A module namespace, split into exported and unexported bindings.
#[derive(Debug, Default)]
pub struct Module {
    exported: RefCell<OrdMap<String, Value>>,
    unexported: RefCell<OrdMap<String, Value>>,
}

impl Module {
    pub fn new() -> Self {
        Module::default()
    }

    /// Bind `name`, sorting it into the exported or unexported store.
    pub fn bind(&self, name: &str, value: Value) {
        if is_exported(name) {
            self.exported.borrow_mut().insert(name.to_string(), value);
        } else {
            self.unexported.borrow_mut().insert(name.to_string(), value);
        }
    }

    /// Only exported names are visible to importers.
    pub fn get(&self, name: &str) -> Value {
        self.exported
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Write an exported name. Unexported names cannot be assigned.
    pub fn set(&self, name: &str, value: Value) -> Value {
        if self.unexported.borrow().contains_key(name) {
            return Value::error("cannot assign to unexported field");
        }
        self.exported
            .borrow_mut()
            .insert(name.to_string(), value.clone());
        value
    }

    pub fn exported(&self) -> OrdMap<String, Value> {
        self.exported.borrow().clone()
    }

    pub fn unexported(&self) -> OrdMap<String, Value> {
        self.unexported.borrow().clone()
    }

    /// Rebuild a module from previously split stores.
    pub fn from_parts(exported: OrdMap<String, Value>, unexported: OrdMap<String, Value>) -> Self {
        Module {
            exported: RefCell::new(exported),
            unexported: RefCell::new(unexported),
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_container(f, self as *const Self, "{...}", |f| fmt_store(f, &self.exported.borrow()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_splits_by_case() {
        let m = Module::new();
        m.bind("Pi", Value::Float(3.14));
        m.bind("secret", Value::Int(1));
        assert_eq!(m.get("Pi"), Value::Float(3.14));
        assert_eq!(m.get("secret"), Value::Null);
        assert_eq!(m.to_string(), "{Pi: 3.14}");
    }

    #[test]
    fn test_module_refuses_unexported_assignment() {
        let m = Module::new();
        m.bind("secret", Value::Int(1));
        assert!(m.set("secret", Value::Int(2)).is_error());
        assert_eq!(m.set("New", Value::Int(2)), Value::Int(2));
        assert_eq!(m.get("New"), Value::Int(2));
    }

    #[test]
    fn test_object_attributes() {
        let o = Object::new();
        assert_eq!(o.get("x"), Value::Null);
        o.set("x", Value::string("hi"));
        assert_eq!(o.to_string(), "{x: \"hi\"}");
    }
}

// tau-core - Indirection handles for assignable expressions
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! GetSetter handles.
//!
//! Indexing and attribute access produce a handle instead of a value, so the
//! base expression and the key are evaluated exactly once whether the result
//! is then read (ordinary evaluation) or written (assignment, `+=`, `++`).

use std::rc::Rc;

use crate::object::{Module, Object};
use crate::value::{ListRef, MapKey, MapRef, Value};

/// The container an attribute handle points into.
#[derive(Debug, Clone)]
pub enum AttrTarget {
    Object(Rc<Object>),
    Module(Rc<Module>),
}

/// A read/write view of exactly one storage location.
#[derive(Debug, Clone)]
pub enum GetSetter {
    ListItem { list: ListRef, index: i64 },
    MapEntry { map: MapRef, key: MapKey },
    Attribute { target: AttrTarget, name: Rc<str> },
}

impl GetSetter {
    fn list_slot(list: &ListRef, index: i64) -> Option<usize> {
        usize::try_from(index)
            .ok()
            .filter(|&i| i < list.borrow().len())
    }

    /// Read the location. Out-of-range list slots read as an error value,
    /// missing map keys and attributes read as null.
    pub fn get(&self) -> Value {
        match self {
            GetSetter::ListItem { list, index } => match Self::list_slot(list, *index) {
                Some(i) => list.borrow()[i].clone(),
                None => Value::error("index out of range"),
            },
            GetSetter::MapEntry { map, key } => {
                map.borrow().get(key).cloned().unwrap_or(Value::Null)
            }
            GetSetter::Attribute { target, name } => match target {
                AttrTarget::Object(obj) => obj.get(name),
                AttrTarget::Module(module) => module.get(name),
            },
        }
    }

    /// Write the location, returning the value written or an error value.
    pub fn set(&self, value: Value) -> Value {
        match self {
            GetSetter::ListItem { list, index } => match Self::list_slot(list, *index) {
                Some(i) => {
                    list.borrow_mut()[i] = value.clone();
                    value
                }
                None => Value::error("index out of range"),
            },
            GetSetter::MapEntry { map, key } => {
                map.borrow_mut().insert(key.clone(), value.clone());
                value
            }
            GetSetter::Attribute { target, name } => match target {
                AttrTarget::Object(obj) => obj.set(name, value),
                AttrTarget::Module(module) => module.set(name, value),
            },
        }
    }
}

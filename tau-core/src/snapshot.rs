// tau-core - Thread-safe value snapshots for tau
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Deep, `Send` copies of values.
//!
//! Runtime values share storage through `Rc`, so they cannot cross threads.
//! A concurrent call captures everything the child needs as a `Snapshot`,
//! moves it to the new thread and restores fresh values there. Values sent
//! through pipes travel the same way. Pipes themselves are the only thing
//! that stays shared.

use std::rc::Rc;
use std::sync::Arc;

use im::OrdMap;
use thiserror::Error;

use crate::builtins::Builtin;
use crate::function::{Closure, CompiledFunction};
use crate::getsetter::GetSetter;
use crate::object::{Module, Object};
use crate::pipe::Pipe;
use crate::value::{MapKey, Value};

/// Deepest container nesting a snapshot will copy.
pub const MAX_SNAPSHOT_DEPTH: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("value is nested too deeply to copy")]
    TooDeep,
}

/// An owned, thread-safe copy of a [`Value`].
#[derive(Debug, Clone)]
pub enum Snapshot {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Snapshot>),
    Map(Vec<(Snapshot, Snapshot)>),
    Object(Vec<(String, Snapshot)>),
    Module {
        exported: Vec<(String, Snapshot)>,
        unexported: Vec<(String, Snapshot)>,
    },
    Error(String),
    Function(Arc<CompiledFunction>),
    Closure {
        func: Arc<CompiledFunction>,
        free: Vec<Snapshot>,
        file: Option<String>,
    },
    Builtin(&'static Builtin),
    Pipe(Pipe),
}

impl Snapshot {
    /// Copy `value` and everything reachable from it.
    pub fn capture(value: &Value) -> Result<Snapshot, SnapshotError> {
        capture_at(value, 0)
    }

    /// Copy a slice of values.
    pub fn capture_all(values: &[Value]) -> Result<Vec<Snapshot>, SnapshotError> {
        values.iter().map(Snapshot::capture).collect()
    }

    /// Rebuild a runtime value with fresh, unshared storage.
    pub fn restore(&self) -> Value {
        match self {
            Snapshot::Null => Value::Null,
            Snapshot::Bool(b) => Value::Bool(*b),
            Snapshot::Int(n) => Value::Int(*n),
            Snapshot::Float(n) => Value::Float(*n),
            Snapshot::Str(s) => Value::string(s),
            Snapshot::List(items) => Value::list(items.iter().map(Snapshot::restore).collect()),
            Snapshot::Map(entries) => Value::map(
                entries
                    .iter()
                    .filter_map(|(k, v)| MapKey::from_value(&k.restore()).map(|k| (k, v.restore())))
                    .collect(),
            ),
            Snapshot::Object(attrs) => Value::Object(Rc::new(Object::from_attrs(
                restore_store(attrs),
            ))),
            Snapshot::Module {
                exported,
                unexported,
            } => Value::Module(Rc::new(Module::from_parts(
                restore_store(exported),
                restore_store(unexported),
            ))),
            Snapshot::Error(msg) => Value::error(msg),
            Snapshot::Function(func) => Value::Function(func.clone()),
            Snapshot::Closure { func, free, file } => Value::Closure(Rc::new(Closure::new(
                func.clone(),
                free.iter().map(Snapshot::restore).collect(),
                file.as_deref().map(Rc::from),
            ))),
            Snapshot::Builtin(b) => Value::Builtin(*b),
            Snapshot::Pipe(p) => Value::Pipe(p.clone()),
        }
    }
}

fn restore_store(entries: &[(String, Snapshot)]) -> OrdMap<String, Value> {
    entries
        .iter()
        .map(|(k, v)| (k.clone(), v.restore()))
        .collect()
}

fn capture_store(
    store: &OrdMap<String, Value>,
    depth: usize,
) -> Result<Vec<(String, Snapshot)>, SnapshotError> {
    store
        .iter()
        .map(|(k, v)| Ok((k.clone(), capture_at(v, depth)?)))
        .collect()
}

fn capture_at(value: &Value, depth: usize) -> Result<Snapshot, SnapshotError> {
    if depth > MAX_SNAPSHOT_DEPTH {
        return Err(SnapshotError::TooDeep);
    }
    let depth = depth + 1;

    let snap = match value {
        Value::Null => Snapshot::Null,
        Value::Bool(b) => Snapshot::Bool(*b),
        Value::Int(n) => Snapshot::Int(*n),
        Value::Float(n) => Snapshot::Float(*n),
        Value::Str(s) => Snapshot::Str(s.to_string()),
        Value::List(items) => Snapshot::List(
            items
                .borrow()
                .iter()
                .map(|v| capture_at(v, depth))
                .collect::<Result<_, _>>()?,
        ),
        Value::Map(entries) => Snapshot::Map(
            entries
                .borrow()
                .iter()
                .map(|(k, v)| Ok((capture_at(&k.to_value(), depth)?, capture_at(v, depth)?)))
                .collect::<Result<_, _>>()?,
        ),
        Value::Object(obj) => Snapshot::Object(capture_store(&obj.attrs(), depth)?),
        Value::Module(module) => Snapshot::Module {
            exported: capture_store(&module.exported(), depth)?,
            unexported: capture_store(&module.unexported(), depth)?,
        },
        Value::Error(msg) => Snapshot::Error(msg.to_string()),
        Value::Function(func) => Snapshot::Function(func.clone()),
        Value::Closure(cl) => Snapshot::Closure {
            func: cl.func.clone(),
            free: cl
                .free
                .iter()
                .map(|v| capture_at(v, depth))
                .collect::<Result<_, _>>()?,
            file: cl.file.as_deref().map(str::to_string),
        },
        Value::Builtin(b) => Snapshot::Builtin(*b),
        Value::Pipe(p) => Snapshot::Pipe(p.clone()),
        Value::GetSetter(gs) => capture_handle(gs, depth)?,
    };
    Ok(snap)
}

fn capture_handle(gs: &GetSetter, depth: usize) -> Result<Snapshot, SnapshotError> {
    capture_at(&gs.get(), depth)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>() {}

    #[test]
    fn test_snapshot_is_send() {
        assert_send::<Snapshot>();
        assert_send::<Vec<Snapshot>>();
    }

    #[test]
    fn test_restore_does_not_share_storage() {
        let original = Value::list(vec![Value::Int(1), Value::string("a")]);
        let copy = Snapshot::capture(&original).unwrap().restore();
        assert_eq!(copy, original);
        if let Value::List(items) = &copy {
            items.borrow_mut().push(Value::Null);
        }
        assert_eq!(original.to_string(), "[1, \"a\"]");
    }

    #[test]
    fn test_closure_free_values_are_copied() {
        let func = Arc::new(CompiledFunction::default());
        let cl = Value::Closure(Rc::new(Closure::new(
            func,
            vec![Value::Int(7)],
            Some(Rc::from("m.tau")),
        )));
        match Snapshot::capture(&cl).unwrap().restore() {
            Value::Closure(c) => {
                assert_eq!(c.free, vec![Value::Int(7)]);
                assert_eq!(c.file.as_deref(), Some("m.tau"));
            }
            other => panic!("expected closure, got {:?}", other),
        }
    }

    #[test]
    fn test_self_referencing_list_is_rejected() {
        let list = Value::list(vec![]);
        if let Value::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        assert_eq!(Snapshot::capture(&list).unwrap_err(), SnapshotError::TooDeep);
        // Break the cycle so the test does not leak.
        if let Value::List(items) = &list {
            items.borrow_mut().clear();
        }
    }

    #[test]
    fn test_pipes_stay_shared() {
        let pipe = Pipe::new(1);
        let v = Value::Pipe(pipe.clone());
        match Snapshot::capture(&v).unwrap().restore() {
            Value::Pipe(p) => assert!(p.same(&pipe)),
            other => panic!("expected pipe, got {:?}", other),
        }
    }
}

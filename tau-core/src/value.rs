// tau-core - Runtime values for tau
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The core value type shared by the compiler, the VM and the builtins.
//!
//! Scalars are stored inline. Lists, maps, objects and modules are shared and
//! mutable: copying a `Value` copies the reference, so a write through one
//! copy is visible through every other.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use im::OrdMap;

use crate::builtins::Builtin;
use crate::function::{Closure, CompiledFunction};
use crate::getsetter::GetSetter;
use crate::object::{Module, Object};
use crate::pipe::Pipe;

/// Shared, mutable list storage.
pub type ListRef = Rc<RefCell<Vec<Value>>>;

/// Shared, mutable map storage, ordered by key.
pub type MapRef = Rc<RefCell<OrdMap<MapKey, Value>>>;

/// A tau runtime value.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(ListRef),
    Map(MapRef),
    /// Attribute store created by the `new()` builtin
    Object(Rc<Object>),
    /// Namespace produced by `import`
    Module(Rc<Module>),
    /// First-class error value
    Error(Rc<str>),
    /// Capture-free function template, as stored in the constant pool
    Function(Arc<CompiledFunction>),
    Closure(Rc<Closure>),
    Builtin(&'static Builtin),
    Pipe(Pipe),
    /// Transient read/write handle over one assignable location
    GetSetter(Rc<GetSetter>),
}

impl Value {
    pub fn string(s: &str) -> Value {
        Value::Str(Rc::from(s))
    }

    pub fn error(msg: impl AsRef<str>) -> Value {
        Value::Error(Rc::from(msg.as_ref()))
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn map(entries: OrdMap<MapKey, Value>) -> Value {
        Value::Map(Rc::new(RefCell::new(entries)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(_) | Value::Module(_) => "object",
            Value::Error(_) => "error",
            Value::Function(_) => "function",
            Value::Closure(_) => "closure",
            Value::Builtin(_) => "builtin",
            Value::Pipe(_) => "pipe",
            Value::GetSetter(gs) => gs.get().type_name(),
        }
    }

    /// `false`, `null`, `0` and `0.0` are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Null => false,
            Value::GetSetter(gs) => gs.get().is_truthy(),
            _ => true,
        }
    }

    /// Read through a handle; any other value is returned as is.
    pub fn resolve(&self) -> Value {
        match self {
            Value::GetSetter(gs) => gs.get(),
            other => other.clone(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.resolve(), Value::Error(_))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

// ============================================================================
// Display
// ============================================================================

/// Deepest container nesting `Display` will print.
pub const MAX_DISPLAY_DEPTH: usize = 512;

thread_local! {
    /// Containers being printed on this thread, outermost first
    static PRINTING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks a container as being printed until dropped.
struct Printing(usize);

impl Printing {
    /// `None` if the container is already being printed further up, or the
    /// nesting is too deep.
    fn enter(id: usize) -> Option<Printing> {
        PRINTING.with(|printing| {
            let mut printing = printing.borrow_mut();
            if printing.len() >= MAX_DISPLAY_DEPTH || printing.contains(&id) {
                return None;
            }
            printing.push(id);
            Some(Printing(id))
        })
    }
}

impl Drop for Printing {
    fn drop(&mut self) {
        PRINTING.with(|printing| {
            let mut printing = printing.borrow_mut();
            if let Some(at) = printing.iter().rposition(|&id| id == self.0) {
                printing.remove(at);
            }
        });
    }
}

/// Write the container at `ptr` with `body`. A container that contains
/// itself prints as `placeholder` where it repeats.
pub(crate) fn fmt_container<T: ?Sized>(
    f: &mut fmt::Formatter<'_>,
    ptr: *const T,
    placeholder: &str,
    body: impl FnOnce(&mut fmt::Formatter<'_>) -> fmt::Result,
) -> fmt::Result {
    match Printing::enter(ptr as *const () as usize) {
        Some(_guard) => body(f),
        None => f.write_str(placeholder),
    }
}

/// Format a value as it appears inside a container: strings are quoted.
pub(crate) fn fmt_nested(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value.resolve() {
        Value::Str(s) => write!(f, "{:?}", s),
        other => write!(f, "{}", other),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{:?}", n),
            Value::Str(s) => f.write_str(s),
            Value::List(items) => fmt_container(f, Rc::as_ptr(items), "[...]", |f| {
                f.write_str("[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    fmt_nested(f, item)?;
                }
                f.write_str("]")
            }),
            Value::Map(entries) => fmt_container(f, Rc::as_ptr(entries), "{...}", |f| {
                f.write_str("{")?;
                for (i, (k, v)) in entries.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: ", k)?;
                    fmt_nested(f, v)?;
                }
                f.write_str("}")
            }),
            Value::Object(obj) => write!(f, "{}", obj),
            Value::Module(module) => write!(f, "{}", module),
            Value::Error(msg) => f.write_str(msg),
            Value::Function(_) => f.write_str("<function>"),
            Value::Closure(_) => f.write_str("<closure>"),
            Value::Builtin(b) => write!(f, "<builtin function {}>", b.name),
            Value::Pipe(_) => f.write_str("<pipe>"),
            Value::GetSetter(gs) => write!(f, "{}", gs.get()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Error(msg) => write!(f, "error({:?})", msg),
            other => write!(f, "{}", other),
        }
    }
}

// ============================================================================
// Equality
// ============================================================================

/// Structural equality for scalars and containers, identity for objects,
/// closures and pipes. Used by host code and tests; the language's `==`
/// operator has its own rules.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => std::ptr::eq(*a, *b),
            (Value::Pipe(a), Value::Pipe(b)) => a.same(b),
            (Value::GetSetter(a), _) => a.get() == *other,
            (_, Value::GetSetter(b)) => *self == b.get(),
            _ => false,
        }
    }
}

// ============================================================================
// Map keys
// ============================================================================

/// A hashable value usable as a map key.
#[derive(Clone, Debug)]
pub enum MapKey {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
}

impl MapKey {
    /// Convert a value into a key. Only bools, numbers and strings qualify.
    pub fn from_value(value: &Value) -> Option<MapKey> {
        match value.resolve() {
            Value::Bool(b) => Some(MapKey::Bool(b)),
            Value::Int(n) => Some(MapKey::Int(n)),
            Value::Float(n) => Some(MapKey::Float(n)),
            Value::Str(s) => Some(MapKey::Str(s)),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            MapKey::Bool(b) => Value::Bool(*b),
            MapKey::Int(n) => Value::Int(*n),
            MapKey::Float(n) => Value::Float(*n),
            MapKey::Str(s) => Value::Str(s.clone()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            MapKey::Bool(_) => 0,
            MapKey::Int(_) => 1,
            MapKey::Float(_) => 2,
            MapKey::Str(_) => 3,
        }
    }
}

impl Ord for MapKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (MapKey::Bool(a), MapKey::Bool(b)) => a.cmp(b),
            (MapKey::Int(a), MapKey::Int(b)) => a.cmp(b),
            (MapKey::Float(a), MapKey::Float(b)) => a.total_cmp(b),
            (MapKey::Str(a), MapKey::Str(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for MapKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for MapKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MapKey {}

impl fmt::Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Str(s) => write!(f, "{:?}", s),
            other => write!(f, "{}", other.to_value()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(!Value::Float(0.0).is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(Value::string("").is_truthy());
        assert!(Value::list(vec![]).is_truthy());
    }

    #[test]
    fn test_display_quotes_nested_strings() {
        let v = Value::list(vec![Value::Int(1), Value::string("a"), Value::Float(2.0)]);
        assert_eq!(v.to_string(), "[1, \"a\", 2.0]");
        assert_eq!(Value::string("a").to_string(), "a");
    }

    #[test]
    fn test_map_display_is_key_ordered() {
        let mut m = OrdMap::new();
        m.insert(MapKey::Str(Rc::from("b")), Value::Int(2));
        m.insert(MapKey::Int(1), Value::string("x"));
        m.insert(MapKey::Str(Rc::from("a")), Value::Int(1));
        assert_eq!(Value::map(m).to_string(), "{1: \"x\", \"a\": 1, \"b\": 2}");
    }

    #[test]
    fn test_self_containing_list_prints_placeholder() {
        let list = Value::list(vec![Value::Int(0)]);
        if let Value::List(items) = &list {
            items.borrow_mut()[0] = list.clone();
        }
        assert_eq!(list.to_string(), "[[...]]");

        let shared = Value::list(vec![Value::Int(1)]);
        let twice = Value::list(vec![shared.clone(), shared]);
        assert_eq!(twice.to_string(), "[[1], [1]]");
    }

    #[test]
    fn test_deep_nesting_is_cut_off() {
        let mut value = Value::Int(0);
        for _ in 0..MAX_DISPLAY_DEPTH + 10 {
            value = Value::list(vec![value]);
        }
        let printed = value.to_string();
        assert!(printed.contains("[...]"));
        assert!(!printed.contains('0'));
    }

    #[test]
    fn test_map_key_distinguishes_int_and_float() {
        let i = MapKey::from_value(&Value::Int(1)).unwrap();
        let f = MapKey::from_value(&Value::Float(1.0)).unwrap();
        assert_ne!(i, f);
        assert!(MapKey::from_value(&Value::list(vec![])).is_none());
    }

    #[test]
    fn test_lists_share_storage() {
        let a = Value::list(vec![Value::Int(1)]);
        let b = a.clone();
        if let Value::List(items) = &b {
            items.borrow_mut().push(Value::Int(2));
        }
        assert_eq!(a.to_string(), "[1, 2]");
    }
}

// tau-embed - Type conversion traits
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Type conversion between Rust and tau values.
//!
//! This module provides the [`IntoValue`] and [`FromValue`] traits for
//! converting between Rust types and [`Value`].
//!
//! # Built-in Conversions
//!
//! | Rust Type | tau Type |
//! |-----------|----------|
//! | `()` | `null` |
//! | `bool` | `bool` |
//! | `i32`, `i64`, `usize` | `int` |
//! | `f64` | `float` |
//! | `String`, `&str` | `string` |
//! | `Vec<T>` | `list` |
//! | `BTreeMap<String, V>` | `map` |
//! | `Option<T>` | `T` or `null` |
//!
//! # Custom Conversions
//!
//! ```rust
//! use tau_embed::{EngineError, FromValue, IntoValue, Result, Value};
//!
//! struct Point { x: i64, y: i64 }
//!
//! impl IntoValue for Point {
//!     fn into_value(self) -> Value {
//!         Value::list(vec![Value::Int(self.x), Value::Int(self.y)])
//!     }
//! }
//!
//! impl FromValue for Point {
//!     fn from_value(value: &Value) -> Result<Self> {
//!         let [x, y]: [i64; 2] = Vec::<i64>::from_value(value)?
//!             .try_into()
//!             .map_err(|_| EngineError::conversion("list of 2 ints", value.type_name()))?;
//!         Ok(Point { x, y })
//!     }
//! }
//! ```

use std::collections::BTreeMap;

use tau_core::{MapKey, OrdMap, Value};

use crate::error::{EngineError, Result};

/// Convert a Rust type into a [`Value`].
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Convert a [`Value`] into a Rust type. Handles are read through first.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

// ============================================================================
// IntoValue implementations
// ============================================================================

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Null
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Int(i64::from(self))
    }
}

impl IntoValue for usize {
    fn into_value(self) -> Value {
        Value::Int(self as i64)
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::from(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::string(self)
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::list(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

impl<V: IntoValue> IntoValue for BTreeMap<String, V> {
    fn into_value(self) -> Value {
        let entries: OrdMap<MapKey, Value> = self
            .into_iter()
            .map(|(k, v)| (MapKey::Str(k.into()), v.into_value()))
            .collect();
        Value::map(entries)
    }
}

// ============================================================================
// FromValue implementations
// ============================================================================

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.resolve())
    }
}

impl FromValue for () {
    fn from_value(value: &Value) -> Result<Self> {
        match value.resolve() {
            Value::Null => Ok(()),
            other => Err(EngineError::conversion("null", other.type_name())),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        match value.resolve() {
            Value::Bool(b) => Ok(b),
            other => Err(EngineError::conversion("bool", other.type_name())),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value.resolve() {
            Value::Int(n) => Ok(n),
            other => Err(EngineError::conversion("int", other.type_name())),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self> {
        let n = i64::from_value(value)?;
        i32::try_from(n).map_err(|_| {
            EngineError::Range(format!(
                "integer {} out of range for i32 ({}..={})",
                n,
                i32::MIN,
                i32::MAX
            ))
        })
    }
}

impl FromValue for usize {
    fn from_value(value: &Value) -> Result<Self> {
        let n = i64::from_value(value)?;
        usize::try_from(n).map_err(|_| EngineError::Range(format!("integer {} out of range for usize", n)))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        match value.resolve() {
            Value::Float(n) => Ok(n),
            Value::Int(n) => Ok(n as f64),
            other => Err(EngineError::conversion("number", other.type_name())),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value.resolve() {
            Value::Str(s) => Ok(s.to_string()),
            other => Err(EngineError::conversion("string", other.type_name())),
        }
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value.resolve() {
            Value::List(items) => items.borrow().iter().map(T::from_value).collect(),
            other => Err(EngineError::conversion("list", other.type_name())),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        match value.resolve() {
            Value::Null => Ok(None),
            other => T::from_value(&other).map(Some),
        }
    }
}

impl<V: FromValue> FromValue for BTreeMap<String, V> {
    fn from_value(value: &Value) -> Result<Self> {
        match value.resolve() {
            Value::Map(entries) => entries
                .borrow()
                .iter()
                .map(|(k, v)| match k {
                    MapKey::Str(s) => Ok((s.to_string(), V::from_value(v)?)),
                    other => Err(EngineError::conversion(
                        "string key",
                        other.to_value().type_name(),
                    )),
                })
                .collect(),
            other => Err(EngineError::conversion("map", other.type_name())),
        }
    }
}

// ============================================================================
// Convenience functions
// ============================================================================

/// Convert a Rust value into a tau value.
#[must_use]
pub fn to_value<T: IntoValue>(value: T) -> Value {
    value.into_value()
}

/// Convert a tau value into a Rust type.
pub fn from_value<T: FromValue>(value: &Value) -> Result<T> {
    T::from_value(value)
}

// tau-core - Object model for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # tau-core
//!
//! The runtime object model shared by the tau compiler, virtual machine and
//! embedding API: values, function templates and closures, assignable
//! handles, objects and modules, pipes, the builtin table, source bookmarks
//! and thread-safe value snapshots.

pub mod bookmark;
pub mod builtins;
pub mod function;
pub mod getsetter;
pub mod object;
pub mod pipe;
pub mod snapshot;
pub mod value;

pub use bookmark::Bookmark;
pub use builtins::{BUILTINS, Builtin, BuiltinFn};
pub use function::{Closure, CompiledFunction};
pub use getsetter::{AttrTarget, GetSetter};
pub use im::OrdMap;
pub use object::{Module, Object, is_exported};
pub use pipe::Pipe;
pub use snapshot::{Snapshot, SnapshotError};
pub use value::{ListRef, MapKey, MapRef, Value};

// tau-vm - Bytecode compiler and virtual machine for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Opcode handlers, organised by category.

pub mod arithmetic;
pub mod collections;
pub mod concurrent;
pub mod control;
pub mod interpolate;
pub mod modules;
pub mod variables;

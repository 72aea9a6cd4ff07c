// tau-core - Built-in functions
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Built-in functions for tau.
//!
//! The position of each builtin in [`BUILTINS`] is baked into compiled
//! bytecode by `GetBuiltin <index>`, so the order is part of the bytecode
//! format: append new builtins, never reorder.
//!
//! Builtins report bad arguments by returning an error value rather than
//! aborting the program.

use std::io::{self, BufRead, Write};
use std::rc::Rc;

use im::OrdMap;

use crate::object::Object;
use crate::pipe::Pipe;
use crate::value::{MapKey, Value};

/// Signature shared by every builtin.
pub type BuiltinFn = fn(&[Value]) -> Value;

/// A named host function.
#[derive(Debug)]
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

/// Every builtin, in bytecode order.
pub static BUILTINS: [Builtin; 23] = [
    Builtin { name: "len", func: builtin_len },
    Builtin { name: "println", func: builtin_println },
    Builtin { name: "print", func: builtin_print },
    Builtin { name: "input", func: builtin_input },
    Builtin { name: "string", func: builtin_string },
    Builtin { name: "error", func: builtin_error },
    Builtin { name: "type", func: builtin_type },
    Builtin { name: "int", func: builtin_int },
    Builtin { name: "float", func: builtin_float },
    Builtin { name: "exit", func: builtin_exit },
    Builtin { name: "append", func: builtin_append },
    Builtin { name: "new", func: builtin_new },
    Builtin { name: "failed", func: builtin_failed },
    Builtin { name: "pipe", func: builtin_pipe },
    Builtin { name: "send", func: builtin_send },
    Builtin { name: "recv", func: builtin_recv },
    Builtin { name: "close", func: builtin_close },
    Builtin { name: "hex", func: builtin_hex },
    Builtin { name: "oct", func: builtin_oct },
    Builtin { name: "bin", func: builtin_bin },
    Builtin { name: "slice", func: builtin_slice },
    Builtin { name: "keys", func: builtin_keys },
    Builtin { name: "delete", func: builtin_delete },
];

/// Look up a builtin by name, returning its bytecode index.
pub fn lookup(name: &str) -> Option<(usize, &'static Builtin)> {
    BUILTINS.iter().enumerate().find(|(_, b)| b.name == name)
}

// ============================================================================
// Helpers
// ============================================================================

fn arity(name: &str, expected: usize, args: &[Value]) -> Option<Value> {
    (args.len() != expected).then(|| {
        Value::error(format!(
            "{}: wrong number of arguments, expected {}, got {}",
            name,
            expected,
            args.len()
        ))
    })
}

/// Join values the way `print` does: a space goes between two operands
/// when neither is a string.
fn join_print(args: &[Value]) -> String {
    let mut out = String::new();
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            let prev_is_str = matches!(args[i - 1], Value::Str(_));
            let this_is_str = matches!(arg, Value::Str(_));
            if !prev_is_str && !this_is_str {
                out.push(' ');
            }
        }
        out.push_str(&arg.to_string());
    }
    out
}

fn join_println(args: &[Value]) -> String {
    args.iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

fn write_stdout(s: &str) {
    let mut out = io::stdout().lock();
    // A closed stdout is not an error the program can act on.
    let _ = out.write_all(s.as_bytes());
    let _ = out.flush();
}

fn require_pipe<'a>(name: &str, arg: &'a Value) -> Result<&'a Pipe, Value> {
    match arg {
        Value::Pipe(p) => Ok(p),
        other => Err(Value::error(format!(
            "{}: first argument must be a pipe, got {} instead",
            name,
            other.type_name()
        ))),
    }
}

fn require_int(name: &str, arg: &Value) -> Result<i64, Value> {
    match arg {
        Value::Int(n) => Ok(*n),
        other => Err(Value::error(format!(
            "{}: first argument must be an int, got {} instead",
            name,
            other.type_name()
        ))),
    }
}

/// Format an integer in a radix with a prefix; the sign goes after the prefix.
fn radix_string(prefix: &str, n: i64, fmt_abs: fn(u64) -> String) -> Value {
    let sign = if n < 0 { "-" } else { "" };
    Value::from(format!("{}{}{}", prefix, sign, fmt_abs(n.unsigned_abs())))
}

// ============================================================================
// I/O and conversion
// ============================================================================

fn builtin_len(args: &[Value]) -> Value {
    if let Some(err) = arity("len", 1, args) {
        return err;
    }
    match &args[0] {
        Value::List(items) => Value::Int(items.borrow().len() as i64),
        Value::Str(s) => Value::Int(s.len() as i64),
        Value::Map(entries) => Value::Int(entries.borrow().len() as i64),
        other => Value::error(format!(
            "len: object of type {:?} has no length",
            other.type_name()
        )),
    }
}

fn builtin_println(args: &[Value]) -> Value {
    write_stdout(&format!("{}\n", join_println(args)));
    Value::Null
}

fn builtin_print(args: &[Value]) -> Value {
    write_stdout(&join_print(args));
    Value::Null
}

fn builtin_input(args: &[Value]) -> Value {
    match args.len() {
        0 => {}
        1 => write_stdout(&args[0].to_string()),
        n => {
            return Value::error(format!(
                "input: wrong number of arguments, expected 1, got {}",
                n
            ));
        }
    }
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(_) => Value::from(line.trim_end_matches(['\n', '\r']).to_string()),
        Err(e) => Value::error(format!("input: {}", e)),
    }
}

fn builtin_string(args: &[Value]) -> Value {
    if args.is_empty() {
        return Value::error("string: no argument provided");
    }
    Value::from(join_print(args))
}

fn builtin_error(args: &[Value]) -> Value {
    Value::error(join_print(args))
}

fn builtin_type(args: &[Value]) -> Value {
    if let Some(err) = arity("type", 1, args) {
        return err;
    }
    Value::string(args[0].type_name())
}

fn builtin_int(args: &[Value]) -> Value {
    if let Some(err) = arity("int", 1, args) {
        return err;
    }
    match &args[0] {
        Value::Int(n) => Value::Int(*n),
        Value::Float(n) => Value::Int(*n as i64),
        Value::Str(s) => match s.trim().parse::<i64>() {
            Ok(n) => Value::Int(n),
            Err(_) => Value::error(format!("{} is not a number", s)),
        },
        other => Value::error(format!("{} is not a number", other)),
    }
}

fn builtin_float(args: &[Value]) -> Value {
    if let Some(err) = arity("float", 1, args) {
        return err;
    }
    match &args[0] {
        Value::Int(n) => Value::Float(*n as f64),
        Value::Float(n) => Value::Float(*n),
        Value::Str(s) => match s.trim().parse::<f64>() {
            Ok(n) => Value::Float(n),
            Err(_) => Value::error(format!("{} is not a number", s)),
        },
        other => Value::error(format!("{} is not a number", other)),
    }
}

fn builtin_exit(args: &[Value]) -> Value {
    match args {
        [] => std::process::exit(0),
        [Value::Int(code)] => std::process::exit(*code as i32),
        [msg @ (Value::Str(_) | Value::Error(_))] => {
            write_stdout(&format!("{}\n", msg));
            std::process::exit(0)
        }
        [_] => Value::error("exit: argument must be an integer, string or error"),
        [Value::Str(msg), Value::Int(code)] => {
            write_stdout(&format!("{}\n", msg));
            std::process::exit(*code as i32)
        }
        [Value::Str(_), _] => Value::error("exit: second argument must be an int"),
        [_, _] => Value::error("exit: first argument must be a string"),
        _ => Value::error(format!(
            "exit: wrong number of arguments, max 2, got {}",
            args.len()
        )),
    }
}

// ============================================================================
// Collections and objects
// ============================================================================

fn builtin_append(args: &[Value]) -> Value {
    let Some((first, rest)) = args.split_first() else {
        return Value::error("append: no argument provided");
    };
    match first {
        Value::List(items) => {
            let mut out = items.borrow().clone();
            out.extend_from_slice(rest);
            Value::list(out)
        }
        _ => Value::error("append: first argument must be a list"),
    }
}

fn builtin_new(args: &[Value]) -> Value {
    if let Some(err) = arity("new", 0, args) {
        return err;
    }
    Value::Object(Rc::new(Object::new()))
}

fn builtin_failed(args: &[Value]) -> Value {
    if let Some(err) = arity("failed", 1, args) {
        return err;
    }
    Value::Bool(matches!(args[0], Value::Error(_)))
}

fn builtin_slice(args: &[Value]) -> Value {
    if let Some(err) = arity("slice", 3, args) {
        return err;
    }
    let (Value::Int(start), Value::Int(end)) = (&args[1], &args[2]) else {
        let (pos, bad) = if matches!(args[1], Value::Int(_)) {
            ("third", &args[2])
        } else {
            ("second", &args[1])
        };
        return Value::error(format!(
            "slice: {} argument must be an int, got {} instead",
            pos,
            bad.type_name()
        ));
    };
    let (Ok(start), Ok(end)) = (usize::try_from(*start), usize::try_from(*end)) else {
        return Value::error("slice: invalid argument: index arguments must not be negative");
    };
    if start > end {
        return Value::error(format!(
            "slice: invalid argument: start {} is greater than end {}",
            start, end
        ));
    }

    match &args[0] {
        Value::List(items) => {
            let items = items.borrow();
            if end > items.len() {
                return Value::error(format!(
                    "slice: list bounds out of range {} with capacity {}",
                    end,
                    items.len()
                ));
            }
            Value::list(items[start..end].to_vec())
        }
        Value::Str(s) => {
            if end > s.len() {
                return Value::error(format!(
                    "slice: string bounds out of range {} with capacity {}",
                    end,
                    s.len()
                ));
            }
            match s.get(start..end) {
                Some(sub) => Value::string(sub),
                None => Value::error("slice: indices do not fall on character boundaries"),
            }
        }
        other => Value::error(format!(
            "slice: first argument must be a list or string, got {} instead",
            other.type_name()
        )),
    }
}

fn builtin_keys(args: &[Value]) -> Value {
    if let Some(err) = arity("keys", 1, args) {
        return err;
    }
    match &args[0] {
        Value::Map(entries) => Value::list(entries.borrow().keys().map(MapKey::to_value).collect()),
        other => Value::error(format!(
            "keys: argument must be a map, got {} instead",
            other.type_name()
        )),
    }
}

fn builtin_delete(args: &[Value]) -> Value {
    if let Some(err) = arity("delete", 2, args) {
        return err;
    }
    let Value::Map(entries) = &args[0] else {
        return Value::error(format!(
            "delete: first argument must be a map, got {} instead",
            args[0].type_name()
        ));
    };
    match MapKey::from_value(&args[1]) {
        Some(key) => {
            entries.borrow_mut().remove(&key);
            Value::Null
        }
        None => Value::error(format!(
            "delete: second argument must be one of bool int float string, got {} instead",
            args[1].type_name()
        )),
    }
}

// ============================================================================
// Pipes
// ============================================================================

fn builtin_pipe(args: &[Value]) -> Value {
    match args {
        [] => Value::Pipe(Pipe::new(0)),
        [Value::Int(n)] if *n >= 0 => Value::Pipe(Pipe::new(*n as usize)),
        [Value::Int(_)] => Value::error("pipe: buffer size must not be negative"),
        [other] => Value::error(format!(
            "pipe: first argument must be an int, got {} instead",
            other.type_name()
        )),
        _ => Value::error(format!(
            "pipe: wrong number of arguments, expected 0 or 1, got {}",
            args.len()
        )),
    }
}

fn builtin_send(args: &[Value]) -> Value {
    if let Some(err) = arity("send", 2, args) {
        return err;
    }
    let pipe = match require_pipe("send", &args[0]) {
        Ok(p) => p,
        Err(e) => return e,
    };
    match pipe.send(&args[1]) {
        Ok(()) => args[1].clone(),
        Err(msg) => Value::error(format!("send: {}", msg)),
    }
}

fn builtin_recv(args: &[Value]) -> Value {
    if let Some(err) = arity("recv", 1, args) {
        return err;
    }
    match require_pipe("recv", &args[0]) {
        Ok(p) => p.recv().unwrap_or(Value::Null),
        Err(e) => e,
    }
}

fn builtin_close(args: &[Value]) -> Value {
    if let Some(err) = arity("close", 1, args) {
        return err;
    }
    match require_pipe("close", &args[0]) {
        Ok(p) => {
            p.close();
            Value::Null
        }
        Err(e) => e,
    }
}

// ============================================================================
// Number formatting
// ============================================================================

fn builtin_hex(args: &[Value]) -> Value {
    if let Some(err) = arity("hex", 1, args) {
        return err;
    }
    match require_int("hex", &args[0]) {
        Ok(n) => radix_string("0x", n, |u| format!("{:x}", u)),
        Err(e) => e,
    }
}

fn builtin_oct(args: &[Value]) -> Value {
    if let Some(err) = arity("oct", 1, args) {
        return err;
    }
    match require_int("oct", &args[0]) {
        Ok(n) => radix_string("0o", n, |u| format!("{:o}", u)),
        Err(e) => e,
    }
}

fn builtin_bin(args: &[Value]) -> Value {
    if let Some(err) = arity("bin", 1, args) {
        return err;
    }
    match require_int("bin", &args[0]) {
        Ok(n) => radix_string("0b", n, |u| format!("{:b}", u)),
        Err(e) => e,
    }
}

/// Map literal helper for host code building maps from pairs.
pub fn map_from_pairs(pairs: impl IntoIterator<Item = (MapKey, Value)>) -> Value {
    Value::map(pairs.into_iter().collect::<OrdMap<_, _>>())
}

// tau-vm - Bytecode compiler and virtual machine for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Operator semantics shared by the VM and the constant folder.
//!
//! Operands are expected to be resolved already (no handles). Integer
//! arithmetic wraps; mixing an int with a float promotes to float; `/`
//! always produces a float.

use std::rc::Rc;

use tau_core::Value;

use crate::opcode::OpCode;
use crate::vm::{Result, RuntimeError};

fn op_symbol(op: OpCode) -> &'static str {
    match op {
        OpCode::Add => "+",
        OpCode::Sub => "-",
        OpCode::Mul => "*",
        OpCode::Div => "/",
        OpCode::Mod => "%",
        OpCode::BwAnd => "&",
        OpCode::BwOr => "|",
        OpCode::BwXor => "^",
        OpCode::BwNot => "~",
        OpCode::BwLShift => "<<",
        OpCode::BwRShift => ">>",
        OpCode::And => "&&",
        OpCode::Or => "||",
        OpCode::Equal => "==",
        OpCode::NotEqual => "!=",
        OpCode::GreaterThan => ">",
        OpCode::GreaterThanEqual => ">=",
        OpCode::In => "in",
        OpCode::Minus => "-",
        OpCode::Bang => "!",
        _ => "?",
    }
}

fn unsupported(op: OpCode, left: &Value, right: &Value) -> RuntimeError {
    RuntimeError::UnsupportedOperator {
        op: op_symbol(op),
        left: left.type_name(),
        right: right.type_name(),
    }
}

/// Numeric view of an int or float operand.
fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Int(n) => Some(*n as f64),
        Value::Float(n) => Some(*n),
        _ => None,
    }
}

/// Apply a binary operator opcode.
pub fn binary(op: OpCode, left: &Value, right: &Value) -> Result<Value> {
    match op {
        OpCode::Add | OpCode::Sub | OpCode::Mul => arithmetic(op, left, right),
        OpCode::Div => match (as_f64(left), as_f64(right)) {
            (Some(l), Some(r)) => Ok(Value::Float(l / r)),
            _ => Err(unsupported(op, left, right)),
        },
        OpCode::Mod => match (left, right) {
            (Value::Int(_), Value::Int(0)) => Err(RuntimeError::DivisionByZero),
            (Value::Int(l), Value::Int(r)) => Ok(Value::Int(l.wrapping_rem(*r))),
            _ => Err(unsupported(op, left, right)),
        },
        OpCode::BwAnd | OpCode::BwOr | OpCode::BwXor | OpCode::BwLShift | OpCode::BwRShift => {
            bitwise(op, left, right)
        }
        OpCode::And => Ok(Value::Bool(left.is_truthy() && right.is_truthy())),
        OpCode::Or => Ok(Value::Bool(left.is_truthy() || right.is_truthy())),
        OpCode::Equal => Ok(Value::Bool(equals(left, right))),
        OpCode::NotEqual => Ok(Value::Bool(!equals(left, right))),
        OpCode::GreaterThan | OpCode::GreaterThanEqual => compare(op, left, right),
        OpCode::In => contains(left, right),
        _ => Err(RuntimeError::Internal(format!(
            "{} is not a binary operator",
            op.name()
        ))),
    }
}

/// Apply a prefix operator opcode.
pub fn unary(op: OpCode, operand: &Value) -> Result<Value> {
    let unsupported = || RuntimeError::UnsupportedPrefix {
        op: op_symbol(op),
        operand: operand.type_name(),
    };
    match (op, operand) {
        (OpCode::Minus, Value::Int(n)) => Ok(Value::Int(n.wrapping_neg())),
        (OpCode::Minus, Value::Float(n)) => Ok(Value::Float(-n)),
        (OpCode::BwNot, Value::Int(n)) => Ok(Value::Int(!n)),
        // Only `false` and `null` negate to true.
        (OpCode::Bang, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (OpCode::Bang, Value::Null) => Ok(Value::Bool(true)),
        (OpCode::Bang, _) => Ok(Value::Bool(false)),
        _ => Err(unsupported()),
    }
}

fn arithmetic(op: OpCode, left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => Ok(Value::Int(match op {
            OpCode::Add => l.wrapping_add(*r),
            OpCode::Sub => l.wrapping_sub(*r),
            _ => l.wrapping_mul(*r),
        })),
        (Value::Str(l), Value::Str(r)) if op == OpCode::Add => {
            let mut s = String::with_capacity(l.len() + r.len());
            s.push_str(l);
            s.push_str(r);
            Ok(Value::Str(Rc::from(s)))
        }
        _ => match (as_f64(left), as_f64(right)) {
            (Some(l), Some(r)) => Ok(Value::Float(match op {
                OpCode::Add => l + r,
                OpCode::Sub => l - r,
                _ => l * r,
            })),
            _ => Err(unsupported(op, left, right)),
        },
    }
}

fn bitwise(op: OpCode, left: &Value, right: &Value) -> Result<Value> {
    let (Value::Int(l), Value::Int(r)) = (left, right) else {
        return Err(unsupported(op, left, right));
    };
    let (l, r) = (*l, *r);
    let n = match op {
        OpCode::BwAnd => l & r,
        OpCode::BwOr => l | r,
        OpCode::BwXor => l ^ r,
        OpCode::BwLShift | OpCode::BwRShift if r < 0 => return Err(RuntimeError::NegativeShift),
        OpCode::BwLShift if r >= 64 => 0,
        OpCode::BwLShift => l << r,
        _ if r >= 64 => l >> 63,
        _ => l >> r,
    };
    Ok(Value::Int(n))
}

fn compare(op: OpCode, left: &Value, right: &Value) -> Result<Value> {
    let ordering = match (left, right) {
        (Value::Int(l), Value::Int(r)) => Some(l.cmp(r)),
        (Value::Str(l), Value::Str(r)) => Some(l.cmp(r)),
        _ => match (as_f64(left), as_f64(right)) {
            (Some(l), Some(r)) => l.partial_cmp(&r),
            _ => return Err(unsupported(op, left, right)),
        },
    };
    // NaN compares false either way.
    Ok(Value::Bool(ordering.is_some_and(|o| match op {
        OpCode::GreaterThan => o.is_gt(),
        _ => o.is_ge(),
    })))
}

/// The language's `==`: strings and numbers by value (ints and floats
/// compare numerically), containers, objects and functions by identity.
pub fn equals(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(l), Value::Bool(r)) => l == r,
        (Value::Int(l), Value::Int(r)) => l == r,
        (Value::Str(l), Value::Str(r)) => l == r,
        (Value::Error(l), Value::Error(r)) => l == r,
        (Value::List(l), Value::List(r)) => Rc::ptr_eq(l, r),
        (Value::Map(l), Value::Map(r)) => Rc::ptr_eq(l, r),
        (Value::Object(l), Value::Object(r)) => Rc::ptr_eq(l, r),
        (Value::Module(l), Value::Module(r)) => Rc::ptr_eq(l, r),
        (Value::Closure(l), Value::Closure(r)) => Rc::ptr_eq(l, r),
        (Value::Function(l), Value::Function(r)) => std::sync::Arc::ptr_eq(l, r),
        (Value::Builtin(l), Value::Builtin(r)) => std::ptr::eq(*l, *r),
        (Value::Pipe(l), Value::Pipe(r)) => l.same(r),
        _ => match (as_f64(left), as_f64(right)) {
            (Some(l), Some(r)) => l == r,
            _ => false,
        },
    }
}

/// `needle in haystack`: substring test for strings, same-type membership
/// for lists.
fn contains(needle: &Value, haystack: &Value) -> Result<Value> {
    let scalar = matches!(
        needle,
        Value::Int(_) | Value::Float(_) | Value::Str(_) | Value::Bool(_) | Value::Null
    );
    match (needle, haystack) {
        (Value::Str(n), Value::Str(h)) => Ok(Value::Bool(h.contains(&**n))),
        (_, Value::List(items)) if scalar => Ok(Value::Bool(items.borrow().iter().any(|item| {
            let item = item.resolve();
            std::mem::discriminant(&item) == std::mem::discriminant(needle)
                && equals(&item, needle)
        }))),
        _ => Err(unsupported(OpCode::In, needle, haystack)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bin(op: OpCode, l: impl Into<Value>, r: impl Into<Value>) -> Result<Value> {
        binary(op, &l.into(), &r.into())
    }

    #[test]
    fn test_numeric_promotion() {
        assert_eq!(bin(OpCode::Add, 1i64, 2i64).unwrap(), Value::Int(3));
        assert_eq!(bin(OpCode::Add, 1i64, 2.5).unwrap(), Value::Float(3.5));
        assert_eq!(bin(OpCode::Mul, 2.0, 3.0).unwrap(), Value::Float(6.0));
        assert_eq!(bin(OpCode::Div, 7i64, 2i64).unwrap(), Value::Float(3.5));
        assert_eq!(bin(OpCode::Div, 1i64, 0i64).unwrap(), Value::Float(f64::INFINITY));
    }

    #[test]
    fn test_integer_overflow_wraps() {
        assert_eq!(bin(OpCode::Add, i64::MAX, 1i64).unwrap(), Value::Int(i64::MIN));
        assert_eq!(bin(OpCode::Mod, i64::MIN, -1i64).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_mod_by_zero() {
        assert_eq!(bin(OpCode::Mod, 1i64, 0i64), Err(RuntimeError::DivisionByZero));
        assert_eq!(bin(OpCode::Mod, -7i64, 3i64).unwrap(), Value::Int(-1));
    }

    #[test]
    fn test_string_concat_and_compare() {
        assert_eq!(bin(OpCode::Add, "ab", "cd").unwrap(), Value::string("abcd"));
        assert_eq!(bin(OpCode::GreaterThan, "b", "a").unwrap(), Value::Bool(true));
        assert!(bin(OpCode::Sub, "a", "b").is_err());
    }

    #[test]
    fn test_unsupported_message() {
        let err = bin(OpCode::Add, 1i64, "x").unwrap_err();
        assert_eq!(
            err.to_string(),
            "unsupported operator '+' for types int and string"
        );
    }

    #[test]
    fn test_shifts() {
        assert_eq!(bin(OpCode::BwLShift, 1i64, 4i64).unwrap(), Value::Int(16));
        assert_eq!(bin(OpCode::BwRShift, -16i64, 2i64).unwrap(), Value::Int(-4));
        assert_eq!(bin(OpCode::BwLShift, 1i64, 64i64).unwrap(), Value::Int(0));
        assert_eq!(bin(OpCode::BwRShift, -1i64, 100i64).unwrap(), Value::Int(-1));
        assert_eq!(bin(OpCode::BwLShift, 1i64, -1i64), Err(RuntimeError::NegativeShift));
    }

    #[test]
    fn test_equality() {
        assert!(equals(&Value::Int(1), &Value::Float(1.0)));
        assert!(!equals(&Value::Int(1), &Value::string("1")));
        let a = Value::list(vec![Value::Int(1)]);
        let b = Value::list(vec![Value::Int(1)]);
        assert!(equals(&a, &a.clone()));
        assert!(!equals(&a, &b));
    }

    #[test]
    fn test_logic_is_not_short_circuit_sensitive() {
        assert_eq!(bin(OpCode::And, 1i64, 0i64).unwrap(), Value::Bool(false));
        assert_eq!(bin(OpCode::Or, Value::Null, "x").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_in() {
        let list = Value::list(vec![Value::Int(1), Value::string("a")]);
        assert_eq!(binary(OpCode::In, &Value::Int(1), &list).unwrap(), Value::Bool(true));
        assert_eq!(binary(OpCode::In, &Value::Float(1.0), &list).unwrap(), Value::Bool(false));
        assert_eq!(bin(OpCode::In, "ell", "hello").unwrap(), Value::Bool(true));
        assert!(binary(OpCode::In, &list, &list).is_err());
    }

    #[test]
    fn test_unary() {
        assert_eq!(unary(OpCode::Minus, &Value::Int(3)).unwrap(), Value::Int(-3));
        assert_eq!(unary(OpCode::BwNot, &Value::Int(0)).unwrap(), Value::Int(-1));
        assert_eq!(unary(OpCode::Bang, &Value::Null).unwrap(), Value::Bool(true));
        assert_eq!(unary(OpCode::Bang, &Value::Int(0)).unwrap(), Value::Bool(false));
        assert!(unary(OpCode::Minus, &Value::string("x")).is_err());
    }
}

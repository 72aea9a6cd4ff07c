// tau-vm - Bytecode compiler and virtual machine for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Constant folding.
//!
//! Operator trees built only from literals are evaluated at compile time
//! with the same operator functions the VM uses, so a folded constant always
//! equals what the unfolded instructions would have produced.

use tau_core::Value;
use tau_parser::{InfixOp, Node, PrefixOp};

use crate::opcode::OpCode;
use crate::ops;
use crate::vm::{Result, RuntimeError};

/// The opcode implementing `op`, and whether its operands are compiled in
/// reverse order (`a < b` runs as `b > a`).
pub fn infix_opcode(op: InfixOp) -> (OpCode, bool) {
    match op {
        InfixOp::Add => (OpCode::Add, false),
        InfixOp::Sub => (OpCode::Sub, false),
        InfixOp::Mul => (OpCode::Mul, false),
        InfixOp::Div => (OpCode::Div, false),
        InfixOp::Mod => (OpCode::Mod, false),
        InfixOp::BwAnd => (OpCode::BwAnd, false),
        InfixOp::BwOr => (OpCode::BwOr, false),
        InfixOp::BwXor => (OpCode::BwXor, false),
        InfixOp::Shl => (OpCode::BwLShift, false),
        InfixOp::Shr => (OpCode::BwRShift, false),
        InfixOp::And => (OpCode::And, false),
        InfixOp::Or => (OpCode::Or, false),
        InfixOp::Eq => (OpCode::Equal, false),
        InfixOp::NotEq => (OpCode::NotEqual, false),
        InfixOp::Gt => (OpCode::GreaterThan, false),
        InfixOp::GtEq => (OpCode::GreaterThanEqual, false),
        InfixOp::Lt => (OpCode::GreaterThan, true),
        InfixOp::LtEq => (OpCode::GreaterThanEqual, true),
        InfixOp::In => (OpCode::In, false),
    }
}

pub fn prefix_opcode(op: PrefixOp) -> OpCode {
    match op {
        PrefixOp::Minus => OpCode::Minus,
        PrefixOp::Bang => OpCode::Bang,
        PrefixOp::BwNot => OpCode::BwNot,
    }
}

/// Evaluate a constant expression.
pub fn eval_const(node: &Node) -> Result<Value> {
    match node {
        Node::Int(n) => Ok(Value::Int(*n)),
        Node::Float(n) => Ok(Value::Float(*n)),
        Node::Bool(b) => Ok(Value::Bool(*b)),
        Node::Null => Ok(Value::Null),
        Node::RawStr(s) => Ok(Value::string(s)),
        Node::Str { value, .. } if !value.contains(['{', '}']) => Ok(Value::string(value)),
        Node::Prefix { op, operand, .. } => ops::unary(prefix_opcode(*op), &eval_const(operand)?),
        Node::Infix {
            op, left, right, ..
        } => {
            // Operands are evaluated in the order the VM would run them, so
            // the first error raised is the same.
            let (opcode, swapped) = infix_opcode(*op);
            if swapped {
                let first = eval_const(right)?;
                ops::binary(opcode, &first, &eval_const(left)?)
            } else {
                let first = eval_const(left)?;
                ops::binary(opcode, &first, &eval_const(right)?)
            }
        }
        other => Err(RuntimeError::Internal(format!(
            "{} is not a constant expression",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use tau_parser::parse_str;

    use super::*;

    fn fold(src: &str) -> Result<Value> {
        let program = parse_str(src).unwrap();
        assert!(program[0].is_const_expression(), "{} is not constant", src);
        eval_const(&program[0])
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(fold("1 + 2 * 3").unwrap(), Value::Int(7));
        assert_eq!(fold("(1 + 2) * 3").unwrap(), Value::Int(9));
        assert_eq!(fold("7 / 2").unwrap(), Value::Float(3.5));
        assert_eq!(fold("-(3 - 5)").unwrap(), Value::Int(2));
    }

    #[test]
    fn test_swapped_comparisons() {
        assert_eq!(fold("1 < 2").unwrap(), Value::Bool(true));
        assert_eq!(fold("2 <= 2").unwrap(), Value::Bool(true));
        assert_eq!(fold("3 < 2").unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_strings() {
        assert_eq!(fold("\"a\" + `b`").unwrap(), Value::string("ab"));
        assert_eq!(fold("\"a\" == \"a\"").unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_errors_surface() {
        assert_eq!(fold("1 % 0"), Err(RuntimeError::DivisionByZero));
        assert!(fold("1 - \"a\"").is_err());
    }
}

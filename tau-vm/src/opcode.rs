// tau-vm - Bytecode compiler and virtual machine for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode instruction definitions.
//!
//! An instruction is one opcode byte followed by fixed-width big-endian
//! operands. The width table in [`OpCode::operand_widths`] is all a decoder
//! needs to walk an instruction stream.

use std::fmt::Write;

/// Bytecode instructions for the tau VM.
///
/// The discriminant of each variant is its byte in the instruction stream,
/// so the order here is part of the persisted bytecode format.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    // =========================================================================
    // Constants & Literals
    // =========================================================================
    /// Push constants[n].
    Constant,

    /// Push `true`.
    True,

    /// Push `false`.
    False,

    /// Push `null`.
    Null,

    /// Pop n values and push them as a list.
    List,

    /// Pop n values (n/2 key/value pairs) and push them as a map.
    Map,

    /// Pop `nfree` captured values and bind them to the function template in
    /// constants[n].
    Closure,

    /// Push the closure of the running frame.
    CurrentClosure,

    // =========================================================================
    // Arithmetic & Bitwise
    // =========================================================================
    /// Pop right, pop left, push left + right.
    Add,

    /// Pop right, pop left, push left - right.
    Sub,

    /// Pop right, pop left, push left * right.
    Mul,

    /// Pop right, pop left, push left / right as a float.
    Div,

    /// Pop right, pop left, push left % right.
    Mod,

    /// Bitwise and of two ints.
    BwAnd,

    /// Bitwise or of two ints.
    BwOr,

    /// Bitwise xor of two ints.
    BwXor,

    /// Bitwise complement of an int.
    BwNot,

    /// Left shift.
    BwLShift,

    /// Arithmetic right shift.
    BwRShift,

    // =========================================================================
    // Logic & Comparison
    // =========================================================================
    /// Logical and of two already evaluated operands.
    And,

    /// Logical or of two already evaluated operands.
    Or,

    /// Pop two values, push whether they are equal.
    Equal,

    /// Pop two values, push whether they differ.
    NotEqual,

    /// Pop right, pop left, push left > right. Also used for `<` with the
    /// operands compiled in reverse.
    GreaterThan,

    /// Pop right, pop left, push left >= right. Also used for `<=`.
    GreaterThanEqual,

    /// Pop container, pop needle, push whether the needle is in it.
    In,

    /// Arithmetic negation.
    Minus,

    /// Logical not.
    Bang,

    // =========================================================================
    // Access
    // =========================================================================
    /// Pop index, pop container, push a handle (or a character for strings).
    Index,

    /// Pop attribute name, pop object, push an attribute handle.
    Dot,

    /// Pop value, pop handle, write through the handle and push the result.
    Define,

    // =========================================================================
    // Calls & Control Flow
    // =========================================================================
    /// Call the value below n arguments.
    Call,

    /// Start the value below n arguments on its own thread; pushes `null`.
    ConcurrentCall,

    /// Return `null` from the current frame.
    Return,

    /// Pop a value and return it from the current frame.
    ReturnValue,

    /// Set the instruction pointer to an absolute offset.
    Jump,

    /// Pop a value; jump to an absolute offset when it is falsy.
    JumpNotTruthy,

    // =========================================================================
    // Variables
    // =========================================================================
    /// Push globals[n].
    GetGlobal,

    /// Store the top of stack in globals[n] without popping it.
    SetGlobal,

    /// Push the local in slot n.
    GetLocal,

    /// Store the top of stack in local slot n without popping it.
    SetLocal,

    /// Push builtin n.
    GetBuiltin,

    /// Push captured value n of the running closure.
    GetFree,

    // =========================================================================
    // Modules, Strings & Stack
    // =========================================================================
    /// Pop a path and push the module it names.
    LoadModule,

    /// Render the template in constants[n], evaluating its m `{...}` segments.
    Interpolate,

    /// Discard the top of stack.
    Pop,

    /// Stop running the current unit.
    Halt,
}

/// Every opcode in byte order.
const ALL: [OpCode; 46] = [
    OpCode::Constant,
    OpCode::True,
    OpCode::False,
    OpCode::Null,
    OpCode::List,
    OpCode::Map,
    OpCode::Closure,
    OpCode::CurrentClosure,
    OpCode::Add,
    OpCode::Sub,
    OpCode::Mul,
    OpCode::Div,
    OpCode::Mod,
    OpCode::BwAnd,
    OpCode::BwOr,
    OpCode::BwXor,
    OpCode::BwNot,
    OpCode::BwLShift,
    OpCode::BwRShift,
    OpCode::And,
    OpCode::Or,
    OpCode::Equal,
    OpCode::NotEqual,
    OpCode::GreaterThan,
    OpCode::GreaterThanEqual,
    OpCode::In,
    OpCode::Minus,
    OpCode::Bang,
    OpCode::Index,
    OpCode::Dot,
    OpCode::Define,
    OpCode::Call,
    OpCode::ConcurrentCall,
    OpCode::Return,
    OpCode::ReturnValue,
    OpCode::Jump,
    OpCode::JumpNotTruthy,
    OpCode::GetGlobal,
    OpCode::SetGlobal,
    OpCode::GetLocal,
    OpCode::SetLocal,
    OpCode::GetBuiltin,
    OpCode::GetFree,
    OpCode::LoadModule,
    OpCode::Interpolate,
    OpCode::Pop,
];

impl OpCode {
    /// Decode an opcode byte.
    pub fn from_byte(byte: u8) -> Option<OpCode> {
        match byte {
            b if (b as usize) < ALL.len() => Some(ALL[b as usize]),
            b if b == OpCode::Halt as u8 => Some(OpCode::Halt),
            _ => None,
        }
    }

    /// Byte width of each operand.
    pub fn operand_widths(self) -> &'static [usize] {
        match self {
            OpCode::Constant
            | OpCode::List
            | OpCode::Map
            | OpCode::Jump
            | OpCode::JumpNotTruthy
            | OpCode::GetGlobal
            | OpCode::SetGlobal => &[2],
            OpCode::Closure => &[2, 1],
            OpCode::Interpolate => &[2, 2],
            OpCode::Call
            | OpCode::ConcurrentCall
            | OpCode::GetLocal
            | OpCode::SetLocal
            | OpCode::GetBuiltin
            | OpCode::GetFree => &[1],
            _ => &[],
        }
    }

    /// Total encoded length, opcode byte included.
    pub fn width(self) -> usize {
        1 + self.operand_widths().iter().sum::<usize>()
    }

    pub fn name(self) -> &'static str {
        match self {
            OpCode::Constant => "OpConstant",
            OpCode::True => "OpTrue",
            OpCode::False => "OpFalse",
            OpCode::Null => "OpNull",
            OpCode::List => "OpList",
            OpCode::Map => "OpMap",
            OpCode::Closure => "OpClosure",
            OpCode::CurrentClosure => "OpCurrentClosure",
            OpCode::Add => "OpAdd",
            OpCode::Sub => "OpSub",
            OpCode::Mul => "OpMul",
            OpCode::Div => "OpDiv",
            OpCode::Mod => "OpMod",
            OpCode::BwAnd => "OpBwAnd",
            OpCode::BwOr => "OpBwOr",
            OpCode::BwXor => "OpBwXor",
            OpCode::BwNot => "OpBwNot",
            OpCode::BwLShift => "OpBwLShift",
            OpCode::BwRShift => "OpBwRShift",
            OpCode::And => "OpAnd",
            OpCode::Or => "OpOr",
            OpCode::Equal => "OpEqual",
            OpCode::NotEqual => "OpNotEqual",
            OpCode::GreaterThan => "OpGreaterThan",
            OpCode::GreaterThanEqual => "OpGreaterThanEqual",
            OpCode::In => "OpIn",
            OpCode::Minus => "OpMinus",
            OpCode::Bang => "OpBang",
            OpCode::Index => "OpIndex",
            OpCode::Dot => "OpDot",
            OpCode::Define => "OpDefine",
            OpCode::Call => "OpCall",
            OpCode::ConcurrentCall => "OpConcurrentCall",
            OpCode::Return => "OpReturn",
            OpCode::ReturnValue => "OpReturnValue",
            OpCode::Jump => "OpJump",
            OpCode::JumpNotTruthy => "OpJumpNotTruthy",
            OpCode::GetGlobal => "OpGetGlobal",
            OpCode::SetGlobal => "OpSetGlobal",
            OpCode::GetLocal => "OpGetLocal",
            OpCode::SetLocal => "OpSetLocal",
            OpCode::GetBuiltin => "OpGetBuiltin",
            OpCode::GetFree => "OpGetFree",
            OpCode::LoadModule => "OpLoadModule",
            OpCode::Interpolate => "OpInterpolate",
            OpCode::Pop => "OpPop",
            OpCode::Halt => "OpHalt",
        }
    }
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode one instruction. Operands wider than their slot are truncated, so
/// callers check ranges before emitting.
pub fn make(op: OpCode, operands: &[usize]) -> Vec<u8> {
    let widths = op.operand_widths();
    let mut out = Vec::with_capacity(op.width());
    out.push(op as u8);
    for (operand, width) in operands.iter().zip(widths) {
        match width {
            1 => out.push(*operand as u8),
            2 => out.extend_from_slice(&(*operand as u16).to_be_bytes()),
            _ => out.extend_from_slice(&(*operand as u32).to_be_bytes()),
        }
    }
    out
}

#[inline]
pub fn read_u8(ins: &[u8], at: usize) -> usize {
    ins[at] as usize
}

#[inline]
pub fn read_u16(ins: &[u8], at: usize) -> usize {
    u16::from_be_bytes([ins[at], ins[at + 1]]) as usize
}

/// Decode the operands of `op` starting at `at`. Returns the operands and
/// the number of bytes read, or `None` if the stream is truncated.
pub fn read_operands(op: OpCode, ins: &[u8], at: usize) -> Option<(Vec<usize>, usize)> {
    let mut operands = Vec::with_capacity(op.operand_widths().len());
    let mut offset = at;
    for width in op.operand_widths() {
        let bytes = ins.get(offset..offset + width)?;
        let value = bytes.iter().fold(0usize, |acc, b| (acc << 8) | *b as usize);
        operands.push(value);
        offset += width;
    }
    Some((operands, offset - at))
}

/// Render an instruction stream one instruction per line, as
/// `0000 OpName operand...`.
pub fn disassemble(ins: &[u8]) -> String {
    let mut out = String::new();
    let mut ip = 0;
    while ip < ins.len() {
        let Some(op) = OpCode::from_byte(ins[ip]) else {
            let _ = writeln!(out, "{:04} ERROR: unknown opcode {}", ip, ins[ip]);
            ip += 1;
            continue;
        };
        let Some((operands, read)) = read_operands(op, ins, ip + 1) else {
            let _ = writeln!(out, "{:04} ERROR: truncated {}", ip, op.name());
            break;
        };
        let _ = write!(out, "{:04} {}", ip, op.name());
        for operand in operands {
            let _ = write!(out, " {}", operand);
        }
        out.push('\n');
        ip += 1 + read;
    }
    out
}

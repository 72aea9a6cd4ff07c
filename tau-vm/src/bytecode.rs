// tau-vm - Bytecode compiler and virtual machine for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! The compiled unit handed from the compiler to the VM, and its on-disk form.
//!
//! The persisted layout is a sequence of big-endian fields:
//!
//! ```text
//! u32 num_globals
//! u32 len, [u8; len]          instructions
//! u32 count, constant*        constant pool
//! u32 count, bookmark*        bookmarks
//! ```
//!
//! A constant is a one-byte tag followed by its payload. Function constants
//! nest their own instructions and bookmarks with the same rules.

use std::fmt::Write;
use std::sync::Arc;

use tau_core::{Bookmark, CompiledFunction, Value};
use thiserror::Error;

use crate::opcode::{self, OpCode};

const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_FLOAT: u8 = 3;
const TAG_STRING: u8 = 4;
const TAG_FUNCTION: u8 = 5;

/// Instructions, constant pool, bookmarks and global slot count of one unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Bytecode {
    pub instructions: Vec<u8>,
    pub constants: Vec<Value>,
    pub bookmarks: Vec<Bookmark>,
    pub num_globals: usize,
}

/// Error while decoding persisted bytecode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("bytecode is truncated at byte {0}")]
    Truncated(usize),

    #[error("unknown constant tag {0}")]
    UnknownTag(u8),

    #[error("constant string is not valid UTF-8")]
    BadUtf8,

    #[error("unknown opcode {opcode} at offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },

    #[error("relocated operand {0} does not fit in 16 bits")]
    OperandOverflow(usize),
}

/// Error while encoding bytecode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("cannot persist a {0} constant")]
    UnsupportedConstant(&'static str),

    #[error("{0} does not fit in 32 bits")]
    TooLarge(&'static str),
}

impl Bytecode {
    /// Serialize to the persisted format.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut out = Vec::with_capacity(self.instructions.len() + 64);
        put_len(&mut out, self.num_globals, "global count")?;
        put_bytes(&mut out, &self.instructions)?;
        put_len(&mut out, self.constants.len(), "constant count")?;
        for constant in &self.constants {
            put_constant(&mut out, constant)?;
        }
        put_bookmarks(&mut out, &self.bookmarks)?;
        Ok(out)
    }

    /// Parse the persisted format.
    pub fn decode(data: &[u8]) -> Result<Bytecode, DecodeError> {
        let mut reader = Reader { data, at: 0 };
        let num_globals = reader.u32()? as usize;
        let instructions = reader.instructions()?;
        let count = reader.u32()? as usize;
        let mut constants = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            constants.push(reader.constant()?);
        }
        let bookmarks = reader.bookmarks()?;
        Ok(Bytecode {
            instructions,
            constants,
            bookmarks,
            num_globals,
        })
    }

    /// Listing of the unit's instructions followed by those of each
    /// function constant, headed by its pool index.
    pub fn disassemble(&self) -> String {
        let mut out = opcode::disassemble(&self.instructions);
        for (idx, constant) in self.constants.iter().enumerate() {
            if let Value::Function(func) = constant {
                let _ = writeln!(
                    out,
                    "\nconstant {} (function, {} params, {} locals)",
                    idx, func.num_params, func.num_locals
                );
                out.push_str(&opcode::disassemble(&func.instructions));
            }
        }
        out
    }

    /// Shift constant and global operands so the unit can run after
    /// `const_base` existing constants and `global_base` existing global
    /// slots. Nested function constants are shifted too.
    pub fn relocate(&mut self, const_base: usize, global_base: usize) -> Result<(), DecodeError> {
        relocate_instructions(&mut self.instructions, const_base, global_base)?;
        for constant in &mut self.constants {
            if let Value::Function(func) = constant {
                let mut func = CompiledFunction::clone(func);
                relocate_instructions(&mut func.instructions, const_base, global_base)?;
                *constant = Value::Function(Arc::new(func));
            }
        }
        self.num_globals += global_base;
        Ok(())
    }
}

fn relocate_instructions(
    ins: &mut [u8],
    const_base: usize,
    global_base: usize,
) -> Result<(), DecodeError> {
    let mut ip = 0;
    while ip < ins.len() {
        let op = OpCode::from_byte(ins[ip]).ok_or(DecodeError::UnknownOpcode {
            opcode: ins[ip],
            offset: ip,
        })?;
        let shift = match op {
            OpCode::Constant | OpCode::Closure | OpCode::Interpolate => const_base,
            OpCode::GetGlobal | OpCode::SetGlobal => global_base,
            _ => 0,
        };
        if shift > 0 {
            let operand = opcode::read_u16(ins, ip + 1) + shift;
            let narrow = u16::try_from(operand).map_err(|_| DecodeError::OperandOverflow(operand))?;
            ins[ip + 1..ip + 3].copy_from_slice(&narrow.to_be_bytes());
        }
        ip += op.width();
    }
    Ok(())
}

// ============================================================================
// Encoding
// ============================================================================

fn put_u32(out: &mut Vec<u8>, n: u32) {
    out.extend_from_slice(&n.to_be_bytes());
}

fn put_len(out: &mut Vec<u8>, n: usize, what: &'static str) -> Result<(), EncodeError> {
    let n = u32::try_from(n).map_err(|_| EncodeError::TooLarge(what))?;
    put_u32(out, n);
    Ok(())
}

fn put_bytes(out: &mut Vec<u8>, bytes: &[u8]) -> Result<(), EncodeError> {
    put_len(out, bytes.len(), "byte string")?;
    out.extend_from_slice(bytes);
    Ok(())
}

fn put_bookmarks(out: &mut Vec<u8>, bookmarks: &[Bookmark]) -> Result<(), EncodeError> {
    put_len(out, bookmarks.len(), "bookmark count")?;
    for bm in bookmarks {
        put_u32(out, bm.offset);
        put_u32(out, bm.lineno);
        put_u32(out, bm.column);
        put_bytes(out, bm.line.as_bytes())?;
    }
    Ok(())
}

fn put_constant(out: &mut Vec<u8>, value: &Value) -> Result<(), EncodeError> {
    match value {
        Value::Null => out.push(TAG_NULL),
        Value::Bool(b) => {
            out.push(TAG_BOOL);
            out.push(u8::from(*b));
        }
        Value::Int(n) => {
            out.push(TAG_INT);
            out.extend_from_slice(&n.to_be_bytes());
        }
        Value::Float(n) => {
            out.push(TAG_FLOAT);
            out.extend_from_slice(&n.to_bits().to_be_bytes());
        }
        Value::Str(s) => {
            out.push(TAG_STRING);
            put_bytes(out, s.as_bytes())?;
        }
        Value::Function(func) => {
            out.push(TAG_FUNCTION);
            put_len(out, func.num_locals, "local count")?;
            put_len(out, func.num_params, "parameter count")?;
            put_bytes(out, &func.instructions)?;
            put_bookmarks(out, &func.bookmarks)?;
        }
        other => return Err(EncodeError::UnsupportedConstant(other.type_name())),
    }
    Ok(())
}

// ============================================================================
// Decoding
// ============================================================================

struct Reader<'a> {
    data: &'a [u8],
    at: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .at
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or(DecodeError::Truncated(self.at))?;
        let bytes = &self.data[self.at..end];
        self.at = end;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(buf))
    }

    fn u64(&mut self) -> Result<u64, DecodeError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_be_bytes(buf))
    }

    fn bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    fn string(&mut self) -> Result<String, DecodeError> {
        let bytes = self.bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::BadUtf8)
    }

    /// Read an instruction stream, checking every opcode byte.
    fn instructions(&mut self) -> Result<Vec<u8>, DecodeError> {
        let ins = self.bytes()?;
        let mut ip = 0;
        while ip < ins.len() {
            let op = OpCode::from_byte(ins[ip]).ok_or(DecodeError::UnknownOpcode {
                opcode: ins[ip],
                offset: ip,
            })?;
            ip += op.width();
        }
        if ip > ins.len() {
            return Err(DecodeError::Truncated(self.at));
        }
        Ok(ins.to_vec())
    }

    fn bookmarks(&mut self) -> Result<Vec<Bookmark>, DecodeError> {
        let count = self.u32()? as usize;
        let mut bookmarks = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            bookmarks.push(Bookmark {
                offset: self.u32()?,
                lineno: self.u32()?,
                column: self.u32()?,
                line: self.string()?,
            });
        }
        Ok(bookmarks)
    }

    fn constant(&mut self) -> Result<Value, DecodeError> {
        match self.u8()? {
            TAG_NULL => Ok(Value::Null),
            TAG_BOOL => Ok(Value::Bool(self.u8()? != 0)),
            TAG_INT => Ok(Value::Int(self.u64()? as i64)),
            TAG_FLOAT => Ok(Value::Float(f64::from_bits(self.u64()?))),
            TAG_STRING => Ok(Value::string(&self.string()?)),
            TAG_FUNCTION => {
                let num_locals = self.u32()? as usize;
                let num_params = self.u32()? as usize;
                let instructions = self.instructions()?;
                let bookmarks = self.bookmarks()?;
                Ok(Value::Function(Arc::new(CompiledFunction::new(
                    instructions,
                    num_locals,
                    num_params,
                    bookmarks,
                ))))
            }
            tag => Err(DecodeError::UnknownTag(tag)),
        }
    }
}

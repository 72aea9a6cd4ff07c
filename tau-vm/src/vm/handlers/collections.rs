// tau-vm - Bytecode compiler and virtual machine for the tau programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Collection opcode handlers: List, Map, Index, Dot, Define.
//!
//! Index and Dot never read or write their target. They push a GetSetter
//! handle, which ordinary evaluation resolves and `Define` writes through.

use std::rc::Rc;

use tau_core::{AttrTarget, GetSetter, MapKey, OrdMap, Value};

use crate::opcode::OpCode;
use crate::vm::{Instruction, Result, RuntimeError, VM};

impl VM<'_> {
    /// Execute a collection opcode.
    pub(crate) fn execute_collections(&mut self, ins: Instruction) -> Result<()> {
        match ins.op {
            OpCode::List => {
                let items = self.stack.pop_resolved(ins.a)?;
                self.stack.push(Value::list(items))
            }
            OpCode::Map => {
                let items = self.stack.pop_resolved(ins.a * 2)?;
                let mut entries = OrdMap::new();
                for pair in items.chunks(2) {
                    let key = MapKey::from_value(&pair[0])
                        .ok_or(RuntimeError::InvalidMapKey(pair[0].type_name()))?;
                    entries.insert(key, pair[1].clone());
                }
                self.stack.push(Value::map(entries))
            }
            OpCode::Index => {
                let index = self.stack.pop()?.resolve();
                let left = self.stack.pop()?.resolve();
                let value = index_value(left, index)?;
                self.stack.push(value)
            }
            OpCode::Dot => {
                let name = match self.stack.pop()?.resolve() {
                    Value::Str(name) => name,
                    other => {
                        return Err(RuntimeError::Internal(format!(
                            "attribute name is a {}",
                            other.type_name()
                        )));
                    }
                };
                let target = match self.stack.pop()?.resolve() {
                    Value::Object(obj) => AttrTarget::Object(obj),
                    Value::Module(module) => AttrTarget::Module(module),
                    other => {
                        return Err(RuntimeError::NoAttribute {
                            type_name: other.type_name(),
                            name: name.to_string(),
                        });
                    }
                };
                self.stack
                    .push(Value::GetSetter(Rc::new(GetSetter::Attribute { target, name })))
            }
            OpCode::Define => {
                let value = self.stack.pop()?.resolve();
                match self.stack.pop()? {
                    Value::GetSetter(handle) => self.stack.push(handle.set(value)),
                    other => Err(RuntimeError::InvalidAssignment(other.type_name())),
                }
            }
            _ => Err(RuntimeError::Internal(format!(
                "execute_collections: unexpected opcode {:?}",
                ins.op
            ))),
        }
    }
}

/// `left[index]`: a handle for list items and map entries, a one-character
/// string for strings.
fn index_value(left: Value, index: Value) -> Result<Value> {
    match (left, index) {
        (Value::List(list), Value::Int(index)) => {
            Ok(Value::GetSetter(Rc::new(GetSetter::ListItem { list, index })))
        }
        (Value::Str(s), Value::Int(index)) => usize::try_from(index)
            .ok()
            .filter(|&i| s.is_char_boundary(i))
            .and_then(|i| s[i..].chars().next())
            .map(|c| Value::string(c.encode_utf8(&mut [0; 4])))
            .ok_or(RuntimeError::IndexOutOfRange),
        (Value::Map(map), key) => match MapKey::from_value(&key) {
            Some(key) => Ok(Value::GetSetter(Rc::new(GetSetter::MapEntry { map, key }))),
            None => Err(RuntimeError::InvalidIndex {
                left: "map",
                index: key.type_name(),
            }),
        },
        (left, index) => Err(RuntimeError::InvalidIndex {
            left: left.type_name(),
            index: index.type_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_index() {
        let s = Value::string("héllo");
        assert_eq!(index_value(s.clone(), Value::Int(0)).unwrap(), Value::string("h"));
        assert_eq!(index_value(s.clone(), Value::Int(1)).unwrap(), Value::string("é"));
        assert_eq!(
            index_value(s.clone(), Value::Int(2)),
            Err(RuntimeError::IndexOutOfRange)
        );
        assert_eq!(
            index_value(s.clone(), Value::Int(-1)),
            Err(RuntimeError::IndexOutOfRange)
        );
        assert_eq!(index_value(s, Value::Int(6)), Err(RuntimeError::IndexOutOfRange));
    }

    #[test]
    fn test_list_handle_reads_and_writes() {
        let list = Value::list(vec![Value::Int(1), Value::Int(2)]);
        let handle = index_value(list.clone(), Value::Int(1)).unwrap();
        assert_eq!(handle.resolve(), Value::Int(2));
        if let Value::GetSetter(gs) = &handle {
            gs.set(Value::Int(9));
        }
        assert_eq!(list, Value::list(vec![Value::Int(1), Value::Int(9)]));
    }

    #[test]
    fn test_invalid_index() {
        assert_eq!(
            index_value(Value::Int(1), Value::Int(0)),
            Err(RuntimeError::InvalidIndex {
                left: "int",
                index: "int"
            })
        );
        assert!(index_value(Value::map(OrdMap::new()), Value::Null).is_err());
    }
}

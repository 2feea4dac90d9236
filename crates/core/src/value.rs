//! Runtime value representation.
//!
//! Values are what live on the operand stack and in variable bindings.
//! The C original used a manual tagged union; here the tag and payload
//! are one closed enum, with heap variants held by `Rc` handle.

use std::fmt;
use std::rc::Rc;

use crate::object::{Function, LarkString, NativeFunction};

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Nil,
    Number(f64),
    /// An interned string. Equal content implies an identical handle.
    Str(Rc<LarkString>),
    Function(Rc<Function>),
    Native(Rc<NativeFunction>),
    /// The `*` array-subscript wildcard. Only ever appears between a
    /// subscript push and the array opcode that consumes it.
    Star,
}

impl Value {
    /// nil and false are falsey; everything else is truthy.
    pub fn is_falsey(&self) -> bool {
        matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&Rc<LarkString>> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Human-readable type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "boolean",
            Value::Nil => "nil",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Function(_) => "function",
            Value::Native(_) => "native function",
            Value::Star => "*",
        }
    }
}

// Tags first; numbers and booleans by value; nil always equals nil; heap
// objects by handle identity. Identity is content equality for strings
// because they are interned.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Star, Value::Star) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Nil => f.write_str("nil"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Str(s) => f.write_str(&s.chars),
            Value::Function(function) => write!(f, "{function}"),
            Value::Native(native) => write!(f, "{native}"),
            Value::Star => f.write_str("*"),
        }
    }
}

//! Runtime value representation
//!
//! Shared value representation for the compiler's constant pool and the VM.
//! - Numbers, Bools, Null: immediate values
//! - Strings: heap-allocated, reference-counted (Arc<String>), immutable

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A runtime value
#[derive(Clone, PartialEq)]
pub enum Value {
    /// Floating point number (the only numeric type)
    Number(f64),
    /// Immutable string
    String(Arc<String>),
    /// Boolean
    Bool(bool),
    /// Absent value (implicit return of a unit function)
    Null,
}

impl Value {
    /// Create a string value
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(Arc::new(s.into()))
    }

    /// Human-readable name of the value's type, used in fault messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Bool(_) => "bool",
            Value::Null => "null",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => {
                // No trailing .0 for whole numbers
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::String(s) => write!(f, "{}", s.as_ref()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "Number({})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Null => write!(f, "Null"),
        }
    }
}

/// Runtime fault raised by the VM
///
/// Faults are fatal: execution halts at the faulting instruction and the VM
/// does not resume. Each variant carries the source line of the instruction
/// that faulted.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    /// Operand of the wrong type reached a typed instruction
    #[error("type mismatch: {msg}")]
    TypeMismatch { msg: String, line: u32 },
    /// Division or modulo by exact zero
    #[error("division by zero")]
    DivisionByZero { line: u32 },
    /// Read of a storage slot that was never written
    #[error("use of uninitialized value")]
    UninitializedSlot { line: u32 },
    /// Pop from an empty operand stack
    #[error("stack underflow")]
    StackUnderflow { line: u32 },
    /// Structurally impossible bytecode (compiler bug, not a user error)
    #[error("malformed program: {msg}")]
    MalformedProgram { msg: String, line: u32 },
    /// The output writer failed
    #[error("output error: {0}")]
    Output(String),
}

impl RuntimeError {
    /// Source line of the faulting instruction, where available
    pub fn line(&self) -> Option<u32> {
        match self {
            RuntimeError::TypeMismatch { line, .. }
            | RuntimeError::DivisionByZero { line }
            | RuntimeError::UninitializedSlot { line }
            | RuntimeError::StackUnderflow { line }
            | RuntimeError::MalformedProgram { line, .. } => Some(*line),
            RuntimeError::Output(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn whole_numbers_display_without_fraction() {
        assert_eq!(Value::Number(14.0).to_string(), "14");
        assert_eq!(Value::Number(-3.0).to_string(), "-3");
        assert_eq!(Value::Number(0.5).to_string(), "0.5");
    }

    #[test]
    fn bools_and_null_display() {
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Bool(false).to_string(), "false");
        assert_eq!(Value::Null.to_string(), "null");
    }

    #[test]
    fn strings_display_unquoted() {
        assert_eq!(Value::string("hi").to_string(), "hi");
    }

    #[test]
    fn fault_lines_are_reported() {
        let err = RuntimeError::DivisionByZero { line: 7 };
        assert_eq!(err.line(), Some(7));
        assert_eq!(err.to_string(), "division by zero");
    }
}

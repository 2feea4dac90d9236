//! Runtime errors for the Lark VM.
//!
//! Error display strings double as the user-facing messages the CLI
//! prints, so their exact wording is part of the observable contract
//! and is pinned by tests.

use thiserror::Error;

use lark_compiler::CompileErrors;
use lark_core::error::{ArrayError, DecodeError};

/// Errors raised while executing bytecode.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("Operands must be numbers.")]
    OperandsMustBeNumbers,

    #[error("Operands must be two numbers or two strings.")]
    AddTypeMismatch,

    #[error("Operand must be a number.")]
    OperandMustBeNumber,

    #[error("Operands for random must be two numbers.")]
    RandomOperandsMustBeNumbers,

    #[error("Undefined variable '{name}'.")]
    UndefinedVariable { name: String },

    #[error("Undefined array variable '{name}'.")]
    UndefinedArray { name: String },

    #[error("Expected {expected} arguments but got {got}.")]
    ArityMismatch { expected: u8, got: u8 },

    /// Either the value stack or the frame stack hit its cap.
    #[error("Stack overflow.")]
    StackOverflow,

    #[error("Can only call functions and classes.")]
    NotCallable,

    #[error(transparent)]
    Array(#[from] ArrayError),

    /// The instruction stream held a byte that is not an opcode.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Malformed bytecode: a pop with nothing on the stack.
    #[error("stack underflow")]
    StackUnderflow,

    /// Malformed bytecode: execution ran past the end of a chunk.
    #[error("instruction pointer past end of chunk")]
    EndOfChunk,

    /// Malformed bytecode: a constant index with no pooled value.
    #[error("constant index {0} out of range")]
    BadConstantIndex(u8),

    /// The `print` sink failed.
    #[error("output error: {0}")]
    Output(String),
}

/// A runtime failure with its call-stack trace, innermost frame first.
///
/// Each trace line is formatted `[line N] in script` or
/// `[line N] in name()`.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{error}")]
pub struct VmError {
    pub error: RuntimeError,
    pub trace: Vec<String>,
}

/// Top-level outcome of interpreting a source string.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpretError {
    #[error(transparent)]
    Compile(#[from] CompileErrors),
    #[error(transparent)]
    Runtime(#[from] VmError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formats() {
        assert_eq!(
            RuntimeError::OperandsMustBeNumbers.to_string(),
            "Operands must be numbers."
        );
        assert_eq!(
            RuntimeError::UndefinedVariable {
                name: "x".to_string()
            }
            .to_string(),
            "Undefined variable 'x'."
        );
        assert_eq!(
            RuntimeError::ArityMismatch {
                expected: 2,
                got: 3
            }
            .to_string(),
            "Expected 2 arguments but got 3."
        );
        assert_eq!(RuntimeError::StackOverflow.to_string(), "Stack overflow.");
        assert_eq!(
            RuntimeError::RandomOperandsMustBeNumbers.to_string(),
            "Operands for random must be two numbers."
        );
    }

    #[test]
    fn array_error_passes_through() {
        let error: RuntimeError = ArrayError::SubscriptOutOfBounds {
            value: 9,
            low: 1,
            high: 5,
        }
        .into();
        assert_eq!(
            error.to_string(),
            "Subscript value 9 is not in array bounds between 1 and 5."
        );
    }

    #[test]
    fn vm_error_displays_inner_message() {
        let error = VmError {
            error: RuntimeError::NotCallable,
            trace: vec!["[line 1] in script".to_string()],
        };
        assert_eq!(error.to_string(), "Can only call functions and classes.");
    }
}

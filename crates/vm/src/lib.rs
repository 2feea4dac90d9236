//! Lark virtual machine — compiles and executes Lark source.
//!
//! The VM is a stack machine:
//! - An operand stack shared by all call frames; each frame's locals
//!   alias a window of it starting at the frame base
//! - A call-frame stack capped at 64 frames
//! - Global tables for variables and array variables, persistent across
//!   `interpret` calls
//!
//! # Usage
//!
//! ```
//! use lark_vm::Vm;
//!
//! let mut out = Vec::new();
//! let mut vm = Vm::new(&mut out);
//! vm.interpret("print 1 + 2;").unwrap();
//! drop(vm);
//! assert_eq!(String::from_utf8(out).unwrap(), "3\n");
//! ```

pub mod error;
pub mod execute;
pub mod machine;

pub use error::{InterpretError, RuntimeError, VmError};
pub use machine::{Vm, FRAMES_MAX, STACK_MAX};

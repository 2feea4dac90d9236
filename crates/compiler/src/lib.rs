//! Lark source-to-bytecode compiler.
//!
//! A scanner ([`scanner`]) feeds a single-pass Pratt parser
//! ([`compile`]) that emits instructions directly into [`lark_core`]
//! chunks; there is no intermediate tree. The entry point is
//! [`compile::compile`], which returns the top-level script as a
//! [`lark_core::Function`] or every diagnostic the pass collected.

pub mod compile;
pub mod error;
pub mod scanner;

pub use compile::compile;
pub use error::{CompileErrors, Diagnostic, Location};

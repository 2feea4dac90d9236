//! Compile-time diagnostics.

use std::fmt;

use thiserror::Error;

/// Where in the token stream a diagnostic points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// At a concrete token; carries its lexeme.
    At(String),
    /// At end of input.
    End,
    /// No token context (error tokens carry the message themselves).
    None,
}

/// One compile error, formatted like `[line 3] Error at 'x': message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: u32,
    pub location: Location,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] Error", self.line)?;
        match &self.location {
            Location::At(lexeme) => write!(f, " at '{lexeme}'")?,
            Location::End => write!(f, " at end")?,
            Location::None => {}
        }
        write!(f, ": {}", self.message)
    }
}

/// All diagnostics from one compilation, in source order.
///
/// Compilation runs to end of input even after the first error, so a
/// single pass can report several problems. Displays one diagnostic per
/// line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct CompileErrors {
    pub diagnostics: Vec<Diagnostic>,
}

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

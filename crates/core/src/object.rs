//! Heap objects: interned strings, functions, and native functions.
//!
//! The C original threaded every heap object onto an intrusive list for a
//! collector that never shipped. Here objects are plain `Rc` handles;
//! everything lives until the VM drops its last reference at teardown.

use std::fmt;
use std::rc::Rc;

use crate::chunk::Chunk;
use crate::table::Table;
use crate::value::Value;

/// An interned string: the characters plus a precomputed FNV-1a hash.
///
/// Interning guarantees at most one live instance per distinct content,
/// so equality anywhere else in the runtime is `Rc::ptr_eq`.
#[derive(Debug)]
pub struct LarkString {
    pub chars: String,
    pub hash: u32,
}

impl fmt::Display for LarkString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.chars)
    }
}

/// 32-bit FNV-1a, the hash the interning table probes with.
pub fn hash_string(chars: &str) -> u32 {
    let mut hash = 2166136261u32;
    for byte in chars.bytes() {
        hash ^= byte as u32;
        hash = hash.wrapping_mul(16777619);
    }
    hash
}

/// The string-interning set. Keys are the strings themselves; values are
/// ignored.
#[derive(Debug, Default)]
pub struct Strings {
    table: Table,
}

impl Strings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the unique instance for `chars`, allocating only when the
    /// content has never been seen.
    pub fn intern(&mut self, chars: &str) -> Rc<LarkString> {
        let hash = hash_string(chars);
        if let Some(existing) = self.table.find_string(chars, hash) {
            return existing;
        }
        let string = Rc::new(LarkString {
            chars: chars.to_string(),
            hash,
        });
        self.table.set(Rc::clone(&string), Value::Nil);
        string
    }
}

/// A compiled function: its arity, its bytecode, and its name.
///
/// `name` is `None` for the implicit top-level script.
#[derive(Debug)]
pub struct Function {
    pub name: Option<Rc<LarkString>>,
    pub arity: u8,
    pub chunk: Chunk,
}

impl Function {
    pub fn new_script() -> Self {
        Self {
            name: None,
            arity: 0,
            chunk: Chunk::new(),
        }
    }

    pub fn named(name: Rc<LarkString>) -> Self {
        Self {
            name: Some(name),
            arity: 0,
            chunk: Chunk::new(),
        }
    }

    /// The name used in diagnostics and stack traces.
    pub fn display_name(&self) -> &str {
        match &self.name {
            Some(name) => &name.chars,
            None => "script",
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "<fn {}>", name.chars),
            None => f.write_str("<script>"),
        }
    }
}

/// Signature for a native (host-provided) function.
pub type NativeFn = fn(args: &[Value]) -> Value;

/// A native function registered with the VM under an interned name.
pub struct NativeFunction {
    pub name: Rc<LarkString>,
    pub function: NativeFn,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name.chars)
            .finish()
    }
}

impl fmt::Display for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<native fn>")
    }
}

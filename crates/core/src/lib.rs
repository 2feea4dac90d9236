//! Lark core types and bytecode representation.
//!
//! This crate provides the foundational data structures shared by the
//! compiler and the virtual machine:
//!
//! - [`OpCode`] and [`Chunk`] — the instruction set and one function's
//!   compiled instruction stream
//! - [`Value`] — runtime value representation for the VM stack
//! - [`LarkString`] and [`Strings`] — interned, hash-cached strings
//! - [`Table`] — open-addressing hash table keyed by interned strings
//! - [`ArrayStore`] — the slot arena for global array variables
//! - [`disassemble`] — human-readable chunk listings
//!
//! # Dependencies
//!
//! This crate uses `thiserror` (compile-time proc-macro, zero runtime cost)
//! and has no other dependencies.

pub mod array;
pub mod chunk;
pub mod disassemble;
pub mod error;
pub mod object;
pub mod table;
pub mod value;

// Re-export commonly used types at the crate root.
pub use array::{ArrayStore, ArrayVariable, MAX_ARRAY_DIMENSIONS, MAX_ARRAY_VARIABLES};
pub use chunk::{Chunk, OpCode};
pub use error::{ArrayError, DecodeError};
pub use object::{Function, LarkString, NativeFn, NativeFunction, Strings};
pub use table::Table;
pub use value::Value;

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    /// Strategy that generates a random valid OpCode.
    fn arb_opcode() -> impl Strategy<Value = OpCode> {
        prop::sample::select(&chunk::ALL_OPCODES[..])
    }

    proptest! {
        /// For all valid opcodes, the byte value round-trips.
        #[test]
        fn opcode_byte_roundtrip(op in arb_opcode()) {
            let byte = op as u8;
            prop_assert_eq!(OpCode::try_from(byte).unwrap(), op);
        }

        /// For any byte, conversion either yields an opcode with that
        /// byte value or a specific DecodeError.
        #[test]
        fn random_byte_decode(byte in any::<u8>()) {
            match OpCode::try_from(byte) {
                Ok(op) => prop_assert_eq!(op as u8, byte),
                Err(DecodeError::IllegalOpcode) => prop_assert_eq!(byte, 0x00),
                Err(DecodeError::UnknownOpcode(b)) => prop_assert_eq!(b, byte),
            }
        }

        /// The table agrees with a HashMap model under a random sequence
        /// of inserts and deletes.
        #[test]
        fn table_matches_hashmap_model(
            ops in prop::collection::vec((0u8..16, any::<bool>(), any::<i16>()), 0..200)
        ) {
            let mut strings = Strings::new();
            let mut table = Table::new();
            let mut model: HashMap<String, Value> = HashMap::new();

            for (key_id, insert, payload) in ops {
                let name = format!("k{key_id}");
                let key = strings.intern(&name);
                if insert {
                    table.set(key, Value::Number(payload as f64));
                    model.insert(name, Value::Number(payload as f64));
                } else {
                    table.delete(&key);
                    model.remove(&name);
                }
            }

            for key_id in 0..16u8 {
                let name = format!("k{key_id}");
                let key = strings.intern(&name);
                prop_assert_eq!(table.get(&key), model.get(&name).cloned());
            }
        }

        /// Interning the same text twice always yields the same pointer.
        #[test]
        fn interning_is_idempotent(text in "[a-z]{0,12}") {
            let mut strings = Strings::new();
            let a = strings.intern(&text);
            let b = strings.intern(&text);
            prop_assert!(std::rc::Rc::ptr_eq(&a, &b));
        }
    }
}

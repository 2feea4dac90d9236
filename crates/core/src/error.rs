//! Error types shared by the bytecode reader and the array subsystem.

use thiserror::Error;

/// Errors that occur while decoding an opcode byte.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Opcode 0x00 is reserved so that zeroed memory is never a valid
    /// instruction.
    #[error("illegal opcode 0x00")]
    IllegalOpcode,

    /// Byte value outside the defined opcode set.
    #[error("unknown opcode: {0:#04x}")]
    UnknownOpcode(u8),
}

/// Errors raised by array definition and bounds-checked element access.
///
/// The VM converts these into runtime errors; the messages are the text
/// the user sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArrayError {
    /// A subscript fell outside the declared bounds of its axis.
    #[error("Subscript value {value} is not in array bounds between {low} and {high}.")]
    SubscriptOutOfBounds { value: i32, low: i32, high: i32 },

    /// The number of subscripts supplied does not match the declared
    /// dimension count.
    #[error("Expected {expected} subscripts but got {got}.")]
    DimensionMismatch { expected: usize, got: usize },

    /// A subscript expression evaluated to something other than a number
    /// or the `*` wildcard.
    #[error("Array subscript must be a number.")]
    SubscriptNotNumber,

    /// The `*` wildcard only makes sense for slice assignment; a read has
    /// no single element to produce.
    #[error("Wildcard subscript is not allowed when reading an array.")]
    WildcardRead,

    /// The store's registration cap was reached.
    #[error("Too many array variables.")]
    TooManyArrays,
}

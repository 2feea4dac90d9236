//! Bytecode chunks and the opcode set.
//!
//! A chunk is one function's instruction stream: a dense byte sequence, a
//! parallel source-line sequence of equal length, and a constant pool.
//! Jump operands are 16-bit big-endian relative offsets; array definition
//! carries a variable-length self-describing operand block.

use crate::error::DecodeError;
use crate::value::Value;

/// Single-byte instruction tag dispatched by the VM.
///
/// `#[repr(u8)]` keeps byte values stable. Byte 0x00 is deliberately
/// unassigned so zeroed memory never decodes as an instruction.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpCode {
    /// Push a pooled constant. Operand: 1-byte constant index.
    Constant = 0x01,
    /// Push nil.
    Nil = 0x02,
    /// Push true.
    True = 0x03,
    /// Push false.
    False = 0x04,
    /// Discard the top of stack.
    Pop = 0x05,

    /// Push the value in a frame-relative slot. Operand: 1-byte slot.
    GetLocal = 0x06,
    /// Overwrite a frame-relative slot with the top of stack (not popped).
    SetLocal = 0x07,
    /// Push a global looked up by name. Operand: 1-byte constant index.
    GetGlobal = 0x08,
    /// Bind the top of stack to a global name, then pop it.
    DefineGlobal = 0x09,
    /// Overwrite an existing global (error if never defined).
    SetGlobal = 0x0a,

    /// Pop two values, push their equality as a boolean.
    Equal = 0x10,
    /// Pop two numbers, push a > b.
    Greater = 0x11,
    /// Pop two numbers, push a < b.
    Less = 0x12,
    /// Add two numbers or concatenate two strings.
    Add = 0x13,
    Subtract = 0x14,
    Multiply = 0x15,
    Divide = 0x16,
    /// Pop one value, push its falsiness.
    Not = 0x17,
    /// Pop a number, push its negation.
    Negate = 0x18,
    /// Pop two numeric bounds (either order), push a uniform integer
    /// between them inclusive.
    Random = 0x19,

    /// Pop and print the top of stack.
    Print = 0x20,
    /// Unconditional forward jump. Operand: 2-byte big-endian offset.
    Jump = 0x21,
    /// Forward jump when the (peeked, not popped) top of stack is falsey.
    JumpIfFalse = 0x22,
    /// Backward jump. Operand: 2-byte big-endian offset.
    Loop = 0x23,
    /// Call the value below `argCount` stack slots. Operand: 1-byte count.
    Call = 0x24,
    /// Pop the result, discard the frame, push the result for the caller.
    Return = 0x25,

    /// Push the array-subscript wildcard marker.
    Star = 0x30,
    /// Allocate and register a global array from a self-describing operand
    /// block: name index, dimension count, element count (u16), then per
    /// dimension a lower and upper bound (i16 each), all big-endian.
    DefineGlobalArray = 0x31,
    /// Bounds-checked element read. Operands: name index, subscript count.
    GetGlobalArray = 0x32,
    /// Bounds-checked element write or wildcard slice-fill. Operands:
    /// name index, subscript count.
    SetGlobalArray = 0x33,
}

/// All valid opcodes, in byte order. Useful for exhaustive testing.
pub const ALL_OPCODES: [OpCode; 30] = [
    OpCode::Constant,
    OpCode::Nil,
    OpCode::True,
    OpCode::False,
    OpCode::Pop,
    OpCode::GetLocal,
    OpCode::SetLocal,
    OpCode::GetGlobal,
    OpCode::DefineGlobal,
    OpCode::SetGlobal,
    OpCode::Equal,
    OpCode::Greater,
    OpCode::Less,
    OpCode::Add,
    OpCode::Subtract,
    OpCode::Multiply,
    OpCode::Divide,
    OpCode::Not,
    OpCode::Negate,
    OpCode::Random,
    OpCode::Print,
    OpCode::Jump,
    OpCode::JumpIfFalse,
    OpCode::Loop,
    OpCode::Call,
    OpCode::Return,
    OpCode::Star,
    OpCode::DefineGlobalArray,
    OpCode::GetGlobalArray,
    OpCode::SetGlobalArray,
];

impl TryFrom<u8> for OpCode {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Err(DecodeError::IllegalOpcode),
            0x01 => Ok(OpCode::Constant),
            0x02 => Ok(OpCode::Nil),
            0x03 => Ok(OpCode::True),
            0x04 => Ok(OpCode::False),
            0x05 => Ok(OpCode::Pop),
            0x06 => Ok(OpCode::GetLocal),
            0x07 => Ok(OpCode::SetLocal),
            0x08 => Ok(OpCode::GetGlobal),
            0x09 => Ok(OpCode::DefineGlobal),
            0x0a => Ok(OpCode::SetGlobal),
            0x10 => Ok(OpCode::Equal),
            0x11 => Ok(OpCode::Greater),
            0x12 => Ok(OpCode::Less),
            0x13 => Ok(OpCode::Add),
            0x14 => Ok(OpCode::Subtract),
            0x15 => Ok(OpCode::Multiply),
            0x16 => Ok(OpCode::Divide),
            0x17 => Ok(OpCode::Not),
            0x18 => Ok(OpCode::Negate),
            0x19 => Ok(OpCode::Random),
            0x20 => Ok(OpCode::Print),
            0x21 => Ok(OpCode::Jump),
            0x22 => Ok(OpCode::JumpIfFalse),
            0x23 => Ok(OpCode::Loop),
            0x24 => Ok(OpCode::Call),
            0x25 => Ok(OpCode::Return),
            0x30 => Ok(OpCode::Star),
            0x31 => Ok(OpCode::DefineGlobalArray),
            0x32 => Ok(OpCode::GetGlobalArray),
            0x33 => Ok(OpCode::SetGlobalArray),
            other => Err(DecodeError::UnknownOpcode(other)),
        }
    }
}

impl OpCode {
    /// Returns the disassembly mnemonic for this opcode.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            OpCode::Constant => "OP_CONSTANT",
            OpCode::Nil => "OP_NIL",
            OpCode::True => "OP_TRUE",
            OpCode::False => "OP_FALSE",
            OpCode::Pop => "OP_POP",
            OpCode::GetLocal => "OP_GET_LOCAL",
            OpCode::SetLocal => "OP_SET_LOCAL",
            OpCode::GetGlobal => "OP_GET_GLOBAL",
            OpCode::DefineGlobal => "OP_DEFINE_GLOBAL",
            OpCode::SetGlobal => "OP_SET_GLOBAL",
            OpCode::Equal => "OP_EQUAL",
            OpCode::Greater => "OP_GREATER",
            OpCode::Less => "OP_LESS",
            OpCode::Add => "OP_ADD",
            OpCode::Subtract => "OP_SUBTRACT",
            OpCode::Multiply => "OP_MULTIPLY",
            OpCode::Divide => "OP_DIVIDE",
            OpCode::Not => "OP_NOT",
            OpCode::Negate => "OP_NEGATE",
            OpCode::Random => "OP_RANDOM",
            OpCode::Print => "OP_PRINT",
            OpCode::Jump => "OP_JUMP",
            OpCode::JumpIfFalse => "OP_JUMP_IF_FALSE",
            OpCode::Loop => "OP_LOOP",
            OpCode::Call => "OP_CALL",
            OpCode::Return => "OP_RETURN",
            OpCode::Star => "OP_STAR",
            OpCode::DefineGlobalArray => "OP_DEFINE_GLOBAL_ARRAY",
            OpCode::GetGlobalArray => "OP_GET_GLOBAL_ARRAY",
            OpCode::SetGlobalArray => "OP_SET_GLOBAL_ARRAY",
        }
    }
}

/// One function's compiled instruction stream.
#[derive(Debug, Default)]
pub struct Chunk {
    pub code: Vec<u8>,
    /// Source line for each byte in `code`; always the same length.
    pub lines: Vec<u32>,
    pub constants: Vec<Value>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one byte and record the source line it came from.
    pub fn write(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.write(op as u8, line);
    }

    /// Append a value to the constant pool and return its index. The
    /// compiler enforces the one-byte operand limit.
    pub fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_roundtrip() {
        for &op in &ALL_OPCODES {
            let byte = op as u8;
            assert_eq!(OpCode::try_from(byte), Ok(op), "roundtrip for {op:?}");
        }
    }

    #[test]
    fn illegal_opcode_zero() {
        assert_eq!(OpCode::try_from(0x00), Err(DecodeError::IllegalOpcode));
    }

    #[test]
    fn unknown_bytes_are_rejected() {
        for byte in [0x0bu8, 0x0f, 0x1a, 0x26, 0x34, 0xff] {
            assert_eq!(
                OpCode::try_from(byte),
                Err(DecodeError::UnknownOpcode(byte)),
                "byte {byte:#04x}"
            );
        }
    }

    #[test]
    fn every_byte_resolves_without_panic() {
        for byte in 0..=255u8 {
            let _ = OpCode::try_from(byte);
        }
    }

    #[test]
    fn mnemonics_are_nonempty_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for &op in &ALL_OPCODES {
            let m = op.mnemonic();
            assert!(!m.is_empty());
            assert!(seen.insert(m), "duplicate mnemonic {m}");
        }
    }

    #[test]
    fn write_keeps_code_and_lines_parallel() {
        let mut chunk = Chunk::new();
        chunk.write_op(OpCode::Nil, 1);
        chunk.write_op(OpCode::Constant, 2);
        chunk.write(0, 2);
        assert_eq!(chunk.code.len(), chunk.lines.len());
        assert_eq!(chunk.lines, vec![1, 2, 2]);
    }

    #[test]
    fn add_constant_returns_sequential_indices() {
        let mut chunk = Chunk::new();
        assert_eq!(chunk.add_constant(Value::Number(1.0)), 0);
        assert_eq!(chunk.add_constant(Value::Number(2.0)), 1);
        assert_eq!(chunk.constants.len(), 2);
    }
}

//! Disassembler: compiled chunk → human-readable listing.
//!
//! One instruction per line: a four-digit byte offset, the source line
//! (or `|` when it repeats the previous instruction's line), the opcode
//! mnemonic, then any operands. Constant operands also print the
//! referenced value.

use std::fmt::Write;

use crate::chunk::{Chunk, OpCode};

/// Disassemble a whole chunk under a heading.
pub fn disassemble_chunk(chunk: &Chunk, name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {name} ==");
    let mut offset = 0;
    while offset < chunk.code.len() {
        offset = disassemble_instruction(&mut out, chunk, offset);
    }
    out
}

/// Disassemble the instruction at `offset`, appending its listing line
/// to `out`. Returns the offset of the next instruction.
pub fn disassemble_instruction(out: &mut String, chunk: &Chunk, offset: usize) -> usize {
    let _ = write!(out, "{offset:04} ");
    if offset > 0 && chunk.lines[offset] == chunk.lines[offset - 1] {
        let _ = write!(out, "   | ");
    } else {
        let _ = write!(out, "{:4} ", chunk.lines[offset]);
    }

    let op = match OpCode::try_from(chunk.code[offset]) {
        Ok(op) => op,
        Err(_) => {
            let _ = writeln!(out, "Unknown opcode {}", chunk.code[offset]);
            return offset + 1;
        }
    };

    match op {
        // No operands.
        OpCode::Nil
        | OpCode::True
        | OpCode::False
        | OpCode::Pop
        | OpCode::Equal
        | OpCode::Greater
        | OpCode::Less
        | OpCode::Add
        | OpCode::Subtract
        | OpCode::Multiply
        | OpCode::Divide
        | OpCode::Not
        | OpCode::Negate
        | OpCode::Random
        | OpCode::Print
        | OpCode::Return
        | OpCode::Star => {
            let _ = writeln!(out, "{}", op.mnemonic());
            offset + 1
        }

        // One byte: constant table index.
        OpCode::Constant | OpCode::GetGlobal | OpCode::DefineGlobal | OpCode::SetGlobal => {
            let index = chunk.code[offset + 1];
            let _ = writeln!(
                out,
                "{:<16} {:4} '{}'",
                op.mnemonic(),
                index,
                chunk.constants[index as usize]
            );
            offset + 2
        }

        // One byte: stack slot or argument count.
        OpCode::GetLocal | OpCode::SetLocal | OpCode::Call => {
            let slot = chunk.code[offset + 1];
            let _ = writeln!(out, "{:<16} {slot:4}", op.mnemonic());
            offset + 2
        }

        // Two bytes: big-endian jump distance.
        OpCode::Jump | OpCode::JumpIfFalse | OpCode::Loop => {
            let distance =
                u16::from_be_bytes([chunk.code[offset + 1], chunk.code[offset + 2]]) as usize;
            let target = if op == OpCode::Loop {
                offset + 3 - distance
            } else {
                offset + 3 + distance
            };
            let _ = writeln!(out, "{:<16} {offset:4} -> {target}", op.mnemonic());
            offset + 3
        }

        // Name index, subscript count.
        OpCode::GetGlobalArray | OpCode::SetGlobalArray => {
            let index = chunk.code[offset + 1];
            let subscripts = chunk.code[offset + 2];
            let _ = writeln!(
                out,
                "{:<16} {:4} '{}' subs {}",
                op.mnemonic(),
                index,
                chunk.constants[index as usize],
                subscripts
            );
            offset + 3
        }

        // Name index, dimension count, element count, then lo/hi i16
        // pairs per dimension.
        OpCode::DefineGlobalArray => {
            let index = chunk.code[offset + 1];
            let dims = chunk.code[offset + 2] as usize;
            let elements =
                u16::from_be_bytes([chunk.code[offset + 3], chunk.code[offset + 4]]);
            let _ = write!(
                out,
                "{:<16} {:4} '{}' dims {} elems {}",
                op.mnemonic(),
                index,
                chunk.constants[index as usize],
                dims,
                elements
            );
            let mut cursor = offset + 5;
            for _ in 0..dims {
                let lo = i16::from_be_bytes([chunk.code[cursor], chunk.code[cursor + 1]]);
                let hi = i16::from_be_bytes([chunk.code[cursor + 2], chunk.code[cursor + 3]]);
                let _ = write!(out, " [{lo}:{hi}]");
                cursor += 4;
            }
            let _ = writeln!(out);
            cursor
        }
    }
}

//! Main execution loop and opcode dispatch for the Lark VM.

use std::io::Write;
use std::rc::Rc;

use lark_core::chunk::OpCode;
use lark_core::object::LarkString;
use lark_core::value::Value;

use crate::error::RuntimeError;
use crate::machine::Vm;

impl Vm<'_> {
    /// Run the current script frame to completion.
    pub(crate) fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            let op = OpCode::try_from(self.read_byte()?)?;
            match op {
                OpCode::Constant => {
                    let value = self.read_constant()?;
                    self.push(value)?;
                }
                OpCode::Nil => self.push(Value::Nil)?,
                OpCode::True => self.push(Value::Bool(true))?,
                OpCode::False => self.push(Value::Bool(false))?,
                OpCode::Star => self.push(Value::Star)?,
                OpCode::Pop => {
                    self.pop()?;
                }

                OpCode::GetLocal => {
                    let slot = self.read_byte()? as usize;
                    let base = self.frame_base()?;
                    let value = self
                        .stack
                        .get(base + slot)
                        .cloned()
                        .ok_or(RuntimeError::StackUnderflow)?;
                    self.push(value)?;
                }
                OpCode::SetLocal => {
                    let slot = self.read_byte()? as usize;
                    let base = self.frame_base()?;
                    let value = self.peek(0)?.clone();
                    *self
                        .stack
                        .get_mut(base + slot)
                        .ok_or(RuntimeError::StackUnderflow)? = value;
                }
                OpCode::GetGlobal => {
                    let name = self.read_string_constant()?;
                    let value = self.globals.get(&name).ok_or_else(|| {
                        RuntimeError::UndefinedVariable {
                            name: name.chars.clone(),
                        }
                    })?;
                    self.push(value)?;
                }
                OpCode::DefineGlobal => {
                    let name = self.read_string_constant()?;
                    let value = self.peek(0)?.clone();
                    self.globals.set(name, value);
                    self.pop()?;
                }
                OpCode::SetGlobal => {
                    let name = self.read_string_constant()?;
                    let value = self.peek(0)?.clone();
                    if self.globals.set(name.clone(), value) {
                        // Assignment never creates a global; undo it.
                        self.globals.delete(&name);
                        return Err(RuntimeError::UndefinedVariable {
                            name: name.chars.clone(),
                        });
                    }
                }

                OpCode::Equal => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.push(Value::Bool(a == b))?;
                }
                OpCode::Greater => self.exec_number_binary(|a, b| Value::Bool(a > b))?,
                OpCode::Less => self.exec_number_binary(|a, b| Value::Bool(a < b))?,
                OpCode::Add => self.exec_add()?,
                OpCode::Subtract => self.exec_number_binary(|a, b| Value::Number(a - b))?,
                OpCode::Multiply => self.exec_number_binary(|a, b| Value::Number(a * b))?,
                OpCode::Divide => self.exec_number_binary(|a, b| Value::Number(a / b))?,
                OpCode::Not => {
                    let value = self.pop()?;
                    self.push(Value::Bool(value.is_falsey()))?;
                }
                OpCode::Negate => {
                    let value = self.pop()?;
                    let number = value
                        .as_number()
                        .ok_or(RuntimeError::OperandMustBeNumber)?;
                    self.push(Value::Number(-number))?;
                }
                OpCode::Random => self.exec_random()?,

                OpCode::Print => {
                    let value = self.pop()?;
                    writeln!(self.out, "{value}")
                        .map_err(|e| RuntimeError::Output(e.to_string()))?;
                }

                OpCode::Jump => {
                    let offset = self.read_u16()? as usize;
                    self.frame_ip_add(offset)?;
                }
                OpCode::JumpIfFalse => {
                    let offset = self.read_u16()? as usize;
                    if self.peek(0)?.is_falsey() {
                        self.frame_ip_add(offset)?;
                    }
                }
                OpCode::Loop => {
                    let offset = self.read_u16()? as usize;
                    self.frame_ip_sub(offset)?;
                }
                OpCode::Call => {
                    let arg_count = self.read_byte()?;
                    let callee = self.peek(arg_count as usize)?.clone();
                    self.call_value(callee, arg_count)?;
                }
                OpCode::Return => {
                    let result = self.pop()?;
                    let frame = self.frames.pop().ok_or(RuntimeError::StackUnderflow)?;
                    if self.frames.is_empty() {
                        // Script frame done; discard the script function.
                        self.pop()?;
                        return Ok(());
                    }
                    self.stack.truncate(frame.base);
                    self.push(result)?;
                }

                OpCode::DefineGlobalArray => self.exec_define_array()?,
                OpCode::GetGlobalArray => self.exec_array_get()?,
                OpCode::SetGlobalArray => self.exec_array_set()?,
            }
        }
    }

    fn exec_add(&mut self) -> Result<(), RuntimeError> {
        let b = self.pop()?;
        let a = self.pop()?;
        match (&a, &b) {
            (Value::Number(a), Value::Number(b)) => self.push(Value::Number(a + b)),
            (Value::Str(a), Value::Str(b)) => {
                let joined = format!("{}{}", a.chars, b.chars);
                let interned = self.strings.intern(&joined);
                self.push(Value::Str(interned))
            }
            _ => Err(RuntimeError::AddTypeMismatch),
        }
    }

    fn exec_number_binary(
        &mut self,
        op: fn(f64, f64) -> Value,
    ) -> Result<(), RuntimeError> {
        let b = self.pop()?;
        let a = self.pop()?;
        match (a.as_number(), b.as_number()) {
            (Some(a), Some(b)) => self.push(op(a, b)),
            _ => Err(RuntimeError::OperandsMustBeNumbers),
        }
    }

    /// `a ? b`: uniform random integer between the truncated bounds,
    /// inclusive, in either order.
    fn exec_random(&mut self) -> Result<(), RuntimeError> {
        let b = self.pop()?;
        let a = self.pop()?;
        let (Some(a), Some(b)) = (a.as_number(), b.as_number()) else {
            return Err(RuntimeError::RandomOperandsMustBeNumbers);
        };
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let (lo, hi) = (lo.trunc() as i64, hi.trunc() as i64);
        self.push(Value::Number(fastrand::i64(lo..=hi) as f64))
    }

    fn exec_define_array(&mut self) -> Result<(), RuntimeError> {
        let name = self.read_string_constant()?;
        let dimensions = self.read_byte()? as usize;
        let _element_count = self.read_u16()?;
        let mut bounds = Vec::with_capacity(dimensions);
        for _ in 0..dimensions {
            let low = self.read_i16()? as i32;
            let high = self.read_i16()? as i32;
            bounds.push((low, high));
        }
        let slot = self.arrays.define(name.clone(), bounds)?;
        self.array_globals.set(name, Value::Number(slot as f64));
        Ok(())
    }

    fn exec_array_get(&mut self) -> Result<(), RuntimeError> {
        let name = self.read_string_constant()?;
        let count = self.read_byte()? as usize;
        let slot = self.array_slot(&name)?;
        let subscripts = self.pop_subscripts(count)?;
        let value = self.arrays.get(slot).get(&subscripts)?;
        self.push(value)
    }

    fn exec_array_set(&mut self) -> Result<(), RuntimeError> {
        let name = self.read_string_constant()?;
        let count = self.read_byte()? as usize;
        let slot = self.array_slot(&name)?;
        let value = self.pop()?;
        let subscripts = self.pop_subscripts(count)?;
        self.arrays.get_mut(slot).set(&subscripts, value.clone())?;
        // Assignment is an expression; the written value is its result.
        self.push(value)
    }

    fn array_slot(&self, name: &Rc<LarkString>) -> Result<usize, RuntimeError> {
        match self.array_globals.get(name) {
            Some(Value::Number(slot)) => Ok(slot as usize),
            _ => Err(RuntimeError::UndefinedArray {
                name: name.chars.clone(),
            }),
        }
    }

    /// Pop `count` subscripts pushed left to right, restoring source
    /// order.
    fn pop_subscripts(&mut self, count: usize) -> Result<Vec<Value>, RuntimeError> {
        let mut subscripts = Vec::with_capacity(count);
        for _ in 0..count {
            subscripts.push(self.pop()?);
        }
        subscripts.reverse();
        Ok(subscripts)
    }

    // --- instruction stream access ---

    fn read_byte(&mut self) -> Result<u8, RuntimeError> {
        let frame = self.frames.last_mut().ok_or(RuntimeError::EndOfChunk)?;
        let byte = frame
            .function
            .chunk
            .code
            .get(frame.ip)
            .copied()
            .ok_or(RuntimeError::EndOfChunk)?;
        frame.ip += 1;
        Ok(byte)
    }

    fn read_u16(&mut self) -> Result<u16, RuntimeError> {
        Ok(u16::from_be_bytes([self.read_byte()?, self.read_byte()?]))
    }

    fn read_i16(&mut self) -> Result<i16, RuntimeError> {
        Ok(i16::from_be_bytes([self.read_byte()?, self.read_byte()?]))
    }

    fn read_constant(&mut self) -> Result<Value, RuntimeError> {
        let index = self.read_byte()?;
        let frame = self.frames.last().ok_or(RuntimeError::EndOfChunk)?;
        frame
            .function
            .chunk
            .constants
            .get(index as usize)
            .cloned()
            .ok_or(RuntimeError::BadConstantIndex(index))
    }

    fn read_string_constant(&mut self) -> Result<Rc<LarkString>, RuntimeError> {
        let index = self.read_byte()?;
        let frame = self.frames.last().ok_or(RuntimeError::EndOfChunk)?;
        match frame.function.chunk.constants.get(index as usize) {
            Some(Value::Str(name)) => Ok(name.clone()),
            _ => Err(RuntimeError::BadConstantIndex(index)),
        }
    }

    fn frame_base(&self) -> Result<usize, RuntimeError> {
        self.frames
            .last()
            .map(|frame| frame.base)
            .ok_or(RuntimeError::EndOfChunk)
    }

    fn frame_ip_add(&mut self, offset: usize) -> Result<(), RuntimeError> {
        let frame = self.frames.last_mut().ok_or(RuntimeError::EndOfChunk)?;
        frame.ip += offset;
        Ok(())
    }

    fn frame_ip_sub(&mut self, offset: usize) -> Result<(), RuntimeError> {
        let frame = self.frames.last_mut().ok_or(RuntimeError::EndOfChunk)?;
        frame.ip = frame
            .ip
            .checked_sub(offset)
            .ok_or(RuntimeError::EndOfChunk)?;
        Ok(())
    }
}

//! VM state management: value stack, call frames, globals, natives.

use std::io::Write;
use std::rc::Rc;
use std::sync::OnceLock;
use std::time::Instant;

use lark_compiler::compile;
use lark_core::object::{Function, NativeFn, NativeFunction, Strings};
use lark_core::table::Table;
use lark_core::value::Value;
use lark_core::ArrayStore;

use crate::error::{InterpretError, RuntimeError, VmError};

/// Maximum call depth.
pub const FRAMES_MAX: usize = 64;
/// Maximum value-stack depth.
pub const STACK_MAX: usize = FRAMES_MAX * 256;

/// One active function invocation.
///
/// `base` indexes the slot holding the function value itself; arguments
/// occupy the slots directly above it, aliased as locals 1..=arity.
#[derive(Debug)]
pub struct CallFrame {
    pub function: Rc<Function>,
    pub ip: usize,
    pub base: usize,
}

/// The Lark virtual machine.
///
/// Globals, interned strings, and array variables persist across
/// [`Vm::interpret`] calls, so one machine can serve a whole REPL
/// session. `print` output goes to the supplied writer; diagnostics go
/// to stderr.
pub struct Vm<'out> {
    pub(crate) frames: Vec<CallFrame>,
    pub(crate) stack: Vec<Value>,
    pub(crate) globals: Table,
    pub(crate) strings: Strings,
    pub(crate) arrays: ArrayStore,
    /// Array name -> slot index in `arrays`, stored as a Number.
    pub(crate) array_globals: Table,
    pub(crate) out: &'out mut dyn Write,
}

impl<'out> Vm<'out> {
    pub fn new(out: &'out mut dyn Write) -> Self {
        let mut vm = Self {
            frames: Vec::new(),
            stack: Vec::new(),
            globals: Table::new(),
            strings: Strings::new(),
            arrays: ArrayStore::new(),
            array_globals: Table::new(),
            out,
        };
        vm.define_native("clock", clock_native);
        vm
    }

    /// Compile and run one source string.
    ///
    /// On a runtime error the message and call trace have already been
    /// printed to stderr and the stack reset, so the machine is safe to
    /// reuse (REPL behavior).
    pub fn interpret(&mut self, source: &str) -> Result<(), InterpretError> {
        let function = Rc::new(compile(source, &mut self.strings)?);
        match self.run_script(function) {
            Ok(()) => Ok(()),
            Err(error) => Err(self.runtime_error(error).into()),
        }
    }

    fn run_script(&mut self, function: Rc<Function>) -> Result<(), RuntimeError> {
        self.push(Value::Function(function.clone()))?;
        self.call(function, 0)?;
        self.run()
    }

    pub fn define_native(&mut self, name: &str, function: NativeFn) {
        let name = self.strings.intern(name);
        let native = NativeFunction {
            name: name.clone(),
            function,
        };
        self.globals.set(name, Value::Native(Rc::new(native)));
    }

    pub(crate) fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.stack.len() >= STACK_MAX {
            return Err(RuntimeError::StackOverflow);
        }
        self.stack.push(value);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or(RuntimeError::StackUnderflow)
    }

    /// Look at a value `distance` slots below the top without popping.
    pub(crate) fn peek(&self, distance: usize) -> Result<&Value, RuntimeError> {
        let index = self
            .stack
            .len()
            .checked_sub(1 + distance)
            .ok_or(RuntimeError::StackUnderflow)?;
        Ok(&self.stack[index])
    }

    pub(crate) fn call_value(
        &mut self,
        callee: Value,
        arg_count: u8,
    ) -> Result<(), RuntimeError> {
        match callee {
            Value::Function(function) => self.call(function, arg_count),
            Value::Native(native) => {
                let first = self
                    .stack
                    .len()
                    .checked_sub(arg_count as usize)
                    .ok_or(RuntimeError::StackUnderflow)?;
                let result = (native.function)(&self.stack[first..]);
                // Replace callee and arguments with the result.
                self.stack.truncate(first.saturating_sub(1));
                self.push(result)
            }
            _ => Err(RuntimeError::NotCallable),
        }
    }

    pub(crate) fn call(
        &mut self,
        function: Rc<Function>,
        arg_count: u8,
    ) -> Result<(), RuntimeError> {
        if arg_count != function.arity {
            return Err(RuntimeError::ArityMismatch {
                expected: function.arity,
                got: arg_count,
            });
        }
        if self.frames.len() == FRAMES_MAX {
            return Err(RuntimeError::StackOverflow);
        }
        let base = self
            .stack
            .len()
            .checked_sub(arg_count as usize + 1)
            .ok_or(RuntimeError::StackUnderflow)?;
        self.frames.push(CallFrame {
            function,
            ip: 0,
            base,
        });
        Ok(())
    }

    /// Report a runtime failure: print the message and trace to stderr,
    /// reset the machine, and package the error for the caller.
    pub(crate) fn runtime_error(&mut self, error: RuntimeError) -> VmError {
        let trace = self.stack_trace();
        eprintln!("{error}");
        for line in &trace {
            eprintln!("{line}");
        }
        self.stack.clear();
        self.frames.clear();
        VmError { error, trace }
    }

    fn stack_trace(&self) -> Vec<String> {
        self.frames
            .iter()
            .rev()
            .map(|frame| {
                let instruction = frame.ip.saturating_sub(1);
                let line = frame
                    .function
                    .chunk
                    .lines
                    .get(instruction)
                    .copied()
                    .unwrap_or(0);
                match &frame.function.name {
                    Some(name) => format!("[line {line}] in {}()", name.chars),
                    None => format!("[line {line}] in script"),
                }
            })
            .collect()
    }
}

static VM_EPOCH: OnceLock<Instant> = OnceLock::new();

/// Seconds of monotonic time since the first clock() call in this
/// process.
fn clock_native(_args: &[Value]) -> Value {
    let epoch = VM_EPOCH.get_or_init(Instant::now);
    Value::Number(epoch.elapsed().as_secs_f64())
}

//! CLI command implementations.

use std::fs;
use std::io::{self, BufRead, Write};

use lark_core::disassemble::disassemble_chunk;
use lark_core::object::{Function, Strings};
use lark_core::value::Value;
use lark_vm::{InterpretError, Vm};

/// Run a script file to completion.
pub fn run_file(path: &str) -> Result<(), i32> {
    let source = read_source(path)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut vm = Vm::new(&mut out);
    match vm.interpret(&source) {
        Ok(()) => Ok(()),
        Err(InterpretError::Compile(errors)) => {
            eprintln!("{errors}");
            Err(65)
        }
        // Message and trace already went to stderr.
        Err(InterpretError::Runtime(_)) => Err(70),
    }
}

/// Interactive prompt. Globals and arrays persist across lines; a blank
/// line or end of input exits.
pub fn repl() -> Result<(), i32> {
    let stdin = io::stdin();
    let mut sink = io::stdout();
    let mut vm = Vm::new(&mut sink);
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        let Some(Ok(line)) = lines.next() else {
            println!();
            return Ok(());
        };
        if line.trim().is_empty() {
            return Ok(());
        }
        match vm.interpret(&line) {
            Ok(()) | Err(InterpretError::Runtime(_)) => {}
            Err(InterpretError::Compile(errors)) => eprintln!("{errors}"),
        }
    }
}

/// Compile a script and dump every chunk, script first, then nested
/// functions in constant-pool order.
pub fn disassemble(path: &str) -> Result<(), i32> {
    let source = read_source(path)?;
    let mut strings = Strings::new();
    let function = lark_compiler::compile(&source, &mut strings).map_err(|errors| {
        eprintln!("{errors}");
        65
    })?;
    dump(&function);
    Ok(())
}

fn dump(function: &Function) {
    print!("{}", disassemble_chunk(&function.chunk, function.display_name()));
    for constant in &function.chunk.constants {
        if let Value::Function(nested) = constant {
            dump(nested);
        }
    }
}

fn read_source(path: &str) -> Result<String, i32> {
    fs::read_to_string(path).map_err(|_| {
        eprintln!("Could not open file \"{path}\".");
        74
    })
}

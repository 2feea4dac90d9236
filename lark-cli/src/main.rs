//! Lark CLI — run scripts, drive a REPL, dump bytecode.
//!
//! Exit codes:
//! - 0: Success
//! - 64: Usage error
//! - 65: Compile error
//! - 70: Runtime error
//! - 74: Could not read the script file

mod commands;

use std::process;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let result = match args.len() {
        1 => commands::repl(),
        2 if args[1] == "--disassemble" => {
            print_usage();
            Err(64)
        }
        2 => commands::run_file(&args[1]),
        3 if args[1] == "--disassemble" => commands::disassemble(&args[2]),
        _ => {
            print_usage();
            Err(64)
        }
    };

    if let Err(code) = result {
        process::exit(code);
    }
}

fn print_usage() {
    eprintln!("Usage: lark [script]");
    eprintln!("       lark --disassemble <script>");
}

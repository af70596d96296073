// File: src/main.rs
//
// Entry point: parses CLI arguments and dispatches to the run, repl, or
// disasm subcommand.

mod ast;
mod builtins;
mod code;
mod compiler;
mod errors;
mod lexer;
mod object;
mod parser;
mod repl;
mod symbol_table;
mod token;
mod vm;

use clap::{Parser as ClapParser, Subcommand};
use code::disassemble;
use colored::Colorize;
use compiler::Compiler;
use errors::{render_compile_error, render_runtime_error};
use lexer::tokenize;
use parser::Parser as LangParser;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use vm::VM;

#[derive(ClapParser)]
#[command(
    name = "monkeyvm",
    about = "A bytecode compiler and stack-based virtual machine for a small dynamic scripting language",
    version = env!("CARGO_PKG_VERSION"),
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
#[command(arg_required_else_help = true)]
enum Commands {
    /// Compile and run a script file
    Run {
        /// Path to the source file
        file: PathBuf,
    },

    /// Launch the interactive REPL
    Repl,

    /// Compile a script and print its disassembled bytecode
    Disasm {
        /// Path to the source file
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { file } => run_file(&file),
        Commands::Repl => run_repl(),
        Commands::Disasm { file } => run_disasm(&file),
    }
}

fn read_source(file: &PathBuf) -> Result<String, ExitCode> {
    fs::read_to_string(file).map_err(|err| {
        eprintln!("{}: could not read {}: {}", "Error".red().bold(), file.display(), err);
        ExitCode::FAILURE
    })
}

fn run_file(file: &PathBuf) -> ExitCode {
    let source = match read_source(file) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let tokens = tokenize(&source);
    let mut parser = LangParser::new(tokens);
    let program = parser.parse_program();

    if !parser.errors.is_empty() {
        eprintln!("ran into these parser errors:");
        for err in &parser.errors {
            eprintln!("\t{}", err);
        }
        return ExitCode::FAILURE;
    }

    let mut compiler = Compiler::new();
    if let Err(err) = compiler.compile(&program) {
        eprintln!("Woops, Compiler failed:\n {}\n", render_compile_error(&err));
        return ExitCode::FAILURE;
    }

    let bytecode = compiler.bytecode();
    let mut machine = VM::new(bytecode);
    let mut stdout = std::io::stdout();
    if let Err(err) = machine.run(&mut stdout) {
        eprintln!("Woops, VM failed:\n {}\n", render_runtime_error(&err));
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run_repl() -> ExitCode {
    match repl::Repl::new() {
        Ok(mut r) => match r.run() {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("{}: {}", "Error".red().bold(), err);
                ExitCode::FAILURE
            }
        },
        Err(err) => {
            eprintln!("{}: {}", "Error".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

fn run_disasm(file: &PathBuf) -> ExitCode {
    let source = match read_source(file) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let tokens = tokenize(&source);
    let mut parser = LangParser::new(tokens);
    let program = parser.parse_program();

    if !parser.errors.is_empty() {
        eprintln!("ran into these parser errors:");
        for err in &parser.errors {
            eprintln!("\t{}", err);
        }
        return ExitCode::FAILURE;
    }

    let mut compiler = Compiler::new();
    if let Err(err) = compiler.compile(&program) {
        eprintln!("Woops, Compiler failed:\n {}\n", render_compile_error(&err));
        return ExitCode::FAILURE;
    }

    let bytecode = compiler.bytecode();
    println!("{}", disassemble(&bytecode.instructions));
    for (idx, constant) in bytecode.constants.iter().enumerate() {
        if let object::Object::CompiledFunction(f) = constant {
            println!("CONSTANT {} CompiledFunction:", idx);
            println!("{}", disassemble(&f.instructions));
        }
    }

    ExitCode::SUCCESS
}

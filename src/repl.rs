// File: src/repl.rs
//
// Interactive read-eval-print loop. Reads one line at a time, compiles and
// runs it against persistent compiler/VM state, and prints the last value
// left on the stack. Line editing and history come from `rustyline`.

use crate::compiler::Compiler;
use crate::errors::{render_compile_error, render_runtime_error};
use crate::lexer;
use crate::parser::Parser;
use crate::symbol_table::SymbolTable;
use crate::vm::{self, VM};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

const PROMPT: &str = ">> ";

/// REPL session state that must survive across lines: the symbol table (so
/// later lines can see earlier `let`s), the accumulated constant pool, and
/// the globals array.
pub struct Repl {
    editor: DefaultEditor,
    symbol_table: SymbolTable,
    constants: Vec<crate::object::Object>,
    globals: Vec<crate::object::Object>,
}

impl Repl {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let editor = DefaultEditor::new()?;
        Ok(Repl::with_editor(editor))
    }

    fn with_editor(editor: DefaultEditor) -> Self {
        let mut symbol_table = SymbolTable::new();
        for (index, name) in crate::builtins::NAMES.iter().enumerate() {
            symbol_table.define_builtin(index, name);
        }
        Repl {
            editor,
            symbol_table,
            constants: Vec::new(),
            globals: vec![crate::object::Object::Null; vm::GLOBALS_SIZE],
        }
    }

    fn reset(&mut self) {
        let fresh = Repl::with_editor(DefaultEditor::new().expect("editor re-init"));
        self.symbol_table = fresh.symbol_table;
        self.constants = fresh.constants;
        self.globals = fresh.globals;
    }

    fn show_banner(&self) {
        println!("{}", "Monkey bytecode REPL".bright_cyan().bold());
        println!(
            "  type {} for commands, {} to leave",
            ":help".bright_yellow(),
            ":quit".bright_yellow()
        );
    }

    pub fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        self.show_banner();

        loop {
            let readline = self.editor.readline(PROMPT);
            match readline {
                Ok(line) => {
                    let trimmed = line.trim();
                    let _ = self.editor.add_history_entry(line.as_str());

                    match trimmed {
                        "" => continue,
                        ":quit" | ":exit" => break,
                        ":help" => {
                            self.show_help();
                            continue;
                        }
                        ":reset" => {
                            self.reset();
                            println!("state cleared");
                            continue;
                        }
                        _ => self.eval_line(&line),
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(err) => {
                    eprintln!("readline error: {}", err);
                    break;
                }
            }
        }

        Ok(())
    }

    fn show_help(&self) {
        println!(":help   show this message");
        println!(":reset  clear globals and symbol table");
        println!(":quit   leave the REPL");
    }

    fn eval_line(&mut self, line: &str) {
        let tokens = lexer::tokenize(line);
        let mut parser = Parser::new(tokens);
        let program = parser.parse_program();

        if !parser.errors.is_empty() {
            println!("ran into these parser errors:");
            for err in &parser.errors {
                println!("\t{}", err);
            }
            return;
        }

        let symbol_table = std::mem::take(&mut self.symbol_table);
        let constants = std::mem::take(&mut self.constants);
        let mut compiler = Compiler::new_with_state(symbol_table, constants);

        if let Err(err) = compiler.compile(&program) {
            println!("Woops, Compiler failed:\n {}\n", render_compile_error(&err));
            let (symbol_table, constants) = compiler.into_parts();
            self.symbol_table = symbol_table;
            self.constants = constants;
            return;
        }

        let bytecode = compiler.bytecode();
        self.constants = bytecode.constants.clone();

        let globals = std::mem::take(&mut self.globals);
        let mut machine = VM::new_with_global_store(bytecode, globals);

        let mut stdout = std::io::stdout();
        if let Err(err) = machine.run(&mut stdout) {
            println!("Woops, VM failed:\n {}\n", render_runtime_error(&err));
            self.globals = machine.into_globals();
            return;
        }

        let result = machine.last_popped_stack_element();
        println!("{}", result.inspect());
        self.globals = machine.into_globals();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered_before_first_line() {
        let repl = Repl::with_editor(DefaultEditor::new().unwrap());
        assert!(repl.symbol_table.resolve("len").is_some());
        assert!(repl.symbol_table.resolve("push").is_some());
    }
}

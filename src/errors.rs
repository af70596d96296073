// File: src/errors.rs
//
// Error types for both ends of the pipeline: compile-time and run-time.
// Hand-written Display + std::error::Error impls, colorized the way a
// terminal diagnostic should read, without a derive-macro dependency.

use colored::Colorize;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    UndefinedVariable(String),
    UnknownOperator(String),
    /// Sorting hash-literal keys by printed form requires a total order;
    /// every expression form allowed as a key prints totally, so this
    /// should never actually be constructed.
    HashKeyNotSortable,
    ConstantPoolOverflow,
    ReturnOutsideFunction,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::UndefinedVariable(name) => write!(f, "undefined variable {}", name),
            CompileError::UnknownOperator(op) => write!(f, "unknown operator {}", op),
            CompileError::HashKeyNotSortable => write!(f, "hash literal key has no total printed form"),
            CompileError::ConstantPoolOverflow => write!(f, "constant pool exceeded 65535 entries"),
            CompileError::ReturnOutsideFunction => write!(f, "return statement outside function body"),
        }
    }
}

impl std::error::Error for CompileError {}

#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    StackOverflow,
    FrameOverflow,
    UnsupportedBinaryOp(&'static str, &'static str),
    UnsupportedComparison(&'static str, &'static str),
    UnsupportedUnaryOp(&'static str),
    DivisionByZero,
    UnhashableKey(&'static str),
    IndexNotSupported(&'static str),
    NotCallable(&'static str),
    WrongArity(usize, usize),
    TypeMismatchInBuiltin(&'static str, &'static str),
    Builtin(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::StackOverflow => write!(f, "stack overflow"),
            RuntimeError::FrameOverflow => write!(f, "frame overflow"),
            RuntimeError::UnsupportedBinaryOp(l, r) => {
                write!(f, "unsupported types for binary operation: {} {}", l, r)
            }
            RuntimeError::UnsupportedComparison(l, r) => {
                write!(f, "unsupported types for comparison: {} {}", l, r)
            }
            RuntimeError::UnsupportedUnaryOp(t) => write!(f, "unsupported type for unary operation: {}", t),
            RuntimeError::DivisionByZero => write!(f, "division by zero"),
            RuntimeError::UnhashableKey(t) => write!(f, "unusable as hash key: {}", t),
            RuntimeError::IndexNotSupported(t) => write!(f, "index operator not supported: {}", t),
            RuntimeError::NotCallable(t) => write!(f, "calling non-function and non-built-in: {}", t),
            RuntimeError::WrongArity(want, got) => {
                write!(f, "wrong number of arguments. got={}, want={}", got, want)
            }
            RuntimeError::TypeMismatchInBuiltin(name, t) => {
                write!(f, "argument to `{}` not supported, got {}", name, t)
            }
            RuntimeError::Builtin(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Renders either error domain the way a terminal diagnostic should look:
/// a bold red kind label, then the message.
pub fn render(kind: &str, message: &str) -> String {
    format!("{}: {}", kind.red().bold(), message)
}

pub fn render_compile_error(err: &CompileError) -> String {
    render("Compile Error", &err.to_string())
}

pub fn render_runtime_error(err: &RuntimeError) -> String {
    render("Runtime Error", &err.to_string())
}

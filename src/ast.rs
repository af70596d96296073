// File: src/ast.rs
//
// Abstract syntax tree produced by the parser and consumed by the compiler.
// A closed sum type in both categories; compile-time dispatch is exhaustive
// pattern matching, never a visitor or dynamic dispatch.

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let { name: String, value: Expr },
    Return(Expr),
    Expr(Expr),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Identifier(String),
    IntegerLit(i64),
    BooleanLit(bool),
    StringLit(String),
    Null,
    ArrayLit(Vec<Expr>),
    HashLit(Vec<(Expr, Expr)>),
    Index {
        left: Box<Expr>,
        index: Box<Expr>,
    },
    Prefix {
        op: String,
        right: Box<Expr>,
    },
    Infix {
        op: String,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    If {
        condition: Box<Expr>,
        consequence: Vec<Stmt>,
        alternative: Option<Vec<Stmt>>,
    },
    FunctionLit {
        params: Vec<String>,
        body: Vec<Stmt>,
    },
    Call {
        function: Box<Expr>,
        args: Vec<Expr>,
    },
}

/// A parsed program is just its top-level statement sequence (the
/// distilled spec's `RootProgram` node).
pub type Program = Vec<Stmt>;

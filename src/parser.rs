// File: src/parser.rs
//
// Pratt (operator-precedence) parser: each token kind that can start an
// expression is handled by `parse_prefix`; each infix operator carries a
// binding precedence consulted by `parse_expression`'s climbing loop, so
// adding an operator only means adding table entries, not new grammar
// productions.

use crate::ast::{Expr, Stmt};
use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
enum Precedence {
    Lowest,
    Equals,      // == !=
    LessGreater, // < >
    Sum,         // + -
    Product,     // * /
    Prefix,      // -x !x
    Call,        // fn(...)
    Index,       // arr[i]
}

fn precedence_of(kind: &TokenKind) -> Precedence {
    match kind {
        TokenKind::Eq | TokenKind::NotEq => Precedence::Equals,
        TokenKind::Lt | TokenKind::Gt => Precedence::LessGreater,
        TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
        TokenKind::Slash | TokenKind::Asterisk => Precedence::Product,
        TokenKind::LParen => Precedence::Call,
        TokenKind::LBracket => Precedence::Index,
        _ => Precedence::Lowest,
    }
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    pub errors: Vec<String>,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0, errors: Vec::new() }
    }

    fn cur(&self) -> &TokenKind {
        self.tokens.get(self.pos).map(|t| &t.kind).unwrap_or(&TokenKind::Eof)
    }

    fn advance(&mut self) -> TokenKind {
        let tok = self.cur().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: &TokenKind) -> bool {
        if std::mem::discriminant(self.cur()) == std::mem::discriminant(kind) {
            self.advance();
            true
        } else {
            self.errors.push(format!("expected next token to be {:?}, got {:?} instead", kind, self.cur()));
            false
        }
    }

    pub fn parse_program(&mut self) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        while *self.cur() != TokenKind::Eof {
            if let Some(stmt) = self.parse_statement() {
                stmts.push(stmt);
            } else {
                self.advance();
            }
            self.advance_if_semicolon();
        }
        stmts
    }

    fn advance_if_semicolon(&mut self) {
        if *self.cur() == TokenKind::Semicolon {
            self.advance();
        }
    }

    fn parse_statement(&mut self) -> Option<Stmt> {
        match self.cur() {
            TokenKind::Let => self.parse_let_statement(),
            TokenKind::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> Option<Stmt> {
        self.advance(); // let
        let name = match self.advance() {
            TokenKind::Ident(n) => n,
            other => {
                self.errors.push(format!("expected identifier after let, got {:?}", other));
                return None;
            }
        };
        if !self.expect(&TokenKind::Assign) {
            return None;
        }
        let value = self.parse_expression(Precedence::Lowest)?;
        self.advance_if_semicolon();
        Some(Stmt::Let { name, value })
    }

    fn parse_return_statement(&mut self) -> Option<Stmt> {
        self.advance(); // return
        let value = self.parse_expression(Precedence::Lowest)?;
        self.advance_if_semicolon();
        Some(Stmt::Return(value))
    }

    fn parse_expression_statement(&mut self) -> Option<Stmt> {
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.advance_if_semicolon();
        Some(Stmt::Expr(expr))
    }

    fn parse_block(&mut self) -> Vec<Stmt> {
        self.advance(); // {
        let mut stmts = Vec::new();
        while *self.cur() != TokenKind::RBrace && *self.cur() != TokenKind::Eof {
            if let Some(stmt) = self.parse_statement() {
                stmts.push(stmt);
            } else {
                self.advance();
            }
            self.advance_if_semicolon();
        }
        if *self.cur() == TokenKind::RBrace {
            self.advance();
        }
        stmts
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Option<Expr> {
        let mut left = self.parse_prefix()?;

        while *self.cur() != TokenKind::Semicolon && precedence < precedence_of(self.cur()) {
            left = match self.cur() {
                TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Slash
                | TokenKind::Asterisk
                | TokenKind::Eq
                | TokenKind::NotEq
                | TokenKind::Lt
                | TokenKind::Gt => self.parse_infix(left)?,
                TokenKind::LParen => self.parse_call(left)?,
                TokenKind::LBracket => self.parse_index(left)?,
                _ => return Some(left),
            };
        }

        Some(left)
    }

    fn parse_prefix(&mut self) -> Option<Expr> {
        match self.advance() {
            TokenKind::Ident(name) => Some(Expr::Identifier(name)),
            TokenKind::Int(n) => Some(Expr::IntegerLit(n)),
            TokenKind::Str(s) => Some(Expr::StringLit(s)),
            TokenKind::True => Some(Expr::BooleanLit(true)),
            TokenKind::False => Some(Expr::BooleanLit(false)),
            TokenKind::Null => Some(Expr::Null),
            TokenKind::Bang => {
                let right = self.parse_expression(Precedence::Prefix)?;
                Some(Expr::Prefix { op: "!".into(), right: Box::new(right) })
            }
            TokenKind::Minus => {
                let right = self.parse_expression(Precedence::Prefix)?;
                Some(Expr::Prefix { op: "-".into(), right: Box::new(right) })
            }
            TokenKind::LParen => {
                let expr = self.parse_expression(Precedence::Lowest)?;
                self.expect(&TokenKind::RParen);
                Some(expr)
            }
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_hash_literal(),
            TokenKind::If => self.parse_if_expression(),
            TokenKind::Function => self.parse_function_literal(),
            other => {
                self.errors.push(format!("no prefix parse function for {:?} found", other));
                None
            }
        }
    }

    fn parse_infix(&mut self, left: Expr) -> Option<Expr> {
        let op = match self.cur() {
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Slash => "/",
            TokenKind::Asterisk => "*",
            TokenKind::Eq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            _ => unreachable!(),
        }
        .to_string();
        let precedence = precedence_of(self.cur());
        self.advance();
        let right = self.parse_expression(precedence)?;
        Some(Expr::Infix { op, left: Box::new(left), right: Box::new(right) })
    }

    fn parse_call(&mut self, function: Expr) -> Option<Expr> {
        let args = self.parse_expression_list(TokenKind::RParen)?;
        Some(Expr::Call { function: Box::new(function), args })
    }

    fn parse_index(&mut self, left: Expr) -> Option<Expr> {
        self.advance(); // [
        let index = self.parse_expression(Precedence::Lowest)?;
        self.expect(&TokenKind::RBracket);
        Some(Expr::Index { left: Box::new(left), index: Box::new(index) })
    }

    /// Entered with `cur()` at the opening delimiter (e.g. `(` for a call).
    fn parse_expression_list(&mut self, end: TokenKind) -> Option<Vec<Expr>> {
        self.advance(); // opening delimiter
        let mut list = Vec::new();
        if *self.cur() == end {
            self.advance();
            return Some(list);
        }
        list.push(self.parse_expression(Precedence::Lowest)?);
        while *self.cur() == TokenKind::Comma {
            self.advance();
            list.push(self.parse_expression(Precedence::Lowest)?);
        }
        if !self.expect(&end) {
            return None;
        }
        Some(list)
    }

    /// Entered with the opening `[` already consumed by `parse_prefix`.
    fn parse_array_literal(&mut self) -> Option<Expr> {
        let mut elements = Vec::new();
        if *self.cur() == TokenKind::RBracket {
            self.advance();
            return Some(Expr::ArrayLit(elements));
        }
        elements.push(self.parse_expression(Precedence::Lowest)?);
        while *self.cur() == TokenKind::Comma {
            self.advance();
            elements.push(self.parse_expression(Precedence::Lowest)?);
        }
        self.expect(&TokenKind::RBracket);
        Some(Expr::ArrayLit(elements))
    }

    /// Entered with the opening `{` already consumed by `parse_prefix`.
    fn parse_hash_literal(&mut self) -> Option<Expr> {
        let mut pairs = Vec::new();
        while *self.cur() != TokenKind::RBrace {
            let key = self.parse_expression(Precedence::Lowest)?;
            self.expect(&TokenKind::Colon);
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));
            if *self.cur() == TokenKind::Comma {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(&TokenKind::RBrace);
        Some(Expr::HashLit(pairs))
    }

    fn parse_if_expression(&mut self) -> Option<Expr> {
        self.expect(&TokenKind::LParen);
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect(&TokenKind::RParen);
        if *self.cur() != TokenKind::LBrace {
            self.errors.push("expected { to begin if-consequence".into());
            return None;
        }
        let consequence = self.parse_block();
        let alternative = if *self.cur() == TokenKind::Else {
            self.advance();
            if *self.cur() != TokenKind::LBrace {
                self.errors.push("expected { to begin else-block".into());
                return None;
            }
            Some(self.parse_block())
        } else {
            None
        };
        Some(Expr::If { condition: Box::new(condition), consequence, alternative })
    }

    fn parse_function_literal(&mut self) -> Option<Expr> {
        self.expect(&TokenKind::LParen);
        let mut params = Vec::new();
        if *self.cur() != TokenKind::RParen {
            loop {
                match self.advance() {
                    TokenKind::Ident(n) => params.push(n),
                    other => {
                        self.errors.push(format!("expected parameter name, got {:?}", other));
                        return None;
                    }
                }
                if *self.cur() == TokenKind::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen);
        if *self.cur() != TokenKind::LBrace {
            self.errors.push("expected { to begin function body".into());
            return None;
        }
        let body = self.parse_block();
        Some(Expr::FunctionLit { params, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse(src: &str) -> Vec<Stmt> {
        let mut p = Parser::new(tokenize(src));
        let program = p.parse_program();
        assert!(p.errors.is_empty(), "parser errors: {:?}", p.errors);
        program
    }

    #[test]
    fn let_statements() {
        let program = parse("let x = 5; let y = 10;");
        assert_eq!(program.len(), 2);
        assert_eq!(program[0], Stmt::Let { name: "x".into(), value: Expr::IntegerLit(5) });
    }

    #[test]
    fn operator_precedence() {
        let program = parse("1 + 2 * 3;");
        assert_eq!(
            program[0],
            Stmt::Expr(Expr::Infix {
                op: "+".into(),
                left: Box::new(Expr::IntegerLit(1)),
                right: Box::new(Expr::Infix {
                    op: "*".into(),
                    left: Box::new(Expr::IntegerLit(2)),
                    right: Box::new(Expr::IntegerLit(3)),
                }),
            })
        );
    }

    #[test]
    fn if_else_expression() {
        let program = parse("if (x < y) { x } else { y }");
        match &program[0] {
            Stmt::Expr(Expr::If { alternative, .. }) => assert!(alternative.is_some()),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn function_literal_and_call() {
        let program = parse("let add = fn(a, b) { a + b }; add(1, 2);");
        assert_eq!(program.len(), 2);
        match &program[1] {
            Stmt::Expr(Expr::Call { args, .. }) => assert_eq!(args.len(), 2),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn array_and_index() {
        let program = parse("[1, 2, 3][1 + 1]");
        match &program[0] {
            Stmt::Expr(Expr::Index { .. }) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn hash_literal() {
        let program = parse("{\"a\": 1, \"b\": 2}");
        match &program[0] {
            Stmt::Expr(Expr::HashLit(pairs)) => assert_eq!(pairs.len(), 2),
            other => panic!("unexpected: {:?}", other),
        }
    }
}

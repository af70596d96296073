// File: src/lexer.rs
//
// Hand-rolled scanner: turns a UTF-8 source string into a flat Vec<Token>.
// Skips whitespace and comments, recognizes the keyword set, and tags every
// token with its byte-offset span for error messages.

use crate::token::{lookup_ident, Token, TokenKind};

pub fn tokenize(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next_token();
        let is_eof = matches!(tok.kind, TokenKind::Eof);
        tokens.push(tok);
        if is_eof {
            break;
        }
    }
    tokens
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Lexer {
            chars: source.char_indices().peekable(),
            pos: 0,
        }
    }

    fn bump(&mut self) -> Option<(usize, char)> {
        let next = self.chars.next();
        if let Some((i, c)) = next {
            self.pos = i + c.len_utf8();
        }
        next
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();

        let start = self.pos;
        let Some((_, c)) = self.bump() else {
            return Token { kind: TokenKind::Eof, start, end: start };
        };

        let kind = match c {
            '=' => {
                if self.peek_char() == Some('=') {
                    self.bump();
                    TokenKind::Eq
                } else {
                    TokenKind::Assign
                }
            }
            '!' => {
                if self.peek_char() == Some('=') {
                    self.bump();
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                }
            }
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Asterisk,
            '/' => TokenKind::Slash,
            '<' => TokenKind::Lt,
            '>' => TokenKind::Gt,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            ':' => TokenKind::Colon,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '"' => {
                let mut s = String::new();
                loop {
                    match self.bump() {
                        None | Some((_, '"')) => break,
                        Some((_, '\\')) => match self.bump() {
                            Some((_, 'n')) => s.push('\n'),
                            Some((_, 't')) => s.push('\t'),
                            Some((_, '\\')) => s.push('\\'),
                            Some((_, '"')) => s.push('"'),
                            Some((_, other)) => s.push(other),
                            None => break,
                        },
                        Some((_, ch)) => s.push(ch),
                    }
                }
                TokenKind::Str(s)
            }
            c if c.is_ascii_digit() => {
                let mut num = String::new();
                num.push(c);
                while let Some(ch) = self.peek_char() {
                    if ch.is_ascii_digit() {
                        num.push(ch);
                        self.bump();
                    } else {
                        break;
                    }
                }
                TokenKind::Int(num.parse().unwrap_or(0))
            }
            c if is_ident_start(c) => {
                let mut ident = String::new();
                ident.push(c);
                while let Some(ch) = self.peek_char() {
                    if is_ident_continue(ch) {
                        ident.push(ch);
                        self.bump();
                    } else {
                        break;
                    }
                }
                lookup_ident(&ident)
            }
            other => TokenKind::Illegal(other),
        };

        Token { kind, start, end: self.pos }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

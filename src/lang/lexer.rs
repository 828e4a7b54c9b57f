//! Lexer
//!
//! Tokenizes one physical line. Indentation and line structure are the
//! parser's business.

use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Int(i64),
    Str(String),
    Name(String),
    Plus,
    Minus,
    Star,
    SlashSlash,
    Percent,
    Assign,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
    Comma,
    Colon,
    Semicolon,
}

/// Lexer error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid escape sequence '\\{0}'")]
    InvalidEscape(char),
    #[error("integer literal too large: {0}")]
    InvalidNumber(String),
    #[error("invalid character '{0}'")]
    UnexpectedChar(char),
}

pub fn tokenize(line: &str) -> Result<Vec<Token>, LexError> {
    Lexer {
        chars: line.chars().peekable(),
    }
    .run()
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl Lexer<'_> {
    fn run(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
                continue;
            }
            if c == '#' {
                break;
            }
            tokens.push(self.next_token(c)?);
        }

        Ok(tokens)
    }

    fn eat(
        &mut self,
        expected: char,
    ) -> bool {
        if self.chars.peek() == Some(&expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn next_token(
        &mut self,
        c: char,
    ) -> Result<Token, LexError> {
        if c.is_ascii_digit() {
            return self.number();
        }
        if c == '_' || unicode_ident::is_xid_start(c) {
            return Ok(self.name());
        }

        self.chars.next();
        let token = match c {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '%' => Token::Percent,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            ':' => Token::Colon,
            ';' => Token::Semicolon,
            '/' if self.eat('/') => Token::SlashSlash,
            '=' if self.eat('=') => Token::EqEq,
            '=' => Token::Assign,
            '!' if self.eat('=') => Token::NotEq,
            '<' if self.eat('=') => Token::Le,
            '<' => Token::Lt,
            '>' if self.eat('=') => Token::Ge,
            '>' => Token::Gt,
            '\'' | '"' => return self.string(c),
            other => return Err(LexError::UnexpectedChar(other)),
        };
        Ok(token)
    }

    fn number(&mut self) -> Result<Token, LexError> {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() || c == '_' {
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        text.replace('_', "")
            .parse()
            .map(Token::Int)
            .map_err(|_| LexError::InvalidNumber(text))
    }

    fn name(&mut self) -> Token {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c == '_' || unicode_ident::is_xid_continue(c) {
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        Token::Name(text)
    }

    fn string(
        &mut self,
        quote: char,
    ) -> Result<Token, LexError> {
        let mut text = String::new();
        loop {
            match self.chars.next() {
                None => return Err(LexError::UnterminatedString),
                Some(c) if c == quote => return Ok(Token::Str(text)),
                Some('\\') => {
                    let escaped = match self.chars.next() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('\\') => '\\',
                        Some('\'') => '\'',
                        Some('"') => '"',
                        Some(other) => return Err(LexError::InvalidEscape(other)),
                        None => return Err(LexError::UnterminatedString),
                    };
                    text.push(escaped);
                }
                Some(c) => text.push(c),
            }
        }
    }
}

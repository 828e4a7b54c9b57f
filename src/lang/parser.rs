//! Parser
//!
//! Indentation-structured statements over per-line token streams.

use std::sync::Arc;

use crate::lang::ast::{BinOp, Expr, Literal, Stmt, UnOp};
use crate::lang::lexer::{tokenize, Token};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (line {line})")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
}

type PResult<T> = Result<T, ParseError>;

/// Deepest expression tree or block nesting accepted.
pub const MAX_NESTING: usize = 200;

#[derive(Debug)]
struct Line {
    number: usize,
    indent: usize,
    tokens: Vec<Token>,
}

/// Parse a whole submission.
pub fn parse(source: &str) -> PResult<Vec<Stmt>> {
    let mut lines = Vec::new();
    for (i, raw) in source.lines().enumerate() {
        let number = i + 1;
        let tokens = tokenize(raw).map_err(|e| ParseError {
            message: e.to_string(),
            line: number,
        })?;
        if tokens.is_empty() {
            continue;
        }
        lines.push(Line {
            number,
            indent: indent_width(raw),
            tokens,
        });
    }

    let Some(first) = lines.first() else {
        return Ok(Vec::new());
    };
    let base = first.indent;

    let mut parser = Parser {
        lines,
        pos: 0,
        depth: 0,
    };
    let program = parser.block(base)?;
    if let Some(line) = parser.lines.get(parser.pos) {
        return Err(ParseError {
            message: "unindent does not match any outer indentation level".into(),
            line: line.number,
        });
    }
    Ok(program)
}

fn indent_width(raw: &str) -> usize {
    raw.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

struct Parser {
    lines: Vec<Line>,
    pos: usize,
    /// Open indented blocks
    depth: usize,
}

impl Parser {
    fn block(
        &mut self,
        indent: usize,
    ) -> PResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while let Some(line) = self.lines.get(self.pos) {
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(ParseError {
                    message: "unexpected indent".into(),
                    line: line.number,
                });
            }
            self.statement(indent, &mut stmts)?;
        }
        Ok(stmts)
    }

    fn statement(
        &mut self,
        indent: usize,
        out: &mut Vec<Stmt>,
    ) -> PResult<()> {
        let number = self.lines[self.pos].number;
        let keyword = self.keyword_at(self.pos);

        match keyword.as_str() {
            "if" => {
                let stmt = self.if_chain(indent)?;
                out.push(stmt);
            }
            "while" => {
                let (cond, body) = self.header_with_body(indent, "while")?;
                out.push(Stmt::While { cond, body });
            }
            "def" => {
                let stmt = self.def(indent)?;
                out.push(stmt);
            }
            "elif" | "else" => {
                return Err(ParseError {
                    message: format!("'{}' without matching 'if'", keyword),
                    line: number,
                });
            }
            _ => {
                let tokens = self.lines[self.pos].tokens.clone();
                self.pos += 1;
                simple_statements(&tokens, number, out)?;
            }
        }
        Ok(())
    }

    /// Leading name of the line at `pos`, or empty.
    fn keyword_at(
        &self,
        pos: usize,
    ) -> String {
        match self.lines.get(pos).and_then(|l| l.tokens.first()) {
            Some(Token::Name(name)) => name.clone(),
            _ => String::new(),
        }
    }

    /// `keyword expr:` followed by a body.
    fn header_with_body(
        &mut self,
        indent: usize,
        keyword: &str,
    ) -> PResult<(Expr, Vec<Stmt>)> {
        let line = &self.lines[self.pos];
        let number = line.number;
        let colon = find_colon(&line.tokens, number)?;
        if colon == 1 {
            return Err(ParseError {
                message: format!("expected condition after '{}'", keyword),
                line: number,
            });
        }
        let cond = ExprParser::new(&line.tokens[1..colon], number).parse_all()?;
        let inline = line.tokens[colon + 1..].to_vec();
        self.pos += 1;
        let body = self.body(indent, inline, number)?;
        Ok((cond, body))
    }

    fn if_chain(
        &mut self,
        indent: usize,
    ) -> PResult<Stmt> {
        let mut branches = vec![self.header_with_body(indent, "if")?];
        let mut orelse = Vec::new();

        while self
            .lines
            .get(self.pos)
            .is_some_and(|line| line.indent == indent)
        {
            match self.keyword_at(self.pos).as_str() {
                "elif" => {
                    branches.push(self.header_with_body(indent, "elif")?);
                }
                "else" => {
                    let line = &self.lines[self.pos];
                    let number = line.number;
                    if line.tokens.get(1) != Some(&Token::Colon) {
                        return Err(ParseError {
                            message: "expected ':' after 'else'".into(),
                            line: number,
                        });
                    }
                    let inline = line.tokens[2..].to_vec();
                    self.pos += 1;
                    orelse = self.body(indent, inline, number)?;
                    break;
                }
                _ => break,
            }
        }

        Ok(Stmt::If { branches, orelse })
    }

    fn def(
        &mut self,
        indent: usize,
    ) -> PResult<Stmt> {
        let line = &self.lines[self.pos];
        let number = line.number;
        let err = |message: &str| ParseError {
            message: message.to_string(),
            line: number,
        };

        let name = match line.tokens.get(1) {
            Some(Token::Name(name)) => name.clone(),
            _ => return Err(err("expected function name after 'def'")),
        };
        if line.tokens.get(2) != Some(&Token::LParen) {
            return Err(err("expected '(' after function name"));
        }

        let mut params = Vec::new();
        let mut i = 3;
        loop {
            match line.tokens.get(i) {
                Some(Token::RParen) => break,
                Some(Token::Name(param)) => {
                    params.push(param.clone());
                    i += 1;
                    match line.tokens.get(i) {
                        Some(Token::Comma) => i += 1,
                        Some(Token::RParen) => break,
                        _ => return Err(err("expected ',' or ')' in parameter list")),
                    }
                }
                _ => return Err(err("invalid parameter list")),
            }
        }
        if line.tokens.get(i + 1) != Some(&Token::Colon) {
            return Err(err("expected ':' after parameter list"));
        }
        let inline = line.tokens[i + 2..].to_vec();
        self.pos += 1;
        let body = self.body(indent, inline, number)?;

        Ok(Stmt::Def {
            name,
            params,
            body: Arc::new(body),
        })
    }

    /// Either the inline statements after the colon or an indented block.
    fn body(
        &mut self,
        indent: usize,
        inline: Vec<Token>,
        number: usize,
    ) -> PResult<Vec<Stmt>> {
        if !inline.is_empty() {
            let mut stmts = Vec::new();
            simple_statements(&inline, number, &mut stmts)?;
            return Ok(stmts);
        }
        match self.lines.get(self.pos) {
            Some(next) if next.indent > indent => {
                if self.depth >= MAX_NESTING {
                    return Err(ParseError {
                        message: "too many statically nested blocks".into(),
                        line: next.number,
                    });
                }
                let inner = next.indent;
                self.depth += 1;
                let block = self.block(inner);
                self.depth -= 1;
                block
            }
            _ => Err(ParseError {
                message: "expected an indented block".into(),
                line: number,
            }),
        }
    }
}

fn find_colon(
    tokens: &[Token],
    number: usize,
) -> PResult<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::LParen => depth += 1,
            Token::RParen => depth = depth.saturating_sub(1),
            Token::Colon if depth == 0 => return Ok(i),
            _ => {}
        }
    }
    Err(ParseError {
        message: "expected ':'".into(),
        line: number,
    })
}

/// `;`-separated simple statements.
fn simple_statements(
    tokens: &[Token],
    number: usize,
    out: &mut Vec<Stmt>,
) -> PResult<()> {
    for part in tokens.split(|t| *t == Token::Semicolon) {
        if part.is_empty() {
            continue;
        }
        out.push(simple_statement(part, number)?);
    }
    Ok(())
}

fn simple_statement(
    tokens: &[Token],
    number: usize,
) -> PResult<Stmt> {
    let err = |message: &str| ParseError {
        message: message.to_string(),
        line: number,
    };

    match tokens {
        [Token::Name(kw)] if kw == "pass" => Ok(Stmt::Pass),
        [Token::Name(kw)] if kw == "return" => Ok(Stmt::Return(None)),
        [Token::Name(kw), rest @ ..] if kw == "return" => Ok(Stmt::Return(Some(
            ExprParser::new(rest, number).parse_all()?,
        ))),
        [Token::Name(kw), Token::Name(target)] if kw == "del" => Ok(Stmt::Del(target.clone())),
        [Token::Name(kw), ..] if kw == "del" => Err(err("'del' expects a single name")),
        [Token::Name(kw), ..] if is_keyword(kw) => Err(err("invalid syntax")),
        [Token::Name(target), Token::Assign, rest @ ..] => {
            if rest.is_empty() {
                return Err(err("expected expression after '='"));
            }
            Ok(Stmt::Assign(
                target.clone(),
                ExprParser::new(rest, number).parse_all()?,
            ))
        }
        _ => {
            if tokens.contains(&Token::Assign) {
                return Err(err("cannot assign to expression"));
            }
            Ok(Stmt::Expr(ExprParser::new(tokens, number).parse_all()?))
        }
    }
}

fn is_keyword(name: &str) -> bool {
    matches!(
        name,
        "if" | "elif"
            | "else"
            | "while"
            | "def"
            | "return"
            | "pass"
            | "del"
            | "and"
            | "or"
            | "not"
            | "True"
            | "False"
            | "None"
    )
}

/// Precedence climbing over one token slice.
///
/// Every production returns the depth of the tree it built alongside it,
/// and recursion is counted separately, so neither the parser nor the
/// evaluator can be driven past [`MAX_NESTING`].
struct ExprParser<'a> {
    tokens: &'a [Token],
    pos: usize,
    line: usize,
    nesting: usize,
}

type Parsed = (Expr, usize);

impl<'a> ExprParser<'a> {
    fn new(
        tokens: &'a [Token],
        line: usize,
    ) -> Self {
        Self {
            tokens,
            pos: 0,
            line,
            nesting: 0,
        }
    }

    fn error(
        &self,
        message: impl Into<String>,
    ) -> ParseError {
        ParseError {
            message: message.into(),
            line: self.line,
        }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_name(
        &self,
        name: &str,
    ) -> bool {
        matches!(self.peek(), Some(Token::Name(n)) if n == name)
    }

    /// Depth of a new node over children of depth `depth`.
    fn deepen(
        &self,
        depth: usize,
    ) -> PResult<usize> {
        if depth >= MAX_NESTING {
            return Err(self.error("expression is nested too deeply"));
        }
        Ok(depth + 1)
    }

    fn nested(
        &mut self,
        parse: fn(&mut Self) -> PResult<Parsed>,
    ) -> PResult<Parsed> {
        if self.nesting >= MAX_NESTING {
            return Err(self.error("expression is nested too deeply"));
        }
        self.nesting += 1;
        let result = parse(self);
        self.nesting -= 1;
        result
    }

    fn parse_all(mut self) -> PResult<Expr> {
        let (expr, _) = self.or()?;
        if self.pos < self.tokens.len() {
            return Err(self.error("invalid syntax"));
        }
        Ok(expr)
    }

    fn or(&mut self) -> PResult<Parsed> {
        let (mut left, mut depth) = self.and()?;
        while self.peek_name("or") {
            self.pos += 1;
            let (right, right_depth) = self.and()?;
            depth = self.deepen(depth.max(right_depth))?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok((left, depth))
    }

    fn and(&mut self) -> PResult<Parsed> {
        let (mut left, mut depth) = self.not()?;
        while self.peek_name("and") {
            self.pos += 1;
            let (right, right_depth) = self.not()?;
            depth = self.deepen(depth.max(right_depth))?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok((left, depth))
    }

    fn not(&mut self) -> PResult<Parsed> {
        if self.peek_name("not") {
            self.pos += 1;
            let (operand, depth) = self.nested(Self::not)?;
            let depth = self.deepen(depth)?;
            return Ok((Expr::Unary(UnOp::Not, Box::new(operand)), depth));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> PResult<Parsed> {
        let (mut left, mut depth) = self.additive()?;
        loop {
            let op = match self.peek() {
                Some(Token::EqEq) => BinOp::Eq,
                Some(Token::NotEq) => BinOp::Ne,
                Some(Token::Lt) => BinOp::Lt,
                Some(Token::Le) => BinOp::Le,
                Some(Token::Gt) => BinOp::Gt,
                Some(Token::Ge) => BinOp::Ge,
                _ => return Ok((left, depth)),
            };
            self.pos += 1;
            let (right, right_depth) = self.additive()?;
            depth = self.deepen(depth.max(right_depth))?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn additive(&mut self) -> PResult<Parsed> {
        let (mut left, mut depth) = self.multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                _ => return Ok((left, depth)),
            };
            self.pos += 1;
            let (right, right_depth) = self.multiplicative()?;
            depth = self.deepen(depth.max(right_depth))?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn multiplicative(&mut self) -> PResult<Parsed> {
        let (mut left, mut depth) = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinOp::Mul,
                Some(Token::SlashSlash) => BinOp::FloorDiv,
                Some(Token::Percent) => BinOp::Mod,
                _ => return Ok((left, depth)),
            };
            self.pos += 1;
            let (right, right_depth) = self.unary()?;
            depth = self.deepen(depth.max(right_depth))?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
    }

    fn unary(&mut self) -> PResult<Parsed> {
        if let Some(Token::Minus) = self.peek() {
            self.pos += 1;
            let (operand, depth) = self.nested(Self::unary)?;
            let depth = self.deepen(depth)?;
            return Ok((Expr::Unary(UnOp::Neg, Box::new(operand)), depth));
        }
        self.call()
    }

    fn call(&mut self) -> PResult<Parsed> {
        let (mut expr, mut depth) = self.primary()?;
        while let Some(Token::LParen) = self.peek() {
            self.pos += 1;
            let mut args = Vec::new();
            let mut deepest = depth;
            if let Some(Token::RParen) = self.peek() {
                self.pos += 1;
            } else {
                loop {
                    let (arg, arg_depth) = self.nested(Self::or)?;
                    deepest = deepest.max(arg_depth);
                    args.push(arg);
                    match self.peek() {
                        Some(Token::Comma) => self.pos += 1,
                        Some(Token::RParen) => {
                            self.pos += 1;
                            break;
                        }
                        _ => return Err(self.error("expected ',' or ')'")),
                    }
                }
            }
            depth = self.deepen(deepest)?;
            expr = Expr::Call(Box::new(expr), args);
        }
        Ok((expr, depth))
    }

    fn primary(&mut self) -> PResult<Parsed> {
        let token = self
            .peek()
            .ok_or_else(|| self.error("unexpected end of input"))?;
        self.pos += 1;
        let expr = match token {
            Token::Int(n) => Expr::Literal(Literal::Int(*n)),
            Token::Str(s) => Expr::Literal(Literal::Str(s.clone())),
            Token::Name(name) => match name.as_str() {
                "True" => Expr::Literal(Literal::Bool(true)),
                "False" => Expr::Literal(Literal::Bool(false)),
                "None" => Expr::Literal(Literal::None),
                kw if is_keyword(kw) => return Err(self.error("invalid syntax")),
                _ => Expr::Name(name.clone()),
            },
            Token::LParen => {
                let inner = self.nested(Self::or)?;
                if self.peek() != Some(&Token::RParen) {
                    return Err(self.error("'(' was never closed"));
                }
                self.pos += 1;
                return Ok(inner);
            }
            _ => return Err(self.error("invalid syntax")),
        };
        Ok((expr, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semicolon_statements() {
        let program = parse("x = 5; y = 6").unwrap();
        assert_eq!(program.len(), 2);
        assert!(matches!(&program[0], Stmt::Assign(name, _) if name == "x"));
    }

    #[test]
    fn test_precedence() {
        let program = parse("1 + 2 * 3").unwrap();
        let Stmt::Expr(Expr::Binary(BinOp::Add, _, right)) = &program[0] else {
            panic!("unexpected parse: {:?}", program);
        };
        assert!(matches!(**right, Expr::Binary(BinOp::Mul, _, _)));
    }

    #[test]
    fn test_blocks() {
        let source = "def f(a, b):\n    if a < b:\n        return a\n    else:\n        return b\nf(1, 2)";
        let program = parse(source).unwrap();
        assert_eq!(program.len(), 2);
        let Stmt::Def { name, params, body } = &program[0] else {
            panic!("expected def");
        };
        assert_eq!(name, "f");
        assert_eq!(params, &vec!["a".to_string(), "b".to_string()]);
        assert!(matches!(&body[0], Stmt::If { branches, orelse } if branches.len() == 1 && orelse.len() == 1));
    }

    #[test]
    fn test_inline_body() {
        let program = parse("while x: x = x - 1").unwrap();
        assert!(matches!(&program[0], Stmt::While { body, .. } if body.len() == 1));
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(parse("while true:\n    ").unwrap_err().line, 1);
        assert!(parse("x =").is_err());
        assert!(parse("1 = x").is_err());
        assert!(parse("  x = 1\ny = 2").is_err());
        assert!(parse("x = 1\n    y = 2").is_err());
        assert!(parse("else:\n    pass").is_err());
        assert!(parse("f(1, 2").is_err());
    }

    fn nested_ifs(levels: usize) -> String {
        (0..levels)
            .map(|i| format!("{}if True:", "    ".repeat(i)))
            .chain(std::iter::once(format!("{}pass", "    ".repeat(levels))))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_nesting_limits() {
        let ok = format!("{}{}1{}", "-".repeat(90), "(".repeat(90), ")".repeat(90));
        assert!(parse(&ok).is_ok());
        assert!(parse(&vec!["1"; 150].join(" + ")).is_ok());

        let deep = format!("{}1", "-".repeat(250));
        assert_eq!(
            parse(&deep).unwrap_err().message,
            "expression is nested too deeply"
        );
        let wide = vec!["x"; 250].join(" or ");
        assert!(parse(&wide).is_err());
        let calls = format!("{}1{}", "f(".repeat(250), ")".repeat(250));
        assert!(parse(&calls).is_err());

        assert!(parse(&nested_ifs(50)).is_ok());
        assert_eq!(
            parse(&nested_ifs(250)).unwrap_err().message,
            "too many statically nested blocks"
        );
    }

    #[test]
    fn test_blank_and_comments() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("   # nothing\n\n").unwrap().is_empty());
    }
}

//! Recursive-descent parser producing the expression AST.
//!
//! Precedence, loosest first: `||`, `&&`, comparisons, `!`, primary.

use super::ast::{Anchor, BinaryOp, Expr, LogicalOp, PathRef};
use super::lexer::{Token, tokenize};
use crate::error::{ExprResult, ExpressionError};
use serde_json::Value;

/// Compile an expression source string into an AST.
pub fn compile(source: &str) -> ExprResult<Expr> {
    let tokens = tokenize(source)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_or()?;
    if let Some(token) = parser.peek() {
        return Err(ExpressionError::UnexpectedToken {
            found: token.to_string(),
            expected: "end of expression".into(),
        });
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn parse_or(&mut self) -> ExprResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::Logical {
                op: LogicalOp::Or,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> ExprResult<Expr> {
        let mut lhs = self.parse_comparison()?;
        while self.peek() == Some(&Token::And) {
            self.advance();
            let rhs = self.parse_comparison()?;
            lhs = Expr::Logical {
                op: LogicalOp::And,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_comparison(&mut self) -> ExprResult<Expr> {
        let mut lhs = self.parse_unary()?;
        while let Some(op) = self.peek().and_then(comparison_op) {
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> ExprResult<Expr> {
        if self.peek() == Some(&Token::Not) {
            self.advance();
            let inner = self.parse_unary()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> ExprResult<Expr> {
        match self.advance() {
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::Number(n)) => Ok(Expr::Literal(serde_json::json!(n))),
            Some(Token::Bool(b)) => Ok(Expr::Literal(Value::Bool(b))),
            Some(Token::Null) => Ok(Expr::Literal(Value::Null)),
            Some(Token::Path(text)) => Ok(Expr::Path(parse_path(&text))),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(ExpressionError::UnexpectedToken {
                        found: other.to_string(),
                        expected: "')'".into(),
                    }),
                    None => Err(ExpressionError::UnexpectedEnd {
                        expected: "')'".into(),
                    }),
                }
            }
            Some(other) => Err(ExpressionError::UnexpectedToken {
                found: other.to_string(),
                expected: "literal, path, or '('".into(),
            }),
            None => Err(ExpressionError::UnexpectedEnd {
                expected: "literal, path, or '('".into(),
            }),
        }
    }
}

fn comparison_op(token: &Token) -> Option<BinaryOp> {
    match token {
        Token::Eq => Some(BinaryOp::Eq),
        Token::Ne => Some(BinaryOp::Ne),
        Token::Gt => Some(BinaryOp::Gt),
        Token::Lt => Some(BinaryOp::Lt),
        Token::Ge => Some(BinaryOp::Ge),
        Token::Le => Some(BinaryOp::Le),
        _ => None,
    }
}

/// Parse path reference text (`./x`, `../x`, `/a/b`, bare name) outside an
/// expression; watch lists and injection targets share this syntax.
pub fn parse_path(text: &str) -> PathRef {
    if let Some(rest) = text.strip_prefix('/') {
        return PathRef {
            anchor: Anchor::Absolute,
            segments: split_segments(rest),
        };
    }
    let mut rest = text;
    let mut levels = 0usize;
    while let Some(stripped) = rest.strip_prefix("../") {
        levels += 1;
        rest = stripped;
    }
    if rest == ".." {
        levels += 1;
        rest = "";
    }
    if let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped;
    }
    if rest == "." {
        rest = "";
    }
    PathRef {
        anchor: Anchor::Relative(levels),
        segments: split_segments(rest),
    }
}

fn split_segments(text: &str) -> Vec<String> {
    text.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

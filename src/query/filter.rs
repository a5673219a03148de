//! Recursive-descent parser for filter expressions.
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! or        := and (OR and)*
//! and       := not (AND not)*
//! not       := NOT not | predicate
//! predicate := operand [cmp operand | IS [NOT] NULL]
//! operand   := literal | column | '-' number | '(' or ')'
//! ```

use crate::query::ast::Expr;
use crate::query::errors::FilterSyntaxError;
use crate::query::lexer::{tokenize, Token, TokenKind};
use crate::table::Value;

/// Maximum nesting of parentheses and `NOT` accepted in a filter.
pub const MAX_FILTER_DEPTH: usize = 64;

/// Parses filter text into an expression tree.
pub fn parse_filter(text: &str) -> Result<Expr, FilterSyntaxError> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err(FilterSyntaxError::new("empty filter expression", 0));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        end: text.len(),
    };
    let expr = parser.parse_or()?;
    if let Some(token) = parser.peek() {
        return Err(FilterSyntaxError::new(
            format!("unexpected {}", token.kind.describe()),
            token.offset,
        ));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    end: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|token| &token.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected_end(&self, expected: &str) -> FilterSyntaxError {
        FilterSyntaxError::new(format!("expected {expected}, found end of filter"), self.end)
    }

    fn enter(&mut self, offset: usize) -> Result<(), FilterSyntaxError> {
        self.depth += 1;
        if self.depth > MAX_FILTER_DEPTH {
            return Err(FilterSyntaxError::new(
                format!("filter nesting exceeds {MAX_FILTER_DEPTH}"),
                offset,
            ));
        }
        Ok(())
    }

    fn parse_or(&mut self) -> Result<Expr, FilterSyntaxError> {
        let mut left = self.parse_and()?;
        while self.eat(&TokenKind::Or) {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, FilterSyntaxError> {
        let mut left = self.parse_not()?;
        while self.eat(&TokenKind::And) {
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, FilterSyntaxError> {
        if let Some(token) = self.peek() {
            if token.kind == TokenKind::Not {
                let offset = token.offset;
                self.pos += 1;
                self.enter(offset)?;
                let inner = self.parse_not()?;
                self.depth -= 1;
                return Ok(Expr::Not(Box::new(inner)));
            }
        }
        self.parse_predicate()
    }

    fn parse_predicate(&mut self) -> Result<Expr, FilterSyntaxError> {
        let left = self.parse_operand()?;
        match self.peek_kind() {
            Some(TokenKind::Op(op)) => {
                let op = *op;
                self.pos += 1;
                let right = self.parse_operand()?;
                Ok(Expr::Compare {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                })
            }
            Some(TokenKind::Is) => {
                self.pos += 1;
                let negated = self.eat(&TokenKind::Not);
                match self.advance() {
                    Some(Token {
                        kind: TokenKind::Null,
                        ..
                    }) => Ok(Expr::IsNull {
                        expr: Box::new(left),
                        negated,
                    }),
                    Some(token) => Err(FilterSyntaxError::new(
                        format!("expected NULL after IS, found {}", token.kind.describe()),
                        token.offset,
                    )),
                    None => Err(self.unexpected_end("NULL after IS")),
                }
            }
            _ => Ok(left),
        }
    }

    fn parse_operand(&mut self) -> Result<Expr, FilterSyntaxError> {
        let Some(token) = self.advance() else {
            return Err(self.unexpected_end("an operand"));
        };
        let expr = match token.kind {
            TokenKind::Ident(name) => Expr::Column(name),
            TokenKind::Str(value) => Expr::Literal(Value::String(value)),
            TokenKind::Int(value) => Expr::Literal(Value::Int(value)),
            TokenKind::Float(value) => Expr::Literal(Value::Float(value)),
            TokenKind::True => Expr::Literal(Value::Bool(true)),
            TokenKind::False => Expr::Literal(Value::Bool(false)),
            TokenKind::Null => Expr::Literal(Value::Null),
            TokenKind::Minus => match self.advance() {
                Some(Token {
                    kind: TokenKind::Int(value),
                    ..
                }) => Expr::Literal(Value::Int(-value)),
                Some(Token {
                    kind: TokenKind::Float(value),
                    ..
                }) => Expr::Literal(Value::Float(-value)),
                Some(other) => {
                    return Err(FilterSyntaxError::new(
                        format!("expected a number after '-', found {}", other.kind.describe()),
                        other.offset,
                    ))
                }
                None => return Err(self.unexpected_end("a number after '-'")),
            },
            TokenKind::LParen => {
                self.enter(token.offset)?;
                let inner = self.parse_or()?;
                self.depth -= 1;
                match self.advance() {
                    Some(Token {
                        kind: TokenKind::RParen,
                        ..
                    }) => inner,
                    Some(other) => {
                        return Err(FilterSyntaxError::new(
                            format!("expected ')', found {}", other.kind.describe()),
                            other.offset,
                        ))
                    }
                    None => return Err(self.unexpected_end("')'")),
                }
            }
            other => {
                return Err(FilterSyntaxError::new(
                    format!("expected an operand, found {}", other.describe()),
                    token.offset,
                ))
            }
        };
        Ok(expr)
    }
}

//! Recursive descent parser for rule strings
//!
//! Grammar, lowest precedence first:
//!
//! ```text
//! expr      := or_expr
//! or_expr   := and_expr ( 'OR' and_expr )*
//! and_expr  := primary ( 'AND' primary )*
//! primary   := '(' expr ')' | condition
//! condition := IDENTIFIER COMPARISON_OP literal
//! literal   := NUMBER | STRING | 'true' | 'false'
//! ```

use crate::error::{Result, RuleEngineError};
use crate::rule::ast::{Condition, LogicalOp, Node, Operator, Value};
use crate::rule::lexer::{tokenize, Token, TokenKind};

/// Default limit on parenthesis nesting
///
/// Each group adds at most two levels of `Node::nesting`, so every rule
/// accepted under this limit stays within `MAX_SERIALIZED_NESTING`.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 24;

/// Compile a rule string into an AST
pub fn create_rule(rule: &str) -> Result<Node> {
    create_rule_with_depth(rule, DEFAULT_MAX_NESTING_DEPTH)
}

/// Compile a rule string with an explicit nesting limit
pub fn create_rule_with_depth(rule: &str, max_depth: usize) -> Result<Node> {
    let tokens = tokenize(rule)?;
    parse_with_depth(&tokens, max_depth)
}

/// Parse a token sequence into an AST
pub fn parse(tokens: &[Token]) -> Result<Node> {
    parse_with_depth(tokens, DEFAULT_MAX_NESTING_DEPTH)
}

pub fn parse_with_depth(tokens: &[Token], max_depth: usize) -> Result<Node> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        max_depth,
    };
    let node = parser.parse_or()?;

    if let Some(token) = parser.peek() {
        let message = match token.kind {
            TokenKind::RParen => "unbalanced parentheses: unexpected ')'".to_string(),
            _ => format!("unexpected trailing token '{}'", token.text),
        };
        return Err(RuleEngineError::parse(token.span.start, message));
    }

    Ok(node)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Byte offset just past the last token, used for end-of-input errors
    fn end_position(&self) -> usize {
        self.tokens.last().map(|t| t.span.end).unwrap_or(0)
    }

    fn eof_error(&self, expected: &str) -> RuleEngineError {
        RuleEngineError::parse(
            self.end_position(),
            format!("expected {}, found end of input", expected),
        )
    }

    fn next_is_logical(&self, op: LogicalOp) -> bool {
        matches!(self.peek(), Some(t) if t.kind == TokenKind::Logical(op))
    }

    fn parse_or(&mut self) -> Result<Node> {
        let mut node = self.parse_and()?;
        while self.next_is_logical(LogicalOp::Or) {
            self.pos += 1;
            let right = self.parse_and()?;
            node = Node::or(node, right);
        }
        Ok(node)
    }

    fn parse_and(&mut self) -> Result<Node> {
        let mut node = self.parse_primary()?;
        while self.next_is_logical(LogicalOp::And) {
            self.pos += 1;
            let right = self.parse_primary()?;
            node = Node::and(node, right);
        }
        Ok(node)
    }

    fn parse_primary(&mut self) -> Result<Node> {
        let token = self.peek().ok_or_else(|| self.eof_error("condition or '('"))?;

        match token.kind {
            TokenKind::LParen => {
                if self.depth >= self.max_depth {
                    return Err(RuleEngineError::parse(
                        token.span.start,
                        format!("nesting deeper than {} levels", self.max_depth),
                    ));
                }
                self.pos += 1;
                self.depth += 1;
                let node = self.parse_or()?;
                self.depth -= 1;

                match self.advance() {
                    Some(t) if t.kind == TokenKind::RParen => Ok(node),
                    Some(t) => Err(RuleEngineError::parse(
                        t.span.start,
                        format!("expected ')', found '{}'", t.text),
                    )),
                    None => Err(RuleEngineError::parse(
                        token.span.start,
                        "unbalanced parentheses: '(' is never closed",
                    )),
                }
            }
            TokenKind::Identifier => self.parse_condition(),
            _ => Err(RuleEngineError::parse(
                token.span.start,
                format!("expected condition or '(', found '{}'", token.text),
            )),
        }
    }

    fn parse_condition(&mut self) -> Result<Node> {
        let field = self.advance().ok_or_else(|| self.eof_error("field name"))?;

        let operator = match self.advance() {
            Some(Token {
                kind: TokenKind::Comparison(op),
                ..
            }) => *op,
            Some(t) => {
                return Err(RuleEngineError::parse(
                    t.span.start,
                    format!(
                        "expected comparison operator after '{}', found '{}'",
                        field.text, t.text
                    ),
                ))
            }
            None => return Err(self.eof_error("comparison operator")),
        };

        let literal = self.advance().ok_or_else(|| self.eof_error("literal value"))?;
        let value = parse_literal(literal)?;

        Ok(Node::Condition(Condition {
            field: field.text.clone(),
            operator,
            value,
        }))
    }
}

fn parse_literal(token: &Token) -> Result<Value> {
    match token.kind {
        TokenKind::Number if token.text.contains('.') => match token.text.parse::<f64>() {
            Ok(x) if x.is_finite() => Ok(Value::Float(x)),
            Ok(_) => Err(RuleEngineError::parse(
                token.span.start,
                format!("float literal '{}' out of range", token.text),
            )),
            Err(_) => Err(invalid_literal(token)),
        },
        TokenKind::Number => token
            .text
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| {
                RuleEngineError::parse(
                    token.span.start,
                    format!("integer literal '{}' out of range", token.text),
                )
            }),
        TokenKind::String => Ok(Value::String(token.text.clone())),
        TokenKind::Identifier if token.text == "true" => Ok(Value::Boolean(true)),
        TokenKind::Identifier if token.text == "false" => Ok(Value::Boolean(false)),
        _ => Err(invalid_literal(token)),
    }
}

fn invalid_literal(token: &Token) -> RuleEngineError {
    RuleEngineError::parse(
        token.span.start,
        format!(
            "expected number, quoted string, true or false, found '{}'",
            token.text
        ),
    )
}

/// Convenience for building expected trees in tests
#[cfg(test)]
pub(crate) fn cond(field: &str, operator: Operator, value: impl Into<Value>) -> Node {
    Node::condition(field, operator, value)
}

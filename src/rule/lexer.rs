//! Rule string tokenizer

use std::ops::Range;

use crate::error::{Result, RuleEngineError};
use crate::rule::ast::{LogicalOp, Operator};

/// Token classes produced by the tokenizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    String,
    Comparison(Operator),
    Logical(LogicalOp),
    LParen,
    RParen,
}

/// A classified lexical unit with its byte span in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Literal text; string literals are stored without their quotes
    pub text: String,
    pub span: Range<usize>,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>, span: Range<usize>) -> Self {
        Token {
            kind,
            text: text.into(),
            span,
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '-')
}

/// Integer or plain decimal: optional '-', digits, at most one '.'
fn is_number(word: &str) -> bool {
    let digits = word.strip_prefix('-').unwrap_or(word);
    let mut seen_dot = false;
    let mut seen_digit = false;
    for c in digits.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return false,
        }
    }
    seen_digit
}

/// Split a rule string into tokens
pub fn tokenize(rule: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = rule.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '(' => tokens.push(Token::new(TokenKind::LParen, "(", start..start + 1)),
            ')' => tokens.push(Token::new(TokenKind::RParen, ")", start..start + 1)),
            '>' | '<' | '!' | '=' => {
                let two_char = match chars.peek() {
                    Some((_, '=')) if c != '=' => {
                        chars.next();
                        true
                    }
                    _ => false,
                };
                let end = start + if two_char { 2 } else { 1 };
                let symbol = &rule[start..end];
                let operator = Operator::from_symbol(symbol).ok_or_else(|| {
                    RuleEngineError::lex(start, format!("unexpected character '{}'", c))
                })?;
                tokens.push(Token::new(TokenKind::Comparison(operator), symbol, start..end));
            }
            '\'' | '"' => {
                let quote = c;
                let content_start = start + 1;
                let mut end = None;
                for (i, ch) in chars.by_ref() {
                    if ch == quote {
                        end = Some(i);
                        break;
                    }
                }
                let end = end.ok_or_else(|| {
                    RuleEngineError::lex(start, "unterminated string literal")
                })?;
                tokens.push(Token::new(
                    TokenKind::String,
                    &rule[content_start..end],
                    start..end + 1,
                ));
            }
            c if is_word_char(c) => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, next)) = chars.peek() {
                    if !is_word_char(next) {
                        break;
                    }
                    end = i + next.len_utf8();
                    chars.next();
                }
                let word = &rule[start..end];
                let kind = if let Some(op) = LogicalOp::from_keyword(word) {
                    TokenKind::Logical(op)
                } else if is_number(word) {
                    TokenKind::Number
                } else {
                    TokenKind::Identifier
                };
                tokens.push(Token::new(kind, word, start..end));
            }
            other => {
                return Err(RuleEngineError::lex(
                    start,
                    format!("unexpected character '{}'", other),
                ));
            }
        }
    }

    Ok(tokens)
}

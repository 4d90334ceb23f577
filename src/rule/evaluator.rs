//! Rule evaluator

use crate::error::{Result, RuleEngineError};
use crate::rule::ast::{Condition, LogicalOp, Node, Operator, Record, Value};

/// Evaluate an AST against a record
///
/// A condition on a field the record does not carry evaluates to `false`.
/// AND and OR short-circuit left to right, so a type mismatch in a branch
/// that is never reached does not surface.
pub fn evaluate(node: &Node, record: &Record) -> Result<bool> {
    // Right operands still to decide, innermost last
    let mut pending: Vec<(LogicalOp, &Node)> = Vec::new();
    let mut current = node;

    loop {
        let value = loop {
            match current {
                Node::Condition(cond) => break check_condition(cond, record)?,
                Node::Logical {
                    operator,
                    left,
                    right,
                } => {
                    pending.push((*operator, right.as_ref()));
                    current = left.as_ref();
                }
            }
        };

        // A short-circuited node takes its left value, otherwise its right one
        loop {
            match pending.pop() {
                None => return Ok(value),
                Some((LogicalOp::And, _)) if !value => {}
                Some((LogicalOp::Or, _)) if value => {}
                Some((_, right)) => {
                    current = right;
                    break;
                }
            }
        }
    }
}

fn check_condition(cond: &Condition, record: &Record) -> Result<bool> {
    match record.get(&cond.field) {
        Some(actual) => compare(cond, actual),
        None => Ok(false),
    }
}

fn compare(cond: &Condition, actual: &Value) -> Result<bool> {
    let op = cond.operator;

    match (actual, &cond.value) {
        (Value::Integer(a), Value::Integer(b)) => Ok(apply_ordered(op, a, b)),
        (Value::String(a), Value::String(b)) if !op.is_ordering() => {
            Ok(apply_equality(op, a == b))
        }
        (Value::Boolean(a), Value::Boolean(b)) if !op.is_ordering() => {
            Ok(apply_equality(op, a == b))
        }
        _ => match (actual.as_f64(), cond.value.as_f64()) {
            // Mixed integer/float pairs compare as f64
            (Some(a), Some(b)) => Ok(apply_ordered(op, &a, &b)),
            _ => Err(RuleEngineError::TypeMismatch {
                field: cond.field.clone(),
                operator: op,
                found: actual.type_name(),
                expected: cond.value.type_name(),
            }),
        },
    }
}

fn apply_ordered<T: PartialOrd>(op: Operator, a: &T, b: &T) -> bool {
    match op {
        Operator::Greater => a > b,
        Operator::Less => a < b,
        Operator::GreaterEqual => a >= b,
        Operator::LessEqual => a <= b,
        Operator::Equal => a == b,
        Operator::NotEqual => a != b,
    }
}

fn apply_equality(op: Operator, equal: bool) -> bool {
    match op {
        Operator::NotEqual => !equal,
        _ => equal,
    }
}

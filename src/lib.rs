//! Rule Engine AST - compile eligibility rules into shareable trees
//!
//! Rules are boolean expressions over named fields such as
//! `age > 30 AND department = 'Sales'`. This crate tokenizes and parses them
//! into an immutable AST, combines several ASTs into one and evaluates an
//! AST against a record of typed values.
//!
//! ```
//! use rule_engine_ast::{combine, create_rule, evaluate, LogicalOp, Record, Value};
//! use std::sync::Arc;
//!
//! let age = Arc::new(create_rule("age > 30").unwrap());
//! let dept = Arc::new(create_rule("department = 'Sales'").unwrap());
//! let rule = combine(&[age, dept], LogicalOp::And).unwrap();
//!
//! let mut record = Record::new();
//! record.insert("age".to_string(), Value::Integer(35));
//! record.insert("department".to_string(), Value::from("Sales"));
//! assert!(evaluate(&rule, &record).unwrap());
//! ```
//!
//! With the `python` feature the crate builds as a Python extension module.

pub mod config;
pub mod engine;
pub mod error;
pub mod rule;
pub mod store;

#[cfg(feature = "python")]
mod python;

pub use config::EngineConfig;
pub use engine::RuleEngine;
pub use error::{Result, RuleEngineError};
pub use rule::{
    combine, create_rule, evaluate, parse, tokenize, Condition, LogicalOp, Node, Operator, Record,
    Token, TokenKind, Value,
};
pub use store::{MemoryRuleStore, RuleId, RuleStore, StoredRule};

//! Rule compilation and evaluation module
//!
//! This module handles tokenizing rule strings like
//! "age > 30 AND department = 'Sales'", parsing them into an AST,
//! combining ASTs and evaluating them against records.

mod ast;
pub mod cache;
mod combiner;
mod evaluator;
pub mod lexer;
pub mod parser;

#[cfg(test)]
mod property_tests;

pub use ast::*;
pub use cache::*;
pub use combiner::*;
pub use evaluator::*;
pub use lexer::*;
pub use parser::*;

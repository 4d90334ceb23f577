//! Python bindings
//!
//! Trees cross the boundary as JSON strings, records as plain dicts.

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::engine::RuleEngine;
use crate::rule::{self, LogicalOp, Node, Record, TokenKind, Value};
use crate::store::RuleStore;

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert a Python dict into a record
///
/// `bool` is checked before `int` since Python booleans are ints.
fn extract_record(data: &Bound<'_, PyDict>) -> PyResult<Record> {
    let mut record = Record::with_capacity(data.len());
    for (key, value) in data.iter() {
        let field: String = key.extract()?;
        let value = if value.is_instance_of::<PyBool>() {
            Value::Boolean(value.extract::<bool>()?)
        } else if let Ok(i) = value.extract::<i64>() {
            Value::Integer(i)
        } else if let Ok(f) = value.extract::<f64>() {
            Value::Float(f)
        } else if let Ok(s) = value.extract::<String>() {
            Value::String(s)
        } else {
            return Err(PyValueError::new_err(format!(
                "Unsupported value for field '{}': expected bool, int, float or str",
                field
            )));
        };
        record.insert(field, value);
    }
    Ok(record)
}

fn parse_operator(operator: &str) -> PyResult<LogicalOp> {
    LogicalOp::from_keyword(operator).ok_or_else(|| {
        PyValueError::new_err(format!("Operator must be AND or OR, got '{}'", operator))
    })
}

fn kind_name(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Identifier => "IDENTIFIER",
        TokenKind::Number => "NUMBER",
        TokenKind::String => "STRING",
        TokenKind::Comparison(_) => "COMPARISON_OP",
        TokenKind::Logical(_) => "LOGICAL_OP",
        TokenKind::LParen => "LPAREN",
        TokenKind::RParen => "RPAREN",
    }
}

// ============================================================================
// Python Functions
// ============================================================================

/// Tokenize a rule string into (kind, text) pairs
#[pyfunction]
fn tokenize(rule: &str) -> PyResult<Vec<(String, String)>> {
    Ok(rule::tokenize(rule)?
        .into_iter()
        .map(|t| (kind_name(t.kind).to_string(), t.text))
        .collect())
}

/// Compile a rule string, returning the AST as JSON
#[pyfunction]
fn create_rule(rule: &str) -> PyResult<String> {
    Ok(rule::create_rule(rule)?.to_json()?)
}

/// Combine JSON ASTs under AND (default) or OR
#[pyfunction]
#[pyo3(signature = (asts, operator="AND"))]
fn combine_rules(asts: Vec<String>, operator: &str) -> PyResult<String> {
    let operator = parse_operator(operator)?;
    let roots = asts
        .iter()
        .map(|json| Node::from_json(json).map(Arc::new))
        .collect::<crate::error::Result<Vec<_>>>()?;
    Ok(rule::combine(&roots, operator)?.to_json()?)
}

/// Evaluate a JSON AST against a dict
#[pyfunction]
fn evaluate_rule(ast: &str, data: &Bound<'_, PyDict>) -> PyResult<bool> {
    let node = Node::from_json(ast)?;
    let record = extract_record(data)?;
    Ok(rule::evaluate(&node, &record)?)
}

/// Evaluate a JSON AST against a dict without blocking the event loop
///
/// The evaluation runs on a Tokio blocking thread.
///
/// # Example (Python)
/// ```python
/// ok = await evaluate_rule_async(ast, {"age": 35, "department": "Sales"})
/// ```
#[pyfunction]
fn evaluate_rule_async<'py>(
    py: Python<'py>,
    ast: &str,
    data: &Bound<'py, PyDict>,
) -> PyResult<Bound<'py, PyAny>> {
    // Convert before entering async context
    let node = Node::from_json(ast)?;
    let record = extract_record(data)?;

    pyo3_async_runtimes::tokio::future_into_py(py, async move {
        let result = tokio::task::spawn_blocking(move || rule::evaluate(&node, &record))
            .await
            .map_err(|e| {
                PyErr::new::<PyRuntimeError, _>(format!("Evaluation task panicked: {}", e))
            })??;

        Ok(result)
    })
}

// ============================================================================
// Python Classes
// ============================================================================

/// Rule engine holding stored rules addressed by id
#[pyclass(name = "RuleEngine")]
struct PyRuleEngine {
    inner: RuleEngine,
}

#[pymethods]
impl PyRuleEngine {
    /// Create an engine, optionally from a JSON config
    #[new]
    #[pyo3(signature = (config=None))]
    fn new(config: Option<&str>) -> PyResult<Self> {
        let config = match config {
            Some(json) => EngineConfig::from_json(json)?,
            None => EngineConfig::default(),
        };
        Ok(PyRuleEngine {
            inner: RuleEngine::new(config)?,
        })
    }

    /// Compile and store a rule, returning its id
    fn create_rule(&self, rule: &str) -> PyResult<u64> {
        Ok(self.inner.create_rule(rule)?.id)
    }

    /// Combine stored rules, returning the AST as JSON
    #[pyo3(signature = (rule_ids, operator=None))]
    fn combine_rules(&self, rule_ids: Vec<u64>, operator: Option<&str>) -> PyResult<String> {
        let operator = operator.map(parse_operator).transpose()?;
        Ok(self.inner.combine_rules(&rule_ids, operator)?.to_json()?)
    }

    /// Fetch the JSON AST of a stored rule
    fn get_rule_ast(&self, rule_id: u64) -> PyResult<String> {
        Ok(self.inner.store().get(rule_id)?.ast.to_json()?)
    }

    /// Evaluate a stored rule against a dict
    fn evaluate_rule(&self, rule_id: u64, data: &Bound<'_, PyDict>) -> PyResult<bool> {
        let record = extract_record(data)?;
        Ok(self.inner.evaluate_rule(rule_id, &record)?)
    }

    fn rule_count(&self) -> usize {
        self.inner.store().len()
    }
}

// ============================================================================
// Python Module Definition
// ============================================================================

/// Python module definition
#[pymodule]
fn rule_engine_ast(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(tokenize, m)?)?;
    m.add_function(wrap_pyfunction!(create_rule, m)?)?;
    m.add_function(wrap_pyfunction!(combine_rules, m)?)?;
    m.add_function(wrap_pyfunction!(evaluate_rule, m)?)?;
    m.add_function(wrap_pyfunction!(evaluate_rule_async, m)?)?;
    m.add_class::<PyRuleEngine>()?;
    Ok(())
}

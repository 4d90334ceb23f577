//! Combine several compiled rules into one tree

use std::sync::Arc;

use crate::error::{Result, RuleEngineError};
use crate::rule::ast::{LogicalOp, Node};

/// Left-fold `roots` under `operator`, preserving input order
///
/// `combine(&[r1, r2, r3], And)` builds `(r1 AND r2) AND r3`. The inputs are
/// shared into the new tree, a single input is returned as-is.
pub fn combine(roots: &[Arc<Node>], operator: LogicalOp) -> Result<Arc<Node>> {
    let (first, rest) = roots.split_first().ok_or_else(|| {
        RuleEngineError::InvalidArgument("cannot combine an empty list of rules".to_string())
    })?;

    Ok(rest.iter().fold(Arc::clone(first), |acc, root| {
        Arc::new(Node::logical(operator, acc, Arc::clone(root)))
    }))
}

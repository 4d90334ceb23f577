//! Rule storage
//!
//! Compiled rules are addressed by an auto-increment id. The core itself is
//! identity-free; ids only exist at this layer.

mod memory;

pub use memory::*;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rule::Node;

/// Identifier assigned to a stored rule
pub type RuleId = u64;

/// A rule string together with its compiled tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRule {
    pub id: RuleId,
    pub rule_string: String,
    pub ast: Arc<Node>,
}

/// Storage contract for compiled rules
pub trait RuleStore: Send + Sync {
    /// Store a compiled rule and return its new id
    fn insert(&self, rule_string: &str, ast: Arc<Node>) -> Result<RuleId>;

    /// Fetch a rule, `RuleNotFound` when the id is unknown
    fn get(&self, id: RuleId) -> Result<StoredRule>;

    /// Fetch several rules in the order of `ids`
    fn get_many(&self, ids: &[RuleId]) -> Result<Vec<StoredRule>> {
        ids.iter().map(|id| self.get(*id)).collect()
    }

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

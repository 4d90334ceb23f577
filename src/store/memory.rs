//! In-memory rule store

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ahash::AHashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::{Result, RuleEngineError};
use crate::rule::Node;

use super::{RuleId, RuleStore, StoredRule};

/// Thread-safe store backed by a hash map, ids start at 1
pub struct MemoryRuleStore {
    rules: RwLock<AHashMap<RuleId, StoredRule>>,
    next_id: AtomicU64,
}

impl MemoryRuleStore {
    pub fn new() -> Self {
        MemoryRuleStore {
            rules: RwLock::new(AHashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Snapshot every stored rule as JSON, ordered by id
    pub fn to_json(&self) -> Result<String> {
        let rules = self.rules.read();
        let mut snapshot: Vec<&StoredRule> = rules.values().collect();
        snapshot.sort_by_key(|r| r.id);
        Ok(serde_json::to_string(&snapshot)?)
    }

    /// Restore a store from a `to_json` snapshot
    ///
    /// New ids continue after the highest restored one.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Vec<StoredRule> = serde_json::from_str(json)?;
        let mut rules = AHashMap::with_capacity(snapshot.len());
        let mut max_id = 0;

        for rule in snapshot {
            max_id = max_id.max(rule.id);
            if rules.insert(rule.id, rule).is_some() {
                return Err(RuleEngineError::InvalidArgument(
                    "duplicate rule id in snapshot".to_string(),
                ));
            }
        }

        debug!(rules = rules.len(), next_id = max_id + 1, "rule store restored");
        Ok(MemoryRuleStore {
            rules: RwLock::new(rules),
            next_id: AtomicU64::new(max_id + 1),
        })
    }
}

impl Default for MemoryRuleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleStore for MemoryRuleStore {
    fn insert(&self, rule_string: &str, ast: Arc<Node>) -> Result<RuleId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let rule = StoredRule {
            id,
            rule_string: rule_string.to_string(),
            ast,
        };
        self.rules.write().insert(id, rule);
        debug!(id, rule_string, "rule stored");
        Ok(id)
    }

    fn get(&self, id: RuleId) -> Result<StoredRule> {
        self.rules
            .read()
            .get(&id)
            .cloned()
            .ok_or(RuleEngineError::RuleNotFound(id))
    }

    fn len(&self) -> usize {
        self.rules.read().len()
    }
}

//! Rule engine - create, combine and evaluate stored rules

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::config::EngineConfig;
use crate::error::{Result, RuleEngineError};
use crate::rule::{combine, evaluate, LogicalOp, Node, Record, RuleCache};
use crate::store::{MemoryRuleStore, RuleId, RuleStore, StoredRule};

/// Rule engine over a rule store
///
/// Compiled trees are shared between the cache, the store and any combined
/// tree built from them.
pub struct RuleEngine<S: RuleStore = MemoryRuleStore> {
    config: EngineConfig,
    cache: RuleCache,
    store: S,
}

impl RuleEngine<MemoryRuleStore> {
    /// Create an engine with an in-memory store
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_store(config, MemoryRuleStore::new())
    }
}

impl<S: RuleStore> RuleEngine<S> {
    pub fn with_store(config: EngineConfig, store: S) -> Result<Self> {
        config.validate()?;
        let cache = RuleCache::new(config.cache_capacity, config.max_nesting_depth);
        Ok(RuleEngine {
            config,
            cache,
            store,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Compile a rule string and store it
    #[instrument(skip(self))]
    pub fn create_rule(&self, rule_string: &str) -> Result<StoredRule> {
        if rule_string.trim().is_empty() {
            warn!("rejected empty rule string");
            return Err(RuleEngineError::InvalidArgument(
                "rule string is required".to_string(),
            ));
        }

        let ast = self.cache.get_or_compile(rule_string).inspect_err(|e| {
            warn!(error = %e, "rule failed to compile");
        })?;
        let id = self.store.insert(rule_string, Arc::clone(&ast))?;
        debug!(id, conditions = ast.condition_count(), "rule created");

        Ok(StoredRule {
            id,
            rule_string: rule_string.to_string(),
            ast,
        })
    }

    /// Combine stored rules, in the order given, under `operator`
    ///
    /// Falls back to the configured default operator.
    #[instrument(skip(self))]
    pub fn combine_rules(&self, ids: &[RuleId], operator: Option<LogicalOp>) -> Result<Arc<Node>> {
        if ids.is_empty() {
            warn!("rejected combine without rule ids");
            return Err(RuleEngineError::InvalidArgument(
                "rule ids are required".to_string(),
            ));
        }

        let operator = operator.unwrap_or(self.config.default_operator);
        let roots: Vec<Arc<Node>> = self
            .store
            .get_many(ids)?
            .into_iter()
            .map(|rule| rule.ast)
            .collect();

        let combined = combine(&roots, operator)?;
        debug!(%operator, rules = ids.len(), depth = combined.depth(), "rules combined");
        Ok(combined)
    }

    /// Evaluate a stored rule against a record
    #[instrument(skip(self, record))]
    pub fn evaluate_rule(&self, id: RuleId, record: &Record) -> Result<bool> {
        let rule = self.store.get(id)?;
        let result = evaluate(&rule.ast, record)?;
        debug!(result, "rule evaluated");
        Ok(result)
    }

    /// Compile (through the cache) and evaluate a rule string
    pub fn evaluate(&self, rule_string: &str, record: &Record) -> Result<bool> {
        let ast = self.cache.get_or_compile(rule_string)?;
        evaluate(&ast, record)
    }

    /// Number of rules held by the compile cache
    pub fn cached_rules(&self) -> usize {
        self.cache.len()
    }
}

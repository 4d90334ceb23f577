//! Compiled rule cache - keyed by rule string, fast hashing

use std::sync::Arc;

use ahash::AHashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::rule::ast::{Node, Record};
use crate::rule::evaluator::evaluate;
use crate::rule::parser::{create_rule_with_depth, DEFAULT_MAX_NESTING_DEPTH};

/// Default number of distinct rule strings kept
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Process-wide cache used by the free functions below
static GLOBAL_CACHE: Lazy<RuleCache> =
    Lazy::new(|| RuleCache::new(DEFAULT_CACHE_CAPACITY, DEFAULT_MAX_NESTING_DEPTH));

/// Memoizes compiled trees by their source string
///
/// Once full, new rules are still compiled but no longer inserted. A
/// capacity of zero disables caching.
pub struct RuleCache {
    entries: RwLock<AHashMap<String, Arc<Node>>>,
    capacity: usize,
    max_depth: usize,
}

impl RuleCache {
    pub fn new(capacity: usize, max_depth: usize) -> Self {
        RuleCache {
            entries: RwLock::new(AHashMap::with_capacity(capacity.min(DEFAULT_CACHE_CAPACITY))),
            capacity,
            max_depth,
        }
    }

    /// Get or compile a rule string
    pub fn get_or_compile(&self, rule: &str) -> Result<Arc<Node>> {
        // Fast path: check read lock first
        {
            let entries = self.entries.read();
            if let Some(ast) = entries.get(rule) {
                return Ok(Arc::clone(ast));
            }
        }

        // Slow path: compile and cache
        let ast = Arc::new(create_rule_with_depth(rule, self.max_depth)?);

        let mut entries = self.entries.write();
        if entries.len() < self.capacity {
            entries.insert(rule.to_string(), Arc::clone(&ast));
            debug!(rule, cached = entries.len(), "compiled rule cached");
        } else {
            debug!(rule, capacity = self.capacity, "rule cache full, not caching");
        }

        Ok(ast)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl Default for RuleCache {
    fn default() -> Self {
        RuleCache::new(DEFAULT_CACHE_CAPACITY, DEFAULT_MAX_NESTING_DEPTH)
    }
}

/// Get or compile a rule string through the process-wide cache
#[inline]
pub fn get_or_compile(rule: &str) -> Result<Arc<Node>> {
    GLOBAL_CACHE.get_or_compile(rule)
}

/// Evaluate a rule string against a record, using the cached AST
#[inline]
pub fn check_rule(rule: &str, record: &Record) -> Result<bool> {
    let ast = get_or_compile(rule)?;
    evaluate(&ast, record)
}

/// Clear the process-wide cache
pub fn clear_cache() {
    GLOBAL_CACHE.clear();
}

/// Number of rules held by the process-wide cache
pub fn cache_size() -> usize {
    GLOBAL_CACHE.len()
}

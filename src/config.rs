//! Engine configuration
//!
//! Every field has a default, so an empty JSON object is a valid config.

use serde::Deserialize;

use crate::error::{Result, RuleEngineError};
use crate::rule::{LogicalOp, DEFAULT_CACHE_CAPACITY, DEFAULT_MAX_NESTING_DEPTH};

/// Rule engine configuration
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Operator used by `combine_rules` when the caller gives none
    pub default_operator: LogicalOp,
    /// Distinct rule strings kept compiled, 0 disables the cache
    pub cache_capacity: usize,
    /// Maximum parenthesis nesting accepted by the parser, at most the default
    /// so stored trees always serialize
    pub max_nesting_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            default_operator: LogicalOp::And,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON config
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| RuleEngineError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=DEFAULT_MAX_NESTING_DEPTH).contains(&self.max_nesting_depth) {
            return Err(RuleEngineError::InvalidConfig(format!(
                "max_nesting_depth must be between 1 and {}, got {}",
                DEFAULT_MAX_NESTING_DEPTH, self.max_nesting_depth
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.default_operator, LogicalOp::And);
    }

    #[test]
    fn test_partial_override() {
        let config =
            EngineConfig::from_json(r#"{"default_operator": "OR", "cache_capacity": 0}"#).unwrap();
        assert_eq!(config.default_operator, LogicalOp::Or);
        assert_eq!(config.cache_capacity, 0);
        assert_eq!(config.max_nesting_depth, DEFAULT_MAX_NESTING_DEPTH);
    }

    #[test]
    fn test_invalid_config() {
        for json in [
            r#"{"max_nesting_depth": 0}"#,
            r#"{"max_nesting_depth": 25}"#,
            r#"{"default_operator": "XOR"}"#,
            r#"{"cache_size": 10}"#,
            "not json",
        ] {
            assert!(
                matches!(
                    EngineConfig::from_json(json),
                    Err(RuleEngineError::InvalidConfig(_))
                ),
                "Expected invalid config for: {}",
                json
            );
        }
    }
}

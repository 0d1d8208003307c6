//! Migrator configuration

use serde::{Deserialize, Serialize};
use shift_types::{Optimizer, ReadOptions, TagPolicy};

use crate::error::ConfigError;

/// Settings bound into a [`DataFixer`](crate::DataFixer) when it is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixerConfig {
    /// Handling of tagged choice keys without an alternative
    pub tag_policy: TagPolicy,
    /// Optimizer run over composed conversions
    pub optimizer: Optimizer,
    /// Keep composed rules and rewrite results between calls
    pub cache_rules: bool,
}

impl FixerConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With tag policy
    #[inline]
    #[must_use]
    pub fn with_tag_policy(mut self, tag_policy: TagPolicy) -> Self {
        self.tag_policy = tag_policy;
        self
    }

    /// With optimizer
    #[inline]
    #[must_use]
    pub fn with_optimizer(mut self, optimizer: Optimizer) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// With rule caching on or off
    #[inline]
    #[must_use]
    pub fn with_cache_rules(mut self, cache_rules: bool) -> Self {
        self.cache_rules = cache_rules;
        self
    }

    /// Decode options derived from this configuration
    #[inline]
    #[must_use]
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions::with_tag_policy(self.tag_policy)
    }

    /// Parse from TOML; missing keys take their defaults
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }
}

impl Default for FixerConfig {
    fn default() -> Self {
        Self {
            tag_policy: TagPolicy::Lenient,
            optimizer: Optimizer::Fuse,
            cache_rules: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_are_lenient_and_cached() {
        let config = FixerConfig::new();
        assert_eq!(config.tag_policy, TagPolicy::Lenient);
        assert_eq!(config.optimizer, Optimizer::Fuse);
        assert!(config.cache_rules);
    }

    #[test]
    fn toml_overrides_some_keys() {
        let config = FixerConfig::from_toml_str("tag_policy = \"strict\"\n").unwrap();
        assert_eq!(config, FixerConfig::new().with_tag_policy(TagPolicy::Strict));
    }

    #[test]
    fn toml_rejects_unknown_policy() {
        assert!(FixerConfig::from_toml_str("tag_policy = \"sometimes\"").is_err());
    }

    #[test]
    fn builders_chain() {
        let config = FixerConfig::new()
            .with_optimizer(Optimizer::None)
            .with_cache_rules(false);
        assert_eq!(config.optimizer, Optimizer::None);
        assert!(!config.cache_rules);
    }
}

//! Migration orchestrator
//!
//! [`DataFixer`] owns the version table and the ordered fix list, and
//! memoizes everything derived from them:
//! - per-fix rules, built once
//! - composed rules per `(from, to)` version pair
//! - rewrite results per `(type, from, to)`
//!
//! Memoized values are pure functions of their key, so concurrent callers
//! racing on a miss compute the same thing and one insert wins.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use shift_dynamic::{DecodeError, DynamicOps, Recoverable, Value, ValueOps};
use shift_types::{ConversionError, RewriteResult, RewriteRule, Schema, Type};
use tracing::{debug, error};

use crate::config::FixerConfig;
use crate::error::{MigrationError, Result};
use crate::fix::{DataFix, FixContext};

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the rewrite cache
    pub hits: u64,
    /// Lookups that had to compute a rewrite
    pub misses: u64,
    /// Rewrite results currently cached
    pub cached_results: usize,
}

impl CacheStats {
    /// Fraction of lookups answered from cache
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Migrates values between schema versions
pub struct DataFixer {
    config: FixerConfig,
    schemas: BTreeMap<u32, Arc<Schema>>,
    fixes: Vec<Arc<dyn DataFix>>,
    fix_rules: DashMap<usize, RewriteRule>,
    rules: DashMap<(u32, u32), RewriteRule>,
    results: DashMap<(Type, u32, u32), Arc<RewriteResult>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for DataFixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataFixer")
            .field("config", &self.config)
            .field("versions", &self.schemas.keys().collect::<Vec<_>>())
            .field(
                "fixes",
                &self.fixes.iter().map(|fix| fix.name()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl DataFixer {
    /// Assemble a fixer; fixes are stably ordered by version key
    pub(crate) fn new(
        config: FixerConfig,
        schemas: BTreeMap<u32, Arc<Schema>>,
        mut fixes: Vec<Arc<dyn DataFix>>,
    ) -> Self {
        fixes.sort_by_key(|fix| fix.version_key());
        Self {
            config,
            schemas,
            fixes,
            fix_rules: DashMap::new(),
            rules: DashMap::new(),
            results: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Configuration bound into this fixer
    #[inline]
    #[must_use]
    pub fn config(&self) -> &FixerConfig {
        &self.config
    }

    /// Schema for `version`: the registered one with the greatest key not
    /// above it
    pub fn get_schema(&self, version: u32) -> Result<&Arc<Schema>> {
        self.schemas
            .range(..=version)
            .next_back()
            .map(|(_, schema)| schema)
            .ok_or(MigrationError::NoSchema(version))
    }

    /// Newest registered version key
    #[must_use]
    pub fn latest_version(&self) -> Option<u32> {
        self.schemas.keys().next_back().copied()
    }

    /// Registered version keys, oldest first
    pub fn versions(&self) -> impl Iterator<Item = u32> + '_ {
        self.schemas.keys().copied()
    }

    /// Registered fixes, in application order
    pub fn fixes(&self) -> impl Iterator<Item = &dyn DataFix> + '_ {
        self.fixes.iter().map(|fix| fix.as_ref())
    }

    /// Cache statistics
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            cached_results: self.results.len(),
        }
    }

    /// Migrate a [`Value`] of type `type_name` from version `from` to `to`
    ///
    /// Data that fails to decode, convert or encode is logged and returned
    /// unchanged. The one exception is an element with an unknown tag under
    /// [`TagPolicy::Lenient`](shift_types::TagPolicy::Lenient), which is
    /// logged and left out of the output. Errors are reserved for authoring problems and for unknown
    /// tags under [`TagPolicy::Strict`](shift_types::TagPolicy::Strict).
    pub fn update(&self, type_name: &str, value: Value, from: u32, to: u32) -> Result<Value> {
        self.update_dynamic(&ValueOps, type_name, value, from, to)
    }

    /// Migrate a value in any representation
    pub fn update_dynamic<T, O>(
        &self,
        ops: &O,
        type_name: &str,
        input: T,
        from: u32,
        to: u32,
    ) -> Result<T>
    where
        T: Clone,
        O: DynamicOps<T> + ?Sized,
    {
        if from >= to {
            return Ok(input);
        }
        let ty = self.get_schema(from)?.get_type(type_name)?;
        let result = self.rewrite(&ty, from, to)?;
        if result.is_nop() {
            return Ok(input);
        }

        let (rest, data) = match ty.read(ops, input.clone(), &self.config.read_options()) {
            Recoverable::Ok(read) => read,
            Recoverable::Err {
                error: DecodeError::UnknownTag { choice, key, fatal: true },
                ..
            } => return Err(MigrationError::UnknownTag { choice, key }),
            Recoverable::Err {
                error,
                partial: Some(read),
            } if error.is_skippable() => {
                error!(type_name, from, to, %error, "dropped elements with unknown tags while decoding");
                read
            }
            Recoverable::Miss(error) | Recoverable::Err { error, .. } => {
                error!(type_name, from, to, %error, "failed to decode value, leaving it unchanged");
                return Ok(input);
            }
        };

        let data = match result.view.apply_with(data, &self.config.read_options()) {
            Ok(data) => data,
            Err(ConversionError::Decode(DecodeError::UnknownTag {
                choice,
                key,
                fatal: true,
            })) => return Err(MigrationError::UnknownTag { choice, key }),
            Err(e) => {
                error!(type_name, from, to, error = %e, "failed to migrate value, leaving it unchanged");
                return Ok(input);
            }
        };

        match result.view.to.write(ops, rest, &data) {
            Ok(output) => Ok(output),
            Err(e) => {
                error!(type_name, from, to, error = %e, "failed to encode migrated value, leaving it unchanged");
                Ok(input)
            }
        }
    }

    /// Rewrite of `type_name` as declared at `from` into version `to`
    pub fn rewrite_for(&self, type_name: &str, from: u32, to: u32) -> Result<Arc<RewriteResult>> {
        let ty = self.get_schema(from)?.get_type(type_name)?;
        self.rewrite(&ty, from, to)
    }

    /// Rewrite of `ty` from version `from` to `to`, memoized
    pub fn rewrite(&self, ty: &Type, from: u32, to: u32) -> Result<Arc<RewriteResult>> {
        let key = (ty.clone(), from, to);
        if let Some(result) = self.results.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(result.value()));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let rule = self.rule(from, to)?;
        debug!(ty = %ty, from, to, "computing rewrite");
        let result = rule
            .rewrite(ty)
            .unwrap_or_else(|| RewriteResult::nop(ty.clone()))
            .optimize(self.config.optimizer);
        let result = Arc::new(result);
        if self.config.cache_rules {
            return Ok(Arc::clone(self.results.entry(key).or_insert(result).value()));
        }
        Ok(result)
    }

    /// Composed rule of every fix with a key in `(from, to]`
    pub fn rule(&self, from: u32, to: u32) -> Result<RewriteRule> {
        if let Some(rule) = self.rules.get(&(from, to)) {
            return Ok(rule.value().clone());
        }
        let mut parts = Vec::new();
        for (index, fix) in self.fixes.iter().enumerate() {
            let key = fix.version_key();
            if key > from && key <= to {
                parts.push(self.fix_rule(index)?);
            }
        }
        debug!(from, to, fixes = parts.len(), "composing rule");
        let rule = RewriteRule::seq(parts);
        if self.config.cache_rules {
            self.rules.insert((from, to), rule.clone());
        }
        Ok(rule)
    }

    fn fix_rule(&self, index: usize) -> Result<RewriteRule> {
        if let Some(rule) = self.fix_rules.get(&index) {
            return Ok(rule.value().clone());
        }
        let fix = &self.fixes[index];
        let key = fix.version_key();
        let input = self.get_schema(key.saturating_sub(1))?;
        let output = self.get_schema(key)?;
        let ctx = FixContext::new(
            fix.name(),
            input,
            output,
            self.config.optimizer,
            self.config.read_options(),
        );
        debug!(fix = fix.name(), key, "building fix rule");
        let rule = fix.make_rule(&ctx)?;
        Ok(self.fix_rules.entry(index).or_insert(rule).value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::DataFixerBuilder;
    use crate::fix::RenameFieldFix;
    use pretty_assertions::assert_eq;
    use shift_types::dsl::*;
    use shift_types::SchemaBuilder;

    fn fixer() -> DataFixer {
        let mut v0 = SchemaBuilder::new(0);
        v0.register("Player", all_with_remainder([field("name", string_type())]));
        let mut v1 = SchemaBuilder::new(10);
        v1.register("Player", all_with_remainder([field("displayName", string_type())]));

        let mut builder = DataFixerBuilder::new(FixerConfig::default());
        builder
            .add_schema(v0.build().unwrap())
            .add_schema(v1.build().unwrap())
            .add_fix(RenameFieldFix::new(10, "Player", "name", "displayName"));
        builder.build().unwrap()
    }

    #[test]
    fn schema_lookup_floors() {
        let fixer = fixer();
        assert_eq!(fixer.get_schema(5).unwrap().version_key(), 0);
        assert_eq!(fixer.get_schema(10).unwrap().version_key(), 10);
        assert_eq!(fixer.get_schema(99).unwrap().version_key(), 10);
        assert_eq!(fixer.latest_version(), Some(10));
        assert_eq!(fixer.versions().collect::<Vec<_>>(), vec![0, 10]);
    }

    #[test]
    fn backwards_update_is_identity() {
        let fixer = fixer();
        let value = Value::map([("displayName", Value::from("x"))]);
        assert_eq!(fixer.update("Player", value.clone(), 10, 0).unwrap(), value);
        assert_eq!(fixer.cache_stats(), CacheStats::default());
    }

    #[test]
    fn unknown_type_is_an_error() {
        let fixer = fixer();
        let err = fixer.update("Monster", Value::empty_map(), 0, 10).unwrap_err();
        assert!(matches!(err, MigrationError::Schema(_)));
    }

    #[test]
    fn repeat_lookups_hit_the_cache() {
        let fixer = fixer();
        fixer.rewrite_for("Player", 0, 10).unwrap();
        fixer.rewrite_for("Player", 0, 10).unwrap();
        let stats = fixer.cache_stats();
        assert_eq!((stats.hits, stats.misses, stats.cached_results), (1, 1, 1));
        assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn uncached_config_keeps_no_results() {
        let mut builder = DataFixerBuilder::new(FixerConfig::new().with_cache_rules(false));
        let mut v0 = SchemaBuilder::new(0);
        v0.register("Player", all_with_remainder([field("name", string_type())]));
        builder.add_schema(v0.build().unwrap());
        let fixer = builder.build().unwrap();
        fixer.rewrite_for("Player", 0, 10).unwrap();
        fixer.rewrite_for("Player", 0, 10).unwrap();
        assert_eq!(fixer.cache_stats().cached_results, 0);
        assert_eq!(fixer.cache_stats().misses, 2);
    }
}

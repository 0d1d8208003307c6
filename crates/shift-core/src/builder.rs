//! Fixer construction and warm-up

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use shift_types::{Schema, SchemaError};
use tokio::runtime::Handle;

use crate::config::FixerConfig;
use crate::error::{MigrationError, Result};
use crate::fix::DataFix;
use crate::fixer::DataFixer;

/// Future resolving once every warm-up task has finished
pub type Warmup = BoxFuture<'static, Result<()>>;

/// Collects schemas and fixes into a [`DataFixer`]
#[derive(Default)]
pub struct DataFixerBuilder {
    config: FixerConfig,
    schemas: Vec<Arc<Schema>>,
    fixes: Vec<Arc<dyn DataFix>>,
}

impl std::fmt::Debug for DataFixerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataFixerBuilder")
            .field("config", &self.config)
            .field("schemas", &self.schemas.len())
            .field("fixes", &self.fixes.len())
            .finish()
    }
}

impl DataFixerBuilder {
    /// Create a builder
    #[must_use]
    pub fn new(config: FixerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Register a schema version
    pub fn add_schema(&mut self, schema: impl Into<Arc<Schema>>) -> &mut Self {
        self.schemas.push(schema.into());
        self
    }

    /// Register a fix
    pub fn add_fix(&mut self, fix: impl DataFix + 'static) -> &mut Self {
        self.fixes.push(Arc::new(fix));
        self
    }

    /// Build the fixer; rules are computed lazily on first use
    pub fn build(self) -> Result<DataFixer> {
        let mut schemas = BTreeMap::new();
        for schema in self.schemas {
            let key = schema.version_key();
            if schemas.insert(key, schema).is_some() {
                return Err(SchemaError::DuplicateVersion(key).into());
            }
        }
        Ok(DataFixer::new(self.config, schemas, self.fixes))
    }

    /// Build the fixer and precompute the rewrites of `required_types`
    ///
    /// Data is warmed from every registered version that some fix moves it
    /// away from up to the newest version, the shape of a typical load path.
    /// One blocking task is spawned on `runtime` per such version and per
    /// required type present in its schema. The returned future resolves
    /// once all succeed, or with the first failure; the remaining tasks are
    /// left to finish on their own. The fixer is usable right away.
    pub fn build_optimized<I, S>(self, required_types: I, runtime: &Handle) -> Result<(Arc<DataFixer>, Warmup)>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fixer = Arc::new(self.build()?);
        let required: Vec<String> = required_types.into_iter().map(Into::into).collect();

        let mut tasks = Vec::new();
        if let Some(to) = fixer.latest_version() {
            let sources: Vec<(u32, Arc<Schema>)> = fixer
                .versions()
                .filter(|&from| {
                    fixer
                        .fixes()
                        .any(|fix| fix.version_key() > from && fix.version_key() <= to)
                })
                .map(|from| fixer.get_schema(from).map(|schema| (from, Arc::clone(schema))))
                .collect::<Result<_>>()?;

            for (from, schema) in sources {
                for name in required.iter().filter(|name| schema.contains(name)) {
                    let fixer = Arc::clone(&fixer);
                    let name = name.clone();
                    let task = runtime.spawn_blocking(move || fixer.rewrite_for(&name, from, to).map(drop));
                    tasks.push(task.map(|joined| {
                        joined
                            .map_err(|e| MigrationError::Warmup(e.to_string()))
                            .and_then(|result| result)
                    }));
                }
            }
        }

        let count = tasks.len();
        let warmup = try_join_all(tasks)
            .map(move |result| {
                result.map(|_| {
                    tracing::info!(tasks = count, "warm-up complete");
                })
            })
            .boxed();
        Ok((fixer, warmup))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shift_types::dsl::*;
    use shift_types::SchemaBuilder;

    fn schema(key: u32) -> Schema {
        let mut builder = SchemaBuilder::new(key);
        builder.register("Player", all_with_remainder([field("name", string_type())]));
        builder.build().unwrap()
    }

    #[test]
    fn duplicate_versions_are_rejected() {
        let mut builder = DataFixerBuilder::new(FixerConfig::default());
        builder.add_schema(schema(10)).add_schema(schema(10));
        let err = builder.build().unwrap_err();
        assert!(matches!(
            err,
            MigrationError::Schema(SchemaError::DuplicateVersion(10))
        ));
    }

    #[tokio::test]
    async fn warmup_without_fixes_resolves_immediately() {
        let mut builder = DataFixerBuilder::new(FixerConfig::default());
        builder.add_schema(schema(0));
        let (fixer, warmup) = builder
            .build_optimized(["Player"], &Handle::current())
            .unwrap();
        warmup.await.unwrap();
        assert_eq!(fixer.cache_stats().misses, 0);
    }
}

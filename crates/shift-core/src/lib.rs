//! Shift Core
//!
//! Versioned data fixes and the orchestrator that runs them:
//! - Declares migrations as [`DataFix`]es anchored to schema versions
//! - Composes and memoizes the rewrite for each type and version range
//! - Decodes, migrates and re-encodes values in any [`DynamicOps`] format
//! - Warms caches up in the background on a caller-supplied runtime
//!
//! # Example
//!
//! ```rust
//! use shift_core::{DataFixerBuilder, FixerConfig, RenameFieldFix};
//! use shift_dynamic::Value;
//! use shift_types::dsl::*;
//! use shift_types::SchemaBuilder;
//!
//! let mut v0 = SchemaBuilder::new(0);
//! v0.register("Player", all_with_remainder([field("name", string_type())]));
//! let mut v1 = SchemaBuilder::new(10);
//! v1.register("Player", all_with_remainder([field("displayName", string_type())]));
//!
//! let mut builder = DataFixerBuilder::new(FixerConfig::default());
//! builder
//!     .add_schema(v0.build().unwrap())
//!     .add_schema(v1.build().unwrap())
//!     .add_fix(RenameFieldFix::new(10, "Player", "name", "displayName"));
//! let fixer = builder.build().unwrap();
//!
//! let old = Value::map([("name", Value::from("Alice"))]);
//! let new = fixer.update("Player", old, 0, 10).unwrap();
//! assert_eq!(new, Value::map([("displayName", Value::from("Alice"))]));
//! ```
//!
//! [`DynamicOps`]: shift_dynamic::DynamicOps

#![warn(unreachable_pub)]

pub mod builder;
pub mod config;
pub mod error;
pub mod fix;
pub mod fixer;

pub use builder::{DataFixerBuilder, Warmup};
pub use config::FixerConfig;
pub use error::{ConfigError, FixError, MigrationError, Result};
pub use fix::{DataFix, FixContext, RenameFieldFix, SimpleFix, WidenTypeFix};
pub use fixer::{CacheStats, DataFixer};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for declaring and running migrations
    pub use crate::{
        DataFix, DataFixer, DataFixerBuilder, FixContext, FixError, FixerConfig, MigrationError,
        RenameFieldFix, SimpleFix, WidenTypeFix,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shift_dynamic::Value;
    use shift_types::dsl::*;
    use shift_types::SchemaBuilder;

    #[test]
    fn fixes_apply_in_key_order() {
        let mut v0 = SchemaBuilder::new(0);
        v0.register("Player", all_with_remainder([field("a", string_type())]));
        let mut v1 = SchemaBuilder::new(10);
        v1.register("Player", all_with_remainder([field("b", string_type())]));
        let mut v2 = SchemaBuilder::new(20);
        v2.register("Player", all_with_remainder([field("c", string_type())]));

        let mut builder = DataFixerBuilder::new(FixerConfig::default());
        builder
            .add_schema(v2.build().unwrap())
            .add_schema(v0.build().unwrap())
            .add_schema(v1.build().unwrap())
            // registered out of order on purpose
            .add_fix(RenameFieldFix::new(20, "Player", "b", "c"))
            .add_fix(RenameFieldFix::new(10, "Player", "a", "b"));
        let fixer = builder.build().unwrap();

        let out = fixer
            .update("Player", Value::map([("a", Value::from("x"))]), 0, 20)
            .unwrap();
        assert_eq!(out, Value::map([("c", Value::from("x"))]));

        let names: Vec<&str> = fixer.fixes().map(|fix| fix.name()).collect();
        assert_eq!(names, ["rename Player.a to b", "rename Player.b to c"]);
    }

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}

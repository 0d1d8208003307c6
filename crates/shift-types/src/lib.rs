//! Shift Types
//!
//! Structural type algebra for migrating serialized data between schema
//! versions.
//!
//! # Core Concepts
//!
//! - **Type**: immutable description of a value's shape, compared structurally
//! - **TypeTemplate / RecursiveTypeFamily**: blueprints resolved into
//!   self-referential type tables
//! - **TypedOptic**: path into decoded data with a guaranteed capability
//! - **RewriteRule**: strategy turning one type into another, with the
//!   [`Conversion`] that migrates its data
//! - **Schema**: the named types of one data version
//!
//! # Example
//!
//! ```rust
//! use shift_dynamic::{Value, ValueOps};
//! use shift_types::dsl::*;
//! use shift_types::{ReadOptions, SchemaBuilder};
//!
//! let mut builder = SchemaBuilder::new(10);
//! builder.register("Player", all_with_remainder([field("name", string_type())]));
//! let schema = builder.build().unwrap();
//!
//! let player = schema.get_type("Player").unwrap();
//! let input = Value::map([("name", Value::from("Alice")), ("level", Value::from(3))]);
//! let (_, data) = player
//!     .read(&ValueOps, input.clone(), &ReadOptions::default())
//!     .ok()
//!     .unwrap();
//! let output = player.write(&ValueOps, Value::Empty, &data).unwrap();
//! assert_eq!(output, input);
//! ```

#![warn(unreachable_pub)]

mod codec;
mod conversion;
mod data;
pub mod dsl;
mod error;
mod family;
mod matcher;
mod optic;
mod optimizer;
mod rule;
mod schema;
mod template;
mod typed;
mod types;
mod view;

pub use codec::Primitive;
pub use conversion::{Conversion, ConvertFn, NamedFn};
pub use data::Data;
pub use error::{ConversionError, ConversionResult, FieldNotFound, SchemaError};
pub use family::{FamilyFold, RecursiveTypeFamily};
pub use matcher::{MatchOutcome, Matcher};
pub use optic::{
    AffineView, Capability, Iso, IsoFn, IsoView, LensView, Step, TraversalView, TypedOptic,
};
pub use optimizer::Optimizer;
pub use rule::{LazyRule, RewriteRule};
pub use schema::{key_sub_version, key_version, make_key, Schema, SchemaBuilder};
pub use template::TypeTemplate;
pub use typed::Typed;
pub use types::{Hook, HookFn, ReadOptions, TagPolicy, Type, TypeKind};
pub use view::{RecursionSet, RewriteResult, View};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for declaring schemas and fixes
    pub use crate::dsl::*;
    pub use crate::{
        Conversion, Data, Optimizer, ReadOptions, RewriteResult, RewriteRule, Schema,
        SchemaBuilder, TagPolicy, Type, TypeTemplate, Typed, View,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::dsl::*;
    use pretty_assertions::assert_eq;
    use shift_dynamic::{Value, ValueOps};

    #[test]
    fn widen_field_through_rule() {
        let mut builder = SchemaBuilder::new(10);
        builder.register("Item", all_with_remainder([field("count", int_type())]));
        let schema = builder.build().unwrap();
        let item = schema.get_type("Item").unwrap();

        let int = item.find_field_type("count").unwrap();
        let long = Type::primitive(Primitive::Long);
        let widen = RewriteResult::new(
            View::new(
                int.clone(),
                long,
                Conversion::function("widen", |d| match d {
                    Data::Int(v) => Ok(Data::Long(i64::from(v))),
                    other => Ok(other),
                }),
            ),
            RecursionSet::new(),
        );
        let rule = RewriteRule::everywhere(RewriteRule::if_same(int, widen), Optimizer::Fuse, true, true);
        let result = rule.rewrite(&item).unwrap();

        let input = Value::map([("count", Value::from(5)), ("tag", Value::from("x"))]);
        let (_, data) = item
            .read(&ValueOps, input, &ReadOptions::default())
            .ok()
            .unwrap();
        let out = result
            .view
            .to
            .write(&ValueOps, Value::Empty, &result.view.apply(data).unwrap())
            .unwrap();
        assert_eq!(
            out,
            Value::map([("count", Value::from(5_i64)), ("tag", Value::from("x"))])
        );
    }

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}

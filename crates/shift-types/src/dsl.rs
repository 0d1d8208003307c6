//! Schema construction DSL
//!
//! Every constructor returns a [`TypeTemplate`], so schemas can reference
//! their own types (and each other's) through [`id`] before those types are
//! resolved into a family.
//!
//! # Example
//!
//! ```rust
//! use shift_types::dsl::*;
//!
//! let player = fields([("name", string_type()), ("score", int_type())]);
//! let with_rest = all_with_remainder([field("name", string_type())]);
//! # let _ = (player, with_rest);
//! ```

use std::collections::BTreeMap;

use shift_dynamic::Value;

use crate::codec::Primitive;
use crate::template::TypeTemplate;
use crate::types::{Hook, Type};

fn leaf(primitive: Primitive) -> TypeTemplate {
    TypeTemplate::Const(Type::primitive(primitive))
}

/// Boolean leaf
#[must_use]
pub fn bool_type() -> TypeTemplate {
    leaf(Primitive::Bool)
}

/// 8-bit integer leaf
#[must_use]
pub fn byte_type() -> TypeTemplate {
    leaf(Primitive::Byte)
}

/// 16-bit integer leaf
#[must_use]
pub fn short_type() -> TypeTemplate {
    leaf(Primitive::Short)
}

/// 32-bit integer leaf
#[must_use]
pub fn int_type() -> TypeTemplate {
    leaf(Primitive::Int)
}

/// 64-bit integer leaf
#[must_use]
pub fn long_type() -> TypeTemplate {
    leaf(Primitive::Long)
}

/// 32-bit float leaf
#[must_use]
pub fn float_type() -> TypeTemplate {
    leaf(Primitive::Float)
}

/// 64-bit float leaf
#[must_use]
pub fn double_type() -> TypeTemplate {
    leaf(Primitive::Double)
}

/// String leaf
#[must_use]
pub fn string_type() -> TypeTemplate {
    leaf(Primitive::String)
}

/// Unit, consumes nothing
#[must_use]
pub fn unit() -> TypeTemplate {
    leaf(Primitive::Unit)
}

/// Everything not consumed by the rest of a record
#[must_use]
pub fn remainder() -> TypeTemplate {
    leaf(Primitive::Remainder)
}

/// Product
#[must_use]
pub fn and(first: TypeTemplate, second: TypeTemplate) -> TypeTemplate {
    TypeTemplate::product(first, second)
}

/// Sum
#[must_use]
pub fn or(left: TypeTemplate, right: TypeTemplate) -> TypeTemplate {
    TypeTemplate::sum(left, right)
}

/// List
#[must_use]
pub fn list(element: TypeTemplate) -> TypeTemplate {
    TypeTemplate::list(element)
}

/// Map with typed keys
#[must_use]
pub fn compound_list(key: TypeTemplate, value: TypeTemplate) -> TypeTemplate {
    TypeTemplate::compound_list(key, value)
}

/// Tagged choice keyed by `name`
pub fn tagged_choice<K: Into<String>>(
    name: impl Into<String>,
    key_type: Type,
    alternatives: impl IntoIterator<Item = (K, TypeTemplate)>,
) -> TypeTemplate {
    TypeTemplate::TaggedChoice {
        name: name.into(),
        key_type,
        alternatives: alternatives
            .into_iter()
            .map(|(k, t)| (k.into(), t))
            .collect::<BTreeMap<_, _>>(),
    }
}

/// Nominal wrapper
#[must_use]
pub fn named(name: impl Into<String>, inner: TypeTemplate) -> TypeTemplate {
    TypeTemplate::named(name, inner)
}

/// Value stored under `name`
#[must_use]
pub fn field(name: impl Into<String>, inner: TypeTemplate) -> TypeTemplate {
    TypeTemplate::field(name, inner)
}

/// Present or absent
#[must_use]
pub fn optional(inner: TypeTemplate) -> TypeTemplate {
    or(inner, unit())
}

/// Fixed type, never rewritten
#[must_use]
pub fn constant(ty: Type) -> TypeTemplate {
    TypeTemplate::Const(ty)
}

/// Value transforms around `inner`
pub fn hook(
    inner: TypeTemplate,
    name: impl Into<std::sync::Arc<str>>,
    pre_read: impl Fn(Value) -> Value + Send + Sync + 'static,
    post_write: impl Fn(Value) -> Value + Send + Sync + 'static,
) -> TypeTemplate {
    TypeTemplate::Hook(Box::new(inner), Hook::new(name, pre_read, post_write))
}

/// Guard accepting only family index `index`
#[must_use]
pub fn check(name: impl Into<String>, index: usize, inner: TypeTemplate) -> TypeTemplate {
    TypeTemplate::Check {
        name: name.into(),
        index,
        element: Box::new(inner),
    }
}

/// Reference to family index `index`
#[must_use]
pub fn id(index: usize) -> TypeTemplate {
    TypeTemplate::RecursivePoint(index)
}

fn chain(parts: Vec<TypeTemplate>, last: TypeTemplate) -> TypeTemplate {
    parts.into_iter().rev().fold(last, |rest, part| and(part, rest))
}

/// Required fields, in order, then every key they leave unread
pub fn fields<N: Into<String>>(entries: impl IntoIterator<Item = (N, TypeTemplate)>) -> TypeTemplate {
    chain(entries.into_iter().map(|(n, t)| field(n, t)).collect(), remainder())
}

/// Fields that may each be absent
pub fn optional_fields<N: Into<String>>(
    entries: impl IntoIterator<Item = (N, TypeTemplate)>,
) -> TypeTemplate {
    chain(
        entries
            .into_iter()
            .map(|(n, t)| optional(field(n, t)))
            .collect(),
        remainder(),
    )
}

/// The templates in order, then every key they leave unread
pub fn all_with_remainder(templates: impl IntoIterator<Item = TypeTemplate>) -> TypeTemplate {
    chain(templates.into_iter().collect(), remainder())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::family::RecursiveTypeFamily;
    use crate::types::ReadOptions;
    use pretty_assertions::assert_eq;
    use shift_dynamic::ValueOps;

    fn resolve(template: TypeTemplate) -> Type {
        RecursiveTypeFamily::new("dsl", vec![template]).apply(0)
    }

    #[test]
    fn remainder_keeps_unknown_keys() {
        let ty = resolve(all_with_remainder([field("a", int_type())]));
        let input = Value::map([("a", Value::from(1)), ("b", Value::from("x"))]);
        let out = ty.read_and_write(&ValueOps, input.clone(), &ReadOptions::default());
        assert_eq!(out.ok(), Some(input));
    }

    #[test]
    fn optional_fields_accept_absence() {
        let ty = resolve(optional_fields([("a", int_type()), ("b", string_type())]));
        let input = Value::map([("b", Value::from("x"))]);
        let out = ty.read_and_write(&ValueOps, input.clone(), &ReadOptions::default());
        assert_eq!(out.ok(), Some(input));
    }

    #[test]
    fn fields_chain_ends_in_remainder() {
        assert_eq!(
            fields([("a", int_type())]),
            and(field("a", int_type()), remainder())
        );
    }

    #[test]
    fn nested_fields_keep_unknown_keys() {
        let ty = resolve(list(fields([("a", int_type())])));
        let input = Value::List(vec![
            Value::map([("a", Value::from(1)), ("b", Value::from(2))]),
            Value::map([("a", Value::from(3))]),
        ]);
        let out = ty.read_and_write(&ValueOps, input.clone(), &ReadOptions::default());
        assert_eq!(out.ok(), Some(input));
    }

    #[test]
    fn tagged_alternatives_keep_unknown_keys() {
        let ty = resolve(field(
            "shape",
            tagged_choice(
                "type",
                Type::primitive(Primitive::String),
                [("circle", fields([("r", int_type())]))],
            ),
        ));
        let input = Value::map([(
            "shape",
            Value::map([
                ("type", Value::from("circle")),
                ("r", Value::from(1)),
                ("color", Value::from("red")),
            ]),
        )]);
        let out = ty.read_and_write(&ValueOps, input.clone(), &ReadOptions::default());
        assert_eq!(out.ok(), Some(input));
    }

    #[test]
    fn hook_transforms_around_inner() {
        let ty = resolve(hook(
            field("v", int_type()),
            "legacy-v",
            |v| v.rename_field("old", "v"),
            |v| v.rename_field("v", "old"),
        ));
        let input = Value::map([("old", Value::from(4))]);
        let out = ty.read_and_write(&ValueOps, input.clone(), &ReadOptions::default());
        assert_eq!(out.ok(), Some(input));
    }
}

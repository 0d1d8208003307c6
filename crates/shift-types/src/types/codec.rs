//! Reading and writing values through a [`Type`]

use serde::{Deserialize, Serialize};
use shift_dynamic::{DecodeError, DynamicOps, EncodeError, Recoverable};
use tracing::warn;

use super::{Type, TypeKind};
use crate::codec::Primitive;
use crate::data::Data;
use crate::typed::Typed;

/// What to do with a tagged choice key that has no alternative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagPolicy {
    /// Abort the whole decode
    Strict,
    /// Log and drop the element
    #[default]
    Lenient,
}

/// Options threaded through a decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadOptions {
    /// Unknown tagged choice key handling
    pub tag_policy: TagPolicy,
}

impl ReadOptions {
    /// Options with the given tag policy
    #[inline]
    #[must_use]
    pub fn with_tag_policy(tag_policy: TagPolicy) -> Self {
        Self { tag_policy }
    }
}

type ReadResult<T> = Recoverable<(T, Data), DecodeError>;

/// Deepest recursion unfolding tried when looking for a default value
const MAX_POINT_DEPTH: usize = 16;

impl Type {
    /// Decode `input`, returning what is left of it and the decoded data
    ///
    /// Containers keep the elements that decoded and report the first
    /// failure alongside the partial result. Fatal errors abort at once.
    pub fn read<T, O>(&self, ops: &O, input: T, options: &ReadOptions) -> ReadResult<T>
    where
        T: Clone,
        O: DynamicOps<T> + ?Sized,
    {
        match self.kind() {
            TypeKind::Primitive(Primitive::Unit) => Recoverable::Ok((input, Data::Unit)),
            TypeKind::Primitive(p) => match p.decode(ops, &input) {
                Ok(data) => Recoverable::Ok((ops.empty(), data)),
                Err(e) => Recoverable::fail(e),
            },
            TypeKind::Product(a, b) => read_product(a, b, ops, input, options),
            TypeKind::Sum(a, b) => read_sum(a, b, ops, input, options),
            TypeKind::List(element) => read_list(element, ops, &input, options),
            TypeKind::CompoundList(key, value) => {
                read_compound_list(key, value, ops, &input, options)
            }
            TypeKind::TaggedChoice {
                name,
                key_type,
                alternatives,
            } => {
                let Some(raw_key) = ops.get(&input, name) else {
                    return Recoverable::fail(DecodeError::MissingField(name.clone()));
                };
                let key = match key_type.read(ops, raw_key, options) {
                    Recoverable::Ok((_, key)) => key,
                    other => {
                        return Recoverable::fail(
                            other
                                .error()
                                .cloned()
                                .unwrap_or_else(|| DecodeError::MissingField(name.clone())),
                        )
                    }
                };
                let Some(key) = key.key_string() else {
                    return Recoverable::fail(DecodeError::mismatch("tag key", key.kind()));
                };
                let Some(alternative) = alternatives.get(&key) else {
                    let fatal = options.tag_policy == TagPolicy::Strict;
                    if !fatal {
                        warn!(choice = %name, key = %key, "dropping element with unknown tag");
                    }
                    return Recoverable::fail(DecodeError::UnknownTag {
                        choice: name.clone(),
                        key,
                        fatal,
                    });
                };
                let rest = ops.remove(input, name);
                alternative
                    .read(ops, rest, options)
                    .map(|(rest, data)| (rest, Data::tagged(key, data)))
            }
            TypeKind::Named(_, inner) => inner.read(ops, input, options),
            TypeKind::Field(name, inner) => {
                let Some(value) = ops.get(&input, name) else {
                    return Recoverable::fail(DecodeError::MissingField(name.clone()));
                };
                let rest = ops.remove(input, name);
                inner
                    .read(ops, value, options)
                    .map(move |(_, data)| (rest, data))
            }
            TypeKind::Check {
                name,
                index,
                expected,
                delegate,
            } => {
                if index == expected {
                    delegate.read(ops, input, options)
                } else {
                    Recoverable::fail(DecodeError::CheckFailed {
                        name: name.clone(),
                        index: *index,
                        expected: *expected,
                    })
                }
            }
            TypeKind::Hook(inner, hook) => {
                let value = hook.pre_read(ops.to_value(&input));
                inner.read(ops, ops.from_value(&value), options)
            }
            TypeKind::RecursivePoint { family, index } => {
                family.apply(*index).read(ops, input, options)
            }
        }
    }

    /// Encode `data`, merging it into `prefix`
    ///
    /// [`Data::Dynamic`] is accepted for any type and merged verbatim.
    pub fn write<T, O>(&self, ops: &O, prefix: T, data: &Data) -> Result<T, EncodeError>
    where
        O: DynamicOps<T> + ?Sized,
    {
        if let Data::Dynamic(value) = data {
            if !matches!(self.kind(), TypeKind::Field(..)) {
                return ops.merge_maps(prefix, ops.from_value(value));
            }
        }
        let mismatch = || EncodeError::mismatch(self.to_string(), data.kind());
        match (self.kind(), data) {
            (TypeKind::Primitive(Primitive::Unit), Data::Unit) => Ok(prefix),
            (TypeKind::Primitive(p), _) => {
                let leaf = p.encode(ops, data)?;
                if ops.is_empty(&prefix) {
                    Ok(leaf)
                } else {
                    Err(EncodeError::NonEmptyPrefix { kind: p.name() })
                }
            }
            (TypeKind::Product(a, b), Data::Pair(da, db)) => {
                let prefix = a.write(ops, prefix, da)?;
                b.write(ops, prefix, db)
            }
            (TypeKind::Sum(a, _), Data::Left(inner)) => a.write(ops, prefix, inner),
            (TypeKind::Sum(_, b), Data::Right(inner)) => b.write(ops, prefix, inner),
            (TypeKind::List(element), Data::List(items)) => {
                let encoded = items
                    .iter()
                    .map(|item| element.write(ops, ops.empty(), item))
                    .collect::<Result<Vec<_>, _>>()?;
                if ops.is_empty(&prefix) {
                    Ok(ops.create_list(encoded))
                } else {
                    Err(EncodeError::NonEmptyPrefix { kind: "list" })
                }
            }
            (TypeKind::CompoundList(key, value), Data::List(entries)) => {
                let mut out = Vec::with_capacity(entries.len());
                for entry in entries {
                    let (k, v) = entry.as_pair().ok_or_else(mismatch)?;
                    let k = key.write(ops, ops.empty(), k)?;
                    let k = ops
                        .get_string(&k)
                        .map_err(|e| EncodeError::Message(format!("map key: {e}")))?;
                    out.push((k, value.write(ops, ops.empty(), v)?));
                }
                ops.merge_maps(prefix, ops.create_map(out))
            }
            (
                TypeKind::TaggedChoice {
                    name,
                    key_type,
                    alternatives,
                },
                Data::Tagged(key, inner),
            ) => {
                let alternative = alternatives.get(key).ok_or_else(|| {
                    EncodeError::Message(format!("no alternative '{key}' in tagged choice '{name}'"))
                })?;
                let out = alternative.write(ops, prefix, inner)?;
                let key_data = key_data(key_type, key)?;
                let key = key_type.write(ops, ops.empty(), &key_data)?;
                ops.merge_into_map(out, name, key)
            }
            (TypeKind::Named(_, inner), _) => inner.write(ops, prefix, data),
            (TypeKind::Field(name, inner), _) => {
                let value = inner.write(ops, ops.empty(), data)?;
                ops.merge_into_map(prefix, name, value)
            }
            (TypeKind::Check { delegate, .. }, _) => delegate.write(ops, prefix, data),
            (TypeKind::Hook(inner, hook), _) => {
                let written = inner.write(ops, ops.empty(), data)?;
                let value = hook.post_write(ops.to_value(&written));
                ops.merge_maps(prefix, ops.from_value(&value))
            }
            (TypeKind::RecursivePoint { family, index }, _) => {
                family.apply(*index).write(ops, prefix, data)
            }
            _ => Err(mismatch()),
        }
    }

    /// Decode and immediately re-encode, keeping unconsumed input
    pub fn read_and_write<T, O>(
        &self,
        ops: &O,
        input: T,
        options: &ReadOptions,
    ) -> Recoverable<T, DecodeError>
    where
        T: Clone,
        O: DynamicOps<T> + ?Sized,
    {
        match self.read(ops, input, options) {
            Recoverable::Ok((rest, data)) => match self.write(ops, rest, &data) {
                Ok(out) => Recoverable::Ok(out),
                Err(e) => Recoverable::fail(DecodeError::Message(e.to_string())),
            },
            Recoverable::Miss(e) => Recoverable::Miss(e),
            Recoverable::Err { error, .. } => Recoverable::fail(error),
        }
    }

    /// Decode into a [`Typed`] value
    pub fn read_typed<T, O>(
        &self,
        ops: &O,
        input: T,
        options: &ReadOptions,
    ) -> Recoverable<(T, Typed), DecodeError>
    where
        T: Clone,
        O: DynamicOps<T> + ?Sized,
    {
        self.read(ops, input, options)
            .map(|(rest, data)| (rest, Typed::new(self.clone(), data)))
    }

    /// Canonical default value, if the type has one
    ///
    /// Sums prefer the branch whose default needs the fewest recursion
    /// unfoldings, the left one on ties.
    #[must_use]
    pub fn point(&self) -> Option<Data> {
        self.point_at(0).map(|(data, _)| data)
    }

    fn point_at(&self, depth: usize) -> Option<(Data, usize)> {
        match self.kind() {
            TypeKind::Primitive(p) => Some((p.default_data(), depth)),
            TypeKind::Product(a, b) => {
                let (da, na) = a.point_at(depth)?;
                let (db, nb) = b.point_at(depth)?;
                Some((Data::pair(da, db), na.max(nb)))
            }
            TypeKind::Sum(a, b) => match (a.point_at(depth), b.point_at(depth)) {
                (Some((da, na)), Some((_, nb))) if na <= nb => Some((Data::left(da), na)),
                (_, Some((db, nb))) => Some((Data::right(db), nb)),
                (Some((da, na)), None) => Some((Data::left(da), na)),
                (None, None) => None,
            },
            TypeKind::List(_) | TypeKind::CompoundList(..) => Some((Data::List(Vec::new()), depth)),
            TypeKind::TaggedChoice { alternatives, .. } => alternatives
                .iter()
                .filter_map(|(key, ty)| {
                    ty.point_at(depth)
                        .map(|(d, n)| (Data::tagged(key.clone(), d), n))
                })
                .min_by_key(|(_, n)| *n),
            TypeKind::Named(_, inner)
            | TypeKind::Field(_, inner)
            | TypeKind::Hook(inner, _)
            | TypeKind::Check {
                delegate: inner, ..
            } => inner.point_at(depth),
            TypeKind::RecursivePoint { family, index } => {
                if depth >= MAX_POINT_DEPTH {
                    None
                } else {
                    family.apply(*index).point_at(depth + 1)
                }
            }
        }
    }
}

fn key_data(key_type: &Type, key: &str) -> Result<Data, EncodeError> {
    let mut ty = key_type.clone();
    loop {
        let next = match ty.kind() {
            TypeKind::Primitive(p) => {
                return p.parse_key(key).ok_or_else(|| {
                    EncodeError::Message(format!("key '{key}' is not a valid {p}"))
                })
            }
            TypeKind::Named(_, inner) | TypeKind::Hook(inner, _) => inner.clone(),
            _ => {
                return Err(EncodeError::Message(format!(
                    "unsupported tagged choice key type {key_type}"
                )))
            }
        };
        ty = next;
    }
}

/// Keep the more serious of the recorded and the new error
fn note(slot: &mut Option<DecodeError>, error: DecodeError) {
    *slot = Some(match slot.take() {
        Some(first) => first.or_worse(error),
        None => error,
    });
}

fn read_product<T, O>(a: &Type, b: &Type, ops: &O, input: T, options: &ReadOptions) -> ReadResult<T>
where
    T: Clone,
    O: DynamicOps<T> + ?Sized,
{
    let (rest, first, first_error) = match a.read(ops, input, options) {
        Recoverable::Ok((rest, data)) => (rest, data, None),
        Recoverable::Err {
            error,
            partial: Some((rest, data)),
        } if !error.is_fatal() => (rest, data, Some(error)),
        Recoverable::Miss(error) | Recoverable::Err { error, .. } => {
            return Recoverable::fail(error)
        }
    };
    match b.read(ops, rest, options) {
        Recoverable::Ok((rest, second)) => {
            let out = (rest, Data::pair(first, second));
            match first_error {
                Some(error) => Recoverable::fail_with(error, out),
                None => Recoverable::Ok(out),
            }
        }
        Recoverable::Err {
            error,
            partial: Some((rest, second)),
        } if !error.is_fatal() => {
            let error = match first_error {
                Some(first) => first.or_worse(error),
                None => error,
            };
            Recoverable::fail_with(error, (rest, Data::pair(first, second)))
        }
        Recoverable::Miss(error) | Recoverable::Err { error, .. } => Recoverable::fail(error),
    }
}

fn read_sum<T, O>(a: &Type, b: &Type, ops: &O, input: T, options: &ReadOptions) -> ReadResult<T>
where
    T: Clone,
    O: DynamicOps<T> + ?Sized,
{
    let left_error = match a.read(ops, input.clone(), options) {
        Recoverable::Ok((rest, data)) => return Recoverable::Ok((rest, Data::left(data))),
        Recoverable::Err { error, .. } if error.is_fatal() => return Recoverable::fail(error),
        Recoverable::Miss(error) | Recoverable::Err { error, .. } => error,
    };
    match b.read(ops, input, options) {
        Recoverable::Ok((rest, data)) => Recoverable::Ok((rest, Data::right(data))),
        Recoverable::Err { error, .. } if error.is_fatal() => Recoverable::fail(error),
        Recoverable::Err {
            error,
            partial: Some((rest, data)),
        } => Recoverable::fail_with(error, (rest, Data::right(data))),
        Recoverable::Miss(_) | Recoverable::Err { .. } => Recoverable::fail(left_error),
    }
}

fn read_list<T, O>(element: &Type, ops: &O, input: &T, options: &ReadOptions) -> ReadResult<T>
where
    T: Clone,
    O: DynamicOps<T> + ?Sized,
{
    let items = match ops.get_list(input) {
        Ok(items) => items,
        Err(e) => return Recoverable::fail(e),
    };
    let mut decoded = Vec::with_capacity(items.len());
    let mut first_error = None;
    for item in items {
        match element.read(ops, item, options) {
            Recoverable::Ok((_, data)) => decoded.push(data),
            Recoverable::Err { error, .. } if error.is_fatal() => return Recoverable::fail(error),
            Recoverable::Err {
                error,
                partial: Some((_, data)),
            } if error.is_skippable() => {
                decoded.push(data);
                note(&mut first_error, error);
            }
            Recoverable::Miss(error) | Recoverable::Err { error, .. } => {
                note(&mut first_error, error);
            }
        }
    }
    let out = (ops.empty(), Data::List(decoded));
    match first_error {
        Some(error) => Recoverable::fail_with(error, out),
        None => Recoverable::Ok(out),
    }
}

fn read_compound_list<T, O>(
    key: &Type,
    value: &Type,
    ops: &O,
    input: &T,
    options: &ReadOptions,
) -> ReadResult<T>
where
    T: Clone,
    O: DynamicOps<T> + ?Sized,
{
    let entries = match ops.get_map_entries(input) {
        Ok(entries) => entries,
        Err(e) => return Recoverable::fail(e),
    };
    let mut decoded = Vec::with_capacity(entries.len());
    let mut first_error = None;
    for (k, v) in entries {
        let k = key.read(ops, ops.create_string(&k), options);
        let v = value.read(ops, v, options);
        match (k, v) {
            (Recoverable::Ok((_, k)), Recoverable::Ok((_, v))) => decoded.push(Data::pair(k, v)),
            (
                Recoverable::Ok((_, k)),
                Recoverable::Err {
                    error,
                    partial: Some((_, v)),
                },
            ) if error.is_skippable() => {
                decoded.push(Data::pair(k, v));
                note(&mut first_error, error);
            }
            (k, v) => {
                let errors = [k.error(), v.error()];
                if let Some(fatal) = errors.iter().flatten().find(|e| e.is_fatal()) {
                    return Recoverable::fail((*fatal).clone());
                }
                if let Some(error) = errors.into_iter().flatten().next() {
                    note(&mut first_error, error.clone());
                }
            }
        }
    }
    let out = (ops.empty(), Data::List(decoded));
    match first_error {
        Some(error) => Recoverable::fail_with(error, out),
        None => Recoverable::Ok(out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shift_dynamic::{JsonOps, Value, ValueOps};
    use std::collections::BTreeMap;

    fn string() -> Type {
        Type::primitive(Primitive::String)
    }

    fn int() -> Type {
        Type::primitive(Primitive::Int)
    }

    fn player() -> Type {
        Type::named(
            "Player",
            Type::product(
                Type::field("name", string()),
                Type::product(Type::field("level", int()), Type::remainder()),
            ),
        )
    }

    fn shape() -> Type {
        let mut alternatives = BTreeMap::new();
        alternatives.insert(
            "circle".to_string(),
            Type::product(Type::field("radius", int()), Type::remainder()),
        );
        alternatives.insert(
            "square".to_string(),
            Type::product(Type::field("side", int()), Type::remainder()),
        );
        Type::tagged_choice("type", string(), alternatives)
    }

    #[test]
    fn fields_consume_their_keys() {
        let input = Value::map([
            ("name", Value::from("Alice")),
            ("level", Value::from(3)),
            ("guild", Value::from("red")),
        ]);
        let (rest, data) = player()
            .read(&ValueOps, input, &ReadOptions::default())
            .ok()
            .unwrap();
        assert!(rest.is_empty());
        let (name, tail) = data.as_pair().unwrap();
        assert_eq!(name, &Data::from("Alice"));
        let (level, remainder) = tail.as_pair().unwrap();
        assert_eq!(level, &Data::Int(3));
        assert_eq!(
            remainder,
            &Data::Dynamic(Value::map([("guild", Value::from("red"))]))
        );
    }

    #[test]
    fn remainder_round_trips_unknown_keys() {
        let input = Value::map([
            ("name", Value::from("Alice")),
            ("level", Value::from(3)),
            ("guild", Value::from("red")),
        ]);
        let out = player()
            .read_and_write(&ValueOps, input.clone(), &ReadOptions::default())
            .ok()
            .unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn missing_field_fails() {
        let input = Value::map([("name", Value::from("Alice"))]);
        let result = player().read(&ValueOps, input, &ReadOptions::default());
        assert_eq!(
            result.error(),
            Some(&DecodeError::MissingField("level".to_string()))
        );
    }

    #[test]
    fn optional_field_reads_as_right_unit_when_absent() {
        let ty = Type::product(
            Type::sum(Type::field("nick", string()), Type::unit()),
            Type::remainder(),
        );
        let (_, data) = ty
            .read(&ValueOps, Value::empty_map(), &ReadOptions::default())
            .ok()
            .unwrap();
        assert_eq!(data.as_pair().unwrap().0, &Data::right(Data::Unit));
    }

    #[test]
    fn tagged_choice_round_trip() {
        let input = serde_json::json!({"type": "circle", "radius": 2});
        let (_, data) = shape()
            .read(&JsonOps, input.clone(), &ReadOptions::default())
            .ok()
            .unwrap();
        assert!(matches!(&data, Data::Tagged(key, _) if key == "circle"));
        let out = shape().write(&JsonOps, serde_json::Value::Null, &data).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn unknown_tag_is_dropped_when_lenient() {
        let list = Type::list(shape());
        let input = serde_json::json!([
            {"type": "circle", "radius": 1},
            {"type": "hexagon", "side": 3}
        ]);
        let result = list.read(&JsonOps, input, &ReadOptions::default());
        assert!(result.is_err());
        let (_, data) = result.ok_or_partial().unwrap();
        assert_eq!(data.as_list().unwrap().len(), 1);
    }

    #[test]
    fn list_reports_lost_elements_over_skipped_tags() {
        let list = Type::list(shape());
        let input = serde_json::json!([
            {"type": "hexagon", "side": 3},
            {"type": "circle"},
            {"type": "square", "side": 2}
        ]);
        let result = list.read(&JsonOps, input, &ReadOptions::default());
        assert_eq!(
            result.error(),
            Some(&DecodeError::MissingField("radius".to_string()))
        );
    }

    #[test]
    fn unknown_tag_is_fatal_when_strict() {
        let list = Type::list(shape());
        let input = serde_json::json!([{"type": "hexagon"}]);
        let options = ReadOptions::with_tag_policy(TagPolicy::Strict);
        let result = list.read(&JsonOps, input, &options);
        assert!(result.error().unwrap().is_fatal());
        assert!(result.ok_or_partial().is_none());
    }

    #[test]
    fn compound_list_round_trip() {
        let ty = Type::compound_list(string(), int());
        let input = Value::map([("a", Value::from(1)), ("b", Value::from(2))]);
        let out = ty
            .read_and_write(&ValueOps, input.clone(), &ReadOptions::default())
            .ok()
            .unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn dynamic_data_is_written_verbatim() {
        let value = Value::map([("name", Value::from("Bob")), ("level", Value::from(1))]);
        let out = Type::list(player())
            .write(&ValueOps, Value::Empty, &Data::List(vec![Data::Dynamic(value.clone())]))
            .unwrap();
        assert_eq!(out, Value::List(vec![value]));
    }

    #[test]
    fn hook_transforms_around_read_and_write() {
        let hook = crate::types::Hook::new(
            "legacy-level",
            |v: Value| v.rename_field("lvl", "level"),
            |v: Value| v.rename_field("level", "lvl"),
        );
        let ty = Type::hook(Type::product(Type::field("level", int()), Type::remainder()), hook);
        let input = Value::map([("lvl", Value::from(4))]);
        let (_, data) = ty
            .read(&ValueOps, input.clone(), &ReadOptions::default())
            .ok()
            .unwrap();
        assert_eq!(data.as_pair().unwrap().0, &Data::Int(4));
        assert_eq!(ty.write(&ValueOps, Value::Empty, &data).unwrap(), input);
    }

    #[test]
    fn point_prefers_shallow_sum_branch() {
        let ty = Type::sum(Type::list(int()), Type::unit());
        assert_eq!(ty.point(), Some(Data::left(Data::List(Vec::new()))));
        let tagged = shape().point().unwrap();
        assert!(matches!(tagged, Data::Tagged(key, _) if key == "circle"));
    }
}

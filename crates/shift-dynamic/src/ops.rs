//! Format adapters
//!
//! [`DynamicOps`] abstracts a concrete serialized representation `T` (a
//! [`Value`] tree, a `serde_json::Value`, ...) behind the handful of
//! operations the type layer needs to read and write structured data.

use crate::error::{DecodeError, EncodeError};
use crate::value::{Number, Value};

/// Operations over one serialized representation
///
/// Implementations are stateless adapters shared across threads.
pub trait DynamicOps<T>: Send + Sync {
    /// Short adapter name for diagnostics
    fn name(&self) -> &'static str;

    /// The empty value, identity for merges
    fn empty(&self) -> T;

    /// Whether `input` is the empty value
    fn is_empty(&self, input: &T) -> bool;

    /// Create a boolean leaf
    fn create_bool(&self, value: bool) -> T;

    /// Create a numeric leaf, keeping its width where the format can
    fn create_number(&self, value: Number) -> T;

    /// Create a string leaf
    fn create_string(&self, value: &str) -> T;

    /// Create a list
    fn create_list(&self, items: Vec<T>) -> T;

    /// Create a map
    fn create_map(&self, entries: Vec<(String, T)>) -> T;

    /// Read a boolean leaf
    fn get_bool(&self, input: &T) -> Result<bool, DecodeError>;

    /// Read a numeric leaf
    fn get_number(&self, input: &T) -> Result<Number, DecodeError>;

    /// Read a string leaf
    fn get_string(&self, input: &T) -> Result<String, DecodeError>;

    /// Read list items
    fn get_list(&self, input: &T) -> Result<Vec<T>, DecodeError>;

    /// Read map entries in order
    fn get_map_entries(&self, input: &T) -> Result<Vec<(String, T)>, DecodeError>;

    /// Look up a map entry
    fn get(&self, input: &T, key: &str) -> Option<T>;

    /// Set a map entry, creating a map from the empty value
    fn set(&self, input: T, key: &str, value: T) -> T;

    /// Remove a map entry
    fn remove(&self, input: T, key: &str) -> T;

    /// Convert to the canonical tree
    fn to_value(&self, input: &T) -> Value;

    /// Convert from the canonical tree
    fn from_value(&self, value: &Value) -> T;

    /// Create a 32-bit integer leaf
    #[inline]
    fn create_int(&self, value: i32) -> T {
        self.create_number(Number::Int(value))
    }

    /// Create a 64-bit integer leaf
    #[inline]
    fn create_long(&self, value: i64) -> T {
        self.create_number(Number::Long(value))
    }

    /// Look up a map entry by a key that is itself a serialized string
    fn get_generic(&self, input: &T, key: &T) -> Option<T> {
        let key = self.get_string(key).ok()?;
        self.get(input, &key)
    }

    /// Insert `key: value` into `map`
    ///
    /// The empty value is treated as an empty map.
    fn merge_into_map(&self, map: T, key: &str, value: T) -> Result<T, EncodeError> {
        if self.is_empty(&map) || self.get_map_entries(&map).is_ok() {
            Ok(self.set(map, key, value))
        } else {
            Err(EncodeError::NotAMap {
                key: key.to_string(),
                found: self.to_value(&map).kind().to_string(),
            })
        }
    }

    /// Merge every entry of `other` into `prefix`
    ///
    /// Either side may be empty. A non-map `other` can only be merged into an
    /// empty prefix.
    fn merge_maps(&self, prefix: T, other: T) -> Result<T, EncodeError> {
        if self.is_empty(&other) {
            return Ok(prefix);
        }
        if self.is_empty(&prefix) {
            return Ok(other);
        }
        let entries = self
            .get_map_entries(&other)
            .map_err(|e| EncodeError::Message(e.to_string()))?;
        entries
            .into_iter()
            .try_fold(prefix, |acc, (key, value)| self.merge_into_map(acc, &key, value))
    }
}

/// Re-express `input` from one representation in another
pub fn convert<A, B, OA, OB>(from: &OA, to: &OB, input: &A) -> B
where
    OA: DynamicOps<A> + ?Sized,
    OB: DynamicOps<B> + ?Sized,
{
    to.from_value(&from.to_value(input))
}

/// Adapter over the canonical [`Value`] tree
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValueOps;

impl DynamicOps<Value> for ValueOps {
    fn name(&self) -> &'static str {
        "value"
    }

    fn empty(&self) -> Value {
        Value::Empty
    }

    fn is_empty(&self, input: &Value) -> bool {
        input.is_empty()
    }

    fn create_bool(&self, value: bool) -> Value {
        Value::Bool(value)
    }

    fn create_number(&self, value: Number) -> Value {
        Value::Number(value)
    }

    fn create_string(&self, value: &str) -> Value {
        Value::String(value.to_string())
    }

    fn create_list(&self, items: Vec<Value>) -> Value {
        Value::List(items)
    }

    fn create_map(&self, entries: Vec<(String, Value)>) -> Value {
        Value::map(entries)
    }

    fn get_bool(&self, input: &Value) -> Result<bool, DecodeError> {
        match input {
            Value::Bool(b) => Ok(*b),
            Value::Number(n) => n
                .as_i64()
                .map(|i| i != 0)
                .ok_or_else(|| DecodeError::mismatch("bool", n.to_string())),
            other => Err(DecodeError::mismatch("bool", other.kind())),
        }
    }

    fn get_number(&self, input: &Value) -> Result<Number, DecodeError> {
        input
            .as_number()
            .ok_or_else(|| DecodeError::mismatch("number", input.kind()))
    }

    fn get_string(&self, input: &Value) -> Result<String, DecodeError> {
        input
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DecodeError::mismatch("string", input.kind()))
    }

    fn get_list(&self, input: &Value) -> Result<Vec<Value>, DecodeError> {
        match input {
            Value::List(items) => Ok(items.clone()),
            Value::Empty => Ok(Vec::new()),
            other => Err(DecodeError::mismatch("list", other.kind())),
        }
    }

    fn get_map_entries(&self, input: &Value) -> Result<Vec<(String, Value)>, DecodeError> {
        match input {
            Value::Map(map) => Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
            Value::Empty => Ok(Vec::new()),
            other => Err(DecodeError::mismatch("map", other.kind())),
        }
    }

    fn get(&self, input: &Value, key: &str) -> Option<Value> {
        input.get(key).cloned()
    }

    fn set(&self, input: Value, key: &str, value: Value) -> Value {
        input.set(key, value)
    }

    fn remove(&self, input: Value, key: &str) -> Value {
        input.remove(key)
    }

    fn to_value(&self, input: &Value) -> Value {
        input.clone()
    }

    fn from_value(&self, value: &Value) -> Value {
        value.clone()
    }
}

//! Canonical opaque value tree
//!
//! Provides [`Value`], the format-independent representation every adapter
//! converts to and from, and [`Number`] for its numeric leaves.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display, Formatter};

/// Numeric leaf with its original width preserved
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// 8-bit signed
    Byte(i8),
    /// 16-bit signed
    Short(i16),
    /// 32-bit signed
    Int(i32),
    /// 64-bit signed
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
}

impl Number {
    /// Integral view of the number, if it has one
    ///
    /// Floats convert only when they carry no fractional part.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Byte(v) => Some(i64::from(v)),
            Self::Short(v) => Some(i64::from(v)),
            Self::Int(v) => Some(i64::from(v)),
            Self::Long(v) => Some(v),
            Self::Float(v) => integral(f64::from(v)),
            Self::Double(v) => integral(v),
        }
    }

    /// Floating point view of the number
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Byte(v) => f64::from(v),
            Self::Short(v) => f64::from(v),
            Self::Int(v) => f64::from(v),
            Self::Long(v) => v as f64,
            Self::Float(v) => f64::from(v),
            Self::Double(v) => v,
        }
    }

    /// Whether the number was produced as an integer
    #[inline]
    #[must_use]
    pub fn is_integral(&self) -> bool {
        !matches!(self, Self::Float(_) | Self::Double(_))
    }
}

/// Whole floats inside the `i64` range, `None` for anything else
#[allow(clippy::cast_possible_truncation)]
fn integral(v: f64) -> Option<i64> {
    // 2^63, exactly representable; i64::MAX is not
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (v.fract() == 0.0 && (-LIMIT..LIMIT).contains(&v)).then(|| v as i64)
}

impl Display for Number {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Byte(v) => write!(f, "{v}b"),
            Self::Short(v) => write!(f, "{v}s"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Long(v) => write!(f, "{v}L"),
            Self::Float(v) => write!(f, "{v}f"),
            Self::Double(v) => write!(f, "{v}d"),
        }
    }
}

/// Self-describing value tree
///
/// Maps keep insertion order so that a decode/encode cycle reproduces the
/// original key order.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value (the identity for merges)
    #[default]
    Empty,
    /// Boolean leaf
    Bool(bool),
    /// Numeric leaf
    Number(Number),
    /// String leaf
    String(String),
    /// Ordered sequence
    List(Vec<Value>),
    /// String-keyed map
    Map(IndexMap<String, Value>),
}

impl Value {
    /// Build a map from key/value pairs
    #[must_use]
    pub fn map<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Empty map
    #[inline]
    #[must_use]
    pub fn empty_map() -> Self {
        Self::Map(IndexMap::new())
    }

    /// Check for [`Value::Empty`]
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Borrow map entries
    #[inline]
    #[must_use]
    pub fn as_map(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Borrow list items
    #[inline]
    #[must_use]
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow string contents
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric leaf, if any
    #[inline]
    #[must_use]
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Look up a map entry
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Set a map entry, turning [`Value::Empty`] into a map
    ///
    /// Non-map values are returned unchanged.
    #[must_use]
    pub fn set(self, key: impl Into<String>, value: Value) -> Self {
        match self {
            Self::Empty => Self::map([(key.into(), value)]),
            Self::Map(mut map) => {
                map.insert(key.into(), value);
                Self::Map(map)
            }
            other => other,
        }
    }

    /// Remove a map entry, preserving the order of the others
    #[must_use]
    pub fn remove(self, key: &str) -> Self {
        match self {
            Self::Map(mut map) => {
                map.shift_remove(key);
                Self::Map(map)
            }
            other => other,
        }
    }

    /// Rename a map key in place, keeping its position
    ///
    /// Missing keys leave the value untouched.
    #[must_use]
    pub fn rename_field(self, from: &str, to: &str) -> Self {
        match self {
            Self::Map(map) if map.contains_key(from) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| if k == from { (to.to_string(), v) } else { (k, v) })
                    .collect(),
            ),
            other => other,
        }
    }

    /// Apply `f` to the entry at `key`, if present
    #[must_use]
    pub fn update(self, key: &str, f: impl FnOnce(Value) -> Value) -> Self {
        match self {
            Self::Map(mut map) => {
                if let Some(slot) = map.get_mut(key) {
                    let old = std::mem::take(slot);
                    *slot = f(old);
                }
                Self::Map(map)
            }
            other => other,
        }
    }

    /// Short description of the value's shape, for diagnostics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "<empty>"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Number(Number::Int(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Number(Number::Long(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Number(Number::Double(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Empty,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => match i32::try_from(i) {
                    Ok(small) => Self::Number(Number::Int(small)),
                    Err(_) => Self::Number(Number::Long(i)),
                },
                None => Self::Number(Number::Double(n.as_f64().unwrap_or(f64::NAN))),
            },
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Empty => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) if n.is_integral() => serde_json::Value::from(i),
                _ => serde_json::Number::from_f64(n.as_f64())
                    .map_or(serde_json::Value::Null, serde_json::Value::Number),
            },
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde_json::Value::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

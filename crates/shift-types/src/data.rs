//! Decoded structural data
//!
//! [`Data`] is what a [`Type`](crate::Type) reads a serialized value into.
//! Its shape mirrors the structural combinators only: names, field tags,
//! checks, hooks and recursion points leave no trace in the data.

use shift_dynamic::Value;

/// Format-independent decoded value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Data {
    /// Unit, also the data of absent optional parts
    #[default]
    Unit,
    /// Boolean leaf
    Bool(bool),
    /// 8-bit leaf
    Byte(i8),
    /// 16-bit leaf
    Short(i16),
    /// 32-bit leaf
    Int(i32),
    /// 64-bit leaf
    Long(i64),
    /// 32-bit float leaf
    Float(f32),
    /// 64-bit float leaf
    Double(f64),
    /// String leaf
    String(String),
    /// Product of two parts
    Pair(Box<Data>, Box<Data>),
    /// Left branch of a sum
    Left(Box<Data>),
    /// Right branch of a sum
    Right(Box<Data>),
    /// Homogeneous sequence, also key/value pairs of a compound list
    List(Vec<Data>),
    /// Tagged choice alternative with its key
    Tagged(String, Box<Data>),
    /// Pre-encoded value, written back verbatim
    Dynamic(Value),
}

impl Data {
    /// Build a pair
    #[inline]
    #[must_use]
    pub fn pair(first: Data, second: Data) -> Self {
        Self::Pair(Box::new(first), Box::new(second))
    }

    /// Build a left branch
    #[inline]
    #[must_use]
    pub fn left(inner: Data) -> Self {
        Self::Left(Box::new(inner))
    }

    /// Build a right branch
    #[inline]
    #[must_use]
    pub fn right(inner: Data) -> Self {
        Self::Right(Box::new(inner))
    }

    /// Build a tagged alternative
    #[inline]
    #[must_use]
    pub fn tagged(key: impl Into<String>, inner: Data) -> Self {
        Self::Tagged(key.into(), Box::new(inner))
    }

    /// Borrow both halves of a pair
    #[inline]
    #[must_use]
    pub fn as_pair(&self) -> Option<(&Data, &Data)> {
        match self {
            Self::Pair(a, b) => Some((a, b)),
            _ => None,
        }
    }

    /// Borrow list items
    #[inline]
    #[must_use]
    pub fn as_list(&self) -> Option<&[Data]> {
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

    /// Integral payload of any width
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Byte(v) => Some(i64::from(v)),
            Self::Short(v) => Some(i64::from(v)),
            Self::Int(v) => Some(i64::from(v)),
            Self::Long(v) => Some(v),
            _ => None,
        }
    }

    /// Render a tagged choice key
    #[must_use]
    pub fn key_string(&self) -> Option<String> {
        match self {
            Self::String(s) => Some(s.clone()),
            Self::Bool(b) => Some(b.to_string()),
            other => other.as_i64().map(|i| i.to_string()),
        }
    }

    /// Short description of the data's shape
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Bool(_) => "bool",
            Self::Byte(_) => "byte",
            Self::Short(_) => "short",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::Pair(..) => "pair",
            Self::Left(_) => "left",
            Self::Right(_) => "right",
            Self::List(_) => "list",
            Self::Tagged(..) => "tagged",
            Self::Dynamic(_) => "dynamic",
        }
    }
}

impl From<bool> for Data {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Data {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for Data {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<&str> for Data {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Data {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

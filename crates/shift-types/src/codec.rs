//! Leaf codecs

use std::fmt::{self, Display, Formatter};

use shift_dynamic::{DecodeError, DynamicOps, EncodeError, Number};

use crate::data::Data;

/// Leaf codec for a primitive type
///
/// `Unit` consumes nothing and `Remainder` captures everything that is left,
/// so partially known records keep their unknown keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Primitive {
    /// Boolean
    Bool,
    /// 8-bit integer
    Byte,
    /// 16-bit integer
    Short,
    /// 32-bit integer
    Int,
    /// 64-bit integer
    Long,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// String
    String,
    /// Consumes nothing, decodes to unit
    Unit,
    /// Passes through whatever input is left
    Remainder,
}

fn integral<O, T>(ops: &O, input: &T, target: &'static str) -> Result<i64, DecodeError>
where
    O: DynamicOps<T> + ?Sized,
{
    let number = ops.get_number(input)?;
    number.as_i64().ok_or_else(|| DecodeError::OutOfRange {
        value: number.to_string(),
        target,
    })
}

fn narrow<N: TryFrom<i64>>(value: i64, target: &'static str) -> Result<N, DecodeError> {
    N::try_from(value).map_err(|_| DecodeError::OutOfRange {
        value: value.to_string(),
        target,
    })
}

impl Primitive {
    /// Codec name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Byte => "byte",
            Self::Short => "short",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
            Self::Unit => "unit",
            Self::Remainder => "remainder",
        }
    }

    /// Decode one leaf
    ///
    /// Integers are accepted from any narrower or wider integral number as
    /// long as the value fits.
    pub fn decode<T, O>(self, ops: &O, input: &T) -> Result<Data, DecodeError>
    where
        O: DynamicOps<T> + ?Sized,
    {
        match self {
            Self::Bool => ops.get_bool(input).map(Data::Bool),
            Self::Byte => narrow(integral(ops, input, "byte")?, "byte").map(Data::Byte),
            Self::Short => narrow(integral(ops, input, "short")?, "short").map(Data::Short),
            Self::Int => narrow(integral(ops, input, "int")?, "int").map(Data::Int),
            Self::Long => integral(ops, input, "long").map(Data::Long),
            #[allow(clippy::cast_possible_truncation)]
            Self::Float => ops.get_number(input).map(|n| Data::Float(n.as_f64() as f32)),
            Self::Double => ops.get_number(input).map(|n| Data::Double(n.as_f64())),
            Self::String => ops.get_string(input).map(Data::String),
            Self::Unit => Ok(Data::Unit),
            Self::Remainder => Ok(Data::Dynamic(ops.to_value(input))),
        }
    }

    /// Encode one leaf
    pub fn encode<T, O>(self, ops: &O, data: &Data) -> Result<T, EncodeError>
    where
        O: DynamicOps<T> + ?Sized,
    {
        match (self, data) {
            (Self::Bool, Data::Bool(b)) => Ok(ops.create_bool(*b)),
            (Self::Byte, Data::Byte(v)) => Ok(ops.create_number(Number::Byte(*v))),
            (Self::Short, Data::Short(v)) => Ok(ops.create_number(Number::Short(*v))),
            (Self::Int, Data::Int(v)) => Ok(ops.create_number(Number::Int(*v))),
            (Self::Long, Data::Long(v)) => Ok(ops.create_number(Number::Long(*v))),
            (Self::Float, Data::Float(v)) => Ok(ops.create_number(Number::Float(*v))),
            (Self::Double, Data::Double(v)) => Ok(ops.create_number(Number::Double(*v))),
            (Self::String, Data::String(s)) => Ok(ops.create_string(s)),
            (Self::Unit, Data::Unit) => Ok(ops.empty()),
            (Self::Remainder, Data::Dynamic(v)) => Ok(ops.from_value(v)),
            (_, other) => Err(EncodeError::mismatch(self.name(), other.kind())),
        }
    }

    /// Canonical default payload
    #[must_use]
    pub fn default_data(self) -> Data {
        match self {
            Self::Bool => Data::Bool(false),
            Self::Byte => Data::Byte(0),
            Self::Short => Data::Short(0),
            Self::Int => Data::Int(0),
            Self::Long => Data::Long(0),
            Self::Float => Data::Float(0.0),
            Self::Double => Data::Double(0.0),
            Self::String => Data::String(String::new()),
            Self::Unit => Data::Unit,
            Self::Remainder => Data::Dynamic(shift_dynamic::Value::Empty),
        }
    }

    /// Parse a rendered tagged choice key back into a payload
    #[must_use]
    pub fn parse_key(self, key: &str) -> Option<Data> {
        match self {
            Self::String => Some(Data::String(key.to_string())),
            Self::Bool => key.parse().ok().map(Data::Bool),
            Self::Byte => key.parse().ok().map(Data::Byte),
            Self::Short => key.parse().ok().map(Data::Short),
            Self::Int => key.parse().ok().map(Data::Int),
            Self::Long => key.parse().ok().map(Data::Long),
            _ => None,
        }
    }
}

impl Display for Primitive {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shift_dynamic::{Value, ValueOps};

    #[test]
    fn int_accepts_fitting_long() {
        let data = Primitive::Int
            .decode(&ValueOps, &Value::from(42_i64))
            .unwrap();
        assert_eq!(data, Data::Int(42));
    }

    #[test]
    fn byte_rejects_out_of_range() {
        let err = Primitive::Byte
            .decode(&ValueOps, &Value::from(300))
            .unwrap_err();
        assert!(matches!(err, DecodeError::OutOfRange { target: "byte", .. }));
    }

    #[test]
    fn long_rejects_fractional() {
        assert!(Primitive::Long
            .decode(&ValueOps, &Value::from(1.5))
            .is_err());
    }

    #[test]
    fn encode_checks_payload_kind() {
        let err = Primitive::String
            .encode(&ValueOps, &Data::Int(1))
            .unwrap_err();
        assert_eq!(err, EncodeError::mismatch("string", "int"));
    }

    #[test]
    fn remainder_passes_value_through() {
        let value = Value::map([("extra", Value::from(true))]);
        let data = Primitive::Remainder.decode(&ValueOps, &value).unwrap();
        assert_eq!(Primitive::Remainder.encode(&ValueOps, &data).unwrap(), value);
    }

    #[test]
    fn keys_parse_by_codec() {
        assert_eq!(Primitive::Int.parse_key("7"), Some(Data::Int(7)));
        assert_eq!(Primitive::Int.parse_key("seven"), None);
        assert_eq!(
            Primitive::String.parse_key("circle"),
            Some(Data::from("circle"))
        );
    }
}

//! Adapter over `serde_json::Value`

use serde_json::{Map, Value as Json};

use crate::error::DecodeError;
use crate::ops::DynamicOps;
use crate::value::{Number, Value};

/// JSON adapter
///
/// JSON has no integer widths, so numbers come back as `Int` when they fit in
/// 32 bits, `Long` otherwise, and `Double` for fractional values. `null` is the
/// empty value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonOps;

fn json_kind(input: &Json) -> &'static str {
    match input {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

impl DynamicOps<Json> for JsonOps {
    fn name(&self) -> &'static str {
        "json"
    }

    fn empty(&self) -> Json {
        Json::Null
    }

    fn is_empty(&self, input: &Json) -> bool {
        input.is_null()
    }

    fn create_bool(&self, value: bool) -> Json {
        Json::Bool(value)
    }

    fn create_number(&self, value: Number) -> Json {
        match value {
            Number::Byte(v) => Json::from(v),
            Number::Short(v) => Json::from(v),
            Number::Int(v) => Json::from(v),
            Number::Long(v) => Json::from(v),
            Number::Float(v) => Json::from(f64::from(v)),
            Number::Double(v) => Json::from(v),
        }
    }

    fn create_string(&self, value: &str) -> Json {
        Json::String(value.to_string())
    }

    fn create_list(&self, items: Vec<Json>) -> Json {
        Json::Array(items)
    }

    fn create_map(&self, entries: Vec<(String, Json)>) -> Json {
        Json::Object(entries.into_iter().collect())
    }

    fn get_bool(&self, input: &Json) -> Result<bool, DecodeError> {
        input
            .as_bool()
            .ok_or_else(|| DecodeError::mismatch("bool", json_kind(input)))
    }

    fn get_number(&self, input: &Json) -> Result<Number, DecodeError> {
        let Json::Number(n) = input else {
            return Err(DecodeError::mismatch("number", json_kind(input)));
        };
        if let Some(i) = n.as_i64() {
            return Ok(i32::try_from(i).map_or(Number::Long(i), Number::Int));
        }
        n.as_f64()
            .map(Number::Double)
            .ok_or_else(|| DecodeError::Message(format!("unrepresentable number {n}")))
    }

    fn get_string(&self, input: &Json) -> Result<String, DecodeError> {
        input
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| DecodeError::mismatch("string", json_kind(input)))
    }

    fn get_list(&self, input: &Json) -> Result<Vec<Json>, DecodeError> {
        match input {
            Json::Array(items) => Ok(items.clone()),
            Json::Null => Ok(Vec::new()),
            other => Err(DecodeError::mismatch("array", json_kind(other))),
        }
    }

    fn get_map_entries(&self, input: &Json) -> Result<Vec<(String, Json)>, DecodeError> {
        match input {
            Json::Object(map) => Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
            Json::Null => Ok(Vec::new()),
            other => Err(DecodeError::mismatch("object", json_kind(other))),
        }
    }

    fn get(&self, input: &Json, key: &str) -> Option<Json> {
        input.get(key).cloned()
    }

    fn set(&self, input: Json, key: &str, value: Json) -> Json {
        match input {
            Json::Null => {
                let mut map = Map::new();
                map.insert(key.to_string(), value);
                Json::Object(map)
            }
            Json::Object(mut map) => {
                map.insert(key.to_string(), value);
                Json::Object(map)
            }
            other => other,
        }
    }

    fn remove(&self, input: Json, key: &str) -> Json {
        match input {
            Json::Object(mut map) => {
                map.remove(key);
                Json::Object(map)
            }
            other => other,
        }
    }

    fn to_value(&self, input: &Json) -> Value {
        Value::from(input.clone())
    }

    fn from_value(&self, value: &Value) -> Json {
        Json::from(value)
    }
}

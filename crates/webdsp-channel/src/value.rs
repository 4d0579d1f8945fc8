//! Positional argument values carried by envelopes.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use bson::spec::BinarySubtype;
use bson::{Binary, Bson};
use serde_json::Value as Json;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Binary(Vec<u8>),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Numbers with no fractional part.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(*n as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text-mode representation. Blobs become base64 strings; non-finite
    /// numbers have no JSON form and become `null`.
    pub fn to_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => match integral(*n) {
                Some(i) => Json::from(i),
                None => serde_json::Number::from_f64(*n).map_or(Json::Null, Json::Number),
            },
            Value::String(s) => Json::String(s.clone()),
            Value::Binary(bytes) => Json::String(BASE64.encode(bytes)),
        }
    }

    /// Nested arrays and objects are kept as their JSON text.
    pub fn from_json(json: Json) -> Self {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            Json::String(s) => Value::String(s),
            nested @ (Json::Array(_) | Json::Object(_)) => Value::String(nested.to_string()),
        }
    }

    /// Binary-mode representation. Integral numbers that fit in 32 bits are
    /// stored as Int32, everything else as Double.
    pub fn to_bson(&self) -> Bson {
        match self {
            Value::Null => Bson::Null,
            Value::Bool(b) => Bson::Boolean(*b),
            Value::Number(n) => match integral(*n).and_then(|i| i32::try_from(i).ok()) {
                Some(i) => Bson::Int32(i),
                None => Bson::Double(*n),
            },
            Value::String(s) => Bson::String(s.clone()),
            Value::Binary(bytes) => Bson::Binary(Binary {
                subtype: BinarySubtype::Generic,
                bytes: bytes.clone(),
            }),
        }
    }

    /// `None` for element types an envelope cannot carry.
    pub fn from_bson(bson: Bson) -> Option<Self> {
        match bson {
            Bson::Null | Bson::Undefined => Some(Value::Null),
            Bson::Boolean(b) => Some(Value::Bool(b)),
            Bson::Int32(i) => Some(Value::Number(f64::from(i))),
            Bson::Int64(i) => Some(Value::Number(i as f64)),
            Bson::Double(n) => Some(Value::Number(n)),
            Bson::String(s) => Some(Value::String(s)),
            Bson::Binary(binary) => Some(Value::Binary(binary.bytes)),
            _ => None,
        }
    }
}

fn integral(n: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up, so the upper bound is exclusive
    (n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64)
        .then_some(n as i64)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Binary(b) => write!(f, "<{} bytes>", b.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u8> for Value {
    fn from(n: u8) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Binary(bytes)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

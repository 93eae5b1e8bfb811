//! Conversion between [`StructuredValue`] and JSON.

use serde_json::{Map, Number, Value};

use crate::{Object, StructuredValue};

impl From<Value> for StructuredValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => Self::Decimal(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect::<Object>(),
            ),
        }
    }
}

impl StructuredValue {
    /// Render as JSON. Octets become an array of byte values; non-finite
    /// decimals become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Boolean(b) => Value::Bool(*b),
            Self::Integer(i) => Value::from(*i),
            Self::Decimal(d) => Number::from_f64(*d).map(Value::Number).unwrap_or(Value::Null),
            Self::String(s) => Value::String(s.clone()),
            Self::Octets(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(object) => {
                let mut map = Map::with_capacity(object.len());
                for (key, value) in object.iter() {
                    map.insert(key.to_string(), value.to_json());
                }
                Value::Object(map)
            }
        }
    }
}

//! JSON rendering and parsing of [`ModelNode`] trees.
//!
//! Bytes render as a list of numbers and parse back as a list; integral
//! numbers parse as `Int` when they fit and `Long` otherwise.

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::ModelNode;
use crate::errors::Result;

impl ModelNode {
    /// Convert to a `serde_json::Value`
    pub fn to_json(&self) -> Value {
        match self {
            Self::Undefined => Value::Null,
            Self::Boolean(b) => Value::Bool(*b),
            Self::Int(i) => Value::from(*i),
            Self::Long(l) => Value::from(*l),
            Self::Double(d) => serde_json::Number::from_f64(*d).map_or(Value::Null, Value::Number),
            Self::String(s) => Value::String(s.clone()),
            Self::Bytes(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Compact JSON text
    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    /// Indented JSON text
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.to_json()).unwrap_or_else(|_| self.to_json_string())
    }

    /// Build a node from a `serde_json::Value`
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Self::Undefined,
            Value::Bool(b) => Self::Boolean(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i32::try_from(i).map_or(Self::Long(i), Self::Int)
                } else if let Some(u) = n.as_u64() {
                    i64::try_from(u).map_or(Self::Double(u as f64), Self::Long)
                } else {
                    Self::Double(n.as_f64().unwrap_or_default())
                }
            }
            Value::String(s) => Self::String(s.clone()),
            Value::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect::<IndexMap<_, _>>(),
            ),
        }
    }

    /// Parse JSON text
    pub fn parse_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Ok(Self::from_json(&value))
    }
}

impl Serialize for ModelNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ModelNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Value::deserialize(deserializer).map(|value| Self::from_json(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_by_width() {
        let node = ModelNode::parse_json(r#"{"small": 7, "big": 9000000000, "f": 1.5}"#).unwrap();
        assert_eq!(node.get("small"), &ModelNode::Int(7));
        assert_eq!(node.get("big"), &ModelNode::Long(9_000_000_000));
        assert_eq!(node.get("f"), &ModelNode::Double(1.5));
    }

    #[test]
    fn object_order_survives_rendering() {
        let node = ModelNode::object().with("z", 1).with("a", true);
        assert_eq!(node.to_json_string(), r#"{"z":1,"a":true}"#);
    }

    #[test]
    fn rejects_malformed_text() {
        assert!(ModelNode::parse_json("{not json").is_err());
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tagged-value attribute representation of the durable store.
//!
//! Persisted records wrap every value in a type tag (`{"S": "..."}`,
//! `{"N": "..."}`, `{"BOOL": true}`, `{"NULL": true}`, `{"M": {...}}`,
//! `{"L": [...]}`). Older writers sometimes stored plain scalars, and some
//! rows carry a tag wrapped around another tag. The decoder accepts all
//! three shapes and normalizes to the scalar; the encoder always writes the
//! tagged form.

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    S(String),
    N(String),
    Bool(bool),
    Null,
    M(BTreeMap<String, AttrValue>),
    L(Vec<AttrValue>),
}

impl AttrValue {
    pub fn string(v: impl Into<String>) -> Self {
        AttrValue::S(v.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::S(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::N(n) => n.parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::N(n) => n.parse().ok(),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, AttrValue>> {
        match self {
            AttrValue::M(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[AttrValue]> {
        match self {
            AttrValue::L(l) => Some(l),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    /// Decode any JSON shape: tagged wrappers, plain scalars, or a tag
    /// wrapped around another tag (normalized to the innermost scalar).
    pub fn from_json(value: &Value) -> AttrValue {
        match value {
            Value::Null => AttrValue::Null,
            Value::Bool(b) => AttrValue::Bool(*b),
            Value::Number(n) => AttrValue::N(n.to_string()),
            Value::String(s) => AttrValue::S(s.clone()),
            Value::Array(items) => AttrValue::L(items.iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::from_object(map),
        }
    }

    fn from_object(map: &Map<String, Value>) -> AttrValue {
        if map.len() == 1 {
            if let Some((tag, inner)) = map.iter().next() {
                match (tag.as_str(), Self::from_json(inner)) {
                    ("S", AttrValue::S(s)) => return AttrValue::S(s),
                    // Numbers are stored as strings on the wire
                    ("N", AttrValue::S(n)) | ("N", AttrValue::N(n)) => return AttrValue::N(n),
                    ("BOOL", AttrValue::Bool(b)) => return AttrValue::Bool(b),
                    ("NULL", _) => return AttrValue::Null,
                    ("M", AttrValue::M(m)) => return AttrValue::M(m),
                    ("L", AttrValue::L(l)) => return AttrValue::L(l),
                    _ => {}
                }
            }
        }
        AttrValue::M(map.iter().map(|(k, v)| (k.clone(), Self::from_json(v))).collect())
    }

    /// The canonical tagged encoding.
    pub fn to_tagged_json(&self) -> Value {
        match self {
            AttrValue::S(s) => tagged("S", Value::String(s.clone())),
            AttrValue::N(n) => tagged("N", Value::String(n.clone())),
            AttrValue::Bool(b) => tagged("BOOL", Value::Bool(*b)),
            AttrValue::Null => tagged("NULL", Value::Bool(true)),
            AttrValue::M(m) => tagged(
                "M",
                Value::Object(m.iter().map(|(k, v)| (k.clone(), v.to_tagged_json())).collect()),
            ),
            AttrValue::L(l) => {
                tagged("L", Value::Array(l.iter().map(AttrValue::to_tagged_json).collect()))
            }
        }
    }

    /// Untagged JSON for handing to serde-derived record types.
    pub fn to_plain_json(&self) -> Value {
        match self {
            AttrValue::S(s) => Value::String(s.clone()),
            AttrValue::N(n) => match n.parse::<i64>() {
                Ok(i) => Value::Number(i.into()),
                Err(_) => n
                    .parse::<f64>()
                    .ok()
                    .and_then(Number::from_f64)
                    .map(Value::Number)
                    .unwrap_or_else(|| Value::String(n.clone())),
            },
            AttrValue::Bool(b) => Value::Bool(*b),
            AttrValue::Null => Value::Null,
            AttrValue::M(m) => {
                Value::Object(m.iter().map(|(k, v)| (k.clone(), v.to_plain_json())).collect())
            }
            AttrValue::L(l) => Value::Array(l.iter().map(AttrValue::to_plain_json).collect()),
        }
    }
}

fn tagged(tag: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(tag.to_string(), value);
    Value::Object(map)
}

impl Serialize for AttrValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_tagged_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AttrValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(AttrValue::from_json(&value))
    }
}

#[cfg(test)]
#[path = "attr_tests.rs"]
mod tests;

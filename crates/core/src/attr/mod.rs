//! Attribute-value codec.
//!
//! The store exchanges items as string-keyed maps of *attribute values*: a
//! closed, recursive sum type carried on the wire as single-key tagged JSON
//! objects (`{"S": "a"}`, `{"N": "12.5"}`, `{"L": [...]}`, ...). This module
//! owns that representation and the conversions to and from native
//! `serde_json` values.
//!
//! All functions here are pure; conversion bugs are caller bugs and are never
//! retried.

mod error;
mod marshal;

pub use error::CodecError;
pub use marshal::{
    item_from_wire, item_to_wire, marshal, marshal_item, sanitize, sanitize_item, unmarshal,
    unmarshal_item,
};

use std::collections::HashMap;

use serde_json::{json, Value};

/// A native item: one record as a string-keyed map of `serde_json` values.
pub type Item = serde_json::Map<String, Value>;

/// The tagged wire representation of one value exchanged with the store.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// String.
    S(String),
    /// Number, kept as the decimal string the wire format uses.
    N(String),
    /// Boolean.
    Bool(bool),
    /// Explicit null.
    Null,
    /// Ordered list of attribute values.
    L(Vec<AttributeValue>),
    /// String-keyed map of attribute values.
    M(HashMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Encodes this value into its tagged JSON wire form.
    pub fn to_wire(&self) -> Value {
        match self {
            AttributeValue::S(s) => json!({ "S": s }),
            AttributeValue::N(n) => json!({ "N": n }),
            AttributeValue::Bool(b) => json!({ "BOOL": b }),
            AttributeValue::Null => json!({ "NULL": true }),
            AttributeValue::L(items) => {
                let items: Vec<Value> = items.iter().map(AttributeValue::to_wire).collect();
                json!({ "L": items })
            }
            AttributeValue::M(map) => {
                let entries: serde_json::Map<String, Value> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_wire()))
                    .collect();
                json!({ "M": entries })
            }
        }
    }

    /// Decodes a tagged JSON wire value.
    ///
    /// The wire form is a single-key object; an empty, multi-key, or unknown
    /// tag fails with [`CodecError::Malformed`], as does an `N` payload that
    /// is not a finite decimal number.
    pub fn from_wire(value: &Value) -> Result<Self, CodecError> {
        let obj = value
            .as_object()
            .ok_or_else(|| CodecError::Malformed("attribute value is not an object".into()))?;
        if obj.len() != 1 {
            return Err(CodecError::Malformed(format!(
                "attribute value must have exactly one tag, found {}",
                obj.len()
            )));
        }
        let (tag, payload) = obj.iter().next().expect("len checked above");
        match (tag.as_str(), payload) {
            ("S", Value::String(s)) => Ok(AttributeValue::S(s.clone())),
            ("N", Value::String(n)) => {
                let parsed: f64 = n
                    .parse()
                    .map_err(|_| CodecError::Malformed(format!("non-decimal number: {n:?}")))?;
                if !parsed.is_finite() {
                    return Err(CodecError::Malformed(format!("non-finite number: {n:?}")));
                }
                Ok(AttributeValue::N(n.clone()))
            }
            ("BOOL", Value::Bool(b)) => Ok(AttributeValue::Bool(*b)),
            ("NULL", Value::Bool(true)) => Ok(AttributeValue::Null),
            ("L", Value::Array(items)) => items
                .iter()
                .map(AttributeValue::from_wire)
                .collect::<Result<Vec<_>, _>>()
                .map(AttributeValue::L),
            ("M", Value::Object(entries)) => entries
                .iter()
                .map(|(k, v)| AttributeValue::from_wire(v).map(|av| (k.clone(), av)))
                .collect::<Result<HashMap<_, _>, _>>()
                .map(AttributeValue::M),
            (tag, _) => Err(CodecError::Malformed(format!(
                "unknown or mistyped attribute tag: {tag:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_wire_forms() {
        assert_eq!(
            AttributeValue::S("abc".into()).to_wire(),
            json!({ "S": "abc" })
        );
        assert_eq!(AttributeValue::N("12.5".into()).to_wire(), json!({ "N": "12.5" }));
        assert_eq!(AttributeValue::Bool(true).to_wire(), json!({ "BOOL": true }));
        assert_eq!(AttributeValue::Null.to_wire(), json!({ "NULL": true }));
    }

    #[test]
    fn test_nested_wire_round_trip() {
        let value = AttributeValue::M(HashMap::from([
            ("name".to_string(), AttributeValue::S("demo".into())),
            (
                "tags".to_string(),
                AttributeValue::L(vec![
                    AttributeValue::S("a".into()),
                    AttributeValue::N("3".into()),
                    AttributeValue::Null,
                ]),
            ),
        ]));

        let decoded = AttributeValue::from_wire(&value.to_wire()).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_from_wire_rejects_unknown_tag() {
        let err = AttributeValue::from_wire(&json!({ "X": "abc" })).unwrap_err();
        assert!(matches!(err, CodecError::Malformed(_)));
    }

    #[test]
    fn test_from_wire_rejects_empty_and_multi_tag() {
        assert!(AttributeValue::from_wire(&json!({})).is_err());
        assert!(AttributeValue::from_wire(&json!({ "S": "a", "N": "1" })).is_err());
    }

    #[test]
    fn test_from_wire_rejects_bad_numbers() {
        assert!(AttributeValue::from_wire(&json!({ "N": "abc" })).is_err());
        assert!(AttributeValue::from_wire(&json!({ "N": "1e999" })).is_err());
    }

    #[test]
    fn test_from_wire_rejects_non_object() {
        assert!(AttributeValue::from_wire(&json!("bare string")).is_err());
    }
}

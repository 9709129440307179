//! Conversions between native values and attribute values.
//!
//! Pure functions, testable without store access. The write path composes
//! them as `sanitize` then `marshal_item`; the read path as `item_from_wire`.

use std::collections::HashMap;

use serde_json::Value;

use super::{AttributeValue, CodecError, Item};

/// Converts a native value into an attribute value.
///
/// Strings map to `S`, numbers to `N` as a decimal string, booleans to
/// `BOOL`, `null` to `NULL`, arrays to `L`, and objects to `M`. The
/// conversion is total: `serde_json` numbers are finite by construction, so
/// there is no unsupported native value to reject.
pub fn marshal(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null,
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(marshal).collect()),
        Value::Object(entries) => AttributeValue::M(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), marshal(v)))
                .collect(),
        ),
    }
}

/// Strictly marshals one item.
///
/// Unlike [`marshal`], a `null` at any depth — a map entry or a list
/// element — fails with [`CodecError::NullAttribute`] naming the offending
/// path. Optional fields serialized from `None` must be stripped with
/// [`sanitize`] before reaching this function; storing them as `NULL`
/// attributes would defeat `attribute_not_exists` conditions and sparse
/// indexes.
pub fn marshal_item(item: &Item) -> Result<HashMap<String, AttributeValue>, CodecError> {
    item.iter()
        .map(|(name, value)| marshal_strict(value, name).map(|av| (name.clone(), av)))
        .collect()
}

fn marshal_strict(value: &Value, path: &str) -> Result<AttributeValue, CodecError> {
    match value {
        Value::Null => Err(CodecError::NullAttribute(path.to_string())),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| marshal_strict(v, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(AttributeValue::L),
        Value::Object(entries) => entries
            .iter()
            .map(|(k, v)| marshal_strict(v, &format!("{path}.{k}")).map(|av| (k.clone(), av)))
            .collect::<Result<HashMap<_, _>, _>>()
            .map(AttributeValue::M),
        other => Ok(marshal(other)),
    }
}

/// Converts an attribute value back into a native value.
///
/// Inverse of [`marshal`]. Fails only on an `N` payload that does not parse
/// as a finite decimal number, which can happen when an [`AttributeValue`]
/// is constructed by hand rather than decoded from the wire.
pub fn unmarshal(value: &AttributeValue) -> Result<Value, CodecError> {
    match value {
        AttributeValue::S(s) => Ok(Value::String(s.clone())),
        AttributeValue::N(n) => parse_number(n),
        AttributeValue::Bool(b) => Ok(Value::Bool(*b)),
        AttributeValue::Null => Ok(Value::Null),
        AttributeValue::L(items) => items
            .iter()
            .map(unmarshal)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        AttributeValue::M(map) => map
            .iter()
            .map(|(k, v)| unmarshal(v).map(|nv| (k.clone(), nv)))
            .collect::<Result<serde_json::Map<_, _>, _>>()
            .map(Value::Object),
    }
}

/// Converts a map of attribute values back into a native item.
pub fn unmarshal_item(attrs: &HashMap<String, AttributeValue>) -> Result<Item, CodecError> {
    attrs
        .iter()
        .map(|(name, value)| unmarshal(value).map(|nv| (name.clone(), nv)))
        .collect()
}

// Integers round-trip exactly; everything else goes through f64.
fn parse_number(n: &str) -> Result<Value, CodecError> {
    if let Ok(i) = n.parse::<i64>() {
        return Ok(Value::from(i));
    }
    if let Ok(u) = n.parse::<u64>() {
        return Ok(Value::from(u));
    }
    let f: f64 = n
        .parse()
        .map_err(|_| CodecError::Malformed(format!("non-decimal number: {n:?}")))?;
    serde_json::Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| CodecError::Malformed(format!("non-finite number: {n:?}")))
}

/// Encodes a native item into the wire-format item shape used in request
/// bodies (`{"attr": {"S": "..."}, ...}`). Strict: nulls must already be
/// sanitized away.
pub fn item_to_wire(item: &Item) -> Result<Value, CodecError> {
    let attrs = marshal_item(item)?;
    Ok(Value::Object(
        attrs
            .iter()
            .map(|(k, v)| (k.clone(), v.to_wire()))
            .collect(),
    ))
}

/// Decodes a wire-format item shape from a response body into a native item.
pub fn item_from_wire(value: &Value) -> Result<Item, CodecError> {
    let obj = value
        .as_object()
        .ok_or_else(|| CodecError::Malformed("item is not an object".into()))?;
    obj.iter()
        .map(|(name, wire)| {
            AttributeValue::from_wire(wire)
                .and_then(|av| unmarshal(&av))
                .map(|nv| (name.clone(), nv))
        })
        .collect()
}

/// Recursively strips `null` map entries and `null` list elements.
///
/// Serialized domain structs surface `Option::None` fields as JSON `null`;
/// every write path runs this first so callers may pass optional fields as
/// absent rather than null. A top-level `null` is a value, not an entry, and
/// is returned unchanged.
pub fn sanitize(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .filter(|v| !v.is_null())
                .map(sanitize)
                .collect(),
        ),
        Value::Object(entries) => Value::Object(
            entries
                .into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, sanitize(v)))
                .collect(),
        ),
        scalar => scalar,
    }
}

/// [`sanitize`] specialized to items, preserving the map shape.
pub fn sanitize_item(item: Item) -> Item {
    item.into_iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(name, value)| (name, sanitize(value)))
        .collect()
}

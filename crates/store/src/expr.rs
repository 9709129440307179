//! The fixed expression grammar understood by the in-memory emulation.
//!
//! The emulation exists to make the exact call patterns this system issues
//! behave identically to the real service — it is not a query engine. The
//! grammar is therefore closed: three key-condition shapes, two filter
//! atoms, two condition atoms, and one update shape. Expressions are parsed
//! into these enums up front; anything else fails with a typed
//! `Unsupported*` error. Extending the supported call shapes means
//! extending this parser, never special-casing expression strings at the
//! call sites.

use crate::error::StoreError;

/// A parsed key condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyCondition {
    /// `hash = :placeholder`
    HashEq { attr: String, placeholder: String },
    /// `hash = :placeholder AND begins_with(range, :placeholder)`
    HashEqRangePrefix {
        hash_attr: String,
        hash_placeholder: String,
        range_attr: String,
        prefix_placeholder: String,
    },
}

/// One atom of a filter expression; atoms are joined with `AND`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterAtom {
    /// `attribute_not_exists(name)`
    NotExists(String),
    /// `name = :placeholder`
    Eq { attr: String, placeholder: String },
}

/// A parsed condition expression for conditional writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `attribute_not_exists(name)`
    NotExists(String),
    /// `attribute_exists(name)`
    Exists(String),
}

/// A parsed update expression: the single supported `SET` assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSet {
    pub attr: String,
    pub placeholder: String,
}

pub fn parse_key_condition(expr: &str) -> Result<KeyCondition, StoreError> {
    let unsupported = || StoreError::UnsupportedKeyCondition(expr.to_string());
    let parts: Vec<&str> = expr.split(" AND ").map(str::trim).collect();
    match parts.as_slice() {
        [hash] => {
            let (attr, placeholder) = parse_equality(hash).ok_or_else(unsupported)?;
            Ok(KeyCondition::HashEq { attr, placeholder })
        }
        [hash, range] => {
            let (hash_attr, hash_placeholder) = parse_equality(hash).ok_or_else(unsupported)?;
            let (range_attr, prefix_placeholder) =
                parse_begins_with(range).ok_or_else(unsupported)?;
            Ok(KeyCondition::HashEqRangePrefix {
                hash_attr,
                hash_placeholder,
                range_attr,
                prefix_placeholder,
            })
        }
        _ => Err(unsupported()),
    }
}

pub fn parse_filter(expr: &str) -> Result<Vec<FilterAtom>, StoreError> {
    let unsupported = || StoreError::UnsupportedFilterExpression(expr.to_string());
    expr.split(" AND ")
        .map(str::trim)
        .map(|part| {
            if let Some(name) = parse_function(part, "attribute_not_exists") {
                return Ok(FilterAtom::NotExists(name));
            }
            if let Some((attr, placeholder)) = parse_equality(part) {
                return Ok(FilterAtom::Eq { attr, placeholder });
            }
            Err(unsupported())
        })
        .collect()
}

pub fn parse_condition(expr: &str) -> Result<Condition, StoreError> {
    if let Some(name) = parse_function(expr.trim(), "attribute_not_exists") {
        return Ok(Condition::NotExists(name));
    }
    if let Some(name) = parse_function(expr.trim(), "attribute_exists") {
        return Ok(Condition::Exists(name));
    }
    Err(StoreError::UnsupportedConditionExpression(expr.to_string()))
}

pub fn parse_update(expr: &str) -> Result<UpdateSet, StoreError> {
    let unsupported = || StoreError::UnsupportedUpdateExpression(expr.to_string());
    let assignment = expr
        .trim()
        .strip_prefix("SET ")
        .ok_or_else(unsupported)?
        .trim();
    // A single assignment only: `SET a = :v, b = :w` is out of grammar.
    if assignment.contains(',') {
        return Err(unsupported());
    }
    let (attr, placeholder) = parse_equality(assignment).ok_or_else(unsupported)?;
    Ok(UpdateSet { attr, placeholder })
}

/// `name = :placeholder`, both sides single identifiers.
fn parse_equality(part: &str) -> Option<(String, String)> {
    let (left, right) = part.split_once('=')?;
    let attr = left.trim();
    let placeholder = right.trim().strip_prefix(':')?;
    (is_identifier(attr) && is_identifier(placeholder))
        .then(|| (attr.to_string(), format!(":{placeholder}")))
}

/// `begins_with(name, :placeholder)`, both sides single identifiers.
fn parse_begins_with(part: &str) -> Option<(String, String)> {
    let inner = part.trim().strip_prefix("begins_with")?.trim();
    let args = inner.strip_prefix('(')?.strip_suffix(')')?.trim();
    let (attr, placeholder) = args.split_once(',')?;
    let attr = attr.trim();
    let placeholder = placeholder.trim().strip_prefix(':')?;
    (is_identifier(attr) && is_identifier(placeholder))
        .then(|| (attr.to_string(), format!(":{placeholder}")))
}

/// `function(name)` for the given function keyword.
fn parse_function(part: &str, function: &str) -> Option<String> {
    let inner = part.strip_prefix(function)?.trim();
    let name = inner.strip_prefix('(')?.strip_suffix(')')?.trim();
    is_identifier(name).then(|| name.to_string())
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_equality() {
        assert_eq!(
            parse_key_condition("PK = :pk").unwrap(),
            KeyCondition::HashEq {
                attr: "PK".to_string(),
                placeholder: ":pk".to_string(),
            }
        );
    }

    #[test]
    fn test_hash_equality_with_range_prefix() {
        assert_eq!(
            parse_key_condition("PK = :pk AND begins_with(SK, :prefix)").unwrap(),
            KeyCondition::HashEqRangePrefix {
                hash_attr: "PK".to_string(),
                hash_placeholder: ":pk".to_string(),
                range_attr: "SK".to_string(),
                prefix_placeholder: ":prefix".to_string(),
            }
        );
    }

    #[test]
    fn test_key_condition_rejects_other_shapes() {
        for expr in [
            "PK > :pk",
            "begins_with(SK, :prefix)",
            "PK = :pk AND SK = :sk",
            "PK = :pk AND SK BETWEEN :a AND :b",
            "PK = :pk AND begins_with(SK, :a) AND begins_with(SK, :b)",
            "PK = literal",
            "",
        ] {
            assert!(
                matches!(
                    parse_key_condition(expr),
                    Err(StoreError::UnsupportedKeyCondition(_))
                ),
                "expected rejection for {expr:?}"
            );
        }
    }

    #[test]
    fn test_filter_atoms() {
        assert_eq!(
            parse_filter("attribute_not_exists(archived) AND status = :status").unwrap(),
            vec![
                FilterAtom::NotExists("archived".to_string()),
                FilterAtom::Eq {
                    attr: "status".to_string(),
                    placeholder: ":status".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_filter_rejects_other_shapes() {
        for expr in [
            "attribute_exists(archived)",
            "status <> :status",
            "contains(tags, :tag)",
            "status = :status OR kind = :kind",
        ] {
            assert!(
                matches!(
                    parse_filter(expr),
                    Err(StoreError::UnsupportedFilterExpression(_))
                ),
                "expected rejection for {expr:?}"
            );
        }
    }

    #[test]
    fn test_conditions() {
        assert_eq!(
            parse_condition("attribute_not_exists(PK)").unwrap(),
            Condition::NotExists("PK".to_string())
        );
        assert_eq!(
            parse_condition("attribute_exists(PK)").unwrap(),
            Condition::Exists("PK".to_string())
        );
        assert!(parse_condition("PK = :pk").is_err());
    }

    #[test]
    fn test_update_set() {
        assert_eq!(
            parse_update("SET title = :value").unwrap(),
            UpdateSet {
                attr: "title".to_string(),
                placeholder: ":value".to_string(),
            }
        );
    }

    #[test]
    fn test_update_rejects_other_shapes() {
        for expr in [
            "SET title = :a, kind = :b",
            "REMOVE title",
            "ADD counter :one",
            "SET title = title",
            "title = :value",
        ] {
            assert!(
                matches!(
                    parse_update(expr),
                    Err(StoreError::UnsupportedUpdateExpression(_))
                ),
                "expected rejection for {expr:?}"
            );
        }
    }
}

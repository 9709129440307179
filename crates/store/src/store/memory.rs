//! In-memory store emulation.
//!
//! Holds one ordered map of items per table and emulates the exact call
//! patterns the application issues, including the service's error body
//! shapes, so the bootstrapper and all data paths behave identically in
//! both modes. Intended for local development and tests only; it keeps the
//! only copy of item state and nothing is persisted.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use docvet_core::attr::Item;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::{Result, StoreError};
use crate::expr::{self, Condition, FilterAtom, KeyCondition};
use crate::types::{
    IndexSpec, IndexState, IndexStatus, Query, QueryPage, TableSpec, TableState, TableStatus,
    TtlState, TtlStatus, Update,
};

/// Process-local emulation of the store.
///
/// Concurrent access is mediated by `tokio::sync::RwLock`, so the emulation
/// is safe under the multi-threaded runtime, but it remains a test double:
/// items never expire, tables become active instantly, and only the
/// expression grammar in [`crate::expr`] is understood.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, MemTable>>,
    create_table_calls: AtomicU64,
}

#[derive(Debug)]
struct MemTable {
    spec: TableSpec,
    ttl: TtlState,
    /// Items keyed by `(hash, range)`; the range component is empty for
    /// hash-only tables. BTreeMap order doubles as the range-key order.
    items: BTreeMap<(String, String), Item>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every table, schema included. The bootstrapper calls this in
    /// memory mode to give tests a clean-slate equivalent of provisioning.
    pub async fn reset(&self) {
        self.tables.write().await.clear();
    }

    /// Number of CreateTable calls accepted since construction. Provisioning
    /// idempotence tests assert on this.
    pub fn create_table_calls(&self) -> u64 {
        self.create_table_calls.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------
    // Data plane
    // ------------------------------------------------------------------

    pub async fn put(&self, table: &str, item: Item, condition: Option<&str>) -> Result<()> {
        let mut tables = self.tables.write().await;
        let entry = tables
            .get_mut(table)
            .ok_or_else(|| table_not_found(table))?;
        let key = key_of(&entry.spec, &item)?;
        if let Some(condition) = condition {
            let condition = expr::parse_condition(condition)?;
            check_condition(&condition, entry.items.get(&key))?;
        }
        entry.items.insert(key, item);
        Ok(())
    }

    pub async fn get(
        &self,
        table: &str,
        key: &Item,
        _consistent_read: bool,
    ) -> Result<Option<Item>> {
        let tables = self.tables.read().await;
        let entry = tables.get(table).ok_or_else(|| table_not_found(table))?;
        let key = key_of(&entry.spec, key)?;
        Ok(entry.items.get(&key).cloned())
    }

    pub async fn update(&self, table: &str, key: &Item, update: &Update) -> Result<()> {
        let set = expr::parse_update(&update.expression)?;
        let value = update.values.get(&set.placeholder).cloned().ok_or_else(|| {
            StoreError::UnsupportedUpdateExpression(format!(
                "no value bound for '{}'",
                set.placeholder
            ))
        })?;

        let mut tables = self.tables.write().await;
        let entry = tables
            .get_mut(table)
            .ok_or_else(|| table_not_found(table))?;
        let item_key = key_of(&entry.spec, key)?;
        // Upsert, as the service does: an absent item starts from its key.
        let item = entry.items.entry(item_key).or_insert_with(|| key.clone());
        item.insert(set.attr, value);
        Ok(())
    }

    pub async fn delete(&self, table: &str, key: &Item, condition: Option<&str>) -> Result<()> {
        let mut tables = self.tables.write().await;
        let entry = tables
            .get_mut(table)
            .ok_or_else(|| table_not_found(table))?;
        let item_key = key_of(&entry.spec, key)?;
        if let Some(condition) = condition {
            let condition = expr::parse_condition(condition)?;
            check_condition(&condition, entry.items.get(&item_key))?;
        }
        entry.items.remove(&item_key);
        Ok(())
    }

    pub async fn query(&self, table: &str, query: &Query) -> Result<QueryPage> {
        let tables = self.tables.read().await;
        let entry = tables.get(table).ok_or_else(|| table_not_found(table))?;

        let (schema_hash, schema_range) = match &query.index {
            Some(index_name) => {
                let index = entry
                    .spec
                    .indexes
                    .iter()
                    .find(|i| &i.name == index_name)
                    .ok_or_else(|| {
                        validation_error(&format!(
                            "The table does not have the specified index: {index_name}"
                        ))
                    })?;
                (index.hash_key.as_str(), index.range_key.as_deref())
            }
            None => (
                entry.spec.hash_key.as_str(),
                entry.spec.range_key.as_deref(),
            ),
        };

        let condition = expr::parse_key_condition(&query.key_condition)?;
        let (hash_attr, hash_value, prefix) = resolve_key_condition(&condition, &query.values)?;
        if hash_attr != schema_hash {
            return Err(StoreError::UnsupportedKeyCondition(format!(
                "'{hash_attr}' is not the hash key of the query target"
            )));
        }
        if let Some((range_attr, _)) = prefix {
            if Some(range_attr) != schema_range {
                return Err(StoreError::UnsupportedKeyCondition(format!(
                    "'{range_attr}' is not the range key of the query target"
                )));
            }
        }

        // Candidate set: hash match, optional prefix match, and - for index
        // queries - presence of every index key attribute (sparse indexes).
        let mut candidates: Vec<&Item> = entry
            .items
            .values()
            .filter(|item| {
                string_of(item, hash_attr) == Some(hash_value)
                    && prefix.map_or(true, |(attr, value)| {
                        string_of(item, attr).is_some_and(|s| s.starts_with(value))
                    })
                    && (query.index.is_none()
                        || schema_range
                            .map_or(true, |range_attr| string_of(item, range_attr).is_some()))
            })
            .collect();

        // Primary queries inherit BTreeMap order; index queries re-sort by
        // the index range attribute.
        if query.index.is_some() {
            if let Some(range_attr) = schema_range {
                candidates.sort_by(|a, b| {
                    string_of(a, range_attr)
                        .unwrap_or_default()
                        .cmp(string_of(b, range_attr).unwrap_or_default())
                });
            }
        }
        if !query.scan_forward {
            candidates.reverse();
        }

        let start = match &query.cursor {
            Some(cursor) => {
                let cursor_key = key_of(&entry.spec, cursor)?;
                candidates
                    .iter()
                    .position(|item| {
                        key_of(&entry.spec, item)
                            .map(|k| k == cursor_key)
                            .unwrap_or(false)
                    })
                    .map(|position| position + 1)
                    .unwrap_or(0)
            }
            None => 0,
        };

        // The limit counts items examined in key order, before filtering,
        // and the cursor is the key of the last examined item.
        let limit = query.limit.map(|l| l as usize);
        let mut examined: Vec<&Item> = Vec::new();
        let mut next_cursor = None;
        for (offset, item) in candidates[start..].iter().copied().enumerate() {
            examined.push(item);
            if limit.is_some_and(|l| examined.len() >= l) {
                if start + offset + 1 < candidates.len() {
                    next_cursor = Some(cursor_of(&entry.spec, item)?);
                }
                break;
            }
        }

        let atoms = match &query.filter {
            Some(filter) => expr::parse_filter(filter)?,
            None => Vec::new(),
        };
        let mut items = Vec::with_capacity(examined.len());
        for item in examined {
            if matches_filter(&atoms, &query.values, item)? {
                items.push(item.clone());
            }
        }

        Ok(QueryPage {
            items,
            cursor: next_cursor,
        })
    }

    // ------------------------------------------------------------------
    // Control plane
    // ------------------------------------------------------------------

    pub async fn describe_table(&self, table: &str) -> Result<TableState> {
        let tables = self.tables.read().await;
        let entry = tables.get(table).ok_or_else(|| table_not_found(table))?;
        Ok(TableState {
            status: TableStatus::Active,
            indexes: entry
                .spec
                .indexes
                .iter()
                .map(|index| IndexState {
                    name: index.name.clone(),
                    status: IndexStatus::Active,
                })
                .collect(),
        })
    }

    pub async fn create_table(&self, spec: &TableSpec) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.contains_key(&spec.name) {
            return Err(table_in_use(&spec.name));
        }
        self.create_table_calls.fetch_add(1, Ordering::SeqCst);
        tables.insert(
            spec.name.clone(),
            MemTable {
                spec: spec.clone(),
                ttl: TtlState {
                    status: TtlStatus::Disabled,
                    attribute: None,
                },
                items: BTreeMap::new(),
            },
        );
        Ok(())
    }

    pub async fn add_index(&self, table: &str, index: &IndexSpec) -> Result<()> {
        let mut tables = self.tables.write().await;
        let entry = tables
            .get_mut(table)
            .ok_or_else(|| table_not_found(table))?;
        if entry.spec.indexes.iter().any(|i| i.name == index.name) {
            return Err(validation_error(&format!(
                "Index already exists: {}",
                index.name
            )));
        }
        entry.spec.indexes.push(index.clone());
        Ok(())
    }

    pub async fn describe_ttl(&self, table: &str) -> Result<TtlState> {
        let tables = self.tables.read().await;
        let entry = tables.get(table).ok_or_else(|| table_not_found(table))?;
        Ok(entry.ttl.clone())
    }

    pub async fn enable_ttl(&self, table: &str, attribute: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        let entry = tables
            .get_mut(table)
            .ok_or_else(|| table_not_found(table))?;
        entry.ttl = TtlState {
            status: TtlStatus::Enabled,
            attribute: Some(attribute.to_string()),
        };
        Ok(())
    }
}

// ----------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------

fn key_of(spec: &TableSpec, source: &Item) -> Result<(String, String)> {
    let hash = string_attr(source, &spec.hash_key)?;
    let range = match &spec.range_key {
        Some(range_key) => string_attr(source, range_key)?,
        None => String::new(),
    };
    Ok((hash, range))
}

fn string_attr(item: &Item, name: &str) -> Result<String> {
    string_of(item, name)
        .map(str::to_string)
        .ok_or_else(|| StoreError::InvalidKey(format!("missing or non-string key attribute '{name}'")))
}

fn string_of<'a>(item: &'a Item, name: &str) -> Option<&'a str> {
    item.get(name).and_then(Value::as_str)
}

fn cursor_of(spec: &TableSpec, item: &Item) -> Result<Item> {
    let mut cursor = Item::new();
    cursor.insert(
        spec.hash_key.clone(),
        Value::String(string_attr(item, &spec.hash_key)?),
    );
    if let Some(range_key) = &spec.range_key {
        cursor.insert(range_key.clone(), Value::String(string_attr(item, range_key)?));
    }
    Ok(cursor)
}

fn resolve_key_condition<'a>(
    condition: &'a KeyCondition,
    values: &'a Item,
) -> Result<(&'a str, &'a str, Option<(&'a str, &'a str)>)> {
    match condition {
        KeyCondition::HashEq { attr, placeholder } => {
            Ok((attr.as_str(), bound_string(values, placeholder)?, None))
        }
        KeyCondition::HashEqRangePrefix {
            hash_attr,
            hash_placeholder,
            range_attr,
            prefix_placeholder,
        } => Ok((
            hash_attr.as_str(),
            bound_string(values, hash_placeholder)?,
            Some((range_attr.as_str(), bound_string(values, prefix_placeholder)?)),
        )),
    }
}

fn bound_string<'a>(values: &'a Item, placeholder: &str) -> Result<&'a str> {
    values
        .get(placeholder)
        .and_then(Value::as_str)
        .ok_or_else(|| {
            StoreError::InvalidKey(format!("no string value bound for '{placeholder}'"))
        })
}

fn check_condition(condition: &Condition, existing: Option<&Item>) -> Result<()> {
    let holds = match condition {
        Condition::NotExists(attr) => existing.map_or(true, |item| !item.contains_key(attr)),
        Condition::Exists(attr) => existing.is_some_and(|item| item.contains_key(attr)),
    };
    if holds {
        Ok(())
    } else {
        Err(conditional_check_failed())
    }
}

fn matches_filter(atoms: &[FilterAtom], values: &Item, item: &Item) -> Result<bool> {
    for atom in atoms {
        let holds = match atom {
            FilterAtom::NotExists(attr) => !item.contains_key(attr),
            FilterAtom::Eq { attr, placeholder } => {
                let bound = values.get(placeholder).ok_or_else(|| {
                    StoreError::UnsupportedFilterExpression(format!(
                        "no value bound for '{placeholder}'"
                    ))
                })?;
                item.get(attr) == Some(bound)
            }
        };
        if !holds {
            return Ok(false);
        }
    }
    Ok(true)
}

// The emulation answers with the service's error body shapes so callers
// (the bootstrapper in particular) inspect failures identically in both
// modes.

fn table_not_found(table: &str) -> StoreError {
    StoreError::Request {
        status: 400,
        body: format!(
            r#"{{"__type":"com.amazonaws.dynamodb.v20120810#ResourceNotFoundException","message":"Requested resource not found: Table: {table} not found"}}"#
        ),
    }
}

fn table_in_use(table: &str) -> StoreError {
    StoreError::Request {
        status: 400,
        body: format!(
            r#"{{"__type":"com.amazonaws.dynamodb.v20120810#ResourceInUseException","message":"Table already exists: {table}"}}"#
        ),
    }
}

fn conditional_check_failed() -> StoreError {
    StoreError::Request {
        status: 400,
        body: r#"{"__type":"com.amazonaws.dynamodb.v20120810#ConditionalCheckFailedException","message":"The conditional request failed"}"#.to_string(),
    }
}

fn validation_error(message: &str) -> StoreError {
    StoreError::Request {
        status: 400,
        body: format!(
            r#"{{"__type":"com.amazon.coral.validate#ValidationException","message":"{message}"}}"#
        ),
    }
}

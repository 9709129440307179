//! Shared data types for the store surface.
//!
//! Tables, indexes, and their control-plane statuses are pure data; key
//! attributes are always strings, matching how the application keys its
//! items (`PK`/`SK` style composite identifiers).

use docvet_core::attr::Item;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declared schema for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    pub hash_key: String,
    pub range_key: Option<String>,
    pub indexes: Vec<IndexSpec>,
    /// Epoch-seconds attribute after whose passage items are eligible for
    /// background deletion.
    pub ttl_attribute: Option<String>,
}

/// Declared schema for one global secondary index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub hash_key: String,
    pub range_key: Option<String>,
}

/// Control-plane view of a table's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Creating,
    Active,
    Updating,
    Deleting,
}

impl TableStatus {
    pub(crate) fn parse(status: &str) -> Self {
        match status {
            "CREATING" => TableStatus::Creating,
            "UPDATING" => TableStatus::Updating,
            "DELETING" => TableStatus::Deleting,
            _ => TableStatus::Active,
        }
    }
}

/// Control-plane view of an index's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    Creating,
    Active,
    Updating,
    Deleting,
}

impl IndexStatus {
    pub(crate) fn parse(status: &str) -> Self {
        match status {
            "CREATING" => IndexStatus::Creating,
            "UPDATING" => IndexStatus::Updating,
            "DELETING" => IndexStatus::Deleting,
            _ => IndexStatus::Active,
        }
    }
}

/// Described state of an existing table.
#[derive(Debug, Clone)]
pub struct TableState {
    pub status: TableStatus,
    pub indexes: Vec<IndexState>,
}

/// Described state of one index on an existing table.
#[derive(Debug, Clone)]
pub struct IndexState {
    pub name: String,
    pub status: IndexStatus,
}

/// Time-to-live lifecycle. Only `Enabled` on the expected attribute counts
/// as correctly provisioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlStatus {
    Disabled,
    Enabling,
    Enabled,
    Disabling,
}

impl TtlStatus {
    pub(crate) fn parse(status: &str) -> Self {
        match status {
            "ENABLING" => TtlStatus::Enabling,
            "ENABLED" => TtlStatus::Enabled,
            "DISABLING" => TtlStatus::Disabling,
            _ => TtlStatus::Disabled,
        }
    }
}

/// Described time-to-live state of a table.
#[derive(Debug, Clone)]
pub struct TtlState {
    pub status: TtlStatus,
    pub attribute: Option<String>,
}

/// One query call.
///
/// `values` binds the `:placeholder` names used in `key_condition` and
/// `filter`. The cursor is the opaque continuation key from a previous
/// page; callers never persist it.
#[derive(Debug, Clone)]
pub struct Query {
    pub key_condition: String,
    pub values: Item,
    pub index: Option<String>,
    pub filter: Option<String>,
    pub cursor: Option<Item>,
    pub scan_forward: bool,
    pub limit: Option<u32>,
}

impl Query {
    pub fn new(key_condition: impl Into<String>, values: Item) -> Self {
        Self {
            key_condition: key_condition.into(),
            values,
            index: None,
            filter: None,
            cursor: None,
            scan_forward: true,
            limit: None,
        }
    }

    pub fn on_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn descending(mut self) -> Self {
        self.scan_forward = false;
        self
    }
}

/// One page of query results, with the continuation cursor when more
/// matching items exist.
#[derive(Debug, Clone)]
pub struct QueryPage {
    pub items: Vec<Item>,
    pub cursor: Option<Item>,
}

/// One update call: a single-assignment `SET attribute = :placeholder`
/// expression plus the value bound to its placeholder.
#[derive(Debug, Clone)]
pub struct Update {
    pub expression: String,
    pub values: Item,
}

impl Update {
    /// Builds the one supported update shape.
    pub fn set(attribute: &str, value: Value) -> Self {
        let mut values = Item::new();
        values.insert(":value".to_string(), value);
        Self {
            expression: format!("SET {attribute} = :value"),
            values,
        }
    }
}

//! Store backend implementations.
//!
//! One operation surface, two interchangeable implementations: the remote
//! backend speaking the service's wire protocol, and an in-process emulation
//! for local development and tests. The backend is selected by a single
//! runtime flag, constructed once at process start from [`Config`], and
//! passed by reference to every call site — it is never re-read from the
//! environment mid-call.

mod http;
mod memory;

pub use http::HttpStore;
pub use memory::MemoryStore;

use docvet_core::attr::{sanitize_item, Item};

use crate::config::{BackendKind, Config};
use crate::error::Result;
use crate::types::{IndexSpec, Query, QueryPage, TableSpec, TableState, TtlState, Update};

/// The process's store backend.
///
/// Callers are agnostic to the mode: both variants accept the same native
/// items and answer with the same typed errors, including the service's
/// error body shapes for "resource not found" and failed conditions.
#[derive(Debug)]
pub enum Store {
    Http(HttpStore),
    Memory(MemoryStore),
}

impl Store {
    /// Builds the backend named by the configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = match config.backend {
            BackendKind::Memory => Store::Memory(MemoryStore::new()),
            BackendKind::Dynamodb => Store::Http(HttpStore::new(config)?),
        };
        tracing::info!(target_store = %config.target_display(), "store backend ready");
        Ok(store)
    }

    /// Writes one item. The item is sanitized first, so optional fields
    /// passed as `null` are stored as absent.
    pub async fn put(&self, table: &str, item: Item, condition: Option<&str>) -> Result<()> {
        let item = sanitize_item(item);
        match self {
            Store::Http(store) => store.put(table, item, condition).await,
            Store::Memory(store) => store.put(table, item, condition).await,
        }
    }

    /// Reads one item by its full key.
    pub async fn get(&self, table: &str, key: &Item, consistent_read: bool) -> Result<Option<Item>> {
        match self {
            Store::Http(store) => store.get(table, key, consistent_read).await,
            Store::Memory(store) => store.get(table, key, consistent_read).await,
        }
    }

    /// Applies a single-attribute `SET` update, inserting the item from its
    /// key when absent.
    pub async fn update(&self, table: &str, key: &Item, update: &Update) -> Result<()> {
        match self {
            Store::Http(store) => store.update(table, key, update).await,
            Store::Memory(store) => store.update(table, key, update).await,
        }
    }

    /// Deletes one item by its full key. Deleting an absent item is not an
    /// error unless a condition says otherwise.
    pub async fn delete(&self, table: &str, key: &Item, condition: Option<&str>) -> Result<()> {
        match self {
            Store::Http(store) => store.delete(table, key, condition).await,
            Store::Memory(store) => store.delete(table, key, condition).await,
        }
    }

    /// Runs one query call, returning at most one page.
    pub async fn query(&self, table: &str, query: &Query) -> Result<QueryPage> {
        match self {
            Store::Http(store) => store.query(table, query).await,
            Store::Memory(store) => store.query(table, query).await,
        }
    }

    /// Follows the cursor until the query is exhausted.
    pub async fn query_all(&self, table: &str, mut query: Query) -> Result<Vec<Item>> {
        let mut items = Vec::new();
        loop {
            let page = self.query(table, &query).await?;
            items.extend(page.items);
            match page.cursor {
                Some(cursor) => query.cursor = Some(cursor),
                None => return Ok(items),
            }
        }
    }

    // ------------------------------------------------------------------
    // Control plane (used by the bootstrapper)
    // ------------------------------------------------------------------

    pub async fn describe_table(&self, table: &str) -> Result<TableState> {
        match self {
            Store::Http(store) => store.describe_table(table).await,
            Store::Memory(store) => store.describe_table(table).await,
        }
    }

    pub async fn create_table(&self, spec: &TableSpec) -> Result<()> {
        match self {
            Store::Http(store) => store.create_table(spec).await,
            Store::Memory(store) => store.create_table(spec).await,
        }
    }

    pub async fn add_index(&self, table: &str, index: &IndexSpec) -> Result<()> {
        match self {
            Store::Http(store) => store.add_index(table, index).await,
            Store::Memory(store) => store.add_index(table, index).await,
        }
    }

    pub async fn describe_ttl(&self, table: &str) -> Result<TtlState> {
        match self {
            Store::Http(store) => store.describe_ttl(table).await,
            Store::Memory(store) => store.describe_ttl(table).await,
        }
    }

    pub async fn enable_ttl(&self, table: &str, attribute: &str) -> Result<()> {
        match self {
            Store::Http(store) => store.enable_ttl(table, attribute).await,
            Store::Memory(store) => store.enable_ttl(table, attribute).await,
        }
    }
}

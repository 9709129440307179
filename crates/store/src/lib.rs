//! Key-item store client for docvet.
//!
//! The rest of the system stores everything - organizations, question sets,
//! documents, cached evaluations - as items in a DynamoDB-style NoSQL
//! service. This crate is the only thing that talks to that service: it
//! owns the operation surface (put/get/update/delete/query), the schema
//! bootstrapping that runs at process startup, and an in-process emulation
//! that makes the whole stack work offline in tests.
//!
//! Typical startup wiring:
//!
//! ```no_run
//! use std::sync::Arc;
//! use docvet_store::{Config, Provisioner, Store};
//!
//! # async fn start() -> docvet_store::Result<()> {
//! let config = Config::from_env();
//! let store = Arc::new(Store::from_config(&config)?);
//! let provisioner = Provisioner::from_config(store.clone(), &config);
//! provisioner.ensure_ready().await?;
//! // hand `store` to the application components
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod schema;
pub mod types;

mod expr;
mod store;

pub use bootstrap::{ensure_table, ensure_ttl, Provisioner};
pub use config::{BackendKind, Config};
pub use error::{Result, StoreError};
pub use store::{HttpStore, MemoryStore, Store};
pub use types::{IndexSpec, Query, QueryPage, TableSpec, Update};

// The native item type callers exchange with the store.
pub use docvet_core::attr::Item;

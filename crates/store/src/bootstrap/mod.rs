//! Idempotent schema provisioning.
//!
//! Tables and indexes take time to become active, and TTL configuration
//! passes through transient states, so provisioning is a small state
//! machine: describe, apply the missing pieces, then poll until the control
//! plane settles. Every entry point is safe to call repeatedly, and
//! [`Provisioner::ensure_ready`] deduplicates concurrent callers at process
//! startup so a race never issues two CreateTable calls for the same table.

mod plan;

pub use plan::{format_plan, provision_plan, ProvisionPlan};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::schema;
use crate::store::Store;
use crate::types::{IndexStatus, TableSpec, TableState, TableStatus, TtlStatus};

const POLL_INTERVAL: Duration = Duration::from_secs(2);
const MAX_POLL_ATTEMPTS: u32 = 60;

/// Ensures one table exists with its declared key schema and indexes, then
/// waits until the table and every index are active.
///
/// Idempotent: when the table already matches its declared schema this
/// issues no mutating call at all.
pub async fn ensure_table(store: &Store, spec: &TableSpec) -> Result<()> {
    let current = describe_or_absent(store, &spec.name).await?;
    let plan = provision_plan(current.as_ref(), spec);
    for line in format_plan(&spec.name, &plan) {
        tracing::info!("{line}");
    }

    match plan {
        ProvisionPlan::CreateTable => {
            store.create_table(spec).await?;
            wait_for_table_active(store, &spec.name).await
        }
        ProvisionPlan::AddIndexes(indexes) => {
            for index in &indexes {
                store.add_index(&spec.name, index).await?;
                wait_for_table_active(store, &spec.name).await?;
            }
            Ok(())
        }
        // A previous run may have crashed mid-provisioning; settle anyway.
        ProvisionPlan::UpToDate => wait_for_table_active(store, &spec.name).await,
    }
}

/// Ensures TTL is enabled on the expected attribute.
///
/// Never reassigns: TTL already enabled (or enabling) on a different
/// attribute is schema drift and fails with
/// [`StoreError::TtlAttributeMismatch`]. A disabled table gets one
/// UpdateTimeToLive call; transient states are polled through.
pub async fn ensure_ttl(store: &Store, table: &str, attribute: &str) -> Result<()> {
    let mut enable_requested = false;
    for _ in 0..MAX_POLL_ATTEMPTS {
        let ttl = store.describe_ttl(table).await?;
        match ttl.status {
            TtlStatus::Enabled | TtlStatus::Enabling => {
                if let Some(actual) = ttl.attribute.as_deref() {
                    if actual != attribute {
                        return Err(StoreError::TtlAttributeMismatch {
                            table: table.to_string(),
                            expected: attribute.to_string(),
                            actual: actual.to_string(),
                        });
                    }
                }
                if ttl.status == TtlStatus::Enabled {
                    return Ok(());
                }
            }
            TtlStatus::Disabled => {
                if !enable_requested {
                    tracing::info!(table, attribute, "enabling time-to-live");
                    store.enable_ttl(table, attribute).await?;
                    enable_requested = true;
                    continue;
                }
            }
            // Wait for the previous transition to settle before enabling.
            TtlStatus::Disabling => {}
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    Err(StoreError::TtlProvisioningTimeout {
        table: table.to_string(),
    })
}

/// Memoized startup provisioning for every table the application needs.
///
/// Owned by the process's startup sequence and shared with every component
/// that must wait on schema readiness. Concurrent `ensure_ready` callers
/// converge on a single in-flight provisioning attempt; a failed attempt is
/// cleared so the next call retries from scratch instead of replaying a
/// cached failure.
pub struct Provisioner {
    store: Arc<Store>,
    tables: Vec<TableSpec>,
    inflight: Mutex<Option<ProvisionFuture>>,
}

type ProvisionFuture = Shared<BoxFuture<'static, std::result::Result<(), Arc<StoreError>>>>;

impl Provisioner {
    pub fn new(store: Arc<Store>, tables: Vec<TableSpec>) -> Self {
        Self {
            store,
            tables,
            inflight: Mutex::new(None),
        }
    }

    /// Provisioner for the application's canonical tables.
    pub fn from_config(store: Arc<Store>, config: &Config) -> Self {
        Self::new(store, schema::all_tables(config))
    }

    /// Resolves once every table is provisioned and active.
    ///
    /// Invoke before trusting any data operation to succeed. Callers that
    /// arrive while an attempt is in flight await the same attempt; all of
    /// them observe its outcome.
    pub async fn ensure_ready(&self) -> Result<()> {
        let attempt = {
            let mut slot = self.inflight.lock().expect("provisioner lock poisoned");
            match slot.as_ref() {
                Some(attempt) => attempt.clone(),
                None => {
                    let attempt = provision_all(self.store.clone(), self.tables.clone())
                        .boxed()
                        .shared();
                    *slot = Some(attempt.clone());
                    attempt
                }
            }
        };

        let outcome = attempt.clone().await;
        if outcome.is_err() {
            // Clear the failed attempt so the next call retries, but never
            // discard a newer attempt started by someone else.
            let mut slot = self.inflight.lock().expect("provisioner lock poisoned");
            if slot.as_ref().is_some_and(|current| current.ptr_eq(&attempt)) {
                *slot = None;
            }
        }
        outcome.map_err(StoreError::Provision)
    }
}

async fn provision_all(
    store: Arc<Store>,
    tables: Vec<TableSpec>,
) -> std::result::Result<(), Arc<StoreError>> {
    // In memory mode provisioning doubles as the test clean-slate: drop
    // everything, then run the identical ensure path against the emulated
    // control plane.
    if let Store::Memory(memory) = store.as_ref() {
        memory.reset().await;
        tracing::debug!("reset in-memory tables");
    }
    for spec in &tables {
        ensure_table(&store, spec).await.map_err(Arc::new)?;
        if let Some(attribute) = &spec.ttl_attribute {
            ensure_ttl(&store, &spec.name, attribute)
                .await
                .map_err(Arc::new)?;
        }
    }
    tracing::info!(tables = tables.len(), "schema ready");
    Ok(())
}

async fn describe_or_absent(store: &Store, table: &str) -> Result<Option<TableState>> {
    match store.describe_table(table).await {
        Ok(state) => Ok(Some(state)),
        Err(err) if err.is_resource_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

async fn wait_for_table_active(store: &Store, table: &str) -> Result<()> {
    for _ in 0..MAX_POLL_ATTEMPTS {
        if let Some(state) = describe_or_absent(store, table).await? {
            let indexes_active = state
                .indexes
                .iter()
                .all(|index| index.status == IndexStatus::Active);
            if state.status == TableStatus::Active && indexes_active {
                return Ok(());
            }
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
    Err(StoreError::TableProvisioningTimeout {
        table: table.to_string(),
    })
}

//! Canonical table definitions for the application.
//!
//! Pure functions - no I/O. The bootstrapper provisions exactly these
//! tables before any data operation is trusted to succeed.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::types::{IndexSpec, TableSpec};

/// TTL attribute on the cache table, holding an epoch-seconds expiry.
pub const TTL_ATTRIBUTE: &str = "expiresAt";

/// The main single-table design: composite `PK`/`SK` primary key plus one
/// secondary index for inverted lookups.
pub fn main_table(config: &Config) -> TableSpec {
    TableSpec {
        name: config.table_name.clone(),
        hash_key: "PK".to_string(),
        range_key: Some("SK".to_string()),
        indexes: vec![IndexSpec {
            name: config.gsi1_name.clone(),
            hash_key: "GSI1PK".to_string(),
            range_key: Some("GSI1SK".to_string()),
        }],
        ttl_attribute: None,
    }
}

/// The cache table: hash-only key, entries reclaimed by the service after
/// their `expiresAt` passes.
pub fn cache_table(config: &Config) -> TableSpec {
    TableSpec {
        name: config.cache_table_name.clone(),
        hash_key: "cacheKey".to_string(),
        range_key: None,
        indexes: Vec::new(),
        ttl_attribute: Some(TTL_ATTRIBUTE.to_string()),
    }
}

/// Every table the application needs, in provisioning order.
pub fn all_tables(config: &Config) -> Vec<TableSpec> {
    vec![main_table(config), cache_table(config)]
}

/// Computes the epoch-seconds expiry to stamp on a cache entry written now.
pub fn cache_expires_at(now: DateTime<Utc>, ttl: Duration) -> i64 {
    now.timestamp() + ttl.as_secs() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackendKind;
    use chrono::TimeZone;

    fn test_config() -> Config {
        Config {
            backend: BackendKind::Memory,
            region: "us-east-1".to_string(),
            endpoint_url: None,
            access_key_id: None,
            secret_access_key: None,
            session_token: None,
            table_name: "docvet-test".to_string(),
            cache_table_name: "docvet-test-cache".to_string(),
            gsi1_name: "ByOwner".to_string(),
            cache_ttl_seconds: 3_600,
        }
    }

    #[test]
    fn test_main_table_honors_overrides() {
        let spec = main_table(&test_config());
        assert_eq!(spec.name, "docvet-test");
        assert_eq!(spec.hash_key, "PK");
        assert_eq!(spec.range_key.as_deref(), Some("SK"));
        assert_eq!(spec.indexes.len(), 1);
        assert_eq!(spec.indexes[0].name, "ByOwner");
        assert!(spec.ttl_attribute.is_none());
    }

    #[test]
    fn test_cache_table_shape() {
        let spec = cache_table(&test_config());
        assert_eq!(spec.name, "docvet-test-cache");
        assert_eq!(spec.hash_key, "cacheKey");
        assert!(spec.range_key.is_none());
        assert!(spec.indexes.is_empty());
        assert_eq!(spec.ttl_attribute.as_deref(), Some("expiresAt"));
    }

    #[test]
    fn test_all_tables_order() {
        let tables = all_tables(&test_config());
        let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["docvet-test", "docvet-test-cache"]);
    }

    #[test]
    fn test_cache_expires_at() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        let expiry = cache_expires_at(now, Duration::from_secs(3_600));
        assert_eq!(expiry, now.timestamp() + 3_600);
    }
}

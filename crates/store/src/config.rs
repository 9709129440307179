use std::{env, time::Duration};

/// Which backend the process talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Process-local emulation for local development and tests.
    Memory,
    /// The real service over HTTP.
    Dynamodb,
}

/// Store configuration loaded from environment variables.
///
/// Loaded once at process start; the chosen backend is constructed from it
/// and passed by reference to every call site, never re-read mid-call.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend selection (default: the real service; set `DOCVET_IN_MEMORY`
    /// for the emulation).
    pub backend: BackendKind,
    /// Service region (default: "us-east-1").
    pub region: String,
    /// Endpoint override for local stacks; the default endpoint is derived
    /// from the region.
    pub endpoint_url: Option<String>,
    /// Access key id; required in remote mode.
    pub access_key_id: Option<String>,
    /// Secret access key; required in remote mode.
    pub secret_access_key: Option<String>,
    /// Session token for temporary credentials.
    pub session_token: Option<String>,
    /// Main table name (default: "docvet").
    pub table_name: String,
    /// Cache table name (default: "docvet-cache").
    pub cache_table_name: String,
    /// Secondary index name on the main table (default: "GSI1").
    pub gsi1_name: String,
    /// Cache entry time-to-live in seconds (default: 86,400).
    pub cache_ttl_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `DOCVET_IN_MEMORY` - "1"/"true" selects the in-memory backend
    /// - `AWS_REGION` - service region (default: "us-east-1")
    /// - `AWS_ENDPOINT_URL` - endpoint override (for local DynamoDB)
    /// - `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_SESSION_TOKEN`
    /// - `DOCVET_TABLE_NAME` - main table name (default: "docvet")
    /// - `DOCVET_CACHE_TABLE_NAME` - cache table name (default: "docvet-cache")
    /// - `DOCVET_GSI1_NAME` - secondary index name (default: "GSI1")
    /// - `DOCVET_CACHE_TTL_SECONDS` - cache TTL in seconds (default: 86,400)
    pub fn from_env() -> Self {
        let in_memory = env::var("DOCVET_IN_MEMORY")
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE"))
            .unwrap_or(false);
        Self {
            backend: if in_memory {
                BackendKind::Memory
            } else {
                BackendKind::Dynamodb
            },
            region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            endpoint_url: env::var("AWS_ENDPOINT_URL").ok(),
            access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
            secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
            session_token: env::var("AWS_SESSION_TOKEN").ok(),
            table_name: env::var("DOCVET_TABLE_NAME").unwrap_or_else(|_| "docvet".to_string()),
            cache_table_name: env::var("DOCVET_CACHE_TABLE_NAME")
                .unwrap_or_else(|_| "docvet-cache".to_string()),
            gsi1_name: env::var("DOCVET_GSI1_NAME").unwrap_or_else(|_| "GSI1".to_string()),
            cache_ttl_seconds: env::var("DOCVET_CACHE_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(86_400),
        }
    }

    /// Get cache TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// Returns a display string for the target backend, for startup logs.
    pub fn target_display(&self) -> String {
        match self.backend {
            BackendKind::Memory => "in-memory store".to_string(),
            BackendKind::Dynamodb => match &self.endpoint_url {
                Some(url) => format!("DynamoDB ({url})"),
                None => format!("DynamoDB (region: {})", self.region),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

//! Error types for store operations.

use std::sync::Arc;

use docvet_core::attr::CodecError;
use thiserror::Error;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Remote mode was selected without an access key pair. Fatal
    /// configuration error, raised at construction.
    #[error("missing credentials: set AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY")]
    MissingCredentials,

    /// The configured endpoint override could not be parsed into a host.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The service answered with a non-2xx status. The body is kept verbatim
    /// so callers can inspect the service's error type string; retry policy
    /// belongs to the caller.
    #[error("request failed with status {status}: {body}")]
    Request { status: u16, body: String },

    /// Transport-level failure before any service answer.
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A 2xx response body did not have the documented shape.
    #[error("unexpected response shape: {0}")]
    UnexpectedResponse(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// An item or key is missing a declared key attribute, or holds a
    /// non-string value for one.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// The in-memory emulation cannot represent this key condition. A new
    /// call shape means the emulation grammar must grow, not the caller
    /// work around it.
    #[error("unsupported key condition: {0}")]
    UnsupportedKeyCondition(String),

    /// The in-memory emulation cannot represent this filter expression.
    #[error("unsupported filter expression: {0}")]
    UnsupportedFilterExpression(String),

    /// The in-memory emulation cannot represent this update expression.
    #[error("unsupported update expression: {0}")]
    UnsupportedUpdateExpression(String),

    /// The in-memory emulation cannot represent this condition expression.
    #[error("unsupported condition expression: {0}")]
    UnsupportedConditionExpression(String),

    /// Control-plane polling exhausted its attempts while the table was not
    /// yet active. Fatal at startup; retrying the whole process is safe.
    #[error("table '{table}' did not become active in time")]
    TableProvisioningTimeout { table: String },

    /// Control-plane polling exhausted its attempts while TTL was not yet
    /// enabled. Fatal at startup; retrying the whole process is safe.
    #[error("time-to-live on table '{table}' did not become enabled in time")]
    TtlProvisioningTimeout { table: String },

    /// TTL is already enabled on a different attribute. Schema drift that
    /// requires operator intervention; never silently reassigned.
    #[error(
        "time-to-live on table '{table}' is enabled on attribute '{actual}', expected '{expected}'"
    )]
    TtlAttributeMismatch {
        table: String,
        expected: String,
        actual: String,
    },

    /// Schema provisioning failed; shared by every caller waiting on the
    /// same provisioning attempt.
    #[error("schema provisioning failed: {0}")]
    Provision(Arc<StoreError>),
}

impl StoreError {
    /// True when the service (or its emulation) reported the addressed
    /// resource as missing — the signal the bootstrapper uses to tell
    /// "needs provisioning" apart from a real failure.
    pub fn is_resource_not_found(&self) -> bool {
        matches!(self, StoreError::Request { body, .. } if body.contains("ResourceNotFoundException"))
    }

    /// True when a conditional write was rejected because its condition did
    /// not hold.
    pub fn is_conditional_check_failed(&self) -> bool {
        matches!(self, StoreError::Request { body, .. } if body.contains("ConditionalCheckFailedException"))
    }
}

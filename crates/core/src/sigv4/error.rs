use thiserror::Error;

/// Errors that can occur while preparing request signatures.
///
/// Signing performs no I/O; a failure here is always a configuration error
/// on the caller's side.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SigningError {
    #[error("missing credentials: access key id and secret access key are required")]
    MissingCredentials,
}

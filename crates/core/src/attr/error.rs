use thiserror::Error;

/// Errors that can occur while converting values to or from the wire format.
///
/// Both variants indicate a caller or peer bug, never a transient condition:
/// nothing in this module is worth retrying.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// A `null` entry reached strict marshalling. `None` fields serialize to
    /// JSON `null`; write paths must [`sanitize`](super::sanitize) them away
    /// before marshalling.
    #[error("null attribute at '{0}': sanitize the value or drop the field")]
    NullAttribute(String),

    /// A wire payload did not match the tagged attribute-value format.
    #[error("malformed attribute value: {0}")]
    Malformed(String),
}

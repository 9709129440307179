//! Pure building blocks for the docvet key-item store client.
//!
//! This crate has no I/O and no async: everything in it is a pure function
//! over owned data, which keeps the two tricky pieces of the store client —
//! the attribute wire codec and the request signer — directly unit-testable.
//!
//! - [`attr`] converts between native `serde_json` values and the store's
//!   tagged attribute-value representation.
//! - [`sigv4`] computes the AWS Signature V4 `Authorization` header for the
//!   store's JSON-over-POST protocol.

pub mod attr;
pub mod sigv4;

pub use attr::{marshal, marshal_item, sanitize, unmarshal, AttributeValue, CodecError};
pub use sigv4::{sign_request, Credentials, SignedHeaders, SigningError};

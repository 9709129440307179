//! AWS Signature V4 request signing.
//!
//! The store speaks a JSON-RPC style protocol: every call is a `POST /` with
//! an `x-amz-target` header naming the operation. This module computes the
//! `Authorization` header for such a request from a secret key pair, region,
//! service name, and timestamp — byte-for-byte compatible with the service's
//! verifier. The timestamp is injected by the caller, so signing is a pure
//! function and two calls with identical inputs produce identical headers.

mod error;

pub use error::SigningError;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Content type for every request the store client sends.
pub const CONTENT_TYPE: &str = "application/x-amz-json-1.0";

/// A secret key pair, with an optional session token for temporary
/// credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    /// Validates key material up front; fails fast with
    /// [`SigningError::MissingCredentials`] so a misconfigured process stops
    /// at construction rather than on its first request.
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Result<Self, SigningError> {
        let access_key_id = access_key_id.into();
        let secret_access_key = secret_access_key.into();
        if access_key_id.trim().is_empty() || secret_access_key.trim().is_empty() {
            return Err(SigningError::MissingCredentials);
        }
        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token,
        })
    }
}

/// The computed authentication headers for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    /// `x-amz-date`: the signing timestamp in ISO-basic UTC form.
    pub amz_date: String,
    /// The full `Authorization` header value.
    pub authorization: String,
    /// `x-amz-security-token`, present when signing with temporary
    /// credentials.
    pub security_token: Option<String>,
}

/// Signs one `POST /` request.
///
/// `target` is the full operation header value (for example
/// `DynamoDB_20120810.PutItem`); `body` is the exact JSON payload that will
/// be sent. The signed header set is `content-type`, `host`, `x-amz-date`,
/// `x-amz-target`, plus `x-amz-security-token` when a session token is
/// configured.
pub fn sign_request(
    credentials: &Credentials,
    region: &str,
    service: &str,
    host: &str,
    target: &str,
    body: &str,
    at: DateTime<Utc>,
) -> SignedHeaders {
    let amz_date = at.format("%Y%m%dT%H%M%SZ").to_string();
    let date = at.format("%Y%m%d").to_string();

    let mut headers: Vec<(String, String)> = vec![
        ("content-type".to_string(), CONTENT_TYPE.to_string()),
        ("host".to_string(), host.to_string()),
        ("x-amz-date".to_string(), amz_date.clone()),
        ("x-amz-target".to_string(), target.to_string()),
    ];
    if let Some(token) = &credentials.session_token {
        headers.push(("x-amz-security-token".to_string(), token.clone()));
    }
    headers.sort_by(|a, b| a.0.cmp(&b.0));

    let signed_header_names = header_names(&headers);
    let canonical = canonical_request(&headers, &sha256_hex(body.as_bytes()));
    let scope = format!("{date}/{region}/{service}/aws4_request");
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        sha256_hex(canonical.as_bytes())
    );

    let signing_key = derive_signing_key(&credentials.secret_access_key, &date, region, service);
    let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes()));

    let authorization = format!(
        "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_header_names}, Signature={signature}",
        credentials.access_key_id
    );

    SignedHeaders {
        amz_date,
        authorization,
        security_token: credentials.session_token.clone(),
    }
}

/// The normalized request form the signature covers: method, path, empty
/// query string, `name:value` header lines in sorted order, the signed
/// header-name list, and the payload hash.
fn canonical_request(sorted_headers: &[(String, String)], payload_hash: &str) -> String {
    let header_lines: String = sorted_headers
        .iter()
        .map(|(name, value)| format!("{name}:{value}\n"))
        .collect();
    format!(
        "POST\n/\n\n{header_lines}\n{}\n{payload_hash}",
        header_names(sorted_headers)
    )
}

fn header_names(sorted_headers: &[(String, String)]) -> String {
    sorted_headers
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";")
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC-SHA256 accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

// kDate = HMAC("AWS4" + secret, date); then chain region, service, and the
// terminal "aws4_request" literal.
fn derive_signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn test_credentials(token: Option<&str>) -> Credentials {
        Credentials::new(
            "AKIDEXAMPLE",
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            token.map(str::to_string),
        )
        .unwrap()
    }

    fn test_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap()
    }

    #[test]
    fn test_credentials_reject_empty_key_material() {
        assert_eq!(
            Credentials::new("", "secret", None).unwrap_err(),
            SigningError::MissingCredentials
        );
        assert_eq!(
            Credentials::new("AKIDEXAMPLE", "  ", None).unwrap_err(),
            SigningError::MissingCredentials
        );
    }

    #[test]
    fn test_sha256_of_empty_payload() {
        // Published SHA-256 digest of the empty string.
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_signing_key_derivation_matches_published_example() {
        // The worked signing-key example from the Signature V4 documentation:
        // secret wJalr..., date 20150830, us-east-1, iam.
        let key = derive_signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20150830",
            "us-east-1",
            "iam",
        );
        assert_eq!(
            hex::encode(key),
            "c4afb1cc5771d871763a393e44b703571b55cc28424d1a5e86da6ed3c154a4b9"
        );
    }

    #[test]
    fn test_canonical_request_layout() {
        let headers = vec![
            ("content-type".to_string(), CONTENT_TYPE.to_string()),
            ("host".to_string(), "dynamodb.us-east-1.amazonaws.com".to_string()),
            ("x-amz-date".to_string(), "20150830T123600Z".to_string()),
            ("x-amz-target".to_string(), "DynamoDB_20120810.GetItem".to_string()),
        ];
        let canonical = canonical_request(&headers, "PAYLOADHASH");
        assert_eq!(
            canonical,
            "POST\n\
             /\n\
             \n\
             content-type:application/x-amz-json-1.0\n\
             host:dynamodb.us-east-1.amazonaws.com\n\
             x-amz-date:20150830T123600Z\n\
             x-amz-target:DynamoDB_20120810.GetItem\n\
             \n\
             content-type;host;x-amz-date;x-amz-target\n\
             PAYLOADHASH"
        );
    }

    #[test]
    fn test_sign_request_is_deterministic() {
        let credentials = test_credentials(None);
        let sign = || {
            sign_request(
                &credentials,
                "us-east-1",
                "dynamodb",
                "dynamodb.us-east-1.amazonaws.com",
                "DynamoDB_20120810.PutItem",
                r#"{"TableName":"docvet"}"#,
                test_time(),
            )
        };
        assert_eq!(sign(), sign());
    }

    #[test]
    fn test_authorization_header_shape() {
        let credentials = test_credentials(None);
        let signed = sign_request(
            &credentials,
            "us-east-1",
            "dynamodb",
            "dynamodb.us-east-1.amazonaws.com",
            "DynamoDB_20120810.Query",
            "{}",
            test_time(),
        );

        assert_eq!(signed.amz_date, "20150830T123600Z");
        let prefix = "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/dynamodb/aws4_request, \
                      SignedHeaders=content-type;host;x-amz-date;x-amz-target, Signature=";
        assert!(signed.authorization.starts_with(prefix));
        let signature = &signed.authorization[prefix.len()..];
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_session_token_joins_signed_headers_in_order() {
        let credentials = test_credentials(Some("SESSIONTOKEN"));
        let signed = sign_request(
            &credentials,
            "us-east-1",
            "dynamodb",
            "dynamodb.us-east-1.amazonaws.com",
            "DynamoDB_20120810.Query",
            "{}",
            test_time(),
        );

        // `x-amz-security-token` sorts between `x-amz-date` and `x-amz-target`.
        assert!(signed.authorization.contains(
            "SignedHeaders=content-type;host;x-amz-date;x-amz-security-token;x-amz-target,"
        ));
        assert_eq!(signed.security_token.as_deref(), Some("SESSIONTOKEN"));
    }

    #[test]
    fn test_body_changes_signature() {
        let credentials = test_credentials(None);
        let sign = |body: &str| {
            sign_request(
                &credentials,
                "us-east-1",
                "dynamodb",
                "dynamodb.us-east-1.amazonaws.com",
                "DynamoDB_20120810.PutItem",
                body,
                test_time(),
            )
        };
        assert_ne!(sign("{}").authorization, sign(r#"{"a":1}"#).authorization);
    }
}

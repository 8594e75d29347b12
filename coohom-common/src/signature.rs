//! Request signature generation
//!
//! Every Coohom API call carries `appkey`, `timestamp` and `sign`. The sign is
//! the lowercase hex MD5 of `appSecret ++ appKey ++ timestamp_millis`. The
//! concatenation order and the millisecond precision are fixed by the remote
//! service.

use md5::{Digest, Md5};
use serde::Serialize;

use crate::config::Credentials;

/// Compute the request signature.
///
/// # Examples
///
/// ```
/// use coohom_common::signature::sign;
///
/// let s = sign("secret", "key", 1_700_000_000_000);
/// assert_eq!(s.len(), 32);
/// assert_eq!(s, sign("secret", "key", 1_700_000_000_000));
/// ```
pub fn sign(app_secret: &str, app_key: &str, timestamp_millis: i64) -> String {
    let mut hasher = Md5::new();
    hasher.update(app_secret.as_bytes());
    hasher.update(app_key.as_bytes());
    hasher.update(timestamp_millis.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Authentication parameters attached to a single request
///
/// Field names match the remote query/form parameter names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedParams {
    pub appkey: String,
    pub timestamp: i64,
    pub sign: String,
}

impl SignedParams {
    /// Sign for an explicit timestamp
    pub fn at(credentials: &Credentials, timestamp_millis: i64) -> Self {
        Self {
            appkey: credentials.app_key.clone(),
            timestamp: timestamp_millis,
            sign: sign(&credentials.app_secret, &credentials.app_key, timestamp_millis),
        }
    }

    /// Sign for the current wall-clock time
    ///
    /// Signatures are time-bound, so callers build a fresh value right before
    /// each request instead of caching one.
    pub fn now(credentials: &Credentials) -> Self {
        Self::at(credentials, chrono::Utc::now().timestamp_millis())
    }

    /// Short prefix of the signature, safe to put in logs
    pub fn sign_prefix(&self) -> &str {
        let end = self.sign.len().min(8);
        &self.sign[..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_known_vector() {
        // md5("secretkey1700000000000")
        let expected = format!("{:x}", Md5::digest(b"secretkey1700000000000"));
        assert_eq!(sign("secret", "key", 1_700_000_000_000), expected);
    }

    #[test]
    fn test_sign_is_lowercase_hex_32() {
        for (secret, key, ts) in [
            ("", "", 0_i64),
            ("s3cr3t", "APPKEY", 1_699_999_999_999),
            ("密钥", "キー", 42),
        ] {
            let s = sign(secret, key, ts);
            assert_eq!(s.len(), 32);
            assert!(s.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        }
    }

    #[test]
    fn test_sign_order_matters() {
        assert_ne!(sign("a", "b", 1), sign("b", "a", 1));
    }

    #[test]
    fn test_sign_uses_millisecond_timestamp() {
        // Seconds and milliseconds for the same instant must not collide
        assert_ne!(sign("s", "k", 1_700_000_000), sign("s", "k", 1_700_000_000_000));
    }

    #[test]
    fn test_signed_params_at() {
        let creds = Credentials::new("key", "secret");
        let params = SignedParams::at(&creds, 1_700_000_000_000);

        assert_eq!(params.appkey, "key");
        assert_eq!(params.timestamp, 1_700_000_000_000);
        assert_eq!(params.sign, sign("secret", "key", 1_700_000_000_000));
        assert_eq!(params.sign_prefix().len(), 8);
    }

    #[test]
    fn test_signed_params_now_is_milliseconds() {
        let creds = Credentials::new("key", "secret");
        let params = SignedParams::now(&creds);

        // Millisecond timestamps after 2001 have 13 digits
        assert_eq!(params.timestamp.to_string().len(), 13);
    }
}

//! Signed request paths
//!
//! Produces and verifies tamper-evident, optionally time-limited request
//! paths. The signature covers the path and every query parameter except
//! `s`, in the order the parameters appear:
//!
//! ```text
//! s = base64url(HMAC-SHA256(secret, path + "?" + query_without_s))
//! ```
//!
//! An optional `e` parameter carries an absolute expiry in epoch seconds.
//! Query parameters are never re-sorted, so the transport layer must hand
//! [`verify`] the query exactly as the client sent it.
//!
//! # Example
//!
//! ```
//! use pixvariant::signing::{sign, verify, SignOptions};
//!
//! let signed = sign("/img/cat.jpg?w=400", "secret", SignOptions::default());
//! assert!(verify(&signed, "secret"));
//! assert!(!verify(&signed.replace("w=400", "w=800"), "secret"));
//! ```

mod query;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;

pub use query::{split_path_and_query, QueryPairs};

type HmacSha256 = Hmac<Sha256>;

/// Query parameter carrying the signature
pub const SIGNATURE_PARAM: &str = "s";

/// Query parameter carrying the absolute expiry (epoch seconds)
pub const EXPIRY_PARAM: &str = "e";

/// Options for [`sign`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignOptions {
    /// Lifetime of the signed path in seconds, counted from signing time
    pub expires_in: Option<u64>,
}

impl SignOptions {
    /// Sign with an expiry `seconds` from now
    pub fn expires_in(seconds: u64) -> Self {
        Self {
            expires_in: Some(seconds),
        }
    }
}

/// Sign `path` with `secret` using the current wall clock.
///
/// Accepts a bare path (`/img/a.jpg?w=1`) or an absolute URL; the returned
/// value is always path + query with scheme and host stripped.
pub fn sign(path: &str, secret: &str, options: SignOptions) -> String {
    sign_at(path, secret, options, now_epoch_seconds())
}

/// Sign `path` as if the current time were `now` (epoch seconds)
pub fn sign_at(path: &str, secret: &str, options: SignOptions, now: i64) -> String {
    let (path, query) = split_path_and_query(path);
    let mut pairs = QueryPairs::parse(query);

    if let Some(expires_in) = options.expires_in.filter(|secs| *secs > 0) {
        let expires = now.saturating_add(i64::try_from(expires_in).unwrap_or(i64::MAX));
        pairs.set(EXPIRY_PARAM, &expires.to_string());
    }

    // A previously signed path must not carry its old signature into the
    // signed material.
    pairs.remove(SIGNATURE_PARAM);

    let signature = generate_signature(&canonical_string(path, &pairs), secret.as_bytes());
    pairs.append(SIGNATURE_PARAM, &signature);

    canonical_string(path, &pairs)
}

/// Verify a signed path against `secret` using the current wall clock.
///
/// Returns `false` when the signature is missing, expired, malformed, made
/// with a different secret, or when any signed component was altered.
pub fn verify(path: &str, secret: &str) -> bool {
    verify_at(path, secret, now_epoch_seconds())
}

/// Verify a signed path as if the current time were `now` (epoch seconds)
pub fn verify_at(path: &str, secret: &str, now: i64) -> bool {
    let (path, query) = split_path_and_query(path);
    let mut pairs = QueryPairs::parse(query);

    let Some(presented) = pairs.get(SIGNATURE_PARAM).map(str::to_string) else {
        return false;
    };
    if presented.is_empty() {
        return false;
    }

    if let Some(expires) = pairs.get(EXPIRY_PARAM) {
        match expires.parse::<i64>() {
            Ok(expires) if now > expires => return false,
            Ok(_) => {}
            // An unparseable expiry can never be honoured
            Err(_) => return false,
        }
    }

    pairs.remove(SIGNATURE_PARAM);
    let expected = generate_signature(&canonical_string(path, &pairs), secret.as_bytes());

    constant_time_compare(&presented, &expected)
}

/// Build the string that is fed into the HMAC
pub fn canonical_string(path: &str, pairs: &QueryPairs) -> String {
    if pairs.is_empty() {
        path.to_string()
    } else {
        format!("{}?{}", path, pairs.serialize())
    }
}

/// Compute the base64url (unpadded) HMAC-SHA256 of `data`
pub fn generate_signature(data: &str, secret: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(data.as_bytes());
    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}

/// Constant-time string comparison to prevent timing attacks
///
/// Differing lengths short-circuit; for equal lengths every byte is visited.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

fn now_epoch_seconds() -> i64 {
    chrono::Utc::now().timestamp()
}

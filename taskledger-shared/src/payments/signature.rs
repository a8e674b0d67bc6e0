/// Payment webhook signature verification
///
/// The provider signs each delivery with HMAC-SHA256 over
/// `"{timestamp}.{raw body}"` using the endpoint's shared secret and sends
///
/// ```text
/// Stripe-Signature: t=1700000000,v1=5257a869e7ecebeda32affa62cdca3fa51cad7e77a0e56ff536d0ce8e108d8bd
/// ```
///
/// Several `v1` entries may be present during secret rotation; any match is
/// accepted. Deliveries whose timestamp is further than the tolerance from
/// the current time are rejected to limit replay.

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Header carrying the signature
pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Maximum accepted clock distance between signing and verification
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("Missing signature header")]
    Missing,

    #[error("Malformed signature header")]
    Malformed,

    #[error("Signature timestamp outside tolerance")]
    Expired,

    #[error("No signature matches the payload")]
    Mismatch,
}

fn mac_for(secret: &str, timestamp: &str, payload: &[u8]) -> Result<HmacSha256, SignatureError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Malformed)?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Hex-encoded `v1` signature for a payload
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    match mac_for(secret, &timestamp.to_string(), payload) {
        Ok(mac) => hex::encode(mac.finalize().into_bytes()),
        Err(_) => String::new(),
    }
}

/// Full header value (`t=...,v1=...`) for a payload
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    format!(
        "t={},v1={}",
        timestamp,
        compute_signature(secret, timestamp, payload)
    )
}

/// Verifies a signature header against the raw request body
///
/// `now` is the current Unix time in seconds.
///
/// # Errors
///
/// - `Missing` if the header is empty
/// - `Malformed` if it has no timestamp or no `v1` entry
/// - `Expired` if the timestamp is outside `tolerance_secs`
/// - `Mismatch` if no `v1` entry matches (compared in constant time)
pub fn verify_signature(
    header: &str,
    payload: &[u8],
    secret: &str,
    now: i64,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    let header = header.trim();
    if header.is_empty() {
        return Err(SignatureError::Missing);
    }

    let mut timestamp: Option<&str> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if candidates.is_empty() {
        return Err(SignatureError::Malformed);
    }

    let signed_at: i64 = timestamp.parse().map_err(|_| SignatureError::Malformed)?;
    if now.abs_diff(signed_at) > tolerance_secs.max(0) as u64 {
        return Err(SignatureError::Expired);
    }

    for candidate in candidates {
        let Ok(expected) = hex::decode(candidate) else {
            continue;
        };

        let mac = mac_for(secret, timestamp, payload)?;
        if mac.verify_slice(&expected).is_ok() {
            return Ok(());
        }
    }

    Err(SignatureError::Mismatch)
}

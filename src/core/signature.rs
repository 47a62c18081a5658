use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::credentials::SignatureBundle;

type HmacSha256 = Hmac<Sha256>;

/// Injectable wall clock so tests can freeze/advance time
/// instead of racing `SystemTime::now()`.
pub trait Clock: Send + Sync {
    fn now_unix(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// A fixed clock for tests.
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_unix(&self) -> i64 {
        self.0
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn hmac_sha256_hex(key: &[u8], msg: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts a key of any length");
    mac.update(msg);
    hex::encode(mac.finalize().into_bytes())
}

/// Byte-for-byte constant-time comparison of two ASCII strings (hex
/// digests, in practice). Unequal lengths short-circuit immediately —
/// the length mismatch itself leaks nothing about the secret.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

pub fn canonical_string(method: &str, path: &str, timestamp_raw: &str, body_hash_hex: &str) -> String {
    format!("{}\n{}\n{}\n{}", method.to_ascii_uppercase(), path, timestamp_raw, body_hash_hex)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureFailure {
    InvalidSignature,
    Expired,
    BodyTampered,
}

/// Recompute the expected HMAC and compare it to the bundle's signature.
/// This is the identifying check: a matching signature is proof the
/// candidate secret belongs to the calling client, independent of whether
/// the request turns out to be stale or tampered.
pub fn signature_matches(bundle: &SignatureBundle, secret: &[u8], method: &str, path: &str) -> bool {
    let canonical = canonical_string(method, path, &bundle.timestamp_raw, &bundle.body_hash);
    let expected_signature = hmac_sha256_hex(secret, canonical.as_bytes());
    constant_time_eq(&expected_signature, &bundle.signature)
}

pub fn check_freshness(bundle: &SignatureBundle, now_unix: i64, tolerance_secs: i64) -> Result<(), SignatureFailure> {
    let timestamp: i64 = bundle
        .timestamp_raw
        .parse()
        .map_err(|_| SignatureFailure::Expired)?;
    if (now_unix - timestamp).abs() > tolerance_secs {
        return Err(SignatureFailure::Expired);
    }
    Ok(())
}

pub fn check_body(bundle: &SignatureBundle, body: &[u8]) -> Result<(), SignatureFailure> {
    let actual_body_hash = sha256_hex(body);
    if !constant_time_eq(&actual_body_hash, &bundle.body_hash) {
        return Err(SignatureFailure::BodyTampered);
    }
    Ok(())
}

/// Verify one signature bundle against one candidate secret. Pure — no
/// repository access; the Authorizer owns iterating candidate secrets.
///
/// Failure ordering is signature, then timestamp, then body (in that
/// order) so that an attacker missing the secret never learns which of
/// several wrong inputs would otherwise have failed first.
pub fn verify_bundle(
    bundle: &SignatureBundle,
    secret: &[u8],
    method: &str,
    path: &str,
    body: &[u8],
    now_unix: i64,
    tolerance_secs: i64,
) -> Result<(), SignatureFailure> {
    if !signature_matches(bundle, secret, method, path) {
        return Err(SignatureFailure::InvalidSignature);
    }
    check_freshness(bundle, now_unix, tolerance_secs)?;
    check_body(bundle, body)?;
    Ok(())
}

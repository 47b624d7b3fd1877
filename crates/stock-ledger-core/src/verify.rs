//! Webhook signature verification.
//!
//! ShipHero signs every webhook delivery with HMAC-SHA-256 over the raw
//! request body and sends the base64 digest in the
//! `x-shiphero-hmac-sha256` header. Verification must run against the
//! bytes exactly as received on the wire — re-serializing the JSON can
//! reorder keys or change whitespace and silently break the signature.
//!
//! Comparison is constant-time so that response timing never reveals how
//! many leading bytes of a forged signature matched.

use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Compute the base64 HMAC-SHA-256 signature for a raw body.
///
/// Used by the verifier and by test tooling that signs outgoing test
/// deliveries.
pub fn compute_signature(secret: &str, raw_body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(raw_body);
    general_purpose::STANDARD.encode(mac.finalize().into_bytes())
}

/// Verify a provided base64 signature against the raw request body.
///
/// Returns `false` for any mismatch: wrong digest, undecodable signature,
/// or differing length. Equal-length buffers are compared in constant
/// time; a length mismatch short-circuits, which leaks only the length —
/// already public from the header itself.
pub fn verify_signature(secret: &str, raw_body: &[u8], provided: &str) -> bool {
    let expected = compute_signature(secret, raw_body);

    let a = expected.as_bytes();
    let b = provided.as_bytes();
    if a.len() != b.len() {
        return false;
    }

    a.ct_eq(b).into()
}

#[cfg(test)]
#[path = "verify_tests.rs"]
mod tests;

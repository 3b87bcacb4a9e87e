//! # IPN signatures
//!
//! The processor signs every callback with HMAC-SHA512, keyed with the shared IPN secret, over the raw request body.
//! The signature arrives hex-encoded in the `x-nowpayments-sig` header.
//!
//! The body must be hashed exactly as received. Re-serialising the parsed JSON changes whitespace and key order and
//! breaks the signature.
use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Hex-encoded HMAC-SHA512 of `body` under `secret`.
pub fn calculate_ipn_signature(secret: &str, body: &[u8]) -> String {
    let mut mac = hmac_for(secret);
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Checks `signature` (hex, either case) against `body` in constant time. Anything that is not valid hex fails.
pub fn verify_ipn_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let mut mac = hmac_for(secret);
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

fn hmac_for(secret: &str) -> HmacSha512 {
    // HMAC takes keys of any length, including empty ones
    match HmacSha512::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC accepts keys of any length"),
    }
}

//! Payment signature verification.
//!
//! Razorpay signs a completed checkout with HMAC-SHA256 over the exact string
//! `order_id|payment_id`, keyed with the account's key secret, hex-encoded.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use infograph_core::{OrderId, PaymentId};

type HmacSha256 = Hmac<Sha256>;

fn keyed(secret: &str, message: &str) -> HmacSha256 {
    // INVARIANT: HMAC-SHA256 accepts keys of any size per RFC 2104, so
    // `new_from_slice` only fails if the Hmac implementation is broken.
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC-SHA256 accepts any key size");
    mac.update(message.as_bytes());
    mac
}

/// The message the provider signs.
#[must_use]
pub fn signature_payload(order_id: &OrderId, payment_id: &PaymentId) -> String {
    format!("{order_id}|{payment_id}")
}

/// Compute HMAC-SHA256 and return hex-encoded result (64 characters).
#[must_use]
pub fn hmac_sha256_hex(secret: &str, message: &str) -> String {
    hex::encode(keyed(secret, message).finalize().into_bytes())
}

/// Produce the signature the provider would attach to this payment.
#[must_use]
pub fn sign_payment(secret: &str, order_id: &OrderId, payment_id: &PaymentId) -> String {
    hmac_sha256_hex(secret, &signature_payload(order_id, payment_id))
}

/// Check a submitted signature in constant time.
///
/// Hex decoding is case-insensitive; anything that is not valid hex of the
/// right length is rejected.
#[must_use]
pub fn verify_payment_signature(
    secret: &str,
    order_id: &OrderId,
    payment_id: &PaymentId,
    signature: &str,
) -> bool {
    let Ok(submitted) = hex::decode(signature.trim()) else {
        return false;
    };

    keyed(secret, &signature_payload(order_id, payment_id))
        .verify_slice(&submitted)
        .is_ok()
}

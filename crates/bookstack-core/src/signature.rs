//! # Payment Signature
//!
//! The authenticity gate for settlement callbacks.
//!
//! ## Construction
//! ```text
//! signature = hex( HMAC-SHA256( secret_key,
//!                               external_order_token || "|" || external_payment_token ) )
//! ```
//! The gateway signs the token pair at initiation; settlement recomputes the
//! HMAC locally and compares. Nothing about the order or payment state is
//! consulted - a signature either proves knowledge of the secret key for this
//! exact token pair or it doesn't.
//!
//! ## Comparison
//! Verification goes through `Mac::verify_slice`, which compares in constant
//! time. A plain `==` on the hex strings would leak how many leading bytes
//! matched through timing.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Separator between the two tokens inside the signed message.
const TOKEN_SEPARATOR: &[u8] = b"|";

/// Computes the hex-encoded signature for a token pair.
pub fn sign(secret_key: &[u8], external_order_token: &str, external_payment_token: &str) -> String {
    let mac = mac_for(secret_key, external_order_token, external_payment_token);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a claimed hex-encoded signature for a token pair.
///
/// Returns `false` for malformed hex as well as for a mismatch; the caller
/// never learns the expected signature.
pub fn verify(
    secret_key: &[u8],
    external_order_token: &str,
    external_payment_token: &str,
    claimed_signature: &str,
) -> bool {
    let claimed = match hex::decode(claimed_signature) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mac = mac_for(secret_key, external_order_token, external_payment_token);
    mac.verify_slice(&claimed).is_ok()
}

fn mac_for(secret_key: &[u8], order_token: &str, payment_token: &str) -> HmacSha256 {
    // HMAC accepts keys of any length, so new_from_slice cannot fail here.
    let mut mac = HmacSha256::new_from_slice(secret_key).expect("HMAC accepts any key length");
    mac.update(order_token.as_bytes());
    mac.update(TOKEN_SEPARATOR);
    mac.update(payment_token.as_bytes());
    mac
}

// =============================================================================
// Unit Tests
// =============================================================================

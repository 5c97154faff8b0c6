//! Integration tests for TradeStack exchange authentication.
//!
//! These tests drive the public API of `tradestack-auth` end to end: loading
//! configuration, selecting a scheme, producing headers, caching tokens and
//! serving concurrent callers. They need no network access.
//!
//! Run them with:
//! ```text
//! cargo test -p tradestack-integration
//! ```

use std::collections::HashMap;
use std::sync::Once;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, KeyInit, Mac};
use p256::SecretKey;
use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use p256::pkcs8::{EncodePrivateKey, LineEnding};
use sha2::Sha256;

static INIT: Once = Once::new();

/// Initialize tracing (once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// Deterministic P-256 key derived from a fixed scalar.
#[must_use]
pub fn test_secret(seed: u8) -> SecretKey {
    SecretKey::from_slice(&[seed; 32]).expect("valid P-256 scalar")
}

/// SEC1 (`EC PRIVATE KEY`) PEM for [`test_secret`].
#[must_use]
pub fn sec1_pem(seed: u8) -> String {
    test_secret(seed)
        .to_sec1_pem(LineEnding::LF)
        .expect("encode SEC1 PEM")
        .to_string()
}

/// PKCS#8 (`PRIVATE KEY`) PEM for [`test_secret`].
#[must_use]
pub fn pkcs8_pem(seed: u8) -> String {
    test_secret(seed)
        .to_pkcs8_pem(LineEnding::LF)
        .expect("encode PKCS#8 PEM")
        .to_string()
}

/// Environment lookup backed by a fixed set of variables.
pub fn env_lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    move |name| vars.get(name).cloned()
}

/// Hex HMAC-SHA256, computed independently of the crate under test.
#[must_use]
pub fn reference_hmac(secret: &str, message: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("any key length");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

/// Decode one JSON segment (0 = header, 1 = claims) of a compact JWS.
#[must_use]
pub fn decode_segment(token: &str, index: usize) -> serde_json::Value {
    let segment = token.split('.').nth(index).expect("token segment");
    let bytes = URL_SAFE_NO_PAD.decode(segment).expect("base64url segment");
    serde_json::from_slice(&bytes).expect("JSON segment")
}

/// Whether `token` carries a valid ES256 signature by `secret`.
#[must_use]
pub fn verify_es256(token: &str, secret: &SecretKey) -> bool {
    let Some((signing_input, signature)) = token.rsplit_once('.') else {
        return false;
    };
    let Ok(raw) = URL_SAFE_NO_PAD.decode(signature) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&raw) else {
        return false;
    };
    VerifyingKey::from(secret.public_key())
        .verify(signing_input.as_bytes(), &signature)
        .is_ok()
}

mod test_config;
mod test_hmac;
mod test_redaction;

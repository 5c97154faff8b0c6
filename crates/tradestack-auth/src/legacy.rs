//! Legacy HMAC-SHA256 request signing.
//!
//! The signature covers a canonical message:
//!
//! ```text
//! message   = timestamp || METHOD || path || body
//! signature = hex(HMAC-SHA256(secret, message))
//! ```
//!
//! and is carried in four headers: access key, signature, timestamp and (when
//! configured) passphrase. Signing is deterministic: the same context and
//! credential always produce the same headers, which is what the exchange's
//! replay-window verification relies on.

use hmac::{Hmac, KeyInit, Mac};
use http::{HeaderMap, HeaderName, HeaderValue};
use sha2::Sha256;
use tracing::debug;

use crate::context::SigningContext;
use crate::credentials::Credential;
use crate::error::{AuthError, AuthResult};
use crate::redact::{SecretMaterial, redact};

type HmacSha256 = Hmac<Sha256>;

/// Base header name for the API key id.
pub const ACCESS_KEY: &str = "access-key";
/// Base header name for the hex signature.
pub const ACCESS_SIGNATURE: &str = "access-signature";
/// Base header name for the Unix timestamp.
pub const ACCESS_TIMESTAMP: &str = "access-timestamp";
/// Base header name for the passphrase.
pub const ACCESS_PASSPHRASE: &str = "access-passphrase";

/// Header values produced by [`HmacSigner::sign`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeaders {
    /// API key id.
    pub access_key: String,
    /// Hex-encoded HMAC-SHA256 signature.
    pub signature: String,
    /// Unix timestamp in seconds, as sent.
    pub timestamp: String,
    /// Passphrase, for the three-factor variant.
    pub passphrase: Option<SecretMaterial>,
}

impl SignatureHeaders {
    /// Convert into an HTTP header map using the given name prefix.
    ///
    /// The signature and passphrase values are marked sensitive so that they
    /// are hidden from `Debug` output of the map.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SigningFailed`] if the prefix or a value is not
    /// valid in an HTTP header.
    pub fn to_header_map(&self, prefix: &str) -> AuthResult<HeaderMap> {
        let mut headers = HeaderMap::with_capacity(4);
        headers.insert(
            header_name(prefix, ACCESS_KEY)?,
            header_value(&self.access_key, false)?,
        );
        headers.insert(
            header_name(prefix, ACCESS_SIGNATURE)?,
            header_value(&self.signature, true)?,
        );
        headers.insert(
            header_name(prefix, ACCESS_TIMESTAMP)?,
            header_value(&self.timestamp, false)?,
        );
        if let Some(passphrase) = &self.passphrase {
            headers.insert(
                header_name(prefix, ACCESS_PASSPHRASE)?,
                header_value(passphrase.expose(), true)?,
            );
        }
        Ok(headers)
    }
}

/// Signer for the legacy symmetric scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacSigner;

impl HmacSigner {
    /// Create a new signer.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Sign a request context with a symmetric credential.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidContext`] if the context is not a valid
    /// request description.
    pub fn sign(&self, ctx: &SigningContext, cred: &Credential) -> AuthResult<SignatureHeaders> {
        ctx.validate()?;

        let message = build_message(ctx);
        let signature = compute_signature(cred.secret().expose().as_bytes(), &message);

        debug!(
            key_id = %redact(cred.key_id()),
            method = ctx.method(),
            path = ctx.path(),
            timestamp = ctx.timestamp(),
            body_len = ctx.body().len(),
            "signed request with HMAC-SHA256"
        );

        Ok(SignatureHeaders {
            access_key: cred.key_id().to_owned(),
            signature,
            timestamp: ctx.timestamp().to_string(),
            passphrase: cred.passphrase().cloned(),
        })
    }
}

/// Build the canonical message `timestamp || METHOD || path || body`.
///
/// # Examples
///
/// ```
/// use tradestack_auth::context::SigningContext;
/// use tradestack_auth::legacy::build_message;
///
/// let ctx = SigningContext::at("get", "/v2/accounts", "", 1_700_000_000);
/// assert_eq!(build_message(&ctx), b"1700000000GET/v2/accounts");
/// ```
#[must_use]
pub fn build_message(ctx: &SigningContext) -> Vec<u8> {
    let timestamp = ctx.timestamp().to_string();
    let mut message =
        Vec::with_capacity(timestamp.len() + ctx.method().len() + ctx.path().len() + ctx.body().len());
    message.extend_from_slice(timestamp.as_bytes());
    message.extend_from_slice(ctx.method().as_bytes());
    message.extend_from_slice(ctx.path().as_bytes());
    message.extend_from_slice(ctx.body());
    message
}

/// Compute the hex-encoded HMAC-SHA256 of `message` under `secret`.
#[must_use]
pub fn compute_signature(secret: &[u8], message: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can accept keys of any length");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

fn header_name(prefix: &str, base: &str) -> AuthResult<HeaderName> {
    HeaderName::from_bytes(format!("{prefix}{base}").as_bytes())
        .map_err(|_| AuthError::SigningFailed(format!("invalid header prefix {prefix:?}")))
}

fn header_value(value: &str, sensitive: bool) -> AuthResult<HeaderValue> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|_| AuthError::SigningFailed("header value is not valid ASCII".to_owned()))?;
    value.set_sensitive(sensitive);
    Ok(value)
}

//! Per-request signing context.
//!
//! A [`SigningContext`] describes one outbound request: method, path, body and
//! the Unix timestamp the signature is bound to. It is built fresh for every
//! call and never persisted.
//!
//! Signing must be the last step before transmission: the body passed here is
//! exactly the body that goes on the wire. Mutating the body after signing
//! yields a request the exchange will reject.

use std::fmt;

use bytes::Bytes;
use chrono::Utc;

use crate::error::{AuthError, AuthResult};

/// Ephemeral description of an outbound request to be signed.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningContext {
    method: String,
    path: String,
    body: Bytes,
    timestamp: i64,
}

impl SigningContext {
    /// Create a context stamped with the current time.
    #[must_use]
    pub fn new(method: &str, path: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self::at(method, path, body, Utc::now().timestamp())
    }

    /// Create a context with an explicit Unix timestamp (seconds).
    #[must_use]
    pub fn at(
        method: &str,
        path: impl Into<String>,
        body: impl Into<Bytes>,
        timestamp: i64,
    ) -> Self {
        Self {
            method: method.trim().to_ascii_uppercase(),
            path: path.into(),
            body: body.into(),
            timestamp,
        }
    }

    /// Upper-case HTTP method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request path, including any query string the caller sends.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Request body exactly as transmitted.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Unix timestamp in seconds.
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Check that the context describes a request that can be signed.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidContext`] for an invalid method token, a
    /// path that is not absolute or contains whitespace, or a non-positive
    /// timestamp.
    pub fn validate(&self) -> AuthResult<()> {
        if self.method.is_empty() || http::Method::from_bytes(self.method.as_bytes()).is_err() {
            return Err(AuthError::InvalidContext(format!(
                "invalid method {:?}",
                self.method
            )));
        }
        if !self.path.starts_with('/') {
            return Err(AuthError::InvalidContext(
                "path must start with '/'".to_owned(),
            ));
        }
        if self.path.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(AuthError::InvalidContext(
                "path must not contain whitespace or control characters".to_owned(),
            ));
        }
        if self.timestamp <= 0 {
            return Err(AuthError::InvalidContext(format!(
                "timestamp must be positive, got {}",
                self.timestamp
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for SigningContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningContext")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("body_len", &self.body.len())
            .field("timestamp", &self.timestamp)
            .finish()
    }
}

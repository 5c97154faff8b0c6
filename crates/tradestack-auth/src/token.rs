//! Short-lived bearer tokens and their reuse cache.

use std::fmt;

use parking_lot::Mutex;
use tracing::trace;
use zeroize::Zeroizing;

use crate::error::AuthResult;
use crate::redact::redact;

/// Seconds before `expires_at` after which a cached token is no longer reused.
pub const SAFETY_MARGIN_SECS: i64 = 10;

/// The method and path a token is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestScope {
    method: String,
    path: String,
}

impl RequestScope {
    /// Create a scope; the method is upper-cased.
    #[must_use]
    pub fn new(method: &str, path: impl Into<String>) -> Self {
        Self {
            method: method.trim().to_ascii_uppercase(),
            path: path.into(),
        }
    }

    /// Upper-case HTTP method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for RequestScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// A signed ES256 JWT together with its validity window.
#[derive(Clone)]
pub struct Token {
    value: Zeroizing<String>,
    issued_at: i64,
    expires_at: i64,
    scope: Option<RequestScope>,
}

impl Token {
    /// Wrap an encoded token.
    #[must_use]
    pub fn new(
        value: impl Into<String>,
        issued_at: i64,
        expires_at: i64,
        scope: Option<RequestScope>,
    ) -> Self {
        Self {
            value: Zeroizing::new(value.into()),
            issued_at,
            expires_at,
            scope,
        }
    }

    /// The compact JWS string. Treat as a secret.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Unix time the token was issued.
    #[must_use]
    pub fn issued_at(&self) -> i64 {
        self.issued_at
    }

    /// Unix time the token expires.
    #[must_use]
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// The method and path the token is bound to, if any.
    #[must_use]
    pub fn scope(&self) -> Option<&RequestScope> {
        self.scope.as_ref()
    }

    /// Whether the token may still be used at `now`, keeping `margin` seconds
    /// in reserve before expiry.
    ///
    /// A token whose `issued_at` lies in the future (clock stepped backwards)
    /// is never fresh.
    #[must_use]
    pub fn is_fresh_at(&self, now: i64, margin: i64) -> bool {
        now >= self.issued_at && now < self.expires_at - margin
    }

    /// Whether the token is bound to exactly `scope`.
    #[must_use]
    pub fn matches(&self, scope: &RequestScope) -> bool {
        self.scope.as_ref() == Some(scope)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value", &redact(&self.value))
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Single-slot token cache.
///
/// The slot holds the most recently issued token. It is reused only for the
/// same method and path while fresh; any other request replaces it. Issuance
/// runs under the lock, so at most one token is minted at a time.
pub struct TokenCache {
    slot: Mutex<Option<Token>>,
    margin: i64,
}

impl TokenCache {
    /// Create an empty cache with the default safety margin.
    #[must_use]
    pub fn new() -> Self {
        Self::with_margin(SAFETY_MARGIN_SECS)
    }

    /// Create an empty cache with a custom safety margin in seconds.
    #[must_use]
    pub fn with_margin(margin: i64) -> Self {
        Self {
            slot: Mutex::new(None),
            margin,
        }
    }

    /// Return the cached token for `scope` if still fresh at `now`, otherwise
    /// run `issue` and cache its result.
    ///
    /// A failed issuance leaves the slot untouched.
    ///
    /// # Errors
    ///
    /// Propagates the error returned by `issue`.
    pub fn get_or_issue<F>(&self, scope: &RequestScope, now: i64, issue: F) -> AuthResult<Token>
    where
        F: FnOnce() -> AuthResult<Token>,
    {
        let mut slot = self.slot.lock();
        if let Some(token) = slot
            .as_ref()
            .filter(|token| token.matches(scope) && token.is_fresh_at(now, self.margin))
        {
            trace!(%scope, expires_at = token.expires_at, "reusing cached token");
            return Ok(token.clone());
        }

        let token = issue()?;
        *slot = Some(token.clone());
        Ok(token)
    }

    /// The currently cached token, if any.
    #[must_use]
    pub fn current(&self) -> Option<Token> {
        self.slot.lock().clone()
    }

    /// Drop the cached token.
    pub fn clear(&self) {
        self.slot.lock().take();
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCache")
            .field("occupied", &self.slot.lock().is_some())
            .field("margin", &self.margin)
            .finish()
    }
}

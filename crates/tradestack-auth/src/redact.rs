//! Secret holders and redaction helpers.
//!
//! Anything that may end up in a log line or error message goes through
//! [`redact`], which keeps at most [`REDACTED_PREFIX_LEN`] leading characters
//! plus a length count.

use std::fmt;

use zeroize::Zeroizing;

/// Number of leading characters kept by [`redact`].
pub const REDACTED_PREFIX_LEN: usize = 4;

/// Values shorter than this are redacted to their length only.
const MIN_LEN_FOR_PREFIX: usize = 12;

/// Redact a sensitive value to a fixed-length prefix and its length.
///
/// # Examples
///
/// ```
/// use tradestack_auth::redact::redact;
///
/// assert_eq!(redact("organizations/abc/apiKeys/def"), "orga...(29 chars)");
/// assert_eq!(redact("abc123"), "...(6 chars)");
/// ```
#[must_use]
pub fn redact(value: &str) -> String {
    let len = value.chars().count();
    if len < MIN_LEN_FOR_PREFIX {
        return format!("...({len} chars)");
    }
    let prefix: String = value.chars().take(REDACTED_PREFIX_LEN).collect();
    format!("{prefix}...({len} chars)")
}

/// An opaque secret string, scrubbed from memory on drop.
///
/// `Debug` and `Display` never print the contents; use [`SecretMaterial::expose`]
/// at the single point where the raw value is needed.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct SecretMaterial(Zeroizing<String>);

impl SecretMaterial {
    /// Wrap a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    /// Borrow the raw secret.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Length of the secret in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the secret is empty or whitespace only.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for SecretMaterial {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for SecretMaterial {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for SecretMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretMaterial({} bytes)", self.len())
    }
}

impl fmt::Display for SecretMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[redacted {} bytes]", self.len())
    }
}

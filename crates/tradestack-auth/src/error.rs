//! Error types for exchange request authentication.
//!
//! All failures are represented by [`AuthError`]. No variant ever carries
//! secret material: key problems are described through [`KeyDiagnostics`],
//! which only records the shape of the input (length, markers, line count).

use std::fmt;

/// Redacted description of a private key that could not be parsed.
///
/// Built from the raw input, but only keeps counts and booleans so that it can
/// be logged and displayed safely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyDiagnostics {
    /// Number of characters in the raw input.
    pub char_count: usize,
    /// Number of lines after newline unescaping.
    pub line_count: usize,
    /// Whether a `-----BEGIN ... -----` marker was present.
    pub has_header: bool,
    /// Whether a `-----END ... -----` marker was present.
    pub has_footer: bool,
    /// Whether the input contained literal `\n` escape sequences.
    pub escaped_newlines: bool,
}

impl fmt::Display for KeyDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} chars, {} lines, header={}, footer={}, escaped_newlines={}",
            self.char_count, self.line_count, self.has_header, self.has_footer, self.escaped_newlines
        )
    }
}

/// Errors that can occur while loading credentials or authenticating a request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A required credential field is not configured.
    ///
    /// Recoverable by operator action only; retrying will not help.
    #[error("Missing credential: {field}")]
    MissingCredential {
        /// Human readable name of the missing field.
        field: &'static str,
    },

    /// The private key is present but could not be parsed, even after the
    /// escape, base64 and marker repairs.
    #[error("Malformed private key ({0})")]
    MalformedKey(KeyDiagnostics),

    /// The signer could not produce a signature (algorithm or curve mismatch,
    /// or an internal signer failure).
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// No credentials are configured; the request must not be sent.
    #[error("Authentication unavailable: no credentials configured")]
    Unavailable,

    /// The signing context is not a valid request description.
    #[error("Invalid signing context: {0}")]
    InvalidContext(String),
}

impl AuthError {
    /// Whether this error is the expected "no credentials" steady state.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable | Self::MissingCredential { .. })
    }

    /// Whether retrying the same operation could succeed.
    ///
    /// Signing is deterministic over its inputs, so this is always `false`.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        false
    }
}

/// Convenience result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

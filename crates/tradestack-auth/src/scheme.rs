//! Authentication scheme selection.

use std::fmt;

use tracing::debug;

use crate::credentials::Credential;
use crate::normalize::{looks_like_pem, normalize_key};

/// The signing scheme resolved for a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthScheme {
    /// Legacy symmetric HMAC-SHA256 signing.
    Hmac,
    /// ES256 bearer tokens.
    Jwt,
    /// No usable credentials; requests must not be sent.
    Unavailable,
}

impl AuthScheme {
    /// Lowercase name, suitable for logs and metrics labels.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hmac => "hmac",
            Self::Jwt => "jwt",
            Self::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide which scheme a credential uses.
///
/// A blank secret is [`AuthScheme::Unavailable`]. A secret that carries a PEM
/// header or footer, or that the key normalizer accepts in any of its recovered forms
/// (escaped, base64, markers stripped), selects [`AuthScheme::Jwt`]. Anything
/// else is a symmetric secret.
///
/// The decision depends only on the credential, so it is stable for the life
/// of a [`RequestAuthority`](crate::authority::RequestAuthority).
#[must_use]
pub fn select(cred: &Credential) -> AuthScheme {
    if !cred.is_present() {
        return AuthScheme::Unavailable;
    }
    let secret = cred.secret().expose();
    let scheme = if looks_like_pem(secret) || normalize_key(secret).is_ok() {
        AuthScheme::Jwt
    } else {
        AuthScheme::Hmac
    };
    debug!(%scheme, fingerprint = %cred.fingerprint(), "selected auth scheme");
    scheme
}

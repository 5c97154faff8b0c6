//! The request authority: the single entry point used by API clients.
//!
//! A [`RequestAuthority`] owns one credential, the scheme selected for it, the
//! normalized private key (JWT scheme only) and the token cache. It is
//! `Send + Sync`; share it behind an `Arc` between every task that talks to the
//! exchange.
//!
//! ```
//! use tradestack_auth::authority::RequestAuthority;
//! use tradestack_auth::config::SignerOptions;
//! use tradestack_auth::context::SigningContext;
//! use tradestack_auth::credentials::Credential;
//! use tradestack_auth::scheme::AuthScheme;
//!
//! let authority =
//!     RequestAuthority::new(Credential::new("key1", "abc123"), &SignerOptions::default())?;
//! assert_eq!(authority.scheme(), AuthScheme::Hmac);
//!
//! let ctx = SigningContext::at("GET", "/v2/accounts", "", 1_700_000_000);
//! let headers = authority.authorize(&ctx)?;
//! assert_eq!(headers.get("access-timestamp").unwrap(), "1700000000");
//! # Ok::<(), tradestack_auth::error::AuthError>(())
//! ```

use std::fmt;

use http::header::AUTHORIZATION;
use http::{HeaderMap, HeaderValue};
use tracing::{info, warn};

use crate::config::{AuthConfig, SignerOptions};
use crate::context::SigningContext;
use crate::credentials::{Credential, CredentialSource, load};
use crate::error::{AuthError, AuthResult};
use crate::jwt::JwtSigner;
use crate::legacy::HmacSigner;
use crate::normalize::{NormalizedKey, normalize_key};
use crate::scheme::{AuthScheme, select};
use crate::token::{RequestScope, Token, TokenCache};

/// Signer state for the resolved scheme.
enum ActiveSigner {
    Hmac {
        credential: Credential,
        signer: HmacSigner,
        header_prefix: String,
    },
    Jwt {
        credential: Credential,
        signer: JwtSigner,
        key: NormalizedKey,
        cache: TokenCache,
    },
    Unavailable,
}

/// Produces authentication headers for outbound exchange requests.
pub struct RequestAuthority {
    scheme: AuthScheme,
    signer: ActiveSigner,
}

impl RequestAuthority {
    /// Build an authority for a credential.
    ///
    /// For the JWT scheme the private key is normalized here, once.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingCredential`] if the credential has a secret
    /// but no key id, and [`AuthError::MalformedKey`] if it carries a PEM key
    /// that cannot be parsed.
    pub fn new(credential: Credential, options: &SignerOptions) -> AuthResult<Self> {
        let scheme = select(&credential);
        if scheme != AuthScheme::Unavailable && credential.key_id().trim().is_empty() {
            return Err(AuthError::MissingCredential { field: "api key id" });
        }
        let signer = match scheme {
            AuthScheme::Unavailable => ActiveSigner::Unavailable,
            AuthScheme::Hmac => ActiveSigner::Hmac {
                credential,
                signer: HmacSigner::new(),
                header_prefix: options.hmac_header_prefix.clone(),
            },
            AuthScheme::Jwt => {
                let key = normalize_key(credential.secret().expose())?;
                if !key.algorithm().supports_es256() {
                    warn!(
                        algorithm = %key.algorithm(),
                        "private key is not EC P-256; token issuance will fail"
                    );
                }
                ActiveSigner::Jwt {
                    credential,
                    signer: JwtSigner::new(options),
                    key,
                    cache: TokenCache::new(),
                }
            }
        };

        let authority = Self { scheme, signer };
        let fingerprint = authority
            .credential()
            .map(Credential::fingerprint)
            .unwrap_or_default();
        info!(%scheme, %fingerprint, "request authority ready");
        Ok(authority)
    }

    /// An authority with no credentials. Every `authorize` call fails with
    /// [`AuthError::Unavailable`].
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            scheme: AuthScheme::Unavailable,
            signer: ActiveSigner::Unavailable,
        }
    }

    /// Build an authority from any credential source.
    ///
    /// # Errors
    ///
    /// Propagates [`AuthError::MissingCredential`] from the source and
    /// [`AuthError::MalformedKey`] from key normalization.
    pub fn from_source<S>(source: &S, options: &SignerOptions) -> AuthResult<Self>
    where
        S: CredentialSource + ?Sized,
    {
        Self::new(source.load_credential()?, options)
    }

    /// Build an authority from configuration.
    ///
    /// Missing credentials are not an error here: the authority resolves to
    /// [`AuthScheme::Unavailable`] and a warning is logged.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MalformedKey`] if a configured PEM key cannot be
    /// parsed.
    pub fn from_config(config: &AuthConfig) -> AuthResult<Self> {
        match load(config) {
            Ok(credential) => Self::new(credential, &config.signer_options()),
            Err(AuthError::MissingCredential { field }) => {
                warn!(field, "exchange credentials not configured; authentication unavailable");
                Ok(Self::unavailable())
            }
            Err(e) => Err(e),
        }
    }

    /// Build an authority from the process environment.
    ///
    /// # Errors
    ///
    /// See [`RequestAuthority::from_config`].
    pub fn from_env() -> AuthResult<Self> {
        Self::from_config(&AuthConfig::from_env())
    }

    /// The scheme in use.
    #[must_use]
    pub fn scheme(&self) -> AuthScheme {
        self.scheme
    }

    /// Whether requests can be authorized. `false` means the caller must not
    /// send authenticated requests at all.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.scheme != AuthScheme::Unavailable
    }

    /// The credential in use, if any.
    #[must_use]
    pub fn credential(&self) -> Option<&Credential> {
        match &self.signer {
            ActiveSigner::Hmac { credential, .. } | ActiveSigner::Jwt { credential, .. } => {
                Some(credential)
            }
            ActiveSigner::Unavailable => None,
        }
    }

    /// The token currently held by the cache (JWT scheme only).
    #[must_use]
    pub fn cached_token(&self) -> Option<Token> {
        match &self.signer {
            ActiveSigner::Jwt { cache, .. } => cache.current(),
            ActiveSigner::Hmac { .. } | ActiveSigner::Unavailable => None,
        }
    }

    /// Produce the authentication headers for one request.
    ///
    /// Under the JWT scheme a cached token is reused for the same method and
    /// path until ten seconds before it expires; the context timestamp is the
    /// clock used for that decision and for `iat`.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Unavailable`] when no credentials are configured; nothing
    ///   is signed.
    /// - [`AuthError::InvalidContext`] for an invalid method or path.
    /// - [`AuthError::SigningFailed`] when the key cannot sign ES256.
    pub fn authorize(&self, ctx: &SigningContext) -> AuthResult<AuthHeaders> {
        match &self.signer {
            ActiveSigner::Unavailable => Err(AuthError::Unavailable),
            ActiveSigner::Hmac {
                credential,
                signer,
                header_prefix,
            } => {
                let headers = signer.sign(ctx, credential)?.to_header_map(header_prefix)?;
                Ok(AuthHeaders {
                    scheme: AuthScheme::Hmac,
                    headers,
                    token: None,
                })
            }
            ActiveSigner::Jwt {
                credential,
                signer,
                key,
                cache,
            } => {
                ctx.validate()?;
                let scope = RequestScope::new(ctx.method(), ctx.path());
                let now = ctx.timestamp();
                let token = cache.get_or_issue(&scope, now, || {
                    signer.issue(credential, key, now, Some(&scope))
                })?;
                AuthHeaders::bearer(token)
            }
        }
    }
}

impl fmt::Debug for RequestAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("RequestAuthority");
        s.field("scheme", &self.scheme);
        match &self.signer {
            ActiveSigner::Hmac {
                credential,
                header_prefix,
                ..
            } => {
                s.field("credential", credential);
                s.field("header_prefix", header_prefix);
            }
            ActiveSigner::Jwt {
                credential,
                key,
                cache,
                ..
            } => {
                s.field("credential", credential);
                s.field("key", key);
                s.field("cache", cache);
            }
            ActiveSigner::Unavailable => {}
        }
        s.finish()
    }
}

/// Authentication headers for one request.
#[derive(Clone)]
pub struct AuthHeaders {
    scheme: AuthScheme,
    headers: HeaderMap,
    token: Option<Token>,
}

impl AuthHeaders {
    fn bearer(token: Token) -> AuthResult<Self> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.value()))
            .map_err(|_| AuthError::SigningFailed("token is not a valid header value".to_owned()))?;
        value.set_sensitive(true);

        let mut headers = HeaderMap::with_capacity(1);
        headers.insert(AUTHORIZATION, value);
        Ok(Self {
            scheme: AuthScheme::Jwt,
            headers,
            token: Some(token),
        })
    }

    /// Scheme that produced these headers.
    #[must_use]
    pub fn scheme(&self) -> AuthScheme {
        self.scheme
    }

    /// The headers to attach.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Look up a single header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    /// The bearer token (JWT scheme only).
    #[must_use]
    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    /// The raw bearer token string (JWT scheme only). Treat as a secret.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.token.as_ref().map(Token::value)
    }

    /// Insert every header into `target`, replacing existing values.
    pub fn apply_to(&self, target: &mut HeaderMap) {
        for (name, value) in &self.headers {
            target.insert(name.clone(), value.clone());
        }
    }

    /// Consume into the underlying header map.
    #[must_use]
    pub fn into_header_map(self) -> HeaderMap {
        self.headers
    }
}

impl fmt::Debug for AuthHeaders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthHeaders")
            .field("scheme", &self.scheme)
            .field("names", &self.headers.keys().collect::<Vec<_>>())
            .field("token", &self.token)
            .finish()
    }
}

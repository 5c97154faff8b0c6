//! Exchange API credential handling and request signing for TradeStack.
//!
//! This crate turns a configured exchange credential into the authentication
//! headers of outbound REST requests. Two schemes are supported:
//!
//! - **HMAC**: the legacy symmetric scheme. A hex HMAC-SHA256 over
//!   `timestamp || METHOD || path || body` is sent in `access-*` headers.
//! - **JWT**: short-lived ES256 bearer tokens signed with an EC P-256 key and
//!   bound to one method and path.
//!
//! Which scheme is used depends on the shape of the configured secret. With no
//! credentials the subsystem is *unavailable*: callers must not send
//! authenticated requests at all.
//!
//! # Usage
//!
//! ```rust
//! use tradestack_auth::{AuthConfig, RequestAuthority, SigningContext};
//!
//! let config = AuthConfig::builder()
//!     .api_key_id("key1")
//!     .api_secret("abc123")
//!     .build();
//! let authority = RequestAuthority::from_config(&config)?;
//!
//! let ctx = SigningContext::new("GET", "/v2/accounts", "");
//! let mut headers = http::HeaderMap::new();
//! authority.authorize(&ctx)?.apply_to(&mut headers);
//! assert!(headers.contains_key("access-signature"));
//! # Ok::<(), tradestack_auth::AuthError>(())
//! ```
//!
//! # Modules
//!
//! - [`authority`] - Request authority: scheme dispatch and token caching
//! - [`config`] - Environment-driven configuration
//! - [`context`] - Per-request signing context
//! - [`credentials`] - Credential type and loading
//! - [`error`] - Authentication error types
//! - [`jwt`] - ES256 token issuance
//! - [`legacy`] - HMAC-SHA256 request signing
//! - [`normalize`] - Private key normalization
//! - [`redact`] - Secret holders and redaction helpers
//! - [`scheme`] - Scheme selection
//! - [`token`] - Tokens and the token cache

pub mod authority;
pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod jwt;
pub mod legacy;
pub mod normalize;
pub mod redact;
pub mod scheme;
pub mod token;

pub use authority::{AuthHeaders, RequestAuthority};
pub use config::{AuthConfig, SignerOptions};
pub use context::SigningContext;
pub use credentials::{Credential, CredentialSource};
pub use error::{AuthError, AuthResult};
pub use normalize::{KeyAlgorithm, NormalizedKey, normalize_key};
pub use scheme::AuthScheme;
pub use token::Token;

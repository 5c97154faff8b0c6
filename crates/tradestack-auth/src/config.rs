//! Authentication configuration.
//!
//! All configuration is driven by environment variables. Every field accepts a
//! list of aliases so that both the generic `EXCHANGE_*` names and the names
//! used by exchange tooling (`COINBASE_*`, `CDP_*`) work; the first non-empty
//! value wins.

use typed_builder::TypedBuilder;

use crate::redact::SecretMaterial;

/// Variables holding the API key id.
pub const API_KEY_VARS: &[&str] = &[
    "EXCHANGE_API_KEY",
    "COINBASE_API_KEY",
    "COINBASE_API_KEY_NAME",
    "CDP_API_KEY_ID",
    "CDP_API_KEY_NAME",
];

/// Variables holding the symmetric secret or PEM private key.
pub const API_SECRET_VARS: &[&str] = &[
    "EXCHANGE_API_SECRET",
    "COINBASE_API_SECRET",
    "COINBASE_PRIVATE_KEY",
    "CDP_API_KEY_SECRET",
    "CDP_PRIVATE_KEY",
];

/// Variables holding the legacy passphrase.
pub const PASSPHRASE_VARS: &[&str] = &["EXCHANGE_API_PASSPHRASE", "COINBASE_API_PASSPHRASE"];

/// Variables holding the organization id.
pub const ORGANIZATION_VARS: &[&str] = &[
    "EXCHANGE_ORGANIZATION_ID",
    "COINBASE_ORGANIZATION_ID",
    "CDP_ORGANIZATION_ID",
];

/// Variables holding an explicit JWT `kid` override.
pub const KID_VARS: &[&str] = &["EXCHANGE_API_KID", "CDP_API_KID"];

/// Variable holding the JWT issuer.
pub const JWT_ISSUER_VAR: &str = "EXCHANGE_JWT_ISSUER";

/// Variable holding the API host used for the JWT `uri` claim.
pub const API_HOST_VAR: &str = "EXCHANGE_API_HOST";

/// Variable holding the HMAC header prefix.
pub const HMAC_HEADER_PREFIX_VAR: &str = "EXCHANGE_HMAC_HEADER_PREFIX";

/// Default JWT issuer.
pub const DEFAULT_JWT_ISSUER: &str = "cdp";

/// Exchange authentication configuration.
///
/// Secret fields are wrapped in [`SecretMaterial`], so the derived `Debug`
/// never prints them.
///
/// # Examples
///
/// ```
/// use tradestack_auth::config::AuthConfig;
///
/// let config = AuthConfig::builder()
///     .api_key_id("key1")
///     .api_secret("abc123")
///     .build();
/// assert_eq!(config.api_key_id.as_deref(), Some("key1"));
/// assert_eq!(config.jwt_issuer, "cdp");
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct AuthConfig {
    /// API key id (short id or `organizations/{org}/apiKeys/{id}`).
    #[builder(default, setter(strip_option, into))]
    pub api_key_id: Option<String>,

    /// Symmetric secret (legacy scheme) or PEM private key (JWT scheme).
    #[builder(default, setter(transform = |value: &str| Some(SecretMaterial::new(value))))]
    pub api_secret: Option<SecretMaterial>,

    /// Passphrase for the legacy three-header scheme.
    #[builder(default, setter(transform = |value: &str| Some(SecretMaterial::new(value))))]
    pub passphrase: Option<SecretMaterial>,

    /// Organization id, used for organization-qualified JWT subjects.
    #[builder(default, setter(strip_option, into))]
    pub organization_id: Option<String>,

    /// Explicit JWT header `kid`, when it differs from the key id.
    #[builder(default, setter(strip_option, into))]
    pub key_id_header: Option<String>,

    /// JWT `iss` claim.
    #[builder(default = DEFAULT_JWT_ISSUER.to_owned(), setter(into))]
    pub jwt_issuer: String,

    /// API host (e.g. `api.coinbase.com`) for the JWT `uri` claim.
    #[builder(default, setter(strip_option, into))]
    pub api_host: Option<String>,

    /// Prefix prepended to the HMAC header names (e.g. `cb-`).
    #[builder(default, setter(into))]
    pub hmac_header_prefix: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl AuthConfig {
    /// Load configuration from the process environment.
    ///
    /// | Field | Variables |
    /// |-------|-----------|
    /// | key id | [`API_KEY_VARS`] |
    /// | secret | [`API_SECRET_VARS`] |
    /// | passphrase | [`PASSPHRASE_VARS`] |
    /// | organization id | [`ORGANIZATION_VARS`] |
    /// | kid override | [`KID_VARS`] |
    /// | JWT issuer | `EXCHANGE_JWT_ISSUER` (default `cdp`) |
    /// | API host | `EXCHANGE_API_HOST` |
    /// | HMAC header prefix | `EXCHANGE_HMAC_HEADER_PREFIX` |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Values are trimmed; empty values are treated as unset. Secrets are not
    /// trimmed beyond surrounding whitespace so that PEM bodies stay intact.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            api_key_id: first_of(&lookup, API_KEY_VARS),
            api_secret: first_of(&lookup, API_SECRET_VARS).map(SecretMaterial::new),
            passphrase: first_of(&lookup, PASSPHRASE_VARS).map(SecretMaterial::new),
            organization_id: first_of(&lookup, ORGANIZATION_VARS),
            key_id_header: first_of(&lookup, KID_VARS),
            jwt_issuer: first_of(&lookup, &[JWT_ISSUER_VAR])
                .unwrap_or_else(|| DEFAULT_JWT_ISSUER.to_owned()),
            api_host: first_of(&lookup, &[API_HOST_VAR]),
            hmac_header_prefix: first_of(&lookup, &[HMAC_HEADER_PREFIX_VAR])
                .unwrap_or_default(),
        }
    }

    /// Signer options derived from this configuration.
    #[must_use]
    pub fn signer_options(&self) -> SignerOptions {
        SignerOptions {
            jwt_issuer: self.jwt_issuer.clone(),
            api_host: self.api_host.clone(),
            hmac_header_prefix: self.hmac_header_prefix.to_ascii_lowercase(),
        }
    }
}

/// First non-empty, trimmed value among `names`.
fn first_of<F>(lookup: &F, names: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    names
        .iter()
        .filter_map(|&name| lookup(name))
        .map(|value| value.trim().to_owned())
        .find(|value| !value.is_empty())
}

/// Non-secret options shared by the signers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerOptions {
    /// JWT `iss` claim.
    pub jwt_issuer: String,
    /// API host for the JWT `uri` claim, if any.
    pub api_host: Option<String>,
    /// Lowercase prefix for HMAC header names.
    pub hmac_header_prefix: String,
}

impl Default for SignerOptions {
    fn default() -> Self {
        Self {
            jwt_issuer: DEFAULT_JWT_ISSUER.to_owned(),
            api_host: None,
            hmac_header_prefix: String::new(),
        }
    }
}

//! Credential loading.
//!
//! A [`Credential`] is one configured exchange identity. It is immutable once
//! built; rotating keys means building a new credential (and a new
//! [`RequestAuthority`](crate::authority::RequestAuthority)).
//!
//! [`load`] validates that the fields needed by either scheme are present. It
//! looks at the shape of the secret only to log which path will be taken; the
//! scheme itself is decided by [`select`](crate::scheme::select).

use std::fmt;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::normalize::looks_like_pem;
use crate::redact::{SecretMaterial, redact};

/// Prefix of an organization-qualified API key path.
const ORGANIZATIONS_PREFIX: &str = "organizations/";

/// One configured exchange identity.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    key_id: String,
    secret: SecretMaterial,
    organization_id: Option<String>,
    passphrase: Option<SecretMaterial>,
    key_id_header: Option<String>,
}

impl Credential {
    /// Create a credential from a key id and secret material.
    #[must_use]
    pub fn new(key_id: impl Into<String>, secret: impl Into<SecretMaterial>) -> Self {
        Self {
            key_id: key_id.into(),
            secret: secret.into(),
            organization_id: None,
            passphrase: None,
            key_id_header: None,
        }
    }

    /// Set the organization id (opts into the qualified JWT subject).
    #[must_use]
    pub fn with_organization_id(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    /// Set the legacy passphrase.
    #[must_use]
    pub fn with_passphrase(mut self, passphrase: impl Into<SecretMaterial>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    /// Override the JWT header `kid`.
    #[must_use]
    pub fn with_key_id_header(mut self, kid: impl Into<String>) -> Self {
        self.key_id_header = Some(kid.into());
        self
    }

    /// The API key id as configured.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// The secret material (symmetric secret or PEM private key).
    #[must_use]
    pub fn secret(&self) -> &SecretMaterial {
        &self.secret
    }

    /// The organization id, if configured.
    #[must_use]
    pub fn organization_id(&self) -> Option<&str> {
        self.organization_id.as_deref()
    }

    /// The legacy passphrase, if configured.
    #[must_use]
    pub fn passphrase(&self) -> Option<&SecretMaterial> {
        self.passphrase.as_ref()
    }

    /// Whether the credential carries usable secret material.
    #[must_use]
    pub fn is_present(&self) -> bool {
        !self.secret.is_empty()
    }

    /// JWT `sub` claim.
    ///
    /// With an organization id this is `organizations/{org}/apiKeys/{keyId}`,
    /// unless the key id is already qualified; otherwise the key id itself.
    #[must_use]
    pub fn subject(&self) -> String {
        match &self.organization_id {
            Some(org) if !self.key_id.starts_with(ORGANIZATIONS_PREFIX) => {
                format!("{ORGANIZATIONS_PREFIX}{org}/apiKeys/{}", self.key_id)
            }
            _ => self.key_id.clone(),
        }
    }

    /// JWT header `kid`: the explicit override, or the key id.
    #[must_use]
    pub fn kid(&self) -> &str {
        self.key_id_header.as_deref().unwrap_or(&self.key_id)
    }

    /// Short, log-safe identifier derived from the key id.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.key_id.as_bytes());
        hex::encode(&digest[..6])
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("key_id", &redact(&self.key_id))
            .field("secret", &self.secret)
            .field("organization_id", &self.organization_id.as_deref().map(redact))
            .field("passphrase", &self.passphrase)
            .field("key_id_header", &self.key_id_header.as_deref().map(redact))
            .finish()
    }
}

/// Source of a [`Credential`].
///
/// Implementations may back this with configuration, a secrets manager, or
/// any other store.
pub trait CredentialSource: Send + Sync {
    /// Produce the configured credential.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingCredential`] if a required field is absent.
    fn load_credential(&self) -> AuthResult<Credential>;
}

impl CredentialSource for AuthConfig {
    fn load_credential(&self) -> AuthResult<Credential> {
        load(self)
    }
}

impl CredentialSource for Credential {
    fn load_credential(&self) -> AuthResult<Credential> {
        if self.key_id.trim().is_empty() {
            return Err(AuthError::MissingCredential { field: "api key id" });
        }
        if !self.is_present() {
            return Err(AuthError::MissingCredential { field: "api secret" });
        }
        Ok(self.clone())
    }
}

/// Build a [`Credential`] from configuration.
///
/// # Errors
///
/// Returns [`AuthError::MissingCredential`] when the key id or the secret is
/// not configured.
pub fn load(config: &AuthConfig) -> AuthResult<Credential> {
    let key_id = config
        .api_key_id
        .clone()
        .filter(|id| !id.trim().is_empty())
        .ok_or(AuthError::MissingCredential { field: "api key id" })?;
    let secret = config
        .api_secret
        .clone()
        .filter(|secret| !secret.is_empty())
        .ok_or(AuthError::MissingCredential { field: "api secret" })?;

    let pem_shaped = looks_like_pem(secret.expose());
    debug!(
        key_id = %redact(&key_id),
        secret_len = secret.len(),
        pem_shaped,
        has_passphrase = config.passphrase.is_some(),
        has_organization = config.organization_id.is_some(),
        "loaded exchange credential"
    );

    if pem_shaped && config.passphrase.is_some() {
        warn!("passphrase is configured but only used by the HMAC scheme");
    }
    if !pem_shaped && config.organization_id.is_some() {
        warn!("organization id is configured but only used by the JWT scheme");
    }

    let mut credential = Credential::new(key_id, secret);
    if let Some(org) = &config.organization_id {
        credential = credential.with_organization_id(org.clone());
    }
    if let Some(passphrase) = &config.passphrase {
        credential = credential.with_passphrase(passphrase.clone());
    }
    if let Some(kid) = &config.key_id_header {
        credential = credential.with_key_id_header(kid.clone());
    }
    Ok(credential)
}

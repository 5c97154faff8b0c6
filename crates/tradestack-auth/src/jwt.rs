//! ES256 bearer token issuance.
//!
//! Tokens are compact JWS strings signed with ECDSA P-256 / SHA-256. Each token
//! lives for [`TOKEN_TTL_SECS`] and, when issued for a request, is bound to that
//! request's method and path through the `method`, `request_path` and (with an
//! API host configured) `uri` claims.
//!
//! The header carries a random `nonce` in addition to `alg`, `typ` and `kid`,
//! so the token is assembled by hand and only the signature is delegated to
//! [`jsonwebtoken::crypto::sign`].

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, EncodingKey};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::config::SignerOptions;
use crate::credentials::Credential;
use crate::error::{AuthError, AuthResult};
use crate::normalize::NormalizedKey;
use crate::redact::redact;
use crate::token::{RequestScope, Token};

/// Lifetime of an issued token, in seconds.
pub const TOKEN_TTL_SECS: i64 = 120;

/// JOSE header of an issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtHeader {
    /// Always `ES256`.
    pub alg: String,
    /// Always `JWT`.
    pub typ: String,
    /// Key id the verifier uses to select the public key.
    pub kid: String,
    /// Random hex nonce, unique per token.
    pub nonce: String,
}

/// Claim set of an issued token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the key id, or its organization-qualified form.
    pub sub: String,
    /// Issuer.
    pub iss: String,
    /// Issued at (Unix seconds).
    pub iat: i64,
    /// Not before; equal to `iat`.
    pub nbf: i64,
    /// Expiry; `iat + 120`.
    pub exp: i64,
    /// `"{METHOD} {host}{path}"`, when an API host is configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Upper-case method the token is bound to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Path the token is bound to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_path: Option<String>,
}

/// Issues ES256 tokens.
#[derive(Debug, Clone)]
pub struct JwtSigner {
    issuer: String,
    api_host: Option<String>,
}

impl JwtSigner {
    /// Create a signer from the shared signer options.
    #[must_use]
    pub fn new(options: &SignerOptions) -> Self {
        Self {
            issuer: options.jwt_issuer.clone(),
            api_host: options
                .api_host
                .as_deref()
                .map(|host| host.trim_end_matches('/').to_owned())
                .filter(|host| !host.is_empty()),
        }
    }

    /// Build the claim set for a token issued at `now`.
    #[must_use]
    pub fn claims(&self, cred: &Credential, now: i64, scope: Option<&RequestScope>) -> Claims {
        Claims {
            sub: cred.subject(),
            iss: self.issuer.clone(),
            iat: now,
            nbf: now,
            exp: now + TOKEN_TTL_SECS,
            uri: scope.and_then(|scope| {
                self.api_host
                    .as_ref()
                    .map(|host| format!("{} {host}{}", scope.method(), scope.path()))
            }),
            method: scope.map(|scope| scope.method().to_owned()),
            request_path: scope.map(|scope| scope.path().to_owned()),
        }
    }

    /// Issue a token at `now`, optionally bound to a request scope.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::SigningFailed`] if `key` is not a P-256 key or the
    /// underlying signer rejects it.
    pub fn issue(
        &self,
        cred: &Credential,
        key: &NormalizedKey,
        now: i64,
        scope: Option<&RequestScope>,
    ) -> AuthResult<Token> {
        let der = key.p256_pkcs8_der().ok_or_else(|| {
            AuthError::SigningFailed(format!(
                "ES256 requires an EC P-256 key, found {}",
                key.algorithm()
            ))
        })?;

        let header = JwtHeader {
            alg: "ES256".to_owned(),
            typ: "JWT".to_owned(),
            kid: cred.kid().to_owned(),
            nonce: Uuid::new_v4().simple().to_string(),
        };
        let claims = self.claims(cred, now, scope);

        let signing_input = format!("{}.{}", encode_segment(&header)?, encode_segment(&claims)?);
        let encoding_key = EncodingKey::from_ec_der(der);
        let signature =
            jsonwebtoken::crypto::sign(signing_input.as_bytes(), &encoding_key, Algorithm::ES256)
                .map_err(|e| AuthError::SigningFailed(format!("ES256 signer error: {e}")))?;
        let value = format!("{signing_input}.{signature}");

        debug!(
            kid = %redact(&header.kid),
            method = scope.map(RequestScope::method),
            request_path = scope.map(RequestScope::path),
            iat = claims.iat,
            exp = claims.exp,
            token_len = value.len(),
            "issued ES256 token"
        );

        Ok(Token::new(value, claims.iat, claims.exp, scope.cloned()))
    }
}

fn encode_segment<T: Serialize>(value: &T) -> AuthResult<String> {
    let json = serde_json::to_vec(value)
        .map_err(|e| AuthError::SigningFailed(format!("cannot serialize token segment: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

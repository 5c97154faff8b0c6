//! Private key normalization.
//!
//! Operators paste private keys into environment variables in many shapes:
//! with literal `\n` escapes, wrapped in quotes, with newlines collapsed to
//! spaces, base64 encoded as a whole, or with the PEM markers stripped. This
//! module turns any of those into a [`NormalizedKey`] held in memory only.
//!
//! The pipeline is:
//!
//! 1. Trim, strip surrounding quotes, convert escaped and CRLF line breaks.
//! 2. Extract the PEM block (label and body), re-flow the body and decode it.
//! 3. If no block is found, base64-decode the whole value once and retry with
//!    the decoded text if it is a PEM document.
//! 4. If the value has no markers at all, wrap it in `EC PRIVATE KEY` markers
//!    and parse once more. A failure here is terminal.
//!
//! Nothing in this module logs or returns key bytes; failures are reported
//! through [`KeyDiagnostics`].

use std::borrow::Cow;
use std::fmt;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use p256::SecretKey;
use p256::pkcs8::{DecodePrivateKey, EncodePrivateKey, ObjectIdentifier, PrivateKeyInfo};
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::{AuthError, AuthResult, KeyDiagnostics};

/// Marker prefix of a PEM header line.
pub const PEM_BEGIN: &str = "-----BEGIN";
/// Marker prefix of a PEM footer line.
pub const PEM_END: &str = "-----END";

const PEM_DASHES: &str = "-----";

/// Label used when repairing a key whose markers were stripped.
const REPAIR_LABEL: &str = "EC PRIVATE KEY";

/// Every accepted PEM label ends with this.
const PRIVATE_KEY_SUFFIX: &str = "PRIVATE KEY";

const OID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const OID_PRIME256V1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const OID_RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const OID_ED25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");

/// Base64 engine that accepts bodies with or without padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Algorithm family of a parsed private key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyAlgorithm {
    /// Elliptic curve key on NIST P-256; usable for ES256.
    EcP256,
    /// Elliptic curve key on another named curve (dotted OID).
    Ec {
        /// Named curve OID, or `"unknown"` when the key omits it.
        curve: String,
    },
    /// RSA private key.
    Rsa,
    /// Ed25519 private key.
    Ed25519,
    /// Any other key type, identified by OID or PEM label.
    Other(String),
}

impl KeyAlgorithm {
    /// Whether keys of this algorithm can sign ES256 tokens.
    #[must_use]
    pub fn supports_es256(&self) -> bool {
        matches!(self, Self::EcP256)
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EcP256 => f.write_str("EC P-256"),
            Self::Ec { curve } => write!(f, "EC ({curve})"),
            Self::Rsa => f.write_str("RSA"),
            Self::Ed25519 => f.write_str("Ed25519"),
            Self::Other(name) => write!(f, "other ({name})"),
        }
    }
}

/// Which normalization path produced a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// The value was PEM text (possibly escaped or re-flowed).
    Pem,
    /// The value was base64 of a PEM document.
    Base64Pem,
    /// The value had no markers and was wrapped before parsing.
    RepairedMarkers,
}

/// A parsed private key, held in zeroizing memory.
///
/// For P-256 keys the DER is the canonical PKCS#8 encoding, so two inputs
/// describing the same key compare equal regardless of their original
/// container (SEC1 or PKCS#8) or formatting.
#[derive(Clone)]
pub struct NormalizedKey {
    algorithm: KeyAlgorithm,
    der: Zeroizing<Vec<u8>>,
    source: KeySource,
}

impl NormalizedKey {
    /// The key algorithm.
    #[must_use]
    pub fn algorithm(&self) -> &KeyAlgorithm {
        &self.algorithm
    }

    /// How the key was recovered from its raw form.
    #[must_use]
    pub fn source(&self) -> KeySource {
        self.source
    }

    /// PKCS#8 DER of a P-256 key, or `None` for any other algorithm.
    #[must_use]
    pub fn p256_pkcs8_der(&self) -> Option<&[u8]> {
        self.algorithm.supports_es256().then_some(self.der.as_slice())
    }
}

impl PartialEq for NormalizedKey {
    fn eq(&self, other: &Self) -> bool {
        self.algorithm == other.algorithm && self.der.as_slice() == other.der.as_slice()
    }
}

impl Eq for NormalizedKey {}

impl fmt::Debug for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NormalizedKey")
            .field("algorithm", &self.algorithm)
            .field("der_len", &self.der.len())
            .field("source", &self.source)
            .finish()
    }
}

/// Heuristic check for PEM structure markers.
///
/// Only used to pick a path; it says nothing about whether the key parses.
#[must_use]
pub fn looks_like_pem(raw: &str) -> bool {
    raw.contains(PEM_BEGIN) || raw.contains(PEM_END)
}

/// Normalize raw private key text into a [`NormalizedKey`].
///
/// # Errors
///
/// Returns [`AuthError::MalformedKey`] with redacted diagnostics when the
/// value cannot be parsed through any of the supported paths.
pub fn normalize_key(raw: &str) -> AuthResult<NormalizedKey> {
    let cleaned = clean(raw);

    if let Some(block) = PemBlock::extract(&cleaned) {
        if let Some(key) = block.parse(KeySource::Pem) {
            return Ok(key);
        }
    }

    if let Some(decoded) = decode_base64_pem(&cleaned) {
        if let Some(key) = PemBlock::extract(&decoded).and_then(|b| b.parse(KeySource::Base64Pem)) {
            debug!("private key recovered from base64-encoded PEM");
            return Ok(key);
        }
    }

    let has_header = cleaned.contains(PEM_BEGIN);
    let has_footer = cleaned.contains(PEM_END);
    if !(has_header && has_footer) {
        let block = PemBlock::wrap(&cleaned);
        if let Some(key) = block.parse(KeySource::RepairedMarkers) {
            debug!("private key recovered by adding missing PEM markers");
            return Ok(key);
        }
    }

    let diagnostics = diagnose(raw, &cleaned);
    debug!(%diagnostics, "private key normalization failed");
    Err(AuthError::MalformedKey(diagnostics))
}

/// Trim, strip quotes and convert escaped or CRLF line breaks.
fn clean(raw: &str) -> Cow<'_, str> {
    let trimmed = strip_quotes(raw.trim());
    if !trimmed.contains('\\') && !trimmed.contains('\r') {
        return Cow::Borrowed(trimmed);
    }
    Cow::Owned(
        trimmed
            .replace("\\\\n", "\n")
            .replace("\\r\\n", "\n")
            .replace("\\n", "\n")
            .replace("\r\n", "\n")
            .replace('\r', "\n"),
    )
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].trim();
        }
    }
    value
}

/// Decode the whole value as base64 and return it if it is PEM text.
fn decode_base64_pem(cleaned: &str) -> Option<String> {
    if cleaned.contains(PEM_DASHES) {
        return None;
    }
    let compact: String = cleaned.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = Zeroizing::new(LENIENT_BASE64.decode(compact.as_bytes()).ok()?);
    let text = std::str::from_utf8(&bytes).ok()?;
    looks_like_pem(text).then(|| clean(text).into_owned())
}

fn diagnose(raw: &str, cleaned: &str) -> KeyDiagnostics {
    KeyDiagnostics {
        char_count: raw.chars().count(),
        line_count: cleaned.lines().filter(|l| !l.trim().is_empty()).count(),
        has_header: cleaned.contains(PEM_BEGIN),
        has_footer: cleaned.contains(PEM_END),
        escaped_newlines: raw.contains("\\n"),
    }
}

/// A PEM block reduced to its label and compact base64 body.
struct PemBlock {
    label: String,
    body: String,
    synthetic_label: bool,
}

impl PemBlock {
    /// Extract the first `BEGIN`/`END` block, tolerating any whitespace layout.
    fn extract(text: &str) -> Option<Self> {
        let begin = text.find(PEM_BEGIN)?;
        let after_begin = &text[begin + PEM_BEGIN.len()..];
        let label_end = after_begin.find(PEM_DASHES)?;
        let label = after_begin[..label_end].trim().to_owned();
        let rest = &after_begin[label_end + PEM_DASHES.len()..];
        let end = rest.find(PEM_END)?;
        let body = compact_body(&rest[..end]);

        Some(Self {
            label,
            body,
            synthetic_label: false,
        })
    }

    /// Build a block from a marker-less (or half-marked) body.
    fn wrap(text: &str) -> Self {
        Self {
            label: REPAIR_LABEL.to_owned(),
            body: compact_body(&strip_markers(text)),
            synthetic_label: true,
        }
    }

    fn parse(&self, source: KeySource) -> Option<NormalizedKey> {
        if self.body.is_empty() || self.body.len() % 4 == 1 {
            return None;
        }
        let der = Zeroizing::new(LENIENT_BASE64.decode(self.body.as_bytes()).ok()?);
        let algorithm_and_der = if self.synthetic_label {
            parse_sec1(&der).or_else(|| parse_pkcs8(&der))
        } else {
            match self.label.as_str() {
                "EC PRIVATE KEY" => parse_sec1(&der),
                "PRIVATE KEY" => parse_pkcs8(&der),
                "RSA PRIVATE KEY" => is_der_sequence(&der).then(|| (KeyAlgorithm::Rsa, der.clone())),
                other if other.ends_with(PRIVATE_KEY_SUFFIX) && is_der_sequence(&der) => Some((
                    KeyAlgorithm::Other(other.to_ascii_lowercase()),
                    der.clone(),
                )),
                _ => None,
            }
        };

        algorithm_and_der.map(|(algorithm, der)| NormalizedKey {
            algorithm,
            der,
            source,
        })
    }
}

/// Remove `-----...-----` marker segments, wherever they sit on a line.
fn strip_markers(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(PEM_DASHES) {
        out.push_str(&rest[..start]);
        let after = &rest[start + PEM_DASHES.len()..];
        rest = match after.find(PEM_DASHES) {
            Some(end) => &after[end + PEM_DASHES.len()..],
            None => after,
        };
    }
    out.push_str(rest);
    out
}

/// Remove all whitespace from a base64 body.
fn compact_body(body: &str) -> String {
    body.chars().filter(|c| !c.is_whitespace()).collect()
}

fn is_der_sequence(der: &[u8]) -> bool {
    der.len() > 2 && der[0] == 0x30
}

/// Parse a SEC1 `ECPrivateKey`, re-encoding P-256 keys as PKCS#8.
fn parse_sec1(der: &[u8]) -> Option<(KeyAlgorithm, Zeroizing<Vec<u8>>)> {
    if let Ok(secret) = SecretKey::from_sec1_der(der) {
        return p256_to_pkcs8(&secret).map(|der| (KeyAlgorithm::EcP256, der));
    }

    let parsed = sec1::EcPrivateKey::try_from(der).ok()?;
    let curve = parsed
        .parameters
        .and_then(|params| params.named_curve())
        .map_or_else(|| "unknown".to_owned(), |oid| oid.to_string());
    Some((KeyAlgorithm::Ec { curve }, Zeroizing::new(der.to_vec())))
}

/// Parse a PKCS#8 `PrivateKeyInfo` and classify it by algorithm OID.
fn parse_pkcs8(der: &[u8]) -> Option<(KeyAlgorithm, Zeroizing<Vec<u8>>)> {
    let info = PrivateKeyInfo::try_from(der).ok()?;
    let oid = info.algorithm.oid;

    if oid == OID_EC_PUBLIC_KEY {
        let curve = info.algorithm.parameters_oid().ok();
        if curve == Some(OID_PRIME256V1) {
            let secret = SecretKey::from_pkcs8_der(der).ok()?;
            return p256_to_pkcs8(&secret).map(|der| (KeyAlgorithm::EcP256, der));
        }
        let curve = curve.map_or_else(|| "unknown".to_owned(), |oid| oid.to_string());
        return Some((KeyAlgorithm::Ec { curve }, Zeroizing::new(der.to_vec())));
    }

    let algorithm = if oid == OID_RSA_ENCRYPTION {
        KeyAlgorithm::Rsa
    } else if oid == OID_ED25519 {
        KeyAlgorithm::Ed25519
    } else {
        KeyAlgorithm::Other(oid.to_string())
    };
    Some((algorithm, Zeroizing::new(der.to_vec())))
}

fn p256_to_pkcs8(secret: &SecretKey) -> Option<Zeroizing<Vec<u8>>> {
    let document = secret.to_pkcs8_der().ok()?;
    Some(Zeroizing::new(document.as_bytes().to_vec()))
}

//! Signed token encoding and decoding
//!
//! Tokens are JWT compact serializations signed with HMAC-SHA256. Each
//! signing domain owns its own secret; a token only decodes under the
//! domain that signed it.
//!
//! `decode` runs its checks in a fixed order so the reported error is
//! stable: structure, algorithm allow-list, signature, claims shape,
//! expiry, not-before.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use common::Secret;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Deserialize;

use crate::claims::Claims;
use crate::constants::SIGNING_ALGORITHM;
use crate::error::{Error, Result};

/// What a signing domain's tokens are for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    Access,
    Refresh,
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Purpose::Access => write!(f, "access"),
            Purpose::Refresh => write!(f, "refresh"),
        }
    }
}

/// A (secret, purpose) pair. Holds derived HMAC keys only.
pub struct SigningDomain {
    purpose: Purpose,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningDomain {
    pub fn new(purpose: Purpose, secret: &Secret<String>) -> Self {
        Self {
            purpose,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

impl fmt::Debug for SigningDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningDomain")
            .field("purpose", &self.purpose)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Sign `claims` under `domain`.
pub fn encode<C: Claims>(claims: &C, domain: &SigningDomain) -> Result<String> {
    jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &domain.encoding)
        .map_err(|e| Error::Signing(format!("{} token: {e}", domain.purpose)))
}

/// Verify `token` under `domain` and return its claims if accepted at `now`.
pub fn decode<C: Claims>(token: &str, domain: &SigningDomain, now: i64) -> Result<C> {
    let algorithm = declared_algorithm(token)?;
    if algorithm != SIGNING_ALGORITHM {
        return Err(Error::UnsupportedAlgorithm(algorithm));
    }

    let data = jsonwebtoken::decode::<C>(token, &domain.decoding, &validation())
        .map_err(classify)?;

    data.claims.validity().check(now)?;
    Ok(data.claims)
}

#[derive(Deserialize)]
struct RawHeader {
    alg: String,
}

/// Check that all three segments are base64url, then read the header's `alg`
/// field without trusting anything else.
fn declared_algorithm(token: &str) -> Result<String> {
    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(Error::MalformedToken);
    };
    if header.is_empty() || payload.is_empty() || signature.is_empty() {
        return Err(Error::MalformedToken);
    }

    for segment in [payload, signature] {
        URL_SAFE_NO_PAD
            .decode(segment)
            .map_err(|_| Error::MalformedToken)?;
    }
    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|_| Error::MalformedToken)?;
    let raw: RawHeader = serde_json::from_slice(&bytes).map_err(|_| Error::MalformedToken)?;
    Ok(raw.alg)
}

/// Signature and algorithm checks only; the time window is checked against
/// the manager's clock instead of the library's.
fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    validation
}

fn classify(err: jsonwebtoken::errors::Error) -> Error {
    use jsonwebtoken::errors::ErrorKind;

    match err.kind() {
        ErrorKind::InvalidSignature => Error::BadSignature,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            Error::UnsupportedAlgorithm(err.to_string())
        }
        ErrorKind::ExpiredSignature => Error::Expired,
        ErrorKind::ImmatureSignature => Error::NotYetValid,
        _ => {
            tracing::debug!(error = %err, "token rejected as malformed");
            Error::MalformedToken
        }
    }
}

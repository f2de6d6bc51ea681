//! Error types for token operations

/// Errors from encoding, decoding, and exchanging session tokens.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed token")]
    MalformedToken,

    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("signature verification failed")]
    BadSignature,

    #[error("token has expired")]
    Expired,

    #[error("token is not valid yet")]
    NotYetValid,

    #[error("invalid refresh token: {0}")]
    InvalidRefreshToken(#[source] Box<Error>),

    #[error("token signing failed: {0}")]
    Signing(String),

    #[error("invalid signing configuration: {0}")]
    Config(String),
}

impl Error {
    /// Stable, low-cardinality name for logs and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MalformedToken => "malformed_token",
            Error::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            Error::BadSignature => "bad_signature",
            Error::Expired => "expired",
            Error::NotYetValid => "not_yet_valid",
            Error::InvalidRefreshToken(_) => "invalid_refresh_token",
            Error::Signing(_) => "signing",
            Error::Config(_) => "config",
        }
    }
}

/// Result alias for token operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn invalid_refresh_token_exposes_cause() {
        let err = Error::InvalidRefreshToken(Box::new(Error::Expired));
        assert_eq!(err.to_string(), "invalid refresh token: token has expired");
        let source = err.source().expect("wrapped cause");
        assert_eq!(source.to_string(), "token has expired");
    }

    #[test]
    fn kinds_are_distinct() {
        let kinds = [
            Error::MalformedToken.kind(),
            Error::UnsupportedAlgorithm("none".into()).kind(),
            Error::BadSignature.kind(),
            Error::Expired.kind(),
            Error::NotYetValid.kind(),
        ];
        for (i, a) in kinds.iter().enumerate() {
            for b in &kinds[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}

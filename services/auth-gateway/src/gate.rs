//! Access gate: Bearer token extraction and access token validation
//!
//! Runs in front of protected routes. Each request ends in exactly one of:
//! 1. no Authorization header → `MissingCredential`
//! 2. header not `Bearer <token>` → `MalformedCredential`
//! 3. token fails validation → `InvalidCredential`
//! 4. token valid → `AuthenticatedUser` inserted into request extensions,
//!    downstream handler runs
//!
//! Identity travels only through the typed extension. Client-supplied
//! headers are never read back as identity.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use session_token::AccessClaims;
use tracing::{debug, warn};

use crate::AppState;
use crate::error::ApiError;
use crate::metrics;

/// Claims of the caller, available to handlers behind the gate via
/// `Extension<AuthenticatedUser>`.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub AccessClaims);

/// Why the Authorization header could not yield a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderRejection {
    Missing,
    Malformed,
}

impl From<HeaderRejection> for ApiError {
    fn from(r: HeaderRejection) -> Self {
        match r {
            HeaderRejection::Missing => ApiError::MissingCredential,
            HeaderRejection::Malformed => ApiError::MalformedCredential,
        }
    }
}

impl HeaderRejection {
    fn reason(self) -> &'static str {
        match self {
            HeaderRejection::Missing => "missing_credential",
            HeaderRejection::Malformed => "malformed_credential",
        }
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
///
/// The scheme is matched case-sensitively with exactly one separating space,
/// and the token itself may not contain whitespace.
/// An empty header counts as missing.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, HeaderRejection> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(HeaderRejection::Missing)?;
    if value.is_empty() {
        return Err(HeaderRejection::Missing);
    }
    let value = value.to_str().map_err(|_| HeaderRejection::Malformed)?;

    match value.split_once(' ') {
        Some(("Bearer", token))
            if !token.is_empty() && !token.contains(|c: char| c.is_ascii_whitespace()) =>
        {
            Ok(token)
        }
        _ => Err(HeaderRejection::Malformed),
    }
}

/// Axum middleware guarding protected routes.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    let path = request.uri().path().to_owned();

    let claims = {
        let token = bearer_token(request.headers()).map_err(|rejection| {
            metrics::record_gate_rejection(rejection.reason());
            warn!(request_id, path, reason = rejection.reason(), "request rejected");
            ApiError::from(rejection)
        })?;

        state.tokens.validate_access(token).map_err(|e| {
            metrics::record_gate_rejection("invalid_credential");
            warn!(
                request_id,
                path,
                reason = "invalid_credential",
                cause = e.kind(),
                "request rejected"
            );
            ApiError::InvalidCredential(e)
        })?
    };

    debug!(request_id, path, user_id = claims.identity.id, "request authenticated");
    request.extensions_mut().insert(AuthenticatedUser(claims));

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(bearer_token(&headers("Bearer abc.def.ghi")), Ok("abc.def.ghi"));
    }

    #[test]
    fn absent_header_is_missing() {
        assert_eq!(
            bearer_token(&HeaderMap::new()),
            Err(HeaderRejection::Missing)
        );
    }

    #[test]
    fn empty_header_is_missing() {
        assert_eq!(bearer_token(&headers("")), Err(HeaderRejection::Missing));
    }

    #[test]
    fn other_schemes_are_malformed() {
        for value in [
            "Basic dXNlcjpwYXNz",
            "bearer abc",
            "BEARER abc",
            "Bearer",
            "Bearer ",
            "Bearer  ",
            "Bearer  abc",
            "Bearer abc def",
            "Bearer abc\tdef",
            "Token abc",
            "abc.def.ghi",
        ] {
            assert_eq!(
                bearer_token(&headers(value)),
                Err(HeaderRejection::Malformed),
                "header {value:?} should be malformed"
            );
        }
    }

    #[test]
    fn non_ascii_header_is_malformed() {
        let mut map = HeaderMap::new();
        map.insert(
            AUTHORIZATION,
            HeaderValue::from_bytes(b"Bearer \xfftoken").unwrap(),
        );
        assert_eq!(bearer_token(&map), Err(HeaderRejection::Malformed));
    }

    #[test]
    fn rejections_map_to_distinct_api_errors() {
        assert!(matches!(
            ApiError::from(HeaderRejection::Missing),
            ApiError::MissingCredential
        ));
        assert!(matches!(
            ApiError::from(HeaderRejection::Malformed),
            ApiError::MalformedCredential
        ));
    }
}

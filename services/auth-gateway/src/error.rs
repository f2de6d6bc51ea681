//! HTTP-facing error type
//!
//! Every handler and the access gate fail with `ApiError`. The response is
//! always `{"error": <message>}` with a generic message; causes that could
//! help an attacker (which signature check failed, store internals) are
//! logged and dropped from the body.

use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, error};

pub const REQUIRED_FIELDS_MESSAGE: &str = "username, email, and password are required";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("invalid request body")]
    InvalidBody(String),

    #[error("{0}")]
    Validation(&'static str),

    #[error("username already exists")]
    DuplicateUsername,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("missing authorization header")]
    MissingCredential,

    #[error("invalid authorization header format")]
    MalformedCredential,

    #[error("invalid token")]
    InvalidCredential(#[source] session_token::Error),

    #[error("invalid refresh token")]
    InvalidRefreshToken(#[source] session_token::Error),

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("not found")]
    NotFound,

    #[error("internal server error")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::DuplicateUsername => StatusCode::CONFLICT,
            ApiError::InvalidCredentials
            | ApiError::MissingCredential
            | ApiError::MalformedCredential
            | ApiError::InvalidCredential(_)
            | ApiError::InvalidRefreshToken(_) => StatusCode::UNAUTHORIZED,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Internal(detail) => error!(error = %detail, "request failed"),
            ApiError::InvalidBody(detail) => debug!(error = %detail, "rejected request body"),
            _ => {}
        }
        (
            self.status(),
            [(CONTENT_TYPE, "application/json")],
            serde_json::json!({ "error": self.to_string() }).to_string(),
        )
            .into_response()
    }
}

impl From<credentials::Error> for ApiError {
    fn from(e: credentials::Error) -> Self {
        match e {
            credentials::Error::DuplicateUsername(_) => ApiError::DuplicateUsername,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn invalid_token_hides_cause() {
        let (status, json) =
            body_json(ApiError::InvalidCredential(session_token::Error::BadSignature)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json, serde_json::json!({ "error": "invalid token" }));
    }

    #[tokio::test]
    async fn internal_hides_detail() {
        let (status, json) = body_json(ApiError::Internal("bcrypt exploded".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "internal server error");
    }

    #[tokio::test]
    async fn invalid_body_detail_stays_out_of_response() {
        let (status, json) = body_json(ApiError::InvalidBody(
            "expected value at line 1 column 2".into(),
        ))
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, serde_json::json!({ "error": "invalid request body" }));
    }

    #[tokio::test]
    async fn validation_message_is_returned() {
        let (status, json) = body_json(ApiError::Validation(REQUIRED_FIELDS_MESSAGE)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], REQUIRED_FIELDS_MESSAGE);
    }

    #[test]
    fn store_errors_map_by_kind() {
        let dup: ApiError = credentials::Error::DuplicateUsername("alice".into()).into();
        assert_eq!(dup.status(), StatusCode::CONFLICT);

        let hash: ApiError = credentials::Error::Hash("invalid salt".into()).into();
        assert_eq!(hash.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn gate_rejections_have_distinct_messages() {
        let messages = [
            ApiError::MissingCredential.to_string(),
            ApiError::MalformedCredential.to_string(),
            ApiError::InvalidCredential(session_token::Error::Expired).to_string(),
        ];
        assert_eq!(messages[0], "missing authorization header");
        assert_eq!(messages[1], "invalid authorization header format");
        assert_eq!(messages[2], "invalid token");
    }
}

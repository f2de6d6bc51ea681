//! HTTP handlers for the auth endpoints
//!
//! Endpoints:
//! - `POST /auth/register` creates a user, 201 on success
//! - `POST /auth/login` verifies a password and issues a token pair
//! - `POST /auth/refresh` exchanges a refresh token for an access token
//! - `GET /protected` echoes the caller's identity (behind the gate)
//! - `GET /health` liveness
//! - `GET /metrics` Prometheus exposition
//!
//! Request bodies are parsed as JSON regardless of Content-Type; missing
//! fields read as empty strings and are then rejected by validation.

use std::time::Instant;

use axum::Extension;
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
    CONTENT_TYPE,
};
use axum::response::IntoResponse;
use credentials::{NewUser, UserRecord};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use session_token::{Identity, RenewedAccess, TokenPair};
use tracing::{info, warn};

use crate::AppState;
use crate::error::{ApiError, REQUIRED_FIELDS_MESSAGE};
use crate::gate::AuthenticatedUser;
use crate::metrics;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub message: &'static str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::InvalidBody(e.to_string()))
}

fn identity_of(user: &UserRecord) -> Identity {
    Identity {
        id: user.id,
        username: user.username.clone(),
        email: user.email.clone(),
    }
}

/// Run a CPU-heavy closure off the async workers.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {e}")))
}

/// POST /auth/register: create a user account.
///
/// A cheap `exists` check runs before hashing so taken usernames don't pay
/// for bcrypt; the store's atomic insert is still the source of truth.
pub async fn register(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let request: RegisterRequest = parse_body(&body)?;

    if request.username.is_empty() || request.email.is_empty() || request.password.is_empty() {
        metrics::record_registration("invalid");
        return Err(ApiError::Validation(REQUIRED_FIELDS_MESSAGE));
    }

    if state.users.exists(&request.username).await? {
        metrics::record_registration("duplicate");
        return Err(ApiError::DuplicateUsername);
    }

    let hasher = state.hasher.clone();
    let password = request.password;
    let password_hash = blocking(move || hasher.hash(&password)).await??;

    let record = state
        .users
        .insert(NewUser {
            username: request.username,
            email: request.email,
            password_hash,
        })
        .await
        .inspect_err(|e| {
            if matches!(e, credentials::Error::DuplicateUsername(_)) {
                metrics::record_registration("duplicate");
            }
        })?;

    metrics::record_registration("created");
    info!(user_id = record.id, username = %record.username, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: record.id,
            username: record.username,
            email: record.email,
            message: "User registered successfully",
        }),
    ))
}

/// POST /auth/login: authenticate and return a token pair.
///
/// Unknown usernames and wrong passwords produce the same response, and both
/// cost one bcrypt verification.
pub async fn login(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TokenPair>, ApiError> {
    let started = Instant::now();
    let request: LoginRequest = parse_body(&body)?;

    let user = state.users.find(&request.username).await?;

    let hasher = state.hasher.clone();
    let digest = match &user {
        Some(user) => user.password_hash.clone(),
        None => state.decoy_digest.to_string(),
    };
    let password = request.password;
    let matched = blocking(move || hasher.verify(&digest, &password)).await?;

    let user = match user {
        Some(user) if matched => user,
        Some(user) => {
            metrics::record_login("invalid_credentials", started.elapsed().as_secs_f64());
            warn!(user_id = user.id, "login failed: wrong password");
            return Err(ApiError::InvalidCredentials);
        }
        None => {
            metrics::record_login("invalid_credentials", started.elapsed().as_secs_f64());
            warn!(username = %request.username, "login failed: unknown user");
            return Err(ApiError::InvalidCredentials);
        }
    };

    let pair = state
        .tokens
        .issue(&identity_of(&user))
        .map_err(|e| ApiError::Internal(format!("failed to generate tokens: {e}")))?;

    metrics::record_login("success", started.elapsed().as_secs_f64());
    info!(user_id = user.id, "login succeeded");
    Ok(Json(pair))
}

/// POST /auth/refresh: mint a new access token from a refresh token.
pub async fn refresh(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<RenewedAccess>, ApiError> {
    let request: RefreshRequest = parse_body(&body)?;

    match state.tokens.renew_access(&request.refresh_token) {
        Ok(renewed) => {
            metrics::record_refresh("success");
            Ok(Json(renewed))
        }
        Err(e @ session_token::Error::InvalidRefreshToken(_)) => {
            metrics::record_refresh("invalid");
            let cause = std::error::Error::source(&e)
                .map(|s| s.to_string())
                .unwrap_or_default();
            warn!(cause, "refresh rejected");
            Err(ApiError::InvalidRefreshToken(e))
        }
        Err(e) => {
            metrics::record_refresh("error");
            Err(ApiError::Internal(format!("failed to renew access token: {e}")))
        }
    }
}

/// GET /protected: example resource behind the access gate.
pub async fn protected(
    Extension(AuthenticatedUser(claims)): Extension<AuthenticatedUser>,
) -> impl IntoResponse {
    let identity = claims.identity;
    Json(serde_json::json!({
        "message": "This is a protected resource",
        "user": {
            "id": identity.id,
            "username": identity.username,
            "email": identity.email,
        },
    }))
}

/// GET /health: liveness plus a few counters.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.started_at.elapsed().as_secs();

    let (status, body) = match state.users.count().await {
        Ok(users) => (
            StatusCode::OK,
            serde_json::json!({
                "status": "ok",
                "users": users,
                "uptime_seconds": uptime,
            }),
        ),
        Err(e) => {
            warn!(error = %e, "user store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({
                    "status": "degraded",
                    "uptime_seconds": uptime,
                }),
            )
        }
    };

    (status, [(CONTENT_TYPE, "application/json")], body.to_string())
}

/// GET /metrics: Prometheus text exposition format.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        state.prometheus.render(),
    )
}

/// OPTIONS on the auth endpoints: permissive CORS preflight.
pub async fn preflight() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
            (ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        ],
    )
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}

pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

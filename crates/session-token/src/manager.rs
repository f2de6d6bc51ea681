//! Token pair issuance and refresh exchange
//!
//! `TokenManager` owns both signing domains and the two TTLs. It holds no
//! mutable state, so a single instance is shared across all requests behind
//! an `Arc` without locking.

use std::sync::Arc;
use std::time::Duration;

use common::Secret;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::claims::{AccessClaims, Identity, RefreshClaims, Validity};
use crate::clock::{Clock, SystemClock};
use crate::codec::{self, Purpose, SigningDomain};
use crate::error::{Error, Result};

/// Tokens returned by a successful login.
///
/// `expires_in` is the access token lifetime in seconds (a delta, not an
/// absolute timestamp).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
}

/// Access token minted from a refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenewedAccess {
    pub access_token: String,
    pub expires_in: u64,
}

pub struct TokenManager {
    access: SigningDomain,
    refresh: SigningDomain,
    access_ttl: Duration,
    refresh_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenManager {
    /// Build a manager reading the system clock.
    ///
    /// Rejects empty secrets, identical access/refresh secrets, and zero TTLs.
    pub fn new(
        access_secret: &Secret<String>,
        refresh_secret: &Secret<String>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Result<Self> {
        if access_secret.is_empty() || refresh_secret.is_empty() {
            return Err(Error::Config("signing secrets must not be empty".into()));
        }
        if access_secret.expose() == refresh_secret.expose() {
            return Err(Error::Config(
                "access and refresh secrets must differ".into(),
            ));
        }
        if access_ttl.as_secs() == 0 || refresh_ttl.as_secs() == 0 {
            return Err(Error::Config(
                "token lifetimes must be at least one second".into(),
            ));
        }

        Ok(Self {
            access: SigningDomain::new(Purpose::Access, access_secret),
            refresh: SigningDomain::new(Purpose::Refresh, refresh_secret),
            access_ttl,
            refresh_ttl,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sign a fresh access/refresh pair for `identity`.
    pub fn issue(&self, identity: &Identity) -> Result<TokenPair> {
        let now = self.clock.now();

        let access_claims = AccessClaims {
            identity: identity.clone(),
            validity: Validity::starting_at(now, self.access_ttl),
        };
        let access_token = codec::encode(&access_claims, &self.access)?;

        let refresh_claims = RefreshClaims {
            identity: identity.clone(),
            validity: Validity::starting_at(now, self.refresh_ttl),
        };
        let refresh_token = codec::encode(&refresh_claims, &self.refresh)?;

        debug!(
            user_id = identity.id,
            access_exp = access_claims.validity.exp,
            refresh_exp = refresh_claims.validity.exp,
            "issued token pair"
        );

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.access_ttl.as_secs(),
        })
    }

    /// Verify an access token and return its claims.
    pub fn validate_access(&self, token: &str) -> Result<AccessClaims> {
        codec::decode(token, &self.access, self.clock.now())
    }

    /// Verify a refresh token and return its claims.
    pub fn validate_refresh(&self, token: &str) -> Result<RefreshClaims> {
        codec::decode(token, &self.refresh, self.clock.now())
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// Every decode failure is reported as `InvalidRefreshToken` wrapping the
    /// underlying cause. The refresh token itself is not rotated.
    pub fn renew_access(&self, refresh_token: &str) -> Result<RenewedAccess> {
        let refresh_claims = self
            .validate_refresh(refresh_token)
            .map_err(|e| Error::InvalidRefreshToken(Box::new(e)))?;

        let access_claims = AccessClaims {
            identity: refresh_claims.identity,
            validity: Validity::starting_at(self.clock.now(), self.access_ttl),
        };
        let access_token = codec::encode(&access_claims, &self.access)?;

        debug!(
            user_id = access_claims.identity.id,
            access_exp = access_claims.validity.exp,
            "renewed access token"
        );

        Ok(RenewedAccess {
            access_token,
            expires_in: self.access_ttl.as_secs(),
        })
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

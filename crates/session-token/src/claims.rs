//! Claims embedded in access and refresh tokens
//!
//! Both token kinds carry the user identity and a validity window
//! (`iat`, `nbf`, `exp` in unix seconds). Refresh tokens carry the identity
//! too, so a renewed access token names the same user as the original login.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The user a token was issued to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(rename = "user_id")]
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// Time window during which a token is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validity {
    /// Issued at
    pub iat: i64,
    /// Not before
    pub nbf: i64,
    /// Expires at
    pub exp: i64,
}

impl Validity {
    /// Window opening at `now` and closing `ttl` later.
    pub fn starting_at(now: i64, ttl: Duration) -> Self {
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        Self {
            iat: now,
            nbf: now,
            exp: now.saturating_add(ttl_secs),
        }
    }

    /// Reject tokens outside the window. Expiry is checked first.
    pub fn check(&self, now: i64) -> Result<()> {
        if now >= self.exp {
            return Err(Error::Expired);
        }
        if now < self.nbf {
            return Err(Error::NotYetValid);
        }
        Ok(())
    }
}

/// Claims payload the codec can sign and verify.
pub trait Claims: Serialize + DeserializeOwned + Clone {
    fn validity(&self) -> &Validity;
}

/// Payload of an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(flatten)]
    pub identity: Identity,
    #[serde(flatten)]
    pub validity: Validity,
}

impl Claims for AccessClaims {
    fn validity(&self) -> &Validity {
        &self.validity
    }
}

/// Payload of a refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    #[serde(flatten)]
    pub identity: Identity,
    #[serde(flatten)]
    pub validity: Validity,
}

impl Claims for RefreshClaims {
    fn validity(&self) -> &Validity {
        &self.validity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity {
            id: 7,
            username: "alice".into(),
            email: "a@x.com".into(),
        }
    }

    #[test]
    fn window_starts_now() {
        let v = Validity::starting_at(1_000, Duration::from_secs(900));
        assert_eq!(v.iat, 1_000);
        assert_eq!(v.nbf, 1_000);
        assert_eq!(v.exp, 1_900);
    }

    #[test]
    fn window_boundaries() {
        let v = Validity {
            iat: 100,
            nbf: 100,
            exp: 200,
        };
        assert!(matches!(v.check(99), Err(Error::NotYetValid)));
        assert!(v.check(100).is_ok());
        assert!(v.check(199).is_ok());
        assert!(matches!(v.check(200), Err(Error::Expired)));
    }

    #[test]
    fn expiry_wins_over_not_before() {
        // Inverted window: both checks fail, expiry is reported.
        let v = Validity {
            iat: 0,
            nbf: 500,
            exp: 100,
        };
        assert!(matches!(v.check(200), Err(Error::Expired)));
    }

    #[test]
    fn huge_ttl_saturates() {
        let v = Validity::starting_at(10, Duration::from_secs(u64::MAX));
        assert_eq!(v.exp, i64::MAX);
    }

    #[test]
    fn access_claims_use_flat_jwt_field_names() {
        let claims = AccessClaims {
            identity: alice(),
            validity: Validity::starting_at(1_000, Duration::from_secs(60)),
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["user_id"], 7);
        assert_eq!(json["username"], "alice");
        assert_eq!(json["email"], "a@x.com");
        assert_eq!(json["iat"], 1_000);
        assert_eq!(json["nbf"], 1_000);
        assert_eq!(json["exp"], 1_060);
        assert!(json.get("identity").is_none());
        assert!(json.get("validity").is_none());
    }

    #[test]
    fn refresh_claims_deserialize_from_flat_payload() {
        let json = r#"{"user_id":7,"username":"alice","email":"a@x.com","iat":1,"nbf":1,"exp":2}"#;
        let claims: RefreshClaims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.identity, alice());
        assert_eq!(claims.validity().exp, 2);
    }
}

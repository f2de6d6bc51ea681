//! Session token issuance and validation
//!
//! Signs and verifies the self-contained session tokens handed out by the
//! gateway. Tokens are HS256 JWTs in two signing domains with distinct
//! secrets: short-lived access tokens and long-lived refresh tokens. Nothing
//! is persisted; validity lives entirely in the signature and the time window.
//!
//! Token flow:
//! 1. Gateway verifies a password, then calls `TokenManager::issue()`
//! 2. Client sends the access token; the gate calls `TokenManager::validate_access()`
//! 3. Access token expires; client calls refresh, gateway calls `TokenManager::renew_access()`
//! 4. Refresh token expires; client logs in again

pub mod claims;
pub mod clock;
pub mod codec;
pub mod constants;
pub mod error;
pub mod manager;

pub use claims::{AccessClaims, Claims, Identity, RefreshClaims, Validity};
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{Purpose, SigningDomain};
pub use constants::*;
pub use error::{Error, Result};
pub use manager::{RenewedAccess, TokenManager, TokenPair};

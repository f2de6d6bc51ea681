//! Token signing constants

use std::time::Duration;

/// The only algorithm this service signs with or accepts.
pub const SIGNING_ALGORITHM: &str = "HS256";

/// Access token lifetime when the config does not override it.
pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(15 * 60);

/// Refresh token lifetime when the config does not override it.
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! Signing secrets are loaded from ACCESS_TOKEN_SECRET / REFRESH_TOKEN_SECRET
//! or from secret files named in the config, never stored in the TOML
//! directly to avoid leaking them.

use common::Secret;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ACCESS_SECRET_ENV: &str = "ACCESS_TOKEN_SECRET";
pub const REFRESH_SECRET_ENV: &str = "REFRESH_TOKEN_SECRET";

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub tokens: TokenConfig,
    #[serde(default)]
    pub passwords: PasswordConfig,
    /// Users present at startup, with pre-computed bcrypt hashes
    #[serde(default)]
    pub seed_users: Vec<SeedUser>,
}

/// HTTP listener settings
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Token lifetimes and signing secret sources
#[derive(Debug, Deserialize)]
pub struct TokenConfig {
    #[serde(default = "default_access_ttl")]
    pub access_ttl_secs: u64,
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_secs: u64,
    #[serde(default)]
    pub access_secret_file: Option<PathBuf>,
    #[serde(default)]
    pub refresh_secret_file: Option<PathBuf>,
    #[serde(skip)]
    pub access_secret: Option<Secret<String>>,
    #[serde(skip)]
    pub refresh_secret: Option<Secret<String>>,
}

/// Password hashing settings
#[derive(Debug, Deserialize)]
pub struct PasswordConfig {
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
}

/// A user loaded into the store at startup
#[derive(Debug, Clone, Deserialize)]
pub struct SeedUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

fn default_max_connections() -> usize {
    1000
}

fn default_access_ttl() -> u64 {
    session_token::DEFAULT_ACCESS_TTL.as_secs()
}

fn default_refresh_ttl() -> u64 {
    session_token::DEFAULT_REFRESH_TTL.as_secs()
}

fn default_bcrypt_cost() -> u32 {
    credentials::BCRYPT_COST
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            access_ttl_secs: default_access_ttl(),
            refresh_ttl_secs: default_refresh_ttl(),
            access_secret_file: None,
            refresh_secret_file: None,
            access_secret: None,
            refresh_secret: None,
        }
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: default_bcrypt_cost(),
        }
    }
}

impl TokenConfig {
    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_secs)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_secs)
    }

    /// Both resolved signing secrets, access first.
    pub fn secrets(&self) -> common::Result<(&Secret<String>, &Secret<String>)> {
        let access = self
            .access_secret
            .as_ref()
            .ok_or(common::Error::MissingSecret(ACCESS_SECRET_ENV))?;
        let refresh = self
            .refresh_secret
            .as_ref()
            .ok_or(common::Error::MissingSecret(REFRESH_SECRET_ENV))?;
        Ok((access, refresh))
    }
}

/// Env var takes precedence over the secret file.
fn resolve_secret(env_var: &str, file: Option<&Path>) -> common::Result<Option<Secret<String>>> {
    if let Some(secret) = Secret::from_env(env_var) {
        return Ok(Some(secret));
    }
    match file {
        Some(path) => Secret::from_file(path),
        None => Ok(None),
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Secret resolution order, per domain:
    /// 1. ACCESS_TOKEN_SECRET / REFRESH_TOKEN_SECRET env var
    /// 2. access_secret_file / refresh_secret_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if config.server.max_connections == 0 {
            return Err(common::Error::Config(
                "max_connections must be greater than 0".into(),
            ));
        }

        if config.tokens.access_ttl_secs == 0 {
            return Err(common::Error::Config(
                "access_ttl_secs must be greater than 0".into(),
            ));
        }

        if config.tokens.refresh_ttl_secs == 0 {
            return Err(common::Error::Config(
                "refresh_ttl_secs must be greater than 0".into(),
            ));
        }

        credentials::BcryptHasher::new(config.passwords.bcrypt_cost)
            .map_err(|e| common::Error::Config(format!("invalid bcrypt_cost: {e}")))?;

        config.tokens.access_secret = resolve_secret(
            ACCESS_SECRET_ENV,
            config.tokens.access_secret_file.as_deref(),
        )?;
        config.tokens.refresh_secret = resolve_secret(
            REFRESH_SECRET_ENV,
            config.tokens.refresh_secret_file.as_deref(),
        )?;

        let (access, refresh) = config.tokens.secrets()?;
        if access.expose() == refresh.expose() {
            return Err(common::Error::Config(
                "access and refresh signing secrets must differ".into(),
            ));
        }

        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("session-gateway.toml")
    }
}

//! Session Gateway
//!
//! Single-binary Rust service that:
//! 1. Registers users and verifies their passwords (bcrypt)
//! 2. Issues signed access/refresh token pairs on login
//! 3. Exchanges refresh tokens for new access tokens
//! 4. Gates protected routes behind access token validation

mod config;
mod error;
mod gate;
mod handlers;
mod metrics;
mod tools;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use credentials::{BcryptHasher, MemoryUserStore, NewUser, PasswordHasher, UserStore};
use metrics_exporter_prometheus::PrometheusHandle;
use session_token::TokenManager;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::tools::Command;

/// How long in-flight requests get to finish after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared application state accessible from all handlers
#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenManager>,
    pub users: Arc<dyn UserStore>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub prometheus: PrometheusHandle,
    pub started_at: Instant,
    /// Digest checked for unknown usernames so every login pays one bcrypt
    /// verification.
    pub decoy_digest: Arc<str>,
}

impl AppState {
    /// Wire up token manager, user store and hasher from configuration.
    fn from_config(config: &Config, prometheus: PrometheusHandle) -> Result<Self> {
        let (access_secret, refresh_secret) = config.tokens.secrets()?;
        let tokens = TokenManager::new(
            access_secret,
            refresh_secret,
            config.tokens.access_ttl(),
            config.tokens.refresh_ttl(),
        )
        .context("invalid token configuration")?;

        let seed = config
            .seed_users
            .iter()
            .map(|u| NewUser {
                username: u.username.clone(),
                email: u.email.clone(),
                password_hash: u.password_hash.clone(),
            })
            .collect();
        let users = MemoryUserStore::with_seed(seed).context("invalid seed_users")?;

        let hasher = BcryptHasher::new(config.passwords.bcrypt_cost)?;

        Self::new(
            Arc::new(tokens),
            Arc::new(users),
            Arc::new(hasher),
            prometheus,
        )
    }

    fn new(
        tokens: Arc<TokenManager>,
        users: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHasher>,
        prometheus: PrometheusHandle,
    ) -> Result<Self> {
        let decoy_digest = hasher
            .hash(&tools::generate_secret())
            .context("failed to prepare decoy password digest")?;

        Ok(Self {
            tokens,
            users,
            hasher,
            prometheus,
            started_at: Instant::now(),
            decoy_digest: decoy_digest.into(),
        })
    }
}

/// Build the axum router with all routes and shared state.
///
/// Only `/protected` sits behind the access gate. A concurrency limit layer
/// caps simultaneous requests at `max_connections`.
fn build_router(state: AppState, max_connections: usize) -> Router {
    let protected = Router::new()
        .route("/protected", get(handlers::protected))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            gate::require_auth,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics_handler))
        .route(
            "/auth/register",
            post(handlers::register).options(handlers::preflight),
        )
        .route(
            "/auth/login",
            post(handlers::login).options(handlers::preflight),
        )
        .route(
            "/auth/refresh",
            post(handlers::refresh).options(handlers::preflight),
        )
        .merge(protected)
        .method_not_allowed_fallback(handlers::method_not_allowed)
        .fallback(handlers::not_found)
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = tools::parse_args(&args).map_err(|e| anyhow::anyhow!(e))?;

    let cli_config_path = match command {
        Command::Serve { config } => config,
        Command::HashPassword { plaintext, cost } => {
            println!("{}", tools::hash_password(plaintext, cost)?);
            return Ok(());
        }
        Command::VerifyPassword { digest, plaintext } => {
            if tools::verify_password(&digest, plaintext)? {
                println!("match");
                return Ok(());
            }
            println!("no match");
            std::process::exit(1);
        }
        Command::GenerateSecret => {
            println!("{}", tools::generate_secret());
            return Ok(());
        }
    };

    info!("starting session-gateway");

    let prometheus_handle =
        metrics::install_recorder().context("failed to install metrics recorder")?;

    let config_path = Config::resolve_path(cli_config_path.as_deref());
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        access_ttl_secs = config.tokens.access_ttl_secs,
        refresh_ttl_secs = config.tokens.refresh_ttl_secs,
        bcrypt_cost = config.passwords.bcrypt_cost,
        seed_users = config.seed_users.len(),
        "configuration loaded"
    );

    let state = AppState::from_config(&config, prometheus_handle)?;
    let app = build_router(state, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    // The drain timeout starts when the shutdown signal fires, not when the
    // server starts: signal first, then race the drain against the timeout.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => info!("all in-flight requests drained"),
        Ok(Ok(Err(e))) => error!(error = %e, "server error during shutdown"),
        Ok(Err(e)) => error!(error = %e, "server task panicked"),
        Err(_) => warn!(
            drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
            "drain timeout exceeded, forcing shutdown"
        ),
    }

    info!("shutdown complete");
    Ok(())
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}

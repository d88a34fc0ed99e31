use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use wellness_sso::app;
use wellness_sso::config::ServerConfig;
use wellness_sso::memory::{MemoryIdentityStore, MemorySessionStore};
use wellness_sso::middleware::{AuthConfig, AuthState};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("No .env loaded: {e}");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let server = ServerConfig::from_env().context("server configuration")?;
    let auth = AuthConfig::from_env().context("auth configuration")?;

    let sessions = Arc::new(MemorySessionStore::new(auth.session_ttl()));
    let identities = Arc::new(MemoryIdentityStore::new());

    let sweeper = sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let purged = sweeper.purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "Purged expired sessions");
            }
        }
    });

    let state = AuthState::from_shared(auth, identities, sessions);
    let app = app::router(state);

    let addr = server.addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!("Server running on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await
        .context("server error")
}

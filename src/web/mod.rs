mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::checker::CheckLocks;
use crate::config::Config;
use crate::db::Database;
use crate::forum::TopicFetcher;
use crate::metadata::igdb::IgdbClient;
use crate::scoring::Scorer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub fetcher: Arc<dyn TopicFetcher>,
    pub scorer: Arc<Scorer>,
    pub http: reqwest::Client,
    /// Long-lived IGDB client (None without credentials); shared so its
    /// OAuth token cache survives across lookups.
    pub igdb: Option<Arc<IgdbClient>>,
    /// Shared with the sweep loop so manual and scheduled checks of the
    /// same topic serialize.
    pub check_locks: CheckLocks,
}

/// Start the web server.
///
/// # Errors
///
/// Returns an error if the server fails to start.
pub async fn serve(state: AppState) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", state.config.web_host, state.config.web_port)
        .parse()
        .context("Invalid web server address")?;

    let app = create_app(state);

    info!(addr = %addr, "Starting web server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind web server address")?;

    axum::serve(listener, app)
        .await
        .context("Web server error")?;

    Ok(())
}

/// Build the router with middleware. Factored out so tests can drive the
/// router directly without binding a socket.
#[must_use]
pub fn create_app(state: AppState) -> Router {
    routes::router()
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rin_update_tracker::checker::{self, CheckLocks};
use rin_update_tracker::config::Config;
use rin_update_tracker::db::Database;
use rin_update_tracker::forum::HttpTopicFetcher;
use rin_update_tracker::metadata::igdb::IgdbClient;
use rin_update_tracker::scoring::Scorer;
use rin_update_tracker::web::{self, AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    // Initialize logging
    init_tracing()?;

    info!("Starting rin-update-tracker");

    // Load and validate configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!(forum_host = %config.forum_host, "Configuration loaded");

    if config.session_cookie.is_none() {
        warn!("No forum session cookie configured - topics behind a login wall will report errors");
    }
    if config.igdb_client_id.is_none() || config.igdb_client_secret.is_none() {
        info!("IGDB credentials not configured - metadata fallback disabled");
    }

    // Ensure the database directory exists
    if let Some(parent) = config.database_path.parent() {
        tokio::fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create database directory: {}", parent.display())
        })?;
    }

    // Initialize database
    let db = Database::new(&config.database_path)
        .await
        .context("Failed to initialize database")?;

    info!("Database initialized");

    let fetcher = HttpTopicFetcher::new(&config).context("Failed to build topic fetcher")?;
    let scorer = Scorer::with_threshold(config.update_score_threshold);
    let http = reqwest::Client::new();
    let igdb = IgdbClient::from_config(http.clone(), &config).map(Arc::new);
    let check_locks = CheckLocks::default();

    // Start web server in background
    let state = AppState {
        db: db.clone(),
        config: Arc::new(config.clone()),
        fetcher: Arc::new(fetcher.clone()),
        scorer: Arc::new(scorer.clone()),
        http,
        igdb,
        check_locks: check_locks.clone(),
    };
    let web_handle = tokio::spawn(async move {
        if let Err(e) = web::serve(state).await {
            error!("Web server error: {e:#}");
        }
    });

    // Start the periodic check loop
    let check_handle = tokio::spawn(async move {
        checker::check_loop(config, db, fetcher, scorer, check_locks).await;
    });

    // Wait for shutdown signal
    shutdown_signal().await;

    info!("Shutting down...");

    web_handle.abort();
    check_handle.abort();

    info!("Shutdown complete");

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rin_update_tracker=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        // Structured JSON logging for production
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        // Pretty-printed logging for development
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

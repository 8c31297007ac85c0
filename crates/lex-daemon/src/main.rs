//! lex-daemon entry point.
//!
//! This file is intentionally thin: it loads config, sets up tracing,
//! connects the Postgres store, wires middleware, and starts the HTTP
//! server. All route handlers live in `routes.rs`; shared state types live
//! in `state.rs`.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use lex_daemon::{routes, state};
use lex_db::PgDictionaryStore;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

/// Comma-separated YAML paths, merged in order.
const ENV_CONFIG_PATHS: &str = "LEX_CONFIG";
/// Overrides `daemon.bind_addr`.
const ENV_DAEMON_ADDR: &str = "LEX_DAEMON_ADDR";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    let loaded = load_config()?;
    init_tracing(&loaded.config.logging.filter);
    info!(config_hash = %loaded.config_hash, "config loaded");

    let db_url = lex_config::resolve_database_url(&loaded.config)?;
    let pool = lex_db::connect(&db_url.url, loaded.config.database.max_connections).await?;
    if loaded.config.database.migrate_on_boot {
        lex_db::migrate(&pool).await?;
        info!("migrations applied");
    }

    let store = Arc::new(PgDictionaryStore::new(pool));
    let shared = Arc::new(state::AppState::new(store).with_config_hash(&loaded.config_hash));

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = bind_addr(&loaded.config.daemon.bind_addr)?;
    info!("lex-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    info!("lex-daemon stopped");
    Ok(())
}

fn load_config() -> anyhow::Result<lex_config::LoadedConfig> {
    match std::env::var(ENV_CONFIG_PATHS) {
        Ok(raw) if !raw.trim().is_empty() => {
            let paths: Vec<&str> = raw
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect();
            lex_config::load_layered_yaml(&paths)
        }
        _ => lex_config::load_defaults(),
    }
}

/// RUST_LOG wins over the configured filter.
fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}

fn bind_addr(configured: &str) -> anyhow::Result<SocketAddr> {
    let raw = std::env::var(ENV_DAEMON_ADDR).unwrap_or_else(|_| configured.to_string());
    raw.parse()
        .with_context(|| format!("invalid bind address: {raw}"))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available; run until killed.
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

/// CORS: allow only localhost origins.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(tower_http::cors::Any)
}

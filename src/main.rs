//! Single-venue hour-block delivery exchange.
//!
//! Tracing init, config load, one shared `AppState` behind `Arc`, a
//! router assembled in `api::create_router` and served with
//! `axum::serve`. This system centers on one thing — the order book and
//! ledger behind a single `Engine` — rather than a constellation of
//! independently scaled services.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod auth;
mod book;
mod bulk;
mod clock;
mod config;
mod dna;
mod engine;
mod errors;
mod events;
mod ledger;
mod matching;
mod models;
mod snapshot;
mod v1;
mod wire;

use crate::clock::SystemClock;
use crate::config::AppConfig;
use crate::engine::Engine;

pub struct AppState {
    pub config: AppConfig,
    pub engine: Arc<Engine>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hourblock_exchange=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;
    tracing::info!("Starting hourblock-exchange v{}", env!("CARGO_PKG_VERSION"));

    let snapshot_path = config.snapshot_path();
    if let Some(path) = &snapshot_path {
        tracing::info!(?path, "persistence enabled");
    } else {
        tracing::warn!("PERSISTENT_DIR not set, running with in-memory state only");
    }

    let engine = Arc::new(Engine::new(Arc::new(SystemClock), snapshot_path));
    engine.bootstrap();

    let state = Arc::new(AppState { config: config.clone(), engine });

    let app = Router::new()
        .route("/health", get(health_check))
        .merge(api::create_router(state.clone()))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

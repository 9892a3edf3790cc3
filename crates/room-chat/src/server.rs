//! HTTP server startup and routing.
//!
//! All handlers share one `AppState`; the database is opened once at startup
//! and accessed through an r2d2 pool.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::{config::Config, room_db::RoomDatabase, shared_state::AppState};

pub async fn run_server(cfg: Config) -> anyhow::Result<()> {
    crate::telemetry::init_tracing();
    crate::metrics::init_metrics();
    cfg.print_config();

    let database = match RoomDatabase::new(&cfg.database_path, cfg.db_pool_size, cfg.embedding_dimension) {
        Ok(db) => {
            info!("Room database initialized at: {}", cfg.database_path.display());
            Arc::new(db)
        }
        Err(e) => {
            warn!("Failed to initialize room database: {}. Falling back to in-memory.", e);
            Arc::new(RoomDatabase::new_in_memory_with_dimension(cfg.embedding_dimension)?)
        }
    };

    let addr = cfg.api_addr()?;
    let state = AppState::new(cfg, database);

    info!("Starting HTTP server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

pub fn build_router(state: AppState) -> axum::Router {
    use axum::{
        routing::{get, post},
        Router,
    };
    use tower_http::{
        cors::{Any, CorsLayer},
        timeout::TimeoutLayer,
        trace::TraceLayer,
    };

    let cors = if state.config.cors_allow_any {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
            .allow_headers(Any)
    } else {
        CorsLayer::new()
    };
    let timeout = Duration::from_secs(state.config.request_timeout_seconds);

    Router::new()
        .route("/api/documents/get", post(crate::api::documents_api::get_documents))
        .route("/api/chat/messages/get", post(crate::api::messages_api::get_messages))
        .route("/api/chat/messages/abort", post(crate::api::messages_api::abort_message))
        .route("/api/chat/room/get", post(crate::api::room_api::get_room))
        .route("/api/chat/room/truncate", post(crate::api::room_api::truncate_room))
        .route("/metrics", get(crate::metrics::get_metrics))
        .route("/healthz", get(|| async { "OK" }))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(timeout))
        .with_state(state)
}

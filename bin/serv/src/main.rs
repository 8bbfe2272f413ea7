use std::{net::SocketAddr, sync::Arc};

use axum::{Router, middleware, routing::get};
use lms_api::{config::ApiConfig, middleware::cors::create_cors_layer, state::ApiState};
use lms_db::PgStore;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from environment variables
    dotenvy::dotenv().ok();
    let config = ApiConfig::from_env()?;

    lms_api::tracing::init_tracing(config.env);

    let metrics_handle = lms_api::metrics::init_metrics()?;
    tracing::info!("Prometheus metrics exporter initialized");

    let pool = lms_db::create_pool(&config.database_url, config.max_db_connections).await?;
    lms_db::ensure_db_and_migrate(&config.database_url, &pool).await?;
    tracing::info!("Database migrated");

    let state = ApiState::new(
        Arc::new(PgStore::new(pool)),
        config.engine_config(),
        config.env,
    );

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let metrics_app = Router::new()
        .route("/metrics", get(lms_api::metrics::metrics_handler))
        .with_state(metrics_handle);

    let app = lms_api::router::router()
        .with_state(state)
        .merge(metrics_app)
        .layer(create_cors_layer(config.parsed_allowed_origins()))
        .layer(trace_layer)
        .layer(middleware::from_fn(lms_api::metrics::track_metrics));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(environment = ?config.env, %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {err}");
    }
    tracing::info!("Shutting down");
}

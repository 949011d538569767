mod handlers;
mod metrics;
mod routes;

use anyhow::Context;
use axum::Router;
use gabarito_common::GraderConfig;
use gabarito_engine::Grader;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub struct AppState {
    pub grader: Grader,
    pub config: GraderConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        )
        .with_target(false)
        .init();

    info!("Gabarito API booting...");

    let config = GraderConfig::load_default().context("Failed to load grader configuration")?;
    let grader = Grader::from_config(&config);
    info!(
        python = %config.python_command,
        time_limit_ms = grader.time_limit().as_millis() as u64,
        keep_partial_results = config.keep_partial_results,
        "Grader configured"
    );

    let state = Arc::new(AppState { grader, config });

    // Build router
    let app = Router::new()
        .merge(routes::routes())
        .with_state(state);

    // Start server
    let addr = std::env::var("GABARITO_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

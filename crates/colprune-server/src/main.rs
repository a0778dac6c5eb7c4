//! # colprune-server: HTTP Service for Column-Pruning Normalization
//!
//! Exposes the normalization pass as a network service. Callers post a logical plan
//! as JSON and get back the plan with every operator narrowed to the columns its
//! consumers read.
//!
//! ## Endpoints
//!
//! - `GET  /health`     - Health check
//! - `GET  /rules`      - List the rule catalog in match order
//! - `POST /normalize`  - Normalize a plan (JSON)
//!
//! ## Configuration
//!
//! See [`config`]. The listener binds `0.0.0.0:3000` unless overridden. Logging is
//! controlled by the `RUST_LOG` environment variable (defaults to `colprune=debug`).

mod config;
mod routes;
mod state;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("colprune=debug".parse()?))
        .init();

    let config = config::ServerConfig::load()?;
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(state::AppState::new(config)?);

    let app = Router::new()
        .route("/health", get(routes::health))
        .route("/rules", get(routes::list_rules))
        .route("/normalize", post(routes::normalize))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("colprune-server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful for development and debugging when you only want the REST server (with
//! OpenAPI/Swagger UI). The workspace's main `simrs-run` binary also runs the periodic PPRA
//! notification dispatch next to the server.

use api_rest::{router, AppState};
use simrs_core::config::positive_i64_from_env_value;
use simrs_core::store::MySqlStore;
use simrs_core::{system_clock, CoreConfig};
use simrs_messaging::N8nWebhookMessenger;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the SIMRS REST API server
///
/// # Environment Variables
/// - `SIMRS_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `DATABASE_URL`, `DATABASE_MAX_CONNECTIONS`: hospital database
/// - `API_KEY`: key expected in `x-api-key`
/// - `N8N_URL` and the `PPRA_*` settings read by [`CoreConfig::from_env`]
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - required configuration is missing or malformed,
/// - the database or the server address cannot be reached, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("simrs_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("SIMRS_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
    let api_key =
        std::env::var("API_KEY").map_err(|_| anyhow::anyhow!("API_KEY must be set"))?;
    let max_connections = positive_i64_from_env_value(
        "DATABASE_MAX_CONNECTIONS",
        std::env::var("DATABASE_MAX_CONNECTIONS").ok(),
        5,
    )?;

    let cfg = Arc::new(CoreConfig::from_env()?);
    let store = MySqlStore::connect(&database_url, u32::try_from(max_connections)?).await?;
    let messenger = N8nWebhookMessenger::from_config(&cfg)?;

    let state = AppState::new(
        cfg,
        api_key,
        Arc::new(store),
        Arc::new(messenger),
        system_clock(),
    );

    tracing::info!("-- Starting SIMRS REST API on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

use api_rest::{router, AppState};
use simrs_core::config::positive_i64_from_env_value;
use simrs_core::messaging::SharedMessenger;
use simrs_core::ppra::notification::NotificationDispatcher;
use simrs_core::store::{MySqlStore, SharedStore};
use simrs_core::{system_clock, CoreConfig};
use simrs_messaging::N8nWebhookMessenger;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the SIMRS application
///
/// Runs concurrently:
/// - the REST server on port 3000 (configurable via SIMRS_REST_ADDR)
/// - when `PPRA_NOTIFY_INTERVAL_SECS` is set, a loop announcing new antibiotic prescriptions
///   to the pharmacists every interval
///
/// # Environment Variables
/// - `SIMRS_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `DATABASE_URL`, `DATABASE_MAX_CONNECTIONS`: hospital database
/// - `API_KEY`: API key expected in `x-api-key`
/// - `N8N_URL`, `HOSPITAL_NAME`, `PPRA_*`: see `CoreConfig::from_env`
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("simrs=info".parse()?)
                .add_directive("simrs_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("SIMRS_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
    let api_key =
        std::env::var("API_KEY").map_err(|_| anyhow::anyhow!("API_KEY must be set"))?;
    let max_connections = positive_i64_from_env_value(
        "DATABASE_MAX_CONNECTIONS",
        std::env::var("DATABASE_MAX_CONNECTIONS").ok(),
        5,
    )?;
    let notify_interval = std::env::var("PPRA_NOTIFY_INTERVAL_SECS")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(|v| positive_i64_from_env_value("PPRA_NOTIFY_INTERVAL_SECS", Some(v), 0))
        .transpose()?
        .map(|secs| Duration::from_secs(secs.unsigned_abs()));

    let cfg = Arc::new(CoreConfig::from_env()?);
    let store: SharedStore =
        Arc::new(MySqlStore::connect(&database_url, u32::try_from(max_connections)?).await?);
    let messenger: SharedMessenger = Arc::new(N8nWebhookMessenger::from_config(&cfg)?);
    let clock = system_clock();

    let dispatcher = NotificationDispatcher::new(
        cfg.clone(),
        store.clone(),
        messenger.clone(),
        clock.clone(),
    );
    let state = AppState::new(cfg, api_key, store, messenger, clock);

    tracing::info!("++ Starting SIMRS REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    let rest_server = axum::serve(listener, router(state)).into_future();

    match notify_interval {
        Some(interval) => {
            tracing::info!("++ PPRA notification dispatch every {:?}", interval);
            let (rest_result, ()) = tokio::join!(rest_server, run_dispatch(dispatcher, interval));
            rest_result?;
        }
        None => rest_server.await?,
    }

    Ok(())
}

/// Announces new antibiotic prescriptions forever, once per `interval`.
async fn run_dispatch(dispatcher: NotificationDispatcher, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        match dispatcher.dispatch_new_prescriptions().await {
            Ok(summary) => tracing::info!(
                "PPRA dispatch: {} found, {} notified, {} failed",
                summary.found,
                summary.notified,
                summary.failed
            ),
            Err(e) => tracing::error!("PPRA dispatch error: {:?}", e),
        }
    }
}

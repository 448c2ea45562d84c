//! order-analytics-server: sync scheduler + analytics REST API.
//!
//! One process runs both halves of the pipeline: a background task that
//! syncs order lines from the upstream operational API into the fact
//! store, and the axum server answering aggregation queries over it.
//!
//! ## Configuration
//! - First CLI argument: optional YAML config path
//! - `ANALYTICS_CONFIG`: alternative config path
//! - `ANALYTICS__*`: per-field environment overrides
//! - `ANALYTICS_LOG`: tracing env-filter (default: info)

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use order_analytics::config::{Config, LOG_ENV_VAR};
use order_analytics::query::AnalyticsEngine;
use order_analytics::rest;
use order_analytics::storage::init_storage;
use order_analytics::sync::{SyncOptions, SyncScheduler};
use order_analytics::upstream::HttpOrderSource;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref()).map_err(|e| {
        error!("failed to load configuration: {}", e);
        e
    })?;

    info!("starting order-analytics-server");

    let (facts, watermarks) = init_storage(&config.storage).await?;

    let source = Arc::new(HttpOrderSource::new(
        config.upstream.base_url.clone(),
        Duration::from_secs(config.upstream.timeout_secs),
    )?);

    let opts = SyncOptions {
        page_size: config.sync.page_size,
        max_retries: config.sync.max_retries,
    };
    let scheduler = Arc::new(SyncScheduler::new(source, facts.clone(), watermarks, opts));

    tokio::spawn(
        scheduler
            .clone()
            .run(Duration::from_secs(config.sync.interval_secs)),
    );

    let engine = Arc::new(AnalyticsEngine::new(facts));

    // On ctrl-c, ask a cycle in flight to stop at its next page boundary
    // and let the server finish requests in flight.
    let shutdown = {
        let scheduler = scheduler.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for shutdown signal");
            }
            info!("shutdown signal received");
            scheduler.shutdown();
        }
    };

    let result = rest::serve(engine, &config.server.host, config.server.port, shutdown).await;

    scheduler.shutdown();

    result
}

//! Tweetline binary entry point

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tweetline::{AppState, config};

/// Application entry point
///
/// # Setup
/// 1. Load configuration from file and environment
/// 2. Initialize tracing/logging
/// 3. Initialize AppState
/// 4. Build Axum router
/// 5. Start background tasks (expiry sweep)
/// 6. Start HTTP server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration
    let config = config::AppConfig::load()?;

    // 2. Initialize tracing/logging
    init_tracing(&config.logging);
    tracing::info!(
        backend = ?config.store.backend,
        fanout_concurrency = config.timeline.fanout_concurrency,
        "Starting Tweetline..."
    );

    // 3. Initialize metrics
    tweetline::metrics::init_metrics();

    // 4. Initialize application state
    let state = AppState::new(config.clone()).await?;

    // 5. Build Axum router
    let app = tweetline::build_router(state.clone());

    // 6. Bind listener
    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // 7. Start background tasks
    spawn_purge_task(state.clone());

    axum::serve(listener, app).await?;

    Ok(())
}

/// Install the global subscriber
///
/// `RUST_LOG` wins when set; otherwise `logging.level` applies to this crate.
fn init_tracing(logging: &config::LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| logging.default_filter().into());

    if logging.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

/// Spawn background expiry sweep
fn spawn_purge_task(state: AppState) {
    tokio::spawn(async move {
        let interval_secs = state.config.store.purge_interval_seconds.max(1);
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));

        // First tick fires immediately; wait a full interval before sweeping.
        interval.tick().await;

        loop {
            interval.tick().await;

            match state.tweets.purge_expired().await {
                Ok(purged) => {
                    tweetline::metrics::TWEETS_PURGED_TOTAL.inc_by(purged);
                    tracing::info!(purged, "Expired tweets purged");
                }
                Err(error) => tracing::error!(%error, "Expired tweet purge failed"),
            }
        }
    });

    tracing::info!("Purge task spawned");
}

//! Tweetline - timeline fan-out service
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - /user/:user_id/... endpoints                             │
//! │  - /health, /metrics                                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Follow validation                                        │
//! │  - Fan-out on write                                         │
//! │  - Timeline resolution                                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - Follow graph, tweets (24h TTL), bounded timelines        │
//! │  - In-memory or SQLite (sqlx)                               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `service`: Timeline orchestration
//! - `data`: Store traits and backends
//! - `clock`: Injectable time source
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod clock;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;

use std::sync::Arc;

use data::{FollowGraphStore, TimelineStore, TweetStore};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Follow / tweet / timeline orchestration
    pub timeline: service::TimelineService,

    /// Tweet store, kept for the expiry sweep
    pub tweets: Arc<dyn TweetStore>,
}

impl AppState {
    /// Initialize application state with the system clock
    ///
    /// # Errors
    /// Returns error if the configured backend cannot be opened
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        Self::with_clock(config, Arc::new(clock::SystemClock)).await
    }

    /// Initialize application state with an explicit time source
    ///
    /// # Errors
    /// Returns error if the configured backend cannot be opened
    pub async fn with_clock(
        config: config::AppConfig,
        clock: Arc<dyn clock::Clock>,
    ) -> Result<Self, error::AppError> {
        tracing::info!(backend = ?config.store.backend, "Initializing application state...");

        let state = match config.store.backend {
            config::StoreBackend::Memory => {
                let store = Arc::new(data::MemoryStore::new(clock.clone()));
                Self::from_store(config, store, clock)
            }
            config::StoreBackend::Sqlite => {
                let path = config.store.path.clone().ok_or_else(|| {
                    error::AppError::Config(
                        "store.path is required when store.backend=sqlite".to_string(),
                    )
                })?;
                let store = Arc::new(data::SqliteStore::connect(&path, clock.clone()).await?);
                tracing::info!(path = %path.display(), "Database connected");
                Self::from_store(config, store, clock)
            }
        };

        tracing::info!("Application state initialized successfully");
        Ok(state)
    }

    fn from_store<S>(config: config::AppConfig, store: Arc<S>, clock: Arc<dyn clock::Clock>) -> Self
    where
        S: FollowGraphStore + TweetStore + TimelineStore + 'static,
    {
        let timeline = service::TimelineService::new(store.clone(), store.clone(), store.clone(), clock)
            .with_fanout_concurrency(config.timeline.fanout_concurrency);

        Self {
            config: Arc::new(config),
            timeline,
            tweets: store,
        }
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::Router;
    use tower_http::{
        compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
        trace::TraceLayer,
    };

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(api::users_router())
        .layer(RequestBodyLimitLayer::new(16 * 1024))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
        .merge(api::metrics_router())
}

async fn health_check() -> &'static str {
    "OK"
}

//! Common test utilities for E2E tests

#![allow(dead_code)]

use std::sync::Arc;

use tempfile::TempDir;
use tokio::net::TcpListener;
use tweetline::clock::ManualClock;
use tweetline::{AppState, config};

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub _temp_dir: Option<TempDir>,
    pub client: reqwest::Client,
}

fn test_config(backend: config::StoreBackend, path: Option<std::path::PathBuf>) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
        },
        store: config::StoreConfig {
            backend,
            path,
            purge_interval_seconds: 3600,
        },
        timeline: config::TimelineConfig {
            fanout_concurrency: 4,
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

impl TestServer {
    /// Create a test server backed by the in-memory store
    pub async fn new() -> Self {
        Self::start(test_config(config::StoreBackend::Memory, None), None).await
    }

    /// Create a test server backed by a temporary SQLite file
    pub async fn new_sqlite() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        Self::start(
            test_config(config::StoreBackend::Sqlite, Some(db_path)),
            Some(temp_dir),
        )
        .await
    }

    async fn start(config: config::AppConfig, temp_dir: Option<TempDir>) -> Self {
        tweetline::metrics::init_metrics();

        let clock = Arc::new(ManualClock::default());
        let state = AppState::with_clock(config, clock.clone()).await.unwrap();

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = tweetline::build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            clock,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// `follower_id` follows `user_id`
    pub async fn follow(&self, user_id: u64, follower_id: u64) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/user/{user_id}/follower/{follower_id}")))
            .send()
            .await
            .unwrap()
    }

    /// Post a tweet as `user_id`
    pub async fn tweet(&self, user_id: u64, content: &str) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/user/{user_id}/tweet")))
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .unwrap()
    }

    /// Fetch the timeline bodies of `user_id`, newest first
    pub async fn timeline_bodies(&self, user_id: u64) -> Vec<String> {
        let response = self
            .client
            .get(self.url(&format!("/user/{user_id}/timeline")))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let json: serde_json::Value = response.json().await.unwrap();
        json.as_array()
            .unwrap()
            .iter()
            .map(|tweet| tweet["body"].as_str().unwrap().to_string())
            .collect()
    }
}

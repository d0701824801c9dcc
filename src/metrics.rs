//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry};
use std::sync::Once;

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tweetline_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");
    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "tweetline_http_request_duration_seconds",
            "HTTP request duration in seconds"
        ).buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "endpoint"]
    ).expect("metric can be created");

    // Store Metrics
    pub static ref STORE_OPERATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tweetline_store_operations_total", "Total number of store operations"),
        &["backend", "operation"]
    ).expect("metric can be created");
    pub static ref STORE_OPERATION_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "tweetline_store_operation_duration_seconds",
            "Store operation duration in seconds"
        ).buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        &["backend", "operation"]
    ).expect("metric can be created");
    pub static ref CACHE_SIZE: IntGaugeVec = IntGaugeVec::new(
        Opts::new("tweetline_cache_size", "Current number of items in the in-memory store"),
        &["keyspace"]
    ).expect("metric can be created");

    // Timeline Metrics
    pub static ref FOLLOWS_TOTAL: IntCounter = IntCounter::new(
        "tweetline_follows_total",
        "Total number of follow edges created"
    ).expect("metric can be created");
    pub static ref TWEETS_CREATED_TOTAL: IntCounter = IntCounter::new(
        "tweetline_tweets_created_total",
        "Total number of tweets created"
    ).expect("metric can be created");
    pub static ref FANOUT_WRITES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tweetline_fanout_writes_total", "Timeline writes issued by tweet fan-out"),
        &["status"]
    ).expect("metric can be created");
    pub static ref TIMELINE_RESOLUTION_GAPS_TOTAL: IntCounter = IntCounter::new(
        "tweetline_timeline_resolution_gaps_total",
        "Timeline reads truncated by an expired tweet"
    ).expect("metric can be created");
    pub static ref TWEETS_PURGED_TOTAL: IntCounter = IntCounter::new(
        "tweetline_tweets_purged_total",
        "Total number of expired tweets purged"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("tweetline_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

static INIT: Once = Once::new();

/// Initialize metrics registry.
///
/// Safe to call more than once; only the first call registers.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
            .expect("HTTP_REQUESTS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
            .expect("HTTP_REQUEST_DURATION_SECONDS can be registered");
        REGISTRY
            .register(Box::new(STORE_OPERATIONS_TOTAL.clone()))
            .expect("STORE_OPERATIONS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(STORE_OPERATION_DURATION_SECONDS.clone()))
            .expect("STORE_OPERATION_DURATION_SECONDS can be registered");
        REGISTRY
            .register(Box::new(CACHE_SIZE.clone()))
            .expect("CACHE_SIZE can be registered");
        REGISTRY
            .register(Box::new(FOLLOWS_TOTAL.clone()))
            .expect("FOLLOWS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(TWEETS_CREATED_TOTAL.clone()))
            .expect("TWEETS_CREATED_TOTAL can be registered");
        REGISTRY
            .register(Box::new(FANOUT_WRITES_TOTAL.clone()))
            .expect("FANOUT_WRITES_TOTAL can be registered");
        REGISTRY
            .register(Box::new(TIMELINE_RESOLUTION_GAPS_TOTAL.clone()))
            .expect("TIMELINE_RESOLUTION_GAPS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(TWEETS_PURGED_TOTAL.clone()))
            .expect("TWEETS_PURGED_TOTAL can be registered");
        REGISTRY
            .register(Box::new(ERRORS_TOTAL.clone()))
            .expect("ERRORS_TOTAL can be registered");

        tracing::info!("Metrics registry initialized");
    });
}

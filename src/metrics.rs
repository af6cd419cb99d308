//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounterVec, IntGauge, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("lightning_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");
    pub static ref HTTP_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "lightning_http_request_duration_seconds",
            "HTTP request duration in seconds"
        ).buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["method", "endpoint"]
    ).expect("metric can be created");

    // Database Metrics
    pub static ref DB_QUERIES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("lightning_db_queries_total", "Total number of database queries"),
        &["operation", "table"]
    ).expect("metric can be created");

    // Policy Metrics
    pub static ref POLICY_DECISIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("lightning_policy_decisions_total", "Total number of policy decisions"),
        &["check", "outcome"]
    ).expect("metric can be created");

    // Rate Limiter Metrics
    pub static ref RATE_LIMIT_CHECKS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("lightning_rate_limit_checks_total", "Total number of rate limit checks"),
        &["action", "outcome"]
    ).expect("metric can be created");

    // Generation Metrics
    pub static ref GENERATION_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("lightning_generation_requests_total", "Total number of testimony generation requests"),
        &["status"]
    ).expect("metric can be created");

    // Application Metrics
    pub static ref USERS_TOTAL: IntGauge = IntGauge::new(
        "lightning_users_total",
        "Total number of registered users"
    ).expect("metric can be created");
    pub static ref TESTIMONIES_TOTAL: IntGauge = IntGauge::new(
        "lightning_testimonies_total",
        "Total number of testimonies"
    ).expect("metric can be created");
    pub static ref MESSAGES_TOTAL: IntGauge = IntGauge::new(
        "lightning_messages_total",
        "Total number of direct messages"
    ).expect("metric can be created");
    pub static ref OPEN_REPORTS_TOTAL: IntGauge = IntGauge::new(
        "lightning_open_reports_total",
        "Number of unresolved moderation reports"
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("lightning_errors_total", "Total number of errors"),
        &["error_type", "endpoint"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
pub fn init_metrics() {
    REGISTRY
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("HTTP_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("HTTP_REQUEST_DURATION_SECONDS can be registered");
    REGISTRY
        .register(Box::new(DB_QUERIES_TOTAL.clone()))
        .expect("DB_QUERIES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(POLICY_DECISIONS_TOTAL.clone()))
        .expect("POLICY_DECISIONS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(RATE_LIMIT_CHECKS_TOTAL.clone()))
        .expect("RATE_LIMIT_CHECKS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(GENERATION_REQUESTS_TOTAL.clone()))
        .expect("GENERATION_REQUESTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(USERS_TOTAL.clone()))
        .expect("USERS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(TESTIMONIES_TOTAL.clone()))
        .expect("TESTIMONIES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(MESSAGES_TOTAL.clone()))
        .expect("MESSAGES_TOTAL can be registered");
    REGISTRY
        .register(Box::new(OPEN_REPORTS_TOTAL.clone()))
        .expect("OPEN_REPORTS_TOTAL can be registered");
    REGISTRY
        .register(Box::new(ERRORS_TOTAL.clone()))
        .expect("ERRORS_TOTAL can be registered");

    tracing::info!("Metrics registry initialized");
}

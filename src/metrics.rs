//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Metrics
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("blogfed_http_requests_total", "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("metric can be created");

    // Federation Metrics
    pub static ref ACTIVITYPUB_ACTIVITIES_RECEIVED: IntCounterVec = IntCounterVec::new(
        Opts::new("blogfed_activitypub_activities_received_total", "Total number of ActivityPub activities received"),
        &["activity_type"]
    ).expect("metric can be created");
    pub static ref ACTIVITYPUB_ACTIVITIES_SENT: IntCounterVec = IntCounterVec::new(
        Opts::new("blogfed_activitypub_activities_sent_total", "Total number of ActivityPub activities sent"),
        &["activity_type"]
    ).expect("metric can be created");
    pub static ref FEDERATION_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("blogfed_federation_requests_total", "Total number of federation requests"),
        &["direction", "status"]
    ).expect("metric can be created");
    pub static ref FEDERATION_REQUEST_DURATION_SECONDS: prometheus::HistogramVec = prometheus::HistogramVec::new(
        HistogramOpts::new(
            "blogfed_federation_request_duration_seconds",
            "Federation request duration in seconds"
        ).buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["direction"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("blogfed_errors_total", "Total number of errors"),
        &["error_type", "endpoint"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
///
/// Safe to call more than once; later calls leave the registry untouched.
pub fn init_metrics() {
    let collectors: [(&str, Box<dyn prometheus::core::Collector>); 6] = [
        ("HTTP_REQUESTS_TOTAL", Box::new(HTTP_REQUESTS_TOTAL.clone())),
        (
            "ACTIVITYPUB_ACTIVITIES_RECEIVED",
            Box::new(ACTIVITYPUB_ACTIVITIES_RECEIVED.clone()),
        ),
        (
            "ACTIVITYPUB_ACTIVITIES_SENT",
            Box::new(ACTIVITYPUB_ACTIVITIES_SENT.clone()),
        ),
        (
            "FEDERATION_REQUESTS_TOTAL",
            Box::new(FEDERATION_REQUESTS_TOTAL.clone()),
        ),
        (
            "FEDERATION_REQUEST_DURATION_SECONDS",
            Box::new(FEDERATION_REQUEST_DURATION_SECONDS.clone()),
        ),
        ("ERRORS_TOTAL", Box::new(ERRORS_TOTAL.clone())),
    ];

    for (name, collector) in collectors {
        match REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(error) => tracing::warn!(metric = name, %error, "Failed to register metric"),
        }
    }

    tracing::info!("Metrics registry initialized");
}

/// Record the outcome of one outbound delivery.
pub fn observe_delivery(activity_type: &str, status: &str) {
    FEDERATION_REQUESTS_TOTAL
        .with_label_values(&["outbound", status])
        .inc();
    if status == "success" {
        ACTIVITYPUB_ACTIVITIES_SENT
            .with_label_values(&[activity_type])
            .inc();
    }
}

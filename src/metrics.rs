//! Prometheus metrics for tool calls and backend requests.
//!
//! # Example
//! ```no_run
//! use search_gateway::metrics::{TOOL_CALLS_TOTAL, init_metrics};
//!
//! init_metrics().ok();
//! TOOL_CALLS_TOTAL.with_label_values(&["search", "success"]).inc();
//! ```

use lazy_static::lazy_static;
use prometheus::{CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
use std::time::Instant;

const NAMESPACE: &str = "search_gateway";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Total number of tool invocations
    ///
    /// Labels: tool, outcome (success, validation_error, backend_error, internal_error)
    pub static ref TOOL_CALLS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("tool_calls_total", "Total number of tool invocations")
            .namespace(NAMESPACE),
        &["tool", "outcome"]
    ).expect("Failed to create TOOL_CALLS_TOTAL metric");

    /// Tool invocation duration in seconds
    ///
    /// Labels: tool
    pub static ref TOOL_CALL_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "tool_call_duration_seconds",
            "Tool invocation duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
        &["tool"]
    ).expect("Failed to create TOOL_CALL_DURATION_SECONDS metric");

    /// Total number of requests sent to the search backend
    ///
    /// Labels: operation, status (HTTP status code or error class)
    pub static ref BACKEND_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("backend_requests_total", "Total number of search backend requests")
            .namespace(NAMESPACE),
        &["operation", "status"]
    ).expect("Failed to create BACKEND_REQUESTS_TOTAL metric");

    /// Search backend request duration in seconds
    ///
    /// Labels: operation
    pub static ref BACKEND_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "backend_request_duration_seconds",
            "Search backend request duration in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["operation"]
    ).expect("Failed to create BACKEND_REQUEST_DURATION_SECONDS metric");
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once; metrics that are already registered are skipped.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(TOOL_CALLS_TOTAL.clone()),
        Box::new(TOOL_CALL_DURATION_SECONDS.clone()),
        Box::new(BACKEND_REQUESTS_TOTAL.clone()),
        Box::new(BACKEND_REQUEST_DURATION_SECONDS.clone()),
    ];

    for collector in collectors {
        match PROMETHEUS_REGISTRY.register(collector) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(e),
        }
    }

    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}

/// Record one finished tool call
pub fn record_tool_call(tool: &str, outcome: &str, started: Instant) {
    TOOL_CALLS_TOTAL.with_label_values(&[tool, outcome]).inc();
    TOOL_CALL_DURATION_SECONDS
        .with_label_values(&[tool])
        .observe(started.elapsed().as_secs_f64());
}

/// Record one finished backend request
pub fn record_backend_request(operation: &str, status: &str, started: Instant) {
    BACKEND_REQUESTS_TOTAL.with_label_values(&[operation, status]).inc();
    BACKEND_REQUEST_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(started.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        assert!(init_metrics().is_ok());
        assert!(init_metrics().is_ok());
    }

    #[test]
    fn test_tool_call_recorded() {
        record_tool_call("unit_test_tool", "success", Instant::now());

        let value = TOOL_CALLS_TOTAL
            .with_label_values(&["unit_test_tool", "success"])
            .get();
        assert!(value >= 1.0);
    }

    #[test]
    fn test_gather_contains_namespace() {
        init_metrics().ok();
        record_backend_request("search", "200", Instant::now());

        let output = gather_metrics();
        assert!(output.contains("search_gateway_backend_requests_total"));
    }
}

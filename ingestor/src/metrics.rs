use lazy_static::lazy_static;
use prometheus::{Counter, Encoder, Histogram, HistogramOpts, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();
    pub static ref READINGS_RECEIVED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_readings_received_total",
        "Total readings posted to the API"
    ))
    .unwrap();
    pub static ref READINGS_APPENDED_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_readings_appended_total",
        "Total readings persisted to the store"
    ))
    .unwrap();
    pub static ref INVALID_READINGS_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_invalid_readings_total",
        "Total posted readings rejected by validation"
    ))
    .unwrap();
    pub static ref APPEND_FAILURES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_append_failures_total",
        "Total store append failures"
    ))
    .unwrap();
    pub static ref APPEND_LATENCY_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "ingestor_append_latency_seconds",
            "Time taken to persist one reading"
        )
        .buckets(vec![
            0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0
        ])
    )
    .unwrap();
    pub static ref QUERIES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_queries_total",
        "Total reading queries served"
    ))
    .unwrap();
    pub static ref INVALID_QUERIES_TOTAL: Counter = Counter::with_opts(Opts::new(
        "ingestor_invalid_queries_total",
        "Total queries rejected for a malformed date filter"
    ))
    .unwrap();
}

pub fn init_metrics() {
    REGISTRY
        .register(Box::new(READINGS_RECEIVED_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(READINGS_APPENDED_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(INVALID_READINGS_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(APPEND_FAILURES_TOTAL.clone()))
        .unwrap();
    REGISTRY
        .register(Box::new(APPEND_LATENCY_SECONDS.clone()))
        .unwrap();
    REGISTRY.register(Box::new(QUERIES_TOTAL.clone())).unwrap();
    REGISTRY
        .register(Box::new(INVALID_QUERIES_TOTAL.clone()))
        .unwrap();
}

pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

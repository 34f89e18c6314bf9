use lazy_static::lazy_static;
use prometheus::{
    Counter, Encoder, Histogram, IntGauge, TextEncoder, register_counter, register_histogram,
    register_int_gauge,
};

lazy_static! {
    pub static ref FETCH_TOTAL: Counter =
        register_counter!("market_fetch_requests_total", "Total number of logical fetches").unwrap();
    pub static ref CACHE_HITS: Counter =
        register_counter!("market_fetch_cache_hits_total", "Total cache hits").unwrap();
    pub static ref CACHE_MISSES: Counter =
        register_counter!("market_fetch_cache_misses_total", "Total cache misses").unwrap();
    pub static ref CACHE_SIZE: IntGauge =
        register_int_gauge!("market_fetch_cache_size", "Current number of entries in cache").unwrap();
    pub static ref QUEUE_DEPTH: IntGauge =
        register_int_gauge!("market_fetch_queue_depth", "Work items submitted but not finished").unwrap();
    pub static ref ADMISSIONS_TOTAL: Counter =
        register_counter!("market_fetch_admissions_total", "Work items admitted by the scheduler").unwrap();
    pub static ref ADMISSION_WAIT: Histogram = register_histogram!(
        "market_fetch_admission_wait_seconds",
        "Time between submission and admission in seconds"
    )
    .unwrap();
    pub static ref UPSTREAM_LATENCY: Histogram = register_histogram!(
        "market_fetch_upstream_latency_seconds",
        "Upstream call latency in seconds"
    )
    .unwrap();
}

/// Prometheus text exposition of everything registered in the default registry.
pub fn render() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

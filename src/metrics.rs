use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("gateway_requests_total", "Total number of guarded requests").unwrap();
    pub static ref DENIED_BURST: Counter =
        register_counter!("gateway_denied_burst_total", "Requests denied by the burst limit").unwrap();
    pub static ref DENIED_GLOBAL: Counter =
        register_counter!("gateway_denied_global_total", "Requests denied by the global daily cap").unwrap();
    pub static ref DENIED_QUOTA: Counter =
        register_counter!("gateway_denied_quota_total", "Requests denied by the per-caller daily quota").unwrap();
    pub static ref DENIED_COST: Counter =
        register_counter!("gateway_denied_cost_total", "Requests denied by the daily cost ceiling").unwrap();
    pub static ref UPSTREAM_LATENCY: Histogram = register_histogram!(
        "gateway_upstream_latency_seconds",
        "Agent backend call latency in seconds"
    )
    .unwrap();
    pub static ref LEDGER_ENTRIES: Gauge =
        register_gauge!("gateway_ledger_entries", "Current number of live usage counters").unwrap();
}

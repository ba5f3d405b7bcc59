//! Prometheus metrics on the default registry.

use crate::simulation::SystemState;
use once_cell::sync::Lazy;
use prometheus::{Counter, Encoder, Histogram, IntGauge, TextEncoder};

pub static TICKS_TOTAL: Lazy<Counter> = Lazy::new(|| {
    let c = Counter::new("machine_sim_ticks_total", "Total simulation ticks").unwrap();
    prometheus::register(Box::new(c.clone())).unwrap();
    c
});

pub static FAULTS_INJECTED: Lazy<Counter> = Lazy::new(|| {
    let c = Counter::new("machine_sim_faults_injected_total", "Total faults injected").unwrap();
    prometheus::register(Box::new(c.clone())).unwrap();
    c
});

pub static ANOMALOUS_CHANNELS: Lazy<IntGauge> = Lazy::new(|| {
    let g = IntGauge::new(
        "machine_sim_anomalous_channels",
        "Channels flagged anomalous in the latest tick",
    )
    .unwrap();
    prometheus::register(Box::new(g.clone())).unwrap();
    g
});

pub static OVERALL_STATUS: Lazy<IntGauge> = Lazy::new(|| {
    let g = IntGauge::new(
        "machine_sim_overall_status",
        "Overall machine status (0=normal, 1=warning, 2=critical)",
    )
    .unwrap();
    prometheus::register(Box::new(g.clone())).unwrap();
    g
});

pub static TICK_DURATION: Lazy<Histogram> = Lazy::new(|| {
    let h = Histogram::with_opts(
        prometheus::HistogramOpts::new(
            "machine_sim_tick_duration_seconds",
            "Wall time spent computing one tick",
        )
        .buckets(vec![0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.05]),
    )
    .unwrap();
    prometheus::register(Box::new(h.clone())).unwrap();
    h
});

/// Force registration so `/metrics` lists every series from the start.
pub fn init() {
    let _ = &*TICKS_TOTAL;
    let _ = &*FAULTS_INJECTED;
    let _ = &*ANOMALOUS_CHANNELS;
    let _ = &*OVERALL_STATUS;
    let _ = &*TICK_DURATION;
}

pub fn record_snapshot(state: &SystemState) {
    TICKS_TOTAL.inc();
    ANOMALOUS_CHANNELS.set(state.anomalous_count() as i64);
    OVERALL_STATUS.set(state.overall_status.level() as i64);
}

/// Text exposition of the default registry.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

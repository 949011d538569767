// Prometheus metrics for the grading API
use gabarito_common::Verdict;
use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    IntCounter, IntCounterVec, TextEncoder,
};

lazy_static! {
    pub static ref VERDICTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "gabarito_verdicts_total",
        "Verdicts produced, by status and grading mode",
        &["status", "mode"]
    )
    .expect("verdict counter registers once");
    pub static ref GRADING_SECONDS: Histogram = register_histogram!(
        "gabarito_grading_seconds",
        "Wall-clock time of one grading call",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("grading histogram registers once");
    pub static ref ENGINE_FAILURES_TOTAL: IntCounter = register_int_counter!(
        "gabarito_engine_failures_total",
        "Grading calls the host could not run"
    )
    .expect("engine failure counter registers once");
}

pub fn observe_verdict(verdict: &Verdict, mode: &str) {
    VERDICTS_TOTAL
        .with_label_values(&[verdict.status.as_str(), mode])
        .inc();
    GRADING_SECONDS.observe(verdict.execution_time);
}

/// Render every registered metric in the text exposition format
pub fn render() -> Result<String, String> {
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| e.to_string())?;
    String::from_utf8(buffer).map_err(|e| e.to_string())
}

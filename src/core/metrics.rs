//! Metrics collection using Prometheus
//!
//! Tracks pipeline outcomes and the cost of the external tools:
//! - Pipeline duration, successes and failures by error kind
//! - yt-dlp execution time per operation and its failures by cause
//! - Audio bytes pulled from the source

use once_cell::sync::Lazy;
use prometheus::{
    register_histogram, register_histogram_vec, register_int_counter, register_int_counter_vec, Encoder, Histogram,
    HistogramVec, IntCounter, IntCounterVec, TextEncoder,
};

use crate::core::error::ErrorKind;

/// Wall time of a full pipeline run (intake to response)
pub static PIPELINE_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "doramp3_pipeline_duration_seconds",
        "Time spent processing one download request",
        vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]
    )
    .unwrap_or_else(|e| panic!("failed to register pipeline duration histogram: {}", e))
});

/// Successful pipeline runs
pub static PIPELINE_SUCCESS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("doramp3_pipeline_success_total", "Total number of produced MP3 artifacts")
        .unwrap_or_else(|e| panic!("failed to register success counter: {}", e))
});

/// Failed pipeline runs
/// Labels: error_kind (BadRequest/UpstreamError/TranscodeError/InternalError)
pub static PIPELINE_FAILURE_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "doramp3_pipeline_failure_total",
        "Total number of failed requests by error kind",
        &["error_kind"]
    )
    .unwrap_or_else(|e| panic!("failed to register failure counter: {}", e))
});

/// yt-dlp command execution duration
/// Labels: operation (metadata/stream)
pub static YTDLP_EXECUTION_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "doramp3_ytdlp_execution_duration_seconds",
        "Time spent executing yt-dlp commands",
        &["operation"],
        vec![1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 240.0, 600.0]
    )
    .unwrap_or_else(|e| panic!("failed to register yt-dlp histogram: {}", e))
});

/// Platform-side failures (metadata lookup, stream open)
/// Labels: reason (yt-dlp error class, credentials, timeout, process, invalid_metadata)
pub static DOWNLOAD_ERRORS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "doramp3_download_errors_total",
        "Total number of yt-dlp failures by cause",
        &["reason"]
    )
    .unwrap_or_else(|e| panic!("failed to register download error counter: {}", e))
});

/// Audio bytes received from the source stream
pub static BYTES_RECEIVED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("doramp3_bytes_received_total", "Total audio bytes received from yt-dlp")
        .unwrap_or_else(|e| panic!("failed to register bytes counter: {}", e))
});

/// Initialize metrics (call this at startup to register all metrics)
pub fn init_metrics() {
    log::info!("Initializing metrics registry...");

    Lazy::force(&PIPELINE_DURATION_SECONDS);
    Lazy::force(&PIPELINE_SUCCESS_TOTAL);
    Lazy::force(&YTDLP_EXECUTION_DURATION_SECONDS);
    Lazy::force(&BYTES_RECEIVED_TOTAL);
    Lazy::force(&DOWNLOAD_ERRORS_TOTAL);

    // Pre-create label sets so they show up in /metrics with 0 values
    for kind in [
        ErrorKind::BadRequest,
        ErrorKind::UpstreamError,
        ErrorKind::TranscodeError,
        ErrorKind::InternalError,
    ] {
        PIPELINE_FAILURE_TOTAL.with_label_values(&[kind.as_ref()]);
    }
    for operation in ["metadata", "stream"] {
        YTDLP_EXECUTION_DURATION_SECONDS.with_label_values(&[operation]);
    }

    log::info!("Metrics registry initialized successfully");
}

pub fn record_pipeline_success() {
    PIPELINE_SUCCESS_TOTAL.inc();
}

pub fn record_pipeline_failure(kind: ErrorKind) {
    PIPELINE_FAILURE_TOTAL.with_label_values(&[kind.as_ref()]).inc();
}

pub fn record_download_error(reason: &str) {
    DOWNLOAD_ERRORS_TOTAL.with_label_values(&[reason]).inc();
}

pub fn record_bytes_received(bytes: u64) {
    BYTES_RECEIVED_TOTAL.inc_by(bytes);
}

/// Starts a timer for one yt-dlp invocation; observed when dropped.
pub fn start_ytdlp_timer(operation: &str) -> prometheus::HistogramTimer {
    YTDLP_EXECUTION_DURATION_SECONDS
        .with_label_values(&[operation])
        .start_timer()
}

/// Renders the default registry in the Prometheus text format.
pub fn gather_text() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_counter_by_kind() {
        init_metrics();
        let before = PIPELINE_FAILURE_TOTAL
            .with_label_values(&[ErrorKind::TranscodeError.as_ref()])
            .get();
        record_pipeline_failure(ErrorKind::TranscodeError);
        let after = PIPELINE_FAILURE_TOTAL
            .with_label_values(&[ErrorKind::TranscodeError.as_ref()])
            .get();
        assert!(after > before);
    }

    #[test]
    fn test_gather_text_contains_registered_metrics() {
        init_metrics();
        record_bytes_received(10);
        let text = gather_text().unwrap();
        assert!(text.contains("doramp3_bytes_received_total"));
        assert!(text.contains("doramp3_pipeline_failure_total"));
    }
}

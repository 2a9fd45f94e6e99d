//! Metrics collection and Prometheus export.
//!
//! Installs the global recorder behind the `/metrics` endpoint and records
//! inference latency and failures.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

/// Global handle to the Prometheus recorder.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

const INFERENCE_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0];

/// Initialize the metrics recorder.
///
/// Must run before any metrics are recorded. Calling it again is a no-op.
pub fn init_metrics() -> Result<(), BuildError> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("ask_inference_duration_seconds".to_string()),
            INFERENCE_BUCKETS,
        )?
        .install_recorder()?;

    if METRICS_HANDLE.set(handle).is_err() {
        tracing::warn!("Metrics handle already set, keeping the existing one");
    }
    Ok(())
}

/// Get the current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

/// Record one chat completion against `model`.
pub fn record_inference(model: &str, elapsed: Duration, success: bool) {
    let labels = [("model", model.to_string())];
    histogram!("ask_inference_duration_seconds", &labels).record(elapsed.as_secs_f64());
    if !success {
        counter!("ask_inference_errors_total", &labels).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_keeps_the_installed_recorder() {
        init_metrics().unwrap();
        init_metrics().unwrap();

        record_inference("unit-model", Duration::from_millis(20), false);

        let rendered = get_metrics();
        assert!(rendered.contains("ask_inference_errors_total"));
        assert!(rendered.contains("unit-model"));
    }
}

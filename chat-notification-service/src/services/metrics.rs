//! Metrics collection for chat-notification-service.
//!
//! A single Prometheus recorder backs both the shared HTTP middleware
//! metrics and the dispatch counters below.

use metrics::counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

use crate::models::DispatchOutcome;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Safe to call more than once.
pub fn init_metrics() {
    METRICS_HANDLE.get_or_init(|| {
        PrometheusBuilder::new()
            .install_recorder()
            .expect("failed to install Prometheus recorder")
    });
}

/// Get metrics output in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string())
}

/// Record the terminal state of one dispatch.
pub fn record_dispatch(outcome: DispatchOutcome) {
    counter!("chat_notification_dispatch_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record one per-token send against a provider.
pub fn record_provider_send(provider: &'static str, status: &'static str) {
    counter!(
        "chat_notification_provider_sends_total",
        "provider" => provider,
        "status" => status
    )
    .increment(1);
}

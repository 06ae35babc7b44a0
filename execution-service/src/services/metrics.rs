//! Prometheus export and the tracker's domain counters.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use service_core::error::AppError;
use std::sync::OnceLock;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the global Prometheus recorder. Calling it again is a no-op.
pub fn init_metrics() -> Result<(), AppError> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("failed to install Prometheus recorder: {}", e))
    })?;
    let _ = METRICS_HANDLE.set(handle);
    Ok(())
}

/// Current metrics in Prometheus text format.
pub fn get_metrics() -> String {
    METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized".to_string())
}

pub fn record_line_item_update(history_entries: usize) {
    metrics::counter!("line_item_updates_total").increment(1);
    if history_entries > 0 {
        metrics::counter!("line_item_history_entries_total").increment(history_entries as u64);
    }
}

pub fn record_import(imported: usize, rejected: usize) {
    metrics::counter!("line_item_import_rows_total", "result" => "imported")
        .increment(imported as u64);
    metrics::counter!("line_item_import_rows_total", "result" => "rejected")
        .increment(rejected as u64);
}

pub fn record_mail(kind: &'static str, success: bool) {
    let status = if success { "sent" } else { "failed" };
    metrics::counter!("mail_sent_total", "kind" => kind, "status" => status).increment(1);
}

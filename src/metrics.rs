//! Metrics collection

use std::time::Duration;

use anyhow::Result;
use metrics::{counter, histogram};

use crate::models::MergeReport;

/// Metric names recorded by the merge pipeline.
pub struct MetricsCollector {
    /// Flattened rows emitted across runs
    pub rows_emitted_total: &'static str,
    /// Rows dropped for violating the composite key
    pub duplicates_dropped_total: &'static str,
    /// Emitted rows whose identifier matched no contact
    pub unresolved_identifiers_total: &'static str,
    /// Contact index key collisions
    pub index_collisions_total: &'static str,
    /// Messages skipped for blank bodies
    pub empty_messages_skipped_total: &'static str,
    /// Wall-clock duration of a full merge run
    pub merge_duration_seconds: &'static str,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self {
            rows_emitted_total: "message_merge_rows_emitted_total",
            duplicates_dropped_total: "message_merge_duplicates_dropped_total",
            unresolved_identifiers_total: "message_merge_unresolved_identifiers_total",
            index_collisions_total: "message_merge_index_collisions_total",
            empty_messages_skipped_total: "message_merge_empty_messages_skipped_total",
            merge_duration_seconds: "message_merge_duration_seconds",
        }
    }
}

impl MetricsCollector {
    /// Install the global metrics recorder.
    pub fn init() -> Result<()> {
        metrics::set_global_recorder(metrics::NoopRecorder)
            .map_err(|_| anyhow::anyhow!("Failed to initialize metrics recorder: a recorder is already installed"))?;

        Ok(())
    }

    /// Record the outcome of one merge run.
    pub fn record_merge(&self, report: &MergeReport, rows_emitted: usize, duration: Duration) {
        counter!(self.rows_emitted_total).increment(rows_emitted as u64);
        counter!(self.duplicates_dropped_total).increment(report.duplicate_rows_dropped as u64);
        counter!(self.unresolved_identifiers_total).increment(report.unresolved_identifiers as u64);
        counter!(self.index_collisions_total).increment(report.index_collisions as u64);
        counter!(self.empty_messages_skipped_total).increment(report.empty_messages_skipped as u64);
        histogram!(self.merge_duration_seconds).record(duration.as_secs_f64());
    }
}

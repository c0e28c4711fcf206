use std::fmt;
use std::sync::Arc;

use crate::error::IngestionError;

use super::unified::IngestionFormat;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestionSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (the load failed).
    Error,
    /// Critical error (I/O failures and backend errors during the load).
    Critical,
}

impl IngestionSeverity {
    /// Severity assigned to a failed ingestion.
    pub fn for_error(error: &IngestionError) -> Self {
        use crate::error::ErrorKind;

        match error.kind() {
            ErrorKind::Io | ErrorKind::Load => Self::Critical,
            ErrorKind::MalformedSource
            | ErrorKind::UnsupportedFormat
            | ErrorKind::Schema
            | ErrorKind::Config => Self::Error,
        }
    }
}

/// Context about an ingestion attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionContext {
    /// File name the source was read from (drives format and table name).
    pub file_name: String,
    /// Format used for ingestion.
    pub format: IngestionFormat,
    /// Destination table.
    pub table: String,
}

/// Stats reported on successful ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionStats {
    /// Number of committed rows.
    pub rows: usize,
    /// Number of batches executed.
    pub batches: usize,
    /// Cells loaded as NULL because they could not be coerced.
    pub null_substitutions: usize,
}

/// Observer interface for ingestion outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait IngestionObserver: Send + Sync {
    /// Called when ingestion succeeds.
    fn on_success(&self, _ctx: &IngestionContext, _stats: IngestionStats) {}

    /// Called when ingestion fails.
    fn on_failure(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &IngestionError) {}

    /// Called when an ingestion failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn IngestionObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn IngestionObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl IngestionObserver for CompositeObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Emits ingestion outcomes as `tracing` events.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl IngestionObserver for TracingObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        tracing::info!(
            file = %ctx.file_name,
            format = ?ctx.format,
            table = %ctx.table,
            rows = stats.rows,
            batches = stats.batches,
            null_substitutions = stats.null_substitutions,
            "ingestion succeeded"
        );
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        tracing::warn!(
            file = %ctx.file_name,
            format = ?ctx.format,
            table = %ctx.table,
            ?severity,
            error = %error,
            "ingestion failed"
        );
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &IngestionError) {
        tracing::error!(
            file = %ctx.file_name,
            format = ?ctx.format,
            table = %ctx.table,
            ?severity,
            error = %error,
            "ingestion alert"
        );
    }
}

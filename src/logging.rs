//! Logging setup and utilities

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

/// Initialize structured logging.
///
/// Console output goes to stderr, as text or JSON per configuration. When a
/// log file is given, a daily-rolling JSON file layer is added; the returned
/// guard must stay alive for the file writer to flush.
pub fn init_logging(
    log_level: Option<&str>,
    log_file: Option<&Path>,
    json_console: bool,
) -> Result<Option<non_blocking::WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level.unwrap_or("info")))
        .map_err(|e| anyhow::anyhow!("Failed to create log filter: {e}"))?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = vec![env_filter.boxed()];

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);
    if json_console {
        layers.push(console_layer.json().boxed());
    } else {
        layers.push(console_layer.boxed());
    }

    let guard = if let Some(log_path) = log_file {
        let file_appender =
            rolling::daily(log_path.parent().unwrap_or_else(|| Path::new(".")), "merge.log");
        let (appender, guard) = non_blocking(file_appender);
        layers.push(
            tracing_subscriber::fmt::layer()
                .with_writer(appender)
                .with_ansi(false)
                .json()
                .boxed(),
        );
        Some(guard)
    } else {
        None
    };

    tracing_subscriber::registry().with(layers).init();
    tracing::info!("Logging system initialized");
    Ok(guard)
}

/// Performance timing for pipeline stages.
pub struct OperationTimer {
    operation: String,
    start: Instant,
    finished: bool,
}

impl OperationTimer {
    /// Start timing the named operation.
    #[must_use]
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
            finished: false,
        }
    }

    /// Stop the timer, log the elapsed time and return it.
    pub fn finish(mut self) -> Duration {
        self.finished = true;
        let elapsed = self.start.elapsed();
        tracing::info!(
            operation = %self.operation,
            duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "Operation completed"
        );
        elapsed
    }
}

impl Drop for OperationTimer {
    fn drop(&mut self) {
        if !self.finished && !std::thread::panicking() {
            let elapsed = self.start.elapsed();
            tracing::debug!(
                operation = %self.operation,
                duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                "Operation finished"
            );
        }
    }
}

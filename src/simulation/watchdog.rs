//! Watchdog for auxiliary background tasks
//!
//! Diagnostics, autosaves and similar side work run outside the tick loop.
//! Each is wrapped in a timeout; a task that overruns is dropped (which
//! cancels it) and a report is produced on the blocking pool so symbol
//! resolution never happens on a simulation thread.

use std::backtrace::Backtrace;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::time;
use tracing::warn;

use crate::core::error::{Result, SimError};

/// Diagnostic record of a cancelled task
#[derive(Debug, Clone, Serialize)]
pub struct TimeoutReport {
    pub task: String,
    pub elapsed_ms: u64,
    /// Where the task was started; empty unless `RUST_BACKTRACE` is set
    pub backtrace: String,
}

#[derive(Debug, Clone)]
pub struct Watchdog {
    timeout: Duration,
    reports: Arc<Mutex<Vec<TimeoutReport>>>,
}

impl Watchdog {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            reports: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn from_millis(timeout_ms: u64) -> Self {
        Self::new(Duration::from_millis(timeout_ms))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `task`, cancelling it once the timeout expires
    pub async fn run<F, T>(&self, name: &str, task: F) -> Result<T>
    where
        F: Future<Output = T>,
    {
        // Capture is cheap; formatting (symbol resolution) is deferred
        let origin = Backtrace::capture();
        let started = Instant::now();

        match time::timeout(self.timeout, task).await {
            Ok(value) => Ok(value),
            Err(_) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                let task = name.to_string();
                let report_task = task.clone();

                let report = tokio::task::spawn_blocking(move || TimeoutReport {
                    task: report_task,
                    elapsed_ms,
                    backtrace: origin.to_string(),
                })
                .await;

                match report {
                    Ok(report) => {
                        warn!(task = %report.task, elapsed_ms, "auxiliary task cancelled after timeout");
                        if let Ok(mut reports) = self.reports.lock() {
                            reports.push(report);
                        }
                    }
                    Err(e) => warn!(%task, error = %e, "timeout report could not be produced"),
                }
                Err(SimError::TaskTimedOut { task, elapsed_ms })
            }
        }
    }

    /// Reports of every task cancelled so far
    pub fn reports(&self) -> Vec<TimeoutReport> {
        self.reports.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

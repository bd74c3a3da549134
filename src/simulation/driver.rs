//! Fixed-rate tick driver
//!
//! A tokio interval fires at the configured tick rate and launches each tick
//! on the blocking pool. If the previous tick is still running when the
//! interval fires again, that beat is dropped rather than queued.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::core::error::Result;
use crate::simulation::scheduler::{EntityThinkingSystem, TickReport};

/// Outcome of a driver run
#[derive(Debug, Default, Serialize)]
pub struct DriverSummary {
    pub completed: u64,
    /// Beats dropped because a tick was still in flight
    pub skipped: u64,
    pub failed: u64,
    pub reports: Vec<TickReport>,
}

impl DriverSummary {
    fn collect(&mut self, joined: std::result::Result<Result<TickReport>, tokio::task::JoinError>) {
        match joined {
            Ok(Ok(report)) => {
                self.completed += 1;
                self.reports.push(report);
            }
            Ok(Err(e)) => {
                error!(error = %e, "tick failed");
                self.failed += 1;
            }
            Err(e) => {
                error!(error = %e, "tick task aborted");
                self.failed += 1;
            }
        }
    }
}

pub struct TickDriver {
    system: Arc<EntityThinkingSystem>,
    period: Duration,
}

impl TickDriver {
    pub fn new(system: Arc<EntityThinkingSystem>, ticks_per_second: u32) -> Self {
        Self {
            system,
            period: Duration::from_secs_f64(1.0 / f64::from(ticks_per_second.max(1))),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Launch `ticks` ticks at the fixed rate and wait for the last one
    pub async fn run_for(&self, ticks: u64) -> DriverSummary {
        let mut interval = time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut summary = DriverSummary::default();
        let mut in_flight: Option<JoinHandle<Result<TickReport>>> = None;
        let mut launched = 0;

        while launched < ticks {
            interval.tick().await;

            if let Some(handle) = in_flight.take() {
                if !handle.is_finished() {
                    warn!("previous tick still running, skipping this beat");
                    summary.skipped += 1;
                    in_flight = Some(handle);
                    continue;
                }
                summary.collect(handle.await);
            }

            let system = Arc::clone(&self.system);
            in_flight = Some(tokio::task::spawn_blocking(move || system.process_game_tick()));
            launched += 1;
        }

        if let Some(handle) = in_flight {
            summary.collect(handle.await);
        }
        info!(
            completed = summary.completed,
            skipped = summary.skipped,
            failed = summary.failed,
            "driver finished"
        );
        summary
    }
}

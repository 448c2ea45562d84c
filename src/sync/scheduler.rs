//! Sync scheduler: periodic trigger with single-flight cycles.
//!
//! Runs one cycle at startup and one per interval tick. The state machine
//! is `Idle → Running → (Idle | Failed)`; a trigger while a cycle is
//! running is rejected with a logged skip, so at most one cycle executes
//! at a time. This relies on the process being a singleton — multiple
//! instances would need an external mutual-exclusion primitive.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use super::{run_cycle, CycleStats, Result, SyncOptions};
use crate::storage::fact_store::FactStore;
use crate::storage::watermark_store::WatermarkStore;
use crate::upstream::OrderSource;

/// Scheduler run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Running,
    /// Last cycle ended in an error; the next tick starts a fresh attempt
    /// from the committed watermark.
    Failed,
}

/// Drives sync cycles on startup and on a fixed interval.
pub struct SyncScheduler {
    source: Arc<dyn OrderSource>,
    facts: Arc<dyn FactStore>,
    watermarks: Arc<dyn WatermarkStore>,
    opts: SyncOptions,
    state: Mutex<SyncState>,
    cancel: AtomicBool,
}

impl SyncScheduler {
    pub fn new(
        source: Arc<dyn OrderSource>,
        facts: Arc<dyn FactStore>,
        watermarks: Arc<dyn WatermarkStore>,
        opts: SyncOptions,
    ) -> Self {
        Self {
            source,
            facts,
            watermarks,
            opts,
            state: Mutex::new(SyncState::Idle),
            cancel: AtomicBool::new(false),
        }
    }

    /// Current scheduler state.
    pub fn state(&self) -> SyncState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Ask a cycle in progress to stop at the next page boundary and the
    /// scheduler loop to exit at the next tick.
    pub fn shutdown(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    /// Attempt to start a cycle now.
    ///
    /// Returns `None` (with a logged skip) if a cycle is already running;
    /// otherwise runs the cycle to completion and returns its result.
    pub async fn trigger(&self) -> Option<Result<CycleStats>> {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if *state == SyncState::Running {
                warn!("sync cycle already running, skipping trigger");
                return None;
            }
            *state = SyncState::Running;
        }

        let result = run_cycle(
            self.source.as_ref(),
            self.facts.as_ref(),
            self.watermarks.as_ref(),
            &self.opts,
            &self.cancel,
        )
        .await;

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match &result {
            Ok(stats) => {
                *state = SyncState::Idle;
                info!(
                    pages = stats.pages,
                    loaded = stats.loaded,
                    skipped = stats.skipped,
                    "sync cycle complete"
                );
            }
            Err(e) => {
                // Watermark stays at the last committed page.
                *state = SyncState::Failed;
                error!(error = %e, "sync cycle failed");
            }
        }

        Some(result)
    }

    /// Run until shutdown: the first tick fires immediately (startup sync),
    /// then one cycle per interval.
    pub async fn run(self: Arc<Self>, every: Duration) {
        info!(interval = ?every, "starting sync scheduler");

        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if self.cancel.load(Ordering::Relaxed) {
                info!("sync scheduler stopped");
                return;
            }
            self.trigger().await;
        }
    }
}

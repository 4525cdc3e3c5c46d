//! Periodic analysis loop
//!
//! Polls the frame store on a fixed interval and runs the bench cycle
//! whenever new frames have been recorded since the previous tick.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{BenchAnalyzer, PipelineError};
use crate::storage::{FrameCursor, FrameStore};
use crate::types::BenchSnapshot;

/// Counters for one loop run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub ticks: u64,
    pub cycles: u64,
    /// Ticks skipped because nothing new was recorded
    pub idle_ticks: u64,
}

/// Owns the state for periodic bench analysis.
///
/// Built with [`new()`](AnalysisLoop::new), then consumed by
/// [`run()`](AnalysisLoop::run).
pub struct AnalysisLoop {
    analyzer: BenchAnalyzer,
    store: FrameStore,
    interval: Duration,
    cancel_token: CancellationToken,
    cursor: FrameCursor,
    max_cycles: Option<u64>,
}

impl AnalysisLoop {
    pub fn new(
        analyzer: BenchAnalyzer,
        store: FrameStore,
        interval: Duration,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            analyzer,
            store,
            interval: interval.max(Duration::from_millis(1)),
            cancel_token,
            cursor: FrameCursor::new(),
            max_cycles: None,
        }
    }

    /// Stop after `cycles` completed bench cycles.
    pub fn with_max_cycles(mut self, cycles: u64) -> Self {
        self.max_cycles = Some(cycles);
        self
    }

    /// Run until cancelled (or `max_cycles` is reached), handing each
    /// snapshot to `on_snapshot`.
    pub async fn run<F>(mut self, mut on_snapshot: F) -> Result<LoopStats, PipelineError>
    where
        F: FnMut(&BenchSnapshot),
    {
        let mut stats = LoopStats::default();
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(
            table = self.analyzer.table(),
            frames = self.analyzer.frames_per_analysis(),
            interval_ms = self.interval.as_millis() as u64,
            "Analysis loop started"
        );

        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("Analysis loop cancelled");
                    break;
                }
                _ = ticker.tick() => {}
            }
            stats.ticks += 1;

            // Newest frame only: enough to tell whether anything changed.
            let fresh = self
                .store
                .fetch_new_frames(self.analyzer.table(), 1, &mut self.cursor)?;
            if fresh.is_empty() {
                stats.idle_ticks += 1;
                debug!(last_seen = ?self.cursor.last_seen(), "No new frames");
                continue;
            }

            let snapshot = self.analyzer.poll(&self.store)?;
            stats.cycles += 1;
            on_snapshot(&snapshot);

            if self.max_cycles.is_some_and(|max| stats.cycles >= max) {
                break;
            }
        }

        info!(
            ticks = stats.ticks,
            cycles = stats.cycles,
            idle = stats.idle_ticks,
            "Analysis loop finished"
        );
        Ok(stats)
    }
}

// =============================================================================
// Application State
// =============================================================================
//
// Shared by the HTTP trigger and the optional scheduler via `Arc<AppState>`.
//
// Thread safety:
//   - A tokio mutex serialises scan cycles, so a trigger and a scheduled run
//     never overlap.
//   - parking_lot::RwLock for the last-cycle summary read by /health.
// =============================================================================

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use crate::scanner::{ScanReport, Scanner};

/// Public, error-free digest of a finished cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleSummary {
    pub cycle_id: Uuid,
    pub finished_at: DateTime<Utc>,
    pub symbols: usize,
}

impl From<&ScanReport> for CycleSummary {
    fn from(report: &ScanReport) -> Self {
        Self {
            cycle_id: report.cycle_id,
            finished_at: report.finished_at,
            symbols: report.outcomes.len(),
        }
    }
}

pub struct AppState {
    pub scanner: Arc<Scanner>,
    /// Bearer token required by the trigger route, if configured.
    pub trigger_token: Option<String>,
    cycle_lock: tokio::sync::Mutex<()>,
    last_cycle: RwLock<Option<CycleSummary>>,
    /// Instant when the service was started. Used for uptime.
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(scanner: Arc<Scanner>, trigger_token: Option<String>) -> Self {
        Self {
            scanner,
            trigger_token,
            cycle_lock: tokio::sync::Mutex::new(()),
            last_cycle: RwLock::new(None),
            start_time: std::time::Instant::now(),
        }
    }

    /// Run one cycle, waiting for any cycle already in progress to finish.
    pub async fn run_cycle(&self) -> ScanReport {
        let _guard = self.cycle_lock.lock().await;
        let report = self.scanner.run_cycle().await;
        *self.last_cycle.write() = Some(CycleSummary::from(&report));
        report
    }

    pub fn last_cycle(&self) -> Option<CycleSummary> {
        self.last_cycle.read().clone()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::ScanSettings;
    use crate::test_support::{MockSource, RecordingDispatcher};
    use crate::types::Timeframe;

    fn state() -> AppState {
        let settings = ScanSettings {
            fixed_symbols: vec!["AUSDT".into(), "BUSDT".into()],
            top_volume_limit: 0,
            timeframe: Timeframe::H1,
            candle_limit: 100,
            channel_id: "1".into(),
            concurrency: 1,
            suppress_repeat_alerts: false,
        };
        let scanner = Scanner::new(
            Arc::new(MockSource::new()),
            Arc::new(RecordingDispatcher::default()),
            settings,
        );
        AppState::new(Arc::new(scanner), None)
    }

    #[tokio::test]
    async fn last_cycle_recorded_after_run() {
        let state = state();
        assert!(state.last_cycle().is_none());

        let report = state.run_cycle().await;
        let summary = state.last_cycle().expect("summary stored");
        assert_eq!(summary.cycle_id, report.cycle_id);
        assert_eq!(summary.symbols, 2);
    }

    #[tokio::test]
    async fn concurrent_runs_are_serialised() {
        let state = Arc::new(state());
        let (a, b) = tokio::join!(state.run_cycle(), state.run_cycle());
        assert_ne!(a.cycle_id, b.cycle_id);
        // Cycles never interleave: one finishes before the other starts.
        assert!(a.finished_at <= b.started_at || b.finished_at <= a.started_at);
    }

    #[tokio::test]
    async fn scheduled_cycle_runs_on_spawned_task() {
        let state = Arc::new(state());
        let sched = state.clone();
        let report = tokio::spawn(async move { sched.run_cycle().await })
            .await
            .unwrap();
        assert_eq!(state.last_cycle().map(|c| c.cycle_id), Some(report.cycle_id));
    }
}

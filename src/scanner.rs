// =============================================================================
// Scan Orchestrator
// =============================================================================
//
// One cycle = build the watchlist, then for every symbol exactly once:
//
//   fetch candles -> IndicatorFrame -> crossover rule -> alert on LONG/SHORT
//
// Each symbol is an isolated unit of work. Fetch failures, short histories
// and failed deliveries are logged and recorded in the report; none of them
// stop the cycle. Symbols are driven through a bounded stream; with the
// default bound of 1 they run strictly one after another.
// =============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use futures_util::stream::{self, StreamExt};
use parking_lot::Mutex;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::ScannerConfig;
use crate::error::ScanError;
use crate::indicators::{IndicatorFrame, MIN_HISTORY};
use crate::market_data::MarketDataSource;
use crate::notify::{format_alert, AlertDispatcher};
use crate::signals::{detect_latest, Signal};
use crate::types::Timeframe;
use crate::watchlist::build_watchlist;

// =============================================================================
// Settings
// =============================================================================

/// Everything a cycle needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub fixed_symbols: Vec<String>,
    pub top_volume_limit: usize,
    pub timeframe: Timeframe,
    pub candle_limit: u32,
    /// Destination of alert messages.
    pub channel_id: String,
    pub concurrency: usize,
    pub suppress_repeat_alerts: bool,
}

impl ScanSettings {
    pub fn from_config(config: &ScannerConfig, channel_id: impl Into<String>) -> Self {
        Self {
            fixed_symbols: config.fixed_symbols.clone(),
            top_volume_limit: config.top_volume_limit,
            timeframe: config.timeframe,
            candle_limit: config.candle_limit,
            channel_id: channel_id.into(),
            concurrency: config.scan_concurrency,
            suppress_repeat_alerts: config.suppress_repeat_alerts,
        }
    }
}

// =============================================================================
// Report
// =============================================================================

/// What happened to one symbol in one cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    NoSignal,
    Alerted { signal: Signal },
    /// Same signal as the last one fired for this symbol; not re-sent.
    Suppressed { signal: Signal },
    AlertFailed { signal: Signal, error: String },
    Skipped { error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolOutcome {
    pub symbol: String,
    pub outcome: Outcome,
}

/// Result of one complete cycle.
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// The volume ranking was unavailable; only fixed symbols were scanned.
    pub watchlist_degraded: bool,
    pub outcomes: Vec<SymbolOutcome>,
}

impl ScanReport {
    #[cfg(test)]
    pub fn outcome_for(&self, symbol: &str) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|o| o.symbol == symbol)
            .map(|o| &o.outcome)
    }

    /// Symbols whose alert was delivered, with the signal sent.
    pub fn alerts(&self) -> Vec<(&str, Signal)> {
        self.outcomes
            .iter()
            .filter_map(|o| match o.outcome {
                Outcome::Alerted { signal } => Some((o.symbol.as_str(), signal)),
                _ => None,
            })
            .collect()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Skipped { .. }))
            .count()
    }
}

// =============================================================================
// Scanner
// =============================================================================

pub struct Scanner {
    source: Arc<dyn MarketDataSource>,
    dispatcher: Arc<dyn AlertDispatcher>,
    settings: ScanSettings,
    /// Last fired signal per symbol; only consulted when repeat suppression
    /// is enabled.
    last_fired: Mutex<HashMap<String, Signal>>,
}

impl Scanner {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        dispatcher: Arc<dyn AlertDispatcher>,
        settings: ScanSettings,
    ) -> Self {
        Self {
            source,
            dispatcher,
            settings,
            last_fired: Mutex::new(HashMap::new()),
        }
    }

    /// Run one full cycle. Always completes; per-symbol failures end up in
    /// the report and the logs.
    pub async fn run_cycle(&self) -> ScanReport {
        let cycle_id = Uuid::new_v4();
        let span = info_span!("scan_cycle", %cycle_id, exchange = self.source.name());
        self.run_cycle_inner(cycle_id).instrument(span).await
    }

    async fn run_cycle_inner(&self, cycle_id: Uuid) -> ScanReport {
        let started_at = Utc::now();

        let watchlist = build_watchlist(
            &self.settings.fixed_symbols,
            self.source.as_ref(),
            self.settings.top_volume_limit,
        )
        .await;

        info!(
            symbols = watchlist.symbols.len(),
            degraded = watchlist.degraded,
            timeframe = %self.settings.timeframe,
            "scan cycle started"
        );

        let outcomes: Vec<SymbolOutcome> = stream::iter(watchlist.symbols.clone())
            .map(|symbol| async move { self.scan_symbol(&symbol).await })
            .buffered(self.settings.concurrency.max(1))
            .collect()
            .await;

        let report = ScanReport {
            cycle_id,
            started_at,
            finished_at: Utc::now(),
            watchlist_degraded: watchlist.degraded,
            outcomes,
        };

        info!(
            scanned = report.outcomes.len(),
            alerts = report.alerts().len(),
            skipped = report.skipped_count(),
            elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
            "scan cycle completed"
        );

        report
    }

    /// Scan a single symbol in isolation.
    pub async fn scan_symbol(&self, symbol: &str) -> SymbolOutcome {
        let outcome = match self.evaluate_symbol(symbol).await {
            Err(e) => {
                warn!(symbol, error = %e, "symbol skipped");
                Outcome::Skipped {
                    error: e.to_string(),
                }
            }
            Ok(signal) if signal.is_actionable() => self.dispatch(symbol, signal).await,
            Ok(_) => {
                debug!(symbol, "no signal");
                self.last_fired.lock().remove(symbol);
                Outcome::NoSignal
            }
        };

        SymbolOutcome {
            symbol: symbol.to_string(),
            outcome,
        }
    }

    async fn evaluate_symbol(&self, symbol: &str) -> Result<Signal, ScanError> {
        let candles = self
            .source
            .fetch_candles(symbol, self.settings.timeframe, self.settings.candle_limit)
            .await?;

        if candles.len() < MIN_HISTORY {
            return Err(ScanError::InsufficientHistory {
                symbol: symbol.to_string(),
                available: candles.len(),
                required: MIN_HISTORY,
            });
        }

        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let frame = IndicatorFrame::compute(&closes);
        if let Some(bar) = frame.bars().last() {
            debug!(symbol, ?bar, "latest indicators");
        }
        Ok(detect_latest(&frame))
    }

    async fn dispatch(&self, symbol: &str, signal: Signal) -> Outcome {
        if self.settings.suppress_repeat_alerts
            && self.last_fired.lock().get(symbol) == Some(&signal)
        {
            info!(symbol, %signal, "repeat signal suppressed");
            return Outcome::Suppressed { signal };
        }

        let message = format_alert(signal, symbol, &Local::now(), self.source.name());
        info!(symbol, %signal, "signal detected");

        match self
            .dispatcher
            .send_message(&self.settings.channel_id, &message)
            .await
        {
            Ok(()) => {
                if self.settings.suppress_repeat_alerts {
                    self.last_fired.lock().insert(symbol.to_string(), signal);
                }
                Outcome::Alerted { signal }
            }
            Err(e) => {
                error!(symbol, %signal, error = %e, "alert delivery failed");
                Outcome::AlertFailed {
                    signal,
                    error: e.to_string(),
                }
            }
        }
    }
}

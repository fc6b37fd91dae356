// Shared fixtures for unit tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::ScanError;
use crate::market_data::{Candle, MarketDataSource};
use crate::notify::AlertDispatcher;
use crate::types::Timeframe;

/// Steady climb for 70 bars, a six-bar pullback, then a sharp bounce. At 82
/// bars the last bar turns the MACD histogram positive under a bullish EMA
/// stack.
pub fn long_crossover_closes() -> Vec<f64> {
    (0..82)
        .map(|i| {
            if i < 70 {
                100.0 + i as f64
            } else if i < 76 {
                169.0 - (i - 69) as f64 * 1.5
            } else {
                169.0 - 9.0 + (i - 75) as f64 * 3.0
            }
        })
        .collect()
}

/// Mirror image of [`long_crossover_closes`]: fires SHORT on the last bar.
pub fn short_crossover_closes() -> Vec<f64> {
    long_crossover_closes().into_iter().map(|c| 300.0 - c).collect()
}

/// Hourly candles carrying `closes`.
pub fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Candle {
            open_time: 1_700_000_000_000 + i as i64 * 3_600_000,
            open: close,
            high: close + 0.5,
            low: close - 0.5,
            close,
            volume: 1_000.0,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Collaborator doubles
// ---------------------------------------------------------------------------

/// In-memory market data: canned candles per symbol and a canned ranking.
pub struct MockSource {
    candles: HashMap<String, Result<Vec<Candle>, ScanError>>,
    ranking: Result<Vec<String>, ScanError>,
    pub fetched: Mutex<Vec<String>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            candles: HashMap::new(),
            ranking: Ok(Vec::new()),
            fetched: Mutex::new(Vec::new()),
        }
    }

    pub fn with_candles(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.candles.insert(symbol.to_string(), Ok(candles));
        self
    }

    pub fn with_failure(mut self, symbol: &str, message: &str) -> Self {
        self.candles.insert(
            symbol.to_string(),
            Err(ScanError::DataFetch {
                target: symbol.to_string(),
                message: message.to_string(),
            }),
        );
        self
    }

    pub fn with_ranking(mut self, symbols: &[&str]) -> Self {
        self.ranking = Ok(symbols.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn with_ranking_failure(mut self) -> Self {
        self.ranking = Err(ScanError::DataFetch {
            target: "volume ranking".into(),
            message: "503 Service Unavailable".into(),
        });
        self
    }
}

#[async_trait]
impl MarketDataSource for MockSource {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn fetch_candles(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        limit: u32,
    ) -> Result<Vec<Candle>, ScanError> {
        self.fetched.lock().push(symbol.to_string());
        match self.candles.get(symbol) {
            Some(Ok(candles)) => {
                let start = candles.len().saturating_sub(limit as usize);
                Ok(candles[start..].to_vec())
            }
            Some(Err(e)) => Err(e.clone()),
            None => Err(ScanError::DataFetch {
                target: symbol.to_string(),
                message: "unknown symbol".into(),
            }),
        }
    }

    async fn fetch_top_volume_symbols(&self, limit: usize) -> Result<Vec<String>, ScanError> {
        self.ranking
            .clone()
            .map(|symbols| symbols.into_iter().take(limit).collect())
    }
}

/// Dispatcher that records every message; optionally fails every send.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub fail: bool,
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingDispatcher {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(_, text)| text.clone()).collect()
    }
}

#[async_trait]
impl AlertDispatcher for RecordingDispatcher {
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<(), ScanError> {
        self.sent
            .lock()
            .push((channel_id.to_string(), text.to_string()));
        if self.fail {
            return Err(ScanError::Notification("401 Unauthorized".into()));
        }
        Ok(())
    }
}

// =============================================================================
// Market Data — candle model and exchange adapters
// =============================================================================

pub mod binance;
pub mod bybit;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::error::ScanError;
use crate::types::{Exchange, Timeframe};

pub use binance::BinanceClient;
pub use bybit::BybitClient;

/// Request timeout shared by both adapters.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// A single OHLCV candle. Series are ordered oldest-first with strictly
/// increasing `open_time`.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// 24-hour ticker reduced to what the volume ranking needs.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerVolume {
    pub symbol: String,
    /// Traded value in the quote asset over the last 24 hours.
    pub quote_volume: f64,
}

// ---------------------------------------------------------------------------
// Capability interface
// ---------------------------------------------------------------------------

/// Source of candles and volume rankings for one exchange.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Label used in logs and alert text.
    fn name(&self) -> &'static str;

    /// Up to `limit` most recent candles for `symbol`, oldest first.
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: u32,
    ) -> Result<Vec<Candle>, ScanError>;

    /// Up to `limit` symbols ranked by descending 24h quote volume.
    async fn fetch_top_volume_symbols(&self, limit: usize) -> Result<Vec<String>, ScanError>;
}

/// Build the adapter selected by configuration.
pub fn connect(
    exchange: Exchange,
    quote_asset: &str,
    api_key: Option<String>,
    api_secret: Option<String>,
) -> Result<Arc<dyn MarketDataSource>> {
    let source: Arc<dyn MarketDataSource> = match exchange {
        Exchange::Bybit => Arc::new(BybitClient::new(quote_asset, api_key, api_secret)?),
        Exchange::Binance => Arc::new(BinanceClient::new(quote_asset, api_key)?),
    };
    Ok(source)
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn http_client(default_headers: reqwest::header::HeaderMap) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .default_headers(default_headers)
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("failed to build HTTP client")
}

/// Send `request`, fail on non-2xx, and return the JSON body.
async fn send_json(request: reqwest::RequestBuilder, what: &str) -> Result<serde_json::Value> {
    let resp = request
        .send()
        .await
        .with_context(|| format!("{what} request failed"))?;

    let status = resp.status();
    let text = resp
        .text()
        .await
        .with_context(|| format!("failed to read {what} response"))?;

    decode_body(status, &text, what)
}

/// Status first, so an HTML error page still reports the HTTP status.
fn decode_body(status: reqwest::StatusCode, text: &str, what: &str) -> Result<serde_json::Value> {
    if !status.is_success() {
        anyhow::bail!("{what} returned {status}: {}", text.trim());
    }
    serde_json::from_str(text).with_context(|| format!("failed to parse {what} response"))
}

/// Parse a JSON value that may be either a string or a number into `f64`.
fn parse_str_f64(val: &serde_json::Value) -> Result<f64> {
    if let Some(s) = val.as_str() {
        s.parse::<f64>()
            .with_context(|| format!("failed to parse '{s}' as f64"))
    } else if let Some(n) = val.as_f64() {
        Ok(n)
    } else {
        anyhow::bail!("expected string or number, got: {val}")
    }
}

/// Parse a millisecond timestamp sent as a string or an integer.
fn parse_time_ms(val: &serde_json::Value) -> Result<i64> {
    if let Some(s) = val.as_str() {
        s.parse::<i64>()
            .with_context(|| format!("failed to parse '{s}' as timestamp"))
    } else {
        val.as_i64()
            .with_context(|| format!("expected timestamp, got: {val}"))
    }
}

/// Sort oldest-first and drop repeated timestamps so `open_time` strictly
/// increases.
fn into_ordered(mut candles: Vec<Candle>) -> Vec<Candle> {
    candles.sort_by_key(|c| c.open_time);
    candles.dedup_by_key(|c| c.open_time);
    candles
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn candle(open_time: i64, close: f64) -> Candle {
        Candle {
            open_time,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
        }
    }

    #[test]
    fn ordering_sorts_and_dedups() {
        let ordered = into_ordered(vec![candle(3, 3.0), candle(1, 1.0), candle(3, 3.5), candle(2, 2.0)]);
        let times: Vec<i64> = ordered.iter().map(|c| c.open_time).collect();
        assert_eq!(times, vec![1, 2, 3]);
    }

    #[test]
    fn error_status_wins_over_unparseable_body() {
        let err = decode_body(
            reqwest::StatusCode::BAD_GATEWAY,
            "<html><body>502 Bad Gateway</body></html>\n",
            "klines",
        )
        .unwrap_err()
        .to_string();
        assert!(err.contains("502 Bad Gateway"));
        assert!(err.contains("<html>"));
        assert!(!err.contains("failed to parse"));
    }

    #[test]
    fn success_body_is_parsed() {
        let value = decode_body(reqwest::StatusCode::OK, r#"{"retCode":0}"#, "tickers").unwrap();
        assert_eq!(value["retCode"], 0);
        let err = decode_body(reqwest::StatusCode::OK, "not json", "tickers").unwrap_err();
        assert!(err.to_string().contains("failed to parse tickers response"));
    }

    #[test]
    fn parse_numbers_from_strings_or_numbers() {
        assert_eq!(parse_str_f64(&json!("1.5")).unwrap(), 1.5);
        assert_eq!(parse_str_f64(&json!(2.0)).unwrap(), 2.0);
        assert!(parse_str_f64(&json!(null)).is_err());
        assert_eq!(parse_time_ms(&json!("1700000000000")).unwrap(), 1_700_000_000_000);
        assert_eq!(parse_time_ms(&json!(42)).unwrap(), 42);
    }
}

// =============================================================================
// Binance REST adapter — spot klines and 24h tickers
// =============================================================================
//
// Only public endpoints are used. An API key, when configured, is sent as the
// X-MBX-APIKEY header so requests are attributed to the account.
// =============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, instrument, warn};

use super::{
    http_client, into_ordered, parse_str_f64, parse_time_ms, send_json, Candle,
    MarketDataSource, TickerVolume,
};
use crate::error::ScanError;
use crate::types::Timeframe;
use crate::watchlist::rank_by_quote_volume;

const BASE_URL: &str = "https://api.binance.com";
const MAX_KLINE_LIMIT: u32 = 1000;

/// Binance spot market-data client.
#[derive(Clone)]
pub struct BinanceClient {
    has_api_key: bool,
    quote_asset: String,
    base_url: String,
    client: reqwest::Client,
}

impl BinanceClient {
    pub fn new(quote_asset: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        let mut has_api_key = false;
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            match HeaderValue::from_str(&key) {
                Ok(val) => {
                    default_headers.insert("X-MBX-APIKEY", val);
                    has_api_key = true;
                }
                Err(_) => warn!("Binance API key is not a valid header value — ignoring it"),
            }
        }

        debug!("BinanceClient initialised (base_url={BASE_URL})");

        Ok(Self {
            has_api_key,
            quote_asset: quote_asset.into(),
            base_url: BASE_URL.to_string(),
            client: http_client(default_headers)?,
        })
    }
}

// -----------------------------------------------------------------------------
// Response parsing
// -----------------------------------------------------------------------------

/// Parse the array-of-arrays `/api/v3/klines` response.
///
/// Array indices:
///   [0] openTime, [1] open, [2] high, [3] low, [4] close, [5] volume,
///   [6] closeTime, [7] quoteAssetVolume, ...
fn parse_klines(body: &serde_json::Value) -> Result<Vec<Candle>> {
    let raw = body.as_array().context("klines response is not an array")?;

    let mut candles = Vec::with_capacity(raw.len());
    for entry in raw {
        let arr = entry.as_array().context("kline entry is not an array")?;
        if arr.len() < 6 {
            warn!("skipping malformed kline entry with {} elements", arr.len());
            continue;
        }
        candles.push(Candle {
            open_time: parse_time_ms(&arr[0])?,
            open: parse_str_f64(&arr[1])?,
            high: parse_str_f64(&arr[2])?,
            low: parse_str_f64(&arr[3])?,
            close: parse_str_f64(&arr[4])?,
            volume: parse_str_f64(&arr[5])?,
        });
    }
    Ok(into_ordered(candles))
}

fn parse_tickers(body: &serde_json::Value) -> Result<Vec<TickerVolume>> {
    let raw = body
        .as_array()
        .context("ticker/24hr response is not an array")?;

    Ok(raw
        .iter()
        .filter_map(|t| {
            Some(TickerVolume {
                symbol: t["symbol"].as_str()?.to_string(),
                quote_volume: parse_str_f64(&t["quoteVolume"]).unwrap_or(0.0),
            })
        })
        .collect())
}

#[async_trait]
impl MarketDataSource for BinanceClient {
    fn name(&self) -> &'static str {
        "Binance"
    }

    #[instrument(skip(self), name = "binance::fetch_candles")]
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: u32,
    ) -> Result<Vec<Candle>, ScanError> {
        let url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url,
            symbol,
            timeframe.as_str(),
            limit.min(MAX_KLINE_LIMIT)
        );

        let candles = send_json(self.client.get(&url), "GET /api/v3/klines")
            .await
            .and_then(|body| parse_klines(&body))
            .map_err(|e| ScanError::data_fetch(symbol, e))?;

        debug!(symbol, %timeframe, count = candles.len(), "klines fetched");
        Ok(candles)
    }

    #[instrument(skip(self), name = "binance::fetch_top_volume_symbols")]
    async fn fetch_top_volume_symbols(&self, limit: usize) -> Result<Vec<String>, ScanError> {
        let url = format!("{}/api/v3/ticker/24hr", self.base_url);

        let tickers = send_json(self.client.get(&url), "GET /api/v3/ticker/24hr")
            .await
            .and_then(|body| parse_tickers(&body))
            .map_err(|e| ScanError::data_fetch("volume ranking", e))?;

        let ranked = rank_by_quote_volume(tickers, &self.quote_asset, limit);
        debug!(count = ranked.len(), "top volume symbols ranked");
        Ok(ranked)
    }
}

impl std::fmt::Debug for BinanceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceClient")
            .field("api_key", &if self.has_api_key { "<redacted>" } else { "<none>" })
            .field("quote_asset", &self.quote_asset)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn klines_parse_array_of_arrays() {
        let body = json!([
            [1700000000000i64, "37000.00", "37050.00", "36990.00", "37020.00", "123.4",
             1700003599999i64, "4567890.1", 1500, "60.1", "2224455.6", "0"],
            [1700003600000i64, "37020.00", "37100.00", "37000.00", "37090.00", "98.7",
             1700007199999i64, "3650000.0", 1200, "50.2", "1860000.0", "0"]
        ]);
        let candles = parse_klines(&body).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[1].open_time, 1_700_003_600_000);
        assert!((candles[1].close - 37090.0).abs() < f64::EPSILON);
    }

    #[test]
    fn klines_reject_non_array() {
        assert!(parse_klines(&json!({ "code": -1121, "msg": "Invalid symbol." })).is_err());
    }

    #[test]
    fn tickers_use_quote_volume() {
        let body = json!([
            { "symbol": "BTCUSDT", "volume": "10.0", "quoteVolume": "370000.0" },
            { "symbol": "ETHUSDT", "volume": "200.0", "quoteVolume": "400000.0" }
        ]);
        let ranked = rank_by_quote_volume(parse_tickers(&body).unwrap(), "USDT", 5);
        assert_eq!(ranked, vec!["ETHUSDT".to_string(), "BTCUSDT".to_string()]);
    }
}

// =============================================================================
// Bybit v5 REST adapter — spot klines and 24h tickers
// =============================================================================
//
// Both endpoints are public. When API credentials are configured every request
// is additionally signed with the v5 header scheme:
//
//   X-BAPI-SIGN = hex(HMAC_SHA256(secret, timestamp + api_key + recv_window + query))
//
// SECURITY: the secret is never logged or serialized.
// =============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, instrument, warn};

use super::{
    http_client, into_ordered, parse_str_f64, parse_time_ms, send_json, Candle,
    MarketDataSource, TickerVolume,
};
use crate::error::ScanError;
use crate::types::Timeframe;
use crate::watchlist::rank_by_quote_volume;

type HmacSha256 = Hmac<Sha256>;

const BASE_URL: &str = "https://api.bybit.com";
/// Receive window sent with signed requests (milliseconds).
const RECV_WINDOW: u64 = 5000;
/// Bybit caps spot klines at 1000 per request.
const MAX_KLINE_LIMIT: u32 = 1000;

#[derive(Clone)]
struct Credentials {
    api_key: String,
    secret: String,
}

/// Bybit spot market-data client.
#[derive(Clone)]
pub struct BybitClient {
    credentials: Option<Credentials>,
    quote_asset: String,
    base_url: String,
    client: reqwest::Client,
}

impl BybitClient {
    /// Create a client. Credentials are used only when both halves are set.
    pub fn new(
        quote_asset: impl Into<String>,
        api_key: Option<String>,
        secret: Option<String>,
    ) -> Result<Self> {
        let credentials = match (api_key, secret) {
            (Some(api_key), Some(secret)) if !api_key.is_empty() && !secret.is_empty() => {
                Some(Credentials { api_key, secret })
            }
            (Some(_), None) | (None, Some(_)) => {
                warn!("only one of the Bybit API key/secret is set — sending unsigned requests");
                None
            }
            _ => None,
        };

        debug!(signed = credentials.is_some(), "BybitClient initialised (base_url={BASE_URL})");

        Ok(Self {
            credentials,
            quote_asset: quote_asset.into(),
            base_url: BASE_URL.to_string(),
            client: http_client(reqwest::header::HeaderMap::new())?,
        })
    }

    // -------------------------------------------------------------------------
    // Signing helpers
    // -------------------------------------------------------------------------

    fn sign(secret: &str, payload: &str) -> String {
        // HMAC accepts keys of any length, so this cannot fail.
        let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn timestamp_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }

    /// GET `path?query`, signing the request when credentials are present,
    /// and unwrap Bybit's `{retCode, retMsg, result}` envelope.
    async fn get_result(&self, path: &str, query: &str) -> Result<serde_json::Value> {
        let url = format!("{}{}?{}", self.base_url, path, query);
        let mut request = self.client.get(&url);

        if let Some(creds) = &self.credentials {
            let ts = Self::timestamp_ms();
            let payload = format!("{ts}{}{RECV_WINDOW}{query}", creds.api_key);
            request = request
                .header("X-BAPI-API-KEY", &creds.api_key)
                .header("X-BAPI-TIMESTAMP", ts.to_string())
                .header("X-BAPI-RECV-WINDOW", RECV_WINDOW.to_string())
                .header("X-BAPI-SIGN", Self::sign(&creds.secret, &payload));
        }

        let body = send_json(request, &format!("GET {path}")).await?;
        unwrap_envelope(body, path)
    }
}

// -----------------------------------------------------------------------------
// Response parsing
// -----------------------------------------------------------------------------

fn unwrap_envelope(mut body: serde_json::Value, path: &str) -> Result<serde_json::Value> {
    let code = body["retCode"]
        .as_i64()
        .with_context(|| format!("{path} response missing retCode"))?;
    if code != 0 {
        anyhow::bail!(
            "Bybit {path} returned retCode {code}: {}",
            body["retMsg"].as_str().unwrap_or("")
        );
    }
    Ok(body["result"].take())
}

/// Parse `result.list` of `/v5/market/kline` (newest first) into an
/// oldest-first series.
///
/// Entry layout: [startTime, open, high, low, close, volume, turnover]
fn parse_klines(result: &serde_json::Value) -> Result<Vec<Candle>> {
    let raw = result["list"]
        .as_array()
        .context("kline result missing 'list' array")?;

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

/// Parse `result.list` of `/v5/market/tickers`. Quote volume is `turnover24h`;
/// a missing or unparseable value counts as zero.
fn parse_tickers(result: &serde_json::Value) -> Result<Vec<TickerVolume>> {
    let raw = result["list"]
        .as_array()
        .context("tickers result missing 'list' array")?;

    Ok(raw
        .iter()
        .filter_map(|t| {
            let symbol = t["symbol"].as_str()?.to_string();
            let quote_volume = parse_str_f64(&t["turnover24h"]).unwrap_or(0.0);
            Some(TickerVolume {
                symbol,
                quote_volume,
            })
        })
        .collect())
}

#[async_trait]
impl MarketDataSource for BybitClient {
    fn name(&self) -> &'static str {
        "Bybit"
    }

    #[instrument(skip(self), name = "bybit::fetch_candles")]
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: u32,
    ) -> Result<Vec<Candle>, ScanError> {
        let query = format!(
            "category=spot&symbol={}&interval={}&limit={}",
            symbol,
            timeframe.bybit_interval(),
            limit.min(MAX_KLINE_LIMIT)
        );
        let result = self
            .get_result("/v5/market/kline", &query)
            .await
            .and_then(|r| parse_klines(&r))
            .map_err(|e| ScanError::data_fetch(symbol, e))?;

        debug!(symbol, %timeframe, count = result.len(), "klines fetched");
        Ok(result)
    }

    #[instrument(skip(self), name = "bybit::fetch_top_volume_symbols")]
    async fn fetch_top_volume_symbols(&self, limit: usize) -> Result<Vec<String>, ScanError> {
        let tickers = self
            .get_result("/v5/market/tickers", "category=spot")
            .await
            .and_then(|r| parse_tickers(&r))
            .map_err(|e| ScanError::data_fetch("volume ranking", e))?;

        let ranked = rank_by_quote_volume(tickers, &self.quote_asset, limit);
        debug!(count = ranked.len(), "top volume symbols ranked");
        Ok(ranked)
    }
}

impl std::fmt::Debug for BybitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BybitClient")
            .field(
                "credentials",
                &self.credentials.as_ref().map(|_| "<redacted>"),
            )
            .field("quote_asset", &self.quote_asset)
            .field("base_url", &self.base_url)
            .finish()
    }
}

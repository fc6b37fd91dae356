// =============================================================================
// Scanner Configuration
// =============================================================================
//
// `ScannerConfig` holds every tunable and is read from an optional JSON file,
// then overridden from the environment. All fields carry `#[serde(default)]`
// so a partial file only needs the keys it changes.
//
// Credentials live in `Secrets`, read from the environment only. A missing
// bot token or channel id is fatal before any scan runs.
// =============================================================================

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;
use crate::indicators::MIN_HISTORY;
use crate::types::{Exchange, Timeframe};

/// Default path of the optional JSON config file.
pub const DEFAULT_CONFIG_PATH: &str = "scanner_config.json";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_fixed_symbols() -> Vec<String> {
    vec![
        "XRP/USDT".to_string(),
        "DOGE/USDT".to_string(),
        "SOL/USDT".to_string(),
        "PEPE/USDT".to_string(),
        "SUI/USDT".to_string(),
    ]
}

fn default_top_volume_limit() -> usize {
    20
}

fn default_quote_asset() -> String {
    "USDT".to_string()
}

fn default_candle_limit() -> u32 {
    100
}

fn default_scan_concurrency() -> usize {
    1
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

// =============================================================================
// ScannerConfig
// =============================================================================

/// Non-secret scanner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Exchange whose market data is scanned.
    #[serde(default)]
    pub exchange: Exchange,

    /// Symbols scanned every cycle regardless of volume.
    #[serde(default = "default_fixed_symbols")]
    pub fixed_symbols: Vec<String>,

    /// Size of the dynamic top-by-volume list (0 disables it).
    #[serde(default = "default_top_volume_limit")]
    pub top_volume_limit: usize,

    /// Only pairs quoted in this asset take part in the volume ranking.
    #[serde(default = "default_quote_asset")]
    pub quote_asset: String,

    #[serde(default)]
    pub timeframe: Timeframe,

    /// Candles fetched per symbol; must cover the indicator warm-up.
    #[serde(default = "default_candle_limit")]
    pub candle_limit: u32,

    /// Symbols scanned at once. 1 means strictly sequential.
    #[serde(default = "default_scan_concurrency")]
    pub scan_concurrency: usize,

    /// Run a cycle every N seconds in the background. `None` = HTTP trigger only.
    #[serde(default)]
    pub scan_interval_secs: Option<u64>,

    /// Suppress an alert identical to the last one fired for the same symbol.
    #[serde(default)]
    pub suppress_repeat_alerts: bool,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            exchange: Exchange::default(),
            fixed_symbols: default_fixed_symbols(),
            top_volume_limit: default_top_volume_limit(),
            quote_asset: default_quote_asset(),
            timeframe: Timeframe::default(),
            candle_limit: default_candle_limit(),
            scan_concurrency: default_scan_concurrency(),
            scan_interval_secs: None,
            suppress_repeat_alerts: false,
            bind_addr: default_bind_addr(),
        }
    }
}

impl ScannerConfig {
    /// Load from a JSON file. A missing file yields the defaults with a
    /// warning; an unreadable or malformed file is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "config file not found, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })
            }
        };

        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

        info!(path = %path.display(), exchange = %config.exchange, "scanner config loaded");
        Ok(config)
    }

    /// Apply overrides from a variable lookup (normally `std::env::var`).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(v) = get("SCANNER_EXCHANGE") {
            self.exchange = v.parse().map_err(|message| ConfigError::Invalid {
                key: "SCANNER_EXCHANGE",
                message,
            })?;
        }
        if let Some(v) = get("SCANNER_SYMBOLS") {
            self.fixed_symbols = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(v) = get("SCANNER_TOP_N") {
            self.top_volume_limit = parse_number("SCANNER_TOP_N", &v)?;
        }
        if let Some(v) = get("SCANNER_TIMEFRAME") {
            self.timeframe = v.parse().map_err(|message| ConfigError::Invalid {
                key: "SCANNER_TIMEFRAME",
                message,
            })?;
        }
        if let Some(v) = get("SCANNER_CANDLE_LIMIT") {
            self.candle_limit = parse_number("SCANNER_CANDLE_LIMIT", &v)?;
        }
        if let Some(v) = get("SCANNER_INTERVAL_SECS") {
            self.scan_interval_secs = Some(parse_number("SCANNER_INTERVAL_SECS", &v)?);
        }
        if let Some(v) = get("PORT") {
            let port: u16 = parse_number("PORT", &v)?;
            self.bind_addr = format!("0.0.0.0:{port}");
        }
        Ok(())
    }

    /// Reject settings the scanner cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if (self.candle_limit as usize) < MIN_HISTORY {
            return Err(ConfigError::Invalid {
                key: "candle_limit",
                message: format!(
                    "{} candles cannot warm up the indicators (need at least {MIN_HISTORY})",
                    self.candle_limit
                ),
            });
        }
        if self.scan_concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "scan_concurrency",
                message: "must be at least 1".into(),
            });
        }
        if self.scan_interval_secs == Some(0) {
            return Err(ConfigError::Invalid {
                key: "scan_interval_secs",
                message: "must be at least 1 second".into(),
            });
        }
        if self.fixed_symbols.is_empty() && self.top_volume_limit == 0 {
            return Err(ConfigError::Invalid {
                key: "fixed_symbols",
                message: "no fixed symbols and the volume ranking is disabled".into(),
            });
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        message: format!("'{raw}': {e}"),
    })
}

// =============================================================================
// Secrets
// =============================================================================

/// Credentials read from the environment.
#[derive(Clone)]
pub struct Secrets {
    pub bot_token: String,
    pub chat_id: String,
    pub exchange_api_key: Option<String>,
    pub exchange_api_secret: Option<String>,
    /// Bearer token required on the trigger route, if set.
    pub trigger_token: Option<String>,
}

impl Secrets {
    /// Read credentials through `lookup` (normally `std::env::var`).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Ok(Self {
            bot_token: get("BOT_TOKEN").ok_or(ConfigError::Missing("BOT_TOKEN"))?,
            chat_id: get("CHAT_ID").ok_or(ConfigError::Missing("CHAT_ID"))?,
            exchange_api_key: get("EXCHANGE_API_KEY").or_else(|| get("BYBIT_API_KEY")),
            exchange_api_secret: get("EXCHANGE_API_SECRET").or_else(|| get("BYBIT_SECRET")),
            trigger_token: get("SCANNER_TRIGGER_TOKEN"),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("bot_token", &"<redacted>")
            .field("chat_id", &self.chat_id)
            .field("exchange_api_key", &self.exchange_api_key.as_ref().map(|_| "<redacted>"))
            .field("exchange_api_secret", &self.exchange_api_secret.as_ref().map(|_| "<redacted>"))
            .field("trigger_token", &self.trigger_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn default_config_has_expected_values() {
        let cfg = ScannerConfig::default();
        assert_eq!(cfg.exchange, Exchange::Bybit);
        assert_eq!(cfg.fixed_symbols.len(), 5);
        assert_eq!(cfg.fixed_symbols[0], "XRP/USDT");
        assert_eq!(cfg.top_volume_limit, 20);
        assert_eq!(cfg.timeframe, Timeframe::H1);
        assert_eq!(cfg.candle_limit, 100);
        assert_eq!(cfg.scan_concurrency, 1);
        assert!(cfg.scan_interval_secs.is_none());
        assert!(!cfg.suppress_repeat_alerts);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "exchange": "binance", "timeframe": "4h", "fixed_symbols": ["BTCUSDT"] }"#;
        let cfg: ScannerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.exchange, Exchange::Binance);
        assert_eq!(cfg.timeframe, Timeframe::H4);
        assert_eq!(cfg.fixed_symbols, vec!["BTCUSDT"]);
        assert_eq!(cfg.candle_limit, 100);
        assert_eq!(cfg.quote_asset, "USDT");
    }

    #[test]
    fn missing_file_uses_defaults() {
        let cfg = ScannerConfig::load("/nonexistent/scanner_config.json").unwrap();
        assert_eq!(cfg.top_volume_limit, 20);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("scanner_cfg_{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, "{ not json").unwrap();
        let err = ScannerConfig::load(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let mut cfg = ScannerConfig::default();
        cfg.apply_overrides(lookup(&[
            ("SCANNER_EXCHANGE", "Binance"),
            ("SCANNER_SYMBOLS", "btc/usdt, eth/usdt ,"),
            ("SCANNER_TOP_N", "5"),
            ("SCANNER_TIMEFRAME", "15m"),
            ("SCANNER_INTERVAL_SECS", "300"),
            ("PORT", "8080"),
        ]))
        .unwrap();
        assert_eq!(cfg.exchange, Exchange::Binance);
        assert_eq!(cfg.fixed_symbols, vec!["btc/usdt", "eth/usdt"]);
        assert_eq!(cfg.top_volume_limit, 5);
        assert_eq!(cfg.timeframe, Timeframe::M15);
        assert_eq!(cfg.scan_interval_secs, Some(300));
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn bad_override_is_rejected() {
        let mut cfg = ScannerConfig::default();
        let err = cfg
            .apply_overrides(lookup(&[("SCANNER_TIMEFRAME", "7h")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SCANNER_TIMEFRAME", .. }));

        let err = cfg
            .apply_overrides(lookup(&[("SCANNER_TOP_N", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "SCANNER_TOP_N", .. }));
    }

    #[test]
    fn validate_rejects_short_candle_limit() {
        let cfg = ScannerConfig {
            candle_limit: 40,
            ..ScannerConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid { key: "candle_limit", .. })
        ));
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let cfg = ScannerConfig {
            scan_concurrency: 0,
            ..ScannerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn secrets_require_bot_token_and_chat_id() {
        let err = Secrets::from_lookup(lookup(&[("CHAT_ID", "42")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("BOT_TOKEN")));

        let err = Secrets::from_lookup(lookup(&[("BOT_TOKEN", "t")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("CHAT_ID")));

        let err = Secrets::from_lookup(lookup(&[("BOT_TOKEN", "  "), ("CHAT_ID", "42")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("BOT_TOKEN")));
    }

    #[test]
    fn secrets_fall_back_to_bybit_names() {
        let secrets = Secrets::from_lookup(lookup(&[
            ("BOT_TOKEN", "t"),
            ("CHAT_ID", "42"),
            ("BYBIT_API_KEY", "k"),
            ("BYBIT_SECRET", "s"),
        ]))
        .unwrap();
        assert_eq!(secrets.exchange_api_key.as_deref(), Some("k"));
        assert_eq!(secrets.exchange_api_secret.as_deref(), Some("s"));
        assert!(secrets.trigger_token.is_none());
        assert!(!format!("{secrets:?}").contains("\"t\""));
    }
}

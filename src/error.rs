// =============================================================================
// Error taxonomy
// =============================================================================
//
// `ScanError` covers everything that can go wrong while scanning a single
// symbol or building the watchlist. All of it is recoverable: the scanner
// logs the error and moves on. `ConfigError` is the only fatal category and is
// raised before the first cycle runs.
// =============================================================================

use thiserror::Error;

/// Recoverable per-symbol (or per-ranking) failure.
#[derive(Debug, Clone, Error)]
pub enum ScanError {
    /// Network, HTTP or exchange-level failure while fetching market data.
    #[error("data fetch failed for {target}: {message}")]
    DataFetch { target: String, message: String },

    /// Fewer candles than the indicators need to warm up.
    #[error("insufficient history for {symbol}: got {available} bars, need {required}")]
    InsufficientHistory {
        symbol: String,
        available: usize,
        required: usize,
    },

    /// The alert could not be delivered.
    #[error("notification failed: {0}")]
    Notification(String),
}

impl ScanError {
    /// Wrap an `anyhow` chain from an adapter into a `DataFetch` error,
    /// keeping the full context chain in the message.
    pub fn data_fetch(target: impl Into<String>, err: anyhow::Error) -> Self {
        Self::DataFetch {
            target: target.into(),
            message: format!("{err:#}"),
        }
    }
}

/// Fatal startup failure: missing credentials or invalid settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

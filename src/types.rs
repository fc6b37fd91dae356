// =============================================================================
// Shared types used across the crossover scanner
// =============================================================================

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Exchange backing the market-data adapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Exchange {
    #[default]
    Bybit,
    Binance,
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bybit => write!(f, "Bybit"),
            Self::Binance => write!(f, "Binance"),
        }
    }
}

impl FromStr for Exchange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bybit" => Ok(Self::Bybit),
            "binance" => Ok(Self::Binance),
            other => Err(format!("unknown exchange '{other}'")),
        }
    }
}

/// Candle timeframe, spelled the way traders write it ("1h", "15m", "1d").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "3m")]
    M3,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[default]
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "2h")]
    H2,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "6h")]
    H6,
    #[serde(rename = "12h")]
    H12,
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "1w")]
    W1,
    #[serde(rename = "1M")]
    Mo1,
}

impl Timeframe {
    /// Canonical label; Binance uses the same spelling for its kline interval.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M3 => "3m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::M30 => "30m",
            Self::H1 => "1h",
            Self::H2 => "2h",
            Self::H4 => "4h",
            Self::H6 => "6h",
            Self::H12 => "12h",
            Self::D1 => "1d",
            Self::W1 => "1w",
            Self::Mo1 => "1M",
        }
    }

    /// Bybit v5 kline interval code (minutes, or D/W/M).
    pub fn bybit_interval(&self) -> &'static str {
        match self {
            Self::M1 => "1",
            Self::M3 => "3",
            Self::M5 => "5",
            Self::M15 => "15",
            Self::M30 => "30",
            Self::H1 => "60",
            Self::H2 => "120",
            Self::H4 => "240",
            Self::H6 => "360",
            Self::H12 => "720",
            Self::D1 => "D",
            Self::W1 => "W",
            Self::Mo1 => "M",
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "1M" (month) and "1m" (minute) differ only by case, so no lowercasing.
        let tf = match s.trim() {
            "1m" => Self::M1,
            "3m" => Self::M3,
            "5m" => Self::M5,
            "15m" => Self::M15,
            "30m" => Self::M30,
            "1h" => Self::H1,
            "2h" => Self::H2,
            "4h" => Self::H4,
            "6h" => Self::H6,
            "12h" => Self::H12,
            "1d" => Self::D1,
            "1w" => Self::W1,
            "1M" => Self::Mo1,
            other => return Err(format!("unsupported timeframe '{other}'")),
        };
        Ok(tf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_bybit_hourly() {
        assert_eq!(Exchange::default(), Exchange::Bybit);
        assert_eq!(Timeframe::default(), Timeframe::H1);
    }

    #[test]
    fn exchange_parses_case_insensitively() {
        assert_eq!("Bybit".parse::<Exchange>().unwrap(), Exchange::Bybit);
        assert_eq!(" binance ".parse::<Exchange>().unwrap(), Exchange::Binance);
        assert!("kraken".parse::<Exchange>().is_err());
    }

    #[test]
    fn timeframe_minute_and_month_are_distinct() {
        assert_eq!("1m".parse::<Timeframe>().unwrap(), Timeframe::M1);
        assert_eq!("1M".parse::<Timeframe>().unwrap(), Timeframe::Mo1);
        assert_eq!(Timeframe::H1.bybit_interval(), "60");
        assert_eq!(Timeframe::D1.bybit_interval(), "D");
    }

    #[test]
    fn timeframe_serde_uses_labels() {
        let tf: Timeframe = serde_json::from_str("\"4h\"").unwrap();
        assert_eq!(tf, Timeframe::H4);
        assert_eq!(serde_json::to_string(&Timeframe::M15).unwrap(), "\"15m\"");
    }
}

// =============================================================================
// Watchlist — fixed symbols ∪ top-N by 24h quote volume
// =============================================================================
//
// The watchlist is rebuilt from scratch every cycle. A failing or empty
// ranking fetch degrades to the fixed list; it never aborts the cycle.
// =============================================================================

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::market_data::{MarketDataSource, TickerVolume};

/// Symbols to scan in one cycle, without duplicates.
#[derive(Debug, Clone, PartialEq)]
pub struct Watchlist {
    pub symbols: Vec<String>,
    /// `true` when the dynamic ranking was unavailable and only the fixed
    /// list is being scanned.
    pub degraded: bool,
}

/// Exchange-native symbol id: `"xrp/usdt"` -> `"XRPUSDT"`.
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !matches!(c, '/' | '-' | '_' | ' '))
        .flat_map(char::to_uppercase)
        .collect()
}

/// Union of `fixed` and `dynamic`, normalised, first occurrence wins.
pub fn merge_symbols<S: AsRef<str>>(fixed: &[S], dynamic: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    fixed
        .iter()
        .chain(dynamic.iter())
        .map(|s| normalize_symbol(s.as_ref()))
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

/// Rank tickers quoted in `quote_asset` by descending quote volume and keep
/// the first `limit`.
///
/// The sort is stable, so equal volumes keep the provider's order. NaN volumes
/// sort after every real number.
pub fn rank_by_quote_volume(
    tickers: Vec<TickerVolume>,
    quote_asset: &str,
    limit: usize,
) -> Vec<String> {
    let quote = quote_asset.to_uppercase();
    let mut quoted: Vec<TickerVolume> = tickers
        .into_iter()
        .filter(|t| t.symbol.to_uppercase().ends_with(&quote))
        .collect();

    quoted.sort_by(|a, b| volume_key(b.quote_volume).total_cmp(&volume_key(a.quote_volume)));
    quoted.truncate(limit);
    quoted.into_iter().map(|t| t.symbol).collect()
}

fn volume_key(v: f64) -> f64 {
    if v.is_nan() {
        f64::NEG_INFINITY
    } else {
        v
    }
}

/// Build this cycle's watchlist.
pub async fn build_watchlist(
    fixed: &[String],
    source: &dyn MarketDataSource,
    top_n: usize,
) -> Watchlist {
    if top_n == 0 {
        return Watchlist {
            symbols: merge_symbols::<String>(fixed, &[]),
            degraded: false,
        };
    }

    let dynamic = match source.fetch_top_volume_symbols(top_n).await {
        Ok(symbols) if !symbols.is_empty() => symbols,
        Ok(_) => {
            warn!(exchange = source.name(), "volume ranking returned no symbols — scanning fixed list only");
            return Watchlist {
                symbols: merge_symbols::<String>(fixed, &[]),
                degraded: true,
            };
        }
        Err(e) => {
            warn!(exchange = source.name(), error = %e, "volume ranking failed — scanning fixed list only");
            return Watchlist {
                symbols: merge_symbols::<String>(fixed, &[]),
                degraded: true,
            };
        }
    };

    let symbols = merge_symbols(fixed, &dynamic);
    debug!(fixed = fixed.len(), dynamic = dynamic.len(), merged = symbols.len(), "watchlist built");
    Watchlist {
        symbols,
        degraded: false,
    }
}

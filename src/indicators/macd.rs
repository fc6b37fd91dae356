// =============================================================================
// MACD Histogram
// =============================================================================
//
//   macd      = EMA(fast) - EMA(slow)
//   signal    = EMA(signal_period) of the defined macd values
//   histogram = macd - signal
//
// With the default 12/26/9 parameters the MACD line is defined from index 25
// and the histogram from index 33 (34 bars of history).
// =============================================================================

use super::ema::{calculate_ema, ema_series};

pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;

/// MACD histogram aligned to `closes` using the given periods.
///
/// The signal line is seeded with the SMA of the first `signal` defined MACD
/// values, exactly like an EMA over a series that starts where the MACD line
/// starts.
pub fn macd_histogram_with(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> Vec<Option<f64>> {
    let mut histogram = vec![None; closes.len()];

    let fast_ema = ema_series(closes, fast);
    let slow_ema = ema_series(closes, slow);

    let macd: Vec<Option<f64>> = fast_ema
        .iter()
        .zip(slow_ema.iter())
        .map(|(f, s)| Some((*f)? - (*s)?))
        .collect();

    let Some(start) = macd.iter().position(Option::is_some) else {
        return histogram;
    };

    // Contiguous run of defined MACD values from `start`.
    let defined: Vec<f64> = macd[start..].iter().map_while(|v| *v).collect();

    for (offset, sig) in calculate_ema(&defined, signal).into_iter().enumerate() {
        let idx = start + signal - 1 + offset;
        histogram[idx] = Some(defined[signal - 1 + offset] - sig);
    }

    histogram
}

/// MACD(12, 26, 9) histogram aligned to `closes`.
pub fn macd_histogram(closes: &[f64]) -> Vec<Option<f64>> {
    macd_histogram_with(closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL)
}

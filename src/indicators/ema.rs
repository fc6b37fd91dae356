// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// Formula:
//   multiplier = 2 / (period + 1)
//   EMA_t      = value_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// The first EMA value is seeded with the SMA of the first `period` values, so
// the series is undefined for the first `period - 1` inputs.
// =============================================================================

/// Compute the compact EMA series for `values` and look-back `period`.
///
/// Element `0` of the output corresponds to input index `period - 1`.
///
/// # Edge cases
/// - `period == 0` => empty vec
/// - `values.len() < period` => empty vec
/// - A non-finite intermediate value ends the series early.
pub fn calculate_ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let multiplier = 2.0 / (period + 1) as f64;

    let sma: f64 = values[..period].iter().sum::<f64>() / period as f64;
    if !sma.is_finite() {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(values.len() - period + 1);
    result.push(sma);

    let mut prev_ema = sma;
    for &value in &values[period..] {
        let ema = value * multiplier + prev_ema * (1.0 - multiplier);
        if !ema.is_finite() {
            break;
        }
        result.push(ema);
        prev_ema = ema;
    }

    result
}

/// EMA series aligned one-to-one with `values`: warm-up positions (and any
/// positions after a non-finite break) are `None`.
pub fn ema_series(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut aligned = vec![None; values.len()];
    if period == 0 {
        return aligned;
    }
    for (offset, ema) in calculate_ema(values, period).into_iter().enumerate() {
        aligned[period - 1 + offset] = Some(ema);
    }
    aligned
}

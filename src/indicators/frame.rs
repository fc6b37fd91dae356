// =============================================================================
// Indicator Frame — per-bar EMA stack + MACD histogram
// =============================================================================

use super::ema::ema_series;
use super::macd::{macd_histogram, MACD_SIGNAL, MACD_SLOW};

pub const EMA_FAST: usize = 9;
pub const EMA_MID: usize = 21;
pub const EMA_SLOW: usize = 55;

/// Minimum number of candles for every indicator on the latest bar to be
/// defined.
pub const MIN_HISTORY: usize = max_usize(EMA_SLOW, MACD_SLOW + MACD_SIGNAL - 1);

const fn max_usize(a: usize, b: usize) -> usize {
    if a > b {
        a
    } else {
        b
    }
}

/// Indicator values for a single bar. `None` means still warming up.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IndicatorBar {
    pub ema9: Option<f64>,
    pub ema21: Option<f64>,
    pub ema55: Option<f64>,
    pub histogram: Option<f64>,
}

/// Indicator bars aligned one-to-one with the candles they were computed from.
#[derive(Debug, Clone, Default)]
pub struct IndicatorFrame {
    bars: Vec<IndicatorBar>,
}

impl IndicatorFrame {
    /// Compute EMA9/21/55 and the MACD(12,26,9) histogram for `closes`.
    pub fn compute(closes: &[f64]) -> Self {
        let ema9 = ema_series(closes, EMA_FAST);
        let ema21 = ema_series(closes, EMA_MID);
        let ema55 = ema_series(closes, EMA_SLOW);
        let histogram = macd_histogram(closes);

        let bars = (0..closes.len())
            .map(|i| IndicatorBar {
                ema9: ema9[i],
                ema21: ema21[i],
                ema55: ema55[i],
                histogram: histogram[i],
            })
            .collect();

        Self { bars }
    }

    pub fn bars(&self) -> &[IndicatorBar] {
        &self.bars
    }

    /// `(latest, previous)` — the two most recent bars, if there are two.
    pub fn last_two(&self) -> Option<(&IndicatorBar, &IndicatorBar)> {
        match self.bars.as_slice() {
            [.., previous, latest] => Some((latest, previous)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ascending(n: usize) -> Vec<f64> {
        (1..=n).map(|i| i as f64).collect()
    }

    #[test]
    fn min_history_is_ema55_warmup() {
        assert_eq!(MIN_HISTORY, 55);
    }

    #[test]
    fn frame_is_aligned_with_input() {
        let frame = IndicatorFrame::compute(&ascending(100));
        assert_eq!(frame.bars().len(), 100);
    }

    #[test]
    fn warmup_boundaries() {
        let frame = IndicatorFrame::compute(&ascending(100));
        let bars = frame.bars();
        assert!(bars[7].ema9.is_none());
        assert!(bars[8].ema9.is_some());
        assert!(bars[19].ema21.is_none());
        assert!(bars[20].ema21.is_some());
        assert!(bars[32].histogram.is_none());
        assert!(bars[33].histogram.is_some());
        assert!(bars[53].ema55.is_none());
        assert!(bars[54].ema55.is_some());
    }

    #[test]
    fn exactly_min_history_defines_latest_bar() {
        let frame = IndicatorFrame::compute(&ascending(MIN_HISTORY));
        let (latest, previous) = frame.last_two().unwrap();
        assert!(latest.ema9.is_some());
        assert!(latest.ema21.is_some());
        assert!(latest.ema55.is_some());
        assert!(latest.histogram.is_some());
        assert!(previous.histogram.is_some());
        assert!(previous.ema55.is_none());
    }

    #[test]
    fn rising_series_stacks_emas_ascending() {
        let frame = IndicatorFrame::compute(&ascending(200));
        let (latest, _) = frame.last_two().unwrap();
        let (e9, e21, e55) = (
            latest.ema9.unwrap(),
            latest.ema21.unwrap(),
            latest.ema55.unwrap(),
        );
        assert!(e9 > e21 && e21 > e55);
    }

    #[test]
    fn last_two_needs_two_bars() {
        assert!(IndicatorFrame::compute(&[1.0]).last_two().is_none());
        assert!(IndicatorFrame::compute(&[]).bars().is_empty());
    }
}
